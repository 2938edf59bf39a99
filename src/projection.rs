//! Map projections used by the figures.
//!
//! Projected coordinates are meters for the Lambert conformal and UTM projections and degrees for
//! Plate Carrée. Geodetic coordinates are always passed as `(longitude, latitude)` in degrees.
use std::f64::consts::{FRAC_PI_2, FRAC_PI_4, PI};

/// Radius of the sphere used by WRF.
pub const WRF_EARTH_RADIUS: f64 = 6_370_000.0;

/// Radius of the sphere used for the default Lambert conformal maps.
pub const DEFAULT_EARTH_RADIUS: f64 = 6_378_137.0;

// WGS84
const WGS84_A: f64 = 6_378_137.0;
const WGS84_F: f64 = 1.0 / 298.257_223_563;

const UTM_K0: f64 = 0.9996;
const UTM_FALSE_EASTING: f64 = 500_000.0;
const UTM_FALSE_NORTHING_SOUTH: f64 = 10_000_000.0;

/// A map projection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Projection {
    /// Equirectangular, x is longitude and y is latitude.
    PlateCarree,
    /// Lambert conformal conic on a sphere.
    LambertConformal(LambertConformal),
    /// Universal transverse Mercator on the WGS84 ellipsoid.
    Utm(Utm),
}

impl Projection {
    /// A Lambert conformal projection with standard parallels at 33° and 45°.
    pub fn lambert(central_longitude: f64, central_latitude: f64) -> Self {
        Projection::LambertConformal(LambertConformal::new(
            central_longitude,
            central_latitude,
            (33.0, 45.0),
            DEFAULT_EARTH_RADIUS,
        ))
    }

    /// The Lambert conformal projection of a WRF domain.
    pub fn wrf_lambert(truelat1: f64, truelat2: f64, stand_lon: f64, cen_lat: f64) -> Self {
        Projection::LambertConformal(LambertConformal::new(
            stand_lon,
            cen_lat,
            (truelat1, truelat2),
            WRF_EARTH_RADIUS,
        ))
    }

    /// A northern hemisphere UTM zone.
    pub fn utm(zone: u8) -> Self {
        Projection::Utm(Utm { zone, south: false })
    }

    /// Project a geodetic point.
    pub fn forward(&self, lon: f64, lat: f64) -> (f64, f64) {
        match self {
            Projection::PlateCarree => (lon, lat),
            Projection::LambertConformal(lcc) => lcc.forward(lon, lat),
            Projection::Utm(utm) => utm.forward(lon, lat),
        }
    }

    /// Convert a projected point back to geodetic coordinates.
    pub fn inverse(&self, x: f64, y: f64) -> (f64, f64) {
        match self {
            Projection::PlateCarree => (x, y),
            Projection::LambertConformal(lcc) => lcc.inverse(x, y),
            Projection::Utm(utm) => utm.inverse(x, y),
        }
    }
}

/// Lambert conformal conic projection on a sphere with two standard parallels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LambertConformal {
    lon0: f64,
    n: f64,
    f: f64,
    rho0: f64,
    radius: f64,
}

impl LambertConformal {
    /// Set up the projection, all angles in degrees.
    pub fn new(
        central_longitude: f64,
        central_latitude: f64,
        standard_parallels: (f64, f64),
        radius: f64,
    ) -> Self {
        let phi1 = standard_parallels.0.to_radians();
        let phi2 = standard_parallels.1.to_radians();
        let phi0 = central_latitude.to_radians();

        let t = |phi: f64| (FRAC_PI_4 + phi / 2.0).tan();

        let n = if (phi1 - phi2).abs() < 1.0e-10 {
            phi1.sin()
        } else {
            (phi1.cos() / phi2.cos()).ln() / (t(phi2) / t(phi1)).ln()
        };
        let f = phi1.cos() * t(phi1).powf(n) / n;
        let rho0 = radius * f / t(phi0).powf(n);

        LambertConformal {
            lon0: central_longitude.to_radians(),
            n,
            f,
            rho0,
            radius,
        }
    }

    fn forward(&self, lon: f64, lat: f64) -> (f64, f64) {
        let phi = lat.to_radians();
        let rho = self.radius * self.f / (FRAC_PI_4 + phi / 2.0).tan().powf(self.n);
        let theta = self.n * wrap_angle(lon.to_radians() - self.lon0);

        (rho * theta.sin(), self.rho0 - rho * theta.cos())
    }

    fn inverse(&self, x: f64, y: f64) -> (f64, f64) {
        let dy = self.rho0 - y;
        let sign = self.n.signum();
        let rho = sign * x.hypot(dy);
        let theta = (sign * x).atan2(sign * dy);

        let phi = if rho == 0.0 {
            sign * FRAC_PI_2
        } else {
            2.0 * (self.radius * self.f / rho).powf(1.0 / self.n).atan() - FRAC_PI_2
        };
        let lambda = theta / self.n + self.lon0;

        (wrap_angle(lambda).to_degrees(), phi.to_degrees())
    }
}

/// A UTM zone on the WGS84 ellipsoid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Utm {
    /// Zone number, 1 through 60.
    pub zone: u8,
    /// Use the southern hemisphere false northing.
    pub south: bool,
}

impl Utm {
    fn central_meridian(&self) -> f64 {
        (f64::from(self.zone) * 6.0 - 183.0).to_radians()
    }

    fn false_northing(&self) -> f64 {
        if self.south {
            UTM_FALSE_NORTHING_SOUTH
        } else {
            0.0
        }
    }

    fn forward(&self, lon: f64, lat: f64) -> (f64, f64) {
        let (e2, ep2) = eccentricities();
        let phi = lat.to_radians();
        let (sin_phi, cos_phi, tan_phi) = (phi.sin(), phi.cos(), phi.tan());

        let n = WGS84_A / (1.0 - e2 * sin_phi * sin_phi).sqrt();
        let t = tan_phi * tan_phi;
        let c = ep2 * cos_phi * cos_phi;
        let a = cos_phi * wrap_angle(lon.to_radians() - self.central_meridian());
        let m = meridian_arc(phi, e2);

        let x = UTM_K0
            * n
            * (a + (1.0 - t + c) * a.powi(3) / 6.0
                + (5.0 - 18.0 * t + t * t + 72.0 * c - 58.0 * ep2) * a.powi(5) / 120.0)
            + UTM_FALSE_EASTING;
        let y = UTM_K0
            * (m + n
                * tan_phi
                * (a * a / 2.0
                    + (5.0 - t + 9.0 * c + 4.0 * c * c) * a.powi(4) / 24.0
                    + (61.0 - 58.0 * t + t * t + 600.0 * c - 330.0 * ep2) * a.powi(6) / 720.0))
            + self.false_northing();

        (x, y)
    }

    fn inverse(&self, x: f64, y: f64) -> (f64, f64) {
        let (e2, ep2) = eccentricities();
        let e4 = e2 * e2;
        let e6 = e4 * e2;

        let m = (y - self.false_northing()) / UTM_K0;
        let mu = m / (WGS84_A * (1.0 - e2 / 4.0 - 3.0 * e4 / 64.0 - 5.0 * e6 / 256.0));
        let e1 = (1.0 - (1.0 - e2).sqrt()) / (1.0 + (1.0 - e2).sqrt());

        let phi1 = mu
            + (3.0 * e1 / 2.0 - 27.0 * e1.powi(3) / 32.0) * (2.0 * mu).sin()
            + (21.0 * e1 * e1 / 16.0 - 55.0 * e1.powi(4) / 32.0) * (4.0 * mu).sin()
            + (151.0 * e1.powi(3) / 96.0) * (6.0 * mu).sin()
            + (1097.0 * e1.powi(4) / 512.0) * (8.0 * mu).sin();

        let (sin1, cos1, tan1) = (phi1.sin(), phi1.cos(), phi1.tan());
        let n1 = WGS84_A / (1.0 - e2 * sin1 * sin1).sqrt();
        let t1 = tan1 * tan1;
        let c1 = ep2 * cos1 * cos1;
        let r1 = WGS84_A * (1.0 - e2) / (1.0 - e2 * sin1 * sin1).powf(1.5);
        let d = (x - UTM_FALSE_EASTING) / (n1 * UTM_K0);

        let phi = phi1
            - (n1 * tan1 / r1)
                * (d * d / 2.0
                    - (5.0 + 3.0 * t1 + 10.0 * c1 - 4.0 * c1 * c1 - 9.0 * ep2) * d.powi(4) / 24.0
                    + (61.0 + 90.0 * t1 + 298.0 * c1 + 45.0 * t1 * t1 - 252.0 * ep2
                        - 3.0 * c1 * c1)
                        * d.powi(6)
                        / 720.0);
        let lambda = self.central_meridian()
            + (d - (1.0 + 2.0 * t1 + c1) * d.powi(3) / 6.0
                + (5.0 - 2.0 * c1 + 28.0 * t1 - 3.0 * c1 * c1 + 8.0 * ep2 + 24.0 * t1 * t1)
                    * d.powi(5)
                    / 120.0)
                / cos1;

        (wrap_angle(lambda).to_degrees(), phi.to_degrees())
    }
}

/// The UTM zone containing a longitude, `floor((lon + 180) / 6) + 1` limited to 1..=60.
///
/// # Examples
///
/// ```rust
/// use tornado_figures::utm_zone_from_lon;
///
/// assert_eq!(utm_zone_from_lon(-180.0), 1);
/// assert_eq!(utm_zone_from_lon(180.0 - 1.0e-9), 60);
/// assert_eq!(utm_zone_from_lon(113.4), 49);
/// // A zone boundary starts the next zone.
/// assert_eq!(utm_zone_from_lon(114.0), 50);
/// ```
pub fn utm_zone_from_lon(lon: f64) -> u8 {
    let zone = ((lon + 180.0) / 6.0).floor() + 1.0;
    zone.max(1.0).min(60.0) as u8
}

fn eccentricities() -> (f64, f64) {
    let e2 = WGS84_F * (2.0 - WGS84_F);
    (e2, e2 / (1.0 - e2))
}

fn meridian_arc(phi: f64, e2: f64) -> f64 {
    let e4 = e2 * e2;
    let e6 = e4 * e2;

    WGS84_A
        * ((1.0 - e2 / 4.0 - 3.0 * e4 / 64.0 - 5.0 * e6 / 256.0) * phi
            - (3.0 * e2 / 8.0 + 3.0 * e4 / 32.0 + 45.0 * e6 / 1024.0) * (2.0 * phi).sin()
            + (15.0 * e4 / 256.0 + 45.0 * e6 / 1024.0) * (4.0 * phi).sin()
            - (35.0 * e6 / 3072.0) * (6.0 * phi).sin())
}

/// Wrap an angle in radians into `[-pi, pi)`.
fn wrap_angle(angle: f64) -> f64 {
    (angle + PI).rem_euclid(2.0 * PI) - PI
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_utm_zone_boundaries() {
        assert_eq!(utm_zone_from_lon(-180.0), 1);
        assert_eq!(utm_zone_from_lon(-174.0 - 1.0e-9), 1);
        assert_eq!(utm_zone_from_lon(-174.0), 2);
        assert_eq!(utm_zone_from_lon(0.0), 31);
        assert_eq!(utm_zone_from_lon(-1.0e-9), 30);
        assert_eq!(utm_zone_from_lon(174.0), 60);
        assert_eq!(utm_zone_from_lon(180.0 - 1.0e-9), 60);
        assert_eq!(utm_zone_from_lon(180.0), 60);
        assert_eq!(utm_zone_from_lon(-200.0), 1);

        for zone in 1..=60u8 {
            let west_edge = f64::from(zone - 1) * 6.0 - 180.0;
            assert_eq!(utm_zone_from_lon(west_edge), zone);
            assert_eq!(utm_zone_from_lon(west_edge + 3.0), zone);
        }
    }

    #[test]
    fn test_utm_central_meridian() {
        let utm = Projection::utm(49);
        let (x, y) = utm.forward(111.0, 0.0);
        assert_abs_diff_eq!(x, 500_000.0, epsilon = 1.0e-6);
        assert_abs_diff_eq!(y, 0.0, epsilon = 1.0e-6);

        // One degree of latitude along the central meridian is about 110.6 km near the equator.
        let (_, y) = utm.forward(111.0, 1.0);
        assert!((y - 110_575.0).abs() < 100.0);
    }

    #[test]
    fn test_utm_round_trip() {
        let utm = Projection::utm(49);
        for &(lon, lat) in &[(113.418, 23.336), (108.5, 30.0), (113.75, 23.238), (111.0, 45.0)] {
            let (x, y) = utm.forward(lon, lat);
            let (lon2, lat2) = utm.inverse(x, y);
            assert_abs_diff_eq!(lon, lon2, epsilon = 1.0e-7);
            assert_abs_diff_eq!(lat, lat2, epsilon = 1.0e-7);
        }
    }

    #[test]
    fn test_utm_south() {
        let utm = Projection::Utm(Utm {
            zone: 56,
            south: true,
        });
        let (_, y) = utm.forward(153.0, -30.0);
        assert!(y > 6_000_000.0 && y < 7_000_000.0);
        let (lon, lat) = utm.inverse(500_000.0, y);
        assert_abs_diff_eq!(lon, 153.0, epsilon = 1.0e-7);
        assert_abs_diff_eq!(lat, -30.0, epsilon = 1.0e-7);
    }

    #[test]
    fn test_lambert_origin_and_round_trip() {
        let lcc = Projection::lambert(105.0, 35.0);
        let (x, y) = lcc.forward(105.0, 35.0);
        assert_abs_diff_eq!(x, 0.0, epsilon = 1.0e-6);
        assert_abs_diff_eq!(y, 0.0, epsilon = 1.0e-6);

        let (x, _) = lcc.forward(113.0, 23.0);
        assert!(x > 0.0);

        for &(lon, lat) in &[(113.4, 23.3), (70.0, 10.0), (140.0, 60.0), (105.0, 0.0)] {
            let (x, y) = lcc.forward(lon, lat);
            let (lon2, lat2) = lcc.inverse(x, y);
            assert_abs_diff_eq!(lon, lon2, epsilon = 1.0e-9);
            assert_abs_diff_eq!(lat, lat2, epsilon = 1.0e-9);
        }
    }

    #[test]
    fn test_lambert_single_tangent_parallel() {
        let lcc = Projection::wrf_lambert(30.0, 30.0, 113.0, 23.0);
        let (x, y) = lcc.forward(113.3, 23.4);
        let (lon, lat) = lcc.inverse(x, y);
        assert_abs_diff_eq!(lon, 113.3, epsilon = 1.0e-9);
        assert_abs_diff_eq!(lat, 23.4, epsilon = 1.0e-9);
    }

    #[test]
    fn test_plate_carree_identity() {
        assert_eq!(Projection::PlateCarree.forward(113.0, 23.0), (113.0, 23.0));
        assert_eq!(Projection::PlateCarree.inverse(113.0, 23.0), (113.0, 23.0));
    }
}
