//! Diagnostics computed on horizontal grids.
//!
//! Grids are indexed `[[row, column]]`. On latitude/longitude grids rows follow the latitude
//! coordinate and columns the longitude coordinate, in whatever order they are stored.
use crate::error::{AnalysisError, Result};
use metfor::{Celsius, HectoPascal, Quantity};
use ndarray::{Array2, Zip};

/// Mean radius of the earth in meters.
pub const EARTH_RADIUS: f64 = 6_371_229.0;

/// Wind speed from the components.
pub fn wind_speed(u: &Array2<f64>, v: &Array2<f64>) -> Array2<f64> {
    Zip::from(u).and(v).map_collect(|&u, &v| u.hypot(v))
}

/// Horizontal divergence of a vector field on a latitude/longitude grid, in units of the field
/// per meter.
///
/// In spherical coordinates `div = 1/(a cos(lat)) du/dlon + 1/a dv/dlat - v tan(lat)/a`. The
/// derivatives are centered differences in the interior and one sided at the edges, using the
/// actual coordinate spacing so unevenly spaced or descending coordinates are fine.
///
/// # Examples
///
/// ```rust
/// use ndarray::Array2;
/// use tornado_figures::divergence;
///
/// let lat = vec![30.0, 29.75, 29.5, 29.25];
/// let lon = vec![110.0, 110.25, 110.5];
/// let u = Array2::from_elem((4, 3), 120.0);
/// let v = Array2::zeros((4, 3));
///
/// let div = divergence(&u, &v, &lat, &lon).unwrap();
/// assert!(div.iter().all(|d| d.abs() < 1.0e-15));
/// ```
pub fn divergence(
    u: &Array2<f64>,
    v: &Array2<f64>,
    latitude: &[f64],
    longitude: &[f64],
) -> Result<Array2<f64>> {
    let (ny, nx) = u.dim();
    if v.dim() != (ny, nx) || latitude.len() != ny || longitude.len() != nx {
        return Err(AnalysisError::InvalidInput(
            "vector components and coordinates differ in shape",
        ));
    }
    if ny < 2 || nx < 2 {
        return Err(AnalysisError::NotEnoughData);
    }

    let lat_rad: Vec<f64> = latitude.iter().map(|l| l.to_radians()).collect();
    let lon_rad: Vec<f64> = longitude.iter().map(|l| l.to_radians()).collect();

    Ok(Array2::from_shape_fn((ny, nx), |(j, i)| {
        let du_dlon = derivative(nx, i, &lon_rad, |i| u[[j, i]]);
        let dv_dlat = derivative(ny, j, &lat_rad, |j| v[[j, i]]);
        let cos_lat = lat_rad[j].cos();

        du_dlon / (EARTH_RADIUS * cos_lat) + dv_dlat / EARTH_RADIUS
            - v[[j, i]] * lat_rad[j].tan() / EARTH_RADIUS
    }))
}

/// Dew point on a constant pressure surface from specific humidity in kg/kg.
///
/// Points where the dew point cannot be calculated are NaN.
pub fn dew_point_from_specific_humidity(pressure: HectoPascal, q: &Array2<f64>) -> Array2<f64> {
    q.mapv(|q| {
        metfor::dew_point_from_p_and_specific_humidity(pressure, q)
            .map(Celsius::unpack)
            .unwrap_or(std::f64::NAN)
    })
}

/// Dew point depression from a temperature in Kelvin and a dew point in Celsius.
pub fn dew_point_depression(temperature_k: &Array2<f64>, dew_point_c: &Array2<f64>) -> Array2<f64> {
    Zip::from(temperature_k)
        .and(dew_point_c)
        .map_collect(|&t, &td| t - 273.15 - td)
}

/// Absolute vorticity on a projected grid in units of 10⁻⁵ s⁻¹.
///
/// The winds are grid relative components on the mass points with rows increasing to the north
/// of the grid. `map_factor` is the map scale factor at the mass points, `coriolis` the Coriolis
/// parameter, and `dx`/`dy` the grid spacing in meters. The relative vorticity is computed as
/// `m² (d(v/m)/dx - d(u/m)/dy)`.
pub fn absolute_vorticity(
    u: &Array2<f64>,
    v: &Array2<f64>,
    map_factor: &Array2<f64>,
    coriolis: &Array2<f64>,
    dx: f64,
    dy: f64,
) -> Result<Array2<f64>> {
    let (ny, nx) = u.dim();
    if v.dim() != (ny, nx) || map_factor.dim() != (ny, nx) || coriolis.dim() != (ny, nx) {
        return Err(AnalysisError::InvalidInput("grids differ in shape"));
    }
    if ny < 2 || nx < 2 {
        return Err(AnalysisError::NotEnoughData);
    }

    let x: Vec<f64> = (0..nx).map(|i| i as f64 * dx).collect();
    let y: Vec<f64> = (0..ny).map(|j| j as f64 * dy).collect();

    Ok(Array2::from_shape_fn((ny, nx), |(j, i)| {
        let m = map_factor[[j, i]];
        let dv_dx = derivative(nx, i, &x, |i| v[[j, i]] / map_factor[[j, i]]);
        let du_dy = derivative(ny, j, &y, |j| u[[j, i]] / map_factor[[j, i]]);

        (m * m * (dv_dx - du_dy) + coriolis[[j, i]]) * 1.0e5
    }))
}

/// Derivative along one axis at index `k` of `n` points with coordinates `coords`.
fn derivative<F: Fn(usize) -> f64>(n: usize, k: usize, coords: &[f64], value: F) -> f64 {
    let (lo, hi) = if k == 0 {
        (0, 1)
    } else if k == n - 1 {
        (n - 2, n - 1)
    } else {
        (k - 1, k + 1)
    };

    (value(hi) - value(lo)) / (coords[hi] - coords[lo])
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_wind_speed() {
        let u = Array2::from_elem((2, 2), 3.0);
        let v = Array2::from_elem((2, 2), -4.0);
        assert!(wind_speed(&u, &v).iter().all(|&s| (s - 5.0).abs() < 1.0e-12));
    }

    #[test]
    fn test_divergence_of_zonal_gradient() {
        // u increasing eastward by 1 m/s per 0.25 degree at the equator.
        let lat = vec![0.25, 0.0, -0.25];
        let lon = vec![100.0, 100.25, 100.5, 100.75];
        let u = Array2::from_shape_fn((3, 4), |(_, i)| i as f64);
        let v = Array2::zeros((3, 4));

        let div = divergence(&u, &v, &lat, &lon).unwrap();
        let expected = 1.0 / (EARTH_RADIUS * 0.25_f64.to_radians());
        assert!((div[[1, 1]] - expected).abs() < 1.0e-9 * expected);
        assert!((div[[1, 0]] - expected).abs() < 1.0e-9 * expected);
    }

    #[test]
    fn test_divergence_rejects_bad_shapes() {
        let u = Array2::zeros((3, 4));
        let v = Array2::zeros((3, 3));
        assert!(divergence(&u, &v, &[0.0, 1.0, 2.0], &[0.0, 1.0, 2.0, 3.0]).is_err());
    }

    #[test]
    fn test_dew_point_depression() {
        let t = Array2::from_elem((1, 2), 300.0);
        let td = Array2::from_elem((1, 2), 20.0);
        let dd = dew_point_depression(&t, &td);
        assert!((dd[[0, 1]] - 6.85).abs() < 1.0e-9);
    }

    #[test]
    fn test_dew_point_from_specific_humidity() {
        let q = Array2::from_elem((1, 1), 0.015);
        let td = dew_point_from_specific_humidity(HectoPascal(925.0), &q);
        assert!(td[[0, 0]] > 15.0 && td[[0, 0]] < 22.0);
    }

    #[test]
    fn test_solid_body_rotation() {
        // u = -c y, v = c x has relative vorticity 2c.
        let c = 1.0e-4;
        let dx = 1000.0;
        let u = Array2::from_shape_fn((5, 5), |(j, _)| -c * j as f64 * dx);
        let v = Array2::from_shape_fn((5, 5), |(_, i)| c * i as f64 * dx);
        let m = Array2::from_elem((5, 5), 1.0);
        let f = Array2::from_elem((5, 5), 5.0e-5);

        let avo = absolute_vorticity(&u, &v, &m, &f, dx, dx).unwrap();
        for val in avo.iter() {
            assert!((val - 25.0).abs() < 1.0e-9);
        }
    }
}
