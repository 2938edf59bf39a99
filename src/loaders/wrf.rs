//! WRF model output.
//!
//! Only the first time in a file is read, the case study writes one time per file. The fields
//! the figures use are derived once when the file is opened and kept on the mass grid with the
//! `[[level, row, column]]` layout of [`crate::cross_section`].
use super::{global_f64, read_array, require_file};
use crate::{
    cross_section::GridLocator,
    error::{AnalysisError, FigureError, FigureResult, Result},
    kinematics,
    loaders::era5::GRAVITY,
    projection::Projection,
    sounding::{Sounding, StationInfo},
};
use chrono::NaiveDateTime;
use itertools::izip;
use log::{info, warn};
use metfor::{Celsius, HectoPascal, Meters};
use ndarray::{s, Array, Array2, Array3, ArrayD, Axis, Dimension, Ix2, Ix3, Slice};
use std::path::{Path, PathBuf};

/// Hint logged when a WRF file is not where it is expected.
pub const MISSING_WRF_HINT: &str =
    "未找到 WRF 输出数据，请放置在 wrfout 目录下，类似 wrfout/d03/wrfout_d01_2024-04-27_07_00_00";

/// `MAP_PROJ` value of the Lambert conformal projection.
const LAMBERT: f64 = 1.0;

/// Path of the output of `domain` at `time`.
///
/// Every domain of the case was run as its own single domain simulation, so the file names all
/// carry `d01` and the directory tells them apart.
///
/// # Examples
///
/// ```rust
/// use chrono::NaiveDate;
/// use std::path::Path;
/// use tornado_figures::loaders::wrf_path;
///
/// let time = NaiveDate::from_ymd_opt(2024, 4, 27).unwrap().and_hms_opt(7, 0, 0).unwrap();
/// assert_eq!(
///     wrf_path(Path::new("lib/wrfout"), 3, time),
///     Path::new("lib/wrfout/d03/wrfout_d01_2024-04-27_07_00_00")
/// );
/// ```
pub fn wrf_path(dir: &Path, domain: u8, time: NaiveDateTime) -> PathBuf {
    dir.join(format!("d{:02}", domain))
        .join(format!("wrfout_d01_{}", time.format("%Y-%m-%d_%H_%M_%S")))
}

/// Valid time from a `wrfout_dNN_YYYY-MM-DD_HH_MM_SS` file name.
fn time_from_file_name(path: &Path) -> Option<NaiveDateTime> {
    let name = path.file_name()?.to_str()?;
    let stamp = name.get(name.len().checked_sub(19)?..)?;
    NaiveDateTime::parse_from_str(stamp, "%Y-%m-%d_%H_%M_%S").ok()
}

/// The fields of one WRF output time.
#[derive(Debug, Clone)]
pub struct WrfOutput {
    path: PathBuf,
    valid_time: Option<NaiveDateTime>,

    latitude: Array2<f64>,
    longitude: Array2<f64>,
    terrain: Array2<f64>,

    // hPa
    pressure: Array3<f64>,
    // m MSL
    height: Array3<f64>,
    // °C
    temperature: Array3<f64>,
    dew_point: Array3<f64>,

    // Grid relative on the mass points, m/s
    u: Array3<f64>,
    v: Array3<f64>,
    sin_alpha: Option<Array2<f64>>,
    cos_alpha: Option<Array2<f64>>,

    reflectivity: Option<Array3<f64>>,

    coriolis: Array2<f64>,
    map_factor: Array2<f64>,

    projection: Projection,
    dx: f64,
    dy: f64,
}

fn shape_error(_: ndarray::ShapeError) -> AnalysisError {
    AnalysisError::InvalidInput("unexpected dimensions in WRF output")
}

/// Drop the leading `Time` dimension and fix the number of dimensions.
fn first_time<D: Dimension>(values: ArrayD<f64>) -> Result<Array<f64, D>> {
    let values = match D::NDIM {
        Some(n) if values.ndim() == n + 1 => values.index_axis_move(Axis(0), 0),
        _ => values,
    };
    values.into_dimensionality::<D>().map_err(shape_error)
}

fn read_2d(file: &netcdf::File, name: &str) -> FigureResult<Array2<f64>> {
    Ok(first_time::<Ix2>(read_array(file, name)?)?)
}

fn read_3d(file: &netcdf::File, name: &str) -> FigureResult<Array3<f64>> {
    Ok(first_time::<Ix3>(read_array(file, name)?)?)
}

fn read_optional_2d(file: &netcdf::File, name: &str) -> FigureResult<Option<Array2<f64>>> {
    if file.variable(name).is_some() {
        read_2d(file, name).map(Some)
    } else {
        Ok(None)
    }
}

fn required_global(file: &netcdf::File, name: &str) -> Result<f64> {
    global_f64(file, name).ok_or_else(|| AnalysisError::MissingVariable(name.to_owned()))
}

/// Average neighbouring points along a staggered axis.
fn destagger(values: &Array3<f64>, axis: usize) -> Result<Array3<f64>> {
    let axis = Axis(axis);
    let n = values.len_of(axis);
    if n < 2 {
        return Err(AnalysisError::NotEnoughData);
    }

    let lower = values.slice_axis(axis, Slice::from(0..n - 1));
    let upper = values.slice_axis(axis, Slice::from(1..n));

    Ok((&lower + &upper) * 0.5)
}

impl WrfOutput {
    /// Read a `wrfout` file and derive the fields the figures need.
    pub fn open(path: &Path) -> FigureResult<Self> {
        if let Err(err) = require_file(path) {
            warn!("{}", MISSING_WRF_HINT);
            return Err(err);
        }
        let file = netcdf::open(path)?;

        let map_proj = required_global(&file, "MAP_PROJ")?;
        if map_proj != LAMBERT {
            return Err(FigureError::Usage(format!(
                "{}: only Lambert conformal WRF grids are supported, MAP_PROJ = {}",
                path.display(),
                map_proj
            )));
        }
        let projection = Projection::wrf_lambert(
            required_global(&file, "TRUELAT1")?,
            required_global(&file, "TRUELAT2")?,
            required_global(&file, "STAND_LON")?,
            required_global(&file, "CEN_LAT")?,
        );
        let dx = required_global(&file, "DX")?;
        let dy = required_global(&file, "DY")?;

        let latitude = read_2d(&file, "XLAT")?;
        let longitude = read_2d(&file, "XLONG")?;
        let terrain = read_2d(&file, "HGT")?;

        let pressure = (read_3d(&file, "P")? + read_3d(&file, "PB")?) / 100.0;
        let geopotential = read_3d(&file, "PH")? + read_3d(&file, "PHB")?;
        let height = destagger(&geopotential, 0)? / GRAVITY;

        let theta = read_3d(&file, "T")? + 300.0;
        let temperature = temperature_from_theta(&theta, &pressure);
        let dew_point = dew_point_from_mixing_ratio(&read_3d(&file, "QVAPOR")?, &pressure);

        let u = destagger(&read_3d(&file, "U")?, 2)?;
        let v = destagger(&read_3d(&file, "V")?, 1)?;

        let reflectivity = if file.variable("REFL_10CM").is_some() {
            Some(read_3d(&file, "REFL_10CM")?)
        } else {
            None
        };

        let wrf = WrfOutput {
            path: path.to_path_buf(),
            valid_time: time_from_file_name(path),
            latitude,
            longitude,
            terrain,
            pressure,
            height,
            temperature,
            dew_point,
            u,
            v,
            sin_alpha: read_optional_2d(&file, "SINALPHA")?,
            cos_alpha: read_optional_2d(&file, "COSALPHA")?,
            reflectivity,
            coriolis: read_2d(&file, "F")?,
            map_factor: read_2d(&file, "MAPFAC_M")?,
            projection,
            dx,
            dy,
        };
        wrf.check_shapes()?;

        let (nz, ny, nx) = wrf.pressure.dim();
        info!("loaded {} ({} x {} x {})", path.display(), nz, ny, nx);

        Ok(wrf)
    }

    fn check_shapes(&self) -> Result<()> {
        let dim3 = self.pressure.dim();
        let dim2 = (dim3.1, dim3.2);

        let ok3 = [&self.height, &self.temperature, &self.dew_point, &self.u, &self.v]
            .iter()
            .all(|a| a.dim() == dim3)
            && self.reflectivity.as_ref().map_or(true, |r| r.dim() == dim3);
        let ok2 = [&self.latitude, &self.longitude, &self.terrain, &self.coriolis, &self.map_factor]
            .iter()
            .all(|a| a.dim() == dim2)
            && [&self.sin_alpha, &self.cos_alpha]
                .iter()
                .all(|a| a.as_ref().map_or(true, |a| a.dim() == dim2));

        if ok3 && ok2 {
            Ok(())
        } else {
            Err(AnalysisError::InvalidInput("WRF fields differ in shape"))
        }
    }

    /// The file this was read from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Valid time taken from the file name.
    pub fn valid_time(&self) -> Option<NaiveDateTime> {
        self.valid_time
    }

    /// Latitude of the mass points.
    pub fn latitude(&self) -> &Array2<f64> {
        &self.latitude
    }

    /// Longitude of the mass points.
    pub fn longitude(&self) -> &Array2<f64> {
        &self.longitude
    }

    /// Total pressure in hPa.
    pub fn pressure(&self) -> &Array3<f64> {
        &self.pressure
    }

    /// Height above mean sea level in meters.
    pub fn height(&self) -> &Array3<f64> {
        &self.height
    }

    /// Height above ground level in meters.
    pub fn height_agl(&self) -> Array3<f64> {
        let mut agl = self.height.clone();
        for mut level in agl.axis_iter_mut(Axis(0)) {
            level -= &self.terrain;
        }
        agl
    }

    /// Temperature in °C.
    pub fn temperature(&self) -> &Array3<f64> {
        &self.temperature
    }

    /// Dew point in °C.
    pub fn dew_point(&self) -> &Array3<f64> {
        &self.dew_point
    }

    /// Simulated radar reflectivity in dBZ.
    pub fn reflectivity(&self) -> Result<&Array3<f64>> {
        self.reflectivity
            .as_ref()
            .ok_or_else(|| AnalysisError::MissingVariable("REFL_10CM".to_owned()))
    }

    /// Wind components rotated to earth relative directions, m/s.
    ///
    /// Files without `SINALPHA`/`COSALPHA` are taken as already earth relative.
    pub fn earth_relative_wind(&self) -> (Array3<f64>, Array3<f64>) {
        match (&self.sin_alpha, &self.cos_alpha) {
            (Some(sin_a), Some(cos_a)) => {
                let mut u = self.u.clone();
                let mut v = self.v.clone();
                for (mut u_lvl, mut v_lvl, ug, vg) in izip!(
                    u.axis_iter_mut(Axis(0)),
                    v.axis_iter_mut(Axis(0)),
                    self.u.axis_iter(Axis(0)),
                    self.v.axis_iter(Axis(0))
                ) {
                    u_lvl.assign(&(&ug * cos_a - &vg * sin_a));
                    v_lvl.assign(&(&vg * cos_a + &ug * sin_a));
                }
                (u, v)
            }
            _ => (self.u.clone(), self.v.clone()),
        }
    }

    /// Horizontal wind speed in m/s.
    pub fn wind_speed(&self) -> Array3<f64> {
        let mut speed = self.u.clone();
        speed.zip_mut_with(&self.v, |u, &v| *u = u.hypot(v));
        speed
    }

    /// Absolute vorticity on every level in 10⁻⁵ s⁻¹.
    pub fn absolute_vorticity(&self) -> Result<Array3<f64>> {
        let mut avo = Array3::zeros(self.u.dim());
        for (k, mut level) in avo.axis_iter_mut(Axis(0)).enumerate() {
            let u = self.u.index_axis(Axis(0), k).to_owned();
            let v = self.v.index_axis(Axis(0), k).to_owned();
            level.assign(&kinematics::absolute_vorticity(
                &u,
                &v,
                &self.map_factor,
                &self.coriolis,
                self.dx,
                self.dy,
            )?);
        }
        Ok(avo)
    }

    /// The projection of the grid.
    pub fn projection(&self) -> Projection {
        self.projection
    }

    /// Locates points on the mass grid.
    pub fn locator(&self) -> GridLocator {
        GridLocator::projected(
            self.projection,
            self.latitude[[0, 0]],
            self.longitude[[0, 0]],
            self.dx,
            self.dy,
        )
    }

    /// The mass point nearest a location, see [`nearest_grid_point`].
    pub fn nearest(&self, lat: f64, lon: f64) -> Option<(usize, usize)> {
        nearest_grid_point(&self.latitude, &self.longitude, lat, lon)
    }

    /// The model sounding in column `(j, i)`.
    pub fn column_sounding(&self, j: usize, i: usize) -> Result<Sounding> {
        let (_, ny, nx) = self.pressure.dim();
        if j >= ny || i >= nx {
            return Err(AnalysisError::InvalidInput("column is off the grid"));
        }

        let (u, v) = self.earth_relative_wind();
        let column = |a: &Array3<f64>| a.slice(s![.., j, i]).to_vec();

        let pressure = column(&self.pressure)
            .into_iter()
            .map(|p| super::optioned(p, HectoPascal))
            .collect();
        let height = column(&self.height)
            .into_iter()
            .map(|z| super::optioned(z, Meters))
            .collect();
        let temperature = column(&self.temperature)
            .into_iter()
            .map(|t| super::optioned(t, Celsius))
            .collect();
        let dew_point = column(&self.dew_point)
            .into_iter()
            .map(|td| super::optioned(td, Celsius))
            .collect();

        let station = StationInfo::new()
            .with_lat_lon((self.latitude[[j, i]], self.longitude[[j, i]]))
            .with_elevation(super::optioned(self.terrain[[j, i]], Meters));

        Sounding::new()
            .with_source_description("WRF")
            .with_station_info(station)
            .with_valid_time(self.valid_time)
            .with_pressure_profile(pressure)
            .with_height_profile(height)
            .with_temperature_profile(temperature)
            .with_dew_point_profile(dew_point)
            .with_wind_components(&column(&u), &column(&v))
            .validate()
    }
}

/// Temperature in °C from potential temperature in K and pressure in hPa.
fn temperature_from_theta(theta: &Array3<f64>, pressure: &Array3<f64>) -> Array3<f64> {
    let kappa = metfor::Rd / metfor::cpd;
    let mut t = theta.clone();
    t.zip_mut_with(pressure, |th, &p| *th = *th * (p / 1000.0).powf(kappa) - 273.15);
    t
}

/// Dew point in °C from the water vapour mixing ratio in kg/kg and pressure in hPa.
fn dew_point_from_mixing_ratio(qv: &Array3<f64>, pressure: &Array3<f64>) -> Array3<f64> {
    let mut td = qv.clone();
    td.zip_mut_with(pressure, |q, &p| {
        *q = metfor::dew_point_from_p_and_mw(HectoPascal(p), q.max(1.0e-12))
            .map(|td| td.0)
            .unwrap_or(std::f64::NAN)
    });
    td
}

/// The `(row, column)` whose latitude and longitude are closest to `(lat, lon)`, measured
/// as the Euclidean distance in degrees. `None` for an empty or all missing grid.
///
/// # Examples
///
/// ```rust
/// use ndarray::Array2;
/// use tornado_figures::loaders::nearest_grid_point;
///
/// let lat = Array2::from_shape_fn((3, 4), |(j, _)| 23.0 + 0.1 * j as f64);
/// let lon = Array2::from_shape_fn((3, 4), |(_, i)| 113.0 + 0.1 * i as f64);
///
/// assert_eq!(nearest_grid_point(&lat, &lon, 23.19, 113.31), Some((2, 3)));
/// ```
pub fn nearest_grid_point(
    latitude: &Array2<f64>,
    longitude: &Array2<f64>,
    lat: f64,
    lon: f64,
) -> Option<(usize, usize)> {
    latitude
        .indexed_iter()
        .zip(longitude.iter())
        .map(|(((j, i), &la), &lo)| ((j, i), (lo - lon).hypot(la - lat)))
        .filter(|(_, d)| d.is_finite())
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(idx, _)| idx)
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_abs_diff_eq;
    use chrono::NaiveDate;

    fn synthetic(sin_alpha: Option<f64>) -> WrfOutput {
        let (nz, ny, nx) = (4, 3, 3);
        let pressure = Array3::from_shape_fn((nz, ny, nx), |(k, _, _)| 1000.0 - 150.0 * k as f64);
        let height = Array3::from_shape_fn((nz, ny, nx), |(k, _, _)| 100.0 + 1400.0 * k as f64);
        let temperature = height.mapv(|z| 25.0 - 0.0065 * z);
        let dew_point = temperature.mapv(|t| t - 3.0);

        let latitude = Array2::from_shape_fn((ny, nx), |(j, _)| 23.0 + 0.01 * j as f64);
        let longitude = Array2::from_shape_fn((ny, nx), |(_, i)| 113.0 + 0.01 * i as f64);

        WrfOutput {
            path: PathBuf::from("wrfout_d01_2024-04-27_07_00_00"),
            valid_time: NaiveDate::from_ymd_opt(2024, 4, 27).and_then(|d| d.and_hms_opt(7, 0, 0)),
            latitude,
            longitude,
            terrain: Array2::from_elem((ny, nx), 100.0),
            pressure,
            height,
            temperature,
            dew_point,
            u: Array3::from_elem((nz, ny, nx), 10.0),
            v: Array3::zeros((nz, ny, nx)),
            sin_alpha: sin_alpha.map(|s| Array2::from_elem((ny, nx), s)),
            cos_alpha: sin_alpha.map(|s| Array2::from_elem((ny, nx), (1.0 - s * s).sqrt())),
            reflectivity: None,
            coriolis: Array2::from_elem((ny, nx), 5.7e-5),
            map_factor: Array2::from_elem((ny, nx), 1.0),
            projection: Projection::wrf_lambert(30.0, 60.0, 113.0, 23.0),
            dx: 1000.0,
            dy: 1000.0,
        }
    }

    #[test]
    fn test_wrf_path_and_time() {
        let time = NaiveDate::from_ymd_opt(2024, 4, 27)
            .and_then(|d| d.and_hms_opt(15, 0, 0))
            .unwrap();
        let path = wrf_path(Path::new("wrfout"), 4, time);
        assert_eq!(path, Path::new("wrfout/d04/wrfout_d01_2024-04-27_15_00_00"));
        assert_eq!(time_from_file_name(&path), Some(time));
        assert_eq!(time_from_file_name(Path::new("short")), None);
    }

    #[test]
    fn test_destagger() {
        let staggered = Array3::from_shape_fn((1, 2, 3), |(_, _, i)| i as f64);
        let mass = destagger(&staggered, 2).unwrap();
        assert_eq!(mass.dim(), (1, 2, 2));
        assert_abs_diff_eq!(mass[[0, 1, 0]], 0.5);
        assert_abs_diff_eq!(mass[[0, 1, 1]], 1.5);

        assert!(destagger(&Array3::zeros((1, 1, 1)), 0).is_err());
    }

    #[test]
    fn test_theta_to_temperature() {
        let theta = Array3::from_elem((1, 1, 1), 300.0);
        let p = Array3::from_elem((1, 1, 1), 1000.0);
        assert_abs_diff_eq!(temperature_from_theta(&theta, &p)[[0, 0, 0]], 26.85, epsilon = 1.0e-9);
    }

    #[test]
    fn test_earth_relative_rotation() {
        let wrf = synthetic(Some(0.5));
        let (u, v) = wrf.earth_relative_wind();
        let cos_a = 0.75_f64.sqrt();
        assert_abs_diff_eq!(u[[0, 0, 0]], 10.0 * cos_a, epsilon = 1.0e-12);
        assert_abs_diff_eq!(v[[0, 0, 0]], 5.0, epsilon = 1.0e-12);

        // Rotation keeps the speed.
        assert_abs_diff_eq!(u[[2, 1, 1]].hypot(v[[2, 1, 1]]), 10.0, epsilon = 1.0e-12);

        let (u, _) = synthetic(None).earth_relative_wind();
        assert_abs_diff_eq!(u[[0, 0, 0]], 10.0);
    }

    #[test]
    fn test_height_agl() {
        let wrf = synthetic(None);
        let agl = wrf.height_agl();
        assert_abs_diff_eq!(agl[[0, 2, 2]], 0.0);
        assert_abs_diff_eq!(agl[[1, 0, 0]], 1400.0);
    }

    #[test]
    fn test_uniform_flow_vorticity_is_coriolis() {
        let avo = synthetic(None).absolute_vorticity().unwrap();
        for value in avo.iter() {
            assert_abs_diff_eq!(*value, 5.7, epsilon = 1.0e-9);
        }
    }

    #[test]
    fn test_column_sounding() {
        let wrf = synthetic(None);
        let snd = wrf.column_sounding(1, 2).unwrap();

        assert_eq!(snd.pressure_profile().len(), 4);
        assert_eq!(snd.pressure_profile()[0].unwrap(), HectoPascal(1000.0));
        let (lat, lon) = snd.station_info().location().unwrap();
        assert_abs_diff_eq!(lat, 23.01, epsilon = 1.0e-9);
        assert_abs_diff_eq!(lon, 113.02, epsilon = 1.0e-9);
        assert!(snd.wind_profile().iter().all(|w| w.is_some()));

        assert!(wrf.column_sounding(3, 0).is_err());
    }

    #[test]
    fn test_nearest_point_skips_missing() {
        let mut lat = Array2::from_shape_fn((2, 2), |(j, _)| 23.0 + j as f64);
        let lon = Array2::from_shape_fn((2, 2), |(_, i)| 113.0 + i as f64);
        lat[[0, 0]] = std::f64::NAN;

        assert_eq!(nearest_grid_point(&lat, &lon, 23.0, 113.0), Some((0, 1)));
        assert_eq!(nearest_grid_point(&Array2::zeros((0, 0)), &lon, 23.0, 113.0), None);
    }
}
