//! ERA5 reanalysis NetCDF files.
//!
//! Single level and pressure level downloads are read into [`GriddedDataset`]s. Every variable
//! stored on the `(time, [level,] latitude, longitude)` grid is loaded, other variables (such as
//! `expver`) are skipped.
use super::{first_variable, read_array, read_times, read_vec, require_file};
use crate::{
    error::{AnalysisError, FigureResult, Result},
    grid::{GridKind, GriddedDataset},
    sounding::{Sounding, StationInfo},
};
use chrono::NaiveDateTime;
use itertools::izip;
use log::{debug, info};
use metfor::{Celsius, HectoPascal, Meters};
use std::path::Path;

/// Standard gravity used to turn geopotential into height.
pub const GRAVITY: f64 = 9.81;

/// Divisor turning geopotential in m²/s² into decameters.
pub const GEOPOTENTIAL_TO_DAM: f64 = 98.1;

/// Open the single level file, mean sea level pressure is converted to hPa.
pub fn open_surface(path: &Path) -> FigureResult<GriddedDataset> {
    open_dataset(path, GridKind::Surface, &[("msl", 100.0)])
}

/// Open the pressure level file, geopotential is converted to decameters.
pub fn open_pressure_levels(path: &Path) -> FigureResult<GriddedDataset> {
    open_dataset(path, GridKind::PressureLevels, &[("z", GEOPOTENTIAL_TO_DAM)])
}

/// Open the pressure level file for the area around the station, units are left as stored.
pub fn open_single_station(path: &Path) -> FigureResult<GriddedDataset> {
    open_dataset(path, GridKind::PressureLevels, &[])
}

fn open_dataset(
    path: &Path,
    kind: GridKind,
    divisors: &[(&str, f64)],
) -> FigureResult<GriddedDataset> {
    require_file(path)?;
    let file = netcdf::open(path)?;

    let missing = |what: &str| AnalysisError::MissingVariable(what.to_owned());

    let time_name = first_variable(&file, &["valid_time", "time"]).ok_or_else(|| missing("valid_time"))?;
    let lat_name = first_variable(&file, &["latitude", "lat"]).ok_or_else(|| missing("latitude"))?;
    let lon_name = first_variable(&file, &["longitude", "lon"]).ok_or_else(|| missing("longitude"))?;
    let level_name = match kind {
        GridKind::Surface => None,
        GridKind::PressureLevels => Some(
            first_variable(&file, &["pressure_level", "level"])
                .ok_or_else(|| missing("pressure_level"))?,
        ),
    };

    let times = read_times(&file, time_name)?;
    let latitude = read_vec(&file, lat_name)?;
    let longitude = read_vec(&file, lon_name)?;
    let levels = match level_name {
        Some(name) => read_vec(&file, name)?,
        None => vec![],
    };

    let mut expected = vec![times.len()];
    if kind == GridKind::PressureLevels {
        expected.push(levels.len());
    }
    expected.push(latitude.len());
    expected.push(longitude.len());

    let coordinates = [Some(time_name), Some(lat_name), Some(lon_name), level_name];
    let names: Vec<String> = file
        .variables()
        .map(|var| var.name())
        .filter(|name| !coordinates.contains(&Some(name.as_str())))
        .collect();

    let mut ds = GriddedDataset::new(kind, times, levels, latitude, longitude);
    for name in names {
        let shape: Vec<usize> = match file.variable(&name) {
            Some(var) => var.dimensions().iter().map(|d| d.len()).collect(),
            None => continue,
        };
        if shape != expected {
            debug!("skipping {} with shape {:?}", name, shape);
            continue;
        }

        let mut values = read_array(&file, &name)?;
        if let Some((_, divisor)) = divisors.iter().find(|(n, _)| *n == name) {
            values.mapv_inplace(|v| v / divisor);
        }
        ds = ds.with_variable(name, values)?;
    }

    info!(
        "loaded {} ({} variables)",
        path.display(),
        ds.variable_names().count()
    );

    Ok(ds)
}

/// The sounding at the grid point nearest `lat`/`lon` from a pressure level dataset in stored
/// units: temperature `t` (K), specific humidity `q` (kg/kg), geopotential `z` (m²/s²) and the
/// wind components `u`/`v` (m/s).
///
/// The levels are ordered by decreasing pressure.
pub fn column_at(
    ds: &GriddedDataset,
    lat: f64,
    lon: f64,
    time: NaiveDateTime,
) -> Result<Sounding> {
    let t = ds.column("t", time, lat, lon)?;
    let q = ds.column("q", time, lat, lon)?;
    let z = ds.column("z", time, lat, lon)?;
    let u = ds.column("u", time, lat, lon)?;
    let v = ds.column("v", time, lat, lon)?;

    let mut rows: Vec<(f64, f64, f64, f64, f64, f64)> =
        izip!(ds.pressure_level(), &t, &q, &z, &u, &v)
            .map(|(&p, &t, &q, &z, &u, &v)| {
                let td = metfor::dew_point_from_p_and_specific_humidity(HectoPascal(p), q)
                    .map(|td| td.0)
                    .unwrap_or(std::f64::NAN);
                (p, t - 273.15, td, z / GRAVITY, u, v)
            })
            .collect();
    rows.sort_by(|a, b| b.0.total_cmp(&a.0));

    let pressure = rows.iter().map(|r| optional::some(HectoPascal(r.0))).collect();
    let temperature = rows.iter().map(|r| super::optioned(r.1, Celsius)).collect();
    let dew_point = rows.iter().map(|r| super::optioned(r.2, Celsius)).collect();
    let height = rows.iter().map(|r| super::optioned(r.3, Meters)).collect();
    let u: Vec<f64> = rows.iter().map(|r| r.4).collect();
    let v: Vec<f64> = rows.iter().map(|r| r.5).collect();

    Sounding::new()
        .with_source_description("ERA5 pressure levels")
        .with_station_info(StationInfo::new().with_lat_lon((lat, lon)))
        .with_valid_time(time)
        .with_pressure_profile(pressure)
        .with_temperature_profile(temperature)
        .with_dew_point_profile(dew_point)
        .with_height_profile(height)
        .with_wind_components(&u, &v)
        .validate()
}

#[cfg(test)]
mod test {
    use super::*;
    use chrono::NaiveDate;
    use ndarray::{ArrayD, IxDyn};

    fn station_dataset() -> (GriddedDataset, NaiveDateTime) {
        let t0 = NaiveDate::from_ymd_opt(2024, 4, 27)
            .and_then(|d| d.and_hms_opt(7, 0, 0))
            .unwrap();
        // Stored top down, as ERA5 does.
        let levels = vec![500.0, 850.0, 1000.0];
        let shape = IxDyn(&[1, 3, 2, 2]);

        let by_level = |vals: [f64; 3]| {
            ArrayD::from_shape_fn(shape.clone(), |idx| vals[idx[1]])
        };

        let ds = GriddedDataset::new(
            GridKind::PressureLevels,
            vec![t0],
            levels,
            vec![23.4, 23.1],
            vec![113.2, 113.45],
        )
        .with_variable("t", by_level([266.0, 292.0, 301.0]))
        .and_then(|ds| ds.with_variable("q", by_level([0.002, 0.013, 0.018])))
        .and_then(|ds| ds.with_variable("z", by_level([57_000.0, 14_700.0, 900.0])))
        .and_then(|ds| ds.with_variable("u", by_level([20.0, 8.0, 2.0])))
        .and_then(|ds| ds.with_variable("v", by_level([5.0, 10.0, 4.0])))
        .unwrap();

        (ds, t0)
    }

    #[test]
    fn test_column_is_bottom_up() {
        let (ds, t0) = station_dataset();
        let snd = column_at(&ds, 23.1, 113.45, t0).unwrap();

        let p: Vec<f64> = snd
            .pressure_profile()
            .iter()
            .map(|p| p.unwrap().0)
            .collect();
        assert_eq!(p, vec![1000.0, 850.0, 500.0]);

        let t0_c = snd.temperature_profile()[0].unwrap().0;
        assert!((t0_c - 27.85).abs() < 1.0e-9);

        let z0 = snd.height_profile()[0].unwrap().0;
        assert!((z0 - 900.0 / GRAVITY).abs() < 1.0e-9);

        // Dew point never above the temperature.
        for (t, td) in snd.temperature_profile().iter().zip(snd.dew_point_profile()) {
            assert!(td.unwrap().0 <= t.unwrap().0);
        }
    }

    #[test]
    fn test_column_needs_humidity() {
        let t0 = NaiveDate::from_ymd_opt(2024, 4, 27)
            .and_then(|d| d.and_hms_opt(7, 0, 0))
            .unwrap();
        let ds = GriddedDataset::new(
            GridKind::PressureLevels,
            vec![t0],
            vec![1000.0],
            vec![23.1],
            vec![113.45],
        )
        .with_variable("t", ArrayD::from_elem(IxDyn(&[1, 1, 1, 1]), 300.0))
        .unwrap();

        match column_at(&ds, 23.1, 113.45, t0) {
            Err(AnalysisError::MissingVariable(name)) => assert_eq!(name, "q"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(open_surface(&dir.path().join("surface.nc")).is_err());
    }
}
