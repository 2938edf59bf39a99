#![allow(dead_code)]

use chrono::{NaiveDate, NaiveDateTime};
use metfor::{Celsius, HectoPascal, Knots, Meters, WindSpdDir};
use ndarray::{Array, ArrayD, Dimension, IxDyn};
use optional::some;
use std::path::PathBuf;
use tornado_figures::{loaders::station_sounding, GridKind, GriddedDataset, Sounding, StationInfo};

#[allow(unused_macros)] // Not every test file checks parcel paths.
macro_rules! parcel_path_domain {
    ($test_name:ident, $snd:expr) => {
        #[test]
        fn $test_name() {
            let snd: tornado_figures::Sounding = $snd;
            let path = tornado_figures::parcel_temperature_profile(&snd)
                .expect("parcel path failed");

            let pressure: Vec<_> = snd
                .pressure_profile()
                .iter()
                .map(|p| p.unwrap())
                .collect();

            assert!(!path.pressure.is_empty());
            assert_eq!(path.pressure, pressure);
            assert_eq!(path.temperature.len(), pressure.len());

            // Lifted from the surface, so it starts at the surface temperature and cools.
            let sfc_t = snd.temperature_profile()[0].unwrap();
            approx::assert_abs_diff_eq!(path.temperature[0].0, sfc_t.0, epsilon = 1.0e-6);
            for pair in path.temperature.windows(2) {
                assert!(pair[1] <= pair[0]);
            }
        }
    };
}

/// Pressure levels of the standard atmosphere profile.
pub const STANDARD_PRESSURE: [f64; 11] = [
    1000.0, 925.0, 850.0, 700.0, 500.0, 400.0, 300.0, 250.0, 200.0, 150.0, 100.0,
];

/// Geopotential heights of the standard atmosphere at `STANDARD_PRESSURE`.
pub const STANDARD_HEIGHT: [f64; 11] = [
    111.0, 762.0, 1457.0, 3012.0, 5574.0, 7185.0, 9164.0, 10363.0, 11784.0, 13608.0, 16180.0,
];

/// A dry standard atmosphere, 6.5 K/km up to the tropopause at 11 km, isothermal above, and a
/// 20 K dew point depression everywhere.
pub fn standard_atmosphere() -> Sounding {
    let t: Vec<f64> = STANDARD_HEIGHT
        .iter()
        .map(|z| 15.0 - 6.5 * z.min(11_000.0) / 1000.0)
        .collect();

    Sounding::new()
        .with_source_description("standard atmosphere")
        .with_station_info(StationInfo::new().with_elevation(Meters(111.0)))
        .with_pressure_profile(STANDARD_PRESSURE.iter().map(|&p| some(HectoPascal(p))).collect())
        .with_height_profile(STANDARD_HEIGHT.iter().map(|&z| some(Meters(z))).collect())
        .with_temperature_profile(t.iter().map(|&t| some(Celsius(t))).collect())
        .with_dew_point_profile(t.iter().map(|&t| some(Celsius(t - 20.0))).collect())
        .with_wind_profile(
            STANDARD_HEIGHT
                .iter()
                .map(|z| {
                    some(WindSpdDir {
                        speed: Knots(10.0 + z / 500.0),
                        direction: 240.0,
                    })
                })
                .collect(),
        )
        .validate()
        .expect("standard atmosphere is valid")
}

/// Path of a file under `tests/data`.
pub fn test_data(fname: &str) -> PathBuf {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("data");
    path.push(fname);
    path
}

/// The Qingyuan sounding from the MICAPS fixture, levels below 1200 dam.
pub fn load_station_sounding() -> Sounding {
    station_sounding(&test_data("20240427080000.000"), "59280", 1200.0)
        .expect("error loading the station fixture")
}

/// The valid time used by the gridded test datasets.
pub fn valid_time() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 4, 27)
        .and_then(|d| d.and_hms_opt(5, 0, 0))
        .expect("valid date")
}

/// A small dataset of the given kind with a `t` variable that increases to the north-east.
pub fn small_dataset(kind: GridKind) -> GriddedDataset {
    let latitude = vec![24.0, 23.5, 23.0, 22.5];
    let longitude = vec![112.5, 113.0, 113.5, 114.0, 114.5];
    let levels = vec![850.0, 500.0];

    let shape: Vec<usize> = match kind {
        GridKind::Surface => vec![1, latitude.len(), longitude.len()],
        GridKind::PressureLevels => vec![1, levels.len(), latitude.len(), longitude.len()],
    };
    let values: ArrayD<f64> = Array::from_shape_fn(IxDyn(&shape), |idx| {
        let n = idx.ndim();
        280.0 - idx[n - 2] as f64 + idx[n - 1] as f64
    });

    GriddedDataset::new(kind, vec![valid_time()], levels, latitude, longitude)
        .with_variable("t", values)
        .expect("shape matches")
}
