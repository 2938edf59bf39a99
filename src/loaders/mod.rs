//! Readers for the input datasets of the case study.
//!
//! Each submodule reads one source into the types the figures draw from: [`GriddedDataset`]s and
//! [`Sounding`]s for ERA5, [`Sounding`]s for MICAPS station data, and [`wrf::WrfOutput`] for WRF
//! model output.
//!
//! [`GriddedDataset`]: crate::GriddedDataset
//! [`Sounding`]: crate::Sounding
use crate::error::{AnalysisError, FigureError, FigureResult};
use chrono::{Duration, NaiveDate, NaiveDateTime};
use ndarray::{ArrayD, IxDyn};
use optional::Optioned;
use std::path::Path;

pub mod era5;
pub mod fetch;
pub mod micaps;
pub mod wrf;

pub use self::{
    era5::{column_at, open_pressure_levels, open_single_station, open_surface},
    fetch::{open_or_fetch, CommandFetcher, Fetch, NoFetcher, RetrievalRequest},
    micaps::{
        parse_diamond5, read_diamond5, record_to_sounding, station_sounding, Diamond5, StationRecord,
    },
    wrf::{nearest_grid_point, wrf_path, WrfOutput},
};

/// Fail with `MissingInput` unless the file exists.
pub(crate) fn require_file(path: &Path) -> FigureResult<()> {
    if path.is_file() {
        Ok(())
    } else {
        Err(FigureError::MissingInput(path.to_path_buf()))
    }
}

/// A numeric attribute of a variable.
fn attribute_f64(var: &netcdf::Variable, name: &str) -> Option<f64> {
    var.attribute_value(name)
        .and_then(|r| r.ok())
        .and_then(attribute_value_f64)
}

/// A numeric global attribute of a file.
pub(crate) fn global_f64(file: &netcdf::File, name: &str) -> Option<f64> {
    file.attribute(name)
        .and_then(|attr| attr.value().ok())
        .and_then(attribute_value_f64)
}

fn attribute_value_f64(value: netcdf::AttributeValue) -> Option<f64> {
    use netcdf::AttributeValue::*;

    match value {
        Double(d) => Some(d),
        Float(f) => Some(f64::from(f)),
        Int(i) => Some(f64::from(i)),
        Short(s) => Some(f64::from(s)),
        Longlong(l) => Some(l as f64),
        Doubles(ds) => ds.first().copied(),
        Floats(fs) => fs.first().map(|&f| f64::from(f)),
        Ints(is) => is.first().map(|&i| f64::from(i)),
        _ => None,
    }
}

/// A string attribute of a variable.
fn attribute_str(var: &netcdf::Variable, name: &str) -> Option<String> {
    match var.attribute_value(name).and_then(|r| r.ok()) {
        Some(netcdf::AttributeValue::Str(s)) => Some(s),
        _ => None,
    }
}

/// Read a whole variable as `f64` with its shape.
///
/// Packed variables are unpacked with `scale_factor` and `add_offset`, values equal to
/// `_FillValue` or `missing_value` become NaN.
pub(crate) fn read_array(file: &netcdf::File, name: &str) -> FigureResult<ArrayD<f64>> {
    let var = file
        .variable(name)
        .ok_or_else(|| AnalysisError::MissingVariable(name.to_owned()))?;

    let shape: Vec<usize> = var.dimensions().iter().map(|d| d.len()).collect();
    let raw: Vec<f64> = var.get_values(..)?;

    let scale = attribute_f64(&var, "scale_factor").unwrap_or(1.0);
    let offset = attribute_f64(&var, "add_offset").unwrap_or(0.0);
    let fill = attribute_f64(&var, "_FillValue");
    let missing = attribute_f64(&var, "missing_value");

    let values: Vec<f64> = raw
        .into_iter()
        .map(|v| {
            if Some(v) == fill || Some(v) == missing || !v.is_finite() {
                std::f64::NAN
            } else {
                v * scale + offset
            }
        })
        .collect();

    ArrayD::from_shape_vec(IxDyn(&shape), values).map_err(|_| {
        AnalysisError::InvalidInput("variable size does not match its dimensions").into()
    })
}

/// Read a one dimensional variable.
pub(crate) fn read_vec(file: &netcdf::File, name: &str) -> FigureResult<Vec<f64>> {
    Ok(read_array(file, name)?.into_iter().collect())
}

/// The first of `names` that is a variable in `file`.
pub(crate) fn first_variable<'a>(file: &netcdf::File, names: &[&'a str]) -> Option<&'a str> {
    names.iter().copied().find(|&n| file.variable(n).is_some())
}

/// Decode a CF time coordinate.
pub(crate) fn read_times(file: &netcdf::File, name: &str) -> FigureResult<Vec<NaiveDateTime>> {
    let var = file
        .variable(name)
        .ok_or_else(|| AnalysisError::MissingVariable(name.to_owned()))?;
    let units = attribute_str(&var, "units")
        .unwrap_or_else(|| "seconds since 1970-01-01 00:00:00".to_owned());
    let values = read_vec(file, name)?;

    decode_times(&values, &units)
}

/// Convert offsets in CF `"<unit> since <date>"` units to times.
pub(crate) fn decode_times(values: &[f64], units: &str) -> FigureResult<Vec<NaiveDateTime>> {
    let bad_units = || AnalysisError::Selection(format!("unsupported time units '{}'", units));

    let mut parts = units.splitn(2, " since ");
    let unit = parts.next().ok_or_else(bad_units)?.trim();
    let epoch = parts.next().ok_or_else(bad_units)?.trim();

    let seconds_per_unit = match unit {
        "seconds" | "second" | "s" => 1.0,
        "minutes" | "minute" => 60.0,
        "hours" | "hour" | "h" => 3600.0,
        "days" | "day" => 86400.0,
        _ => return Err(bad_units().into()),
    };
    let epoch = parse_epoch(epoch).ok_or_else(bad_units)?;

    Ok(values
        .iter()
        .map(|v| epoch + Duration::seconds((v * seconds_per_unit).round() as i64))
        .collect())
}

fn parse_epoch(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim_end_matches('Z').replace('T', " ");
    for fmt in &["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%d %H:%M"] {
        if let Ok(t) = NaiveDateTime::parse_from_str(&text, fmt) {
            return Some(t);
        }
    }

    NaiveDate::parse_from_str(&text, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// NaN becomes a missing value.
pub(crate) fn optioned<T, F>(value: f64, wrap: F) -> Optioned<T>
where
    T: optional::Noned + Copy,
    F: Fn(f64) -> T,
{
    if value.is_finite() {
        optional::some(wrap(value))
    } else {
        optional::none()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_decode_seconds_since_epoch() {
        let times = decode_times(&[1714194000.0], "seconds since 1970-01-01").unwrap();
        let expected = NaiveDate::from_ymd_opt(2024, 4, 27)
            .and_then(|d| d.and_hms_opt(5, 0, 0))
            .unwrap();
        assert_eq!(times, vec![expected]);
    }

    #[test]
    fn test_decode_hours_since_1900() {
        let times = decode_times(&[1.0, 25.0], "hours since 1900-01-01 00:00:00.0").unwrap();
        assert_eq!(times[0].to_string(), "1900-01-01 01:00:00");
        assert_eq!(times[1].to_string(), "1900-01-02 01:00:00");
    }

    #[test]
    fn test_decode_rejects_unknown_units() {
        assert!(decode_times(&[1.0], "fortnights since 1900-01-01").is_err());
        assert!(decode_times(&[1.0], "seconds").is_err());
    }

    #[test]
    fn test_require_file() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nothing.nc");
        match require_file(&missing) {
            Err(FigureError::MissingInput(path)) => assert_eq!(path, missing),
            other => panic!("unexpected {:?}", other),
        }
    }
}
