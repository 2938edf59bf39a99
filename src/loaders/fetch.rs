//! Retrieval of missing ERA5 downloads.
//!
//! The crate does not talk to the climate data store itself. When an input file is missing, the
//! [`RetrievalRequest`] describing it is handed to a [`Fetch`] implementation, usually a
//! [`CommandFetcher`] wrapping a user supplied download script, and the open is tried once more.
use crate::error::{FigureError, FigureResult};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::{
    io::Write,
    path::Path,
    process::{Command, Stdio},
};

/// A climate data store retrieval, serialized to TOML for the fetch command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalRequest {
    /// Dataset name, e.g. `reanalysis-era5-single-levels`.
    pub dataset: String,
    /// Product types.
    pub product_type: Vec<String>,
    /// Variables to retrieve.
    pub variable: Vec<String>,
    /// Years.
    pub year: Vec<String>,
    /// Months.
    pub month: Vec<String>,
    /// Days of the month.
    pub day: Vec<String>,
    /// Times of day, `HH:MM`.
    pub time: Vec<String>,
    /// Pressure levels in hPa, empty for single level datasets.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pressure_level: Vec<String>,
    /// Format of the data.
    pub data_format: String,
    /// Packaging of the download.
    pub download_format: String,
    /// `[north, west, south, east]`.
    pub area: [f64; 4],
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_owned()).collect()
}

fn all_hours() -> Vec<String> {
    (0..24).map(|h| format!("{:02}:00", h)).collect()
}

impl RetrievalRequest {
    /// Single level fields for the synoptic and diagnostic maps.
    pub fn single_levels() -> Self {
        RetrievalRequest {
            dataset: "reanalysis-era5-single-levels".to_owned(),
            product_type: strings(&["reanalysis"]),
            variable: strings(&[
                "vertical_integral_of_divergence_of_cloud_frozen_water_flux",
                "vertical_integral_of_divergence_of_cloud_liquid_water_flux",
                "convective_available_potential_energy",
                "10m_u_component_of_wind",
                "10m_v_component_of_wind",
                "2m_dewpoint_temperature",
                "2m_temperature",
                "surface_pressure",
                "total_precipitation",
                "mean_sea_level_pressure",
                "total_cloud_cover",
                "vertical_integral_of_eastward_water_vapour_flux",
                "vertical_integral_of_northward_water_vapour_flux",
                "vertical_integral_of_temperature",
            ]),
            year: strings(&["2024"]),
            month: strings(&["04"]),
            day: strings(&["26", "27", "28"]),
            time: all_hours(),
            pressure_level: vec![],
            data_format: "netcdf".to_owned(),
            download_format: "zip".to_owned(),
            area: [50.0, 70.0, 10.0, 140.0],
        }
    }

    /// Fields on the standard levels for the synoptic maps.
    pub fn pressure_levels() -> Self {
        RetrievalRequest {
            dataset: "reanalysis-era5-pressure-levels".to_owned(),
            product_type: strings(&["reanalysis"]),
            variable: strings(&[
                "divergence",
                "geopotential",
                "potential_vorticity",
                "relative_humidity",
                "specific_humidity",
                "temperature",
                "u_component_of_wind",
                "v_component_of_wind",
                "vertical_velocity",
                "vorticity",
            ]),
            year: strings(&["2024"]),
            month: strings(&["04"]),
            day: strings(&["26", "27", "28"]),
            time: all_hours(),
            pressure_level: strings(&["500", "700", "850", "925"]),
            data_format: "netcdf".to_owned(),
            download_format: "unarchived".to_owned(),
            area: [60.0, 60.0, 10.0, 140.0],
        }
    }

    /// All 37 levels over a small area around Guangzhou for the reanalysis sounding.
    pub fn single_station() -> Self {
        RetrievalRequest {
            dataset: "reanalysis-era5-pressure-levels".to_owned(),
            product_type: strings(&["reanalysis"]),
            variable: strings(&[
                "geopotential",
                "relative_humidity",
                "specific_humidity",
                "temperature",
                "u_component_of_wind",
                "v_component_of_wind",
            ]),
            year: strings(&["2024"]),
            month: strings(&["04"]),
            day: strings(&["26", "27", "28"]),
            time: strings(&["00:00", "04:00", "05:00", "06:00", "07:00", "08:00", "12:00"]),
            pressure_level: strings(&[
                "1", "2", "3", "5", "7", "10", "20", "30", "50", "70", "100", "125", "150", "175",
                "200", "225", "250", "300", "350", "400", "450", "500", "550", "600", "650", "700",
                "750", "775", "800", "825", "850", "875", "900", "925", "950", "975", "1000",
            ]),
            data_format: "netcdf".to_owned(),
            download_format: "unarchived".to_owned(),
            area: [23.4, 113.2, 23.1, 113.5],
        }
    }

    /// The request as TOML.
    pub fn to_toml(&self) -> FigureResult<String> {
        toml::to_string(self).map_err(|err| FigureError::Fetch(err.to_string()))
    }
}

/// Something that can produce a missing input file.
pub trait Fetch {
    /// Retrieve the data described by `request` into `target`.
    fn fetch(&self, request: &RetrievalRequest, target: &Path) -> FigureResult<()>;
}

/// Runs an external command to do the download.
///
/// The request is written as TOML to the command's standard input and the target path is
/// appended to its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandFetcher {
    program: String,
    args: Vec<String>,
}

impl CommandFetcher {
    /// Create a fetcher for a program and its leading arguments.
    pub fn new<S: Into<String>>(program: S, args: Vec<String>) -> Self {
        CommandFetcher {
            program: program.into(),
            args,
        }
    }

    /// Split a command line on whitespace, `None` if it is blank.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use tornado_figures::loaders::CommandFetcher;
    ///
    /// let fetcher = CommandFetcher::from_command_line("python3 scripts/cds_fetch.py").unwrap();
    /// assert_eq!(fetcher, CommandFetcher::new("python3", vec!["scripts/cds_fetch.py".to_owned()]));
    /// assert!(CommandFetcher::from_command_line("  ").is_none());
    /// ```
    pub fn from_command_line(line: &str) -> Option<Self> {
        let mut words = line.split_whitespace().map(str::to_owned);
        let program = words.next()?;
        Some(CommandFetcher::new(program, words.collect()))
    }
}

impl Fetch for CommandFetcher {
    fn fetch(&self, request: &RetrievalRequest, target: &Path) -> FigureResult<()> {
        let body = request.to_toml()?;
        info!(
            "running {} to retrieve {} into {}",
            self.program,
            request.dataset,
            target.display()
        );

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .arg(target)
            .stdin(Stdio::piped())
            .spawn()?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(body.as_bytes())?;
        }

        let status = child.wait()?;
        if status.success() {
            Ok(())
        } else {
            Err(FigureError::Fetch(format!(
                "{} exited with {} while retrieving {}",
                self.program, status, request.dataset
            )))
        }
    }
}

/// Used when no fetch command is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoFetcher;

impl Fetch for NoFetcher {
    fn fetch(&self, request: &RetrievalRequest, target: &Path) -> FigureResult<()> {
        Err(FigureError::Fetch(format!(
            "{} is missing and no fetch command is configured, download {} ({}) there by hand",
            target.display(),
            request.dataset,
            request.variable.join(", ")
        )))
    }
}

/// Open `path`, retrieving it first with `fetcher` if it does not exist.
///
/// The fetcher is called at most once and the open is retried at most once, there is no backoff.
pub fn open_or_fetch<T, F>(
    path: &Path,
    request: &RetrievalRequest,
    fetcher: &dyn Fetch,
    open: F,
) -> FigureResult<T>
where
    F: Fn(&Path) -> FigureResult<T>,
{
    if path.exists() {
        return open(path);
    }

    warn!("{} not found, retrieving {}", path.display(), request.dataset);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    fetcher.fetch(request, path)?;

    open(path)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_requests_serialize() {
        let text = RetrievalRequest::single_levels().to_toml().unwrap();
        assert!(text.contains("reanalysis-era5-single-levels"));
        assert!(text.contains("mean_sea_level_pressure"));
        // Single level requests have no levels.
        assert!(!text.contains("pressure_level"));

        let text = RetrievalRequest::pressure_levels().to_toml().unwrap();
        assert!(text.contains("pressure_level"));

        let back: RetrievalRequest = toml::from_str(&text).unwrap();
        assert_eq!(back, RetrievalRequest::pressure_levels());
    }

    #[test]
    fn test_request_constants() {
        assert_eq!(RetrievalRequest::single_station().pressure_level.len(), 37);
        assert_eq!(RetrievalRequest::single_levels().time.len(), 24);
        assert_eq!(RetrievalRequest::pressure_levels().area, [60.0, 60.0, 10.0, 140.0]);
    }

    #[test]
    fn test_no_fetcher_fails() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("surface.nc");
        let result = open_or_fetch(&target, &RetrievalRequest::single_levels(), &NoFetcher, |_| {
            Ok(())
        });
        assert!(matches!(result, Err(FigureError::Fetch(_))));
    }

    #[test]
    fn test_existing_file_is_not_fetched() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let value = open_or_fetch(file.path(), &RetrievalRequest::single_levels(), &NoFetcher, |_| {
            Ok(42)
        })
        .unwrap();
        assert_eq!(value, 42);
    }
}
