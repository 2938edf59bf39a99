//! Settings of the case study.
//!
//! Every value has a default that reproduces the figures of the 2024-04-27 Guangzhou tornado,
//! a TOML file only needs the settings that differ.
use crate::{
    boundaries::BoundaryFiles,
    error::{FigureError, FigureResult},
    fonts::DEFAULT_FONT_FAMILY,
    grid::BoundingBox,
    map::TORNADO_LOCATION,
};
use chrono::{Duration, NaiveDate, NaiveDateTime};
use log::info;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// A point, latitude and longitude in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct LatLon {
    /// Degrees north.
    pub lat: f64,
    /// Degrees east.
    pub lon: f64,
}

impl LatLon {
    /// `(lat, lon)` tuple as used by the maps.
    pub fn pair(self) -> (f64, f64) {
        (self.lat, self.lon)
    }
}

/// The straight path of the vertical cross section, centered on a point.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct CrossSectionPath {
    /// Middle of the path.
    pub center: LatLon,
    /// Half of the latitude span, degrees.
    pub lat_half_width: f64,
    /// Half of the longitude span, degrees.
    pub lon_half_width: f64,
}

impl Default for CrossSectionPath {
    fn default() -> Self {
        CrossSectionPath {
            center: LatLon {
                lat: 23.238,
                lon: 113.75,
            },
            lat_half_width: 0.025,
            lon_half_width: 0.025 * 12.0,
        }
    }
}

impl CrossSectionPath {
    /// South west end.
    pub fn start(&self) -> (f64, f64) {
        (
            self.center.lat - self.lat_half_width,
            self.center.lon - self.lon_half_width,
        )
    }

    /// North east end.
    pub fn end(&self) -> (f64, f64) {
        (
            self.center.lat + self.lat_half_width,
            self.center.lon + self.lon_half_width,
        )
    }
}

/// The radiosonde file and the station to draw.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct StationSounding {
    /// MICAPS type 5 file.
    pub path: PathBuf,
    /// Station id.
    pub station_id: String,
    /// Levels at or above this height (dam) are dropped.
    pub max_height_dam: f64,
}

impl Default for StationSounding {
    fn default() -> Self {
        StationSounding {
            path: PathBuf::from("data/UPPER_AIR/TLOGP/20240427080000.000"),
            station_id: "59280".to_owned(),
            max_height_dam: 1200.0,
        }
    }
}

/// Input files.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct DataPaths {
    /// ERA5 single level fields.
    pub surface: PathBuf,
    /// ERA5 pressure level fields.
    pub geopotential: PathBuf,
    /// ERA5 pressure level columns around Guangzhou.
    pub single_station: PathBuf,
    /// Directory holding the `dNN` WRF output directories.
    pub wrfout_dir: PathBuf,
}

impl Default for DataPaths {
    fn default() -> Self {
        let data = PathBuf::from("data");
        DataPaths {
            surface: data.join("surface.nc"),
            geopotential: data.join("geopotential.nc"),
            single_station: data.join("single_station.nc"),
            wrfout_dir: data.join("wrfout"),
        }
    }
}

/// Everything that varies between runs of the figures.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct CaseConfig {
    /// Valid time of the ERA5 synoptic charts, UTC.
    pub synoptic_time: NaiveDateTime,
    /// Valid time of the radiosonde, UTC.
    pub station_time: NaiveDateTime,
    /// Valid time of the ERA5 and WRF model soundings, UTC.
    pub sounding_time: NaiveDateTime,
    /// Valid time of the WRF reflectivity and vorticity figures, as in the output file names.
    pub wrf_time: NaiveDateTime,
    /// Hours added to UTC for the titles (China Standard Time).
    pub utc_offset_hours: i64,
    /// Where the tornado touched down.
    pub tornado: LatLon,
    /// The grid point of the ERA5 model sounding.
    pub era5_station: LatLon,
    /// Station label of the ERA5 model sounding.
    pub era5_station_label: String,
    /// Station label of the radiosonde.
    pub station_label: String,
    /// `[west, east, south, north]` of the South China maps.
    pub south_china: [f64; 4],
    /// The vertical cross section.
    pub cross_section: CrossSectionPath,
    /// Pressure levels, hPa, drawn by the mesoscale analysis streamline charts.
    pub analysis_levels: Vec<f64>,
    /// The radiosonde.
    pub station: StationSounding,
    /// WRF domain of the model sounding and the 300 m reflectivity.
    pub outer_domain: u8,
    /// WRF domain of the vorticity map and the cross section.
    pub inner_domain: u8,
    /// Input files.
    pub paths: DataPaths,
    /// Boundary shapefiles.
    pub boundaries: BoundaryFiles,
    /// Font family of all text, must be able to draw Chinese.
    pub font_family: String,
    /// Command that downloads a missing ERA5 file; the request is written to its standard input
    /// and the target path appended to its arguments.
    pub fetch_command: Option<String>,
    /// Where the figures are written.
    pub output_dir: PathBuf,
}

fn case_time(hour: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 4, 27)
        .and_then(|d| d.and_hms_opt(hour, 0, 0))
        .unwrap_or_default()
}

impl Default for CaseConfig {
    fn default() -> Self {
        CaseConfig {
            synoptic_time: case_time(5),
            station_time: case_time(0),
            sounding_time: case_time(7),
            wrf_time: case_time(15),
            utc_offset_hours: 8,
            tornado: LatLon {
                lat: TORNADO_LOCATION.0,
                lon: TORNADO_LOCATION.1,
            },
            era5_station: LatLon {
                lat: 23.1,
                lon: 113.45,
            },
            era5_station_label: "59287 广州".to_owned(),
            station_label: "59280 清远".to_owned(),
            south_china: [105.0, 121.0, 20.0, 28.0],
            cross_section: CrossSectionPath::default(),
            analysis_levels: vec![500.0, 700.0, 850.0, 925.0],
            station: StationSounding::default(),
            outer_domain: 3,
            inner_domain: 4,
            paths: DataPaths::default(),
            boundaries: BoundaryFiles::default(),
            font_family: DEFAULT_FONT_FAMILY.to_owned(),
            fetch_command: None,
            output_dir: PathBuf::from("images"),
        }
    }
}

impl CaseConfig {
    /// Read a TOML file, settings it leaves out keep their defaults.
    pub fn load(path: &Path) -> FigureResult<Self> {
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_toml(&text)?;
        info!("loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Parse the TOML text of a configuration.
    pub fn from_toml(text: &str) -> FigureResult<Self> {
        let config: CaseConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> FigureResult<()> {
        let [w, e, s, n] = self.south_china;
        if !(w < e && s < n) {
            return Err(FigureError::Usage(format!(
                "south_china must be [west, east, south, north], got {:?}",
                self.south_china
            )));
        }
        if !(self.cross_section.lat_half_width >= 0.0 && self.cross_section.lon_half_width >= 0.0)
        {
            return Err(FigureError::Usage(
                "cross section half widths must not be negative".to_owned(),
            ));
        }
        Ok(())
    }

    /// The South China region as a bounding box.
    pub fn south_china_box(&self) -> BoundingBox {
        BoundingBox::from_extent(self.south_china)
    }

    /// A UTC time in the local time of the titles.
    pub fn local(&self, time: NaiveDateTime) -> NaiveDateTime {
        time + Duration::hours(self.utc_offset_hours)
    }

    /// `2024-04-27 13:00:00 CST` for a UTC time.
    pub fn title_time(&self, time: NaiveDateTime) -> String {
        format!("{} CST", self.local(time).format("%Y-%m-%d %H:%M:%S"))
    }

    /// `2024-04-27 15:00 CST` for a UTC time.
    pub fn short_title_time(&self, time: NaiveDateTime) -> String {
        format!("{} CST", self.local(time).format("%Y-%m-%d %H:%M"))
    }
}
