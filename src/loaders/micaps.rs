//! MICAPS type 5 (diamond 5) upper air station files.
//!
//! The format is whitespace separated text:
//!
//! ```text
//! diamond 5 <description>
//! <year> <month> <day> <hour> <station count>
//! <id> <lon> <lat> <elevation> <value count>
//! <pressure> <height> <temperature> <dew point> <wind direction> <wind speed>
//! ...
//! ```
//!
//! Heights are in decameters, temperatures in °C, wind speeds in m/s, and 9999 marks a missing
//! value. Line breaks carry no meaning, records may wrap anywhere.
use crate::{
    error::{FigureError, FigureResult},
    sounding::{Sounding, StationInfo},
};
use chrono::{NaiveDate, NaiveDateTime};
use log::{debug, info};
use metfor::{Celsius, HectoPascal, Knots, Meters, MetersPSec, WindSpdDir};
use std::path::Path;

/// Value marking missing data.
pub const MISSING: f64 = 9999.0;

/// Message shown when the licensed station data has not been installed.
pub const LICENSED_DATA_MESSAGE: &str =
    "该数据并不公开提供获取，且作者受协议限制，无法提供";

const VALUES_PER_LEVEL: usize = 6;

/// One station of a diamond 5 file.
#[derive(Debug, Clone, PartialEq)]
pub struct StationRecord {
    /// Station id, e.g. `59280`.
    pub id: String,
    /// Longitude, degrees east.
    pub lon: f64,
    /// Latitude, degrees north.
    pub lat: f64,
    /// Elevation in meters.
    pub elevation: f64,
    /// Levels as `[pressure, height, temperature, dew point, wind direction, wind speed]`,
    /// missing values are NaN.
    pub levels: Vec<[f64; 6]>,
}

/// A parsed diamond 5 file.
#[derive(Debug, Clone, PartialEq)]
pub struct Diamond5 {
    /// Free text after the `diamond 5` marker.
    pub description: String,
    /// Observation time as written in the file.
    pub time: Option<NaiveDateTime>,
    /// The stations.
    pub stations: Vec<StationRecord>,
}

impl Diamond5 {
    /// Find a station by id.
    pub fn station(&self, id: &str) -> Option<&StationRecord> {
        self.stations.iter().find(|s| s.id == id)
    }
}

/// Whitespace separated tokens with the line they were found on.
struct Tokens<'a> {
    file: &'a str,
    tokens: Vec<(usize, &'a str)>,
    next: usize,
}

impl<'a> Tokens<'a> {
    fn new(file: &'a str, text: &'a str, skip_lines: usize) -> Self {
        let tokens = text
            .lines()
            .enumerate()
            .skip(skip_lines)
            .flat_map(|(n, line)| line.split_whitespace().map(move |tok| (n + 1, tok)))
            .collect();

        Tokens {
            file,
            tokens,
            next: 0,
        }
    }

    fn error(&self, line: usize, message: String) -> FigureError {
        FigureError::Parse {
            file: self.file.to_owned(),
            line,
            message,
        }
    }

    fn last_line(&self) -> usize {
        self.tokens.last().map(|t| t.0).unwrap_or(1)
    }

    fn peek_line(&self) -> usize {
        self.tokens
            .get(self.next)
            .map(|t| t.0)
            .unwrap_or_else(|| self.last_line())
    }

    fn word(&mut self, what: &str) -> FigureResult<(usize, &'a str)> {
        let tok = self.tokens.get(self.next).copied().ok_or_else(|| {
            self.error(self.last_line(), format!("unexpected end of file, expected {}", what))
        })?;
        self.next += 1;
        Ok(tok)
    }

    fn number(&mut self, what: &str) -> FigureResult<f64> {
        let (line, tok) = self.word(what)?;
        let value: f64 = tok
            .parse()
            .map_err(|_| self.error(line, format!("expected {}, found '{}'", what, tok)))?;

        if value == MISSING {
            Ok(std::f64::NAN)
        } else {
            Ok(value)
        }
    }

    fn count(&mut self, what: &str) -> FigureResult<usize> {
        let (line, tok) = self.word(what)?;
        tok.parse()
            .map_err(|_| self.error(line, format!("expected {}, found '{}'", what, tok)))
    }
}

/// Parse the text of a diamond 5 file, `file` names it in error messages.
///
/// # Examples
///
/// ```rust
/// use tornado_figures::loaders::parse_diamond5;
///
/// let text = "diamond 5 upper air\n24 04 27 08 1\n59280 113.08 23.72 19 12\n\
///             1000 11 24.0 21.0 140 4\n925 78 21.0 19.0 9999 9999\n";
/// let parsed = parse_diamond5(text, "example").unwrap();
///
/// let station = parsed.station("59280").unwrap();
/// assert_eq!(station.levels.len(), 2);
/// assert!(station.levels[1][4].is_nan());
/// ```
pub fn parse_diamond5(text: &str, file: &str) -> FigureResult<Diamond5> {
    let header = text.lines().next().unwrap_or("");
    let mut words = header.split_whitespace();
    let is_diamond5 = matches!(
        (words.next(), words.next()),
        (Some(d), Some("5")) if d.eq_ignore_ascii_case("diamond")
    );
    if !is_diamond5 {
        return Err(FigureError::Parse {
            file: file.to_owned(),
            line: 1,
            message: "not a diamond 5 file".to_owned(),
        });
    }
    let description = words.collect::<Vec<_>>().join(" ");

    let mut tokens = Tokens::new(file, text, 1);

    let year = tokens.number("year")?;
    let month = tokens.number("month")?;
    let day = tokens.number("day")?;
    let hour = tokens.number("hour")?;
    let year = if year < 100.0 { year + 2000.0 } else { year };
    let time = NaiveDate::from_ymd_opt(year as i32, month as u32, day as u32)
        .and_then(|d| d.and_hms_opt(hour as u32, 0, 0));

    let n_stations = tokens.count("station count")?;
    let mut stations = Vec::with_capacity(n_stations);

    for _ in 0..n_stations {
        let (_, id) = tokens.word("station id")?;
        let lon = tokens.number("longitude")?;
        let lat = tokens.number("latitude")?;
        let elevation = tokens.number("elevation")?;
        let line = tokens.peek_line();
        let n_values = tokens.count("value count")?;
        if n_values % VALUES_PER_LEVEL != 0 {
            return Err(tokens.error(
                line,
                format!(
                    "station {} has {} values, not a multiple of {}",
                    id, n_values, VALUES_PER_LEVEL
                ),
            ));
        }

        let mut levels = Vec::with_capacity(n_values / VALUES_PER_LEVEL);
        for _ in 0..n_values / VALUES_PER_LEVEL {
            let mut level = [0.0; VALUES_PER_LEVEL];
            for value in level.iter_mut() {
                *value = tokens.number("level value")?;
            }
            levels.push(level);
        }

        stations.push(StationRecord {
            id: id.to_owned(),
            lon,
            lat,
            elevation,
            levels,
        });
    }

    debug!("{}: {} stations", file, stations.len());

    Ok(Diamond5 {
        description,
        time,
        stations,
    })
}

/// Read and parse a diamond 5 file.
pub fn read_diamond5(path: &Path) -> FigureResult<Diamond5> {
    let text = std::fs::read_to_string(path)?;
    parse_diamond5(&text, &path.display().to_string())
}

/// The sounding of one station, keeping the levels below `max_height_dam` decameters.
///
/// The station files are licensed data. A missing file fails with
/// [`FigureError::LicensedDataMissing`].
pub fn station_sounding(path: &Path, station_id: &str, max_height_dam: f64) -> FigureResult<Sounding> {
    if !path.is_file() {
        return Err(FigureError::LicensedDataMissing(format!(
            "未找到 NMC 单站探空数据 {}，请先下载并解压缩到该目录下\n{}",
            path.display(),
            LICENSED_DATA_MESSAGE
        )));
    }

    let parsed = read_diamond5(path)?;
    let station = parsed.station(station_id).ok_or_else(|| FigureError::Parse {
        file: path.display().to_string(),
        line: 0,
        message: format!("station {} not found", station_id),
    })?;

    let snd = record_to_sounding(station, parsed.time, max_height_dam)?;
    info!(
        "loaded station {} from {} ({} levels)",
        station_id,
        path.display(),
        snd.pressure_profile().len()
    );

    Ok(snd)
}

/// Build a sounding from a station record.
///
/// Levels without a pressure, or at or above the height limit, are dropped. Heights are
/// converted to meters and repeated pressures keep their first level.
pub fn record_to_sounding(
    station: &StationRecord,
    time: Option<NaiveDateTime>,
    max_height_dam: f64,
) -> FigureResult<Sounding> {
    let mut levels: Vec<[f64; 6]> = station
        .levels
        .iter()
        .copied()
        .filter(|lvl| lvl[0].is_finite() && lvl[1] < max_height_dam)
        .collect();
    levels.sort_by(|a, b| b[0].total_cmp(&a[0]));
    levels.dedup_by(|later, earlier| later[0] == earlier[0]);

    let pressure = levels
        .iter()
        .map(|l| optional::some(HectoPascal(l[0])))
        .collect();
    let height = levels
        .iter()
        .map(|l| super::optioned(l[1] * 10.0, Meters))
        .collect();
    let temperature = levels
        .iter()
        .map(|l| super::optioned(l[2], Celsius))
        .collect();
    let dew_point = levels
        .iter()
        .map(|l| super::optioned(l[3], Celsius))
        .collect();
    let wind = levels
        .iter()
        .map(|l| {
            if l[4].is_finite() && l[5].is_finite() {
                optional::some(WindSpdDir {
                    speed: Knots::from(MetersPSec(l[5])),
                    direction: l[4],
                })
            } else {
                optional::none()
            }
        })
        .collect();

    let mut info = StationInfo::new()
        .with_lat_lon((station.lat, station.lon))
        .with_elevation(super::optioned(station.elevation, Meters));
    if let Ok(num) = station.id.parse::<i32>() {
        info = info.with_station(num);
    }

    Ok(Sounding::new()
        .with_source_description("MICAPS diamond 5")
        .with_station_info(info)
        .with_valid_time(time)
        .with_pressure_profile(pressure)
        .with_height_profile(height)
        .with_temperature_profile(temperature)
        .with_dew_point_profile(dew_point)
        .with_wind_profile(wind)
        .validate()?)
}

#[cfg(test)]
mod test {
    use super::*;

    const TWO_STATIONS: &str = "diamond 5 08时探空
24 04 27 08 2
59280 113.08 23.72 19 24
1000 11 24.0 21.0 140 4
925 78 21.0 19.0 180
6 850 150 18.0
9999 215 10 200 1250 -60.0 -70.0 265 30
59316 116.68 23.35 3 6
1000 10 25.0 22.0 120 3
";

    #[test]
    fn test_parse_header_and_stations() {
        let parsed = parse_diamond5(TWO_STATIONS, "test").unwrap();

        assert_eq!(parsed.description, "08时探空");
        assert_eq!(parsed.time.unwrap().to_string(), "2024-04-27 08:00:00");
        assert_eq!(parsed.stations.len(), 2);

        let qy = parsed.station("59280").unwrap();
        assert_eq!(qy.levels.len(), 4);
        assert_eq!(qy.levels[1], [925.0, 78.0, 21.0, 19.0, 180.0, 6.0]);
        assert!(qy.levels[2][3].is_nan());

        assert!(parsed.station("00000").is_none());
    }

    #[test]
    fn test_height_filter_and_units() {
        let parsed = parse_diamond5(TWO_STATIONS, "test").unwrap();
        let snd = record_to_sounding(parsed.station("59280").unwrap(), parsed.time, 1200.0).unwrap();

        // The 200 hPa level at 1250 dam is dropped.
        assert_eq!(snd.pressure_profile().len(), 3);
        assert_eq!(snd.height_profile()[1].unwrap(), Meters(780.0));
        assert!(snd.dew_point_profile()[2].is_none());
        assert_eq!(snd.station_info().station_num().unwrap(), 59280);
    }

    #[test]
    fn test_truncated_file() {
        let text = "diamond 5 test\n24 04 27 08 1\n59280 113.08 23.72 19 12\n1000 11 24.0\n";
        match parse_diamond5(text, "short") {
            Err(FigureError::Parse { line, .. }) => assert_eq!(line, 4),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_not_diamond5() {
        assert!(parse_diamond5("diamond 3 surface\n", "bad").is_err());
    }

    #[test]
    fn test_missing_file_is_licensed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("TLOGP/20240427080000.000");
        assert!(matches!(
            station_sounding(&path, "59280", 1200.0),
            Err(FigureError::LicensedDataMissing(_))
        ));
    }
}
