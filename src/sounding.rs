//! Data type and methods to store an atmospheric sounding.
//!
//! A sounding here is a single vertical column from any of the case-study sources: a radiosonde
//! observation, a reanalysis grid point, or a model grid point. The lowest row is treated as the
//! surface.

use crate::error::{AnalysisError, Result};
use chrono::NaiveDateTime;
use metfor::{Celsius, HectoPascal, Knots, Meters, MetersPSec, WindSpdDir, WindUV};
use optional::Optioned;

pub use self::{data_row::DataRow, station_info::StationInfo};

/// All the variables stored in the sounding.
///
/// The upper air profile variables are stored in parallel vectors. If a profile lacks a certain
/// variable, e.g. wind, that whole vector has length 0 instead of being full of missing
/// values.
#[derive(Clone, Debug, Default)]
pub struct Sounding {
    // Description of the source of the sounding.
    source: Option<String>,

    // Station info
    station: StationInfo,

    // Valid time of sounding
    valid_time: Option<NaiveDateTime>,

    // Profiles
    pressure: Vec<Optioned<HectoPascal>>,
    temperature: Vec<Optioned<Celsius>>,
    dew_point: Vec<Optioned<Celsius>>,
    wind: Vec<Optioned<WindSpdDir<Knots>>>,
    height: Vec<Optioned<Meters>>,
}

macro_rules! make_profile_setter {
    ($(#[$attr:meta])* => $name:tt, $inner_type:ty, $p_var:ident) => {
        $(#[$attr])*
        pub fn $name(self, profile: Vec<Optioned<$inner_type>>) -> Self {
            Self {$p_var: profile, ..self}
        }
    };
}

impl Sounding {
    /// Create a new sounding with default values. This is a proxy for default with a clearer name.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use tornado_figures::Sounding;
    ///
    /// let snd = Sounding::new();
    /// println!("{:?}", snd);
    /// ```
    #[inline]
    pub fn new() -> Self {
        Sounding::default()
    }

    /// Add a source description to this sounding.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use tornado_figures::Sounding;
    ///
    /// let snd = Sounding::new().with_source_description("ERA5 grid point");
    /// assert_eq!(snd.source_description().unwrap(), "ERA5 grid point");
    /// ```
    #[inline]
    pub fn with_source_description<S>(mut self, desc: S) -> Self
    where
        S: Into<String>,
    {
        self.source = Some(desc.into());
        self
    }

    /// Retrieve a source description for this sounding.
    #[inline]
    pub fn source_description(&self) -> Option<&str> {
        self.source.as_deref()
    }

    /// Builder function for setting the station info.
    #[inline]
    pub fn with_station_info(mut self, new_value: StationInfo) -> Self {
        self.station = new_value;
        self
    }

    /// Get the station info
    #[inline]
    pub fn station_info(&self) -> &StationInfo {
        &self.station
    }

    make_profile_setter!(
        /// Builder method for the pressure profile.
        ///
        /// # Examples
        /// ```rust
        /// use tornado_figures::Sounding;
        /// use metfor::HectoPascal;
        /// use optional::{some, Optioned};
        ///
        /// let data = vec![1000.0, 925.0, 850.0, 700.0, 500.0, 300.0, 250.0, 200.0, 150.0, 100.0];
        /// let pressure_data: Vec<Optioned<HectoPascal>> = data.into_iter()
        ///     .map(HectoPascal)
        ///     .map(some)
        ///     .collect();
        ///
        /// let _snd = Sounding::new()
        ///     .with_pressure_profile(pressure_data);
        /// ```
        #[inline]
        => with_pressure_profile, HectoPascal, pressure
    );

    /// Get the pressure profile
    ///
    /// # Examples
    ///
    /// ```rust
    /// use tornado_figures::Sounding;
    /// # use tornado_figures::doctest::make_test_sounding;
    ///
    /// let snd = make_test_sounding();
    /// let data = snd.pressure_profile();
    ///
    /// for p in data {
    ///     if let Some(p) = p.into_option() {
    ///         println!("{:?}", p);
    ///     } else {
    ///         println!("missing value!");
    ///     }
    /// }
    ///
    /// // Uninitialized profiles just return an empty vector.
    /// let snd = Sounding::new();
    /// let data = snd.pressure_profile();
    /// assert!(data.is_empty());
    /// ```
    #[inline]
    pub fn pressure_profile(&self) -> &[Optioned<HectoPascal>] {
        &self.pressure
    }

    make_profile_setter!(
        /// Builder method for the temperature profile.
        ///
        /// See `with_pressure_profile` for an example of usage, keeping in mind the units type may
        /// be different.
        #[inline]
        => with_temperature_profile, Celsius, temperature
    );

    /// Get the temperature profile.
    #[inline]
    pub fn temperature_profile(&self) -> &[Optioned<Celsius>] {
        &self.temperature
    }

    make_profile_setter!(
        /// Builder method for the dew point profile.
        #[inline]
        => with_dew_point_profile, Celsius, dew_point
    );

    /// Get the dew point profile.
    #[inline]
    pub fn dew_point_profile(&self) -> &[Optioned<Celsius>] {
        &self.dew_point
    }

    make_profile_setter!(
        /// Builder method for the wind profile.
        #[inline]
        => with_wind_profile, WindSpdDir<Knots>, wind
    );

    /// Builder method for the wind profile from u and v components in m/s.
    ///
    /// NaN components become missing values.
    ///
    /// # Examples
    /// ```rust
    /// use tornado_figures::Sounding;
    ///
    /// let snd = Sounding::new().with_wind_components(&[0.0, 10.0], &[-5.0, f64::NAN]);
    /// assert!(snd.wind_profile()[0].is_some());
    /// assert!(snd.wind_profile()[1].is_none());
    /// ```
    pub fn with_wind_components(self, u: &[f64], v: &[f64]) -> Self {
        let wind = u
            .iter()
            .zip(v)
            .map(|(&u, &v)| {
                if u.is_finite() && v.is_finite() {
                    let uv = WindUV {
                        u: MetersPSec(u),
                        v: MetersPSec(v),
                    };
                    optional::some(WindSpdDir::<Knots>::from(uv))
                } else {
                    optional::none()
                }
            })
            .collect();

        Self { wind, ..self }
    }

    /// Get the wind profile.
    #[inline]
    pub fn wind_profile(&self) -> &[Optioned<WindSpdDir<Knots>>] {
        &self.wind
    }

    make_profile_setter!(
        /// Builder method for the geopotential height profile (meters above mean sea level).
        #[inline]
        => with_height_profile, Meters, height
    );

    /// Get the geopotential height profile.
    #[inline]
    pub fn height_profile(&self) -> &[Optioned<Meters>] {
        &self.height
    }

    /// Valid time of the sounding.
    #[inline]
    pub fn valid_time(&self) -> Option<NaiveDateTime> {
        self.valid_time
    }

    /// Builder method to set the valid time of the sounding.
    ///
    /// # Examples
    /// ```rust
    /// use tornado_figures::Sounding;
    /// use chrono::NaiveDate;
    ///
    /// let vtime = NaiveDate::from_ymd_opt(2024, 4, 27).unwrap().and_hms_opt(0, 0, 0).unwrap();
    /// let _snd = Sounding::new().with_valid_time(vtime);
    /// let _snd = Sounding::new().with_valid_time(Some(vtime));
    /// ```
    #[inline]
    pub fn with_valid_time<T>(mut self, valid_time: T) -> Self
    where
        Option<NaiveDateTime>: From<T>,
    {
        self.valid_time = Option::from(valid_time);
        self
    }

    /// Check the profiles are usable for analysis and return the sounding.
    ///
    /// Every non-empty profile must have the same length as the pressure profile, and the
    /// pressure must be strictly decreasing with index (ascending altitude).
    ///
    /// # Examples
    /// ```rust
    /// use tornado_figures::Sounding;
    /// use metfor::HectoPascal;
    /// use optional::some;
    ///
    /// let upside_down = Sounding::new()
    ///     .with_pressure_profile(vec![some(HectoPascal(850.0)), some(HectoPascal(1000.0))]);
    /// assert!(upside_down.validate().is_err());
    /// ```
    pub fn validate(self) -> Result<Self> {
        let n = self.pressure.len();
        if n == 0 {
            return Err(AnalysisError::MissingProfile);
        }

        let lengths_ok = [
            self.temperature.len(),
            self.dew_point.len(),
            self.wind.len(),
            self.height.len(),
        ]
        .iter()
        .all(|&len| len == 0 || len == n);
        if !lengths_ok {
            return Err(AnalysisError::InvalidInput("profile lengths differ"));
        }

        let decreasing = self
            .pressure
            .iter()
            .filter_map(|p| p.into_option())
            .collect::<Vec<_>>()
            .windows(2)
            .all(|pair| pair[0] > pair[1]);
        if !decreasing {
            return Err(AnalysisError::InvalidInput(
                "pressure must decrease with height",
            ));
        }

        Ok(self)
    }

    /// Get a bottom up iterator over the data rows. The first value returned from the iterator is
    /// the surface values.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use metfor::{HectoPascal, Celsius};
    /// use optional::some;
    /// use tornado_figures::Sounding;
    ///
    /// let pres: Vec<_> = vec![1000.0, 925.0, 850.0].into_iter()
    ///     .map(HectoPascal).map(some).collect();
    /// let temps: Vec<_> = vec![20.0, 18.0, 17.0].into_iter()
    ///     .map(Celsius).map(some).collect();
    ///
    /// let snd = Sounding::new()
    ///     .with_pressure_profile(pres)
    ///     .with_temperature_profile(temps);
    ///
    /// let mut iter = snd.bottom_up();
    ///
    /// let row = iter.next().unwrap();
    /// assert_eq!(row.pressure.unwrap(), HectoPascal(1000.0));
    /// assert_eq!(row.temperature.unwrap(), Celsius(20.0));
    /// assert!(row.wind.is_none()); // We never set wind profile.
    ///
    /// let row = iter.next().unwrap();
    /// assert_eq!(row.pressure.unwrap(), HectoPascal(925.0));
    ///
    /// let row = iter.next().unwrap();
    /// assert_eq!(row.pressure.unwrap(), HectoPascal(850.0));
    ///
    /// assert!(iter.next().is_none());
    /// ```
    #[inline]
    pub fn bottom_up<'a>(&'a self) -> impl Iterator<Item = DataRow> + 'a {
        ProfileIterator {
            next_idx: 0,
            direction: 1,
            src: self,
        }
    }

    /// Get a top down iterator over the data rows. The last value returned is the surface values.
    #[inline]
    pub fn top_down<'a>(&'a self) -> impl Iterator<Item = DataRow> + 'a {
        ProfileIterator {
            next_idx: self.pressure.len() as isize - 1,
            direction: -1,
            src: self,
        }
    }

    /// Get a row of data values from this sounding.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use tornado_figures::doctest::make_test_sounding;
    /// use metfor::HectoPascal;
    ///
    /// let snd = make_test_sounding();
    /// let row = snd.data_row(0).unwrap(); // This is the surface
    /// assert_eq!(row.pressure.unwrap(), HectoPascal(1000.0));
    ///
    /// assert!(snd.data_row(400).is_none()); // There weren't that many rows!
    /// ```
    #[inline]
    pub fn data_row(&self, idx: usize) -> Option<DataRow> {
        macro_rules! copy_to_result {
            ($result:ident, $profile:ident, $idx:ident) => {
                match self.$profile.get($idx) {
                    None => {}
                    Some(opt_val) => $result.$profile = *opt_val,
                }
            };
        }

        if idx >= self.pressure.len() {
            return None;
        }

        let mut result = DataRow::default();

        copy_to_result!(result, pressure, idx);
        copy_to_result!(result, temperature, idx);
        copy_to_result!(result, dew_point, idx);
        copy_to_result!(result, wind, idx);
        copy_to_result!(result, height, idx);

        Some(result)
    }

    /// Get the surface values in a `DataRow` format.
    #[inline]
    pub fn surface_as_data_row(&self) -> Option<DataRow> {
        self.data_row(0)
    }

    /// The height of the ground. This is the station elevation if known, otherwise the height of
    /// the lowest level with a height.
    #[inline]
    pub fn surface_height(&self) -> Option<Meters> {
        self.station_info().elevation().into_option().or_else(|| {
            self.height
                .iter()
                .filter_map(|h| h.into_option())
                .next()
        })
    }
}

/// Iterator over the data rows of a sounding. This may be a top down or bottom up iterator where
/// either the last or first row returned is the surface data.
struct ProfileIterator<'a> {
    next_idx: isize,
    direction: isize, // +1 for bottom up, -1 for top down
    src: &'a Sounding,
}

impl<'a> Iterator for ProfileIterator<'a> {
    type Item = DataRow;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        if self.next_idx < 0 {
            return None;
        }
        let result = self.src.data_row(self.next_idx as usize);
        self.next_idx += self.direction;
        result
    }
}

#[doc(hidden)]
pub mod doctest {
    use super::*;
    use optional::some;

    /// A warm, moist sub-tropical sounding with veering winds, 1000 to 100 hPa.
    pub fn make_test_sounding() -> super::Sounding {
        let p = [
            1000.0, 975.0, 950.0, 925.0, 900.0, 850.0, 800.0, 750.0, 700.0, 650.0, 600.0, 550.0,
            500.0, 450.0, 400.0, 350.0, 300.0, 250.0, 200.0, 150.0, 100.0,
        ];
        let t = [
            28.0, 26.0, 24.5, 23.0, 21.5, 19.0, 16.5, 13.8, 11.0, 7.8, 4.4, 0.6, -3.7, -8.6,
            -14.3, -21.0, -29.5, -40.0, -52.5, -66.0, -77.0,
        ];
        let td = [
            24.0, 23.0, 22.0, 21.0, 19.5, 17.0, 13.0, 9.0, 4.0, -1.0, -6.0, -10.0, -16.0, -22.0,
            -28.0, -35.0, -42.0, -50.0, -60.0, -72.0, -85.0,
        ];
        let z = [
            110.0, 335.0, 565.0, 800.0, 1040.0, 1530.0, 2050.0, 2590.0, 3160.0, 3760.0, 4400.0,
            5080.0, 5860.0, 6620.0, 7570.0, 8600.0, 9720.0, 10950.0, 12400.0, 14200.0, 16600.0,
        ];
        let wdir = [
            140.0, 160.0, 180.0, 195.0, 205.0, 215.0, 225.0, 235.0, 240.0, 245.0, 250.0, 255.0,
            260.0, 262.0, 265.0, 268.0, 270.0, 270.0, 270.0, 265.0, 260.0,
        ];
        let wspd = [
            10.0, 16.0, 22.0, 26.0, 28.0, 30.0, 30.0, 32.0, 34.0, 36.0, 38.0, 42.0, 46.0, 50.0,
            55.0, 60.0, 66.0, 72.0, 70.0, 55.0, 40.0,
        ];

        let wind = wdir
            .iter()
            .zip(wspd.iter())
            .map(|(&direction, &speed)| {
                some(WindSpdDir {
                    speed: Knots(speed),
                    direction,
                })
            })
            .collect();

        Sounding::new()
            .with_station_info(
                StationInfo::new()
                    .with_lat_lon((23.1, 113.45))
                    .with_elevation(Meters(110.0)),
            )
            .with_pressure_profile(p.iter().map(|&v| some(HectoPascal(v))).collect())
            .with_temperature_profile(t.iter().map(|&v| some(Celsius(v))).collect())
            .with_dew_point_profile(td.iter().map(|&v| some(Celsius(v))).collect())
            .with_height_profile(z.iter().map(|&v| some(Meters(v))).collect())
            .with_wind_profile(wind)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use optional::{none, some};

    #[test]
    fn test_profile() {
        let snd = doctest::make_test_sounding();

        assert!(snd.pressure_profile().iter().all(|t| t.is_some()));
        assert!(snd.temperature_profile().iter().all(|t| t.is_some()));
        assert_eq!(snd.pressure_profile().len(), 21);
        assert_eq!(snd.bottom_up().count(), 21);
        assert_eq!(snd.top_down().count(), 21);
        assert!(snd.clone().validate().is_ok());
    }

    #[test]
    fn test_top_down_starts_at_top() {
        let snd = doctest::make_test_sounding();
        let top = snd.top_down().next().unwrap();
        assert_eq!(top.pressure.unwrap(), HectoPascal(100.0));
    }

    #[test]
    fn test_validate_rejects_mismatched_lengths() {
        let snd = Sounding::new()
            .with_pressure_profile(vec![some(HectoPascal(1000.0)), some(HectoPascal(900.0))])
            .with_temperature_profile(vec![some(Celsius(20.0))]);
        assert!(snd.validate().is_err());
    }

    #[test]
    fn test_validate_skips_missing_pressure() {
        let snd = Sounding::new().with_pressure_profile(vec![
            some(HectoPascal(1000.0)),
            none(),
            some(HectoPascal(900.0)),
        ]);
        assert!(snd.validate().is_ok());
    }

    #[test]
    fn test_source_description_accepts_str_and_string() {
        let name = String::from("MICAPS diamond 5");

        let snd = Sounding::new().with_source_description(name.as_str());
        assert_eq!(snd.source_description(), Some("MICAPS diamond 5"));

        let snd = snd.with_source_description(name + " (59280)");
        assert_eq!(snd.source_description(), Some("MICAPS diamond 5 (59280)"));
    }

    #[test]
    fn test_surface_height_falls_back_to_lowest_level() {
        let snd = doctest::make_test_sounding().with_station_info(StationInfo::new());
        assert_eq!(snd.surface_height(), Some(Meters(110.0)));
    }
}

mod data_row;
mod station_info;
