use metfor::Meters;
use optional::Optioned;

/// Station information including location data and identification number.
///
/// For model and reanalysis columns the "station" is the grid point the column was taken from.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StationInfo {
    /// WMO station number, eg 59280
    num: Optioned<i32>,
    /// A human readable name, eg 清远
    name: Option<String>,
    /// Latitude and longitude.
    location: Option<(f64, f64)>,
    /// Elevation, this may be in model terrain which is not necessarily the same as the real world.
    elevation: Optioned<Meters>,
}

impl StationInfo {
    /// Create a new `StationInfo` object.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use metfor::Meters;
    /// use tornado_figures::StationInfo;
    /// use optional::some;
    ///
    /// let _stn = StationInfo::new_with_values(59280, (23.72, 113.08), Meters(19.0));
    /// let _stn = StationInfo::new_with_values(Some(59280), None, some(Meters(19.0)));
    /// ```
    #[inline]
    pub fn new_with_values<T, U, V, W>(station_num: T, location: U, elevation: V) -> Self
    where
        T: Into<Optioned<i32>>,
        U: Into<Option<(f64, f64)>>,
        Optioned<W>: From<V>,
        W: optional::Noned + metfor::Length,
        Meters: From<W>,
    {
        let elev: Optioned<W> = Optioned::from(elevation);
        let elev: Optioned<Meters> = elev.map_t(Meters::from);

        StationInfo {
            num: station_num.into(),
            name: None,
            location: location.into(),
            elevation: elev,
        }
    }

    /// Create a new object with default values.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use tornado_figures::StationInfo;
    ///
    /// assert!(StationInfo::new().station_num().is_none());
    /// assert!(StationInfo::new().location().is_none());
    /// assert!(StationInfo::new().elevation().is_none());
    /// assert!(StationInfo::new().name().is_none());
    /// ```
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to add a station number.
    #[inline]
    pub fn with_station<T>(mut self, number: T) -> Self
    where
        Optioned<i32>: From<T>,
    {
        self.num = Optioned::from(number);

        self
    }

    /// Builder method to add a station name.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use tornado_figures::StationInfo;
    ///
    /// let stn = StationInfo::new().with_name("清远".to_owned());
    /// assert_eq!(stn.name().unwrap(), "清远");
    /// ```
    #[inline]
    pub fn with_name<S>(mut self, name: S) -> Self
    where
        Option<String>: From<S>,
    {
        self.name = Option::from(name);
        self
    }

    /// Builder method to add a location.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use tornado_figures::StationInfo;
    ///
    /// assert_eq!(
    ///     StationInfo::new().with_lat_lon((23.1, 113.45)).location().unwrap(), (23.1, 113.45));
    /// ```
    #[inline]
    pub fn with_lat_lon<T>(mut self, coords: T) -> Self
    where
        Option<(f64, f64)>: From<T>,
    {
        self.location = Option::from(coords);
        self
    }

    /// Builder method to add elevation.
    #[inline]
    pub fn with_elevation<T, U>(mut self, elev: T) -> Self
    where
        Optioned<U>: From<T>,
        U: optional::Noned + metfor::Length,
        Meters: From<U>,
    {
        let elevation: Optioned<U> = Optioned::from(elev);
        let elevation: Optioned<Meters> = elevation.map_t(Meters::from);

        self.elevation = elevation;
        self
    }

    /// WMO station number.
    #[inline]
    pub fn station_num(&self) -> Optioned<i32> {
        self.num
    }

    /// Station name.
    #[inline]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Latitude and longitude.
    #[inline]
    pub fn location(&self) -> Option<(f64, f64)> {
        self.location
    }

    /// Elevation in meters, this may be in model terrain, not necessarily the same as
    /// the real world.
    #[inline]
    pub fn elevation(&self) -> Optioned<Meters> {
        self.elevation
    }
}
