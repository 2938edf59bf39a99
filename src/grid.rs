//! Gridded datasets on regular latitude/longitude grids.
//!
//! Variables are stored with the dimension order `(valid_time, [pressure_level,] latitude,
//! longitude)`. Whether a dataset has the pressure level dimension is decided by the loader and
//! recorded in a [`GridKind`] tag, it is never guessed from the variables present.
use crate::error::{AnalysisError, Result};
use chrono::NaiveDateTime;
use log::debug;
use ndarray::{s, Array2, ArrayD, Axis};
use std::collections::HashMap;

/// The kind of a gridded dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GridKind {
    /// Single level fields, `(valid_time, latitude, longitude)`.
    Surface,
    /// Fields on pressure levels, `(valid_time, pressure_level, latitude, longitude)`.
    PressureLevels,
}

/// A bounding box in geodetic coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    /// Western edge, degrees east.
    pub west: f64,
    /// Eastern edge, degrees east.
    pub east: f64,
    /// Southern edge, degrees north.
    pub south: f64,
    /// Northern edge, degrees north.
    pub north: f64,
}

impl BoundingBox {
    /// Create a box from `[west, east, south, north]`, the order used for map extents.
    pub fn from_extent(extent: [f64; 4]) -> Self {
        BoundingBox {
            west: extent[0],
            east: extent[1],
            south: extent[2],
            north: extent[3],
        }
    }

    /// The `[west, east, south, north]` representation.
    pub fn extent(&self) -> [f64; 4] {
        [self.west, self.east, self.south, self.north]
    }

    fn contains_lat(&self, lat: f64) -> bool {
        lat >= self.south - EPS && lat <= self.north + EPS
    }

    fn contains_lon(&self, lon: f64) -> bool {
        lon >= self.west - EPS && lon <= self.east + EPS
    }
}

const EPS: f64 = 1.0e-6;

/// A named collection of gridded variables sharing the same coordinates.
#[derive(Debug, Clone)]
pub struct GriddedDataset {
    kind: GridKind,
    valid_time: Vec<NaiveDateTime>,
    pressure_level: Vec<f64>,
    latitude: Vec<f64>,
    longitude: Vec<f64>,
    variables: HashMap<String, ArrayD<f64>>,
}

impl GriddedDataset {
    /// Create an empty dataset with the given coordinates.
    ///
    /// The pressure levels are ignored for a `Surface` dataset.
    pub fn new(
        kind: GridKind,
        valid_time: Vec<NaiveDateTime>,
        pressure_level: Vec<f64>,
        latitude: Vec<f64>,
        longitude: Vec<f64>,
    ) -> Self {
        let pressure_level = match kind {
            GridKind::Surface => vec![],
            GridKind::PressureLevels => pressure_level,
        };

        GriddedDataset {
            kind,
            valid_time,
            pressure_level,
            latitude,
            longitude,
            variables: HashMap::new(),
        }
    }

    /// Builder method to add a variable, checking its shape against the coordinates.
    pub fn with_variable<S: Into<String>>(mut self, name: S, values: ArrayD<f64>) -> Result<Self> {
        if values.shape() != self.expected_shape().as_slice() {
            return Err(AnalysisError::InvalidInput(
                "variable shape does not match the coordinates",
            ));
        }

        self.variables.insert(name.into(), values);
        Ok(self)
    }

    fn expected_shape(&self) -> Vec<usize> {
        match self.kind {
            GridKind::Surface => vec![
                self.valid_time.len(),
                self.latitude.len(),
                self.longitude.len(),
            ],
            GridKind::PressureLevels => vec![
                self.valid_time.len(),
                self.pressure_level.len(),
                self.latitude.len(),
                self.longitude.len(),
            ],
        }
    }

    /// The kind of this dataset.
    #[inline]
    pub fn kind(&self) -> GridKind {
        self.kind
    }

    /// Valid times.
    #[inline]
    pub fn valid_time(&self) -> &[NaiveDateTime] {
        &self.valid_time
    }

    /// Pressure levels in hPa, empty for surface datasets.
    #[inline]
    pub fn pressure_level(&self) -> &[f64] {
        &self.pressure_level
    }

    /// Latitudes, in the order they are stored.
    #[inline]
    pub fn latitude(&self) -> &[f64] {
        &self.latitude
    }

    /// Longitudes, in the order they are stored.
    #[inline]
    pub fn longitude(&self) -> &[f64] {
        &self.longitude
    }

    /// Get a variable by name.
    pub fn variable(&self, name: &str) -> Result<&ArrayD<f64>> {
        self.variables
            .get(name)
            .ok_or_else(|| AnalysisError::MissingVariable(name.to_owned()))
    }

    /// Mutable access to a variable, used for unit conversions at load time.
    pub fn variable_mut(&mut self, name: &str) -> Result<&mut ArrayD<f64>> {
        self.variables
            .get_mut(name)
            .ok_or_else(|| AnalysisError::MissingVariable(name.to_owned()))
    }

    /// Names of the variables in the dataset.
    pub fn variable_names(&self) -> impl Iterator<Item = &str> {
        self.variables.keys().map(String::as_str)
    }

    /// The index of a valid time.
    pub fn time_index(&self, time: NaiveDateTime) -> Result<usize> {
        self.valid_time
            .iter()
            .position(|&t| t == time)
            .ok_or_else(|| AnalysisError::Selection(format!("valid_time {}", time)))
    }

    /// The index of a pressure level.
    pub fn level_index(&self, level: f64) -> Result<usize> {
        self.pressure_level
            .iter()
            .position(|&p| (p - level).abs() < EPS)
            .ok_or_else(|| AnalysisError::Selection(format!("pressure_level {}", level)))
    }

    /// Select a horizontal slice of a variable.
    ///
    /// A `level` must be given for pressure level datasets and must not be given for surface
    /// datasets.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use chrono::NaiveDate;
    /// use ndarray::{ArrayD, IxDyn};
    /// use tornado_figures::{GridKind, GriddedDataset};
    ///
    /// let t0 = NaiveDate::from_ymd_opt(2024, 4, 27).unwrap().and_hms_opt(5, 0, 0).unwrap();
    /// let ds = GriddedDataset::new(
    ///     GridKind::Surface,
    ///     vec![t0],
    ///     vec![],
    ///     vec![24.0, 23.0],
    ///     vec![113.0, 114.0, 115.0],
    /// )
    /// .with_variable("msl", ArrayD::from_elem(IxDyn(&[1, 2, 3]), 1010.0))
    /// .unwrap();
    ///
    /// let msl = ds.select("msl", t0, None).unwrap();
    /// assert_eq!(msl.values.dim(), (2, 3));
    /// assert!(ds.select("msl", t0, Some(500.0)).is_err());
    /// assert!(ds.select("t2m", t0, None).is_err());
    /// ```
    pub fn select(&self, name: &str, time: NaiveDateTime, level: Option<f64>) -> Result<Field2D> {
        let values = self.variable(name)?;
        let t = self.time_index(time)?;

        let values = match (self.kind, level) {
            (GridKind::Surface, None) => values.index_axis(Axis(0), t).to_owned(),
            (GridKind::PressureLevels, Some(level)) => {
                let k = self.level_index(level)?;
                values
                    .index_axis(Axis(0), t)
                    .index_axis(Axis(0), k)
                    .to_owned()
            }
            (GridKind::Surface, Some(_)) => {
                return Err(AnalysisError::Selection(
                    "surface datasets have no pressure level".to_owned(),
                ))
            }
            (GridKind::PressureLevels, None) => {
                return Err(AnalysisError::Selection(
                    "a pressure level is required".to_owned(),
                ))
            }
        };

        let values = values
            .into_dimensionality()
            .map_err(|_| AnalysisError::InvalidInput("selection is not two dimensional"))?;

        debug!("selected {} at {} level {:?}", name, time, level);

        Ok(Field2D {
            latitude: self.latitude.clone(),
            longitude: self.longitude.clone(),
            values,
        })
    }

    /// The vertical column of a pressure level variable at the grid point nearest `lat`/`lon`.
    ///
    /// Returns the column in the order of the stored pressure levels.
    pub fn column(&self, name: &str, time: NaiveDateTime, lat: f64, lon: f64) -> Result<Vec<f64>> {
        if self.kind != GridKind::PressureLevels {
            return Err(AnalysisError::Selection(
                "columns require a pressure level dataset".to_owned(),
            ));
        }

        let values = self.variable(name)?;
        let t = self.time_index(time)?;
        let j = nearest_index(&self.latitude, lat)?;
        let i = nearest_index(&self.longitude, lon)?;

        debug!(
            "column {} at {} nearest to ({}, {}) is ({}, {})",
            name, time, lat, lon, self.latitude[j], self.longitude[i]
        );

        Ok(values
            .slice(s![t, .., j, i])
            .iter()
            .cloned()
            .collect())
    }

    /// Restrict the dataset to a bounding box.
    pub fn subset(&self, bbox: &BoundingBox) -> Result<Self> {
        let j_keep = indexes_where(&self.latitude, |lat| bbox.contains_lat(lat));
        let i_keep = indexes_where(&self.longitude, |lon| bbox.contains_lon(lon));

        if j_keep.is_empty() || i_keep.is_empty() {
            return Err(AnalysisError::Selection(format!(
                "no grid points inside {:?}",
                bbox
            )));
        }

        let lat_axis = self.expected_shape().len() - 2;
        let variables = self
            .variables
            .iter()
            .map(|(name, values)| {
                let values = values
                    .select(Axis(lat_axis), &j_keep)
                    .select(Axis(lat_axis + 1), &i_keep);
                (name.clone(), values)
            })
            .collect();

        Ok(GriddedDataset {
            kind: self.kind,
            valid_time: self.valid_time.clone(),
            pressure_level: self.pressure_level.clone(),
            latitude: j_keep.iter().map(|&j| self.latitude[j]).collect(),
            longitude: i_keep.iter().map(|&i| self.longitude[i]).collect(),
            variables,
        })
    }

    /// Geodetic bounds of the grid.
    pub fn bounds(&self) -> Option<BoundingBox> {
        bounds_of(&self.latitude, &self.longitude)
    }
}

/// A two dimensional field on a regular latitude/longitude grid, `values[[lat, lon]]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Field2D {
    /// Latitude of each row.
    pub latitude: Vec<f64>,
    /// Longitude of each column.
    pub longitude: Vec<f64>,
    /// The values.
    pub values: Array2<f64>,
}

impl Field2D {
    /// Apply a function to every value, keeping the coordinates.
    pub fn map<F: Fn(f64) -> f64>(&self, f: F) -> Self {
        Field2D {
            latitude: self.latitude.clone(),
            longitude: self.longitude.clone(),
            values: self.values.mapv(f),
        }
    }

    /// Replace the values, keeping the coordinates.
    pub fn with_values(&self, values: Array2<f64>) -> Result<Self> {
        if values.dim() != self.values.dim() {
            return Err(AnalysisError::InvalidInput("field shapes differ"));
        }

        Ok(Field2D {
            latitude: self.latitude.clone(),
            longitude: self.longitude.clone(),
            values,
        })
    }

    /// Restrict the field to a bounding box.
    pub fn subset(&self, bbox: &BoundingBox) -> Result<Self> {
        let j_keep = indexes_where(&self.latitude, |lat| bbox.contains_lat(lat));
        let i_keep = indexes_where(&self.longitude, |lon| bbox.contains_lon(lon));

        if j_keep.is_empty() || i_keep.is_empty() {
            return Err(AnalysisError::Selection(format!(
                "no grid points inside {:?}",
                bbox
            )));
        }

        Ok(Field2D {
            latitude: j_keep.iter().map(|&j| self.latitude[j]).collect(),
            longitude: i_keep.iter().map(|&i| self.longitude[i]).collect(),
            values: self
                .values
                .select(Axis(0), &j_keep)
                .select(Axis(1), &i_keep),
        })
    }

    /// Keep every `n`th point in both directions, starting with the first.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use ndarray::Array2;
    /// use tornado_figures::Field2D;
    ///
    /// let fld = Field2D {
    ///     latitude: (0..10).map(f64::from).collect(),
    ///     longitude: (0..7).map(f64::from).collect(),
    ///     values: Array2::zeros((10, 7)),
    /// };
    ///
    /// let every_third = fld.stride(3);
    /// assert_eq!(every_third.latitude, vec![0.0, 3.0, 6.0, 9.0]);
    /// assert_eq!(every_third.longitude, vec![0.0, 3.0, 6.0]);
    /// assert_eq!(every_third.values.dim(), (4, 3));
    /// ```
    pub fn stride(&self, n: usize) -> Self {
        let n = n.max(1);
        let step = n as isize;

        Field2D {
            latitude: self.latitude.iter().step_by(n).cloned().collect(),
            longitude: self.longitude.iter().step_by(n).cloned().collect(),
            values: self.values.slice(s![..;step, ..;step]).to_owned(),
        }
    }

    /// Convert to a field with explicit two dimensional coordinates.
    pub fn to_mesh(&self) -> MeshField {
        let (ny, nx) = self.values.dim();
        MeshField {
            latitude: Array2::from_shape_fn((ny, nx), |(j, _)| self.latitude[j]),
            longitude: Array2::from_shape_fn((ny, nx), |(_, i)| self.longitude[i]),
            values: self.values.clone(),
        }
    }

    /// Geodetic bounds of the grid.
    pub fn bounds(&self) -> Option<BoundingBox> {
        bounds_of(&self.latitude, &self.longitude)
    }
}

/// A two dimensional field with two dimensional coordinates, as on a projected model grid.
#[derive(Debug, Clone, PartialEq)]
pub struct MeshField {
    /// Latitude of every point.
    pub latitude: Array2<f64>,
    /// Longitude of every point.
    pub longitude: Array2<f64>,
    /// The values.
    pub values: Array2<f64>,
}

impl MeshField {
    /// Replace the values, keeping the coordinates.
    pub fn with_values(&self, values: Array2<f64>) -> Result<Self> {
        if values.dim() != self.values.dim() {
            return Err(AnalysisError::InvalidInput("field shapes differ"));
        }

        Ok(MeshField {
            latitude: self.latitude.clone(),
            longitude: self.longitude.clone(),
            values,
        })
    }

    /// Keep every `n`th point in both directions, starting with the first.
    pub fn stride(&self, n: usize) -> Self {
        let n = n.max(1) as isize;
        let take = |a: &Array2<f64>| a.slice(s![..;n, ..;n]).to_owned();

        MeshField {
            latitude: take(&self.latitude),
            longitude: take(&self.longitude),
            values: take(&self.values),
        }
    }

    /// Geodetic bounds of the points.
    pub fn bounds(&self) -> Option<BoundingBox> {
        let finite = |a: &Array2<f64>| -> Option<(f64, f64)> {
            a.iter()
                .filter(|v| v.is_finite())
                .fold(None, |acc, &v| match acc {
                    None => Some((v, v)),
                    Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
                })
        };

        let (south, north) = finite(&self.latitude)?;
        let (west, east) = finite(&self.longitude)?;
        Some(BoundingBox {
            west,
            east,
            south,
            north,
        })
    }
}

fn indexes_where<F: Fn(f64) -> bool>(coords: &[f64], pred: F) -> Vec<usize> {
    coords
        .iter()
        .enumerate()
        .filter(|(_, &c)| pred(c))
        .map(|(i, _)| i)
        .collect()
}

fn nearest_index(coords: &[f64], target: f64) -> Result<usize> {
    coords
        .iter()
        .enumerate()
        .filter(|(_, c)| c.is_finite())
        .min_by(|(_, a), (_, b)| {
            (*a - target)
                .abs()
                .partial_cmp(&(*b - target).abs())
                .unwrap_or(std::cmp::Ordering::Equal)
        })
        .map(|(i, _)| i)
        .ok_or_else(|| AnalysisError::Selection(format!("no coordinate near {}", target)))
}

fn bounds_of(latitude: &[f64], longitude: &[f64]) -> Option<BoundingBox> {
    let min_max = |v: &[f64]| -> Option<(f64, f64)> {
        let lo = v.iter().cloned().fold(f64::INFINITY, f64::min);
        let hi = v.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        if lo.is_finite() && hi.is_finite() {
            Some((lo, hi))
        } else {
            None
        }
    };

    let (south, north) = min_max(latitude)?;
    let (west, east) = min_max(longitude)?;
    Some(BoundingBox {
        west,
        east,
        south,
        north,
    })
}

#[cfg(test)]
mod test {
    use super::*;
    use chrono::NaiveDate;
    use ndarray::{Array4, IxDyn};

    fn t0() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 4, 27)
            .unwrap()
            .and_hms_opt(5, 0, 0)
            .unwrap()
    }

    fn pressure_dataset() -> GriddedDataset {
        let lat = vec![25.0, 24.0, 23.0, 22.0];
        let lon = vec![112.0, 113.0, 114.0];
        let z = Array4::from_shape_fn((1, 2, 4, 3), |(_, k, j, i)| {
            (k * 100 + j * 10 + i) as f64
        });

        GriddedDataset::new(
            GridKind::PressureLevels,
            vec![t0()],
            vec![500.0, 850.0],
            lat,
            lon,
        )
        .with_variable("z", z.into_dyn())
        .unwrap()
    }

    #[test]
    fn test_select_level() {
        let ds = pressure_dataset();
        let fld = ds.select("z", t0(), Some(850.0)).unwrap();
        assert_eq!(fld.values[[2, 1]], 121.0);
        assert_eq!(fld.latitude.len(), 4);
    }

    #[test]
    fn test_select_errors() {
        let ds = pressure_dataset();
        assert_eq!(
            ds.select("q", t0(), Some(850.0)),
            Err(AnalysisError::MissingVariable("q".to_owned()))
        );
        assert!(matches!(
            ds.select("z", t0(), Some(700.0)),
            Err(AnalysisError::Selection(_))
        ));
        assert!(matches!(
            ds.select("z", t0(), None),
            Err(AnalysisError::Selection(_))
        ));
        let later = t0() + chrono::Duration::hours(1);
        assert!(matches!(
            ds.select("z", later, Some(500.0)),
            Err(AnalysisError::Selection(_))
        ));
    }

    #[test]
    fn test_shape_checked() {
        let ds = GriddedDataset::new(GridKind::Surface, vec![t0()], vec![], vec![1.0], vec![2.0]);
        assert!(ds
            .with_variable("msl", ArrayD::zeros(IxDyn(&[1, 2, 1])))
            .is_err());
    }

    #[test]
    fn test_subset() {
        let ds = pressure_dataset();
        let bbox = BoundingBox::from_extent([112.5, 114.0, 22.5, 24.0]);
        let sub = ds.subset(&bbox).unwrap();

        assert_eq!(sub.latitude(), &[24.0, 23.0]);
        assert_eq!(sub.longitude(), &[113.0, 114.0]);
        let fld = sub.select("z", t0(), Some(500.0)).unwrap();
        assert_eq!(fld.values[[0, 0]], 11.0);
        assert_eq!(fld.values[[1, 1]], 22.0);

        let outside = BoundingBox::from_extent([0.0, 1.0, 0.0, 1.0]);
        assert!(ds.subset(&outside).is_err());
    }

    #[test]
    fn test_column_nearest_point() {
        let ds = pressure_dataset();
        let col = ds.column("z", t0(), 23.1, 113.45).unwrap();
        assert_eq!(col, vec![21.0, 121.0]);
    }

    #[test]
    fn test_mesh_and_bounds() {
        let ds = pressure_dataset();
        let mesh = ds.select("z", t0(), Some(500.0)).unwrap().to_mesh();
        assert_eq!(mesh.latitude[[3, 0]], 22.0);
        assert_eq!(mesh.longitude[[3, 2]], 114.0);

        let bounds = mesh.bounds().unwrap();
        assert_eq!(bounds.extent(), [112.0, 114.0, 22.0, 25.0]);
        assert_eq!(ds.bounds(), Some(bounds));
    }
}
