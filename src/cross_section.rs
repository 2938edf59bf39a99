//! Vertical interpolation of 3-D model fields and vertical cross sections.
//!
//! Three dimensional arrays are indexed `[[level, row, column]]` and come with a matching array
//! of heights for every point.
use crate::{
    error::{AnalysisError, Result},
    interpolation::interp_f64,
    projection::Projection,
};
use ndarray::{Array2, Array3, ArrayView1, Axis};

/// Number of vertical levels in a cross section when none are given.
pub const DEFAULT_CROSS_SECTION_LEVELS: usize = 100;

/// Interpolate a 3-D field to a constant height.
///
/// Points where the height is outside the range of the column are NaN.
///
/// # Examples
///
/// ```rust
/// use ndarray::Array3;
/// use tornado_figures::interpolate_to_height;
///
/// let z = Array3::from_shape_fn((4, 2, 2), |(k, _, _)| 500.0 * k as f64);
/// let t = z.mapv(|z| 20.0 - 0.0065 * z);
///
/// let t_1km = interpolate_to_height(&t, &z, 1000.0).unwrap();
/// assert!((t_1km[[0, 1]] - 13.5).abs() < 1.0e-9);
///
/// let too_high = interpolate_to_height(&t, &z, 5000.0).unwrap();
/// assert!(too_high.iter().all(|v| v.is_nan()));
/// ```
pub fn interpolate_to_height(
    field: &Array3<f64>,
    height: &Array3<f64>,
    target: f64,
) -> Result<Array2<f64>> {
    if field.dim() != height.dim() {
        return Err(AnalysisError::InvalidInput("field and height differ in shape"));
    }

    let (_, ny, nx) = field.dim();
    Ok(Array2::from_shape_fn((ny, nx), |(j, i)| {
        let vals = field.slice(ndarray::s![.., j, i]);
        let zs = height.slice(ndarray::s![.., j, i]);
        interpolate_column(vals, zs, target)
    }))
}

/// Linear interpolation within one column, the heights may increase or decrease with index.
fn interpolate_column(vals: ArrayView1<f64>, zs: ArrayView1<f64>, target: f64) -> f64 {
    for k in 0..zs.len().saturating_sub(1) {
        let (z0, z1) = (zs[k], zs[k + 1]);
        let (v0, v1) = (vals[k], vals[k + 1]);

        let brackets = (z0 <= target && target <= z1) || (z1 <= target && target <= z0);
        if !brackets {
            continue;
        }

        if z0 == z1 {
            return v0;
        }
        return interp_f64(target, z0, z1, v0, v1);
    }

    std::f64::NAN
}

/// Maps between geodetic coordinates and fractional grid indices `(row, column)`.
#[derive(Debug, Clone, PartialEq)]
pub enum GridLocator {
    /// A grid whose rows follow a latitude coordinate and columns a longitude coordinate.
    RegularLatLon {
        /// Latitude of each row, increasing or decreasing.
        latitude: Vec<f64>,
        /// Longitude of each column, increasing or decreasing.
        longitude: Vec<f64>,
    },
    /// An evenly spaced grid in a map projection.
    ProjectedGrid {
        /// The projection of the grid.
        projection: Projection,
        /// Projected x of column 0.
        x0: f64,
        /// Projected y of row 0.
        y0: f64,
        /// Column spacing in projected units.
        dx: f64,
        /// Row spacing in projected units.
        dy: f64,
    },
}

impl GridLocator {
    /// A projected grid with the point at row 0, column 0 located at `(lat00, lon00)`.
    pub fn projected(projection: Projection, lat00: f64, lon00: f64, dx: f64, dy: f64) -> Self {
        let (x0, y0) = projection.forward(lon00, lat00);
        GridLocator::ProjectedGrid {
            projection,
            x0,
            y0,
            dx,
            dy,
        }
    }

    /// Fractional `(row, column)` of a point, `None` if it cannot be located.
    pub fn to_index(&self, lat: f64, lon: f64) -> Option<(f64, f64)> {
        match self {
            GridLocator::RegularLatLon {
                latitude,
                longitude,
            } => Some((
                fractional_index(latitude, lat)?,
                fractional_index(longitude, lon)?,
            )),
            GridLocator::ProjectedGrid {
                projection,
                x0,
                y0,
                dx,
                dy,
            } => {
                let (x, y) = projection.forward(lon, lat);
                let j = (y - y0) / dy;
                let i = (x - x0) / dx;
                if j.is_finite() && i.is_finite() {
                    Some((j, i))
                } else {
                    None
                }
            }
        }
    }

    /// The `(lat, lon)` of a fractional `(row, column)`.
    pub fn to_latlon(&self, j: f64, i: f64) -> (f64, f64) {
        match self {
            GridLocator::RegularLatLon {
                latitude,
                longitude,
            } => (coordinate_at(latitude, j), coordinate_at(longitude, i)),
            GridLocator::ProjectedGrid {
                projection,
                x0,
                y0,
                dx,
                dy,
            } => {
                let (lon, lat) = projection.inverse(x0 + i * dx, y0 + j * dy);
                (lat, lon)
            }
        }
    }
}

/// Position of `value` in a monotonic coordinate as a fractional index.
fn fractional_index(coords: &[f64], value: f64) -> Option<f64> {
    if coords.len() == 1 {
        return if (coords[0] - value).abs() < 1.0e-9 {
            Some(0.0)
        } else {
            None
        };
    }

    coords.windows(2).enumerate().find_map(|(k, pair)| {
        let (c0, c1) = (pair[0], pair[1]);
        if (c0 <= value && value <= c1) || (c1 <= value && value <= c0) {
            if c0 == c1 {
                Some(k as f64)
            } else {
                Some(k as f64 + (value - c0) / (c1 - c0))
            }
        } else {
            None
        }
    })
}

/// Linear interpolation of a coordinate at a fractional index, extrapolating past the ends.
fn coordinate_at(coords: &[f64], idx: f64) -> f64 {
    match coords.len() {
        0 => std::f64::NAN,
        1 => coords[0],
        n => {
            let k = (idx.floor().max(0.0) as usize).min(n - 2);
            let frac = idx - k as f64;
            coords[k] + frac * (coords[k + 1] - coords[k])
        }
    }
}

/// A vertical cross section.
#[derive(Debug, Clone, PartialEq)]
pub struct CrossSection {
    /// Heights of the rows of `values`.
    pub levels: Vec<f64>,
    /// `(lat, lon)` of each column of `values`.
    pub points: Vec<(f64, f64)>,
    /// Values indexed `[[level, point]]`, NaN where the level is outside the column.
    pub values: Array2<f64>,
}

impl CrossSection {
    /// Apply a function to every value.
    pub fn map<F: Fn(f64) -> f64>(&self, f: F) -> Self {
        CrossSection {
            levels: self.levels.clone(),
            points: self.points.clone(),
            values: self.values.mapv(f),
        }
    }
}

/// Cut a vertical cross section through a 3-D field along the straight line in grid space from
/// `start` to `end`, both `(lat, lon)`.
///
/// The field is interpolated to the requested heights, or to
/// [`DEFAULT_CROSS_SECTION_LEVELS`] evenly spaced heights between the lowest and highest point of
/// `height`, and then bilinearly to points spaced one grid length apart along the line. When the
/// start and end are the same the section is a single column.
pub fn vertical_cross_section(
    field: &Array3<f64>,
    height: &Array3<f64>,
    locator: &GridLocator,
    start: (f64, f64),
    end: (f64, f64),
    levels: Option<Vec<f64>>,
) -> Result<CrossSection> {
    if field.dim() != height.dim() {
        return Err(AnalysisError::InvalidInput("field and height differ in shape"));
    }
    let (nz, ny, nx) = field.dim();
    if nz == 0 || ny == 0 || nx == 0 {
        return Err(AnalysisError::NotEnoughData);
    }

    let levels = match levels {
        Some(levels) => levels,
        None => default_levels(height)?,
    };

    let (j0, i0) = locator
        .to_index(start.0, start.1)
        .ok_or(AnalysisError::InvalidInput("cross section start is off the grid"))?;
    let (j1, i1) = locator
        .to_index(end.0, end.1)
        .ok_or(AnalysisError::InvalidInput("cross section end is off the grid"))?;

    let distance = (j1 - j0).hypot(i1 - i0);
    // One sample per grid length, a tiny tolerance keeps whole numbers of lengths exact.
    let n_points = if distance < 1.0e-9 {
        1
    } else {
        (distance - 1.0e-6).ceil().max(1.0) as usize + 1
    };

    let mut values = Array2::from_elem((levels.len(), n_points), std::f64::NAN);
    let mut points = Vec::with_capacity(n_points);

    for p in 0..n_points {
        let frac = if n_points == 1 {
            0.0
        } else {
            p as f64 / (n_points - 1) as f64
        };
        let j = j0 + frac * (j1 - j0);
        let i = i0 + frac * (i1 - i0);
        points.push(locator.to_latlon(j, i));

        let column = match sample_column(field, height, j, i, &levels) {
            Some(column) => column,
            None => continue,
        };
        for (dst, val) in values.index_axis_mut(Axis(1), p).iter_mut().zip(column) {
            *dst = val;
        }
    }

    Ok(CrossSection {
        levels,
        points,
        values,
    })
}

fn default_levels(height: &Array3<f64>) -> Result<Vec<f64>> {
    let (lo, hi) = height
        .iter()
        .filter(|z| z.is_finite())
        .fold((std::f64::INFINITY, std::f64::NEG_INFINITY), |(lo, hi), &z| {
            (lo.min(z), hi.max(z))
        });
    if !(lo.is_finite() && hi.is_finite()) {
        return Err(AnalysisError::NoDataProfile);
    }

    let n = DEFAULT_CROSS_SECTION_LEVELS;
    Ok((0..n)
        .map(|k| lo + (hi - lo) * k as f64 / (n - 1) as f64)
        .collect())
}

/// The bilinear combination of the surrounding columns, each interpolated to the levels.
///
/// Corners with no weight are skipped so a point on a grid line only depends on that line.
fn sample_column(
    field: &Array3<f64>,
    height: &Array3<f64>,
    j: f64,
    i: f64,
    levels: &[f64],
) -> Option<Vec<f64>> {
    const MIN_WEIGHT: f64 = 1.0e-9;

    let (_, ny, nx) = field.dim();
    let (jlo, jfrac) = cell(j, ny)?;
    let (ilo, ifrac) = cell(i, nx)?;

    let corners = [
        (jlo, ilo, (1.0 - jfrac) * (1.0 - ifrac)),
        (jlo, ilo + 1, (1.0 - jfrac) * ifrac),
        (jlo + 1, ilo, jfrac * (1.0 - ifrac)),
        (jlo + 1, ilo + 1, jfrac * ifrac),
    ];

    let mut column = vec![0.0; levels.len()];
    let mut total_weight = 0.0;
    for &(jj, ii, weight) in corners.iter() {
        if weight < MIN_WEIGHT || jj >= ny || ii >= nx {
            continue;
        }
        total_weight += weight;

        let vals = field.slice(ndarray::s![.., jj, ii]);
        let zs = height.slice(ndarray::s![.., jj, ii]);
        for (dst, &lvl) in column.iter_mut().zip(levels) {
            *dst += weight * interpolate_column(vals, zs, lvl);
        }
    }

    if total_weight <= 0.0 {
        return None;
    }

    Some(column.into_iter().map(|v| v / total_weight).collect())
}

/// The lower index and fraction of a fractional index on an axis with `n` points.
fn cell(idx: f64, n: usize) -> Option<(usize, f64)> {
    const TOL: f64 = 1.0e-9;
    if !idx.is_finite() || idx < -TOL || idx > (n - 1) as f64 + TOL {
        return None;
    }

    let idx = idx.max(0.0).min((n - 1) as f64);
    let lo = (idx.floor() as usize).min(n.saturating_sub(2));
    Some((lo, idx - lo as f64))
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn test_grid() -> (Array3<f64>, Array3<f64>, GridLocator) {
        let z = Array3::from_shape_fn((6, 5, 8), |(k, j, i)| 200.0 * k as f64 + 5.0 * (j + i) as f64);
        let field = Array3::from_shape_fn((6, 5, 8), |(k, _, i)| k as f64 * 10.0 + i as f64);
        let locator = GridLocator::RegularLatLon {
            latitude: vec![24.0, 23.9, 23.8, 23.7, 23.6],
            longitude: (0..8).map(|i| 113.0 + 0.1 * i as f64).collect(),
        };
        (field, z, locator)
    }

    #[test]
    fn test_interpolate_column_orders() {
        let vals = ndarray::arr1(&[1.0, 2.0, 3.0]);
        let up = ndarray::arr1(&[0.0, 100.0, 200.0]);
        let down = ndarray::arr1(&[200.0, 100.0, 0.0]);

        assert_abs_diff_eq!(interpolate_column(vals.view(), up.view(), 150.0), 2.5);
        assert_abs_diff_eq!(interpolate_column(vals.view(), down.view(), 150.0), 1.5);
        assert_abs_diff_eq!(interpolate_column(vals.view(), up.view(), 200.0), 3.0);
        assert!(interpolate_column(vals.view(), up.view(), -1.0).is_nan());
    }

    #[test]
    fn test_interpolate_to_height_shape_check() {
        let a = Array3::zeros((2, 3, 4));
        let b = Array3::zeros((2, 3, 3));
        assert!(interpolate_to_height(&a, &b, 0.0).is_err());
    }

    #[test]
    fn test_regular_locator() {
        let (_, _, locator) = test_grid();
        let (j, i) = locator.to_index(23.85, 113.25).unwrap();
        assert_abs_diff_eq!(j, 1.5, epsilon = 1.0e-9);
        assert_abs_diff_eq!(i, 2.5, epsilon = 1.0e-9);

        let (lat, lon) = locator.to_latlon(j, i);
        assert_abs_diff_eq!(lat, 23.85, epsilon = 1.0e-9);
        assert_abs_diff_eq!(lon, 113.25, epsilon = 1.0e-9);

        assert!(locator.to_index(30.0, 113.0).is_none());
    }

    #[test]
    fn test_projected_locator_round_trip() {
        let proj = Projection::wrf_lambert(30.0, 60.0, 113.0, 23.0);
        let locator = GridLocator::projected(proj, 22.5, 112.5, 1000.0, 1000.0);

        let (j, i) = locator.to_index(22.5, 112.5).unwrap();
        assert_abs_diff_eq!(j, 0.0, epsilon = 1.0e-6);
        assert_abs_diff_eq!(i, 0.0, epsilon = 1.0e-6);

        let (j, i) = locator.to_index(23.3, 113.4).unwrap();
        assert!(j > 0.0 && i > 0.0);
        let (lat, lon) = locator.to_latlon(j, i);
        assert_abs_diff_eq!(lat, 23.3, epsilon = 1.0e-9);
        assert_abs_diff_eq!(lon, 113.4, epsilon = 1.0e-9);
    }

    #[test]
    fn test_cross_section_along_row() {
        let (field, z, locator) = test_grid();
        let levels = vec![300.0, 500.0];
        let xs =
            vertical_cross_section(&field, &z, &locator, (23.8, 113.1), (23.8, 113.5), Some(levels))
                .unwrap();

        // Four grid lengths give five points.
        assert_eq!(xs.points.len(), 5);
        assert_eq!(xs.values.dim(), (2, 5));
        assert_abs_diff_eq!(xs.points[2].1, 113.3, epsilon = 1.0e-9);

        // Along row 2 at column i, z = 200 k + 5 (2 + i) and the field is 10 k + i.
        for (p, i) in (1..=5).enumerate() {
            let k = (300.0 - 5.0 * (2 + i) as f64) / 200.0;
            assert_abs_diff_eq!(xs.values[[0, p]], 10.0 * k + i as f64, epsilon = 1.0e-9);
        }
    }

    #[test]
    fn test_identical_start_and_end_is_one_column() {
        let (field, z, locator) = test_grid();
        let xs = vertical_cross_section(&field, &z, &locator, (23.7, 113.4), (23.7, 113.4), None)
            .unwrap();

        assert_eq!(xs.points.len(), 1);
        assert_eq!(xs.levels.len(), DEFAULT_CROSS_SECTION_LEVELS);
        assert_abs_diff_eq!(xs.levels[0], 0.0);
        assert_abs_diff_eq!(xs.levels[99], 1000.0 + 5.0 * 11.0);

        let vals = field.slice(ndarray::s![.., 3, 4]);
        let zs = z.slice(ndarray::s![.., 3, 4]);
        for (k, &lvl) in xs.levels.iter().enumerate() {
            let expected = interpolate_column(vals, zs, lvl);
            let got = xs.values[[k, 0]];
            assert!(
                (expected.is_nan() && got.is_nan()) || (expected - got).abs() < 1.0e-9,
                "level {}: {} != {}",
                lvl,
                got,
                expected
            );
        }
    }

    #[test]
    fn test_cross_section_off_grid() {
        let (field, z, locator) = test_grid();
        assert!(
            vertical_cross_section(&field, &z, &locator, (10.0, 113.0), (23.7, 113.4), None)
                .is_err()
        );
    }
}
