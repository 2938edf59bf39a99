//! Contouring of gridded fields.
//!
//! Every grid cell is split into two triangles along the same diagonal and contours are found by
//! linear interpolation inside the triangles. Results are in fractional grid index coordinates
//! `(column, row)`, callers map them to the page.
use ndarray::Array2;
use std::collections::HashMap;

/// A point in fractional grid index coordinates, `(column, row)`.
pub type GridPoint = (f64, f64);

type Vertex = (usize, usize);
type EdgeKey = (Vertex, Vertex);

fn edge_key(a: Vertex, b: Vertex) -> EdgeKey {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

/// The two triangles of the cell with lower left corner `(j, i)`, vertices as `(row, column)`.
fn cell_triangles(j: usize, i: usize) -> [[Vertex; 3]; 2] {
    [
        [(j, i), (j, i + 1), (j + 1, i + 1)],
        [(j, i), (j + 1, i + 1), (j + 1, i)],
    ]
}

/// Isolines of `values` at `level`.
///
/// Each returned line is a chain of points, closed lines repeat their first point at the end.
/// Triangles touching a NaN are skipped.
pub fn isolines(values: &Array2<f64>, level: f64) -> Vec<Vec<GridPoint>> {
    let (ny, nx) = values.dim();
    if ny < 2 || nx < 2 || !level.is_finite() {
        return vec![];
    }

    let mut crossings: HashMap<EdgeKey, GridPoint> = HashMap::new();
    let mut segments: Vec<(EdgeKey, EdgeKey)> = Vec::new();

    for j in 0..ny - 1 {
        for i in 0..nx - 1 {
            for tri in cell_triangles(j, i).iter() {
                let vals = [values[tri[0]], values[tri[1]], values[tri[2]]];
                if vals.iter().any(|v| !v.is_finite()) {
                    continue;
                }

                let mut hits = Vec::with_capacity(2);
                for &(a, b) in &[(0, 1), (1, 2), (2, 0)] {
                    let (va, vb) = (vals[a], vals[b]);
                    if (va >= level) == (vb >= level) {
                        continue;
                    }

                    let key = edge_key(tri[a], tri[b]);
                    crossings
                        .entry(key)
                        .or_insert_with(|| edge_point(tri[a], tri[b], va, vb, level));
                    hits.push(key);
                }

                if hits.len() == 2 {
                    segments.push((hits[0], hits[1]));
                }
            }
        }
    }

    chain_segments(&segments)
        .into_iter()
        .map(|chain| chain.iter().filter_map(|k| crossings.get(k).cloned()).collect())
        .collect()
}

fn edge_point(a: Vertex, b: Vertex, va: f64, vb: f64, level: f64) -> GridPoint {
    let t = (level - va) / (vb - va);
    let (ja, ia) = (a.0 as f64, a.1 as f64);
    let (jb, ib) = (b.0 as f64, b.1 as f64);
    (ia + t * (ib - ia), ja + t * (jb - ja))
}

/// Join segments that share an edge into chains of edges.
fn chain_segments(segments: &[(EdgeKey, EdgeKey)]) -> Vec<Vec<EdgeKey>> {
    let mut by_edge: HashMap<EdgeKey, Vec<usize>> = HashMap::new();
    for (idx, &(a, b)) in segments.iter().enumerate() {
        by_edge.entry(a).or_default().push(idx);
        by_edge.entry(b).or_default().push(idx);
    }

    let mut used = vec![false; segments.len()];
    let mut chains = Vec::new();

    for start in 0..segments.len() {
        if used[start] {
            continue;
        }
        used[start] = true;

        let (a, b) = segments[start];
        let mut forward = vec![a, b];
        extend_chain(&mut forward, segments, &by_edge, &mut used);

        let closed = forward.len() > 2 && forward.first() == forward.last();
        if !closed {
            let mut backward = vec![b, a];
            extend_chain(&mut backward, segments, &by_edge, &mut used);
            backward.reverse();
            backward.extend(forward.into_iter().skip(2));
            forward = backward;
        }

        chains.push(forward);
    }

    chains
}

fn extend_chain(
    chain: &mut Vec<EdgeKey>,
    segments: &[(EdgeKey, EdgeKey)],
    by_edge: &HashMap<EdgeKey, Vec<usize>>,
    used: &mut [bool],
) {
    while let Some(&tail) = chain.last() {
        let next = by_edge
            .get(&tail)
            .and_then(|idxs| idxs.iter().cloned().find(|&idx| !used[idx]));

        let idx = match next {
            Some(idx) => idx,
            None => break,
        };
        used[idx] = true;

        let (a, b) = segments[idx];
        chain.push(if a == tail { b } else { a });
    }
}

/// A filled polygon of one contour band, in grid index coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct BandPolygon {
    /// Index of the band in the list passed to [`filled_bands`].
    pub band: usize,
    /// Polygon vertices.
    pub points: Vec<GridPoint>,
}

/// Polygons covering the parts of the grid with values in each band `[lower, upper]`.
///
/// Cells entirely within one band are returned whole, other cells are split into triangles that
/// are clipped to the band.
pub fn filled_bands(values: &Array2<f64>, bands: &[(f64, f64)]) -> Vec<BandPolygon> {
    let (ny, nx) = values.dim();
    let mut polygons = Vec::new();
    if ny < 2 || nx < 2 {
        return polygons;
    }

    let band_of = |v: f64| bands.iter().position(|&(lo, hi)| v >= lo && v <= hi);

    for j in 0..ny - 1 {
        for i in 0..nx - 1 {
            let corners = [(j, i), (j, i + 1), (j + 1, i + 1), (j + 1, i)];
            let vals: Vec<f64> = corners.iter().map(|&c| values[c]).collect();
            if vals.iter().any(|v| !v.is_finite()) {
                continue;
            }

            let whole_cell = band_of(vals[0]).filter(|&band| {
                let (lo, hi) = bands[band];
                vals.iter().all(|&v| v >= lo && v <= hi)
            });
            if let Some(band) = whole_cell {
                polygons.push(BandPolygon {
                    band,
                    points: corners.iter().map(|&(j, i)| (i as f64, j as f64)).collect(),
                });
                continue;
            }

            for tri in cell_triangles(j, i).iter() {
                let tri_pts: Vec<(GridPoint, f64)> = tri
                    .iter()
                    .map(|&(j, i)| ((i as f64, j as f64), values[(j, i)]))
                    .collect();

                for (band, &(lo, hi)) in bands.iter().enumerate() {
                    let clipped = clip_by_value(&tri_pts, lo, hi);
                    if clipped.len() >= 3 {
                        polygons.push(BandPolygon {
                            band,
                            points: clipped.into_iter().map(|(p, _)| p).collect(),
                        });
                    }
                }
            }
        }
    }

    polygons
}

/// Clip a polygon with values at its vertices to the region where `lo <= value <= hi`.
fn clip_by_value(poly: &[(GridPoint, f64)], lo: f64, hi: f64) -> Vec<(GridPoint, f64)> {
    let above = clip_half(poly, |v| v >= lo, lo);
    if above.is_empty() {
        return above;
    }
    clip_half(&above, |v| v <= hi, hi)
}

fn clip_half<F>(poly: &[(GridPoint, f64)], inside: F, bound: f64) -> Vec<(GridPoint, f64)>
where
    F: Fn(f64) -> bool,
{
    if !bound.is_finite() {
        return poly.to_vec();
    }

    let mut out = Vec::with_capacity(poly.len() + 2);
    for (k, &cur) in poly.iter().enumerate() {
        let prev = poly[(k + poly.len() - 1) % poly.len()];
        let (cur_in, prev_in) = (inside(cur.1), inside(prev.1));

        if cur_in != prev_in {
            let t = (bound - prev.1) / (cur.1 - prev.1);
            let p = (
                (prev.0).0 + t * ((cur.0).0 - (prev.0).0),
                (prev.0).1 + t * ((cur.0).1 - (prev.0).1),
            );
            out.push((p, bound));
        }
        if cur_in {
            out.push(cur);
        }
    }

    out
}

/// Contour levels at round numbers covering `min` to `max`, asked for as `n` levels.
///
/// The range is split into at most `n + 1` bins using the smallest step that is a power of ten
/// times 1, 2, 2.5 or 5 and at least `(max - min) / (n + 1)`. The end levels are the multiples of
/// the step at or just beyond `min` and `max`, so the result can hold fewer than `n` levels.
///
/// # Examples
///
/// ```rust
/// use tornado_figures::render::nice_levels;
///
/// assert_eq!(nice_levels(0.0, 100.0, 5), vec![0.0, 20.0, 40.0, 60.0, 80.0, 100.0]);
/// assert_eq!(nice_levels(-0.3, 0.9, 6), vec![-0.4, -0.2, 0.0, 0.2, 0.4, 0.6, 0.8, 1.0]);
/// ```
pub fn nice_levels(min: f64, max: f64, n: usize) -> Vec<f64> {
    if !(min.is_finite() && max.is_finite()) || n == 0 {
        return vec![];
    }
    if max <= min {
        return vec![min];
    }

    let raw = (max - min) / (n + 1) as f64;
    let exponent = raw.log10().floor() as i32;
    let magnitude = 10f64.powi(exponent);
    let multiple = [1.0, 2.0, 2.5, 5.0, 10.0]
        .iter()
        .cloned()
        .find(|&m| m * magnitude >= raw * (1.0 - 1.0e-9))
        .unwrap_or(10.0);
    let step = multiple * magnitude;

    let first = (min / step + 1.0e-9).floor() as i64;
    let last = (max / step - 1.0e-9).ceil() as i64;

    // Dividing by an exact power of ten gives the closest value to the decimal number.
    let scale = |units: f64| {
        if exponent >= 0 {
            units * magnitude
        } else {
            units / 10f64.powi(-exponent)
        }
    };

    (first..=last).map(|k| scale(k as f64 * multiple)).collect()
}

/// Length along a polyline.
pub fn path_length(points: &[(f64, f64)]) -> f64 {
    points
        .windows(2)
        .map(|w| (w[1].0 - w[0].0).hypot(w[1].1 - w[0].1))
        .sum()
}

/// Pick a spot for an inline label in the middle of a line and cut a gap for it.
///
/// Returns the pieces of the line to draw and the label position, or the unchanged line and
/// `None` if the line is too short to carry a label of width `gap`.
pub fn split_for_label(
    points: &[(f64, f64)],
    gap: f64,
) -> (Vec<Vec<(f64, f64)>>, Option<(f64, f64)>) {
    let total = path_length(points);
    if points.len() < 2 || total < 3.0 * gap {
        return (vec![points.to_vec()], None);
    }

    let mid = total / 2.0;
    let (cut_start, cut_end) = (mid - gap / 2.0, mid + gap / 2.0);

    let mut before = vec![points[0]];
    let mut after = Vec::new();
    let mut label = None;
    let mut travelled = 0.0;

    for w in points.windows(2) {
        let (p0, p1) = (w[0], w[1]);
        let len = (p1.0 - p0.0).hypot(p1.1 - p0.1);
        let (s0, s1) = (travelled, travelled + len);
        let at = |s: f64| {
            let t = if len > 0.0 { (s - s0) / len } else { 0.0 };
            (p0.0 + t * (p1.0 - p0.0), p0.1 + t * (p1.1 - p0.1))
        };

        if s1 <= cut_start {
            before.push(p1);
        } else if s0 >= cut_end {
            after.push(p1);
        } else {
            if s0 < cut_start {
                before.push(at(cut_start));
            }
            if s0 <= mid && mid <= s1 {
                label = Some(at(mid));
            }
            if s1 > cut_end {
                after.push(at(cut_end));
                after.push(p1);
            }
        }
        travelled = s1;
    }

    let pieces = vec![before, after]
        .into_iter()
        .filter(|piece| piece.len() > 1)
        .collect();
    (pieces, label)
}

/// Short tick marks perpendicular to a line, every `spacing` along it.
///
/// Ticks point to the left of the direction of travel for a positive `length` and to the right
/// for a negative `length`, with y measured downward as on the page.
pub fn tick_marks(points: &[(f64, f64)], spacing: f64, length: f64) -> Vec<[(f64, f64); 2]> {
    let mut ticks = Vec::new();
    if !(spacing > 0.0) {
        return ticks;
    }

    let mut next = spacing / 2.0;
    let mut travelled = 0.0;
    for w in points.windows(2) {
        let (p0, p1) = (w[0], w[1]);
        let len = (p1.0 - p0.0).hypot(p1.1 - p0.1);
        if len == 0.0 {
            continue;
        }
        let (dx, dy) = ((p1.0 - p0.0) / len, (p1.1 - p0.1) / len);
        // Left of travel on a y-down page.
        let (nx, ny) = (dy, -dx);

        while next <= travelled + len {
            let t = (next - travelled) / len;
            let base = (p0.0 + t * (p1.0 - p0.0), p0.1 + t * (p1.1 - p0.1));
            ticks.push([base, (base.0 + nx * length, base.1 + ny * length)]);
            next += spacing;
        }
        travelled += len;
    }

    ticks
}
