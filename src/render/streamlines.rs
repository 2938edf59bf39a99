//! Streamlines of a 2-D vector field.
//!
//! Lines are traced through the normalized direction field with a second order Runge-Kutta
//! scheme. A coarse occupancy mask keeps lines from crowding, each mask cell is crossed by at most
//! one line.
use super::contour::GridPoint;
use ndarray::Array2;
use std::collections::HashSet;

const STEP: f64 = 0.2;
const MASK_CELLS: f64 = 30.0;

/// One streamline in grid index coordinates `(column, row)`.
#[derive(Debug, Clone, PartialEq)]
pub struct Streamline {
    /// Points along the line, in the direction of the flow.
    pub points: Vec<GridPoint>,
    /// Position and unit direction of the arrow at the middle of the line.
    pub arrow: Option<(GridPoint, (f64, f64))>,
}

/// Trace streamlines of the field with components `u` along the columns and `v` along the rows,
/// both in grid lengths per unit time.
///
/// `density` scales the occupancy mask, 1 gives a 30 by 30 mask.
pub fn streamlines(u: &Array2<f64>, v: &Array2<f64>, density: f64) -> Vec<Streamline> {
    let (ny, nx) = u.dim();
    if v.dim() != (ny, nx) || ny < 2 || nx < 2 {
        return vec![];
    }

    let tracer = Tracer::new(u, v, density);
    let mut occupied: HashSet<(usize, usize)> = HashSet::new();
    let mut lines = Vec::new();

    for my in 0..tracer.mask.1 {
        for mx in 0..tracer.mask.0 {
            if occupied.contains(&(mx, my)) {
                continue;
            }

            let seed = tracer.mask_center(mx, my);
            if let Some(line) = tracer.trace(seed, &mut occupied) {
                lines.push(line);
            }
        }
    }

    lines
}

struct Tracer<'a> {
    u: &'a Array2<f64>,
    v: &'a Array2<f64>,
    nx: usize,
    ny: usize,
    mask: (usize, usize),
}

impl<'a> Tracer<'a> {
    fn new(u: &'a Array2<f64>, v: &'a Array2<f64>, density: f64) -> Self {
        let (ny, nx) = u.dim();
        let density = if density > 0.0 { density } else { 1.0 };
        let cells = (MASK_CELLS * density).round().max(1.0) as usize;

        Tracer {
            u,
            v,
            nx,
            ny,
            mask: (cells, cells),
        }
    }

    fn mask_cell(&self, p: GridPoint) -> (usize, usize) {
        let fx = p.0 / (self.nx - 1) as f64;
        let fy = p.1 / (self.ny - 1) as f64;
        let mx = (fx * self.mask.0 as f64).floor().max(0.0) as usize;
        let my = (fy * self.mask.1 as f64).floor().max(0.0) as usize;
        (mx.min(self.mask.0 - 1), my.min(self.mask.1 - 1))
    }

    fn mask_center(&self, mx: usize, my: usize) -> GridPoint {
        (
            (mx as f64 + 0.5) / self.mask.0 as f64 * (self.nx - 1) as f64,
            (my as f64 + 0.5) / self.mask.1 as f64 * (self.ny - 1) as f64,
        )
    }

    /// The unit direction of the field, `None` outside the grid or where it is calm or missing.
    fn direction(&self, p: GridPoint, sign: f64) -> Option<(f64, f64)> {
        let (x, y) = p;
        if !(x >= 0.0 && y >= 0.0 && x <= (self.nx - 1) as f64 && y <= (self.ny - 1) as f64) {
            return None;
        }

        let i = (x.floor() as usize).min(self.nx - 2);
        let j = (y.floor() as usize).min(self.ny - 2);
        let (fx, fy) = (x - i as f64, y - j as f64);

        let bilinear = |a: &Array2<f64>| {
            let bottom = a[(j, i)] * (1.0 - fx) + a[(j, i + 1)] * fx;
            let top = a[(j + 1, i)] * (1.0 - fx) + a[(j + 1, i + 1)] * fx;
            bottom * (1.0 - fy) + top * fy
        };

        let (du, dv) = (bilinear(self.u), bilinear(self.v));
        let speed = du.hypot(dv);
        if !speed.is_finite() || speed == 0.0 {
            return None;
        }

        Some((sign * du / speed, sign * dv / speed))
    }

    fn integrate(
        &self,
        seed: GridPoint,
        sign: f64,
        occupied: &HashSet<(usize, usize)>,
        visited: &mut HashSet<(usize, usize)>,
    ) -> Vec<GridPoint> {
        let max_steps = ((4 * (self.nx + self.ny)) as f64 / STEP) as usize;
        let mut points = Vec::new();
        let mut p = seed;

        for _ in 0..max_steps {
            let k1 = match self.direction(p, sign) {
                Some(k) => k,
                None => break,
            };
            let mid = (p.0 + 0.5 * STEP * k1.0, p.1 + 0.5 * STEP * k1.1);
            let k2 = match self.direction(mid, sign) {
                Some(k) => k,
                None => break,
            };

            let next = (p.0 + STEP * k2.0, p.1 + STEP * k2.1);
            if self.direction(next, sign).is_none() {
                break;
            }

            let cell = self.mask_cell(next);
            if occupied.contains(&cell) {
                break;
            }
            visited.insert(cell);
            points.push(next);
            p = next;
        }

        points
    }

    fn trace(&self, seed: GridPoint, occupied: &mut HashSet<(usize, usize)>) -> Option<Streamline> {
        self.direction(seed, 1.0)?;

        let mut visited = HashSet::new();
        visited.insert(self.mask_cell(seed));

        let backward = self.integrate(seed, -1.0, occupied, &mut visited);
        let forward = self.integrate(seed, 1.0, occupied, &mut visited);

        let mut points: Vec<GridPoint> = backward.into_iter().rev().collect();
        points.push(seed);
        points.extend(forward);

        // Too short to see.
        if (points.len() as f64) * STEP < 1.0 {
            return None;
        }
        occupied.extend(visited);

        let mid = points.len() / 2;
        let arrow = if mid + 1 < points.len() {
            let (a, b) = (points[mid], points[mid + 1]);
            let len = (b.0 - a.0).hypot(b.1 - a.1);
            if len > 0.0 {
                Some((a, ((b.0 - a.0) / len, (b.1 - a.1) / len)))
            } else {
                None
            }
        } else {
            None
        };

        Some(Streamline { points, arrow })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_uniform_flow_gives_straight_lines() {
        let u = Array2::from_elem((20, 30), 1.0);
        let v = Array2::zeros((20, 30));
        let lines = streamlines(&u, &v, 0.5);

        assert!(!lines.is_empty());
        for line in &lines {
            let y0 = line.points[0].1;
            assert!(line.points.iter().all(|p| (p.1 - y0).abs() < 1.0e-9));
            assert!(line.points.windows(2).all(|w| w[1].0 > w[0].0));

            let (_, dir) = line.arrow.unwrap();
            assert!((dir.0 - 1.0).abs() < 1.0e-9);
        }
    }

    #[test]
    fn test_calm_field_has_no_lines() {
        let u = Array2::zeros((10, 10));
        let v = Array2::zeros((10, 10));
        assert!(streamlines(&u, &v, 1.0).is_empty());
    }

    #[test]
    fn test_lines_stay_on_grid() {
        let u = Array2::from_shape_fn((15, 15), |(j, _)| 7.0 - j as f64);
        let v = Array2::from_shape_fn((15, 15), |(_, i)| i as f64 - 7.0);
        for line in streamlines(&u, &v, 1.0) {
            for &(x, y) in &line.points {
                assert!(x >= 0.0 && x <= 14.0 && y >= 0.0 && y <= 14.0);
            }
        }
    }
}
