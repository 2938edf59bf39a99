//! Gaussian smoothing of gridded fields.
use ndarray::{Array, Axis, Dimension};

/// Smooth an array with a Gaussian kernel of standard deviation `sigma` grid points.
///
/// The filter is applied one axis at a time. The kernel is truncated at four standard deviations
/// and the array is extended past its edges by reflection about the edge (`d c b a | a b c d |
/// d c b a`), so a constant field is unchanged and the total of the field is conserved. A
/// `sigma` of zero returns a copy of the input.
///
/// # Examples
///
/// ```rust
/// use ndarray::Array2;
/// use tornado_figures::gaussian_filter;
///
/// let flat = Array2::from_elem((5, 8), 1012.5);
/// let smooth = gaussian_filter(&flat, 2.0);
///
/// for v in smooth.iter() {
///     assert!((v - 1012.5).abs() < 1.0e-9);
/// }
/// ```
pub fn gaussian_filter<D: Dimension>(input: &Array<f64, D>, sigma: f64) -> Array<f64, D> {
    let mut output = input.clone();
    if !(sigma > 0.0) {
        return output;
    }

    let kernel = gaussian_kernel(sigma);
    let mut scratch = Vec::new();
    for axis in 0..output.ndim() {
        for mut lane in output.lanes_mut(Axis(axis)) {
            scratch.clear();
            scratch.extend(lane.iter().cloned());

            let n = scratch.len();
            let radius = (kernel.len() / 2) as isize;
            for (i, out) in lane.iter_mut().enumerate() {
                *out = kernel
                    .iter()
                    .enumerate()
                    .map(|(k, w)| {
                        let src = i as isize + k as isize - radius;
                        w * scratch[reflect(src, n)]
                    })
                    .sum();
            }
        }
    }

    output
}

/// Normalized weights for offsets `-r..=r` with `r = floor(4 sigma + 0.5)`.
fn gaussian_kernel(sigma: f64) -> Vec<f64> {
    let radius = (4.0 * sigma + 0.5) as isize;
    let weights: Vec<f64> = (-radius..=radius)
        .map(|x| (-0.5 * (x as f64 / sigma).powi(2)).exp())
        .collect();
    let total: f64 = weights.iter().sum();

    weights.into_iter().map(|w| w / total).collect()
}

/// Map an index outside `0..n` back into the range by reflecting about the edges.
fn reflect(idx: isize, n: usize) -> usize {
    let period = 2 * n as isize;
    let m = idx.rem_euclid(period);
    if m < n as isize {
        m as usize
    } else {
        (period - 1 - m) as usize
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use ndarray::{Array1, Array2};

    #[test]
    fn test_reflect() {
        assert_eq!(reflect(-1, 4), 0);
        assert_eq!(reflect(-2, 4), 1);
        assert_eq!(reflect(4, 4), 3);
        assert_eq!(reflect(5, 4), 2);
        assert_eq!(reflect(2, 4), 2);
        // Kernels longer than the axis reflect more than once.
        assert_eq!(reflect(-5, 4), 3);
        assert_eq!(reflect(9, 4), 1);
    }

    #[test]
    fn test_kernel_normalized_and_truncated() {
        let k = gaussian_kernel(1.0);
        assert_eq!(k.len(), 9);
        assert!((k.iter().sum::<f64>() - 1.0).abs() < 1.0e-12);
        assert_eq!(k[0], k[8]);

        assert_eq!(gaussian_kernel(5.0).len(), 41);
    }

    #[test]
    fn test_zero_sigma_is_identity() {
        let a = Array2::from_shape_fn((4, 6), |(j, i)| (j * 7 + i * i) as f64);
        assert_eq!(gaussian_filter(&a, 0.0), a);
    }

    #[test]
    fn test_mean_preserved() {
        let a = Array2::from_shape_fn((12, 17), |(j, i)| {
            ((j as f64) * 0.7).sin() * 30.0 + (i as f64).powi(2) * 0.1
        });
        let mean_in = a.mean().unwrap();

        for &sigma in &[0.5, 1.0, 2.0, 5.0] {
            let smooth = gaussian_filter(&a, sigma);
            let mean_out = smooth.mean().unwrap();
            assert!(
                (mean_in - mean_out).abs() < 1.0e-9 * mean_in.abs().max(1.0),
                "sigma {}: {} != {}",
                sigma,
                mean_in,
                mean_out
            );
        }
    }

    #[test]
    fn test_spike_spreads_symmetrically() {
        let mut a = Array1::zeros(21);
        a[10] = 1.0;
        let smooth = gaussian_filter(&a, 1.0);

        assert!(smooth[10] < 1.0);
        assert!((smooth[9] - smooth[11]).abs() < 1.0e-15);
        assert!((smooth[10] - 0.398_942).abs() < 1.0e-3);
    }
}
