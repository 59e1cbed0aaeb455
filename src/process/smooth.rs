use ndarray::{Array3, Axis};

/// Kernel half-width in multiples of sigma.
const TRUNCATE: f64 = 4.0;

/// Normalised 1-D Gaussian weights for offsets `-r..=r`.
pub fn gaussian_kernel(sigma: f64) -> Vec<f64> {
    let radius = (TRUNCATE * sigma + 0.5) as i64;
    let weights: Vec<f64> = (-radius..=radius)
        .map(|x| (-0.5 * (x * x) as f64 / (sigma * sigma)).exp())
        .collect();
    let sum: f64 = weights.iter().sum();
    weights.into_iter().map(|w| w / sum).collect()
}

/// Mirror an out-of-range index back into `0..n`, repeating the edge sample
/// (`d c b a | a b c d | d c b a`).
fn reflect(i: i64, n: usize) -> usize {
    let n = n as i64;
    let period = 2 * n;
    let m = i.rem_euclid(period);
    (if m < n { m } else { period - 1 - m }) as usize
}

/// Separable Gaussian smoothing over all three axes, in place.
///
/// `sigma <= 0` leaves the data untouched.
pub fn gaussian_smooth(data: &mut Array3<f64>, sigma: f64) {
    if !(sigma > 0.0) || data.is_empty() {
        return;
    }
    let kernel = gaussian_kernel(sigma);
    for axis in 0..3 {
        convolve_axis(data, Axis(axis), &kernel);
    }
}

fn convolve_axis(data: &mut Array3<f64>, axis: Axis, kernel: &[f64]) {
    let n = data.len_of(axis);
    let radius = (kernel.len() / 2) as i64;
    let mut line = vec![0.0; n];

    for mut lane in data.lanes_mut(axis) {
        line.iter_mut().zip(lane.iter()).for_each(|(dst, &src)| *dst = src);
        for (i, out) in lane.iter_mut().enumerate() {
            *out = kernel
                .iter()
                .enumerate()
                .map(|(k, w)| w * line[reflect(i as i64 + k as i64 - radius, n)])
                .sum();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kernel_for_unit_sigma() {
        let k = gaussian_kernel(1.0);
        assert_eq!(k.len(), 9);
        assert!((k.iter().sum::<f64>() - 1.0).abs() < 1e-12);
        assert!((k[4] - 0.398_942_28).abs() < 1e-6);
        assert_eq!(k[0], k[8]);
    }

    #[test]
    fn reflect_repeats_edge_sample() {
        assert_eq!(reflect(-1, 4), 0);
        assert_eq!(reflect(-2, 4), 1);
        assert_eq!(reflect(4, 4), 3);
        assert_eq!(reflect(5, 4), 2);
        // single-sample axes always map to themselves
        assert_eq!(reflect(-3, 1), 0);
        assert_eq!(reflect(3, 1), 0);
    }

    #[test]
    fn constant_stack_is_unchanged() {
        let mut data = Array3::from_elem((3, 5, 6), 42.0);
        gaussian_smooth(&mut data, 1.0);
        assert!(data.iter().all(|&v| (v - 42.0).abs() < 1e-9));
    }

    #[test]
    fn impulse_spreads_in_all_three_axes() {
        let mut data = Array3::zeros((9, 9, 9));
        data[[4, 4, 4]] = 1.0;
        gaussian_smooth(&mut data, 1.0);

        let w0 = gaussian_kernel(1.0)[4];
        assert!((data[[4, 4, 4]] - w0.powi(3)).abs() < 1e-12);
        assert!(data[[3, 4, 4]] > 0.0);
        assert!((data.sum() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn reflect_mode_preserves_mass_at_corners() {
        let mut data = Array3::zeros((1, 5, 5));
        data[[0, 0, 0]] = 10.0;
        gaussian_smooth(&mut data, 1.0);
        assert!((data.sum() - 10.0).abs() < 1e-9);
        assert!(data[[0, 0, 0]] < 10.0);
    }

    #[test]
    fn zero_sigma_is_a_no_op() {
        let mut data = Array3::from_shape_fn((1, 3, 3), |(_, y, x)| (y * 3 + x) as f64);
        let before = data.clone();
        gaussian_smooth(&mut data, 0.0);
        assert_eq!(data, before);
    }
}
