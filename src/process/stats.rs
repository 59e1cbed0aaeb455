use ndarray::{ArrayBase, Data, Dimension};

use crate::data::model::ContrastLimits;

/// Finite (min, max) of the data, `None` when nothing is finite.
pub fn finite_range<S, D>(data: &ArrayBase<S, D>) -> Option<(f64, f64)>
where
    S: Data<Elem = f64>,
    D: Dimension,
{
    data.iter()
        .copied()
        .filter(|v| v.is_finite())
        .fold(None, |acc, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
}

/// Default contrast window for a layer: its data range.
///
/// A constant layer gets a window of width `max(1, |v|·ε)` at `v`, and an
/// empty / all-NaN one `(0, 1)`, so the window is always usable.
pub fn default_limits<S, D>(data: &ArrayBase<S, D>) -> ContrastLimits
where
    S: Data<Elem = f64>,
    D: Dimension,
{
    match finite_range(data) {
        Some((lo, hi)) if hi > lo => ContrastLimits::new(lo, hi),
        Some((v, _)) => {
            let step = (v.abs() * f64::EPSILON).max(1.0);
            if (v + step).is_finite() {
                ContrastLimits::new(v, v + step)
            } else {
                ContrastLimits::new(v - step, v)
            }
        }
        None => ContrastLimits::new(0.0, 1.0),
    }
}

/// Intensity histogram over a fixed range.
#[derive(Debug, Clone, PartialEq)]
pub struct Histogram {
    pub min: f64,
    pub max: f64,
    pub counts: Vec<u64>,
}

impl Histogram {
    pub fn compute<S, D>(data: &ArrayBase<S, D>, bins: usize) -> Self
    where
        S: Data<Elem = f64>,
        D: Dimension,
    {
        let ContrastLimits { low: min, high: max } = default_limits(data);
        let bins = bins.max(1);
        let mut counts = vec![0u64; bins];
        let scale = bins as f64 / (max - min);
        for &v in data.iter().filter(|v| v.is_finite()) {
            let idx = (((v - min) * scale) as usize).min(bins - 1);
            counts[idx] += 1;
        }
        Self { min, max, counts }
    }

    pub fn bin_width(&self) -> f64 {
        (self.max - self.min) / self.counts.len() as f64
    }

    /// Centre of bin `i` on the intensity axis.
    pub fn bin_center(&self, i: usize) -> f64 {
        self.min + (i as f64 + 0.5) * self.bin_width()
    }
}

#[cfg(test)]
mod tests {
    use ndarray::{array, Array3};

    use super::*;

    #[test]
    fn range_ignores_non_finite_samples() {
        let data = array![3.0, f64::NAN, -2.0, f64::INFINITY, 8.0];
        assert_eq!(finite_range(&data), Some((-2.0, 8.0)));
        assert_eq!(finite_range(&array![f64::NAN]), None);
    }

    #[test]
    fn constant_layer_gets_unit_window() {
        let data = Array3::from_elem((2, 2, 2), 7.0);
        assert_eq!(default_limits(&data), ContrastLimits::new(7.0, 8.0));
    }

    #[test]
    fn huge_constant_layer_still_gets_a_window() {
        let v = 2f64.powi(60);
        let data = Array3::from_elem((1, 2, 2), -v);
        let lim = default_limits(&data);
        assert_eq!(lim.low, -v);
        assert!(lim.is_valid());

        let top = default_limits(&Array3::from_elem((1, 1, 1), f64::MAX));
        assert_eq!(top.high, f64::MAX);
        assert!(top.is_valid());
    }

    #[test]
    fn histogram_counts_every_finite_sample() {
        let data = array![0.0, 1.0, 2.0, 3.0, 4.0, 4.0, f64::NAN];
        let hist = Histogram::compute(&data, 4);
        assert_eq!(hist.counts, vec![1, 1, 1, 3]);
        assert_eq!(hist.counts.iter().sum::<u64>(), 6);
        assert!((hist.bin_center(0) - 0.5).abs() < 1e-12);
    }
}
