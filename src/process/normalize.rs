use ndarray::{Array, Dimension};

use crate::data::model::ContrastLimits;

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum NormalizeError {
    #[error("degenerate contrast limits {0}: high must be finite and greater than low")]
    DegenerateBounds(ContrastLimits),
}

/// Clip to `limits`, rescale linearly to `0..=255`, truncate to `u8`.
///
/// `low` maps to 0 and `high` to 255; nothing is re-clipped after scaling.
pub fn normalize<D: Dimension>(
    data: &Array<f64, D>,
    limits: ContrastLimits,
) -> Result<Array<u8, D>, NormalizeError> {
    if !limits.is_valid() {
        return Err(NormalizeError::DegenerateBounds(limits));
    }
    let ContrastLimits { low, high } = limits;
    let span = high - low;
    Ok(data.mapv(|v| ((v.clamp(low, high) - low) / span * 255.0) as u8))
}

#[cfg(test)]
mod tests {
    use ndarray::{array, Array1, Array3};

    use super::*;

    #[test]
    fn clips_then_scales_the_worked_example() {
        let data = array![[0.0, 10.0], [20.0, 30.0]];
        let out = normalize(&data, ContrastLimits::new(10.0, 20.0)).unwrap();
        assert_eq!(out, array![[0u8, 0], [255, 255]]);
    }

    #[test]
    fn bounds_map_to_extremes() {
        let data = Array1::from(vec![-5.0, 100.0, 150.0, 200.0, 1e9]);
        let out = normalize(&data, ContrastLimits::new(100.0, 200.0)).unwrap();
        assert_eq!(out.to_vec(), vec![0, 0, 127, 255, 255]);
    }

    #[test]
    fn mapping_is_monotonic() {
        let data = Array1::linspace(-50.0, 350.0, 2001);
        let out = normalize(&data, ContrastLimits::new(0.0, 300.0)).unwrap();
        assert!(out.windows(2).into_iter().all(|w| w[0] <= w[1]));
        assert_eq!(out[0], 0);
        assert_eq!(out[out.len() - 1], 255);
    }

    #[test]
    fn renormalizing_own_output_is_identity() {
        let data = Array3::from_shape_fn((2, 4, 4), |(z, y, x)| (z * 37 + y * 11 + x * 3) as f64);
        let once = normalize(&data, ContrastLimits::new(5.0, 80.0)).unwrap();
        let twice = normalize(&once.mapv(f64::from), ContrastLimits::new(0.0, 255.0)).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn degenerate_bounds_are_flagged() {
        let data = array![1.0, 2.0];
        let err = normalize(&data, ContrastLimits::new(3.0, 3.0)).unwrap_err();
        assert_eq!(err, NormalizeError::DegenerateBounds(ContrastLimits::new(3.0, 3.0)));
        assert!(normalize(&data, ContrastLimits::new(4.0, 3.0)).is_err());
        assert!(normalize(&data, ContrastLimits::new(0.0, f64::INFINITY)).is_err());
    }
}
