//! Pixel processing: smoothing, intensity statistics, normalisation, export.

pub mod export;
pub mod normalize;
pub mod smooth;
pub mod stats;
