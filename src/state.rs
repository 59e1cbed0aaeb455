use std::time::{Duration, Instant};

use crate::color::DisplayColor;
use crate::data::model::{ChannelImage, ContrastLimits};
use crate::pipeline::LimitsFile;
use crate::process::stats::{default_limits, Histogram};

const HISTOGRAM_BINS: usize = 128;

// ---------------------------------------------------------------------------
// Viewer state
// ---------------------------------------------------------------------------

/// Per-layer display settings.
#[derive(Debug, Clone)]
pub struct LayerState {
    pub channel: String,
    pub color: DisplayColor,
    /// Current contrast window.
    pub limits: ContrastLimits,
    /// Data range; slider bounds and the "Reset" target.
    pub range: ContrastLimits,
    pub visible: bool,
    pub histogram: Histogram,
}

impl LayerState {
    /// Smallest allowed distance between low and high.
    fn min_gap(&self) -> f64 {
        (self.range.span() * 1e-3).max(f64::EPSILON)
    }
}

/// The full viewer state for one file, independent of rendering.
pub struct ViewerState {
    /// Window title (source file stem).
    pub title: String,

    pub layers: Vec<LayerState>,

    /// Displayed depth slice.
    pub z: usize,

    /// Slice count of the deepest layer.
    pub depth: usize,

    /// When the window gives up and skips the file.
    pub deadline: Option<Instant>,

    /// Composite must be re-rendered.
    pub dirty: bool,

    /// Status / error message shown in the UI.
    pub status_message: Option<String>,
}

impl ViewerState {
    pub fn new(title: &str, images: &[ChannelImage], timeout: Option<Duration>) -> Self {
        let layers = images
            .iter()
            .map(|img| {
                let range = default_limits(&img.data);
                LayerState {
                    channel: img.channel.clone(),
                    color: img.settings.color,
                    limits: range,
                    range,
                    visible: true,
                    histogram: Histogram::compute(&img.data, HISTOGRAM_BINS),
                }
            })
            .collect();
        let depth = images.iter().map(ChannelImage::depth).max().unwrap_or(0);

        Self {
            title: title.to_string(),
            layers,
            z: depth / 2,
            depth,
            deadline: timeout.map(|t| Instant::now() + t),
            dirty: true,
            status_message: None,
        }
    }

    /// Move the low bound, keeping it below the high bound.
    pub fn set_low(&mut self, layer: usize, value: f64) {
        if let Some(l) = self.layers.get_mut(layer) {
            let gap = l.min_gap();
            l.limits.low = value.min(l.limits.high - gap);
            self.dirty = true;
        }
    }

    /// Move the high bound, keeping it above the low bound.
    pub fn set_high(&mut self, layer: usize, value: f64) {
        if let Some(l) = self.layers.get_mut(layer) {
            let gap = l.min_gap();
            l.limits.high = value.max(l.limits.low + gap);
            self.dirty = true;
        }
    }

    /// Restore a layer's window to its data range.
    pub fn reset(&mut self, layer: usize) {
        if let Some(l) = self.layers.get_mut(layer) {
            l.limits = l.range;
            self.dirty = true;
        }
    }

    pub fn set_visible(&mut self, layer: usize, visible: bool) {
        if let Some(l) = self.layers.get_mut(layer) {
            l.visible = visible;
            self.dirty = true;
        }
    }

    pub fn set_z(&mut self, z: usize) {
        let z = z.min(self.depth.saturating_sub(1));
        if z != self.z {
            self.z = z;
            self.dirty = true;
        }
    }

    /// Current windows in layer order.
    pub fn current_limits(&self) -> Vec<ContrastLimits> {
        self.layers.iter().map(|l| l.limits).collect()
    }

    /// Current windows keyed by channel name, for saving.
    pub fn limits_file(&self) -> LimitsFile {
        self.layers
            .iter()
            .map(|l| (l.channel.clone(), l.limits))
            .collect()
    }

    /// Time left before the timeout, `None` without one.
    pub fn remaining(&self, now: Instant) -> Option<Duration> {
        self.deadline.map(|d| d.saturating_duration_since(now))
    }

    pub fn timed_out(&self, now: Instant) -> bool {
        self.remaining(now).is_some_and(|r| r.is_zero())
    }
}

#[cfg(test)]
mod tests {
    use ndarray::Array3;

    use super::*;
    use crate::config::ChannelConfig;

    fn image(name: &str, depth: usize, max: f64) -> ChannelImage {
        ChannelImage {
            channel: name.to_string(),
            scene: name.to_string(),
            settings: ChannelConfig::default().channels["STAR RED"],
            data: Array3::from_shape_fn((depth, 2, 2), |(z, y, x)| {
                max * (z * 4 + y * 2 + x) as f64 / (depth * 4 - 1) as f64
            }),
        }
    }

    #[test]
    fn starts_at_data_range_and_middle_slice() {
        let state = ViewerState::new("s", &[image("A", 5, 100.0), image("B", 3, 10.0)], None);
        assert_eq!(state.depth, 5);
        assert_eq!(state.z, 2);
        assert_eq!(state.layers[0].limits, ContrastLimits::new(0.0, 100.0));
        assert_eq!(state.layers[1].range, ContrastLimits::new(0.0, 10.0));
        assert!(state.dirty);
    }

    #[test]
    fn bounds_never_cross() {
        let mut state = ViewerState::new("s", &[image("A", 1, 100.0)], None);
        state.set_low(0, 150.0);
        let lim = state.layers[0].limits;
        assert!(lim.low < lim.high);
        assert_eq!(lim.high, 100.0);

        state.set_high(0, -20.0);
        let lim = state.layers[0].limits;
        assert!(lim.high > lim.low);
        assert!(lim.is_valid());

        state.reset(0);
        assert_eq!(state.layers[0].limits, ContrastLimits::new(0.0, 100.0));
    }

    #[test]
    fn limits_file_is_keyed_by_channel() {
        let mut state = ViewerState::new("s", &[image("A", 1, 10.0), image("B", 1, 10.0)], None);
        state.set_high(1, 4.0);
        let file = state.limits_file();
        assert_eq!(file["A"], ContrastLimits::new(0.0, 10.0));
        assert_eq!(file["B"], ContrastLimits::new(0.0, 4.0));
    }

    #[test]
    fn z_is_clamped_to_depth() {
        let mut state = ViewerState::new("s", &[image("A", 3, 1.0)], None);
        state.dirty = false;
        state.set_z(10);
        assert_eq!(state.z, 2);
        assert!(state.dirty);
    }

    #[test]
    fn deadline_expires() {
        let state = ViewerState::new("s", &[image("A", 1, 1.0)], Some(Duration::from_secs(30)));
        let now = Instant::now();
        assert!(!state.timed_out(now));
        assert!(state.timed_out(now + Duration::from_secs(31)));
        assert!(!ViewerState::new("s", &[], None).timed_out(now));
    }
}
