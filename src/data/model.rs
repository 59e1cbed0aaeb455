use std::fmt;
use std::path::{Path, PathBuf};

use ndarray::Array3;
use serde::{Deserialize, Serialize};

use crate::config::ChannelSettings;

// ---------------------------------------------------------------------------
// Scene – one stack of a container file
// ---------------------------------------------------------------------------

/// A named stack read from a container, shaped (depth, height, width).
#[derive(Debug, Clone)]
pub struct Scene {
    /// Slash-delimited stack name, e.g. `"Confocal/STAR RED"`.
    pub path: String,
    pub data: Array3<f64>,
}

impl Scene {
    /// Last `/`-separated segment of the stack name.
    pub fn channel_name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }

    /// Everything before the channel name (empty for a bare name).
    pub fn group(&self) -> &str {
        match self.path.rfind('/') {
            Some(idx) => &self.path[..idx],
            None => "",
        }
    }
}

// ---------------------------------------------------------------------------
// ChannelImage – a kept channel travelling through the pipeline
// ---------------------------------------------------------------------------

/// A recognised channel together with its display / smoothing settings.
#[derive(Debug, Clone)]
pub struct ChannelImage {
    /// Layer name: the channel name, numbered when it repeats within a file.
    pub channel: String,
    /// Full stack name the channel came from.
    pub scene: String,
    pub settings: ChannelSettings,
    pub data: Array3<f64>,
}

impl ChannelImage {
    /// Number of depth slices (z planes).
    pub fn depth(&self) -> usize {
        self.data.dim().0
    }

    /// (height, width) of a single plane.
    pub fn plane_size(&self) -> (usize, usize) {
        let (_, h, w) = self.data.dim();
        (h, w)
    }
}

// ---------------------------------------------------------------------------
// ContrastLimits – the (low, high) display / export window
// ---------------------------------------------------------------------------

/// Intensity window picked for a channel. Serialised as `[low, high]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct ContrastLimits {
    pub low: f64,
    pub high: f64,
}

impl ContrastLimits {
    pub fn new(low: f64, high: f64) -> Self {
        Self { low, high }
    }

    /// Width of the window; zero or negative for degenerate limits.
    pub fn span(&self) -> f64 {
        self.high - self.low
    }

    /// `true` when the window can be used for a linear rescale.
    pub fn is_valid(&self) -> bool {
        self.low.is_finite() && self.high.is_finite() && self.high > self.low
    }
}

impl From<[f64; 2]> for ContrastLimits {
    fn from([low, high]: [f64; 2]) -> Self {
        Self { low, high }
    }
}

impl From<ContrastLimits> for [f64; 2] {
    fn from(limits: ContrastLimits) -> Self {
        [limits.low, limits.high]
    }
}

impl fmt::Display for ContrastLimits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:?}, {:?}]", self.low, self.high)
    }
}

// ---------------------------------------------------------------------------
// SourceFile – identity of one input container
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub path: PathBuf,
    /// File name without extension; prefixes every export.
    pub stem: String,
}

impl SourceFile {
    pub fn new(path: &Path) -> Self {
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self {
            path: path.to_path_buf(),
            stem,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scene(path: &str) -> Scene {
        Scene {
            path: path.to_string(),
            data: Array3::zeros((1, 1, 1)),
        }
    }

    #[test]
    fn channel_name_is_last_segment() {
        let sc = scene("Overview/Confocal/STAR RED");
        assert_eq!(sc.channel_name(), "STAR RED");
        assert_eq!(sc.group(), "Overview/Confocal");
    }

    #[test]
    fn bare_name_has_no_group() {
        let sc = scene("STAR GREEN");
        assert_eq!(sc.channel_name(), "STAR GREEN");
        assert_eq!(sc.group(), "");
    }

    #[test]
    fn limits_round_trip_as_pair() {
        let lim: ContrastLimits = serde_json::from_str("[10.0, 20.5]").unwrap();
        assert_eq!(lim, ContrastLimits::new(10.0, 20.5));
        assert_eq!(serde_json::to_string(&lim).unwrap(), "[10.0,20.5]");
    }

    #[test]
    fn limits_display_as_float_list() {
        assert_eq!(ContrastLimits::new(10.0, 11.0).to_string(), "[10.0, 11.0]");
        assert_eq!(ContrastLimits::new(-0.5, 255.25).to_string(), "[-0.5, 255.25]");
    }

    #[test]
    fn degenerate_limits_are_invalid() {
        assert!(ContrastLimits::new(0.0, 1.0).is_valid());
        assert!(!ContrastLimits::new(5.0, 5.0).is_valid());
        assert!(!ContrastLimits::new(6.0, 5.0).is_valid());
        assert!(!ContrastLimits::new(f64::NAN, 5.0).is_valid());
    }

    #[test]
    fn source_stem_drops_extension() {
        let src = SourceFile::new(Path::new("/data/separate/sample01.obf"));
        assert_eq!(src.stem, "sample01");
    }
}
