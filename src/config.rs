//! Channel configuration: which channels to keep, how to tint and smooth them.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::color::{generate_palette, DisplayColor};

/// Smoothing strength applied to every default channel.
pub const DEFAULT_SIGMA: f64 = 1.0;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("reading config {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("parsing config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("channel '{0}': sigma must be finite and non-negative")]
    InvalidSigma(String),
    #[error("config lists no channels")]
    Empty,
}

// ---------------------------------------------------------------------------
// Per-channel settings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChannelSettings {
    /// Viewer tint of the channel layer.
    pub color: DisplayColor,
    /// Gaussian sigma in pixels; 0 disables smoothing.
    pub sigma: f64,
}

/// What the pipeline does with a scene, decided by its channel name.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ChannelPolicy<'a> {
    Keep(&'a ChannelSettings),
    Skip,
}

// ---------------------------------------------------------------------------
// ChannelConfig
// ---------------------------------------------------------------------------

/// `{channel_name: {color, sigma}}`, built once at startup.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChannelConfig {
    pub channels: BTreeMap<String, ChannelSettings>,
}

/// On-disk form: `color` and `sigma` may be omitted per channel.
#[derive(Debug, Deserialize)]
struct RawConfig {
    channels: BTreeMap<String, RawChannel>,
}

#[derive(Debug, Deserialize)]
struct RawChannel {
    color: Option<DisplayColor>,
    sigma: Option<f64>,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        let channels = [
            ("STAR RED", DisplayColor::RED),
            ("STAR GREEN", DisplayColor::GREEN),
            ("STAR ORANGE", DisplayColor::ORANGE),
        ]
        .into_iter()
        .map(|(name, color)| {
            (
                name.to_string(),
                ChannelSettings {
                    color,
                    sigma: DEFAULT_SIGMA,
                },
            )
        })
        .collect();
        Self { channels }
    }
}

impl ChannelConfig {
    /// Keep or skip a channel by exact name.
    pub fn policy(&self, channel: &str) -> ChannelPolicy<'_> {
        match self.channels.get(channel) {
            Some(settings) => ChannelPolicy::Keep(settings),
            None => ChannelPolicy::Skip,
        }
    }

    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        let raw: RawConfig = serde_json::from_str(text)?;
        if raw.channels.is_empty() {
            return Err(ConfigError::Empty);
        }

        // Channels without an explicit colour get distinct palette hues.
        let mut fallback = generate_palette(raw.channels.len()).into_iter();
        let mut channels = BTreeMap::new();
        for (name, ch) in raw.channels {
            let auto_color = fallback.next();
            let sigma = ch.sigma.unwrap_or(DEFAULT_SIGMA);
            if !sigma.is_finite() || sigma < 0.0 {
                return Err(ConfigError::InvalidSigma(name));
            }
            let color = ch
                .color
                .or(auto_color)
                .unwrap_or(DisplayColor::rgb(255, 255, 255));
            channels.insert(name, ChannelSettings { color, sigma });
        }
        Ok(Self { channels })
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&text)
    }
}
