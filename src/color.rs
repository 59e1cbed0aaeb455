use std::fmt;
use std::str::FromStr;

use eframe::egui::Color32;
use palette::{Hsl, IntoColor, Srgb};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Color palette generator
// ---------------------------------------------------------------------------

/// Generates `n` visually distinct colours using evenly spaced hues.
pub fn generate_palette(n: usize) -> Vec<DisplayColor> {
    if n == 0 {
        return Vec::new();
    }
    (0..n)
        .map(|i| {
            let hue = (i as f32 / n as f32) * 360.0;
            let hsl = Hsl::new(hue, 0.75, 0.55);
            let rgb: Srgb = hsl.into_color();
            DisplayColor::rgb(
                (rgb.red * 255.0) as u8,
                (rgb.green * 255.0) as u8,
                (rgb.blue * 255.0) as u8,
            )
        })
        .collect()
}

// ---------------------------------------------------------------------------
// DisplayColor – the colormap tint of a channel layer
// ---------------------------------------------------------------------------

/// Named colours accepted in channel configs, matching the viewer's colormaps.
const NAMED_COLORS: &[(&str, [u8; 3])] = &[
    ("red", [255, 0, 0]),
    ("green", [0, 255, 0]),
    ("blue", [0, 0, 255]),
    ("orange", [255, 165, 0]),
    ("magenta", [255, 0, 255]),
    ("cyan", [0, 255, 255]),
    ("yellow", [255, 255, 0]),
    ("gray", [255, 255, 255]),
];

/// A layer tint. Pixel intensity in `[0, 1]` scales this colour linearly.
///
/// Serialised as a colour name when one matches, otherwise as `#rrggbb`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DisplayColor {
    rgb: [u8; 3],
}

#[derive(Debug, thiserror::Error)]
#[error("unknown color '{0}' (expected a name like \"red\" or a #rrggbb hex value)")]
pub struct ColorParseError(String);

impl DisplayColor {
    pub const RED: Self = Self::rgb(255, 0, 0);
    pub const GREEN: Self = Self::rgb(0, 255, 0);
    pub const ORANGE: Self = Self::rgb(255, 165, 0);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { rgb: [r, g, b] }
    }

    /// Colour channels as fractions in `[0, 1]` for compositing.
    pub fn unit_rgb(&self) -> [f32; 3] {
        self.rgb.map(|c| c as f32 / 255.0)
    }

    pub fn to_color32(self) -> Color32 {
        let [r, g, b] = self.rgb;
        Color32::from_rgb(r, g, b)
    }

    fn name(&self) -> Option<&'static str> {
        NAMED_COLORS
            .iter()
            .find(|(_, rgb)| *rgb == self.rgb)
            .map(|(name, _)| *name)
    }
}

impl FromStr for DisplayColor {
    type Err = ColorParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_ascii_lowercase();
        if let Some((_, rgb)) = NAMED_COLORS.iter().find(|(name, _)| *name == key) {
            return Ok(Self { rgb: *rgb });
        }
        if key == "grey" || key == "white" {
            return Ok(Self::rgb(255, 255, 255));
        }
        // palette parses "#rrggbb" / "rrggbb"
        let parsed: Srgb<u8> = key.parse().map_err(|_| ColorParseError(s.to_string()))?;
        Ok(Self::rgb(parsed.red, parsed.green, parsed.blue))
    }
}

impl TryFrom<String> for DisplayColor {
    type Error = ColorParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<DisplayColor> for String {
    fn from(color: DisplayColor) -> Self {
        color.to_string()
    }
}

impl fmt::Display for DisplayColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{name}"),
            None => {
                let [r, g, b] = self.rgb;
                write!(f, "#{r:02x}{g:02x}{b:02x}")
            }
        }
    }
}
