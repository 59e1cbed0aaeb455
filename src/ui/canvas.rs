use eframe::egui::{self, ColorImage, TextureHandle, TextureOptions, Ui};
use ndarray::Axis;

use crate::data::model::ChannelImage;
use crate::state::ViewerState;

// ---------------------------------------------------------------------------
// Additive composite of the visible layers
// ---------------------------------------------------------------------------

/// Blend the visible layers at the current slice.
///
/// Each layer maps `[low, high]` to `[0, 1]` and tints it with its colour;
/// tints are summed and saturate at white.
pub fn composite(images: &[ChannelImage], state: &ViewerState) -> ColorImage {
    let height = images.iter().map(|i| i.plane_size().0).max().unwrap_or(0);
    let width = images.iter().map(|i| i.plane_size().1).max().unwrap_or(0);
    let mut acc = vec![[0f32; 3]; width * height];

    for (img, layer) in images.iter().zip(&state.layers) {
        if !layer.visible || img.depth() == 0 || !layer.limits.is_valid() {
            continue;
        }
        let z = state.z.min(img.depth() - 1);
        let plane = img.data.index_axis(Axis(0), z);
        let tint = layer.color.unit_rgb();
        let low = layer.limits.low;
        let span = layer.limits.span();

        for ((y, x), &v) in plane.indexed_iter() {
            let t = ((v - low) / span).clamp(0.0, 1.0) as f32;
            let px = &mut acc[y * width + x];
            for c in 0..3 {
                px[c] += t * tint[c];
            }
        }
    }

    let rgb: Vec<u8> = acc
        .iter()
        .flat_map(|px| px.map(|c| (c.min(1.0) * 255.0).round() as u8))
        .collect();
    ColorImage::from_rgb([width, height], &rgb)
}

// ---------------------------------------------------------------------------
// Central panel
// ---------------------------------------------------------------------------

/// Show the composite, re-uploading the texture when the state changed.
pub fn image_view(
    ui: &mut Ui,
    images: &[ChannelImage],
    state: &mut ViewerState,
    texture: &mut Option<TextureHandle>,
) {
    if state.dirty || texture.is_none() {
        let image = composite(images, state);
        if let Some(tex) = texture.as_mut() {
            tex.set(image, TextureOptions::NEAREST);
        } else {
            *texture = Some(ui.ctx().load_texture("composite", image, TextureOptions::NEAREST));
        }
        state.dirty = false;
    }

    let Some(tex) = texture.as_ref() else {
        return;
    };
    ui.centered_and_justified(|ui: &mut Ui| {
        ui.add(egui::Image::new(tex).shrink_to_fit());
    });
}

#[cfg(test)]
mod tests {
    use ndarray::Array3;

    use super::*;
    use crate::color::DisplayColor;
    use crate::config::ChannelSettings;

    fn image(name: &str, color: DisplayColor, values: Vec<f64>) -> ChannelImage {
        ChannelImage {
            channel: name.to_string(),
            scene: name.to_string(),
            settings: ChannelSettings { color, sigma: 0.0 },
            data: Array3::from_shape_vec((1, 1, values.len()), values).unwrap(),
        }
    }

    #[test]
    fn layers_add_up() {
        let images = vec![
            image("R", DisplayColor::RED, vec![0.0, 10.0, 10.0]),
            image("G", DisplayColor::GREEN, vec![10.0, 0.0, 10.0]),
        ];
        let state = ViewerState::new("t", &images, None);
        let out = composite(&images, &state);

        assert_eq!(out.size, [3, 1]);
        assert_eq!(out.pixels[0], egui::Color32::from_rgb(0, 255, 0));
        assert_eq!(out.pixels[1], egui::Color32::from_rgb(255, 0, 0));
        assert_eq!(out.pixels[2], egui::Color32::from_rgb(255, 255, 0));
    }

    #[test]
    fn hidden_layers_and_window_apply() {
        let images = vec![
            image("R", DisplayColor::RED, vec![0.0, 100.0]),
            image("G", DisplayColor::GREEN, vec![0.0, 100.0]),
        ];
        let mut state = ViewerState::new("t", &images, None);
        state.set_visible(1, false);
        state.set_high(0, 50.0);

        let out = composite(&images, &state);
        assert_eq!(out.pixels[0], egui::Color32::from_rgb(0, 0, 0));
        assert_eq!(out.pixels[1], egui::Color32::from_rgb(255, 0, 0));
    }
}
