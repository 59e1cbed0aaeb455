use std::time::Instant;

use eframe::egui::{self, Color32, RichText, ScrollArea, Ui};

use crate::pipeline::save_limits;
use crate::state::ViewerState;
use crate::ui::plot;

/// Buttons in the top bar that end the viewer session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BarAction {
    None,
    Export,
    Skip,
}

// ---------------------------------------------------------------------------
// Left side panel – per-layer contrast controls
// ---------------------------------------------------------------------------

/// Render the left layer panel.
pub fn side_panel(ui: &mut Ui, state: &mut ViewerState) {
    ui.heading("Layers");
    ui.separator();

    if state.layers.is_empty() {
        ui.label("No layers.");
        return;
    }

    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            // ---- Depth slice selector ----
            if state.depth > 1 {
                let mut z = state.z;
                let slider = egui::Slider::new(&mut z, 0..=state.depth - 1).text("z slice");
                if ui.add(slider).changed() {
                    state.set_z(z);
                }
                ui.separator();
            }

            // ---- Per-layer widgets (collapsible) ----
            for i in 0..state.layers.len() {
                let layer = state.layers[i].clone();
                let header = RichText::new(&layer.channel)
                    .strong()
                    .color(layer.color.to_color32());

                egui::CollapsingHeader::new(header)
                    .id_salt(&layer.channel)
                    .default_open(true)
                    .show(ui, |ui: &mut Ui| {
                        ui.horizontal(|ui: &mut Ui| {
                            let mut visible = layer.visible;
                            if ui.checkbox(&mut visible, "visible").changed() {
                                state.set_visible(i, visible);
                            }
                            if ui.small_button("Reset").clicked() {
                                state.reset(i);
                            }
                        });

                        let bounds = layer.range.low..=layer.range.high;
                        let mut low = layer.limits.low;
                        if ui
                            .add(egui::Slider::new(&mut low, bounds.clone()).text("low"))
                            .changed()
                        {
                            state.set_low(i, low);
                        }
                        let mut high = layer.limits.high;
                        if ui
                            .add(egui::Slider::new(&mut high, bounds).text("high"))
                            .changed()
                        {
                            state.set_high(i, high);
                        }

                        plot::histogram_plot(ui, &state.layers[i]);
                    });
            }
        });
}

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the top menu / toolbar.
pub fn top_bar(ui: &mut Ui, state: &mut ViewerState) -> BarAction {
    let mut action = BarAction::None;

    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.menu_button("File", |ui: &mut Ui| {
            if ui.button("Save limits…").clicked() {
                save_limits_dialog(state);
                ui.close_menu();
            }
        });

        ui.separator();
        ui.label(RichText::new(&state.title).strong());
        ui.label(format!("{} layer(s), {} z-slice(s)", state.layers.len(), state.depth));
        ui.separator();

        if ui.button("Export").clicked() {
            action = BarAction::Export;
        }
        if ui.button("Skip file").clicked() {
            action = BarAction::Skip;
        }

        if let Some(left) = state.remaining(Instant::now()) {
            ui.separator();
            ui.label(format!("skipping in {}s", left.as_secs()));
        }

        if let Some(msg) = &state.status_message {
            ui.label(RichText::new(msg).color(Color32::RED));
        }
    });

    action
}

// ---------------------------------------------------------------------------
// File dialog
// ---------------------------------------------------------------------------

pub fn save_limits_dialog(state: &mut ViewerState) {
    let file = rfd::FileDialog::new()
        .set_title("Save contrast limits")
        .add_filter("JSON", &["json"])
        .set_file_name(format!("{}-limits.json", state.title))
        .save_file();

    if let Some(path) = file {
        match save_limits(&path, &state.limits_file()) {
            Ok(()) => {
                log::info!("Saved contrast limits to {}", path.display());
                state.status_message = None;
            }
            Err(e) => {
                log::error!("Failed to save limits: {e:#}");
                state.status_message = Some(format!("Error: {e:#}"));
            }
        }
    }
}
