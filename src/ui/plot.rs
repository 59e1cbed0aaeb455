use eframe::egui::Ui;
use egui_plot::{Bar, BarChart, Plot, VLine};

use crate::state::LayerState;

// ---------------------------------------------------------------------------
// Intensity histogram (side panel, one per layer)
// ---------------------------------------------------------------------------

/// Render a layer's histogram with its contrast window as vertical lines.
pub fn histogram_plot(ui: &mut Ui, layer: &LayerState) {
    let color = layer.color.to_color32();
    let hist = &layer.histogram;
    let width = hist.bin_width();

    // log scale keeps sparse bright tails visible
    let bars: Vec<Bar> = hist
        .counts
        .iter()
        .enumerate()
        .map(|(i, &n)| Bar::new(hist.bin_center(i), (n as f64).ln_1p()).width(width))
        .collect();

    Plot::new(format!("histogram_{}", layer.channel))
        .height(90.0)
        .show_axes([true, false])
        .show_grid(false)
        .allow_drag(false)
        .allow_scroll(false)
        .allow_zoom(false)
        .allow_boxed_zoom(false)
        .show(ui, |plot_ui| {
            plot_ui.bar_chart(BarChart::new(bars).color(color));
            plot_ui.vline(VLine::new(layer.limits.low).color(color).width(1.5));
            plot_ui.vline(VLine::new(layer.limits.high).color(color).width(1.5));
        });
}
