use std::time::{Duration, Instant};

use anyhow::{anyhow, Result};
use eframe::egui::{self, TextureHandle};

use crate::data::model::ChannelImage;
use crate::pipeline::{ContrastPicker, Decision};
use crate::state::ViewerState;
use crate::ui::panels::{self, BarAction};
use crate::ui::canvas;

// ---------------------------------------------------------------------------
// eframe App implementation
// ---------------------------------------------------------------------------

/// One viewer window for the layers of a single file.
pub struct ViewerApp<'a> {
    pub images: &'a [ChannelImage],
    pub state: &'a mut ViewerState,
    /// Set once the user (or the timeout) has decided.
    pub decision: &'a mut Option<Decision>,
    texture: Option<TextureHandle>,
}

impl<'a> ViewerApp<'a> {
    pub fn new(
        images: &'a [ChannelImage],
        state: &'a mut ViewerState,
        decision: &'a mut Option<Decision>,
    ) -> Self {
        Self {
            images,
            state,
            decision,
            texture: None,
        }
    }

    fn finish(&mut self, ctx: &egui::Context, decision: Decision) {
        if self.decision.is_none() {
            *self.decision = Some(decision);
        }
        ctx.send_viewport_cmd(egui::ViewportCommand::Close);
    }
}

impl eframe::App for ViewerApp<'_> {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // ---- Timeout: give up on this file ----
        let now = Instant::now();
        if self.state.timed_out(now) {
            log::warn!("{}: viewer timed out, skipping file", self.state.title);
            self.finish(ctx, Decision::Skip);
            return;
        }
        if let Some(left) = self.state.remaining(now) {
            ctx.request_repaint_after(left.min(Duration::from_secs(1)));
        }

        // ---- Closing the window accepts the current limits ----
        if ctx.input(|i| i.viewport().close_requested()) && self.decision.is_none() {
            *self.decision = Some(Decision::Accept(self.state.current_limits()));
        }

        // ---- Top panel: menu bar ----
        let action = egui::TopBottomPanel::top("top_bar")
            .show(ctx, |ui| panels::top_bar(ui, self.state))
            .inner;
        match action {
            BarAction::Export => {
                let limits = self.state.current_limits();
                self.finish(ctx, Decision::Accept(limits));
            }
            BarAction::Skip => self.finish(ctx, Decision::Skip),
            BarAction::None => {}
        }

        // ---- Left side panel: layer controls ----
        egui::SidePanel::left("layer_panel")
            .default_width(280.0)
            .resizable(true)
            .show(ctx, |ui| {
                panels::side_panel(ui, self.state);
            });

        // ---- Central panel: composite image ----
        egui::CentralPanel::default().show(ctx, |ui| {
            canvas::image_view(ui, self.images, self.state, &mut self.texture);
        });
    }
}

// ---------------------------------------------------------------------------
// Picker backed by the viewer window
// ---------------------------------------------------------------------------

/// Blocks on a viewer window per file until it is closed.
#[derive(Debug, Default)]
pub struct ViewerPicker {
    /// Skip a file when nobody decides within this time.
    pub timeout: Option<Duration>,
}

impl ContrastPicker for ViewerPicker {
    fn pick(&mut self, title: &str, layers: &[ChannelImage]) -> Result<Decision> {
        let mut state = ViewerState::new(title, layers, self.timeout);
        let mut decision = None;

        let options = eframe::NativeOptions {
            viewport: egui::ViewportBuilder::default()
                .with_title(title)
                .with_inner_size([1200.0, 800.0])
                .with_min_inner_size([600.0, 400.0]),
            ..Default::default()
        };

        eframe::run_native(
            title,
            options,
            Box::new(|_cc| Ok(Box::new(ViewerApp::new(layers, &mut state, &mut decision)))),
        )
        .map_err(|e| anyhow!("viewer for {title} failed: {e}"))?;

        // Window gone without a decision recorded: keep what was on screen.
        Ok(decision.unwrap_or_else(|| Decision::Accept(state.current_limits())))
    }
}
