//! Floating spatial filter panel.
//!
//! Widgets write into a [`ControlPanel`]; the app turns the differences into
//! control intents after the frame.

use eframe::egui;
use sheetmap_core::panel::{
    count_readout, RADIUS_MAX_METERS, RADIUS_MIN_METERS, RADIUS_STEP_METERS,
};
use sheetmap_core::{ControlPanel, FilterMode, VisibilityCounts};

/// Window hosting the filter controls
#[derive(Debug, Default)]
pub struct FilterPanelWindow {
    collapsed: bool,
}

impl FilterPanelWindow {
    /// Draw the panel; returns true when a data reload was requested
    pub fn render(
        &mut self,
        ctx: &egui::Context,
        panel: &mut ControlPanel,
        counts: Option<VisibilityCounts>,
    ) -> bool {
        let mut reload = false;

        egui::Window::new("Spatial filter")
            .anchor(egui::Align2::LEFT_TOP, egui::vec2(10.0, 10.0))
            .resizable(false)
            .collapsible(false)
            .frame(
                egui::Frame::window(&ctx.style())
                    .fill(egui::Color32::from_rgba_unmultiplied(250, 250, 250, 235))
                    .corner_radius(6.0),
            )
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.checkbox(&mut panel.enabled, "Filter by distance");
                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        let icon = if self.collapsed { "▼" } else { "▲" };
                        if ui
                            .small_button(icon)
                            .on_hover_text(if self.collapsed { "Expand" } else { "Collapse" })
                            .clicked()
                        {
                            self.collapsed = !self.collapsed;
                        }
                    });
                });

                if self.collapsed {
                    return;
                }

                ui.separator();

                ui.horizontal(|ui| {
                    ui.label("Center:");
                    for mode in FilterMode::ALL {
                        ui.radio_value(&mut panel.mode, mode, mode.label());
                    }
                });

                ui.horizontal(|ui| {
                    ui.label("Radius:");
                    ui.add(
                        egui::Slider::new(
                            &mut panel.radius_meters,
                            RADIUS_MIN_METERS..=RADIUS_MAX_METERS,
                        )
                        .step_by(RADIUS_STEP_METERS)
                        .show_value(false),
                    );
                    ui.monospace(panel.radius_readout());
                });

                ui.horizontal(|ui| {
                    if ui.button("Apply").clicked() {
                        panel.press_apply();
                    }
                    if ui
                        .button("⟳ Relocate")
                        .on_hover_text("Request a new location fix")
                        .clicked()
                    {
                        panel.press_relocate();
                    }
                });

                ui.separator();
                ui.horizontal(|ui| {
                    ui.label("Visible:");
                    ui.strong(count_readout(counts));
                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        if ui
                            .small_button("Reload data")
                            .on_hover_text("Fetch both feeds again")
                            .clicked()
                        {
                            reload = true;
                        }
                    });
                });
            });

        reload
    }
}
