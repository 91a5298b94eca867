//! Detail sidebar for the selected marker or geometry.

use eframe::egui;

/// Title shown when nothing has been selected yet
pub const EMPTY_TITLE: &str = "Nothing selected";

/// Right-hand panel with a title and a body text
#[derive(Debug, Clone)]
pub struct Sidebar {
    open: bool,
    title: String,
    body: String,
    width: f32,
}

impl Sidebar {
    pub fn new(width: f32) -> Self {
        Self {
            open: false,
            title: EMPTY_TITLE.to_string(),
            body: String::new(),
            width,
        }
    }

    /// Replace the contents and open the panel
    pub fn show_details(&mut self, title: &str, body: &str) {
        self.title = if title.trim().is_empty() {
            EMPTY_TITLE.to_string()
        } else {
            title.to_string()
        };
        self.body = body.to_string();
        self.open = true;
    }

    pub fn close(&mut self) {
        self.open = false;
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn render(&mut self, ctx: &egui::Context) {
        if !self.open {
            return;
        }

        egui::SidePanel::right("detail_sidebar")
            .resizable(true)
            .default_width(self.width)
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.heading(&self.title);
                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        if ui
                            .button(egui::RichText::new("✕").size(14.0))
                            .on_hover_text("Close")
                            .clicked()
                        {
                            self.open = false;
                        }
                    });
                });
                ui.separator();

                egui::ScrollArea::vertical().show(ui, |ui| {
                    ui.label(&self.body);
                });
            });
    }
}
