//! Short-lived notice toasts.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use eframe::egui;
use sheetmap_core::{Notice, NoticeLevel};

/// How long a notice stays on screen
const NOTICE_LIFETIME: Duration = Duration::from_secs(6);

/// Most notices shown at once; older ones are dropped first
const MAX_NOTICES: usize = 4;

/// Queue of notices rendered as toasts at the bottom of the map
#[derive(Debug, Default)]
pub struct NoticeBoard {
    entries: VecDeque<(Notice, Instant)>,
}

impl NoticeBoard {
    pub fn push(&mut self, notice: Notice) {
        self.push_at(notice, Instant::now());
    }

    fn push_at(&mut self, notice: Notice, now: Instant) {
        // Repeats refresh the existing toast instead of stacking
        self.entries.retain(|(existing, _)| *existing != notice);
        self.entries.push_back((notice, now));
        while self.entries.len() > MAX_NOTICES {
            self.entries.pop_front();
        }
    }

    fn prune(&mut self, now: Instant) {
        self.entries
            .retain(|(_, shown_at)| now.duration_since(*shown_at) < NOTICE_LIFETIME);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn render(&mut self, ctx: &egui::Context) {
        self.prune(Instant::now());
        if self.entries.is_empty() {
            return;
        }

        egui::Area::new(egui::Id::new("notice_board"))
            .anchor(egui::Align2::CENTER_BOTTOM, egui::vec2(0.0, -20.0))
            .interactable(false)
            .show(ctx, |ui| {
                for (notice, _) in &self.entries {
                    let (fill, text) = match notice.level {
                        NoticeLevel::Info => (
                            egui::Color32::from_rgba_unmultiplied(30, 60, 90, 230),
                            egui::Color32::WHITE,
                        ),
                        NoticeLevel::Warning => (
                            egui::Color32::from_rgba_unmultiplied(120, 50, 20, 230),
                            egui::Color32::from_rgb(255, 230, 200),
                        ),
                    };
                    egui::Frame::new()
                        .fill(fill)
                        .corner_radius(6.0)
                        .inner_margin(egui::Margin::symmetric(12, 6))
                        .show(ui, |ui| {
                            ui.label(egui::RichText::new(&notice.message).color(text));
                        });
                    ui.add_space(4.0);
                }
            });

        // Keep repainting so toasts expire without input
        ctx.request_repaint_after(Duration::from_millis(500));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notices_expire() {
        let start = Instant::now();
        let mut board = NoticeBoard::default();
        board.push_at(Notice::info("Click the map"), start);
        board.prune(start + Duration::from_secs(1));
        assert_eq!(board.len(), 1);

        board.prune(start + NOTICE_LIFETIME);
        assert_eq!(board.len(), 0);
    }

    #[test]
    fn test_repeated_notice_is_not_stacked() {
        let start = Instant::now();
        let mut board = NoticeBoard::default();
        board.push_at(Notice::warning("No fix"), start);
        board.push_at(Notice::warning("No fix"), start + Duration::from_secs(5));
        assert_eq!(board.len(), 1);

        // The refreshed copy outlives the original deadline
        board.prune(start + NOTICE_LIFETIME);
        assert_eq!(board.len(), 1);
    }

    #[test]
    fn test_oldest_notices_are_dropped() {
        let start = Instant::now();
        let mut board = NoticeBoard::default();
        for i in 0..6 {
            board.push_at(Notice::info(format!("notice {i}")), start);
        }
        assert_eq!(board.len(), MAX_NOTICES);
    }
}
