//! UI components for SheetMap Desktop.
//!
//! This module contains the windows and panels drawn around the map.

pub mod filter_panel;
pub mod notices;
pub mod sidebar;

pub use filter_panel::FilterPanelWindow;
pub use notices::NoticeBoard;
pub use sidebar::Sidebar;
