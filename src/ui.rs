mod files;
mod help;
pub mod hunks;

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    Frame,
};

use crate::app::StageApp;

pub use files::draw_files;
pub use help::{draw_status_line, status_text};
pub use hunks::{build_hunk_layout, draw_hunks, wrap_line, HunkLayout};

/// Screen regions, computed once per frame and shared with the event loop so
/// the diff width is known before any hunk is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UiLayout {
    pub files: Rect,
    pub hunks: Rect,
    pub status: Rect,
}

impl UiLayout {
    /// Columns available to rendered hunk text inside the diff pane.
    pub fn diff_content_width(&self) -> u16 {
        self.hunks
            .width
            .saturating_sub(2 + hunks::GUTTER_WIDTH)
            .max(1)
    }

    /// Rows visible inside the diff pane.
    pub fn diff_content_height(&self) -> u16 {
        self.hunks.height.saturating_sub(2)
    }
}

pub fn compute_layout(area: Rect) -> UiLayout {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(1), Constraint::Length(1)])
        .split(area);

    let panels = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(25), Constraint::Percentage(75)])
        .split(chunks[0]);

    UiLayout {
        files: panels[0],
        hunks: panels[1],
        status: chunks[1],
    }
}

pub fn draw(frame: &mut Frame, app: &StageApp) {
    let layout = compute_layout(frame.area());
    draw_files(frame, app, layout.files);
    draw_hunks(frame, app, layout.hunks);
    draw_status_line(frame, app, layout.status);
}
