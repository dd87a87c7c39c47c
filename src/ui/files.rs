use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, List, ListItem, ListState},
    Frame,
};

use crate::app::{Pane, StageApp};
use crate::models::{FileStatus, StatusFile};

fn status_color(status: Option<FileStatus>) -> Color {
    match status {
        Some(FileStatus::Added) | Some(FileStatus::Untracked) => Color::Green,
        Some(FileStatus::Deleted) => Color::Red,
        Some(FileStatus::Renamed) | Some(FileStatus::Copied) => Color::Magenta,
        Some(FileStatus::Modified) => Color::Yellow,
        None => Color::DarkGray,
    }
}

fn file_item(file: &StatusFile) -> ListItem<'static> {
    let code = file.status_code();
    let mut letters = code.chars();
    let x = letters.next().unwrap_or(' ');
    let y = letters.next().unwrap_or(' ');
    ListItem::new(Line::from(vec![
        Span::styled(x.to_string(), Style::default().fg(status_color(file.staged))),
        Span::styled(y.to_string(), Style::default().fg(status_color(file.worktree))),
        Span::raw(" "),
        Span::raw(file.path.clone()),
    ]))
}

pub fn draw_files(frame: &mut Frame, app: &StageApp, area: Rect) {
    let border_style = if app.focus == Pane::Files {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default().fg(Color::DarkGray)
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .title(format!(" Files ({}) ", app.files.len()))
        .border_style(border_style);

    let items: Vec<ListItem> = app.files.iter().map(file_item).collect();
    let list = List::new(items).block(block).highlight_style(
        Style::default()
            .bg(Color::DarkGray)
            .add_modifier(Modifier::BOLD),
    );

    let mut state = ListState::default();
    if !app.files.is_empty() {
        state.select(Some(app.selected_file));
    }
    frame.render_stateful_widget(list, area, &mut state);
}
