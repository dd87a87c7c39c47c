use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

use crate::app::{Pane, Phase, StageApp};

fn key_hints(focus: Pane) -> &'static str {
    match focus {
        Pane::Files => "j/k: file  s/u: stage/unstage file  a: stage all  Enter/Tab: diff  r: reload  q: quit",
        Pane::Hunks => "n/p: hunk  s/u: stage/unstage hunk  ^d/^u: page  g/G: top/end  Tab: files  q: quit",
    }
}

/// Last error if there is one, otherwise position, renderer and key hints.
pub fn status_text(app: &StageApp) -> String {
    if let Some(msg) = &app.status_message {
        return format!(" {msg}");
    }

    let mut parts = Vec::new();
    if let Some(path) = app.hunks_path() {
        let total = app.hunks().len();
        if total > 0 {
            parts.push(format!("{path} [{}/{}]", app.selected_hunk + 1, total));
        } else {
            parts.push(path.to_string());
        }
    }
    parts.push(app.renderer_name().to_string());
    match app.phase() {
        Phase::Loading => parts.push("loading…".to_string()),
        Phase::Mutating => parts.push("applying…".to_string()),
        Phase::Idle => {}
    }
    parts.push(key_hints(app.focus).to_string());
    format!(" {}", parts.join(" | "))
}

pub fn draw_status_line(frame: &mut Frame, app: &StageApp, area: Rect) {
    let style = if app.status_message.is_some() {
        Style::default()
            .fg(Color::White)
            .bg(Color::Red)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default()
            .fg(Color::Black)
            .bg(Color::Cyan)
            .add_modifier(Modifier::BOLD)
    };

    let bar = Paragraph::new(Line::from(Span::styled(status_text(app), style)));
    frame.render_widget(bar, area);
}
