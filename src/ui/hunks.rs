use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, BorderType, Borders, Paragraph},
    Frame,
};
use unicode_width::UnicodeWidthChar;

use crate::app::{DisplayHunk, Pane, Phase, StageApp};

/// Columns taken by the staged/unstaged gutter in front of every row.
pub const GUTTER_WIDTH: u16 = 2;

const TAB_STOP: &str = "    ";

/// The hunk sequence flattened into display rows at a fixed width.
#[derive(Debug, Clone, Default)]
pub struct HunkLayout {
    /// Each row with the index of the hunk it belongs to.
    pub rows: Vec<(usize, Line<'static>)>,
    /// First row of each hunk (its separator).
    pub offsets: Vec<usize>,
    pub width: u16,
}

impl HunkLayout {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Row where hunk `index` begins, or 0 when out of range.
    pub fn offset_of(&self, index: usize) -> usize {
        self.offsets.get(index).copied().unwrap_or(0)
    }
}

/// Frame every hunk with a labelled separator and hard-wrap its rendered
/// text to `width`. Renderers do not always honor the requested width, so
/// wrapping happens here unconditionally.
pub fn build_hunk_layout(hunks: &[DisplayHunk], width: u16) -> HunkLayout {
    let mut layout = HunkLayout {
        width,
        ..HunkLayout::default()
    };

    for (i, hunk) in hunks.iter().enumerate() {
        layout.offsets.push(layout.rows.len());
        layout
            .rows
            .push((i, separator(i, hunks.len(), hunk.origin_staged, width)));

        let rendered = hunk.rendered.trim_end_matches('\n');
        let text = ansi_to_tui::IntoText::into_text(&rendered)
            .unwrap_or_else(|_| Text::raw(rendered.to_string()));
        for line in text.lines {
            for row in wrap_line(line, width) {
                layout.rows.push((i, row));
            }
        }
    }

    layout
}

fn separator(index: usize, total: usize, staged: bool, width: u16) -> Line<'static> {
    let label = if staged {
        format!("── Hunk {}/{} [staged] ", index + 1, total)
    } else {
        format!("── Hunk {}/{} ", index + 1, total)
    };
    let used = label.chars().count();
    let fill = "─".repeat((width as usize).saturating_sub(used));
    Line::from(Span::styled(
        format!("{label}{fill}"),
        Style::default().fg(Color::DarkGray),
    ))
}

/// Split one styled line into rows no wider than `width` display columns.
/// Always yields at least one row.
pub fn wrap_line(line: Line<'static>, width: u16) -> Vec<Line<'static>> {
    let width = usize::from(width.max(1));
    let line_style = line.style;
    let mut rows = Vec::new();
    let mut current: Vec<Span<'static>> = Vec::new();
    let mut used = 0usize;

    for span in line.spans {
        let style = span.style;
        let content = span.content.replace('\t', TAB_STOP);
        let mut chunk = String::new();
        for ch in content.chars() {
            let w = ch.width().unwrap_or(0);
            if used + w > width && used > 0 {
                if !chunk.is_empty() {
                    current.push(Span::styled(std::mem::take(&mut chunk), style));
                }
                rows.push(Line::from(std::mem::take(&mut current)).style(line_style));
                used = 0;
            }
            chunk.push(ch);
            used += w;
        }
        if !chunk.is_empty() {
            current.push(Span::styled(chunk, style));
        }
    }

    rows.push(Line::from(current).style(line_style));
    rows
}

fn gutter(staged: bool, active: bool) -> Span<'static> {
    let color = match (staged, active) {
        (true, true) => Color::LightGreen,
        (false, true) => Color::LightYellow,
        (true, false) => Color::Green,
        (false, false) => Color::DarkGray,
    };
    let mut style = Style::default().fg(color);
    if active {
        style = style.add_modifier(Modifier::BOLD);
    }
    Span::styled(if active { "▌ " } else { "│ " }, style)
}

pub fn draw_hunks(frame: &mut Frame, app: &StageApp, area: Rect) {
    let border_style = if app.focus == Pane::Hunks {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default().fg(Color::DarkGray)
    };
    let title = match app.hunks_path() {
        Some(path) => format!(" {path} "),
        None => " Diff ".to_string(),
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .title(title)
        .border_style(border_style);

    let hunks = app.hunks();
    let layout = app.layout();
    if hunks.is_empty() {
        let msg = match app.phase() {
            Phase::Loading => "Loading…",
            _ if app.files.is_empty() => "Working tree clean.",
            _ => "No hunks.",
        };
        let placeholder = Paragraph::new(Line::from(Span::styled(
            msg,
            Style::default().fg(Color::DarkGray),
        )))
        .block(block);
        frame.render_widget(placeholder, area);
        return;
    }

    let height = usize::from(area.height.saturating_sub(2));
    let lines: Vec<Line> = layout
        .rows
        .iter()
        .skip(app.scroll)
        .take(height)
        .map(|(index, row)| {
            let staged = hunks.get(*index).is_some_and(|h| h.origin_staged);
            let mut spans = vec![gutter(staged, *index == app.selected_hunk)];
            spans.extend(row.spans.iter().cloned());
            Line::from(spans).style(row.style)
        })
        .collect();

    frame.render_widget(Paragraph::new(lines).block(block), area);
}
