pub mod chat_loop;

use ratatui::{
    layout::{Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

use crate::core::catalog;
use crate::core::session::ChatSession;

/// View-only state: input buffer, scroll position, and transient status.
/// Conversation content lives in the session; this layer never mutates it.
pub struct ChatUi {
    pub input: String,
    pub scroll_offset: u16,
    pub auto_scroll: bool,
    pub status: Option<String>,
    pub title: Option<String>,
}

impl ChatUi {
    pub fn new() -> Self {
        Self {
            input: String::new(),
            scroll_offset: 0,
            auto_scroll: true,
            status: None,
            title: None,
        }
    }
}

impl Default for ChatUi {
    fn default() -> Self {
        Self::new()
    }
}

pub fn max_scroll_offset(total_rows: u16, available_height: u16) -> u16 {
    total_rows.saturating_sub(available_height)
}

/// Number of terminal rows the transcript occupies once word-wrapped to
/// `width`. The transcript renders with `Wrap { trim: true }`, so scroll
/// bounds must count wrapped rows, not logical lines.
pub fn wrapped_line_count(lines: &[Line], width: u16) -> u16 {
    if width == 0 {
        return lines.len().min(u16::MAX as usize) as u16;
    }
    let width = width as usize;
    let mut rows: usize = 0;
    for line in lines {
        let text: String = line.spans.iter().map(|s| s.content.as_ref()).collect();
        rows += rows_for_text(&text, width);
    }
    rows.min(u16::MAX as usize) as u16
}

/// Greedy word wrap, mirroring the renderer: words are kept whole when they
/// fit, and a word longer than the pane spills across full rows.
fn rows_for_text(text: &str, width: usize) -> usize {
    let mut words = text.split_whitespace().peekable();
    if words.peek().is_none() {
        return 1;
    }

    let mut rows = 1;
    let mut col = 0;
    for word in words {
        let len = word.chars().count();
        let sep = usize::from(col > 0);
        if col + sep + len <= width {
            col += sep + len;
        } else if len <= width {
            rows += 1;
            col = len;
        } else {
            if col > 0 {
                rows += 1;
            }
            let full_rows = (len - 1) / width;
            rows += full_rows;
            col = len - full_rows * width;
        }
    }
    rows
}

pub fn build_display_lines<'a>(session: &'a ChatSession, _ui: &ChatUi) -> Vec<Line<'a>> {
    let mut lines = Vec::new();
    let turn_count = session.conversation().len();

    for (index, turn) in session.conversation().iter().enumerate() {
        let is_last = index + 1 == turn_count;

        lines.push(Line::from(vec![
            Span::styled(
                "You: ",
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(turn.user_message.as_str(), Style::default().fg(Color::Cyan)),
        ]));
        lines.push(Line::from(""));

        if !turn.ai_message.is_empty() {
            for content_line in turn.ai_message.lines() {
                if content_line.trim().is_empty() {
                    lines.push(Line::from(""));
                } else {
                    lines.push(Line::from(Span::styled(
                        content_line,
                        Style::default().fg(Color::White),
                    )));
                }
            }
        } else if is_last && session.is_generating() {
            lines.push(Line::from(Span::styled(
                "…",
                Style::default().fg(Color::Yellow),
            )));
        }

        if session.turn_incomplete(index) {
            lines.push(Line::from(Span::styled(
                "[response incomplete]",
                Style::default().fg(Color::DarkGray),
            )));
        }

        lines.push(Line::from(""));
    }

    lines
}

pub fn draw(f: &mut Frame, session: &ChatSession, ui: &ChatUi) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(3)])
        .split(f.area());

    let lines = build_display_lines(session, ui);
    let available_height = chunks[0].height.saturating_sub(1);
    let total_rows = wrapped_line_count(&lines, chunks[0].width);
    let scroll_offset = ui
        .scroll_offset
        .min(max_scroll_offset(total_rows, available_height));

    let model_label = catalog::find(session.model_id())
        .map(|m| m.label)
        .unwrap_or(session.model_id());
    let transcript_title = match &ui.title {
        Some(title) => format!("{title} — {model_label}"),
        None => format!("Palaver — {model_label}"),
    };

    let transcript = Paragraph::new(lines)
        .block(Block::default().title(transcript_title))
        .wrap(Wrap { trim: true })
        .scroll((scroll_offset, 0));
    f.render_widget(transcript, chunks[0]);

    let input_title = match &ui.status {
        Some(status) => status.clone(),
        None if session.is_generating() => "Generating… (Esc to cancel)".to_string(),
        None => "Enter: send · ^P: model · ^Y: copy reply · ^C: quit".to_string(),
    };

    let input = Paragraph::new(ui.input.as_str())
        .style(Style::default().fg(Color::Yellow))
        .block(Block::default().borders(Borders::ALL).title(input_title))
        .wrap(Wrap { trim: true });
    f.render_widget(input, chunks[1]);

    // Column from the character count, not byte length, clamped to the pane.
    let cursor_col = (ui.input.chars().count() as u16).min(chunks[1].width.saturating_sub(2));
    f.set_cursor_position((chunks[1].x + cursor_col + 1, chunks[1].y + 1));
}
