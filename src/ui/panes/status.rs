//! Status bar rendering with keybindings and state indicators

use crate::trace::outcome::RunStatus;
use crate::ui::player::TracePlayer;
use crate::ui::theme::DEFAULT_THEME;
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

pub struct StatusRenderData<'a> {
    pub message: &'a str,
    pub player: &'a TracePlayer,
    pub status: RunStatus,
}

fn status_label(status: RunStatus) -> (&'static str, Color) {
    match status {
        RunStatus::Ok => ("OK", DEFAULT_THEME.success),
        RunStatus::Truncated => ("TRUNCATED", DEFAULT_THEME.warning),
        RunStatus::Cancelled => ("CANCELLED", DEFAULT_THEME.warning),
        RunStatus::SyntaxError => ("SYNTAX ERROR", DEFAULT_THEME.error),
        RunStatus::RuntimeError => ("RUNTIME ERROR", DEFAULT_THEME.error),
    }
}

/// `Step i/N`, with `0/0` for an empty trace
fn step_text(player: &TracePlayer) -> String {
    if player.total() == 0 {
        " Step 0/0 ".to_string()
    } else {
        format!(" Step {}/{} ", player.current() + 1, player.total())
    }
}

pub fn render_status_bar(frame: &mut Frame, area: Rect, data: StatusRenderData<'_>) {
    let layout = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(area);

    let (label, label_color) = status_label(data.status);
    let bar_bg = DEFAULT_THEME.current_line_bg;

    let left_spans = vec![
        Span::styled(
            step_text(data.player),
            Style::default()
                .bg(DEFAULT_THEME.primary)
                .fg(Color::Black)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            format!(" {} ", label),
            Style::default()
                .bg(label_color)
                .fg(Color::Black)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            format!(" {} ", data.message),
            Style::default().bg(bar_bg).fg(DEFAULT_THEME.fg),
        ),
    ];

    let left_paragraph = Paragraph::new(Line::from(left_spans))
        .style(Style::default().bg(bar_bg))
        .alignment(Alignment::Left);
    frame.render_widget(left_paragraph, layout[0]);

    let key_style = Style::default().bg(DEFAULT_THEME.comment).fg(Color::Black);
    let desc_style = Style::default().bg(bar_bg).fg(DEFAULT_THEME.fg);
    let sep_style = Style::default().bg(bar_bg).fg(DEFAULT_THEME.comment);

    let mut right_spans = vec![
        Span::styled(" ←/→ ", key_style),
        Span::styled(" step ", desc_style),
        Span::styled("│", sep_style),
        Span::styled(" ", desc_style),
        Span::styled(" ⎵ ", key_style),
        Span::styled(" play ", desc_style),
        Span::styled("│", sep_style),
        Span::styled(" ", desc_style),
        Span::styled(" ↵ / ⌫ ", key_style),
        Span::styled(" end/start ", desc_style),
        Span::styled("│", sep_style),
        Span::styled(" ", desc_style),
        Span::styled("q", key_style),
        Span::styled(" quit ", desc_style),
    ];

    let indicator = if data.player.is_playing() {
        Some((" ▶ PLAYING ", DEFAULT_THEME.secondary))
    } else if data.player.total() > 0 && data.player.at_end() {
        Some((" END ", DEFAULT_THEME.error))
    } else if data.player.at_start() {
        Some((" START ", DEFAULT_THEME.success))
    } else {
        None
    };
    if let Some((text, color)) = indicator {
        right_spans.push(Span::styled("│", sep_style));
        right_spans.push(Span::styled(
            text,
            Style::default()
                .bg(color)
                .fg(Color::Black)
                .add_modifier(Modifier::BOLD),
        ));
    }

    let right_paragraph = Paragraph::new(Line::from(right_spans))
        .style(Style::default().bg(bar_bg))
        .alignment(Alignment::Right);
    frame.render_widget(right_paragraph, layout[1]);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_text() {
        assert_eq!(step_text(&TracePlayer::new(0)), " Step 0/0 ");
        let mut player = TracePlayer::new(7);
        player.seek(2);
        assert_eq!(step_text(&player), " Step 3/7 ");
    }
}
