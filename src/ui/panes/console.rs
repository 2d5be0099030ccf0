//! Console pane: captured stdout and stderr of the run

use super::utils::{clamp_scroll, pane_block};
use crate::trace::outcome::{NoticeLevel, StatusNotice};
use crate::ui::theme::DEFAULT_THEME;
use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{List, ListItem, Padding, Paragraph},
    Frame,
};

pub struct ConsoleRenderData<'a> {
    pub stdout: &'a str,
    pub stderr: &'a str,
    /// Why the trace ended early, if it did
    pub notice: Option<&'a StatusNotice>,
}

pub fn render_console_pane(
    frame: &mut Frame,
    area: Rect,
    data: ConsoleRenderData<'_>,
    is_focused: bool,
    scroll_offset: &mut usize,
) {
    let block = pane_block("Console", is_focused);
    let items = console_lines(&data);

    if items.is_empty() {
        let paragraph = Paragraph::new("(no output)")
            .block(block)
            .style(Style::default().fg(DEFAULT_THEME.comment));
        frame.render_widget(paragraph, area);
        return;
    }

    let block = block.padding(Padding::new(1, 0, 0, 0));
    let visible_height = area.height.saturating_sub(2).max(1) as usize;
    clamp_scroll(scroll_offset, items.len(), visible_height);

    let visible: Vec<ListItem> = items
        .into_iter()
        .skip(*scroll_offset)
        .take(visible_height)
        .map(ListItem::new)
        .collect();
    frame.render_widget(List::new(visible).block(block), area);
}

fn console_lines<'a>(data: &ConsoleRenderData<'a>) -> Vec<Line<'a>> {
    let mut lines: Vec<Line> = data
        .stdout
        .lines()
        .map(|line| Line::styled(line, Style::default().fg(DEFAULT_THEME.fg)))
        .collect();
    lines.extend(
        data.stderr
            .lines()
            .map(|line| Line::styled(line, Style::default().fg(DEFAULT_THEME.error))),
    );

    if let Some(notice) = data.notice {
        let color = match notice.status {
            NoticeLevel::Warning => DEFAULT_THEME.warning,
            NoticeLevel::Error => DEFAULT_THEME.error,
        };
        lines.push(Line::from(vec![
            Span::styled(
                format!("{}: ", notice.title),
                Style::default().fg(color).add_modifier(Modifier::BOLD),
            ),
            Span::styled(notice.desc.as_str(), Style::default().fg(color)),
        ]));
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_console_lines_order() {
        let notice = StatusNotice::cancelled();
        let data = ConsoleRenderData {
            stdout: "a\nb\n",
            stderr: "ValueError: bad\n",
            notice: Some(&notice),
        };
        let lines = console_lines(&data);
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0].to_string(), "a");
        assert_eq!(lines[2].to_string(), "ValueError: bad");
        assert!(lines[3].to_string().starts_with(&notice.title));
    }
}
