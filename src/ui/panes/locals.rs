//! Locals pane: the frame of the current step
//!
//! Shows the function and event of the step, any exception it carries, and
//! the serialized locals in declaration order.

use super::utils::{clamp_scroll, pane_block, value_spans};
use crate::trace::outcome::{EventKind, TraceStep};
use crate::ui::theme::DEFAULT_THEME;
use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{List, ListItem, Paragraph},
    Frame,
};

pub fn render_locals_pane(
    frame: &mut Frame,
    area: Rect,
    step: Option<&TraceStep>,
    is_focused: bool,
    scroll_offset: &mut usize,
) {
    let block = pane_block("Locals", is_focused);

    let Some(step) = step else {
        let paragraph = Paragraph::new("(no steps recorded)")
            .block(block)
            .style(Style::default().fg(DEFAULT_THEME.comment));
        frame.render_widget(paragraph, area);
        return;
    };

    let mut items = vec![ListItem::new(frame_header(step))];
    if let Some(exception) = &step.exception {
        items.push(ListItem::new(Line::from(vec![
            Span::styled(
                format!("  {}", exception.kind),
                Style::default()
                    .fg(DEFAULT_THEME.error)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                format!(": {}", exception.message),
                Style::default().fg(DEFAULT_THEME.error),
            ),
        ])));
    }

    if step.locals.is_empty() {
        items.push(ListItem::new(Span::styled(
            "  (no locals)",
            Style::default().fg(DEFAULT_THEME.comment),
        )));
    }
    for (name, value) in &step.locals {
        let mut spans = vec![
            Span::styled(format!("  {}", name), Style::default().fg(DEFAULT_THEME.fg)),
            Span::styled(" = ", Style::default().fg(DEFAULT_THEME.comment)),
        ];
        spans.extend(value_spans(value));
        items.push(ListItem::new(Line::from(spans)));
    }

    let visible_height = area.height.saturating_sub(2).max(1) as usize;
    clamp_scroll(scroll_offset, items.len(), visible_height);
    let visible: Vec<ListItem> = items
        .into_iter()
        .skip(*scroll_offset)
        .take(visible_height)
        .collect();

    frame.render_widget(List::new(visible).block(block), area);
}

fn frame_header(step: &TraceStep) -> Line<'static> {
    let (event, color) = match step.event {
        EventKind::Line => ("line", DEFAULT_THEME.primary),
        EventKind::Return => ("return", DEFAULT_THEME.return_value),
        EventKind::Exception => ("exception", DEFAULT_THEME.error),
    };
    Line::from(vec![
        Span::styled(
            step.func.clone(),
            Style::default()
                .fg(DEFAULT_THEME.function)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            format!("  line {} ", step.line),
            Style::default().fg(DEFAULT_THEME.comment),
        ),
        Span::styled(format!("[{}]", event), Style::default().fg(color)),
    ])
}
