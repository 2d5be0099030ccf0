//! Shared helpers for pane rendering
//!
//! All functions here are `pub(super)`, visible only within the panes module.

use crate::trace::serialize::{SequenceTag, SerializedValue};
use crate::ui::theme::DEFAULT_THEME;
use ratatui::{
    style::{Modifier, Style},
    text::Span,
    widgets::{Block, Borders},
};

/// Bordered block whose border reflects focus
pub(super) fn pane_block(title: &str, is_focused: bool) -> Block<'static> {
    let border_style = if is_focused {
        Style::default()
            .fg(DEFAULT_THEME.border_focused)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(DEFAULT_THEME.border_normal)
    };

    Block::default()
        .title(format!(" {} ", title))
        .borders(Borders::ALL)
        .border_style(border_style)
}

/// Clamp `offset` so the last page stays full
pub(super) fn clamp_scroll(offset: &mut usize, total_items: usize, visible_height: usize) {
    if total_items > visible_height {
        *offset = (*offset).min(total_items - visible_height);
    } else {
        *offset = 0;
    }
}

/// Render a serialized value as styled spans, coloring scalars by kind
pub(super) fn value_spans(value: &SerializedValue) -> Vec<Span<'static>> {
    let mut spans = Vec::new();
    push_value_spans(value, &mut spans);
    spans
}

fn push_value_spans(value: &SerializedValue, spans: &mut Vec<Span<'static>>) {
    let punct = Style::default().fg(DEFAULT_THEME.fg);
    match value {
        SerializedValue::None | SerializedValue::Bool(_) => {
            spans.push(Span::styled(value.to_string(), Style::default().fg(DEFAULT_THEME.keyword)));
        }
        SerializedValue::Int(_) | SerializedValue::Float(_) => {
            spans.push(Span::styled(value.to_string(), Style::default().fg(DEFAULT_THEME.number)));
        }
        SerializedValue::Str(_) => {
            spans.push(Span::styled(value.to_string(), Style::default().fg(DEFAULT_THEME.string)));
        }
        SerializedValue::Sequence {
            tag,
            items,
            overflow,
        } => {
            let (open, close) = match tag {
                None => ("[", "]"),
                Some(SequenceTag::Tuple) => ("(", ")"),
                Some(SequenceTag::Set) => ("{", "}"),
            };
            spans.push(Span::styled(open, punct));
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    spans.push(Span::styled(", ", punct));
                }
                push_value_spans(item, spans);
            }
            if *overflow > 0 {
                spans.push(Span::styled(
                    format!(", +{} more", overflow),
                    Style::default().fg(DEFAULT_THEME.comment),
                ));
            } else if *tag == Some(SequenceTag::Tuple) && items.len() == 1 {
                spans.push(Span::styled(",", punct));
            }
            spans.push(Span::styled(close, punct));
        }
        SerializedValue::Mapping { entries, overflow } => {
            spans.push(Span::styled("{", punct));
            for (i, (key, item)) in entries.iter().enumerate() {
                if i > 0 {
                    spans.push(Span::styled(", ", punct));
                }
                spans.push(Span::styled(key.clone(), Style::default().fg(DEFAULT_THEME.fg)));
                spans.push(Span::styled(": ", punct));
                push_value_spans(item, spans);
            }
            if *overflow > 0 {
                spans.push(Span::styled(
                    format!(", +{} more", overflow),
                    Style::default().fg(DEFAULT_THEME.comment),
                ));
            }
            spans.push(Span::styled("}", punct));
        }
        SerializedValue::Ellipsis => {
            spans.push(Span::styled("...", Style::default().fg(DEFAULT_THEME.comment)));
        }
        SerializedValue::OpaqueText { .. } | SerializedValue::Opaque { .. } => {
            spans.push(Span::styled(value.to_string(), Style::default().fg(DEFAULT_THEME.type_name)));
        }
        SerializedValue::Unserializable => {
            spans.push(Span::styled(value.to_string(), Style::default().fg(DEFAULT_THEME.error)));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(spans: &[Span<'_>]) -> String {
        spans.iter().map(|span| span.content.as_ref()).collect()
    }

    #[test]
    fn test_value_spans_text() {
        let value = SerializedValue::Sequence {
            tag: Some(SequenceTag::Tuple),
            items: vec![SerializedValue::Int(1)],
            overflow: 0,
        };
        assert_eq!(text(&value_spans(&value)), "(1,)");

        let value = SerializedValue::Sequence {
            tag: None,
            items: vec![SerializedValue::Str("a".into()), SerializedValue::None],
            overflow: 3,
        };
        assert_eq!(text(&value_spans(&value)), "['a', None, +3 more]");
    }

    #[test]
    fn test_clamp_scroll() {
        let mut offset = 10;
        clamp_scroll(&mut offset, 12, 5);
        assert_eq!(offset, 7);
        clamp_scroll(&mut offset, 3, 5);
        assert_eq!(offset, 0);
    }
}
