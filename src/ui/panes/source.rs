//! Source code pane rendering with syntax highlighting
//!
//! Displays the submitted program with basic Python highlighting, the line
//! of the current step, and the line a run failed on.
//!
//! The pane uses a character-by-character tokenizer to apply styles without
//! requiring the full lexer, so it also renders sources that do not parse.

use super::utils::pane_block;
use crate::interpreter::builtins::BuiltinFunction;
use crate::ui::theme::DEFAULT_THEME;
use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

/// Builtins implemented in Python rather than natively
const PRELUDE_NAMES: [&str; 5] = ["map", "filter", "any", "all", "reversed"];

fn highlight_source_code(line: &str) -> Line<'_> {
    let mut spans = Vec::new();
    let mut current_word = String::new();

    let chars: Vec<(usize, char)> = line.char_indices().collect();
    let mut i = 0;

    while i < chars.len() {
        let (byte, c) = chars[i];

        if c == '#' {
            flush_word(&mut spans, &mut current_word, false);
            spans.push(Span::styled(
                &line[byte..],
                Style::default().fg(DEFAULT_THEME.comment),
            ));
            break;
        }

        if c == '"' || c == '\'' {
            flush_word(&mut spans, &mut current_word, false);
            let mut end = i + 1;
            while end < chars.len() && chars[end].1 != c {
                end += if chars[end].1 == '\\' { 2 } else { 1 };
            }
            end = (end + 1).min(chars.len());
            let end_byte = chars.get(end).map_or(line.len(), |(b, _)| *b);
            spans.push(Span::styled(
                &line[byte..end_byte],
                Style::default().fg(DEFAULT_THEME.string),
            ));
            i = end;
            continue;
        }

        if !c.is_alphanumeric() && c != '_' {
            flush_word(&mut spans, &mut current_word, c == '(');
            let style = match c {
                '{' | '}' | '(' | ')' | '[' | ']' => Style::default().fg(DEFAULT_THEME.primary),
                _ => Style::default().fg(DEFAULT_THEME.fg),
            };
            spans.push(Span::styled(c.to_string(), style));
            i += 1;
            continue;
        }

        current_word.push(c);
        i += 1;
    }

    flush_word(&mut spans, &mut current_word, false);
    Line::from(spans)
}

fn flush_word(spans: &mut Vec<Span<'_>>, word: &mut String, is_call: bool) {
    if word.is_empty() {
        return;
    }
    let style = get_keyword_style(word, is_call);
    spans.push(Span::styled(std::mem::take(word), style));
}

fn get_keyword_style(word: &str, is_call: bool) -> Style {
    match word {
        "def" | "class" | "return" | "if" | "elif" | "else" | "while" | "for" | "in" | "not"
        | "and" | "or" | "is" | "break" | "continue" | "pass" | "try" | "except" | "finally"
        | "raise" | "import" | "from" | "as" | "global" | "nonlocal" | "lambda" | "del"
        | "assert" => Style::default()
            .fg(DEFAULT_THEME.keyword)
            .add_modifier(Modifier::BOLD),
        "True" | "False" | "None" => Style::default().fg(DEFAULT_THEME.number),
        "self" => Style::default()
            .fg(DEFAULT_THEME.secondary)
            .add_modifier(Modifier::ITALIC),
        _ if word.starts_with(|c: char| c.is_ascii_digit()) => {
            Style::default().fg(DEFAULT_THEME.number)
        }
        _ if is_builtin(word) => Style::default().fg(DEFAULT_THEME.builtin),
        _ if is_call => Style::default().fg(DEFAULT_THEME.function),
        _ => Style::default().fg(DEFAULT_THEME.fg),
    }
}

fn is_builtin(word: &str) -> bool {
    PRELUDE_NAMES.contains(&word) || BuiltinFunction::GLOBALS.iter().any(|b| b.name() == word)
}

/// Scroll state for the source pane
#[derive(Debug, Default)]
pub struct SourceScrollState {
    pub offset: usize,
    /// Visual row the current line is pinned to; `None` until first render
    pub target_line_row: Option<usize>,
}

/// Data needed to render the source pane
pub struct SourceRenderData<'a> {
    pub source_code: &'a str,
    /// 1-based line of the current step, 0 when there is none
    pub current_line: usize,
    /// Line the run failed on
    pub error_line: Option<usize>,
}

pub fn render_source_pane(
    frame: &mut Frame,
    area: Rect,
    data: SourceRenderData<'_>,
    is_focused: bool,
    scroll_state: &mut SourceScrollState,
) {
    let block = pane_block("Source Code", is_focused);

    let lines: Vec<&str> = data.source_code.lines().collect();
    let total_lines = lines.len();
    let visible_height = area.height.saturating_sub(2).max(1) as usize;

    let target_row = scroll_state
        .target_line_row
        .unwrap_or(visible_height / 2)
        .min(visible_height.saturating_sub(1));
    scroll_state.target_line_row = Some(target_row);

    // Keep the current line at the target visual row
    if data.current_line > 0 && data.current_line <= total_lines {
        scroll_state.offset = (data.current_line - 1).saturating_sub(target_row);
        if total_lines > visible_height {
            scroll_state.offset = scroll_state.offset.min(total_lines - visible_height);
        } else {
            scroll_state.offset = 0;
        }
    }

    let visible_lines: Vec<Line> = lines
        .iter()
        .enumerate()
        .skip(scroll_state.offset)
        .take(visible_height)
        .map(|(idx, line)| {
            let line_num = idx + 1;
            let is_current = line_num == data.current_line;
            let is_error = data.error_line == Some(line_num);
            let marker = match (is_current, is_error) {
                (true, _) => "▶",
                (false, true) => "✗",
                _ => " ",
            };
            let line_num_str = format!("{:4}{} ", line_num, marker);

            let (num_style, content_base_style) = if is_error {
                (
                    Style::default()
                        .fg(DEFAULT_THEME.error)
                        .add_modifier(Modifier::BOLD),
                    Style::default()
                        .bg(DEFAULT_THEME.error)
                        .fg(Color::Black)
                        .add_modifier(Modifier::BOLD),
                )
            } else if is_current {
                (
                    Style::default()
                        .fg(DEFAULT_THEME.secondary)
                        .add_modifier(Modifier::BOLD),
                    Style::default().bg(DEFAULT_THEME.current_line_bg),
                )
            } else {
                (Style::default().fg(DEFAULT_THEME.comment), Style::default())
            };

            let mut content_line = highlight_source_code(line);
            if is_error {
                for span in &mut content_line.spans {
                    span.style = content_base_style;
                }
            } else if is_current {
                for span in &mut content_line.spans {
                    span.style = span.style.patch(content_base_style);
                }
            }

            let mut final_spans = vec![Span::styled(line_num_str, num_style)];
            final_spans.extend(content_line.spans);
            Line::from(final_spans)
        })
        .collect();

    let paragraph = Paragraph::new(visible_lines).block(block);
    frame.render_widget(paragraph, area);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(line: &Line<'_>) -> Vec<String> {
        line.spans.iter().map(|s| s.content.to_string()).collect()
    }

    #[test]
    fn test_highlight_keeps_text() {
        let source = "for x in range(3):  # loop 'here'";
        let line = highlight_source_code(source);
        assert_eq!(words(&line).concat(), source);
    }

    #[test]
    fn test_highlight_styles() {
        let line = highlight_source_code("print('hi')");
        let spans = &line.spans;
        assert_eq!(spans[0].content, "print");
        assert_eq!(spans[0].style.fg, Some(DEFAULT_THEME.builtin));
        assert_eq!(spans[2].content, "'hi'");
        assert_eq!(spans[2].style.fg, Some(DEFAULT_THEME.string));

        assert_eq!(
            get_keyword_style("def", false).fg,
            Some(DEFAULT_THEME.keyword)
        );
        assert_eq!(get_keyword_style("area", true).fg, Some(DEFAULT_THEME.function));
    }

    #[test]
    fn test_unterminated_string() {
        let line = highlight_source_code("x = 'abc");
        assert_eq!(words(&line).concat(), "x = 'abc");
    }
}
