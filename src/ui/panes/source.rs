//! Source pane rendering with syntax highlighting
//!
//! Shows the file the selected cursor lives in and highlights the lines its
//! extent covers. Highlighting uses a simple character-by-character tokenizer
//! rather than the full lexer, so a line is styled without knowing what came
//! before it.

use super::pane_block;
use crate::cursor::Cursor;
use crate::ui::theme::DEFAULT_THEME;
use crate::unit::TranslationUnit;
use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

/// Simple syntax highlighting for C code
fn highlight_source_code(line: &str) -> Line<'_> {
    let mut spans = Vec::new();
    let mut current_word = String::new();

    let chars: Vec<(usize, char)> = line.char_indices().collect();
    let mut i = 0;

    while i < chars.len() {
        let (at, c) = chars[i];

        // Comments and directives run to the end of the line
        let starts_comment = c == '/' && chars.get(i + 1).is_some_and(|(_, n)| *n == '/');
        let starts_directive = c == '#' && line[..at].trim().is_empty();
        if starts_comment || starts_directive {
            if !current_word.is_empty() {
                spans.push(Span::raw(std::mem::take(&mut current_word)));
            }
            let color = if starts_comment {
                DEFAULT_THEME.comment
            } else {
                DEFAULT_THEME.secondary
            };
            spans.push(Span::styled(line[at..].to_string(), Style::default().fg(color)));
            break;
        }

        if c == '"' || c == '\'' {
            if !current_word.is_empty() {
                spans.push(Span::raw(std::mem::take(&mut current_word)));
            }
            let mut end = i + 1;
            while end < chars.len() && chars[end].1 != c {
                end += if chars[end].1 == '\\' { 2 } else { 1 };
            }
            end = (end + 1).min(chars.len());
            let stop = chars.get(end).map_or(line.len(), |(pos, _)| *pos);
            spans.push(Span::styled(
                line[at..stop].to_string(),
                Style::default().fg(DEFAULT_THEME.string),
            ));
            i = end;
            continue;
        }

        if !c.is_alphanumeric() && c != '_' {
            if !current_word.is_empty() {
                let style = get_keyword_style(&current_word, c == '(');
                spans.push(Span::styled(std::mem::take(&mut current_word), style));
            }
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

    if !current_word.is_empty() {
        let style = get_keyword_style(&current_word, false);
        spans.push(Span::styled(current_word, style));
    }

    Line::from(spans)
}

fn get_keyword_style(word: &str, is_function: bool) -> Style {
    match word {
        "int" | "char" | "void" | "_Bool" | "float" | "double" | "long" | "short" | "unsigned"
        | "signed" | "const" | "volatile" | "restrict" => Style::default().fg(DEFAULT_THEME.type_name),
        "struct" | "union" | "enum" | "typedef" | "static" | "extern" | "inline" | "register"
        | "auto" | "return" | "if" | "else" | "while" | "for" | "do" | "switch" | "case"
        | "default" | "break" | "continue" | "goto" | "sizeof" | "_Alignof" => Style::default()
            .fg(DEFAULT_THEME.keyword)
            .add_modifier(Modifier::BOLD),
        _ if word.starts_with(|c: char| c.is_ascii_digit()) => Style::default().fg(DEFAULT_THEME.number),
        _ if is_function => Style::default().fg(DEFAULT_THEME.function),
        _ => Style::default().fg(DEFAULT_THEME.fg),
    }
}

/// Render the source pane for the selected cursor
pub fn render_source_pane(
    frame: &mut Frame,
    area: Rect,
    unit: &TranslationUnit,
    cursor: Cursor<'_>,
    is_focused: bool,
    scroll: &mut usize,
    target_line_row: &mut Option<usize>,
) {
    let extent = cursor.extent();
    let begin = extent.begin().expansion();
    let end = extent.end().expansion();
    let file = begin.file.or_else(|| unit.main_file());
    let title = format!(" {} ", file.map_or("<no file>", |f| f.name()));
    let block = pane_block(&title, is_focused);

    let source = file.map_or("", |f| f.contents());
    let lines: Vec<&str> = source.lines().collect();
    let total_lines = lines.len();
    let (first, last) = if begin.file.is_some() {
        (begin.line as usize, (end.line as usize).max(begin.line as usize))
    } else {
        (0, 0)
    };

    let visible_height = area.height.saturating_sub(2).max(1) as usize;

    // Keep the start of the extent at a fixed visual row
    let target_row = target_line_row
        .unwrap_or(visible_height / 3)
        .min(visible_height.saturating_sub(1));
    *target_line_row = Some(target_row);
    if first > 0 && first <= total_lines {
        *scroll = (first - 1).saturating_sub(target_row);
        if total_lines > visible_height {
            *scroll = (*scroll).min(total_lines - visible_height);
        } else {
            *scroll = 0;
        }
    }

    let visible_lines: Vec<Line> = lines
        .iter()
        .enumerate()
        .skip(*scroll)
        .take(visible_height)
        .map(|(idx, line)| {
            let line_num = idx + 1;
            let in_extent = line_num >= first && line_num <= last && first > 0;
            let num_style = if in_extent {
                Style::default()
                    .fg(DEFAULT_THEME.secondary)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(DEFAULT_THEME.comment)
            };

            let mut content_line = highlight_source_code(line);
            if in_extent {
                for span in &mut content_line.spans {
                    span.style = span.style.patch(Style::default().bg(DEFAULT_THEME.current_line_bg));
                }
            }

            let mut final_spans = vec![Span::styled(format!("{:4} ", line_num), num_style)];
            final_spans.extend(content_line.spans);
            Line::from(final_spans)
        })
        .collect();

    frame.render_widget(Paragraph::new(visible_lines).block(block), area);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(line: &Line<'_>) -> Vec<String> {
        line.spans.iter().map(|s| s.content.to_string()).collect()
    }

    #[test]
    fn test_highlight_splits_words_and_strings() {
        let line = highlight_source_code("int f(\"a b\"); // done");
        assert_eq!(
            texts(&line),
            vec!["int", " ", "f", "(", "\"a b\"", ")", ";", " ", "// done"]
        );
        assert_eq!(line.spans[2].style.fg, Some(DEFAULT_THEME.function));
    }

    #[test]
    fn test_directive_is_one_span() {
        let line = highlight_source_code("  #include <stdio.h>");
        assert_eq!(texts(&line), vec![" ", " ", "#include <stdio.h>"]);
    }
}
