//! Documentation comments attached to declarations
//!
//! A declaration is documented by the `/** ... */`, `/*! ... */` block or the
//! run of `///` / `//!` lines directly above it (no blank line in between),
//! or by a trailing `///<` / `/**<` comment on the line it ends.

use crate::source::{SourceManager, Span};

/// Raw text of the comment documenting the declaration covering `span`.
pub(crate) fn raw_comment(sm: &SourceManager, span: Span) -> Option<String> {
    let (file, begin) = sm.decompose(sm.expansion_loc(span.begin))?;
    let text = &*sm.file(file).contents;
    if let Some(comment) = preceding(text, begin as usize) {
        return Some(comment);
    }
    let (end_file, end) = sm.decompose(sm.expansion_loc(span.end))?;
    if end_file != file {
        return None;
    }
    trailing(text, end as usize)
}

fn preceding(text: &str, begin: usize) -> Option<String> {
    let before = text.get(..begin)?;
    let trimmed = before.trim_end();
    let gap = &before[trimmed.len()..];
    if gap.matches('\n').count() > 1 {
        return None;
    }

    if trimmed.ends_with("*/") {
        let comment = &trimmed[trimmed.rfind("/*")?..];
        let is_doc = (comment.starts_with("/**") && !comment.starts_with("/**/")) || comment.starts_with("/*!");
        return (is_doc && !is_trailing_marker(comment)).then(|| comment.to_string());
    }
    if !gap.contains('\n') {
        return None;
    }

    let mut lines: Vec<&str> = trimmed
        .lines()
        .rev()
        .map(str::trim)
        .take_while(|line| is_doc_line(line))
        .collect();
    if lines.is_empty() {
        return None;
    }
    lines.reverse();
    Some(lines.join("\n"))
}

fn is_doc_line(line: &str) -> bool {
    let marker = (line.starts_with("///") && !line.starts_with("////")) || line.starts_with("//!");
    marker && !is_trailing_marker(line)
}

/// `///<`, `//!<`, `/**<` and `/*!<` document the declaration before them.
fn is_trailing_marker(comment: &str) -> bool {
    comment.get(3..).is_some_and(|rest| rest.starts_with('<'))
}

fn trailing(text: &str, end: usize) -> Option<String> {
    let rest = text.get(end..)?;
    let tail = rest.trim_start_matches([' ', '\t', ';', ',']);
    let line = &tail[..tail.find('\n').unwrap_or(tail.len())];
    if !is_trailing_marker(line) {
        return None;
    }
    if line.starts_with("///") || line.starts_with("//!") {
        return Some(line.trim_end().to_string());
    }
    if line.starts_with("/**") || line.starts_with("/*!") {
        let close = tail.find("*/")?;
        return Some(tail[..close + 2].to_string());
    }
    None
}

/// The brief description of a raw comment: the paragraph starting with
/// `\brief` (or `@brief`), otherwise the first paragraph.
pub(crate) fn brief(raw: &str) -> String {
    let lines: Vec<&str> = raw.lines().map(strip_markers).collect();

    let mut paragraph: Vec<&str> = Vec::new();
    let mut first: Option<Vec<&str>> = None;
    let mut in_brief = false;
    for line in lines.iter().chain(std::iter::once(&"")) {
        let line = line.trim();
        if let Some(text) = line.strip_prefix("\\brief").or_else(|| line.strip_prefix("@brief")) {
            paragraph.clear();
            in_brief = true;
            paragraph.push(text.trim());
            continue;
        }
        let starts_command = line.starts_with('\\') || line.starts_with('@');
        if line.is_empty() || starts_command {
            if in_brief {
                return join(&paragraph);
            }
            if first.is_none() && !paragraph.is_empty() {
                first = Some(std::mem::take(&mut paragraph));
            }
            paragraph.clear();
            continue;
        }
        paragraph.push(line);
    }
    first.map(|p| join(&p)).unwrap_or_default()
}

fn join(words: &[&str]) -> String {
    words
        .iter()
        .flat_map(|line| line.split_whitespace())
        .collect::<Vec<_>>()
        .join(" ")
}

fn strip_markers(line: &str) -> &str {
    let mut line = line.trim();
    for marker in ["///<", "//!<", "/**<", "/*!<", "///", "//!", "/**", "/*!"] {
        if let Some(rest) = line.strip_prefix(marker) {
            line = rest;
            break;
        }
    }
    line = line.trim_end();
    line = line.strip_suffix("*/").unwrap_or(line).trim();
    line.strip_prefix('*').unwrap_or(line)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_brief_first_paragraph() {
        assert_eq!(brief("/** Adds two numbers.\n * Really.\n *\n * More text. */"), "Adds two numbers. Really.");
        assert_eq!(brief("/// One line\n/// two lines"), "One line two lines");
    }

    #[test]
    fn test_brief_command() {
        assert_eq!(brief("/**\n * Intro.\n *\n * \\brief The short one.\n * \\param x thing\n */"), "The short one.");
        assert_eq!(brief("//! @brief Tagged"), "Tagged");
    }

    #[test]
    fn test_preceding_block_and_lines() {
        let text = "/** Doc. */\nint a;\n";
        assert_eq!(preceding(text, 12).as_deref(), Some("/** Doc. */"));
        let text = "/// one\n/// two\nint b;\n";
        assert_eq!(preceding(text, 16).as_deref(), Some("/// one\n/// two"));
    }

    #[test]
    fn test_plain_and_separated_comments_ignored() {
        assert_eq!(preceding("/* plain */\nint a;\n", 12), None);
        assert_eq!(preceding("/** Doc. */\n\nint a;\n", 13), None);
        assert_eq!(preceding("// plain\nint a;\n", 9), None);
    }

    #[test]
    fn test_trailing_comment() {
        let text = "struct S {\n  int x; ///< The x.\n};\n";
        assert_eq!(trailing(text, 18).as_deref(), Some("///< The x."));
        assert_eq!(brief("///< The x."), "The x.");
    }
}
