//! Details pane: properties of the selected cursor

use super::pane_block;
use crate::cursor::{Cursor, Linkage};
use crate::dump::position;
use crate::ui::theme::DEFAULT_THEME;
use ratatui::{
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::{Paragraph, Wrap},
    Frame,
};

/// Label/value pairs shown for a cursor. Empty values are left out.
pub fn cursor_properties(cursor: Cursor<'_>) -> Vec<(&'static str, String)> {
    if cursor.is_null() {
        return Vec::new();
    }
    let mut props = vec![
        ("kind", format!("{:?}", cursor.kind())),
        ("spelling", cursor.spelling()),
        ("display name", cursor.display_name()),
        ("location", position(cursor.location())),
        ("extent", {
            let extent = cursor.extent();
            format!("{} - {}", position(extent.begin()), position(extent.end()))
        }),
        ("usr", cursor.usr()),
    ];

    let ty = cursor.ty();
    if ty.is_valid() {
        props.push(("type", ty.spelling()));
        let canonical = ty.canonical();
        if canonical.spelling() != ty.spelling() {
            props.push(("canonical type", canonical.spelling()));
        }
        if let (Ok(size), Ok(align)) = (ty.size_of(), ty.align_of()) {
            props.push(("size / align", format!("{} / {}", size, align)));
        }
    }
    if cursor.kind().is_declaration() {
        let linkage = match cursor.linkage() {
            Linkage::Invalid => String::new(),
            other => format!("{:?}", other),
        };
        props.push(("linkage", linkage));
        props.push(("definition", yes_no(cursor.is_definition())));
    }
    if let Some(value) = cursor.enum_constant_value() {
        props.push(("value", value.to_string()));
    }
    if let Some(width) = cursor.field_bit_width() {
        props.push(("bit width", width.to_string()));
    }
    if cursor.has_skipped_body() {
        props.push(("body", "skipped".to_string()));
    }

    let referenced = cursor.referenced();
    if !referenced.is_null() && referenced != cursor {
        props.push(("referenced", describe_target(referenced)));
    }
    let parent = cursor.semantic_parent();
    if !parent.is_null() {
        props.push(("semantic parent", describe_target(parent)));
    }
    if let Some(file) = cursor.included_file() {
        props.push(("included file", file.name().to_string()));
    }
    if let Some(brief) = cursor.brief_comment_text() {
        props.push(("comment", brief));
    }

    props.retain(|(_, value)| !value.is_empty());
    props
}

fn yes_no(value: bool) -> String {
    if value { "yes" } else { "no" }.to_string()
}

fn describe_target(cursor: Cursor<'_>) -> String {
    format!("{:?} {} ({})", cursor.kind(), cursor.spelling(), position(cursor.location()))
}

/// Render the details pane
pub fn render_details_pane(frame: &mut Frame, area: Rect, cursor: Cursor<'_>, is_focused: bool, scroll: &mut usize) {
    let block = pane_block(" Details ", is_focused);
    let props = cursor_properties(cursor);
    *scroll = (*scroll).min(props.len().saturating_sub(1));

    let lines: Vec<Line> = props
        .into_iter()
        .skip(*scroll)
        .map(|(label, value)| {
            Line::from(vec![
                Span::styled(format!("{:>16}: ", label), Style::default().fg(DEFAULT_THEME.comment)),
                Span::styled(value, Style::default().fg(DEFAULT_THEME.fg)),
            ])
        })
        .collect();

    let paragraph = Paragraph::new(lines).block(block).wrap(Wrap { trim: false });
    frame.render_widget(paragraph, area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::unit::tests::parse_unit;

    #[test]
    fn test_properties_of_a_field() {
        let unit = parse_unit("struct P { int x : 3; };\n");
        let field = unit.cursor().children()[0].children()[0];
        let props = cursor_properties(field);
        let get = |label: &str| props.iter().find(|(l, _)| *l == label).map(|(_, v)| v.as_str());
        assert_eq!(get("kind"), Some("FieldDecl"));
        assert_eq!(get("type"), Some("int"));
        assert_eq!(get("bit width"), Some("3"));
        assert_eq!(get("location"), Some("t.c:1:16"));
        assert!(get("semantic parent").is_some_and(|p| p.starts_with("StructDecl P")));
    }

    #[test]
    fn test_null_cursor_has_no_properties() {
        assert!(cursor_properties(Cursor::null()).is_empty());
    }
}
