//! Cursor tree pane

use super::{follow, pane_block};
use crate::cursor::CursorKind;
use crate::ui::app::TreeRow;
use crate::ui::theme::DEFAULT_THEME;
use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

fn kind_color(kind: CursorKind) -> Color {
    if kind == CursorKind::FunctionDecl {
        DEFAULT_THEME.function
    } else if kind.is_declaration() {
        DEFAULT_THEME.type_name
    } else if kind.is_reference() {
        DEFAULT_THEME.primary
    } else if kind.is_preprocessing() {
        DEFAULT_THEME.secondary
    } else if kind.is_expression() {
        DEFAULT_THEME.number
    } else {
        DEFAULT_THEME.comment
    }
}

/// Render the cursor tree
pub fn render_tree_pane(
    frame: &mut Frame,
    area: Rect,
    rows: &[TreeRow<'_>],
    selected: usize,
    is_focused: bool,
    scroll: &mut usize,
) {
    let block = pane_block(" Cursors ", is_focused);
    let visible_height = area.height.saturating_sub(2).max(1) as usize;
    follow(scroll, selected, visible_height);

    let lines: Vec<Line> = rows
        .iter()
        .enumerate()
        .skip(*scroll)
        .take(visible_height)
        .map(|(idx, row)| {
            let marker = match (row.has_children, row.expanded) {
                (false, _) => "  ",
                (true, false) => "▸ ",
                (true, true) => "▾ ",
            };
            let kind = row.cursor.kind();
            let mut spans = vec![
                Span::raw(format!("{:indent$}{}", "", marker, indent = row.depth * 2)),
                Span::styled(format!("{:?}", kind), Style::default().fg(kind_color(kind))),
            ];
            let spelling = row.cursor.spelling();
            if !spelling.is_empty() {
                spans.push(Span::styled(
                    format!(" {}", spelling),
                    Style::default().fg(DEFAULT_THEME.fg),
                ));
            }
            let mut line = Line::from(spans);
            if idx == selected {
                line = line.style(
                    Style::default()
                        .bg(DEFAULT_THEME.current_line_bg)
                        .add_modifier(Modifier::BOLD),
                );
            }
            line
        })
        .collect();

    frame.render_widget(Paragraph::new(lines).block(block), area);
}
