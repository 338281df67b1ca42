//! TUI pane rendering modules
//!
//! # Pane Modules
//!
//! - [`tree`]: The cursor tree with expand markers and kind colouring
//! - [`source`]: The file of the selected cursor with its extent highlighted
//! - [`details`]: Properties of the selected cursor
//! - [`status`]: Status bar with keybindings and position
//!
//! Each pane module exports a primary `render_*` function. Pane state that
//! must survive between frames (scroll offsets) is owned by
//! [`App`](crate::ui::App) and passed in by reference.

pub mod details;
pub mod source;
pub mod status;
pub mod tree;

pub use details::render_details_pane;
pub use source::render_source_pane;
pub use status::render_status_bar;
pub use tree::render_tree_pane;

use crate::ui::theme::DEFAULT_THEME;
use ratatui::{
    style::{Modifier, Style},
    widgets::{Block, Borders},
};

/// Bordered block whose border shows focus.
fn pane_block(title: &str, is_focused: bool) -> Block<'_> {
    let border_style = if is_focused {
        Style::default()
            .fg(DEFAULT_THEME.border_focused)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(DEFAULT_THEME.border_normal)
    };
    Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(border_style)
}

/// Keep `selected` inside the window of `height` rows starting at `offset`.
fn follow(offset: &mut usize, selected: usize, height: usize) {
    if selected < *offset {
        *offset = selected;
    } else if height > 0 && selected >= *offset + height {
        *offset = selected + 1 - height;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_follow_keeps_selection_visible() {
        let mut offset = 0;
        follow(&mut offset, 3, 10);
        assert_eq!(offset, 0);
        follow(&mut offset, 12, 10);
        assert_eq!(offset, 3);
        follow(&mut offset, 1, 10);
        assert_eq!(offset, 1);
    }
}
