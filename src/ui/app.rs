//! Browser state and event loop

use crate::cursor::Cursor;
use crate::dump;
use crate::unit::TranslationUnit;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind};
use ratatui::{
    backend::Backend,
    layout::{Constraint, Direction, Layout},
    Frame, Terminal,
};
use std::io;
use std::time::Duration;

/// Which pane is currently focused
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusedPane {
    Tree,
    Source,
    Details,
}

impl FocusedPane {
    /// Move focus to the next pane (tree -> source -> details)
    pub fn next(self) -> Self {
        match self {
            FocusedPane::Tree => FocusedPane::Source,
            FocusedPane::Source => FocusedPane::Details,
            FocusedPane::Details => FocusedPane::Tree,
        }
    }
}

/// One visible line of the cursor tree.
#[derive(Debug, Clone, Copy)]
pub struct TreeRow<'tu> {
    pub cursor: Cursor<'tu>,
    pub depth: usize,
    pub expanded: bool,
    pub has_children: bool,
}

impl<'tu> TreeRow<'tu> {
    fn new(cursor: Cursor<'tu>, depth: usize) -> Self {
        TreeRow {
            cursor,
            depth,
            expanded: false,
            has_children: !cursor.children().is_empty(),
        }
    }
}

/// The browser state
pub struct App<'tu> {
    pub unit: &'tu TranslationUnit,

    /// Expanded part of the cursor tree, in display order
    pub rows: Vec<TreeRow<'tu>>,
    pub selected: usize,

    pub focused_pane: FocusedPane,

    /// Per-pane scroll offsets
    pub tree_scroll: usize,
    pub source_scroll: usize,
    pub details_scroll: usize,

    /// Visual row the selected extent is kept at (None = not initialized yet)
    pub target_line_row: Option<usize>,

    pub should_quit: bool,
    pub status_message: String,
}

impl<'tu> App<'tu> {
    /// Create a browser showing the top-level cursors of `unit`. With
    /// `main_file_only`, cursors from included files are left out.
    pub fn new(unit: &'tu TranslationUnit, main_file_only: bool) -> Self {
        let rows = unit
            .cursor()
            .children()
            .into_iter()
            .filter(|c| !main_file_only || c.location().is_in_main_file())
            .map(|c| TreeRow::new(c, 0))
            .collect();
        App {
            unit,
            rows,
            selected: 0,
            focused_pane: FocusedPane::Tree,
            tree_scroll: 0,
            source_scroll: 0,
            details_scroll: 0,
            target_line_row: None,
            should_quit: false,
            status_message: format!("{} diagnostics", unit.diagnostics().len()),
        }
    }

    pub fn selected_cursor(&self) -> Cursor<'tu> {
        self.rows.get(self.selected).map_or_else(Cursor::null, |row| row.cursor)
    }

    /// Run the browser until the user quits
    pub fn run<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> io::Result<()> {
        loop {
            terminal.draw(|f| self.render(f))?;

            if self.should_quit {
                break;
            }

            if event::poll(Duration::from_millis(100))? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press {
                        self.handle_key_event(key);
                    }
                }
            }
        }

        Ok(())
    }

    fn render(&mut self, frame: &mut Frame) {
        let size = frame.area();

        // Panes on top, status bar at the bottom
        let main_chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(0), Constraint::Length(1)])
            .split(size);

        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
            .split(main_chunks[0]);

        // Right column: Source (top) | Details (bottom)
        let right_rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Percentage(65), Constraint::Percentage(35)])
            .split(columns[1]);

        let cursor = self.selected_cursor();

        super::panes::render_tree_pane(
            frame,
            columns[0],
            &self.rows,
            self.selected,
            self.focused_pane == FocusedPane::Tree,
            &mut self.tree_scroll,
        );

        super::panes::render_source_pane(
            frame,
            right_rows[0],
            self.unit,
            cursor,
            self.focused_pane == FocusedPane::Source,
            &mut self.source_scroll,
            &mut self.target_line_row,
        );

        super::panes::render_details_pane(
            frame,
            right_rows[1],
            cursor,
            self.focused_pane == FocusedPane::Details,
            &mut self.details_scroll,
        );

        super::panes::render_status_bar(
            frame,
            main_chunks[1],
            &self.status_message,
            self.selected,
            self.rows.len(),
        );
    }

    fn handle_key_event(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => {
                self.should_quit = true;
            }
            KeyCode::Tab => {
                self.focused_pane = self.focused_pane.next();
            }
            KeyCode::Up => match self.focused_pane {
                FocusedPane::Tree => self.select(self.selected.saturating_sub(1)),
                FocusedPane::Source => {
                    // Scrolling up makes the extent move down visually
                    if let Some(row) = self.target_line_row {
                        self.target_line_row = Some(row.saturating_add(1));
                    }
                }
                FocusedPane::Details => {
                    self.details_scroll = self.details_scroll.saturating_sub(1);
                }
            },
            KeyCode::Down => match self.focused_pane {
                FocusedPane::Tree => self.select(self.selected + 1),
                FocusedPane::Source => {
                    if let Some(row) = self.target_line_row {
                        self.target_line_row = Some(row.saturating_sub(1));
                    }
                }
                FocusedPane::Details => {
                    self.details_scroll = self.details_scroll.saturating_add(1);
                }
            },
            KeyCode::Right | KeyCode::Enter => self.expand(),
            KeyCode::Left => self.collapse(),
            KeyCode::Char('r') => {
                let target = self.selected_cursor().referenced();
                self.jump_to(target, "referenced");
            }
            KeyCode::Char('d') => {
                let target = self.selected_cursor().definition();
                self.jump_to(target, "definition");
            }
            KeyCode::Char('p') => {
                let target = self.selected_cursor().semantic_parent();
                self.jump_to(target, "semantic parent");
            }
            _ => {}
        }
    }

    fn select(&mut self, index: usize) {
        if index < self.rows.len() {
            self.selected = index;
            self.details_scroll = 0;
            self.target_line_row = None;
        }
    }

    /// Show the children of the selected row.
    pub fn expand(&mut self) {
        let Some(row) = self.rows.get(self.selected).copied() else {
            return;
        };
        if row.expanded || !row.has_children {
            return;
        }
        let children: Vec<TreeRow<'tu>> = row
            .cursor
            .children()
            .into_iter()
            .map(|c| TreeRow::new(c, row.depth + 1))
            .collect();
        let at = self.selected + 1;
        self.rows.splice(at..at, children);
        self.rows[self.selected].expanded = true;
    }

    /// Hide the children of the selected row, or move to its parent row when
    /// it is already collapsed.
    pub fn collapse(&mut self) {
        let Some(row) = self.rows.get(self.selected).copied() else {
            return;
        };
        if !row.expanded {
            if let Some(parent) = self.rows[..self.selected].iter().rposition(|r| r.depth < row.depth) {
                self.select(parent);
            }
            return;
        }
        let start = self.selected + 1;
        let end = self.rows[start..]
            .iter()
            .position(|r| r.depth <= row.depth)
            .map_or(self.rows.len(), |n| start + n);
        self.rows.drain(start..end);
        self.rows[self.selected].expanded = false;
    }

    /// Select `target`, expanding the rows on the way to it.
    pub fn jump_to(&mut self, target: Cursor<'tu>, what: &str) {
        if target.is_null() || target.kind().is_invalid() {
            self.status_message = format!("No {} cursor", what);
            return;
        }
        if target == self.selected_cursor() {
            self.status_message = format!("Already at {}", what);
            return;
        }
        let mut path = vec![target];
        let mut current = target;
        while let Some(parent) = lexical_tree_parent(current) {
            path.push(parent);
            current = parent;
        }
        let mut index = None;
        for step in path.iter().rev() {
            let from = index.map_or(0, |i: usize| i + 1);
            let depth = index.map_or(0, |i| self.rows[i].depth + 1);
            let Some(found) = self.rows[from..]
                .iter()
                .position(|r| r.cursor == *step && r.depth == depth)
                .map(|n| from + n)
            else {
                self.status_message = format!("{} is not in the tree", target.spelling());
                return;
            };
            index = Some(found);
            if *step != target {
                self.selected = found;
                self.expand();
            }
        }
        if let Some(found) = index {
            self.select(found);
            self.status_message = format!(
                "Jumped to {} {}",
                what,
                dump::position(target.location())
            );
        }
    }
}

/// Parent of a cursor in the displayed tree, `None` at the top level.
fn lexical_tree_parent(cursor: Cursor<'_>) -> Option<Cursor<'_>> {
    let unit = cursor.translation_unit()?;
    let mut found = None;
    unit.cursor().visit_children(|child, parent| {
        if child == cursor {
            found = Some(parent);
            return crate::cursor::ChildVisitResult::Break;
        }
        crate::cursor::ChildVisitResult::Recurse
    });
    found.filter(|parent| !parent.kind().is_translation_unit())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cursor::CursorKind;
    use crate::unit::tests::{parse_files, parse_unit};

    fn labels(app: &App<'_>) -> Vec<(usize, String)> {
        app.rows.iter().map(|r| (r.depth, r.cursor.spelling())).collect()
    }

    #[test]
    fn test_expand_and_collapse() {
        let unit = parse_unit("struct P { int x; int y; };\nint z;\n");
        let mut app = App::new(&unit, false);
        assert_eq!(labels(&app), vec![(0, "P".to_string()), (0, "z".to_string())]);
        app.expand();
        assert_eq!(
            labels(&app),
            vec![
                (0, "P".to_string()),
                (1, "x".to_string()),
                (1, "y".to_string()),
                (0, "z".to_string()),
            ]
        );
        app.select(2);
        app.collapse();
        assert_eq!(app.selected, 0);
        app.collapse();
        assert_eq!(labels(&app), vec![(0, "P".to_string()), (0, "z".to_string())]);
    }

    #[test]
    fn test_main_file_only() {
        let unit = parse_files(&[("main.c", "#include \"a.h\"\nint m;\n"), ("a.h", "int h;\n")]);
        let app = App::new(&unit, true);
        let kinds: Vec<_> = app.rows.iter().map(|r| r.cursor.kind()).collect();
        assert_eq!(kinds, vec![CursorKind::InclusionDirective, CursorKind::VarDecl]);
    }

    #[test]
    fn test_jump_to_referenced() {
        let unit = parse_unit("struct P { int x; };\nint get(struct P *p) { return p->x; }\n");
        let mut app = App::new(&unit, false);
        let field = unit.cursor().children()[0].children()[0];
        app.jump_to(field, "referenced");
        assert_eq!(app.selected_cursor(), field);
        assert_eq!(app.rows[app.selected].depth, 1);
        assert!(app.status_message.starts_with("Jumped to referenced t.c:1:16"));

        app.jump_to(Cursor::null(), "definition");
        assert_eq!(app.status_message, "No definition cursor");
        assert_eq!(app.selected_cursor(), field);
    }
}
