//! Plain-text rendering of cursor trees, used by the `tree` command and the
//! browser's details pane.

use crate::cursor::Cursor;
use crate::source::SourceLocation;
use std::fmt::{self, Write};

#[derive(Debug, Clone, Copy, Default)]
pub struct DumpOptions {
    /// Stop descending below this depth; top-level cursors are depth 0.
    pub max_depth: Option<usize>,
    /// Leave out top-level cursors that come from other files.
    pub main_file_only: bool,
    pub show_types: bool,
    pub show_usrs: bool,
}

/// `file:line:column` of a location, `<invalid>` for the null location.
pub fn position(location: SourceLocation<'_>) -> String {
    let at = location.file_location();
    match at.file {
        Some(file) => format!("{}:{}:{}", file.name(), at.line, at.column),
        None => "<invalid>".to_string(),
    }
}

/// One-line description of a cursor: kind, spelling and location.
pub fn describe(cursor: Cursor<'_>, options: &DumpOptions) -> String {
    let mut line = format!("{:?}", cursor.kind());
    let spelling = cursor.spelling();
    if !spelling.is_empty() {
        let _ = write!(line, " '{}'", spelling);
    }
    let _ = write!(line, " {}", position(cursor.location()));
    if options.show_types {
        let ty = cursor.ty();
        if ty.is_valid() {
            let _ = write!(line, " type='{}'", ty.spelling());
        }
    }
    if options.show_usrs {
        let usr = cursor.usr();
        if !usr.is_empty() {
            let _ = write!(line, " usr={}", usr);
        }
    }
    line
}

/// Write the children of `root`, indented two spaces per level.
pub fn dump_tree<W: Write>(root: Cursor<'_>, options: &DumpOptions, out: &mut W) -> fmt::Result {
    for child in root.children() {
        if options.main_file_only && !child.location().is_in_main_file() {
            continue;
        }
        dump_cursor(child, 0, options, out)?;
    }
    Ok(())
}

fn dump_cursor<W: Write>(cursor: Cursor<'_>, depth: usize, options: &DumpOptions, out: &mut W) -> fmt::Result {
    writeln!(out, "{:indent$}{}", "", describe(cursor, options), indent = depth * 2)?;
    if options.max_depth.is_some_and(|max| depth >= max) {
        return Ok(());
    }
    for child in cursor.children() {
        dump_cursor(child, depth + 1, options, out)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::unit::tests::{parse_files, parse_unit};

    #[test]
    fn test_dump_tree() {
        let tu = parse_unit("struct P { int x; };\nint y;\n");
        let mut out = String::new();
        dump_tree(tu.cursor(), &DumpOptions::default(), &mut out).unwrap();
        assert_eq!(
            out,
            "StructDecl 'P' t.c:1:8\n  FieldDecl 'x' t.c:1:16\nVarDecl 'y' t.c:2:5\n"
        );
    }

    #[test]
    fn test_depth_and_types() {
        let tu = parse_unit("struct P { int x; };\n");
        let options = DumpOptions {
            max_depth: Some(0),
            show_types: true,
            ..DumpOptions::default()
        };
        let mut out = String::new();
        dump_tree(tu.cursor(), &options, &mut out).unwrap();
        assert_eq!(out, "StructDecl 'P' t.c:1:8 type='struct P'\n");
    }

    #[test]
    fn test_main_file_only() {
        let tu = parse_files(&[("main.c", "#include \"a.h\"\nint m;\n"), ("a.h", "int h;\n")]);
        let options = DumpOptions {
            main_file_only: true,
            ..DumpOptions::default()
        };
        let mut out = String::new();
        dump_tree(tu.cursor(), &options, &mut out).unwrap();
        assert_eq!(out, "InclusionDirective 'a.h' main.c:1:1\nVarDecl 'm' main.c:2:5\n");
    }

    #[test]
    fn test_position_of_null() {
        assert_eq!(position(SourceLocation::null()), "<invalid>");
    }
}
