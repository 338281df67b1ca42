//! Finding the references to an entity, and the inclusion directives, inside
//! one file

use crate::cursor::{Cursor, CursorKind};
use crate::parser::ast::{NodeId, NodeKind};
use crate::parser::preprocessor::{PpEntity, PpId};
use crate::source::{File, Loc, SourceRange, Span};
use crate::unit::TranslationUnit;
use std::ptr;

/// What a find visitor wants after one match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisitorResult {
    Break,
    Continue,
}

/// How a find call ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FindResult {
    /// Every match was reported.
    Success,
    /// The cursor or the file does not belong to the unit.
    Invalid,
    /// The visitor asked to stop.
    VisitBreak,
}

/// A match, kept until all matches are sorted.
struct Hit {
    key: u32,
    entity: HitEntity,
    span: Option<Span>,
}

#[derive(Clone, Copy)]
enum HitEntity {
    Node(NodeId),
    Pp(PpId),
}

impl<'tu> Cursor<'tu> {
    /// Report every reference to the entity this cursor refers to inside
    /// `file`, declarations included, in source order.
    ///
    /// A reference that a macro body produced (rather than one of its
    /// arguments) is reported with a null range.
    pub fn find_references_in_file<F>(&self, file: File<'_>, mut visitor: F) -> FindResult
    where
        F: FnMut(Cursor<'tu>, SourceRange<'tu>) -> VisitorResult,
    {
        let Some(tu) = self.translation_unit() else {
            return FindResult::Invalid;
        };
        if !tu.owns(file) {
            return FindResult::Invalid;
        }
        let target = self.referenced();
        let hits = match (target.kind(), target.node_id(), target.pp_id()) {
            (CursorKind::MacroDefinition, _, Some(def)) => macro_hits(tu, def, file),
            (kind, Some(id), _) if kind.is_declaration() => node_hits(tu, tu.ast.canonical(id), file),
            _ => return FindResult::Invalid,
        };
        tracing::trace!(target = %target.spelling(), matches = hits.len(), "references found");
        report(tu, hits, &mut visitor)
    }
}

impl TranslationUnit {
    /// Report every inclusion directive written in `file`, in source order.
    pub fn find_includes_in_file<'tu, F>(&'tu self, file: File<'_>, mut visitor: F) -> FindResult
    where
        F: FnMut(Cursor<'tu>, SourceRange<'tu>) -> VisitorResult,
    {
        if !self.owns(file) {
            return FindResult::Invalid;
        }
        let hits = self
            .record
            .inclusions()
            .filter(|(_, inc)| self.in_file(inc.hash_loc, file))
            .map(|(id, inc)| Hit {
                key: inc.hash_loc.raw(),
                entity: HitEntity::Pp(id),
                span: Some(inc.span),
            })
            .collect();
        report(self, hits, &mut visitor)
    }

    fn owns(&self, file: File<'_>) -> bool {
        ptr::eq(file.manager(), &self.sm)
    }

    fn in_file(&self, loc: Loc, file: File<'_>) -> bool {
        self.sm
            .decompose(self.sm.file_loc(loc))
            .is_some_and(|(id, _)| id == file.id())
    }

    /// Range of the token at `loc`, or `None` when a macro body spelled it.
    fn reference_span(&self, loc: Loc) -> Option<Span> {
        if self.sm.is_macro(loc) && !self.sm.is_macro_arg(loc) {
            return None;
        }
        let loc = self.sm.file_loc(loc);
        Some(Span::new(loc, self.sm.token_end(loc)))
    }
}

fn node_hits(tu: &TranslationUnit, canonical: NodeId, file: File<'_>) -> Vec<Hit> {
    let ast = &tu.ast;
    ast.ids()
        .filter(|id| *id != NodeId::ROOT)
        .filter_map(|id| {
            let node = ast.node(id);
            if node.implicit {
                return None;
            }
            let points_at = match &node.kind {
                kind if kind.is_declaration() => Some(id),
                NodeKind::Goto { .. } => None,
                kind => kind.referenced(),
            };
            if points_at.map(|t| ast.canonical(t)) != Some(canonical) || !tu.in_file(node.loc, file) {
                return None;
            }
            Some(Hit {
                key: tu.sm.file_loc(node.loc).raw(),
                entity: HitEntity::Node(id),
                span: tu.reference_span(node.loc),
            })
        })
        .collect()
}

fn macro_hits(tu: &TranslationUnit, def: PpId, file: File<'_>) -> Vec<Hit> {
    tu.record
        .iter()
        .filter_map(|(id, entry)| {
            let loc = match &entry.entity {
                PpEntity::MacroDefinition(d) if id == def => d.name_loc,
                PpEntity::MacroExpansion(exp) if exp.definition == Some(def) => exp.span.begin,
                _ => return None,
            };
            if !tu.in_file(loc, file) {
                return None;
            }
            Some(Hit {
                key: loc.raw(),
                entity: HitEntity::Pp(id),
                span: tu.reference_span(loc),
            })
        })
        .collect()
}

fn report<'tu, F>(tu: &'tu TranslationUnit, mut hits: Vec<Hit>, visitor: &mut F) -> FindResult
where
    F: FnMut(Cursor<'tu>, SourceRange<'tu>) -> VisitorResult,
{
    hits.sort_by_key(|hit| hit.key);
    for hit in hits {
        let cursor = match hit.entity {
            HitEntity::Node(id) => Cursor::from_node(tu, id),
            HitEntity::Pp(id) => Cursor::from_pp(tu, id),
        };
        let range = hit
            .span
            .map_or_else(SourceRange::null, |span| SourceRange::from_span(&tu.sm, span));
        if visitor(cursor, range) == VisitorResult::Break {
            return FindResult::VisitBreak;
        }
    }
    FindResult::Success
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::unit::tests::{parse_files, parse_unit, parse_unit_with};
    use crate::unit::ParseOptions;

    fn positions(range: SourceRange<'_>) -> Option<(u32, u32)> {
        if range.is_null() {
            return None;
        }
        let at = range.begin().expansion();
        Some((at.line, at.column))
    }

    #[test]
    fn test_references_to_variable() {
        let tu = parse_unit("int g;\n#define USE g\nint f(void) { return g + USE; }\nint g;\n");
        let file = tu.file("t.c").unwrap();
        let g = tu.cursor().children()[0];
        let mut seen = Vec::new();
        let result = g.find_references_in_file(file, |cursor, range| {
            seen.push((cursor.kind(), positions(range)));
            VisitorResult::Continue
        });
        assert_eq!(result, FindResult::Success);
        assert_eq!(
            seen,
            vec![
                (CursorKind::VarDecl, Some((1, 5))),
                (CursorKind::DeclRefExpr, Some((3, 22))),
                (CursorKind::DeclRefExpr, None),
                (CursorKind::VarDecl, Some((4, 5))),
            ]
        );
    }

    #[test]
    fn test_search_from_a_reference() {
        let tu = parse_unit("struct P { int x; };\nint get(struct P *p) { return p->x + p->x; }\n");
        let file = tu.file("t.c").unwrap();
        let field = tu.cursor_at(tu.location(file, 1, 16));
        let mut count = 0;
        field.find_references_in_file(file, |_, _| {
            count += 1;
            VisitorResult::Continue
        });
        assert_eq!(count, 3);

        let type_ref = tu.cursor_at(tu.location(file, 2, 16));
        assert_eq!(type_ref.kind(), CursorKind::TypeRef);
        let mut kinds = Vec::new();
        type_ref.find_references_in_file(file, |cursor, _| {
            kinds.push(cursor.kind());
            VisitorResult::Continue
        });
        assert_eq!(kinds, vec![CursorKind::StructDecl, CursorKind::TypeRef]);
    }

    #[test]
    fn test_break_and_invalid() {
        let tu = parse_unit("int a;\nint b = a + a;\n");
        let file = tu.file("t.c").unwrap();
        let a = tu.cursor().children()[0];
        let mut calls = 0;
        let result = a.find_references_in_file(file, |_, _| {
            calls += 1;
            VisitorResult::Break
        });
        assert_eq!(result, FindResult::VisitBreak);
        assert_eq!(calls, 1);

        assert_eq!(
            Cursor::null().find_references_in_file(file, |_, _| VisitorResult::Continue),
            FindResult::Invalid
        );
        let other = parse_unit("int a;\n");
        let foreign = other.file("t.c").unwrap();
        assert_eq!(
            a.find_references_in_file(foreign, |_, _| VisitorResult::Continue),
            FindResult::Invalid
        );
    }

    #[test]
    fn test_macro_references() {
        let options = ParseOptions {
            detailed_preprocessing_record: true,
            ..ParseOptions::default()
        };
        let tu = parse_unit_with("#define N 4\nint a[N];\nint b[N];\n", options);
        let file = tu.file("t.c").unwrap();
        let def = tu.cursor().children()[0];
        assert_eq!(def.kind(), CursorKind::MacroDefinition);
        let mut seen = Vec::new();
        def.find_references_in_file(file, |cursor, range| {
            seen.push((cursor.kind(), positions(range)));
            VisitorResult::Continue
        });
        assert_eq!(
            seen,
            vec![
                (CursorKind::MacroDefinition, Some((1, 9))),
                (CursorKind::MacroExpansion, Some((2, 7))),
                (CursorKind::MacroExpansion, Some((3, 7))),
            ]
        );
    }

    #[test]
    fn test_includes_in_file() {
        let tu = parse_files(&[
            ("main.c", "#include \"a.h\"\nint x;\n#include \"b.h\"\n"),
            ("a.h", "int a;\n"),
            ("b.h", "int b;\n"),
        ]);
        let main = tu.file("main.c").unwrap();
        let mut names = Vec::new();
        let result = tu.find_includes_in_file(main, |cursor, range| {
            names.push((cursor.spelling(), positions(range)));
            VisitorResult::Continue
        });
        assert_eq!(result, FindResult::Success);
        assert_eq!(
            names,
            vec![("a.h".to_string(), Some((1, 1))), ("b.h".to_string(), Some((3, 1)))]
        );

        let header = tu.file("a.h").unwrap();
        let mut calls = 0;
        tu.find_includes_in_file(header, |_, _| {
            calls += 1;
            VisitorResult::Continue
        });
        assert_eq!(calls, 0);
    }
}
