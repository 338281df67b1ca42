//! Child enumeration and depth-first visitation

use super::Cursor;
use crate::parser::ast::NodeId;
use crate::unit::TranslationUnit;

/// What the visitor wants to happen after seeing a cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildVisitResult {
    /// Stop the whole traversal.
    Break,
    /// Skip this cursor's children and go on with its next sibling.
    Continue,
    /// Visit this cursor's children before its next sibling.
    Recurse,
}

impl<'tu> Cursor<'tu> {
    /// Direct children in source order.
    ///
    /// Children of the translation unit are the top-level declarations of
    /// every file merged with the preprocessing entities by translation order.
    /// When both start at the same point the preprocessing entity comes first.
    pub fn children(&self) -> Vec<Cursor<'tu>> {
        let (Some(tu), Some(id)) = (self.translation_unit(), self.node_id()) else {
            return Vec::new();
        };
        let nodes = tu
            .ast
            .children(id)
            .iter()
            .copied()
            .filter(|child| visible_child(tu, id, *child));
        if id != NodeId::ROOT {
            return nodes.map(|child| Cursor::from_node(tu, child)).collect();
        }

        let mut nodes = nodes.peekable();
        let mut entities = tu
            .record
            .iter()
            .filter(|(_, entry)| !tu.is_hidden_pp_entity(&entry.entity))
            .peekable();
        let mut out = Vec::with_capacity(tu.ast.children(id).len() + tu.record.len());
        loop {
            let take_entity = match (nodes.peek(), entities.peek()) {
                (Some(node), Some((_, entry))) => entry.seq <= tu.ast.node(*node).seq,
                (None, Some(_)) => true,
                (Some(_), None) => false,
                (None, None) => break,
            };
            if take_entity {
                if let Some((pp, _)) = entities.next() {
                    out.push(Cursor::from_pp(tu, pp));
                }
            } else if let Some(node) = nodes.next() {
                out.push(Cursor::from_node(tu, node));
            }
        }
        out
    }

    /// Walk the children of this cursor depth first, pre-order.
    ///
    /// The visitor receives each cursor together with its parent. Returns
    /// `true` when the visitor stopped the walk with
    /// [`ChildVisitResult::Break`].
    pub fn visit_children<F>(&self, mut visitor: F) -> bool
    where
        F: FnMut(Cursor<'tu>, Cursor<'tu>) -> ChildVisitResult,
    {
        visit(*self, &mut visitor)
    }
}

fn visit<'tu, F>(parent: Cursor<'tu>, visitor: &mut F) -> bool
where
    F: FnMut(Cursor<'tu>, Cursor<'tu>) -> ChildVisitResult,
{
    for child in parent.children() {
        match visitor(child, parent) {
            ChildVisitResult::Break => return true,
            ChildVisitResult::Continue => {}
            ChildVisitResult::Recurse => {
                if visit(child, visitor) {
                    return true;
                }
            }
        }
    }
    false
}

fn visible_child(tu: &TranslationUnit, parent: NodeId, child: NodeId) -> bool {
    let node = tu.ast.node(child);
    if node.implicit {
        return false;
    }
    !(parent == NodeId::ROOT && node.from_pch && tu.session.hide_pch_declarations)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cursor::CursorKind;
    use crate::unit::tests::parse_unit;

    const THREE: &str = "int a;\nstruct S { int x; int y; };\nint c;\n";

    #[test]
    fn test_leaf_has_no_visits() {
        let tu = parse_unit("int a;\n");
        let leaf = tu.cursor().children()[0];
        let mut calls = 0;
        assert!(!leaf.visit_children(|_, _| {
            calls += 1;
            ChildVisitResult::Recurse
        }));
        assert_eq!(calls, 0);
        assert!(!Cursor::null().visit_children(|_, _| ChildVisitResult::Recurse));
    }

    #[test]
    fn test_break_stops_after_n_calls() {
        let tu = parse_unit(THREE);
        for n in 1..=4 {
            let mut calls = 0;
            let stopped = tu.cursor().visit_children(|_, _| {
                calls += 1;
                if calls == n {
                    ChildVisitResult::Break
                } else {
                    ChildVisitResult::Recurse
                }
            });
            assert!(stopped);
            assert_eq!(calls, n);
        }
    }

    #[test]
    fn test_continue_recurse_break_sequence() {
        let tu = parse_unit(THREE);
        let mut seen = Vec::new();
        let mut top = 0;
        let stopped = tu.cursor().visit_children(|cursor, parent| {
            seen.push(cursor.spelling());
            if parent.kind() != CursorKind::TranslationUnit {
                return ChildVisitResult::Continue;
            }
            top += 1;
            match top {
                1 => ChildVisitResult::Continue,
                2 => ChildVisitResult::Recurse,
                _ => ChildVisitResult::Break,
            }
        });
        assert!(stopped);
        assert_eq!(seen, vec!["a", "S", "x", "y", "c"]);
    }

    #[test]
    fn test_parent_is_passed() {
        let tu = parse_unit("struct S { int x; };\n");
        tu.cursor().visit_children(|cursor, parent| {
            if cursor.kind() == CursorKind::FieldDecl {
                assert_eq!(parent.kind(), CursorKind::StructDecl);
                assert_eq!(parent.spelling(), "S");
            }
            ChildVisitResult::Recurse
        });
    }

    #[test]
    fn test_inclusions_merge_in_order() {
        let tu = crate::unit::tests::parse_files(&[
            ("main.c", "int before;\n#include \"a.h\"\nint after;\n"),
            ("a.h", "int in_header;\n"),
        ]);
        let kinds: Vec<_> = tu
            .cursor()
            .children()
            .iter()
            .map(|c| (c.kind(), c.spelling()))
            .collect();
        assert_eq!(
            kinds,
            vec![
                (CursorKind::VarDecl, "before".to_string()),
                (CursorKind::InclusionDirective, "a.h".to_string()),
                (CursorKind::VarDecl, "in_header".to_string()),
                (CursorKind::VarDecl, "after".to_string()),
            ]
        );
    }
}
