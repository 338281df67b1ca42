//! Unified symbol resolution strings
//!
//! USRs follow libclang's scheme for C so that they can be compared with
//! indexes produced by other tools:
//!
//! ```text
//! c:@F@name            function with external linkage
//! c:t.c@F@name         static function
//! c:@name              global variable
//! c:t.c@name           static global variable
//! c:t.c@31@F@f@x       local variable or parameter
//! c:@S@Name            struct (U for unions, E for enums)
//! c:@S@Name@FI@field   field
//! c:@E@Name@CONST      enumerator
//! c:t.c@T@Name         typedef
//! c:t.c@24@macro@NAME  macro
//! ```

use crate::parser::ast::*;
use crate::parser::preprocessor::{PpEntity, PpId};
use crate::source::{Loc, SourceManager};
use crate::unit::TranslationUnit;
use std::fmt::Write as _;

/// USR of a declaration, empty when none can be formed.
pub(crate) fn declaration(tu: &TranslationUnit, id: NodeId) -> String {
    let generator = Generator {
        ast: &tu.ast,
        sm: &tu.sm,
    };
    generator.declaration(id).unwrap_or_default()
}

pub(crate) fn macro_definition(tu: &TranslationUnit, id: PpId) -> String {
    let Some(PpEntity::MacroDefinition(def)) = tu.record.get(id).map(|e| &e.entity) else {
        return String::new();
    };
    match tu.sm.decompose(tu.sm.expansion_loc(def.name_loc)) {
        Some((file, offset)) if !is_builtin(&tu.sm, def.name_loc) => format!(
            "c:{}@{}@macro@{}",
            basename(&tu.sm.file(file).name),
            offset,
            def.name
        ),
        _ => format!("c:@macro@{}", def.name),
    }
}

fn is_builtin(sm: &SourceManager, loc: Loc) -> bool {
    sm.decompose(sm.expansion_loc(loc))
        .is_some_and(|(file, _)| sm.file(file).name == crate::source::BUILTIN_BUFFER)
}

fn basename(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}

struct Generator<'a> {
    ast: &'a Ast,
    sm: &'a SourceManager,
}

impl Generator<'_> {
    fn declaration(&self, id: NodeId) -> Option<String> {
        let node = self.ast.node(id);
        match &node.kind {
            NodeKind::Function { name, .. } => {
                if self.is_static(id) {
                    Some(format!("c:{}@F@{}", self.file_name(node.span.begin)?, name))
                } else {
                    Some(format!("c:@F@{}", name))
                }
            }
            NodeKind::Var { name, storage, .. } => match self.enclosing_function(id) {
                Some(_) if *storage == StorageClass::Extern => Some(format!("c:@{}", name)),
                Some(function) => self.local(id, function, name),
                None if self.is_static(id) => Some(format!("c:{}@{}", self.file_name(node.span.begin)?, name)),
                None => Some(format!("c:@{}", name)),
            },
            NodeKind::Param { name } => {
                let function = self.enclosing_function(id)?;
                self.local(id, function, name)
            }
            NodeKind::Field { name, .. } => {
                let record = self.ast.node(id).semantic_parent?;
                Some(format!("{}@FI@{}", self.declaration(record)?, name))
            }
            NodeKind::EnumConstant { name, .. } => {
                let owner = self.ast.node(id).semantic_parent?;
                Some(format!("{}@{}", self.declaration(owner)?, name))
            }
            NodeKind::Record { tag, name, .. } => {
                let letter = match tag {
                    TagKind::Struct => 'S',
                    TagKind::Union => 'U',
                };
                self.tag(id, letter, name)
            }
            NodeKind::Enum { name, .. } => self.tag(id, 'E', name),
            NodeKind::Typedef { name } => Some(format!("c:{}@T@{}", self.file_name(node.span.begin)?, name)),
            _ => None,
        }
    }

    /// Locals carry their file and offset so equally named locals differ.
    fn local(&self, id: NodeId, function: NodeId, name: &str) -> Option<String> {
        let loc = self.sm.expansion_loc(self.ast.node(id).span.begin);
        let (file, offset) = self.sm.decompose(loc)?;
        let function_name = self.ast.name(function);
        Some(format!(
            "c:{}@{}@F@{}@{}",
            basename(&self.sm.file(file).name),
            offset,
            function_name,
            name
        ))
    }

    fn tag(&self, id: NodeId, letter: char, name: &str) -> Option<String> {
        let id = self.ast.canonical(id);
        let prefix = match self.enclosing_function(id) {
            Some(function) => self.declaration(function)?,
            None => "c:".to_string(),
        };
        if !name.is_empty() {
            return Some(format!("{}@{}@{}", prefix, letter, name));
        }

        if let Some(typedef) = self.naming_typedef(id) {
            return Some(format!("{}@{}A@{}", prefix, letter, typedef));
        }
        let parent = self.ast.node(id).semantic_parent?;
        if matches!(self.ast.node(parent).kind, NodeKind::Record { .. }) {
            return Some(format!("{}@{}a", self.declaration(parent)?, letter));
        }
        if letter == 'E' {
            // anonymous enums are named after their first enumerator
            let first = self
                .ast
                .children(id)
                .iter()
                .find_map(|c| match &self.ast.node(*c).kind {
                    NodeKind::EnumConstant { name, .. } => Some(name.clone()),
                    _ => None,
                })?;
            return Some(format!("{}@Ea@{}", prefix, first));
        }
        let loc = self.sm.expansion_loc(self.ast.node(id).span.begin);
        let (file, offset) = self.sm.decompose(loc)?;
        let mut usr = prefix;
        let _ = write!(usr, "@{}@{}@{}", letter, basename(&self.sm.file(file).name), offset);
        Some(usr)
    }

    /// The typedef that gives an anonymous tag its name, if any.
    fn naming_typedef(&self, tag: NodeId) -> Option<String> {
        self.ast.ids().find_map(|id| {
            let node = self.ast.node(id);
            match (&node.kind, &node.ty.repr) {
                (NodeKind::Typedef { name }, Repr::Record(target) | Repr::Enum(target))
                    if *target == tag && node.ty.quals == Qualifiers::default() =>
                {
                    Some(name.clone())
                }
                _ => None,
            }
        })
    }

    fn enclosing_function(&self, id: NodeId) -> Option<NodeId> {
        self.ast
            .ancestors(id)
            .find(|a| matches!(self.ast.node(*a).kind, NodeKind::Function { .. }))
    }

    fn is_static(&self, id: NodeId) -> bool {
        self.ast.redecls(id).iter().any(|d| {
            matches!(
                self.ast.node(*d).kind,
                NodeKind::Function {
                    storage: StorageClass::Static,
                    ..
                } | NodeKind::Var {
                    storage: StorageClass::Static,
                    ..
                }
            )
        })
    }

    fn file_name(&self, loc: Loc) -> Option<&str> {
        let (file, _) = self.sm.decompose(self.sm.expansion_loc(loc))?;
        Some(basename(&self.sm.file(file).name))
    }
}

#[cfg(test)]
mod tests {
    use crate::cursor::{ChildVisitResult, Cursor, CursorKind};
    use crate::unit::tests::{parse_unit, parse_unit_with};
    use crate::unit::{ParseOptions, TranslationUnit};

    fn usrs(tu: &TranslationUnit) -> Vec<(String, String)> {
        let mut out = Vec::new();
        tu.cursor().visit_children(|cursor: Cursor, _| {
            if cursor.kind().is_declaration() || cursor.kind() == CursorKind::MacroDefinition {
                out.push((cursor.spelling(), cursor.usr()));
            }
            ChildVisitResult::Recurse
        });
        out
    }

    fn usr_of(tu: &TranslationUnit, name: &str) -> String {
        usrs(tu)
            .into_iter()
            .find(|(spelling, _)| spelling == name)
            .map(|(_, usr)| usr)
            .unwrap_or_default()
    }

    #[test]
    fn test_functions_and_variables() {
        let tu = parse_unit("static int hidden(void);\nint g;\nstatic int s;\nint f(int a) { int local; return a; }\n");
        assert_eq!(usr_of(&tu, "hidden"), "c:t.c@F@hidden");
        assert_eq!(usr_of(&tu, "g"), "c:@g");
        assert_eq!(usr_of(&tu, "s"), "c:t.c@s");
        assert_eq!(usr_of(&tu, "f"), "c:@F@f");
        assert_eq!(usr_of(&tu, "a"), "c:t.c@52@F@f@a");
        assert_eq!(usr_of(&tu, "local"), "c:t.c@61@F@f@local");
    }

    #[test]
    fn test_tags_and_members() {
        let tu = parse_unit(
            "struct P { int x; };\nunion U { int i; };\nenum E { A, B };\ntypedef struct { int y; } T;\nenum { LONE };\n",
        );
        assert_eq!(usr_of(&tu, "P"), "c:@S@P");
        assert_eq!(usr_of(&tu, "x"), "c:@S@P@FI@x");
        assert_eq!(usr_of(&tu, "U"), "c:@U@U");
        assert_eq!(usr_of(&tu, "B"), "c:@E@E@B");
        assert_eq!(usr_of(&tu, "y"), "c:@SA@T@FI@y");
        assert_eq!(usr_of(&tu, "T"), "c:t.c@T@T");
        assert_eq!(usr_of(&tu, "LONE"), "c:@Ea@LONE@LONE");
    }

    #[test]
    fn test_macro_usr() {
        let options = ParseOptions {
            detailed_preprocessing_record: true,
            ..ParseOptions::default()
        };
        let tu = parse_unit_with("#define MAX 10\nint a[MAX];\n", options);
        assert_eq!(usr_of(&tu, "MAX"), "c:t.c@8@macro@MAX");
    }
}
