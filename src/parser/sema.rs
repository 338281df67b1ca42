//! Semantic analysis done while parsing
//!
//! Scopes and name lookup, redeclaration chains, member lookup, constant
//! evaluation and the code-completion context captured when the parser reaches
//! the completion point.

use crate::cursor::types::layout_of;
use crate::diagnostics::Category;
use crate::parser::ast::*;
use crate::parser::parse::Parser;
use crate::source::Loc;
use rustc_hash::{FxHashMap, FxHashSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ScopeKind {
    File,
    Function,
    Block,
    Prototype,
}

#[derive(Debug)]
pub(crate) struct Scope {
    pub kind: ScopeKind,
    pub ordinary: FxHashMap<String, NodeId>,
    pub tags: FxHashMap<String, NodeId>,
    /// Labels, only used in function scopes.
    pub labels: FxHashMap<String, NodeId>,
    pub pending_gotos: Vec<NodeId>,
}

impl Scope {
    pub fn new(kind: ScopeKind) -> Self {
        Scope {
            kind,
            ordinary: FxHashMap::default(),
            tags: FxHashMap::default(),
            labels: FxHashMap::default(),
            pending_gotos: Vec::new(),
        }
    }
}

/// Which tag keyword preceded a completion point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagFilter {
    Struct,
    Union,
    Enum,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletionKind {
    /// Anywhere an ordinary name, type or macro may appear.
    Ordinary,
    /// After `.` or `->`; `record` is the accessed record, if known.
    Member { record: Option<NodeId>, arrow: bool },
    /// After `struct`, `union` or `enum`.
    Tag(TagFilter),
}

/// Parser state captured at the completion point.
#[derive(Debug, Clone)]
pub struct CompletionContext {
    pub kind: CompletionKind,
    /// Declarations visible at the point, innermost scope first.
    pub visible: Vec<NodeId>,
    pub function: Option<NodeId>,
    pub loc: Loc,
}

/// Strip typedefs (at every level) and return the underlying type.
pub(crate) fn canonical_type(ast: &Ast, ty: &Type) -> Type {
    let mut quals = ty.quals;
    let repr = match &ty.repr {
        Repr::Typedef(id) => {
            let underlying = canonical_type(ast, &ast.node(*id).ty);
            quals.is_const |= underlying.quals.is_const;
            quals.is_volatile |= underlying.quals.is_volatile;
            quals.is_restrict |= underlying.quals.is_restrict;
            underlying.repr
        }
        Repr::Pointer(inner) => Repr::Pointer(Box::new(canonical_type(ast, inner))),
        Repr::Array(inner, size) => Repr::Array(Box::new(canonical_type(ast, inner)), *size),
        Repr::Function(func) => Repr::Function(Box::new(FunctionType {
            result: canonical_type(ast, &func.result),
            params: func.params.iter().map(|p| canonical_type(ast, p)).collect(),
            variadic: func.variadic,
            prototyped: func.prototyped,
        })),
        other => other.clone(),
    };
    Type { repr, quals }
}

/// Find `name` among the fields of a record definition, descending into
/// anonymous struct and union members.
pub(crate) fn find_field(ast: &Ast, record: NodeId, name: &str) -> Option<NodeId> {
    let def = ast.definition(record)?;
    for child in ast.children(def) {
        let node = ast.node(*child);
        let NodeKind::Field { name: field, .. } = &node.kind else {
            continue;
        };
        if field == name {
            return Some(*child);
        }
        if field.is_empty() {
            if let Repr::Record(inner) = canonical_type(ast, &node.ty).repr {
                if let Some(found) = find_field(ast, inner, name) {
                    return Some(found);
                }
            }
        }
    }
    None
}

/// Evaluate an integer constant expression.
pub(crate) fn eval_const(ast: &Ast, id: NodeId) -> Option<i64> {
    let node = ast.node(id);
    let child = |i: usize| node.children.get(i).copied();
    let operands: Vec<NodeId> = node
        .children
        .iter()
        .copied()
        .filter(|c| !matches!(ast.node(*c).kind, NodeKind::TypeRef { .. }))
        .collect();
    match &node.kind {
        NodeKind::IntLiteral(n) => Some(*n as i64),
        NodeKind::CharLiteral(c) => Some(*c),
        NodeKind::Paren => eval_const(ast, child(0)?),
        NodeKind::Cast => eval_const(ast, *operands.last()?),
        NodeKind::DeclRef {
            target: Some(target),
            ..
        } => match ast.node(*target).kind {
            NodeKind::EnumConstant { value, .. } => Some(value),
            _ => None,
        },
        NodeKind::Unary(op) => {
            let value = eval_const(ast, child(0)?)?;
            match op {
                UnOp::Plus => Some(value),
                UnOp::Neg => Some(value.wrapping_neg()),
                UnOp::Not => Some(i64::from(value == 0)),
                UnOp::BitNot => Some(!value),
                _ => None,
            }
        }
        NodeKind::Binary(op) => {
            let lhs = eval_const(ast, child(0)?)?;
            let rhs = eval_const(ast, child(1)?)?;
            let value = match op {
                BinOp::Add => lhs.wrapping_add(rhs),
                BinOp::Sub => lhs.wrapping_sub(rhs),
                BinOp::Mul => lhs.wrapping_mul(rhs),
                BinOp::Div => lhs.checked_div(rhs)?,
                BinOp::Mod => lhs.checked_rem(rhs)?,
                BinOp::Eq => i64::from(lhs == rhs),
                BinOp::Ne => i64::from(lhs != rhs),
                BinOp::Lt => i64::from(lhs < rhs),
                BinOp::Le => i64::from(lhs <= rhs),
                BinOp::Gt => i64::from(lhs > rhs),
                BinOp::Ge => i64::from(lhs >= rhs),
                BinOp::And => i64::from(lhs != 0 && rhs != 0),
                BinOp::Or => i64::from(lhs != 0 || rhs != 0),
                BinOp::BitAnd => lhs & rhs,
                BinOp::BitOr => lhs | rhs,
                BinOp::BitXor => lhs ^ rhs,
                BinOp::BitShl => lhs.wrapping_shl(rhs as u32 & 63),
                BinOp::BitShr => lhs.wrapping_shr(rhs as u32 & 63),
                BinOp::Comma => rhs,
                BinOp::Assign => return None,
            };
            Some(value)
        }
        NodeKind::Conditional => {
            let cond = eval_const(ast, child(0)?)?;
            eval_const(ast, if cond != 0 { child(1)? } else { child(2)? })
        }
        NodeKind::TypeTrait(kind, ty) => {
            let layout = layout_of(ast, ty).ok()?;
            Some(match kind {
                TraitKind::SizeOf => layout.size as i64,
                TraitKind::AlignOf => layout.align as i64,
            })
        }
        _ => None,
    }
}

/// Result type of arithmetic on two operands, after the usual conversions.
pub(crate) fn arithmetic_result(ast: &Ast, lhs: &Type, rhs: &Type) -> Type {
    let l = canonical_type(ast, lhs);
    let r = canonical_type(ast, rhs);
    match (&l.repr, &r.repr) {
        (Repr::Pointer(_), _) | (Repr::Array(..), _) => decay(lhs),
        (_, Repr::Pointer(_)) | (_, Repr::Array(..)) => decay(rhs),
        _ => {
            let rank = |t: &Repr| match t {
                Repr::LongDouble => 9,
                Repr::Double => 8,
                Repr::Float => 7,
                Repr::ULongLong => 6,
                Repr::LongLong => 5,
                Repr::ULong => 4,
                Repr::Long => 3,
                Repr::UInt => 2,
                Repr::Invalid => 0,
                _ => 1,
            };
            let pick = if rank(&l.repr) >= rank(&r.repr) { l } else { r };
            match rank(&pick.repr) {
                0 => Type::default(),
                1 => Type::int(),
                _ => pick.unqualified(),
            }
        }
    }
}

/// Array-to-pointer and function-to-pointer decay.
pub(crate) fn decay(ty: &Type) -> Type {
    match &ty.repr {
        Repr::Array(inner, _) => (**inner).clone().with_pointer(),
        Repr::Function(_) => ty.clone().with_pointer(),
        _ => ty.clone(),
    }
}

/// Type reached by dereferencing or subscripting `ty`.
pub(crate) fn pointee(ast: &Ast, ty: &Type) -> Type {
    match canonical_type(ast, ty).repr {
        Repr::Pointer(inner) | Repr::Array(inner, _) => *inner,
        _ => Type::default(),
    }
}

impl Parser<'_> {
    pub(crate) fn push_scope(&mut self, kind: ScopeKind) {
        self.scopes.push(Scope::new(kind));
    }

    pub(crate) fn pop_scope(&mut self) -> Option<Scope> {
        if self.scopes.len() > 1 {
            self.scopes.pop()
        } else {
            None
        }
    }

    pub(crate) fn lookup_ordinary(&self, name: &str) -> Option<NodeId> {
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.ordinary.get(name).copied())
    }

    pub(crate) fn lookup_typedef(&self, name: &str) -> Option<NodeId> {
        self.lookup_ordinary(name)
            .filter(|id| matches!(self.ast.node(*id).kind, NodeKind::Typedef { .. }))
    }

    /// Tag lookup; the flag tells whether it was found in the current scope.
    pub(crate) fn lookup_tag(&self, name: &str) -> Option<(NodeId, bool)> {
        let innermost = self.scopes.len() - 1;
        self.scopes
            .iter()
            .enumerate()
            .rev()
            .find_map(|(i, scope)| scope.tags.get(name).map(|id| (*id, i == innermost)))
    }

    pub(crate) fn declare_tag(&mut self, name: &str, id: NodeId) {
        if name.is_empty() {
            return;
        }
        // tags named inside a prototype still live in the prototype scope
        if let Some(scope) = self.scopes.last_mut() {
            scope.tags.insert(name.to_string(), id);
        }
    }

    fn is_file_scope(&self) -> bool {
        self.scopes.last().is_some_and(|s| s.kind == ScopeKind::File)
    }

    /// Whether the declaration is a definition in its own right; tentative file
    /// scope variables are settled at the end of the unit.
    fn declares_definition(&self, id: NodeId) -> bool {
        match &self.ast.node(id).kind {
            NodeKind::Function { body, .. } => *body != Body::None,
            NodeKind::Var { storage, has_init, .. } => {
                *has_init || (!self.is_file_scope() && *storage != StorageClass::Extern)
            }
            NodeKind::Typedef { .. } | NodeKind::Param { .. } | NodeKind::EnumConstant { .. } => true,
            _ => false,
        }
    }

    /// Enter an ordinary identifier into the current scope, linking it to a
    /// previous declaration of the same entity.
    pub(crate) fn declare_ordinary(&mut self, id: NodeId) {
        let name = self.ast.name(id).to_string();
        if name.is_empty() {
            return;
        }
        let is_definition = self.declares_definition(id);
        let kind_of = |kind: &NodeKind| std::mem::discriminant(kind);
        let node_kind = self.ast.node(id).kind.clone();
        let linkage_lookup = match &node_kind {
            NodeKind::Function { .. } => true,
            NodeKind::Var { storage, .. } => *storage == StorageClass::Extern,
            _ => false,
        };

        let mut previous = self.scopes.last().and_then(|s| s.ordinary.get(&name).copied());
        if previous.is_none() && linkage_lookup {
            previous = self.scopes[0].ordinary.get(&name).copied();
        }

        if let Some(prev) = previous {
            let prev_kind = self.ast.node(prev).kind.clone();
            let loc = self.ast.node(id).loc;
            let prev_loc = self.ast.node(prev).loc;
            let same_kind = kind_of(&prev_kind) == kind_of(&node_kind);
            let redeclarable = same_kind
                && matches!(
                    node_kind,
                    NodeKind::Function { .. } | NodeKind::Var { .. } | NodeKind::Typedef { .. }
                )
                && (self.is_file_scope() || linkage_lookup || matches!(node_kind, NodeKind::Typedef { .. }));

            if !same_kind {
                self.diags
                    .error(
                        Category::Semantic,
                        loc,
                        format!("redefinition of '{}' as different kind of symbol", name),
                    )
                    .note(prev_loc, "previous definition is here");
            } else if !redeclarable {
                self.diags
                    .error(Category::Semantic, loc, format!("redefinition of '{}'", name))
                    .note(prev_loc, "previous definition is here");
            } else {
                let prev_def = self.ast.definition(prev);
                let conflicting = is_definition
                    && !matches!(node_kind, NodeKind::Typedef { .. })
                    && prev_def.is_some();
                if let (true, Some(prev_def)) = (conflicting, prev_def) {
                    let prev_def_loc = self.ast.node(prev_def).loc;
                    self.diags
                        .error(Category::Semantic, loc, format!("redefinition of '{}'", name))
                        .note(prev_def_loc, "previous definition is here");
                } else {
                    self.ast.add_redecl(prev, id);
                }
            }
        }

        if is_definition && self.ast.definition(id).is_none() {
            self.ast.set_definition(id);
        }
        if let Some(scope) = self.scopes.last_mut() {
            scope.ordinary.insert(name, id);
        }
    }

    /// Declare a function nobody declared, as C89 would.
    pub(crate) fn declare_implicit_function(&mut self, name: &str, loc: Loc, start: usize) -> NodeId {
        self.diags.warning(
            Category::Semantic,
            loc,
            format!("implicit declaration of function '{}' is invalid in C99", name),
            "implicit-function-declaration",
        );
        let id = self.add_node(
            NodeKind::Function {
                name: name.to_string(),
                storage: StorageClass::Extern,
                inline: false,
                body: Body::None,
            },
            start,
            loc,
            NodeId::ROOT,
        );
        let node = self.ast.node_mut(id);
        node.implicit = true;
        node.ty = Type::new(Repr::Function(Box::new(FunctionType {
            result: Type::int(),
            params: Vec::new(),
            variadic: false,
            prototyped: false,
        })));
        self.scopes[0].ordinary.insert(name.to_string(), id);
        id
    }

    /// File scope variables without a definition get their first tentative
    /// declaration as the definition.
    pub(crate) fn finish_tentative_definitions(&mut self) {
        let roots: Vec<NodeId> = self.ast.children(NodeId::ROOT).to_vec();
        for id in roots {
            if let NodeKind::Var { storage, .. } = self.ast.node(id).kind {
                if storage != StorageClass::Extern && self.ast.definition(id).is_none() {
                    self.ast.set_definition(id);
                }
            }
        }
    }

    pub(crate) fn function_scope(&mut self) -> Option<&mut Scope> {
        self.scopes
            .iter_mut()
            .rev()
            .find(|s| s.kind == ScopeKind::Function)
    }

    /// Resolve `goto`s to labels once the function body is complete.
    pub(crate) fn resolve_gotos(&mut self, scope: &Scope) {
        for goto in &scope.pending_gotos {
            let NodeKind::Goto { label, .. } = self.ast.node(*goto).kind.clone() else {
                continue;
            };
            let goto_node = self.ast.node(*goto).clone();
            match scope.labels.get(&label) {
                Some(target) => {
                    self.ast.node_mut(*goto).kind = NodeKind::Goto {
                        label,
                        target: Some(*target),
                    };
                    // the label name is the token after `goto`
                    let seq = goto_node.seq + 1;
                    let name_loc = self
                        .tokens
                        .get(seq as usize)
                        .map_or(goto_node.loc, |t| t.loc);
                    let name_end = self.tokens.get(seq as usize).map_or(name_loc, |t| t.end());
                    let r = self.ast.add(
                        NodeKind::LabelRef { target: *target },
                        crate::source::Span::new(name_loc, name_end),
                        name_loc,
                        *goto,
                        seq,
                    );
                    self.ast.node_mut(r).from_pch = goto_node.from_pch;
                }
                None => {
                    self.diags.error(
                        Category::Semantic,
                        goto_node.loc,
                        format!("use of undeclared label '{}'", label),
                    );
                }
            }
        }
    }

    /// Record the completion context and stop parsing.
    pub(crate) fn capture_completion(&mut self, kind: CompletionKind) {
        let mut seen = FxHashSet::default();
        let mut visible = Vec::new();
        for scope in self.scopes.iter().rev() {
            let names = match kind {
                CompletionKind::Tag(_) => &scope.tags,
                _ => &scope.ordinary,
            };
            let mut entries: Vec<(&String, &NodeId)> = names.iter().collect();
            entries.sort_by_key(|(_, id)| **id);
            for (name, id) in entries {
                if seen.insert(name.clone()) {
                    visible.push(*id);
                }
            }
        }
        tracing::debug!(?kind, visible = visible.len(), "completion point reached");
        self.completion = Some(CompletionContext {
            kind,
            visible,
            function: self.function,
            loc: self.current_loc(),
        });
        self.diags.suppress_all();
        // nothing after the completion point is parsed
        self.position = self.tokens.len() - 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse::tests::parse_source;

    fn find(parsed: &crate::parser::parse::tests::Parsed, name: &str) -> Vec<NodeId> {
        parsed
            .ast
            .ids()
            .filter(|id| parsed.ast.node(*id).kind.is_declaration() && parsed.ast.name(*id) == name)
            .collect()
    }

    #[test]
    fn test_function_redeclarations() {
        let parsed = parse_source("int f(int);\nint f(int a) { return a; }\nint f(int);\n");
        assert!(parsed.diags.is_empty());
        let decls = find(&parsed, "f");
        assert_eq!(decls.len(), 3);
        assert_eq!(parsed.ast.canonical(decls[2]), decls[0]);
        assert_eq!(parsed.ast.definition(decls[0]), Some(decls[1]));
    }

    #[test]
    fn test_redefinition_error() {
        let parsed = parse_source("int x = 1;\nint x = 2;\n");
        assert_eq!(parsed.diags.len(), 1);
        assert_eq!(parsed.diags[0].message, "redefinition of 'x'");
        assert_eq!(parsed.diags[0].notes[0].message, "previous definition is here");
    }

    #[test]
    fn test_tentative_definition() {
        let parsed = parse_source("int t;\nint t;\nextern int e;\n");
        let t = find(&parsed, "t");
        assert_eq!(parsed.ast.definition(t[1]), Some(t[0]));
        let e = find(&parsed, "e");
        assert_eq!(parsed.ast.definition(e[0]), None);
    }

    #[test]
    fn test_undeclared_and_implicit() {
        let parsed = parse_source("int main(void) { foo(1); return y; }");
        let messages: Vec<_> = parsed.diags.iter().map(|d| d.message.as_str()).collect();
        assert_eq!(
            messages,
            vec![
                "implicit declaration of function 'foo' is invalid in C99",
                "use of undeclared identifier 'y'",
            ]
        );
        let foo = find(&parsed, "foo");
        assert!(parsed.ast.node(foo[0]).implicit);
    }

    #[test]
    fn test_enum_and_sizeof_constants() {
        let parsed = parse_source("enum E { A, B = 4, C };\nstruct S { int a; char b; };\nint arr[sizeof(struct S) + C];\n");
        assert!(parsed.diags.is_empty());
        let c = find(&parsed, "C")[0];
        assert!(matches!(parsed.ast.node(c).kind, NodeKind::EnumConstant { value: 5, .. }));
        let arr = find(&parsed, "arr")[0];
        assert!(matches!(&parsed.ast.node(arr).ty.repr, Repr::Array(_, Some(13))));
    }

    #[test]
    fn test_goto_resolves_forward_label() {
        let parsed = parse_source("void f(void) { goto out; out: return; }");
        assert!(parsed.diags.is_empty());
        let goto = parsed
            .ast
            .ids()
            .find(|id| matches!(parsed.ast.node(*id).kind, NodeKind::Goto { .. }))
            .unwrap();
        assert!(parsed.ast.node(goto).kind.referenced().is_some());
        let child = parsed.ast.children(goto)[0];
        assert!(matches!(parsed.ast.node(child).kind, NodeKind::LabelRef { .. }));
    }
}
