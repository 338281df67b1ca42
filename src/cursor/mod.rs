//! Cursors: copyable handles to entities of a translation unit
//!
//! A [`Cursor`] names one AST node or one preprocessing entity and borrows the
//! [`TranslationUnit`] it came from, so it can never outlive (or observe a
//! reparse of) its unit. Equality is structural: two cursors are equal when
//! they have the same kind, point at the same entity and come from the same
//! unit.

pub mod kind;
pub mod set;
pub mod types;
pub(crate) mod usr;
pub mod visit;

pub use kind::CursorKind;
pub use set::CursorSet;
pub use types::{CType, LayoutError, TypeKind};
pub use visit::ChildVisitResult;

use crate::comment;
use crate::parser::ast::*;
use crate::parser::preprocessor::{PpEntity, PpId};
use crate::source::{File, SourceLocation, SourceRange, Span};
use crate::unit::TranslationUnit;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ptr;

/// What a cursor points at inside its unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum Payload {
    None,
    Node(NodeId),
    Pp(PpId),
}

/// Linkage of a declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Linkage {
    Invalid,
    NoLinkage,
    Internal,
    UniqueExternal,
    External,
}

#[derive(Clone, Copy)]
pub struct Cursor<'tu> {
    kind: CursorKind,
    payload: Payload,
    tu: Option<&'tu TranslationUnit>,
}

impl<'tu> Cursor<'tu> {
    /// The cursor that points at nothing.
    pub fn null() -> Self {
        Cursor {
            kind: CursorKind::InvalidFile,
            payload: Payload::None,
            tu: None,
        }
    }

    pub(crate) fn from_node(tu: &'tu TranslationUnit, id: NodeId) -> Self {
        match tu.ast.get(id) {
            Some(node) => Cursor {
                kind: CursorKind::of_node(&node.kind),
                payload: Payload::Node(id),
                tu: Some(tu),
            },
            None => Self::null(),
        }
    }

    pub(crate) fn from_pp(tu: &'tu TranslationUnit, id: PpId) -> Self {
        let kind = match tu.record.get(id).map(|e| &e.entity) {
            Some(PpEntity::Inclusion(_)) => CursorKind::InclusionDirective,
            Some(PpEntity::MacroDefinition(_)) => CursorKind::MacroDefinition,
            Some(PpEntity::MacroExpansion(_)) => CursorKind::MacroExpansion,
            None => return Self::null(),
        };
        Cursor {
            kind,
            payload: Payload::Pp(id),
            tu: Some(tu),
        }
    }

    /// A cursor of an invalid kind that still belongs to `tu`.
    pub(crate) fn invalid(tu: &'tu TranslationUnit, kind: CursorKind) -> Self {
        Cursor {
            kind,
            payload: Payload::None,
            tu: Some(tu),
        }
    }

    pub(crate) fn node_id(&self) -> Option<NodeId> {
        match self.payload {
            Payload::Node(id) => Some(id),
            _ => None,
        }
    }

    pub(crate) fn pp_id(&self) -> Option<PpId> {
        match self.payload {
            Payload::Pp(id) => Some(id),
            _ => None,
        }
    }

    /// Unit and node, for cursors backed by an AST node.
    pub(crate) fn node(&self) -> Option<(&'tu TranslationUnit, &'tu Node)> {
        let tu = self.tu?;
        Some((tu, tu.ast.get(self.node_id()?)?))
    }

    fn pp_entity(&self) -> Option<&'tu PpEntity> {
        let tu = self.tu?;
        tu.record.get(self.pp_id()?).map(|e| &e.entity)
    }

    fn same_unit(&self, id: NodeId) -> Cursor<'tu> {
        match self.tu {
            Some(tu) => Cursor::from_node(tu, id),
            None => Self::null(),
        }
    }

    pub fn kind(&self) -> CursorKind {
        self.kind
    }

    pub fn is_null(&self) -> bool {
        self.tu.is_none()
    }

    pub fn translation_unit(&self) -> Option<&'tu TranslationUnit> {
        self.tu
    }

    /// Name of the entity, or the most natural text for unnamed ones.
    pub fn spelling(&self) -> String {
        if let Some(entity) = self.pp_entity() {
            return entity.name().to_string();
        }
        let Some((tu, node)) = self.node() else {
            return String::new();
        };
        let ast = &tu.ast;
        match &node.kind {
            NodeKind::TranslationUnit => tu.main_file_name().to_string(),
            NodeKind::TypeRef { target } => {
                types::type_spelling(ast, &tu.sm, &declared_type(ast, *target))
            }
            NodeKind::MemberRef { target } => ast.name(*target).to_string(),
            NodeKind::LabelRef { target } => match &ast.node(*target).kind {
                NodeKind::Label { name } => name.clone(),
                _ => String::new(),
            },
            NodeKind::DeclRef { name, .. } | NodeKind::Member { name, .. } => name.clone(),
            NodeKind::Label { name } => name.clone(),
            NodeKind::Call => node
                .children
                .first()
                .map(|callee| self.same_unit(*callee).spelling())
                .unwrap_or_default(),
            NodeKind::IntLiteral(_)
            | NodeKind::FloatLiteral(_)
            | NodeKind::CharLiteral(_)
            | NodeKind::StringLiteral(_) => tu
                .sm
                .text(tu.sm.expansion_span(node.span))
                .unwrap_or_default()
                .to_string(),
            NodeKind::Unary(op) => op.spelling().to_string(),
            NodeKind::Binary(op) => op.spelling().to_string(),
            NodeKind::CompoundAssign(op) => format!("{}=", op.spelling()),
            NodeKind::Attr(attr) => match attr {
                AttrKind::Annotate(text) | AttrKind::AsmLabel(text) | AttrKind::Visibility(text) => text.clone(),
                AttrKind::Other(name) => name.clone(),
                AttrKind::Packed => "packed".to_string(),
                AttrKind::Aligned(_) => "aligned".to_string(),
                AttrKind::Const => "const".to_string(),
                AttrKind::Pure => "pure".to_string(),
                AttrKind::WarnUnusedResult => "warn_unused_result".to_string(),
            },
            kind => kind.decl_name().unwrap_or_default().to_string(),
        }
    }

    /// Spelling plus, for functions, the parameter types: `f(int, char *)`.
    pub fn display_name(&self) -> String {
        let Some((tu, node)) = self.node() else {
            return self.spelling();
        };
        match (&node.kind, &node.ty.repr) {
            (NodeKind::Function { name, .. }, Repr::Function(func)) => {
                let mut params: Vec<String> = func
                    .params
                    .iter()
                    .map(|p| types::type_spelling(&tu.ast, &tu.sm, p))
                    .collect();
                if func.variadic {
                    params.push("...".to_string());
                }
                format!("{}({})", name, params.join(", "))
            }
            _ => self.spelling(),
        }
    }

    /// Where the cursor points: the name of a declaration, the start of
    /// other nodes.
    pub fn location(&self) -> SourceLocation<'tu> {
        let Some(tu) = self.tu else {
            return SourceLocation::null();
        };
        if let Some(entity) = self.pp_entity() {
            let loc = match entity {
                PpEntity::MacroDefinition(def) => def.name_loc,
                other => other.span().begin,
            };
            return SourceLocation::new(&tu.sm, loc);
        }
        match self.node_id() {
            Some(NodeId::ROOT) => tu.main_file_range().begin(),
            Some(id) => SourceLocation::new(&tu.sm, tu.ast.node(id).loc),
            None => SourceLocation::null(),
        }
    }

    /// Source range the entity covers, mapped out of macro expansions.
    pub fn extent(&self) -> SourceRange<'tu> {
        let Some(tu) = self.tu else {
            return SourceRange::null();
        };
        let span = match (self.pp_entity(), self.node_id()) {
            (Some(entity), _) => entity.span(),
            (None, Some(NodeId::ROOT)) => return tu.main_file_range(),
            (None, Some(id)) => tu.ast.node(id).span,
            (None, None) => return SourceRange::null(),
        };
        SourceRange::from_span(&tu.sm, tu.sm.expansion_span(span))
    }

    /// Range of the declared name; the whole extent for other cursors.
    pub fn spelling_name_range(&self) -> SourceRange<'tu> {
        match self.node() {
            Some((tu, node)) if node.kind.is_declaration() => {
                SourceRange::from_span(&tu.sm, Span::new(node.loc, tu.sm.token_end(node.loc)))
            }
            _ => self.extent(),
        }
    }

    /// The declaration context that semantically owns a declaration.
    pub fn semantic_parent(&self) -> Cursor<'tu> {
        match self.node() {
            Some((_, node)) if node.kind.is_declaration() => node
                .semantic_parent
                .map_or_else(Self::null, |p| self.same_unit(p)),
            _ => Self::null(),
        }
    }

    /// The declaration context a declaration is written in.
    pub fn lexical_parent(&self) -> Cursor<'tu> {
        match (self.node(), self.node_id()) {
            (Some((tu, node)), Some(id)) if node.kind.is_declaration() => tu
                .ast
                .ancestors(id)
                .find(|p| is_decl_context(&tu.ast.node(*p).kind))
                .map_or_else(Self::null, |p| self.same_unit(p)),
            _ => Self::null(),
        }
    }

    /// The entity a reference or expression refers to. Declarations refer
    /// to themselves.
    pub fn referenced(&self) -> Cursor<'tu> {
        if let (Some(tu), Some(entity)) = (self.tu, self.pp_entity()) {
            return match entity {
                PpEntity::MacroExpansion(exp) => exp
                    .definition
                    .map_or_else(Self::null, |d| Cursor::from_pp(tu, d)),
                PpEntity::MacroDefinition(_) => *self,
                PpEntity::Inclusion(_) => Self::null(),
            };
        }
        let Some((tu, node)) = self.node() else {
            return Self::null();
        };
        if node.kind.is_declaration() {
            return *self;
        }
        match &node.kind {
            NodeKind::TypeRef { target } => {
                self.same_unit(tu.ast.definition(*target).unwrap_or(*target))
            }
            NodeKind::Call => match callee(&tu.ast, node) {
                Some(target) => self.same_unit(target),
                None => Self::null(),
            },
            kind => kind
                .referenced()
                .filter(|_| !matches!(kind, NodeKind::Goto { .. }))
                .map_or_else(Self::null, |t| self.same_unit(t)),
        }
    }

    /// The defining declaration of the entity, if the unit contains it.
    pub fn definition(&self) -> Cursor<'tu> {
        match self.kind {
            CursorKind::MacroDefinition => return *self,
            CursorKind::MacroExpansion => return self.referenced(),
            _ => {}
        }
        let Some((tu, node)) = self.node() else {
            return Self::null();
        };
        if !node.kind.is_declaration() {
            let referenced = self.referenced();
            return if referenced.kind.is_declaration() {
                referenced.definition()
            } else {
                referenced
            };
        }
        match node.kind {
            NodeKind::Record { .. }
            | NodeKind::Enum { .. }
            | NodeKind::Function { .. }
            | NodeKind::Var { .. } => self
                .node_id()
                .and_then(|id| tu.ast.definition(id))
                .map_or_else(Self::null, |d| self.same_unit(d)),
            _ => *self,
        }
    }

    pub fn canonical(&self) -> Cursor<'tu> {
        match self.node() {
            Some((tu, node)) if node.kind.is_declaration() => {
                let id = self.node_id().unwrap_or(NodeId::ROOT);
                self.same_unit(tu.ast.canonical(id))
            }
            _ => *self,
        }
    }

    pub fn is_definition(&self) -> bool {
        self.kind.is_declaration() && self.definition() == *self
    }

    /// Unified symbol resolution string; empty for entities without one.
    pub fn usr(&self) -> String {
        let Some(tu) = self.tu else {
            return String::new();
        };
        match self.payload {
            Payload::Node(id) if self.kind.is_declaration() => usr::declaration(tu, id),
            Payload::Pp(id) if self.kind == CursorKind::MacroDefinition => usr::macro_definition(tu, id),
            _ => String::new(),
        }
    }

    /// Type of a declaration, type reference or expression.
    pub fn ty(&self) -> CType<'tu> {
        let Some((tu, node)) = self.node() else {
            return self.invalid_type();
        };
        let id = self.node_id().unwrap_or(NodeId::ROOT);
        let ty = match &node.kind {
            NodeKind::TypeRef { target } => declared_type(&tu.ast, *target),
            kind if kind.is_declaration() => declared_type(&tu.ast, id),
            _ if self.kind.is_expression() => node.ty.clone(),
            _ => Type::default(),
        };
        CType::new(tu, ty)
    }

    fn invalid_type(&self) -> CType<'tu> {
        CType::invalid()
    }

    pub fn result_type(&self) -> CType<'tu> {
        match self.node() {
            Some((_, node)) if matches!(node.kind, NodeKind::Function { .. }) => self.ty().result_type(),
            _ => self.invalid_type(),
        }
    }

    fn arguments(&self) -> Option<Vec<NodeId>> {
        let (tu, node) = self.node()?;
        match node.kind {
            NodeKind::Function { .. } => Some(
                node.children
                    .iter()
                    .copied()
                    .filter(|c| matches!(tu.ast.node(*c).kind, NodeKind::Param { .. }))
                    .collect(),
            ),
            NodeKind::Call => Some(node.children.iter().skip(1).copied().collect()),
            _ => None,
        }
    }

    /// Parameter count of a function or argument count of a call.
    pub fn num_arguments(&self) -> Option<usize> {
        self.arguments().map(|args| args.len())
    }

    pub fn argument(&self, index: usize) -> Cursor<'tu> {
        self.arguments()
            .and_then(|args| args.get(index).copied())
            .map_or_else(Self::null, |id| self.same_unit(id))
    }

    pub fn enum_constant_value(&self) -> Option<i64> {
        match self.node()?.1.kind {
            NodeKind::EnumConstant { value, .. } => Some(value),
            _ => None,
        }
    }

    /// Integer type an enum is stored as.
    pub fn enum_integer_type(&self) -> CType<'tu> {
        match self.node() {
            Some((tu, node)) if matches!(node.kind, NodeKind::Enum { .. }) => {
                let id = self.node_id().unwrap_or(NodeId::ROOT);
                CType::new(tu, types::enum_integer_type(&tu.ast, id))
            }
            _ => self.invalid_type(),
        }
    }

    pub fn typedef_underlying_type(&self) -> CType<'tu> {
        match self.node() {
            Some((tu, node)) if matches!(node.kind, NodeKind::Typedef { .. }) => CType::new(tu, node.ty.clone()),
            _ => self.invalid_type(),
        }
    }

    pub fn field_bit_width(&self) -> Option<u32> {
        match self.node()?.1.kind {
            NodeKind::Field { bit_width, .. } => bit_width,
            _ => None,
        }
    }

    /// Offset in bits of a field inside its record.
    pub fn offset_of_field(&self) -> Result<u64, LayoutError> {
        match self.node() {
            Some((tu, node)) if matches!(node.kind, NodeKind::Field { .. }) => {
                types::field_offset(&tu.ast, self.node_id().unwrap_or(NodeId::ROOT))
            }
            _ => Err(LayoutError::Invalid),
        }
    }

    pub fn linkage(&self) -> Linkage {
        let Some((tu, node)) = self.node() else {
            return Linkage::Invalid;
        };
        let ast = &tu.ast;
        let id = self.node_id().unwrap_or(NodeId::ROOT);
        let any_static = || {
            ast.redecls(id).iter().any(|d| {
                matches!(
                    ast.node(*d).kind,
                    NodeKind::Function {
                        storage: StorageClass::Static,
                        ..
                    } | NodeKind::Var {
                        storage: StorageClass::Static,
                        ..
                    }
                )
            })
        };
        match node.kind {
            NodeKind::Function { .. } if any_static() => Linkage::Internal,
            NodeKind::Function { .. } => Linkage::External,
            NodeKind::Var { storage, .. } => {
                let local = node
                    .semantic_parent
                    .is_some_and(|p| matches!(ast.node(p).kind, NodeKind::Function { .. }));
                match (local, storage) {
                    (true, StorageClass::Extern) => Linkage::External,
                    (true, _) => Linkage::NoLinkage,
                    (false, _) if any_static() => Linkage::Internal,
                    (false, _) => Linkage::External,
                }
            }
            ref kind if kind.is_declaration() => Linkage::NoLinkage,
            _ => Linkage::Invalid,
        }
    }

    /// Storage class written on a function, variable or parameter.
    pub fn storage_class(&self) -> Option<StorageClass> {
        match self.node()?.1.kind {
            NodeKind::Function { storage, .. } | NodeKind::Var { storage, .. } => Some(storage),
            NodeKind::Param { .. } => Some(StorageClass::None),
            _ => None,
        }
    }

    pub fn is_variadic(&self) -> bool {
        matches!(self.kind, CursorKind::FunctionDecl) && self.ty().is_variadic()
    }

    pub fn is_inline(&self) -> bool {
        matches!(self.node(), Some((_, node)) if matches!(node.kind, NodeKind::Function { inline: true, .. }))
    }

    /// Whether a function definition's body was skipped while parsing.
    pub fn has_skipped_body(&self) -> bool {
        matches!(
            self.node(),
            Some((_, node)) if matches!(node.kind, NodeKind::Function { body: Body::Skipped, .. })
        )
    }

    /// File named by an inclusion directive.
    pub fn included_file(&self) -> Option<File<'tu>> {
        let tu = self.tu?;
        match self.pp_entity()? {
            PpEntity::Inclusion(inc) => inc.file.map(|f| File::new(&tu.sm, f)),
            _ => None,
        }
    }

    /// Documentation comment attached to a declaration, markers included.
    pub fn raw_comment_text(&self) -> Option<String> {
        match self.node() {
            Some((tu, node)) if node.kind.is_declaration() => comment::raw_comment(&tu.sm, node.span),
            _ => None,
        }
    }

    /// First paragraph (or `\brief` paragraph) of the documentation comment.
    pub fn brief_comment_text(&self) -> Option<String> {
        self.raw_comment_text()
            .map(|raw| comment::brief(&raw))
            .filter(|brief| !brief.is_empty())
    }
}

fn is_decl_context(kind: &NodeKind) -> bool {
    matches!(
        kind,
        NodeKind::TranslationUnit | NodeKind::Function { .. } | NodeKind::Record { .. } | NodeKind::Enum { .. }
    )
}

/// Type a declaration introduces or carries.
pub(crate) fn declared_type(ast: &Ast, id: NodeId) -> Type {
    let canonical = ast.canonical(id);
    match ast.node(id).kind {
        NodeKind::Record { .. } => Type::new(Repr::Record(canonical)),
        NodeKind::Enum { .. } => Type::new(Repr::Enum(canonical)),
        NodeKind::Typedef { .. } => Type::new(Repr::Typedef(canonical)),
        _ => ast.node(id).ty.clone(),
    }
}

/// Declaration called by a call expression, looking through parentheses.
pub(crate) fn callee(ast: &Ast, call: &Node) -> Option<NodeId> {
    let mut expr = *call.children.first()?;
    loop {
        let node = ast.node(expr);
        match &node.kind {
            NodeKind::Paren => expr = *node.children.first()?,
            NodeKind::DeclRef { target, .. } => return *target,
            _ => return None,
        }
    }
}

impl PartialEq for Cursor<'_> {
    fn eq(&self, other: &Self) -> bool {
        let same_unit = match (self.tu, other.tu) {
            (Some(a), Some(b)) => ptr::eq(a, b),
            (None, None) => true,
            _ => false,
        };
        same_unit && self.kind == other.kind && self.payload == other.payload
    }
}

impl Eq for Cursor<'_> {}

impl Hash for Cursor<'_> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.kind.hash(state);
        self.payload.hash(state);
        if let Some(tu) = self.tu {
            ptr::hash(tu, state);
        }
    }
}

impl fmt::Debug for Cursor<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            return write!(f, "Cursor(null)");
        }
        write!(f, "Cursor({} '{}' {:?})", self.kind, self.spelling(), self.location())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::unit::tests::parse_unit;

    fn find<'tu>(tu: &'tu TranslationUnit, kind: CursorKind, name: &str) -> Cursor<'tu> {
        let mut found = Cursor::null();
        tu.cursor().visit_children(|c, _| {
            if c.kind() == kind && c.spelling() == name {
                found = c;
                return ChildVisitResult::Break;
            }
            ChildVisitResult::Recurse
        });
        found
    }

    #[test]
    fn test_null_cursor() {
        let null = Cursor::null();
        assert!(null.is_null());
        assert_eq!(null.kind(), CursorKind::InvalidFile);
        assert_eq!(null, Cursor::null());
        assert!(null.location().is_null());
        assert!(null.extent().is_null());
        assert_eq!(null.spelling(), "");
        assert!(!null.ty().is_valid());
    }

    #[test]
    fn test_declaration_accessors() {
        let tu = parse_unit("int add(int a, int b);\nint add(int a, int b) { return a + b; }\n");
        let first = tu.cursor().children()[0];
        let second = tu.cursor().children()[1];
        assert_eq!(first.kind(), CursorKind::FunctionDecl);
        assert_eq!(first.display_name(), "add(int, int)");
        assert!(!first.is_definition());
        assert!(second.is_definition());
        assert_eq!(first.definition(), second);
        assert_eq!(second.canonical(), first);
        assert_eq!(first.num_arguments(), Some(2));
        assert_eq!(first.argument(1).spelling(), "b");
        assert_eq!(first.result_type().spelling(), "int");
        assert_eq!(first.linkage(), Linkage::External);
        assert_eq!(first.semantic_parent(), tu.cursor());
        assert_eq!(first.usr(), "c:@F@add");
        let loc = first.location().expansion();
        assert_eq!((loc.line, loc.column), (1, 5));
        assert_eq!(first.extent().text(), Some("int add(int a, int b)"));
    }

    #[test]
    fn test_references_resolve() {
        let tu = parse_unit(
            "struct P { int x; };\nstruct P p;\nint get(void) { return p.x; }\n",
        );
        let type_ref = find(&tu, CursorKind::TypeRef, "struct P");
        assert_eq!(type_ref.referenced().kind(), CursorKind::StructDecl);
        assert!(type_ref.referenced().is_definition());
        let member = find(&tu, CursorKind::MemberRefExpr, "x");
        assert_eq!(member.referenced().kind(), CursorKind::FieldDecl);
        assert_eq!(member.ty().spelling(), "int");
        let var = find(&tu, CursorKind::VarDecl, "p");
        assert_eq!(var.ty().spelling(), "struct P");
        assert_eq!(var.ty().declaration().spelling(), "P");
    }

    #[test]
    fn test_linkage_and_storage() {
        let tu = parse_unit("static int hidden;\nint shown;\nvoid f(void) { int local; extern int ext; }\n");
        assert_eq!(find(&tu, CursorKind::VarDecl, "hidden").linkage(), Linkage::Internal);
        assert_eq!(find(&tu, CursorKind::VarDecl, "shown").linkage(), Linkage::External);
        assert_eq!(find(&tu, CursorKind::VarDecl, "local").linkage(), Linkage::NoLinkage);
        assert_eq!(find(&tu, CursorKind::VarDecl, "ext").linkage(), Linkage::External);
        assert_eq!(
            find(&tu, CursorKind::VarDecl, "hidden").storage_class(),
            Some(StorageClass::Static)
        );
        let local = find(&tu, CursorKind::VarDecl, "local");
        assert_eq!(local.semantic_parent().spelling(), "f");
        assert_eq!(local.lexical_parent().spelling(), "f");
    }

    #[test]
    fn test_enum_and_fields() {
        let tu = parse_unit("enum Color { RED, GREEN = 4, BLUE };\nstruct F { unsigned a : 3; int b; };\n");
        assert_eq!(find(&tu, CursorKind::EnumConstantDecl, "BLUE").enum_constant_value(), Some(5));
        let color = find(&tu, CursorKind::EnumDecl, "Color");
        assert_eq!(color.enum_integer_type().spelling(), "unsigned int");
        let a = find(&tu, CursorKind::FieldDecl, "a");
        assert_eq!(a.field_bit_width(), Some(3));
        assert_eq!(find(&tu, CursorKind::FieldDecl, "b").offset_of_field(), Ok(32));
        assert_eq!(a.semantic_parent().spelling(), "F");
    }

    #[test]
    fn test_call_expression() {
        let tu = parse_unit("int sq(int v);\nint use(void) { return sq(3); }\n");
        let call = find(&tu, CursorKind::CallExpr, "sq");
        assert_eq!(call.num_arguments(), Some(1));
        assert_eq!(call.argument(0).kind(), CursorKind::IntegerLiteral);
        assert_eq!(call.argument(0).spelling(), "3");
        assert_eq!(call.referenced().kind(), CursorKind::FunctionDecl);
    }
}
