//! AST definitions
//!
//! The tree lives in an arena ([`Ast`]) and nodes refer to each other through
//! [`NodeId`]s. Every node keeps its extent, the location a cursor on it reports,
//! its lexical parent, its ordered children and the index of its first token,
//! which gives a translation-order key shared with the preprocessing record.

use crate::source::{Loc, Span};
use rustc_hash::FxHashMap;

/// Index of a node in its [`Ast`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    /// The translation-unit node.
    pub const ROOT: NodeId = NodeId(0);

    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum StorageClass {
    #[default]
    None,
    Extern,
    Static,
    Auto,
    Register,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TagKind {
    Struct,
    Union,
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    // Arithmetic
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    // Comparison
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    // Logical
    And,
    Or,
    // Bitwise
    BitAnd,
    BitOr,
    BitXor,
    BitShl,
    BitShr,
    Assign,
    Comma,
}

impl BinOp {
    pub fn spelling(self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Mod => "%",
            BinOp::Eq => "==",
            BinOp::Ne => "!=",
            BinOp::Lt => "<",
            BinOp::Le => "<=",
            BinOp::Gt => ">",
            BinOp::Ge => ">=",
            BinOp::And => "&&",
            BinOp::Or => "||",
            BinOp::BitAnd => "&",
            BinOp::BitOr => "|",
            BinOp::BitXor => "^",
            BinOp::BitShl => "<<",
            BinOp::BitShr => ">>",
            BinOp::Assign => "=",
            BinOp::Comma => ",",
        }
    }
}

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnOp {
    Plus,    // +x
    Neg,     // -x
    Not,     // !x
    BitNot,  // ~x
    PreInc,  // ++x
    PreDec,  // --x
    PostInc, // x++
    PostDec, // x--
    Deref,   // *x
    AddrOf,  // &x
}

impl UnOp {
    pub fn spelling(self) -> &'static str {
        match self {
            UnOp::Plus => "+",
            UnOp::Neg => "-",
            UnOp::Not => "!",
            UnOp::BitNot => "~",
            UnOp::PreInc | UnOp::PostInc => "++",
            UnOp::PreDec | UnOp::PostDec => "--",
            UnOp::Deref => "*",
            UnOp::AddrOf => "&",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraitKind {
    SizeOf,
    AlignOf,
}

/// Whether a function declaration carries a body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Body {
    #[default]
    None,
    Parsed,
    /// Present in the source but not parsed.
    Skipped,
}

/// `__attribute__((...))` and `__asm__("label")` forms the front end understands.
#[derive(Debug, Clone, PartialEq)]
pub enum AttrKind {
    Packed,
    Aligned(Option<u64>),
    Const,
    Pure,
    WarnUnusedResult,
    Visibility(String),
    Annotate(String),
    AsmLabel(String),
    Other(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    TranslationUnit,

    // Declarations
    Record { tag: TagKind, name: String, complete: bool },
    Enum { name: String, complete: bool },
    Field { name: String, bit_width: Option<u32> },
    EnumConstant { name: String, value: i64 },
    Function { name: String, storage: StorageClass, inline: bool, body: Body },
    Var { name: String, storage: StorageClass, has_init: bool },
    Param { name: String },
    Typedef { name: String },

    // References
    TypeRef { target: NodeId },
    MemberRef { target: NodeId },
    LabelRef { target: NodeId },

    Attr(AttrKind),

    // Expressions
    DeclRef { name: String, target: Option<NodeId> },
    Member { name: String, arrow: bool, target: Option<NodeId> },
    Call,
    IntLiteral(u64),
    FloatLiteral(f64),
    CharLiteral(i64),
    StringLiteral(String),
    Paren,
    Unary(UnOp),
    Binary(BinOp),
    CompoundAssign(BinOp),
    Conditional,
    Subscript,
    Cast,
    CompoundLiteral,
    InitList,
    /// `sizeof` / `_Alignof` with the queried type.
    TypeTrait(TraitKind, Box<Type>),

    // Statements
    Compound,
    If,
    Switch,
    While,
    Do,
    For,
    Case,
    Default,
    Break,
    Continue,
    Return,
    Goto { label: String, target: Option<NodeId> },
    Label { name: String },
    DeclStmt,
    Null,
}

impl NodeKind {
    pub fn is_declaration(&self) -> bool {
        matches!(
            self,
            NodeKind::Record { .. }
                | NodeKind::Enum { .. }
                | NodeKind::Field { .. }
                | NodeKind::EnumConstant { .. }
                | NodeKind::Function { .. }
                | NodeKind::Var { .. }
                | NodeKind::Param { .. }
                | NodeKind::Typedef { .. }
        )
    }

    /// Declared name, empty for anonymous declarations.
    pub fn decl_name(&self) -> Option<&str> {
        match self {
            NodeKind::Record { name, .. }
            | NodeKind::Enum { name, .. }
            | NodeKind::Field { name, .. }
            | NodeKind::EnumConstant { name, .. }
            | NodeKind::Function { name, .. }
            | NodeKind::Var { name, .. }
            | NodeKind::Param { name }
            | NodeKind::Typedef { name } => Some(name),
            _ => None,
        }
    }

    /// Declaration a reference or expression node points at.
    pub fn referenced(&self) -> Option<NodeId> {
        match self {
            NodeKind::TypeRef { target }
            | NodeKind::MemberRef { target }
            | NodeKind::LabelRef { target } => Some(*target),
            NodeKind::DeclRef { target, .. }
            | NodeKind::Member { target, .. }
            | NodeKind::Goto { target, .. } => *target,
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Qualifiers {
    pub is_const: bool,
    pub is_volatile: bool,
    pub is_restrict: bool,
}

/// Type representation. Records, enums and typedefs point at the canonical
/// (first) declaration of the entity.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Repr {
    #[default]
    Invalid,
    Void,
    Bool,
    Char,
    SChar,
    UChar,
    Short,
    UShort,
    Int,
    UInt,
    Long,
    ULong,
    LongLong,
    ULongLong,
    Float,
    Double,
    LongDouble,
    Pointer(Box<Type>),
    Array(Box<Type>, Option<u64>),
    Function(Box<FunctionType>),
    Record(NodeId),
    Enum(NodeId),
    Typedef(NodeId),
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionType {
    pub result: Type,
    pub params: Vec<Type>,
    pub variadic: bool,
    /// `false` for `int f()` style declarations.
    pub prototyped: bool,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Type {
    pub repr: Repr,
    pub quals: Qualifiers,
}

impl Type {
    pub fn new(repr: Repr) -> Self {
        Type {
            repr,
            quals: Qualifiers::default(),
        }
    }

    pub fn int() -> Self {
        Type::new(Repr::Int)
    }

    pub fn with_pointer(self) -> Self {
        Type::new(Repr::Pointer(Box::new(self)))
    }

    pub fn with_array(self, size: Option<u64>) -> Self {
        Type::new(Repr::Array(Box::new(self), size))
    }

    pub fn is_valid(&self) -> bool {
        self.repr != Repr::Invalid
    }

    pub fn unqualified(&self) -> Type {
        Type::new(self.repr.clone())
    }
}

#[derive(Debug, Clone)]
pub struct Node {
    pub kind: NodeKind,
    /// Character range from the first token to the end of the last one.
    pub span: Span,
    /// Location a cursor reports: the name for declarations.
    pub loc: Loc,
    pub parent: Option<NodeId>,
    pub semantic_parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    /// Index of the node's first token in the preprocessed stream.
    pub seq: u32,
    pub ty: Type,
    pub from_pch: bool,
    pub implicit: bool,
}

/// The parsed translation unit.
#[derive(Debug, Clone)]
pub struct Ast {
    nodes: Vec<Node>,
    /// First declaration of each redeclared entity.
    canonical: FxHashMap<NodeId, NodeId>,
    /// Definition per canonical declaration.
    definitions: FxHashMap<NodeId, NodeId>,
    /// Redeclarations per canonical declaration, in order.
    redecls: FxHashMap<NodeId, Vec<NodeId>>,
}

impl Default for Ast {
    fn default() -> Self {
        Self::new()
    }
}

impl Ast {
    pub fn new() -> Self {
        let root = Node {
            kind: NodeKind::TranslationUnit,
            span: Span::default(),
            loc: Loc::INVALID,
            parent: None,
            semantic_parent: None,
            children: Vec::new(),
            seq: 0,
            ty: Type::default(),
            from_pch: false,
            implicit: false,
        };
        Ast {
            nodes: vec![root],
            canonical: FxHashMap::default(),
            definitions: FxHashMap::default(),
            redecls: FxHashMap::default(),
        }
    }

    /// Add a node and link it under `parent`.
    pub fn add(&mut self, kind: NodeKind, span: Span, loc: Loc, parent: NodeId, seq: u32) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node {
            kind,
            span,
            loc,
            parent: Some(parent),
            semantic_parent: Some(parent),
            children: Vec::new(),
            seq,
            ty: Type::default(),
            from_pch: false,
            implicit: false,
        });
        self.nodes[parent.index()].children.push(id);
        id
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index())
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.index()]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.index()].children
    }

    pub fn ids(&self) -> impl Iterator<Item = NodeId> {
        (0..self.nodes.len() as u32).map(NodeId)
    }

    /// Move `child` to the end of `parent`'s children.
    pub fn reparent(&mut self, child: NodeId, parent: NodeId) {
        if let Some(old) = self.nodes[child.index()].parent {
            self.nodes[old.index()].children.retain(|c| *c != child);
        }
        self.nodes[child.index()].parent = Some(parent);
        self.nodes[parent.index()].children.push(child);
    }

    /// Move attribute children in front of the others, keeping their order.
    pub fn hoist_attributes(&mut self, id: NodeId) {
        let children = std::mem::take(&mut self.nodes[id.index()].children);
        let (mut attrs, rest): (Vec<NodeId>, Vec<NodeId>) = children
            .into_iter()
            .partition(|c| matches!(self.nodes[c.index()].kind, NodeKind::Attr(_)));
        attrs.extend(rest);
        self.nodes[id.index()].children = attrs;
    }

    /// Walk lexical parents, ending with the root.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.node(id).parent, move |p| self.node(*p).parent)
    }

    pub fn canonical(&self, id: NodeId) -> NodeId {
        self.canonical.get(&id).copied().unwrap_or(id)
    }

    pub fn definition(&self, id: NodeId) -> Option<NodeId> {
        self.definitions.get(&self.canonical(id)).copied()
    }

    /// Every declaration of the entity `id` belongs to, in source order.
    pub fn redecls(&self, id: NodeId) -> Vec<NodeId> {
        let canonical = self.canonical(id);
        self.redecls
            .get(&canonical)
            .cloned()
            .unwrap_or_else(|| vec![canonical])
    }

    /// Chain `decl` after the previous declaration `prev`.
    pub fn add_redecl(&mut self, prev: NodeId, decl: NodeId) {
        let canonical = self.canonical(prev);
        self.canonical.insert(decl, canonical);
        self.redecls
            .entry(canonical)
            .or_insert_with(|| vec![canonical])
            .push(decl);
    }

    pub fn set_definition(&mut self, decl: NodeId) {
        let canonical = self.canonical(decl);
        self.definitions.insert(canonical, decl);
    }

    pub fn is_definition(&self, id: NodeId) -> bool {
        self.definition(id) == Some(id)
    }

    pub fn name(&self, id: NodeId) -> &str {
        self.node(id).kind.decl_name().unwrap_or("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redecl_chain() {
        let mut ast = Ast::new();
        let span = Span::default();
        let kind = |name: &str| NodeKind::Var {
            name: name.to_string(),
            storage: StorageClass::Extern,
            has_init: false,
        };
        let a = ast.add(kind("x"), span, Loc::INVALID, NodeId::ROOT, 0);
        let b = ast.add(kind("x"), span, Loc::INVALID, NodeId::ROOT, 3);
        let c = ast.add(kind("x"), span, Loc::INVALID, NodeId::ROOT, 6);
        ast.add_redecl(a, b);
        ast.add_redecl(b, c);
        ast.set_definition(b);

        assert_eq!(ast.canonical(c), a);
        assert_eq!(ast.redecls(c), vec![a, b, c]);
        assert_eq!(ast.definition(a), Some(b));
        assert!(ast.is_definition(b));
        assert!(!ast.is_definition(c));
        assert_eq!(ast.children(NodeId::ROOT), &[a, b, c]);
    }

    #[test]
    fn test_reparent() {
        let mut ast = Ast::new();
        let span = Span::default();
        let s = ast.add(NodeKind::Compound, span, Loc::INVALID, NodeId::ROOT, 0);
        let n = ast.add(NodeKind::Null, span, Loc::INVALID, NodeId::ROOT, 1);
        ast.reparent(n, s);
        assert_eq!(ast.children(NodeId::ROOT), &[s]);
        assert_eq!(ast.children(s), &[n]);
        assert_eq!(ast.ancestors(n).collect::<Vec<_>>(), vec![s, NodeId::ROOT]);
    }
}
