//! Cursor kinds
//!
//! Discriminants match libclang's `CXCursorKind` so kinds can be compared
//! against numbers printed by other tools.

use crate::parser::ast::{AttrKind, NodeKind, TagKind};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CursorKind {
    // Declarations
    StructDecl = 2,
    UnionDecl = 3,
    EnumDecl = 5,
    FieldDecl = 6,
    EnumConstantDecl = 7,
    FunctionDecl = 8,
    VarDecl = 9,
    ParmDecl = 10,
    TypedefDecl = 20,

    // References
    TypeRef = 43,
    MemberRef = 47,
    LabelRef = 48,

    // Error conditions
    InvalidFile = 70,
    NoDeclFound = 71,
    NotImplemented = 72,
    InvalidCode = 73,

    // Expressions
    UnexposedExpr = 100,
    DeclRefExpr = 101,
    MemberRefExpr = 102,
    CallExpr = 103,
    IntegerLiteral = 106,
    FloatingLiteral = 107,
    StringLiteral = 109,
    CharacterLiteral = 110,
    ParenExpr = 111,
    UnaryOperator = 112,
    ArraySubscriptExpr = 113,
    BinaryOperator = 114,
    CompoundAssignOperator = 115,
    ConditionalOperator = 116,
    CStyleCastExpr = 117,
    CompoundLiteralExpr = 118,
    InitListExpr = 119,
    UnaryExpr = 136,

    // Statements
    UnexposedStmt = 200,
    LabelStmt = 201,
    CompoundStmt = 202,
    CaseStmt = 203,
    DefaultStmt = 204,
    IfStmt = 205,
    SwitchStmt = 206,
    WhileStmt = 207,
    DoStmt = 208,
    ForStmt = 209,
    GotoStmt = 210,
    ContinueStmt = 212,
    BreakStmt = 213,
    ReturnStmt = 214,
    NullStmt = 230,
    DeclStmt = 231,

    TranslationUnit = 300,

    // Attributes
    UnexposedAttr = 400,
    AnnotateAttr = 406,
    AsmLabelAttr = 407,
    PackedAttr = 408,
    PureAttr = 409,
    ConstAttr = 410,
    VisibilityAttr = 417,
    WarnUnusedResultAttr = 440,
    AlignedAttr = 441,

    // Preprocessing
    PreprocessingDirective = 500,
    MacroDefinition = 501,
    MacroExpansion = 502,
    InclusionDirective = 503,
}

impl CursorKind {
    pub(crate) fn of_node(kind: &NodeKind) -> CursorKind {
        use CursorKind as K;
        match kind {
            NodeKind::TranslationUnit => K::TranslationUnit,
            NodeKind::Record {
                tag: TagKind::Struct,
                ..
            } => K::StructDecl,
            NodeKind::Record {
                tag: TagKind::Union,
                ..
            } => K::UnionDecl,
            NodeKind::Enum { .. } => K::EnumDecl,
            NodeKind::Field { .. } => K::FieldDecl,
            NodeKind::EnumConstant { .. } => K::EnumConstantDecl,
            NodeKind::Function { .. } => K::FunctionDecl,
            NodeKind::Var { .. } => K::VarDecl,
            NodeKind::Param { .. } => K::ParmDecl,
            NodeKind::Typedef { .. } => K::TypedefDecl,
            NodeKind::TypeRef { .. } => K::TypeRef,
            NodeKind::MemberRef { .. } => K::MemberRef,
            NodeKind::LabelRef { .. } => K::LabelRef,
            NodeKind::Attr(attr) => match attr {
                AttrKind::Packed => K::PackedAttr,
                AttrKind::Aligned(_) => K::AlignedAttr,
                AttrKind::Const => K::ConstAttr,
                AttrKind::Pure => K::PureAttr,
                AttrKind::WarnUnusedResult => K::WarnUnusedResultAttr,
                AttrKind::Visibility(_) => K::VisibilityAttr,
                AttrKind::Annotate(_) => K::AnnotateAttr,
                AttrKind::AsmLabel(_) => K::AsmLabelAttr,
                AttrKind::Other(_) => K::UnexposedAttr,
            },
            NodeKind::DeclRef { .. } => K::DeclRefExpr,
            NodeKind::Member { .. } => K::MemberRefExpr,
            NodeKind::Call => K::CallExpr,
            NodeKind::IntLiteral(_) => K::IntegerLiteral,
            NodeKind::FloatLiteral(_) => K::FloatingLiteral,
            NodeKind::CharLiteral(_) => K::CharacterLiteral,
            NodeKind::StringLiteral(_) => K::StringLiteral,
            NodeKind::Paren => K::ParenExpr,
            NodeKind::Unary(_) => K::UnaryOperator,
            NodeKind::Binary(_) => K::BinaryOperator,
            NodeKind::CompoundAssign(_) => K::CompoundAssignOperator,
            NodeKind::Conditional => K::ConditionalOperator,
            NodeKind::Subscript => K::ArraySubscriptExpr,
            NodeKind::Cast => K::CStyleCastExpr,
            NodeKind::CompoundLiteral => K::CompoundLiteralExpr,
            NodeKind::InitList => K::InitListExpr,
            NodeKind::TypeTrait(..) => K::UnaryExpr,
            NodeKind::Compound => K::CompoundStmt,
            NodeKind::If => K::IfStmt,
            NodeKind::Switch => K::SwitchStmt,
            NodeKind::While => K::WhileStmt,
            NodeKind::Do => K::DoStmt,
            NodeKind::For => K::ForStmt,
            NodeKind::Case => K::CaseStmt,
            NodeKind::Default => K::DefaultStmt,
            NodeKind::Break => K::BreakStmt,
            NodeKind::Continue => K::ContinueStmt,
            NodeKind::Return => K::ReturnStmt,
            NodeKind::Goto { .. } => K::GotoStmt,
            NodeKind::Label { .. } => K::LabelStmt,
            NodeKind::DeclStmt => K::DeclStmt,
            NodeKind::Null => K::NullStmt,
        }
    }

    pub fn is_declaration(self) -> bool {
        (CursorKind::StructDecl as u32..=CursorKind::TypedefDecl as u32).contains(&(self as u32))
    }

    pub fn is_reference(self) -> bool {
        matches!(
            self,
            CursorKind::TypeRef | CursorKind::MemberRef | CursorKind::LabelRef
        )
    }

    pub fn is_expression(self) -> bool {
        (100..200).contains(&(self as u32))
    }

    pub fn is_statement(self) -> bool {
        (200..300).contains(&(self as u32))
    }

    pub fn is_attribute(self) -> bool {
        (400..500).contains(&(self as u32))
    }

    pub fn is_invalid(self) -> bool {
        (70..100).contains(&(self as u32))
    }

    pub fn is_translation_unit(self) -> bool {
        self == CursorKind::TranslationUnit
    }

    pub fn is_preprocessing(self) -> bool {
        (500..600).contains(&(self as u32))
    }

    pub fn is_unexposed(self) -> bool {
        matches!(
            self,
            CursorKind::UnexposedExpr | CursorKind::UnexposedStmt | CursorKind::UnexposedAttr
        )
    }

    pub fn spelling(self) -> &'static str {
        use CursorKind as K;
        match self {
            K::StructDecl => "StructDecl",
            K::UnionDecl => "UnionDecl",
            K::EnumDecl => "EnumDecl",
            K::FieldDecl => "FieldDecl",
            K::EnumConstantDecl => "EnumConstantDecl",
            K::FunctionDecl => "FunctionDecl",
            K::VarDecl => "VarDecl",
            K::ParmDecl => "ParmDecl",
            K::TypedefDecl => "TypedefDecl",
            K::TypeRef => "TypeRef",
            K::MemberRef => "MemberRef",
            K::LabelRef => "LabelRef",
            K::InvalidFile => "InvalidFile",
            K::NoDeclFound => "NoDeclFound",
            K::NotImplemented => "NotImplemented",
            K::InvalidCode => "InvalidCode",
            K::UnexposedExpr => "UnexposedExpr",
            K::DeclRefExpr => "DeclRefExpr",
            K::MemberRefExpr => "MemberRefExpr",
            K::CallExpr => "CallExpr",
            K::IntegerLiteral => "IntegerLiteral",
            K::FloatingLiteral => "FloatingLiteral",
            K::StringLiteral => "StringLiteral",
            K::CharacterLiteral => "CharacterLiteral",
            K::ParenExpr => "ParenExpr",
            K::UnaryOperator => "UnaryOperator",
            K::ArraySubscriptExpr => "ArraySubscriptExpr",
            K::BinaryOperator => "BinaryOperator",
            K::CompoundAssignOperator => "CompoundAssignOperator",
            K::ConditionalOperator => "ConditionalOperator",
            K::CStyleCastExpr => "CStyleCastExpr",
            K::CompoundLiteralExpr => "CompoundLiteralExpr",
            K::InitListExpr => "InitListExpr",
            K::UnaryExpr => "UnaryExpr",
            K::UnexposedStmt => "UnexposedStmt",
            K::LabelStmt => "LabelStmt",
            K::CompoundStmt => "CompoundStmt",
            K::CaseStmt => "CaseStmt",
            K::DefaultStmt => "DefaultStmt",
            K::IfStmt => "IfStmt",
            K::SwitchStmt => "SwitchStmt",
            K::WhileStmt => "WhileStmt",
            K::DoStmt => "DoStmt",
            K::ForStmt => "ForStmt",
            K::GotoStmt => "GotoStmt",
            K::ContinueStmt => "ContinueStmt",
            K::BreakStmt => "BreakStmt",
            K::ReturnStmt => "ReturnStmt",
            K::NullStmt => "NullStmt",
            K::DeclStmt => "DeclStmt",
            K::TranslationUnit => "TranslationUnit",
            K::UnexposedAttr => "UnexposedAttr",
            K::AnnotateAttr => "attribute(annotate)",
            K::AsmLabelAttr => "asm label",
            K::PackedAttr => "attribute(packed)",
            K::PureAttr => "attribute(pure)",
            K::ConstAttr => "attribute(const)",
            K::VisibilityAttr => "attribute(visibility)",
            K::WarnUnusedResultAttr => "attribute(warn_unused_result)",
            K::AlignedAttr => "attribute(aligned)",
            K::PreprocessingDirective => "preprocessing directive",
            K::MacroDefinition => "macro definition",
            K::MacroExpansion => "macro expansion",
            K::InclusionDirective => "inclusion directive",
        }
    }
}

impl fmt::Display for CursorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.spelling())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_categories() {
        assert!(CursorKind::TypedefDecl.is_declaration());
        assert!(!CursorKind::TypeRef.is_declaration());
        assert!(CursorKind::LabelRef.is_reference());
        assert!(CursorKind::UnaryExpr.is_expression());
        assert!(CursorKind::DeclStmt.is_statement());
        assert!(CursorKind::AlignedAttr.is_attribute());
        assert!(CursorKind::NoDeclFound.is_invalid());
        assert!(CursorKind::InclusionDirective.is_preprocessing());
        assert_eq!(CursorKind::FunctionDecl as u32, 8);
        assert_eq!(CursorKind::TranslationUnit.to_string(), "TranslationUnit");
    }
}
