//! Declaration parsing implementation
//!
//! This module handles parsing of C declarations:
//!
//! - Declaration specifiers: storage classes, qualifiers, builtin types,
//!   typedef names, `struct`/`union`/`enum` specifiers
//! - Declarators: pointers, names, array and function suffixes, bit-fields
//! - Initializers, including designated initializers
//! - Function definitions
//! - GNU `__attribute__((...))` lists and `__asm__` labels
//!
//! # Grammar
//!
//! ```text
//! external_decl ::= declaration | function_def
//! declaration   ::= specifiers (init_declarator ("," init_declarator)*)? ";"
//! function_def  ::= specifiers declarator compound_stmt
//! specifiers    ::= (storage | qualifier | type | attribute)+
//! declarator    ::= ("*" qualifier*)* identifier suffix* attribute*
//! suffix        ::= "(" params ")" | "[" constant_expr? "]"
//! record        ::= ("struct" | "union") attribute* identifier? ("{" field_decl* "}")?
//! enum          ::= "enum" identifier? ("{" enumerator ("," enumerator)* ","? "}")?
//! ```
//!
//! Declaration nodes are created as soon as their name is parsed so that the
//! nodes of their type references, parameters and initializers can be attached
//! as children in source order.
//!
//! All parsing methods are implemented as `pub(crate)` methods on the [`Parser`] struct.

use crate::cursor::types::{array_size_overflows, type_spelling};
use crate::diagnostics::Category;
use crate::parser::ast::*;
use crate::parser::lexer::TokenKind;
use crate::parser::parse::{ParseError, Parser};
use crate::parser::sema::{canonical_type, eval_const, find_field, CompletionKind, ScopeKind, TagFilter};
use crate::source::{Loc, Span};
use rustc_hash::FxHashMap;

/// Where a declarator appears.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DeclContext {
    File,
    Block,
    Field,
    Param,
    TypeName,
}

/// An attribute parsed before the declaration carrying it exists.
#[derive(Debug, Clone)]
pub(crate) struct ParsedAttr {
    kind: AttrKind,
    start: usize,
    end: usize,
    loc: Loc,
}

/// Parsed declaration specifiers.
#[derive(Debug, Clone, Default)]
pub(crate) struct DeclSpec {
    pub base: Type,
    pub storage: StorageClass,
    pub is_typedef: bool,
    pub inline: bool,
    /// Declaration named by the specifiers, with the index of the naming token.
    pub type_ref: Option<(NodeId, usize)>,
    attrs: Vec<ParsedAttr>,
    /// A tag was declared or defined by the specifiers.
    pub declares_tag: bool,
}

#[derive(Debug, Default)]
struct TypeCounts {
    void: u32,
    bool_: u32,
    char_: u32,
    short: u32,
    int: u32,
    long: u32,
    float: u32,
    double: u32,
    signed: u32,
    unsigned: u32,
}

impl TypeCounts {
    fn is_empty(&self) -> bool {
        self.void
            + self.bool_
            + self.char_
            + self.short
            + self.int
            + self.long
            + self.float
            + self.double
            + self.signed
            + self.unsigned
            == 0
    }

    fn resolve(&self) -> Option<Repr> {
        let unsigned = self.unsigned > 0;
        let repr = if self.void > 0 {
            Repr::Void
        } else if self.bool_ > 0 {
            Repr::Bool
        } else if self.float > 0 {
            Repr::Float
        } else if self.double > 0 {
            if self.long > 0 {
                Repr::LongDouble
            } else {
                Repr::Double
            }
        } else if self.char_ > 0 {
            if unsigned {
                Repr::UChar
            } else if self.signed > 0 {
                Repr::SChar
            } else {
                Repr::Char
            }
        } else if self.short > 0 {
            if unsigned {
                Repr::UShort
            } else {
                Repr::Short
            }
        } else if self.long >= 2 {
            if unsigned {
                Repr::ULongLong
            } else {
                Repr::LongLong
            }
        } else if self.long == 1 {
            if unsigned {
                Repr::ULong
            } else {
                Repr::Long
            }
        } else if unsigned {
            Repr::UInt
        } else if self.int > 0 || self.signed > 0 {
            Repr::Int
        } else {
            return None;
        };
        Some(repr)
    }
}

fn is_asm_keyword(kind: &TokenKind) -> bool {
    matches!(kind, TokenKind::Ident(name) if name == "asm" || name == "__asm" || name == "__asm__")
}

/// Attribute names may be keywords (`const`) as well as identifiers.
fn attribute_name(kind: &TokenKind) -> Option<String> {
    match kind {
        TokenKind::Ident(name) => Some(name.clone()),
        kind if kind.is_keyword() => Some(kind.to_string()),
        _ => None,
    }
}

impl Parser<'_> {
    /// Parse one declaration or function definition at file scope.
    pub(crate) fn parse_external_declaration(&mut self) -> Result<(), ParseError> {
        if self.match_token(&TokenKind::Semicolon) {
            return Ok(());
        }
        if self.at_completion_point() {
            self.capture_completion(CompletionKind::Ordinary);
            return Err(ParseError::new("code completion", self.current_loc()));
        }
        let implicit_int = matches!(self.peek().kind, TokenKind::Ident(_))
            && self.peek_ahead(1).is_some_and(|t| t.is(&TokenKind::LParen));
        if !self.starts_declaration() && !implicit_int {
            return Err(self.error_here("expected external declaration"));
        }
        self.parse_declaration(NodeId::ROOT, DeclContext::File)
    }

    /// Whether the current token begins a declaration.
    pub(crate) fn starts_declaration(&self) -> bool {
        match &self.peek().kind {
            TokenKind::Typedef
            | TokenKind::Extern
            | TokenKind::Static
            | TokenKind::Auto
            | TokenKind::Register
            | TokenKind::Inline => true,
            TokenKind::Ident(name)
                if self.lookup_ordinary(name).is_none()
                    && self
                        .peek_ahead(1)
                        .is_some_and(|t| matches!(t.kind, TokenKind::Ident(_))) =>
            {
                true
            }
            _ => self.starts_type_name_at(0),
        }
    }

    /// Whether the token `offset` ahead begins a type name.
    pub(crate) fn starts_type_name_at(&self, offset: usize) -> bool {
        let Some(token) = self.peek_ahead(offset) else {
            return false;
        };
        match &token.kind {
            TokenKind::Void
            | TokenKind::Bool
            | TokenKind::Char
            | TokenKind::Short
            | TokenKind::Int
            | TokenKind::Long
            | TokenKind::Float
            | TokenKind::Double
            | TokenKind::Signed
            | TokenKind::Unsigned
            | TokenKind::Struct
            | TokenKind::Union
            | TokenKind::Enum
            | TokenKind::Const
            | TokenKind::Volatile
            | TokenKind::Restrict
            | TokenKind::Attribute => true,
            TokenKind::Ident(name) => name == "__extension__" || self.lookup_typedef(name).is_some(),
            _ => false,
        }
    }

    /// Parse `specifiers init_declarator_list ;` or a function definition,
    /// attaching the declarations to `parent`.
    pub(crate) fn parse_declaration(&mut self, parent: NodeId, ctx: DeclContext) -> Result<(), ParseError> {
        let start = self.position;
        let spec = self.parse_decl_specifiers(parent, ctx)?;

        if self.match_token(&TokenKind::Semicolon) {
            if !spec.declares_tag {
                self.diags.warning(
                    Category::Semantic,
                    self.tokens[start].loc,
                    "declaration does not declare anything",
                    "missing-declarations",
                );
            }
            return Ok(());
        }

        let mut first = true;
        loop {
            let id = self.parse_declarator(&spec, start, parent, ctx)?;
            let is_function = matches!(self.ast.node(id).kind, NodeKind::Function { .. });
            if first && is_function && self.check(&TokenKind::LBrace) {
                if ctx != DeclContext::File {
                    return Err(ParseError::new(
                        "function definition is not allowed here",
                        self.current_loc(),
                    ));
                }
                return self.parse_function_definition(id);
            }
            self.finish_declarator(id)?;
            first = false;
            if !self.match_token(&TokenKind::Comma) {
                break;
            }
        }

        if ctx == DeclContext::File {
            self.expect_semicolon("after top level declarator")
        } else {
            self.expect_semicolon("at end of declaration")
        }
    }

    /// Parse declaration specifiers. Tags declared by them become children of
    /// `container`.
    pub(crate) fn parse_decl_specifiers(&mut self, container: NodeId, ctx: DeclContext) -> Result<DeclSpec, ParseError> {
        let start = self.position;
        let mut spec = DeclSpec::default();
        let mut counts = TypeCounts::default();
        let mut quals = Qualifiers::default();
        let mut named: Option<Type> = None;

        loop {
            if named.is_none() && counts.is_empty() && self.at_completion_point() {
                self.capture_completion(CompletionKind::Ordinary);
                return Err(ParseError::new("code completion", self.current_loc()));
            }
            let token = self.peek().clone();
            match &token.kind {
                TokenKind::Typedef => spec.is_typedef = true,
                TokenKind::Extern => spec.storage = StorageClass::Extern,
                TokenKind::Static => spec.storage = StorageClass::Static,
                TokenKind::Auto => spec.storage = StorageClass::Auto,
                TokenKind::Register => spec.storage = StorageClass::Register,
                TokenKind::Inline => spec.inline = true,
                TokenKind::Const => quals.is_const = true,
                TokenKind::Volatile => quals.is_volatile = true,
                TokenKind::Restrict => quals.is_restrict = true,
                TokenKind::Void => counts.void += 1,
                TokenKind::Bool => counts.bool_ += 1,
                TokenKind::Char => counts.char_ += 1,
                TokenKind::Short => counts.short += 1,
                TokenKind::Int => counts.int += 1,
                TokenKind::Long => counts.long += 1,
                TokenKind::Float => counts.float += 1,
                TokenKind::Double => counts.double += 1,
                TokenKind::Signed => counts.signed += 1,
                TokenKind::Unsigned => counts.unsigned += 1,
                TokenKind::Struct | TokenKind::Union if named.is_none() && counts.is_empty() => {
                    let tag = if token.is(&TokenKind::Struct) {
                        TagKind::Struct
                    } else {
                        TagKind::Union
                    };
                    named = Some(self.parse_record_specifier(tag, container, &mut spec)?);
                    continue;
                }
                TokenKind::Enum if named.is_none() && counts.is_empty() => {
                    named = Some(self.parse_enum_specifier(container, &mut spec)?);
                    continue;
                }
                TokenKind::Attribute => {
                    let attrs = self.parse_attributes()?;
                    spec.attrs.extend(attrs);
                    continue;
                }
                TokenKind::Ident(name) if name == "__extension__" => {}
                TokenKind::Ident(name) if named.is_none() && counts.is_empty() => {
                    if let Some(typedef) = self.lookup_typedef(name) {
                        spec.type_ref = Some((typedef, self.position));
                        named = Some(Type::new(Repr::Typedef(self.ast.canonical(typedef))));
                    } else if self.is_unknown_type_name(ctx) {
                        self.diags
                            .error(Category::Semantic, token.loc, format!("unknown type name '{}'", name));
                        named = Some(Type::int());
                    } else {
                        break;
                    }
                }
                _ => break,
            }
            self.advance();
        }

        if ctx == DeclContext::TypeName && spec.storage != StorageClass::None {
            self.diags.error(
                Category::Semantic,
                self.tokens[start].loc,
                "type name does not allow storage class to be specified",
            );
        }

        let mut base = match (named, counts.resolve()) {
            (Some(ty), None) => ty,
            (Some(ty), Some(_)) => {
                self.diags.error(
                    Category::Semantic,
                    self.tokens[start].loc,
                    "cannot combine with previous declaration specifier",
                );
                ty
            }
            (None, Some(repr)) => Type::new(repr),
            (None, None) => {
                if ctx == DeclContext::TypeName || ctx == DeclContext::Param && self.position == start {
                    return Err(self.error_here("expected a type"));
                }
                self.diags.warning(
                    Category::Semantic,
                    self.tokens[start.min(self.tokens.len() - 1)].loc,
                    "type specifier missing, defaults to 'int'",
                    "implicit-int",
                );
                Type::int()
            }
        };
        base.quals.is_const |= quals.is_const;
        base.quals.is_volatile |= quals.is_volatile;
        base.quals.is_restrict |= quals.is_restrict;
        spec.base = base;
        Ok(spec)
    }

    /// An identifier that is not a type but is used like one.
    fn is_unknown_type_name(&self, ctx: DeclContext) -> bool {
        let next = self.peek_ahead(1).map(|t| &t.kind);
        match ctx {
            DeclContext::Param => true,
            DeclContext::TypeName => false,
            DeclContext::File => matches!(next, Some(TokenKind::Ident(_)) | Some(TokenKind::Star)),
            DeclContext::Block | DeclContext::Field => matches!(next, Some(TokenKind::Ident(_))),
        }
    }

    /// Parse a declarator and create its declaration node under `parent`.
    pub(crate) fn parse_declarator(
        &mut self,
        spec: &DeclSpec,
        start: usize,
        parent: NodeId,
        ctx: DeclContext,
    ) -> Result<NodeId, ParseError> {
        let ty = self.parse_pointers(spec.base.clone())?;
        if self.check(&TokenKind::LParen) {
            return Err(ParseError::new(
                "parenthesized declarators are not supported",
                self.current_loc(),
            ));
        }
        if self.at_completion_point() {
            self.capture_completion(CompletionKind::Ordinary);
            return Err(ParseError::new("code completion", self.current_loc()));
        }

        let (name, loc) = match &self.peek().kind {
            TokenKind::Ident(name) => {
                let name = name.clone();
                let loc = self.advance().loc;
                (name, loc)
            }
            _ if ctx == DeclContext::Param || (ctx == DeclContext::Field && self.check(&TokenKind::Colon)) => {
                (String::new(), self.current_loc())
            }
            _ => return Err(self.error_here("expected identifier or '('")),
        };

        let kind = match ctx {
            DeclContext::Field => NodeKind::Field { name, bit_width: None },
            DeclContext::Param => NodeKind::Param { name },
            _ if spec.is_typedef => NodeKind::Typedef { name },
            _ if self.check(&TokenKind::LParen) => NodeKind::Function {
                name,
                storage: spec.storage,
                inline: spec.inline,
                body: Body::None,
            },
            _ => NodeKind::Var {
                name,
                storage: spec.storage,
                has_init: false,
            },
        };
        let id = self.add_decl_node(kind, start, loc, parent);
        if let Some((target, index)) = spec.type_ref {
            self.add_type_ref(target, index, id);
        }

        let ty = self.parse_declarator_suffixes(ty, id)?;
        self.ast.node_mut(id).ty = ty;

        if ctx == DeclContext::Field && self.match_token(&TokenKind::Colon) {
            let expr = self.parse_conditional(id)?;
            match eval_const(&self.ast, expr) {
                Some(width) if width >= 0 => {
                    if let NodeKind::Field { bit_width, .. } = &mut self.ast.node_mut(id).kind {
                        *bit_width = Some(width as u32);
                    }
                }
                Some(_) => {
                    let name = self.ast.name(id).to_string();
                    self.diags.error(
                        Category::Semantic,
                        self.ast.node(expr).loc,
                        format!("bit-field '{}' has negative width", name),
                    );
                }
                None => {
                    self.diags.error(
                        Category::Semantic,
                        self.ast.node(expr).loc,
                        "expression is not an integer constant expression",
                    );
                }
            }
        }

        let trailing = self.parse_attributes()?;
        self.attach_attrs(id, &spec.attrs);
        self.attach_attrs(id, &trailing);
        self.close_node(id);

        if ctx == DeclContext::Param {
            self.adjust_parameter_type(id);
            self.declare_ordinary(id);
        }
        Ok(id)
    }

    /// Parameters of array and function type become pointers.
    fn adjust_parameter_type(&mut self, id: NodeId) {
        let node = self.ast.node_mut(id);
        let adjusted = match &node.ty.repr {
            Repr::Array(elem, _) => Some((**elem).clone().with_pointer()),
            Repr::Function(_) => Some(node.ty.clone().with_pointer()),
            _ => None,
        };
        if let Some(ty) = adjusted {
            node.ty = ty;
        }
    }

    fn parse_pointers(&mut self, mut ty: Type) -> Result<Type, ParseError> {
        while self.match_token(&TokenKind::Star) {
            ty = ty.with_pointer();
            loop {
                match self.peek().kind {
                    TokenKind::Const => ty.quals.is_const = true,
                    TokenKind::Volatile => ty.quals.is_volatile = true,
                    TokenKind::Restrict => ty.quals.is_restrict = true,
                    TokenKind::Attribute => {
                        self.parse_attributes()?;
                        continue;
                    }
                    _ => break,
                }
                self.advance();
            }
        }
        Ok(ty)
    }

    /// Array and function suffixes. Size expressions and parameters become
    /// children of `decl`.
    fn parse_declarator_suffixes(&mut self, base: Type, decl: NodeId) -> Result<Type, ParseError> {
        if self.match_token(&TokenKind::LParen) {
            self.push_scope(ScopeKind::Prototype);
            let params = self.nested(|p| p.parse_parameters(decl));
            self.pop_scope();
            let (params, variadic, prototyped) = params?;
            return Ok(Type::new(Repr::Function(Box::new(FunctionType {
                result: base,
                params,
                variadic,
                prototyped,
            }))));
        }

        let mut dims = Vec::new();
        while self.match_token(&TokenKind::LBracket) {
            if self.match_token(&TokenKind::RBracket) {
                dims.push(None);
                continue;
            }
            let expr = self.parse_assignment(decl)?;
            self.expect_token(&TokenKind::RBracket, "expected ']'")?;
            let size = eval_const(&self.ast, expr);
            if size.is_some_and(|n| n < 0) {
                let name = self.ast.name(decl).to_string();
                self.diags.error(
                    Category::Semantic,
                    self.ast.node(expr).loc,
                    format!("'{}' declared as an array with a negative size", name),
                );
            }
            dims.push(size.filter(|n| *n >= 0).map(|n| n as u64));
        }
        let ty = dims.into_iter().rev().fold(base, |ty, dim| ty.with_array(dim));
        if array_size_overflows(&self.ast, &ty) {
            let loc = self.ast.node(decl).loc;
            self.diags.error(Category::Semantic, loc, "array is too large");
        }
        Ok(ty)
    }

    /// Parse a parameter list after `(`, consuming the closing `)`.
    fn parse_parameters(&mut self, function: NodeId) -> Result<(Vec<Type>, bool, bool), ParseError> {
        if self.match_token(&TokenKind::RParen) {
            return Ok((Vec::new(), false, false));
        }
        if self.check(&TokenKind::Void) && self.peek_ahead(1).is_some_and(|t| t.is(&TokenKind::RParen)) {
            self.advance();
            self.advance();
            return Ok((Vec::new(), false, true));
        }

        let mut params = Vec::new();
        let mut variadic = false;
        loop {
            if self.match_token(&TokenKind::Ellipsis) {
                variadic = true;
                break;
            }
            let start = self.position;
            let spec = self.parse_decl_specifiers(function, DeclContext::Param)?;
            let id = self.parse_declarator(&spec, start, function, DeclContext::Param)?;
            params.push(self.ast.node(id).ty.clone());
            if !self.match_token(&TokenKind::Comma) {
                break;
            }
        }
        self.expect_rparen()?;
        Ok((params, variadic, true))
    }

    /// Initializer and scope entry for a declarator that is not a function
    /// definition.
    fn finish_declarator(&mut self, id: NodeId) -> Result<(), ParseError> {
        if self.check(&TokenKind::Eq) {
            let loc = self.current_loc();
            if let NodeKind::Var { has_init, .. } = &mut self.ast.node_mut(id).kind {
                *has_init = true;
            } else {
                self.diags.error(
                    Category::Semantic,
                    loc,
                    "illegal initializer (only variables can be initialized)",
                );
            }
        }
        self.declare_ordinary(id);

        if self.match_token(&TokenKind::Eq) {
            let ty = self.ast.node(id).ty.clone();
            let (init, count) = self.parse_initializer(id, &ty)?;
            if let Repr::Array(elem, None) = &ty.repr {
                let size = match &self.ast.node(init).kind {
                    NodeKind::StringLiteral(s) => Some(s.len() as u64 + 1),
                    NodeKind::InitList => Some(count),
                    _ => None,
                };
                if let Some(size) = size {
                    self.ast.node_mut(id).ty = Type {
                        repr: Repr::Array(elem.clone(), Some(size)),
                        quals: ty.quals,
                    };
                }
            }
            self.close_node(id);
        }
        self.ast.hoist_attributes(id);
        Ok(())
    }

    /// Parse `= initializer`'s right-hand side. Returns the node and, for an
    /// initializer list, the number of elements it initializes.
    pub(crate) fn parse_initializer(&mut self, parent: NodeId, ty: &Type) -> Result<(NodeId, u64), ParseError> {
        if self.check(&TokenKind::LBrace) {
            self.parse_initializer_list(parent, ty)
        } else {
            Ok((self.parse_assignment(parent)?, 1))
        }
    }

    pub(crate) fn parse_initializer_list(&mut self, parent: NodeId, ty: &Type) -> Result<(NodeId, u64), ParseError> {
        self.nested(|p| p.parse_initializer_list_at_depth(parent, ty))
    }

    fn parse_initializer_list_at_depth(&mut self, parent: NodeId, ty: &Type) -> Result<(NodeId, u64), ParseError> {
        let start = self.position;
        let brace = self.advance().loc;
        let list = self.add_node(NodeKind::InitList, start, brace, parent);
        self.ast.node_mut(list).ty = ty.clone();

        let canonical = canonical_type(&self.ast, ty);
        let record = match canonical.repr {
            Repr::Record(id) => Some(id),
            _ => None,
        };
        let fields: Vec<NodeId> = record
            .and_then(|id| self.ast.definition(id))
            .map(|def| {
                self.ast
                    .children(def)
                    .iter()
                    .copied()
                    .filter(|c| matches!(self.ast.node(*c).kind, NodeKind::Field { .. }))
                    .collect()
            })
            .unwrap_or_default();

        let mut index = 0u64;
        let mut count = 0u64;
        while !self.check(&TokenKind::RBrace) && !self.is_at_end() {
            let mut element = match &canonical.repr {
                Repr::Array(elem, _) => (**elem).clone(),
                Repr::Record(_) => fields
                    .get(index as usize)
                    .map(|f| self.ast.node(*f).ty.clone())
                    .unwrap_or_default(),
                _ => ty.clone(),
            };

            if self.match_token(&TokenKind::Dot) {
                if self.at_completion_point() {
                    self.capture_completion(CompletionKind::Member { record, arrow: false });
                    return Err(ParseError::new("code completion", self.current_loc()));
                }
                let name_index = self.position;
                let (name, loc) = self.expect_identifier()?;
                match record.and_then(|r| find_field(&self.ast, r, &name)) {
                    Some(field) => {
                        self.add_node(NodeKind::MemberRef { target: field }, name_index, loc, list);
                        element = self.ast.node(field).ty.clone();
                        if let Some(pos) = fields.iter().position(|f| *f == field) {
                            index = pos as u64;
                        }
                    }
                    None => {
                        let spelled = type_spelling(&self.ast, self.sm, ty);
                        self.diags.error(
                            Category::Semantic,
                            loc,
                            format!("field designator '{}' does not refer to any field in type '{}'", name, spelled),
                        );
                    }
                }
                self.expect_token(&TokenKind::Eq, "expected '='")?;
            } else if self.match_token(&TokenKind::LBracket) {
                let expr = self.parse_conditional(list)?;
                self.expect_token(&TokenKind::RBracket, "expected ']'")?;
                if let Some(n) = eval_const(&self.ast, expr).filter(|n| *n >= 0) {
                    index = n as u64;
                }
                self.expect_token(&TokenKind::Eq, "expected '='")?;
            }

            self.parse_initializer(list, &element)?;
            index += 1;
            count = count.max(index);
            if !self.match_token(&TokenKind::Comma) {
                break;
            }
        }
        self.expect_token(&TokenKind::RBrace, "expected '}'")?;
        self.close_node(list);
        Ok((list, count))
    }

    /// Parse the body of the function declared by `id`.
    fn parse_function_definition(&mut self, id: NodeId) -> Result<(), ParseError> {
        let skip = self.should_skip_body();
        if let NodeKind::Function { body, .. } = &mut self.ast.node_mut(id).kind {
            *body = if skip { Body::Skipped } else { Body::Parsed };
        }
        self.declare_ordinary(id);

        if skip {
            self.skip_braced_block()?;
            self.close_node(id);
            self.ast.hoist_attributes(id);
            return Ok(());
        }

        let saved = self.function.replace(id);
        self.push_scope(ScopeKind::Function);
        let params: Vec<NodeId> = self
            .ast
            .children(id)
            .iter()
            .copied()
            .filter(|c| matches!(self.ast.node(*c).kind, NodeKind::Param { .. }))
            .collect();
        for param in params {
            let name = self.ast.name(param).to_string();
            if let (false, Some(scope)) = (name.is_empty(), self.scopes.last_mut()) {
                scope.ordinary.insert(name, param);
            }
        }

        let result = self.parse_compound_statement(id, false);
        if let Some(scope) = self.pop_scope() {
            self.resolve_gotos(&scope);
        }
        self.function = saved;
        self.close_node(id);
        self.ast.hoist_attributes(id);
        result.map(|_| ())
    }

    fn should_skip_body(&self) -> bool {
        if self.options.skip_function_bodies {
            return true;
        }
        if self.options.skip_bodies_at.is_empty() {
            return false;
        }
        let loc = self.sm.expansion_loc(self.current_loc());
        self.sm.decompose(loc).is_some_and(|(file, offset)| {
            let name = self.sm.file(file).name.clone();
            self.options.skip_bodies_at.contains(&(name, offset))
        })
    }

    /// Consume a balanced `{ ... }` block without building nodes.
    fn skip_braced_block(&mut self) -> Result<(), ParseError> {
        let mut depth = 0usize;
        loop {
            if self.is_at_end() {
                return Err(self.error_here("expected '}'"));
            }
            match self.advance().kind {
                TokenKind::LBrace => depth += 1,
                TokenKind::RBrace => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(());
                    }
                }
                _ => {}
            }
        }
    }

    // ===== Tags =====

    /// Parse a `struct` or `union` specifier.
    fn parse_record_specifier(
        &mut self,
        tag: TagKind,
        container: NodeId,
        spec: &mut DeclSpec,
    ) -> Result<Type, ParseError> {
        let start = self.position;
        let keyword = self.advance().loc;
        if self.at_completion_point() {
            let filter = match tag {
                TagKind::Struct => TagFilter::Struct,
                TagKind::Union => TagFilter::Union,
            };
            self.capture_completion(CompletionKind::Tag(filter));
            return Err(ParseError::new("code completion", self.current_loc()));
        }
        let mut attrs = self.parse_attributes()?;
        let (name, loc, name_index) = self.parse_tag_name(keyword);
        let new_kind = |complete| NodeKind::Record {
            tag,
            name: name.clone(),
            complete,
        };

        if self.check(&TokenKind::LBrace) {
            let previous = self.previous_tag_in_scope(&name, &new_kind(true), loc);
            let id = self.add_decl_node(new_kind(true), start, loc, container);
            self.link_tag_definition(previous, id, &name, loc);
            self.nested(|p| p.parse_record_body(id))?;
            attrs.extend(self.parse_attributes()?);
            self.attach_attrs(id, &attrs);
            self.ast.hoist_attributes(id);
            self.close_node(id);
            spec.declares_tag = true;
            if let Some(index) = name_index {
                spec.type_ref = Some((id, index));
            }
            return Ok(Type::new(Repr::Record(self.ast.canonical(id))));
        }

        let Some(index) = name_index else {
            return Err(self.error_here("expected identifier or '{'"));
        };
        let target = self.reference_tag(new_kind(false), start, loc, container, &name);
        spec.declares_tag = true;
        spec.type_ref = Some((target, index));
        Ok(Type::new(Repr::Record(self.ast.canonical(target))))
    }

    fn parse_tag_name(&mut self, keyword: Loc) -> (String, Loc, Option<usize>) {
        match &self.peek().kind {
            TokenKind::Ident(name) => {
                let name = name.clone();
                let index = self.position;
                let loc = self.advance().loc;
                (name, loc, Some(index))
            }
            _ => (String::new(), keyword, None),
        }
    }

    /// Previous declaration of a tag in the current scope, checking that the
    /// kinds agree.
    fn previous_tag_in_scope(&mut self, name: &str, kind: &NodeKind, loc: Loc) -> Option<NodeId> {
        if name.is_empty() {
            return None;
        }
        let (prev, here) = self.lookup_tag(name)?;
        self.check_tag_kind(prev, kind, name, loc);
        here.then_some(prev)
    }

    fn check_tag_kind(&mut self, prev: NodeId, kind: &NodeKind, name: &str, loc: Loc) {
        let matches = match (&self.ast.node(prev).kind, kind) {
            (NodeKind::Record { tag: a, .. }, NodeKind::Record { tag: b, .. }) => a == b,
            (NodeKind::Enum { .. }, NodeKind::Enum { .. }) => true,
            _ => false,
        };
        if !matches {
            let prev_loc = self.ast.node(prev).loc;
            self.diags
                .error(
                    Category::Semantic,
                    loc,
                    format!("use of '{}' with tag type that does not match previous declaration", name),
                )
                .note(prev_loc, "previous use is here");
        }
    }

    /// Link a tag definition into the redeclaration chain of `previous`.
    fn link_tag_definition(&mut self, previous: Option<NodeId>, id: NodeId, name: &str, loc: Loc) {
        match previous {
            Some(prev) => {
                if let Some(def) = self.ast.definition(prev) {
                    let def_loc = self.ast.node(def).loc;
                    self.diags
                        .error(Category::Semantic, loc, format!("redefinition of '{}'", name))
                        .note(def_loc, "previous definition is here");
                    self.declare_tag(name, id);
                    self.ast.set_definition(id);
                    return;
                }
                self.ast.add_redecl(prev, id);
            }
            None => {}
        }
        self.declare_tag(name, id);
        self.ast.set_definition(id);
    }

    /// A tag named without a body: either a reference to a visible tag or a
    /// new incomplete declaration.
    fn reference_tag(&mut self, kind: NodeKind, start: usize, loc: Loc, container: NodeId, name: &str) -> NodeId {
        let forward = self.check(&TokenKind::Semicolon);
        match self.lookup_tag(name) {
            Some((prev, here)) if here || !forward => {
                self.check_tag_kind(prev, &kind, name, loc);
                if !forward {
                    return prev;
                }
                let id = self.add_decl_node(kind, start, loc, container);
                self.close_node(id);
                self.ast.add_redecl(prev, id);
                self.declare_tag(name, id);
                id
            }
            _ => {
                let id = self.add_decl_node(kind, start, loc, container);
                self.close_node(id);
                self.declare_tag(name, id);
                id
            }
        }
    }

    fn parse_record_body(&mut self, record: NodeId) -> Result<(), ParseError> {
        self.expect_token(&TokenKind::LBrace, "expected '{'")?;
        let mut names: FxHashMap<String, Loc> = FxHashMap::default();
        while !self.check(&TokenKind::RBrace) && !self.is_at_end() {
            let start = self.position;
            if let Err(err) = self.parse_field_declaration(record, &mut names) {
                self.report(err);
                self.recover(start);
            }
        }
        self.expect_token(&TokenKind::RBrace, "expected '}'")?;
        Ok(())
    }

    fn parse_field_declaration(&mut self, record: NodeId, names: &mut FxHashMap<String, Loc>) -> Result<(), ParseError> {
        if self.match_token(&TokenKind::Semicolon) {
            return Ok(());
        }
        let start = self.position;
        let spec = self.parse_decl_specifiers(record, DeclContext::Field)?;

        if self.match_token(&TokenKind::Semicolon) {
            let anonymous = match &spec.base.repr {
                Repr::Record(id) => self.ast.name(*id).is_empty(),
                _ => false,
            };
            if anonymous {
                // unnamed member holding an anonymous struct or union
                let loc = self.tokens[start].loc;
                let field = self.add_decl_node(
                    NodeKind::Field {
                        name: String::new(),
                        bit_width: None,
                    },
                    start,
                    loc,
                    record,
                );
                let node = self.ast.node_mut(field);
                node.implicit = true;
                node.ty = spec.base.clone();
            } else {
                self.diags.warning(
                    Category::Semantic,
                    self.tokens[start].loc,
                    "declaration does not declare anything",
                    "missing-declarations",
                );
            }
            return Ok(());
        }

        loop {
            let id = self.parse_declarator(&spec, start, record, DeclContext::Field)?;
            let name = self.ast.name(id).to_string();
            let loc = self.ast.node(id).loc;
            if matches!(self.ast.node(id).ty.repr, Repr::Function(_)) {
                self.diags
                    .error(Category::Semantic, loc, format!("field '{}' declared as a function", name));
            }
            if !name.is_empty() {
                if let Some(prev) = names.get(&name) {
                    let prev = *prev;
                    self.diags
                        .error(Category::Semantic, loc, format!("duplicate member '{}'", name))
                        .note(prev, "previous declaration is here");
                } else {
                    names.insert(name, loc);
                }
            }
            self.ast.hoist_attributes(id);
            if !self.match_token(&TokenKind::Comma) {
                break;
            }
        }
        self.expect_semicolon("at end of declaration list")
    }

    /// Parse an `enum` specifier.
    fn parse_enum_specifier(&mut self, container: NodeId, spec: &mut DeclSpec) -> Result<Type, ParseError> {
        let start = self.position;
        let keyword = self.advance().loc;
        if self.at_completion_point() {
            self.capture_completion(CompletionKind::Tag(TagFilter::Enum));
            return Err(ParseError::new("code completion", self.current_loc()));
        }
        let mut attrs = self.parse_attributes()?;
        let (name, loc, name_index) = self.parse_tag_name(keyword);
        let new_kind = |complete| NodeKind::Enum {
            name: name.clone(),
            complete,
        };

        if !self.check(&TokenKind::LBrace) {
            let Some(index) = name_index else {
                return Err(self.error_here("expected identifier or '{'"));
            };
            let target = self.reference_tag(new_kind(false), start, loc, container, &name);
            spec.declares_tag = true;
            spec.type_ref = Some((target, index));
            return Ok(Type::new(Repr::Enum(self.ast.canonical(target))));
        }

        let previous = self.previous_tag_in_scope(&name, &new_kind(true), loc);
        let id = self.add_decl_node(new_kind(true), start, loc, container);
        self.link_tag_definition(previous, id, &name, loc);
        self.advance();

        let mut next = 0i64;
        while !self.check(&TokenKind::RBrace) && !self.is_at_end() {
            let constant_start = self.position;
            let (constant, constant_loc) = self.expect_identifier()?;
            let constant_id = self.add_decl_node(
                NodeKind::EnumConstant {
                    name: constant,
                    value: next,
                },
                constant_start,
                constant_loc,
                id,
            );
            self.ast.node_mut(constant_id).ty = Type::int();
            if self.match_token(&TokenKind::Eq) {
                let expr = self.parse_conditional(constant_id)?;
                match eval_const(&self.ast, expr) {
                    Some(value) => next = value,
                    None => {
                        self.diags.error(
                            Category::Semantic,
                            self.ast.node(expr).loc,
                            "expression is not an integer constant expression",
                        );
                    }
                }
                self.close_node(constant_id);
            }
            if let NodeKind::EnumConstant { value, .. } = &mut self.ast.node_mut(constant_id).kind {
                *value = next;
            }
            self.declare_ordinary(constant_id);
            next = next.wrapping_add(1);
            if !self.match_token(&TokenKind::Comma) {
                break;
            }
        }
        self.expect_token(&TokenKind::RBrace, "expected '}'")?;
        attrs.extend(self.parse_attributes()?);
        self.attach_attrs(id, &attrs);
        self.ast.hoist_attributes(id);
        self.close_node(id);

        spec.declares_tag = true;
        if let Some(index) = name_index {
            spec.type_ref = Some((id, index));
        }
        Ok(Type::new(Repr::Enum(self.ast.canonical(id))))
    }

    // ===== Type names =====

    /// Parse a type name (casts, `sizeof`, compound literals). Type
    /// references become children of `owner`.
    pub(crate) fn parse_type_name(&mut self, owner: NodeId) -> Result<Type, ParseError> {
        let spec = self.parse_decl_specifiers(owner, DeclContext::TypeName)?;
        if let Some((target, index)) = spec.type_ref {
            self.add_type_ref(target, index, owner);
        }
        let ty = self.parse_pointers(spec.base)?;
        if self.check(&TokenKind::LParen) {
            return Err(ParseError::new(
                "parenthesized declarators are not supported",
                self.current_loc(),
            ));
        }
        self.parse_declarator_suffixes(ty, owner)
    }

    // ===== Attributes =====

    /// Parse any number of `__attribute__((...))` lists and `__asm__` labels.
    pub(crate) fn parse_attributes(&mut self) -> Result<Vec<ParsedAttr>, ParseError> {
        let mut attrs = Vec::new();
        loop {
            if is_asm_keyword(&self.peek().kind) {
                let start = self.position;
                let loc = self.advance().loc;
                self.expect_token(&TokenKind::LParen, "expected '(' after 'asm'")?;
                let label = match &self.peek().kind {
                    TokenKind::StringLiteral(s) => s.clone(),
                    _ => return Err(self.error_here("expected string literal in 'asm'")),
                };
                self.advance();
                self.expect_rparen()?;
                attrs.push(ParsedAttr {
                    kind: AttrKind::AsmLabel(label),
                    start,
                    end: self.position,
                    loc,
                });
                continue;
            }
            if !self.match_token(&TokenKind::Attribute) {
                break;
            }
            self.expect_token(&TokenKind::LParen, "expected '(' after 'attribute'")?;
            self.expect_token(&TokenKind::LParen, "expected '(' after '('")?;
            while !self.check(&TokenKind::RParen) && !self.is_at_end() {
                if self.match_token(&TokenKind::Comma) {
                    continue;
                }
                let start = self.position;
                let token = self.advance().clone();
                let Some(raw) = attribute_name(&token.kind) else {
                    return Err(ParseError::new("expected identifier", token.loc));
                };
                let args = if self.check(&TokenKind::LParen) {
                    self.parse_attribute_arguments()?
                } else {
                    Vec::new()
                };
                let name = raw.trim_start_matches("__").trim_end_matches("__");
                let string_arg = || {
                    args.iter().find_map(|a| match a {
                        TokenKind::StringLiteral(s) => Some(s.clone()),
                        _ => None,
                    })
                };
                let kind = match name {
                    "packed" => AttrKind::Packed,
                    "aligned" => AttrKind::Aligned(args.iter().find_map(|a| match a {
                        TokenKind::IntLiteral(n) => Some(*n),
                        _ => None,
                    })),
                    "const" => AttrKind::Const,
                    "pure" => AttrKind::Pure,
                    "warn_unused_result" => AttrKind::WarnUnusedResult,
                    "visibility" => AttrKind::Visibility(string_arg().unwrap_or_default()),
                    "annotate" => AttrKind::Annotate(string_arg().unwrap_or_default()),
                    other => AttrKind::Other(other.to_string()),
                };
                attrs.push(ParsedAttr {
                    kind,
                    start,
                    end: self.position,
                    loc: token.loc,
                });
            }
            self.expect_rparen()?;
            self.expect_rparen()?;
        }
        Ok(attrs)
    }

    /// Consume a parenthesized argument list, returning its top-level tokens.
    fn parse_attribute_arguments(&mut self) -> Result<Vec<TokenKind>, ParseError> {
        self.advance();
        let mut depth = 1usize;
        let mut args = Vec::new();
        while depth > 0 {
            if self.is_at_end() {
                return Err(self.error_here("expected ')'"));
            }
            let kind = self.advance().kind.clone();
            match kind {
                TokenKind::LParen => depth += 1,
                TokenKind::RParen => depth -= 1,
                kind if depth == 1 => args.push(kind),
                _ => {}
            }
        }
        Ok(args)
    }

    fn attach_attrs(&mut self, owner: NodeId, attrs: &[ParsedAttr]) {
        for attr in attrs {
            let last = attr.end.saturating_sub(1).max(attr.start);
            self.add_node_at(NodeKind::Attr(attr.kind.clone()), attr.start, last, attr.loc, owner);
        }
    }

    // ===== Node helpers =====

    /// Create a declaration node; its semantic parent is the enclosing
    /// function, record, enum or translation unit.
    pub(crate) fn add_decl_node(&mut self, kind: NodeKind, start: usize, loc: Loc, parent: NodeId) -> NodeId {
        let id = self.add_node(kind, start, loc, parent);
        let context = self.decl_context(parent);
        self.ast.node_mut(id).semantic_parent = Some(context);
        id
    }

    fn decl_context(&self, mut id: NodeId) -> NodeId {
        loop {
            let node = self.ast.node(id);
            match (&node.kind, node.parent) {
                (
                    NodeKind::TranslationUnit
                    | NodeKind::Function { .. }
                    | NodeKind::Record { .. }
                    | NodeKind::Enum { .. },
                    _,
                )
                | (_, None) => return id,
                (_, Some(parent)) => id = parent,
            }
        }
    }

    /// Create a node covering tokens `first..=last`.
    pub(crate) fn add_node_at(&mut self, kind: NodeKind, first: usize, last: usize, loc: Loc, parent: NodeId) -> NodeId {
        let span = Span::new(self.tokens[first].loc, self.tokens[last].end());
        let id = self.ast.add(kind, span, loc, parent, first as u32);
        if self.is_from_pch(span.begin) {
            self.ast.node_mut(id).from_pch = true;
        }
        id
    }

    pub(crate) fn add_type_ref(&mut self, target: NodeId, index: usize, owner: NodeId) -> NodeId {
        let loc = self.tokens[index].loc;
        self.add_node_at(NodeKind::TypeRef { target }, index, index, loc, owner)
    }
}

#[cfg(test)]
mod tests {
    use crate::parser::ast::*;
    use crate::parser::parse::tests::{parse_source, top_level};

    #[test]
    fn test_type_refs_and_tag_siblings() {
        let parsed = parse_source("struct S { int a; } s;\ntypedef struct S T;\nT *p;\n");
        assert!(parsed.diags.is_empty());
        let root = parsed.ast.children(NodeId::ROOT);
        assert_eq!(root.len(), 4);
        assert!(matches!(parsed.ast.node(root[0]).kind, NodeKind::Record { .. }));
        assert!(matches!(&parsed.ast.node(root[1]).kind, NodeKind::Var { name, .. } if name == "s"));
        let var_children = parsed.ast.children(root[1]);
        assert!(matches!(parsed.ast.node(var_children[0]).kind, NodeKind::TypeRef { target } if target == root[0]));
        assert!(matches!(&parsed.ast.node(root[2]).kind, NodeKind::Typedef { name } if name == "T"));
        let p = parsed.ast.node(root[3]);
        assert!(matches!(p.ty.repr, Repr::Pointer(_)));
        assert!(matches!(parsed.ast.node(p.children[0]).kind, NodeKind::TypeRef { target } if target == root[2]));
    }

    #[test]
    fn test_function_parameters() {
        let parsed = parse_source("int add(int a, int b, ...);\nvoid none(void);\nint old();\n");
        assert!(parsed.diags.is_empty());
        let root = parsed.ast.children(NodeId::ROOT);
        let add = parsed.ast.node(root[0]);
        assert_eq!(add.children.len(), 2);
        match &add.ty.repr {
            Repr::Function(f) => {
                assert_eq!(f.params.len(), 2);
                assert!(f.variadic);
                assert!(f.prototyped);
            }
            other => panic!("expected function type, got {:?}", other),
        }
        assert!(matches!(&parsed.ast.node(root[1]).ty.repr, Repr::Function(f) if f.prototyped && f.params.is_empty()));
        assert!(matches!(&parsed.ast.node(root[2]).ty.repr, Repr::Function(f) if !f.prototyped));
    }

    #[test]
    fn test_array_size_from_initializer() {
        let parsed = parse_source("int a[] = {1, 2, 3};\nchar s[] = \"abc\";\nint m[2][3];\n");
        let root = parsed.ast.children(NodeId::ROOT);
        assert!(matches!(&parsed.ast.node(root[0]).ty.repr, Repr::Array(_, Some(3))));
        assert!(matches!(&parsed.ast.node(root[1]).ty.repr, Repr::Array(_, Some(4))));
        match &parsed.ast.node(root[2]).ty.repr {
            Repr::Array(inner, Some(2)) => assert!(matches!(inner.repr, Repr::Array(_, Some(3)))),
            other => panic!("expected nested array, got {:?}", other),
        }
    }

    #[test]
    fn test_bit_fields_and_attributes() {
        let parsed = parse_source("struct F { unsigned a : 3; int : 0; } __attribute__((packed));\n");
        assert!(parsed.diags.is_empty());
        let record = parsed.ast.children(NodeId::ROOT)[0];
        let kinds: Vec<_> = parsed
            .ast
            .children(record)
            .iter()
            .map(|c| parsed.ast.node(*c).kind.clone())
            .collect();
        assert_eq!(kinds[0], NodeKind::Attr(AttrKind::Packed));
        assert!(matches!(&kinds[1], NodeKind::Field { name, bit_width: Some(3) } if name == "a"));
        assert!(matches!(&kinds[2], NodeKind::Field { name, bit_width: Some(0) } if name.is_empty()));
    }

    #[test]
    fn test_designated_initializer_member_refs() {
        let parsed = parse_source("struct P { int x, y; };\nstruct P p = { .y = 1, .x = 2 };\n");
        assert!(parsed.diags.is_empty());
        let root = parsed.ast.children(NodeId::ROOT);
        let init = *parsed.ast.children(root[1]).last().unwrap();
        let refs: Vec<_> = parsed
            .ast
            .children(init)
            .iter()
            .filter_map(|c| match parsed.ast.node(*c).kind {
                NodeKind::MemberRef { target } => Some(parsed.ast.name(target).to_string()),
                _ => None,
            })
            .collect();
        assert_eq!(refs, vec!["y", "x"]);
    }

    #[test]
    fn test_unknown_type_name_recovers() {
        let parsed = parse_source("foo x;\nint y;\n");
        assert_eq!(parsed.diags.len(), 1);
        assert_eq!(parsed.diags[0].message, "unknown type name 'foo'");
        assert_eq!(top_level(&parsed).len(), 2);
    }

    #[test]
    fn test_struct_redefinition() {
        let parsed = parse_source("struct S { int a; };\nstruct S { int b; };\n");
        assert_eq!(parsed.diags.len(), 1);
        assert_eq!(parsed.diags[0].message, "redefinition of 'S'");
    }
}
