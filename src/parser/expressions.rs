//! Expression parsing implementation
//!
//! This module handles parsing of C expressions using precedence climbing
//! for binary operators and recursive descent for other expression forms.
//!
//! # Supported Expressions
//!
//! - Literals: integers, floating point, characters, (concatenated) strings
//! - Identifiers, resolved against the scope chain
//! - Binary operators: arithmetic, comparison, logical, bitwise, comma
//! - Unary operators: `+`, `-`, `!`, `~`, `&`, `*`, `++`, `--`
//! - Postfix: `[]`, `.`, `->`, `()`, `++`, `--`
//! - Ternary: `? :`
//! - Casts and compound literals: `(type)expr`, `(type){...}`
//! - `sizeof` and `_Alignof`
//!
//! # Precedence
//!
//! Binary operators follow C precedence rules using a precedence climbing
//! algorithm. An operator node is created once its left operand is complete and
//! the operand is moved under it, so children always appear in source order.
//!
//! Every expression node gets its type when it is finished.
//!
//! All parsing methods are implemented as `pub(crate)` methods on the [`Parser`] struct.

use crate::cursor::types::type_spelling;
use crate::diagnostics::Category;
use crate::parser::ast::*;
use crate::parser::lexer::TokenKind;
use crate::parser::parse::{ParseError, Parser};
use crate::parser::sema::{arithmetic_result, canonical_type, decay, find_field, pointee, CompletionKind};

/// Binary operator and precedence level for a token.
fn binary_op(kind: &TokenKind) -> Option<(BinOp, u8)> {
    let op = match kind {
        TokenKind::OrOr => (BinOp::Or, 1),
        TokenKind::AndAnd => (BinOp::And, 2),
        TokenKind::Pipe => (BinOp::BitOr, 3),
        TokenKind::Caret => (BinOp::BitXor, 4),
        TokenKind::Amp => (BinOp::BitAnd, 5),
        TokenKind::EqEq => (BinOp::Eq, 6),
        TokenKind::NotEq => (BinOp::Ne, 6),
        TokenKind::Lt => (BinOp::Lt, 7),
        TokenKind::Le => (BinOp::Le, 7),
        TokenKind::Gt => (BinOp::Gt, 7),
        TokenKind::Ge => (BinOp::Ge, 7),
        TokenKind::LtLt => (BinOp::BitShl, 8),
        TokenKind::GtGt => (BinOp::BitShr, 8),
        TokenKind::Plus => (BinOp::Add, 9),
        TokenKind::Minus => (BinOp::Sub, 9),
        TokenKind::Star => (BinOp::Mul, 10),
        TokenKind::Slash => (BinOp::Div, 10),
        TokenKind::Percent => (BinOp::Mod, 10),
        _ => return None,
    };
    Some(op)
}

/// `None` for plain `=`, the arithmetic operator for compound assignments.
fn assignment_op(kind: &TokenKind) -> Option<Option<BinOp>> {
    let op = match kind {
        TokenKind::Eq => None,
        TokenKind::PlusEq => Some(BinOp::Add),
        TokenKind::MinusEq => Some(BinOp::Sub),
        TokenKind::StarEq => Some(BinOp::Mul),
        TokenKind::SlashEq => Some(BinOp::Div),
        TokenKind::PercentEq => Some(BinOp::Mod),
        TokenKind::AmpEq => Some(BinOp::BitAnd),
        TokenKind::PipeEq => Some(BinOp::BitOr),
        TokenKind::CaretEq => Some(BinOp::BitXor),
        TokenKind::LtLtEq => Some(BinOp::BitShl),
        TokenKind::GtGtEq => Some(BinOp::BitShr),
        _ => return None,
    };
    Some(op)
}

fn is_arithmetic(repr: &Repr) -> bool {
    !matches!(
        repr,
        Repr::Invalid | Repr::Void | Repr::Pointer(_) | Repr::Array(..) | Repr::Function(_) | Repr::Record(_)
    )
}

impl Parser<'_> {
    /// Parse expression (top-level entry point, includes the comma operator)
    pub(crate) fn parse_expression(&mut self, parent: NodeId) -> Result<NodeId, ParseError> {
        let mut expr = self.parse_assignment(parent)?;
        while self.check(&TokenKind::Comma) {
            let id = self.wrap(NodeKind::Binary(BinOp::Comma), expr, parent);
            self.advance();
            self.parse_assignment(id)?;
            self.finish_expr(id);
            expr = id;
        }
        Ok(expr)
    }

    /// Parse assignment or conditional (right-associative)
    pub(crate) fn parse_assignment(&mut self, parent: NodeId) -> Result<NodeId, ParseError> {
        self.nested(|p| p.parse_assignment_at_depth(parent))
    }

    fn parse_assignment_at_depth(&mut self, parent: NodeId) -> Result<NodeId, ParseError> {
        let lhs = self.parse_conditional(parent)?;
        let Some(op) = assignment_op(&self.peek().kind) else {
            return Ok(lhs);
        };
        let kind = match op {
            None => NodeKind::Binary(BinOp::Assign),
            Some(op) => NodeKind::CompoundAssign(op),
        };
        let id = self.wrap(kind, lhs, parent);
        self.advance();
        self.parse_assignment(id)?;
        self.finish_expr(id);
        Ok(id)
    }

    /// Parse ternary: condition ? true_expr : false_expr
    pub(crate) fn parse_conditional(&mut self, parent: NodeId) -> Result<NodeId, ParseError> {
        let cond = self.parse_binary(parent, 1)?;
        if !self.check(&TokenKind::Question) {
            return Ok(cond);
        }
        let id = self.wrap(NodeKind::Conditional, cond, parent);
        self.advance();
        self.parse_expression(id)?;
        self.expect_token(&TokenKind::Colon, "expected ':'")?;
        self.nested(|p| p.parse_conditional(id))?;
        self.finish_expr(id);
        Ok(id)
    }

    /// Precedence climbing over the binary operators.
    fn parse_binary(&mut self, parent: NodeId, min_prec: u8) -> Result<NodeId, ParseError> {
        let mut lhs = self.parse_cast(parent)?;
        while let Some((op, prec)) = binary_op(&self.peek().kind) {
            if prec < min_prec {
                break;
            }
            let id = self.wrap(NodeKind::Binary(op), lhs, parent);
            self.advance();
            self.parse_binary(id, prec + 1)?;
            self.finish_expr(id);
            lhs = id;
        }
        Ok(lhs)
    }

    /// Parse a cast, compound literal or unary expression.
    fn parse_cast(&mut self, parent: NodeId) -> Result<NodeId, ParseError> {
        if !(self.check(&TokenKind::LParen) && self.starts_type_name_at(1)) {
            return self.parse_unary(parent);
        }
        let start = self.position;
        let loc = self.advance().loc;
        let id = self.add_node(NodeKind::Cast, start, loc, parent);
        let ty = self.parse_type_name(id)?;
        self.expect_rparen()?;

        if self.check(&TokenKind::LBrace) {
            self.ast.node_mut(id).kind = NodeKind::CompoundLiteral;
            self.parse_initializer_list(id, &ty)?;
            self.ast.node_mut(id).ty = ty;
            self.close_node(id);
            return self.parse_postfix_suffixes(id, parent);
        }

        self.nested(|p| p.parse_cast(id))?;
        self.ast.node_mut(id).ty = ty;
        self.close_node(id);
        Ok(id)
    }

    /// Parse unary operators and `sizeof`/`_Alignof`.
    fn parse_unary(&mut self, parent: NodeId) -> Result<NodeId, ParseError> {
        let op = match self.peek().kind {
            TokenKind::Plus => Some(UnOp::Plus),
            TokenKind::Minus => Some(UnOp::Neg),
            TokenKind::Bang => Some(UnOp::Not),
            TokenKind::Tilde => Some(UnOp::BitNot),
            TokenKind::PlusPlus => Some(UnOp::PreInc),
            TokenKind::MinusMinus => Some(UnOp::PreDec),
            TokenKind::Star => Some(UnOp::Deref),
            TokenKind::Amp => Some(UnOp::AddrOf),
            _ => None,
        };
        if let Some(op) = op {
            let start = self.position;
            let loc = self.advance().loc;
            let id = self.add_node(NodeKind::Unary(op), start, loc, parent);
            if matches!(op, UnOp::PreInc | UnOp::PreDec) {
                self.nested(|p| p.parse_unary(id))?;
            } else {
                self.nested(|p| p.parse_cast(id))?;
            }
            self.finish_expr(id);
            return Ok(id);
        }

        let trait_kind = match self.peek().kind {
            TokenKind::Sizeof => TraitKind::SizeOf,
            TokenKind::Alignof => TraitKind::AlignOf,
            _ => return self.parse_postfix(parent),
        };
        let start = self.position;
        let loc = self.advance().loc;
        let id = self.add_node(NodeKind::TypeTrait(trait_kind, Box::default()), start, loc, parent);
        let ty = if self.check(&TokenKind::LParen) && self.starts_type_name_at(1) {
            self.advance();
            let ty = self.parse_type_name(id)?;
            self.expect_rparen()?;
            ty
        } else {
            let operand = self.nested(|p| p.parse_unary(id))?;
            self.ast.node(operand).ty.clone()
        };
        if let NodeKind::TypeTrait(_, queried) = &mut self.ast.node_mut(id).kind {
            **queried = ty;
        }
        self.finish_expr(id);
        Ok(id)
    }

    fn parse_postfix(&mut self, parent: NodeId) -> Result<NodeId, ParseError> {
        let expr = self.parse_primary(parent)?;
        self.parse_postfix_suffixes(expr, parent)
    }

    /// Apply calls, subscripts, member accesses and postfix `++`/`--` to `expr`.
    fn parse_postfix_suffixes(&mut self, mut expr: NodeId, parent: NodeId) -> Result<NodeId, ParseError> {
        loop {
            match self.peek().kind {
                TokenKind::LParen => {
                    let id = self.wrap(NodeKind::Call, expr, parent);
                    self.advance();
                    let mut args = 0usize;
                    if !self.check(&TokenKind::RParen) {
                        loop {
                            self.parse_assignment(id)?;
                            args += 1;
                            if !self.match_token(&TokenKind::Comma) {
                                break;
                            }
                        }
                    }
                    self.expect_rparen()?;
                    self.finish_expr(id);
                    self.check_call_arguments(expr, args);
                    expr = id;
                }
                TokenKind::LBracket => {
                    let id = self.wrap(NodeKind::Subscript, expr, parent);
                    self.advance();
                    self.parse_expression(id)?;
                    self.expect_token(&TokenKind::RBracket, "expected ']'")?;
                    self.finish_expr(id);
                    expr = id;
                }
                TokenKind::Dot | TokenKind::Arrow => {
                    let arrow = self.check(&TokenKind::Arrow);
                    self.advance();
                    expr = self.parse_member_access(expr, parent, arrow)?;
                }
                TokenKind::PlusPlus | TokenKind::MinusMinus => {
                    let op = if self.check(&TokenKind::PlusPlus) {
                        UnOp::PostInc
                    } else {
                        UnOp::PostDec
                    };
                    let id = self.wrap(NodeKind::Unary(op), expr, parent);
                    self.advance();
                    self.finish_expr(id);
                    expr = id;
                }
                _ => return Ok(expr),
            }
        }
    }

    /// Parse the member name after `.` or `->`.
    fn parse_member_access(&mut self, base: NodeId, parent: NodeId, arrow: bool) -> Result<NodeId, ParseError> {
        let base_ty = self.ast.node(base).ty.clone();
        let canonical = canonical_type(&self.ast, &decay(&base_ty));
        let accessed = match (&canonical.repr, arrow) {
            (Repr::Pointer(inner), true) => canonical_type(&self.ast, inner),
            _ => canonical.clone(),
        };
        let record = match accessed.repr {
            Repr::Record(id) => Some(id),
            _ => None,
        };

        if self.at_completion_point() {
            self.capture_completion(CompletionKind::Member { record, arrow });
            return Err(ParseError::new("code completion", self.current_loc()));
        }
        let (name, loc) = self.expect_identifier()?;
        let target = record.and_then(|r| find_field(&self.ast, r, &name));
        let id = self.wrap(
            NodeKind::Member {
                name: name.clone(),
                arrow,
                target,
            },
            base,
            parent,
        );
        self.ast.node_mut(id).loc = loc;
        self.finish_expr(id);

        if target.is_none() && base_ty.is_valid() {
            let spelled = type_spelling(&self.ast, self.sm, &base_ty);
            let message = match record {
                _ if arrow && !matches!(canonical.repr, Repr::Pointer(_)) => {
                    format!("member reference type '{}' is not a pointer", spelled)
                }
                None => format!("member reference base type '{}' is not a structure or union", spelled),
                Some(r) if self.ast.definition(r).is_none() => format!(
                    "incomplete definition of type '{}'",
                    type_spelling(&self.ast, self.sm, &accessed)
                ),
                Some(_) => format!(
                    "no member named '{}' in '{}'",
                    name,
                    type_spelling(&self.ast, self.sm, &accessed)
                ),
            };
            self.diags.error(Category::Semantic, loc, message);
        }
        Ok(id)
    }

    /// Argument count check against a prototyped callee.
    fn check_call_arguments(&mut self, callee: NodeId, args: usize) {
        let callee_ty = canonical_type(&self.ast, &decay(&self.ast.node(callee).ty));
        let function = match callee_ty.repr {
            Repr::Pointer(inner) => match canonical_type(&self.ast, &inner).repr {
                Repr::Function(f) => f,
                _ => return,
            },
            Repr::Function(f) => f,
            _ => return,
        };
        if !function.prototyped {
            return;
        }
        let expected = function.params.len();
        let message = if args < expected {
            format!("too few arguments to function call, expected {}, have {}", expected, args)
        } else if args > expected && !function.variadic {
            format!("too many arguments to function call, expected {}, have {}", expected, args)
        } else {
            return;
        };
        let loc = self.previous().loc;
        self.diags.error(Category::Semantic, loc, message);
    }

    /// Parse primary expression: literals, identifiers, parenthesized expressions
    fn parse_primary(&mut self, parent: NodeId) -> Result<NodeId, ParseError> {
        if self.at_completion_point() {
            self.capture_completion(CompletionKind::Ordinary);
            return Err(ParseError::new("code completion", self.current_loc()));
        }
        let start = self.position;
        let token = self.peek().clone();
        let kind = match &token.kind {
            TokenKind::Ident(name) => {
                self.advance();
                let target = match self.lookup_ordinary(name) {
                    Some(target) => Some(target),
                    None if self.check(&TokenKind::LParen) => {
                        Some(self.declare_implicit_function(name, token.loc, start))
                    }
                    None => {
                        self.diags.error(
                            Category::Semantic,
                            token.loc,
                            format!("use of undeclared identifier '{}'", name),
                        );
                        None
                    }
                };
                NodeKind::DeclRef {
                    name: name.clone(),
                    target,
                }
            }
            TokenKind::IntLiteral(n) => {
                self.advance();
                NodeKind::IntLiteral(*n)
            }
            TokenKind::FloatLiteral(n) => {
                self.advance();
                NodeKind::FloatLiteral(*n)
            }
            TokenKind::CharLiteral(c) => {
                self.advance();
                NodeKind::CharLiteral(*c)
            }
            TokenKind::StringLiteral(s) => {
                self.advance();
                let mut value = s.clone();
                while let TokenKind::StringLiteral(next) = &self.peek().kind {
                    value.push_str(next);
                    self.advance();
                }
                NodeKind::StringLiteral(value)
            }
            TokenKind::LParen => {
                self.advance();
                let id = self.add_node(NodeKind::Paren, start, token.loc, parent);
                self.parse_expression(id)?;
                self.expect_rparen()?;
                self.finish_expr(id);
                return Ok(id);
            }
            _ => return Err(self.error_here("expected expression")),
        };
        let id = self.add_node(kind, start, token.loc, parent);
        self.finish_expr(id);
        Ok(id)
    }

    // ===== Helpers =====

    /// Create `kind` starting where `inner` starts and move `inner` under it.
    fn wrap(&mut self, kind: NodeKind, inner: NodeId, parent: NodeId) -> NodeId {
        let start = self.ast.node(inner).seq as usize;
        let loc = self.tokens[start].loc;
        let id = self.add_node(kind, start, loc, parent);
        self.ast.reparent(inner, id);
        id
    }

    /// Close an expression node and compute its type.
    fn finish_expr(&mut self, id: NodeId) {
        self.close_node(id);
        let ty = self.expr_type(id);
        self.ast.node_mut(id).ty = ty;
    }

    fn expr_type(&self, id: NodeId) -> Type {
        let node = self.ast.node(id);
        let operand = |i: usize| {
            node.children
                .iter()
                .filter(|c| !matches!(self.ast.node(**c).kind, NodeKind::TypeRef { .. }))
                .nth(i)
                .map(|c| self.ast.node(*c).ty.clone())
                .unwrap_or_default()
        };
        match &node.kind {
            NodeKind::IntLiteral(n) => {
                if *n <= i32::MAX as u64 {
                    Type::int()
                } else if *n <= i64::MAX as u64 {
                    Type::new(Repr::Long)
                } else {
                    Type::new(Repr::ULong)
                }
            }
            NodeKind::FloatLiteral(_) => Type::new(Repr::Double),
            NodeKind::CharLiteral(_) => Type::int(),
            NodeKind::StringLiteral(s) => Type::new(Repr::Char).with_array(Some(s.len() as u64 + 1)),
            NodeKind::DeclRef { target: Some(t), .. } | NodeKind::Member { target: Some(t), .. } => {
                self.ast.node(*t).ty.clone()
            }
            NodeKind::Call => {
                let callee = canonical_type(&self.ast, &decay(&operand(0)));
                match callee.repr {
                    Repr::Pointer(inner) => match inner.repr {
                        Repr::Function(f) => f.result,
                        _ => Type::default(),
                    },
                    _ => Type::default(),
                }
            }
            NodeKind::Paren => operand(0),
            NodeKind::Unary(op) => match op {
                UnOp::Deref => pointee(&self.ast, &decay(&operand(0))),
                UnOp::AddrOf => operand(0).with_pointer(),
                UnOp::Not => Type::int(),
                UnOp::Plus | UnOp::Neg | UnOp::BitNot => arithmetic_result(&self.ast, &operand(0), &operand(0)),
                UnOp::PreInc | UnOp::PreDec | UnOp::PostInc | UnOp::PostDec => operand(0),
            },
            NodeKind::Binary(op) => match op {
                BinOp::Assign => operand(0),
                BinOp::Comma => operand(1),
                BinOp::Eq
                | BinOp::Ne
                | BinOp::Lt
                | BinOp::Le
                | BinOp::Gt
                | BinOp::Ge
                | BinOp::And
                | BinOp::Or => Type::int(),
                BinOp::BitShl | BinOp::BitShr => arithmetic_result(&self.ast, &operand(0), &operand(0)),
                BinOp::Sub => {
                    let lhs = canonical_type(&self.ast, &decay(&operand(0)));
                    let rhs = canonical_type(&self.ast, &decay(&operand(1)));
                    if matches!((&lhs.repr, &rhs.repr), (Repr::Pointer(_), Repr::Pointer(_))) {
                        Type::new(Repr::Long)
                    } else {
                        arithmetic_result(&self.ast, &operand(0), &operand(1))
                    }
                }
                _ => arithmetic_result(&self.ast, &operand(0), &operand(1)),
            },
            NodeKind::CompoundAssign(_) => operand(0),
            NodeKind::Conditional => {
                let (then, other) = (operand(1), operand(2));
                let both_arithmetic = is_arithmetic(&canonical_type(&self.ast, &then).repr)
                    && is_arithmetic(&canonical_type(&self.ast, &other).repr);
                if both_arithmetic {
                    arithmetic_result(&self.ast, &then, &other)
                } else {
                    then
                }
            }
            NodeKind::Subscript => {
                let base = canonical_type(&self.ast, &operand(0));
                if matches!(base.repr, Repr::Pointer(_) | Repr::Array(..)) {
                    pointee(&self.ast, &base)
                } else {
                    pointee(&self.ast, &operand(1))
                }
            }
            NodeKind::TypeTrait(..) => Type::new(Repr::ULong),
            _ => node.ty.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::parser::ast::*;
    use crate::parser::parse::tests::parse_source;

    fn find_kind(parsed: &crate::parser::parse::tests::Parsed, pred: impl Fn(&NodeKind) -> bool) -> NodeId {
        parsed
            .ast
            .ids()
            .find(|id| pred(&parsed.ast.node(*id).kind))
            .expect("node not found")
    }

    #[test]
    fn test_precedence_builds_nested_binary() {
        let parsed = parse_source("int v = 1 + 2 * 3;");
        assert!(parsed.diags.is_empty());
        let add = find_kind(&parsed, |k| matches!(k, NodeKind::Binary(BinOp::Add)));
        let children = parsed.ast.children(add);
        assert_eq!(children.len(), 2);
        assert!(matches!(parsed.ast.node(children[0]).kind, NodeKind::IntLiteral(1)));
        assert!(matches!(parsed.ast.node(children[1]).kind, NodeKind::Binary(BinOp::Mul)));
        assert_eq!(parsed.sm.text(parsed.ast.node(add).span), Some("1 + 2 * 3"));
    }

    #[test]
    fn test_member_access_types() {
        let parsed = parse_source(
            "struct S { int a; char *name; };\nchar f(struct S *s) { return s->name[0] + s->a; }\n",
        );
        assert!(parsed.diags.is_empty());
        let member = find_kind(&parsed, |k| matches!(k, NodeKind::Member { name, arrow: true, .. } if name == "name"));
        let node = parsed.ast.node(member);
        assert!(matches!(&node.ty.repr, Repr::Pointer(inner) if inner.repr == Repr::Char));
        assert_eq!(parsed.sm.text(crate::source::Span::new(node.loc, node.loc.offset(4))), Some("name"));
        let subscript = find_kind(&parsed, |k| matches!(k, NodeKind::Subscript));
        assert_eq!(parsed.ast.node(subscript).ty.repr, Repr::Char);
    }

    #[test]
    fn test_unknown_member_reports_error() {
        let parsed = parse_source("struct S { int a; };\nint g(struct S s) { return s.z; }\n");
        assert_eq!(parsed.diags.len(), 1);
        assert_eq!(parsed.diags[0].message, "no member named 'z' in 'struct S'");
    }

    #[test]
    fn test_call_argument_count() {
        let parsed = parse_source("int h(int, int);\nint k(void) { return h(1); }\n");
        assert_eq!(parsed.diags.len(), 1);
        assert_eq!(
            parsed.diags[0].message,
            "too few arguments to function call, expected 2, have 1"
        );
    }

    #[test]
    fn test_cast_and_sizeof_expression() {
        let parsed = parse_source("typedef unsigned long size;\nsize n = (size)sizeof(int) + sizeof n;\n");
        assert!(parsed.diags.is_empty());
        let cast = find_kind(&parsed, |k| matches!(k, NodeKind::Cast));
        let children = parsed.ast.children(cast);
        assert!(matches!(parsed.ast.node(children[0]).kind, NodeKind::TypeRef { .. }));
        assert!(matches!(parsed.ast.node(cast).ty.repr, Repr::Typedef(_)));
        let traits = parsed
            .ast
            .ids()
            .filter(|id| matches!(parsed.ast.node(*id).kind, NodeKind::TypeTrait(TraitKind::SizeOf, _)))
            .count();
        assert_eq!(traits, 2);
    }

    #[test]
    fn test_string_concatenation() {
        let parsed = parse_source("const char *s = \"ab\" \"cd\";");
        let lit = find_kind(&parsed, |k| matches!(k, NodeKind::StringLiteral(_)));
        assert_eq!(parsed.ast.node(lit).kind, NodeKind::StringLiteral("abcd".to_string()));
        assert_eq!(parsed.ast.node(lit).ty, Type::new(Repr::Char).with_array(Some(5)));
    }

    /// Messages reported for `source`, parsed on a worker with room for the
    /// deepest nesting the parser accepts.
    fn messages_of_deep(source: String) -> Vec<String> {
        crate::thread::execute_on_thread(64 << 20, move || {
            let parsed = parse_source(&source);
            parsed.diags.into_iter().map(|d| d.message).collect()
        })
        .unwrap()
    }

    const NESTING_ERROR: &str = "bracket nesting level exceeded maximum of 256";

    #[test]
    fn test_deep_parentheses_stop_at_nesting_limit() {
        let source = format!("int x = {}1{};\nint y;\n", "(".repeat(20_000), ")".repeat(20_000));
        let messages = messages_of_deep(source);
        assert_eq!(messages, vec![NESTING_ERROR.to_string()]);
    }

    #[test]
    fn test_parentheses_below_nesting_limit() {
        let source = format!("int x = {}1{};\n", "(".repeat(200), ")".repeat(200));
        assert!(messages_of_deep(source).is_empty());
    }

    #[test]
    fn test_deep_unary_chain_stops_at_nesting_limit() {
        let source = format!("int z = {}1;\n", "- ".repeat(20_000));
        let messages = messages_of_deep(source);
        assert_eq!(messages, vec![NESTING_ERROR.to_string()]);
    }

    #[test]
    fn test_deep_blocks_stop_at_nesting_limit() {
        let source = format!("void f(void) {{ {}{} }}\n", "{".repeat(20_000), "}".repeat(20_000));
        let messages = messages_of_deep(source);
        assert!(messages.iter().any(|m| m == NESTING_ERROR));
    }
}
