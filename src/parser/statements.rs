//! Statement parsing implementation
//!
//! This module handles parsing of all C statement types:
//!
//! - Declarations inside blocks: `int x = 42;`
//! - Control flow: `if`, `while`, `for`, `do-while`, `switch`, `case`, `default`
//! - Jump statements: `return`, `break`, `continue`, `goto`
//! - Labels and compound statements
//! - Expression statements: function calls, assignments
//!
//! # Grammar
//!
//! ```text
//! statement ::= decl_stmt | if_stmt | while_stmt | for_stmt
//!             | do_while_stmt | switch_stmt | case_stmt | default_stmt
//!             | return_stmt | break_stmt | continue_stmt | goto_stmt
//!             | label_stmt | compound_stmt | expr_stmt | ";"
//! ```
//!
//! All parsing methods are implemented as `pub(crate)` methods on the [`Parser`] struct.

use crate::diagnostics::Category;
use crate::parser::ast::*;
use crate::parser::declarations::DeclContext;
use crate::parser::lexer::TokenKind;
use crate::parser::parse::{ParseError, Parser};
use crate::parser::sema::{eval_const, ScopeKind};
use crate::source::Loc;

impl Parser<'_> {
    /// Parse `{ ... }` under `parent`. Function bodies share the scope of the
    /// parameters, so they pass `new_scope = false`.
    pub(crate) fn parse_compound_statement(&mut self, parent: NodeId, new_scope: bool) -> Result<NodeId, ParseError> {
        let start = self.position;
        let loc = self.expect_token(&TokenKind::LBrace, "expected '{'")?.loc;
        let id = self.add_node(NodeKind::Compound, start, loc, parent);
        if new_scope {
            self.push_scope(ScopeKind::Block);
        }

        while !self.check(&TokenKind::RBrace) && !self.is_at_end() {
            let statement_start = self.position;
            if let Err(err) = self.parse_statement(id) {
                self.report(err);
                self.recover(statement_start);
            }
        }

        if new_scope {
            self.pop_scope();
        }
        self.expect_token(&TokenKind::RBrace, "expected '}'")?;
        self.close_node(id);
        Ok(id)
    }

    /// Parse a statement
    pub(crate) fn parse_statement(&mut self, parent: NodeId) -> Result<NodeId, ParseError> {
        self.nested(|p| p.parse_statement_at_depth(parent))
    }

    fn parse_statement_at_depth(&mut self, parent: NodeId) -> Result<NodeId, ParseError> {
        let start = self.position;
        let loc = self.current_loc();

        match self.peek().kind {
            TokenKind::LBrace => return self.parse_compound_statement(parent, true),
            TokenKind::If => return self.parse_if_statement(parent),
            TokenKind::While => return self.parse_while_statement(parent),
            TokenKind::Do => return self.parse_do_while_statement(parent),
            TokenKind::For => return self.parse_for_statement(parent),
            TokenKind::Switch => return self.parse_switch_statement(parent),
            TokenKind::Case => return self.parse_case_statement(parent),
            TokenKind::Default => {
                self.advance();
                let id = self.add_node(NodeKind::Default, start, loc, parent);
                self.expect_token(&TokenKind::Colon, "expected ':' after 'default'")?;
                self.parse_statement(id)?;
                self.close_node(id);
                return Ok(id);
            }
            TokenKind::Return => {
                self.advance();
                let id = self.add_node(NodeKind::Return, start, loc, parent);
                if !self.check(&TokenKind::Semicolon) {
                    self.parse_expression(id)?;
                    self.close_node(id);
                }
                self.expect_semicolon("after return statement")?;
                return Ok(id);
            }
            TokenKind::Break => {
                self.advance();
                let id = self.add_node(NodeKind::Break, start, loc, parent);
                self.expect_semicolon("after 'break'")?;
                return Ok(id);
            }
            TokenKind::Continue => {
                self.advance();
                let id = self.add_node(NodeKind::Continue, start, loc, parent);
                self.expect_semicolon("after 'continue'")?;
                return Ok(id);
            }
            TokenKind::Goto => {
                self.advance();
                let (label, _) = self.expect_identifier()?;
                let id = self.add_node(NodeKind::Goto { label, target: None }, start, loc, parent);
                if let Some(scope) = self.function_scope() {
                    scope.pending_gotos.push(id);
                }
                self.expect_semicolon("after 'goto'")?;
                return Ok(id);
            }
            TokenKind::Semicolon => {
                self.advance();
                return Ok(self.add_node(NodeKind::Null, start, loc, parent));
            }
            _ => {}
        }

        // Label: identifier followed by colon
        if let TokenKind::Ident(name) = &self.peek().kind {
            if self.peek_ahead(1).is_some_and(|t| t.is(&TokenKind::Colon)) {
                let name = name.clone();
                self.advance();
                self.advance();
                return self.parse_label_statement(name, start, loc, parent);
            }
        }

        if self.starts_declaration() {
            let id = self.add_node(NodeKind::DeclStmt, start, loc, parent);
            self.parse_declaration(id, DeclContext::Block)?;
            self.close_node(id);
            return Ok(id);
        }

        let expr = self.parse_expression(parent)?;
        self.expect_semicolon("after expression")?;
        Ok(expr)
    }

    fn parse_label_statement(&mut self, name: String, start: usize, loc: Loc, parent: NodeId) -> Result<NodeId, ParseError> {
        let id = self.add_node(NodeKind::Label { name: name.clone() }, start, loc, parent);
        let previous = self
            .function_scope()
            .and_then(|scope| match scope.labels.get(&name) {
                Some(prev) => Some(*prev),
                None => {
                    scope.labels.insert(name.clone(), id);
                    None
                }
            });
        if let Some(prev) = previous {
            let prev_loc = self.ast.node(prev).loc;
            self.diags
                .error(Category::Semantic, loc, format!("redefinition of label '{}'", name))
                .note(prev_loc, "previous definition is here");
        }
        if self.check(&TokenKind::RBrace) {
            return Err(self.error_here("label at end of compound statement: expected statement"));
        }
        self.parse_statement(id)?;
        self.close_node(id);
        Ok(id)
    }

    /// Parse `(` expression `)` after a control keyword.
    fn parse_condition(&mut self, parent: NodeId, keyword: &str) -> Result<NodeId, ParseError> {
        self.expect_token(&TokenKind::LParen, &format!("expected '(' after '{}'", keyword))?;
        let cond = self.parse_expression(parent)?;
        self.expect_rparen()?;
        Ok(cond)
    }

    /// Parse if statement: if (condition) then_stmt [else else_stmt]
    fn parse_if_statement(&mut self, parent: NodeId) -> Result<NodeId, ParseError> {
        let start = self.position;
        let loc = self.advance().loc;
        let id = self.add_node(NodeKind::If, start, loc, parent);
        self.parse_condition(id, "if")?;
        self.parse_statement(id)?;
        if self.match_token(&TokenKind::Else) {
            self.parse_statement(id)?;
        }
        self.close_node(id);
        Ok(id)
    }

    /// Parse while statement: while (condition) body
    fn parse_while_statement(&mut self, parent: NodeId) -> Result<NodeId, ParseError> {
        let start = self.position;
        let loc = self.advance().loc;
        let id = self.add_node(NodeKind::While, start, loc, parent);
        self.parse_condition(id, "while")?;
        self.parse_statement(id)?;
        self.close_node(id);
        Ok(id)
    }

    /// Parse do-while statement: do body while (condition);
    fn parse_do_while_statement(&mut self, parent: NodeId) -> Result<NodeId, ParseError> {
        let start = self.position;
        let loc = self.advance().loc;
        let id = self.add_node(NodeKind::Do, start, loc, parent);
        self.parse_statement(id)?;
        self.expect_token(&TokenKind::While, "expected 'while' in do/while loop")?;
        self.parse_condition(id, "while")?;
        self.close_node(id);
        self.expect_semicolon("after do/while statement")?;
        Ok(id)
    }

    /// Parse for statement: for (init; condition; increment) body
    fn parse_for_statement(&mut self, parent: NodeId) -> Result<NodeId, ParseError> {
        let start = self.position;
        let loc = self.advance().loc;
        let id = self.add_node(NodeKind::For, start, loc, parent);
        self.push_scope(ScopeKind::Block);
        let result = self.parse_for_clauses(id);
        self.pop_scope();
        result?;
        self.close_node(id);
        Ok(id)
    }

    fn parse_for_clauses(&mut self, id: NodeId) -> Result<(), ParseError> {
        self.expect_token(&TokenKind::LParen, "expected '(' after 'for'")?;

        if self.starts_declaration() {
            let start = self.position;
            let loc = self.current_loc();
            let decl = self.add_node(NodeKind::DeclStmt, start, loc, id);
            self.parse_declaration(decl, DeclContext::Block)?;
            self.close_node(decl);
        } else {
            if !self.check(&TokenKind::Semicolon) {
                self.parse_expression(id)?;
            }
            self.expect_semicolon("in 'for' statement specifier")?;
        }

        if !self.check(&TokenKind::Semicolon) {
            self.parse_expression(id)?;
        }
        self.expect_semicolon("in 'for' statement specifier")?;

        if !self.check(&TokenKind::RParen) {
            self.parse_expression(id)?;
        }
        self.expect_rparen()?;
        self.parse_statement(id)?;
        Ok(())
    }

    /// Parse switch statement: switch (expr) body
    fn parse_switch_statement(&mut self, parent: NodeId) -> Result<NodeId, ParseError> {
        let start = self.position;
        let loc = self.advance().loc;
        let id = self.add_node(NodeKind::Switch, start, loc, parent);
        self.parse_condition(id, "switch")?;
        self.parse_statement(id)?;
        self.close_node(id);
        Ok(id)
    }

    /// Parse `case constant: statement`.
    fn parse_case_statement(&mut self, parent: NodeId) -> Result<NodeId, ParseError> {
        let start = self.position;
        let loc = self.advance().loc;
        let id = self.add_node(NodeKind::Case, start, loc, parent);
        let value = self.parse_conditional(id)?;
        if eval_const(&self.ast, value).is_none() {
            let value_loc = self.ast.node(value).loc;
            self.diags.error(
                Category::Semantic,
                value_loc,
                "expression is not an integer constant expression",
            );
        }
        self.expect_token(&TokenKind::Colon, "expected ':' after 'case'")?;
        self.parse_statement(id)?;
        self.close_node(id);
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use crate::parser::ast::*;
    use crate::parser::parse::tests::parse_source;

    fn body(parsed: &crate::parser::parse::tests::Parsed) -> NodeId {
        let function = parsed.ast.children(NodeId::ROOT)[0];
        *parsed.ast.children(function).last().unwrap()
    }

    #[test]
    fn test_control_flow_children() {
        let parsed = parse_source(
            "int f(int n) {\n  int s = 0;\n  for (int i = 0; i < n; i++) { s += i; }\n  while (n) n--;\n  if (s) return s; else return 0;\n}\n",
        );
        assert!(parsed.diags.is_empty());
        let kinds: Vec<_> = parsed
            .ast
            .children(body(&parsed))
            .iter()
            .map(|c| parsed.ast.node(*c).kind.clone())
            .collect();
        assert_eq!(kinds, vec![NodeKind::DeclStmt, NodeKind::For, NodeKind::While, NodeKind::If]);
    }

    #[test]
    fn test_switch_cases() {
        let parsed = parse_source("void f(int x) { switch (x) { case 1: break; default: break; } }");
        assert!(parsed.diags.is_empty());
        let switch = parsed.ast.children(body(&parsed))[0];
        assert!(matches!(parsed.ast.node(switch).kind, NodeKind::Switch));
        let cases = parsed.ast.children(parsed.ast.children(switch)[1]);
        assert!(matches!(parsed.ast.node(cases[0]).kind, NodeKind::Case));
        assert!(matches!(parsed.ast.node(cases[1]).kind, NodeKind::Default));
    }

    #[test]
    fn test_statement_recovery_inside_body() {
        let parsed = parse_source("void f(void) { int a = ; a = 1; }");
        assert_eq!(parsed.diags.len(), 1);
        let children = parsed.ast.children(body(&parsed));
        assert_eq!(children.len(), 2);
    }

    #[test]
    fn test_undeclared_label() {
        let parsed = parse_source("void f(void) { goto missing; }");
        assert_eq!(parsed.diags.len(), 1);
        assert_eq!(parsed.diags[0].message, "use of undeclared label 'missing'");
    }
}
