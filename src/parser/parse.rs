//! Main parser coordinator
//!
//! This module provides the [`Parser`] struct and core parsing infrastructure,
//! including the error type, token helpers, error recovery and the main parse
//! entry point.
//!
//! # Parser Architecture
//!
//! The Parser uses a recursive descent approach with the following organization:
//! - This module: Parser struct, helper methods, and coordination
//! - `declarations`: declaration specifiers, declarators, records, enums, functions
//! - `statements`: parsing statements (if, while, for, etc.)
//! - `expressions`: parsing expressions with precedence climbing
//! - `sema`: scopes, name lookup, redeclarations and expression types
//!
//! # Implementation
//!
//! Parser methods are split across multiple files using `impl Parser` blocks,
//! allowing each module to extend the Parser with related functionality while
//! maintaining access to the shared parser state.
//!
//! Errors never abort the unit. A failing declaration or statement is turned into
//! a diagnostic and the parser skips ahead to a plausible restart point.

use crate::diagnostics::{Category, DiagnosticsEngine};
use crate::parser::ast::*;
use crate::parser::lexer::{Token, TokenKind};
use crate::parser::preprocessor::COMPLETION_SENTINEL;
use crate::parser::sema::{CompletionContext, Scope, ScopeKind};
use crate::source::{FileId, Loc, SourceManager, Span};
use rustc_hash::FxHashSet;
use thiserror::Error;

/// Parser error type
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct ParseError {
    pub message: String,
    pub loc: Loc,
}

impl ParseError {
    pub fn new(message: impl Into<String>, loc: Loc) -> Self {
        ParseError {
            message: message.into(),
            loc,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ParserOptions {
    pub skip_function_bodies: bool,
    /// Bodies to skip, keyed by file name and offset of the opening brace.
    pub skip_bodies_at: FxHashSet<(String, u32)>,
}

/// Everything the parser produces besides diagnostics.
#[derive(Debug)]
pub struct ParseOutput {
    pub ast: Ast,
    pub completion: Option<CompletionContext>,
}

/// Deepest nesting of brackets, statements and initializer lists the parser
/// accepts.
pub const MAX_NESTING_DEPTH: u32 = 256;

/// Recursive descent parser for C
pub struct Parser<'a> {
    pub(crate) tokens: Vec<Token>,
    pub(crate) position: usize,
    pub(crate) ast: Ast,
    pub(crate) sm: &'a SourceManager,
    pub(crate) diags: &'a mut DiagnosticsEngine,
    pub(crate) options: ParserOptions,
    pub(crate) pch_files: FxHashSet<FileId>,
    pub(crate) scopes: Vec<Scope>,
    /// Function whose body is being parsed.
    pub(crate) function: Option<NodeId>,
    pub(crate) completion: Option<CompletionContext>,
    /// Current nesting, bounded by [`MAX_NESTING_DEPTH`].
    pub(crate) depth: u32,
}

impl<'a> Parser<'a> {
    pub fn new(
        tokens: Vec<Token>,
        sm: &'a SourceManager,
        diags: &'a mut DiagnosticsEngine,
        options: ParserOptions,
        pch_files: FxHashSet<FileId>,
    ) -> Self {
        let mut tokens = tokens;
        if !tokens.last().is_some_and(|t| matches!(t.kind, TokenKind::Eof)) {
            let end = tokens.last().map_or(Loc::INVALID, Token::end);
            tokens.push(Token::new(TokenKind::Eof, end, 0));
        }
        Parser {
            tokens,
            position: 0,
            ast: Ast::new(),
            sm,
            diags,
            options,
            pch_files,
            scopes: vec![Scope::new(ScopeKind::File)],
            function: None,
            completion: None,
            depth: 0,
        }
    }

    /// Parse the entire translation unit.
    pub fn parse_translation_unit(mut self) -> ParseOutput {
        while !self.is_at_end() && !self.completion_reached() {
            let start = self.position;
            if let Err(err) = self.parse_external_declaration() {
                self.report(err);
                self.recover(start);
            }
        }
        self.finish_tentative_definitions();

        let root_span = match (self.tokens.first(), self.tokens.last()) {
            (Some(first), Some(last)) => Span::new(first.loc, last.loc),
            _ => Span::default(),
        };
        self.ast.node_mut(NodeId::ROOT).span = root_span;
        tracing::debug!(nodes = self.ast.len(), tokens = self.tokens.len(), "parsing finished");
        ParseOutput {
            ast: self.ast,
            completion: self.completion,
        }
    }

    // ===== Error handling =====

    pub(crate) fn report(&mut self, err: ParseError) {
        if self.completion_reached() {
            return;
        }
        self.diags.error(Category::Parse, err.loc, err.message);
    }

    /// Run `parse` one nesting level deeper. Past [`MAX_NESTING_DEPTH`] the
    /// construct is rejected and the caller recovers at the enclosing level.
    pub(crate) fn nested<T>(
        &mut self,
        parse: impl FnOnce(&mut Self) -> Result<T, ParseError>,
    ) -> Result<T, ParseError> {
        if self.depth >= MAX_NESTING_DEPTH {
            return Err(ParseError::new(
                format!("bracket nesting level exceeded maximum of {}", MAX_NESTING_DEPTH),
                self.current_loc(),
            ));
        }
        self.depth += 1;
        let result = parse(self);
        self.depth -= 1;
        result
    }

    /// Skip to the end of the current declaration or statement. Always makes
    /// progress.
    pub(crate) fn recover(&mut self, start: usize) {
        if self.position == start {
            self.advance();
        }
        let mut depth = 0usize;
        while !self.is_at_end() {
            match self.peek().kind {
                TokenKind::Semicolon if depth == 0 => {
                    self.advance();
                    return;
                }
                TokenKind::LBrace => depth += 1,
                TokenKind::RBrace if depth == 0 => return,
                TokenKind::RBrace => {
                    depth -= 1;
                    if depth == 0 {
                        self.advance();
                        if self.check(&TokenKind::Semicolon) {
                            self.advance();
                        }
                        return;
                    }
                }
                _ => {}
            }
            self.advance();
        }
    }

    pub(crate) fn completion_reached(&self) -> bool {
        self.completion.is_some()
    }

    pub(crate) fn at_completion_point(&self) -> bool {
        self.peek().ident() == Some(COMPLETION_SENTINEL)
    }

    // ===== Helper methods =====

    pub(crate) fn match_token(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    pub(crate) fn check(&self, kind: &TokenKind) -> bool {
        self.peek().is(kind)
    }

    pub(crate) fn advance(&mut self) -> &Token {
        if !self.is_at_end() {
            self.position += 1;
        }
        self.previous()
    }

    pub(crate) fn is_at_end(&self) -> bool {
        matches!(self.peek().kind, TokenKind::Eof)
    }

    pub(crate) fn peek(&self) -> &Token {
        let last = self.tokens.len() - 1;
        &self.tokens[self.position.min(last)]
    }

    pub(crate) fn peek_ahead(&self, n: usize) -> Option<&Token> {
        self.tokens.get(self.position + n)
    }

    pub(crate) fn previous(&self) -> &Token {
        &self.tokens[self.position.saturating_sub(1)]
    }

    pub(crate) fn current_loc(&self) -> Loc {
        self.peek().loc
    }

    /// Span from the token at `start` to the end of the last consumed token.
    pub(crate) fn span_from(&self, start: usize) -> Span {
        let begin = self.tokens[start.min(self.tokens.len() - 1)].loc;
        let end = if self.position > start {
            self.previous().end()
        } else {
            begin
        };
        Span::new(begin, end)
    }

    pub(crate) fn expect_token(&mut self, kind: &TokenKind, message: &str) -> Result<Token, ParseError> {
        if self.check(kind) {
            Ok(self.advance().clone())
        } else {
            Err(self.error_here(message))
        }
    }

    pub(crate) fn expect_semicolon(&mut self, ctx: &str) -> Result<(), ParseError> {
        self.expect_token(&TokenKind::Semicolon, &format!("expected ';' {ctx}"))?;
        Ok(())
    }

    pub(crate) fn expect_rparen(&mut self) -> Result<(), ParseError> {
        self.expect_token(&TokenKind::RParen, "expected ')'")?;
        Ok(())
    }

    pub(crate) fn expect_identifier(&mut self) -> Result<(String, Loc), ParseError> {
        match &self.peek().kind {
            TokenKind::Ident(name) => {
                let name = name.clone();
                let loc = self.advance().loc;
                Ok((name, loc))
            }
            _ => Err(self.error_here("expected identifier")),
        }
    }

    pub(crate) fn error_here(&self, message: &str) -> ParseError {
        let token = self.peek();
        let found = if matches!(token.kind, TokenKind::Eof) {
            "end of input".to_string()
        } else {
            token.kind.to_string()
        };
        ParseError::new(format!("{}, found {}", message, found), token.loc)
    }

    /// Whether `loc` comes from a file imported through an AST file.
    pub(crate) fn is_from_pch(&self, loc: Loc) -> bool {
        if self.pch_files.is_empty() {
            return false;
        }
        self.sm
            .decompose(self.sm.expansion_loc(loc))
            .is_some_and(|(file, _)| self.pch_files.contains(&file))
    }

    /// Create a node spanning `start..` the last consumed token.
    pub(crate) fn add_node(&mut self, kind: NodeKind, start: usize, loc: Loc, parent: NodeId) -> NodeId {
        let span = self.span_from(start);
        let id = self.ast.add(kind, span, loc, parent, start as u32);
        if self.is_from_pch(span.begin) {
            self.ast.node_mut(id).from_pch = true;
        }
        id
    }

    /// Extend a node's span to the last consumed token.
    pub(crate) fn close_node(&mut self, id: NodeId) {
        if self.position == 0 {
            return;
        }
        let end = self.previous().end();
        self.ast.node_mut(id).span.end = end;
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::diagnostics::StoredDiagnostic;
    use crate::parser::preprocessor::{FileSystem, HeaderSearch, Preprocessor, PreprocessorOptions};
    use std::sync::Arc;

    pub(crate) struct Parsed {
        pub sm: SourceManager,
        pub ast: Ast,
        pub diags: Vec<StoredDiagnostic>,
    }

    pub(crate) fn parse_source(source: &str) -> Parsed {
        let fs = FileSystem::new();
        let search = HeaderSearch::default();
        let mut sm = SourceManager::new();
        let mut diags = DiagnosticsEngine::default();
        let main = sm.add_file("t.c", Arc::from(source), None, None, false);
        let out = {
            let mut pp = Preprocessor::new(&mut sm, &mut diags, &fs, &search, PreprocessorOptions::default());
            pp.enter_main_file(main);
            pp.run()
        };
        let parsed = Parser::new(out.tokens, &sm, &mut diags, ParserOptions::default(), FxHashSet::default())
            .parse_translation_unit();
        Parsed {
            ast: parsed.ast,
            diags: diags.into_diagnostics(),
            sm,
        }
    }

    pub(crate) fn top_level(parsed: &Parsed) -> Vec<&NodeKind> {
        parsed
            .ast
            .children(NodeId::ROOT)
            .iter()
            .map(|id| &parsed.ast.node(*id).kind)
            .collect()
    }

    #[test]
    fn test_parse_simple_function() {
        let parsed = parse_source("int main() { return 0; }");
        assert!(parsed.diags.is_empty());
        let decls = top_level(&parsed);
        assert_eq!(decls.len(), 1);
        match decls[0] {
            NodeKind::Function { name, body, .. } => {
                assert_eq!(name, "main");
                assert_eq!(*body, Body::Parsed);
            }
            other => panic!("expected function definition, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_struct() {
        let parsed = parse_source("struct Point { int x; int y; };");
        let root = parsed.ast.children(NodeId::ROOT);
        assert_eq!(root.len(), 1);
        assert!(matches!(
            &parsed.ast.node(root[0]).kind,
            NodeKind::Record { name, complete: true, .. } if name == "Point"
        ));
        assert_eq!(parsed.ast.children(root[0]).len(), 2);
    }

    #[test]
    fn test_error_recovery_keeps_going() {
        let parsed = parse_source("int a = ;\nint b;\nint c = 1 +;\nint d;\n");
        assert_eq!(parsed.diags.len(), 2);
        let names: Vec<_> = parsed
            .ast
            .children(NodeId::ROOT)
            .iter()
            .map(|id| parsed.ast.name(*id).to_string())
            .collect();
        assert!(names.contains(&"b".to_string()));
        assert!(names.contains(&"d".to_string()));
    }

    #[test]
    fn test_spans_cover_declaration() {
        let parsed = parse_source("int x = 42;");
        let id = parsed.ast.children(NodeId::ROOT)[0];
        let node = parsed.ast.node(id);
        assert_eq!(parsed.sm.text(node.span), Some("int x = 42"));
        assert_eq!(parsed.sm.text(Span::new(node.loc, node.loc.offset(1))), Some("x"));
    }
}
