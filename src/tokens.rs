//! Raw tokens of a source range
//!
//! Tokens are produced by lexing the file text again rather than by replaying
//! the preprocessed stream, so they show exactly what was written: directives,
//! macro names and comments included.

use crate::cursor::Cursor;
use crate::parser::lexer::{self, Lexer};
use crate::source::{Loc, SourceLocation, SourceManager, SourceRange, Span};
use crate::unit::TranslationUnit;
use std::fmt;
use std::ptr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Punctuation,
    Keyword,
    Identifier,
    Literal,
    Comment,
}

impl TokenKind {
    fn of(kind: &lexer::TokenKind) -> TokenKind {
        match kind {
            lexer::TokenKind::Comment => TokenKind::Comment,
            lexer::TokenKind::Ident(_) => TokenKind::Identifier,
            k if k.is_keyword() => TokenKind::Keyword,
            k if k.is_literal() => TokenKind::Literal,
            _ => TokenKind::Punctuation,
        }
    }
}

/// One token of a translation unit's source text.
#[derive(Clone, Copy)]
pub struct Token<'tu> {
    kind: TokenKind,
    span: Span,
    sm: &'tu SourceManager,
}

impl<'tu> Token<'tu> {
    pub fn kind(&self) -> TokenKind {
        self.kind
    }

    pub fn spelling(&self) -> &'tu str {
        self.sm.text(self.span).unwrap_or_default()
    }

    pub fn location(&self) -> SourceLocation<'tu> {
        SourceLocation::new(self.sm, self.span.begin)
    }

    pub fn extent(&self) -> SourceRange<'tu> {
        SourceRange::from_span(self.sm, self.span)
    }
}

impl PartialEq for Token<'_> {
    fn eq(&self, other: &Self) -> bool {
        ptr::eq(self.sm, other.sm) && self.kind == other.kind && self.span == other.span
    }
}

impl Eq for Token<'_> {}

impl fmt::Debug for Token<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Token({:?} '{}')", self.kind, self.spelling())
    }
}

impl TranslationUnit {
    /// Tokens that start inside `range`. The range must lie in one file of
    /// this unit; anything else yields no tokens.
    pub fn tokenize(&self, range: SourceRange<'_>) -> Vec<Token<'_>> {
        let same_unit = range
            .begin()
            .manager()
            .is_some_and(|sm| ptr::eq(sm, &self.sm));
        if !same_unit {
            return Vec::new();
        }
        let span = self.sm.expansion_span(range.span());
        let (Some((file, begin)), Some((end_file, end))) =
            (self.sm.decompose(span.begin), self.sm.decompose(span.end))
        else {
            return Vec::new();
        };
        if file != end_file || end < begin {
            tracing::debug!("token range spans more than one file");
            return Vec::new();
        }

        let mut lexer = Lexer::new(self.sm.file(file).contents.clone(), Loc::INVALID).with_comments();
        lexer.seek(begin as usize);
        let mut tokens = Vec::new();
        loop {
            let token = lexer.next_token();
            if matches!(token.kind, lexer::TokenKind::Eof) {
                break;
            }
            let offset = (lexer.offset() as u32).saturating_sub(token.len);
            if offset >= end {
                break;
            }
            // a file is mapped in pieces split at its includes
            let start = self.sm.loc_for_offset(file, offset);
            tokens.push(Token {
                kind: TokenKind::of(&token.kind),
                span: Span::new(start, start.offset(token.len)),
                sm: &self.sm,
            });
        }
        tokens
    }

    /// The most specific cursor covering each token.
    pub fn annotate_tokens(&self, tokens: &[Token<'_>]) -> Vec<Cursor<'_>> {
        tokens
            .iter()
            .map(|token| {
                if ptr::eq(token.sm, &self.sm) {
                    self.cursor_at_loc(token.span.begin)
                } else {
                    Cursor::null()
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cursor::CursorKind;
    use crate::unit::tests::parse_unit;

    #[test]
    fn test_token_kinds() {
        let tu = parse_unit("int x = 42; // hi\n");
        let tokens = tu.tokenize(tu.main_file_range());
        let kinds: Vec<_> = tokens.iter().map(|t| t.kind()).collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::Keyword,
                TokenKind::Identifier,
                TokenKind::Punctuation,
                TokenKind::Literal,
                TokenKind::Punctuation,
                TokenKind::Comment,
            ]
        );
        let spellings: Vec<_> = tokens.iter().map(|t| t.spelling()).collect();
        assert_eq!(spellings, vec!["int", "x", "=", "42", ";", "// hi"]);
        let at = tokens[3].location().expansion();
        assert_eq!((at.line, at.column), (1, 9));
    }

    #[test]
    fn test_directives_are_tokenized() {
        let tu = parse_unit("#define N 1\nint a[N];\n");
        let spellings: Vec<_> = tu
            .tokenize(tu.main_file_range())
            .iter()
            .map(|t| t.spelling())
            .collect();
        assert_eq!(spellings[..4], ["#", "define", "N", "1"]);
        assert_eq!(spellings.len(), 10);
    }

    #[test]
    fn test_tokenize_cursor_extent() {
        let tu = parse_unit("int a;\nint sum(int x, int y) { return x + y; }\n");
        let sum = tu.cursor().children()[1];
        let tokens = tu.tokenize(sum.extent());
        assert_eq!(tokens.first().map(|t| t.spelling()), Some("int"));
        assert_eq!(tokens.last().map(|t| t.spelling()), Some("}"));
        assert_eq!(tokens.len(), 16);
    }

    #[test]
    fn test_annotate_tokens() {
        let tu = parse_unit("struct P { int x; };\nstruct P p;\n");
        let file = tu.file("t.c").unwrap();
        let line_two = SourceRange::new(tu.location(file, 2, 1), tu.location(file, 2, 11));
        let tokens = tu.tokenize(line_two);
        let kinds: Vec<_> = tu.annotate_tokens(&tokens).iter().map(|c| c.kind()).collect();
        assert_eq!(
            kinds,
            vec![CursorKind::VarDecl, CursorKind::TypeRef, CursorKind::VarDecl]
        );
    }

    #[test]
    fn test_null_range_has_no_tokens() {
        let tu = parse_unit("int a;\n");
        assert!(tu.tokenize(SourceRange::null()).is_empty());
    }

    #[test]
    fn test_range_starting_inside_a_character() {
        let tu = parse_unit("int x; // \u{e9}\nint y;\n");
        let file = tu.file("t.c").unwrap();
        let range = SourceRange::new(tu.location_for_offset(file, 11), tu.location_for_offset(file, 19));
        let spellings: Vec<_> = tu.tokenize(range).iter().map(|t| t.spelling()).collect();
        assert_eq!(spellings, vec!["\u{e9}", "int", "y", ";"]);
    }
}
