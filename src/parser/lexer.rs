//! Lexer (tokenizer) for C source code
//!
//! Converts raw source text into [`Token`]s on demand. The lexer knows nothing
//! about directives or macros: the preprocessor pulls tokens from it and uses the
//! `at_line_start` flag to find directive lines. Every token records a raw
//! [`Loc`] computed from the base location of the buffer being lexed, so tokens
//! from any file slot map straight back into the source manager.
//!
//! Malformed input never stops the lexer. Problems are collected as
//! [`LexError`]s and the best-effort token is still produced.

use crate::source::{floor_char_boundary, Loc};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// All token kinds produced by the lexer.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // Literals
    IntLiteral(u64),
    FloatLiteral(f64),
    CharLiteral(i64),
    StringLiteral(String),

    // Identifiers
    Ident(String),

    // Keywords
    Auto,
    Bool,
    Break,
    Case,
    Char,
    Const,
    Continue,
    Default,
    Do,
    Double,
    Else,
    Enum,
    Extern,
    Float,
    For,
    Goto,
    If,
    Inline,
    Int,
    Long,
    Register,
    Restrict,
    Return,
    Short,
    Signed,
    Sizeof,
    Alignof,
    Static,
    Struct,
    Switch,
    Typedef,
    Union,
    Unsigned,
    Void,
    Volatile,
    While,
    Attribute,

    // Arithmetic
    Plus,    // +
    Minus,   // -
    Star,    // *
    Slash,   // /
    Percent, // %

    // Comparison
    EqEq,  // ==
    NotEq, // !=
    Lt,    // <
    Le,    // <=
    Gt,    // >
    Ge,    // >=

    // Logical
    AndAnd, // &&
    OrOr,   // ||
    Bang,   // !

    // Bitwise
    Amp,   // &
    Pipe,  // |
    Caret, // ^
    Tilde, // ~
    LtLt,  // <<
    GtGt,  // >>

    // Assignment
    Eq,        // =
    PlusEq,    // +=
    MinusEq,   // -=
    StarEq,    // *=
    SlashEq,   // /=
    PercentEq, // %=
    AmpEq,     // &=
    PipeEq,    // |=
    CaretEq,   // ^=
    LtLtEq,    // <<=
    GtGtEq,    // >>=

    // Increment/Decrement
    PlusPlus,   // ++
    MinusMinus, // --

    // Member access
    Dot,   // .
    Arrow, // ->

    Ellipsis, // ...

    // Ternary
    Question, // ?
    Colon,    // :

    // Punctuation
    LParen,    // (
    RParen,    // )
    LBrace,    // {
    RBrace,    // }
    LBracket,  // [
    RBracket,  // ]
    Semicolon, // ;
    Comma,     // ,

    // Preprocessor punctuation
    Hash,     // #
    HashHash, // ##

    /// `<name>` after `#include`; only produced by [`Lexer::lex_header_name`].
    HeaderName(String),
    /// Only produced when comment retention is on.
    Comment,
    Unknown(char),

    Eof,
}

impl TokenKind {
    pub fn keyword(ident: &str) -> Option<TokenKind> {
        let kind = match ident {
            "auto" => TokenKind::Auto,
            "_Bool" => TokenKind::Bool,
            "break" => TokenKind::Break,
            "case" => TokenKind::Case,
            "char" => TokenKind::Char,
            "const" | "__const" | "__const__" => TokenKind::Const,
            "continue" => TokenKind::Continue,
            "default" => TokenKind::Default,
            "do" => TokenKind::Do,
            "double" => TokenKind::Double,
            "else" => TokenKind::Else,
            "enum" => TokenKind::Enum,
            "extern" => TokenKind::Extern,
            "float" => TokenKind::Float,
            "for" => TokenKind::For,
            "goto" => TokenKind::Goto,
            "if" => TokenKind::If,
            "inline" | "__inline" | "__inline__" => TokenKind::Inline,
            "int" => TokenKind::Int,
            "long" => TokenKind::Long,
            "register" => TokenKind::Register,
            "restrict" | "__restrict" | "__restrict__" => TokenKind::Restrict,
            "return" => TokenKind::Return,
            "short" => TokenKind::Short,
            "signed" | "__signed" | "__signed__" => TokenKind::Signed,
            "sizeof" => TokenKind::Sizeof,
            "_Alignof" | "__alignof__" => TokenKind::Alignof,
            "static" => TokenKind::Static,
            "struct" => TokenKind::Struct,
            "switch" => TokenKind::Switch,
            "typedef" => TokenKind::Typedef,
            "union" => TokenKind::Union,
            "unsigned" => TokenKind::Unsigned,
            "void" => TokenKind::Void,
            "volatile" | "__volatile" | "__volatile__" => TokenKind::Volatile,
            "while" => TokenKind::While,
            "__attribute__" | "__attribute" => TokenKind::Attribute,
            _ => return None,
        };
        Some(kind)
    }

    pub fn is_keyword(&self) -> bool {
        use TokenKind::*;
        matches!(
            self,
            Auto | Bool
                | Break
                | Case
                | Char
                | Const
                | Continue
                | Default
                | Do
                | Double
                | Else
                | Enum
                | Extern
                | Float
                | For
                | Goto
                | If
                | Inline
                | Int
                | Long
                | Register
                | Restrict
                | Return
                | Short
                | Signed
                | Sizeof
                | Alignof
                | Static
                | Struct
                | Switch
                | Typedef
                | Union
                | Unsigned
                | Void
                | Volatile
                | While
                | Attribute
        )
    }

    pub fn is_literal(&self) -> bool {
        matches!(
            self,
            TokenKind::IntLiteral(_)
                | TokenKind::FloatLiteral(_)
                | TokenKind::CharLiteral(_)
                | TokenKind::StringLiteral(_)
                | TokenKind::HeaderName(_)
        )
    }

    pub fn is_punctuation(&self) -> bool {
        !self.is_keyword()
            && !self.is_literal()
            && !matches!(
                self,
                TokenKind::Ident(_) | TokenKind::Comment | TokenKind::Eof
            )
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use TokenKind::*;
        let text = match self {
            IntLiteral(n) => return write!(f, "integer literal {}", n),
            FloatLiteral(n) => return write!(f, "floating literal {}", n),
            CharLiteral(c) => return write!(f, "character literal {}", c),
            StringLiteral(s) => return write!(f, "string literal \"{}\"", s.escape_default()),
            Ident(s) => return write!(f, "identifier '{}'", s),
            HeaderName(s) => return write!(f, "header name <{}>", s),
            Unknown(c) => return write!(f, "'{}'", c),
            Comment => return write!(f, "comment"),
            Eof => return write!(f, "end of file"),
            Auto => "auto",
            Bool => "_Bool",
            Break => "break",
            Case => "case",
            Char => "char",
            Const => "const",
            Continue => "continue",
            Default => "default",
            Do => "do",
            Double => "double",
            Else => "else",
            Enum => "enum",
            Extern => "extern",
            Float => "float",
            For => "for",
            Goto => "goto",
            If => "if",
            Inline => "inline",
            Int => "int",
            Long => "long",
            Register => "register",
            Restrict => "restrict",
            Return => "return",
            Short => "short",
            Signed => "signed",
            Sizeof => "sizeof",
            Alignof => "_Alignof",
            Static => "static",
            Struct => "struct",
            Switch => "switch",
            Typedef => "typedef",
            Union => "union",
            Unsigned => "unsigned",
            Void => "void",
            Volatile => "volatile",
            While => "while",
            Attribute => "__attribute__",
            Plus => "+",
            Minus => "-",
            Star => "*",
            Slash => "/",
            Percent => "%",
            EqEq => "==",
            NotEq => "!=",
            Lt => "<",
            Le => "<=",
            Gt => ">",
            Ge => ">=",
            AndAnd => "&&",
            OrOr => "||",
            Bang => "!",
            Amp => "&",
            Pipe => "|",
            Caret => "^",
            Tilde => "~",
            LtLt => "<<",
            GtGt => ">>",
            Eq => "=",
            PlusEq => "+=",
            MinusEq => "-=",
            StarEq => "*=",
            SlashEq => "/=",
            PercentEq => "%=",
            AmpEq => "&=",
            PipeEq => "|=",
            CaretEq => "^=",
            LtLtEq => "<<=",
            GtGtEq => ">>=",
            PlusPlus => "++",
            MinusMinus => "--",
            Dot => ".",
            Arrow => "->",
            Ellipsis => "...",
            Question => "?",
            Colon => ":",
            LParen => "(",
            RParen => ")",
            LBrace => "{",
            RBrace => "}",
            LBracket => "[",
            RBracket => "]",
            Semicolon => ";",
            Comma => ",",
            Hash => "#",
            HashHash => "##",
        };
        write!(f, "'{}'", text)
    }
}

/// One lexed token.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub loc: Loc,
    pub len: u32,
    /// First token on its line (directive detection).
    pub at_line_start: bool,
    /// Preceded by whitespace (stringification).
    pub leading_space: bool,
    /// Painted by the preprocessor: never macro-expand this token again.
    pub no_expand: bool,
}

impl Token {
    pub fn new(kind: TokenKind, loc: Loc, len: u32) -> Self {
        Token {
            kind,
            loc,
            len,
            at_line_start: false,
            leading_space: false,
            no_expand: false,
        }
    }

    /// Location one past the last byte of the token.
    pub fn end(&self) -> Loc {
        self.loc.offset(self.len)
    }

    pub fn ident(&self) -> Option<&str> {
        match &self.kind {
            TokenKind::Ident(name) => Some(name),
            _ => None,
        }
    }

    pub fn is(&self, kind: &TokenKind) -> bool {
        std::mem::discriminant(&self.kind) == std::mem::discriminant(kind)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.kind.fmt(f)
    }
}

/// Lexer error type
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct LexError {
    pub message: String,
    pub loc: Loc,
}

/// Length in bytes of the token at the start of `text`.
pub(crate) fn token_length(text: &str) -> usize {
    let mut lexer = Lexer::new(Arc::from(text), Loc::INVALID);
    let token = lexer.next_token();
    if matches!(token.kind, TokenKind::Eof) {
        0
    } else {
        lexer.last_start + token.len as usize
    }
}

/// Lexer for C source code
pub struct Lexer {
    input: Arc<str>,
    position: usize,
    base: Loc,
    at_line_start: bool,
    keep_comments: bool,
    pub(crate) skipping: bool,
    pushed_back: Option<Token>,
    last_start: usize,
    errors: Vec<LexError>,
}

impl Lexer {
    /// Create a lexer for `input`, whose first byte lives at `base`.
    pub fn new(input: Arc<str>, base: Loc) -> Self {
        Self {
            input,
            position: 0,
            base,
            at_line_start: true,
            keep_comments: false,
            skipping: false,
            pushed_back: None,
            last_start: 0,
            errors: Vec::new(),
        }
    }

    /// Produce [`TokenKind::Comment`] tokens instead of skipping comments.
    pub fn with_comments(mut self) -> Self {
        self.keep_comments = true;
        self
    }

    /// Start lexing at byte `offset` of the buffer.
    pub fn seek(&mut self, offset: usize) {
        self.position = floor_char_boundary(&self.input, offset);
        self.pushed_back = None;
        self.at_line_start = self.position == 0
            || self.input.as_bytes()[..self.position]
                .iter()
                .rev()
                .take_while(|b| **b != b'\n')
                .all(|b| b.is_ascii_whitespace());
    }

    /// Byte offset of the next unread character.
    pub fn offset(&self) -> usize {
        match &self.pushed_back {
            Some(_) => self.last_start,
            None => self.position,
        }
    }

    pub fn take_errors(&mut self) -> Vec<LexError> {
        std::mem::take(&mut self.errors)
    }

    /// Tokenize the entire input, ending with an `Eof` token.
    pub fn tokenize(&mut self) -> Vec<Token> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token();
            let done = matches!(token.kind, TokenKind::Eof);
            tokens.push(token);
            if done {
                break;
            }
        }
        tokens
    }

    /// Return a token to the stream; the next call to `next_token` yields it.
    pub fn unget(&mut self, token: Token) {
        self.pushed_back = Some(token);
    }

    /// Get next token
    pub fn next_token(&mut self) -> Token {
        if let Some(token) = self.pushed_back.take() {
            return token;
        }

        let leading_space = self.skip_whitespace();
        let at_line_start = self.at_line_start;
        let start = self.position;
        self.last_start = start;

        let kind = match self.advance() {
            None => TokenKind::Eof,
            Some(ch) => self.lex_kind(ch, start),
        };

        let mut token = Token::new(kind, self.loc_at(start), (self.position - start) as u32);
        token.at_line_start = at_line_start;
        token.leading_space = leading_space;
        if matches!(token.kind, TokenKind::Comment) {
            // a comment does not end the "first on the line" run
            self.at_line_start = at_line_start;
        } else {
            self.at_line_start = false;
        }
        token
    }

    fn lex_kind(&mut self, ch: u8, start: usize) -> TokenKind {
        match ch {
            b'"' => self.string_literal(start),
            b'\'' => self.char_literal(start),
            b'0'..=b'9' => self.number_literal(start),
            b'.' if self.peek().is_some_and(|c| c.is_ascii_digit()) => self.number_literal(start),
            b'a'..=b'z' | b'A'..=b'Z' | b'_' | b'$' => self.identifier_or_keyword(start),
            b'/' if self.peek() == Some(b'/') => {
                self.skip_line_comment();
                TokenKind::Comment
            }
            b'/' if self.peek() == Some(b'*') => {
                self.skip_block_comment(start);
                TokenKind::Comment
            }
            _ => self.punctuation(ch, start),
        }
    }

    fn punctuation(&mut self, ch: u8, start: usize) -> TokenKind {
        use TokenKind::*;
        match ch {
            b'+' => self.pick(&[(b"+", PlusPlus), (b"=", PlusEq)], Plus),
            b'-' => self.pick(&[(b"-", MinusMinus), (b"=", MinusEq), (b">", Arrow)], Minus),
            b'*' => self.pick(&[(b"=", StarEq)], Star),
            b'/' => self.pick(&[(b"=", SlashEq)], Slash),
            b'%' => self.pick(&[(b"=", PercentEq)], Percent),
            b'=' => self.pick(&[(b"=", EqEq)], Eq),
            b'!' => self.pick(&[(b"=", NotEq)], Bang),
            b'<' => self.pick(&[(b"<=", LtLtEq), (b"<", LtLt), (b"=", Le)], Lt),
            b'>' => self.pick(&[(b">=", GtGtEq), (b">", GtGt), (b"=", Ge)], Gt),
            b'&' => self.pick(&[(b"&", AndAnd), (b"=", AmpEq)], Amp),
            b'|' => self.pick(&[(b"|", OrOr), (b"=", PipeEq)], Pipe),
            b'^' => self.pick(&[(b"=", CaretEq)], Caret),
            b'#' => self.pick(&[(b"#", HashHash)], Hash),
            b'.' => self.pick(&[(b"..", Ellipsis)], Dot),
            b'~' => Tilde,
            b'?' => Question,
            b':' => Colon,
            b'(' => LParen,
            b')' => RParen,
            b'{' => LBrace,
            b'}' => RBrace,
            b'[' => LBracket,
            b']' => RBracket,
            b';' => Semicolon,
            b',' => Comma,
            _ => {
                // step over the rest of a multi-byte character
                while self.peek().is_some_and(|b| (b & 0xC0) == 0x80) {
                    self.advance();
                }
                let c = self.input[start..self.position].chars().next().unwrap_or('?');
                self.error(start, format!("unexpected character '{}'", c));
                Unknown(c)
            }
        }
    }

    /// Longest-match helper: try each suffix in order, fall back to `single`.
    fn pick(&mut self, options: &[(&[u8], TokenKind)], single: TokenKind) -> TokenKind {
        for (suffix, kind) in options {
            if self.input.as_bytes()[self.position..].starts_with(suffix) {
                self.position += suffix.len();
                return kind.clone();
            }
        }
        single
    }

    /// Lex `<...>` after `#include`. Returns `None` if the next thing on the
    /// line is not an angled header name.
    pub fn lex_header_name(&mut self) -> Option<Token> {
        if self.pushed_back.is_some() {
            return None;
        }
        while matches!(self.peek(), Some(b' ') | Some(b'\t')) {
            self.advance();
        }
        if self.peek() != Some(b'<') {
            return None;
        }
        let start = self.position;
        let rest = &self.input.as_bytes()[start + 1..];
        let close = rest.iter().position(|&b| b == b'>' || b == b'\n')?;
        if rest[close] != b'>' {
            return None;
        }
        let name = self.input[start + 1..start + 1 + close].to_string();
        self.position = start + close + 2;
        self.last_start = start;
        self.at_line_start = false;
        Some(Token::new(
            TokenKind::HeaderName(name),
            self.loc_at(start),
            (close + 2) as u32,
        ))
    }

    /// Consume the remainder of the current line and return its text.
    pub fn rest_of_line(&mut self) -> String {
        let start = match self.pushed_back.take() {
            Some(_) => self.last_start,
            None => self.position,
        };
        self.position = start;
        while let Some(ch) = self.peek() {
            if ch == b'\n' {
                break;
            }
            if ch == b'\\' && self.peek_ahead(1) == Some(b'\n') {
                self.advance();
            }
            self.advance();
        }
        self.at_line_start = false;
        self.input[start..self.position].trim().to_string()
    }

    /// Parse string literal
    fn string_literal(&mut self, start: usize) -> TokenKind {
        let mut string = String::new();
        while let Some(ch) = self.peek() {
            match ch {
                b'"' => {
                    self.advance();
                    return TokenKind::StringLiteral(string);
                }
                b'\n' => break,
                b'\\' => {
                    self.advance();
                    if let Some(value) = self.escape() {
                        push_char_value(&mut string, value);
                    }
                }
                _ => {
                    let len = utf8_len(ch);
                    let end = (self.position + len).min(self.input.len());
                    string.push_str(&self.input[self.position..end]);
                    self.position = end;
                }
            }
        }
        self.error(start, "missing terminating '\"' character");
        TokenKind::StringLiteral(string)
    }

    /// Parse character literal
    fn char_literal(&mut self, start: usize) -> TokenKind {
        let mut value: i64 = 0;
        let mut count = 0;
        while let Some(ch) = self.peek() {
            match ch {
                b'\'' => {
                    self.advance();
                    if count == 0 {
                        self.error(start, "empty character constant");
                    }
                    return TokenKind::CharLiteral(value);
                }
                b'\n' => break,
                b'\\' => {
                    self.advance();
                    let c = self.escape().unwrap_or(0);
                    value = if count == 0 { c as i8 as i64 } else { (value << 8) | (c & 0xFF) };
                    count += 1;
                }
                _ => {
                    self.advance();
                    value = if count == 0 { ch as i8 as i64 } else { (value << 8) | ch as i64 };
                    count += 1;
                }
            }
        }
        self.error(start, "missing terminating ' character");
        TokenKind::CharLiteral(value)
    }

    /// Decode an escape sequence; the backslash is already consumed.
    fn escape(&mut self) -> Option<i64> {
        let start = self.position;
        let ch = self.advance()?;
        let value = match ch {
            b'n' => b'\n' as i64,
            b't' => b'\t' as i64,
            b'r' => b'\r' as i64,
            b'a' => 0x07,
            b'b' => 0x08,
            b'f' => 0x0C,
            b'v' => 0x0B,
            b'\\' | b'\'' | b'"' | b'?' => ch as i64,
            b'0'..=b'7' => {
                let mut value = (ch - b'0') as i64;
                for _ in 0..2 {
                    match self.peek() {
                        Some(d @ b'0'..=b'7') => {
                            self.advance();
                            value = value * 8 + (d - b'0') as i64;
                        }
                        _ => break,
                    }
                }
                value
            }
            b'x' => {
                let mut value: i64 = 0;
                let mut digits = 0;
                while let Some(d) = self.peek().and_then(|c| (c as char).to_digit(16)) {
                    self.advance();
                    value = value.wrapping_mul(16) + d as i64;
                    digits += 1;
                }
                if digits == 0 {
                    self.error(start - 1, "\\x used with no following hex digits");
                }
                value
            }
            other => {
                self.error(start - 1, format!("unknown escape sequence '\\{}'", other as char));
                other as i64
            }
        };
        Some(value)
    }

    /// Parse a preprocessing number and interpret it as an integer or
    /// floating literal.
    fn number_literal(&mut self, start: usize) -> TokenKind {
        while let Some(ch) = self.peek() {
            let prev = self.input.as_bytes()[self.position - 1];
            if ch.is_ascii_alphanumeric() || ch == b'.' || ch == b'_' {
                self.advance();
            } else if (ch == b'+' || ch == b'-') && matches!(prev, b'e' | b'E' | b'p' | b'P') {
                self.advance();
            } else {
                break;
            }
        }
        let text = self.input[start..self.position].to_string();
        parse_number(&text).unwrap_or_else(|message| {
            self.error(start, message);
            TokenKind::IntLiteral(0)
        })
    }

    /// Parse identifier or keyword
    fn identifier_or_keyword(&mut self, start: usize) -> TokenKind {
        while let Some(ch) = self.peek() {
            if ch.is_ascii_alphanumeric() || ch == b'_' || ch == b'$' {
                self.advance();
            } else {
                break;
            }
        }
        let ident = &self.input[start..self.position];

        // encoding prefixes on string and character literals
        if matches!(ident, "L" | "u" | "U" | "u8") {
            match self.peek() {
                Some(b'"') => {
                    self.advance();
                    return self.string_literal(start);
                }
                Some(b'\'') if ident != "u8" => {
                    self.advance();
                    return self.char_literal(start);
                }
                _ => {}
            }
        }

        TokenKind::keyword(ident).unwrap_or_else(|| TokenKind::Ident(ident.to_string()))
    }

    /// Skip whitespace (and comments unless they are retained). Returns
    /// whether anything was skipped.
    fn skip_whitespace(&mut self) -> bool {
        let start = self.position;
        loop {
            match self.peek() {
                Some(b'\n') => {
                    self.advance();
                    self.at_line_start = true;
                }
                Some(b' ') | Some(b'\t') | Some(b'\r') | Some(0x0B) | Some(0x0C) => {
                    self.advance();
                }
                Some(b'\\') if self.peek_ahead(1) == Some(b'\n') => {
                    self.advance();
                    self.advance();
                }
                Some(b'\\') if self.peek_ahead(1) == Some(b'\r') && self.peek_ahead(2) == Some(b'\n') => {
                    self.position += 3;
                }
                Some(b'/') if !self.keep_comments && self.peek_ahead(1) == Some(b'/') => {
                    self.skip_line_comment();
                }
                Some(b'/') if !self.keep_comments && self.peek_ahead(1) == Some(b'*') => {
                    let comment_start = self.position;
                    self.advance();
                    self.skip_block_comment(comment_start);
                }
                _ => break,
            }
        }
        self.position != start
    }

    /// Skip single-line comment (// ...), leaving the newline in place.
    fn skip_line_comment(&mut self) {
        while let Some(ch) = self.peek() {
            if ch == b'\n' {
                break;
            }
            self.advance();
        }
    }

    /// Skip the rest of a block comment; the leading `/` is consumed.
    fn skip_block_comment(&mut self, start: usize) {
        self.advance(); // skip '*'
        while !self.is_at_end() {
            if self.peek() == Some(b'*') && self.peek_ahead(1) == Some(b'/') {
                self.advance();
                self.advance();
                return;
            }
            self.advance();
        }
        self.error(start, "unterminated /* comment");
    }

    fn error(&mut self, offset: usize, message: impl Into<String>) {
        if !self.skipping {
            self.errors.push(LexError {
                message: message.into(),
                loc: self.loc_at(offset),
            });
        }
    }

    fn loc_at(&self, offset: usize) -> Loc {
        self.base.offset(offset as u32)
    }

    fn peek(&self) -> Option<u8> {
        self.input.as_bytes().get(self.position).copied()
    }

    fn peek_ahead(&self, n: usize) -> Option<u8> {
        self.input.as_bytes().get(self.position + n).copied()
    }

    fn advance(&mut self) -> Option<u8> {
        let ch = self.peek()?;
        self.position += 1;
        Some(ch)
    }

    fn is_at_end(&self) -> bool {
        self.position >= self.input.len()
    }
}

fn utf8_len(first: u8) -> usize {
    match first {
        0xF0..=0xFF => 4,
        0xE0..=0xEF => 3,
        0xC0..=0xDF => 2,
        _ => 1,
    }
}

fn push_char_value(string: &mut String, value: i64) {
    match char::from_u32(value as u32) {
        Some(c) if value >= 0 => string.push(c),
        _ => string.push(char::REPLACEMENT_CHARACTER),
    }
}

/// Interpret the text of a preprocessing number.
pub(crate) fn parse_number(text: &str) -> Result<TokenKind, String> {
    let lower = text.to_ascii_lowercase();
    let is_hex = lower.starts_with("0x");
    let is_float = if is_hex {
        lower.contains('.') || lower.contains('p')
    } else {
        lower.contains('.') || lower.contains('e')
    };

    if is_float {
        let body = lower.trim_end_matches(['f', 'l']);
        if is_hex {
            return parse_hex_float(&body[2..])
                .map(TokenKind::FloatLiteral)
                .ok_or_else(|| format!("invalid hexadecimal floating constant '{}'", text));
        }
        return body
            .parse::<f64>()
            .map(TokenKind::FloatLiteral)
            .map_err(|_| format!("invalid floating constant '{}'", text));
    }

    let digits = lower.trim_end_matches(['u', 'l']);
    let suffix = &lower[digits.len()..];
    if !matches!(suffix, "" | "u" | "l" | "ul" | "lu" | "ll" | "ull" | "llu") {
        return Err(format!("invalid suffix '{}' on integer constant", &text[digits.len()..]));
    }
    let (radix, body) = if is_hex {
        (16, &digits[2..])
    } else if lower.starts_with("0b") {
        (2, &digits[2..])
    } else if digits.len() > 1 && digits.starts_with('0') {
        (8, &digits[1..])
    } else {
        (10, digits)
    };
    if body.is_empty() {
        return Err(format!("invalid integer constant '{}'", text));
    }
    u64::from_str_radix(body, radix)
        .map(TokenKind::IntLiteral)
        .map_err(|err| match err.kind() {
            std::num::IntErrorKind::PosOverflow => {
                "integer literal is too large to be represented in any integer type".to_string()
            }
            _ => format!("invalid digit in integer constant '{}'", text),
        })
}

fn parse_hex_float(text: &str) -> Option<f64> {
    let (mantissa, exponent) = text.split_once('p')?;
    let exponent: i32 = exponent.parse().ok()?;
    let (int_part, frac_part) = mantissa.split_once('.').unwrap_or((mantissa, ""));
    let mut value = 0f64;
    for d in int_part.chars() {
        value = value * 16.0 + d.to_digit(16)? as f64;
    }
    let mut scale = 1.0 / 16.0;
    for d in frac_part.chars() {
        value += d.to_digit(16)? as f64 * scale;
        scale /= 16.0;
    }
    Some(value * 2f64.powi(exponent))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        let mut lexer = Lexer::new(Arc::from(source), Loc::INVALID);
        lexer.tokenize().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_simple_tokens() {
        let tokens = kinds("int main() { return 0; }");

        assert!(matches!(tokens[0], TokenKind::Int));
        assert!(matches!(tokens[1], TokenKind::Ident(ref s) if s == "main"));
        assert!(matches!(tokens[2], TokenKind::LParen));
        assert!(matches!(tokens[3], TokenKind::RParen));
        assert!(matches!(tokens[4], TokenKind::LBrace));
        assert!(matches!(tokens[5], TokenKind::Return));
        assert!(matches!(tokens[6], TokenKind::IntLiteral(0)));
        assert!(matches!(tokens[7], TokenKind::Semicolon));
        assert!(matches!(tokens[8], TokenKind::RBrace));
        assert!(matches!(tokens[9], TokenKind::Eof));
    }

    #[test]
    fn test_operators() {
        let tokens = kinds("++ -- += <<= >>= -> ... ## # &=");
        assert_eq!(
            tokens,
            vec![
                TokenKind::PlusPlus,
                TokenKind::MinusMinus,
                TokenKind::PlusEq,
                TokenKind::LtLtEq,
                TokenKind::GtGtEq,
                TokenKind::Arrow,
                TokenKind::Ellipsis,
                TokenKind::HashHash,
                TokenKind::Hash,
                TokenKind::AmpEq,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_comments_are_skipped_or_kept() {
        let source = "int x; // comment\nint y; /* block\ncomment */ int z;";
        assert_eq!(kinds(source).len(), 10);

        let mut lexer = Lexer::new(Arc::from(source), Loc::INVALID).with_comments();
        let tokens = lexer.tokenize();
        let comments = tokens
            .iter()
            .filter(|t| matches!(t.kind, TokenKind::Comment))
            .count();
        assert_eq!(comments, 2);
    }

    #[test]
    fn test_numbers() {
        assert_eq!(kinds("0x1F")[0], TokenKind::IntLiteral(31));
        assert_eq!(kinds("017")[0], TokenKind::IntLiteral(15));
        assert_eq!(kinds("10UL")[0], TokenKind::IntLiteral(10));
        assert_eq!(kinds("1.5f")[0], TokenKind::FloatLiteral(1.5));
        assert_eq!(kinds("1e3")[0], TokenKind::FloatLiteral(1000.0));
        assert_eq!(kinds("0x1p4")[0], TokenKind::FloatLiteral(16.0));
    }

    #[test]
    fn test_bad_number_reports_error() {
        let mut lexer = Lexer::new(Arc::from("09"), Loc::INVALID);
        lexer.tokenize();
        assert_eq!(lexer.take_errors().len(), 1);
    }

    #[test]
    fn test_string_and_char_literals() {
        let tokens = kinds(r#""hello\nworld" '\x41' 'a' L"w""#);
        assert_eq!(tokens[0], TokenKind::StringLiteral("hello\nworld".to_string()));
        assert_eq!(tokens[1], TokenKind::CharLiteral(65));
        assert_eq!(tokens[2], TokenKind::CharLiteral(97));
        assert_eq!(tokens[3], TokenKind::StringLiteral("w".to_string()));
    }

    #[test]
    fn test_unterminated_string() {
        let mut lexer = Lexer::new(Arc::from("\"abc\nint"), Loc::INVALID);
        let tokens = lexer.tokenize();
        assert!(matches!(tokens[0].kind, TokenKind::StringLiteral(_)));
        assert!(matches!(tokens[1].kind, TokenKind::Int));
        assert_eq!(lexer.take_errors().len(), 1);
    }

    #[test]
    fn test_line_start_flags() {
        let mut lexer = Lexer::new(Arc::from("#define X\n  # if\nint a"), Loc::INVALID);
        let tokens = lexer.tokenize();
        // # define X / # if / int a
        assert!(tokens[0].at_line_start);
        assert!(!tokens[1].at_line_start);
        assert!(!tokens[2].at_line_start);
        assert!(tokens[3].at_line_start && tokens[3].leading_space);
        assert!(tokens[5].at_line_start);
    }

    #[test]
    fn test_header_name() {
        let mut lexer = Lexer::new(Arc::from("#include <stdio.h>\n"), Loc::INVALID);
        lexer.next_token();
        lexer.next_token();
        let header = lexer.lex_header_name().unwrap();
        assert_eq!(header.kind, TokenKind::HeaderName("stdio.h".to_string()));
        assert_eq!(header.len, 9);
    }

    #[test]
    fn test_token_length() {
        assert_eq!(token_length("foo_bar(x)"), 7);
        assert_eq!(token_length("\"a b\" c"), 5);
        assert_eq!(token_length(">>= 1"), 3);
    }
}
