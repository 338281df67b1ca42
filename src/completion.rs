//! Code completion
//!
//! Completion reparses the unit with a marker identifier spliced in at the
//! completion point. The preprocessor cuts the token stream at the marker and
//! the parser records what could appear there, so results come from the same
//! scopes and macro table the parse saw at that point.

use crate::cursor::types::{declarator_spelling, type_spelling};
use crate::cursor::{Cursor, CursorKind};
use crate::diagnostics::DiagnosticSet;
use crate::parser::ast::{Ast, NodeId, NodeKind, Repr, Type};
use crate::parser::lexer::{self, Lexer};
use crate::parser::preprocessor::{MacroSignature, COMPLETION_SENTINEL};
use crate::parser::sema::{canonical_type, CompletionKind, TagFilter};
use crate::source::{File, Loc};
use crate::unit::{BuildHooks, ErrorCode, TranslationUnit, UnsavedFile};
use std::cmp::Ordering;
use std::fmt;
use std::ops::BitOr;
use std::ptr;

// Lower is better.
const PRIORITY_LOCAL: u32 = 8;
const PRIORITY_MEMBER: u32 = 20;
const PRIORITY_KEYWORD: u32 = 40;
const PRIORITY_DECLARATION: u32 = 50;
const PRIORITY_CONSTANT: u32 = 65;
const PRIORITY_MACRO: u32 = 70;

const TYPE_KEYWORDS: &[&str] = &[
    "_Bool", "char", "const", "double", "enum", "extern", "float", "inline", "int", "long", "short",
    "signed", "static", "struct", "typedef", "union", "unsigned", "void", "volatile",
];

const STATEMENT_KEYWORDS: &[&str] = &[
    "break", "case", "continue", "default", "do", "else", "for", "goto", "if", "return", "sizeof",
    "switch", "while",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodeCompleteOptions {
    pub include_macros: bool,
    /// Offer statement templates such as `if (condition) { statements }`.
    pub include_code_patterns: bool,
    pub include_brief_comments: bool,
}

impl Default for CodeCompleteOptions {
    fn default() -> Self {
        CodeCompleteOptions {
            include_macros: true,
            include_code_patterns: false,
            include_brief_comments: false,
        }
    }
}

/// Kinds of entity that may appear at a completion point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct CompletionContexts(u32);

impl CompletionContexts {
    pub const UNEXPOSED: CompletionContexts = CompletionContexts(0);
    pub const ANY_TYPE: CompletionContexts = CompletionContexts(1 << 0);
    pub const ANY_VALUE: CompletionContexts = CompletionContexts(1 << 1);
    pub const DOT_MEMBER_ACCESS: CompletionContexts = CompletionContexts(1 << 5);
    pub const ARROW_MEMBER_ACCESS: CompletionContexts = CompletionContexts(1 << 6);
    pub const ENUM_TAG: CompletionContexts = CompletionContexts(1 << 8);
    pub const UNION_TAG: CompletionContexts = CompletionContexts(1 << 9);
    pub const STRUCT_TAG: CompletionContexts = CompletionContexts(1 << 10);
    pub const MACRO_NAME: CompletionContexts = CompletionContexts(1 << 20);
    pub const NATURAL_LANGUAGE: CompletionContexts = CompletionContexts(1 << 21);

    pub fn bits(self) -> u32 {
        self.0
    }

    pub fn contains(self, other: CompletionContexts) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for CompletionContexts {
    type Output = CompletionContexts;

    fn bitor(self, rhs: CompletionContexts) -> CompletionContexts {
        CompletionContexts(self.0 | rhs.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkKind {
    /// A group of chunks the user may leave out.
    Optional,
    /// The text the user types to select the result.
    TypedText,
    Text,
    /// An argument the user still has to fill in.
    Placeholder,
    Informative,
    CurrentParameter,
    LeftParen,
    RightParen,
    LeftBracket,
    RightBracket,
    LeftBrace,
    RightBrace,
    LeftAngle,
    RightAngle,
    Comma,
    ResultType,
    Colon,
    SemiColon,
    Equal,
    HorizontalSpace,
    VerticalSpace,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionChunk {
    kind: ChunkKind,
    text: String,
    optional: Option<CompletionString>,
}

impl CompletionChunk {
    fn new(kind: ChunkKind, text: impl Into<String>) -> Self {
        CompletionChunk {
            kind,
            text: text.into(),
            optional: None,
        }
    }

    fn punctuation(kind: ChunkKind) -> Self {
        let text = match kind {
            ChunkKind::LeftParen => "(",
            ChunkKind::RightParen => ")",
            ChunkKind::LeftBracket => "[",
            ChunkKind::RightBracket => "]",
            ChunkKind::LeftBrace => "{",
            ChunkKind::RightBrace => "}",
            ChunkKind::LeftAngle => "<",
            ChunkKind::RightAngle => ">",
            ChunkKind::Comma => ", ",
            ChunkKind::Colon => ":",
            ChunkKind::SemiColon => ";",
            ChunkKind::Equal => " = ",
            ChunkKind::HorizontalSpace => " ",
            ChunkKind::VerticalSpace => "\n",
            _ => "",
        };
        CompletionChunk::new(kind, text)
    }

    fn optional(chunks: Vec<CompletionChunk>) -> Self {
        CompletionChunk {
            kind: ChunkKind::Optional,
            text: String::new(),
            optional: Some(CompletionString {
                chunks,
                ..CompletionString::default()
            }),
        }
    }

    pub fn kind(&self) -> ChunkKind {
        self.kind
    }

    /// Empty for [`ChunkKind::Optional`] chunks.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// The nested string of an [`ChunkKind::Optional`] chunk.
    pub fn completion_string(&self) -> Option<&CompletionString> {
        self.optional.as_ref()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Availability {
    #[default]
    Available,
    Deprecated,
    NotAvailable,
    NotAccessible,
}

/// How to write one completion result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionString {
    chunks: Vec<CompletionChunk>,
    priority: u32,
    availability: Availability,
    parent: String,
    brief_comment: Option<String>,
}

impl Default for CompletionString {
    fn default() -> Self {
        CompletionString {
            chunks: Vec::new(),
            priority: PRIORITY_DECLARATION,
            availability: Availability::Available,
            parent: String::new(),
            brief_comment: None,
        }
    }
}

impl CompletionString {
    pub fn chunks(&self) -> &[CompletionChunk] {
        &self.chunks
    }

    pub fn num_chunks(&self) -> usize {
        self.chunks.len()
    }

    /// Smaller values are more likely to be wanted.
    pub fn priority(&self) -> u32 {
        self.priority
    }

    pub fn availability(&self) -> Availability {
        self.availability
    }

    /// Name of the entity that contains the result, e.g. the record of a
    /// field.
    pub fn parent(&self) -> &str {
        &self.parent
    }

    pub fn brief_comment(&self) -> Option<&str> {
        self.brief_comment.as_deref()
    }

    pub fn typed_text(&self) -> &str {
        self.chunks
            .iter()
            .find(|c| c.kind == ChunkKind::TypedText)
            .map_or("", |c| c.text.as_str())
    }
}

impl fmt::Display for CompletionString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for chunk in &self.chunks {
            match chunk.kind {
                ChunkKind::Optional => {
                    if let Some(inner) = &chunk.optional {
                        write!(f, "{{#{}#}}", inner)?;
                    }
                }
                ChunkKind::Placeholder => write!(f, "<#{}#>", chunk.text)?,
                ChunkKind::ResultType => write!(f, "[#{}#]", chunk.text)?,
                ChunkKind::Informative => write!(f, "{{#{}#}}", chunk.text)?,
                _ => f.write_str(&chunk.text)?,
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionResult {
    pub cursor_kind: CursorKind,
    pub completion: CompletionString,
}

/// Results of one completion request. The completion parse's diagnostics
/// stay available for as long as the results are kept.
#[derive(Debug)]
pub struct CodeCompleteResults {
    results: Vec<CompletionResult>,
    contexts: CompletionContexts,
    container_kind: CursorKind,
    container_usr: String,
    unit: Option<TranslationUnit>,
}

impl CodeCompleteResults {
    fn empty(contexts: CompletionContexts, unit: Option<TranslationUnit>) -> Self {
        CodeCompleteResults {
            results: Vec::new(),
            contexts,
            container_kind: CursorKind::InvalidCode,
            container_usr: String::new(),
            unit,
        }
    }

    pub fn results(&self) -> &[CompletionResult] {
        &self.results
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn contexts(&self) -> CompletionContexts {
        self.contexts
    }

    /// Kind of the entity whose members are being completed;
    /// [`CursorKind::InvalidCode`] outside member access.
    pub fn container_kind(&self) -> CursorKind {
        self.container_kind
    }

    pub fn container_usr(&self) -> &str {
        &self.container_usr
    }

    /// Diagnostics produced by the completion parse.
    pub fn diagnostics(&self) -> DiagnosticSet<'_> {
        match &self.unit {
            Some(unit) => unit.diagnostics(),
            None => DiagnosticSet::empty(),
        }
    }

    /// Order results by typed text, ignoring case first.
    pub fn sort_results(&mut self) {
        sort_results(&mut self.results);
    }
}

/// Order results by typed text, ignoring case first.
pub fn sort_results(results: &mut [CompletionResult]) {
    results.sort_by(|a, b| {
        let (a, b) = (a.completion.typed_text(), b.completion.typed_text());
        match a.to_lowercase().cmp(&b.to_lowercase()) {
            Ordering::Equal => a.cmp(b),
            other => other,
        }
    });
}

impl TranslationUnit {
    /// Complete at a 1-based line and column of `file`. `unsaved` replaces
    /// file contents for this request only.
    pub fn code_complete_at(
        &self,
        file: File<'_>,
        line: u32,
        column: u32,
        unsaved: &[UnsavedFile],
        options: CodeCompleteOptions,
    ) -> Result<CodeCompleteResults, ErrorCode> {
        if !ptr::eq(file.manager(), &self.sm) {
            return Err(ErrorCode::InvalidArguments);
        }
        let name = file.name().to_string();
        let contents = unsaved
            .iter()
            .find(|u| u.filename == name)
            .map_or_else(|| file.contents().to_string(), |u| u.contents.clone());
        let Some(offset) = line_column_offset(&contents, line, column) else {
            tracing::warn!(%name, line, column, "completion point outside the file");
            return Err(ErrorCode::InvalidArguments);
        };
        if in_comment_or_string(&contents, offset) {
            return Ok(CodeCompleteResults::empty(CompletionContexts::NATURAL_LANGUAGE, None));
        }

        let start = identifier_start(&contents, offset);
        let mut spliced = String::with_capacity(contents.len() + COMPLETION_SENTINEL.len() + 1);
        spliced.push_str(&contents[..start]);
        spliced.push_str(COMPLETION_SENTINEL);
        spliced.push(' ');
        spliced.push_str(&contents[start..]);

        let mut invocation = self.invocation.clone();
        invocation.options.skip_function_bodies = false;
        let spliced = UnsavedFile::new(name.as_str(), spliced);
        for file in unsaved.iter().chain(std::iter::once(&spliced)) {
            invocation.unsaved.retain(|u| u.filename != file.filename);
            invocation.unsaved.push(file.clone());
        }
        let mut session = self.session;
        session.display_diagnostics = false;

        tracing::debug!(%name, line, column, "code completion");
        let unit = TranslationUnit::build(invocation, session, &BuildHooks::default())?;
        let brief = options.include_brief_comments || self.options().include_brief_comments_in_code_completion;
        let mut results = match unit.completion.as_ref() {
            Some(state) => match &state.context {
                Some(context) => {
                    let builder = Builder {
                        tu: &unit,
                        brief,
                        in_function: context.function.is_some(),
                    };
                    builder.build(&context.kind, &context.visible, &state.macros, options)
                }
                None if options.include_macros => {
                    let builder = Builder {
                        tu: &unit,
                        brief,
                        in_function: false,
                    };
                    Built {
                        results: builder.macros(&state.macros),
                        contexts: CompletionContexts::MACRO_NAME,
                        container: None,
                    }
                }
                None => Built::default(),
            },
            // the marker never reached the parser, e.g. inside `#if 0`
            None => Built::default(),
        };
        let container = results.container.take();
        let (container_kind, container_usr) = match container.map(|id| Cursor::from_node(&unit, id)) {
            Some(cursor) => (cursor.kind(), cursor.usr()),
            None => (CursorKind::InvalidCode, String::new()),
        };
        Ok(CodeCompleteResults {
            results: results.results,
            contexts: results.contexts,
            container_kind,
            container_usr,
            unit: Some(unit),
        })
    }
}

fn line_column_offset(text: &str, line: u32, column: u32) -> Option<usize> {
    if line == 0 || column == 0 {
        return None;
    }
    let mut start = 0;
    for _ in 1..line {
        start += text[start..].find('\n')? + 1;
    }
    let end = text[start..].find('\n').map_or(text.len(), |n| start + n);
    let offset = start + column as usize - 1;
    (offset <= end).then_some(offset)
}

fn in_comment_or_string(text: &str, offset: usize) -> bool {
    let mut lexer = Lexer::new(text.into(), Loc::INVALID).with_comments();
    loop {
        let token = lexer.next_token();
        let end = lexer.offset();
        let start = end.saturating_sub(token.len as usize);
        if matches!(token.kind, lexer::TokenKind::Eof) || start >= offset {
            return false;
        }
        let inside = match &token.kind {
            // a line comment runs up to (not over) the newline
            lexer::TokenKind::Comment if text[start..].starts_with("//") => offset <= end,
            lexer::TokenKind::Comment
            | lexer::TokenKind::StringLiteral(_)
            | lexer::TokenKind::CharLiteral(_) => offset < end,
            _ => false,
        };
        if inside {
            return true;
        }
    }
}

fn identifier_start(text: &str, offset: usize) -> usize {
    let bytes = text.as_bytes();
    let mut start = offset;
    while start > 0 && (bytes[start - 1].is_ascii_alphanumeric() || bytes[start - 1] == b'_') {
        start -= 1;
    }
    start
}

#[derive(Default)]
struct Built {
    results: Vec<CompletionResult>,
    contexts: CompletionContexts,
    container: Option<NodeId>,
}

struct Builder<'a> {
    tu: &'a TranslationUnit,
    brief: bool,
    in_function: bool,
}

impl Builder<'_> {
    fn ast(&self) -> &Ast {
        &self.tu.ast
    }

    fn build(
        &self,
        kind: &CompletionKind,
        visible: &[NodeId],
        macros: &[MacroSignature],
        options: CodeCompleteOptions,
    ) -> Built {
        match kind {
            CompletionKind::Ordinary => {
                let mut results: Vec<_> = visible.iter().filter_map(|id| self.declaration(*id)).collect();
                results.extend(self.keywords(options.include_code_patterns));
                if options.include_macros {
                    results.extend(self.macros(macros));
                }
                Built {
                    results,
                    contexts: CompletionContexts::ANY_TYPE | CompletionContexts::ANY_VALUE,
                    container: None,
                }
            }
            CompletionKind::Member { record, arrow } => {
                let contexts = if *arrow {
                    CompletionContexts::ARROW_MEMBER_ACCESS
                } else {
                    CompletionContexts::DOT_MEMBER_ACCESS
                };
                let mut results = Vec::new();
                if let Some(record) = record {
                    self.fields(*record, &mut results);
                }
                Built {
                    results,
                    contexts,
                    container: *record,
                }
            }
            CompletionKind::Tag(filter) => {
                let contexts = match filter {
                    TagFilter::Struct => CompletionContexts::STRUCT_TAG,
                    TagFilter::Union => CompletionContexts::UNION_TAG,
                    TagFilter::Enum => CompletionContexts::ENUM_TAG,
                };
                let results = visible
                    .iter()
                    .filter(|id| tag_matches(&self.ast().node(**id).kind, *filter))
                    .filter_map(|id| self.declaration(*id))
                    .collect();
                Built {
                    results,
                    contexts,
                    container: None,
                }
            }
        }
    }

    fn declaration(&self, id: NodeId) -> Option<CompletionResult> {
        let ast = self.ast();
        let node = ast.node(id);
        let name = node.kind.decl_name().filter(|n| !n.is_empty())?;
        if node.implicit {
            return None;
        }
        let local = ast
            .ancestors(id)
            .any(|p| matches!(ast.node(p).kind, NodeKind::Function { .. }));
        let spell = |ty: &Type| type_spelling(ast, &self.tu.sm, ty);

        let mut chunks = Vec::new();
        let priority = match &node.kind {
            NodeKind::Function { .. } => {
                let Repr::Function(func) = &node.ty.repr else {
                    return None;
                };
                chunks.push(CompletionChunk::new(ChunkKind::ResultType, spell(&func.result)));
                chunks.push(CompletionChunk::new(ChunkKind::TypedText, name));
                chunks.push(CompletionChunk::punctuation(ChunkKind::LeftParen));
                let params: Vec<NodeId> = node
                    .children
                    .iter()
                    .copied()
                    .filter(|c| matches!(ast.node(*c).kind, NodeKind::Param { .. }))
                    .collect();
                for (i, param) in params.iter().enumerate() {
                    if i > 0 {
                        chunks.push(CompletionChunk::punctuation(ChunkKind::Comma));
                    }
                    let text = declarator_spelling(ast, &self.tu.sm, &ast.node(*param).ty, ast.name(*param));
                    chunks.push(CompletionChunk::new(ChunkKind::Placeholder, text));
                }
                if func.variadic {
                    chunks.push(CompletionChunk::optional(vec![
                        CompletionChunk::punctuation(ChunkKind::Comma),
                        CompletionChunk::new(ChunkKind::Placeholder, "..."),
                    ]));
                }
                chunks.push(CompletionChunk::punctuation(ChunkKind::RightParen));
                PRIORITY_DECLARATION
            }
            NodeKind::Var { .. } | NodeKind::Param { .. } | NodeKind::Field { .. } => {
                chunks.push(CompletionChunk::new(ChunkKind::ResultType, spell(&node.ty)));
                chunks.push(CompletionChunk::new(ChunkKind::TypedText, name));
                match node.kind {
                    NodeKind::Field { .. } => PRIORITY_MEMBER,
                    _ if local => PRIORITY_LOCAL,
                    _ => PRIORITY_DECLARATION,
                }
            }
            NodeKind::EnumConstant { .. } => {
                chunks.push(CompletionChunk::new(ChunkKind::ResultType, spell(&node.ty)));
                chunks.push(CompletionChunk::new(ChunkKind::TypedText, name));
                PRIORITY_CONSTANT
            }
            NodeKind::Typedef { .. } | NodeKind::Record { .. } | NodeKind::Enum { .. } => {
                chunks.push(CompletionChunk::new(ChunkKind::TypedText, name));
                PRIORITY_DECLARATION
            }
            _ => return None,
        };

        let cursor = Cursor::from_node(self.tu, id);
        let parent = match node.kind {
            NodeKind::Field { .. } => cursor.semantic_parent().spelling(),
            _ => String::new(),
        };
        let brief_comment = if self.brief {
            cursor.brief_comment_text()
        } else {
            None
        };
        Some(CompletionResult {
            cursor_kind: cursor.kind(),
            completion: CompletionString {
                chunks,
                priority,
                availability: Availability::Available,
                parent,
                brief_comment,
            },
        })
    }

    /// Fields of a record, with the members of anonymous records flattened.
    fn fields(&self, record: NodeId, out: &mut Vec<CompletionResult>) {
        let ast = self.ast();
        let Some(def) = ast.definition(record) else {
            return;
        };
        for child in ast.children(def) {
            let node = ast.node(*child);
            let NodeKind::Field { name, .. } = &node.kind else {
                continue;
            };
            if name.is_empty() {
                if let Repr::Record(inner) = canonical_type(ast, &node.ty).repr {
                    self.fields(inner, out);
                }
            } else if let Some(result) = self.declaration(*child) {
                out.push(result);
            }
        }
    }

    fn keywords(&self, patterns: bool) -> Vec<CompletionResult> {
        let statements: &[&str] = if self.in_function { STATEMENT_KEYWORDS } else { &[] };
        TYPE_KEYWORDS
            .iter()
            .chain(statements)
            .map(|keyword| {
                let chunks = match (patterns, *keyword) {
                    (true, "if") | (true, "while") | (true, "switch") => vec![
                        CompletionChunk::new(ChunkKind::TypedText, *keyword),
                        CompletionChunk::punctuation(ChunkKind::HorizontalSpace),
                        CompletionChunk::punctuation(ChunkKind::LeftParen),
                        CompletionChunk::new(
                            ChunkKind::Placeholder,
                            if *keyword == "switch" { "expression" } else { "condition" },
                        ),
                        CompletionChunk::punctuation(ChunkKind::RightParen),
                        CompletionChunk::punctuation(ChunkKind::LeftBrace),
                        CompletionChunk::new(ChunkKind::Placeholder, "statements"),
                        CompletionChunk::punctuation(ChunkKind::RightBrace),
                    ],
                    (true, "return") => vec![
                        CompletionChunk::new(ChunkKind::TypedText, "return"),
                        CompletionChunk::punctuation(ChunkKind::HorizontalSpace),
                        CompletionChunk::new(ChunkKind::Placeholder, "expression"),
                    ],
                    (true, "sizeof") => vec![
                        CompletionChunk::new(ChunkKind::TypedText, "sizeof"),
                        CompletionChunk::punctuation(ChunkKind::LeftParen),
                        CompletionChunk::new(ChunkKind::Placeholder, "expression-or-type"),
                        CompletionChunk::punctuation(ChunkKind::RightParen),
                    ],
                    _ => vec![CompletionChunk::new(ChunkKind::TypedText, *keyword)],
                };
                CompletionResult {
                    cursor_kind: CursorKind::NotImplemented,
                    completion: CompletionString {
                        chunks,
                        priority: PRIORITY_KEYWORD,
                        ..CompletionString::default()
                    },
                }
            })
            .collect()
    }

    fn macros(&self, macros: &[MacroSignature]) -> Vec<CompletionResult> {
        macros
            .iter()
            .map(|m| {
                let mut chunks = vec![CompletionChunk::new(ChunkKind::TypedText, m.name.as_str())];
                if let Some(params) = &m.params {
                    chunks.push(CompletionChunk::punctuation(ChunkKind::LeftParen));
                    for (i, param) in params.iter().enumerate() {
                        if i > 0 {
                            chunks.push(CompletionChunk::punctuation(ChunkKind::Comma));
                        }
                        let text = if m.variadic && i + 1 == params.len() && param == "__VA_ARGS__" {
                            "..."
                        } else {
                            param.as_str()
                        };
                        chunks.push(CompletionChunk::new(ChunkKind::Placeholder, text));
                    }
                    chunks.push(CompletionChunk::punctuation(ChunkKind::RightParen));
                }
                CompletionResult {
                    cursor_kind: CursorKind::MacroDefinition,
                    completion: CompletionString {
                        chunks,
                        priority: PRIORITY_MACRO,
                        ..CompletionString::default()
                    },
                }
            })
            .collect()
    }
}

fn tag_matches(kind: &NodeKind, filter: TagFilter) -> bool {
    use crate::parser::ast::TagKind;
    match (kind, filter) {
        (NodeKind::Record { tag: TagKind::Struct, .. }, TagFilter::Struct) => true,
        (NodeKind::Record { tag: TagKind::Union, .. }, TagFilter::Union) => true,
        (NodeKind::Enum { .. }, TagFilter::Enum) => true,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::unit::tests::parse_unit;

    fn complete(source: &str, line: u32, column: u32, options: CodeCompleteOptions) -> CodeCompleteResults {
        let tu = parse_unit(source);
        let file = tu.file("t.c").unwrap();
        tu.code_complete_at(file, line, column, &[], options).unwrap()
    }

    fn names(results: &CodeCompleteResults) -> Vec<&str> {
        results.results().iter().map(|r| r.completion.typed_text()).collect()
    }

    fn result<'r>(results: &'r CodeCompleteResults, name: &str) -> &'r CompletionResult {
        results
            .results()
            .iter()
            .find(|r| r.completion.typed_text() == name)
            .unwrap()
    }

    #[test]
    fn test_member_access() {
        let source = "struct P { int x; int y; };\nint main(void) { struct P p; p. }\n";
        let results = complete(source, 2, 32, CodeCompleteOptions::default());
        assert_eq!(names(&results), vec!["x", "y"]);
        assert!(results.contexts().contains(CompletionContexts::DOT_MEMBER_ACCESS));
        assert_eq!(results.container_kind(), CursorKind::StructDecl);
        assert_eq!(results.container_usr(), "c:@S@P");
        let x = result(&results, "x");
        assert_eq!(x.cursor_kind, CursorKind::FieldDecl);
        assert_eq!(x.completion.parent(), "P");
        assert_eq!(x.completion.priority(), PRIORITY_MEMBER);
        assert_eq!(x.completion.to_string(), "[#int#]x");
    }

    #[test]
    fn test_ordinary_names() {
        let source = "int alpha;\nint beta(int gamma) {\n  return \n}\n";
        let results = complete(source, 3, 10, CodeCompleteOptions::default());
        assert!(results.contexts().contains(CompletionContexts::ANY_VALUE));
        assert_eq!(results.container_kind(), CursorKind::InvalidCode);

        let gamma = result(&results, "gamma");
        assert_eq!(gamma.cursor_kind, CursorKind::ParmDecl);
        assert_eq!(gamma.completion.priority(), PRIORITY_LOCAL);
        let beta = result(&results, "beta");
        assert_eq!(beta.cursor_kind, CursorKind::FunctionDecl);
        assert_eq!(beta.completion.to_string(), "[#int#]beta(<#int gamma#>)");
        assert_eq!(result(&results, "alpha").cursor_kind, CursorKind::VarDecl);
        assert_eq!(result(&results, "return").cursor_kind, CursorKind::NotImplemented);
        assert_eq!(result(&results, "int").completion.priority(), PRIORITY_KEYWORD);
    }

    #[test]
    fn test_variadic_function_has_optional_chunk() {
        let source = "int print(const char *fmt, ...);\nint v = \n";
        let results = complete(source, 2, 9, CodeCompleteOptions::default());
        let print = result(&results, "print");
        assert_eq!(
            print.completion.to_string(),
            "[#int#]print(<#const char *fmt#>{#, <#...#>#})"
        );
        let optional = print
            .completion
            .chunks()
            .iter()
            .find(|c| c.kind() == ChunkKind::Optional)
            .and_then(|c| c.completion_string())
            .unwrap();
        assert_eq!(optional.num_chunks(), 2);
    }

    #[test]
    fn test_macros() {
        let source = "#define MAX(a, b) a\n#define LIMIT 10\nint v = \n";
        let results = complete(source, 3, 9, CodeCompleteOptions::default());
        let max = result(&results, "MAX");
        assert_eq!(max.cursor_kind, CursorKind::MacroDefinition);
        assert_eq!(max.completion.to_string(), "MAX(<#a#>, <#b#>)");
        assert_eq!(max.completion.priority(), PRIORITY_MACRO);
        assert!(names(&results).contains(&"LIMIT"));

        let without = complete(
            source,
            3,
            9,
            CodeCompleteOptions {
                include_macros: false,
                ..CodeCompleteOptions::default()
            },
        );
        assert!(!names(&without).contains(&"MAX"));
    }

    #[test]
    fn test_tags() {
        let source = "struct Alpha { int a; };\nunion Beta { int b; };\nstruct \n";
        let results = complete(source, 3, 8, CodeCompleteOptions::default());
        assert_eq!(names(&results), vec!["Alpha"]);
        assert!(results.contexts().contains(CompletionContexts::STRUCT_TAG));
    }

    #[test]
    fn test_prefix_is_replaced() {
        let source = "int counter;\nint v = cou\n";
        let results = complete(source, 2, 12, CodeCompleteOptions::default());
        assert!(names(&results).contains(&"counter"));
    }

    #[test]
    fn test_nothing_inside_comments_or_strings() {
        let results = complete("int a; // hel\n", 1, 14, CodeCompleteOptions::default());
        assert!(results.is_empty());
        assert_eq!(results.contexts(), CompletionContexts::NATURAL_LANGUAGE);
        let results = complete("char *s = \"abc\";\n", 1, 13, CodeCompleteOptions::default());
        assert!(results.is_empty());
    }

    #[test]
    fn test_sort_results() {
        let source = "int zeta;\nint Alpha;\nint beta;\nint v = \n";
        let mut results = complete(
            source,
            4,
            9,
            CodeCompleteOptions {
                include_macros: false,
                ..CodeCompleteOptions::default()
            },
        );
        results.sort_results();
        let names = names(&results);
        let pos = |n: &str| names.iter().position(|x| *x == n).unwrap();
        assert!(pos("Alpha") < pos("beta"));
        assert!(pos("beta") < pos("zeta"));
        assert!(pos("int") < pos("zeta"));
    }

    #[test]
    fn test_brief_comments() {
        let source = "/// Adds things.\nint add(int a);\nint x = \n";
        let results = complete(
            source,
            3,
            9,
            CodeCompleteOptions {
                include_brief_comments: true,
                ..CodeCompleteOptions::default()
            },
        );
        assert_eq!(result(&results, "add").completion.brief_comment(), Some("Adds things."));
        let plain = complete(source, 3, 9, CodeCompleteOptions::default());
        assert_eq!(result(&plain, "add").completion.brief_comment(), None);
    }

    #[test]
    fn test_completion_diagnostics() {
        let results = complete("int x = missing;\nint y = \n", 2, 9, CodeCompleteOptions::default());
        assert_eq!(results.diagnostics().len(), 1);
    }

    #[test]
    fn test_unsaved_override() {
        let tu = parse_unit("int a;\n");
        let file = tu.file("t.c").unwrap();
        let results = tu
            .code_complete_at(
                file,
                2,
                9,
                &[UnsavedFile::new("t.c", "int fresh;\nint v = \n")],
                CodeCompleteOptions::default(),
            )
            .unwrap();
        assert!(names(&results).contains(&"fresh"));
        assert!(matches!(
            tu.code_complete_at(file, 9, 1, &[], CodeCompleteOptions::default()),
            Err(ErrorCode::InvalidArguments)
        ));
    }
}
