//! C preprocessor
//!
//! Pulls raw tokens from a stack of file lexers, executes directives and expands
//! macros, producing the token stream the parser consumes. Along the way it
//! fills a [`PreprocessingRecord`] with inclusion directives and, when asked, macro
//! definitions and expansions, each tagged with its position in the output stream.
//!
//! Macro expansion works on a pending-token queue. Expanded tokens are pushed to
//! the front of the queue followed by an end marker; while the marker is queued the
//! macro is active and any occurrence of its name is painted so it never expands
//! again.

mod conditional;
mod macros;
mod search;

pub use search::{parent_dir, Candidate, FileData, FileSystem, HeaderSearch};

use crate::diagnostics::{Category, DiagnosticsEngine};
use crate::parser::lexer::{Lexer, Token, TokenKind};
use crate::source::{FileId, Loc, SourceManager, Span, BUILTIN_BUFFER};
use conditional::Conditional;
use macros::MacroDef;
use rustc_hash::{FxHashMap, FxHashSet};
use std::collections::VecDeque;
use std::rc::Rc;
use std::sync::Arc;

/// Identifier spliced into the source at a code-completion point.
pub const COMPLETION_SENTINEL: &str = "__cindex_code_completion__";

const MAX_INCLUDE_DEPTH: usize = 200;

/// Index of an entity in the [`PreprocessingRecord`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PpId(pub(crate) u32);

#[derive(Debug, Clone)]
pub struct InclusionDirective {
    /// File name as written between the quotes or angle brackets.
    pub name: String,
    pub angled: bool,
    pub is_import: bool,
    pub hash_loc: Loc,
    pub span: Span,
    pub file: Option<FileId>,
}

#[derive(Debug, Clone)]
pub struct MacroDefinitionRecord {
    pub name: String,
    pub name_loc: Loc,
    pub span: Span,
    pub function_like: bool,
}

#[derive(Debug, Clone)]
pub struct MacroExpansionRecord {
    pub name: String,
    pub span: Span,
    pub definition: Option<PpId>,
}

#[derive(Debug, Clone)]
pub enum PpEntity {
    Inclusion(InclusionDirective),
    MacroDefinition(MacroDefinitionRecord),
    MacroExpansion(MacroExpansionRecord),
}

impl PpEntity {
    pub fn span(&self) -> Span {
        match self {
            PpEntity::Inclusion(i) => i.span,
            PpEntity::MacroDefinition(d) => d.span,
            PpEntity::MacroExpansion(e) => e.span,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            PpEntity::Inclusion(i) => &i.name,
            PpEntity::MacroDefinition(d) => &d.name,
            PpEntity::MacroExpansion(e) => &e.name,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PpRecordEntry {
    pub entity: PpEntity,
    /// Number of output tokens produced before this entity.
    pub seq: u32,
}

#[derive(Debug, Clone, Default)]
pub struct PreprocessingRecord {
    entries: Vec<PpRecordEntry>,
}

impl PreprocessingRecord {
    fn push(&mut self, entity: PpEntity, seq: u32) -> PpId {
        self.entries.push(PpRecordEntry { entity, seq });
        PpId(self.entries.len() as u32 - 1)
    }

    pub fn get(&self, id: PpId) -> Option<&PpRecordEntry> {
        self.entries.get(id.0 as usize)
    }

    pub fn iter(&self) -> impl Iterator<Item = (PpId, &PpRecordEntry)> {
        self.entries
            .iter()
            .enumerate()
            .map(|(i, e)| (PpId(i as u32), e))
    }

    pub fn inclusions(&self) -> impl Iterator<Item = (PpId, &InclusionDirective)> {
        self.iter().filter_map(|(id, e)| match &e.entity {
            PpEntity::Inclusion(inc) => Some((id, inc)),
            _ => None,
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Name and parameters of a macro visible at the completion point.
#[derive(Debug, Clone)]
pub struct MacroSignature {
    pub name: String,
    pub params: Option<Vec<String>>,
    pub variadic: bool,
    pub name_loc: Loc,
}

#[derive(Debug, Default)]
pub struct PreprocessorOutput {
    pub tokens: Vec<Token>,
    pub record: PreprocessingRecord,
    /// Files whose declarations come from an imported AST file.
    pub pch_files: FxHashSet<FileId>,
    pub completion_macros: Option<Vec<MacroSignature>>,
}

#[derive(Debug, Clone, Default)]
pub struct PreprocessorOptions {
    /// Keep macro definitions and expansions in the record.
    pub detailed_record: bool,
}

enum Pending {
    Token(Token),
    EndExpansion(String),
    ArgEnd,
}

/// Multiple-include guard detection for one file.
#[derive(Debug, Clone)]
enum GuardState {
    Start,
    Candidate { name: String, depth: usize },
    Closed { name: String },
    Invalid,
}

struct Frame {
    lexer: Lexer,
    file: FileId,
    conditionals: Vec<Conditional>,
    guard: GuardState,
    is_system: bool,
    from_pch: bool,
}

pub struct Preprocessor<'a> {
    sm: &'a mut SourceManager,
    diags: &'a mut DiagnosticsEngine,
    fs: &'a FileSystem,
    search: &'a HeaderSearch,
    options: PreprocessorOptions,
    frames: Vec<Frame>,
    pending: VecDeque<Pending>,
    active: FxHashSet<String>,
    macros: FxHashMap<String, Rc<MacroDef>>,
    once: FxHashSet<FileId>,
    guards: FxHashMap<FileId, String>,
    record: PreprocessingRecord,
    pch_files: FxHashSet<FileId>,
    emitted: u32,
    last_loc: Loc,
    completion_macros: Option<Vec<MacroSignature>>,
}

impl<'a> Preprocessor<'a> {
    pub fn new(
        sm: &'a mut SourceManager,
        diags: &'a mut DiagnosticsEngine,
        fs: &'a FileSystem,
        search: &'a HeaderSearch,
        options: PreprocessorOptions,
    ) -> Self {
        Preprocessor {
            sm,
            diags,
            fs,
            search,
            options,
            frames: Vec::new(),
            pending: VecDeque::new(),
            active: FxHashSet::default(),
            macros: FxHashMap::default(),
            once: FxHashSet::default(),
            guards: FxHashMap::default(),
            record: PreprocessingRecord::default(),
            pch_files: FxHashSet::default(),
            emitted: 0,
            last_loc: Loc::INVALID,
            completion_macros: None,
        }
    }

    /// Push the main file. Files pushed later are lexed before it.
    pub fn enter_main_file(&mut self, file: FileId) {
        self.sm.set_main_file(file);
        self.push_frame(file, Loc::INVALID, false, false);
    }

    /// Push the main file of an imported AST file.
    pub fn enter_pch_file(&mut self, file: FileId) {
        self.push_frame(file, Loc::INVALID, false, true);
    }

    /// Push the predefined-macro buffer.
    pub fn enter_predefines(&mut self, text: &str) {
        let file = self
            .sm
            .add_file(BUILTIN_BUFFER, Arc::from(text), None, None, false);
        self.push_frame(file, Loc::INVALID, false, false);
    }

    fn push_frame(&mut self, file: FileId, include_loc: Loc, is_system: bool, from_pch: bool) {
        let start = self.sm.enter_file(file, include_loc);
        let contents = self.sm.file(file).contents.clone();
        let from_pch = from_pch
            || (include_loc.is_valid() && self.frames.last().is_some_and(|f| f.from_pch));
        if from_pch {
            self.pch_files.insert(file);
        }
        self.frames.push(Frame {
            lexer: Lexer::new(contents, start),
            file,
            conditionals: Vec::new(),
            guard: GuardState::Start,
            is_system: is_system || self.sm.file(file).is_system,
            from_pch,
        });
    }

    /// Run to the end of the main file.
    pub fn run(mut self) -> PreprocessorOutput {
        let mut tokens = Vec::new();
        loop {
            self.emitted = tokens.len() as u32;
            let token = self.next_token();
            if let TokenKind::Eof = token.kind {
                tokens.push(token);
                break;
            }
            if token.ident() == Some(COMPLETION_SENTINEL) {
                // everything after the completion point is cut off
                self.completion_macros = Some(self.macro_signatures());
                let eof = Token::new(TokenKind::Eof, token.end(), 0);
                tokens.push(token);
                tokens.push(eof);
                break;
            }
            tokens.push(token);
        }
        tracing::debug!(
            tokens = tokens.len(),
            entities = self.record.len(),
            macros = self.macros.len(),
            "preprocessing finished"
        );
        PreprocessorOutput {
            tokens,
            record: self.record,
            pch_files: self.pch_files,
            completion_macros: self.completion_macros,
        }
    }

    fn macro_signatures(&self) -> Vec<MacroSignature> {
        let mut out: Vec<_> = self
            .macros
            .values()
            .filter(|m| !m.is_builtin)
            .map(|m| MacroSignature {
                name: m.name.clone(),
                params: m.params.clone(),
                variadic: m.variadic,
                name_loc: m.name_loc,
            })
            .collect();
        out.sort_by(|a, b| a.name.cmp(&b.name));
        out
    }

    /// Next fully macro-expanded token.
    fn next_token(&mut self) -> Token {
        loop {
            let mut token = self.next_unexpanded();
            let Some(name) = token.ident() else {
                return token;
            };
            if token.no_expand {
                return token;
            }
            if self.active.contains(name) {
                token.no_expand = true;
                return token;
            }
            if !self.try_expand(&token) {
                return token;
            }
        }
    }

    /// Next token before macro expansion, from the pending queue or a file.
    fn next_unexpanded(&mut self) -> Token {
        loop {
            match self.pending.pop_front() {
                Some(Pending::Token(token)) => return token,
                Some(Pending::EndExpansion(name)) => {
                    self.active.remove(&name);
                }
                Some(Pending::ArgEnd) => {
                    self.pending.push_front(Pending::ArgEnd);
                    return Token::new(TokenKind::Eof, self.last_loc, 0);
                }
                None => return self.lex_from_file(),
            }
        }
    }

    fn at_arg_end(&self) -> bool {
        matches!(self.pending.front(), Some(Pending::ArgEnd))
    }

    fn unget(&mut self, token: Token) {
        self.pending.push_front(Pending::Token(token));
    }

    fn lex_from_file(&mut self) -> Token {
        loop {
            let Some(frame) = self.frames.last_mut() else {
                return Token::new(TokenKind::Eof, self.last_loc, 0);
            };
            let token = frame.lexer.next_token();
            self.flush_lex_errors();
            match token.kind {
                TokenKind::Eof => {
                    self.last_loc = token.loc;
                    self.exit_file();
                    if self.frames.is_empty() {
                        return token;
                    }
                }
                TokenKind::Hash if token.at_line_start => self.handle_directive(token),
                _ => {
                    if let Some(frame) = self.frames.last_mut() {
                        frame.guard = match std::mem::replace(&mut frame.guard, GuardState::Invalid) {
                            candidate @ GuardState::Candidate { .. } => candidate,
                            _ => GuardState::Invalid,
                        };
                    }
                    self.last_loc = token.loc;
                    return token;
                }
            }
        }
    }

    fn flush_lex_errors(&mut self) {
        if let Some(frame) = self.frames.last_mut() {
            let errors = frame.lexer.take_errors();
            for err in errors {
                self.diags.error(Category::Lexical, err.loc, err.message);
            }
        }
    }

    fn exit_file(&mut self) {
        let Some(frame) = self.frames.pop() else {
            return;
        };
        for cond in frame.conditionals.iter().rev() {
            self.diags
                .error(Category::Lexical, cond.loc, "unterminated conditional directive");
        }
        if let GuardState::Closed { name } = frame.guard {
            tracing::trace!(file = %self.sm.file(frame.file).name, guard = %name, "include guard detected");
            self.sm.mark_include_guarded(frame.file);
            self.guards.insert(frame.file, name);
        }
    }

    /// Raw tokens up to the end of the current directive line.
    fn directive_tokens(&mut self) -> Vec<Token> {
        let mut out = Vec::new();
        if let Some(frame) = self.frames.last_mut() {
            loop {
                let token = frame.lexer.next_token();
                if token.at_line_start || matches!(token.kind, TokenKind::Eof) {
                    frame.lexer.unget(token);
                    break;
                }
                out.push(token);
            }
        }
        self.flush_lex_errors();
        out
    }

    /// Discard the rest of a directive line, warning if anything is left.
    fn finish_directive(&mut self, directive: &str) {
        let extra = self.directive_tokens();
        if let Some(first) = extra.first() {
            self.diags.warning(
                Category::Lexical,
                first.loc,
                format!("extra tokens at end of #{} directive", directive),
                "extra-tokens",
            );
        }
    }

    fn handle_directive(&mut self, hash: Token) {
        let Some(frame) = self.frames.last_mut() else {
            return;
        };
        let name_token = frame.lexer.next_token();
        if name_token.at_line_start || matches!(name_token.kind, TokenKind::Eof) {
            // null directive
            frame.lexer.unget(name_token);
            return;
        }
        let Some(name) = token_name(&name_token.kind) else {
            self.diags
                .error(Category::Lexical, name_token.loc, "invalid preprocessing directive");
            self.directive_tokens();
            return;
        };

        if !matches!(name.as_str(), "ifndef" | "endif") {
            if let Some(frame) = self.frames.last_mut() {
                if matches!(frame.guard, GuardState::Start | GuardState::Closed { .. }) {
                    frame.guard = GuardState::Invalid;
                }
            }
        }

        match name.as_str() {
            "include" | "include_next" => self.handle_include(&hash, false),
            "import" => self.handle_include(&hash, true),
            "define" => self.handle_define(),
            "undef" => self.handle_undef(),
            "if" | "ifdef" | "ifndef" => self.handle_if(&name, &hash),
            "elif" => self.handle_elif(&hash),
            "else" => self.handle_else(&hash),
            "endif" => self.handle_endif(&hash),
            "pragma" => self.handle_pragma(&hash),
            "line" => self.handle_line(),
            "error" | "warning" => {
                let message = self
                    .frames
                    .last_mut()
                    .map(|f| f.lexer.rest_of_line())
                    .unwrap_or_default();
                if name == "error" {
                    self.diags.error(Category::Lexical, name_token.loc, message);
                } else {
                    self.diags
                        .warning(Category::Lexical, name_token.loc, message, "#warnings");
                }
            }
            "ident" | "sccs" => {
                self.directive_tokens();
            }
            _ => {
                self.diags
                    .error(Category::Lexical, name_token.loc, "invalid preprocessing directive");
                self.directive_tokens();
            }
        }
    }

    fn handle_include(&mut self, hash: &Token, is_import: bool) {
        let header = self
            .frames
            .last_mut()
            .and_then(|frame| frame.lexer.lex_header_name());

        let (name, angled, name_loc, end) = match header {
            Some(Token {
                kind: TokenKind::HeaderName(name),
                loc,
                len,
                ..
            }) => {
                self.finish_directive("include");
                (name, true, loc, loc.offset(len))
            }
            _ => {
                let mut tokens = self.directive_tokens();
                if tokens.first().is_some_and(|t| t.ident().is_some()) {
                    tokens = self.expand_isolated(tokens);
                }
                match self.include_name(&tokens) {
                    Some((name, angled, end)) => (name, angled, tokens[0].loc, end),
                    None => {
                        let loc = tokens.first().map_or(hash.loc, |t| t.loc);
                        self.diags.error(
                            Category::Lexical,
                            loc,
                            "expected \"FILENAME\" or <FILENAME>",
                        );
                        return;
                    }
                }
            }
        };

        let span = Span::new(hash.loc, end);
        if self.frames.len() >= MAX_INCLUDE_DEPTH {
            self.diags
                .error(Category::Lexical, hash.loc, "#include nested too deeply");
            return;
        }

        let (includer_dir, includer_system) = match self.frames.last() {
            Some(frame) => (parent_dir(&self.sm.file(frame.file).name), frame.is_system),
            None => (None, false),
        };
        let found = self.resolve_include(&name, angled, includer_dir.as_deref());
        self.record.push(
            PpEntity::Inclusion(InclusionDirective {
                name: name.clone(),
                angled,
                is_import,
                hash_loc: hash.loc,
                span,
                file: found.map(|(file, _)| file),
            }),
            self.emitted,
        );

        let Some((file, is_system)) = found else {
            self.diags
                .fatal(Category::Lexical, name_loc, format!("'{}' file not found", name));
            return;
        };

        if self.once.contains(&file) {
            tracing::trace!(%name, "skipping include of #pragma once / #import file");
            return;
        }
        if let Some(guard) = self.guards.get(&file) {
            if self.macros.contains_key(guard) {
                tracing::trace!(%name, %guard, "skipping guarded include");
                return;
            }
        }
        if is_import {
            self.once.insert(file);
        }
        tracing::trace!(%name, path = %self.sm.file(file).name, "entering include");
        self.push_frame(file, hash.loc, is_system || includer_system, false);
    }

    /// Interpret the tokens of a computed include.
    fn include_name(&self, tokens: &[Token]) -> Option<(String, bool, Loc)> {
        let first = tokens.first()?;
        match &first.kind {
            TokenKind::StringLiteral(name) => Some((name.clone(), false, first.end())),
            TokenKind::Lt => {
                let close = tokens.iter().position(|t| t.is(&TokenKind::Gt))?;
                let mut name = String::new();
                for (i, token) in tokens[1..close].iter().enumerate() {
                    if i > 0 && token.leading_space {
                        name.push(' ');
                    }
                    name.push_str(&self.spelling(token));
                }
                Some((name, true, tokens[close].end()))
            }
            _ => None,
        }
    }

    fn resolve_include(&mut self, name: &str, angled: bool, includer_dir: Option<&str>) -> Option<(FileId, bool)> {
        for candidate in self.search.candidates(name, angled, includer_dir) {
            if let Some(existing) = self.sm.find_file(&candidate.path) {
                return Some((existing, candidate.is_system));
            }
            if let Some(data) = self.fs.read(&candidate.path) {
                let file = self.sm.add_file(
                    &candidate.path,
                    data.contents,
                    data.mtime,
                    data.unique_id,
                    candidate.is_system,
                );
                return Some((file, candidate.is_system));
            }
            tracing::trace!(path = %candidate.path, "include candidate not found");
        }
        None
    }

    fn handle_pragma(&mut self, hash: &Token) {
        let tokens = self.directive_tokens();
        let Some(frame) = self.frames.last() else {
            return;
        };
        let file = frame.file;
        match tokens.first().and_then(|t| t.ident()) {
            Some("once") => {
                if Some(file) == self.sm.main_file() {
                    self.diags.warning(
                        Category::Lexical,
                        hash.loc,
                        "#pragma once in main file",
                        "pragma-once-outside-header",
                    );
                }
                self.sm.mark_include_guarded(file);
                self.once.insert(file);
            }
            Some("GCC") if tokens.get(1).and_then(|t| t.ident()) == Some("system_header") => {
                if let Some(frame) = self.frames.last_mut() {
                    frame.is_system = true;
                }
            }
            _ => {}
        }
    }

    fn handle_line(&mut self) {
        let raw = self.directive_tokens();
        let tokens = self.expand_isolated(raw);
        let Some(frame) = self.frames.last() else {
            return;
        };
        let file = frame.file;
        let line = match tokens.first().map(|t| &t.kind) {
            Some(TokenKind::IntLiteral(n)) => *n as u32,
            _ => {
                let loc = tokens.first().map_or(self.last_loc, |t| t.loc);
                self.diags
                    .error(Category::Lexical, loc, "#line directive requires a simple digit sequence");
                return;
            }
        };
        let filename = match tokens.get(1).map(|t| &t.kind) {
            Some(TokenKind::StringLiteral(name)) => Some(name.clone()),
            _ => None,
        };
        let last_end = tokens.last().map(|t| self.sm.spelling_loc(t.end()));
        let Some((_, offset)) = last_end.and_then(|loc| self.sm.decompose(loc)) else {
            return;
        };
        let text = &self.sm.file(file).contents;
        let next_line = text[offset as usize..]
            .find('\n')
            .map_or(text.len(), |i| offset as usize + i + 1);
        self.sm
            .add_line_directive(file, next_line as u32, line, filename);
    }

    /// Spelling of a token, re-read from the source it came from.
    fn spelling(&self, token: &Token) -> String {
        match self.sm.spelling_text(token.loc, token.len) {
            Some(text) => text.to_string(),
            None => match &token.kind {
                TokenKind::Ident(name) => name.clone(),
                other => token_name(other).unwrap_or_default(),
            },
        }
    }
}

/// Directive or macro name carried by an identifier or keyword token.
pub(crate) fn token_name(kind: &TokenKind) -> Option<String> {
    match kind {
        TokenKind::Ident(name) => Some(name.clone()),
        k if k.is_keyword() => Some(k.to_string().trim_matches('\'').to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::Severity;

    pub(super) struct Run {
        pub sm: SourceManager,
        pub out: PreprocessorOutput,
        pub diags: DiagnosticsEngine,
    }

    pub(super) fn preprocess_with(files: &[(&str, &str)], detailed: bool) -> Run {
        let mut fs = FileSystem::new();
        for (name, text) in files {
            fs.add(name, text);
        }
        let search = HeaderSearch::default();
        let mut sm = SourceManager::new();
        let mut diags = DiagnosticsEngine::default();
        let (main_name, main_text) = files[0];
        let main = sm.add_file(main_name, Arc::from(main_text), None, None, false);
        let out = {
            let mut pp = Preprocessor::new(
                &mut sm,
                &mut diags,
                &fs,
                &search,
                PreprocessorOptions {
                    detailed_record: detailed,
                },
            );
            pp.enter_main_file(main);
            pp.enter_predefines("#define __STDC__ 1\n#define NULL ((void *)0)\n");
            pp.run()
        };
        Run { sm, out, diags }
    }

    pub(super) fn spellings(run: &Run) -> Vec<String> {
        run.out
            .tokens
            .iter()
            .filter(|t| !matches!(t.kind, TokenKind::Eof))
            .map(|t| run.sm.spelling_text(t.loc, t.len).unwrap_or("?").to_string())
            .collect()
    }

    #[test]
    fn test_object_like_macro() {
        let run = preprocess_with(&[("t.c", "#define N 10\nint a[N];\n")], true);
        assert_eq!(spellings(&run), vec!["int", "a", "[", "10", "]", ";"]);
        let ten = &run.out.tokens[3];
        assert!(run.sm.is_macro(ten.loc));
        assert_eq!(run.sm.text(Span::new(run.sm.expansion_loc(ten.loc), run.sm.expansion_loc(ten.loc).offset(1))), Some("N"));
    }

    #[test]
    fn test_builtin_null() {
        let run = preprocess_with(&[("t.c", "void *p = NULL;\n")], false);
        assert_eq!(
            spellings(&run),
            vec!["void", "*", "p", "=", "(", "(", "void", "*", ")", "0", ")", ";"]
        );
    }

    #[test]
    fn test_include_and_record() {
        let run = preprocess_with(
            &[("t.c", "#include \"a.h\"\nint y = A;\n"), ("a.h", "#define A 1\nint x;\n")],
            true,
        );
        assert_eq!(spellings(&run), vec!["int", "x", ";", "int", "y", "=", "1", ";"]);
        let kinds: Vec<_> = run
            .out
            .record
            .iter()
            .map(|(_, e)| match &e.entity {
                PpEntity::Inclusion(_) => "inclusion",
                PpEntity::MacroDefinition(_) => "definition",
                PpEntity::MacroExpansion(_) => "expansion",
            })
            .collect();
        assert_eq!(kinds, vec!["inclusion", "definition", "expansion"]);
        let expansion = run.out.record.iter().last().unwrap().1;
        assert_eq!(expansion.seq, 6);
    }

    #[test]
    fn test_missing_include_is_fatal() {
        let run = preprocess_with(&[("t.c", "#include \"nope.h\"\nint x = ;\n")], false);
        let diags = run.diags.diagnostics();
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].severity, Severity::Fatal);
        assert_eq!(diags[0].message, "'nope.h' file not found");
        let inclusion = run.out.record.inclusions().next().unwrap().1;
        assert!(inclusion.file.is_none());
    }

    #[test]
    fn test_include_guard_and_pragma_once() {
        let run = preprocess_with(
            &[
                ("t.c", "#include \"g.h\"\n#include \"g.h\"\n#include \"o.h\"\n#include \"o.h\"\n"),
                ("g.h", "#ifndef G_H\n#define G_H\nint g;\n#endif\n"),
                ("o.h", "#pragma once\nint o;\n"),
            ],
            false,
        );
        assert_eq!(spellings(&run), vec!["int", "g", ";", "int", "o", ";"]);
        let g = run.sm.find_file("g.h").unwrap();
        let o = run.sm.find_file("o.h").unwrap();
        assert!(run.sm.file(g).include_guarded);
        assert!(run.sm.file(o).include_guarded);
        assert_eq!(run.out.record.inclusions().count(), 4);
    }

    #[test]
    fn test_unguarded_header_is_not_marked() {
        let run = preprocess_with(
            &[
                ("t.c", "#include \"h.h\"\n"),
                ("h.h", "int before;\n#ifndef H\n#define H\n#endif\n"),
            ],
            false,
        );
        let h = run.sm.find_file("h.h").unwrap();
        assert!(!run.sm.file(h).include_guarded);
    }

    #[test]
    fn test_error_and_warning_directives() {
        let run = preprocess_with(&[("t.c", "#warning careful\n#error stop here\n")], false);
        let diags = run.diags.diagnostics();
        assert_eq!(diags[0].severity, Severity::Warning);
        assert_eq!(diags[0].message, "careful");
        assert_eq!(diags[1].severity, Severity::Error);
        assert_eq!(diags[1].message, "stop here");
    }

    #[test]
    fn test_line_directive_changes_presumed_location() {
        let run = preprocess_with(&[("t.c", "#line 40 \"gen.y\"\nint x;\n")], false);
        let x = &run.out.tokens[1];
        assert_eq!(run.sm.presumed(x.loc), Some(("gen.y".to_string(), 40, 5)));
    }

    #[test]
    fn test_completion_sentinel_cuts_stream() {
        let run = preprocess_with(
            &[("t.c", "#define M 1\nint x = __cindex_code_completion__ + M;\n")],
            false,
        );
        assert_eq!(run.out.tokens.len(), 5);
        let macros = run.out.completion_macros.unwrap();
        assert_eq!(macros.len(), 1);
        assert_eq!(macros[0].name, "M");
    }
}
