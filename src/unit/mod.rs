//! Translation units
//!
//! A [`TranslationUnit`] owns everything produced by one run of the front end:
//! the source manager, the AST, the preprocessing record and the diagnostics.
//! Cursors, locations, tokens and diagnostics borrow from it, so the borrow
//! checker rules out using any of them across a [`TranslationUnit::reparse`].

pub(crate) mod args;
pub mod saved;
pub mod session;

pub use saved::SaveError;
pub use session::Index;

use crate::cursor::{Cursor, CursorKind};
use crate::diagnostics::{DiagnosticSet, DiagnosticsEngine, Severity, StoredDiagnostic};
use crate::parser::ast::{Ast, NodeId};
use crate::parser::parse::{Parser, ParserOptions};
use crate::parser::preprocessor::{
    FileSystem, MacroSignature, PpEntity, PreprocessingRecord, Preprocessor, PreprocessorOptions,
};
use crate::parser::sema::CompletionContext;
use crate::source::{File, FileId, Loc, SourceLocation, SourceManager, SourceRange, Span};
use args::{CompileArgs, PREDEFINES};
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use std::panic::{self, AssertUnwindSafe};
use thiserror::Error;

/// Why a unit could not be produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ErrorCode {
    #[error("translation unit could not be created")]
    Failure,
    #[error("the front end crashed while parsing")]
    Crashed,
    #[error("invalid arguments")]
    InvalidArguments,
    #[error("the AST file could not be read")]
    AstReadError,
}

/// Contents that stand in for a file on disk. Copied by the call that
/// receives it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnsavedFile {
    pub filename: String,
    pub contents: String,
}

impl UnsavedFile {
    pub fn new(filename: impl Into<String>, contents: impl Into<String>) -> Self {
        UnsavedFile {
            filename: filename.into(),
            contents: contents.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseOptions {
    /// Keep macro definitions and expansions in the preprocessing record.
    pub detailed_preprocessing_record: bool,
    pub skip_function_bodies: bool,
    /// The unit is a header or otherwise incomplete; tentative definitions stay
    /// declarations.
    pub incomplete: bool,
    pub include_brief_comments_in_code_completion: bool,
}

impl ParseOptions {
    /// Options suited to a unit that is kept open in an editor.
    pub fn editing() -> Self {
        ParseOptions {
            detailed_preprocessing_record: true,
            include_brief_comments_in_code_completion: true,
            ..ParseOptions::default()
        }
    }
}

/// Everything needed to rebuild a unit from scratch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct Invocation {
    pub source: String,
    pub args: Vec<String>,
    pub unsaved: Vec<UnsavedFile>,
    pub options: ParseOptions,
}

/// Settings a unit inherits from the [`Index`] that created it.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct SessionConfig {
    pub hide_pch_declarations: bool,
    pub display_diagnostics: bool,
    pub crash_recovery: bool,
}

/// An AST file brought in with `-include-pch`.
#[derive(Debug, Clone)]
pub(crate) struct ImportedAst {
    pub path: String,
    pub main_file: FileId,
}

/// State captured when a completion parse reaches its completion point.
#[derive(Debug, Clone)]
pub(crate) struct CompletionState {
    pub context: Option<CompletionContext>,
    pub macros: Vec<MacroSignature>,
}

/// Extra inputs for building a unit beyond its invocation.
#[derive(Debug, Clone, Default)]
pub(crate) struct BuildHooks {
    /// Function bodies to skip, by file name and brace offset.
    pub skip_bodies_at: FxHashSet<(String, u32)>,
    pub suppress_warnings: bool,
}

/// A parsed source file together with everything it included.
#[derive(Debug)]
pub struct TranslationUnit {
    pub(crate) sm: SourceManager,
    pub(crate) ast: Ast,
    pub(crate) record: PreprocessingRecord,
    pub(crate) diagnostics: Vec<StoredDiagnostic>,
    pub(crate) pch_files: FxHashSet<FileId>,
    pub(crate) imports: Vec<ImportedAst>,
    pub(crate) invocation: Invocation,
    pub(crate) session: SessionConfig,
    pub(crate) completion: Option<CompletionState>,
}

impl TranslationUnit {
    /// Run the front end over an invocation.
    pub(crate) fn build(
        invocation: Invocation,
        session: SessionConfig,
        hooks: &BuildHooks,
    ) -> Result<TranslationUnit, ErrorCode> {
        if !session.crash_recovery {
            return Self::build_inner(invocation, session, hooks);
        }
        match panic::catch_unwind(AssertUnwindSafe(|| Self::build_inner(invocation, session, hooks))) {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!("front end panicked; reporting a crashed parse");
                Err(ErrorCode::Crashed)
            }
        }
    }

    fn build_inner(
        invocation: Invocation,
        session: SessionConfig,
        hooks: &BuildHooks,
    ) -> Result<TranslationUnit, ErrorCode> {
        let args = CompileArgs::parse(&invocation.args)?;
        let mut fs = FileSystem::new();
        let mut predefines = PREDEFINES.to_string();

        let mut imported = Vec::new();
        for path in &args.include_pch {
            let saved = saved::SavedUnit::load(path).map_err(|err| {
                tracing::warn!(%path, %err, "cannot import AST file");
                ErrorCode::AstReadError
            })?;
            for file in &saved.files {
                fs.add(&file.name, &file.contents);
            }
            if let Ok(pch_args) = CompileArgs::parse(&saved.invocation.args) {
                predefines.push_str(&pch_args.macro_lines());
            }
            imported.push((path.clone(), saved.invocation.source.clone()));
        }
        for file in &invocation.unsaved {
            fs.add(&file.filename, &file.contents);
        }
        predefines.push_str(&args.macro_lines());

        let mut sm = SourceManager::new();
        let Some(data) = fs.read(&invocation.source) else {
            tracing::warn!(source = %invocation.source, "main file not found");
            return Err(ErrorCode::Failure);
        };
        let main = sm.add_file(&invocation.source, data.contents, data.mtime, data.unique_id, false);

        let mut imports = Vec::new();
        for (path, source) in &imported {
            let data = fs.read(source).ok_or(ErrorCode::AstReadError)?;
            let file = sm.add_file(source, data.contents, data.mtime, data.unique_id, false);
            imports.push(ImportedAst {
                path: path.clone(),
                main_file: file,
            });
        }

        let mut config = args.diagnostics.clone();
        config.ignore_warnings |= hooks.suppress_warnings;
        let mut diags = DiagnosticsEngine::new(config);

        tracing::debug!(source = %invocation.source, "preprocessing");
        let output = {
            let mut pp = Preprocessor::new(
                &mut sm,
                &mut diags,
                &fs,
                &args.search,
                PreprocessorOptions {
                    detailed_record: invocation.options.detailed_preprocessing_record,
                },
            );
            pp.enter_main_file(main);
            // later frames are lexed first: imports run in command-line order
            for import in imports.iter().rev() {
                pp.enter_pch_file(import.main_file);
            }
            pp.enter_predefines(&predefines);
            pp.run()
        };

        tracing::debug!(tokens = output.tokens.len(), "parsing");
        let parser_options = ParserOptions {
            skip_function_bodies: invocation.options.skip_function_bodies,
            skip_bodies_at: hooks.skip_bodies_at.clone(),
        };
        let parsed = Parser::new(output.tokens, &sm, &mut diags, parser_options, output.pch_files.clone())
            .parse_translation_unit();

        let completion = output.completion_macros.map(|macros| CompletionState {
            context: parsed.completion,
            macros,
        });
        let unit = TranslationUnit {
            sm,
            ast: parsed.ast,
            record: output.record,
            diagnostics: diags.into_diagnostics(),
            pch_files: output.pch_files,
            imports,
            invocation,
            session,
            completion,
        };
        if session.display_diagnostics {
            unit.print_diagnostics();
        }
        Ok(unit)
    }

    fn print_diagnostics(&self) {
        for diagnostic in self.diagnostics().iter() {
            eprintln!("{}", diagnostic.format(Default::default()));
        }
    }

    /// The cursor of the whole unit.
    pub fn cursor(&self) -> Cursor<'_> {
        Cursor::from_node(self, NodeId::ROOT)
    }

    /// Name of the main source file.
    pub fn spelling(&self) -> &str {
        self.main_file_name()
    }

    pub fn main_file_name(&self) -> &str {
        &self.invocation.source
    }

    pub fn main_file(&self) -> Option<File<'_>> {
        self.sm.main_file().map(|id| File::new(&self.sm, id))
    }

    /// The whole of the main file.
    pub fn main_file_range(&self) -> SourceRange<'_> {
        let Some(main) = self.sm.main_file() else {
            return SourceRange::null();
        };
        let start = self.sm.file_start(main);
        let len = self.sm.file(main).contents.len() as u32;
        SourceRange::from_span(&self.sm, Span::new(start, start.offset(len)))
    }

    /// A file that took part in this unit, by name.
    pub fn file(&self, name: &str) -> Option<File<'_>> {
        self.sm.find_file(name).map(|id| File::new(&self.sm, id))
    }

    /// Every file that took part in this unit.
    pub fn files(&self) -> Vec<File<'_>> {
        self.sm
            .files()
            .filter(|(id, entry)| !self.sm.is_scratch(*id) && entry.name != crate::source::BUILTIN_BUFFER)
            .map(|(id, _)| File::new(&self.sm, id))
            .collect()
    }

    pub fn location(&self, file: File<'_>, line: u32, column: u32) -> SourceLocation<'_> {
        SourceLocation::new(&self.sm, self.sm.loc_for_line_column(file.id(), line, column))
    }

    pub fn location_for_offset(&self, file: File<'_>, offset: u32) -> SourceLocation<'_> {
        SourceLocation::new(&self.sm, self.sm.loc_for_offset(file.id(), offset))
    }

    pub fn diagnostics(&self) -> DiagnosticSet<'_> {
        DiagnosticSet::new(&self.sm, &self.diagnostics)
    }

    pub(crate) fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(|d| d.severity >= Severity::Error)
    }

    pub fn options(&self) -> ParseOptions {
        self.invocation.options
    }

    /// Visit every file entered while preprocessing together with its
    /// inclusion stack, innermost `#include` first. The main file comes first
    /// with an empty stack.
    pub fn inclusions<F>(&self, mut visitor: F)
    where
        F: FnMut(File<'_>, &[SourceLocation<'_>]),
    {
        if let Some(main) = self.main_file() {
            visitor(main, &[]);
        }
        for (_, inclusion) in self.record.inclusions() {
            let Some(file) = inclusion.file else {
                continue;
            };
            let mut stack = Vec::new();
            let mut loc = inclusion.hash_loc;
            while loc.is_valid() {
                stack.push(SourceLocation::new(&self.sm, loc));
                loc = self.sm.include_loc(loc);
            }
            visitor(File::new(&self.sm, file), &stack);
        }
    }

    /// Most specific cursor whose extent contains `location`. Preprocessing
    /// entities win over AST nodes. Returns a `NoDeclFound` cursor when
    /// nothing covers the location.
    pub fn cursor_at(&self, location: SourceLocation<'_>) -> Cursor<'_> {
        let same_unit = location
            .manager()
            .is_some_and(|sm| std::ptr::eq(sm, &self.sm));
        if !same_unit {
            return Cursor::null();
        }
        let loc = self.sm.expansion_loc(location.raw());
        self.cursor_at_loc(loc)
    }

    pub(crate) fn cursor_at_loc(&self, loc: Loc) -> Cursor<'_> {
        let contains = |span: Span| {
            let span = self.sm.expansion_span(span);
            span.begin.raw() <= loc.raw() && loc.raw() < span.end.raw()
        };

        if let Some((id, _)) = self
            .record
            .iter()
            .find(|(_, entry)| !self.is_hidden_pp_entity(&entry.entity) && contains(entry.entity.span()))
        {
            return Cursor::from_pp(self, id);
        }

        let mut found = None;
        let mut parent = NodeId::ROOT;
        while let Some(child) = self
            .ast
            .children(parent)
            .iter()
            .copied()
            .find(|c| !self.ast.node(*c).implicit && contains(self.ast.node(*c).span))
        {
            found = Some(child);
            parent = child;
        }
        match found {
            Some(id) => Cursor::from_node(self, id),
            None => Cursor::invalid(self, CursorKind::NoDeclFound),
        }
    }

    /// Preprocessing entities that belong to an imported AST file are
    /// hidden along with its declarations.
    pub(crate) fn is_hidden_pp_entity(&self, entity: &PpEntity) -> bool {
        if !self.session.hide_pch_declarations {
            return false;
        }
        self.sm
            .decompose(self.sm.expansion_loc(entity.span().begin))
            .is_some_and(|(file, _)| self.pch_files.contains(&file))
    }

    /// Build the unit again with new unsaved contents. The old unit is
    /// consumed whether or not the reparse succeeds.
    pub fn reparse(self, unsaved: &[UnsavedFile]) -> Result<TranslationUnit, ErrorCode> {
        let mut invocation = self.invocation;
        let session = self.session;
        for file in unsaved {
            invocation.unsaved.retain(|existing| existing.filename != file.filename);
            invocation.unsaved.push(file.clone());
        }
        tracing::debug!(source = %invocation.source, "reparsing");
        TranslationUnit::build(invocation, session, &BuildHooks::default())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn parse_unit(source: &str) -> TranslationUnit {
        parse_unit_with(source, ParseOptions::default())
    }

    pub(crate) fn parse_unit_with(source: &str, options: ParseOptions) -> TranslationUnit {
        Index::new(false, false)
            .parse_translation_unit(Some("t.c"), &[] as &[&str], &[UnsavedFile::new("t.c", source)], options)
            .expect("unit should parse")
    }

    /// Parse the first file of `files` with the rest available for inclusion.
    pub(crate) fn parse_files(files: &[(&str, &str)]) -> TranslationUnit {
        let unsaved: Vec<_> = files.iter().map(|(n, c)| UnsavedFile::new(*n, *c)).collect();
        Index::new(false, false)
            .parse_translation_unit(Some(files[0].0), &[] as &[&str], &unsaved, ParseOptions::default())
            .expect("unit should parse")
    }

    #[test]
    fn test_missing_main_file_fails() {
        let result = Index::new(false, false).parse_translation_unit(
            Some("does/not/exist.c"),
            &[] as &[&str],
            &[],
            ParseOptions::default(),
        );
        assert!(matches!(result, Err(ErrorCode::Failure)));
    }

    #[test]
    fn test_cursor_at() {
        let tu = parse_unit("struct P { int x; };\nstruct P p;\n");
        let file = tu.file("t.c").unwrap();
        assert_eq!(tu.cursor_at(tu.location(file, 2, 8)).kind(), CursorKind::TypeRef);
        assert_eq!(tu.cursor_at(tu.location(file, 2, 10)).kind(), CursorKind::VarDecl);
        assert_eq!(tu.cursor_at(tu.location(file, 1, 16)).spelling(), "x");
        assert_eq!(tu.cursor_at(tu.location(file, 3, 1)).kind(), CursorKind::NoDeclFound);
    }

    #[test]
    fn test_location_past_line_end() {
        let tu = parse_unit("int a;\nint b;\n");
        let file = tu.file("t.c").unwrap();
        let loc = tu.location(file, 2, u32::MAX).file_location();
        assert_eq!((loc.line, loc.column), (2, 7));
        let loc = file.location(1, 100).file_location();
        assert_eq!((loc.line, loc.column), (1, 7));
    }

    #[test]
    fn test_cursor_at_macro_expansion() {
        let options = ParseOptions {
            detailed_preprocessing_record: true,
            ..ParseOptions::default()
        };
        let tu = parse_unit_with("#define N 4\nint a[N];\n", options);
        let file = tu.file("t.c").unwrap();
        let cursor = tu.cursor_at(tu.location(file, 2, 7));
        assert_eq!(cursor.kind(), CursorKind::MacroExpansion);
        assert_eq!(cursor.referenced().kind(), CursorKind::MacroDefinition);
        assert_eq!(cursor.referenced().spelling(), "N");
    }

    #[test]
    fn test_inclusion_stack() {
        let tu = parse_files(&[
            ("main.c", "#include \"a.h\"\n"),
            ("a.h", "#include \"b.h\"\n"),
            ("b.h", "int b;\n"),
        ]);
        let mut seen = Vec::new();
        tu.inclusions(|file, stack| seen.push((file.name().to_string(), stack.len())));
        assert_eq!(
            seen,
            vec![("main.c".to_string(), 0), ("a.h".to_string(), 1), ("b.h".to_string(), 2)]
        );
    }

    #[test]
    fn test_reparse_picks_up_new_contents() {
        let tu = parse_unit("int a;\n");
        assert_eq!(tu.cursor().children().len(), 1);
        let tu = tu.reparse(&[UnsavedFile::new("t.c", "int a;\nint b;\n")]).unwrap();
        assert_eq!(tu.cursor().children().len(), 2);
        assert_eq!(tu.cursor().children()[1].spelling(), "b");
    }

    #[test]
    fn test_warning_flags() {
        let index = Index::new(false, false);
        let source = [UnsavedFile::new("t.c", "int f(void) { return g(); }\n")];
        let plain = index
            .parse_translation_unit(Some("t.c"), &[] as &[&str], &source, ParseOptions::default())
            .unwrap();
        assert_eq!(plain.diagnostics().get(0).map(|d| d.severity()), Some(Severity::Warning));
        let promoted = index
            .parse_translation_unit(Some("t.c"), &["-Werror"], &source, ParseOptions::default())
            .unwrap();
        assert_eq!(promoted.diagnostics().get(0).map(|d| d.severity()), Some(Severity::Error));
        let silenced = index
            .parse_translation_unit(Some("t.c"), &["-w"], &source, ParseOptions::default())
            .unwrap();
        assert!(silenced.diagnostics().is_empty());
    }

    #[test]
    fn test_command_line_defines() {
        let tu = Index::new(false, false)
            .parse_translation_unit(
                Some("t.c"),
                &["-DSIZE=3"],
                &[UnsavedFile::new("t.c", "int a[SIZE];\n")],
                ParseOptions::default(),
            )
            .unwrap();
        assert!(tu.diagnostics().is_empty());
        assert_eq!(tu.cursor().children()[0].ty().array_size(), Some(3));
    }
}
