//! Whole-unit indexing
//!
//! An index pass walks a parsed unit once and pushes what it finds into an
//! [`IndexerCallbacks`] implementation: first the unit, its main file, the AST
//! files it imported and the files it included, then every declaration and
//! reference in source order, and finally the unit's diagnostics.
//!
//! ```text
//! started_translation_unit → entered_main_file → imported_ast_file*
//!     → pp_included_file* → (index_declaration | index_entity_reference)*
//!     → diagnostic
//! ```
//!
//! `abort_query` is polled before every event. Answering `true` ends the pass
//! with [`IndexOutcome::Aborted`]; the diagnostic event is not delivered then.

mod driver;
pub mod info;

pub use info::{
    AttrInfo, ClientHandle, ContainerInfo, DeclInfo, EntityInfo, EntityKind, EntityRefInfo, EntityRefKind,
    ImportedAstFileInfo, IncludedFileInfo, IndexLocation, Language, SymbolRoles,
};

use crate::diagnostics::DiagnosticSet;
use crate::parser::ast::{Body, NodeId, NodeKind};
use crate::source::{File, FileId};
use crate::unit::{BuildHooks, ErrorCode, Index, ParseOptions, TranslationUnit, UnsavedFile};
use rustc_hash::{FxHashMap, FxHashSet};
use thiserror::Error;

/// Revision of [`IndexerCallbacks`] this crate implements.
pub const CALLBACKS_VERSION: u32 = 8;

/// Receiver of index events.
///
/// Every method has a default that ignores the event. [`version`] names the
/// revision a client was written against; slots introduced by a later
/// revision are never called:
///
/// | revision | slot |
/// |---|---|
/// | 1 | `abort_query` |
/// | 2 | `diagnostic` |
/// | 3 | `entered_main_file` |
/// | 4 | `pp_included_file` |
/// | 5 | `imported_ast_file` |
/// | 6 | `started_translation_unit` |
/// | 7 | `index_declaration` |
/// | 8 | `index_entity_reference` |
///
/// [`version`]: IndexerCallbacks::version
pub trait IndexerCallbacks {
    fn version(&self) -> u32 {
        CALLBACKS_VERSION
    }

    /// Return `true` to stop the pass.
    fn abort_query(&mut self) -> bool {
        false
    }

    fn diagnostic(&mut self, _diagnostics: DiagnosticSet<'_>) {}

    /// The returned handle is reported with every location in the main file.
    fn entered_main_file(&mut self, _file: File<'_>) -> Option<ClientHandle> {
        None
    }

    fn pp_included_file(&mut self, _info: &IncludedFileInfo<'_>) -> Option<ClientHandle> {
        None
    }

    fn imported_ast_file(&mut self, _info: &ImportedAstFileInfo<'_>) -> Option<ClientHandle> {
        None
    }

    /// The returned handle becomes the client container of the unit.
    fn started_translation_unit(&mut self) -> Option<ClientHandle> {
        None
    }

    fn index_declaration(&mut self, _decl: &DeclInfo<'_>) {}

    fn index_entity_reference(&mut self, _reference: &EntityRefInfo<'_>) {}
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IndexOptions {
    /// Report a reference to an entity at most once per file, and not at all
    /// in files that declare it.
    pub suppress_redundant_refs: bool,
    /// Report parameters and declarations inside function bodies, and
    /// references to them.
    pub index_function_local_symbols: bool,
    /// Parse with warnings dropped.
    pub suppress_warnings: bool,
    /// Skip bodies of header functions this action already indexed.
    pub skip_parsed_bodies_in_session: bool,
}

/// How an index pass ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexOutcome {
    Completed,
    /// `abort_query` asked to stop.
    Aborted,
}

#[derive(Debug, Error)]
pub enum IndexError {
    #[error("failed to parse translation unit: {0}")]
    Parse(#[from] ErrorCode),
}

/// Client handles attached during one pass.
#[derive(Debug, Default)]
pub(crate) struct ClientTable {
    pub entities: FxHashMap<NodeId, ClientHandle>,
    pub containers: FxHashMap<NodeId, ClientHandle>,
    pub files: FxHashMap<FileId, ClientHandle>,
}

/// Indexes units of one [`Index`] session, remembering header function bodies
/// it has seen so later units can skip them.
#[derive(Debug)]
pub struct IndexAction<'a> {
    index: &'a Index,
    parsed_bodies: FxHashSet<(String, u32)>,
}

impl<'a> IndexAction<'a> {
    pub(crate) fn new(index: &'a Index) -> Self {
        IndexAction {
            index,
            parsed_bodies: FxHashSet::default(),
        }
    }

    /// Parse a source file and index it. The unit is returned alongside the
    /// outcome; drop it if only the events were wanted.
    pub fn index_source_file<C, S>(
        &mut self,
        callbacks: &mut C,
        options: IndexOptions,
        source: Option<&str>,
        args: &[S],
        unsaved: &[UnsavedFile],
        parse_options: ParseOptions,
    ) -> Result<(IndexOutcome, TranslationUnit), IndexError>
    where
        C: IndexerCallbacks + ?Sized,
        S: AsRef<str>,
    {
        let invocation = self.index.invocation(source, args, unsaved, parse_options)?;
        let hooks = BuildHooks {
            skip_bodies_at: if options.skip_parsed_bodies_in_session {
                self.parsed_bodies.clone()
            } else {
                FxHashSet::default()
            },
            suppress_warnings: options.suppress_warnings,
        };
        tracing::debug!(source = %invocation.source, skipped = hooks.skip_bodies_at.len(), "parsing for index");
        let unit = TranslationUnit::build(invocation, self.index.config(), &hooks)?;
        let outcome = self.index_translation_unit(callbacks, options, &unit);
        Ok((outcome, unit))
    }

    /// Index a unit that is already parsed.
    pub fn index_translation_unit<C>(
        &mut self,
        callbacks: &mut C,
        options: IndexOptions,
        unit: &TranslationUnit,
    ) -> IndexOutcome
    where
        C: IndexerCallbacks + ?Sized,
    {
        let outcome = driver::run(unit, callbacks, options);
        if outcome == IndexOutcome::Completed {
            self.remember_bodies(unit);
        }
        outcome
    }

    /// Brace offsets of function bodies parsed outside the main file.
    fn remember_bodies(&mut self, unit: &TranslationUnit) {
        let (ast, sm) = (&unit.ast, &unit.sm);
        let main = sm.main_file();
        for id in ast.ids() {
            let NodeKind::Function { body: Body::Parsed, .. } = ast.node(id).kind else {
                continue;
            };
            let Some(compound) = ast
                .children(id)
                .iter()
                .copied()
                .find(|c| ast.node(*c).kind == NodeKind::Compound)
            else {
                continue;
            };
            let brace = sm.expansion_loc(ast.node(compound).span.begin);
            if let Some((file, offset)) = sm.decompose(brace) {
                if Some(file) != main {
                    self.parsed_bodies.insert((sm.file(file).name.clone(), offset));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::unit::tests::{parse_files, parse_unit};

    #[derive(Default)]
    struct Recorder {
        events: Vec<String>,
        version: Option<u32>,
        abort_after: Option<usize>,
        /// Abort once a declaration has been reported.
        abort_after_decl: bool,
        polls: usize,
    }

    impl IndexerCallbacks for Recorder {
        fn version(&self) -> u32 {
            self.version.unwrap_or(CALLBACKS_VERSION)
        }

        fn abort_query(&mut self) -> bool {
            self.polls += 1;
            let decl_seen = self.abort_after_decl && self.events.iter().any(|e| e.starts_with("decl "));
            decl_seen || self.abort_after.is_some_and(|n| self.polls > n)
        }

        fn diagnostic(&mut self, diagnostics: DiagnosticSet<'_>) {
            self.events.push(format!("diagnostic {}", diagnostics.len()));
        }

        fn entered_main_file(&mut self, file: File<'_>) -> Option<ClientHandle> {
            self.events.push(format!("main {}", file.name()));
            Some(ClientHandle(1))
        }

        fn pp_included_file(&mut self, info: &IncludedFileInfo<'_>) -> Option<ClientHandle> {
            self.events.push(format!("include {}", info.filename));
            Some(ClientHandle(2))
        }

        fn started_translation_unit(&mut self) -> Option<ClientHandle> {
            self.events.push("started".to_string());
            Some(ClientHandle(100))
        }

        fn index_declaration(&mut self, decl: &DeclInfo<'_>) {
            let implicit = if decl.is_implicit { " implicit" } else { "" };
            self.events.push(format!("decl {}{}", decl.entity.name, implicit));
        }

        fn index_entity_reference(&mut self, reference: &EntityRefInfo<'_>) {
            self.events.push(format!("ref {}", reference.referenced_entity.name));
        }
    }

    fn index_with(unit: &TranslationUnit, recorder: &mut Recorder, options: IndexOptions) -> IndexOutcome {
        let index = Index::new(false, false);
        index.create_index_action().index_translation_unit(recorder, options, unit)
    }

    fn events(unit: &TranslationUnit, options: IndexOptions) -> Vec<String> {
        let mut recorder = Recorder::default();
        assert_eq!(index_with(unit, &mut recorder, options), IndexOutcome::Completed);
        recorder.events
    }

    fn entities(unit: &TranslationUnit, options: IndexOptions) -> Vec<String> {
        events(unit, options)
            .into_iter()
            .filter(|e| e.starts_with("decl") || e.starts_with("ref"))
            .collect()
    }

    #[test]
    fn test_event_order() {
        let unit = parse_files(&[
            ("main.c", "#include \"a.h\"\nint g = A;\n"),
            ("a.h", "enum E { A };\n"),
        ]);
        assert_eq!(
            events(&unit, IndexOptions::default()),
            vec![
                "started",
                "main main.c",
                "include a.h",
                "decl E",
                "decl A",
                "decl g",
                "ref A",
                "diagnostic 0",
            ]
        );
    }

    #[test]
    fn test_unit_without_includes() {
        let unit = parse_unit("int x;\n");
        assert_eq!(
            events(&unit, IndexOptions::default()),
            vec!["started", "main t.c", "decl x", "diagnostic 0"]
        );
    }

    #[test]
    fn test_abort_skips_remaining_events() {
        let unit = parse_unit("int x;\nint y;\n");
        let mut recorder = Recorder {
            abort_after: Some(2),
            ..Recorder::default()
        };
        assert_eq!(
            index_with(&unit, &mut recorder, IndexOptions::default()),
            IndexOutcome::Aborted
        );
        assert_eq!(recorder.events, vec!["started", "main t.c"]);
    }

    #[test]
    fn test_abort_after_first_declaration() {
        let unit = parse_unit(
            "struct P { int x; };\nint f(struct P *p) { return p->x; }\nint g(void) { return f(0); }\nint h = 1;\n",
        );
        let mut recorder = Recorder {
            abort_after_decl: true,
            ..Recorder::default()
        };
        assert_eq!(
            index_with(&unit, &mut recorder, IndexOptions::default()),
            IndexOutcome::Aborted
        );
        assert_eq!(recorder.events, vec!["started", "main t.c", "decl P"]);
        assert!(!recorder.events.iter().any(|e| e.starts_with("ref ") || e.starts_with("diagnostic")));
    }

    #[test]
    fn test_newer_slots_are_not_called() {
        let unit = parse_unit("int x;\nint y = x;\n");
        let mut recorder = Recorder {
            version: Some(6),
            ..Recorder::default()
        };
        index_with(&unit, &mut recorder, IndexOptions::default());
        assert_eq!(recorder.events, vec!["started", "main t.c", "diagnostic 0"]);

        let mut recorder = Recorder {
            version: Some(2),
            abort_after: Some(0),
            ..Recorder::default()
        };
        assert_eq!(
            index_with(&unit, &mut recorder, IndexOptions::default()),
            IndexOutcome::Aborted
        );
        assert!(recorder.events.is_empty());
    }

    #[derive(Default)]
    struct Handles {
        next: usize,
        decls: Vec<(bool, Option<ClientHandle>, Option<ClientHandle>)>,
        refs: Vec<(Option<ClientHandle>, Option<ClientHandle>)>,
    }

    impl IndexerCallbacks for Handles {
        fn started_translation_unit(&mut self) -> Option<ClientHandle> {
            Some(ClientHandle(100))
        }

        fn entered_main_file(&mut self, _file: File<'_>) -> Option<ClientHandle> {
            Some(ClientHandle(7))
        }

        fn index_declaration(&mut self, decl: &DeclInfo<'_>) {
            if decl.entity.client_entity().is_none() {
                decl.entity.set_client_entity(ClientHandle(self.next));
                self.next += 1;
            }
            self.decls.push((
                decl.is_redeclaration,
                decl.entity.client_entity(),
                decl.semantic_container.client_container(),
            ));
        }

        fn index_entity_reference(&mut self, reference: &EntityRefInfo<'_>) {
            let (file, _) = reference.loc.file_location();
            self.refs.push((reference.referenced_entity.client_entity(), file));
        }
    }

    #[test]
    fn test_client_handles() {
        let unit = parse_unit("int x;\nextern int x;\nint y = x;\n");
        let mut handles = Handles::default();
        Index::new(false, false)
            .create_index_action()
            .index_translation_unit(&mut handles, IndexOptions::default(), &unit);
        let root = Some(ClientHandle(100));
        assert_eq!(
            handles.decls,
            vec![
                (false, Some(ClientHandle(0)), root),
                (true, Some(ClientHandle(0)), root),
                (false, Some(ClientHandle(1)), root),
            ]
        );
        assert_eq!(handles.refs, vec![(Some(ClientHandle(0)), Some(ClientHandle(7)))]);
    }

    #[derive(Default)]
    struct Roles(Vec<(String, SymbolRoles)>);

    impl IndexerCallbacks for Roles {
        fn index_entity_reference(&mut self, reference: &EntityRefInfo<'_>) {
            self.0.push((reference.referenced_entity.name.to_string(), reference.role));
        }
    }

    #[test]
    fn test_reference_roles() {
        let unit = parse_unit(
            "int g;\nint f(int *p);\nvoid use(void) { g = 1; g += 2; g++; f(&g); (f)(0); }\n",
        );
        let mut roles = Roles::default();
        Index::new(false, false)
            .create_index_action()
            .index_translation_unit(&mut roles, IndexOptions::default(), &unit);
        let reference = SymbolRoles::REFERENCE;
        assert_eq!(
            roles.0,
            vec![
                ("g".to_string(), reference | SymbolRoles::WRITE),
                ("g".to_string(), reference | SymbolRoles::READ | SymbolRoles::WRITE),
                ("g".to_string(), reference | SymbolRoles::READ | SymbolRoles::WRITE),
                ("f".to_string(), reference | SymbolRoles::CALL),
                ("g".to_string(), reference | SymbolRoles::ADDRESS_OF),
                ("f".to_string(), reference | SymbolRoles::CALL),
            ]
        );
    }

    #[test]
    fn test_function_local_symbols() {
        let unit = parse_unit("int f(int a) { int b = a; return b; }\n");
        assert_eq!(entities(&unit, IndexOptions::default()), vec!["decl f"]);
        let options = IndexOptions {
            index_function_local_symbols: true,
            ..IndexOptions::default()
        };
        assert_eq!(
            entities(&unit, options),
            vec!["decl f", "decl a", "decl b", "ref a", "ref b"]
        );
    }

    #[test]
    fn test_implicit_function_declaration() {
        let unit = parse_unit("int f(void) { return h(); }\n");
        let all = events(&unit, IndexOptions::default());
        assert_eq!(all.last().map(String::as_str), Some("diagnostic 1"));
        assert_eq!(
            entities(&unit, IndexOptions::default()),
            vec!["decl f", "ref h", "decl h implicit"]
        );
    }

    #[test]
    fn test_suppress_redundant_refs() {
        let unit = parse_files(&[
            ("main.c", "#include \"a.h\"\nint u(void) { return k + k; }\nint k2 = k;\n"),
            ("a.h", "int k;\nint k_copy = k;\n"),
        ]);
        let count = |options| {
            entities(&unit, options)
                .iter()
                .filter(|e| *e == "ref k")
                .count()
        };
        assert_eq!(count(IndexOptions::default()), 4);
        let options = IndexOptions {
            suppress_redundant_refs: true,
            ..IndexOptions::default()
        };
        assert_eq!(count(options), 1);
    }

    #[derive(Default)]
    struct Bodies(Vec<(String, bool)>);

    impl IndexerCallbacks for Bodies {
        fn index_declaration(&mut self, decl: &DeclInfo<'_>) {
            if decl.entity.kind == EntityKind::Function {
                self.0.push((decl.entity.name.to_string(), decl.skipped_body));
            }
        }
    }

    #[test]
    fn test_skip_bodies_seen_in_session() {
        let files = [
            UnsavedFile::new("a.h", "static inline int twice(int v) { return v * 2; }\n"),
            UnsavedFile::new("one.c", "#include \"a.h\"\nint one(void) { return twice(1); }\n"),
            UnsavedFile::new("two.c", "#include \"a.h\"\nint two(void) { return twice(2); }\n"),
        ];
        let options = IndexOptions {
            skip_parsed_bodies_in_session: true,
            ..IndexOptions::default()
        };
        let index = Index::new(false, false);
        let mut action = index.create_index_action();
        let mut first = Bodies::default();
        let (outcome, _) = action
            .index_source_file(&mut first, options, Some("one.c"), &[] as &[&str], &files, ParseOptions::default())
            .unwrap();
        assert_eq!(outcome, IndexOutcome::Completed);
        assert_eq!(first.0, vec![("twice".to_string(), false), ("one".to_string(), false)]);

        let mut second = Bodies::default();
        action
            .index_source_file(&mut second, options, Some("two.c"), &[] as &[&str], &files, ParseOptions::default())
            .unwrap();
        assert_eq!(second.0, vec![("twice".to_string(), true), ("two".to_string(), false)]);
    }

    #[test]
    fn test_parse_failure_is_an_error() {
        let index = Index::new(false, false);
        let result = index.create_index_action().index_source_file(
            &mut Recorder::default(),
            IndexOptions::default(),
            Some("missing.c"),
            &[] as &[&str],
            &[],
            ParseOptions::default(),
        );
        assert!(matches!(result, Err(IndexError::Parse(ErrorCode::Failure))));
    }
}
