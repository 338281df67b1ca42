//! # Introduction
//!
//! cindex parses C translation units and exposes what it found through
//! cursors, tokens, types, diagnostics and an indexing callback protocol.
//! Everything a client sees borrows from the [`TranslationUnit`] that produced
//! it, so nothing can be used across a reparse.
//!
//! ## Pipeline
//!
//! ```text
//! Source → Preprocessor → Parser + Sema → AST → Cursors / Tokens / Index events
//! ```
//!
//! 1. [`source`]: one offset space for every file and macro expansion.
//! 2. [`parser`]: lexer, preprocessor and recursive-descent parser that
//!    resolves names while it builds the arena AST.
//! 3. [`unit`]: sessions ([`Index`]) and the units they parse, save and load.
//! 4. [`cursor`]: pull-based traversal with [`Cursor::visit_children`].
//! 5. [`indexer`]: push-based traversal through [`IndexerCallbacks`].
//! 6. [`find`], [`tokens`], [`completion`]: editor queries over a unit.
//! 7. [`ui`]: ratatui browser used by the `cindex browse` command; not part of
//!    the stable library API.
//!
//! ## Example
//!
//! ```no_run
//! use cindex::{ChildVisitResult, Index, ParseOptions, UnsavedFile};
//!
//! let index = Index::new(false, false);
//! let source = [UnsavedFile::new("demo.c", "int answer(void) { return 42; }\n")];
//! let unit = index
//!     .parse_translation_unit(Some("demo.c"), &[] as &[&str], &source, ParseOptions::default())
//!     .unwrap();
//! unit.cursor().visit_children(|cursor, _parent| {
//!     println!("{:?} {}", cursor.kind(), cursor.spelling());
//!     ChildVisitResult::Recurse
//! });
//! ```

pub(crate) mod comment;
pub mod completion;
pub mod cursor;
pub mod diagnostics;
pub mod dump;
pub mod find;
pub mod indexer;
pub mod parser;
pub mod source;
pub mod thread;
pub mod tokens;
pub mod ui;
pub mod unit;

pub use completion::{CodeCompleteOptions, CodeCompleteResults, CompletionContexts, CompletionString};
pub use cursor::{ChildVisitResult, CType, Cursor, CursorKind, CursorSet, LayoutError, TypeKind};
pub use diagnostics::{Diagnostic, DiagnosticSet, DisplayOptions, Severity};
pub use find::{FindResult, VisitorResult};
pub use indexer::{IndexAction, IndexError, IndexOptions, IndexOutcome, IndexerCallbacks};
pub use source::{File, FileLocation, PresumedLocation, SourceLocation, SourceRange};
pub use thread::{execute_on_thread, ThreadError};
pub use tokens::{Token, TokenKind};
pub use unit::{ErrorCode, Index, ParseOptions, SaveError, TranslationUnit, UnsavedFile};
