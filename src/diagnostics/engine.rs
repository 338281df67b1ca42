//! Collection and severity mapping of front-end diagnostics.

use crate::source::{Loc, Span};
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

/// Severity of a diagnostic, ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Severity {
    Ignored,
    Note,
    Warning,
    Error,
    Fatal,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Ignored => "ignored",
            Severity::Note => "note",
            Severity::Warning => "warning",
            Severity::Error => "error",
            Severity::Fatal => "fatal error",
        }
    }
}

/// Diagnostic category, numbered the way clients expect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    None = 0,
    Lexical = 1,
    Semantic = 2,
    Parse = 3,
}

impl Category {
    pub fn name(self) -> &'static str {
        match self {
            Category::None => "",
            Category::Lexical => "Lexical or Preprocessor Issue",
            Category::Semantic => "Semantic Issue",
            Category::Parse => "Parse Issue",
        }
    }
}

#[derive(Debug, Clone)]
pub struct FixIt {
    pub span: Span,
    pub replacement: String,
}

/// A diagnostic as recorded by the front end.
#[derive(Debug, Clone)]
pub struct StoredDiagnostic {
    pub severity: Severity,
    pub loc: Loc,
    pub message: String,
    /// Warning flag without the leading `-W`.
    pub option: Option<&'static str>,
    pub category: Category,
    pub ranges: Vec<Span>,
    pub fixits: Vec<FixIt>,
    pub notes: Vec<StoredDiagnostic>,
}

impl StoredDiagnostic {
    pub fn new(severity: Severity, category: Category, loc: Loc, message: impl Into<String>) -> Self {
        StoredDiagnostic {
            severity,
            loc,
            message: message.into(),
            option: None,
            category,
            ranges: Vec::new(),
            fixits: Vec::new(),
            notes: Vec::new(),
        }
    }
}

/// Warning and error flags taken from the compile arguments.
#[derive(Debug, Clone, Default)]
pub struct DiagnosticConfig {
    pub ignore_warnings: bool,
    pub warnings_as_errors: bool,
    pub disabled: FxHashSet<String>,
}

/// Handle to a just-emitted diagnostic for attaching ranges, fix-its and notes.
/// Wraps `None` when the diagnostic was suppressed.
pub struct DiagnosticBuilder<'a>(Option<&'a mut StoredDiagnostic>);

impl DiagnosticBuilder<'_> {
    pub fn range(mut self, span: Span) -> Self {
        if let Some(diag) = self.0.as_deref_mut() {
            diag.ranges.push(span);
        }
        self
    }

    pub fn fixit(mut self, span: Span, replacement: impl Into<String>) -> Self {
        if let Some(diag) = self.0.as_deref_mut() {
            diag.fixits.push(FixIt {
                span,
                replacement: replacement.into(),
            });
        }
        self
    }

    pub fn note(mut self, loc: Loc, message: impl Into<String>) -> Self {
        if let Some(diag) = self.0.as_deref_mut() {
            diag.notes
                .push(StoredDiagnostic::new(Severity::Note, diag.category, loc, message));
        }
        self
    }

    pub fn is_emitted(&self) -> bool {
        self.0.is_some()
    }
}

#[derive(Debug, Default)]
pub struct DiagnosticsEngine {
    config: DiagnosticConfig,
    diagnostics: Vec<StoredDiagnostic>,
    fatal_occurred: bool,
    suppress_all: bool,
}

impl DiagnosticsEngine {
    pub fn new(config: DiagnosticConfig) -> Self {
        DiagnosticsEngine {
            config,
            ..Default::default()
        }
    }

    /// Drop everything from now on (used once code completion is reached).
    pub fn suppress_all(&mut self) {
        self.suppress_all = true;
    }

    pub fn emit(&mut self, mut diag: StoredDiagnostic) -> DiagnosticBuilder<'_> {
        if self.fatal_occurred || self.suppress_all {
            return DiagnosticBuilder(None);
        }
        if diag.severity == Severity::Warning {
            let disabled = diag
                .option
                .is_some_and(|option| self.config.disabled.contains(option));
            if disabled || self.config.ignore_warnings {
                tracing::trace!(message = %diag.message, "warning suppressed");
                return DiagnosticBuilder(None);
            }
            if self.config.warnings_as_errors {
                diag.severity = Severity::Error;
            }
        }
        if diag.severity == Severity::Fatal {
            self.fatal_occurred = true;
        }
        self.diagnostics.push(diag);
        DiagnosticBuilder(self.diagnostics.last_mut())
    }

    pub fn error(&mut self, category: Category, loc: Loc, message: impl Into<String>) -> DiagnosticBuilder<'_> {
        self.emit(StoredDiagnostic::new(Severity::Error, category, loc, message))
    }

    pub fn fatal(&mut self, category: Category, loc: Loc, message: impl Into<String>) -> DiagnosticBuilder<'_> {
        self.emit(StoredDiagnostic::new(Severity::Fatal, category, loc, message))
    }

    pub fn warning(
        &mut self,
        category: Category,
        loc: Loc,
        message: impl Into<String>,
        option: &'static str,
    ) -> DiagnosticBuilder<'_> {
        let mut diag = StoredDiagnostic::new(Severity::Warning, category, loc, message);
        diag.option = Some(option);
        self.emit(diag)
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity >= Severity::Error)
    }

    pub fn diagnostics(&self) -> &[StoredDiagnostic] {
        &self.diagnostics
    }

    pub fn into_diagnostics(self) -> Vec<StoredDiagnostic> {
        self.diagnostics
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_suppresses_followers() {
        let mut engine = DiagnosticsEngine::default();
        engine.fatal(Category::Lexical, Loc::INVALID, "'missing.h' file not found");
        let later = engine.error(Category::Parse, Loc::INVALID, "expected ';'");
        assert!(!later.is_emitted());
        assert_eq!(engine.diagnostics().len(), 1);
    }

    #[test]
    fn test_warning_mapping() {
        let mut config = DiagnosticConfig::default();
        config.disabled.insert("macro-redefined".to_string());
        config.warnings_as_errors = true;
        let mut engine = DiagnosticsEngine::new(config);

        engine.warning(Category::Lexical, Loc::INVALID, "redefined", "macro-redefined");
        engine.warning(Category::Semantic, Loc::INVALID, "implicit", "implicit-function-declaration");

        assert_eq!(engine.diagnostics().len(), 1);
        assert_eq!(engine.diagnostics()[0].severity, Severity::Error);
        assert!(engine.has_errors());
    }

    #[test]
    fn test_ignore_warnings() {
        let config = DiagnosticConfig {
            ignore_warnings: true,
            ..Default::default()
        };
        let mut engine = DiagnosticsEngine::new(config);
        engine.warning(Category::Lexical, Loc::INVALID, "w", "pragma-once-outside-header");
        assert!(engine.diagnostics().is_empty());
    }

    #[test]
    fn test_notes_attach_to_parent() {
        let mut engine = DiagnosticsEngine::default();
        engine
            .error(Category::Semantic, Loc::INVALID, "redefinition of 'x'")
            .note(Loc::INVALID, "previous definition is here");
        assert_eq!(engine.diagnostics()[0].notes.len(), 1);
        assert_eq!(engine.diagnostics()[0].notes[0].severity, Severity::Note);
    }
}
