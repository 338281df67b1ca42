//! Index sessions

use super::{BuildHooks, ErrorCode, Invocation, ParseOptions, SessionConfig, TranslationUnit, UnsavedFile};
use crate::indexer::IndexAction;
use std::path::Path;

/// A set of translation units that share settings.
#[derive(Debug, Clone, Default)]
pub struct Index {
    config: SessionConfig,
}

impl Index {
    /// `exclude_declarations_from_pch` hides declarations that come from
    /// imported AST files when enumerating a unit's children.
    /// `display_diagnostics` prints each unit's diagnostics to stderr after
    /// it is parsed.
    pub fn new(exclude_declarations_from_pch: bool, display_diagnostics: bool) -> Self {
        Index {
            config: SessionConfig {
                hide_pch_declarations: exclude_declarations_from_pch,
                display_diagnostics,
                crash_recovery: false,
            },
        }
    }

    /// Catch panics inside the front end and report them as
    /// [`ErrorCode::Crashed`].
    pub fn set_crash_recovery(&mut self, enabled: bool) {
        self.config.crash_recovery = enabled;
    }

    pub(crate) fn config(&self) -> SessionConfig {
        self.config
    }

    /// Parse a source file. When `source` is `None` the first positional
    /// argument names the file.
    pub fn parse_translation_unit<S: AsRef<str>>(
        &self,
        source: Option<&str>,
        args: &[S],
        unsaved: &[UnsavedFile],
        options: ParseOptions,
    ) -> Result<TranslationUnit, ErrorCode> {
        let invocation = self.invocation(source, args, unsaved, options)?;
        TranslationUnit::build(invocation, self.config, &BuildHooks::default())
    }

    pub(crate) fn invocation<S: AsRef<str>>(
        &self,
        source: Option<&str>,
        args: &[S],
        unsaved: &[UnsavedFile],
        options: ParseOptions,
    ) -> Result<Invocation, ErrorCode> {
        let args: Vec<String> = args.iter().map(|a| a.as_ref().to_string()).collect();
        let source = match source {
            Some(source) => source.to_string(),
            None => super::args::CompileArgs::parse(&args)?
                .source
                .ok_or(ErrorCode::InvalidArguments)?,
        };
        // positional file names would otherwise be mistaken for a second source
        let args = args.into_iter().filter(|a| *a != source).collect();
        Ok(Invocation {
            source,
            args,
            unsaved: unsaved.to_vec(),
            options,
        })
    }

    /// Load a unit written by [`TranslationUnit::save`].
    pub fn create_translation_unit(&self, path: impl AsRef<Path>) -> Result<TranslationUnit, ErrorCode> {
        let path = path.as_ref();
        let saved = super::saved::SavedUnit::load(path).map_err(|err| {
            tracing::warn!(path = %path.display(), %err, "cannot read AST file");
            ErrorCode::AstReadError
        })?;
        TranslationUnit::build(saved.into_invocation(), self.config, &BuildHooks::default())
    }

    pub fn create_index_action(&self) -> IndexAction<'_> {
        IndexAction::new(self)
    }
}
