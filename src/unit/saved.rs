//! Saving units to disk and loading them back
//!
//! A saved unit records how it was built and the contents of every file it
//! read, so loading it reproduces the unit without touching the original
//! sources.

use super::{Invocation, TranslationUnit, UnsavedFile};
use crate::source::BUILTIN_BUFFER;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::Path;
use thiserror::Error;

const SAVED_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum SaveError {
    #[error("could not write the AST file: {0}")]
    Unknown(String),
    #[error("the unit has errors")]
    TranslationErrors,
    #[error("the unit cannot be saved")]
    InvalidTranslationUnit,
}

/// Why a saved unit could not be read.
#[derive(Debug, Error)]
pub(crate) enum LoadError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("malformed AST file: {0}")]
    Decode(#[from] bincode::Error),
    #[error("AST file version {0} is not supported")]
    Version(u32),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct SavedFile {
    pub name: String,
    pub contents: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct SavedUnit {
    pub version: u32,
    pub invocation: Invocation,
    pub files: Vec<SavedFile>,
}

impl SavedUnit {
    pub(crate) fn load(path: impl AsRef<Path>) -> Result<SavedUnit, LoadError> {
        let bytes = fs::read(path)?;
        let saved: SavedUnit = bincode::deserialize(&bytes)?;
        if saved.version != SAVED_VERSION {
            return Err(LoadError::Version(saved.version));
        }
        Ok(saved)
    }

    /// The original invocation with every recorded file supplied in memory.
    pub(crate) fn into_invocation(self) -> Invocation {
        let mut invocation = self.invocation;
        invocation.unsaved = self
            .files
            .into_iter()
            .map(|f| UnsavedFile::new(f.name, f.contents))
            .collect();
        invocation
    }
}

impl TranslationUnit {
    /// Write the unit to `path`. Units with errors are not saved.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), SaveError> {
        if self.completion.is_some() {
            return Err(SaveError::InvalidTranslationUnit);
        }
        if self.has_errors() {
            return Err(SaveError::TranslationErrors);
        }
        let files = self
            .sm
            .files()
            .filter(|(id, entry)| !self.sm.is_scratch(*id) && entry.name != BUILTIN_BUFFER)
            .map(|(_, entry)| SavedFile {
                name: entry.name.clone(),
                contents: entry.contents.to_string(),
            })
            .collect();
        let saved = SavedUnit {
            version: SAVED_VERSION,
            invocation: self.invocation.clone(),
            files,
        };
        let bytes = bincode::serialize(&saved).map_err(|e| SaveError::Unknown(e.to_string()))?;

        // write next to the target, then move into place
        let path = path.as_ref();
        let temp = path.with_extension("tmp");
        fs::write(&temp, &bytes).map_err(|e| SaveError::Unknown(e.to_string()))?;
        fs::rename(&temp, path).map_err(|e| SaveError::Unknown(e.to_string()))?;
        tracing::debug!(path = %path.display(), bytes = bytes.len(), "unit saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::unit::tests::parse_unit;
    use crate::unit::{ErrorCode, Index};

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("unit.ast");
        let tu = parse_unit("struct S { int x; };\nint f(struct S *s) { return s->x; }\n");
        tu.save(&path).unwrap();

        let loaded = Index::new(false, false).create_translation_unit(&path).unwrap();
        assert_eq!(loaded.main_file_name(), "t.c");
        let names: Vec<_> = loaded.cursor().children().iter().map(|c| c.spelling()).collect();
        assert_eq!(names, vec!["S", "f"]);
    }

    #[test]
    fn test_unit_with_errors_is_not_saved() {
        let dir = tempfile::tempdir().unwrap();
        let tu = parse_unit("int x = ;\n");
        assert!(matches!(
            tu.save(dir.path().join("bad.ast")),
            Err(SaveError::TranslationErrors)
        ));
    }

    #[test]
    fn test_garbage_file_is_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("junk.ast");
        std::fs::write(&path, b"not an ast file").unwrap();
        assert!(matches!(
            Index::new(false, false).create_translation_unit(&path),
            Err(ErrorCode::AstReadError)
        ));
    }
}
