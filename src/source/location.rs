//! Borrowed location handles handed out to clients.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::ptr;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

use super::{FileId, Loc, SourceManager, Span};

/// Identity of a file on disk that survives renames and hard links.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileUniqueId {
    pub device: u64,
    pub inode: u64,
    pub mtime: u64,
}

/// A file known to a translation unit.
#[derive(Clone, Copy)]
pub struct File<'a> {
    sm: &'a SourceManager,
    id: FileId,
}

impl<'a> File<'a> {
    pub(crate) fn new(sm: &'a SourceManager, id: FileId) -> Self {
        File { sm, id }
    }

    pub(crate) fn id(&self) -> FileId {
        self.id
    }

    pub(crate) fn manager(&self) -> &'a SourceManager {
        self.sm
    }

    pub fn name(&self) -> &'a str {
        &self.sm.file(self.id).name
    }

    pub fn contents(&self) -> &'a str {
        &self.sm.file(self.id).contents
    }

    pub fn modification_time(&self) -> Option<SystemTime> {
        self.sm.file(self.id).mtime
    }

    pub fn unique_id(&self) -> Option<FileUniqueId> {
        self.sm.file(self.id).unique_id
    }

    /// Whether the whole file is wrapped in an include guard or `#pragma once`.
    pub fn is_multiple_include_guarded(&self) -> bool {
        self.sm.file(self.id).include_guarded
    }

    pub fn is_system(&self) -> bool {
        self.sm.file(self.id).is_system
    }

    /// Location of a 1-based line/column pair in this file.
    pub fn location(&self, line: u32, column: u32) -> SourceLocation<'a> {
        SourceLocation::new(self.sm, self.sm.loc_for_line_column(self.id, line, column))
    }

    /// Location of a byte offset in this file.
    pub fn location_for_offset(&self, offset: u32) -> SourceLocation<'a> {
        SourceLocation::new(self.sm, self.sm.loc_for_offset(self.id, offset))
    }
}

impl PartialEq for File<'_> {
    fn eq(&self, other: &Self) -> bool {
        ptr::eq(self.sm, other.sm) && self.id == other.id
    }
}

impl Eq for File<'_> {}

impl Hash for File<'_> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for File<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "File({})", self.name())
    }
}

/// A resolved file position. `file` is `None` for the null location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FileLocation<'a> {
    pub file: Option<File<'a>>,
    pub line: u32,
    pub column: u32,
    pub offset: u32,
}

/// Position after `#line` directives are applied.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PresumedLocation {
    pub filename: String,
    pub line: u32,
    pub column: u32,
}

/// A location inside a translation unit.
#[derive(Clone, Copy)]
pub struct SourceLocation<'a> {
    sm: Option<&'a SourceManager>,
    loc: Loc,
}

impl<'a> SourceLocation<'a> {
    pub fn null() -> Self {
        SourceLocation {
            sm: None,
            loc: Loc::INVALID,
        }
    }

    pub(crate) fn new(sm: &'a SourceManager, loc: Loc) -> Self {
        if loc.is_valid() {
            SourceLocation { sm: Some(sm), loc }
        } else {
            Self::null()
        }
    }

    pub(crate) fn raw(&self) -> Loc {
        self.loc
    }

    pub(crate) fn manager(&self) -> Option<&'a SourceManager> {
        self.sm
    }

    pub fn is_null(&self) -> bool {
        !self.loc.is_valid()
    }

    fn resolve(&self, pick: impl Fn(&SourceManager, Loc) -> Loc) -> FileLocation<'a> {
        let Some(sm) = self.sm else {
            return FileLocation::default();
        };
        let resolved = pick(sm, self.loc);
        match sm.decompose(resolved) {
            Some((id, offset)) => {
                let (line, column) = sm.file(id).line_column(offset);
                FileLocation {
                    file: Some(File::new(sm, id)),
                    line,
                    column,
                    offset,
                }
            }
            None => FileLocation::default(),
        }
    }

    /// Where the location ends up after all macro expansion.
    pub fn expansion(&self) -> FileLocation<'a> {
        self.resolve(SourceManager::expansion_loc)
    }

    /// Where the characters were literally written.
    pub fn spelling(&self) -> FileLocation<'a> {
        self.resolve(SourceManager::spelling_loc)
    }

    /// Expansion location, except macro arguments resolve to their spelling.
    pub fn file_location(&self) -> FileLocation<'a> {
        self.resolve(SourceManager::file_loc)
    }

    pub fn presumed(&self) -> PresumedLocation {
        self.sm
            .and_then(|sm| sm.presumed(self.loc))
            .map(|(filename, line, column)| PresumedLocation {
                filename,
                line,
                column,
            })
            .unwrap_or_default()
    }

    pub fn is_from_macro_expansion(&self) -> bool {
        self.sm.is_some_and(|sm| sm.is_macro(self.loc))
    }

    pub fn is_in_main_file(&self) -> bool {
        let Some(sm) = self.sm else {
            return false;
        };
        match sm.decompose(sm.expansion_loc(self.loc)) {
            Some((id, _)) => sm.main_file() == Some(id),
            None => false,
        }
    }

    pub fn is_in_system_header(&self) -> bool {
        let Some(sm) = self.sm else {
            return false;
        };
        match sm.decompose(sm.expansion_loc(self.loc)) {
            Some((id, _)) => sm.file(id).is_system,
            None => false,
        }
    }
}

impl PartialEq for SourceLocation<'_> {
    fn eq(&self, other: &Self) -> bool {
        match (self.sm, other.sm) {
            (None, None) => true,
            (Some(a), Some(b)) => ptr::eq(a, b) && self.loc == other.loc,
            _ => false,
        }
    }
}

impl Eq for SourceLocation<'_> {}

impl Hash for SourceLocation<'_> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.loc.hash(state);
    }
}

impl fmt::Debug for SourceLocation<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            return write!(f, "SourceLocation(null)");
        }
        let at = self.expansion();
        match at.file {
            Some(file) => write!(f, "SourceLocation({}:{}:{})", file.name(), at.line, at.column),
            None => write!(f, "SourceLocation(#{})", self.loc.raw()),
        }
    }
}

/// A pair of locations. The end is one past the last character.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct SourceRange<'a> {
    begin: SourceLocation<'a>,
    end: SourceLocation<'a>,
}

impl<'a> SourceRange<'a> {
    /// Ranges whose ends come from different units are null.
    pub fn new(begin: SourceLocation<'a>, end: SourceLocation<'a>) -> Self {
        let same_unit = match (begin.sm, end.sm) {
            (Some(a), Some(b)) => ptr::eq(a, b),
            _ => true,
        };
        if same_unit {
            SourceRange { begin, end }
        } else {
            Self::null()
        }
    }

    pub fn null() -> Self {
        SourceRange {
            begin: SourceLocation::null(),
            end: SourceLocation::null(),
        }
    }

    pub(crate) fn from_span(sm: &'a SourceManager, span: Span) -> Self {
        SourceRange {
            begin: SourceLocation::new(sm, span.begin),
            end: SourceLocation::new(sm, span.end),
        }
    }

    pub(crate) fn span(&self) -> Span {
        Span::new(self.begin.loc, self.end.loc)
    }

    pub fn is_null(&self) -> bool {
        self.begin.is_null() && self.end.is_null()
    }

    pub fn begin(&self) -> SourceLocation<'a> {
        self.begin
    }

    pub fn end(&self) -> SourceLocation<'a> {
        self.end
    }

    /// Source text covered by the range, if both ends share a file.
    pub fn text(&self) -> Option<&'a str> {
        self.begin.sm?.text(self.span())
    }
}
