//! Source manager
//!
//! Every file inclusion and every macro-expanded token owns a slot in a single
//! offset space, so a location is just a `u32`. Offset zero is the invalid
//! location. Slots come in two flavours:
//!
//! - **file slots** map a contiguous chunk of a file (usually the whole file)
//!   and remember where the file was included from;
//! - **expansion slots** map one token produced by macro expansion back to the
//!   place it was spelled and the place it was expanded.
//!
//! Resolving a location walks these slots; see [`SourceManager::expansion_loc`],
//! [`SourceManager::spelling_loc`] and [`SourceManager::file_loc`].

mod location;

pub use location::{
    File, FileLocation, FileUniqueId, PresumedLocation, SourceLocation, SourceRange,
};

use std::path::Path;
use std::sync::Arc;
use std::time::SystemTime;

/// Name of the buffer holding predefined macros and `-D` options.
pub const BUILTIN_BUFFER: &str = "<built-in>";
/// Name of the buffer holding tokens synthesized by `#`, `##` and builtin macros.
pub const SCRATCH_BUFFER: &str = "<scratch space>";

/// Raw location in the unit-wide offset space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct Loc(u32);

impl Loc {
    pub const INVALID: Loc = Loc(0);

    pub fn is_valid(self) -> bool {
        self.0 != 0
    }

    pub(crate) fn offset(self, delta: u32) -> Loc {
        if self.is_valid() {
            Loc(self.0 + delta)
        } else {
            self
        }
    }

    pub(crate) fn raw(self) -> u32 {
        self.0
    }
}

/// Half-open raw range `[begin, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Span {
    pub begin: Loc,
    pub end: Loc,
}

impl Span {
    pub fn new(begin: Loc, end: Loc) -> Self {
        Span { begin, end }
    }

    pub fn is_valid(&self) -> bool {
        self.begin.is_valid() && self.end.is_valid()
    }
}

/// Index of a [`FileEntry`] inside its manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FileId(u32);

impl FileId {
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

/// A `#line` directive: text starting at `offset` is presumed to be `line`.
#[derive(Debug, Clone)]
struct LineDirective {
    offset: u32,
    line: u32,
    filename: Option<String>,
}

/// One distinct file known to the unit.
#[derive(Debug, Clone)]
pub struct FileEntry {
    pub name: String,
    pub contents: Arc<str>,
    pub mtime: Option<SystemTime>,
    pub unique_id: Option<FileUniqueId>,
    pub is_system: bool,
    pub include_guarded: bool,
    line_starts: Vec<u32>,
    line_directives: Vec<LineDirective>,
}

impl FileEntry {
    fn new(
        name: &str,
        contents: Arc<str>,
        mtime: Option<SystemTime>,
        unique_id: Option<FileUniqueId>,
        is_system: bool,
    ) -> Self {
        let line_starts = compute_line_starts(&contents);
        FileEntry {
            name: name.to_string(),
            contents,
            mtime,
            unique_id,
            is_system,
            include_guarded: false,
            line_starts,
            line_directives: Vec::new(),
        }
    }

    /// 1-based line and byte column of `offset`.
    pub fn line_column(&self, offset: u32) -> (u32, u32) {
        let line_idx = self.line_starts.partition_point(|&start| start <= offset) - 1;
        let column = offset - self.line_starts[line_idx] + 1;
        (line_idx as u32 + 1, column)
    }

    /// Offset of a 1-based line/column pair. Columns past the end of the
    /// line clamp to its newline (or to the end of the file on the last line).
    pub fn offset_of(&self, line: u32, column: u32) -> Option<u32> {
        if line == 0 || column == 0 {
            return None;
        }
        let index = line as usize - 1;
        let start = *self.line_starts.get(index)?;
        let line_end = self
            .line_starts
            .get(index + 1)
            .map_or(self.contents.len() as u32, |next| next - 1);
        Some(start.saturating_add(column - 1).min(line_end))
    }

    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }
}

fn compute_line_starts(text: &str) -> Vec<u32> {
    let mut starts = vec![0];
    for (i, byte) in text.bytes().enumerate() {
        if byte == b'\n' {
            starts.push(i as u32 + 1);
        }
    }
    starts
}

#[derive(Debug, Clone)]
enum SlocEntry {
    File {
        base: u32,
        len: u32,
        file: FileId,
        file_offset: u32,
        include_loc: Loc,
    },
    Expansion {
        base: u32,
        len: u32,
        spelling: Loc,
        expansion_begin: Loc,
        expansion_end: Loc,
        macro_arg: bool,
    },
}

impl SlocEntry {
    fn base(&self) -> u32 {
        match self {
            SlocEntry::File { base, .. } | SlocEntry::Expansion { base, .. } => *base,
        }
    }

    fn contains(&self, raw: u32) -> bool {
        match self {
            // both kinds also address the position one past their last byte
            SlocEntry::File { base, len, .. } => raw >= *base && raw <= base + len,
            SlocEntry::Expansion { base, len, .. } => raw >= *base && raw <= base + len,
        }
    }
}

/// Owner of file contents and of the location address space.
#[derive(Debug, Clone)]
pub struct SourceManager {
    files: Vec<FileEntry>,
    entries: Vec<SlocEntry>,
    next_offset: u32,
    main_file: Option<FileId>,
    scratch: Option<FileId>,
}

impl Default for SourceManager {
    fn default() -> Self {
        Self::new()
    }
}

impl SourceManager {
    pub fn new() -> Self {
        SourceManager {
            files: Vec::new(),
            entries: Vec::new(),
            next_offset: 1,
            main_file: None,
            scratch: None,
        }
    }

    /// Register a file. A file with the same name is registered only once.
    pub fn add_file(
        &mut self,
        name: &str,
        contents: Arc<str>,
        mtime: Option<SystemTime>,
        unique_id: Option<FileUniqueId>,
        is_system: bool,
    ) -> FileId {
        if let Some(existing) = self.find_file(name) {
            return existing;
        }
        let id = FileId(self.files.len() as u32);
        self.files
            .push(FileEntry::new(name, contents, mtime, unique_id, is_system));
        id
    }

    /// Look a file up by the name it was registered under, falling back to a
    /// path comparison so `./a.h` and `a.h` agree.
    pub fn find_file(&self, name: &str) -> Option<FileId> {
        if let Some(idx) = self.files.iter().position(|f| f.name == name) {
            return Some(FileId(idx as u32));
        }
        let wanted = normalize_path(Path::new(name));
        self.files
            .iter()
            .position(|f| normalize_path(Path::new(&f.name)) == wanted)
            .map(|idx| FileId(idx as u32))
    }

    pub fn file(&self, id: FileId) -> &FileEntry {
        &self.files[id.index()]
    }

    pub fn files(&self) -> impl Iterator<Item = (FileId, &FileEntry)> {
        self.files
            .iter()
            .enumerate()
            .map(|(i, f)| (FileId(i as u32), f))
    }

    pub fn set_main_file(&mut self, id: FileId) {
        self.main_file = Some(id);
    }

    pub fn main_file(&self) -> Option<FileId> {
        self.main_file
    }

    pub fn mark_include_guarded(&mut self, id: FileId) {
        self.files[id.index()].include_guarded = true;
    }

    /// Give a whole file a new slot and return the location of its first byte.
    pub fn enter_file(&mut self, file: FileId, include_loc: Loc) -> Loc {
        let len = self.files[file.index()].contents.len() as u32;
        self.push_file_slot(file, 0, len, include_loc)
    }

    fn push_file_slot(&mut self, file: FileId, file_offset: u32, len: u32, include_loc: Loc) -> Loc {
        let base = self.next_offset;
        self.entries.push(SlocEntry::File {
            base,
            len,
            file,
            file_offset,
            include_loc,
        });
        self.next_offset += len + 1;
        Loc(base)
    }

    /// Allocate a location for one token produced by macro expansion.
    pub fn create_expansion(
        &mut self,
        spelling: Loc,
        len: u32,
        expansion_begin: Loc,
        expansion_end: Loc,
        macro_arg: bool,
    ) -> Loc {
        let base = self.next_offset;
        self.entries.push(SlocEntry::Expansion {
            base,
            len,
            spelling,
            expansion_begin,
            expansion_end,
            macro_arg,
        });
        self.next_offset += len + 1;
        Loc(base)
    }

    /// Append synthesized text to the scratch buffer and return its location.
    pub fn write_scratch(&mut self, text: &str) -> Loc {
        let scratch = match self.scratch {
            Some(id) => id,
            None => {
                let id = self.add_file(SCRATCH_BUFFER, Arc::from(""), None, None, false);
                self.scratch = Some(id);
                id
            }
        };
        let entry = &mut self.files[scratch.index()];
        let start = entry.contents.len() as u32;
        let mut grown = String::with_capacity(entry.contents.len() + text.len() + 1);
        grown.push_str(&entry.contents);
        grown.push_str(text);
        grown.push('\n');
        entry.line_starts = compute_line_starts(&grown);
        entry.contents = Arc::from(grown);
        self.push_file_slot(scratch, start, text.len() as u32, Loc::INVALID)
    }

    pub fn is_scratch(&self, id: FileId) -> bool {
        self.scratch == Some(id)
    }

    fn entry(&self, loc: Loc) -> Option<&SlocEntry> {
        if !loc.is_valid() {
            return None;
        }
        let idx = self.entries.partition_point(|e| e.base() <= loc.0);
        if idx == 0 {
            return None;
        }
        let entry = &self.entries[idx - 1];
        entry.contains(loc.0).then_some(entry)
    }

    pub fn is_macro(&self, loc: Loc) -> bool {
        matches!(self.entry(loc), Some(SlocEntry::Expansion { .. }))
    }

    pub fn is_macro_arg(&self, loc: Loc) -> bool {
        matches!(
            self.entry(loc),
            Some(SlocEntry::Expansion {
                macro_arg: true,
                ..
            })
        )
    }

    /// Where the characters of `loc` were literally written.
    pub fn spelling_loc(&self, mut loc: Loc) -> Loc {
        while let Some(SlocEntry::Expansion { base, spelling, .. }) = self.entry(loc) {
            loc = spelling.offset(loc.0 - base);
        }
        loc
    }

    /// The outermost point of expansion in a real file.
    pub fn expansion_loc(&self, mut loc: Loc) -> Loc {
        while let Some(SlocEntry::Expansion {
            expansion_begin, ..
        }) = self.entry(loc)
        {
            loc = *expansion_begin;
        }
        loc
    }

    /// Expansion resolution, except that macro arguments resolve to where the
    /// argument was spelled.
    pub fn file_loc(&self, mut loc: Loc) -> Loc {
        loop {
            match self.entry(loc) {
                Some(SlocEntry::Expansion {
                    base,
                    spelling,
                    macro_arg: true,
                    ..
                }) => loc = spelling.offset(loc.0 - base),
                Some(SlocEntry::Expansion {
                    expansion_begin, ..
                }) => loc = *expansion_begin,
                _ => return loc,
            }
        }
    }

    /// Both ends of the outermost expansion containing `loc`.
    pub fn expansion_range(&self, loc: Loc) -> Span {
        match self.entry(loc) {
            Some(SlocEntry::Expansion {
                expansion_begin,
                expansion_end,
                ..
            }) => {
                let begin = self.expansion_range(*expansion_begin).begin;
                let end = self.expansion_range(*expansion_end).end;
                Span::new(begin, end)
            }
            _ => Span::new(loc, loc),
        }
    }

    /// Map a half-open span whose ends may sit inside macro expansions onto
    /// the file text that produced it.
    pub fn expansion_span(&self, span: Span) -> Span {
        let begin = self.expansion_range(span.begin).begin;
        let end = if self.is_macro(span.end) {
            // the end of a macro-produced node extends over the whole invocation
            let last = self.expansion_range(span.end).end;
            self.token_end(last)
        } else {
            span.end
        };
        Span::new(begin, end)
    }

    /// Location just past the token starting at `loc`, found by re-lexing.
    pub fn token_end(&self, loc: Loc) -> Loc {
        let spelled = self.spelling_loc(loc);
        match self.decompose(spelled) {
            Some((file, offset)) => {
                let text = &self.files[file.index()].contents;
                let start = floor_char_boundary(text, offset as usize);
                let end = start + crate::parser::lexer::token_length(&text[start..]);
                loc.offset((end as u32).saturating_sub(offset))
            }
            None => loc,
        }
    }

    /// File and byte offset of a file location. Macro locations yield `None`.
    pub fn decompose(&self, loc: Loc) -> Option<(FileId, u32)> {
        match self.entry(loc)? {
            SlocEntry::File {
                base,
                file,
                file_offset,
                ..
            } => Some((*file, file_offset + (loc.0 - base))),
            SlocEntry::Expansion { .. } => None,
        }
    }

    /// Location from which the file slot containing `loc` was included.
    pub fn include_loc(&self, loc: Loc) -> Loc {
        match self.entry(loc) {
            Some(SlocEntry::File { include_loc, .. }) => *include_loc,
            _ => Loc::INVALID,
        }
    }

    /// Start of the first slot that maps `file`.
    pub fn file_start(&self, file: FileId) -> Loc {
        self.loc_for_offset(file, 0)
    }

    pub fn loc_for_offset(&self, file: FileId, offset: u32) -> Loc {
        self.entries
            .iter()
            .find_map(|entry| match entry {
                SlocEntry::File {
                    base,
                    len,
                    file: f,
                    file_offset,
                    ..
                } if *f == file && offset >= *file_offset && offset <= file_offset + len => {
                    Some(Loc(base + (offset - file_offset)))
                }
                _ => None,
            })
            .unwrap_or(Loc::INVALID)
    }

    pub fn loc_for_line_column(&self, file: FileId, line: u32, column: u32) -> Loc {
        match self.files[file.index()].offset_of(line, column) {
            Some(offset) => self.loc_for_offset(file, offset),
            None => Loc::INVALID,
        }
    }

    /// Source text of a span whose ends lie in the same file slot.
    pub fn text(&self, span: Span) -> Option<&str> {
        let (file, begin) = self.decompose(span.begin)?;
        let (end_file, end) = self.decompose(span.end)?;
        if file != end_file || end < begin {
            return None;
        }
        self.files[file.index()]
            .contents
            .get(begin as usize..end as usize)
    }

    /// Spelling of the `len`-byte token at `loc`.
    pub fn spelling_text(&self, loc: Loc, len: u32) -> Option<&str> {
        let spelled = self.spelling_loc(loc);
        self.text(Span::new(spelled, spelled.offset(len)))
    }

    /// Record a `#line` directive taking effect at `offset`.
    pub fn add_line_directive(&mut self, file: FileId, offset: u32, line: u32, filename: Option<String>) {
        self.files[file.index()].line_directives.push(LineDirective {
            offset,
            line,
            filename,
        });
    }

    /// Filename, line and column after applying `#line` directives.
    pub fn presumed(&self, loc: Loc) -> Option<(String, u32, u32)> {
        let (file, offset) = self.decompose(self.expansion_loc(loc))?;
        let entry = &self.files[file.index()];
        let (line, column) = entry.line_column(offset);
        let directive = entry
            .line_directives
            .iter()
            .rev()
            .find(|d| d.offset <= offset);
        match directive {
            Some(d) => {
                let (directive_line, _) = entry.line_column(d.offset);
                let presumed_line = d.line + (line - directive_line);
                let name = d
                    .filename
                    .clone()
                    .or_else(|| {
                        entry
                            .line_directives
                            .iter()
                            .rev()
                            .filter(|other| other.offset <= d.offset)
                            .find_map(|other| other.filename.clone())
                    })
                    .unwrap_or_else(|| entry.name.clone());
                Some((name, presumed_line, column))
            }
            None => Some((entry.name.clone(), line, column)),
        }
    }
}

/// The largest character boundary of `text` at or before `offset`.
pub(crate) fn floor_char_boundary(text: &str, offset: usize) -> usize {
    let mut at = offset.min(text.len());
    while !text.is_char_boundary(at) {
        at -= 1;
    }
    at
}

/// Lexically normalize a path: drop `.` components and fold `..`.
pub fn normalize_path(path: &Path) -> std::path::PathBuf {
    use std::path::Component;
    let mut out = std::path::PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager_with(text: &str) -> (SourceManager, FileId, Loc) {
        let mut sm = SourceManager::new();
        let file = sm.add_file("main.c", Arc::from(text), None, None, false);
        let start = sm.enter_file(file, Loc::INVALID);
        (sm, file, start)
    }

    #[test]
    fn test_line_column() {
        let (sm, file, start) = manager_with("int x;\nint y;\n");
        let loc = start.offset(11);
        let (f, offset) = sm.decompose(loc).unwrap();
        assert_eq!(f, file);
        assert_eq!(sm.file(f).line_column(offset), (2, 5));
    }

    #[test]
    fn test_token_end_inside_a_character() {
        let (sm, file, start) = manager_with("\u{e9};");
        assert_eq!(sm.decompose(sm.token_end(start.offset(1))), Some((file, 2)));
    }

    #[test]
    fn test_column_clamps_to_line_end() {
        let (sm, file, _) = manager_with("int x;\nint y;\n");
        let entry = sm.file(file);
        assert_eq!(entry.offset_of(1, 4), Some(3));
        assert_eq!(entry.offset_of(1, 40), Some(6));
        assert_eq!(entry.offset_of(2, u32::MAX), Some(13));
        assert_eq!(entry.offset_of(3, u32::MAX), Some(14));
        assert_eq!(entry.offset_of(4, 1), None);
        assert_eq!(entry.offset_of(1, 0), None);
    }

    #[test]
    fn test_end_of_file_is_addressable() {
        let (sm, file, start) = manager_with("abc");
        assert_eq!(sm.decompose(start.offset(3)), Some((file, 3)));
        assert_eq!(sm.decompose(start.offset(4)), None);
    }

    #[test]
    fn test_expansion_and_spelling_differ() {
        // #define ONE 1
        // int x = ONE;
        let text = "#define ONE 1\nint x = ONE;\n";
        let (mut sm, _, start) = manager_with(text);
        let body = start.offset(12); // the `1`
        let use_site = start.offset(22); // the `ONE`
        let expanded = sm.create_expansion(body, 1, use_site, use_site, false);

        assert_eq!(sm.spelling_loc(expanded), body);
        assert_eq!(sm.expansion_loc(expanded), use_site);
        assert_eq!(sm.file_loc(expanded), use_site);
    }

    #[test]
    fn test_macro_argument_file_location() {
        // #define ID(a) a
        // int y = ID(z);
        let text = "#define ID(a) a\nint y = ID(z);\n";
        let (mut sm, _, start) = manager_with(text);
        let invocation = start.offset(24);
        let close = start.offset(28);
        let param = start.offset(14);
        let arg = start.offset(27);
        let param_use = sm.create_expansion(param, 1, invocation, close, false);
        let expanded = sm.create_expansion(arg, 1, param_use, param_use, true);

        assert_eq!(sm.expansion_loc(expanded), invocation);
        assert_eq!(sm.spelling_loc(expanded), arg);
        assert_eq!(sm.file_loc(expanded), arg);
    }

    #[test]
    fn test_scratch_buffer() {
        let (mut sm, _, _) = manager_with("x");
        let first = sm.write_scratch("\"a\"");
        let second = sm.write_scratch("ab");
        assert_eq!(sm.text(Span::new(first, first.offset(3))), Some("\"a\""));
        assert_eq!(sm.text(Span::new(second, second.offset(2))), Some("ab"));
    }

    #[test]
    fn test_line_directive() {
        let (mut sm, file, start) = manager_with("a\n#line 100 \"gen.c\"\nb\nc\n");
        sm.add_line_directive(file, 21, 100, Some("gen.c".to_string()));
        let c = start.offset(23);
        assert_eq!(sm.presumed(c), Some(("gen.c".to_string(), 101, 1)));
        assert_eq!(sm.presumed(start), Some(("main.c".to_string(), 1, 1)));
    }

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path(Path::new("./a/../b/c.h")), Path::new("b/c.h"));
    }
}
