//! Diagnostics reported while building a translation unit
//!
//! The front end records [`StoredDiagnostic`]s through the [`DiagnosticsEngine`].
//! Clients see them through borrowed [`Diagnostic`] and [`DiagnosticSet`]
//! handles that live as long as the owning unit.

pub mod engine;

pub use engine::{Category, DiagnosticConfig, DiagnosticsEngine, Severity, StoredDiagnostic};

use crate::source::{SourceLocation, SourceManager, SourceRange};
use std::fmt::Write as _;

/// Which pieces of information [`Diagnostic::format`] includes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayOptions {
    pub source_location: bool,
    pub column: bool,
    pub source_ranges: bool,
    pub option: bool,
    pub category_id: bool,
    pub category_name: bool,
}

impl Default for DisplayOptions {
    fn default() -> Self {
        DisplayOptions {
            source_location: true,
            column: true,
            source_ranges: false,
            option: true,
            category_id: false,
            category_name: false,
        }
    }
}

/// One diagnostic, borrowed from its translation unit.
#[derive(Clone, Copy)]
pub struct Diagnostic<'tu> {
    sm: &'tu SourceManager,
    stored: &'tu StoredDiagnostic,
}

impl<'tu> Diagnostic<'tu> {
    pub fn severity(&self) -> Severity {
        self.stored.severity
    }

    pub fn spelling(&self) -> &'tu str {
        &self.stored.message
    }

    pub fn location(&self) -> SourceLocation<'tu> {
        SourceLocation::new(self.sm, self.stored.loc)
    }

    /// The flag that enables this diagnostic and the one that disables it.
    pub fn option(&self) -> Option<(String, String)> {
        self.stored
            .option
            .map(|name| (format!("-W{}", name), format!("-Wno-{}", name)))
    }

    pub fn category(&self) -> u32 {
        self.stored.category as u32
    }

    pub fn category_name(&self) -> &'static str {
        self.stored.category.name()
    }

    pub fn ranges(&self) -> Vec<SourceRange<'tu>> {
        self.stored
            .ranges
            .iter()
            .map(|span| SourceRange::from_span(self.sm, *span))
            .collect()
    }

    /// Replacement text paired with the range it replaces.
    pub fn fixits(&self) -> Vec<(SourceRange<'tu>, &'tu str)> {
        self.stored
            .fixits
            .iter()
            .map(|fix| (SourceRange::from_span(self.sm, fix.span), fix.replacement.as_str()))
            .collect()
    }

    /// Attached notes.
    pub fn children(&self) -> DiagnosticSet<'tu> {
        DiagnosticSet::new(self.sm, &self.stored.notes)
    }

    /// Render as `file:line:col: severity: message [-Wflag]`.
    pub fn format(&self, options: DisplayOptions) -> String {
        let mut out = String::new();
        let loc = self.location().file_location();
        if options.source_location {
            if let Some(file) = loc.file {
                let _ = write!(out, "{}:{}:", file.name(), loc.line);
                if options.column {
                    let _ = write!(out, "{}:", loc.column);
                }
                if options.source_ranges {
                    for range in self.ranges() {
                        let begin = range.begin().file_location();
                        let end = range.end().file_location();
                        if begin.file.is_some() && begin.file == end.file {
                            let _ = write!(
                                out,
                                "{{{}:{}-{}:{}}}",
                                begin.line, begin.column, end.line, end.column
                            );
                        }
                    }
                    if !self.stored.ranges.is_empty() {
                        out.push(':');
                    }
                }
                out.push(' ');
            }
        }
        let _ = write!(out, "{}: {}", self.severity().as_str(), self.spelling());

        let mut bracket = Vec::new();
        if options.option {
            if let Some((enable, _)) = self.option() {
                bracket.push(enable);
            }
        }
        if options.category_id && self.stored.category != Category::None {
            bracket.push(self.category().to_string());
        }
        if options.category_name && self.stored.category != Category::None {
            bracket.push(self.category_name().to_string());
        }
        if !bracket.is_empty() {
            let _ = write!(out, " [{}]", bracket.join(", "));
        }
        out
    }
}

impl std::fmt::Debug for Diagnostic<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.format(DisplayOptions::default()))
    }
}

/// An ordered set of diagnostics.
#[derive(Clone, Copy)]
pub struct DiagnosticSet<'tu> {
    sm: Option<&'tu SourceManager>,
    items: &'tu [StoredDiagnostic],
}

impl<'tu> DiagnosticSet<'tu> {
    pub(crate) fn new(sm: &'tu SourceManager, items: &'tu [StoredDiagnostic]) -> Self {
        DiagnosticSet { sm: Some(sm), items }
    }

    /// A set with no diagnostics.
    pub fn empty() -> Self {
        DiagnosticSet { sm: None, items: &[] }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<Diagnostic<'tu>> {
        let sm = self.sm?;
        self.items.get(index).map(|stored| Diagnostic { sm, stored })
    }

    pub fn iter(&self) -> impl Iterator<Item = Diagnostic<'tu>> + '_ {
        let sm = self.sm;
        self.items
            .iter()
            .filter_map(move |stored| sm.map(|sm| Diagnostic { sm, stored }))
    }

    pub fn has_errors(&self) -> bool {
        self.items.iter().any(|d| d.severity >= Severity::Error)
    }
}

impl std::fmt::Debug for DiagnosticSet<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::Loc;
    use std::sync::Arc;

    #[test]
    fn test_format() {
        let mut sm = SourceManager::new();
        let file = sm.add_file("t.c", Arc::from("int x\n"), None, None, false);
        let start = sm.enter_file(file, Loc::INVALID);
        let mut stored = StoredDiagnostic::new(Severity::Warning, Category::Semantic, start.offset(4), "oops");
        stored.option = Some("unused-variable");
        let items = vec![stored];
        let set = DiagnosticSet::new(&sm, &items);
        let diag = set.get(0).unwrap();

        assert_eq!(diag.format(DisplayOptions::default()), "t.c:1:5: warning: oops [-Wunused-variable]");
        let with_name = DisplayOptions {
            category_name: true,
            ..Default::default()
        };
        assert_eq!(
            diag.format(with_name),
            "t.c:1:5: warning: oops [-Wunused-variable, Semantic Issue]"
        );
        assert_eq!(
            diag.option(),
            Some(("-Wunused-variable".to_string(), "-Wno-unused-variable".to_string()))
        );
    }
}
