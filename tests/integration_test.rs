// Integration tests for cursor traversal, indexing and saved units

use cindex::indexer::{ClientHandle, DeclInfo, ImportedAstFileInfo, IncludedFileInfo};
use cindex::{
    ChildVisitResult, CursorKind, DiagnosticSet, File, Index, IndexOptions, IndexOutcome,
    IndexerCallbacks, ParseOptions, TranslationUnit, UnsavedFile, VisitorResult,
};

fn parse(name: &str, source: &str) -> TranslationUnit {
    Index::new(false, false)
        .parse_translation_unit(
            Some(name),
            &[] as &[&str],
            &[UnsavedFile::new(name, source)],
            ParseOptions::default(),
        )
        .expect("unit should parse")
}

/// Records every index event as one line of text.
#[derive(Default)]
struct Recorder {
    events: Vec<String>,
}

impl IndexerCallbacks for Recorder {
    fn diagnostic(&mut self, diagnostics: DiagnosticSet<'_>) {
        self.events.push(format!("diagnostic {}", diagnostics.len()));
    }

    fn entered_main_file(&mut self, file: File<'_>) -> Option<ClientHandle> {
        self.events.push(format!("main {}", file.name()));
        None
    }

    fn pp_included_file(&mut self, info: &IncludedFileInfo<'_>) -> Option<ClientHandle> {
        self.events.push(format!("include {}", info.filename));
        None
    }

    fn imported_ast_file(&mut self, info: &ImportedAstFileInfo<'_>) -> Option<ClientHandle> {
        self.events.push(format!("import {}", info.path));
        None
    }

    fn started_translation_unit(&mut self) -> Option<ClientHandle> {
        self.events.push("started".to_string());
        None
    }

    fn index_declaration(&mut self, decl: &DeclInfo<'_>) {
        self.events.push(format!("decl {}", decl.entity.name));
    }
}

#[test]
fn test_leaf_cursor_has_no_visits() {
    let tu = parse("leaf.c", "int after;\n");
    let var = tu.cursor().children()[0];
    assert_eq!(var.kind(), CursorKind::VarDecl);

    let mut visits = 0;
    let stopped = var.visit_children(|_, _| {
        visits += 1;
        ChildVisitResult::Recurse
    });
    assert_eq!(visits, 0);
    assert!(!stopped);
}

#[test]
fn test_continue_recurse_break() {
    let tu = parse(
        "three.c",
        "struct A { int a; };\nstruct B { int b1; int b2; };\nstruct C { int c; };\nint after;\n",
    );
    let root = tu.cursor();

    let mut seen = Vec::new();
    let mut top_level = 0;
    let stopped = root.visit_children(|cursor, parent| {
        seen.push(cursor.spelling());
        if parent != root {
            return ChildVisitResult::Continue;
        }
        top_level += 1;
        match top_level {
            1 => ChildVisitResult::Continue,
            2 => ChildVisitResult::Recurse,
            _ => ChildVisitResult::Break,
        }
    });

    assert!(stopped);
    assert_eq!(seen, vec!["A", "B", "b1", "b2", "C"]);
}

#[test]
fn test_break_on_nth_visit() {
    let tu = parse("many.c", "int a;\nint b;\nint c;\nint d;\nint e;\n");
    for n in 1..=5 {
        let mut visits = 0;
        let stopped = tu.cursor().visit_children(|_, _| {
            visits += 1;
            if visits == n {
                ChildVisitResult::Break
            } else {
                ChildVisitResult::Continue
            }
        });
        assert!(stopped);
        assert_eq!(visits, n);
    }
}

#[test]
fn test_macro_argument_expansion_and_spelling() {
    let tu = parse("arg.c", "#define ID(x) x\nint v = ID(42);\n");
    let var = tu.cursor().children()[0];
    let literal = var.children()[0];
    assert_eq!(literal.kind(), CursorKind::IntegerLiteral);

    let expansion = literal.location().expansion();
    assert_eq!((expansion.line, expansion.column), (2, 9));
    let spelling = literal.location().spelling();
    assert_eq!((spelling.line, spelling.column), (2, 12));
}

#[test]
fn test_index_unit_without_includes() {
    let index = Index::new(false, false);
    let mut recorder = Recorder::default();
    let (outcome, _) = index
        .create_index_action()
        .index_source_file(
            &mut recorder,
            IndexOptions::default(),
            Some("plain.c"),
            &[] as &[&str],
            &[UnsavedFile::new("plain.c", "int f(void) { return 0; }\n")],
            ParseOptions::default(),
        )
        .unwrap();

    assert_eq!(outcome, IndexOutcome::Completed);
    let events = &recorder.events;
    assert_eq!(events.iter().filter(|e| *e == "started").count(), 1);
    assert!(!events.iter().any(|e| e.starts_with("include ")));
    let diagnostics: Vec<_> = events
        .iter()
        .enumerate()
        .filter(|(_, e)| e.starts_with("diagnostic "))
        .collect();
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].0, events.len() - 1);
    assert_eq!(events[0], "started");
}

#[test]
fn test_inclusions_precede_declarations() {
    let index = Index::new(false, false);
    let unsaved = [
        UnsavedFile::new("main.c", "#include \"a.h\"\nint use(void) { return shared; }\n"),
        UnsavedFile::new("a.h", "extern int shared;\n"),
    ];
    let mut recorder = Recorder::default();
    index
        .create_index_action()
        .index_source_file(
            &mut recorder,
            IndexOptions::default(),
            Some("main.c"),
            &[] as &[&str],
            &unsaved,
            ParseOptions::default(),
        )
        .unwrap();

    let position = |event: &str| recorder.events.iter().position(|e| e == event);
    let include = position("include a.h").expect("include reported");
    let shared = position("decl shared").expect("header declaration reported");
    let used = position("decl use").expect("main declaration reported");
    assert!(include < shared);
    assert!(shared < used);
}

#[test]
fn test_headers_found_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let inc = dir.path().join("inc");
    std::fs::create_dir(&inc).unwrap();
    std::fs::write(dir.path().join("local.h"), "#define LOCAL 1\n").unwrap();
    std::fs::write(inc.join("lib.h"), "#define LIB 2\n").unwrap();
    let main = dir.path().join("main.c");
    std::fs::write(
        &main,
        "#include \"local.h\"\n#include <lib.h>\nint total = LOCAL + LIB;\n",
    )
    .unwrap();

    let include_flag = format!("-I{}", inc.display());
    let tu = Index::new(false, false)
        .parse_translation_unit(
            Some(main.to_str().unwrap()),
            &[include_flag.as_str()],
            &[],
            ParseOptions::default(),
        )
        .unwrap();
    assert_eq!(tu.diagnostics().len(), 0);

    let mut included = Vec::new();
    tu.find_includes_in_file(tu.main_file().unwrap(), |cursor, _| {
        assert_eq!(cursor.kind(), CursorKind::InclusionDirective);
        included.push(cursor.included_file().map(|f| f.name().to_string()));
        VisitorResult::Continue
    });
    assert_eq!(included.len(), 2);
    assert!(included[0].as_deref().is_some_and(|n| n.ends_with("local.h")));
    assert!(included[1].as_deref().is_some_and(|n| n.ends_with("lib.h")));
}

#[test]
fn test_saved_unit_loads_without_sources() {
    let dir = tempfile::tempdir().unwrap();
    let header = dir.path().join("shape.h");
    let main = dir.path().join("shape.c");
    std::fs::write(&header, "struct Shape { int sides; };\n").unwrap();
    std::fs::write(
        &main,
        "#include \"shape.h\"\nint sides(struct Shape *s) { return s->sides; }\n",
    )
    .unwrap();

    let index = Index::new(false, false);
    let tu = index
        .parse_translation_unit(Some(main.to_str().unwrap()), &[] as &[&str], &[], ParseOptions::default())
        .unwrap();
    let saved = dir.path().join("shape.ast");
    tu.save(&saved).unwrap();

    std::fs::remove_file(&header).unwrap();
    std::fs::remove_file(&main).unwrap();

    let loaded = index.create_translation_unit(&saved).unwrap();
    assert_eq!(loaded.diagnostics().len(), 0);
    let names: Vec<_> = loaded.cursor().children().iter().map(|c| c.spelling()).collect();
    assert_eq!(names, vec!["Shape", "sides"]);
}

#[test]
fn test_imported_ast_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let pch = dir.path().join("common.ast");
    parse("common.h", "int shared;\n").save(&pch).unwrap();
    let pch_path = pch.to_str().unwrap();

    let index = Index::new(true, false);
    let mut recorder = Recorder::default();
    let (_, tu) = index
        .create_index_action()
        .index_source_file(
            &mut recorder,
            IndexOptions::default(),
            Some("user.c"),
            &["-include-pch", pch_path],
            &[UnsavedFile::new("user.c", "int use(void) { return shared; }\n")],
            ParseOptions::default(),
        )
        .unwrap();

    assert_eq!(tu.diagnostics().len(), 0);
    assert!(recorder.events.contains(&format!("import {}", pch_path)));
    assert!(recorder.events.contains(&"decl use".to_string()));
    assert!(!recorder.events.contains(&"decl shared".to_string()));
}
