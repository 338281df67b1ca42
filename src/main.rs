// cindex: cursor traversal, indexing and browsing for C translation units

use std::io;
use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cindex::completion::CodeCompleteOptions;
use cindex::dump::{self, DumpOptions};
use cindex::indexer::{
    ClientHandle, DeclInfo, EntityRefInfo, ImportedAstFileInfo, IncludedFileInfo, IndexOptions,
    IndexerCallbacks,
};
use cindex::ui::App;
use cindex::{DiagnosticSet, File, FindResult, Index, ParseOptions, TranslationUnit, VisitorResult};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log at debug level (overrides CINDEX_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// The source file and how to parse it
#[derive(Args)]
struct SourceArgs {
    /// C source file
    #[arg(value_name = "FILE")]
    file: String,

    /// Keep macro definitions and expansions in the preprocessing record
    #[arg(long)]
    detailed: bool,

    /// Skip function bodies
    #[arg(long)]
    skip_bodies: bool,

    /// Compiler arguments (-I, -D, -include-pch, ...) after `--`
    #[arg(last = true, value_name = "ARGS")]
    args: Vec<String>,
}

impl SourceArgs {
    fn options(&self) -> ParseOptions {
        ParseOptions {
            detailed_preprocessing_record: self.detailed,
            skip_function_bodies: self.skip_bodies,
            ..ParseOptions::default()
        }
    }

    fn parse(&self, index: &Index) -> anyhow::Result<TranslationUnit> {
        index
            .parse_translation_unit(Some(self.file.as_str()), &self.args, &[], self.options())
            .with_context(|| format!("cannot parse {}", self.file))
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Print the cursor tree
    Tree {
        #[command(flatten)]
        source: SourceArgs,

        /// Maximum depth to print
        #[arg(short, long)]
        depth: Option<usize>,

        /// Include top-level cursors from included files
        #[arg(long)]
        all: bool,

        /// Print the type of each cursor
        #[arg(long)]
        types: bool,

        /// Print the USR of each declaration
        #[arg(long)]
        usrs: bool,
    },
    /// Print every index event
    Index {
        #[command(flatten)]
        source: SourceArgs,

        /// Index parameters and function-local declarations
        #[arg(long)]
        locals: bool,

        /// Report each referenced entity once per file
        #[arg(long)]
        suppress_redundant_refs: bool,
    },
    /// Print the tokens of the main file with the cursor each belongs to
    Tokens {
        #[command(flatten)]
        source: SourceArgs,
    },
    /// Print code completions at LINE:COLUMN of the main file
    Complete {
        #[command(flatten)]
        source: SourceArgs,

        #[arg(long, value_name = "LINE:COLUMN")]
        at: String,

        /// Add statement and declaration patterns
        #[arg(long)]
        patterns: bool,
    },
    /// Print the references to the entity at LINE:COLUMN of the main file
    Refs {
        #[command(flatten)]
        source: SourceArgs,

        #[arg(long, value_name = "LINE:COLUMN")]
        at: String,
    },
    /// Print the inclusion directives of the main file and every included file
    Includes {
        #[command(flatten)]
        source: SourceArgs,
    },
    /// Save the parsed unit so it can be loaded or imported with -include-pch
    Save {
        #[command(flatten)]
        source: SourceArgs,

        /// Output path
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Browse the cursor tree in the terminal
    Browse {
        #[command(flatten)]
        source: SourceArgs,

        /// Include top-level cursors from included files
        #[arg(long)]
        all: bool,
    },
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_env("CINDEX_LOG").unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false);
    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .init();
}

fn parse_position(text: &str) -> anyhow::Result<(u32, u32)> {
    let Some((line, column)) = text.split_once(':') else {
        bail!("expected LINE:COLUMN, got '{}'", text);
    };
    Ok((
        line.parse().context("invalid line")?,
        column.parse().context("invalid column")?,
    ))
}

fn main_file(unit: &TranslationUnit) -> anyhow::Result<File<'_>> {
    unit.main_file().context("unit has no main file")
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let browsing = matches!(cli.command, Commands::Browse { .. });
    let index = Index::new(false, !browsing);

    match &cli.command {
        Commands::Tree {
            source,
            depth,
            all,
            types,
            usrs,
        } => {
            let unit = source.parse(&index)?;
            let options = DumpOptions {
                max_depth: *depth,
                main_file_only: !*all,
                show_types: *types,
                show_usrs: *usrs,
            };
            let mut out = String::new();
            dump::dump_tree(unit.cursor(), &options, &mut out)?;
            print!("{}", out);
        }
        Commands::Index {
            source,
            locals,
            suppress_redundant_refs,
        } => {
            let options = IndexOptions {
                index_function_local_symbols: *locals,
                suppress_redundant_refs: *suppress_redundant_refs,
                ..IndexOptions::default()
            };
            let mut printer = EventPrinter::default();
            let (outcome, _) = index.create_index_action().index_source_file(
                &mut printer,
                options,
                Some(source.file.as_str()),
                &source.args,
                &[],
                source.options(),
            )?;
            tracing::debug!(?outcome, "index pass finished");
        }
        Commands::Tokens { source } => {
            let unit = source.parse(&index)?;
            let tokens = unit.tokenize(unit.main_file_range());
            let cursors = unit.annotate_tokens(&tokens);
            for (token, cursor) in tokens.iter().zip(cursors) {
                println!(
                    "{:<12} {:<20} {:<16} {:?} {}",
                    format!("{:?}", token.kind()),
                    format!("'{}'", token.spelling()),
                    dump::position(token.location()),
                    cursor.kind(),
                    cursor.spelling()
                );
            }
        }
        Commands::Complete { source, at, patterns } => {
            let (line, column) = parse_position(at)?;
            let unit = source.parse(&index)?;
            let options = CodeCompleteOptions {
                include_code_patterns: *patterns,
                ..CodeCompleteOptions::default()
            };
            let mut results = unit
                .code_complete_at(main_file(&unit)?, line, column, &[], options)
                .with_context(|| format!("cannot complete at {}", at))?;
            results.sort_results();
            for result in results.results() {
                println!("{:?}: {}", result.cursor_kind, result.completion);
            }
        }
        Commands::Refs { source, at } => {
            let (line, column) = parse_position(at)?;
            let unit = source.parse(&index)?;
            let file = main_file(&unit)?;
            let cursor = unit.cursor_at(unit.location(file, line, column));
            let result = cursor.find_references_in_file(file, |found, range| {
                let at = if range.is_null() {
                    "<macro body>".to_string()
                } else {
                    dump::position(range.begin())
                };
                println!("{} {:?} {}", at, found.kind(), found.spelling());
                VisitorResult::Continue
            });
            if result == FindResult::Invalid {
                bail!("no entity at {}", at);
            }
        }
        Commands::Includes { source } => {
            let unit = source.parse(&index)?;
            unit.find_includes_in_file(main_file(&unit)?, |cursor, range| {
                let target = cursor.included_file().map_or("<not found>", |f| f.name());
                println!("{} {} -> {}", dump::position(range.begin()), cursor.spelling(), target);
                VisitorResult::Continue
            });
            unit.inclusions(|file, stack| {
                println!("{}{}", "  ".repeat(stack.len()), file.name());
            });
        }
        Commands::Save { source, output } => {
            let unit = source.parse(&index)?;
            unit.save(output)
                .with_context(|| format!("cannot save to {}", output.display()))?;
            println!("saved {} to {}", source.file, output.display());
        }
        Commands::Browse { source, all } => {
            let unit = source.parse(&index)?;
            browse(&unit, !*all)?;
        }
    }

    Ok(())
}

fn browse(unit: &TranslationUnit, main_file_only: bool) -> anyhow::Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(unit, main_file_only);
    let res = app.run(&mut terminal);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    res.context("browser failed")
}

/// Prints one line per index event.
#[derive(Default)]
struct EventPrinter {
    next_file: usize,
}

impl EventPrinter {
    fn file_handle(&mut self) -> Option<ClientHandle> {
        self.next_file += 1;
        Some(ClientHandle(self.next_file))
    }
}

impl IndexerCallbacks for EventPrinter {
    fn diagnostic(&mut self, diagnostics: DiagnosticSet<'_>) {
        println!("[diagnostics] {}", diagnostics.len());
    }

    fn entered_main_file(&mut self, file: File<'_>) -> Option<ClientHandle> {
        println!("[main file] {}", file.name());
        self.file_handle()
    }

    fn pp_included_file(&mut self, info: &IncludedFileInfo<'_>) -> Option<ClientHandle> {
        let target = info.file.map_or("<not found>", |f| f.name());
        println!(
            "[include] {} at {} -> {}",
            info.filename,
            dump::position(info.hash_loc.source_location()),
            target
        );
        self.file_handle()
    }

    fn imported_ast_file(&mut self, info: &ImportedAstFileInfo<'_>) -> Option<ClientHandle> {
        println!("[import] {} ({})", info.path, info.file.name());
        self.file_handle()
    }

    fn started_translation_unit(&mut self) -> Option<ClientHandle> {
        println!("[started]");
        None
    }

    fn index_declaration(&mut self, decl: &DeclInfo<'_>) {
        println!(
            "[decl] {:?} {} {} usr={}{}{}{}",
            decl.entity.kind,
            decl.entity.name,
            dump::position(decl.loc.source_location()),
            decl.entity.usr,
            if decl.is_definition { " def" } else { "" },
            if decl.is_redeclaration { " redecl" } else { "" },
            if decl.is_implicit { " implicit" } else { "" },
        );
    }

    fn index_entity_reference(&mut self, reference: &EntityRefInfo<'_>) {
        println!(
            "[ref] {:?} {} {} roles={:#x}",
            reference.referenced_entity.kind,
            reference.referenced_entity.name,
            dump::position(reference.loc.source_location()),
            reference.role.bits()
        );
    }
}
