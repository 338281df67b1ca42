//! Compile arguments understood by the front end

use super::ErrorCode;
use crate::diagnostics::DiagnosticConfig;
use crate::parser::preprocessor::HeaderSearch;

/// A `-D` or `-U` option, kept in command-line order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum MacroArg {
    Define(String, String),
    Undef(String),
}

#[derive(Debug, Clone, Default)]
pub(crate) struct CompileArgs {
    pub search: HeaderSearch,
    pub macros: Vec<MacroArg>,
    pub include_pch: Vec<String>,
    pub diagnostics: DiagnosticConfig,
    /// First positional argument, used when no source file is given.
    pub source: Option<String>,
}

impl CompileArgs {
    pub(crate) fn parse<S: AsRef<str>>(args: &[S]) -> Result<CompileArgs, ErrorCode> {
        let mut out = CompileArgs::default();
        let mut iter = args.iter().map(AsRef::as_ref);
        while let Some(arg) = iter.next() {
            let mut value_of = |flag: &str| -> Result<String, ErrorCode> {
                match &arg[flag.len()..] {
                    "" => iter.next().map(str::to_string).ok_or_else(|| {
                        tracing::warn!(flag, "argument is missing its value");
                        ErrorCode::InvalidArguments
                    }),
                    joined => Ok(joined.to_string()),
                }
            };
            if arg == "-include-pch" {
                out.include_pch.push(value_of(arg)?);
            } else if arg.starts_with("-iquote") {
                out.search.quote_dirs.push(value_of("-iquote")?);
            } else if arg.starts_with("-isystem") {
                out.search.system_dirs.push(value_of("-isystem")?);
            } else if arg.starts_with("-I") {
                out.search.angled_dirs.push(value_of("-I")?);
            } else if arg.starts_with("-D") {
                let definition = value_of("-D")?;
                let (name, value) = match definition.split_once('=') {
                    Some((name, value)) => (name.to_string(), value.to_string()),
                    None => (definition, "1".to_string()),
                };
                out.macros.push(MacroArg::Define(name, value));
            } else if arg.starts_with("-U") {
                out.macros.push(MacroArg::Undef(value_of("-U")?));
            } else if arg == "-w" {
                out.diagnostics.ignore_warnings = true;
            } else if arg == "-Werror" {
                out.diagnostics.warnings_as_errors = true;
            } else if let Some(name) = arg.strip_prefix("-Wno-") {
                out.diagnostics.disabled.insert(name.to_string());
            } else if arg.starts_with('-') {
                tracing::debug!(arg, "ignoring unsupported argument");
            } else if out.source.is_none() {
                out.source = Some(arg.to_string());
            }
        }
        Ok(out)
    }

    /// `#define`/`#undef` lines for the `-D`/`-U` options.
    pub(crate) fn macro_lines(&self) -> String {
        let mut text = String::new();
        for arg in &self.macros {
            match arg {
                MacroArg::Define(name, value) => {
                    text.push_str(&format!("#define {} {}\n", name, value));
                }
                MacroArg::Undef(name) => {
                    text.push_str(&format!("#undef {}\n", name));
                }
            }
        }
        text
    }
}

/// Macros every unit starts with.
pub(crate) const PREDEFINES: &str = "#define __STDC__ 1\n\
#define __STDC_VERSION__ 199901L\n\
#define __STDC_HOSTED__ 1\n\
#define NULL ((void *)0)\n";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_joined_and_separate_values() {
        let args = CompileArgs::parse(&["-Iinc", "-I", "other", "-DX=2", "-D", "Y", "-UZ", "-isystem", "sys"]).unwrap();
        assert_eq!(args.search.angled_dirs, vec!["inc", "other"]);
        assert_eq!(args.search.system_dirs, vec!["sys"]);
        assert_eq!(
            args.macros,
            vec![
                MacroArg::Define("X".into(), "2".into()),
                MacroArg::Define("Y".into(), "1".into()),
                MacroArg::Undef("Z".into()),
            ]
        );
        assert_eq!(args.macro_lines(), "#define X 2\n#define Y 1\n#undef Z\n");
    }

    #[test]
    fn test_warning_flags_and_positional() {
        let args = CompileArgs::parse(&["-Werror", "-Wno-unused", "-O2", "main.c"]).unwrap();
        assert!(args.diagnostics.warnings_as_errors);
        assert!(args.diagnostics.disabled.contains("unused"));
        assert_eq!(args.source.as_deref(), Some("main.c"));
    }

    #[test]
    fn test_missing_value_is_invalid() {
        assert!(matches!(CompileArgs::parse(&["-I"]), Err(ErrorCode::InvalidArguments)));
        assert!(matches!(
            CompileArgs::parse(&["-include-pch"]),
            Err(ErrorCode::InvalidArguments)
        ));
    }
}
