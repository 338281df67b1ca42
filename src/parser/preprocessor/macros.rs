//! Macro definition and expansion.

use super::{token_name, MacroDefinitionRecord, MacroExpansionRecord, Pending, PpEntity, PpId, Preprocessor};
use crate::diagnostics::Category;
use crate::parser::lexer::{Lexer, Token, TokenKind};
use crate::source::{Loc, Span, BUILTIN_BUFFER};
use std::rc::Rc;
use std::sync::Arc;

#[derive(Debug)]
pub(crate) struct MacroDef {
    pub name: String,
    /// `None` for object-like macros.
    pub params: Option<Vec<String>>,
    pub variadic: bool,
    pub body: Vec<Token>,
    pub name_loc: Loc,
    pub record: Option<PpId>,
    pub is_builtin: bool,
}

impl MacroDef {
    fn param_index(&self, token: &Token) -> Option<usize> {
        let name = token.ident()?;
        self.params.as_ref()?.iter().position(|p| p == name)
    }

    fn is_variadic_param(&self, index: usize) -> bool {
        self.variadic && self.params.as_ref().is_some_and(|p| index + 1 == p.len())
    }
}

type ParamList = (Vec<String>, bool, usize);

/// Parse `a, b, ...)`; returns the names, whether the macro is variadic and how
/// many tokens were consumed.
fn parse_params(tokens: &[Token], fallback: Loc) -> Result<ParamList, (Loc, &'static str)> {
    let mut params: Vec<String> = Vec::new();
    if tokens.first().is_some_and(|t| t.is(&TokenKind::RParen)) {
        return Ok((params, false, 1));
    }
    let mut i = 0;
    loop {
        let Some(token) = tokens.get(i) else {
            return Err((fallback, "missing ')' in macro parameter list"));
        };
        if token.is(&TokenKind::Ellipsis) {
            params.push("__VA_ARGS__".to_string());
            return match tokens.get(i + 1) {
                Some(close) if close.is(&TokenKind::RParen) => Ok((params, true, i + 2)),
                _ => Err((token.loc, "missing ')' in macro parameter list")),
            };
        }
        let Some(name) = token_name(&token.kind) else {
            return Err((token.loc, "invalid token in macro parameter list"));
        };
        if params.contains(&name) {
            return Err((token.loc, "duplicate macro parameter name"));
        }
        params.push(name);
        i += 1;
        match tokens.get(i).map(|t| &t.kind) {
            Some(TokenKind::Comma) => i += 1,
            Some(TokenKind::RParen) => return Ok((params, false, i + 1)),
            Some(TokenKind::Ellipsis) => {
                // GNU named variadic parameter
                return match tokens.get(i + 1) {
                    Some(close) if close.is(&TokenKind::RParen) => Ok((params, true, i + 2)),
                    _ => Err((token.loc, "missing ')' in macro parameter list")),
                };
            }
            _ => return Err((token.loc, "expected comma in macro parameter list")),
        }
    }
}

impl Preprocessor<'_> {
    pub(super) fn handle_define(&mut self) {
        let tokens = self.directive_tokens();
        let Some(name_token) = tokens.first() else {
            self.diags
                .error(Category::Lexical, self.last_loc, "macro name missing");
            return;
        };
        let Some(name) = token_name(&name_token.kind) else {
            self.diags.error(
                Category::Lexical,
                name_token.loc,
                "macro name must be an identifier",
            );
            return;
        };
        if name == "defined" {
            self.diags.error(
                Category::Lexical,
                name_token.loc,
                "'defined' cannot be used as a macro name",
            );
            return;
        }

        let mut rest = 1;
        let mut params = None;
        let mut variadic = false;
        if tokens
            .get(1)
            .is_some_and(|t| t.is(&TokenKind::LParen) && !t.leading_space)
        {
            match parse_params(&tokens[2..], tokens[1].loc) {
                Ok((list, is_variadic, consumed)) => {
                    params = Some(list);
                    variadic = is_variadic;
                    rest = 2 + consumed;
                }
                Err((loc, message)) => {
                    self.diags.error(Category::Lexical, loc, message);
                    return;
                }
            }
        }

        let mut body: Vec<Token> = tokens[rest..].to_vec();
        for token in &mut body {
            token.at_line_start = false;
        }
        if let Some(first) = body.first_mut() {
            first.leading_space = false;
        }
        let paste_at_edge = body.first().is_some_and(|t| t.is(&TokenKind::HashHash))
            || body.last().is_some_and(|t| t.is(&TokenKind::HashHash));
        if paste_at_edge {
            let loc = body
                .iter()
                .find(|t| t.is(&TokenKind::HashHash))
                .map_or(name_token.loc, |t| t.loc);
            self.diags.error(
                Category::Lexical,
                loc,
                "'##' cannot appear at either end of a macro expansion",
            );
            return;
        }

        let is_builtin = self
            .frames
            .last()
            .is_some_and(|f| self.sm.file(f.file).name == BUILTIN_BUFFER);
        let end = tokens.last().map_or(name_token.end(), Token::end);
        let mut def = MacroDef {
            name: name.clone(),
            params,
            variadic,
            body,
            name_loc: name_token.loc,
            record: None,
            is_builtin,
        };

        if def.params.is_some() {
            for (i, token) in def.body.iter().enumerate() {
                let names_param = def
                    .body
                    .get(i + 1)
                    .is_some_and(|next| def.param_index(next).is_some());
                if token.is(&TokenKind::Hash) && !names_param {
                    self.diags.error(
                        Category::Lexical,
                        token.loc,
                        "'#' is not followed by a macro parameter",
                    );
                    return;
                }
            }
        }

        if let Some(previous) = self.macros.get(&name).cloned() {
            if !previous.is_builtin && !self.same_definition(&previous, &def) {
                self.diags
                    .warning(
                        Category::Lexical,
                        def.name_loc,
                        format!("'{}' macro redefined", name),
                        "macro-redefined",
                    )
                    .note(previous.name_loc, "previous definition is here");
            }
        }

        if self.options.detailed_record && !is_builtin {
            let id = self.record.push(
                PpEntity::MacroDefinition(MacroDefinitionRecord {
                    name: name.clone(),
                    name_loc: def.name_loc,
                    span: Span::new(def.name_loc, end),
                    function_like: def.params.is_some(),
                }),
                self.emitted,
            );
            def.record = Some(id);
        }
        tracing::trace!(%name, function_like = def.params.is_some(), "macro defined");
        self.macros.insert(name, Rc::new(def));
    }

    pub(super) fn handle_undef(&mut self) {
        let tokens = self.directive_tokens();
        match tokens.first().and_then(|t| token_name(&t.kind)) {
            Some(name) => {
                self.macros.remove(&name);
                if let Some(extra) = tokens.get(1) {
                    self.diags.warning(
                        Category::Lexical,
                        extra.loc,
                        "extra tokens at end of #undef directive",
                        "extra-tokens",
                    );
                }
            }
            None => {
                let loc = tokens.first().map_or(self.last_loc, |t| t.loc);
                self.diags.error(Category::Lexical, loc, "macro name missing");
            }
        }
    }

    fn same_definition(&self, a: &MacroDef, b: &MacroDef) -> bool {
        a.params == b.params
            && a.variadic == b.variadic
            && a.body.len() == b.body.len()
            && a.body.iter().zip(&b.body).enumerate().all(|(i, (x, y))| {
                (i == 0 || x.leading_space == y.leading_space) && self.spelling(x) == self.spelling(y)
            })
    }

    pub(super) fn is_defined(&self, name: &str) -> bool {
        self.macros.contains_key(name) || matches!(name, "__FILE__" | "__LINE__")
    }

    /// Expand the macro named by `token` onto the pending queue. Returns `false`
    /// when the identifier is not a macro invocation.
    pub(super) fn try_expand(&mut self, token: &Token) -> bool {
        let Some(name) = token.ident() else {
            return false;
        };
        let Some(def) = self.macros.get(name).cloned() else {
            return self.expand_builtin(token);
        };

        let (args, end_token) = if def.params.is_some() {
            let next = self.next_unexpanded();
            if !next.is(&TokenKind::LParen) {
                if !matches!(next.kind, TokenKind::Eof) {
                    self.unget(next);
                }
                return false;
            }
            match self.collect_args(token, &def) {
                Some(collected) => collected,
                None => return true,
            }
        } else {
            (Vec::new(), token.clone())
        };

        if self.options.detailed_record && !self.sm.is_macro(token.loc) {
            self.record.push(
                PpEntity::MacroExpansion(MacroExpansionRecord {
                    name: def.name.clone(),
                    span: Span::new(token.loc, end_token.end()),
                    definition: def.record,
                }),
                self.emitted,
            );
        }

        let mut expanded = self.substitute(&def, token, &args, end_token.loc);
        for t in &mut expanded {
            if t.ident() == Some(def.name.as_str()) {
                t.no_expand = true;
            }
        }
        if let Some(first) = expanded.first_mut() {
            first.leading_space = token.leading_space;
        }
        tracing::trace!(name = %def.name, tokens = expanded.len(), "macro expanded");

        self.pending
            .push_front(Pending::EndExpansion(def.name.clone()));
        for t in expanded.into_iter().rev() {
            self.pending.push_front(Pending::Token(t));
        }
        self.active.insert(def.name.clone());
        true
    }

    fn expand_builtin(&mut self, token: &Token) -> bool {
        let text = match token.ident() {
            Some("__FILE__") => {
                let name = self
                    .sm
                    .presumed(token.loc)
                    .map(|(name, _, _)| name)
                    .unwrap_or_default();
                format!("\"{}\"", name.replace('\\', "\\\\").replace('"', "\\\""))
            }
            Some("__LINE__") => {
                let line = self.sm.presumed(token.loc).map_or(0, |(_, line, _)| line);
                line.to_string()
            }
            _ => return false,
        };
        let scratch = self.sm.write_scratch(&text);
        let mut result = Lexer::new(Arc::from(text.as_str()), scratch).next_token();
        result.loc = self
            .sm
            .create_expansion(scratch, result.len, token.loc, token.loc, false);
        result.leading_space = token.leading_space;
        result.at_line_start = false;
        self.unget(result);
        true
    }

    /// Read the arguments of a function-like invocation; the `(` is consumed.
    fn collect_args(&mut self, name: &Token, def: &MacroDef) -> Option<(Vec<Vec<Token>>, Token)> {
        let param_count = def.params.as_ref().map_or(0, Vec::len);
        let mut args: Vec<Vec<Token>> = vec![Vec::new()];
        let mut depth = 0;
        let close = loop {
            let token = self.next_unexpanded();
            match token.kind {
                TokenKind::Eof => {
                    self.diags.error(
                        Category::Lexical,
                        name.loc,
                        "unterminated function-like macro invocation",
                    );
                    return None;
                }
                TokenKind::LParen => depth += 1,
                TokenKind::RParen if depth == 0 => break token,
                TokenKind::RParen => depth -= 1,
                TokenKind::Comma if depth == 0 && !(def.variadic && args.len() == param_count) => {
                    args.push(Vec::new());
                    continue;
                }
                _ => {}
            }
            if let Some(current) = args.last_mut() {
                current.push(token);
            }
        };

        if param_count == 0 && args.len() == 1 && args[0].is_empty() {
            args.clear();
        }
        if args.len() + 1 == param_count && def.variadic {
            args.push(Vec::new());
        }
        if args.len() < param_count {
            self.diags
                .error(
                    Category::Lexical,
                    close.loc,
                    "too few arguments provided to function-like macro invocation",
                )
                .note(def.name_loc, format!("macro '{}' defined here", def.name));
            return None;
        }
        if args.len() > param_count {
            self.diags
                .error(
                    Category::Lexical,
                    close.loc,
                    "too many arguments provided to function-like macro invocation",
                )
                .note(def.name_loc, format!("macro '{}' defined here", def.name));
            return None;
        }
        Some((args, close))
    }

    /// Replace parameters, apply `#` and `##`, and give every produced token an
    /// expansion location spanning `name`..`end`.
    fn substitute(&mut self, def: &MacroDef, name: &Token, args: &[Vec<Token>], end: Loc) -> Vec<Token> {
        let begin = name.loc;
        let body = &def.body;
        let mut expanded_args: Vec<Option<Vec<Token>>> = vec![None; args.len()];
        let mut out: Vec<Token> = Vec::new();
        // set when the left operand of a pending `##` was an empty argument
        let mut placemarker = false;
        let mut i = 0;

        while i < body.len() {
            let token = &body[i];

            if def.params.is_some() && token.is(&TokenKind::Hash) {
                if let Some(p) = body.get(i + 1).and_then(|next| def.param_index(next)) {
                    let mut string = self.stringify(&args[p], begin, end);
                    string.leading_space = token.leading_space;
                    out.push(string);
                    i += 2;
                    continue;
                }
            }

            if token.is(&TokenKind::HashHash) {
                let Some(next) = body.get(i + 1) else {
                    break;
                };
                let rhs = match def.param_index(next) {
                    Some(p) => self.arg_tokens(&args[p], next, begin, end),
                    None => vec![self.body_token(next, begin, end)],
                };
                if rhs.is_empty() {
                    // `, ## __VA_ARGS__` swallows the comma when nothing was passed
                    let variadic_rhs = def.param_index(next).is_some_and(|p| def.is_variadic_param(p));
                    if variadic_rhs && !placemarker && out.last().is_some_and(|t| t.is(&TokenKind::Comma)) {
                        out.pop();
                    }
                    i += 2;
                    continue;
                }
                let variadic_rhs = def.param_index(next).is_some_and(|p| def.is_variadic_param(p));
                if variadic_rhs && out.last().is_some_and(|t| t.is(&TokenKind::Comma)) {
                    // GNU comma extension keeps both sides unpasted
                    out.extend(rhs);
                    placemarker = false;
                    i += 2;
                    continue;
                }
                let mut rhs = rhs.into_iter();
                let lhs = if placemarker { None } else { out.pop() };
                placemarker = false;
                match (lhs, rhs.next()) {
                    (Some(lhs), Some(first)) => {
                        let pasted = self.paste(&lhs, &first, begin, end);
                        out.extend(pasted);
                    }
                    (None, Some(first)) => out.push(first),
                    _ => {}
                }
                out.extend(rhs);
                i += 2;
                continue;
            }

            if let Some(p) = def.param_index(token) {
                let before_paste = body.get(i + 1).is_some_and(|n| n.is(&TokenKind::HashHash));
                let source = if before_paste {
                    args[p].clone()
                } else {
                    match &expanded_args[p] {
                        Some(done) => done.clone(),
                        None => {
                            let done = self.expand_isolated(args[p].clone());
                            expanded_args[p] = Some(done.clone());
                            done
                        }
                    }
                };
                let mut tokens = self.arg_tokens(&source, token, begin, end);
                if let Some(first) = tokens.first_mut() {
                    first.leading_space = token.leading_space;
                }
                placemarker = before_paste && tokens.is_empty();
                out.extend(tokens);
                i += 1;
                continue;
            }

            placemarker = false;
            out.push(self.body_token(token, begin, end));
            i += 1;
        }
        out
    }

    fn body_token(&mut self, token: &Token, begin: Loc, end: Loc) -> Token {
        let mut t = token.clone();
        t.loc = self.sm.create_expansion(token.loc, token.len, begin, end, false);
        t.at_line_start = false;
        t
    }

    /// Argument tokens relocated to a macro-argument expansion at the
    /// parameter's use site.
    fn arg_tokens(&mut self, arg: &[Token], param: &Token, begin: Loc, end: Loc) -> Vec<Token> {
        if arg.is_empty() {
            return Vec::new();
        }
        let param_use = self.sm.create_expansion(param.loc, param.len, begin, end, false);
        arg.iter()
            .map(|token| {
                let mut t = token.clone();
                t.loc = self
                    .sm
                    .create_expansion(token.loc, token.len, param_use, param_use, true);
                t.at_line_start = false;
                t
            })
            .collect()
    }

    fn stringify(&mut self, arg: &[Token], begin: Loc, end: Loc) -> Token {
        let mut text = String::from("\"");
        for (i, token) in arg.iter().enumerate() {
            if i > 0 && token.leading_space {
                text.push(' ');
            }
            let spelling = self.spelling(token);
            if matches!(token.kind, TokenKind::StringLiteral(_) | TokenKind::CharLiteral(_)) {
                for c in spelling.chars() {
                    if c == '"' || c == '\\' {
                        text.push('\\');
                    }
                    text.push(c);
                }
            } else {
                text.push_str(&spelling);
            }
        }
        text.push('"');
        let scratch = self.sm.write_scratch(&text);
        let mut token = Lexer::new(Arc::from(text.as_str()), scratch).next_token();
        token.loc = self.sm.create_expansion(scratch, token.len, begin, end, false);
        token.at_line_start = false;
        token
    }

    fn paste(&mut self, lhs: &Token, rhs: &Token, begin: Loc, end: Loc) -> Vec<Token> {
        let text = format!("{}{}", self.spelling(lhs), self.spelling(rhs));
        let scratch = self.sm.write_scratch(&text);
        let mut lexer = Lexer::new(Arc::from(text.as_str()), scratch);
        let mut token = lexer.next_token();
        let rest = lexer.next_token();
        let valid = lexer.take_errors().is_empty()
            && matches!(rest.kind, TokenKind::Eof)
            && token.len as usize == text.len();
        if !valid {
            self.diags.error(
                Category::Lexical,
                lhs.loc,
                format!("pasting formed '{}', an invalid preprocessing token", text),
            );
            return vec![lhs.clone(), rhs.clone()];
        }
        token.loc = self.sm.create_expansion(scratch, token.len, begin, end, false);
        token.leading_space = lhs.leading_space;
        token.at_line_start = false;
        vec![token]
    }

    /// Fully expand a token list on its own, without reading past its end.
    pub(super) fn expand_isolated(&mut self, tokens: Vec<Token>) -> Vec<Token> {
        let saved = std::mem::take(&mut self.pending);
        self.pending
            .extend(tokens.into_iter().map(Pending::Token));
        self.pending.push_back(Pending::ArgEnd);

        let mut out = Vec::new();
        loop {
            let token = self.next_token();
            if matches!(token.kind, TokenKind::Eof) && self.at_arg_end() {
                break;
            }
            out.push(token);
        }
        self.pending.pop_front();
        self.pending = saved;
        out
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::{preprocess_with, spellings};
    use crate::diagnostics::Severity;

    fn expand(source: &str) -> Vec<String> {
        spellings(&preprocess_with(&[("t.c", source)], false))
    }

    #[test]
    fn test_function_like_macro() {
        assert_eq!(
            expand("#define MAX(a, b) ((a) > (b) ? (a) : (b))\nMAX(1, x)\n"),
            vec!["(", "(", "1", ")", ">", "(", "x", ")", "?", "(", "1", ")", ":", "(", "x", ")", ")"]
        );
    }

    #[test]
    fn test_name_without_parens_is_not_invoked() {
        assert_eq!(expand("#define f(x) x\nint f;\n"), vec!["int", "f", ";"]);
    }

    #[test]
    fn test_recursive_macro_is_painted() {
        assert_eq!(expand("#define foo foo + 1\nfoo\n"), vec!["foo", "+", "1"]);
        assert_eq!(expand("#define a b\n#define b a\na\n"), vec!["a"]);
    }

    #[test]
    fn test_nested_argument_expansion() {
        assert_eq!(
            expand("#define ID(x) x\n#define TWO 2\nID(ID(TWO))\n"),
            vec!["2"]
        );
    }

    #[test]
    fn test_stringify_and_paste() {
        let run = preprocess_with(
            &[("t.c", "#define STR(x) #x\n#define CAT(a, b) a##b\nSTR(a \"q\") CAT(x, 1)\n")],
            false,
        );
        assert_eq!(spellings(&run), vec!["\"a \\\"q\\\"\"", "x1"]);
        assert!(matches!(&run.out.tokens[1].kind, crate::parser::lexer::TokenKind::Ident(s) if s == "x1"));
    }

    #[test]
    fn test_variadic_and_comma_swallow() {
        assert_eq!(
            expand("#define LOG(fmt, ...) f(fmt, ## __VA_ARGS__)\nLOG(1) LOG(2, 3)\n"),
            vec!["f", "(", "1", ")", "f", "(", "2", ",", "3", ")"]
        );
    }

    #[test]
    fn test_builtin_line_and_file() {
        assert_eq!(expand("\n__LINE__ __FILE__\n"), vec!["2", "\"t.c\""]);
    }

    #[test]
    fn test_macro_redefinition_warns() {
        let run = preprocess_with(&[("t.c", "#define A 1\n#define A 2\n#define B 1\n#define B 1\n")], false);
        let diags = run.diags.diagnostics();
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].severity, Severity::Warning);
        assert_eq!(diags[0].message, "'A' macro redefined");
        assert_eq!(diags[0].notes.len(), 1);
    }

    #[test]
    fn test_argument_count_errors() {
        let run = preprocess_with(&[("t.c", "#define F(a, b) a\nF(1)\n")], false);
        assert_eq!(
            run.diags.diagnostics()[0].message,
            "too few arguments provided to function-like macro invocation"
        );
    }

    #[test]
    fn test_macro_argument_locations() {
        let source = "#define ID(a) a\nint y = ID(z);\n";
        let run = preprocess_with(&[("t.c", source)], false);
        let z = run
            .out
            .tokens
            .iter()
            .find(|t| t.ident() == Some("z"))
            .unwrap();
        let sm = &run.sm;
        assert!(sm.is_macro_arg(z.loc));
        let (_, expansion) = sm.decompose(sm.expansion_loc(z.loc)).unwrap();
        let (_, spelling) = sm.decompose(sm.spelling_loc(z.loc)).unwrap();
        let (_, file) = sm.decompose(sm.file_loc(z.loc)).unwrap();
        assert_eq!(expansion, 24);
        assert_eq!(spelling, 27);
        assert_eq!(file, 27);
    }
}
