//! Conditional compilation: the `#if` family and constant expressions.

use super::{token_name, GuardState, Preprocessor};
use crate::diagnostics::Category;
use crate::parser::lexer::{Token, TokenKind};
use crate::parser::parse::MAX_NESTING_DEPTH;
use crate::source::Loc;

/// One open `#if` group.
#[derive(Debug, Clone)]
pub(super) struct Conditional {
    pub loc: Loc,
    /// Some branch of the group has been entered.
    pub taken: bool,
    pub seen_else: bool,
}

impl Preprocessor<'_> {
    pub(super) fn handle_if(&mut self, directive: &str, hash: &Token) {
        let tokens = self.directive_tokens();
        let value = match directive {
            "ifdef" | "ifndef" => {
                let Some(name) = tokens.first().and_then(|t| token_name(&t.kind)) else {
                    self.diags.error(Category::Lexical, hash.loc, "macro name missing");
                    self.open_conditional(hash.loc, false);
                    return;
                };
                if let Some(extra) = tokens.get(1) {
                    self.diags.warning(
                        Category::Lexical,
                        extra.loc,
                        format!("extra tokens at end of #{} directive", directive),
                        "extra-tokens",
                    );
                }
                if directive == "ifndef" {
                    self.guard_opened(&name);
                }
                self.is_defined(&name) == (directive == "ifdef")
            }
            _ => self.evaluate(tokens, hash.loc),
        };
        self.open_conditional(hash.loc, value);
    }

    fn open_conditional(&mut self, loc: Loc, taken: bool) {
        if let Some(frame) = self.frames.last_mut() {
            frame.conditionals.push(Conditional {
                loc,
                taken,
                seen_else: false,
            });
        }
        if !taken {
            self.skip_block();
        }
    }

    /// An `#ifndef` as the first thing in a file may start an include guard.
    fn guard_opened(&mut self, name: &str) {
        let Some(frame) = self.frames.last_mut() else {
            return;
        };
        frame.guard = match std::mem::replace(&mut frame.guard, GuardState::Invalid) {
            GuardState::Start => GuardState::Candidate {
                name: name.to_string(),
                depth: frame.conditionals.len() + 1,
            },
            GuardState::Closed { .. } => GuardState::Invalid,
            other => other,
        };
    }

    /// An `#elif` or `#else` of the guarding group disqualifies it.
    fn guard_branched(&mut self) {
        if let Some(frame) = self.frames.last_mut() {
            if let GuardState::Candidate { depth, .. } = frame.guard {
                if depth == frame.conditionals.len() {
                    frame.guard = GuardState::Invalid;
                }
            }
        }
    }

    fn pop_conditional(&mut self) {
        let Some(frame) = self.frames.last_mut() else {
            return;
        };
        let depth = frame.conditionals.len();
        frame.conditionals.pop();
        if let GuardState::Candidate { name, depth: guard_depth } = &frame.guard {
            if *guard_depth == depth {
                frame.guard = GuardState::Closed { name: name.clone() };
            }
        }
    }

    pub(super) fn handle_elif(&mut self, hash: &Token) {
        self.directive_tokens();
        let Some(seen_else) = self.current_conditional().map(|c| c.seen_else) else {
            self.diags.error(Category::Lexical, hash.loc, "#elif without #if");
            return;
        };
        if seen_else {
            self.diags.error(Category::Lexical, hash.loc, "#elif after #else");
        }
        self.guard_branched();
        // a branch was already taken to get here
        self.skip_block();
    }

    pub(super) fn handle_else(&mut self, hash: &Token) {
        self.finish_directive("else");
        let Some(cond) = self.current_conditional() else {
            self.diags.error(Category::Lexical, hash.loc, "#else without #if");
            return;
        };
        let repeated = cond.seen_else;
        cond.seen_else = true;
        if repeated {
            self.diags.error(Category::Lexical, hash.loc, "#else after #else");
        }
        self.guard_branched();
        self.skip_block();
    }

    pub(super) fn handle_endif(&mut self, hash: &Token) {
        self.finish_directive("endif");
        if self.current_conditional().is_none() {
            self.diags.error(Category::Lexical, hash.loc, "#endif without #if");
            return;
        }
        self.pop_conditional();
    }

    fn current_conditional(&mut self) -> Option<&mut Conditional> {
        self.frames.last_mut()?.conditionals.last_mut()
    }

    /// Skip lines until a branch of the innermost group is entered or the
    /// group ends.
    fn skip_block(&mut self) {
        let mut depth = 0usize;
        loop {
            let Some(frame) = self.frames.last_mut() else {
                return;
            };
            frame.lexer.skipping = true;
            let token = frame.lexer.next_token();
            if matches!(token.kind, TokenKind::Eof) {
                frame.lexer.skipping = false;
                frame.lexer.unget(token);
                return;
            }
            if !(token.is(&TokenKind::Hash) && token.at_line_start) {
                continue;
            }
            let name_token = frame.lexer.next_token();
            if name_token.at_line_start || matches!(name_token.kind, TokenKind::Eof) {
                frame.lexer.unget(name_token);
                continue;
            }
            let Some(name) = token_name(&name_token.kind) else {
                continue;
            };
            match name.as_str() {
                "if" | "ifdef" | "ifndef" => depth += 1,
                "endif" if depth > 0 => depth -= 1,
                "endif" => {
                    frame.lexer.skipping = false;
                    self.finish_directive("endif");
                    self.pop_conditional();
                    return;
                }
                "else" if depth == 0 => {
                    frame.lexer.skipping = false;
                    self.finish_directive("else");
                    let Some(cond) = self.current_conditional() else {
                        return;
                    };
                    let repeated = cond.seen_else;
                    let enter = !cond.taken;
                    cond.seen_else = true;
                    cond.taken = true;
                    if repeated {
                        self.diags
                            .error(Category::Lexical, token.loc, "#else after #else");
                    }
                    self.guard_branched();
                    if enter {
                        return;
                    }
                }
                "elif" if depth == 0 => {
                    frame.lexer.skipping = false;
                    let tokens = self.directive_tokens();
                    let Some(cond) = self.current_conditional() else {
                        return;
                    };
                    let (taken, seen_else) = (cond.taken, cond.seen_else);
                    if seen_else {
                        self.diags
                            .error(Category::Lexical, token.loc, "#elif after #else");
                    }
                    self.guard_branched();
                    if !taken && self.evaluate(tokens, token.loc) {
                        if let Some(cond) = self.current_conditional() {
                            cond.taken = true;
                        }
                        return;
                    }
                }
                _ => {}
            }
        }
    }

    /// Evaluate a `#if` / `#elif` condition. Errors are reported and count as false.
    fn evaluate(&mut self, tokens: Vec<Token>, directive_loc: Loc) -> bool {
        let mut resolved = Vec::with_capacity(tokens.len());
        let mut i = 0;
        while i < tokens.len() {
            if tokens[i].ident() != Some("defined") {
                resolved.push(tokens[i].clone());
                i += 1;
                continue;
            }
            let parenthesized = tokens.get(i + 1).is_some_and(|t| t.is(&TokenKind::LParen));
            let name_index = if parenthesized { i + 2 } else { i + 1 };
            let name = tokens.get(name_index).and_then(|t| token_name(&t.kind));
            let closed = !parenthesized
                || tokens
                    .get(name_index + 1)
                    .is_some_and(|t| t.is(&TokenKind::RParen));
            let Some(name) = name.filter(|_| closed) else {
                self.diags
                    .error(Category::Lexical, tokens[i].loc, "macro name missing");
                return false;
            };
            let value = u64::from(self.is_defined(&name));
            resolved.push(Token::new(TokenKind::IntLiteral(value), tokens[i].loc, tokens[i].len));
            i = if parenthesized { name_index + 2 } else { name_index + 1 };
        }

        let expanded = self.expand_isolated(resolved);
        let mut eval = Evaluator {
            tokens: &expanded,
            pos: 0,
            end_loc: directive_loc,
            depth: 0,
        };
        match eval.run() {
            Ok(value) => value != 0,
            Err((loc, message)) => {
                self.diags.error(Category::Lexical, loc, message);
                false
            }
        }
    }
}

type EvalResult = Result<i64, (Loc, &'static str)>;

/// Precedence-climbing evaluator over fully expanded tokens.
struct Evaluator<'t> {
    tokens: &'t [Token],
    pos: usize,
    end_loc: Loc,
    depth: u32,
}

fn precedence(kind: &TokenKind) -> Option<u8> {
    use TokenKind::*;
    let prec = match kind {
        OrOr => 1,
        AndAnd => 2,
        Pipe => 3,
        Caret => 4,
        Amp => 5,
        EqEq | NotEq => 6,
        Lt | Le | Gt | Ge => 7,
        LtLt | GtGt => 8,
        Plus | Minus => 9,
        Star | Slash | Percent => 10,
        _ => return None,
    };
    Some(prec)
}

fn apply(op: &TokenKind, lhs: i64, rhs: i64) -> Option<i64> {
    use TokenKind::*;
    let value = match op {
        OrOr => i64::from(lhs != 0 || rhs != 0),
        AndAnd => i64::from(lhs != 0 && rhs != 0),
        Pipe => lhs | rhs,
        Caret => lhs ^ rhs,
        Amp => lhs & rhs,
        EqEq => i64::from(lhs == rhs),
        NotEq => i64::from(lhs != rhs),
        Lt => i64::from(lhs < rhs),
        Le => i64::from(lhs <= rhs),
        Gt => i64::from(lhs > rhs),
        Ge => i64::from(lhs >= rhs),
        LtLt => lhs.wrapping_shl(rhs as u32 & 63),
        GtGt => lhs.wrapping_shr(rhs as u32 & 63),
        Plus => lhs.wrapping_add(rhs),
        Minus => lhs.wrapping_sub(rhs),
        Star => lhs.wrapping_mul(rhs),
        Slash => lhs.checked_div(rhs)?,
        Percent => lhs.checked_rem(rhs)?,
        _ => return None,
    };
    Some(value)
}

impl Evaluator<'_> {
    fn run(&mut self) -> EvalResult {
        if self.tokens.is_empty() {
            return Err((self.end_loc, "#if with no expression"));
        }
        let value = self.ternary()?;
        match self.peek() {
            None => Ok(value),
            Some(token) => Err((
                token.loc,
                "token is not a valid binary operator in a preprocessor subexpression",
            )),
        }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.peek().is_some_and(|t| t.is(kind)) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn loc(&self) -> Loc {
        self.peek().map_or(self.end_loc, |t| t.loc)
    }

    /// Evaluate one nesting level deeper, up to [`MAX_NESTING_DEPTH`].
    fn nested(&mut self, eval: impl FnOnce(&mut Self) -> EvalResult) -> EvalResult {
        if self.depth >= MAX_NESTING_DEPTH {
            return Err((self.loc(), "preprocessor expression nested too deeply"));
        }
        self.depth += 1;
        let value = eval(self);
        self.depth -= 1;
        value
    }

    fn ternary(&mut self) -> EvalResult {
        let cond = self.binary(1)?;
        if !self.eat(&TokenKind::Question) {
            return Ok(cond);
        }
        let then = self.nested(Self::ternary)?;
        if !self.eat(&TokenKind::Colon) {
            return Err((self.loc(), "expected ':' in preprocessor expression"));
        }
        let otherwise = self.nested(Self::ternary)?;
        Ok(if cond != 0 { then } else { otherwise })
    }

    fn binary(&mut self, min: u8) -> EvalResult {
        let mut lhs = self.unary()?;
        while let Some(token) = self.peek() {
            let Some(prec) = precedence(&token.kind).filter(|p| *p >= min) else {
                break;
            };
            let op = token.kind.clone();
            let op_loc = token.loc;
            self.pos += 1;
            let rhs = self.binary(prec + 1)?;
            lhs = apply(&op, lhs, rhs)
                .ok_or((op_loc, "division by zero in preprocessor expression"))?;
        }
        Ok(lhs)
    }

    fn unary(&mut self) -> EvalResult {
        let Some(token) = self.peek() else {
            return Err((self.end_loc, "expected value in expression"));
        };
        let loc = token.loc;
        let kind = token.kind.clone();
        self.pos += 1;
        match kind {
            TokenKind::IntLiteral(n) => Ok(n as i64),
            TokenKind::CharLiteral(c) => Ok(c),
            TokenKind::FloatLiteral(_) => Err((loc, "floating point literal in preprocessor expression")),
            TokenKind::Minus => Ok(self.nested(Self::unary)?.wrapping_neg()),
            TokenKind::Plus => self.nested(Self::unary),
            TokenKind::Bang => Ok(i64::from(self.nested(Self::unary)? == 0)),
            TokenKind::Tilde => Ok(!self.nested(Self::unary)?),
            TokenKind::LParen => {
                let value = self.nested(Self::ternary)?;
                if !self.eat(&TokenKind::RParen) {
                    return Err((self.loc(), "expected ')' in preprocessor expression"));
                }
                Ok(value)
            }
            // identifiers left after expansion evaluate to zero
            k if token_name(&k).is_some() => Ok(0),
            _ => Err((loc, "invalid token at start of a preprocessor expression")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::{preprocess_with, spellings};

    fn expand(source: &str) -> Vec<String> {
        spellings(&preprocess_with(&[("t.c", source)], false))
    }

    #[test]
    fn test_if_elif_else_chain() {
        let source = "#define V 2\n#if V == 1\none\n#elif V == 2\ntwo\n#else\nother\n#endif\n";
        assert_eq!(expand(source), vec!["two"]);
        let source = "#if 0\na\n#elif 0\nb\n#else\nc\n#endif\n";
        assert_eq!(expand(source), vec!["c"]);
    }

    #[test]
    fn test_ifdef_and_defined() {
        let source = "#define A\n#ifdef A\na\n#endif\n#ifndef A\nb\n#endif\n#if defined(A) && !defined B\nc\n#endif\n";
        assert_eq!(expand(source), vec!["a", "c"]);
    }

    #[test]
    fn test_nested_groups_in_skipped_block() {
        let source = "#if 0\n#if 1\nx\n#else\ny\n#endif\n#error not reached\n#endif\nz\n";
        let run = preprocess_with(&[("t.c", source)], false);
        assert_eq!(spellings(&run), vec!["z"]);
        assert!(run.diags.diagnostics().is_empty());
    }

    #[test]
    fn test_expression_arithmetic() {
        let source = "#if (1 << 4) + 3 * 2 - 22 == 0 && 7 % 4 == 3 && (2 > 1 ? 'a' : 0) == 97\nyes\n#endif\n";
        assert_eq!(expand(source), vec!["yes"]);
        assert_eq!(expand("#if -1 < 0 && ~0 == -1\nneg\n#endif\n"), vec!["neg"]);
    }

    #[test]
    fn test_deep_expression_is_rejected() {
        let source = format!("#if {}1{}\nyes\n#else\nno\n#endif\n", "(".repeat(5_000), ")".repeat(5_000));
        let run = preprocess_with(&[("t.c", source.as_str())], false);
        assert_eq!(spellings(&run), vec!["no"]);
        let messages: Vec<_> = run.diags.diagnostics().iter().map(|d| d.message.as_str()).collect();
        assert_eq!(messages, vec!["preprocessor expression nested too deeply"]);

        let shallow = format!("#if {}1{}\nyes\n#endif\n", "(".repeat(100), ")".repeat(100));
        assert_eq!(expand(&shallow), vec!["yes"]);
    }

    #[test]
    fn test_unknown_identifier_is_zero() {
        assert_eq!(expand("#if UNDEFINED_THING\nx\n#else\ny\n#endif\n"), vec!["y"]);
    }

    #[test]
    fn test_conditional_errors() {
        let run = preprocess_with(&[("t.c", "#endif\n#if 1 / 0\n#endif\n#if 1\n")], false);
        let messages: Vec<_> = run
            .diags
            .diagnostics()
            .iter()
            .map(|d| d.message.as_str())
            .collect();
        assert_eq!(
            messages,
            vec![
                "#endif without #if",
                "division by zero in preprocessor expression",
                "unterminated conditional directive",
            ]
        );
    }
}
