// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! A cross-platform shell-command orchestration library.
//!
//! The mini-language is parsed and interpreted by this crate itself rather
//! than delegated to a native shell, so the same script behaves identically
//! on POSIX and Windows hosts. The public surface is the immutable
//! [`CommandBuilder`]; everything else (the lexer, parser, evaluator, and
//! I/O plumbing) exists to support it.
//!
//! ```ignore
//! use shellcraft::CommandBuilder;
//!
//! let result = CommandBuilder::command("echo hello").text().await?;
//! assert_eq!(result, "hello");
//! ```

mod ast;
mod builder;
mod duration;
mod error;
mod exec;
mod io;
mod lexer;
mod parse_error;
mod parser;
mod paths;
mod scoped;
mod shell_error;
mod span;
mod token;
mod validation;
mod validator;

pub use ast::{
    AndOrList, AstVisitor, Command, CommandList, EnvAssignment, ListItem, LogicalOp, Pipeline,
    QuoteStyle, Redirection, SimpleCommand, SubstitutionBody, Word, WordPart,
};
pub use builder::{CommandBuilder, CommandConfig, StdioMode};
pub use duration::{format_duration_ms, parse_duration, parse_duration_ms, DurationParseError, DurationSource, DurationSpec};
pub use error::LexerError;
pub use exec::builtins::{BuiltinControl, BuiltinOutcome, CustomCommand, CustomCommandFuture};
pub use exec::error::{spawn_error_exit_code, ExecError, EXIT_NOT_EXECUTABLE, EXIT_NOT_FOUND, EXIT_TIMED_OUT, EXIT_USAGE_ERROR};
pub use exec::result::{CommandTrace, ExecOutput};
pub use exec::{CommandResult, ExecutionContext};
pub use io::{decode_json, decode_lines, decode_text, CapturedBytes, DecodeError, InputEndpoint};
pub use parse_error::{ParseError, ParseResult};
pub use parser::Parser;
pub use paths::resolve_path;
pub use scoped::ScopedTreeValue;
pub use shell_error::{BuilderError, ShellError};
pub use span::{context_snippet, diagnostic_context, Span};
pub use token::{DupTarget, Token, TokenKind};
pub use validation::ValidationError;
pub use validator::{validate, validate_with_config, ValidatorConfig};

/// Build a [`CommandBuilder`] from a format string, quoting each
/// interpolated argument individually before it's substituted in.
///
/// Stands in for a tagged-template surface (Rust has no native equivalent
/// for per-placeholder hooks into `format!`): every `{}` argument is run
/// through [`quote_token`] first, so interpolated values can never break out
/// of their token even if they contain whitespace or shell metacharacters.
/// The format string itself is never quoted — only the arguments after it.
///
/// ```ignore
/// let path = "a file.txt";
/// let b = cmd!("cat {}", path); // => CommandBuilder::command("cat 'a file.txt'")
/// ```
///
/// An array-valued argument should be pre-joined with [`quote_tokens`]
/// before interpolation, since `format!` has no notion of a multi-token
/// argument.
///
/// Use [`raw_cmd`] instead when the interpolated text is already a
/// trusted shell fragment (e.g. composing two builder outputs) and
/// quoting it would be wrong.
#[macro_export]
macro_rules! cmd {
    ($fmt:literal $(, $arg:expr)* $(,)?) => {
        $crate::CommandBuilder::command(format!($fmt $(, $crate::quote_token(&($arg).to_string()))*))
    };
}

/// Build a [`CommandBuilder`] from a format string without quoting any
/// interpolated argument. The counterpart to [`cmd`] for callers who are
/// assembling source text that should be interpreted as shell syntax (e.g.
/// splicing in an already-quoted sub-expression) rather than as a single
/// opaque token.
#[macro_export]
macro_rules! raw_cmd {
    ($($arg:tt)*) => {
        $crate::CommandBuilder::command(format!($($arg)*))
    };
}

/// Quote a single token per the raw-argument quoting rule (§4.6): emit
/// unquoted if it contains only safe characters, otherwise single-quote
/// with embedded single quotes escaped as `'\''`.
pub fn quote_token(value: &str) -> String {
    let is_safe = !value.is_empty()
        && value
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'_' | b'.' | b'/' | b':' | b'=' | b'+' | b'@' | b'%' | b'^' | b'-'));
    if is_safe {
        value.to_string()
    } else {
        format!("'{}'", value.replace('\'', "'\\''"))
    }
}

/// Quote and space-join a sequence of tokens, for interpolating an
/// array-valued argument into a [`cmd!`] format string as one placeholder.
pub fn quote_tokens<I, S>(values: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    values.into_iter().map(|v| quote_token(v.as_ref())).collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
