// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Crate-level error unification (§7): the builder's misuse errors
//! (`BuilderError`) plus every layer below it (`ParseError`,
//! `ValidationError`, `ExecError`) folded into one `ShellError` so callers
//! get a single `?`-propagatable type, while internals keep precise,
//! independently testable error enums.

use thiserror::Error;

use crate::duration::DurationParseError;
use crate::exec::ExecError;
use crate::io::DecodeError;
use crate::parse_error::ParseError;
use crate::validation::ValidationError;

/// Misuse of the [`crate::CommandBuilder`] API — detected before (or
/// instead of) ever reaching the evaluator. Always surfaces regardless of
/// `noThrow` (§7).
#[derive(Debug, Error)]
pub enum BuilderError {
    /// `.command(..)` was never called, or was called with an empty/
    /// all-whitespace source.
    #[error("no command source set")]
    EmptySource,

    /// `.text()`/`.json()`/`.lines()` called but stdout wasn't captured
    /// (stdout mode must be `piped` or `inheritPiped`).
    #[error("stdout was not captured; call `.stdout(StdioMode::Piped)` (or use `.text()`/`.json()`/`.lines()`, which do this for you) before decoding")]
    StdoutNotCaptured,

    /// Decoding requested a stream (`stderr`/`combined`) that wasn't
    /// captured.
    #[error("{stream} was not captured; set its stdio mode to `piped` or `inheritPiped` first")]
    StreamNotCaptured { stream: &'static str },

    /// An invalid `timeout()`/duration-bearing option.
    #[error("invalid duration: {0}")]
    InvalidDuration(#[from] DurationParseError),
}

/// Unified error surface for [`crate::CommandBuilder::spawn`] and friends.
///
/// `ParseError`/`ValidationError`/`BuilderError` always surface as `Err`;
/// a non-zero exit code surfaces as `Err(ShellError::NonZeroExit { .. })`
/// only when the builder's `noThrow` policy doesn't cover that code (§7).
#[derive(Debug, Error)]
pub enum ShellError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("{} validation error(s) in parsed command", .0.len())]
    Validation(Vec<ValidationError>),

    #[error(transparent)]
    Exec(#[from] ExecError),

    #[error(transparent)]
    Builder(#[from] BuilderError),

    #[error("failed to decode captured output: {0}")]
    Decode(#[from] DecodeError),

    /// The command ran to completion but exited non-zero and `noThrow`
    /// does not cover that code.
    #[error("command exited with non-zero status {code}")]
    NonZeroExit {
        code: i32,
        /// Set when the non-zero code came from the top-level
        /// timeout/cancellation path rather than the command itself.
        timed_out: bool,
        result: Box<crate::exec::CommandResult>,
    },
}

impl From<Vec<ValidationError>> for ShellError {
    fn from(errors: Vec<ValidationError>) -> Self {
        ShellError::Validation(errors)
    }
}

#[cfg(test)]
#[path = "shell_error_tests.rs"]
mod tests;
