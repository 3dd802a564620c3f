// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Evaluator error types.
//!
//! Most evaluator faults (a command not found, a redirect target that can't
//! be opened, a built-in usage error) are *not* represented as `Err` here —
//! per the propagation policy, they become a non-zero exit code plus a
//! stderr message, and flow through the builder's `no_throw` gate like any
//! other failing command. `ExecError` covers the smaller set of faults that
//! abort evaluation outright: a relay task panicking, or parsing/validation
//! failing before evaluation ever starts.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExecError {
    /// A background relay/copier task panicked rather than completing or
    /// being cancelled cleanly.
    #[error("internal I/O task failed: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),

    /// Parsing failed before evaluation could start.
    #[error(transparent)]
    Parse(#[from] crate::ParseError),

    /// The AST failed post-parse validation (see `crate::validator`).
    #[error("{} validation error(s) in parsed command", .0.len())]
    Validation(Vec<crate::ValidationError>),

    /// A command-substitution body was never parsed. The parser always
    /// produces `SubstitutionBody::Parsed`; this only fires for ASTs
    /// assembled by hand without going through it.
    #[error("command substitution body was not parsed: {0:?}")]
    UnparsedSubstitution(String),
}

/// Exit code used for a command whose executable could not be located on
/// `PATH` — matches POSIX convention.
pub const EXIT_NOT_FOUND: i32 = 127;

/// Exit code used for a command that was found but could not be executed
/// (e.g. permission denied) — matches POSIX convention.
pub const EXIT_NOT_EXECUTABLE: i32 = 126;

/// Exit code surfaced when the top-level cancellation token fires before
/// evaluation completes.
pub const EXIT_TIMED_OUT: i32 = 124;

/// Exit code for evaluator usage errors (built-in misuse, bad redirect
/// target) that aren't a spawn failure.
pub const EXIT_USAGE_ERROR: i32 = 2;

/// Map a failed `spawn()` to the POSIX-ish exit code convention.
pub fn spawn_error_exit_code(err: &std::io::Error) -> i32 {
    match err.kind() {
        std::io::ErrorKind::NotFound => EXIT_NOT_FOUND,
        std::io::ErrorKind::PermissionDenied => EXIT_NOT_EXECUTABLE,
        _ => EXIT_NOT_EXECUTABLE,
    }
}
