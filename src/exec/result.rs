// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Structured execution output and per-command trace records.

use crate::io::CapturedBytes;
use crate::Span;
use std::time::Duration;

/// Outcome of evaluating a top-level `CommandList`.
#[derive(Debug)]
pub struct ExecOutput {
    /// Exit code of the last command that ran.
    pub exit_code: i32,
    /// Set when the top-level timeout/cancellation fired before normal
    /// completion; `exit_code` is [`crate::exec::error::EXIT_TIMED_OUT`] in
    /// that case.
    pub timed_out: bool,
    /// Per-command execution traces in the order commands were dispatched.
    pub traces: Vec<CommandTrace>,
    /// Bytes that reached the root stdout/stderr sink (i.e. were not
    /// claimed by a pipe or a redirect further down the tree).
    pub captured: CapturedBytes,
}

/// Diagnostic record of a single dispatched command (built-in, custom, or
/// external) — one per `SimpleCommand`/pipeline stage evaluated.
#[derive(Debug, Clone)]
pub struct CommandTrace {
    /// The command name (argv\[0\]).
    pub command: String,
    /// Full arguments (argv\[1..\]).
    pub args: Vec<String>,
    /// Exit code returned by the command.
    pub exit_code: i32,
    /// Wall-clock duration.
    pub duration: Duration,
    /// Truncated stdout snippet, present only when this stage's stdout was
    /// captured (bounded by the builder's `snippet_limit`).
    pub stdout_snippet: Option<String>,
    /// Truncated stderr snippet, present only when this stage's stderr was
    /// captured.
    pub stderr_snippet: Option<String>,
    /// Source span of the AST node that produced this command.
    pub span: Span,
}

/// Truncate a byte buffer to a UTF-8-safe snippet of at most `limit` bytes.
pub(crate) fn truncate_snippet(bytes: &[u8], limit: usize) -> Option<String> {
    if bytes.is_empty() {
        return None;
    }
    let s = String::from_utf8_lossy(bytes);
    if s.len() <= limit {
        Some(s.into_owned())
    } else {
        let mut end = limit.min(s.len());
        while end > 0 && !s.is_char_boundary(end) {
            end -= 1;
        }
        Some(s[..end].to_string())
    }
}
