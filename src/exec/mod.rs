// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The shell evaluator (C5): interprets a parsed [`crate::ast::CommandList`]
//! against an [`ExecutionContext`], dispatching to built-ins (C3), custom
//! commands, and external processes wired through C4's stdio endpoints.

pub(crate) mod builtins;
pub(crate) mod error;
mod expand;
mod redirect;
pub(crate) mod result;
mod run;
mod termination;

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

pub use builtins::{BuiltinControl, BuiltinOutcome, CustomCommand, CustomCommandFuture};
pub use error::ExecError;
pub use result::{CommandTrace, ExecOutput};

use crate::io::{CapturedBytes, InputEndpoint};

/// How a stage not otherwise fed by a pipeline or a `<` redirect gets its
/// stdin. Resolved once at the top of evaluation from the builder's
/// [`InputEndpoint`], then reused (cloned) by every command that doesn't
/// override it — matching a script's ability to have more than one command
/// read from the configured input.
#[derive(Clone)]
pub(crate) enum RootStdin {
    Inherit,
    Null,
    Bytes(Arc<Vec<u8>>),
}

/// Where a stage's stdout/stderr goes when nothing downstream (a pipe, a
/// redirect) claims it.
#[derive(Clone)]
pub(crate) enum RootSink {
    /// Forward to the real process stdio stream; nothing retained.
    Inherit,
    Null,
    /// Retained in the published `CapturedBytes`; nothing forwarded.
    Capture,
    /// Both: forwarded to the real process stdio stream AND retained.
    InheritPiped,
}

impl RootSink {
    fn forwards(&self) -> bool {
        matches!(self, RootSink::Inherit | RootSink::InheritPiped)
    }

    fn captures(&self) -> bool {
        matches!(self, RootSink::Capture | RootSink::InheritPiped)
    }
}

/// Threaded through recursive evaluation. Cloned wholesale into a subshell
/// so the subshell's mutations (cwd, variables, env) never escape back to
/// the parent.
#[derive(Clone)]
pub struct ExecutionContext {
    pub(crate) cwd: PathBuf,
    /// Exported environment, visible to every spawned child.
    pub(crate) env: HashMap<String, String>,
    /// Shell-local variables (`$?`-style expansion only, never exported).
    pub(crate) variables: HashMap<String, String>,
    pub(crate) custom_commands: Arc<HashMap<String, Arc<dyn CustomCommand>>>,
    pub(crate) cancellation: CancellationToken,
    pub(crate) snippet_limit: usize,
    pub(crate) last_exit_code: i32,
    pub(crate) root_stdin: RootStdin,
    pub(crate) root_stdout: RootSink,
    pub(crate) root_stderr: RootSink,
    /// Scratch buffers a built-in's `write_stdout`/`write_stderr` append
    /// into; swapped out by the dispatcher around each built-in call.
    pub(crate) pending_stdout: Vec<u8>,
    pub(crate) pending_stderr: Vec<u8>,
}

impl ExecutionContext {
    /// Append to this command's pending stdout. Used by built-ins and, via
    /// the public [`CustomCommand`] trait, by host-registered commands.
    pub async fn write_stdout(&mut self, bytes: &[u8]) {
        self.pending_stdout.extend_from_slice(bytes);
    }

    /// Append to this command's pending stderr.
    pub async fn write_stderr(&mut self, bytes: &[u8]) {
        self.pending_stderr.extend_from_slice(bytes);
    }

    /// Current working directory for the execution in progress.
    pub fn cwd(&self) -> &std::path::Path {
        &self.cwd
    }

    /// Exported environment visible to spawned children.
    pub fn env(&self) -> &HashMap<String, String> {
        &self.env
    }

    /// Shell-local variables (never exported to children).
    pub fn variables(&self) -> &HashMap<String, String> {
        &self.variables
    }

    /// Exit code of the most recently completed command (`$?`).
    pub fn last_exit_code(&self) -> i32 {
        self.last_exit_code
    }

    #[cfg(test)]
    pub(crate) fn for_test() -> Self {
        Self::for_test_in(std::env::temp_dir().as_path())
    }

    #[cfg(test)]
    pub(crate) fn for_test_in(cwd: &std::path::Path) -> Self {
        Self {
            cwd: cwd.to_path_buf(),
            env: HashMap::new(),
            variables: HashMap::new(),
            custom_commands: Arc::new(HashMap::new()),
            cancellation: CancellationToken::new(),
            snippet_limit: 4096,
            last_exit_code: 0,
            root_stdin: RootStdin::Null,
            root_stdout: RootSink::Capture,
            root_stderr: RootSink::Capture,
            pending_stdout: Vec::new(),
            pending_stderr: Vec::new(),
        }
    }
}

/// Fully-resolved configuration the evaluator needs to start a top-level
/// execution; assembled by [`crate::builder::CommandBuilder`] from its
/// immutable [`crate::builder::CommandConfig`].
pub struct EvalRequest {
    pub cwd: PathBuf,
    pub env: HashMap<String, String>,
    pub custom_commands: Arc<HashMap<String, Arc<dyn CustomCommand>>>,
    /// Shell-local variables seeded before evaluation starts, visible to
    /// `$NAME`/`${NAME}` expansion but never exported to spawned children.
    pub variables: HashMap<String, String>,
    pub stdin: InputEndpoint,
    pub stdout_captures: bool,
    pub stderr_captures: bool,
    pub stdout_inherits: bool,
    pub stderr_inherits: bool,
    pub cancellation: CancellationToken,
    pub snippet_limit: usize,
}

/// Result of a top-level evaluation, ready to be folded into a
/// `CommandResult`.
#[derive(Debug)]
pub struct CommandResult {
    pub exit_code: i32,
    pub timed_out: bool,
    pub captured: CapturedBytes,
    pub traces: Vec<CommandTrace>,
    pub final_cwd: PathBuf,
    pub final_env: HashMap<String, String>,
}

/// Evaluate a parsed command list to completion.
pub(crate) async fn evaluate(
    list: &crate::ast::CommandList,
    request: EvalRequest,
) -> Result<CommandResult, ExecError> {
    let root_stdin = match request.stdin {
        InputEndpoint::Inherit => RootStdin::Inherit,
        InputEndpoint::Null => RootStdin::Null,
        InputEndpoint::Bytes(bytes) => RootStdin::Bytes(Arc::new(bytes)),
        InputEndpoint::Reader(mut reader) => {
            use tokio::io::AsyncReadExt;
            let mut buf = Vec::new();
            let _ = reader.read_to_end(&mut buf).await;
            RootStdin::Bytes(Arc::new(buf))
        }
    };

    let sink = |captures: bool, inherits: bool| match (captures, inherits) {
        (true, true) => RootSink::InheritPiped,
        (true, false) => RootSink::Capture,
        (false, true) => RootSink::Inherit,
        (false, false) => RootSink::Null,
    };

    let mut ctx = ExecutionContext {
        cwd: request.cwd,
        env: request.env,
        variables: request.variables,
        custom_commands: request.custom_commands,
        cancellation: request.cancellation,
        snippet_limit: request.snippet_limit,
        last_exit_code: 0,
        root_stdin,
        root_stdout: sink(request.stdout_captures, request.stdout_inherits),
        root_stderr: sink(request.stderr_captures, request.stderr_inherits),
        pending_stdout: Vec::new(),
        pending_stderr: Vec::new(),
    };

    let outcome = run::execute_command_list(&mut ctx, list).await;

    let (exit_code, timed_out, traces, captured) = match outcome {
        Ok(output) => (output.exit_code, output.timed_out, output.traces, output.captured),
        Err(e) => return Err(e),
    };

    Ok(CommandResult {
        exit_code,
        timed_out,
        captured,
        traces,
        final_cwd: ctx.cwd,
        final_env: ctx.env,
    })
}
