// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Core AST-walking execution logic.
//!
//! Every node resolves to `(exit_code, control)` where `control` tells the
//! caller whether to keep evaluating the enclosing list or to unwind all
//! the way out (the `exit` built-in). A pipeline's stages each run against
//! their own cloned context (POSIX: "each pipeline element runs as if in a
//! subshell"), so `control` never escapes a pipeline — only its exit code
//! does, and a `cd`/variable assignment inside one stage is invisible to
//! its siblings.
//!
//! A maximal run of adjacent external-command stages with no redirects that
//! would sever the pipe (no `>`, `<`, or `2>&1`) is spawned all at once with
//! `Stdio::piped()` and wired together by spawned copier tasks
//! (`run_external_group`), so those children genuinely run concurrently and
//! an early-exiting consumer (`cmd | head -1`) terminates its producer
//! instead of waiting on it. Anything else in a pipeline — a built-in, a
//! custom command, a subshell, an assignment, a stage whose own redirects
//! claim a stream, or an external stage adjacent to one of those — still
//! runs to completion and hands its buffered stdout to the next stage, since
//! there's no live descriptor on one side of that boundary to stream through
//! anyway. See DESIGN.md.

use std::future::Future;
use std::pin::Pin;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Instant;

use tokio::io::{AsyncReadExt, AsyncWriteExt};

use crate::ast::{AndOrList, Command, CommandList, EnvAssignment, LogicalOp, SimpleCommand, Subshell};
use crate::io::CapturedBytes;
use crate::token::Span;

use super::builtins::{self, BuiltinControl};
use super::error::{self, ExecError};
use super::redirect::{self, ResolvedRedirects};
use super::result::{truncate_snippet, CommandTrace, ExecOutput};
use super::termination;
use super::{expand, ExecutionContext, RootSink, RootStdin};

/// How a stage (a pipeline stage or a plain simple command) gets its stdin.
#[derive(Clone)]
pub(crate) enum StdinSource {
    Inherit,
    Null,
    Bytes(Arc<Vec<u8>>),
}

impl From<RootStdin> for StdinSource {
    fn from(r: RootStdin) -> Self {
        match r {
            RootStdin::Inherit => StdinSource::Inherit,
            RootStdin::Null => StdinSource::Null,
            RootStdin::Bytes(b) => StdinSource::Bytes(b),
        }
    }
}

impl StdinSource {
    fn to_stdio(&self) -> Stdio {
        match self {
            StdinSource::Inherit => Stdio::inherit(),
            StdinSource::Null => Stdio::null(),
            StdinSource::Bytes(_) => Stdio::piped(),
        }
    }
}

/// Outcome of running one AST node, whatever kind it is.
struct StageRun {
    exit_code: i32,
    stdout: Vec<u8>,
    stderr: Vec<u8>,
    control: BuiltinControl,
    traces: Vec<CommandTrace>,
}

// ---------------------------------------------------------------------------
// Top-level command list
// ---------------------------------------------------------------------------

/// Execute a full command list. Boxed since command substitution re-enters
/// this function from inside word expansion.
pub(crate) fn execute_command_list<'a>(
    ctx: &'a mut ExecutionContext,
    list: &'a CommandList,
) -> Pin<Box<dyn Future<Output = Result<ExecOutput, ExecError>> + Send + 'a>> {
    Box::pin(async move {
        let mut traces = Vec::new();
        let mut last_exit = 0;
        let mut background: Vec<tokio::task::JoinHandle<()>> = Vec::new();

        for item in &list.items {
            if ctx.cancellation.is_cancelled() {
                last_exit = error::EXIT_TIMED_OUT;
                break;
            }

            if item.background {
                let mut bg_ctx = ctx.clone();
                let node = item.node.clone();
                background.push(tokio::spawn(async move {
                    let _ = execute_and_or(&mut bg_ctx, &node).await;
                }));
                continue;
            }

            let (exit_code, control, mut item_traces) = execute_and_or(ctx, &item.node).await?;
            traces.append(&mut item_traces);
            last_exit = exit_code;
            ctx.last_exit_code = exit_code;

            if control == BuiltinControl::Exit {
                break;
            }
        }

        for handle in background {
            let _ = handle.await;
        }

        let captured = drain_root_capture(ctx).await;

        Ok(ExecOutput {
            exit_code: last_exit,
            timed_out: ctx.cancellation.is_cancelled(),
            traces,
            captured,
        })
    })
}

/// Run a command list purely to capture its combined stdout (command
/// substitution). Uses an unbounded snippet limit so nothing is truncated,
/// and its own root-sink scratch space so it doesn't disturb the enclosing
/// execution's captured output.
pub(crate) async fn execute_command_list_capture(ctx: &mut ExecutionContext, list: &CommandList) -> Result<String, ExecError> {
    let saved_limit = ctx.snippet_limit;
    let saved_stdout_sink = std::mem::replace(&mut ctx.root_stdout, RootSink::Capture);
    let saved_stderr_sink = std::mem::replace(&mut ctx.root_stderr, RootSink::Null);
    ctx.snippet_limit = usize::MAX;

    let result = execute_command_list(ctx, list).await;

    ctx.snippet_limit = saved_limit;
    ctx.root_stdout = saved_stdout_sink;
    ctx.root_stderr = saved_stderr_sink;

    let output = result?;
    Ok(String::from_utf8_lossy(&output.captured.stdout.unwrap_or_default()).into_owned())
}

/// Drain the context's output scratch buffers into a `CapturedBytes` per the
/// root sink's mode: `Inherit`/`InheritPiped` write the bytes to the real
/// process stdout/stderr, `Capture`/`InheritPiped` retain them in the
/// returned `CapturedBytes`, `Null` discards them outright.
///
/// `combined` is filled whenever either stream was captured, by
/// concatenating stdout then stderr. Because stages are fully buffered
/// rather than interleaved through a live merged descriptor (see the module
/// doc comment), this is list-order concatenation, not true chronological
/// interleaving of the two streams.
async fn drain_root_capture(ctx: &mut ExecutionContext) -> CapturedBytes {
    let stdout = std::mem::take(&mut ctx.pending_stdout);
    let stderr = std::mem::take(&mut ctx.pending_stderr);

    if ctx.root_stdout.forwards() && !stdout.is_empty() {
        let _ = tokio::io::stdout().write_all(&stdout).await;
    }
    if ctx.root_stderr.forwards() && !stderr.is_empty() {
        let _ = tokio::io::stderr().write_all(&stderr).await;
    }

    let mut captured = CapturedBytes::default();
    let stdout_captured = ctx.root_stdout.captures();
    let stderr_captured = ctx.root_stderr.captures();

    if stdout_captured || stderr_captured {
        let mut combined = Vec::with_capacity(stdout.len() + stderr.len());
        combined.extend_from_slice(&stdout);
        combined.extend_from_slice(&stderr);
        captured.combined = Some(combined);
    }
    if stdout_captured {
        captured.stdout = Some(stdout);
    }
    if stderr_captured {
        captured.stderr = Some(stderr);
    }
    captured
}

// ---------------------------------------------------------------------------
// AND / OR chains
// ---------------------------------------------------------------------------

async fn execute_and_or(ctx: &mut ExecutionContext, and_or: &AndOrList) -> Result<(i32, BuiltinControl, Vec<CommandTrace>), ExecError> {
    let mut traces = Vec::new();
    let root_stdin = StdinSource::from(ctx.root_stdin.clone());

    let first = execute_command(ctx, &and_or.first, root_stdin.clone()).await?;
    let mut control = if first.control == BuiltinControl::Exit { BuiltinControl::Exit } else { BuiltinControl::Continue };
    let mut last_exit = publish_stage(ctx, first, &mut traces);

    for (op, next) in &and_or.rest {
        if ctx.cancellation.is_cancelled() || control == BuiltinControl::Exit {
            break;
        }
        let should_run = match op {
            LogicalOp::And => last_exit == 0,
            LogicalOp::Or => last_exit != 0,
        };
        if !should_run {
            continue;
        }
        let run = execute_command(ctx, next, root_stdin.clone()).await?;
        if run.control == BuiltinControl::Exit {
            control = BuiltinControl::Exit;
        }
        last_exit = publish_stage(ctx, run, &mut traces);
    }

    Ok((last_exit, control, traces))
}

/// Append a stage's captured bytes to the context's pending output and fold
/// its traces into the running list, returning its exit code.
fn publish_stage(ctx: &mut ExecutionContext, run: StageRun, traces: &mut Vec<CommandTrace>) -> i32 {
    ctx.pending_stdout.extend_from_slice(&run.stdout);
    ctx.pending_stderr.extend_from_slice(&run.stderr);
    traces.extend(run.traces);
    run.exit_code
}

// ---------------------------------------------------------------------------
// Command dispatch: Simple / Subshell / Pipeline
// ---------------------------------------------------------------------------

fn execute_command<'a>(
    ctx: &'a mut ExecutionContext,
    command: &'a Command,
    stdin: StdinSource,
) -> Pin<Box<dyn Future<Output = Result<StageRun, ExecError>> + Send + 'a>> {
    Box::pin(async move {
        match command {
            Command::Simple(cmd) => execute_simple(ctx, cmd, stdin).await,
            Command::Subshell(sub) => execute_subshell(ctx, sub, stdin).await,
            Command::Pipeline(_) => {
                let (stages, connectors) = flatten_pipeline(command);
                execute_pipeline(ctx, &stages, &connectors, stdin).await
            }
        }
    })
}

/// Flatten a left-deep `Pipeline` chain into stages plus the `|&` flag for
/// each connector between adjacent stages (`connectors.len() ==
/// stages.len() - 1`). The grammar guarantees every stage is `Simple` or
/// `Subshell`, never a nested `Pipeline`.
fn flatten_pipeline(command: &Command) -> (Vec<&Command>, Vec<bool>) {
    match command {
        Command::Pipeline(p) => {
            let (mut stages, mut connectors) = flatten_pipeline(&p.left);
            stages.push(p.right.as_ref());
            connectors.push(p.stderr_too);
            (stages, connectors)
        }
        other => (vec![other], Vec::new()),
    }
}

// ---------------------------------------------------------------------------
// Simple command
// ---------------------------------------------------------------------------

async fn expand_simple(ctx: &mut ExecutionContext, cmd: &SimpleCommand) -> Result<(String, Vec<String>, Vec<(String, String)>), ExecError> {
    let name = expand::expand_word(ctx, &cmd.name).await?;
    let mut args = Vec::with_capacity(cmd.args.len());
    for a in &cmd.args {
        args.push(expand::expand_word(ctx, a).await?);
    }
    let mut env_overrides = Vec::with_capacity(cmd.env.len());
    for ea in &cmd.env {
        env_overrides.push((ea.name.clone(), expand_env_value(ctx, ea).await?));
    }
    Ok((name, args, env_overrides))
}

async fn expand_env_value(ctx: &mut ExecutionContext, ea: &EnvAssignment) -> Result<String, ExecError> {
    expand::expand_word(ctx, &ea.value).await
}

fn make_trace(command: String, args: Vec<String>, exit_code: i32, start: Instant, limit: usize, stdout: &[u8], stderr: &[u8], span: Span) -> CommandTrace {
    CommandTrace {
        command,
        args,
        exit_code,
        duration: start.elapsed(),
        stdout_snippet: truncate_snippet(stdout, limit),
        stderr_snippet: truncate_snippet(stderr, limit),
        span,
    }
}

async fn execute_simple(ctx: &mut ExecutionContext, cmd: &SimpleCommand, stdin: StdinSource) -> Result<StageRun, ExecError> {
    let start = Instant::now();
    let (name, args, env_overrides) = expand_simple(ctx, cmd).await?;

    if name.is_empty() {
        for (k, v) in env_overrides {
            ctx.variables.insert(k, v);
        }
        return Ok(StageRun {
            exit_code: 0,
            stdout: Vec::new(),
            stderr: Vec::new(),
            control: BuiltinControl::Continue,
            traces: Vec::new(),
        });
    }

    match redirect::apply_redirections(ctx, &cmd.redirections).await {
        Ok(resolved) => dispatch_and_finish(ctx, name, args, env_overrides, resolved, stdin, cmd.span, start).await,
        Err(fault) => Ok(redirect_fault_stage_run(&name, args, &fault.message, ctx.snippet_limit, start, cmd.span)),
    }
}

fn redirect_fault_stage_run(name: &str, args: Vec<String>, message: &str, snippet_limit: usize, start: Instant, span: Span) -> StageRun {
    let message = format!("{name}: {message}\n").into_bytes();
    let trace = make_trace(name.to_string(), args, redirect::EXIT_REDIRECT_ERROR, start, snippet_limit, &[], &message, span);
    StageRun {
        exit_code: redirect::EXIT_REDIRECT_ERROR,
        stdout: Vec::new(),
        stderr: message,
        control: BuiltinControl::Continue,
        traces: vec![trace],
    }
}

/// Dispatch an already-expanded, already-redirect-resolved stage (custom,
/// built-in, or external) and fold its output through the resolved
/// redirects. Shared by the non-pipeline simple-command path and by every
/// pipeline stage that isn't part of a live concurrent group.
async fn dispatch_and_finish(
    ctx: &mut ExecutionContext,
    name: String,
    args: Vec<String>,
    env_overrides: Vec<(String, String)>,
    mut resolved: ResolvedRedirects,
    stdin: StdinSource,
    span: Span,
    start: Instant,
) -> Result<StageRun, ExecError> {
    let stage_stdin = match resolved.stdin_override.take() {
        Some(bytes) => StdinSource::Bytes(Arc::new(bytes)),
        None => stdin,
    };

    let (exit_code, stdout, stderr, control) = if let Some(handler) = ctx.custom_commands.get(&name).cloned() {
        run_custom(ctx, handler.as_ref(), &args).await
    } else if builtins::is_builtin_name(&name) {
        run_named_builtin(ctx, &name, &args).await
    } else {
        match spawn_external(ctx, &name, &args, &env_overrides, &stage_stdin).await {
            Ok(spawned) => finish_external(ctx, spawned).await,
            Err(e) => {
                let code = error::spawn_error_exit_code(&e);
                (code, Vec::new(), format!("{name}: {e}\n").into_bytes(), BuiltinControl::Continue)
            }
        }
    };

    let (stdout, stderr) = route_redirects(resolved, stdout, stderr).await;
    let trace = make_trace(name, args, exit_code, start, ctx.snippet_limit, &stdout, &stderr, span);

    Ok(StageRun { exit_code, stdout, stderr, control, traces: vec![trace] })
}

/// Run a built-in or custom command, capturing what it wrote through
/// `ExecutionContext::write_stdout`/`write_stderr` by temporarily swapping
/// out the context's scratch buffers.
async fn run_custom(ctx: &mut ExecutionContext, handler: &dyn builtins::CustomCommand, args: &[String]) -> (i32, Vec<u8>, Vec<u8>, BuiltinControl) {
    let saved_out = std::mem::take(&mut ctx.pending_stdout);
    let saved_err = std::mem::take(&mut ctx.pending_stderr);
    let outcome = handler.call(ctx, args).await;
    let stdout = std::mem::replace(&mut ctx.pending_stdout, saved_out);
    let stderr = std::mem::replace(&mut ctx.pending_stderr, saved_err);
    (outcome.code, stdout, stderr, outcome.control)
}

async fn run_named_builtin(ctx: &mut ExecutionContext, name: &str, args: &[String]) -> (i32, Vec<u8>, Vec<u8>, BuiltinControl) {
    let saved_out = std::mem::take(&mut ctx.pending_stdout);
    let saved_err = std::mem::take(&mut ctx.pending_stderr);
    let outcome = builtins::run_builtin(ctx, name, args).await;
    let stdout = std::mem::replace(&mut ctx.pending_stdout, saved_out);
    let stderr = std::mem::replace(&mut ctx.pending_stderr, saved_err);
    (outcome.code, stdout, stderr, outcome.control)
}

/// Apply a resolved redirection set to a stage's raw output: merge stderr
/// into stdout for `2>&1`, then siphon either stream off into its target
/// file, zeroing whatever was claimed so it doesn't also reach a pipe or
/// the root sink.
async fn route_redirects(mut resolved: ResolvedRedirects, mut stdout: Vec<u8>, mut stderr: Vec<u8>) -> (Vec<u8>, Vec<u8>) {
    if resolved.merge_stderr_into_stdout {
        let merged = std::mem::take(&mut stderr);
        stdout.extend_from_slice(&merged);
    }
    if let Some(mut file) = resolved.stdout_file.take() {
        if let Err(e) = file.write_all(&stdout).await {
            stderr.extend_from_slice(format!("redirect: {e}\n").as_bytes());
        }
        stdout.clear();
    }
    if let Some(mut file) = resolved.stderr_file.take() {
        if let Err(e) = file.write_all(&stderr).await {
            stderr.extend_from_slice(format!("redirect: {e}\n").as_bytes());
        }
        stderr.clear();
    }
    (stdout, stderr)
}

// ---------------------------------------------------------------------------
// External process spawning
// ---------------------------------------------------------------------------

struct SpawnedExternal {
    child: tokio::process::Child,
    stdout_task: tokio::task::JoinHandle<Vec<u8>>,
    stderr_task: tokio::task::JoinHandle<Vec<u8>>,
}

async fn spawn_external(
    ctx: &ExecutionContext,
    name: &str,
    args: &[String],
    env_overrides: &[(String, String)],
    stdin: &StdinSource,
) -> Result<SpawnedExternal, std::io::Error> {
    let mut command = tokio::process::Command::new(name);
    command.args(args);
    command.current_dir(&ctx.cwd);
    command.env_clear();
    command.envs(&ctx.env);
    for (k, v) in env_overrides {
        command.env(k, v);
    }
    command.stdin(stdin.to_stdio());
    command.stdout(Stdio::piped());
    command.stderr(Stdio::piped());

    let mut child = command.spawn()?;

    if let StdinSource::Bytes(bytes) = stdin {
        if let Some(mut child_stdin) = child.stdin.take() {
            let bytes = Arc::clone(bytes);
            tokio::spawn(async move {
                let _ = child_stdin.write_all(&bytes).await;
                drop(child_stdin);
            });
        }
    }

    let stdout_task = match child.stdout.take() {
        Some(mut out) => tokio::spawn(async move {
            let mut buf = Vec::new();
            let _ = out.read_to_end(&mut buf).await;
            buf
        }),
        None => tokio::spawn(async { Vec::new() }),
    };
    let stderr_task = match child.stderr.take() {
        Some(mut err) => tokio::spawn(async move {
            let mut buf = Vec::new();
            let _ = err.read_to_end(&mut buf).await;
            buf
        }),
        None => tokio::spawn(async { Vec::new() }),
    };

    Ok(SpawnedExternal { child, stdout_task, stderr_task })
}

/// Wait for a spawned child, racing the evaluator's cancellation token and
/// terminating the child (SIGTERM/grace/SIGKILL on POSIX, immediate kill on
/// Windows) if it trips first.
async fn finish_external(ctx: &ExecutionContext, mut spawned: SpawnedExternal) -> (i32, Vec<u8>, Vec<u8>, BuiltinControl) {
    let exit_code = tokio::select! {
        status = spawned.child.wait() => status.ok().and_then(|s| s.code()).unwrap_or(-1),
        _ = ctx.cancellation.cancelled() => {
            termination::terminate(&mut spawned.child).await;
            error::EXIT_TIMED_OUT
        }
    };
    let stdout = spawned.stdout_task.await.unwrap_or_default();
    let stderr = spawned.stderr_task.await.unwrap_or_default();
    (exit_code, stdout, stderr, BuiltinControl::Continue)
}

// ---------------------------------------------------------------------------
// Subshell
// ---------------------------------------------------------------------------

async fn execute_subshell(ctx: &mut ExecutionContext, sub: &Subshell, stdin: StdinSource) -> Result<StageRun, ExecError> {
    let mut inner = ctx.clone();
    inner.root_stdin = match stdin {
        StdinSource::Inherit => RootStdin::Inherit,
        StdinSource::Null => RootStdin::Null,
        StdinSource::Bytes(b) => RootStdin::Bytes(b),
    };
    inner.root_stdout = RootSink::Capture;
    inner.root_stderr = RootSink::Capture;
    inner.pending_stdout.clear();
    inner.pending_stderr.clear();

    let output = execute_command_list(&mut inner, &sub.body).await?;

    let resolved = match redirect::apply_redirections(ctx, &sub.redirections).await {
        Ok(r) => r,
        Err(fault) => {
            return Ok(StageRun {
                exit_code: redirect::EXIT_REDIRECT_ERROR,
                stdout: Vec::new(),
                stderr: format!("(subshell): {}\n", fault.message).into_bytes(),
                control: BuiltinControl::Continue,
                traces: output.traces,
            });
        }
    };

    let stdout = output.captured.stdout.unwrap_or_default();
    let stderr = output.captured.stderr.unwrap_or_default();
    let (stdout, stderr) = route_redirects(resolved, stdout, stderr).await;

    Ok(StageRun {
        exit_code: output.exit_code,
        stdout,
        stderr,
        // `exit` inside `(...)` only unwinds the subshell, same as real shells.
        control: BuiltinControl::Continue,
        traces: output.traces,
    })
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// A pipeline stage, expanded and redirect-resolved exactly once, against
/// its own context clone, ready to be dispatched. Splitting resolution from
/// dispatch lets `execute_pipeline` look ahead at a stage's kind without
/// expanding it twice (which would duplicate any command-substitution side
/// effects it carries).
enum ResolvedStage<'a> {
    /// `NAME=value` with no command name: a shell-local assignment, scoped
    /// to this stage's (discarded) context clone.
    Assignment,
    /// The stage's own redirections couldn't be honored.
    RedirectFault { name: String, args: Vec<String>, message: String },
    Subshell(&'a Subshell),
    Dispatch {
        /// `false` for a custom/built-in command; only `true` stages are
        /// candidates for the live concurrent streaming path.
        external: bool,
        name: String,
        args: Vec<String>,
        env_overrides: Vec<(String, String)>,
        redirects: ResolvedRedirects,
    },
}

impl ResolvedStage<'_> {
    /// Eligible for the concurrent external-stage streaming path: an
    /// external command whose redirects don't claim one of its streams.
    fn is_plain_external(&self) -> bool {
        matches!(self, ResolvedStage::Dispatch { external: true, redirects, .. } if redirects.is_plain())
    }
}

async fn resolve_stage<'a>(ctx: &ExecutionContext, stage: &'a Command) -> Result<(ExecutionContext, ResolvedStage<'a>, Span), ExecError> {
    let mut stage_ctx = ctx.clone();
    match stage {
        Command::Subshell(sub) => Ok((stage_ctx, ResolvedStage::Subshell(sub), sub.span)),
        Command::Simple(cmd) => {
            let (name, args, env_overrides) = expand_simple(&mut stage_ctx, cmd).await?;
            if name.is_empty() {
                for (k, v) in env_overrides {
                    stage_ctx.variables.insert(k, v);
                }
                return Ok((stage_ctx, ResolvedStage::Assignment, cmd.span));
            }
            let resolved = match redirect::apply_redirections(&mut stage_ctx, &cmd.redirections).await {
                Ok(redirects) => {
                    let external = stage_ctx.custom_commands.get(&name).is_none() && !builtins::is_builtin_name(&name);
                    ResolvedStage::Dispatch { external, name, args, env_overrides, redirects }
                }
                Err(fault) => ResolvedStage::RedirectFault { name, args, message: fault.message },
            };
            Ok((stage_ctx, resolved, cmd.span))
        }
        Command::Pipeline(_) => unreachable!("flatten_pipeline never nests a Pipeline inside a pipeline stage"),
    }
}

/// Dispatch a single already-resolved stage that isn't part of a live
/// concurrent group — a built-in, custom command, subshell, assignment,
/// redirect fault, or an external stage whose own redirects claim a stream.
async fn run_resolved_single(stage_ctx: &mut ExecutionContext, stage: ResolvedStage<'_>, span: Span, carry: StdinSource) -> Result<StageRun, ExecError> {
    let start = Instant::now();
    match stage {
        ResolvedStage::Assignment => Ok(StageRun { exit_code: 0, stdout: Vec::new(), stderr: Vec::new(), control: BuiltinControl::Continue, traces: Vec::new() }),
        ResolvedStage::RedirectFault { name, args, message } => Ok(redirect_fault_stage_run(&name, args, &message, stage_ctx.snippet_limit, start, span)),
        ResolvedStage::Subshell(sub) => execute_subshell(stage_ctx, sub, carry).await,
        ResolvedStage::Dispatch { name, args, env_overrides, redirects, .. } => {
            dispatch_and_finish(stage_ctx, name, args, env_overrides, redirects, carry, span, start).await
        }
    }
}

type ResolvedSlot<'a> = Option<(ExecutionContext, ResolvedStage<'a>, Span)>;

fn stage_is_plain_external(resolved: &[ResolvedSlot<'_>], idx: usize) -> bool {
    resolved[idx].as_ref().is_some_and(|(_, stage, _)| stage.is_plain_external())
}

async fn execute_pipeline(ctx: &mut ExecutionContext, stages: &[&Command], connectors: &[bool], stdin: StdinSource) -> Result<StageRun, ExecError> {
    // Resolve every stage up front, in order, each against its own context
    // clone: identical expansion order and per-stage subshell isolation to
    // a fully sequential walk (the outer `ctx`'s cwd/env/variables are never
    // touched by this loop), but decoupled from dispatch so a maximal run of
    // "plain" external stages can be grouped and spawned concurrently below.
    let mut resolved = Vec::with_capacity(stages.len());
    for stage in stages {
        resolved.push(Some(resolve_stage(ctx, stage).await?));
    }

    let mut carry = stdin;
    let mut exit_code = 0;
    let mut traces = Vec::new();
    let mut i = 0;

    while i < resolved.len() {
        if ctx.cancellation.is_cancelled() {
            exit_code = error::EXIT_TIMED_OUT;
            break;
        }

        let run = if stage_is_plain_external(&resolved, i) {
            let mut end = i;
            while end + 1 < resolved.len() && stage_is_plain_external(&resolved, end + 1) {
                end += 1;
            }
            let group: Vec<_> = resolved[i..=end].iter_mut().map(|slot| slot.take().expect("each slot consumed at most once")).collect();
            let group_connectors = &connectors[i..end];
            let run = run_external_group(ctx, group, group_connectors, carry.clone()).await?;
            i = end;
            run
        } else {
            let (mut stage_ctx, stage, span) = resolved[i].take().expect("each slot consumed at most once");
            run_resolved_single(&mut stage_ctx, stage, span, carry.clone()).await?
        };

        exit_code = run.exit_code;
        traces.extend(run.traces);

        let merge_forward = connectors.get(i).copied().unwrap_or(false);
        let mut next_stdin = run.stdout;
        if merge_forward {
            next_stdin.extend_from_slice(&run.stderr);
        } else {
            ctx.pending_stderr.extend_from_slice(&run.stderr);
        }
        carry = StdinSource::Bytes(Arc::new(next_stdin));
        i += 1;
    }

    let stdout = match carry {
        StdinSource::Bytes(bytes) => Arc::try_unwrap(bytes).unwrap_or_else(|arc| (*arc).clone()),
        _ => Vec::new(),
    };

    Ok(StageRun { exit_code, stdout, stderr: Vec::new(), control: BuiltinControl::Continue, traces })
}

/// Run a maximal group of adjacent pipeline stages that are all external
/// commands with no redirects that would sever the pipe (§5: "within a
/// pipeline, all stages start before any may finish observably"). Every
/// child is spawned up front with `Stdio::piped()`, so the whole group runs
/// as concurrent OS processes; only the byte-forwarding between adjacent
/// stages is sequenced, via a spawned copier task per boundary (§9: "two
/// cooperative tasks joined by a byte channel"). An early-exiting consumer
/// (`cmd | head -1`) then terminates its producer instead of waiting for it
/// to finish first.
///
/// A stage's own stdout is only captured if nothing downstream within the
/// group consumes it live — an intermediate stage's `stdout_snippet` is
/// therefore `None` in its trace, since those bytes are never buffered.
/// Stderr is always captured unless this boundary merges it forward
/// (`|&`), since it has to be routed to `ctx.pending_stderr` (or forwarded)
/// regardless of whether the pipe itself is live.
///
/// If a stage fails to spawn (command not found, not executable, ...),
/// every stage from that point on falls back to the fully-buffered
/// single-stage dispatch, since there's no live predecessor left to stream
/// from.
async fn run_external_group(ctx: &mut ExecutionContext, group: Vec<(ExecutionContext, ResolvedStage<'_>, Span)>, connectors: &[bool], carry_in: StdinSource) -> Result<StageRun, ExecError> {
    struct Stage {
        name: String,
        args: Vec<String>,
        env_overrides: Vec<(String, String)>,
        span: Span,
    }

    let stages: Vec<Stage> = group
        .into_iter()
        .map(|(_, stage, span)| match stage {
            ResolvedStage::Dispatch { name, args, env_overrides, .. } => Stage { name, args, env_overrides, span },
            _ => unreachable!("run_external_group is only called with plain external dispatches"),
        })
        .collect();

    let n = stages.len();
    let starts: Vec<Instant> = (0..n).map(|_| Instant::now()).collect();

    let mut children: Vec<tokio::process::Child> = Vec::with_capacity(n);
    let mut spawn_fault: Option<(usize, std::io::Error)> = None;

    for (idx, stage) in stages.iter().enumerate() {
        let mut command = tokio::process::Command::new(&stage.name);
        command.args(&stage.args);
        command.current_dir(&ctx.cwd);
        command.env_clear();
        command.envs(&ctx.env);
        for (k, v) in &stage.env_overrides {
            command.env(k, v);
        }
        command.stdin(if idx == 0 { carry_in.to_stdio() } else { Stdio::piped() });
        command.stdout(Stdio::piped());
        command.stderr(Stdio::piped());
        match command.spawn() {
            Ok(child) => children.push(child),
            Err(e) => {
                spawn_fault = Some((idx, e));
                break;
            }
        }
    }

    let spawned = children.len();

    if let (Some(first), StdinSource::Bytes(bytes)) = (children.first_mut(), &carry_in) {
        if let Some(mut child_stdin) = first.stdin.take() {
            let bytes = Arc::clone(bytes);
            tokio::spawn(async move {
                let _ = child_stdin.write_all(&bytes).await;
                drop(child_stdin);
            });
        }
    }

    // Relay stdout (and, for `|&`, stderr) from each spawned stage into the
    // next spawned stage's stdin, and capture whatever stderr isn't merged
    // away so it can still be routed once this boundary's connector is
    // known to the caller.
    let mut relay_tasks = Vec::with_capacity(spawned.saturating_sub(1));
    let mut stderr_tasks: Vec<Option<tokio::task::JoinHandle<Vec<u8>>>> = (0..spawned).map(|_| None).collect();

    for i in 0..spawned.saturating_sub(1) {
        let merge = connectors.get(i).copied().unwrap_or(false);
        let stdout = children[i].stdout.take();
        let stderr_for_relay = if merge { children[i].stderr.take() } else { None };
        let next_stdin = children[i + 1].stdin.take();
        relay_tasks.push(tokio::spawn(async move {
            if let (Some(mut out), Some(mut dest)) = (stdout, next_stdin) {
                let _ = tokio::io::copy(&mut out, &mut dest).await;
                if let Some(mut err) = stderr_for_relay {
                    let _ = tokio::io::copy(&mut err, &mut dest).await;
                }
                drop(dest);
            }
        }));
        if !merge {
            if let Some(mut err) = children[i].stderr.take() {
                stderr_tasks[i] = Some(tokio::spawn(async move {
                    let mut buf = Vec::new();
                    let _ = err.read_to_end(&mut buf).await;
                    buf
                }));
            }
        }
    }

    // The last spawned child's own output is never consumed live within the
    // group (either it's the group's true tail, or a later stage failed to
    // spawn and nothing will ever read from it) — drain both streams.
    let last_stdout_task = spawned.checked_sub(1).and_then(|last| {
        children[last].stdout.take().map(|mut out| {
            tokio::spawn(async move {
                let mut buf = Vec::new();
                let _ = out.read_to_end(&mut buf).await;
                buf
            })
        })
    });
    let last_stderr_task = spawned.checked_sub(1).and_then(|last| {
        children[last].stderr.take().map(|mut err| {
            tokio::spawn(async move {
                let mut buf = Vec::new();
                let _ = err.read_to_end(&mut buf).await;
                buf
            })
        })
    });

    let cancellation = ctx.cancellation.clone();
    let mut wait_tasks = Vec::with_capacity(spawned);
    for child in children.drain(..) {
        let token = cancellation.clone();
        wait_tasks.push(tokio::spawn(async move {
            let mut child = child;
            tokio::select! {
                status = child.wait() => status.ok().and_then(|s| s.code()).unwrap_or(-1),
                _ = token.cancelled() => {
                    termination::terminate(&mut child).await;
                    error::EXIT_TIMED_OUT
                }
            }
        }));
    }

    let mut exit_codes = Vec::with_capacity(spawned);
    for task in wait_tasks {
        exit_codes.push(task.await.unwrap_or(-1));
    }
    for task in relay_tasks {
        let _ = task.await;
    }
    let mut stderr_bytes: Vec<Option<Vec<u8>>> = Vec::with_capacity(spawned);
    for task in stderr_tasks {
        stderr_bytes.push(match task {
            Some(t) => Some(t.await.unwrap_or_default()),
            None => None,
        });
    }
    let last_stdout = match last_stdout_task {
        Some(t) => t.await.unwrap_or_default(),
        None => Vec::new(),
    };
    let last_stderr = match last_stderr_task {
        Some(t) => t.await.unwrap_or_default(),
        None => Vec::new(),
    };

    let mut traces = Vec::with_capacity(n);
    for (idx, stage) in stages.iter().enumerate().take(spawned) {
        let exit_code = exit_codes[idx];
        let is_last_spawned = idx == spawned - 1;
        let stdout_for_trace: &[u8] = if is_last_spawned { &last_stdout } else { &[] };
        let stderr_for_trace: &[u8] = if is_last_spawned {
            &last_stderr
        } else {
            stderr_bytes[idx].as_deref().unwrap_or(&[])
        };
        traces.push(make_trace(stage.name.clone(), stage.args.clone(), exit_code, starts[idx], ctx.snippet_limit, stdout_for_trace, stderr_for_trace, stage.span));
    }

    // Intermediate (non-merged) stderr is routed immediately, same as the
    // fully-buffered loop does for a non-final stage — only the very last
    // processed stage's stderr is handed back for the caller to route by
    // the connector that follows this whole group.
    for idx in 0..spawned.saturating_sub(1) {
        if let Some(bytes) = &stderr_bytes[idx] {
            ctx.pending_stderr.extend_from_slice(bytes);
        }
    }

    if let Some((fault_idx, err)) = spawn_fault {
        // Everything before `fault_idx` ran live; its last spawned child's
        // own output was drained above and discarded, since a stage that
        // never spawned never reads it — the fallback begins exactly like a
        // single spawn failure (empty stdout, the spawn error as stderr)
        // and then walks the rest of the group sequentially and buffered,
        // same as a stage run outside any live group.
        let code = error::spawn_error_exit_code(&err);
        let mut exit_code = code;
        let mut stdout = Vec::new();
        let mut stderr = format!("{}: {err}\n", stages[fault_idx].name).into_bytes();
        traces.push(make_trace(stages[fault_idx].name.clone(), stages[fault_idx].args.clone(), code, starts[fault_idx], ctx.snippet_limit, &[], &stderr, stages[fault_idx].span));

        let mut carry = StdinSource::Bytes(Arc::new(Vec::new()));

        for idx in fault_idx..n {
            if idx > fault_idx {
                let stage = &stages[idx];
                let resolved = ResolvedStage::Dispatch {
                    external: true,
                    name: stage.name.clone(),
                    args: stage.args.clone(),
                    env_overrides: stage.env_overrides.clone(),
                    redirects: ResolvedRedirects::default(),
                };
                let mut tail_ctx = ctx.clone();
                let run = run_resolved_single(&mut tail_ctx, resolved, stage.span, carry.clone()).await?;
                exit_code = run.exit_code;
                traces.extend(run.traces);
                stdout = run.stdout;
                stderr = run.stderr;
            }

            if idx == n - 1 {
                break;
            }

            let merge_forward = connectors.get(idx).copied().unwrap_or(false);
            let mut next_stdin = std::mem::take(&mut stdout);
            if merge_forward {
                next_stdin.extend_from_slice(&stderr);
            } else {
                ctx.pending_stderr.extend_from_slice(&stderr);
            }
            stderr.clear();
            carry = StdinSource::Bytes(Arc::new(next_stdin));
        }

        return Ok(StageRun { exit_code, stdout, stderr, control: BuiltinControl::Continue, traces });
    }

    Ok(StageRun { exit_code: exit_codes[n - 1], stdout: last_stdout, stderr: last_stderr, control: BuiltinControl::Continue, traces })
}

#[cfg(test)]
#[path = "run_tests.rs"]
mod tests;
