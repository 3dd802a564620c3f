// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-process built-in commands: `cd`, `echo`, `exit`, `sleep`, `test`.
//!
//! Each built-in has signature `(ctx, args) -> BuiltinOutcome`. Dispatch
//! order at `SimpleCommand` evaluation is: registered custom command (by
//! name) > built-in (by name) > external executable resolved against
//! `PATH`. See [`super::ExecutionContext::dispatch_builtin`].

use std::future::Future;
use std::path::Path;
use std::pin::Pin;

use tokio::io::AsyncWriteExt;

use crate::duration::parse_duration_ms;

use super::ExecutionContext;

/// Whether a built-in wants the enclosing `SimpleCommand` evaluation to
/// continue normally or to terminate the whole top-level execution (`exit`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltinControl {
    Continue,
    Exit,
}

/// Result of running a built-in or custom command.
#[derive(Debug, Clone, Copy)]
pub struct BuiltinOutcome {
    pub control: BuiltinControl,
    pub code: i32,
}

impl BuiltinOutcome {
    pub fn continue_with(code: i32) -> Self {
        Self { control: BuiltinControl::Continue, code }
    }

    pub fn exit_with(code: i32) -> Self {
        Self { control: BuiltinControl::Exit, code }
    }
}

/// A future returned by a [`CustomCommand`], borrowing the context and
/// arguments for the duration of the call.
pub type CustomCommandFuture<'a> = Pin<Box<dyn Future<Output = BuiltinOutcome> + Send + 'a>>;

/// A registerable command that can shadow a built-in or add a new one.
///
/// Implemented for any closure matching the higher-ranked signature below,
/// so callers can register commands as plain closures:
///
/// ```ignore
/// builder.register_command("greet", |_ctx, args| Box::pin(async move {
///     println!("hello {}", args.join(" "));
///     BuiltinOutcome::continue_with(0)
/// }));
/// ```
pub trait CustomCommand: Send + Sync {
    fn call<'a>(
        &'a self,
        ctx: &'a mut ExecutionContext,
        args: &'a [String],
    ) -> CustomCommandFuture<'a>;
}

impl<F> CustomCommand for F
where
    F: for<'a> Fn(&'a mut ExecutionContext, &'a [String]) -> CustomCommandFuture<'a> + Send + Sync,
{
    fn call<'a>(
        &'a self,
        ctx: &'a mut ExecutionContext,
        args: &'a [String],
    ) -> CustomCommandFuture<'a> {
        (self)(ctx, args)
    }
}

/// The fixed set of built-in names. Any other name falls through to
/// external-command resolution.
pub fn is_builtin_name(name: &str) -> bool {
    matches!(name, "cd" | "echo" | "exit" | "sleep" | "test")
}

/// Dispatch one of the five required built-ins by name. Panics if `name`
/// isn't one of them — callers must check [`is_builtin_name`] first.
pub async fn run_builtin(ctx: &mut ExecutionContext, name: &str, args: &[String]) -> BuiltinOutcome {
    match name {
        "cd" => builtin_cd(ctx, args).await,
        "echo" => builtin_echo(ctx, args).await,
        "exit" => builtin_exit(ctx, args),
        "sleep" => builtin_sleep(ctx, args).await,
        "test" => builtin_test(ctx, args),
        _ => unreachable!("caller must check is_builtin_name before dispatching"),
    }
}

// ---------------------------------------------------------------------------
// cd
// ---------------------------------------------------------------------------

async fn builtin_cd(ctx: &mut ExecutionContext, args: &[String]) -> BuiltinOutcome {
    let target = match args.first() {
        Some(dir) => dir.clone(),
        None => {
            let home = if cfg!(windows) { "USERPROFILE" } else { "HOME" };
            match ctx.env.get(home) {
                Some(v) => v.clone(),
                None => {
                    ctx.write_stderr(b"cd: HOME not set\n").await;
                    return BuiltinOutcome::continue_with(1);
                }
            }
        }
    };

    let resolved = crate::paths::resolve_path(&ctx.cwd, Path::new(&target));
    match tokio::fs::metadata(&resolved).await {
        Ok(meta) if meta.is_dir() => {
            ctx.cwd = resolved;
            BuiltinOutcome::continue_with(0)
        }
        Ok(_) => {
            ctx.write_stderr(format!("cd: not a directory: {target}\n").as_bytes()).await;
            BuiltinOutcome::continue_with(1)
        }
        Err(e) => {
            ctx.write_stderr(format!("cd: {target}: {e}\n").as_bytes()).await;
            BuiltinOutcome::continue_with(1)
        }
    }
}

// ---------------------------------------------------------------------------
// echo
// ---------------------------------------------------------------------------

async fn builtin_echo(ctx: &mut ExecutionContext, args: &[String]) -> BuiltinOutcome {
    let mut line = args.join(" ");
    line.push('\n');
    ctx.write_stdout(line.as_bytes()).await;
    BuiltinOutcome::continue_with(0)
}

// ---------------------------------------------------------------------------
// exit
// ---------------------------------------------------------------------------

fn builtin_exit(ctx: &ExecutionContext, args: &[String]) -> BuiltinOutcome {
    match args.first() {
        None => BuiltinOutcome::exit_with(ctx.last_exit_code),
        Some(n) => match n.parse::<i32>() {
            Ok(code) => BuiltinOutcome::exit_with(code),
            Err(_) => BuiltinOutcome::exit_with(2),
        },
    }
}

// ---------------------------------------------------------------------------
// sleep
// ---------------------------------------------------------------------------

async fn builtin_sleep(ctx: &mut ExecutionContext, args: &[String]) -> BuiltinOutcome {
    let Some(spec) = args.first() else {
        ctx.write_stderr(b"sleep: missing duration operand\n").await;
        return BuiltinOutcome::continue_with(2);
    };

    let ms = match parse_duration_ms(spec) {
        Ok(ms) => ms,
        Err(e) => {
            ctx.write_stderr(format!("sleep: {e}\n").as_bytes()).await;
            return BuiltinOutcome::continue_with(2);
        }
    };

    tokio::select! {
        _ = tokio::time::sleep(std::time::Duration::from_millis(ms)) => {
            BuiltinOutcome::continue_with(0)
        }
        _ = ctx.cancellation.cancelled() => {
            BuiltinOutcome::continue_with(super::error::EXIT_TIMED_OUT)
        }
    }
}

// ---------------------------------------------------------------------------
// test
// ---------------------------------------------------------------------------

fn builtin_test(ctx: &ExecutionContext, args: &[String]) -> BuiltinOutcome {
    let code = match args {
        [flag, path] if flag == "-e" => bool_code(Path::new(path).exists() || ctx.cwd.join(path).exists()),
        [flag, path] if flag == "-f" => bool_code(resolved(ctx, path).is_file()),
        [flag, path] if flag == "-d" => bool_code(resolved(ctx, path).is_dir()),
        [flag, s] if flag == "-n" => bool_code(!s.is_empty()),
        [flag, s] if flag == "-z" => bool_code(s.is_empty()),
        [lhs, op, rhs] if op == "=" => bool_code(lhs == rhs),
        [lhs, op, rhs] if op == "!=" => bool_code(lhs != rhs),
        [lhs, op, rhs] => match (lhs.parse::<i64>(), rhs.parse::<i64>()) {
            (Ok(l), Ok(r)) => match op.as_str() {
                "-eq" => bool_code(l == r),
                "-ne" => bool_code(l != r),
                "-lt" => bool_code(l < r),
                "-le" => bool_code(l <= r),
                "-gt" => bool_code(l > r),
                "-ge" => bool_code(l >= r),
                _ => 2,
            },
            _ => 2,
        },
        _ => 2,
    };
    BuiltinOutcome::continue_with(code)
}

fn resolved(ctx: &ExecutionContext, path: &str) -> std::path::PathBuf {
    crate::paths::resolve_path(&ctx.cwd, Path::new(path))
}

fn bool_code(value: bool) -> i32 {
    if value {
        0
    } else {
        1
    }
}

#[cfg(test)]
#[path = "builtins_tests.rs"]
mod tests;
