// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Redirection setup: `>`, `>>`, `<`, and `n>&m` fd duplication.
//!
//! File targets open relative to `ctx.cwd`. A redirect failure (bad path,
//! permission denied, unsupported fd target) is a runtime fault, not a
//! thrown error — it is reported as a non-zero exit code plus a stderr
//! message, same as any other failing command (see `exec::error`).

use crate::ast::Redirection;
use crate::token::DupTarget;

use super::expand;
use super::ExecutionContext;

/// Exit code used for a redirection that could not be honored.
pub(crate) const EXIT_REDIRECT_ERROR: i32 = 1;

/// Resolved effect of a command's redirection list, ready to be applied to
/// a spawned child or to a built-in's buffered output.
#[derive(Default)]
pub(crate) struct ResolvedRedirects {
    /// Bytes to feed the command's stdin, overriding whatever the pipeline
    /// or root context would otherwise have supplied.
    pub(crate) stdin_override: Option<Vec<u8>>,
    /// Open file stdout should be written to instead of the pipeline/root
    /// sink.
    pub(crate) stdout_file: Option<tokio::fs::File>,
    /// Open file stderr should be written to instead of the pipeline/root
    /// sink.
    pub(crate) stderr_file: Option<tokio::fs::File>,
    /// `2>&1`: stderr bytes should be appended to stdout's destination
    /// instead of following their own route.
    pub(crate) merge_stderr_into_stdout: bool,
}

impl ResolvedRedirects {
    /// Whether this stage's redirects leave its stdout/stderr free to flow
    /// straight through a live pipe — no fixed-file destination, no stdin
    /// override, no `2>&1` merge. Gates eligibility for the concurrent
    /// external-stage streaming path in `exec::run`.
    pub(crate) fn is_plain(&self) -> bool {
        self.stdin_override.is_none() && self.stdout_file.is_none() && self.stderr_file.is_none() && !self.merge_stderr_into_stdout
    }
}

/// A redirection that could not be honored. Callers turn this into a
/// non-zero exit code plus a stderr message, never a thrown error.
pub(crate) struct RedirectFault {
    pub(crate) message: String,
}

pub(crate) async fn apply_redirections(
    ctx: &mut ExecutionContext,
    redirections: &[Redirection],
) -> Result<ResolvedRedirects, RedirectFault> {
    let mut resolved = ResolvedRedirects::default();

    for redir in redirections {
        match redir {
            Redirection::Out { fd, target, append } => {
                let path_text = expand::expand_word(ctx, target)
                    .await
                    .map_err(|e| RedirectFault { message: e.to_string() })?;
                let path = crate::paths::resolve_path(&ctx.cwd, std::path::Path::new(&path_text));

                let file = tokio::fs::OpenOptions::new()
                    .write(true)
                    .create(true)
                    .append(*append)
                    .truncate(!*append)
                    .open(&path)
                    .await
                    .map_err(|e| RedirectFault { message: format!("{path_text}: {e}") })?;

                match fd.unwrap_or(1) {
                    1 => resolved.stdout_file = Some(file),
                    2 => resolved.stderr_file = Some(file),
                    other => {
                        return Err(RedirectFault {
                            message: format!("unsupported output redirection for fd {other}"),
                        })
                    }
                }
            }
            Redirection::In { fd, source } => {
                if let Some(n) = *fd {
                    if n != 0 {
                        return Err(RedirectFault {
                            message: format!("unsupported input redirection for fd {n}"),
                        });
                    }
                }
                let path_text = expand::expand_word(ctx, source)
                    .await
                    .map_err(|e| RedirectFault { message: e.to_string() })?;
                let path = crate::paths::resolve_path(&ctx.cwd, std::path::Path::new(&path_text));

                let bytes = tokio::fs::read(&path)
                    .await
                    .map_err(|e| RedirectFault { message: format!("{path_text}: {e}") })?;
                resolved.stdin_override = Some(bytes);
            }
            Redirection::Duplicate { source, target, output } => {
                if *output && *source == 2 && *target == DupTarget::Fd(1) {
                    resolved.merge_stderr_into_stdout = true;
                } else {
                    return Err(RedirectFault {
                        message: "unsupported file descriptor duplication (only 2>&1 is implemented)".to_string(),
                    });
                }
            }
        }
    }

    Ok(resolved)
}

#[cfg(test)]
#[path = "redirect_tests.rs"]
mod tests;
