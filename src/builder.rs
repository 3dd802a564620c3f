// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The command builder (C6): an immutable fluent surface that assembles a
//! [`CommandConfig`] and produces a runnable command.
//!
//! Every mutator consumes `self` and returns a fresh `CommandBuilder` — the
//! Rust idiom for "each mutator returns a new builder sharing all other
//! fields" (matching `std::process::Command`/`tokio::process::Command`
//! rather than a persistent, clone-on-every-call data structure), since
//! ownership-passing gives the same semantics without the allocation cost
//! of an immutable tree on every call.

use std::collections::{HashMap, HashSet};
use std::future::{Future, IntoFuture};
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio_util::sync::CancellationToken;

use crate::duration::DurationSpec;
use crate::exec::{self, CommandResult, CustomCommand, EvalRequest};
use crate::io::InputEndpoint;
use crate::parser::Parser;
use crate::scoped::ScopedTreeValue;
use crate::shell_error::{BuilderError, ShellError};

/// How a child's stdout or stderr is handled (§3 "Stdio mode").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StdioMode {
    /// Forward to the host process's corresponding stream.
    #[default]
    Inherit,
    /// Discard entirely.
    Null,
    /// Capture into the returned [`CommandResult`]; nothing forwarded.
    Piped,
    /// Forward to the host process's stream AND capture.
    InheritPiped,
}

impl StdioMode {
    fn captures(self) -> bool {
        matches!(self, StdioMode::Piped | StdioMode::InheritPiped)
    }

    fn inherits(self) -> bool {
        matches!(self, StdioMode::Inherit | StdioMode::InheritPiped)
    }
}

/// `which` selector for [`CommandBuilder::quiet`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuietWhich {
    Stdout,
    Stderr,
    Both,
}

/// `noThrow` policy: never throw, throw unless the code is in an allow
/// list, or (default) always throw on a non-zero final exit code.
#[derive(Debug, Clone, Default)]
enum NoThrowPolicy {
    #[default]
    Disabled,
    Always,
    Codes(HashSet<i32>),
}

impl NoThrowPolicy {
    fn suppresses(&self, code: i32) -> bool {
        match self {
            NoThrowPolicy::Disabled => false,
            NoThrowPolicy::Always => true,
            NoThrowPolicy::Codes(codes) => codes.contains(&code),
        }
    }
}

/// Per-builder defaults propagated through a [`ScopedTreeValue`] tree (C1):
/// a root `$`-equivalent installs these once, and every builder created
/// from it (directly or through a chain of `create_child`s) inherits them
/// unless it overrides its own copy of the flag via the explicit builder
/// methods below.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuilderDefaults {
    pub print_command: bool,
    pub no_throw: bool,
}

/// Immutable configuration assembled by [`CommandBuilder`]'s mutators.
///
/// Exposed (rather than kept private to the builder) so a host application
/// can introspect what a builder would run without executing it — useful
/// for `printCommand`-style logging done by the caller instead of this
/// crate, or for tests asserting on builder state.
pub struct CommandConfig {
    source: String,
    stdin: InputEndpoint,
    stdout: StdioMode,
    stderr: StdioMode,
    stdout_writer: Option<Pin<Box<dyn AsyncWrite + Send>>>,
    stderr_writer: Option<Pin<Box<dyn AsyncWrite + Send>>>,
    cwd: Option<PathBuf>,
    env_overrides: HashMap<String, String>,
    initial_variables: HashMap<String, String>,
    timeout: Option<DurationSpec>,
    print_command: Option<bool>,
    no_throw: NoThrowPolicy,
    export_env: bool,
    custom_commands: HashMap<String, Arc<dyn CustomCommand>>,
    snippet_limit: usize,
    defaults: ScopedTreeValue<BuilderDefaults>,
}

const DEFAULT_SNIPPET_LIMIT: usize = 4096;

impl CommandConfig {
    fn new(source: String) -> Self {
        Self {
            source,
            stdin: InputEndpoint::Inherit,
            stdout: StdioMode::Inherit,
            stderr: StdioMode::Inherit,
            stdout_writer: None,
            stderr_writer: None,
            cwd: None,
            env_overrides: HashMap::new(),
            initial_variables: HashMap::new(),
            timeout: None,
            print_command: None,
            no_throw: NoThrowPolicy::Disabled,
            export_env: false,
            custom_commands: HashMap::new(),
            snippet_limit: DEFAULT_SNIPPET_LIMIT,
            defaults: ScopedTreeValue::new(BuilderDefaults::default()),
        }
    }

    /// The source text that will be parsed and evaluated.
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn stdout_mode(&self) -> StdioMode {
        self.stdout
    }

    pub fn stderr_mode(&self) -> StdioMode {
        self.stderr
    }

    pub fn cwd(&self) -> Option<&Path> {
        self.cwd.as_deref()
    }

    pub fn env_overrides(&self) -> &HashMap<String, String> {
        &self.env_overrides
    }

    pub fn export_env(&self) -> bool {
        self.export_env
    }

    fn print_command_enabled(&self) -> bool {
        self.print_command.or_else(|| self.defaults.get_value().map(|d| d.print_command)).unwrap_or(false)
    }
}

/// Fluent, immutable command builder (C6).
///
/// ```ignore
/// use shellcraft::{CommandBuilder, StdioMode};
///
/// let result = CommandBuilder::command("echo hello")
///     .stdout(StdioMode::Piped)
///     .spawn()
///     .await?;
/// assert_eq!(result.captured.stdout.as_deref(), Some(b"hello\n".as_slice()));
/// ```
pub struct CommandBuilder {
    config: CommandConfig,
}

impl CommandBuilder {
    /// Start a new builder from mini-language source text.
    pub fn command(source: impl Into<String>) -> Self {
        Self {
            config: CommandConfig::new(source.into()),
        }
    }

    /// Start a new builder that inherits ambient defaults (printCommand,
    /// noThrow) from an existing [`ScopedTreeValue`] node — the Rust
    /// equivalent of building off a customised `$`.
    pub fn command_with_defaults(source: impl Into<String>, defaults: &ScopedTreeValue<BuilderDefaults>) -> Self {
        let mut config = CommandConfig::new(source.into());
        config.defaults = defaults.create_child();
        Self { config }
    }

    /// The scoped-tree node backing this builder's inherited defaults.
    /// Call `.create_child()` on it to derive a node for further builders
    /// that should see overrides made here.
    pub fn defaults(&self) -> &ScopedTreeValue<BuilderDefaults> {
        &self.config.defaults
    }

    /// Inspect the configuration accumulated so far without running it.
    pub fn config(&self) -> &CommandConfig {
        &self.config
    }

    // -----------------------------------------------------------------
    // Stdin
    // -----------------------------------------------------------------

    /// Feed stdin from a string or byte buffer.
    pub fn stdin(mut self, bytes: impl Into<Vec<u8>>) -> Self {
        self.config.stdin = InputEndpoint::Bytes(bytes.into());
        self
    }

    /// Feed stdin from an arbitrary async byte source.
    pub fn stdin_reader(mut self, reader: impl AsyncRead + Send + 'static) -> Self {
        self.config.stdin = InputEndpoint::Reader(Box::pin(reader));
        self
    }

    /// Give the child no stdin; it observes immediate EOF.
    pub fn stdin_null(mut self) -> Self {
        self.config.stdin = InputEndpoint::Null;
        self
    }

    // -----------------------------------------------------------------
    // Stdout / stderr
    // -----------------------------------------------------------------

    pub fn stdout(mut self, mode: StdioMode) -> Self {
        self.config.stdout = mode;
        self
    }

    pub fn stderr(mut self, mode: StdioMode) -> Self {
        self.config.stderr = mode;
        self
    }

    /// Forward captured stdout bytes to an arbitrary async writer once
    /// evaluation finishes (the evaluator buffers fully before publishing
    /// a result, so this is a post-hoc flush rather than live streaming;
    /// see `exec::run`'s module doc comment for why).
    pub fn stdout_writer(mut self, writer: impl AsyncWrite + Send + 'static) -> Self {
        self.config.stdout = StdioMode::Piped;
        self.config.stdout_writer = Some(Box::pin(writer));
        self
    }

    pub fn stderr_writer(mut self, writer: impl AsyncWrite + Send + 'static) -> Self {
        self.config.stderr = StdioMode::Piped;
        self.config.stderr_writer = Some(Box::pin(writer));
        self
    }

    /// Shorthand: discard the selected stream(s) (§4.6 `quiet`).
    pub fn quiet(mut self, which: QuietWhich) -> Self {
        match which {
            QuietWhich::Stdout => self.config.stdout = StdioMode::Null,
            QuietWhich::Stderr => self.config.stderr = StdioMode::Null,
            QuietWhich::Both => {
                self.config.stdout = StdioMode::Null;
                self.config.stderr = StdioMode::Null;
            }
        }
        self
    }

    // -----------------------------------------------------------------
    // Environment / cwd / shell-local variables
    // -----------------------------------------------------------------

    /// Resolve `path` against the process's current working directory and
    /// use it as the execution's cwd.
    pub fn cwd(mut self, path: impl AsRef<Path>) -> Self {
        let base = std::env::current_dir().unwrap_or_default();
        self.config.cwd = Some(crate::paths::resolve_path(&base, path.as_ref()));
        self
    }

    /// Merge a single exported-environment override.
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.env_overrides.insert(key.into(), value.into());
        self
    }

    /// Merge several exported-environment overrides at once.
    pub fn envs<K, V>(mut self, vars: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        for (k, v) in vars {
            self.config.env_overrides.insert(k.into(), v.into());
        }
        self
    }

    /// Seed a shell-local variable (never exported to spawned children),
    /// visible to `$NAME`/`${NAME}` expansion from the start of evaluation.
    pub fn variable(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.initial_variables.insert(key.into(), value.into());
        self
    }

    pub fn variables<K, V>(mut self, vars: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        for (k, v) in vars {
            self.config.initial_variables.insert(k.into(), v.into());
        }
        self
    }

    // -----------------------------------------------------------------
    // Timeout / policy flags
    // -----------------------------------------------------------------

    pub fn timeout(mut self, duration: impl Into<DurationSpec>) -> Self {
        self.config.timeout = Some(duration.into());
        self
    }

    /// Disable failure surfacing entirely: a non-zero final exit code is
    /// returned in `Ok(CommandResult)` rather than `Err`.
    pub fn no_throw(mut self) -> Self {
        self.config.no_throw = NoThrowPolicy::Always;
        self
    }

    /// Disable failure surfacing only for the listed exit codes.
    pub fn no_throw_codes(mut self, codes: impl IntoIterator<Item = i32>) -> Self {
        self.config.no_throw = NoThrowPolicy::Codes(codes.into_iter().collect());
        self
    }

    pub fn export_env(mut self, export: bool) -> Self {
        self.config.export_env = export;
        self
    }

    /// Log `> <source>` before running, through `tracing` rather than
    /// `println!` (matching the rest of the crate's ambient logging).
    pub fn print_command(mut self, enabled: bool) -> Self {
        self.config.print_command = Some(enabled);
        self
    }

    /// Bound how many bytes of a `CommandTrace`'s stdout/stderr snippet are
    /// retained (UTF-8-boundary-safe truncation).
    pub fn snippet_limit(mut self, limit: usize) -> Self {
        self.config.snippet_limit = limit;
        self
    }

    // -----------------------------------------------------------------
    // Custom commands
    // -----------------------------------------------------------------

    /// Register a custom command, shadowing a built-in of the same name
    /// for the lifetime of this builder's execution.
    pub fn register_command(mut self, name: impl Into<String>, handler: impl CustomCommand + 'static) -> Self {
        self.config.custom_commands.insert(name.into(), Arc::new(handler));
        self
    }

    pub fn register_commands<N>(mut self, handlers: impl IntoIterator<Item = (N, Arc<dyn CustomCommand>)>) -> Self
    where
        N: Into<String>,
    {
        for (name, handler) in handlers {
            self.config.custom_commands.insert(name.into(), handler);
        }
        self
    }

    // -----------------------------------------------------------------
    // Execution
    // -----------------------------------------------------------------

    /// Parse, validate, and evaluate the configured source, returning the
    /// fully-buffered result. Equivalent to `.await`ing the builder
    /// directly (`CommandBuilder` implements `IntoFuture`).
    pub async fn spawn(self) -> Result<CommandResult, ShellError> {
        let CommandBuilder { config } = self;

        if config.source.trim().is_empty() {
            return Err(BuilderError::EmptySource.into());
        }

        if config.print_command_enabled() {
            tracing::info!(target: "shellcraft::command", "> {}", config.source);
        }

        let list = Parser::parse(&config.source)?;
        crate::validator::validate(&list).map_err(ShellError::from)?;

        let cwd = config.cwd.clone().unwrap_or_else(|| std::env::current_dir().unwrap_or_default());

        let mut env: HashMap<String, String> = std::env::vars().collect();
        for (k, v) in &config.env_overrides {
            env.insert(k.clone(), v.clone());
        }

        let cancellation = CancellationToken::new();
        let mut timeout_guard = None;
        if let Some(mut spec) = config.timeout {
            let ms = spec.resolve_ms().map_err(BuilderError::from)?;
            let token = cancellation.clone();
            timeout_guard = Some(tokio::spawn(async move {
                tokio::time::sleep(std::time::Duration::from_millis(ms)).await;
                token.cancel();
            }));
        }

        let request = EvalRequest {
            cwd,
            env: env.clone(),
            custom_commands: Arc::new(config.custom_commands),
            variables: config.initial_variables,
            stdin: config.stdin,
            stdout_captures: config.stdout.captures(),
            stderr_captures: config.stderr.captures(),
            stdout_inherits: config.stdout.inherits(),
            stderr_inherits: config.stderr.inherits(),
            cancellation,
            snippet_limit: config.snippet_limit,
        };

        let no_throw = config.no_throw;
        let defaults_no_throw = config.defaults.get_value().is_some_and(|d| d.no_throw);
        let export_env = config.export_env;

        let outcome = exec::evaluate(&list, request).await.map_err(ShellError::from);

        if let Some(guard) = timeout_guard {
            guard.abort();
        }

        let mut result = outcome?;

        if let Some(mut writer) = config.stdout_writer {
            if let Some(bytes) = &result.captured.stdout {
                let _ = writer.write_all(bytes).await;
                let _ = writer.flush().await;
            }
        }
        if let Some(mut writer) = config.stderr_writer {
            if let Some(bytes) = &result.captured.stderr {
                let _ = writer.write_all(bytes).await;
                let _ = writer.flush().await;
            }
        }

        // Host side effects only apply once execution has completed
        // successfully (§4.5 exportEnv) — a failed or timed-out run must
        // leave the host cwd/env untouched even though its `CommandResult`
        // still reports what the (discarded) change would have been.
        if export_env && result.exit_code == 0 && !result.timed_out {
            let _ = std::env::set_current_dir(&result.final_cwd);
            for (k, v) in &result.final_env {
                if env.get(k) != Some(v) {
                    std::env::set_var(k, v);
                }
            }
        }

        let suppressed = no_throw.suppresses(result.exit_code) || (matches!(no_throw, NoThrowPolicy::Disabled) && defaults_no_throw);

        if result.exit_code != 0 && !suppressed {
            let timed_out = result.timed_out;
            let code = result.exit_code;
            return Err(ShellError::NonZeroExit {
                code,
                timed_out,
                result: Box::new(std::mem::replace(
                    &mut result,
                    CommandResult {
                        exit_code: code,
                        timed_out,
                        captured: Default::default(),
                        traces: Vec::new(),
                        final_cwd: PathBuf::new(),
                        final_env: HashMap::new(),
                    },
                )),
            });
        }

        Ok(result)
    }

    /// Force stdout to `piped`, run, and decode as UTF-8 text (trimming
    /// exactly one trailing newline).
    pub async fn text(self) -> Result<String, ShellError> {
        let result = self.stdout(StdioMode::Piped).spawn().await?;
        let bytes = result.captured.stdout.ok_or(BuilderError::StdoutNotCaptured)?;
        Ok(crate::io::decode_text(&bytes)?)
    }

    /// Force stdout to `piped`, run, and decode as newline-split lines.
    pub async fn lines(self) -> Result<Vec<String>, ShellError> {
        let result = self.stdout(StdioMode::Piped).spawn().await?;
        let bytes = result.captured.stdout.ok_or(BuilderError::StdoutNotCaptured)?;
        Ok(crate::io::decode_lines(&bytes)?)
    }

    /// Force stdout to `piped`, run, and decode as JSON.
    pub async fn json(self) -> Result<serde_json::Value, ShellError> {
        let result = self.stdout(StdioMode::Piped).spawn().await?;
        let bytes = result.captured.stdout.ok_or(BuilderError::StdoutNotCaptured)?;
        Ok(crate::io::decode_json(&bytes)?)
    }

    /// Force stdout to `piped`, run, and return the raw captured bytes.
    pub async fn bytes(self) -> Result<Vec<u8>, ShellError> {
        let result = self.stdout(StdioMode::Piped).spawn().await?;
        result.captured.stdout.ok_or_else(|| BuilderError::StdoutNotCaptured.into())
    }
}

impl IntoFuture for CommandBuilder {
    type Output = Result<CommandResult, ShellError>;
    type IntoFuture = Pin<Box<dyn Future<Output = Self::Output> + Send>>;

    fn into_future(self) -> Self::IntoFuture {
        Box::pin(self.spawn())
    }
}

#[cfg(test)]
#[path = "builder_tests.rs"]
mod tests;
