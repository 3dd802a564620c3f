// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::exec::BuiltinOutcome;
use crate::ShellError;

#[tokio::test]
async fn spawn_returns_captured_stdout_on_success() {
    let result = CommandBuilder::command("echo hello").stdout(StdioMode::Piped).spawn().await.unwrap();
    assert_eq!(result.exit_code, 0);
    assert_eq!(result.captured.stdout.unwrap(), b"hello\n");
}

#[tokio::test]
async fn text_trims_exactly_one_trailing_newline() {
    let out = CommandBuilder::command("echo hello").text().await.unwrap();
    assert_eq!(out, "hello");
}

#[tokio::test]
async fn lines_splits_multiline_output() {
    let out = CommandBuilder::command("echo one; echo two").lines().await.unwrap();
    assert_eq!(out, vec!["one".to_string(), "two".to_string()]);
}

#[tokio::test]
async fn bytes_returns_raw_captured_stdout() {
    let out = CommandBuilder::command("echo hi").bytes().await.unwrap();
    assert_eq!(out, b"hi\n");
}

#[tokio::test]
async fn non_zero_exit_surfaces_as_err_by_default() {
    let err = CommandBuilder::command("exit 3").spawn().await.unwrap_err();
    match err {
        ShellError::NonZeroExit { code, timed_out, .. } => {
            assert_eq!(code, 3);
            assert!(!timed_out);
        }
        other => panic!("expected NonZeroExit, got {other:?}"),
    }
}

#[tokio::test]
async fn no_throw_suppresses_failure_and_returns_ok() {
    let result = CommandBuilder::command("exit 3").no_throw().spawn().await.unwrap();
    assert_eq!(result.exit_code, 3);
}

#[tokio::test]
async fn no_throw_codes_only_suppresses_listed_codes() {
    let err = CommandBuilder::command("exit 3").no_throw_codes([1, 2]).spawn().await.unwrap_err();
    assert!(matches!(err, ShellError::NonZeroExit { code: 3, .. }));

    let result = CommandBuilder::command("exit 2").no_throw_codes([1, 2]).spawn().await.unwrap();
    assert_eq!(result.exit_code, 2);
}

#[tokio::test]
async fn empty_source_is_a_builder_error() {
    let err = CommandBuilder::command("   ").spawn().await.unwrap_err();
    assert!(matches!(err, ShellError::Builder(BuilderError::EmptySource)));
}

#[test]
fn quiet_both_sets_stdout_and_stderr_to_null() {
    let builder = CommandBuilder::command("echo hi").quiet(QuietWhich::Both);
    assert_eq!(builder.config().stdout_mode(), StdioMode::Null);
    assert_eq!(builder.config().stderr_mode(), StdioMode::Null);
}

#[tokio::test]
async fn env_override_is_visible_to_the_child() {
    let out = CommandBuilder::command("echo $GREETING").variable("GREETING", "hi").text().await.unwrap();
    assert_eq!(out, "hi");
}

#[tokio::test]
async fn cwd_resolves_relative_to_the_given_path() {
    let dir = tempfile::tempdir().unwrap();
    tokio::fs::write(dir.path().join("marker"), b"x").await.unwrap();
    let out = CommandBuilder::command("test -f marker; echo $?").cwd(dir.path()).text().await.unwrap();
    assert_eq!(out, "0");
}

#[tokio::test]
async fn timeout_cancels_a_long_running_command() {
    let result = CommandBuilder::command("sleep 1h").timeout(20u64).no_throw().spawn().await.unwrap();
    assert!(result.timed_out);
}

#[tokio::test]
async fn register_command_shadows_matching_builtin_name() {
    let result = CommandBuilder::command("greet world")
        .register_command("greet", |ctx: &mut crate::ExecutionContext, args: &[String]| {
            Box::pin(async move {
                ctx.write_stdout(format!("hi {}\n", args.join(" ")).as_bytes()).await;
                BuiltinOutcome::continue_with(0)
            })
        })
        .text()
        .await
        .unwrap();
    assert_eq!(result, "hi world");
}

#[tokio::test]
async fn stdout_writer_receives_captured_bytes() {
    let (tx, mut rx) = tokio::io::duplex(1024);
    let reader = tokio::spawn(async move {
        let mut buf = Vec::new();
        tokio::io::AsyncReadExt::read_to_end(&mut rx, &mut buf).await.unwrap();
        buf
    });
    CommandBuilder::command("echo piped").stdout_writer(tx).spawn().await.unwrap();
    let sink = reader.await.unwrap();
    assert_eq!(sink, b"piped\n");
}

#[tokio::test]
async fn export_env_updates_the_host_process_cwd() {
    let dir = tempfile::tempdir().unwrap();
    tokio::fs::create_dir(dir.path().join("sub")).await.unwrap();
    let original = std::env::current_dir().unwrap();
    CommandBuilder::command("cd sub").cwd(dir.path()).export_env(true).spawn().await.unwrap();
    assert_eq!(std::env::current_dir().unwrap(), dir.path().join("sub"));
    std::env::set_current_dir(original).unwrap();
}

#[tokio::test]
async fn defaults_no_throw_is_inherited_by_a_builder_without_its_own_override() {
    let root_defaults = ScopedTreeValue::new(BuilderDefaults { print_command: false, no_throw: true });
    let result = CommandBuilder::command_with_defaults("exit 5", &root_defaults).spawn().await.unwrap();
    assert_eq!(result.exit_code, 5);
}

#[tokio::test]
async fn explicit_no_throw_override_wins_over_inherited_default() {
    let root_defaults = ScopedTreeValue::new(BuilderDefaults { print_command: false, no_throw: true });
    let mut builder = CommandBuilder::command_with_defaults("exit 5", &root_defaults);
    builder.defaults().set_value(BuilderDefaults { print_command: false, no_throw: true });
    let err = builder.no_throw_codes([]).spawn().await.unwrap_err();
    assert!(matches!(err, ShellError::NonZeroExit { code: 5, .. }));
}

#[tokio::test]
async fn into_future_impl_lets_the_builder_be_awaited_directly() {
    let result = CommandBuilder::command("true").await.unwrap();
    assert_eq!(result.exit_code, 0);
}

#[test]
fn config_reflects_accumulated_overrides_without_running_anything() {
    let builder = CommandBuilder::command("echo hi").cwd(std::env::temp_dir()).env("A", "1").export_env(true);
    assert_eq!(builder.config().source(), "echo hi");
    assert!(builder.config().export_env());
    assert_eq!(builder.config().env_overrides().get("A").map(String::as_str), Some("1"));
}
