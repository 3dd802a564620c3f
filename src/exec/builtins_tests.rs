// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[tokio::test]
async fn cd_changes_cwd_to_an_existing_directory() {
    let dir = tempfile::tempdir().unwrap();
    tokio::fs::create_dir(dir.path().join("sub")).await.unwrap();
    let mut ctx = ExecutionContext::for_test_in(dir.path());
    let outcome = builtin_cd(&mut ctx, &["sub".to_string()]).await;
    assert_eq!(outcome.code, 0);
    assert_eq!(ctx.cwd, dir.path().join("sub"));
}

#[tokio::test]
async fn cd_with_no_args_and_no_home_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let mut ctx = ExecutionContext::for_test_in(dir.path());
    let outcome = builtin_cd(&mut ctx, &[]).await;
    assert_eq!(outcome.code, 1);
}

#[tokio::test]
async fn cd_into_a_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    tokio::fs::write(dir.path().join("f"), b"x").await.unwrap();
    let mut ctx = ExecutionContext::for_test_in(dir.path());
    let outcome = builtin_cd(&mut ctx, &["f".to_string()]).await;
    assert_eq!(outcome.code, 1);
}

#[tokio::test]
async fn echo_joins_args_with_spaces_and_trailing_newline() {
    let mut ctx = ExecutionContext::for_test();
    let outcome = builtin_echo(&mut ctx, &["a".to_string(), "b".to_string()]).await;
    assert_eq!(outcome.code, 0);
    assert_eq!(ctx.pending_stdout, b"a b\n");
}

#[test]
fn exit_with_no_args_uses_last_exit_code() {
    let mut ctx = ExecutionContext::for_test();
    ctx.last_exit_code = 9;
    let outcome = builtin_exit(&ctx, &[]);
    assert_eq!(outcome.control, BuiltinControl::Exit);
    assert_eq!(outcome.code, 9);
}

#[test]
fn exit_with_non_numeric_arg_uses_usage_error_code() {
    let ctx = ExecutionContext::for_test();
    let outcome = builtin_exit(&ctx, &["not-a-number".to_string()]);
    assert_eq!(outcome.code, 2);
}

#[tokio::test]
async fn sleep_with_missing_operand_is_a_usage_error() {
    let mut ctx = ExecutionContext::for_test();
    let outcome = builtin_sleep(&mut ctx, &[]).await;
    assert_eq!(outcome.code, 2);
}

#[tokio::test]
async fn sleep_honors_cancellation() {
    let mut ctx = ExecutionContext::for_test();
    ctx.cancellation.cancel();
    let outcome = builtin_sleep(&mut ctx, &["1h".to_string()]).await;
    assert_eq!(outcome.code, super::super::error::EXIT_TIMED_OUT);
}

#[test]
fn test_dash_n_checks_non_empty_string() {
    let ctx = ExecutionContext::for_test();
    let outcome = builtin_test(&ctx, &["-n".to_string(), "nonempty".to_string()]);
    assert_eq!(outcome.code, 0);
}

#[test]
fn test_dash_f_checks_regular_file() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("f"), b"x").unwrap();
    let ctx = ExecutionContext::for_test_in(dir.path());
    assert_eq!(builtin_test(&ctx, &["-f".to_string(), "f".to_string()]).code, 0);
    assert_eq!(builtin_test(&ctx, &["-f".to_string(), "missing".to_string()]).code, 1);
}

#[test]
fn test_string_equality() {
    let ctx = ExecutionContext::for_test();
    assert_eq!(builtin_test(&ctx, &["a".to_string(), "=".to_string(), "a".to_string()]).code, 0);
    assert_eq!(builtin_test(&ctx, &["a".to_string(), "=".to_string(), "b".to_string()]).code, 1);
}

#[test]
fn test_numeric_comparison() {
    let ctx = ExecutionContext::for_test();
    assert_eq!(builtin_test(&ctx, &["3".to_string(), "-lt".to_string(), "5".to_string()]).code, 0);
    assert_eq!(builtin_test(&ctx, &["5".to_string(), "-lt".to_string(), "3".to_string()]).code, 1);
}

#[test]
fn test_unrecognized_form_is_usage_error() {
    let ctx = ExecutionContext::for_test();
    let outcome = builtin_test(&ctx, &["one".to_string(), "two".to_string(), "three".to_string(), "four".to_string()]);
    assert_eq!(outcome.code, 2);
}
