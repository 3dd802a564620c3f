// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::ast::CommandList;

fn parse(src: &str) -> CommandList {
    CommandList::parse(src).unwrap()
}

#[tokio::test]
async fn sequential_list_runs_every_item_left_to_right() {
    let mut ctx = ExecutionContext::for_test();
    let list = parse("echo one; echo two; echo three");
    let out = execute_command_list(&mut ctx, &list).await.unwrap();
    assert_eq!(out.exit_code, 0);
    assert_eq!(out.captured.stdout.unwrap(), b"one\ntwo\nthree\n");
}

#[tokio::test]
async fn and_chain_short_circuits_on_failure() {
    let mut ctx = ExecutionContext::for_test();
    let list = parse("false && echo unreachable");
    let out = execute_command_list(&mut ctx, &list).await.unwrap();
    assert_ne!(out.exit_code, 0);
    assert_eq!(out.captured.stdout.unwrap(), b"");
}

#[tokio::test]
async fn or_chain_runs_fallback_on_failure() {
    let mut ctx = ExecutionContext::for_test();
    let list = parse("false || echo fallback");
    let out = execute_command_list(&mut ctx, &list).await.unwrap();
    assert_eq!(out.exit_code, 0);
    assert_eq!(out.captured.stdout.unwrap(), b"fallback\n");
}

#[tokio::test]
async fn exit_builtin_unwinds_the_rest_of_the_list() {
    let mut ctx = ExecutionContext::for_test();
    let list = parse("echo one; exit 7; echo never");
    let out = execute_command_list(&mut ctx, &list).await.unwrap();
    assert_eq!(out.exit_code, 7);
    assert_eq!(out.captured.stdout.unwrap(), b"one\n");
}

#[tokio::test]
async fn cd_mutates_cwd_for_subsequent_commands() {
    let dir = tempfile::tempdir().unwrap();
    tokio::fs::create_dir(dir.path().join("sub")).await.unwrap();
    let mut ctx = ExecutionContext::for_test_in(dir.path());
    let list = parse("cd sub");
    execute_command_list(&mut ctx, &list).await.unwrap();
    assert_eq!(ctx.cwd, dir.path().join("sub"));
}

#[tokio::test]
async fn subshell_cd_does_not_leak_to_parent() {
    let dir = tempfile::tempdir().unwrap();
    tokio::fs::create_dir(dir.path().join("sub")).await.unwrap();
    let mut ctx = ExecutionContext::for_test_in(dir.path());
    let list = parse("(cd sub); echo done");
    let out = execute_command_list(&mut ctx, &list).await.unwrap();
    assert_eq!(ctx.cwd, dir.path());
    assert_eq!(out.captured.stdout.unwrap(), b"done\n");
}

#[tokio::test]
async fn variable_assignment_is_visible_to_later_commands_only() {
    let mut ctx = ExecutionContext::for_test();
    let list = parse("FOO=bar; echo $FOO");
    let out = execute_command_list(&mut ctx, &list).await.unwrap();
    assert_eq!(out.captured.stdout.unwrap(), b"bar\n");
}

#[tokio::test]
async fn pipeline_threads_stdout_into_next_stage_stdin() {
    let mut ctx = ExecutionContext::for_test();
    let list = parse("echo hello | cat");
    let out = execute_command_list(&mut ctx, &list).await.unwrap();
    assert_eq!(out.exit_code, 0);
    assert_eq!(out.captured.stdout.unwrap(), b"hello\n");
}

#[tokio::test]
async fn pipeline_exit_code_is_the_rightmost_stage() {
    let mut ctx = ExecutionContext::for_test();
    let list = parse("false | true");
    let out = execute_command_list(&mut ctx, &list).await.unwrap();
    assert_eq!(out.exit_code, 0);

    let mut ctx2 = ExecutionContext::for_test();
    let list2 = parse("true | false");
    let out2 = execute_command_list(&mut ctx2, &list2).await.unwrap();
    assert_ne!(out2.exit_code, 0);
}

#[tokio::test]
async fn pipeline_stage_cd_does_not_leak_to_sibling_stages() {
    let dir = tempfile::tempdir().unwrap();
    tokio::fs::create_dir(dir.path().join("sub")).await.unwrap();
    let mut ctx = ExecutionContext::for_test_in(dir.path());
    let list = parse("cd sub | true");
    execute_command_list(&mut ctx, &list).await.unwrap();
    assert_eq!(ctx.cwd, dir.path());
}

#[tokio::test]
async fn background_task_does_not_block_the_foreground_list() {
    let mut ctx = ExecutionContext::for_test();
    let list = parse("sleep 50ms &\necho immediate");
    let out = execute_command_list(&mut ctx, &list).await.unwrap();
    assert_eq!(out.exit_code, 0);
    assert_eq!(out.captured.stdout.unwrap(), b"immediate\n");
}

#[tokio::test]
async fn command_not_found_reports_127() {
    let mut ctx = ExecutionContext::for_test();
    let list = parse("this-binary-does-not-exist-anywhere");
    let out = execute_command_list(&mut ctx, &list).await.unwrap();
    assert_eq!(out.exit_code, error::EXIT_NOT_FOUND);
}

#[tokio::test]
async fn command_substitution_feeds_back_into_the_word() {
    let mut ctx = ExecutionContext::for_test();
    let list = parse("echo \"got: $(echo inner)\"");
    let out = execute_command_list(&mut ctx, &list).await.unwrap();
    assert_eq!(out.captured.stdout.unwrap(), b"got: inner\n");
}

#[tokio::test]
async fn cancellation_before_execution_short_circuits_to_timed_out() {
    let mut ctx = ExecutionContext::for_test();
    ctx.cancellation.cancel();
    let list = parse("echo one; echo two");
    let out = execute_command_list(&mut ctx, &list).await.unwrap();
    assert!(out.timed_out);
    assert_eq!(out.exit_code, error::EXIT_TIMED_OUT);
}

#[tokio::test]
async fn out_redirect_writes_to_file_instead_of_capture() {
    let dir = tempfile::tempdir().unwrap();
    let mut ctx = ExecutionContext::for_test_in(dir.path());
    let list = parse("echo hello > out.txt");
    let out = execute_command_list(&mut ctx, &list).await.unwrap();
    assert_eq!(out.captured.stdout.unwrap(), b"");
    let written = tokio::fs::read(dir.path().join("out.txt")).await.unwrap();
    assert_eq!(written, b"hello\n");
}
