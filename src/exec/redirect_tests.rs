// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::ast::{QuoteStyle, Word, WordPart};
use crate::Span;

fn literal_word(text: &str) -> Word {
    Word {
        parts: vec![WordPart::Literal { value: text.to_string(), quoted: QuoteStyle::Unquoted }],
        span: Span::empty(0),
    }
}

#[tokio::test]
async fn out_redirect_creates_and_truncates_file() {
    let dir = tempfile::tempdir().unwrap();
    let mut ctx = ExecutionContext::for_test_in(dir.path());

    tokio::fs::write(dir.path().join("out.txt"), b"stale").await.unwrap();

    let redirs = vec![Redirection::Out { fd: None, target: literal_word("out.txt"), append: false }];
    let resolved = apply_redirections(&mut ctx, &redirs).await;
    assert!(resolved.is_ok());
    assert!(resolved.unwrap().stdout_file.is_some());
}

#[tokio::test]
async fn in_redirect_reads_file_bytes() {
    let dir = tempfile::tempdir().unwrap();
    let mut ctx = ExecutionContext::for_test_in(dir.path());
    tokio::fs::write(dir.path().join("in.txt"), b"hello").await.unwrap();

    let redirs = vec![Redirection::In { fd: None, source: literal_word("in.txt") }];
    let resolved = apply_redirections(&mut ctx, &redirs).await.unwrap();
    assert_eq!(resolved.stdin_override, Some(b"hello".to_vec()));
}

#[tokio::test]
async fn stderr_merge_sets_flag() {
    let dir = tempfile::tempdir().unwrap();
    let mut ctx = ExecutionContext::for_test_in(dir.path());

    let redirs = vec![Redirection::Duplicate { source: 2, target: DupTarget::Fd(1), output: true }];
    let resolved = apply_redirections(&mut ctx, &redirs).await.unwrap();
    assert!(resolved.merge_stderr_into_stdout);
}

#[tokio::test]
async fn unsupported_duplication_is_a_fault_not_a_panic() {
    let dir = tempfile::tempdir().unwrap();
    let mut ctx = ExecutionContext::for_test_in(dir.path());

    let redirs = vec![Redirection::Duplicate { source: 3, target: DupTarget::Fd(4), output: true }];
    let result = apply_redirections(&mut ctx, &redirs).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn missing_input_file_is_a_fault() {
    let dir = tempfile::tempdir().unwrap();
    let mut ctx = ExecutionContext::for_test_in(dir.path());

    let redirs = vec![Redirection::In { fd: None, source: literal_word("does-not-exist.txt") }];
    let result = apply_redirections(&mut ctx, &redirs).await;
    assert!(result.is_err());
}
