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

fn var_word(name: &str) -> Word {
    Word { parts: vec![WordPart::Variable { name: name.to_string() }], span: Span::empty(0) }
}

#[tokio::test]
async fn literal_passes_through_unchanged() {
    let mut ctx = ExecutionContext::for_test();
    let out = expand_word(&mut ctx, &literal_word("hello")).await.unwrap();
    assert_eq!(out, "hello");
}

#[tokio::test]
async fn defined_shell_variable_expands() {
    let mut ctx = ExecutionContext::for_test();
    ctx.variables.insert("FOO".to_string(), "bar".to_string());
    let out = expand_word(&mut ctx, &var_word("FOO")).await.unwrap();
    assert_eq!(out, "bar");
}

#[tokio::test]
async fn undefined_variable_expands_to_empty_string() {
    let mut ctx = ExecutionContext::for_test();
    let out = expand_word(&mut ctx, &var_word("NOPE")).await.unwrap();
    assert_eq!(out, "");
}

#[tokio::test]
async fn shell_variable_shadows_exported_env() {
    let mut ctx = ExecutionContext::for_test();
    ctx.env.insert("FOO".to_string(), "from-env".to_string());
    ctx.variables.insert("FOO".to_string(), "from-shell".to_string());
    let out = expand_word(&mut ctx, &var_word("FOO")).await.unwrap();
    assert_eq!(out, "from-shell");
}

#[test]
fn trims_all_trailing_newlines_not_just_one() {
    assert_eq!(trim_all_trailing_newlines("hi\n\n\n"), "hi");
    assert_eq!(trim_all_trailing_newlines("hi\r\n"), "hi");
    assert_eq!(trim_all_trailing_newlines("hi"), "hi");
}

#[tokio::test]
async fn multi_part_word_concatenates_segments() {
    let mut ctx = ExecutionContext::for_test();
    ctx.variables.insert("NAME".to_string(), "world".to_string());
    let word = Word {
        parts: vec![
            WordPart::Literal { value: "hello-".to_string(), quoted: QuoteStyle::Unquoted },
            WordPart::Variable { name: "NAME".to_string() },
        ],
        span: Span::empty(0),
    };
    let out = expand_word(&mut ctx, &word).await.unwrap();
    assert_eq!(out, "hello-world");
}
