// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[yare::parameterized(
    alphanumeric = { "hello123" },
    path_like = { "/usr/local/bin" },
    flag_like = { "--verbose=true" },
    email_like = { "user@host.com" },
)]
fn quote_token_leaves_safe_tokens_bare(input: &str) {
    assert_eq!(quote_token(input), input);
}

#[test]
fn quote_token_single_quotes_tokens_with_whitespace() {
    assert_eq!(quote_token("a file.txt"), "'a file.txt'");
}

#[test]
fn quote_token_escapes_embedded_single_quotes() {
    assert_eq!(quote_token("it's here"), "'it'\\''s here'");
}

#[test]
fn quote_token_quotes_the_empty_string() {
    assert_eq!(quote_token(""), "''");
}

#[test]
fn quote_tokens_space_joins_after_quoting_each() {
    let joined = quote_tokens(["one", "two three", "four"]);
    assert_eq!(joined, "one 'two three' four");
}

#[test]
fn cmd_macro_quotes_each_interpolated_argument() {
    let path = "a file.txt";
    let builder = cmd!("cat {}", path);
    assert_eq!(builder.config().source(), "cat 'a file.txt'");
}

#[test]
fn cmd_macro_leaves_literal_text_untouched() {
    let builder = cmd!("echo hello && echo world");
    assert_eq!(builder.config().source(), "echo hello && echo world");
}

#[test]
fn raw_cmd_macro_does_not_quote_interpolated_text() {
    let fragment = "echo one | echo two";
    let builder = raw_cmd!("{}", fragment);
    assert_eq!(builder.config().source(), "echo one | echo two");
}
