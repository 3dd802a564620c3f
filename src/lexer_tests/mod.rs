// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::ast::{QuoteStyle, SubstitutionBody, WordPart};
use crate::token::{DupTarget, TokenKind};

fn kinds(input: &str) -> Vec<TokenKind> {
    Lexer::tokenize(input).unwrap().into_iter().map(|t| t.kind).collect()
}

#[test]
fn words_split_on_whitespace() {
    assert_eq!(
        kinds("echo hello world"),
        vec![
            TokenKind::Word("echo".into()),
            TokenKind::Word("hello".into()),
            TokenKind::Word("world".into()),
        ]
    );
}

#[test]
fn line_continuation_joins_words() {
    assert_eq!(kinds("echo hel\\\nlo"), vec![TokenKind::Word("echo".into()), TokenKind::Word("hello".into())]);
}

#[test]
fn semicolon_and_newline_separators() {
    assert_eq!(
        kinds("a; b\nc"),
        vec![
            TokenKind::Word("a".into()),
            TokenKind::Semi,
            TokenKind::Word("b".into()),
            TokenKind::Newline,
            TokenKind::Word("c".into()),
        ]
    );
}

#[test]
fn boolean_and_pipe_operators() {
    assert_eq!(
        kinds("a && b || c | d |& e"),
        vec![
            TokenKind::Word("a".into()),
            TokenKind::And,
            TokenKind::Word("b".into()),
            TokenKind::Or,
            TokenKind::Word("c".into()),
            TokenKind::Pipe,
            TokenKind::Word("d".into()),
            TokenKind::PipeAmp,
            TokenKind::Word("e".into()),
        ]
    );
}

#[test]
fn background_ampersand() {
    assert_eq!(kinds("sleep 1 &"), vec![
        TokenKind::Word("sleep".into()),
        TokenKind::Word("1".into()),
        TokenKind::Ampersand,
    ]);
}

#[test]
fn single_quotes_are_literal() {
    assert_eq!(kinds("'a $b `c`'"), vec![TokenKind::SingleQuoted("a $b `c`".into())]);
}

#[test]
fn single_quote_unterminated_errors() {
    assert!(Lexer::tokenize("'abc").is_err());
}

#[test]
fn double_quotes_expand_variables() {
    let toks = kinds(r#""hello $NAME""#);
    match &toks[0] {
        TokenKind::DoubleQuoted(parts) => {
            assert_eq!(parts.len(), 2);
            assert!(matches!(&parts[0], WordPart::Literal { value, quoted: QuoteStyle::Double } if value == "hello "));
            assert!(matches!(&parts[1], WordPart::Variable { name } if name == "NAME"));
        }
        other => panic!("expected double-quoted token, got {other:?}"),
    }
}

#[test]
fn double_quote_escapes() {
    let toks = kinds(r#""a\nb\tc\"d""#);
    match &toks[0] {
        TokenKind::DoubleQuoted(parts) => {
            assert_eq!(parts.len(), 1);
            assert!(matches!(&parts[0], WordPart::Literal { value, .. } if value == "a\nb\tc\"d"));
        }
        other => panic!("unexpected: {other:?}"),
    }
}

#[test]
fn double_quote_unterminated_errors() {
    assert!(Lexer::tokenize("\"abc").is_err());
}

#[test]
fn variable_forms() {
    assert_eq!(kinds("$HOME ${PATH} $? $$ $# $0"), vec![
        TokenKind::Variable { name: "HOME".into() },
        TokenKind::Variable { name: "PATH".into() },
        TokenKind::Variable { name: "?".into() },
        TokenKind::Variable { name: "$".into() },
        TokenKind::Variable { name: "#".into() },
        TokenKind::Variable { name: "0".into() },
    ]);
}

#[test]
fn empty_variable_errors() {
    assert!(Lexer::tokenize("$ ").is_err());
    assert!(Lexer::tokenize("${}").is_err());
}

#[test]
fn unterminated_braced_variable_errors() {
    assert!(Lexer::tokenize("${NAME").is_err());
}

#[test]
fn dollar_paren_command_substitution() {
    let toks = kinds("$(echo hi)");
    assert!(matches!(&toks[0], TokenKind::CommandSubstitution { content, backtick: false } if content == "echo hi"));
}

#[test]
fn backtick_command_substitution() {
    let toks = kinds("`echo hi`");
    assert!(matches!(&toks[0], TokenKind::CommandSubstitution { content, backtick: true } if content == "echo hi"));
}

#[test]
fn nested_dollar_paren_substitution_balances_parens() {
    let toks = kinds("$(echo $(date))");
    assert!(matches!(&toks[0], TokenKind::CommandSubstitution { content, .. } if content == "echo $(date)"));
}

#[test]
fn command_substitution_inside_double_quotes() {
    let toks = kinds(r#""result: $(echo hi)""#);
    match &toks[0] {
        TokenKind::DoubleQuoted(parts) => {
            assert!(parts.iter().any(|p| matches!(p, WordPart::CommandSubstitution {
                body: SubstitutionBody::Unparsed(c), backtick: false
            } if c == "echo hi")));
        }
        other => panic!("unexpected: {other:?}"),
    }
}

#[test]
fn redirection_forms() {
    assert_eq!(kinds("> out"), vec![TokenKind::RedirectOut { fd: None }, TokenKind::Word("out".into())]);
    assert_eq!(kinds(">> out"), vec![TokenKind::RedirectAppend { fd: None }, TokenKind::Word("out".into())]);
    assert_eq!(kinds("< in"), vec![TokenKind::RedirectIn { fd: None }, TokenKind::Word("in".into())]);
    assert_eq!(kinds("2> err"), vec![TokenKind::RedirectOut { fd: Some(2) }, TokenKind::Word("err".into())]);
}

#[test]
fn fd_duplication() {
    assert_eq!(kinds("2>&1"), vec![TokenKind::DuplicateFd { source: 2, target: DupTarget::Fd(1), output: true }]);
    assert_eq!(kinds("3<&-"), vec![TokenKind::DuplicateFd { source: 3, target: DupTarget::Close, output: false }]);
}

#[test]
fn parens_are_distinct_tokens() {
    assert_eq!(kinds("(a)"), vec![TokenKind::LParen, TokenKind::Word("a".into()), TokenKind::RParen]);
}

#[test]
fn unquoted_backslash_escapes_next_char() {
    assert_eq!(kinds("a\\ b"), vec![TokenKind::Word("a b".into())]);
}

#[test]
fn trailing_backslash_in_word_is_literal() {
    assert_eq!(kinds("a\\"), vec![TokenKind::Word("a\\".into())]);
}

#[test]
fn variable_name_immediately_followed_by_word_char_stays_bounded() {
    assert_eq!(kinds("$FOO-bar"), vec![
        TokenKind::Variable { name: "FOO".into() },
        TokenKind::Word("-bar".into()),
    ]);
}
