// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::ast::{Command, LogicalOp, WordPart};

fn word_text(word: &crate::ast::Word) -> String {
    word.parts
        .iter()
        .map(|p| match p {
            WordPart::Literal { value, .. } => value.clone(),
            WordPart::Variable { name } => format!("${name}"),
            WordPart::CommandSubstitution { .. } => "$(...)".to_string(),
        })
        .collect()
}

fn simple_name(command: &Command) -> String {
    match command {
        Command::Simple(cmd) => word_text(&cmd.name),
        other => panic!("expected simple command, got {other:?}"),
    }
}

#[test]
fn parses_single_simple_command() {
    let list = Parser::parse("echo hello world").unwrap();
    assert_eq!(list.items.len(), 1);
    let Command::Simple(cmd) = &list.items[0].node.first else { panic!("expected simple") };
    assert_eq!(word_text(&cmd.name), "echo");
    assert_eq!(cmd.args.len(), 2);
    assert_eq!(word_text(&cmd.args[0]), "hello");
}

#[test]
fn parses_sequential_list() {
    let list = Parser::parse("echo a; echo b\necho c").unwrap();
    assert_eq!(list.items.len(), 3);
}

#[test]
fn background_item_sets_flag() {
    let list = Parser::parse("sleep 1 &").unwrap();
    assert!(list.items[0].background);
}

#[test]
fn and_or_list_left_associative() {
    let list = Parser::parse("a && b || c").unwrap();
    let and_or = &list.items[0].node;
    assert_eq!(simple_name(&and_or.first), "a");
    assert_eq!(and_or.rest.len(), 2);
    assert_eq!(and_or.rest[0].0, LogicalOp::And);
    assert_eq!(and_or.rest[1].0, LogicalOp::Or);
}

#[test]
fn pipeline_builds_left_deep_chain() {
    let list = Parser::parse("a | b | c").unwrap();
    let Command::Pipeline(p) = &list.items[0].node.first else { panic!("expected pipeline") };
    assert_eq!(p.stderr_too, false);
    let stages = Command::Pipeline(p.clone()).pipeline_stages();
    assert_eq!(stages.len(), 3);
    assert_eq!(simple_name(stages[0]), "a");
    assert_eq!(simple_name(stages[2]), "c");
}

#[test]
fn pipe_amp_sets_stderr_too() {
    let list = Parser::parse("a |& b").unwrap();
    let Command::Pipeline(p) = &list.items[0].node.first else { panic!("expected pipeline") };
    assert!(p.stderr_too);
}

#[test]
fn subshell_parses_inner_list() {
    let list = Parser::parse("(a; b)").unwrap();
    let Command::Subshell(s) = &list.items[0].node.first else { panic!("expected subshell") };
    assert_eq!(s.body.items.len(), 2);
}

#[test]
fn nested_subshells() {
    let list = Parser::parse("((a))").unwrap();
    let Command::Subshell(outer) = &list.items[0].node.first else { panic!("expected subshell") };
    assert_eq!(outer.body.items.len(), 1);
    assert!(matches!(&outer.body.items[0].node.first, Command::Subshell(_)));
}

#[test]
fn env_assignment_prefix() {
    let list = Parser::parse("FOO=bar echo $FOO").unwrap();
    let Command::Simple(cmd) = &list.items[0].node.first else { panic!("expected simple") };
    assert_eq!(cmd.env.len(), 1);
    assert_eq!(cmd.env[0].name, "FOO");
    assert_eq!(word_text(&cmd.name), "echo");
}

#[test]
fn standalone_assignment_has_no_name() {
    let list = Parser::parse("FOO=bar").unwrap();
    let Command::Simple(cmd) = &list.items[0].node.first else { panic!("expected simple") };
    assert_eq!(cmd.env.len(), 1);
    assert!(cmd.name.parts.is_empty());
}

#[test]
fn redirection_out_and_append() {
    let list = Parser::parse("echo hi > out.txt").unwrap();
    let Command::Simple(cmd) = &list.items[0].node.first else { panic!("expected simple") };
    assert_eq!(cmd.redirections.len(), 1);
    assert!(matches!(
        &cmd.redirections[0],
        crate::ast::Redirection::Out { append: false, .. }
    ));

    let list = Parser::parse("echo hi >> out.txt").unwrap();
    let Command::Simple(cmd) = &list.items[0].node.first else { panic!("expected simple") };
    assert!(matches!(
        &cmd.redirections[0],
        crate::ast::Redirection::Out { append: true, .. }
    ));
}

#[test]
fn redirection_fd_duplication() {
    let list = Parser::parse("echo hi 2>&1").unwrap();
    let Command::Simple(cmd) = &list.items[0].node.first else { panic!("expected simple") };
    assert!(matches!(
        &cmd.redirections[0],
        crate::ast::Redirection::Duplicate { source: 2, output: true, .. }
    ));
}

#[test]
fn word_concatenation_across_tokens() {
    let list = Parser::parse(r#"echo foo"bar"$baz"#).unwrap();
    let Command::Simple(cmd) = &list.items[0].node.first else { panic!("expected simple") };
    assert_eq!(cmd.args.len(), 1);
    assert_eq!(cmd.args[0].parts.len(), 3);
}

#[test]
fn command_substitution_is_parsed_recursively() {
    let list = Parser::parse("echo $(echo inner)").unwrap();
    let Command::Simple(cmd) = &list.items[0].node.first else { panic!("expected simple") };
    assert!(matches!(
        &cmd.args[0].parts[0],
        WordPart::CommandSubstitution { body: crate::ast::SubstitutionBody::Parsed(_), .. }
    ));
}

#[test]
fn unterminated_subshell_errors() {
    assert!(Parser::parse("(echo hi").is_err());
}

#[test]
fn missing_command_after_pipe_errors() {
    assert!(Parser::parse("echo hi |").is_err());
}

#[test]
fn missing_command_after_and_errors() {
    assert!(Parser::parse("echo hi &&").is_err());
}

#[test]
fn error_reports_span() {
    let err = Parser::parse("echo hi |").unwrap_err();
    assert!(err.span().is_some());
}

#[test]
fn parse_with_recovery_collects_multiple_errors() {
    let result = Parser::parse_with_recovery("echo a; | b; echo c");
    assert!(!result.errors.is_empty());
    assert!(result.commands.items.iter().any(|item| matches!(
        &item.node.first,
        Command::Simple(cmd) if word_text(&cmd.name) == "echo"
    )));
}

#[test]
fn empty_input_parses_to_empty_list() {
    let list = Parser::parse("").unwrap();
    assert!(list.items.is_empty());
}

#[test]
fn blank_lines_and_semicolons_are_skipped() {
    let list = Parser::parse(";;\n\necho hi;;").unwrap();
    assert_eq!(list.items.len(), 1);
}
