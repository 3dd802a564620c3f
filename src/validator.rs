// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Semantic validation for parsed shell ASTs.

use super::ast::{AstVisitor, Command, CommandList, Pipeline, SimpleCommand, Subshell};
use super::token::Span;
pub use crate::validation::ValidationError;

#[derive(Debug, Clone)]
pub struct ValidatorConfig {
    /// 0 = unlimited.
    pub max_nesting_depth: usize,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self { max_nesting_depth: 0 }
    }
}

pub fn validate(ast: &CommandList) -> Result<(), Vec<ValidationError>> {
    validate_with_config(ast, ValidatorConfig::default())
}

pub fn validate_with_config(
    ast: &CommandList,
    config: ValidatorConfig,
) -> Result<(), Vec<ValidationError>> {
    Validator::new(config).validate(ast)
}

struct Validator {
    config: ValidatorConfig,
    errors: Vec<ValidationError>,
    current_depth: usize,
}

impl Validator {
    fn new(config: ValidatorConfig) -> Self {
        Self { config, errors: Vec::new(), current_depth: 0 }
    }

    fn validate(mut self, ast: &CommandList) -> Result<(), Vec<ValidationError>> {
        self.visit_command_list(ast);
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(self.errors)
        }
    }

    fn report(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    fn check_nesting_depth(&mut self, span: Span) {
        if self.config.max_nesting_depth > 0 && self.current_depth > self.config.max_nesting_depth
        {
            self.report(ValidationError::ExcessiveNesting {
                depth: self.current_depth,
                max: self.config.max_nesting_depth,
                span,
            });
        }
    }

    fn has_command_name(cmd: &SimpleCommand) -> bool {
        !cmd.name.parts.is_empty()
    }
}

impl AstVisitor for Validator {
    fn visit_simple_command(&mut self, cmd: &SimpleCommand) {
        for env in &cmd.env {
            if env.name == "IFS" {
                self.report(ValidationError::IfsAssignment { span: cmd.span });
            }
        }
        // A SimpleCommand with no name and only env assignments is a
        // shell-local variable assignment (`FOO=bar`), which is valid and
        // carries no command to validate further.
        self.walk_simple_command(cmd);
    }

    fn visit_pipeline(&mut self, pipeline: &Pipeline) {
        for stage in [pipeline.left.as_ref(), pipeline.right.as_ref()] {
            if let Command::Simple(cmd) = stage {
                if !Self::has_command_name(cmd) {
                    self.report(ValidationError::EmptyPipelineSegment { span: cmd.span });
                }
            }
        }
        self.walk_pipeline(pipeline);
    }

    fn visit_subshell(&mut self, subshell: &Subshell) {
        self.current_depth += 1;
        self.check_nesting_depth(subshell.span);

        if subshell.body.items.is_empty() {
            self.report(ValidationError::EmptySubshell { span: subshell.span });
        }

        self.walk_subshell(subshell);
        self.current_depth -= 1;
    }
}

#[cfg(test)]
#[path = "validation_tests.rs"]
mod tests;
