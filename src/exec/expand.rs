// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Word expansion: variable substitution and command substitution.
//!
//! A [`Word`] always expands to exactly one argv element — the mini-language
//! does not field-split unquoted expansions, unlike a POSIX shell.

use std::future::Future;
use std::pin::Pin;

use crate::ast::{SubstitutionBody, Word, WordPart};

use super::error::ExecError;
use super::run;
use super::ExecutionContext;

/// Expand a word to its single final argv string.
///
/// Boxed to support the recursion that command substitution introduces
/// (`$(...)` re-enters full command-list evaluation).
pub(crate) fn expand_word<'a>(
    ctx: &'a mut ExecutionContext,
    word: &'a Word,
) -> Pin<Box<dyn Future<Output = Result<String, ExecError>> + Send + 'a>> {
    Box::pin(async move {
        let mut out = String::new();
        for part in &word.parts {
            out.push_str(&expand_part(ctx, part).await?);
        }
        Ok(out)
    })
}

async fn expand_part(ctx: &mut ExecutionContext, part: &WordPart) -> Result<String, ExecError> {
    match part {
        WordPart::Literal { value, .. } => Ok(value.clone()),
        WordPart::Variable { name } => Ok(lookup_variable(ctx, name)),
        WordPart::CommandSubstitution { body, .. } => expand_substitution(ctx, body).await,
    }
}

/// `$NAME`/`${NAME}`: shell-local variables shadow exported env; an
/// undefined name expands to the empty string rather than erroring.
fn lookup_variable(ctx: &ExecutionContext, name: &str) -> String {
    ctx.variables
        .get(name)
        .or_else(|| ctx.env.get(name))
        .cloned()
        .unwrap_or_default()
}

async fn expand_substitution(ctx: &mut ExecutionContext, body: &SubstitutionBody) -> Result<String, ExecError> {
    let list = match body {
        SubstitutionBody::Parsed(list) => list,
        SubstitutionBody::Unparsed(source) => {
            return Err(ExecError::UnparsedSubstitution(source.clone()));
        }
    };

    let captured = run::execute_command_list_capture(ctx, list).await?;
    Ok(trim_all_trailing_newlines(&captured))
}

fn trim_all_trailing_newlines(s: &str) -> String {
    s.trim_end_matches(['\n', '\r']).to_string()
}

#[cfg(test)]
#[path = "expand_tests.rs"]
mod tests;
