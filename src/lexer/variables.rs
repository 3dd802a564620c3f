// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Variable parsing ($VAR, ${VAR}, $?, $$, $#, $0).

use super::{Lexer, LexerError};
use crate::token::{self, Span, Token, TokenKind};

impl Lexer<'_> {
    /// Lex a variable reference (`$VAR` or `${VAR}`) or command substitution (`$(cmd)`).
    ///
    /// Called when peek() has confirmed the next char is '$'.
    pub(super) fn lex_variable(&mut self, start: usize) -> Result<Token, LexerError> {
        self.chars.next(); // consume $

        let Some(&(name_start, ch)) = self.chars.peek() else {
            return Err(LexerError::EmptyVariable {
                span: Span::new(start, start + 1),
            });
        };

        match ch {
            '(' => self.lex_dollar_substitution(start),
            '{' => self.lex_braced_variable(start),
            // Handle special single-character variables: $?, $$, $#, $0
            '?' | '$' | '#' | '0' => {
                self.chars.next(); // consume the special char
                Ok(Token::new(
                    TokenKind::Variable {
                        name: ch.to_string(),
                    },
                    Span::new(start, name_start + 1),
                ))
            }
            _ => {
                // Check for empty variable ($ followed by non-name char)
                if !Self::is_valid_variable_start(ch) {
                    return Err(LexerError::EmptyVariable {
                        span: Span::new(start, start + 1),
                    });
                }
                self.lex_simple_variable(start, name_start)
            }
        }
    }

    /// Lex a simple variable reference (`$VAR`).
    fn lex_simple_variable(
        &mut self,
        start: usize,
        name_start: usize,
    ) -> Result<Token, LexerError> {
        let name = self.scan_variable_name(name_start);
        let end = name_start + name.len();
        Ok(Token::new(TokenKind::Variable { name }, Span::new(start, end)))
    }

    /// Lex a braced variable reference (`${VAR}`).
    fn lex_braced_variable(&mut self, start: usize) -> Result<Token, LexerError> {
        self.chars.next(); // consume {

        let name = self.parse_braced_variable(start)?;
        Ok(Token::new(
            TokenKind::Variable { name },
            Span::new(start, self.current_position()),
        ))
    }

    /// Scan a variable name, consuming valid characters.
    ///
    /// Returns the variable name as a string.
    pub(super) fn scan_variable_name(&mut self, start: usize) -> String {
        let mut end = start;

        while let Some(&(pos, ch)) = self.chars.peek() {
            if !Self::is_valid_variable_char(ch) {
                break;
            }
            end = pos + ch.len_utf8();
            self.chars.next();
        }

        self.input[start..end].to_string()
    }

    /// Parse braced variable internals (name only; no modifiers).
    ///
    /// Called after `${` has been consumed. Consumes through the closing `}`.
    pub(super) fn parse_braced_variable(&mut self, start: usize) -> Result<String, LexerError> {
        let Some(&(name_start, first_ch)) = self.chars.peek() else {
            return Err(LexerError::UnterminatedVariable {
                span: Span::new(start, start + 2),
            });
        };

        // Check for empty ${} case
        if first_ch == '}' {
            self.chars.next();
            return Err(LexerError::EmptyVariable {
                span: Span::new(start, start + 3),
            });
        }

        // Check for special variable names: ${?}, ${$}, ${#}, ${0}
        if token::is_special_variable(first_ch) {
            self.chars.next(); // consume special char
            let name = first_ch.to_string();
            let name_end = name_start + first_ch.len_utf8();

            return match self.chars.peek() {
                Some(&(_, '}')) => {
                    self.chars.next();
                    Ok(name)
                }
                _ => Err(LexerError::UnterminatedVariable {
                    span: Span::new(start, name_end),
                }),
            };
        }

        // Check for invalid variable name start
        if !Self::is_valid_variable_start(first_ch) {
            return Err(LexerError::InvalidVariableName {
                name: first_ch.to_string(),
                span: Span::new(name_start, name_start + first_ch.len_utf8()),
            });
        }

        // Scan variable name
        let name = self.scan_variable_name(name_start);
        let name_end = name_start + name.len();

        match self.chars.peek() {
            Some(&(_, '}')) => {
                self.chars.next();
                Ok(name)
            }
            _ => Err(LexerError::UnterminatedVariable {
                span: Span::new(start, name_end),
            }),
        }
    }

    /// Check if a character is a valid start for a variable name.
    pub(super) fn is_valid_variable_start(ch: char) -> bool {
        token::is_valid_variable_start(ch)
    }

    /// Check if a character is valid within a variable name.
    pub(super) fn is_valid_variable_char(ch: char) -> bool {
        token::is_valid_variable_char(ch)
    }
}
