// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Redirection operator lexing.

use super::{Lexer, LexerError};
use crate::token::{DupTarget, Span, Token, TokenKind};

impl Lexer<'_> {
    /// Calculate byte length of a file descriptor when rendered as a string.
    fn fd_prefix_len(fd: Option<u32>) -> usize {
        fd.map(|f| f.to_string().len()).unwrap_or(0)
    }

    /// Lex output redirection `>`, `>>`, or `>&`.
    ///
    /// Called when peek() has confirmed the next char is '>'.
    pub(super) fn lex_redirect_out(
        &mut self,
        start: usize,
        fd: Option<u32>,
    ) -> Result<Token, LexerError> {
        self.chars.next(); // consume >
        let fd_len = Self::fd_prefix_len(fd);

        match self.peek_char() {
            Some('>') => {
                self.chars.next();
                Ok(Token::new(
                    TokenKind::RedirectAppend { fd },
                    Span::new(start, start + fd_len + 2),
                ))
            }
            Some('&') => {
                self.chars.next();
                self.lex_dup_target(start, fd.unwrap_or(1), true, fd_len + 2)
            }
            _ => Ok(Token::new(
                TokenKind::RedirectOut { fd },
                Span::new(start, start + fd_len + 1),
            )),
        }
    }

    /// Lex input redirection `<` or `<&`.
    ///
    /// Called when peek() has confirmed the next char is '<'.
    pub(super) fn lex_redirect_in(
        &mut self,
        start: usize,
        fd: Option<u32>,
    ) -> Result<Token, LexerError> {
        self.chars.next(); // consume <
        let fd_len = Self::fd_prefix_len(fd);

        match self.peek_char() {
            Some('&') => {
                self.chars.next();
                self.lex_dup_target(start, fd.unwrap_or(0), false, fd_len + 2)
            }
            _ => Ok(Token::new(
                TokenKind::RedirectIn { fd },
                Span::new(start, start + fd_len + 1),
            )),
        }
    }

    /// Lex the target of a file descriptor duplication (`>&n`, `<&n`, `>&-`, `<&-`).
    fn lex_dup_target(
        &mut self,
        start: usize,
        source: u32,
        output: bool,
        prefix_len: usize,
    ) -> Result<Token, LexerError> {
        let target_start = self
            .chars
            .peek()
            .map(|(pos, _)| *pos)
            .unwrap_or(start + prefix_len);

        if self.peek_char() == Some('-') {
            self.chars.next();
            return Ok(Token::new(
                TokenKind::DuplicateFd {
                    source,
                    target: DupTarget::Close,
                    output,
                },
                Span::new(start, target_start + 1),
            ));
        }

        // Read target file descriptor number
        let mut end = target_start;
        while let Some(&(pos, ch)) = self.chars.peek() {
            if !ch.is_ascii_digit() {
                break;
            }
            end = pos + 1;
            self.chars.next();
        }

        if end == target_start {
            return Err(LexerError::InvalidRedirection {
                message: "expected file descriptor after >&".to_string(),
                span: Span::new(start, target_start),
            });
        }

        let target_fd: u32 =
            self.input[target_start..end]
                .parse()
                .map_err(|_| LexerError::InvalidRedirection {
                    message: "invalid file descriptor".to_string(),
                    span: Span::new(target_start, end),
                })?;

        Ok(Token::new(
            TokenKind::DuplicateFd {
                source,
                target: DupTarget::Fd(target_fd),
                output,
            },
            Span::new(start, end),
        ))
    }
}
