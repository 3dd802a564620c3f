// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! I/O plumbing: stdio endpoints, byte-stream wiring, and the decoders used
//! by `CommandResult::text()`/`lines()`/`json()`/`bytes()`.

use std::pin::Pin;

use tokio::io::AsyncRead;

/// How a child's stdin should be sourced.
pub enum InputEndpoint {
    /// Inherit the parent's stdin.
    Inherit,
    /// Provide no input; the child sees immediate EOF.
    Null,
    /// Feed a fixed in-memory buffer, then EOF.
    Bytes(Vec<u8>),
    /// Feed from an arbitrary async byte source, then EOF.
    Reader(Pin<Box<dyn AsyncRead + Send>>),
}

impl Default for InputEndpoint {
    fn default() -> Self {
        InputEndpoint::Inherit
    }
}

/// Bytes captured for one stdio stream of a completed execution.
#[derive(Debug, Default, Clone)]
pub struct CapturedBytes {
    pub stdout: Option<Vec<u8>>,
    pub stderr: Option<Vec<u8>>,
    pub combined: Option<Vec<u8>>,
}

/// Errors from decoding captured bytes.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("captured output is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),
    #[error("failed to parse captured output as JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("stream was not captured (stdout mode must be `piped` or `inheritPiped`)")]
    NotCaptured,
}

/// Decode captured bytes as UTF-8 text, trimming exactly one trailing
/// newline if present (never more).
pub fn decode_text(bytes: &[u8]) -> Result<String, DecodeError> {
    let mut s = String::from_utf8(bytes.to_vec())?;
    if s.ends_with('\n') {
        s.pop();
        if s.ends_with('\r') {
            s.pop();
        }
    }
    Ok(s)
}

/// Split captured bytes into lines on `\n`, dropping a single trailing empty
/// element produced by a final newline.
pub fn decode_lines(bytes: &[u8]) -> Result<Vec<String>, DecodeError> {
    let s = String::from_utf8(bytes.to_vec())?;
    let mut lines: Vec<String> = s.split('\n').map(str::to_string).collect();
    if lines.last().is_some_and(String::is_empty) {
        lines.pop();
    }
    Ok(lines)
}

/// Decode captured bytes as UTF-8 then parse as JSON.
pub fn decode_json(bytes: &[u8]) -> Result<serde_json::Value, DecodeError> {
    let s = String::from_utf8(bytes.to_vec())?;
    Ok(serde_json::from_str(&s)?)
}

#[cfg(test)]
#[path = "io_tests.rs"]
mod tests;
