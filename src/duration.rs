// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Duration grammar accepted by `timeout`, `sleep`, and retry-delay inputs,
//! plus the human-readable formatter used in diagnostic messages.

use std::time::Duration;

use thiserror::Error;

/// Error parsing a duration expression.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("invalid duration `{input}`: expected an integer (ms) or a string like `1.5s`, `10ms`, `2m`, `1h`")]
pub struct DurationParseError {
    input: String,
}

/// Anything that can supply a number of milliseconds: a bare integer
/// (milliseconds), a duration string (`"1.5s"`, `"10ms"`, `"2m"`, `"1h"`), or
/// a caller-supplied backoff iterator via [`DurationSource`].
pub trait DurationSource {
    /// Return the next delay, in milliseconds.
    fn next_ms(&mut self) -> u64;
}

impl DurationSource for u64 {
    fn next_ms(&mut self) -> u64 {
        *self
    }
}

/// Parse the §6 duration grammar into milliseconds.
///
/// Accepts a bare integer (interpreted as milliseconds) or a string matching
/// `^\d+(\.\d+)?(ms|s|m|h)$`.
pub fn parse_duration_ms(input: &str) -> Result<u64, DurationParseError> {
    let err = || DurationParseError {
        input: input.to_string(),
    };

    let trimmed = input.trim();
    let unit_start = trimmed
        .find(|c: char| !c.is_ascii_digit() && c != '.')
        .ok_or_else(err)?;
    let (number, unit) = trimmed.split_at(unit_start);

    if number.is_empty() {
        return Err(err());
    }
    let value: f64 = number.parse().map_err(|_| err())?;
    if value < 0.0 {
        return Err(err());
    }

    let multiplier = match unit {
        "ms" => 1.0,
        "s" => 1_000.0,
        "m" => 60_000.0,
        "h" => 3_600_000.0,
        _ => return Err(err()),
    };

    Ok((value * multiplier).round() as u64)
}

/// Convenience wrapper returning a [`Duration`] instead of raw milliseconds.
pub fn parse_duration(input: &str) -> Result<Duration, DurationParseError> {
    parse_duration_ms(input).map(Duration::from_millis)
}

/// A duration specification as accepted by the builder's `timeout()`, the
/// `sleep` built-in, and retry-delay configuration: an integer number of
/// milliseconds, a duration string, or a caller-supplied backoff source.
pub enum DurationSpec {
    Millis(u64),
    Text(String),
    Source(Box<dyn DurationSource + Send>),
}

impl DurationSpec {
    /// Resolve this spec to a concrete millisecond value.
    pub fn resolve_ms(&mut self) -> Result<u64, DurationParseError> {
        match self {
            DurationSpec::Millis(ms) => Ok(*ms),
            DurationSpec::Text(s) => parse_duration_ms(s),
            DurationSpec::Source(source) => Ok(source.next_ms()),
        }
    }
}

impl From<u64> for DurationSpec {
    fn from(ms: u64) -> Self {
        DurationSpec::Millis(ms)
    }
}

impl From<&str> for DurationSpec {
    fn from(s: &str) -> Self {
        DurationSpec::Text(s.to_string())
    }
}

impl From<String> for DurationSpec {
    fn from(s: String) -> Self {
        DurationSpec::Text(s)
    }
}

/// Render a millisecond count the way diagnostic messages do: `"N
/// milliseconds"`, `"N second(s)"`, singular/plural, one decimal place for
/// fractional seconds.
pub fn format_duration_ms(ms: u64) -> String {
    if ms < 1_000 {
        return format!("{ms} millisecond{}", if ms == 1 { "" } else { "s" });
    }

    let seconds = ms as f64 / 1_000.0;
    let rounded_tenths = (seconds * 10.0).round() / 10.0;

    // Whole seconds print without a decimal point; fractional seconds get
    // exactly one digit of precision.
    if (rounded_tenths.fract()).abs() < f64::EPSILON {
        let whole = rounded_tenths as u64;
        format!("{whole} second{}", if whole == 1 { "" } else { "s" })
    } else {
        format!("{rounded_tenths:.1} seconds")
    }
}

#[cfg(test)]
#[path = "duration_tests.rs"]
mod tests;
