// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[yare::parameterized(
    milliseconds = { "10ms", 10 },
    fractional_seconds = { "1.5s", 1500 },
    whole_seconds = { "2s", 2000 },
    minutes = { "2m", 120_000 },
    hours = { "1h", 3_600_000 },
)]
fn parses_duration_strings(input: &str, expected_ms: u64) {
    assert_eq!(parse_duration_ms(input).unwrap(), expected_ms);
}

#[test]
fn bare_integer_is_milliseconds() {
    let mut spec = DurationSpec::from(10u64);
    assert_eq!(spec.resolve_ms().unwrap(), 10);
}

#[test]
fn rejects_garbage() {
    assert!(parse_duration_ms("banana").is_err());
    assert!(parse_duration_ms("10x").is_err());
    assert!(parse_duration_ms("-5s").is_err());
}

#[test]
fn iterator_source_delegates_to_next() {
    struct Backoff(Vec<u64>);
    impl DurationSource for Backoff {
        fn next_ms(&mut self) -> u64 {
            if self.0.is_empty() {
                0
            } else {
                self.0.remove(0)
            }
        }
    }
    let mut spec = DurationSpec::Source(Box::new(Backoff(vec![100, 200])));
    assert_eq!(spec.resolve_ms().unwrap(), 100);
    assert_eq!(spec.resolve_ms().unwrap(), 200);
}

#[yare::parameterized(
    one_ms = { 1, "1 millisecond" },
    many_ms = { 500, "500 milliseconds" },
    one_second = { 1000, "1 second" },
    fractional = { 1500, "1.5 seconds" },
    two_seconds = { 2000, "2 seconds" },
)]
fn formats_durations(ms: u64, expected: &str) {
    assert_eq!(format_duration_ms(ms), expected);
}
