// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn text_trims_exactly_one_trailing_newline() {
    assert_eq!(decode_text(b"hello\n").unwrap(), "hello");
    assert_eq!(decode_text(b"hello\n\n").unwrap(), "hello\n");
    assert_eq!(decode_text(b"hello").unwrap(), "hello");
}

#[test]
fn text_trims_crlf_as_one_newline() {
    assert_eq!(decode_text(b"hello\r\n").unwrap(), "hello");
}

#[test]
fn lines_drops_single_trailing_empty_element() {
    assert_eq!(decode_lines(b"a\nb\nc\n").unwrap(), vec!["a", "b", "c"]);
    assert_eq!(decode_lines(b"a\nb").unwrap(), vec!["a", "b"]);
    assert_eq!(decode_lines(b"").unwrap(), vec![""]);
}

#[test]
fn json_parses_object() {
    let value = decode_json(br#"{ "prop": 5 }"#).unwrap();
    assert_eq!(value["prop"], 5);
}

#[test]
fn json_rejects_invalid_utf8() {
    assert!(decode_json(&[0xff, 0xfe]).is_err());
}
