//! Tests for carbon name rewriting.

use bytes::BytesMut;

use crate::rewrite::{copy_and_rewrite, is_segment_byte_valid, RewriteConfig};

fn rewrite(src: &str, cleanup: bool) -> String {
    let mut dst = BytesMut::new();
    copy_and_rewrite(&mut dst, src.as_bytes(), &RewriteConfig { cleanup });
    String::from_utf8(dst.to_vec()).unwrap()
}

#[test]
fn test_verbatim_without_cleanup() {
    assert_eq!(rewrite("foo..bar$$", false), "foo..bar$$");
    assert_eq!(rewrite("", false), "");
}

#[test]
fn test_cleanup_passes_valid_names_through() {
    assert_eq!(rewrite("foo.bar.baz", true), "foo.bar.baz");
    assert_eq!(rewrite("sys.cpu-0.load_avg:1m", true), "sys.cpu-0.load_avg:1m");
}

#[test]
fn test_cleanup_replaces_illegal_bytes() {
    assert_eq!(rewrite("foo$.ba r", true), "foo_.ba_r");
    assert_eq!(rewrite("a@b.c/d", true), "a_b.c_d");
}

#[test]
fn test_cleanup_collapses_consecutive_separators() {
    assert_eq!(rewrite("foo..bar", true), "foo.bar");
    assert_eq!(rewrite("foo...bar", true), "foo.bar");
}

#[test]
fn test_cleanup_strips_leading_separators() {
    assert_eq!(rewrite(".foo.bar", true), "foo.bar");
    assert_eq!(rewrite("..foo", true), "foo");
}

#[test]
fn test_cleanup_keeps_single_trailing_separator() {
    // Tag generation accepts a trailing separator, so cleanup does not need
    // to strip it.
    assert_eq!(rewrite("foo.bar.", true), "foo.bar.");
    assert_eq!(rewrite("foo.bar..", true), "foo.bar.");
}

#[test]
fn test_destination_is_truncated_first() {
    let mut dst = BytesMut::from(&b"previous-contents"[..]);
    copy_and_rewrite(&mut dst, b"foo", &RewriteConfig::default());
    assert_eq!(&dst[..], b"foo");
}

#[test]
fn test_valid_byte_table() {
    for b in [b'a', b'Z', b'0', b'9', b'-', b'_', b':', b'#'] {
        assert!(is_segment_byte_valid(b), "{}", b as char);
    }
    for b in [b' ', b'$', b'@', b'/', b'\\', b'.', 0u8, 0xff] {
        assert!(!is_segment_byte_valid(b), "{}", b as char);
    }
}
