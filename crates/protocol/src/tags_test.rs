//! Tests for graphite tag decomposition.

use bytes::Bytes;

use crate::tags::{generate_tags, generate_tags_into, tag_name, MalformedNameError};
use crate::types::Tag;

fn tags_of(name: &str) -> Vec<(String, String)> {
    generate_tags(&Bytes::copy_from_slice(name.as_bytes()))
        .unwrap()
        .into_iter()
        .map(|t| {
            (
                String::from_utf8(t.name.to_vec()).unwrap(),
                String::from_utf8(t.value.to_vec()).unwrap(),
            )
        })
        .collect()
}

#[test]
fn test_simple_name() {
    assert_eq!(
        tags_of("foo.bar.baz"),
        vec![
            ("__g0__".to_string(), "foo".to_string()),
            ("__g1__".to_string(), "bar".to_string()),
            ("__g2__".to_string(), "baz".to_string()),
        ]
    );
}

#[test]
fn test_single_segment() {
    assert_eq!(tags_of("foo"), vec![("__g0__".to_string(), "foo".to_string())]);
}

#[test]
fn test_trailing_separator_produces_no_extra_tag() {
    assert_eq!(
        tags_of("foo.bar."),
        vec![
            ("__g0__".to_string(), "foo".to_string()),
            ("__g1__".to_string(), "bar".to_string()),
        ]
    );
}

#[test]
fn test_tag_count_matches_dot_count() {
    for (name, expected) in [
        ("a", 1),
        ("a.b", 2),
        ("a.b.c.d.e", 5),
        ("a.b.c.", 3),
        ("sys.cpu.load", 3),
    ] {
        let tags = generate_tags(&Bytes::copy_from_slice(name.as_bytes())).unwrap();
        assert_eq!(tags.len(), expected, "name: {name}");
    }
}

#[test]
fn test_empty_name() {
    assert_eq!(
        generate_tags(&Bytes::new()),
        Err(MalformedNameError::EmptyName)
    );
}

#[test]
fn test_duplicate_separator() {
    let err = generate_tags(&Bytes::from_static(b"foo..bar")).unwrap_err();
    match err {
        MalformedNameError::DuplicateSeparator { name } => assert_eq!(name, "foo..bar"),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn test_duplicate_separator_anywhere() {
    for name in ["..", "a..b", "a.b..", "..a"] {
        assert!(
            matches!(
                generate_tags(&Bytes::copy_from_slice(name.as_bytes())),
                Err(MalformedNameError::DuplicateSeparator { .. })
            ),
            "name: {name}"
        );
    }
}

#[test]
fn test_values_are_zero_copy_slices() {
    let name = Bytes::from_static(b"foo.bar");
    let tags = generate_tags(&name).unwrap();
    // Slices share storage with the source name.
    assert_eq!(tags[0].value.as_ptr(), name.as_ptr());
}

#[test]
fn test_sink_reuse_when_capacity_fits() {
    let mut tags: Vec<Tag> = Vec::with_capacity(8);
    let ptr = tags.as_ptr();

    generate_tags_into(&Bytes::from_static(b"a.b.c"), &mut tags).unwrap();
    assert_eq!(tags.len(), 3);
    assert_eq!(tags.as_ptr(), ptr, "sink should be reused, not reallocated");
}

#[test]
fn test_sink_replaced_when_capacity_too_small() {
    let mut tags: Vec<Tag> = Vec::with_capacity(1);
    generate_tags_into(&Bytes::from_static(b"a.b.c.d"), &mut tags).unwrap();
    assert_eq!(tags.len(), 4);
    assert_eq!(tags.capacity(), 4, "fresh sink is sized to the exact count");
}

#[test]
fn test_sink_cleared_on_error() {
    let mut tags: Vec<Tag> = Vec::with_capacity(8);
    generate_tags_into(&Bytes::from_static(b"a.b"), &mut tags).unwrap();
    assert_eq!(tags.len(), 2);

    assert!(generate_tags_into(&Bytes::from_static(b"a..b"), &mut tags).is_err());
    assert!(tags.is_empty());
}

#[test]
fn test_tag_name_table() {
    assert_eq!(&tag_name(0)[..], b"__g0__");
    assert_eq!(&tag_name(9)[..], b"__g9__");
    assert_eq!(&tag_name(127)[..], b"__g127__");
    // Indices past the pre-formatted table still format correctly.
    assert_eq!(&tag_name(500)[..], b"__g500__");
}
