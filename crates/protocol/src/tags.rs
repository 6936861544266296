//! Graphite tag decomposition of carbon metric names.
//!
//! A dotted name is blown up into ordered, index-labelled tags so that an
//! input like `foo.bar.baz` becomes:
//!
//! ```text
//! __g0__:foo
//! __g1__:bar
//! __g2__:baz
//! ```

use bytes::Bytes;
use once_cell::sync::Lazy;
use thiserror::Error;

use crate::types::Tag;

/// Separator between segments of a carbon metric name.
pub const SEPARATOR: u8 = b'.';

/// Pattern that matches every metric name.
///
/// Compiling it as a regex behaves identically on all inputs; matchers may
/// special-case the token to skip evaluation entirely.
pub const MATCH_ALL_PATTERN: &str = ".*";

/// Number of pre-formatted graphite index labels.
const PRE_FORMATTED_TAG_NAMES: usize = 128;

static TAG_NAMES: Lazy<Vec<Bytes>> = Lazy::new(|| {
    (0..PRE_FORMATTED_TAG_NAMES).map(format_tag_name).collect()
});

/// Canonical graphite label for the k-th name segment (`__g0__`, `__g1__`, ...).
pub fn tag_name(index: usize) -> Bytes {
    match TAG_NAMES.get(index) {
        Some(name) => name.clone(),
        None => format_tag_name(index),
    }
}

fn format_tag_name(index: usize) -> Bytes {
    Bytes::from(format!("__g{index}__").into_bytes())
}

/// Failure to decompose a carbon name into tags.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MalformedNameError {
    #[error("cannot generate tags from empty name")]
    EmptyName,

    #[error("carbon metric {name:?} has duplicate separator")]
    DuplicateSeparator { name: String },
}

/// Decompose `name` into graphite tags, allocating an exact-size result.
pub fn generate_tags(name: &Bytes) -> Result<Vec<Tag>, MalformedNameError> {
    let mut tags = Vec::new();
    generate_tags_into(name, &mut tags)?;
    Ok(tags)
}

/// Decompose `name` into `tags`, reusing the sink's capacity when it already
/// fits the required tag count and replacing it with an exact-size allocation
/// otherwise.
///
/// Tag values are zero-copy slices of `name`. A trailing separator is
/// permitted and produces no extra tag; consecutive separators are rejected.
pub fn generate_tags_into(name: &Bytes, tags: &mut Vec<Tag>) -> Result<(), MalformedNameError> {
    if name.is_empty() {
        return Err(MalformedNameError::EmptyName);
    }

    let required = memchr::memchr_iter(SEPARATOR, name).count() + 1;
    if tags.capacity() >= required {
        tags.clear();
    } else {
        *tags = Vec::with_capacity(required);
    }

    let mut start = 0;
    let mut index = 0;
    for i in 0..name.len() {
        if name[i] != SEPARATOR {
            continue;
        }
        if i + 1 < name.len() && name[i + 1] == SEPARATOR {
            tags.clear();
            return Err(MalformedNameError::DuplicateSeparator {
                name: String::from_utf8_lossy(name).into_owned(),
            });
        }
        tags.push(Tag {
            name: tag_name(index),
            value: name.slice(start..i),
        });
        start = i + 1;
        index += 1;
    }

    // The loop above only emits a tag when it sees a separator, so anything
    // after the final one still needs to go out -- unless the name ends with
    // the separator, in which case there is no trailing segment.
    if name[name.len() - 1] != SEPARATOR {
        tags.push(Tag {
            name: tag_name(index),
            value: name.slice(start..),
        });
    }

    Ok(())
}

#[cfg(test)]
#[path = "tags_test.rs"]
mod tags_test;
