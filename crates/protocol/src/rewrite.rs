//! Configured rewriting of carbon names ahead of rule matching.

use bytes::{BufMut, BytesMut};
use serde::Deserialize;

use crate::tags::SEPARATOR;

/// Rewrite applied to incoming metric names before matching.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RewriteConfig {
    /// Normalize graphite-illegal characters instead of copying verbatim.
    pub cleanup: bool,
}

/// True for bytes graphite accepts inside a name segment.
pub fn is_segment_byte_valid(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b':' | b'#')
}

/// Copy `src` into `dst`, applying the configured rewrite.
///
/// With cleanup enabled, leading separators are stripped, consecutive
/// separators are collapsed, and illegal segment bytes become `_`, so the
/// result always survives tag generation. With cleanup disabled, `src` is
/// copied verbatim.
pub fn copy_and_rewrite(dst: &mut BytesMut, src: &[u8], cfg: &RewriteConfig) {
    dst.clear();

    if !cfg.cleanup {
        dst.extend_from_slice(src);
        return;
    }

    dst.reserve(src.len());
    let mut leading = true;
    let mut dots = 0usize;
    for &b in src {
        if b == SEPARATOR {
            dots += 1;
        } else {
            dots = 0;
            leading = false;
        }

        if leading || dots > 1 {
            continue;
        }

        if b != SEPARATOR && !is_segment_byte_valid(b) {
            dst.put_u8(b'_');
        } else {
            dst.put_u8(b);
        }
    }
}

#[cfg(test)]
#[path = "rewrite_test.rs"]
mod rewrite_test;
