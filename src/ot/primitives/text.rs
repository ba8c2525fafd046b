// model = "claude-opus-4-5"
// created = "2026-10-19"
// modified = "2026-10-19"
// driver = "Isaac Clayton"

//! Char-indexed helpers over `str`.
//!
//! Operation positions count Unicode scalar values, so every splice has to
//! translate a char index into a byte offset before touching the `String`.

use std::ops::Range;

/// Number of chars in `text`.
#[inline]
pub fn char_len(text: &str) -> usize {
    return text.chars().count();
}

/// Byte offset of the char at `index`, or `text.len()` when `index` is the
/// end of the string. Returns `None` past the end.
pub fn byte_offset(text: &str, index: usize) -> Option<usize> {
    if index == 0 {
        return Some(0);
    }
    let mut seen = 0;
    for (offset, _) in text.char_indices() {
        if seen == index {
            return Some(offset);
        }
        seen += 1;
    }
    if seen == index {
        return Some(text.len());
    }
    return None;
}

/// Byte range of the chars `[start, start + len)`, or `None` if out of bounds.
pub fn byte_range(text: &str, start: usize, len: usize) -> Option<Range<usize>> {
    let from = byte_offset(text, start)?;
    let to = from + byte_offset(&text[from..], len)?;
    return Some(from..to);
}

/// The chars in `[start, start + len)`, or `None` if the range is out of bounds.
pub fn char_slice(text: &str, start: usize, len: usize) -> Option<&str> {
    return byte_range(text, start, len).map(|range| &text[range]);
}
