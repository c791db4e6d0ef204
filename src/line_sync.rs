//! Line-sync utility: newline counting and padding.
//!
//! Every rewritten region is padded with trailing newlines until it spans
//! as many lines as the source text it replaces. This keeps every
//! downstream source position on its original line number in the output,
//! which is the crate's substitute for source maps.

use memchr::memchr_iter;

/// Count the line breaks in a string. `\r\n` counts once; lone `\r`,
/// U+2028, and U+2029 also count.
pub fn count_newlines(s: &str) -> u32 {
    let bytes = s.as_bytes();
    let mut count = memchr_iter(b'\n', bytes).count() as u32;
    // Lone carriage returns (not followed by \n)
    for pos in memchr_iter(b'\r', bytes) {
        if bytes.get(pos + 1) != Some(&b'\n') {
            count += 1;
        }
    }
    // U+2028 / U+2029 are 0xE2 0x80 0xA8/0xA9 in UTF-8
    for pos in memchr_iter(0xE2, bytes) {
        if bytes.get(pos + 1) == Some(&0x80)
            && matches!(bytes.get(pos + 2), Some(&0xA8) | Some(&0xA9))
        {
            count += 1;
        }
    }
    count
}

/// Pad `text` with trailing newlines until it contains at least `height`
/// line breaks. Text that already spans enough lines is unchanged.
pub fn preserve_newlines(mut text: String, height: u32) -> String {
    let have = count_newlines(&text);
    if have < height {
        text.reserve((height - have) as usize);
        for _ in have..height {
            text.push('\n');
        }
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_count_newlines() {
        assert_eq!(count_newlines(""), 0);
        assert_eq!(count_newlines("a\nb\nc"), 2);
        assert_eq!(count_newlines("a\r\nb"), 1);
        assert_eq!(count_newlines("a\rb"), 1);
        assert_eq!(count_newlines("a\u{2028}b\u{2029}c"), 2);
    }

    #[test]
    fn test_preserve_newlines_pads() {
        assert_eq!(preserve_newlines("x".to_string(), 2), "x\n\n");
        assert_eq!(preserve_newlines("x\ny".to_string(), 1), "x\ny");
        assert_eq!(preserve_newlines("x\ny".to_string(), 0), "x\ny");
    }

    #[test]
    fn test_preserve_newlines_counts_crlf_once() {
        assert_eq!(preserve_newlines("a\r\nb".to_string(), 2), "a\r\nb\n");
    }
}
