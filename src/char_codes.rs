//! Character codes and classification predicates used by the scanner.
//!
//! Constants are given as u32 character codes so the scanner can mix ASCII
//! byte values and decoded non-ASCII code points in the same match arms.

#![allow(dead_code)] // The table is intentionally complete for the full dialect

/// Character codes used throughout the scanner.
pub struct CharacterCodes;

impl CharacterCodes {
    // Line terminators
    pub const LINE_FEED: u32 = 0x0A; // \n
    pub const CARRIAGE_RETURN: u32 = 0x0D; // \r
    pub const LINE_SEPARATOR: u32 = 0x2028;
    pub const PARAGRAPH_SEPARATOR: u32 = 0x2029;

    // Whitespace
    pub const SPACE: u32 = 0x0020;
    pub const TAB: u32 = 0x09;
    pub const VERTICAL_TAB: u32 = 0x0B;
    pub const FORM_FEED: u32 = 0x0C;
    pub const NON_BREAKING_SPACE: u32 = 0x00A0;
    pub const BYTE_ORDER_MARK: u32 = 0xFEFF;

    // Digits
    pub const _0: u32 = 0x30;
    pub const _7: u32 = 0x37;
    pub const _9: u32 = 0x39;

    // Letters used in prefixes and escapes
    pub const UPPER_B: u32 = 0x42;
    pub const UPPER_E: u32 = 0x45;
    pub const UPPER_O: u32 = 0x4F;
    pub const UPPER_X: u32 = 0x58;
    pub const LOWER_B: u32 = 0x62;
    pub const LOWER_E: u32 = 0x65;
    pub const LOWER_F: u32 = 0x66;
    pub const LOWER_N: u32 = 0x6E;
    pub const LOWER_O: u32 = 0x6F;
    pub const LOWER_R: u32 = 0x72;
    pub const LOWER_T: u32 = 0x74;
    pub const LOWER_U: u32 = 0x75;
    pub const LOWER_V: u32 = 0x76;
    pub const LOWER_X: u32 = 0x78;

    // Punctuation and operators
    pub const EXCLAMATION: u32 = 0x21; // !
    pub const DOUBLE_QUOTE: u32 = 0x22; // "
    pub const HASH: u32 = 0x23; // #
    pub const DOLLAR: u32 = 0x24; // $
    pub const PERCENT: u32 = 0x25; // %
    pub const AMPERSAND: u32 = 0x26; // &
    pub const SINGLE_QUOTE: u32 = 0x27; // '
    pub const OPEN_PAREN: u32 = 0x28; // (
    pub const CLOSE_PAREN: u32 = 0x29; // )
    pub const ASTERISK: u32 = 0x2A; // *
    pub const PLUS: u32 = 0x2B; // +
    pub const COMMA: u32 = 0x2C; // ,
    pub const MINUS: u32 = 0x2D; // -
    pub const DOT: u32 = 0x2E; // .
    pub const SLASH: u32 = 0x2F; // /
    pub const COLON: u32 = 0x3A; // :
    pub const SEMICOLON: u32 = 0x3B; // ;
    pub const LESS_THAN: u32 = 0x3C; // <
    pub const EQUALS: u32 = 0x3D; // =
    pub const GREATER_THAN: u32 = 0x3E; // >
    pub const QUESTION: u32 = 0x3F; // ?
    pub const OPEN_BRACKET: u32 = 0x5B; // [
    pub const BACKSLASH: u32 = 0x5C; // \
    pub const CLOSE_BRACKET: u32 = 0x5D; // ]
    pub const CARET: u32 = 0x5E; // ^
    pub const UNDERSCORE: u32 = 0x5F; // _
    pub const BACKTICK: u32 = 0x60; // `
    pub const OPEN_BRACE: u32 = 0x7B; // {
    pub const BAR: u32 = 0x7C; // |
    pub const CLOSE_BRACE: u32 = 0x7D; // }
    pub const TILDE: u32 = 0x7E; // ~
}

// =============================================================================
// Classification Predicates
// =============================================================================

/// Check if a character code is a decimal digit.
#[inline]
pub fn is_digit(ch: u32) -> bool {
    (CharacterCodes::_0..=CharacterCodes::_9).contains(&ch)
}

/// Check if a character code is an octal digit.
#[inline]
pub fn is_octal_digit(ch: u32) -> bool {
    (CharacterCodes::_0..=CharacterCodes::_7).contains(&ch)
}

/// Check if a character code is a hexadecimal digit.
#[inline]
pub fn is_hex_digit(ch: u32) -> bool {
    is_digit(ch) || (0x41..=0x46).contains(&ch) || (0x61..=0x66).contains(&ch)
}

/// Numeric value of a hexadecimal digit character code.
#[inline]
pub fn hex_value(ch: u32) -> u32 {
    match ch {
        0x30..=0x39 => ch - 0x30,
        0x41..=0x46 => ch - 0x41 + 10,
        0x61..=0x66 => ch - 0x61 + 10,
        _ => 0,
    }
}

/// Check if a character code is a line terminator.
#[inline]
pub fn is_line_terminator(ch: u32) -> bool {
    matches!(
        ch,
        CharacterCodes::LINE_FEED
            | CharacterCodes::CARRIAGE_RETURN
            | CharacterCodes::LINE_SEPARATOR
            | CharacterCodes::PARAGRAPH_SEPARATOR
    )
}

/// Check if a character code is single-line whitespace (no line terminators).
#[inline]
pub fn is_white_space_single_line(ch: u32) -> bool {
    matches!(
        ch,
        CharacterCodes::SPACE
            | CharacterCodes::TAB
            | CharacterCodes::VERTICAL_TAB
            | CharacterCodes::FORM_FEED
            | CharacterCodes::NON_BREAKING_SPACE
            | CharacterCodes::BYTE_ORDER_MARK
    ) || (ch > 0x7F && char::from_u32(ch).is_some_and(|c| c.is_whitespace() && !is_line_terminator(ch)))
}

/// Check if a character code can start an identifier.
///
/// ASCII letters, `$` and `_` take the fast path; non-ASCII code points
/// fall back to Unicode alphabetic classification.
#[inline]
pub fn is_identifier_start(ch: u32) -> bool {
    (0x41..=0x5A).contains(&ch)
        || (0x61..=0x7A).contains(&ch)
        || ch == CharacterCodes::DOLLAR
        || ch == CharacterCodes::UNDERSCORE
        || (ch > 0x7F && char::from_u32(ch).is_some_and(char::is_alphabetic))
}

/// Check if a character code can continue an identifier.
#[inline]
pub fn is_identifier_part(ch: u32) -> bool {
    is_identifier_start(ch)
        || is_digit(ch)
        || ch == 0x200C // zero-width non-joiner
        || ch == 0x200D // zero-width joiner
        || (ch > 0x7F && char::from_u32(ch).is_some_and(char::is_alphanumeric))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_digit_classification() {
        assert!(is_digit('0' as u32));
        assert!(is_digit('9' as u32));
        assert!(!is_digit('a' as u32));
        assert!(is_octal_digit('7' as u32));
        assert!(!is_octal_digit('8' as u32));
        assert!(is_hex_digit('f' as u32));
        assert!(is_hex_digit('F' as u32));
        assert!(!is_hex_digit('g' as u32));
        assert_eq!(hex_value('a' as u32), 10);
        assert_eq!(hex_value('F' as u32), 15);
    }

    #[test]
    fn test_identifier_classification() {
        assert!(is_identifier_start('a' as u32));
        assert!(is_identifier_start('$' as u32));
        assert!(is_identifier_start('_' as u32));
        assert!(!is_identifier_start('1' as u32));
        assert!(is_identifier_part('1' as u32));
        assert!(is_identifier_start(0x00E9)); // é
        assert!(!is_identifier_start('-' as u32));
    }

    #[test]
    fn test_line_terminators() {
        assert!(is_line_terminator(CharacterCodes::LINE_FEED));
        assert!(is_line_terminator(CharacterCodes::LINE_SEPARATOR));
        assert!(is_line_terminator(CharacterCodes::PARAGRAPH_SEPARATOR));
        assert!(!is_line_terminator(CharacterCodes::SPACE));
    }
}
