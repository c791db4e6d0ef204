//! Scanner implementation - the lexical analyzer.
//!
//! The scanner works directly over UTF-8 bytes with an ASCII fast path.
//! All positions are byte offsets. Context-sensitive decisions (regex vs.
//! division, template continuation, reserved word vs. name) are driven by
//! the [`ScanContext`] the parser passes to [`Scanner::advance`].
//!
//! The scanner never fails: malformed input produces `Illegal` tokens
//! carrying error text, and the parser turns those into syntax errors.

use crate::char_codes::{
    CharacterCodes, hex_value, is_digit, is_hex_digit, is_identifier_part, is_identifier_start,
    is_line_terminator, is_octal_digit, is_white_space_single_line,
};
use crate::diagnostics::Position;
use crate::scanner::{
    ScanContext, Token, TokenKind, text_to_reserved_word, text_to_strict_reserved_word,
};
use crate::span::Span;
use std::sync::Arc;

/// The scanner state machine.
///
/// Owns the source text and the line table. The `strict` flag is set by the
/// parser when a `use strict` directive (or a module/class context) is in
/// effect; it gates legacy octal literals and strict-reserved words.
pub struct Scanner {
    /// The source text, shared with the parser without cloning
    source: Arc<str>,
    /// Current byte position
    pos: usize,
    /// End byte position
    end: usize,
    /// Byte offsets of line starts; index 0 is always 0
    line_starts: Vec<u32>,
    /// Strict-mode flag (affects octal literals and reserved words)
    pub strict: bool,
    // Current token state
    token_start: usize,
    kind: TokenKind,
    value: String,
    number: f64,
    regex_flags: Option<String>,
    template_end: bool,
    newline_before: bool,
    error: Option<String>,
}

impl Scanner {
    /// Create a new scanner over the given source text.
    pub fn new(text: impl Into<String>) -> Scanner {
        let text: String = text.into();
        let end = text.len();
        Scanner {
            source: Arc::from(text.into_boxed_str()),
            pos: 0,
            end,
            line_starts: vec![0],
            strict: false,
            token_start: 0,
            kind: TokenKind::Unknown,
            value: String::new(),
            number: 0.0,
            regex_flags: None,
            template_end: false,
            newline_before: false,
            error: None,
        }
    }

    /// Get the shared source text.
    pub fn source(&self) -> &Arc<str> {
        &self.source
    }

    /// Get the current position.
    #[inline]
    pub fn pos(&self) -> usize {
        self.pos
    }

    /// Set the current position (used by the parser to re-scan a buffered
    /// token under a different context).
    pub fn set_pos(&mut self, pos: usize) {
        self.pos = pos;
    }

    /// Get the source slice for a span.
    pub fn raw(&self, span: Span) -> &str {
        span.slice(&self.source)
    }

    // =========================================================================
    // Line Table
    // =========================================================================

    /// Record a line start. Re-scans may revisit offsets; only offsets past
    /// the last recorded line start are appended.
    #[inline]
    fn add_line_start(&mut self, offset: usize) {
        let offset = offset as u32;
        if offset > *self.line_starts.last().unwrap_or(&0) {
            self.line_starts.push(offset);
        }
    }

    /// Get the 0-based line index containing a byte offset.
    pub fn line_at(&self, offset: u32) -> u32 {
        match self.line_starts.binary_search(&offset) {
            Ok(line) => line as u32,
            Err(insert) => (insert - 1) as u32,
        }
    }

    /// Resolve a byte offset into a full position (1-based line/column).
    pub fn position(&self, offset: u32) -> Position {
        let line = self.line_at(offset);
        let line_offset = self.line_starts[line as usize];
        let end_offset = self
            .line_starts
            .get(line as usize + 1)
            .copied()
            .unwrap_or(self.end as u32);
        Position {
            line: line + 1,
            column: offset - line_offset + 1,
            line_offset,
            start_offset: offset,
            end_offset,
        }
    }

    /// Number of lines seen so far.
    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    // =========================================================================
    // Character Access (byte-indexed with ASCII fast path)
    // =========================================================================

    /// Character code at the given byte index, 0 if out of bounds.
    #[inline(always)]
    fn char_code(&self, index: usize) -> u32 {
        let bytes = self.source.as_bytes();
        if index < self.end {
            let b = bytes[index];
            if b < 128 {
                b as u32
            } else {
                self.source[index..]
                    .chars()
                    .next()
                    .map(|c| c as u32)
                    .unwrap_or(0)
            }
        } else {
            0
        }
    }

    /// Byte length of the character at the given index.
    #[inline(always)]
    fn char_len(&self, index: usize) -> usize {
        let bytes = self.source.as_bytes();
        if index >= self.end {
            return 0;
        }
        let b = bytes[index];
        if b < 128 {
            1
        } else if b < 0xE0 {
            2
        } else if b < 0xF0 {
            3
        } else {
            4
        }
    }

    #[inline]
    fn at_end(&self) -> bool {
        self.pos >= self.end
    }

    // =========================================================================
    // Token Production
    // =========================================================================

    fn finish(&mut self, kind: TokenKind) -> TokenKind {
        self.kind = kind;
        kind
    }

    fn illegal(&mut self, message: impl Into<String>) -> TokenKind {
        self.error = Some(message.into());
        self.finish(TokenKind::Illegal)
    }

    /// Materialize the current token.
    pub fn token(&self) -> Token {
        Token {
            kind: self.kind,
            span: Span::new(self.token_start as u32, self.pos as u32),
            value: self.value.clone(),
            number: self.number,
            regex_flags: self.regex_flags.clone(),
            template_end: self.template_end,
            newline_before: self.newline_before,
            error: self.error.clone(),
        }
    }

    /// Scan the next token under the given context and return its kind.
    /// Token attributes are read back via [`Scanner::token`].
    pub fn advance(&mut self, context: ScanContext) -> TokenKind {
        self.value.clear();
        self.number = 0.0;
        self.regex_flags = None;
        self.template_end = false;
        self.newline_before = false;
        self.error = None;

        if let Some(unterminated_at) = self.skip_trivia() {
            self.token_start = unterminated_at;
            self.pos = self.end;
            return self.illegal("Unterminated comment");
        }
        self.token_start = self.pos;

        if self.at_end() {
            return self.finish(TokenKind::EndOfFile);
        }

        let ch = self.char_code(self.pos);

        if context == ScanContext::Template && ch == CharacterCodes::CLOSE_BRACE {
            return self.scan_template(false);
        }

        match ch {
            CharacterCodes::BACKTICK => self.scan_template(true),
            CharacterCodes::DOUBLE_QUOTE | CharacterCodes::SINGLE_QUOTE => self.scan_string(ch),
            CharacterCodes::SLASH => {
                if context == ScanContext::Div {
                    self.scan_punctuation()
                } else {
                    self.scan_regex()
                }
            }
            _ if is_digit(ch) => self.scan_number(),
            _ if is_identifier_start(ch) || ch == CharacterCodes::BACKSLASH => {
                self.scan_identifier(context)
            }
            CharacterCodes::DOT => {
                if is_digit(self.char_code(self.pos + 1)) {
                    self.scan_number()
                } else {
                    self.scan_punctuation()
                }
            }
            _ => self.scan_punctuation(),
        }
    }

    // =========================================================================
    // Trivia (whitespace, comments, shebang)
    // =========================================================================

    /// Skip whitespace and comments. Returns the start offset of an
    /// unterminated block comment, if one was found.
    fn skip_trivia(&mut self) -> Option<usize> {
        // A shebang line is trivia, but only at the very start of the input
        if self.pos == 0
            && self.char_code(0) == CharacterCodes::HASH
            && self.char_code(1) == CharacterCodes::EXCLAMATION
        {
            while !self.at_end() && !is_line_terminator(self.char_code(self.pos)) {
                self.pos += self.char_len(self.pos);
            }
        }

        loop {
            if self.at_end() {
                return None;
            }
            let ch = self.char_code(self.pos);

            if is_line_terminator(ch) {
                self.newline_before = true;
                self.consume_line_terminator(ch);
                continue;
            }
            if is_white_space_single_line(ch) {
                self.pos += self.char_len(self.pos);
                continue;
            }
            if ch == CharacterCodes::SLASH {
                let next = self.char_code(self.pos + 1);
                if next == CharacterCodes::SLASH {
                    self.pos += 2;
                    while !self.at_end() && !is_line_terminator(self.char_code(self.pos)) {
                        self.pos += self.char_len(self.pos);
                    }
                    continue;
                }
                if next == CharacterCodes::ASTERISK {
                    if !self.skip_block_comment() {
                        return Some(self.pos);
                    }
                    continue;
                }
            }
            return None;
        }
    }

    /// Consume one line terminator (collapsing `\r\n`) and record the start
    /// of the following line.
    fn consume_line_terminator(&mut self, ch: u32) {
        if ch == CharacterCodes::CARRIAGE_RETURN
            && self.char_code(self.pos + 1) == CharacterCodes::LINE_FEED
        {
            self.pos += 2;
        } else {
            self.pos += self.char_len(self.pos);
        }
        self.add_line_start(self.pos);
    }

    /// Skip a `/* ... */` comment. Returns false when unterminated, leaving
    /// the position at the opening slash.
    fn skip_block_comment(&mut self) -> bool {
        let start = self.pos;
        self.pos += 2;
        while !self.at_end() {
            let ch = self.char_code(self.pos);
            if ch == CharacterCodes::ASTERISK
                && self.char_code(self.pos + 1) == CharacterCodes::SLASH
            {
                self.pos += 2;
                return true;
            }
            if is_line_terminator(ch) {
                self.newline_before = true;
                self.consume_line_terminator(ch);
            } else {
                self.pos += self.char_len(self.pos);
            }
        }
        self.pos = start;
        false
    }

    // =========================================================================
    // Punctuation
    // =========================================================================

    fn scan_punctuation(&mut self) -> TokenKind {
        let ch = self.char_code(self.pos);
        macro_rules! tok {
            ($len:expr, $kind:ident) => {{
                self.pos += $len;
                return self.finish(TokenKind::$kind);
            }};
        }

        match ch {
            CharacterCodes::OPEN_BRACE => tok!(1, OpenBrace),
            CharacterCodes::CLOSE_BRACE => tok!(1, CloseBrace),
            CharacterCodes::OPEN_PAREN => tok!(1, OpenParen),
            CharacterCodes::CLOSE_PAREN => tok!(1, CloseParen),
            CharacterCodes::OPEN_BRACKET => tok!(1, OpenBracket),
            CharacterCodes::CLOSE_BRACKET => tok!(1, CloseBracket),
            CharacterCodes::SEMICOLON => tok!(1, Semicolon),
            CharacterCodes::COMMA => tok!(1, Comma),
            CharacterCodes::COLON => tok!(1, Colon),
            CharacterCodes::QUESTION => tok!(1, Question),
            CharacterCodes::TILDE => tok!(1, Tilde),
            CharacterCodes::DOT => {
                if self.char_code(self.pos + 1) == CharacterCodes::DOT
                    && self.char_code(self.pos + 2) == CharacterCodes::DOT
                {
                    tok!(3, DotDotDot);
                }
                tok!(1, Dot)
            }
            CharacterCodes::EXCLAMATION => {
                if self.char_code(self.pos + 1) == CharacterCodes::EQUALS {
                    if self.char_code(self.pos + 2) == CharacterCodes::EQUALS {
                        tok!(3, ExclamationEqualsEquals);
                    }
                    tok!(2, ExclamationEquals);
                }
                tok!(1, Exclamation)
            }
            CharacterCodes::EQUALS => {
                if self.char_code(self.pos + 1) == CharacterCodes::EQUALS {
                    if self.char_code(self.pos + 2) == CharacterCodes::EQUALS {
                        tok!(3, EqualsEqualsEquals);
                    }
                    tok!(2, EqualsEquals);
                }
                if self.char_code(self.pos + 1) == CharacterCodes::GREATER_THAN {
                    tok!(2, Arrow);
                }
                tok!(1, Equals)
            }
            CharacterCodes::PLUS => {
                if self.char_code(self.pos + 1) == CharacterCodes::PLUS {
                    tok!(2, PlusPlus);
                }
                if self.char_code(self.pos + 1) == CharacterCodes::EQUALS {
                    tok!(2, PlusEquals);
                }
                tok!(1, Plus)
            }
            CharacterCodes::MINUS => {
                if self.char_code(self.pos + 1) == CharacterCodes::MINUS {
                    tok!(2, MinusMinus);
                }
                if self.char_code(self.pos + 1) == CharacterCodes::EQUALS {
                    tok!(2, MinusEquals);
                }
                tok!(1, Minus)
            }
            CharacterCodes::ASTERISK => {
                if self.char_code(self.pos + 1) == CharacterCodes::EQUALS {
                    tok!(2, AsteriskEquals);
                }
                tok!(1, Asterisk)
            }
            CharacterCodes::SLASH => {
                if self.char_code(self.pos + 1) == CharacterCodes::EQUALS {
                    tok!(2, SlashEquals);
                }
                tok!(1, Slash)
            }
            CharacterCodes::PERCENT => {
                if self.char_code(self.pos + 1) == CharacterCodes::EQUALS {
                    tok!(2, PercentEquals);
                }
                tok!(1, Percent)
            }
            CharacterCodes::LESS_THAN => {
                if self.char_code(self.pos + 1) == CharacterCodes::LESS_THAN {
                    if self.char_code(self.pos + 2) == CharacterCodes::EQUALS {
                        tok!(3, LessThanLessThanEquals);
                    }
                    tok!(2, LessThanLessThan);
                }
                if self.char_code(self.pos + 1) == CharacterCodes::EQUALS {
                    tok!(2, LessThanEquals);
                }
                tok!(1, LessThan)
            }
            CharacterCodes::GREATER_THAN => {
                if self.char_code(self.pos + 1) == CharacterCodes::GREATER_THAN {
                    if self.char_code(self.pos + 2) == CharacterCodes::GREATER_THAN {
                        if self.char_code(self.pos + 3) == CharacterCodes::EQUALS {
                            tok!(4, GreaterThanGreaterThanGreaterThanEquals);
                        }
                        tok!(3, GreaterThanGreaterThanGreaterThan);
                    }
                    if self.char_code(self.pos + 2) == CharacterCodes::EQUALS {
                        tok!(3, GreaterThanGreaterThanEquals);
                    }
                    tok!(2, GreaterThanGreaterThan);
                }
                if self.char_code(self.pos + 1) == CharacterCodes::EQUALS {
                    tok!(2, GreaterThanEquals);
                }
                tok!(1, GreaterThan)
            }
            CharacterCodes::AMPERSAND => {
                if self.char_code(self.pos + 1) == CharacterCodes::AMPERSAND {
                    tok!(2, AmpersandAmpersand);
                }
                if self.char_code(self.pos + 1) == CharacterCodes::EQUALS {
                    tok!(2, AmpersandEquals);
                }
                tok!(1, Ampersand)
            }
            CharacterCodes::BAR => {
                if self.char_code(self.pos + 1) == CharacterCodes::BAR {
                    tok!(2, BarBar);
                }
                if self.char_code(self.pos + 1) == CharacterCodes::EQUALS {
                    tok!(2, BarEquals);
                }
                tok!(1, Bar)
            }
            CharacterCodes::CARET => {
                if self.char_code(self.pos + 1) == CharacterCodes::EQUALS {
                    tok!(2, CaretEquals);
                }
                tok!(1, Caret)
            }
            _ => {
                self.pos += self.char_len(self.pos).max(1);
                self.illegal("Invalid character")
            }
        }
    }

    // =========================================================================
    // Numbers
    // =========================================================================

    fn scan_number(&mut self) -> TokenKind {
        let start = self.pos;
        let first = self.char_code(self.pos);

        if first == CharacterCodes::_0 {
            let next = self.char_code(self.pos + 1);
            match next {
                CharacterCodes::LOWER_X | CharacterCodes::UPPER_X => {
                    return self.scan_radix_number(16, is_hex_digit);
                }
                CharacterCodes::LOWER_B | CharacterCodes::UPPER_B => {
                    return self.scan_radix_number(2, |c| {
                        c == CharacterCodes::_0 || c == CharacterCodes::_0 + 1
                    });
                }
                CharacterCodes::LOWER_O | CharacterCodes::UPPER_O => {
                    return self.scan_radix_number(8, is_octal_digit);
                }
                _ if is_digit(next) => {
                    // Legacy octal, rejected under strict mode
                    if self.strict {
                        while is_digit(self.char_code(self.pos)) {
                            self.pos += 1;
                        }
                        return self.illegal("Octal literals are not allowed in strict mode");
                    }
                    let mut octal = true;
                    let mut scan = self.pos + 1;
                    while is_digit(self.char_code(scan)) {
                        if !is_octal_digit(self.char_code(scan)) {
                            octal = false;
                        }
                        scan += 1;
                    }
                    if octal {
                        let mut v: f64 = 0.0;
                        self.pos += 1;
                        while is_octal_digit(self.char_code(self.pos)) {
                            v = v * 8.0 + (self.char_code(self.pos) - CharacterCodes::_0) as f64;
                            self.pos += 1;
                        }
                        self.number = v;
                        return self.check_number_suffix();
                    }
                    // `08` and friends fall through as decimal
                }
                _ => {}
            }
        }

        while is_digit(self.char_code(self.pos)) {
            self.pos += 1;
        }
        if self.char_code(self.pos) == CharacterCodes::DOT {
            self.pos += 1;
            while is_digit(self.char_code(self.pos)) {
                self.pos += 1;
            }
        }
        let exp = self.char_code(self.pos);
        if exp == CharacterCodes::LOWER_E || exp == CharacterCodes::UPPER_E {
            let mut scan = self.pos + 1;
            let sign = self.char_code(scan);
            if sign == CharacterCodes::PLUS || sign == CharacterCodes::MINUS {
                scan += 1;
            }
            if is_digit(self.char_code(scan)) {
                self.pos = scan;
                while is_digit(self.char_code(self.pos)) {
                    self.pos += 1;
                }
            } else {
                self.pos = scan;
                return self.illegal("Missing exponent digits");
            }
        }

        self.number = self.source[start..self.pos].parse::<f64>().unwrap_or(0.0);
        self.check_number_suffix()
    }

    fn scan_radix_number(&mut self, radix: u32, is_radix_digit: fn(u32) -> bool) -> TokenKind {
        self.pos += 2; // prefix
        let digits_start = self.pos;
        let mut v: f64 = 0.0;
        while is_radix_digit(self.char_code(self.pos)) {
            v = v * radix as f64 + hex_value(self.char_code(self.pos)) as f64;
            self.pos += 1;
        }
        if self.pos == digits_start {
            return self.illegal("Missing digits after numeric prefix");
        }
        self.number = v;
        self.check_number_suffix()
    }

    /// The character after any numeric literal must not start an identifier.
    fn check_number_suffix(&mut self) -> TokenKind {
        let ch = self.char_code(self.pos);
        if is_identifier_start(ch) || is_digit(ch) {
            self.pos += self.char_len(self.pos);
            return self.illegal("Invalid character after number");
        }
        self.finish(TokenKind::Number)
    }

    // =========================================================================
    // Strings and Templates
    // =========================================================================

    fn scan_string(&mut self, quote: u32) -> TokenKind {
        self.pos += 1;
        loop {
            if self.at_end() {
                return self.illegal("Unterminated string literal");
            }
            let ch = self.char_code(self.pos);
            if ch == quote {
                self.pos += 1;
                return self.finish(TokenKind::String);
            }
            match ch {
                CharacterCodes::BACKSLASH => {
                    if let Err(msg) = self.scan_escape() {
                        return self.illegal(msg);
                    }
                }
                CharacterCodes::LINE_FEED | CharacterCodes::CARRIAGE_RETURN => {
                    return self.illegal("Unterminated string literal");
                }
                CharacterCodes::LINE_SEPARATOR | CharacterCodes::PARAGRAPH_SEPARATOR => {
                    // U+2028/U+2029 may appear raw in string literals
                    self.push_char(ch);
                    self.consume_line_terminator(ch);
                }
                _ => {
                    self.push_char(ch);
                    self.pos += self.char_len(self.pos);
                }
            }
        }
    }

    /// Scan a template piece. `head` is true for the opening backtick piece;
    /// otherwise the piece resumes at a `}` under template context.
    fn scan_template(&mut self, head: bool) -> TokenKind {
        debug_assert!(
            self.char_code(self.pos)
                == if head {
                    CharacterCodes::BACKTICK
                } else {
                    CharacterCodes::CLOSE_BRACE
                }
        );
        self.pos += 1;
        loop {
            if self.at_end() {
                return self.illegal("Unterminated template literal");
            }
            let ch = self.char_code(self.pos);
            match ch {
                CharacterCodes::BACKTICK => {
                    self.pos += 1;
                    self.template_end = true;
                    return self.finish(TokenKind::Template);
                }
                CharacterCodes::DOLLAR
                    if self.char_code(self.pos + 1) == CharacterCodes::OPEN_BRACE =>
                {
                    self.pos += 2;
                    self.template_end = false;
                    return self.finish(TokenKind::Template);
                }
                CharacterCodes::BACKSLASH => {
                    if let Err(msg) = self.scan_escape() {
                        return self.illegal(msg);
                    }
                }
                _ if is_line_terminator(ch) => {
                    // Raw line terminators are legal in templates; the cooked
                    // value normalizes \r and \r\n to \n
                    self.push_char(CharacterCodes::LINE_FEED);
                    self.consume_line_terminator(ch);
                }
                _ => {
                    self.push_char(ch);
                    self.pos += self.char_len(self.pos);
                }
            }
        }
    }

    #[inline]
    fn push_char(&mut self, ch: u32) {
        if let Some(c) = char::from_u32(ch) {
            self.value.push(c);
        }
    }

    /// Decode one backslash escape into `value`. The position is on the
    /// backslash on entry and past the escape on exit.
    fn scan_escape(&mut self) -> Result<(), &'static str> {
        self.pos += 1; // backslash
        if self.at_end() {
            return Err("Unterminated escape sequence");
        }
        let ch = self.char_code(self.pos);
        match ch {
            CharacterCodes::LOWER_T => {
                self.value.push('\t');
                self.pos += 1;
            }
            CharacterCodes::LOWER_B => {
                self.value.push('\u{8}');
                self.pos += 1;
            }
            CharacterCodes::LOWER_V => {
                self.value.push('\u{B}');
                self.pos += 1;
            }
            CharacterCodes::LOWER_F => {
                self.value.push('\u{C}');
                self.pos += 1;
            }
            CharacterCodes::LOWER_R => {
                self.value.push('\r');
                self.pos += 1;
            }
            CharacterCodes::LOWER_N => {
                self.value.push('\n');
                self.pos += 1;
            }
            CharacterCodes::LOWER_X => {
                self.pos += 1;
                let hi = self.char_code(self.pos);
                let lo = self.char_code(self.pos + 1);
                if !is_hex_digit(hi) || !is_hex_digit(lo) {
                    return Err("Invalid hexadecimal escape");
                }
                self.push_char(hex_value(hi) * 16 + hex_value(lo));
                self.pos += 2;
            }
            CharacterCodes::LOWER_U => {
                self.pos += 1;
                let decoded = self.scan_unicode_escape_value()?;
                self.push_char(decoded);
            }
            _ if is_octal_digit(ch) => {
                if self.strict {
                    return Err("Octal escapes are not allowed in strict mode");
                }
                let mut v = 0u32;
                let mut count = 0;
                while count < 3 && is_octal_digit(self.char_code(self.pos)) {
                    let next = v * 8 + (self.char_code(self.pos) - CharacterCodes::_0);
                    if next > 0xFF {
                        break;
                    }
                    v = next;
                    self.pos += 1;
                    count += 1;
                }
                self.push_char(v);
            }
            _ if is_line_terminator(ch) => {
                // Line continuation contributes no characters
                self.consume_line_terminator(ch);
            }
            _ => {
                self.push_char(ch);
                self.pos += self.char_len(self.pos);
            }
        }
        Ok(())
    }

    /// Decode the digits of a `\u` escape. The position is just past the
    /// `u` on entry.
    fn scan_unicode_escape_value(&mut self) -> Result<u32, &'static str> {
        if self.char_code(self.pos) == CharacterCodes::OPEN_BRACE {
            self.pos += 1;
            let mut v = 0u32;
            let mut any = false;
            while is_hex_digit(self.char_code(self.pos)) {
                v = v.saturating_mul(16).saturating_add(hex_value(self.char_code(self.pos)));
                self.pos += 1;
                any = true;
            }
            if !any || self.char_code(self.pos) != CharacterCodes::CLOSE_BRACE || v > 0x10FFFF {
                return Err("Invalid Unicode escape");
            }
            self.pos += 1;
            Ok(v)
        } else {
            let mut v = 0u32;
            for i in 0..4 {
                let d = self.char_code(self.pos + i);
                if !is_hex_digit(d) {
                    return Err("Invalid Unicode escape");
                }
                v = v * 16 + hex_value(d);
            }
            self.pos += 4;
            Ok(v)
        }
    }

    // =========================================================================
    // Identifiers and Keywords
    // =========================================================================

    fn scan_identifier(&mut self, context: ScanContext) -> TokenKind {
        let mut had_escape = false;
        loop {
            let ch = self.char_code(self.pos);
            if ch == CharacterCodes::BACKSLASH {
                if self.char_code(self.pos + 1) != CharacterCodes::LOWER_U {
                    self.pos += 1;
                    return self.illegal("Invalid escape in identifier");
                }
                self.pos += 2;
                let decoded = match self.scan_unicode_escape_value() {
                    Ok(v) => v,
                    Err(msg) => return self.illegal(msg),
                };
                let valid = if self.value.is_empty() {
                    is_identifier_start(decoded)
                } else {
                    is_identifier_part(decoded)
                };
                if !valid {
                    return self.illegal("Invalid escape in identifier");
                }
                self.push_char(decoded);
                had_escape = true;
            } else if self.value.is_empty() && is_identifier_start(ch)
                || !self.value.is_empty() && is_identifier_part(ch)
            {
                self.push_char(ch);
                self.pos += self.char_len(self.pos);
            } else {
                break;
            }
        }

        if self.value.is_empty() {
            self.pos += self.char_len(self.pos).max(1);
            return self.illegal("Invalid character");
        }

        // Reserved word classification applies only to bare (unescaped)
        // identifiers, and is suppressed in name context
        if !had_escape && context != ScanContext::Name {
            if let Some(kind) = text_to_reserved_word(&self.value) {
                return self.finish(kind);
            }
            if self.strict {
                if let Some(kind) = text_to_strict_reserved_word(&self.value) {
                    return self.finish(kind);
                }
            }
        }
        self.finish(TokenKind::Identifier)
    }

    // =========================================================================
    // Regular Expressions
    // =========================================================================

    fn scan_regex(&mut self) -> TokenKind {
        debug_assert!(self.char_code(self.pos) == CharacterCodes::SLASH);
        self.pos += 1;
        let body_start = self.pos;
        let mut in_class = false;
        loop {
            if self.at_end() {
                return self.illegal("Unterminated regular expression");
            }
            let ch = self.char_code(self.pos);
            if is_line_terminator(ch) {
                return self.illegal("Unterminated regular expression");
            }
            match ch {
                CharacterCodes::BACKSLASH => {
                    self.pos += 1;
                    if self.at_end() || is_line_terminator(self.char_code(self.pos)) {
                        return self.illegal("Unterminated regular expression");
                    }
                    self.pos += self.char_len(self.pos);
                }
                CharacterCodes::OPEN_BRACKET => {
                    in_class = true;
                    self.pos += 1;
                }
                CharacterCodes::CLOSE_BRACKET => {
                    in_class = false;
                    self.pos += 1;
                }
                CharacterCodes::SLASH if !in_class => {
                    self.value = self.source[body_start..self.pos].to_string();
                    self.pos += 1;
                    let flags_start = self.pos;
                    while is_identifier_part(self.char_code(self.pos)) {
                        self.pos += self.char_len(self.pos);
                    }
                    self.regex_flags = Some(self.source[flags_start..self.pos].to_string());
                    return self.finish(TokenKind::Regex);
                }
                _ => {
                    self.pos += self.char_len(self.pos);
                }
            }
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn scan_all(text: &str) -> Vec<TokenKind> {
        let mut scanner = Scanner::new(text);
        let mut kinds = Vec::new();
        loop {
            let kind = scanner.advance(ScanContext::Default);
            if kind == TokenKind::EndOfFile {
                break;
            }
            kinds.push(kind);
        }
        kinds
    }

    #[test]
    fn test_scan_punctuation() {
        assert_eq!(
            scan_all("{ } ... => >>>="),
            vec![
                TokenKind::OpenBrace,
                TokenKind::CloseBrace,
                TokenKind::DotDotDot,
                TokenKind::Arrow,
                TokenKind::GreaterThanGreaterThanGreaterThanEquals,
            ]
        );
    }

    #[test]
    fn test_scan_numbers() {
        let mut scanner = Scanner::new("0x1F 0b101 0o17 3.14 1e3 .5 017");
        scanner.advance(ScanContext::Default);
        assert_eq!(scanner.token().number, 31.0);
        scanner.advance(ScanContext::Default);
        assert_eq!(scanner.token().number, 5.0);
        scanner.advance(ScanContext::Default);
        assert_eq!(scanner.token().number, 15.0);
        scanner.advance(ScanContext::Default);
        assert_eq!(scanner.token().number, 3.14);
        scanner.advance(ScanContext::Default);
        assert_eq!(scanner.token().number, 1000.0);
        scanner.advance(ScanContext::Default);
        assert_eq!(scanner.token().number, 0.5);
        scanner.advance(ScanContext::Default);
        assert_eq!(scanner.token().number, 15.0); // legacy octal
    }

    #[test]
    fn test_octal_rejected_in_strict() {
        let mut scanner = Scanner::new("017");
        scanner.strict = true;
        assert_eq!(scanner.advance(ScanContext::Default), TokenKind::Illegal);
        assert!(scanner.token().error.unwrap().contains("Octal"));
    }

    #[test]
    fn test_number_identifier_adjacency() {
        let mut scanner = Scanner::new("3in");
        assert_eq!(scanner.advance(ScanContext::Default), TokenKind::Illegal);
    }

    #[test]
    fn test_scan_string_escapes() {
        let mut scanner = Scanner::new(r#""a\tb\x41B\u{43}""#);
        assert_eq!(scanner.advance(ScanContext::Default), TokenKind::String);
        assert_eq!(scanner.token().value, "a\tbABC");
    }

    #[test]
    fn test_unterminated_string() {
        let mut scanner = Scanner::new("\"abc\ndef\"");
        assert_eq!(scanner.advance(ScanContext::Default), TokenKind::Illegal);
    }

    #[test]
    fn test_scan_identifier_with_escape() {
        let mut scanner = Scanner::new(r"\u0061bc");
        assert_eq!(scanner.advance(ScanContext::Default), TokenKind::Identifier);
        let token = scanner.token();
        assert_eq!(token.value, "abc");
        // The span covers the escaped form
        assert_eq!(token.span, Span::new(0, 8));
    }

    #[test]
    fn test_escaped_keyword_is_identifier() {
        let mut scanner = Scanner::new(r"\u0076ar");
        assert_eq!(scanner.advance(ScanContext::Default), TokenKind::Identifier);
        assert_eq!(scanner.token().value, "var");
    }

    #[test]
    fn test_keywords_and_strict_reserved() {
        let mut scanner = Scanner::new("var let");
        assert_eq!(scanner.advance(ScanContext::Default), TokenKind::VarKeyword);
        assert_eq!(scanner.advance(ScanContext::Default), TokenKind::Identifier);

        let mut scanner = Scanner::new("let");
        scanner.strict = true;
        assert_eq!(scanner.advance(ScanContext::Default), TokenKind::LetKeyword);
    }

    #[test]
    fn test_name_context_relaxes_keywords() {
        let mut scanner = Scanner::new("default");
        assert_eq!(scanner.advance(ScanContext::Name), TokenKind::Identifier);
        assert_eq!(scanner.token().value, "default");
    }

    #[test]
    fn test_regex_vs_division() {
        let mut scanner = Scanner::new("/ab[/]c/gi");
        assert_eq!(scanner.advance(ScanContext::Default), TokenKind::Regex);
        let token = scanner.token();
        assert_eq!(token.value, "ab[/]c");
        assert_eq!(token.regex_flags.as_deref(), Some("gi"));

        let mut scanner = Scanner::new("/x");
        assert_eq!(scanner.advance(ScanContext::Div), TokenKind::Slash);
    }

    #[test]
    fn test_template_pieces() {
        let mut scanner = Scanner::new("`a${b}c`");
        assert_eq!(scanner.advance(ScanContext::Default), TokenKind::Template);
        let head = scanner.token();
        assert_eq!(head.value, "a");
        assert!(!head.template_end);

        assert_eq!(scanner.advance(ScanContext::Default), TokenKind::Identifier);

        assert_eq!(scanner.advance(ScanContext::Template), TokenKind::Template);
        let tail = scanner.token();
        assert_eq!(tail.value, "c");
        assert!(tail.template_end);
    }

    #[test]
    fn test_newline_before_and_comments() {
        let mut scanner = Scanner::new("a // note\nb /* c\nd */ e");
        scanner.advance(ScanContext::Default);
        assert!(!scanner.token().newline_before);
        scanner.advance(ScanContext::Default);
        assert!(scanner.token().newline_before);
        assert_eq!(scanner.token().value, "b");
        scanner.advance(ScanContext::Default);
        assert!(scanner.token().newline_before); // newline inside block comment
        assert_eq!(scanner.token().value, "e");
    }

    #[test]
    fn test_line_table_positions() {
        let mut scanner = Scanner::new("ab\ncd\r\nef");
        while scanner.advance(ScanContext::Default) != TokenKind::EndOfFile {}
        let pos = scanner.position(0);
        assert_eq!((pos.line, pos.column), (1, 1));
        let pos = scanner.position(3);
        assert_eq!((pos.line, pos.column), (2, 1));
        let pos = scanner.position(8);
        assert_eq!((pos.line, pos.column), (3, 2));
    }

    #[test]
    fn test_shebang_skipped() {
        let mut scanner = Scanner::new("#!/usr/bin/env node\nvar x");
        assert_eq!(scanner.advance(ScanContext::Default), TokenKind::VarKeyword);
        assert!(scanner.token().newline_before);
    }

    #[test]
    fn test_bom_skipped() {
        let mut scanner = Scanner::new("\u{FEFF}var x");
        assert_eq!(scanner.advance(ScanContext::Default), TokenKind::VarKeyword);
    }

    #[test]
    fn test_unterminated_block_comment() {
        let mut scanner = Scanner::new("/* never closed");
        assert_eq!(scanner.advance(ScanContext::Default), TokenKind::Illegal);
    }
}
