//! Parser state: token pump, context frames, and entry points.
//!
//! The parser keeps a two-token lookahead. Every buffered token remembers
//! the scan context it was produced under; when the grammar later demands a
//! different context (division vs. regex, template continuation, name vs.
//! reserved word), the scanner position is reset to the token's start and
//! the token is re-scanned. This is how context-sensitive tokens stay
//! correct without feeding grammar state into the scanner.

use crate::diagnostics::SyntaxError;
use crate::limits::MAX_PARSER_RECURSION_DEPTH;
use crate::parser::ast::Node;
use crate::parser::validate::DeferredError;
use crate::scanner::{ScanContext, Scanner, Token, TokenKind, token_text};
use crate::span::Span;
use rustc_hash::FxHashMap;
use std::sync::Arc;

/// What the top-level production of a parse is.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParseGoal {
    /// A script: non-strict unless a directive says otherwise
    Script,
    /// A module: implicitly strict
    Module,
    /// A function body: top-level `return` is permitted
    FunctionContext,
}

/// A label bound in the current context.
#[derive(Clone, Copy, Debug)]
pub struct LabelInfo {
    /// Number of active bindings of this name (nested duplicates are errors,
    /// so this only exceeds one transiently)
    pub count: u32,
    /// The label is attached to an iteration statement
    pub iteration: bool,
}

/// One frame of the parser context stack.
///
/// Pushed when entering a function body, module body, or class body.
#[derive(Debug, Default)]
pub struct ContextFrame {
    pub strict: bool,
    pub is_function: bool,
    pub is_generator: bool,
    pub is_async: bool,
    /// `super` references are legal (inside a method)
    pub allow_super: bool,
    /// Name of the enclosing method, for `super(...)` rewriting downstream
    pub method_name: Option<String>,
    pub label_set: FxHashMap<String, LabelInfo>,
    pub switch_depth: u32,
    pub loop_depth: u32,
    /// Errors deferred until the end of the enclosing statement list
    pub invalid_nodes: Vec<DeferredError>,
}

/// A buffered lookahead token.
struct Lookahead {
    token: Token,
    /// Context the token was scanned under
    context: ScanContext,
    /// Scanner position before this token was scanned
    start_pos: usize,
}

/// The recursive descent parser.
pub struct ParserState {
    pub(crate) scanner: Scanner,
    source: Arc<str>,
    lookahead: Vec<Lookahead>,
    /// End offset of the most recently consumed token, used to stamp
    /// completed node spans
    pub(crate) end_offset: u32,
    frames: Vec<ContextFrame>,
    pub(crate) depth: u32,
}

/// Result of a parse: the AST root plus the scanner, whose line table the
/// replacer uses for line-sync.
pub struct ParseResult {
    pub root: Node,
    pub scanner: Scanner,
}

impl ParserState {
    pub fn new(input: &str) -> ParserState {
        let scanner = Scanner::new(input);
        let source = scanner.source().clone();
        ParserState {
            scanner,
            source,
            lookahead: Vec::with_capacity(crate::limits::LOOKAHEAD_CAPACITY),
            end_offset: 0,
            frames: vec![ContextFrame::default()],
            depth: 0,
        }
    }

    /// Parse with the given goal. Consumes the parser.
    pub fn parse(mut self, goal: ParseGoal) -> Result<ParseResult, SyntaxError> {
        let root = self.parse_program(goal)?;
        Ok(ParseResult {
            root,
            scanner: self.scanner,
        })
    }

    fn parse_program(&mut self, goal: ParseGoal) -> Result<Node, SyntaxError> {
        let len = self.source.len() as u32;
        match goal {
            ParseGoal::Module => {
                self.set_strict(true);
                self.frame_mut().strict = true;
            }
            ParseGoal::FunctionContext => {
                self.frame_mut().is_function = true;
            }
            ParseGoal::Script => {}
        }

        let statements = self.statement_list(true, goal == ParseGoal::Module)?;
        let token = self.peek(ScanContext::Default)?.clone();
        if token.kind != TokenKind::EndOfFile {
            return self.unexpected(&token);
        }
        self.check_invalid_nodes()?;

        let kind = match goal {
            ParseGoal::Script => crate::parser::ast::NodeKind::Script { statements },
            ParseGoal::Module => crate::parser::ast::NodeKind::Module { statements },
            ParseGoal::FunctionContext => {
                crate::parser::ast::NodeKind::FunctionBody { statements }
            }
        };
        Ok(Node::new(kind, Span::new(0, len)))
    }

    // =========================================================================
    // Source Access
    // =========================================================================

    /// The shared source text.
    pub fn source(&self) -> &Arc<str> {
        &self.source
    }

    /// Raw source slice for a span.
    pub fn raw(&self, span: Span) -> &str {
        span.slice(&self.source)
    }

    // =========================================================================
    // Token Pump
    // =========================================================================

    /// True when the buffered token must be re-scanned for the new context.
    fn needs_rescan(token: &Token, old: ScanContext, new: ScanContext) -> bool {
        if old == new {
            return false;
        }
        let div = |c: ScanContext| c == ScanContext::Div;
        let tmpl = |c: ScanContext| c == ScanContext::Template;
        let name = |c: ScanContext| c == ScanContext::Name;
        match token.kind {
            TokenKind::Slash | TokenKind::SlashEquals | TokenKind::Regex => div(old) != div(new),
            TokenKind::CloseBrace | TokenKind::Template => tmpl(old) != tmpl(new),
            TokenKind::Identifier => name(old) != name(new),
            k if crate::scanner::token_is_keyword(k) => name(old) != name(new),
            // Illegal tokens may resolve differently under another context
            // (an unterminated regex may be a plain slash under div)
            TokenKind::Illegal => true,
            _ => false,
        }
    }

    /// Fill the lookahead buffer up to and including `index`, re-scanning
    /// entries whose recorded context conflicts with the requested one.
    fn fill_lookahead(&mut self, context: ScanContext, index: usize) {
        // Drop buffered entries that would scan differently now
        let mut truncate_at = None;
        for (i, entry) in self.lookahead.iter().enumerate().take(index + 1) {
            // Only the token at the requested index uses the requested
            // context; earlier entries keep theirs
            let wanted = if i == index { context } else { entry.context };
            if Self::needs_rescan(&entry.token, entry.context, wanted) {
                truncate_at = Some(i);
                break;
            }
        }
        if let Some(i) = truncate_at {
            let start = self.lookahead[i].start_pos;
            self.lookahead.truncate(i);
            self.scanner.set_pos(start);
        }

        while self.lookahead.len() <= index {
            let wanted = if self.lookahead.len() == index {
                context
            } else {
                ScanContext::Default
            };
            let start_pos = self.scanner.pos();
            self.scanner.advance(wanted);
            self.lookahead.push(Lookahead {
                token: self.scanner.token(),
                context: wanted,
                start_pos,
            });
        }
    }

    /// Peek the next token without consuming it.
    pub fn peek(&mut self, context: ScanContext) -> Result<&Token, SyntaxError> {
        self.fill_lookahead(context, 0);
        let token = &self.lookahead[0].token;
        if token.kind == TokenKind::Illegal {
            let token = token.clone();
            return self.illegal_token(&token);
        }
        Ok(&self.lookahead[0].token)
    }

    /// Peek the token after next.
    pub fn peek_at(&mut self, context: ScanContext, index: usize) -> Result<&Token, SyntaxError> {
        self.fill_lookahead(context, index);
        let token = &self.lookahead[index].token;
        if token.kind == TokenKind::Illegal {
            let token = token.clone();
            return self.illegal_token(&token);
        }
        Ok(&self.lookahead[index].token)
    }

    /// Peek just the kind of the next token.
    pub fn peek_kind(&mut self, context: ScanContext) -> Result<TokenKind, SyntaxError> {
        Ok(self.peek(context)?.kind)
    }

    /// Consume and return the next token.
    pub fn next(&mut self, context: ScanContext) -> Result<Token, SyntaxError> {
        self.fill_lookahead(context, 0);
        let entry = self.lookahead.remove(0);
        let token = entry.token;
        if token.kind == TokenKind::Illegal {
            return self.illegal_token(&token);
        }
        self.end_offset = token.span.end;
        Ok(token)
    }

    /// Consume the next token, failing unless it has the expected kind.
    pub fn expect(
        &mut self,
        kind: TokenKind,
        context: ScanContext,
    ) -> Result<Token, SyntaxError> {
        let token = self.next(context)?;
        if token.kind != kind {
            return self.unexpected(&token);
        }
        Ok(token)
    }

    /// Consume the next token if it has the given kind.
    pub fn eat(
        &mut self,
        kind: TokenKind,
        context: ScanContext,
    ) -> Result<Option<Token>, SyntaxError> {
        if self.peek_kind(context)? == kind {
            Ok(Some(self.next(context)?))
        } else {
            Ok(None)
        }
    }

    /// Start offset of the next token (used to open node spans).
    pub fn mark(&mut self, context: ScanContext) -> Result<u32, SyntaxError> {
        Ok(self.peek(context)?.span.start)
    }

    /// Close a span opened at `start` at the most recently consumed token.
    pub fn finish_span(&self, start: u32) -> Span {
        Span::new(start, self.end_offset)
    }

    // =========================================================================
    // Strict Mode
    // =========================================================================

    /// Switch the scanner's strict flag and flush the lookahead so buffered
    /// tokens are re-scanned under the new mode.
    pub fn set_strict(&mut self, strict: bool) {
        if self.scanner.strict == strict {
            return;
        }
        self.scanner.strict = strict;
        if let Some(first) = self.lookahead.first() {
            let pos = first.start_pos;
            self.lookahead.clear();
            self.scanner.set_pos(pos);
        }
    }

    /// Whether the current context is strict.
    pub fn strict(&self) -> bool {
        self.frame().strict
    }

    // =========================================================================
    // Context Frames
    // =========================================================================

    pub fn frame(&self) -> &ContextFrame {
        self.frames.last().expect("context stack is never empty")
    }

    pub fn frame_mut(&mut self) -> &mut ContextFrame {
        self.frames.last_mut().expect("context stack is never empty")
    }

    /// Push a frame for a function-like body. Strictness is inherited.
    pub fn push_frame(&mut self, frame: ContextFrame) {
        self.set_strict(frame.strict);
        self.frames.push(frame);
    }

    /// Pop the current frame, surfacing any deferred errors first.
    pub fn pop_frame(&mut self) -> Result<(), SyntaxError> {
        self.check_invalid_nodes()?;
        self.frames.pop();
        let strict = self.frame().strict;
        self.set_strict(strict);
        Ok(())
    }

    /// Build a frame for a function body that inherits strictness.
    pub fn function_frame(&self, is_generator: bool, is_async: bool) -> ContextFrame {
        ContextFrame {
            strict: self.frame().strict,
            is_function: true,
            is_generator,
            is_async,
            ..ContextFrame::default()
        }
    }

    /// Record a deferred error, surfaced at the end of the enclosing
    /// statement list unless cancelled by a pattern transform.
    pub fn add_invalid_node(&mut self, span: Span, message: impl Into<String>, strict_only: bool) {
        self.frame_mut().invalid_nodes.push(DeferredError {
            span,
            message: message.into(),
            strict_only,
        });
    }

    /// Cancel deferred errors inside a region that was reinterpreted as a
    /// binding pattern.
    pub fn cancel_invalid_nodes(&mut self, span: Span) {
        self.frame_mut()
            .invalid_nodes
            .retain(|e| !span.contains_span(e.span));
    }

    /// Surface the first applicable deferred error.
    pub fn check_invalid_nodes(&mut self) -> Result<(), SyntaxError> {
        let strict = self.frame().strict;
        let found = self
            .frame()
            .invalid_nodes
            .iter()
            .find(|e| !e.strict_only || strict)
            .cloned();
        self.frame_mut().invalid_nodes.clear();
        match found {
            Some(e) => self.fail(e.message, e.span),
            None => Ok(()),
        }
    }

    // =========================================================================
    // Error Reporting
    // =========================================================================

    /// Raise a structured syntax error at the given span.
    pub fn fail<T>(&self, message: impl Into<String>, span: Span) -> Result<T, SyntaxError> {
        let pos = self.scanner.position(span.start);
        let mut err = SyntaxError::new(message, pos);
        err.end_offset = span.end.max(span.start);
        Err(err)
    }

    /// Raise an "unexpected token" error.
    pub fn unexpected<T>(&self, token: &Token) -> Result<T, SyntaxError> {
        let what = match token.kind {
            TokenKind::EndOfFile => "Unexpected end of input".to_string(),
            TokenKind::Identifier => format!("Unexpected identifier '{}'", token.value),
            kind => format!("Unexpected token '{}'", token_text(kind)),
        };
        self.fail(what, token.span)
    }

    fn illegal_token<T>(&self, token: &Token) -> Result<T, SyntaxError> {
        let message = token
            .error
            .clone()
            .unwrap_or_else(|| "Invalid token".to_string());
        self.fail(message, token.span)
    }

    /// Guard against runaway recursion on pathological nesting.
    pub fn enter_recursion(&mut self, at: Span) -> Result<(), SyntaxError> {
        self.depth += 1;
        if self.depth > MAX_PARSER_RECURSION_DEPTH {
            return self.fail("Source is too deeply nested", at);
        }
        Ok(())
    }

    pub fn leave_recursion(&mut self) {
        debug_assert!(self.depth > 0);
        self.depth -= 1;
    }

    // =========================================================================
    // Semicolons and ASI
    // =========================================================================

    /// Consume a statement-terminating semicolon, accepting the virtual
    /// semicolon before `}`, at end of input, and after a line terminator.
    pub fn consume_semicolon(&mut self) -> Result<(), SyntaxError> {
        let token = self.peek(ScanContext::Div)?;
        match token.kind {
            TokenKind::Semicolon => {
                self.next(ScanContext::Div)?;
                Ok(())
            }
            TokenKind::CloseBrace | TokenKind::EndOfFile => Ok(()),
            _ if token.newline_before => Ok(()),
            _ => {
                let token = token.clone();
                self.unexpected(&token)
            }
        }
    }

    /// True when the next token is on a new line (restricted productions).
    pub fn newline_ahead(&mut self) -> Result<bool, SyntaxError> {
        Ok(self.peek(ScanContext::Div)?.newline_before)
    }

    // =========================================================================
    // Directive Prologue
    // =========================================================================

    /// Check whether a parsed statement is a directive candidate and, for
    /// the exact text `use strict`, promote the current context.
    ///
    /// Returns false once the prologue has ended.
    pub(crate) fn apply_directive(&mut self, statement: &Node) -> bool {
        use crate::parser::ast::NodeKind;
        let NodeKind::ExpressionStatement { expression } = &statement.kind else {
            return false;
        };
        let NodeKind::StringLiteral { .. } = &expression.kind else {
            return false;
        };
        // The directive is recognized by its exact source text, not its
        // decoded value
        let raw = self.raw(expression.span);
        if raw.len() >= 2 && &raw[1..raw.len() - 1] == "use strict" {
            self.frame_mut().strict = true;
            self.set_strict(true);
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_two_token_lookahead() {
        let mut parser = ParserState::new("a b c");
        assert_eq!(parser.peek(ScanContext::Default).unwrap().value, "a");
        assert_eq!(
            parser.peek_at(ScanContext::Default, 1).unwrap().value,
            "b"
        );
        assert_eq!(parser.next(ScanContext::Default).unwrap().value, "a");
        assert_eq!(parser.peek(ScanContext::Default).unwrap().value, "b");
    }

    #[test]
    fn test_rescan_regex_as_division() {
        let mut parser = ParserState::new("/x/g");
        // First peeked as a regex literal...
        assert_eq!(
            parser.peek(ScanContext::Default).unwrap().kind,
            TokenKind::Regex
        );
        // ...but re-requested under div context it is a slash
        assert_eq!(
            parser.peek(ScanContext::Div).unwrap().kind,
            TokenKind::Slash
        );
        // and back again
        assert_eq!(
            parser.peek(ScanContext::Default).unwrap().kind,
            TokenKind::Regex
        );
    }

    #[test]
    fn test_rescan_keyword_as_name() {
        let mut parser = ParserState::new("default");
        assert_eq!(
            parser.peek(ScanContext::Default).unwrap().kind,
            TokenKind::DefaultKeyword
        );
        let token = parser.peek(ScanContext::Name).unwrap();
        assert_eq!(token.kind, TokenKind::Identifier);
        assert_eq!(token.value, "default");
    }

    #[test]
    fn test_end_offset_tracks_consumed_tokens() {
        let mut parser = ParserState::new("ab cd");
        parser.next(ScanContext::Default).unwrap();
        assert_eq!(parser.end_offset, 2);
        parser.next(ScanContext::Default).unwrap();
        assert_eq!(parser.end_offset, 5);
    }

    #[test]
    fn test_strict_switch_flushes_lookahead() {
        let mut parser = ParserState::new("let x");
        assert_eq!(
            parser.peek(ScanContext::Default).unwrap().kind,
            TokenKind::Identifier
        );
        parser.frame_mut().strict = true;
        parser.set_strict(true);
        assert_eq!(
            parser.peek(ScanContext::Default).unwrap().kind,
            TokenKind::LetKeyword
        );
    }

    #[test]
    fn test_illegal_token_surfaces_as_error() {
        let mut parser = ParserState::new("\"unterminated");
        let err = parser.next(ScanContext::Default).unwrap_err();
        assert!(err.message.contains("Unterminated"));
        assert_eq!(err.line, 1);
    }
}
