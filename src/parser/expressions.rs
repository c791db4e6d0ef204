//! Expression grammar.
//!
//! Binary operators use a precedence-climbing loop; assignment is
//! right-associative and accepts cover-grammar expressions that can be
//! reinterpreted as patterns. Object and array literals are parsed as
//! expressions and transformed to patterns on demand (see `patterns.rs`).

use crate::diagnostics::SyntaxError;
use crate::parser::ast::{FunctionKind, IdentContext, MethodKind, Node, NodeKind};
use crate::parser::state::{ContextFrame, ParserState};
use crate::parser::validate::{NameSet, PropKind};
use crate::scanner::{
    ScanContext, Token, TokenKind, keyword_text, punctuation_text, token_is_assignment_operator,
};
use crate::span::Span;

/// Binary operator precedence. Zero means "not a binary operator here".
/// `in` is excluded when the `no_in` flag is set (for-statement initializers).
fn binary_precedence(kind: TokenKind, no_in: bool) -> u8 {
    match kind {
        TokenKind::BarBar => 1,
        TokenKind::AmpersandAmpersand => 2,
        TokenKind::Bar => 3,
        TokenKind::Caret => 4,
        TokenKind::Ampersand => 5,
        TokenKind::EqualsEquals
        | TokenKind::ExclamationEquals
        | TokenKind::EqualsEqualsEquals
        | TokenKind::ExclamationEqualsEquals => 6,
        TokenKind::LessThan
        | TokenKind::GreaterThan
        | TokenKind::LessThanEquals
        | TokenKind::GreaterThanEquals
        | TokenKind::InstanceOfKeyword => 7,
        TokenKind::InKeyword => {
            if no_in {
                0
            } else {
                7
            }
        }
        TokenKind::LessThanLessThan
        | TokenKind::GreaterThanGreaterThan
        | TokenKind::GreaterThanGreaterThanGreaterThan => 8,
        TokenKind::Plus | TokenKind::Minus => 9,
        TokenKind::Asterisk | TokenKind::Slash | TokenKind::Percent => 10,
        _ => 0,
    }
}

/// Operator text for binary and assignment tokens.
fn operator_text(kind: TokenKind) -> &'static str {
    punctuation_text(kind)
        .or_else(|| keyword_text(kind))
        .unwrap_or("")
}

impl ParserState {
    // =========================================================================
    // Top-Level Expression Productions
    // =========================================================================

    /// Comma-sequence expression.
    pub(crate) fn expression(&mut self, no_in: bool) -> Result<Node, SyntaxError> {
        let start = self.mark(ScanContext::Default)?;
        let first = self.assignment_expression(no_in)?;
        if self.peek_kind(ScanContext::Div)? != TokenKind::Comma {
            return Ok(first);
        }
        let mut expressions = vec![first];
        while self.eat(TokenKind::Comma, ScanContext::Div)?.is_some() {
            expressions.push(self.assignment_expression(no_in)?);
        }
        Ok(Node::new(
            NodeKind::SequenceExpression { expressions },
            self.finish_span(start),
        ))
    }

    /// Assignment-level expression: arrows, yield, and assignment operators.
    pub(crate) fn assignment_expression(&mut self, no_in: bool) -> Result<Node, SyntaxError> {
        let start = self.mark(ScanContext::Default)?;
        self.enter_recursion(Span::at(start))?;
        let result = self.assignment_expression_inner(no_in, start);
        self.leave_recursion();
        result
    }

    fn assignment_expression_inner(
        &mut self,
        no_in: bool,
        start: u32,
    ) -> Result<Node, SyntaxError> {
        // yield is an assignment-level expression inside generators
        if self.frame().is_generator {
            let token = self.peek(ScanContext::Default)?;
            let is_yield = token.kind == TokenKind::YieldKeyword
                || (token.kind == TokenKind::Identifier && token.value == "yield");
            if is_yield {
                return self.yield_expression(no_in);
            }
        } else if self.peek_kind(ScanContext::Default)? == TokenKind::YieldKeyword {
            // Strict-reserved yield outside a generator
            let token = self.peek(ScanContext::Default)?.clone();
            return self.unexpected(&token);
        }

        let mut left = self.conditional_expression(no_in)?;

        // An arrow after a cover expression turns it into a parameter list
        {
            let token = self.peek(ScanContext::Div)?;
            if token.kind == TokenKind::Arrow && !token.newline_before {
                let is_async = matches!(
                    &left.kind,
                    NodeKind::CallExpression { callee, .. }
                        if callee.identifier_value() == Some("async")
                );
                let params = self.transform_arrow_params(left)?;
                return self.arrow_function_tail(start, is_async, params);
            }
        }

        let op_kind = self.peek_kind(ScanContext::Div)?;
        if token_is_assignment_operator(op_kind) {
            if op_kind == TokenKind::Equals && left.is_pattern_cover() {
                left = self.transform_pattern(left, false)?;
            } else {
                self.check_assign_target(&mut left)?;
            }
            self.next(ScanContext::Div)?;
            let value = self.assignment_expression(no_in)?;
            return Ok(Node::new(
                NodeKind::AssignmentExpression {
                    op: operator_text(op_kind),
                    target: Box::new(left),
                    value: Box::new(value),
                },
                self.finish_span(start),
            ));
        }

        Ok(left)
    }

    fn yield_expression(&mut self, no_in: bool) -> Result<Node, SyntaxError> {
        let start = self.mark(ScanContext::Default)?;
        self.next(ScanContext::Default)?; // yield
        let delegate = self.eat(TokenKind::Asterisk, ScanContext::Default)?.is_some();
        let token = self.peek(ScanContext::Div)?;
        let has_argument = delegate
            || !(token.newline_before
                || matches!(
                    token.kind,
                    TokenKind::CloseBrace
                        | TokenKind::CloseParen
                        | TokenKind::CloseBracket
                        | TokenKind::Comma
                        | TokenKind::Semicolon
                        | TokenKind::Colon
                        | TokenKind::EndOfFile
                ));
        let expression = if has_argument {
            Some(Box::new(self.assignment_expression(no_in)?))
        } else {
            None
        };
        Ok(Node::new(
            NodeKind::YieldExpression {
                delegate,
                expression,
            },
            self.finish_span(start),
        ))
    }

    fn conditional_expression(&mut self, no_in: bool) -> Result<Node, SyntaxError> {
        let start = self.mark(ScanContext::Default)?;
        let test = self.binary_expression(no_in, 0)?;
        if self.eat(TokenKind::Question, ScanContext::Div)?.is_none() {
            return Ok(test);
        }
        let consequent = self.assignment_expression(false)?;
        self.expect(TokenKind::Colon, ScanContext::Div)?;
        let alternate = self.assignment_expression(no_in)?;
        Ok(Node::new(
            NodeKind::ConditionalExpression {
                test: Box::new(test),
                consequent: Box::new(consequent),
                alternate: Box::new(alternate),
            },
            self.finish_span(start),
        ))
    }

    fn binary_expression(&mut self, no_in: bool, min_prec: u8) -> Result<Node, SyntaxError> {
        let start = self.mark(ScanContext::Default)?;
        let mut left = self.unary_expression()?;
        loop {
            let kind = self.peek_kind(ScanContext::Div)?;
            let prec = binary_precedence(kind, no_in);
            if prec == 0 || prec <= min_prec {
                return Ok(left);
            }
            self.next(ScanContext::Div)?;
            let right = self.binary_expression(no_in, prec)?;
            left = Node::new(
                NodeKind::BinaryExpression {
                    op: operator_text(kind),
                    left: Box::new(left),
                    right: Box::new(right),
                },
                self.finish_span(start),
            );
        }
    }

    // =========================================================================
    // Unary and Postfix
    // =========================================================================

    fn unary_expression(&mut self) -> Result<Node, SyntaxError> {
        let start = self.mark(ScanContext::Default)?;
        let token = self.peek(ScanContext::Default)?.clone();

        match token.kind {
            TokenKind::DeleteKeyword
            | TokenKind::VoidKeyword
            | TokenKind::TypeOfKeyword
            | TokenKind::Exclamation
            | TokenKind::Tilde
            | TokenKind::Plus
            | TokenKind::Minus => {
                self.next(ScanContext::Default)?;
                let expression = self.unary_expression()?;
                if token.kind == TokenKind::DeleteKeyword && self.strict() {
                    let mut target: &Node = &expression;
                    while let NodeKind::ParenExpression { expression } = &target.kind {
                        target = expression.as_ref();
                    }
                    if matches!(target.kind, NodeKind::Identifier { .. }) {
                        return self
                            .fail("Cannot delete an unqualified name in strict mode", target.span);
                    }
                }
                Ok(Node::new(
                    NodeKind::UnaryExpression {
                        op: operator_text(token.kind),
                        expression: Box::new(expression),
                    },
                    self.finish_span(start),
                ))
            }
            TokenKind::PlusPlus | TokenKind::MinusMinus => {
                self.next(ScanContext::Default)?;
                let mut expression = self.unary_expression()?;
                self.check_assign_target(&mut expression)?;
                Ok(Node::new(
                    NodeKind::UpdateExpression {
                        op: operator_text(token.kind),
                        prefix: true,
                        expression: Box::new(expression),
                    },
                    self.finish_span(start),
                ))
            }
            TokenKind::Identifier if token.value == "await" && self.frame().is_async => {
                self.next(ScanContext::Default)?;
                let expression = self.unary_expression()?;
                Ok(Node::new(
                    NodeKind::UnaryExpression {
                        op: "await",
                        expression: Box::new(expression),
                    },
                    self.finish_span(start),
                ))
            }
            _ => self.postfix_expression(),
        }
    }

    fn postfix_expression(&mut self) -> Result<Node, SyntaxError> {
        let start = self.mark(ScanContext::Default)?;
        let mut expression = self.left_hand_side_expression(true)?;
        let token = self.peek(ScanContext::Div)?;
        if matches!(token.kind, TokenKind::PlusPlus | TokenKind::MinusMinus)
            && !token.newline_before
        {
            let kind = token.kind;
            self.check_assign_target(&mut expression)?;
            self.next(ScanContext::Div)?;
            return Ok(Node::new(
                NodeKind::UpdateExpression {
                    op: operator_text(kind),
                    prefix: false,
                    expression: Box::new(expression),
                },
                self.finish_span(start),
            ));
        }
        Ok(expression)
    }

    // =========================================================================
    // Left-Hand-Side Expressions
    // =========================================================================

    pub(crate) fn left_hand_side_expression(
        &mut self,
        allow_call: bool,
    ) -> Result<Node, SyntaxError> {
        let start = self.mark(ScanContext::Default)?;
        let expression = if self.peek_kind(ScanContext::Default)? == TokenKind::NewKeyword {
            self.new_expression()?
        } else {
            self.primary_expression()?
        };
        self.member_tail(expression, start, allow_call)
    }

    fn new_expression(&mut self) -> Result<Node, SyntaxError> {
        let start = self.mark(ScanContext::Default)?;
        self.expect(TokenKind::NewKeyword, ScanContext::Default)?;
        let callee = if self.peek_kind(ScanContext::Default)? == TokenKind::NewKeyword {
            self.new_expression()?
        } else {
            let inner_start = self.mark(ScanContext::Default)?;
            let primary = self.primary_expression()?;
            self.member_tail(primary, inner_start, false)?
        };
        let arguments = if self.peek_kind(ScanContext::Div)? == TokenKind::OpenParen {
            self.arguments()?
        } else {
            Vec::new()
        };
        Ok(Node::new(
            NodeKind::NewExpression {
                callee: Box::new(callee),
                arguments,
            },
            self.finish_span(start),
        ))
    }

    fn member_tail(
        &mut self,
        mut expression: Node,
        start: u32,
        allow_call: bool,
    ) -> Result<Node, SyntaxError> {
        loop {
            match self.peek_kind(ScanContext::Div)? {
                TokenKind::Dot => {
                    self.next(ScanContext::Div)?;
                    let property = self.identifier_name()?;
                    expression = Node::new(
                        NodeKind::MemberExpression {
                            object: Box::new(expression),
                            property: Box::new(property),
                            computed: false,
                        },
                        self.finish_span(start),
                    );
                }
                TokenKind::OpenBracket => {
                    self.next(ScanContext::Div)?;
                    let property = self.expression(false)?;
                    self.expect(TokenKind::CloseBracket, ScanContext::Div)?;
                    expression = Node::new(
                        NodeKind::MemberExpression {
                            object: Box::new(expression),
                            property: Box::new(property),
                            computed: true,
                        },
                        self.finish_span(start),
                    );
                }
                TokenKind::OpenParen if allow_call => {
                    let arguments = self.arguments()?;
                    expression = Node::new(
                        NodeKind::CallExpression {
                            callee: Box::new(expression),
                            arguments,
                        },
                        self.finish_span(start),
                    );
                }
                TokenKind::Template => {
                    let template = self.template_expression_node()?;
                    expression = Node::new(
                        NodeKind::TaggedTemplateExpression {
                            tag: Box::new(expression),
                            template: Box::new(template),
                        },
                        self.finish_span(start),
                    );
                }
                _ => return Ok(expression),
            }
        }
    }

    fn arguments(&mut self) -> Result<Vec<Node>, SyntaxError> {
        self.expect(TokenKind::OpenParen, ScanContext::Div)?;
        let mut arguments = Vec::new();
        loop {
            if self.peek_kind(ScanContext::Default)? == TokenKind::CloseParen {
                break;
            }
            if self.peek_kind(ScanContext::Default)? == TokenKind::DotDotDot {
                let spread_start = self.mark(ScanContext::Default)?;
                self.next(ScanContext::Default)?;
                let expression = self.assignment_expression(false)?;
                arguments.push(Node::new(
                    NodeKind::SpreadExpression {
                        expression: Box::new(expression),
                    },
                    self.finish_span(spread_start),
                ));
            } else {
                arguments.push(self.assignment_expression(false)?);
            }
            if self.eat(TokenKind::Comma, ScanContext::Div)?.is_none() {
                break;
            }
        }
        self.expect(TokenKind::CloseParen, ScanContext::Div)?;
        Ok(arguments)
    }

    // =========================================================================
    // Primary Expressions
    // =========================================================================

    fn primary_expression(&mut self) -> Result<Node, SyntaxError> {
        let token = self.peek(ScanContext::Default)?.clone();
        let start = token.span.start;

        match token.kind {
            TokenKind::Identifier => {
                // async function expressions and async arrows start with the
                // contextual word `async` on the same line
                if token.value == "async" {
                    let next = self.peek_at(ScanContext::Default, 1)?.clone();
                    if !next.newline_before {
                        if next.kind == TokenKind::FunctionKeyword {
                            return self.function_expression_from(start, true);
                        }
                        if next.kind == TokenKind::Identifier {
                            // `async x => ...` is the only legal continuation
                            self.next(ScanContext::Default)?;
                            let mut param = self.identifier_reference()?;
                            self.check_binding_ident(&mut param)?;
                            let param_span = param.span;
                            let params = vec![Node::new(
                                NodeKind::FormalParameter {
                                    pattern: Box::new(param),
                                    init: None,
                                },
                                param_span,
                            )];
                            self.expect(TokenKind::Arrow, ScanContext::Div)?;
                            return self.arrow_function_body(start, true, params);
                        }
                    }
                }
                self.identifier_reference()
            }
            TokenKind::Number => {
                self.next(ScanContext::Default)?;
                Ok(Node::new(
                    NodeKind::NumberLiteral {
                        value: token.number,
                    },
                    token.span,
                ))
            }
            TokenKind::String => {
                self.next(ScanContext::Default)?;
                Ok(Node::new(
                    NodeKind::StringLiteral {
                        value: token.value,
                    },
                    token.span,
                ))
            }
            TokenKind::Regex => {
                self.next(ScanContext::Default)?;
                Ok(Node::new(
                    NodeKind::RegularExpression {
                        value: token.value,
                        flags: token.regex_flags.unwrap_or_default(),
                    },
                    token.span,
                ))
            }
            TokenKind::Template => self.template_expression_node(),
            TokenKind::NullKeyword => {
                self.next(ScanContext::Default)?;
                Ok(Node::new(NodeKind::Null, token.span))
            }
            TokenKind::TrueKeyword | TokenKind::FalseKeyword => {
                self.next(ScanContext::Default)?;
                Ok(Node::new(
                    NodeKind::Boolean {
                        value: token.kind == TokenKind::TrueKeyword,
                    },
                    token.span,
                ))
            }
            TokenKind::ThisKeyword => {
                self.next(ScanContext::Default)?;
                Ok(Node::new(NodeKind::ThisExpression, token.span))
            }
            TokenKind::SuperKeyword => {
                if !self.frame().allow_super {
                    return self.fail("'super' is only allowed inside methods", token.span);
                }
                self.next(ScanContext::Default)?;
                let follow = self.peek_kind(ScanContext::Div)?;
                if !matches!(
                    follow,
                    TokenKind::Dot | TokenKind::OpenBracket | TokenKind::OpenParen
                ) {
                    return self.fail("Invalid use of 'super'", token.span);
                }
                Ok(Node::new(NodeKind::SuperExpression, token.span))
            }
            TokenKind::FunctionKeyword => self.function_expression_from(start, false),
            TokenKind::ClassKeyword => self.class_expression(),
            TokenKind::OpenParen => self.paren_expression(),
            TokenKind::OpenBracket => self.array_literal(),
            TokenKind::OpenBrace => self.object_literal(),
            _ => self.unexpected(&token),
        }
    }

    pub(crate) fn identifier_reference(&mut self) -> Result<Node, SyntaxError> {
        let token = self.next(ScanContext::Default)?;
        if token.kind != TokenKind::Identifier {
            return self.unexpected(&token);
        }
        Ok(Node::new(
            NodeKind::Identifier {
                value: token.value,
                context: IdentContext::None,
            },
            token.span,
        ))
    }

    /// An identifier in name position: reserved words are allowed.
    pub(crate) fn identifier_name(&mut self) -> Result<Node, SyntaxError> {
        let token = self.next(ScanContext::Name)?;
        if token.kind != TokenKind::Identifier {
            return self.unexpected(&token);
        }
        Ok(Node::new(
            NodeKind::Identifier {
                value: token.value,
                context: IdentContext::None,
            },
            token.span,
        ))
    }

    /// An identifier used as a binding target.
    pub(crate) fn binding_identifier(&mut self) -> Result<Node, SyntaxError> {
        let mut node = self.identifier_reference()?;
        self.check_binding_ident(&mut node)?;
        Ok(node)
    }

    // =========================================================================
    // Parenthesized Expressions and Arrow Covers
    // =========================================================================

    /// `( ... )`: a parenthesized expression, an arrow parameter cover, or a
    /// generator comprehension. A trailing `...rest` is consumed
    /// speculatively and deferred as an error unless an arrow follows.
    fn paren_expression(&mut self) -> Result<Node, SyntaxError> {
        let start = self.mark(ScanContext::Default)?;
        self.expect(TokenKind::OpenParen, ScanContext::Default)?;

        // Empty parens can only begin an arrow function
        if self.peek_kind(ScanContext::Default)? == TokenKind::CloseParen {
            self.next(ScanContext::Default)?;
            self.expect(TokenKind::Arrow, ScanContext::Div)?;
            return self.arrow_function_body(start, false, Vec::new());
        }

        if self.peek_kind(ScanContext::Default)? == TokenKind::ForKeyword {
            return self.generator_comprehension(start);
        }

        let mut expressions = Vec::new();
        loop {
            if self.peek_kind(ScanContext::Default)? == TokenKind::DotDotDot {
                let spread_start = self.mark(ScanContext::Default)?;
                self.next(ScanContext::Default)?;
                let ident = self.identifier_reference()?;
                let span = self.finish_span(spread_start);
                // Only legal if this turns out to be an arrow parameter list
                self.add_invalid_node(span, "Unexpected token '...'", false);
                expressions.push(Node::new(
                    NodeKind::SpreadExpression {
                        expression: Box::new(ident),
                    },
                    span,
                ));
                break;
            }
            expressions.push(self.assignment_expression(false)?);
            if self.eat(TokenKind::Comma, ScanContext::Div)?.is_none() {
                break;
            }
        }
        self.expect(TokenKind::CloseParen, ScanContext::Div)?;
        let span = self.finish_span(start);

        let expression = if expressions.len() == 1 {
            expressions.pop().unwrap()
        } else {
            let seq_span = Span::new(
                expressions.first().map(|n| n.span.start).unwrap_or(start),
                expressions.last().map(|n| n.span.end).unwrap_or(start),
            );
            Node::new(NodeKind::SequenceExpression { expressions }, seq_span)
        };
        Ok(Node::new(
            NodeKind::ParenExpression {
                expression: Box::new(expression),
            },
            span,
        ))
    }

    /// Parse the `=> body` part of an arrow function. Expects the arrow to
    /// be the next token.
    fn arrow_function_tail(
        &mut self,
        start: u32,
        is_async: bool,
        params: Vec<Node>,
    ) -> Result<Node, SyntaxError> {
        self.expect(TokenKind::Arrow, ScanContext::Div)?;
        self.arrow_function_body(start, is_async, params)
    }

    /// Parse an arrow body (block or concise expression) with the arrow
    /// already consumed.
    pub(crate) fn arrow_function_body(
        &mut self,
        start: u32,
        is_async: bool,
        params: Vec<Node>,
    ) -> Result<Node, SyntaxError> {
        let mut frame = self.function_frame(false, is_async);
        // Arrows do not rebind `super`
        frame.allow_super = self.frame().allow_super;
        self.push_frame(frame);
        let body = if self.peek_kind(ScanContext::Default)? == TokenKind::OpenBrace {
            self.function_body()?
        } else {
            self.assignment_expression(false)?
        };
        self.check_parameters(&params)?;
        self.pop_frame()?;
        Ok(Node::new(
            NodeKind::ArrowFunction {
                is_async,
                params,
                body: Box::new(body),
            },
            self.finish_span(start),
        ))
    }

    // =========================================================================
    // Array Literals and Comprehensions
    // =========================================================================

    pub(crate) fn array_literal(&mut self) -> Result<Node, SyntaxError> {
        let start = self.mark(ScanContext::Default)?;
        self.expect(TokenKind::OpenBracket, ScanContext::Default)?;

        if self.peek_kind(ScanContext::Default)? == TokenKind::ForKeyword {
            let qualifiers = self.comprehension_qualifiers()?;
            let expression = self.assignment_expression(false)?;
            self.expect(TokenKind::CloseBracket, ScanContext::Div)?;
            return Ok(Node::new(
                NodeKind::ArrayComprehension {
                    qualifiers,
                    expression: Box::new(expression),
                },
                self.finish_span(start),
            ));
        }

        let mut elements: Vec<Option<Node>> = Vec::new();
        loop {
            match self.peek_kind(ScanContext::Default)? {
                TokenKind::CloseBracket => break,
                TokenKind::Comma => {
                    // Elision
                    self.next(ScanContext::Default)?;
                    elements.push(None);
                }
                TokenKind::DotDotDot => {
                    let spread_start = self.mark(ScanContext::Default)?;
                    self.next(ScanContext::Default)?;
                    let expression = self.assignment_expression(false)?;
                    elements.push(Some(Node::new(
                        NodeKind::SpreadExpression {
                            expression: Box::new(expression),
                        },
                        self.finish_span(spread_start),
                    )));
                    if self.eat(TokenKind::Comma, ScanContext::Div)?.is_none() {
                        break;
                    }
                }
                _ => {
                    elements.push(Some(self.assignment_expression(false)?));
                    if self.eat(TokenKind::Comma, ScanContext::Div)?.is_none() {
                        break;
                    }
                }
            }
        }
        self.expect(TokenKind::CloseBracket, ScanContext::Div)?;
        Ok(Node::new(
            NodeKind::ArrayLiteral { elements },
            self.finish_span(start),
        ))
    }

    fn generator_comprehension(&mut self, start: u32) -> Result<Node, SyntaxError> {
        let qualifiers = self.comprehension_qualifiers()?;
        let expression = self.assignment_expression(false)?;
        self.expect(TokenKind::CloseParen, ScanContext::Div)?;
        Ok(Node::new(
            NodeKind::GeneratorComprehension {
                qualifiers,
                expression: Box::new(expression),
            },
            self.finish_span(start),
        ))
    }

    /// `for (pattern of expr)` and `if (test)` qualifiers, at least one
    /// `for` first.
    fn comprehension_qualifiers(&mut self) -> Result<Vec<Node>, SyntaxError> {
        let mut qualifiers = Vec::new();
        loop {
            match self.peek_kind(ScanContext::Default)? {
                TokenKind::ForKeyword => {
                    let start = self.mark(ScanContext::Default)?;
                    self.next(ScanContext::Default)?;
                    self.expect(TokenKind::OpenParen, ScanContext::Default)?;
                    let pattern = self.binding_pattern_or_identifier()?;
                    let token = self.next(ScanContext::Default)?;
                    if token.kind != TokenKind::Identifier || token.value != "of" {
                        return self.unexpected(&token);
                    }
                    let of = self.assignment_expression(false)?;
                    self.expect(TokenKind::CloseParen, ScanContext::Div)?;
                    qualifiers.push(Node::new(
                        NodeKind::ComprehensionFor {
                            pattern: Box::new(pattern),
                            of: Box::new(of),
                        },
                        self.finish_span(start),
                    ));
                }
                TokenKind::IfKeyword => {
                    let start = self.mark(ScanContext::Default)?;
                    self.next(ScanContext::Default)?;
                    self.expect(TokenKind::OpenParen, ScanContext::Default)?;
                    let test = self.expression(false)?;
                    self.expect(TokenKind::CloseParen, ScanContext::Div)?;
                    qualifiers.push(Node::new(
                        NodeKind::ComprehensionIf {
                            test: Box::new(test),
                        },
                        self.finish_span(start),
                    ));
                }
                _ => break,
            }
        }
        Ok(qualifiers)
    }

    /// A binding identifier or a destructuring pattern (via the cover
    /// grammar), used in declarators, catch clauses, and comprehensions.
    pub(crate) fn binding_pattern_or_identifier(&mut self) -> Result<Node, SyntaxError> {
        match self.peek_kind(ScanContext::Default)? {
            TokenKind::OpenBracket => {
                let cover = self.array_literal()?;
                self.transform_pattern(cover, true)
            }
            TokenKind::OpenBrace => {
                let cover = self.object_literal()?;
                self.transform_pattern(cover, true)
            }
            _ => self.binding_identifier(),
        }
    }

    // =========================================================================
    // Object Literals
    // =========================================================================

    pub(crate) fn object_literal(&mut self) -> Result<Node, SyntaxError> {
        let start = self.mark(ScanContext::Default)?;
        self.expect(TokenKind::OpenBrace, ScanContext::Default)?;
        let mut properties = Vec::new();
        let mut names = NameSet::new();
        loop {
            if self.peek_kind(ScanContext::Default)? == TokenKind::CloseBrace {
                break;
            }
            let property = self.property_definition()?;
            self.note_duplicate_name(&mut names, &property);
            properties.push(property);
            if self.eat(TokenKind::Comma, ScanContext::Div)?.is_none() {
                break;
            }
        }
        self.expect(TokenKind::CloseBrace, ScanContext::Div)?;
        Ok(Node::new(
            NodeKind::ObjectLiteral { properties },
            self.finish_span(start),
        ))
    }

    /// Record a duplicate-name conflict as a deferred error.
    pub(crate) fn note_duplicate_name(&mut self, names: &mut NameSet, property: &Node) {
        let (name_node, kind) = match &property.kind {
            NodeKind::PropertyDefinition { name, .. }
            | NodeKind::CoveredPatternProperty { name, .. } => (name, PropKind::Data),
            NodeKind::MethodDefinition { kind, name, .. } => {
                let prop_kind = match kind {
                    MethodKind::Get => PropKind::Get,
                    MethodKind::Set => PropKind::Set,
                    _ => PropKind::Data,
                };
                (name, prop_kind)
            }
            _ => return,
        };
        let key = match &name_node.kind {
            NodeKind::Identifier { value, .. } => value.clone(),
            NodeKind::StringLiteral { value } => value.clone(),
            NodeKind::NumberLiteral { value } => format!("{value}"),
            // Computed names cannot be checked statically
            _ => return,
        };
        if let Some((message, strict_only)) = names.add(&key, kind) {
            self.add_invalid_node(property.span, message, strict_only);
        }
    }

    fn property_definition(&mut self) -> Result<Node, SyntaxError> {
        let start = self.mark(ScanContext::Default)?;

        if self.eat(TokenKind::Asterisk, ScanContext::Default)?.is_some() {
            let name = self.property_name()?;
            return self.method_definition(start, MethodKind::Generator, name);
        }

        let token = self.peek(ScanContext::Name)?.clone();
        if token.kind == TokenKind::Identifier {
            // get / set / async prefixes apply when another property name
            // follows
            let is_accessor = token.value == "get" || token.value == "set";
            let is_async = token.value == "async";
            if is_accessor || is_async {
                let next = self.peek_at(ScanContext::Default, 1)?.clone();
                let name_follows = matches!(
                    next.kind,
                    TokenKind::Identifier
                        | TokenKind::String
                        | TokenKind::Number
                        | TokenKind::OpenBracket
                ) || crate::scanner::token_is_keyword(next.kind);
                if name_follows && !(is_async && next.newline_before) {
                    self.next(ScanContext::Name)?;
                    let name = self.property_name()?;
                    let kind = match token.value.as_str() {
                        "get" => MethodKind::Get,
                        "set" => MethodKind::Set,
                        _ => MethodKind::Async,
                    };
                    return self.method_definition(start, kind, name);
                }
            }
        }

        let name = self.property_name()?;
        match self.peek_kind(ScanContext::Div)? {
            TokenKind::Colon => {
                self.next(ScanContext::Div)?;
                let value = self.assignment_expression(false)?;
                Ok(Node::new(
                    NodeKind::PropertyDefinition {
                        name: Box::new(name),
                        value: Some(Box::new(value)),
                    },
                    self.finish_span(start),
                ))
            }
            TokenKind::OpenParen => self.method_definition(start, MethodKind::Normal, name),
            TokenKind::Equals => {
                // Shorthand with initializer: only meaningful once the
                // literal is reinterpreted as a pattern
                self.next(ScanContext::Div)?;
                let init = self.assignment_expression(false)?;
                let span = self.finish_span(start);
                self.add_invalid_node(span, "Invalid shorthand property initializer", false);
                Ok(Node::new(
                    NodeKind::CoveredPatternProperty {
                        name: Box::new(name),
                        init: Box::new(init),
                    },
                    span,
                ))
            }
            _ => {
                // Shorthand: the name doubles as an identifier reference
                let span = self.finish_span(start);
                let valid = match name.identifier_value() {
                    Some(value) => {
                        crate::scanner::text_to_reserved_word(value).is_none()
                            && !(self.strict()
                                && crate::scanner::text_to_strict_reserved_word(value).is_some())
                    }
                    None => false,
                };
                if !valid {
                    return self.fail("Invalid shorthand property name", name.span);
                }
                Ok(Node::new(
                    NodeKind::PropertyDefinition {
                        name: Box::new(name),
                        value: None,
                    },
                    span,
                ))
            }
        }
    }

    pub(crate) fn property_name(&mut self) -> Result<Node, SyntaxError> {
        let token = self.peek(ScanContext::Name)?.clone();
        match token.kind {
            TokenKind::Identifier => self.identifier_name(),
            TokenKind::String => {
                self.next(ScanContext::Name)?;
                Ok(Node::new(
                    NodeKind::StringLiteral { value: token.value },
                    token.span,
                ))
            }
            TokenKind::Number => {
                self.next(ScanContext::Name)?;
                Ok(Node::new(
                    NodeKind::NumberLiteral {
                        value: token.number,
                    },
                    token.span,
                ))
            }
            TokenKind::OpenBracket => {
                let start = token.span.start;
                self.next(ScanContext::Name)?;
                let expression = self.assignment_expression(false)?;
                self.expect(TokenKind::CloseBracket, ScanContext::Div)?;
                Ok(Node::new(
                    NodeKind::ComputedPropertyName {
                        expression: Box::new(expression),
                    },
                    self.finish_span(start),
                ))
            }
            _ => self.unexpected(&token),
        }
    }

    /// Parse a method's parameter list and body. Shared by object literals
    /// and class bodies.
    pub(crate) fn method_definition(
        &mut self,
        start: u32,
        kind: MethodKind,
        name: Node,
    ) -> Result<Node, SyntaxError> {
        let mut frame = self.function_frame(
            kind == MethodKind::Generator,
            kind == MethodKind::Async,
        );
        frame.allow_super = true;
        frame.method_name = name.identifier_value().map(str::to_string);
        self.push_frame(frame);
        let params = self.formal_parameters()?;
        match kind {
            MethodKind::Get if !params.is_empty() => {
                return self.fail("Getters cannot have parameters", name.span);
            }
            MethodKind::Set if params.len() != 1 => {
                return self.fail("Setters must have exactly one parameter", name.span);
            }
            _ => {}
        }
        let body = self.function_body()?;
        self.check_parameters(&params)?;
        self.pop_frame()?;
        Ok(Node::new(
            NodeKind::MethodDefinition {
                kind,
                name: Box::new(name),
                params,
                body: Box::new(body),
            },
            self.finish_span(start),
        ))
    }

    // =========================================================================
    // Templates
    // =========================================================================

    /// Parse a full template literal starting at the current `Template`
    /// token. Pieces and substitutions are interleaved in source order.
    pub(crate) fn template_expression_node(&mut self) -> Result<Node, SyntaxError> {
        let start = self.mark(ScanContext::Default)?;
        let head = self.next(ScanContext::Default)?;
        debug_assert_eq!(head.kind, TokenKind::Template);
        let mut parts = vec![self.template_piece(&head)];
        let mut done = head.template_end;
        while !done {
            let expression = self.expression(false)?;
            parts.push(expression);
            let piece = self.next(ScanContext::Template)?;
            if piece.kind != TokenKind::Template {
                return self.unexpected(&piece);
            }
            done = piece.template_end;
            parts.push(self.template_piece(&piece));
        }
        Ok(Node::new(
            NodeKind::TemplateExpression { parts },
            self.finish_span(start),
        ))
    }

    /// Build a `Template` piece node from its token, capturing both the
    /// cooked value and the raw source text between the delimiters.
    fn template_piece(&self, token: &Token) -> Node {
        let span = token.span;
        let trailing = if token.template_end { 1 } else { 2 };
        let raw_span = Span::new(span.start + 1, span.end.saturating_sub(trailing));
        let raw = self.raw(raw_span).to_string();
        Node::new(
            NodeKind::Template {
                value: token.value.clone(),
                raw,
            },
            span,
        )
    }

    // =========================================================================
    // Function and Class Expressions
    // =========================================================================

    fn function_expression_from(
        &mut self,
        start: u32,
        is_async: bool,
    ) -> Result<Node, SyntaxError> {
        if is_async {
            self.next(ScanContext::Default)?; // async
        }
        self.expect(TokenKind::FunctionKeyword, ScanContext::Default)?;
        let is_generator = self.eat(TokenKind::Asterisk, ScanContext::Default)?.is_some();
        let kind = if is_async {
            FunctionKind::Async
        } else if is_generator {
            FunctionKind::Generator
        } else {
            FunctionKind::Normal
        };

        self.push_frame(self.function_frame(is_generator, is_async));
        // An expression's name binds inside the function itself
        let name = if self.peek_kind(ScanContext::Default)? == TokenKind::Identifier {
            Some(Box::new(self.binding_identifier()?))
        } else {
            None
        };
        let params = self.formal_parameters()?;
        let body = self.function_body()?;
        self.check_parameters(&params)?;
        self.pop_frame()?;

        Ok(Node::new(
            NodeKind::FunctionExpression {
                kind,
                name,
                params,
                body: Box::new(body),
            },
            self.finish_span(start),
        ))
    }

    fn class_expression(&mut self) -> Result<Node, SyntaxError> {
        let start = self.mark(ScanContext::Default)?;
        self.expect(TokenKind::ClassKeyword, ScanContext::Default)?;
        // Class bodies (including the extends clause) are strict
        self.push_frame(ContextFrame {
            strict: true,
            ..ContextFrame::default()
        });
        let name = if self.peek_kind(ScanContext::Default)? == TokenKind::Identifier {
            Some(Box::new(self.binding_identifier()?))
        } else {
            None
        };
        let (base, body) = self.class_tail()?;
        self.pop_frame()?;
        Ok(Node::new(
            NodeKind::ClassExpression { name, base, body },
            self.finish_span(start),
        ))
    }

    /// Parse `extends <expr>` and the class body. The caller has pushed the
    /// strict class frame.
    pub(crate) fn class_tail(
        &mut self,
    ) -> Result<(Option<Box<Node>>, Box<Node>), SyntaxError> {
        let base = if self
            .eat(TokenKind::ExtendsKeyword, ScanContext::Default)?
            .is_some()
        {
            Some(Box::new(self.left_hand_side_expression(true)?))
        } else {
            None
        };

        let body_start = self.mark(ScanContext::Default)?;
        self.expect(TokenKind::OpenBrace, ScanContext::Default)?;
        let mut elements = Vec::new();
        let mut instance_names = NameSet::new();
        let mut static_names = NameSet::new();
        loop {
            if self.eat(TokenKind::Semicolon, ScanContext::Default)?.is_some() {
                continue;
            }
            if self.peek_kind(ScanContext::Default)? == TokenKind::CloseBrace {
                break;
            }
            let element_start = self.mark(ScanContext::Default)?;

            // `static` is a prefix unless it is itself the method name
            let mut is_static = false;
            let token = self.peek(ScanContext::Default)?.clone();
            if token.kind == TokenKind::StaticKeyword
                || (token.kind == TokenKind::Identifier && token.value == "static")
            {
                let next = self.peek_at(ScanContext::Default, 1)?;
                if next.kind != TokenKind::OpenParen {
                    self.next(ScanContext::Default)?;
                    is_static = true;
                }
            }

            let method = self.class_method_definition(element_start)?;
            let names = if is_static {
                &mut static_names
            } else {
                &mut instance_names
            };
            self.note_duplicate_name(names, &method);
            let span = self.finish_span(element_start);
            elements.push(Node::new(
                NodeKind::ClassElement {
                    is_static,
                    method: Box::new(method),
                },
                span,
            ));
        }
        self.expect(TokenKind::CloseBrace, ScanContext::Div)?;
        let body = Node::new(
            NodeKind::ClassBody { elements },
            self.finish_span(body_start),
        );
        Ok((base, Box::new(body)))
    }

    /// A method definition inside a class body (no shorthand/data forms).
    fn class_method_definition(&mut self, start: u32) -> Result<Node, SyntaxError> {
        if self.eat(TokenKind::Asterisk, ScanContext::Default)?.is_some() {
            let name = self.property_name()?;
            return self.method_definition(start, MethodKind::Generator, name);
        }
        let token = self.peek(ScanContext::Name)?.clone();
        if token.kind == TokenKind::Identifier
            && (token.value == "get" || token.value == "set" || token.value == "async")
        {
            let next = self.peek_at(ScanContext::Default, 1)?.clone();
            let name_follows = matches!(
                next.kind,
                TokenKind::Identifier
                    | TokenKind::String
                    | TokenKind::Number
                    | TokenKind::OpenBracket
            ) || crate::scanner::token_is_keyword(next.kind);
            if name_follows && !(token.value == "async" && next.newline_before) {
                self.next(ScanContext::Name)?;
                let name = self.property_name()?;
                let kind = match token.value.as_str() {
                    "get" => MethodKind::Get,
                    "set" => MethodKind::Set,
                    _ => MethodKind::Async,
                };
                return self.method_definition(start, kind, name);
            }
        }
        let name = self.property_name()?;
        self.method_definition(start, MethodKind::Normal, name)
    }
}
