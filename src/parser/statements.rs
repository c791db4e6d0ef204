//! Statement and declaration grammar.
//!
//! Statement lists handle the directive prologue; labels, `break`,
//! `continue`, and `return` are validated against the context stack as they
//! are parsed.

use crate::diagnostics::SyntaxError;
use crate::parser::ast::{DeclKind, FunctionKind, Node, NodeKind};
use crate::parser::state::{ContextFrame, LabelInfo, ParserState};
use crate::scanner::{ScanContext, TokenKind};
use crate::span::Span;

impl ParserState {
    // =========================================================================
    // Statement Lists
    // =========================================================================

    /// Parse statements until `}` or end of input. When `prologue` is set,
    /// leading string expression statements are directive candidates.
    pub(crate) fn statement_list(
        &mut self,
        prologue: bool,
        module_top: bool,
    ) -> Result<Vec<Node>, SyntaxError> {
        let mut statements = Vec::new();
        let mut in_prologue = prologue;
        loop {
            match self.peek_kind(ScanContext::Default)? {
                TokenKind::CloseBrace | TokenKind::EndOfFile => break,
                _ => {}
            }
            let statement = if module_top {
                self.module_item()?
            } else {
                self.statement()?
            };
            if in_prologue {
                in_prologue = self.apply_directive(&statement);
            }
            statements.push(statement);
        }
        Ok(statements)
    }

    // =========================================================================
    // Statement Dispatch
    // =========================================================================

    pub(crate) fn statement(&mut self) -> Result<Node, SyntaxError> {
        let token = self.peek(ScanContext::Default)?.clone();
        self.enter_recursion(token.span)?;
        let result = match token.kind {
            TokenKind::OpenBrace => self.block(),
            TokenKind::Semicolon => {
                self.next(ScanContext::Default)?;
                Ok(Node::new(NodeKind::EmptyStatement, token.span))
            }
            TokenKind::VarKeyword => self.variable_statement(DeclKind::Var),
            TokenKind::ConstKeyword => self.variable_statement(DeclKind::Const),
            TokenKind::LetKeyword => self.variable_statement(DeclKind::Let),
            TokenKind::FunctionKeyword => self.function_declaration(false),
            TokenKind::ClassKeyword => self.class_declaration(),
            TokenKind::IfKeyword => self.if_statement(),
            TokenKind::DoKeyword => self.do_while_statement(),
            TokenKind::WhileKeyword => self.while_statement(),
            TokenKind::ForKeyword => self.for_statement(),
            TokenKind::SwitchKeyword => self.switch_statement(),
            TokenKind::ReturnKeyword => self.return_statement(),
            TokenKind::BreakKeyword => self.break_or_continue(true),
            TokenKind::ContinueKeyword => self.break_or_continue(false),
            TokenKind::ThrowKeyword => self.throw_statement(),
            TokenKind::TryKeyword => self.try_statement(),
            TokenKind::WithKeyword => self.with_statement(),
            TokenKind::DebuggerKeyword => {
                self.next(ScanContext::Default)?;
                self.consume_semicolon()?;
                Ok(Node::new(
                    NodeKind::DebuggerStatement,
                    self.finish_span(token.span.start),
                ))
            }
            TokenKind::Identifier => {
                let next = self.peek_at(ScanContext::Default, 1)?.clone();
                if token.value == "let"
                    && matches!(
                        next.kind,
                        TokenKind::Identifier | TokenKind::OpenBracket | TokenKind::OpenBrace
                    )
                {
                    self.variable_statement(DeclKind::Let)
                } else if token.value == "async"
                    && next.kind == TokenKind::FunctionKeyword
                    && !next.newline_before
                {
                    self.function_declaration(true)
                } else if next.kind == TokenKind::Colon {
                    self.labelled_statement()
                } else {
                    self.expression_statement()
                }
            }
            _ => self.expression_statement(),
        };
        self.leave_recursion();
        result
    }

    fn expression_statement(&mut self) -> Result<Node, SyntaxError> {
        let start = self.mark(ScanContext::Default)?;
        let expression = self.expression(false)?;
        self.consume_semicolon()?;
        Ok(Node::new(
            NodeKind::ExpressionStatement {
                expression: Box::new(expression),
            },
            self.finish_span(start),
        ))
    }

    pub(crate) fn block(&mut self) -> Result<Node, SyntaxError> {
        let start = self.mark(ScanContext::Default)?;
        self.expect(TokenKind::OpenBrace, ScanContext::Default)?;
        let statements = self.statement_list(false, false)?;
        self.expect(TokenKind::CloseBrace, ScanContext::Default)?;
        Ok(Node::new(
            NodeKind::Block { statements },
            self.finish_span(start),
        ))
    }

    // =========================================================================
    // Variable Declarations
    // =========================================================================

    fn variable_statement(&mut self, keyword: DeclKind) -> Result<Node, SyntaxError> {
        let declaration = self.variable_declaration(keyword, false, false)?;
        self.consume_semicolon()?;
        Ok(declaration)
    }

    /// A `var`/`let`/`const` declaration. `in_for_head` relaxes the `const`
    /// initializer requirement for `for (const x of ...)` heads.
    pub(crate) fn variable_declaration(
        &mut self,
        keyword: DeclKind,
        no_in: bool,
        in_for_head: bool,
    ) -> Result<Node, SyntaxError> {
        let start = self.mark(ScanContext::Default)?;
        self.next(ScanContext::Default)?; // var / let / const
        let mut declarations = Vec::new();
        loop {
            declarations.push(self.variable_declarator(keyword, no_in, in_for_head)?);
            if self.eat(TokenKind::Comma, ScanContext::Div)?.is_none() {
                break;
            }
        }
        Ok(Node::new(
            NodeKind::VariableDeclaration {
                keyword,
                declarations,
            },
            self.finish_span(start),
        ))
    }

    fn variable_declarator(
        &mut self,
        keyword: DeclKind,
        no_in: bool,
        in_for_head: bool,
    ) -> Result<Node, SyntaxError> {
        let start = self.mark(ScanContext::Default)?;
        let pattern = self.binding_pattern_or_identifier()?;
        let init = if self.eat(TokenKind::Equals, ScanContext::Div)?.is_some() {
            Some(Box::new(self.assignment_expression(no_in)?))
        } else {
            None
        };
        let span = self.finish_span(start);
        if init.is_none() && !in_for_head {
            if keyword == DeclKind::Const {
                return self.fail("Missing initializer in const declaration", span);
            }
            if pattern.is_pattern() {
                return self.fail("Missing initializer in destructuring declaration", span);
            }
        }
        Ok(Node::new(
            NodeKind::VariableDeclarator {
                pattern: Box::new(pattern),
                init,
            },
            span,
        ))
    }

    // =========================================================================
    // Control Flow
    // =========================================================================

    fn if_statement(&mut self) -> Result<Node, SyntaxError> {
        let start = self.mark(ScanContext::Default)?;
        self.next(ScanContext::Default)?; // if
        self.expect(TokenKind::OpenParen, ScanContext::Default)?;
        let test = self.expression(false)?;
        self.expect(TokenKind::CloseParen, ScanContext::Div)?;
        let consequent = self.statement()?;
        let alternate = if self.eat(TokenKind::ElseKeyword, ScanContext::Default)?.is_some() {
            Some(Box::new(self.statement()?))
        } else {
            None
        };
        Ok(Node::new(
            NodeKind::IfStatement {
                test: Box::new(test),
                consequent: Box::new(consequent),
                alternate,
            },
            self.finish_span(start),
        ))
    }

    fn iteration_body(&mut self) -> Result<Node, SyntaxError> {
        self.frame_mut().loop_depth += 1;
        let body = self.statement();
        self.frame_mut().loop_depth -= 1;
        body
    }

    fn do_while_statement(&mut self) -> Result<Node, SyntaxError> {
        let start = self.mark(ScanContext::Default)?;
        self.next(ScanContext::Default)?; // do
        let body = self.iteration_body()?;
        self.expect(TokenKind::WhileKeyword, ScanContext::Default)?;
        self.expect(TokenKind::OpenParen, ScanContext::Default)?;
        let test = self.expression(false)?;
        self.expect(TokenKind::CloseParen, ScanContext::Div)?;
        // The semicolon after do-while is always optional
        self.eat(TokenKind::Semicolon, ScanContext::Default)?;
        Ok(Node::new(
            NodeKind::DoWhileStatement {
                body: Box::new(body),
                test: Box::new(test),
            },
            self.finish_span(start),
        ))
    }

    fn while_statement(&mut self) -> Result<Node, SyntaxError> {
        let start = self.mark(ScanContext::Default)?;
        self.next(ScanContext::Default)?; // while
        self.expect(TokenKind::OpenParen, ScanContext::Default)?;
        let test = self.expression(false)?;
        self.expect(TokenKind::CloseParen, ScanContext::Div)?;
        let body = self.iteration_body()?;
        Ok(Node::new(
            NodeKind::WhileStatement {
                test: Box::new(test),
                body: Box::new(body),
            },
            self.finish_span(start),
        ))
    }

    fn for_statement(&mut self) -> Result<Node, SyntaxError> {
        let start = self.mark(ScanContext::Default)?;
        self.next(ScanContext::Default)?; // for
        self.expect(TokenKind::OpenParen, ScanContext::Default)?;

        let head = self.peek(ScanContext::Default)?.clone();
        let init: Option<Node> = match head.kind {
            TokenKind::Semicolon => None,
            TokenKind::VarKeyword => {
                Some(self.variable_declaration(DeclKind::Var, true, true)?)
            }
            TokenKind::ConstKeyword => {
                Some(self.variable_declaration(DeclKind::Const, true, true)?)
            }
            TokenKind::LetKeyword => Some(self.variable_declaration(DeclKind::Let, true, true)?),
            TokenKind::Identifier if head.value == "let" => {
                let next = self.peek_at(ScanContext::Default, 1)?.kind;
                if matches!(
                    next,
                    TokenKind::Identifier | TokenKind::OpenBracket | TokenKind::OpenBrace
                ) {
                    Some(self.variable_declaration(DeclKind::Let, true, true)?)
                } else {
                    Some(self.expression(true)?)
                }
            }
            _ => Some(self.expression(true)?),
        };

        // Decide between the three for-statement forms
        let next = self.peek(ScanContext::Div)?.clone();
        if let Some(init_node) = init {
            if next.kind == TokenKind::InKeyword {
                self.next(ScanContext::Div)?;
                let left = self.for_target(init_node, "in")?;
                let right = self.expression(false)?;
                self.expect(TokenKind::CloseParen, ScanContext::Div)?;
                let body = self.iteration_body()?;
                return Ok(Node::new(
                    NodeKind::ForInStatement {
                        left: Box::new(left),
                        right: Box::new(right),
                        body: Box::new(body),
                    },
                    self.finish_span(start),
                ));
            }
            if next.kind == TokenKind::Identifier && next.value == "of" {
                self.next(ScanContext::Div)?;
                let left = self.for_target(init_node, "of")?;
                let right = self.assignment_expression(false)?;
                self.expect(TokenKind::CloseParen, ScanContext::Div)?;
                let body = self.iteration_body()?;
                return Ok(Node::new(
                    NodeKind::ForOfStatement {
                        left: Box::new(left),
                        right: Box::new(right),
                        body: Box::new(body),
                    },
                    self.finish_span(start),
                ));
            }
            self.expect(TokenKind::Semicolon, ScanContext::Div)?;
            let test = self.for_clause(TokenKind::Semicolon)?;
            self.expect(TokenKind::Semicolon, ScanContext::Div)?;
            let update = self.for_clause(TokenKind::CloseParen)?;
            self.expect(TokenKind::CloseParen, ScanContext::Div)?;
            let body = self.iteration_body()?;
            Ok(Node::new(
                NodeKind::ForStatement {
                    init: Some(Box::new(init_node)),
                    test: test.map(Box::new),
                    update: update.map(Box::new),
                    body: Box::new(body),
                },
                self.finish_span(start),
            ))
        } else {
            self.expect(TokenKind::Semicolon, ScanContext::Default)?;
            let test = self.for_clause(TokenKind::Semicolon)?;
            self.expect(TokenKind::Semicolon, ScanContext::Div)?;
            let update = self.for_clause(TokenKind::CloseParen)?;
            self.expect(TokenKind::CloseParen, ScanContext::Div)?;
            let body = self.iteration_body()?;
            Ok(Node::new(
                NodeKind::ForStatement {
                    init: None,
                    test: test.map(Box::new),
                    update: update.map(Box::new),
                    body: Box::new(body),
                },
                self.finish_span(start),
            ))
        }
    }

    fn for_clause(&mut self, terminator: TokenKind) -> Result<Option<Node>, SyntaxError> {
        if self.peek_kind(ScanContext::Default)? == terminator {
            Ok(None)
        } else {
            Ok(Some(self.expression(false)?))
        }
    }

    /// Validate and normalize the left side of a for-in/for-of head.
    fn for_target(&mut self, init: Node, kind: &str) -> Result<Node, SyntaxError> {
        match init.kind {
            NodeKind::VariableDeclaration {
                keyword,
                ref declarations,
            } => {
                if declarations.len() != 1 {
                    let message = format!("Invalid for-{kind} declaration");
                    return self.fail(message, init.span);
                }
                let declarator = &declarations[0];
                if let NodeKind::VariableDeclarator { pattern, init: d_init } = &declarator.kind {
                    if let Some(d_init) = d_init {
                        // Only the legacy `for (var x = init in ...)` form is
                        // tolerated
                        let legal = kind == "in"
                            && keyword == DeclKind::Var
                            && matches!(pattern.kind, NodeKind::Identifier { .. });
                        if !legal {
                            return self
                                .fail("Invalid initializer in for loop head", d_init.span);
                        }
                    }
                }
                Ok(init)
            }
            _ => {
                let mut target = init;
                if target.is_pattern_cover() {
                    target = self.transform_pattern(target, false)?;
                } else {
                    self.check_assign_target(&mut target)?;
                }
                Ok(target)
            }
        }
    }

    fn with_statement(&mut self) -> Result<Node, SyntaxError> {
        let start = self.mark(ScanContext::Default)?;
        let token = self.next(ScanContext::Default)?; // with
        if self.strict() {
            return self.fail("'with' is not allowed in strict mode", token.span);
        }
        self.expect(TokenKind::OpenParen, ScanContext::Default)?;
        let object = self.expression(false)?;
        self.expect(TokenKind::CloseParen, ScanContext::Div)?;
        let body = self.statement()?;
        Ok(Node::new(
            NodeKind::WithStatement {
                object: Box::new(object),
                body: Box::new(body),
            },
            self.finish_span(start),
        ))
    }

    fn switch_statement(&mut self) -> Result<Node, SyntaxError> {
        let start = self.mark(ScanContext::Default)?;
        self.next(ScanContext::Default)?; // switch
        self.expect(TokenKind::OpenParen, ScanContext::Default)?;
        let discriminant = self.expression(false)?;
        self.expect(TokenKind::CloseParen, ScanContext::Div)?;
        self.expect(TokenKind::OpenBrace, ScanContext::Default)?;

        self.frame_mut().switch_depth += 1;
        let mut cases = Vec::new();
        let mut seen_default = false;
        loop {
            let token = self.peek(ScanContext::Default)?.clone();
            let case_start = token.span.start;
            match token.kind {
                TokenKind::CaseKeyword => {
                    self.next(ScanContext::Default)?;
                    let test = self.expression(false)?;
                    self.expect(TokenKind::Colon, ScanContext::Div)?;
                    let statements = self.case_statements()?;
                    cases.push(Node::new(
                        NodeKind::SwitchCase {
                            test: Some(Box::new(test)),
                            statements,
                        },
                        self.finish_span(case_start),
                    ));
                }
                TokenKind::DefaultKeyword => {
                    if seen_default {
                        self.frame_mut().switch_depth -= 1;
                        return self.fail("More than one default clause in switch", token.span);
                    }
                    seen_default = true;
                    self.next(ScanContext::Default)?;
                    self.expect(TokenKind::Colon, ScanContext::Div)?;
                    let statements = self.case_statements()?;
                    cases.push(Node::new(
                        NodeKind::SwitchCase {
                            test: None,
                            statements,
                        },
                        self.finish_span(case_start),
                    ));
                }
                TokenKind::CloseBrace => break,
                _ => {
                    self.frame_mut().switch_depth -= 1;
                    return self.unexpected(&token);
                }
            }
        }
        self.frame_mut().switch_depth -= 1;
        self.expect(TokenKind::CloseBrace, ScanContext::Default)?;
        Ok(Node::new(
            NodeKind::SwitchStatement {
                discriminant: Box::new(discriminant),
                cases,
            },
            self.finish_span(start),
        ))
    }

    fn case_statements(&mut self) -> Result<Vec<Node>, SyntaxError> {
        let mut statements = Vec::new();
        loop {
            match self.peek_kind(ScanContext::Default)? {
                TokenKind::CaseKeyword | TokenKind::DefaultKeyword | TokenKind::CloseBrace => break,
                _ => statements.push(self.statement()?),
            }
        }
        Ok(statements)
    }

    fn return_statement(&mut self) -> Result<Node, SyntaxError> {
        let start = self.mark(ScanContext::Default)?;
        let token = self.next(ScanContext::Default)?; // return
        if !self.frame().is_function {
            return self.fail("'return' outside of function", token.span);
        }
        let next = self.peek(ScanContext::Div)?;
        let argument = if next.newline_before
            || matches!(
                next.kind,
                TokenKind::Semicolon | TokenKind::CloseBrace | TokenKind::EndOfFile
            ) {
            None
        } else {
            Some(Box::new(self.expression(false)?))
        };
        self.consume_semicolon()?;
        Ok(Node::new(
            NodeKind::ReturnStatement { argument },
            self.finish_span(start),
        ))
    }

    fn throw_statement(&mut self) -> Result<Node, SyntaxError> {
        let start = self.mark(ScanContext::Default)?;
        let token = self.next(ScanContext::Default)?; // throw
        if self.newline_ahead()? {
            return self.fail("Illegal newline after 'throw'", token.span);
        }
        let argument = self.expression(false)?;
        self.consume_semicolon()?;
        Ok(Node::new(
            NodeKind::ThrowStatement {
                argument: Box::new(argument),
            },
            self.finish_span(start),
        ))
    }

    fn break_or_continue(&mut self, is_break: bool) -> Result<Node, SyntaxError> {
        let start = self.mark(ScanContext::Default)?;
        let keyword = self.next(ScanContext::Default)?;
        let next = self.peek(ScanContext::Div)?.clone();
        let label = if next.kind == TokenKind::Identifier && !next.newline_before {
            Some(Box::new(self.identifier_reference()?))
        } else {
            None
        };

        match &label {
            Some(label_node) => {
                let name = label_node.identifier_value().unwrap_or_default();
                let info = self.frame().label_set.get(name).copied();
                match info {
                    None => {
                        let message = format!("Undefined label '{name}'");
                        return self.fail(message, label_node.span);
                    }
                    Some(LabelInfo { iteration, .. }) if !is_break && !iteration => {
                        let message = format!("Label '{name}' is not on an iteration statement");
                        return self.fail(message, label_node.span);
                    }
                    _ => {}
                }
            }
            None => {
                let frame = self.frame();
                let legal = if is_break {
                    frame.loop_depth > 0 || frame.switch_depth > 0
                } else {
                    frame.loop_depth > 0
                };
                if !legal {
                    let what = if is_break { "break" } else { "continue" };
                    let message = format!("'{what}' outside of an iteration statement");
                    return self.fail(message, keyword.span);
                }
            }
        }

        self.consume_semicolon()?;
        let kind = if is_break {
            NodeKind::BreakStatement { label }
        } else {
            NodeKind::ContinueStatement { label }
        };
        Ok(Node::new(kind, self.finish_span(start)))
    }

    fn labelled_statement(&mut self) -> Result<Node, SyntaxError> {
        // Collect the whole label chain so `continue outer` works through
        // nested labels on one iteration statement
        let mut labels: Vec<Node> = Vec::new();
        loop {
            let token = self.peek(ScanContext::Default)?.clone();
            let next = self.peek_at(ScanContext::Default, 1)?;
            if token.kind == TokenKind::Identifier && next.kind == TokenKind::Colon {
                let label = self.identifier_reference()?;
                self.expect(TokenKind::Colon, ScanContext::Div)?;
                labels.push(label);
            } else {
                break;
            }
        }

        let iteration = matches!(
            self.peek_kind(ScanContext::Default)?,
            TokenKind::ForKeyword | TokenKind::WhileKeyword | TokenKind::DoKeyword
        );

        for label in &labels {
            let name = label.identifier_value().unwrap_or_default().to_string();
            let duplicate = self
                .frame()
                .label_set
                .get(&name)
                .is_some_and(|info| info.count > 0);
            if duplicate {
                let message = format!("Duplicate label '{name}'");
                return self.fail(message, label.span);
            }
            self.frame_mut()
                .label_set
                .insert(name, LabelInfo { count: 1, iteration });
        }

        let mut body = self.statement()?;

        for label in labels.iter().rev() {
            let name = label.identifier_value().unwrap_or_default().to_string();
            let empty = match self.frame_mut().label_set.get_mut(&name) {
                Some(info) => {
                    info.count -= 1;
                    info.count == 0
                }
                None => false,
            };
            if empty {
                self.frame_mut().label_set.remove(&name);
            }
            let span = Span::new(label.span.start, body.span.end);
            body = Node::new(
                NodeKind::LabelledStatement {
                    label: Box::new(label.clone()),
                    body: Box::new(body),
                },
                span,
            );
        }
        Ok(body)
    }

    fn try_statement(&mut self) -> Result<Node, SyntaxError> {
        let start = self.mark(ScanContext::Default)?;
        let token = self.next(ScanContext::Default)?; // try
        let block = self.block()?;

        let handler = if self.peek_kind(ScanContext::Default)? == TokenKind::CatchKeyword {
            let catch_start = self.mark(ScanContext::Default)?;
            self.next(ScanContext::Default)?;
            self.expect(TokenKind::OpenParen, ScanContext::Default)?;
            let param = self.binding_pattern_or_identifier()?;
            self.expect(TokenKind::CloseParen, ScanContext::Div)?;
            let body = self.block()?;
            Some(Box::new(Node::new(
                NodeKind::CatchClause {
                    param: Box::new(param),
                    body: Box::new(body),
                },
                self.finish_span(catch_start),
            )))
        } else {
            None
        };

        let finalizer = if self
            .eat(TokenKind::FinallyKeyword, ScanContext::Default)?
            .is_some()
        {
            Some(Box::new(self.block()?))
        } else {
            None
        };

        if handler.is_none() && finalizer.is_none() {
            return self.fail("Missing catch or finally after try", token.span);
        }
        Ok(Node::new(
            NodeKind::TryStatement {
                block: Box::new(block),
                handler,
                finalizer,
            },
            self.finish_span(start),
        ))
    }

    // =========================================================================
    // Function and Class Declarations
    // =========================================================================

    pub(crate) fn function_declaration(&mut self, is_async: bool) -> Result<Node, SyntaxError> {
        let start = self.mark(ScanContext::Default)?;
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

        // A declaration's name binds in the enclosing scope
        let name = self.binding_identifier()?;

        self.push_frame(self.function_frame(is_generator, is_async));
        let params = self.formal_parameters()?;
        let body = self.function_body()?;
        self.check_parameters(&params)?;
        self.pop_frame()?;

        Ok(Node::new(
            NodeKind::FunctionDeclaration {
                kind,
                name: Box::new(name),
                params,
                body: Box::new(body),
            },
            self.finish_span(start),
        ))
    }

    /// Parse `( param, ... )`. Defaults and destructuring go through the
    /// cover grammar; a rest parameter must be last.
    pub(crate) fn formal_parameters(&mut self) -> Result<Vec<Node>, SyntaxError> {
        self.expect(TokenKind::OpenParen, ScanContext::Default)?;
        let mut params = Vec::new();
        loop {
            match self.peek_kind(ScanContext::Default)? {
                TokenKind::CloseParen => break,
                TokenKind::DotDotDot => {
                    let start = self.mark(ScanContext::Default)?;
                    self.next(ScanContext::Default)?;
                    let ident = self.binding_identifier()?;
                    params.push(Node::new(
                        NodeKind::RestParameter {
                            ident: Box::new(ident),
                        },
                        self.finish_span(start),
                    ));
                    break;
                }
                _ => {
                    let start = self.mark(ScanContext::Default)?;
                    let pattern = self.binding_pattern_or_identifier()?;
                    let init = if self.eat(TokenKind::Equals, ScanContext::Div)?.is_some() {
                        Some(Box::new(self.assignment_expression(false)?))
                    } else {
                        None
                    };
                    params.push(Node::new(
                        NodeKind::FormalParameter {
                            pattern: Box::new(pattern),
                            init,
                        },
                        self.finish_span(start),
                    ));
                    if self.eat(TokenKind::Comma, ScanContext::Div)?.is_none() {
                        break;
                    }
                }
            }
        }
        self.expect(TokenKind::CloseParen, ScanContext::Div)?;
        Ok(params)
    }

    /// A braced function body with a directive prologue.
    pub(crate) fn function_body(&mut self) -> Result<Node, SyntaxError> {
        let start = self.mark(ScanContext::Default)?;
        self.expect(TokenKind::OpenBrace, ScanContext::Default)?;
        let statements = self.statement_list(true, false)?;
        self.expect(TokenKind::CloseBrace, ScanContext::Div)?;
        Ok(Node::new(
            NodeKind::FunctionBody { statements },
            self.finish_span(start),
        ))
    }

    pub(crate) fn class_declaration(&mut self) -> Result<Node, SyntaxError> {
        let start = self.mark(ScanContext::Default)?;
        self.expect(TokenKind::ClassKeyword, ScanContext::Default)?;
        // The binding is visible in the enclosing (possibly sloppy) scope,
        // but the name itself is validated under strict rules
        let name = self.binding_identifier()?;
        self.push_frame(ContextFrame {
            strict: true,
            ..ContextFrame::default()
        });
        let (base, body) = self.class_tail()?;
        self.pop_frame()?;
        Ok(Node::new(
            NodeKind::ClassDeclaration {
                name: Box::new(name),
                base,
                body,
            },
            self.finish_span(start),
        ))
    }
}
