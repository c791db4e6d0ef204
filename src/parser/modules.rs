//! Module, import, and export grammar.
//!
//! These forms are recognized only at module top level. `module` is a
//! contextual word: it introduces a declaration only when followed on the
//! same line by an identifier or a string literal.

use crate::diagnostics::SyntaxError;
use crate::parser::ast::{Node, NodeKind};
use crate::parser::state::ParserState;
use crate::scanner::{ScanContext, TokenKind};

impl ParserState {
    /// A top-level item of a module body.
    pub(crate) fn module_item(&mut self) -> Result<Node, SyntaxError> {
        let token = self.peek(ScanContext::Default)?.clone();
        match token.kind {
            TokenKind::ImportKeyword => self.import_declaration(),
            TokenKind::ExportKeyword => self.export_declaration(),
            TokenKind::Identifier if token.value == "module" => {
                let next = self.peek_at(ScanContext::Default, 1)?;
                let starts_module = !next.newline_before
                    && matches!(next.kind, TokenKind::Identifier | TokenKind::String);
                if starts_module {
                    self.module_declaration()
                } else {
                    self.statement()
                }
            }
            _ => self.statement(),
        }
    }

    // =========================================================================
    // module Declarations
    // =========================================================================

    /// `module A from "url"`, `module A { ... }`, `module "url" { ... }`,
    /// or `module A = B.C`.
    fn module_declaration(&mut self) -> Result<Node, SyntaxError> {
        let start = self.mark(ScanContext::Default)?;
        self.next(ScanContext::Default)?; // module

        if self.peek_kind(ScanContext::Default)? == TokenKind::String {
            let url = self.string_literal()?;
            let body = self.module_body()?;
            return Ok(Node::new(
                NodeKind::ModuleRegistration {
                    url: Box::new(url),
                    body: Box::new(body),
                },
                self.finish_span(start),
            ));
        }

        let name = self.binding_identifier()?;
        let token = self.peek(ScanContext::Default)?.clone();
        match token.kind {
            TokenKind::Identifier if token.value == "from" && !token.newline_before => {
                self.next(ScanContext::Default)?;
                let from = self.string_literal()?;
                self.consume_semicolon()?;
                Ok(Node::new(
                    NodeKind::ModuleImport {
                        name: Box::new(name),
                        from: Box::new(from),
                    },
                    self.finish_span(start),
                ))
            }
            TokenKind::Equals => {
                self.next(ScanContext::Default)?;
                let path = self.module_path()?;
                self.consume_semicolon()?;
                Ok(Node::new(
                    NodeKind::ModuleAlias {
                        name: Box::new(name),
                        path: Box::new(path),
                    },
                    self.finish_span(start),
                ))
            }
            TokenKind::OpenBrace => {
                let body = self.module_body()?;
                Ok(Node::new(
                    NodeKind::ModuleDeclaration {
                        name: Box::new(name),
                        body: Box::new(body),
                    },
                    self.finish_span(start),
                ))
            }
            _ => self.unexpected(&token),
        }
    }

    /// A nested module body: strict, with its own export scope.
    fn module_body(&mut self) -> Result<Node, SyntaxError> {
        let start = self.mark(ScanContext::Default)?;
        self.expect(TokenKind::OpenBrace, ScanContext::Default)?;
        self.push_frame(crate::parser::state::ContextFrame {
            strict: true,
            ..Default::default()
        });
        let statements = self.statement_list(true, true)?;
        self.pop_frame()?;
        self.expect(TokenKind::CloseBrace, ScanContext::Default)?;
        Ok(Node::new(
            NodeKind::ModuleBody { statements },
            self.finish_span(start),
        ))
    }

    fn module_path(&mut self) -> Result<Node, SyntaxError> {
        let start = self.mark(ScanContext::Default)?;
        let mut elements = vec![self.identifier_reference()?];
        while self.eat(TokenKind::Dot, ScanContext::Div)?.is_some() {
            elements.push(self.identifier_name()?);
        }
        Ok(Node::new(
            NodeKind::ModulePath { elements },
            self.finish_span(start),
        ))
    }

    fn string_literal(&mut self) -> Result<Node, SyntaxError> {
        let token = self.expect(TokenKind::String, ScanContext::Default)?;
        Ok(Node::new(
            NodeKind::StringLiteral { value: token.value },
            token.span,
        ))
    }

    // =========================================================================
    // import
    // =========================================================================

    /// `import { a, b as c } from "url";` or `import name from "url";`
    fn import_declaration(&mut self) -> Result<Node, SyntaxError> {
        let start = self.mark(ScanContext::Default)?;
        self.expect(TokenKind::ImportKeyword, ScanContext::Default)?;

        if self.peek_kind(ScanContext::Default)? == TokenKind::OpenBrace {
            self.next(ScanContext::Default)?;
            let mut specifiers = Vec::new();
            loop {
                if self.peek_kind(ScanContext::Name)? == TokenKind::CloseBrace {
                    break;
                }
                specifiers.push(self.import_specifier()?);
                if self.eat(TokenKind::Comma, ScanContext::Div)?.is_none() {
                    break;
                }
            }
            self.expect(TokenKind::CloseBrace, ScanContext::Div)?;
            self.expect_contextual("from")?;
            let from = self.string_literal()?;
            self.consume_semicolon()?;
            return Ok(Node::new(
                NodeKind::ImportDeclaration {
                    specifiers,
                    from: Box::new(from),
                },
                self.finish_span(start),
            ));
        }

        let ident = self.binding_identifier()?;
        self.expect_contextual("from")?;
        let from = self.string_literal()?;
        self.consume_semicolon()?;
        Ok(Node::new(
            NodeKind::ImportDefaultDeclaration {
                ident: Box::new(ident),
                from: Box::new(from),
            },
            self.finish_span(start),
        ))
    }

    /// `a` or `a as b`; the imported name may be any reserved word, the
    /// local binding may not.
    fn import_specifier(&mut self) -> Result<Node, SyntaxError> {
        let start = self.mark(ScanContext::Default)?;
        let imported = self.identifier_name()?;
        let local = if self.peek_is_contextual("as")? {
            self.next(ScanContext::Default)?;
            Some(Box::new(self.binding_identifier()?))
        } else {
            // Without `as`, the imported name is also the binding
            let valid = imported
                .identifier_value()
                .is_some_and(|v| !crate::scanner::is_reserved_word_text(v));
            if !valid {
                return self.fail("Invalid import binding name", imported.span);
            }
            None
        };
        Ok(Node::new(
            NodeKind::ImportSpecifier {
                imported: Box::new(imported),
                local,
            },
            self.finish_span(start),
        ))
    }

    // =========================================================================
    // export
    // =========================================================================

    /// `export { ... } [from "url"]`, `export * [from "url"]`, or
    /// `export <declaration>`.
    fn export_declaration(&mut self) -> Result<Node, SyntaxError> {
        let start = self.mark(ScanContext::Default)?;
        self.expect(TokenKind::ExportKeyword, ScanContext::Default)?;

        let token = self.peek(ScanContext::Default)?.clone();
        let declaration = match token.kind {
            TokenKind::OpenBrace | TokenKind::Asterisk => self.export_specifier_set()?,
            TokenKind::VarKeyword => {
                let d = self.variable_declaration(crate::parser::ast::DeclKind::Var, false, false)?;
                self.consume_semicolon()?;
                d
            }
            TokenKind::ConstKeyword => {
                let d =
                    self.variable_declaration(crate::parser::ast::DeclKind::Const, false, false)?;
                self.consume_semicolon()?;
                d
            }
            TokenKind::LetKeyword => {
                let d = self.variable_declaration(crate::parser::ast::DeclKind::Let, false, false)?;
                self.consume_semicolon()?;
                d
            }
            TokenKind::FunctionKeyword => self.function_declaration(false)?,
            TokenKind::ClassKeyword => self.class_declaration()?,
            TokenKind::Identifier if token.value == "let" => {
                let d = self.variable_declaration(crate::parser::ast::DeclKind::Let, false, false)?;
                self.consume_semicolon()?;
                d
            }
            TokenKind::Identifier if token.value == "async" => self.function_declaration(true)?,
            TokenKind::Identifier if token.value == "module" => {
                // export module A from "url" / export module A { ... }
                self.module_declaration()?
            }
            _ => return self.unexpected(&token),
        };

        Ok(Node::new(
            NodeKind::ExportDeclaration {
                declaration: Box::new(declaration),
            },
            self.finish_span(start),
        ))
    }

    fn export_specifier_set(&mut self) -> Result<Node, SyntaxError> {
        let start = self.mark(ScanContext::Default)?;

        if self.eat(TokenKind::Asterisk, ScanContext::Default)?.is_some() {
            let from = if self.peek_is_contextual("from")? {
                self.next(ScanContext::Default)?;
                Some(Box::new(self.string_literal()?))
            } else {
                None
            };
            self.consume_semicolon()?;
            return Ok(Node::new(
                NodeKind::ExportSpecifierSet {
                    star: true,
                    specifiers: Vec::new(),
                    from,
                },
                self.finish_span(start),
            ));
        }

        self.expect(TokenKind::OpenBrace, ScanContext::Default)?;
        let mut specifiers = Vec::new();
        loop {
            if self.peek_kind(ScanContext::Name)? == TokenKind::CloseBrace {
                break;
            }
            specifiers.push(self.export_specifier()?);
            if self.eat(TokenKind::Comma, ScanContext::Div)?.is_none() {
                break;
            }
        }
        self.expect(TokenKind::CloseBrace, ScanContext::Div)?;
        let from = if self.peek_is_contextual("from")? {
            self.next(ScanContext::Default)?;
            Some(Box::new(self.string_literal()?))
        } else {
            None
        };
        self.consume_semicolon()?;
        Ok(Node::new(
            NodeKind::ExportSpecifierSet {
                star: false,
                specifiers,
                from,
            },
            self.finish_span(start),
        ))
    }

    /// `a` or `a as b`; the exported alias may be any reserved word.
    fn export_specifier(&mut self) -> Result<Node, SyntaxError> {
        let start = self.mark(ScanContext::Default)?;
        let local = self.identifier_name()?;
        let exported = if self.peek_is_contextual("as")? {
            self.next(ScanContext::Default)?;
            Some(Box::new(self.identifier_name()?))
        } else {
            None
        };
        Ok(Node::new(
            NodeKind::ExportSpecifier {
                local: Box::new(local),
                exported,
            },
            self.finish_span(start),
        ))
    }

    // =========================================================================
    // Contextual Word Helpers
    // =========================================================================

    fn peek_is_contextual(&mut self, word: &str) -> Result<bool, SyntaxError> {
        let token = self.peek(ScanContext::Default)?;
        Ok(token.kind == TokenKind::Identifier && token.value == word)
    }

    fn expect_contextual(&mut self, word: &str) -> Result<(), SyntaxError> {
        let token = self.next(ScanContext::Default)?;
        if token.kind != TokenKind::Identifier || token.value != word {
            return self.unexpected(&token);
        }
        Ok(())
    }
}
