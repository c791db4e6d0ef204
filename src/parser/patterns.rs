//! Cover-grammar transforms: expressions to binding patterns.
//!
//! Object and array literals are parsed as expressions. When the
//! grammatical role demands a pattern (assignment left side, declarator
//! target, formal parameter, catch parameter, comprehension binding), the
//! expression tree is rewritten in place: `PropertyDefinition` becomes
//! `PatternProperty`, a trailing `SpreadExpression` becomes
//! `PatternRestElement`, and `=` assignments split into pattern + default.
//!
//! A successful transform also cancels errors that were deferred while the
//! region was still being read as an expression (shorthand initializers,
//! duplicate property names).

use crate::diagnostics::SyntaxError;
use crate::parser::ast::{Node, NodeKind};
use crate::parser::state::ParserState;

impl ParserState {
    /// Reinterpret an expression as a pattern. With `binding` set, leaf
    /// targets must be plain identifiers; otherwise member expressions are
    /// also accepted (assignment destructuring).
    pub(crate) fn transform_pattern(
        &mut self,
        node: Node,
        binding: bool,
    ) -> Result<Node, SyntaxError> {
        let span = node.span;
        let transformed = self.transform_pattern_inner(node, binding)?;
        self.cancel_invalid_nodes(span);
        Ok(transformed)
    }

    fn transform_pattern_inner(
        &mut self,
        mut node: Node,
        binding: bool,
    ) -> Result<Node, SyntaxError> {
        let span = node.span;
        match node.kind {
            NodeKind::Identifier { .. } => {
                if binding {
                    self.check_binding_ident(&mut node)?;
                } else {
                    self.check_assign_target(&mut node)?;
                }
                Ok(node)
            }
            NodeKind::MemberExpression { .. } | NodeKind::CallExpression { .. } if !binding => {
                Ok(node)
            }
            NodeKind::ParenExpression { expression } if !binding => {
                self.transform_pattern_inner(*expression, binding)
            }
            // Already a pattern (e.g. re-checked parameter)
            NodeKind::ArrayPattern { .. }
            | NodeKind::ObjectPattern { .. }
            | NodeKind::PatternRestElement { .. } => Ok(node),

            NodeKind::ObjectLiteral { properties } => {
                let mut out = Vec::with_capacity(properties.len());
                for property in properties {
                    out.push(self.transform_pattern_property(property, binding)?);
                }
                Ok(Node::new(NodeKind::ObjectPattern { properties: out }, span))
            }
            NodeKind::ArrayLiteral { elements } => {
                let count = elements.len();
                let mut out: Vec<Option<Node>> = Vec::with_capacity(count);
                for (index, slot) in elements.into_iter().enumerate() {
                    let Some(element) = slot else {
                        out.push(None);
                        continue;
                    };
                    let element_span = element.span;
                    match element.kind {
                        NodeKind::SpreadExpression { expression } => {
                            if index + 1 != count {
                                return self
                                    .fail("Rest element must be last in a pattern", element_span);
                            }
                            let pattern = self.transform_pattern_inner(*expression, binding)?;
                            out.push(Some(Node::new(
                                NodeKind::PatternRestElement {
                                    pattern: Box::new(pattern),
                                },
                                element_span,
                            )));
                        }
                        NodeKind::AssignmentExpression {
                            op: "=",
                            target,
                            value,
                        } => {
                            let pattern = self.transform_pattern_inner(*target, binding)?;
                            out.push(Some(Node::new(
                                NodeKind::PatternElement {
                                    pattern: Box::new(pattern),
                                    init: Some(value),
                                },
                                element_span,
                            )));
                        }
                        _ => {
                            let pattern = self.transform_pattern_inner(element, binding)?;
                            out.push(Some(Node::new(
                                NodeKind::PatternElement {
                                    pattern: Box::new(pattern),
                                    init: None,
                                },
                                element_span,
                            )));
                        }
                    }
                }
                Ok(Node::new(NodeKind::ArrayPattern { elements: out }, span))
            }
            _ => self.fail("Invalid destructuring target", span),
        }
    }

    fn transform_pattern_property(
        &mut self,
        property: Node,
        binding: bool,
    ) -> Result<Node, SyntaxError> {
        let span = property.span;
        match property.kind {
            // `name: target` possibly with a default folded into the value
            NodeKind::PropertyDefinition {
                name,
                value: Some(value),
            } => {
                let value = *value;
                let value_span = value.span;
                let (pattern, init) = match value.kind {
                    NodeKind::AssignmentExpression {
                        op: "=",
                        target,
                        value: default,
                    } => (self.transform_pattern_inner(*target, binding)?, Some(default)),
                    kind => {
                        let value = Node::new(kind, value_span);
                        (self.transform_pattern_inner(value, binding)?, None)
                    }
                };
                Ok(Node::new(
                    NodeKind::PatternProperty {
                        name,
                        pattern: Some(Box::new(pattern)),
                        init,
                    },
                    span,
                ))
            }
            // Shorthand: the name is the target
            NodeKind::PropertyDefinition { name, value: None } => {
                let mut target = *name;
                if binding {
                    self.check_binding_ident(&mut target)?;
                } else {
                    self.check_assign_target(&mut target)?;
                }
                Ok(Node::new(
                    NodeKind::PatternProperty {
                        name: Box::new(target),
                        pattern: None,
                        init: None,
                    },
                    span,
                ))
            }
            // Shorthand with default
            NodeKind::CoveredPatternProperty { name, init } => {
                let mut target = *name;
                if binding {
                    self.check_binding_ident(&mut target)?;
                } else {
                    self.check_assign_target(&mut target)?;
                }
                Ok(Node::new(
                    NodeKind::PatternProperty {
                        name: Box::new(target),
                        pattern: None,
                        init: Some(init),
                    },
                    span,
                ))
            }
            // Already transformed
            kind @ NodeKind::PatternProperty { .. } => Ok(Node { span, kind }),
            _ => self.fail("Invalid destructuring property", span),
        }
    }

    /// Reinterpret an arrow cover expression as a parameter list:
    /// a single identifier, a parenthesized sequence (possibly ending in a
    /// speculative rest), or an `async(...)` call.
    pub(crate) fn transform_arrow_params(
        &mut self,
        expression: Node,
    ) -> Result<Vec<Node>, SyntaxError> {
        let span = expression.span;
        let elements: Vec<Node> = match expression.kind {
            NodeKind::Identifier { .. } => vec![expression],
            NodeKind::ParenExpression { expression: inner } => match inner.kind {
                NodeKind::SequenceExpression { expressions } => expressions,
                _ => vec![*inner],
            },
            NodeKind::CallExpression { callee, arguments }
                if callee.identifier_value() == Some("async") =>
            {
                arguments
            }
            _ => return self.fail("Invalid arrow function parameter list", span),
        };

        let count = elements.len();
        let mut params = Vec::with_capacity(count);
        for (index, element) in elements.into_iter().enumerate() {
            let element_span = element.span;
            match element.kind {
                NodeKind::SpreadExpression { expression } => {
                    if index + 1 != count {
                        return self.fail("Rest parameter must be last", element_span);
                    }
                    let mut ident = *expression;
                    if !matches!(ident.kind, NodeKind::Identifier { .. }) {
                        return self.fail("Rest parameter must be an identifier", ident.span);
                    }
                    self.check_binding_ident(&mut ident)?;
                    params.push(Node::new(
                        NodeKind::RestParameter {
                            ident: Box::new(ident),
                        },
                        element_span,
                    ));
                }
                NodeKind::AssignmentExpression {
                    op: "=",
                    target,
                    value,
                } => {
                    let pattern = self.transform_pattern_inner(*target, true)?;
                    params.push(Node::new(
                        NodeKind::FormalParameter {
                            pattern: Box::new(pattern),
                            init: Some(value),
                        },
                        element_span,
                    ));
                }
                _ => {
                    let pattern = self.transform_pattern_inner(element, true)?;
                    params.push(Node::new(
                        NodeKind::FormalParameter {
                            pattern: Box::new(pattern),
                            init: None,
                        },
                        element_span,
                    ));
                }
            }
        }
        self.cancel_invalid_nodes(span);
        Ok(params)
    }
}
