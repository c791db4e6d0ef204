//! Destructuring lowering: temp-based pattern unrolling.
//!
//! ```text
//! var [a, b = 1, ...r] = list;
//! ```
//! Becomes:
//! ```text
//! var __$0 = list, a = __$0[0], __$1 = __$0[1],
//!     b = __$1 === void 0 ? 1 : __$1, r = _runtime.rest(__$0, 2);
//! ```
//!
//! Assignment destructuring produces a sequence expression that yields the
//! right-hand side as its value; its temporaries are lifted to the top of
//! the enclosing function instead of being declared inline.

use crate::parser::ast::{DeclKind, Node, NodeKind};
use crate::replacer::Replacer;

impl Replacer<'_> {
    // =========================================================================
    // Node Handlers
    // =========================================================================

    /// `let`/`const` become `var`; declarators with pattern targets are
    /// unrolled into temp-based member reads.
    pub(crate) fn variable_declaration(&mut self, node: &Node) -> Option<String> {
        let NodeKind::VariableDeclaration {
            keyword,
            declarations,
        } = &node.kind
        else {
            unreachable!("variable_declaration on {}", node.kind_name());
        };

        let has_pattern = declarations.iter().any(|d| {
            matches!(&d.kind, NodeKind::VariableDeclarator { pattern, .. } if pattern.is_pattern())
        });

        if !has_pattern {
            if *keyword == DeclKind::Var {
                return None;
            }
            // Keep the declaration shape, swap the keyword
            let text = self.stringify(node);
            let keyword_len = keyword.as_str().len();
            return Some(format!("var{}", &text[keyword_len..]));
        }

        let mut terms: Vec<String> = Vec::new();
        for declarator in declarations {
            let NodeKind::VariableDeclarator { pattern, init } = &declarator.kind else {
                continue;
            };
            if pattern.is_pattern() {
                // The parser guarantees an initializer outside for-heads
                let rhs = match init {
                    Some(init) => self.visit(init),
                    None => "void 0".to_string(),
                };
                let temp = self.uid();
                terms.push(format!("{temp} = {rhs}"));
                self.unroll_pattern_into(pattern, &temp, true, &mut terms);
            } else {
                let name = self.raw(pattern.span).to_string();
                match init {
                    Some(init) => {
                        let init_text = self.visit(init);
                        terms.push(format!("{name} = {init_text}"));
                    }
                    None => terms.push(name),
                }
            }
        }
        Some(format!("var {}", terms.join(", ")))
    }

    /// Assignment destructuring: `[a, b] = rhs` becomes
    /// `(__$0 = rhs, a = __$0[0], b = __$0[1], __$0)`.
    pub(crate) fn assignment_expression(&mut self, node: &Node) -> Option<String> {
        let NodeKind::AssignmentExpression { op, target, value } = &node.kind else {
            unreachable!("assignment_expression on {}", node.kind_name());
        };
        if *op != "=" || !target.is_pattern() {
            return None;
        }
        let rhs = self.visit(value);
        let temp = self.uid();
        self.add_temp_var(&temp, None, false);
        let mut terms = vec![format!("{temp} = {rhs}")];
        self.unroll_pattern_into(target, &temp, false, &mut terms);
        terms.push(temp);
        Some(format!("({})", terms.join(", ")))
    }

    // =========================================================================
    // Unrolling
    // =========================================================================

    /// Append `target = value` terms that destructure `source` according to
    /// `pattern`. With `declare` set, nested temporaries are carried in the
    /// term list itself (the caller prefixes `var`); otherwise they are
    /// lifted to the enclosing function scope.
    pub(crate) fn unroll_pattern_into(
        &mut self,
        pattern: &Node,
        source: &str,
        declare: bool,
        out: &mut Vec<String>,
    ) {
        match &pattern.kind {
            NodeKind::ArrayPattern { elements } => {
                for (index, slot) in elements.iter().enumerate() {
                    let Some(element) = slot else { continue };
                    match &element.kind {
                        NodeKind::PatternElement { pattern, init } => {
                            let access = format!("{source}[{index}]");
                            self.unroll_element(pattern, init.as_deref(), access, declare, out);
                        }
                        NodeKind::PatternRestElement { pattern } => {
                            let target = self.pattern_leaf_text(pattern);
                            out.push(format!("{target} = _runtime.rest({source}, {index})"));
                        }
                        _ => {}
                    }
                }
            }
            NodeKind::ObjectPattern { properties } => {
                for property in properties {
                    let NodeKind::PatternProperty {
                        name,
                        pattern,
                        init,
                    } = &property.kind
                    else {
                        continue;
                    };
                    let access = format!("{source}{}", self.property_access(name));
                    match pattern {
                        Some(inner) => {
                            self.unroll_element(inner, init.as_deref(), access, declare, out)
                        }
                        None => self.unroll_element(name, init.as_deref(), access, declare, out),
                    }
                }
            }
            _ => {
                // A bare identifier or member target at the root
                let target = self.pattern_leaf_text(pattern);
                out.push(format!("{target} = {source}"));
            }
        }
    }

    /// Unroll one element: leaf targets assign directly; defaults and
    /// nested patterns read through a fresh temporary.
    fn unroll_element(
        &mut self,
        target: &Node,
        init: Option<&Node>,
        access: String,
        declare: bool,
        out: &mut Vec<String>,
    ) {
        let is_leaf = !target.is_pattern();
        match (is_leaf, init) {
            (true, None) => {
                let name = self.pattern_leaf_text(target);
                out.push(format!("{name} = {access}"));
            }
            (true, Some(init)) => {
                let temp = self.temp_term(&access, declare, out);
                let name = self.pattern_leaf_text(target);
                let init_text = self.visit(init);
                out.push(format!(
                    "{name} = {temp} === void 0 ? {init_text} : {temp}"
                ));
            }
            (false, None) => {
                let temp = self.temp_term(&access, declare, out);
                self.unroll_pattern_into(target, &temp, declare, out);
            }
            (false, Some(init)) => {
                let temp = self.temp_term(&access, declare, out);
                let init_text = self.visit(init);
                out.push(format!(
                    "{temp} = {temp} === void 0 ? {init_text} : {temp}"
                ));
                self.unroll_pattern_into(target, &temp, declare, out);
            }
        }
    }

    /// Allocate a temp holding `access`. Inline in declare mode, lifted
    /// otherwise.
    fn temp_term(&mut self, access: &str, declare: bool, out: &mut Vec<String>) -> String {
        let temp = self.uid();
        if !declare {
            self.add_temp_var(&temp, None, false);
        }
        out.push(format!("{temp} = {access}"));
        temp
    }

    /// The output text for a leaf pattern target (identifier or, in
    /// assignment destructuring, a member expression).
    fn pattern_leaf_text(&mut self, target: &Node) -> String {
        match &target.kind {
            NodeKind::Identifier { .. } => self.raw(target.span).to_string(),
            _ => self.visit(target),
        }
    }

    /// Member access text for a pattern property name.
    fn property_access(&mut self, name: &Node) -> String {
        match &name.kind {
            NodeKind::Identifier { .. } => format!(".{}", self.raw(name.span)),
            NodeKind::StringLiteral { value } => {
                format!("[{}]", crate::replacer::string_literal(value))
            }
            NodeKind::NumberLiteral { .. } => format!("[{}]", self.raw(name.span)),
            NodeKind::ComputedPropertyName { expression } => {
                format!("[{}]", self.visit(expression))
            }
            _ => format!(".{}", self.raw(name.span)),
        }
    }
}
