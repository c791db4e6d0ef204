//! Iteration lowering: `for-of` and comprehensions.
//!
//! ```text
//! for (let x of it) body
//! ```
//! Becomes:
//! ```text
//! { var __$0 = _runtime.iterator(it);
//!   for (var x; __$1 = __$0.next(), x = __$1.value, !__$1.done; ) body }
//! ```
//!
//! Comprehensions wrap their clause chain in an immediately invoked
//! function and re-run the replacer over the synthesized text so the inner
//! `for-of` is lowered by the same machinery.

use crate::parser::ast::{Node, NodeKind};
use crate::replacer::Replacer;

impl Replacer<'_> {
    // =========================================================================
    // for-of
    // =========================================================================

    pub(crate) fn for_of_statement(&mut self, node: &Node) -> String {
        let NodeKind::ForOfStatement { left, right, body } = &node.kind else {
            unreachable!("for_of_statement on {}", node.kind_name());
        };

        let iter_temp = self.uid();
        let result_temp = self.uid();
        self.add_temp_var(&result_temp, None, false);
        let right_text = self.visit(right);

        let (decl, target, prefix) = self.for_loop_target(left);
        let body_text = self.visit(body);
        let body_final = match prefix {
            Some(prefix) => format!("{{ {prefix} {body_text} }}"),
            None => body_text,
        };

        format!(
            "{{ var {iter_temp} = _runtime.iterator({right_text}); \
             for ({decl}; {result_temp} = {iter_temp}.next(), \
             {target} = {result_temp}.value, !{result_temp}.done; ) {body_final} }}"
        )
    }

    /// `for-in` needs rewriting only when the left side destructures.
    pub(crate) fn for_in_statement(&mut self, node: &Node) -> Option<String> {
        let NodeKind::ForInStatement { left, right, body } = &node.kind else {
            unreachable!("for_in_statement on {}", node.kind_name());
        };
        if !for_head_destructures(left) {
            return None;
        }
        let (decl, target, prefix) = self.for_loop_target(left);
        let right_text = self.visit(right);
        let body_text = self.visit(body);
        let body_final = match prefix {
            Some(prefix) => format!("{{ {prefix} {body_text} }}"),
            None => body_text,
        };
        let head = if decl.is_empty() {
            target
        } else {
            decl
        };
        Some(format!("for ({head} in {right_text}) {body_final}"))
    }

    /// Resolve a for-of/for-in head into a loop variable: the declaration
    /// text for the for-head, the assignment target name, and destructuring
    /// statements to prepend to the body.
    fn for_loop_target(&mut self, left: &Node) -> (String, String, Option<String>) {
        match &left.kind {
            NodeKind::VariableDeclaration { declarations, .. } => {
                let Some(declarator) = declarations.first() else {
                    return (String::new(), String::new(), None);
                };
                let NodeKind::VariableDeclarator { pattern, .. } = &declarator.kind else {
                    return (String::new(), String::new(), None);
                };
                if pattern.is_pattern() {
                    let temp = self.uid();
                    let mut assigns = Vec::new();
                    self.unroll_pattern_into(pattern, &temp, true, &mut assigns);
                    (
                        format!("var {temp}"),
                        temp,
                        Some(format!("var {};", assigns.join(", "))),
                    )
                } else {
                    let name = self.raw(pattern.span).to_string();
                    (format!("var {name}"), name, None)
                }
            }
            NodeKind::ObjectPattern { .. } | NodeKind::ArrayPattern { .. } => {
                // Existing bindings: assign through a lifted temp
                let temp = self.uid();
                self.add_temp_var(&temp, None, false);
                let mut assigns = Vec::new();
                self.unroll_pattern_into(left, &temp, false, &mut assigns);
                (String::new(), temp, Some(format!("{};", assigns.join(", "))))
            }
            _ => (String::new(), self.visit(left), None),
        }
    }

    // =========================================================================
    // Comprehensions
    // =========================================================================

    /// `[for (x of it) if (c) expr]` wraps into an array-building IIFE and
    /// is desugared again by a nested replacer run.
    pub(crate) fn array_comprehension(&mut self, node: &Node) -> String {
        let NodeKind::ArrayComprehension {
            qualifiers,
            expression,
        } = &node.kind
        else {
            unreachable!("array_comprehension on {}", node.kind_name());
        };
        let acc = self.uid();
        let chain = self.comprehension_chain(qualifiers);
        let expr = self.raw(expression.span);
        let this_ref = self.this_reference();
        let snippet = format!(
            "(function() {{ var {acc} = []; {chain}{acc}.push({expr}); return {acc}; }}).call({this_ref})"
        );
        self.replace_snippet(snippet)
    }

    /// `(for (x of it) expr)` becomes an immediately invoked generator.
    pub(crate) fn generator_comprehension(&mut self, node: &Node) -> String {
        let NodeKind::GeneratorComprehension {
            qualifiers,
            expression,
        } = &node.kind
        else {
            unreachable!("generator_comprehension on {}", node.kind_name());
        };
        let chain = self.comprehension_chain(qualifiers);
        let expr = self.raw(expression.span);
        let this_ref = self.this_reference();
        let snippet =
            format!("(function*() {{ {chain}yield {expr}; }}).call({this_ref})");
        self.replace_snippet(snippet)
    }

    /// The nested `for`/`if` clause chain, in source order, from the raw
    /// source text (the nested run desugars it).
    fn comprehension_chain(&mut self, qualifiers: &[Node]) -> String {
        let mut chain = String::new();
        for qualifier in qualifiers {
            match &qualifier.kind {
                NodeKind::ComprehensionFor { pattern, of } => {
                    let pattern_text = self.raw(pattern.span);
                    let of_text = self.raw(of.span);
                    chain.push_str(&format!("for (var {pattern_text} of {of_text}) "));
                }
                NodeKind::ComprehensionIf { test } => {
                    let test_text = self.raw(test.span);
                    chain.push_str(&format!("if ({test_text}) "));
                }
                _ => {}
            }
        }
        chain
    }
}

/// True when a for-in/for-of head binds through a destructuring pattern.
fn for_head_destructures(left: &Node) -> bool {
    match &left.kind {
        NodeKind::VariableDeclaration { declarations, .. } => declarations.first().is_some_and(
            |d| matches!(&d.kind, NodeKind::VariableDeclarator { pattern, .. } if pattern.is_pattern()),
        ),
        NodeKind::ObjectPattern { .. } | NodeKind::ArrayPattern { .. } => true,
        _ => false,
    }
}
