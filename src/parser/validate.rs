//! Validation capability consumed by the parser.
//!
//! Binding-identifier checks, assignment-target checks, parameter-set
//! checks, and the duplicate-name matrices for object literals and class
//! bodies live here rather than being spread through the grammar methods.
//! Deferred errors (duplicate properties, covered shorthand initializers)
//! are recorded on the current context frame and surfaced at the end of the
//! enclosing statement list unless a pattern transform cancels them.

use crate::diagnostics::SyntaxError;
use crate::parser::ast::{IdentContext, Node, NodeKind};
use crate::parser::state::ParserState;
use crate::span::Span;
use rustc_hash::FxHashMap;

/// An error deferred until the end of the enclosing statement list.
#[derive(Clone, Debug)]
pub struct DeferredError {
    pub span: Span,
    pub message: String,
    /// Only an error when the context ends up strict
    pub strict_only: bool,
}

// =============================================================================
// Duplicate-name tracking for object literals and class bodies
// =============================================================================

/// Property flavor bits for the duplicate-name matrix.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PropKind {
    Data,
    Get,
    Set,
}

const DATA: u8 = 1;
const GET: u8 = 2;
const SET: u8 = 4;

/// Tracks property names seen in one object literal or one side
/// (instance/static) of a class body, applying the duplicate matrix:
/// data+data is an error only in strict mode, get+set is fine, a repeated
/// accessor of the same kind is an error, and data+accessor is an error.
#[derive(Default)]
pub struct NameSet {
    seen: FxHashMap<String, u8>,
}

impl NameSet {
    pub fn new() -> NameSet {
        NameSet::default()
    }

    /// Record a property name. On a conflict, returns the error message and
    /// whether it only applies in strict mode.
    pub fn add(&mut self, name: &str, kind: PropKind) -> Option<(String, bool)> {
        let bit = match kind {
            PropKind::Data => DATA,
            PropKind::Get => GET,
            PropKind::Set => SET,
        };
        let entry = self.seen.entry(name.to_string()).or_insert(0);
        let prev = *entry;
        *entry |= bit;
        if prev == 0 {
            return None;
        }
        let conflict = match kind {
            PropKind::Data if prev & DATA != 0 => Some((
                format!("Duplicate property name '{name}' in object literal"),
                true,
            )),
            PropKind::Data => Some((
                format!("Property '{name}' has both a value and an accessor"),
                false,
            )),
            PropKind::Get if prev & GET != 0 => {
                Some((format!("Duplicate getter for '{name}'"), false))
            }
            PropKind::Set if prev & SET != 0 => {
                Some((format!("Duplicate setter for '{name}'"), false))
            }
            PropKind::Get | PropKind::Set if prev & DATA != 0 => Some((
                format!("Property '{name}' has both a value and an accessor"),
                false,
            )),
            _ => None,
        };
        conflict
    }
}

// =============================================================================
// Identifier and target checks
// =============================================================================

impl ParserState {
    /// Validate an identifier used as a binding target and mark its context.
    pub(crate) fn check_binding_ident(&mut self, node: &mut Node) -> Result<(), SyntaxError> {
        let span = node.span;
        if let NodeKind::Identifier { value, context } = &mut node.kind {
            *context = IdentContext::Declaration;
            if self.strict() && (value == "eval" || value == "arguments") {
                let message = format!("Cannot bind '{value}' in strict mode");
                return self.fail(message, span);
            }
            Ok(())
        } else {
            self.fail("Invalid binding target", span)
        }
    }

    /// Validate an expression used as an assignment target and mark
    /// identifier context.
    pub(crate) fn check_assign_target(&mut self, node: &mut Node) -> Result<(), SyntaxError> {
        let span = node.span;
        match &mut node.kind {
            NodeKind::Identifier { value, context } => {
                *context = IdentContext::Variable;
                if self.strict() && (value == "eval" || value == "arguments") {
                    let message = format!("Cannot assign to '{value}' in strict mode");
                    return self.fail(message, span);
                }
                Ok(())
            }
            NodeKind::MemberExpression { .. } | NodeKind::CallExpression { .. } => Ok(()),
            NodeKind::ParenExpression { expression } => self.check_assign_target(expression),
            _ => self.fail("Invalid assignment target", span),
        }
    }

    /// Validate a parameter list once the body's directive prologue has
    /// settled the function's strictness: duplicates and `eval`/`arguments`
    /// are rejected in strict mode.
    pub(crate) fn check_parameters(&mut self, params: &[Node]) -> Result<(), SyntaxError> {
        if !self.strict() {
            return Ok(());
        }
        let mut names: Vec<(String, Span)> = Vec::new();
        for param in params {
            collect_bound_names(param, &mut names);
        }
        let mut seen: FxHashMap<&str, ()> = FxHashMap::default();
        for (name, span) in &names {
            if name == "eval" || name == "arguments" {
                let message = format!("Cannot use '{name}' as a parameter name in strict mode");
                return self.fail(message, *span);
            }
            if seen.insert(name.as_str(), ()).is_some() {
                let message = format!("Duplicate parameter name '{name}'");
                return self.fail(message, *span);
            }
        }
        Ok(())
    }
}

/// Collect the identifiers bound by a parameter or pattern, in source order.
pub fn collect_bound_names(node: &Node, out: &mut Vec<(String, Span)>) {
    match &node.kind {
        NodeKind::Identifier { value, .. } => out.push((value.clone(), node.span)),
        NodeKind::FormalParameter { pattern, .. } => collect_bound_names(pattern, out),
        NodeKind::RestParameter { ident } => collect_bound_names(ident, out),
        NodeKind::ArrayPattern { elements } => {
            for element in elements.iter().flatten() {
                collect_bound_names(element, out);
            }
        }
        NodeKind::ObjectPattern { properties } => {
            for property in properties {
                collect_bound_names(property, out);
            }
        }
        NodeKind::PatternElement { pattern, .. } => collect_bound_names(pattern, out),
        NodeKind::PatternProperty { name, pattern, .. } => match pattern {
            Some(p) => collect_bound_names(p, out),
            None => collect_bound_names(name, out),
        },
        NodeKind::PatternRestElement { pattern } => collect_bound_names(pattern, out),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_set_matrix() {
        let mut set = NameSet::new();
        assert!(set.add("a", PropKind::Data).is_none());
        // data + data: strict-only error
        let (_, strict_only) = set.add("a", PropKind::Data).unwrap();
        assert!(strict_only);

        let mut set = NameSet::new();
        assert!(set.add("b", PropKind::Get).is_none());
        // get + set is fine
        assert!(set.add("b", PropKind::Set).is_none());
        // second setter is an unconditional error
        let (_, strict_only) = set.add("b", PropKind::Set).unwrap();
        assert!(!strict_only);

        let mut set = NameSet::new();
        set.add("c", PropKind::Data);
        // data + accessor is an unconditional error
        let (_, strict_only) = set.add("c", PropKind::Get).unwrap();
        assert!(!strict_only);
    }
}
