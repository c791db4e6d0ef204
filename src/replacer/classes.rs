//! Class lowering.
//!
//! ```text
//! class A extends B { m() { super.m(); } }
//! ```
//! Becomes:
//! ```text
//! var A = _runtime.class(B, function(__super) { return {
//!     constructor: function A() { var c = __super.constructor;
//!         if (c) return c.apply(this, arguments); },
//!     m: function() { __super.m.call(this); }
//! }; });
//! ```
//!
//! Method shorthand becomes object properties, static members group into a
//! `static` block, and a constructor is synthesized when missing. Computed
//! member names are emitted with placeholder keys and patched through
//! `_runtime.computed`.

use crate::parser::ast::{MethodKind, Node, NodeKind};
use crate::replacer::Replacer;

impl Replacer<'_> {
    pub(crate) fn class_node(&mut self, node: &Node) -> String {
        let (name, base, body, is_declaration) = match &node.kind {
            NodeKind::ClassDeclaration { name, base, body } => {
                (Some(name.as_ref()), base.as_deref(), body.as_ref(), true)
            }
            NodeKind::ClassExpression { name, base, body } => {
                (name.as_deref(), base.as_deref(), body.as_ref(), false)
            }
            _ => unreachable!("class_node on {}", node.kind_name()),
        };

        let surrounding_strict = self.is_strict();
        self.strict_stack.push(true);

        let class_name = name.map(|n| self.raw(n.span).to_string()).unwrap_or_default();
        let base_text = base.map(|b| self.visit(b));

        let NodeKind::ClassBody { elements } = &body.kind else {
            unreachable!("class body");
        };

        let mut constructor: Option<String> = None;
        let mut proto_entries: Vec<String> = Vec::new();
        let mut static_entries: Vec<String> = Vec::new();
        // (placeholder, key expression) pairs for computed names
        let mut proto_computed: Vec<(String, String)> = Vec::new();
        let mut static_computed: Vec<(String, String)> = Vec::new();

        for element in elements {
            let NodeKind::ClassElement { is_static, method } = &element.kind else {
                continue;
            };
            let NodeKind::MethodDefinition { kind, name, params, body } = &method.kind else {
                continue;
            };

            let is_constructor = !is_static
                && *kind == MethodKind::Normal
                && name.identifier_value() == Some("constructor");
            if is_constructor {
                self.method_stack.push(Some("constructor".to_string()));
                let rendered = self.render_function(params, body, false, false);
                self.method_stack.pop();
                constructor = Some(format!(
                    "function {class_name}({}) {}",
                    rendered.params, rendered.body
                ));
                continue;
            }

            let entry = match &name.kind {
                NodeKind::ComputedPropertyName { expression } => {
                    let key_expr = self.visit(expression);
                    let placeholder = if *is_static {
                        let n = static_computed.len();
                        format!("__static_{n}")
                    } else {
                        self.uid()
                    };
                    let text =
                        self.method_as_property(method, Some(&format!("\"{placeholder}\"")));
                    if *is_static {
                        static_computed.push((placeholder, key_expr));
                    } else {
                        proto_computed.push((placeholder, key_expr));
                    }
                    text
                }
                _ => self.method_as_property(method, None),
            };
            if *is_static {
                static_entries.push(entry);
            } else {
                proto_entries.push(entry);
            }
        }

        // Synthesize a constructor when the class does not define one
        let constructor = constructor.unwrap_or_else(|| {
            if base_text.is_some() {
                format!(
                    "function {class_name}() {{ var c = __super.constructor; \
                     if (c) return c.apply(this, arguments); }}"
                )
            } else {
                format!("function {class_name}() {{}}")
            }
        });

        let mut object = format!("{{ constructor: {constructor}");
        for entry in &proto_entries {
            object.push_str(", ");
            object.push_str(entry);
        }
        if !static_entries.is_empty() || !static_computed.is_empty() {
            let statics = wrap_computed(
                format!("{{ {} }}", static_entries.join(", ")),
                &static_computed,
            );
            object.push_str(&format!(", static: {statics}"));
        }
        object.push_str(" }");
        let object = wrap_computed(object, &proto_computed);

        let use_strict = if surrounding_strict { "" } else { "\"use strict\"; " };
        let definition = format!("function(__super) {{ {use_strict}return {object}; }}");
        let call = match base_text {
            Some(base) => format!("_runtime.class({base}, {definition})"),
            None => format!("_runtime.class({definition})"),
        };

        self.strict_stack.pop();

        if is_declaration {
            format!("var {class_name} = {call};")
        } else {
            call
        }
    }
}

/// Wrap an object text in `_runtime.computed(obj, "placeholder", key, ...)`
/// when computed member names are present.
fn wrap_computed(object: String, pairs: &[(String, String)]) -> String {
    if pairs.is_empty() {
        return object;
    }
    let mut out = format!("_runtime.computed({object}");
    for (placeholder, key) in pairs {
        out.push_str(&format!(", \"{placeholder}\", {key}"));
    }
    out.push(')');
    out
}
