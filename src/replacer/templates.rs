//! Template literals, tagged templates, and call-site lowering (spread
//! arguments, `super` calls).
//!
//! ```text
//! `a${b}c`        =>  ("a" + (b) + "c")
//! tag`a${b}`      =>  tag(_runtime.templateSite(["a", ""], ...), b)
//! f(a, ...xs)     =>  f.apply(void 0, [a].concat(xs))
//! o.m(...xs)      =>  (__$0 = o).m.apply(__$0, [].concat(xs))
//! super.m(x)      =>  __super.m.call(this, x)
//! ```

use crate::parser::ast::{Node, NodeKind};
use crate::replacer::{Replacer, string_literal};

impl Replacer<'_> {
    // =========================================================================
    // Templates
    // =========================================================================

    /// Lower a template literal to string concatenation over the cooked
    /// pieces, substitutions parenthesized.
    pub(crate) fn template_expression(&mut self, node: &Node) -> String {
        let NodeKind::TemplateExpression { parts } = &node.kind else {
            unreachable!("template_expression on {}", node.kind_name());
        };
        let mut terms: Vec<String> = Vec::new();
        for (index, part) in parts.iter().enumerate() {
            match &part.kind {
                NodeKind::Template { value, .. } => {
                    // Empty pieces other than the leading one add nothing
                    if index == 0 || !value.is_empty() {
                        terms.push(string_literal(value));
                    }
                }
                _ => terms.push(format!("({})", self.visit(part))),
            }
        }
        if terms.len() == 1 {
            terms.pop().unwrap()
        } else {
            format!("({})", terms.join(" + "))
        }
    }

    /// Lower a tagged template to a call through a `_runtime.templateSite`
    /// call-site object. The raw array is omitted when identical to the
    /// cooked parts.
    pub(crate) fn tagged_template(&mut self, node: &Node) -> String {
        let NodeKind::TaggedTemplateExpression { tag, template } = &node.kind else {
            unreachable!("tagged_template on {}", node.kind_name());
        };
        let NodeKind::TemplateExpression { parts } = &template.kind else {
            return self.stringify(node);
        };

        let mut cooked: Vec<String> = Vec::new();
        let mut raws: Vec<String> = Vec::new();
        let mut raw_differs = false;
        let mut subs: Vec<String> = Vec::new();
        for part in parts {
            match &part.kind {
                NodeKind::Template { value, raw } => {
                    cooked.push(string_literal(value));
                    raws.push(string_literal(raw));
                    if value != raw {
                        raw_differs = true;
                    }
                }
                _ => subs.push(self.visit(part)),
            }
        }

        let tag_text = self.visit(tag);
        let site = if raw_differs {
            format!(
                "_runtime.templateSite([{}], [{}])",
                cooked.join(", "),
                raws.join(", ")
            )
        } else {
            format!("_runtime.templateSite([{}])", cooked.join(", "))
        };
        let mut out = format!("{tag_text}({site}");
        for sub in subs {
            out.push_str(", ");
            out.push_str(&sub);
        }
        out.push(')');
        out
    }

    // =========================================================================
    // Object Literals
    // =========================================================================

    /// Object literals need rewriting here only for computed property
    /// names: `{ [k]: v }` gets a placeholder key and the whole literal is
    /// patched through `_runtime.computed`. Shorthand properties and
    /// methods are handled by their own node arms during default rendering.
    pub(crate) fn object_literal(&mut self, node: &Node) -> Option<String> {
        let NodeKind::ObjectLiteral { properties } = &node.kind else {
            unreachable!("object_literal on {}", node.kind_name());
        };
        let has_computed = properties.iter().any(|p| {
            matches!(
                &p.kind,
                NodeKind::PropertyDefinition { name, .. }
                | NodeKind::MethodDefinition { name, .. }
                    if matches!(name.kind, NodeKind::ComputedPropertyName { .. })
            )
        });
        if !has_computed {
            return None;
        }

        let mut pairs: Vec<(String, String)> = Vec::new();
        let mut parts: Vec<(crate::span::Span, String)> = Vec::new();
        for property in properties {
            let text = match &property.kind {
                NodeKind::PropertyDefinition {
                    name,
                    value: Some(value),
                } if matches!(name.kind, NodeKind::ComputedPropertyName { .. }) => {
                    let NodeKind::ComputedPropertyName { expression } = &name.kind else {
                        unreachable!()
                    };
                    let placeholder = self.uid();
                    let key_expr = self.visit(expression);
                    let value_text = self.visit(value);
                    pairs.push((placeholder.clone(), key_expr));
                    format!("\"{placeholder}\": {value_text}")
                }
                NodeKind::MethodDefinition { name, .. }
                    if matches!(name.kind, NodeKind::ComputedPropertyName { .. }) =>
                {
                    let NodeKind::ComputedPropertyName { expression } = &name.kind else {
                        unreachable!()
                    };
                    let placeholder = self.uid();
                    let key_expr = self.visit(expression);
                    pairs.push((placeholder.clone(), key_expr));
                    self.method_as_property(property, Some(&format!("\"{placeholder}\"")))
                }
                _ => self.visit(property),
            };
            parts.push((property.span, text));
        }

        let object = self.stitch(node, &parts);
        let mut out = format!("_runtime.computed({object}");
        for (placeholder, key) in pairs {
            out.push_str(&format!(", \"{placeholder}\", {key}"));
        }
        out.push(')');
        Some(out)
    }

    // =========================================================================
    // Calls
    // =========================================================================

    /// Lower `super` calls and calls with spread arguments. Everything else
    /// falls through to the default rendering.
    pub(crate) fn call_expression(&mut self, node: &Node) -> Option<String> {
        let NodeKind::CallExpression { callee, arguments } = &node.kind else {
            unreachable!("call_expression on {}", node.kind_name());
        };
        let has_spread = arguments
            .iter()
            .any(|a| matches!(a.kind, NodeKind::SpreadExpression { .. }));

        // super(args) rewrites through the method table captured by the
        // class wrapper
        if matches!(callee.kind, NodeKind::SuperExpression) {
            let target = match self.method_stack.last().cloned().flatten() {
                Some(name) if name != "constructor" => format!("__super.{name}"),
                _ => "__super.constructor".to_string(),
            };
            return Some(self.this_call(&target, arguments, has_spread));
        }

        // super.m(args) / super[m](args)
        if let NodeKind::MemberExpression {
            object,
            property,
            computed,
        } = &callee.kind
        {
            if matches!(object.kind, NodeKind::SuperExpression) {
                let target = if *computed {
                    format!("__super[{}]", self.visit(property))
                } else {
                    format!("__super.{}", self.raw(property.span))
                };
                return Some(self.this_call(&target, arguments, has_spread));
            }
        }

        if !has_spread {
            return None;
        }

        let args_array = self.spread_args_array(arguments);
        match &callee.kind {
            NodeKind::MemberExpression {
                object,
                property,
                computed,
            } => {
                // Cache the receiver so it is evaluated once
                let temp = self.uid();
                self.add_temp_var(&temp, None, false);
                let object_text = self.visit(object);
                let access = if *computed {
                    format!("[{}]", self.visit(property))
                } else {
                    format!(".{}", self.raw(property.span))
                };
                Some(format!(
                    "({temp} = {object_text}){access}.apply({temp}, {args_array})"
                ))
            }
            _ => {
                let callee_text = self.visit(callee);
                Some(format!("{callee_text}.apply(void 0, {args_array})"))
            }
        }
    }

    /// Lower `new` with spread arguments through `Function.prototype.bind`.
    pub(crate) fn new_expression(&mut self, node: &Node) -> Option<String> {
        let NodeKind::NewExpression { callee, arguments } = &node.kind else {
            unreachable!("new_expression on {}", node.kind_name());
        };
        if !arguments
            .iter()
            .any(|a| matches!(a.kind, NodeKind::SpreadExpression { .. }))
        {
            return None;
        }
        let callee_text = self.visit(callee);
        let segments = self.spread_segments(arguments);
        Some(format!(
            "new (Function.prototype.bind.apply({callee_text}, [null].concat({})))()",
            segments.join(", ")
        ))
    }

    /// `super.x` outside a call position.
    pub(crate) fn member_expression(&mut self, node: &Node) -> Option<String> {
        let NodeKind::MemberExpression {
            object,
            property,
            computed,
        } = &node.kind
        else {
            unreachable!("member_expression on {}", node.kind_name());
        };
        if !matches!(object.kind, NodeKind::SuperExpression) {
            return None;
        }
        if *computed {
            Some(format!("__super[{}]", self.visit(property)))
        } else {
            Some(format!("__super.{}", self.raw(property.span)))
        }
    }

    /// A call that must preserve `this`: `.call(this, ...)` for plain
    /// argument lists, `.apply(this, ...)` when spread is involved.
    fn this_call(&mut self, target: &str, arguments: &[Node], has_spread: bool) -> String {
        if has_spread {
            let args_array = self.spread_args_array(arguments);
            format!("{target}.apply(this, {args_array})")
        } else if arguments.is_empty() {
            format!("{target}.call(this)")
        } else {
            let args: Vec<String> = arguments.iter().map(|a| self.visit(a)).collect();
            format!("{target}.call(this, {})", args.join(", "))
        }
    }

    /// Build the argument array expression for a spread call:
    /// `[fixed].concat(spread, [more fixed], ...)`.
    pub(crate) fn spread_args_array(&mut self, arguments: &[Node]) -> String {
        let segments = self.spread_segments(arguments);
        let mut iter = segments.into_iter();
        let first = iter.next().unwrap_or_else(|| "[]".to_string());
        let (base, rest): (String, Vec<String>) = if first.starts_with('[') {
            (first, iter.collect())
        } else {
            ("[]".to_string(), std::iter::once(first).chain(iter).collect())
        };
        if rest.is_empty() {
            base
        } else {
            format!("{base}.concat({})", rest.join(", "))
        }
    }

    /// Alternate runs of fixed arguments (as array literals) and spread
    /// expressions, in argument order.
    fn spread_segments(&mut self, arguments: &[Node]) -> Vec<String> {
        let mut segments: Vec<String> = Vec::new();
        let mut fixed: Vec<String> = Vec::new();
        for argument in arguments {
            match &argument.kind {
                NodeKind::SpreadExpression { expression } => {
                    if !fixed.is_empty() {
                        segments.push(format!("[{}]", fixed.join(", ")));
                        fixed.clear();
                    }
                    segments.push(self.visit(expression));
                }
                _ => fixed.push(self.visit(argument)),
            }
        }
        if !fixed.is_empty() {
            segments.push(format!("[{}]", fixed.join(", ")));
        }
        segments
    }
}
