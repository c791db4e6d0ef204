//! Function lowering: arrows, rest and default parameters, destructured
//! parameters, and async functions.
//!
//! ```text
//! (a, ...r) => body     =>  (function(a) { var r = _runtime.rest(arguments, 1); ... })
//! function f(a = 1) {}  =>  function f(a) { if (a === void 0) a = 1; }
//! async function f() {} =>  function f() { try { return _runtime.async(function*() {
//!                               ... }.apply(this, arguments)); } catch (x) {
//!                               return Promise.reject(x); } }
//! ```
//!
//! Arrow bodies rewrite `this` to `__this`; the binding itself is emitted
//! by the nearest enclosing non-arrow function.

use crate::parser::ast::{FunctionKind, MethodKind, Node, NodeKind};
use crate::replacer::{FnScope, Replacer};
use crate::span::Span;

/// A rendered parameter list and body.
pub(crate) struct RenderedFunction {
    pub params: String,
    pub body: String,
}

impl Replacer<'_> {
    // =========================================================================
    // Node Handlers
    // =========================================================================

    pub(crate) fn arrow_function(&mut self, node: &Node) -> String {
        let NodeKind::ArrowFunction {
            is_async,
            params,
            body,
        } = &node.kind
        else {
            unreachable!("arrow_function on {}", node.kind_name());
        };
        let rendered = self.render_function(params, body, *is_async, true);
        format!("(function({}) {})", rendered.params, rendered.body)
    }

    pub(crate) fn function_node(&mut self, node: &Node) -> String {
        let (kind, name, params, body) = match &node.kind {
            NodeKind::FunctionDeclaration {
                kind,
                name,
                params,
                body,
            } => (*kind, Some(name.as_ref()), params, body.as_ref()),
            NodeKind::FunctionExpression {
                kind,
                name,
                params,
                body,
            } => (*kind, name.as_deref(), params, body.as_ref()),
            _ => unreachable!("function_node on {}", node.kind_name()),
        };
        let rendered =
            self.render_function(params, body, kind == FunctionKind::Async, false);
        let star = if kind == FunctionKind::Generator { "*" } else { "" };
        let name_text = name.map(|n| self.raw(n.span)).unwrap_or("");
        let space = if name_text.is_empty() { "" } else { " " };
        format!(
            "function{star}{space}{name_text}({}) {}",
            rendered.params, rendered.body
        )
    }

    /// Render a method definition as an object-literal property. Accessors
    /// keep the native `get`/`set` syntax; everything else becomes
    /// `key: function(...) {...}`.
    pub(crate) fn method_as_property(
        &mut self,
        node: &Node,
        key_override: Option<&str>,
    ) -> String {
        let NodeKind::MethodDefinition {
            kind,
            name,
            params,
            body,
        } = &node.kind
        else {
            unreachable!("method_as_property on {}", node.kind_name());
        };
        self.method_stack
            .push(name.identifier_value().map(str::to_string));
        let rendered =
            self.render_function(params, body, *kind == MethodKind::Async, false);
        self.method_stack.pop();

        let key_storage;
        let key = match key_override {
            Some(key) => key,
            None => {
                key_storage = self.raw(name.span).to_string();
                &key_storage
            }
        };
        match kind {
            MethodKind::Get => format!("get {key}({}) {}", rendered.params, rendered.body),
            MethodKind::Set => format!("set {key}({}) {}", rendered.params, rendered.body),
            MethodKind::Generator => {
                format!("{key}: function*({}) {}", rendered.params, rendered.body)
            }
            _ => format!("{key}: function({}) {}", rendered.params, rendered.body),
        }
    }

    // =========================================================================
    // Shared Rendering
    // =========================================================================

    /// Render a parameter list and body with all the body insertions the
    /// lowered forms need: rest capture, default checks, parameter
    /// destructuring, lifted temporaries, and the `__this` binding.
    pub(crate) fn render_function(
        &mut self,
        params: &[Node],
        body: &Node,
        is_async: bool,
        is_arrow: bool,
    ) -> RenderedFunction {
        self.fn_stack.push(FnScope {
            is_arrow,
            ..FnScope::default()
        });
        let body_strict = function_body_is_strict(self.raw(Span::new(0, u32::MAX)), body);
        if body_strict {
            self.strict_stack.push(true);
        }

        // Parameters: rest is erased, destructuring patterns become
        // synthesized names unpacked in the body
        let mut formals: Vec<String> = Vec::new();
        let mut param_inserts = String::new();
        let mut rest_insert = String::new();
        for param in params {
            match &param.kind {
                NodeKind::RestParameter { ident } => {
                    let name = self.raw(ident.span);
                    rest_insert =
                        format!("var {name} = _runtime.rest(arguments, {}); ", formals.len());
                }
                NodeKind::FormalParameter { pattern, init } => {
                    if matches!(pattern.kind, NodeKind::Identifier { .. }) {
                        let name = self.raw(pattern.span).to_string();
                        if let Some(init) = init {
                            let init_text = self.visit(init);
                            param_inserts.push_str(&format!(
                                "if ({name} === void 0) {name} = {init_text}; "
                            ));
                        }
                        formals.push(name);
                    } else {
                        let temp = self.uid();
                        if let Some(init) = init {
                            let init_text = self.visit(init);
                            param_inserts.push_str(&format!(
                                "if ({temp} === void 0) {temp} = {init_text}; "
                            ));
                        }
                        let mut assigns = Vec::new();
                        self.unroll_pattern_into(pattern, &temp, true, &mut assigns);
                        if !assigns.is_empty() {
                            param_inserts
                                .push_str(&format!("var {}; ", assigns.join(", ")));
                        }
                        formals.push(temp);
                    }
                }
                _ => {}
            }
        }

        // Visit the body before assembling: this fills in the scope's
        // lifted temporaries and the `__this` flag
        let body_text = match &body.kind {
            NodeKind::FunctionBody { statements } => {
                let directives = count_directives(self.input_raw(), statements);
                let texts: Vec<(Span, String)> = statements
                    .iter()
                    .map(|s| (s.span, self.visit(s)))
                    .collect();
                let inserts = self.build_inserts(&rest_insert, &param_inserts);
                self.assemble_body(body, &texts, directives, &inserts)
            }
            _ => {
                // Concise arrow body: wrap the expression in a return
                let expr = self.visit(body);
                let inserts = self.build_inserts(&rest_insert, &param_inserts);
                format!("{{ {inserts}return {expr}; }}")
            }
        };

        let body_text = if is_async {
            format!(
                "{{ try {{ return _runtime.async(function*() {body_text}.apply(this, arguments)); }} \
                 catch (x) {{ return Promise.reject(x); }} }}"
            )
        } else {
            body_text
        };

        if body_strict {
            self.strict_stack.pop();
        }
        self.fn_stack.pop();

        RenderedFunction {
            params: formals.join(", "),
            body: body_text,
        }
    }

    /// Everything lifted to the top of the function body, in order:
    /// `__this` binding, rest capture, parameter defaults/unpacking, then
    /// temporary declarations.
    fn build_inserts(&self, rest_insert: &str, param_inserts: &str) -> String {
        let scope = self.fn_stack.last().expect("function scope");
        let mut inserts = String::new();
        if scope.create_this_binding {
            inserts.push_str("var __this = this; ");
        }
        inserts.push_str(rest_insert);
        inserts.push_str(param_inserts);
        inserts.push_str(&self.temp_declarations(scope));
        inserts
    }

    /// Assemble a braced body from visited statement texts, placing the
    /// inserted statements after the directive prologue.
    pub(crate) fn assemble_body(
        &mut self,
        body: &Node,
        texts: &[(Span, String)],
        directives: usize,
        inserts: &str,
    ) -> String {
        let mut out = String::new();
        let mut pos = body.span.start;
        if directives == 0 {
            out.push('{');
            if !inserts.is_empty() {
                out.push(' ');
                out.push_str(inserts);
            }
            pos = body.span.start + 1;
        }
        for (index, (span, text)) in texts.iter().enumerate() {
            out.push_str(self.raw_range(pos, span.start));
            out.push_str(text);
            pos = span.end;
            if directives > 0 && index + 1 == directives && !inserts.is_empty() {
                out.push(' ');
                out.push_str(inserts);
            }
        }
        out.push_str(self.raw_range(pos, body.span.end));
        out
    }

    pub(crate) fn input_raw(&self) -> &str {
        self.raw_range(0, u32::MAX)
    }
}

/// Count leading directive-candidate statements (string expression
/// statements).
pub(crate) fn count_directives(input: &str, statements: &[Node]) -> usize {
    statements
        .iter()
        .take_while(|s| {
            matches!(&s.kind, NodeKind::ExpressionStatement { expression }
                if matches!(expression.kind, NodeKind::StringLiteral { .. })
                    && expression.span.slice(input).len() >= 2)
        })
        .count()
}

/// True when a function body's directive prologue contains `use strict`.
fn function_body_is_strict(input: &str, body: &Node) -> bool {
    let NodeKind::FunctionBody { statements } = &body.kind else {
        return false;
    };
    for statement in statements {
        let NodeKind::ExpressionStatement { expression } = &statement.kind else {
            return false;
        };
        let NodeKind::StringLiteral { .. } = &expression.kind else {
            return false;
        };
        let raw = expression.span.slice(input);
        if raw.len() >= 2 && &raw[1..raw.len() - 1] == "use strict" {
            return true;
        }
    }
    false
}
