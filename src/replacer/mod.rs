//! Desugaring replacer: AST to output text.
//!
//! A single depth-first pass dispatches on the node kind tag; one match arm
//! per kind that needs rewriting, with default rendering as the fallback.
//! Default rendering stitches each child's rewritten text back into the
//! original inter-child source text, so untouched constructs pass through
//! byte-for-byte.
//!
//! Every produced region is passed through line-sync so that all following
//! source lines keep their line numbers in the output.

mod classes;
mod destructuring;
mod functions;
mod iteration;
mod modules;
mod templates;

use crate::line_sync::preserve_newlines;
use crate::parser::ast::{Node, NodeKind};
use crate::parser::{ParseGoal, ParseResult, ParserState};
use crate::scanner::Scanner;
use crate::span::Span;
use rustc_hash::FxHashMap;
use tracing::debug;

/// Options consumed by the replacer.
#[derive(Clone, Debug, Default)]
pub struct ReplacerOptions {
    /// Emit `__load(url, false)` instead of `require(url)` in the import
    /// header
    pub runtime_imports: bool,
}

/// Result of a replacement pass.
#[derive(Clone, Debug)]
pub struct ReplaceOutput {
    /// The rewritten program text
    pub text: String,
    /// Imported module URLs in first-use order
    pub dependencies: Vec<String>,
}

/// A synthesized temporary, lifted to the top of the enclosing function.
#[derive(Clone, Debug)]
pub(crate) struct TempVar {
    pub name: String,
    pub value: Option<String>,
    /// Assigned elsewhere; only reserve the name, do not declare it
    pub no_declare: bool,
}

/// Per-function mutable annotations collected while the body is visited.
#[derive(Debug, Default)]
pub(crate) struct FnScope {
    pub is_arrow: bool,
    /// The body references `this` from inside an arrow function
    pub create_this_binding: bool,
    pub temp_vars: Vec<TempVar>,
}

/// An insertion-ordered export map: export name to output expression.
#[derive(Debug, Default)]
pub(crate) struct ExportMap {
    pub entries: Vec<(String, String)>,
}

impl ExportMap {
    pub fn add(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.entries.push((name.into(), value.into()));
    }
}

/// The replacer. One instance per `replace` call; comprehension desugaring
/// spawns nested instances that share the uid counter.
pub struct Replacer<'a> {
    input: &'a str,
    scanner: &'a Scanner,
    options: ReplacerOptions,
    uid: u32,
    pub(crate) fn_stack: Vec<FnScope>,
    pub(crate) method_stack: Vec<Option<String>>,
    pub(crate) strict_stack: Vec<bool>,
    pub(crate) export_stack: Vec<ExportMap>,
    /// url -> module identifier
    pub(crate) import_map: FxHashMap<String, String>,
    /// (url, identifier) in first-use order
    pub(crate) imports: Vec<(String, String)>,
    pub(crate) dependencies: Vec<String>,
    /// Depth of nested comprehension re-runs
    nesting: u32,
}

/// Rewrite a parsed program into output text.
pub fn replace(parse: &ParseResult, options: &ReplacerOptions) -> ReplaceOutput {
    let input: &str = parse.scanner.source();
    let uid = seed_uid(input);
    let mut replacer = Replacer::new(input, &parse.scanner, options.clone(), uid, 0);
    let text = replacer.replace_root(&parse.root);
    debug!(
        input_len = input.len(),
        output_len = text.len(),
        imports = replacer.imports.len(),
        "replace complete"
    );
    ReplaceOutput {
        text,
        dependencies: replacer.dependencies,
    }
}

/// Seed the uid counter past any `__$<n>` already present in the input so
/// synthesized temporaries never collide with user identifiers.
pub(crate) fn seed_uid(input: &str) -> u32 {
    let mut max: Option<u32> = None;
    let bytes = input.as_bytes();
    let mut i = 0;
    while let Some(found) = input[i..].find("__$") {
        let mut j = i + found + 3;
        let digit_start = j;
        while j < bytes.len() && bytes[j].is_ascii_digit() {
            j += 1;
        }
        if j > digit_start {
            if let Ok(n) = input[digit_start..j].parse::<u32>() {
                max = Some(max.map_or(n, |m| m.max(n)));
            }
        }
        i = i + found + 3;
    }
    max.map_or(0, |m| m + 1)
}

impl<'a> Replacer<'a> {
    pub(crate) fn new(
        input: &'a str,
        scanner: &'a Scanner,
        options: ReplacerOptions,
        uid: u32,
        nesting: u32,
    ) -> Replacer<'a> {
        Replacer {
            input,
            scanner,
            options,
            uid,
            fn_stack: Vec::new(),
            method_stack: Vec::new(),
            strict_stack: vec![false],
            export_stack: Vec::new(),
            import_map: FxHashMap::default(),
            imports: Vec::new(),
            dependencies: Vec::new(),
            nesting,
        }
    }

    // =========================================================================
    // Root Assembly
    // =========================================================================

    fn replace_root(&mut self, root: &Node) -> String {
        let is_module = matches!(root.kind, NodeKind::Module { .. });
        self.fn_stack.push(FnScope::default());
        if is_module {
            self.strict_stack.push(true);
            self.export_stack.push(ExportMap::default());
        }

        let body = self.stringify(root);

        let scope = self.fn_stack.pop().expect("root scope");
        let mut prefix = String::new();

        // A module is implicitly strict; say so unless the source already
        // does
        if is_module && !starts_with_use_strict(self.input, root) {
            prefix.push_str("\"use strict\"; ");
        }
        if scope.create_this_binding {
            prefix.push_str("var __this = this; ");
        }
        let temp_decls = self.temp_declarations(&scope);
        prefix.push_str(&temp_decls);

        // Import header, in first-use order
        if !self.imports.is_empty() {
            let loader = |url: &str| {
                if self.options.runtime_imports {
                    format!("__load({}, false)", string_literal(url))
                } else {
                    format!("require({})", string_literal(url))
                }
            };
            let list: Vec<String> = self
                .imports
                .iter()
                .map(|(url, ident)| format!("{ident} = {}", loader(url)))
                .collect();
            prefix.push_str(&format!("var {}; ", list.join(", ")));
        }

        let mut out = String::with_capacity(
            prefix.len()
                + body.len() * crate::limits::OUTPUT_CAPACITY_NUM
                    / crate::limits::OUTPUT_CAPACITY_DEN,
        );
        out.push_str(&prefix);
        out.push_str(&body);

        // Export trailer over the outermost export map
        if is_module {
            self.strict_stack.pop();
            let exports = self.export_stack.pop().expect("module export map");
            if !exports.entries.is_empty() {
                out.push('\n');
                out.push_str(&export_assignments(&exports));
            }
        }
        out
    }

    /// Render export-map entries as `exports.name = value;` statements.
    /// Names that are reserved words use bracket indexing.
    pub(crate) fn export_trailer(&self, exports: &ExportMap) -> String {
        export_assignments(exports)
    }

    /// Declarations for a popped scope's lifted temporaries.
    pub(crate) fn temp_declarations(&self, scope: &FnScope) -> String {
        let decls: Vec<String> = scope
            .temp_vars
            .iter()
            .filter(|t| !t.no_declare)
            .map(|t| match &t.value {
                Some(value) => format!("{} = {}", t.name, value),
                None => t.name.clone(),
            })
            .collect();
        if decls.is_empty() {
            String::new()
        } else {
            format!("var {}; ", decls.join(", "))
        }
    }

    // =========================================================================
    // Visit and Default Rendering
    // =========================================================================

    /// Rewrite one node, applying line-sync to whatever text results.
    pub(crate) fn visit(&mut self, node: &Node) -> String {
        let replaced = self.replace_node(node);
        let text = match replaced {
            Some(text) => text,
            None => self.stringify(node),
        };
        preserve_newlines(text, self.span_height(node.span))
    }

    /// Default rendering: child texts stitched into the original
    /// inter-child source text.
    pub(crate) fn stringify(&mut self, node: &Node) -> String {
        let children = node.children();
        if children.is_empty() {
            return self.raw(node.span).to_string();
        }
        let mut out = String::new();
        let mut pos = node.span.start;
        for child in children {
            out.push_str(self.raw_range(pos, child.span.start));
            out.push_str(&self.visit(child));
            pos = child.span.end;
        }
        out.push_str(self.raw_range(pos, node.span.end));
        out
    }

    /// Like `stringify`, but with replacement text supplied per child.
    pub(crate) fn stitch(&mut self, node: &Node, parts: &[(Span, String)]) -> String {
        let mut out = String::new();
        let mut pos = node.span.start;
        for (span, text) in parts {
            out.push_str(self.raw_range(pos, span.start));
            out.push_str(text);
            pos = span.end;
        }
        out.push_str(self.raw_range(pos, node.span.end));
        out
    }

    /// The dispatch table: one arm per node kind with a rewrite, `None`
    /// falls back to the default rendering.
    fn replace_node(&mut self, node: &Node) -> Option<String> {
        match &node.kind {
            NodeKind::ThisExpression => self.this_expression(),
            NodeKind::ArrowFunction { .. } => Some(self.arrow_function(node)),
            NodeKind::FunctionDeclaration { .. } | NodeKind::FunctionExpression { .. } => {
                Some(self.function_node(node))
            }
            NodeKind::MethodDefinition { .. } => Some(self.method_as_property(node, None)),
            NodeKind::PropertyDefinition { name, value: None } => {
                let name_text = self.raw(name.span).to_string();
                Some(format!("{name_text}: {name_text}"))
            }
            NodeKind::ObjectLiteral { .. } => self.object_literal(node),
            NodeKind::ClassDeclaration { .. } | NodeKind::ClassExpression { .. } => {
                Some(self.class_node(node))
            }
            NodeKind::VariableDeclaration { .. } => self.variable_declaration(node),
            NodeKind::AssignmentExpression { .. } => self.assignment_expression(node),
            NodeKind::CallExpression { .. } => self.call_expression(node),
            NodeKind::NewExpression { .. } => self.new_expression(node),
            NodeKind::MemberExpression { .. } => self.member_expression(node),
            NodeKind::UnaryExpression { op, expression } if *op == "await" => {
                Some(format!("(yield {})", self.visit(expression)))
            }
            NodeKind::TemplateExpression { .. } => Some(self.template_expression(node)),
            NodeKind::TaggedTemplateExpression { .. } => Some(self.tagged_template(node)),
            NodeKind::ForOfStatement { .. } => Some(self.for_of_statement(node)),
            NodeKind::ForInStatement { .. } => self.for_in_statement(node),
            NodeKind::CatchClause { param, body } if param.is_pattern() => {
                let temp = self.uid();
                let mut assigns = Vec::new();
                self.unroll_pattern_into(param, &temp, true, &mut assigns);
                let body_text = self.visit(body);
                Some(format!(
                    "catch ({temp}) {{ var {}; {body_text} }}",
                    assigns.join(", ")
                ))
            }
            NodeKind::ArrayComprehension { .. } => Some(self.array_comprehension(node)),
            NodeKind::GeneratorComprehension { .. } => Some(self.generator_comprehension(node)),
            NodeKind::ImportDeclaration { .. }
            | NodeKind::ImportDefaultDeclaration { .. }
            | NodeKind::ModuleImport { .. } => Some(self.import_form(node)),
            NodeKind::ExportDeclaration { .. } => Some(self.export_form(node)),
            NodeKind::ModuleDeclaration { .. } | NodeKind::ModuleRegistration { .. } => {
                Some(self.module_declaration(node))
            }
            NodeKind::ModuleAlias { name, path } => {
                let name_text = self.raw(name.span).to_string();
                let path_text = self.raw(path.span).to_string();
                Some(format!("var {name_text} = {path_text};"))
            }
            _ => None,
        }
    }

    fn this_expression(&mut self) -> Option<String> {
        if self.fn_stack.last().is_some_and(|scope| scope.is_arrow) {
            Some(self.this_reference())
        } else {
            None
        }
    }

    /// The expression to use for `this` at the current position: `__this`
    /// inside arrow functions (flagging the nearest non-arrow scope), plain
    /// `this` otherwise.
    pub(crate) fn this_reference(&mut self) -> String {
        let mut in_arrow = false;
        for scope in self.fn_stack.iter_mut().rev() {
            if scope.is_arrow {
                in_arrow = true;
            } else {
                if in_arrow {
                    scope.create_this_binding = true;
                }
                break;
            }
        }
        if in_arrow {
            "__this".to_string()
        } else {
            "this".to_string()
        }
    }

    // =========================================================================
    // Shared Infrastructure
    // =========================================================================

    pub(crate) fn raw(&self, span: Span) -> &'a str {
        span.slice(self.input)
    }

    pub(crate) fn raw_range(&self, start: u32, end: u32) -> &'a str {
        Span::new(start, end).slice(self.input)
    }

    /// Allocate a fresh hygienic temporary name.
    pub(crate) fn uid(&mut self) -> String {
        let name = format!("__${}", self.uid);
        self.uid += 1;
        name
    }

    /// Register a lifted temporary on the nearest function scope.
    pub(crate) fn add_temp_var(&mut self, name: &str, value: Option<String>, no_declare: bool) {
        let scope = self
            .fn_stack
            .last_mut()
            .expect("temp var outside any function scope");
        scope.temp_vars.push(TempVar {
            name: name.to_string(),
            value,
            no_declare,
        });
    }

    pub(crate) fn is_strict(&self) -> bool {
        *self.strict_stack.last().unwrap_or(&false)
    }

    /// Lines spanned by a source region.
    pub(crate) fn span_height(&self, span: Span) -> u32 {
        if span.end <= span.start {
            return 0;
        }
        let end_line = self.scanner.line_at(span.end - 1);
        let start_line = self.scanner.line_at(span.start);
        end_line.saturating_sub(start_line)
    }

    /// Desugar a synthesized snippet by running a fresh parse/replace pass
    /// over it. The uid counter is threaded through so temporaries stay
    /// unique. Falls back to the snippet unchanged if the nesting bound is
    /// hit.
    pub(crate) fn replace_snippet(&mut self, snippet: String) -> String {
        if self.nesting >= crate::limits::MAX_COMPREHENSION_NESTING {
            return snippet;
        }
        let parsed = match ParserState::new(&snippet).parse(ParseGoal::Script) {
            Ok(parsed) => parsed,
            // Synthesized snippets are well-formed by construction; pass
            // the text through untouched if this ever fails
            Err(_) => return snippet,
        };
        let input: &str = parsed.scanner.source();
        let mut nested = Replacer::new(
            input,
            &parsed.scanner,
            self.options.clone(),
            self.uid,
            self.nesting + 1,
        );
        let text = nested.replace_root(&parsed.root);
        self.uid = nested.uid;
        text
    }
}

/// Render an export map as assignment statements.
fn export_assignments(exports: &ExportMap) -> String {
    let mut out = String::new();
    for (name, value) in &exports.entries {
        if crate::scanner::is_reserved_word_text(name) {
            out.push_str(&format!("exports[{}] = {value}; ", string_literal(name)));
        } else {
            out.push_str(&format!("exports.{name} = {value}; "));
        }
    }
    out.trim_end().to_string()
}

/// Quote a string as an output double-quoted literal.
pub(crate) fn string_literal(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{8}' => out.push_str("\\b"),
            '\u{B}' => out.push_str("\\v"),
            '\u{C}' => out.push_str("\\f"),
            '\u{0}' => out.push_str("\\0"),
            '\u{2028}' => out.push_str("\\u2028"),
            '\u{2029}' => out.push_str("\\u2029"),
            c if (c as u32) < 0x20 => out.push_str(&format!("\\x{:02x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

/// True when a program body opens with a `use strict` directive.
fn starts_with_use_strict(input: &str, root: &Node) -> bool {
    let children = root.children();
    let Some(first) = children.first() else {
        return false;
    };
    if let NodeKind::ExpressionStatement { expression } = &first.kind {
        let raw = expression.span.slice(input);
        return raw.len() >= 2 && &raw[1..raw.len() - 1] == "use strict";
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seed_uid() {
        assert_eq!(seed_uid("var x = 1;"), 0);
        assert_eq!(seed_uid("var __$0 = 1;"), 1);
        assert_eq!(seed_uid("var __$3 = __$12;"), 13);
        assert_eq!(seed_uid("__$ alone"), 0);
    }

    #[test]
    fn test_string_literal_escaping() {
        assert_eq!(string_literal("abc"), "\"abc\"");
        assert_eq!(string_literal("a\"b"), "\"a\\\"b\"");
        assert_eq!(string_literal("a\nb"), "\"a\\nb\"");
        assert_eq!(string_literal("a\\b"), "\"a\\\\b\"");
        assert_eq!(string_literal("\u{2028}"), "\"\\u2028\"");
    }

    #[test]
    fn test_export_assignments_reserved_words() {
        let mut exports = ExportMap::default();
        exports.add("a", "a");
        exports.add("default", "x");
        let out = export_assignments(&exports);
        assert!(out.contains("exports.a = a;"));
        assert!(out.contains("exports[\"default\"] = x;"));
    }
}
