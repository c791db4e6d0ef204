//! Module lowering: imports, exports, and `module` declarations.
//!
//! ```text
//! import { a as b } from "p";   =>  var b = _M0.a;        (plus header entry)
//! import d from "p";            =>  var d = _M0["default"];
//! export { a, b as c };         =>  (collected: a -> a, c -> b)
//! export * from "p";            =>  Object.keys(_M0).forEach(...)
//! module M { ... }              =>  var M = (function(exports) { ...
//!                                       return exports; }).call(this, {});
//! ```
//!
//! Imports are registered in a table keyed by module URL; the replacer's
//! output assembly emits one `var _M0 = require("..."), ...;` header over
//! the table in first-use order.

use crate::parser::ast::{Node, NodeKind};
use crate::parser::validate::collect_bound_names;
use crate::replacer::{ExportMap, FnScope, Replacer, string_literal};
use crate::scanner::is_reserved_word_text;
use crate::span::Span;

impl Replacer<'_> {
    // =========================================================================
    // Imports
    // =========================================================================

    /// Register a module URL, returning its `_M<n>` identifier. URLs
    /// de-duplicate on their literal value.
    pub(crate) fn register_import(&mut self, url: &str) -> String {
        if let Some(ident) = self.import_map.get(url) {
            return ident.clone();
        }
        let ident = format!("_M{}", self.imports.len());
        self.import_map.insert(url.to_string(), ident.clone());
        self.imports.push((url.to_string(), ident.clone()));
        self.dependencies.push(url.to_string());
        ident
    }

    pub(crate) fn import_form(&mut self, node: &Node) -> String {
        match &node.kind {
            NodeKind::ImportDeclaration { specifiers, from } => {
                let module = self.register_import_from(from);
                let mut decls: Vec<String> = Vec::new();
                for specifier in specifiers {
                    let NodeKind::ImportSpecifier { imported, local } = &specifier.kind else {
                        continue;
                    };
                    let imported_name = imported.identifier_value().unwrap_or_default();
                    let local_name = local
                        .as_deref()
                        .and_then(Node::identifier_value)
                        .unwrap_or(imported_name);
                    let access = member_access(&module, imported_name);
                    decls.push(format!("{local_name} = {access}"));
                }
                if decls.is_empty() {
                    String::new()
                } else {
                    format!("var {};", decls.join(", "))
                }
            }
            NodeKind::ImportDefaultDeclaration { ident, from } => {
                let module = self.register_import_from(from);
                let name = self.raw(ident.span);
                format!("var {name} = {module}[\"default\"];")
            }
            NodeKind::ModuleImport { name, from } => {
                let module = self.register_import_from(from);
                let name = self.raw(name.span);
                format!("var {name} = {module};")
            }
            _ => unreachable!("import_form on {}", node.kind_name()),
        }
    }

    fn register_import_from(&mut self, from: &Node) -> String {
        let url = from.string_value().unwrap_or_default().to_string();
        self.register_import(&url)
    }

    // =========================================================================
    // Exports
    // =========================================================================

    pub(crate) fn export_form(&mut self, node: &Node) -> String {
        let NodeKind::ExportDeclaration { declaration } = &node.kind else {
            unreachable!("export_form on {}", node.kind_name());
        };

        match &declaration.kind {
            NodeKind::ExportSpecifierSet {
                star,
                specifiers,
                from,
            } => {
                if *star {
                    let Some(from) = from else {
                        // `export *` without a source re-exports nothing the
                        // wrapper can see
                        return String::new();
                    };
                    let module = self.register_import_from(from);
                    return format!(
                        "Object.keys({module}).forEach(function(k) {{ exports[k] = {module}[k]; }});"
                    );
                }
                let source = from.as_deref().map(|f| self.register_import_from(f));
                for specifier in specifiers {
                    let NodeKind::ExportSpecifier { local, exported } = &specifier.kind else {
                        continue;
                    };
                    let local_name = local.identifier_value().unwrap_or_default();
                    let export_name = exported
                        .as_deref()
                        .and_then(Node::identifier_value)
                        .unwrap_or(local_name);
                    let value = match &source {
                        Some(module) => member_access(module, local_name),
                        None => local_name.to_string(),
                    };
                    self.add_export(export_name, value);
                }
                String::new()
            }
            NodeKind::VariableDeclaration { declarations, .. } => {
                let mut names: Vec<(String, Span)> = Vec::new();
                for declarator in declarations {
                    if let NodeKind::VariableDeclarator { pattern, .. } = &declarator.kind {
                        collect_bound_names(pattern, &mut names);
                    }
                }
                let text = self.visit(declaration);
                for (name, _) in names {
                    self.add_export(name.clone(), name);
                }
                format!("{text};")
            }
            NodeKind::FunctionDeclaration { name, .. }
            | NodeKind::ClassDeclaration { name, .. }
            | NodeKind::ModuleDeclaration { name, .. }
            | NodeKind::ModuleImport { name, .. }
            | NodeKind::ModuleAlias { name, .. } => {
                let export_name = name.identifier_value().unwrap_or_default().to_string();
                let text = self.visit(declaration);
                self.add_export(export_name.clone(), export_name);
                text
            }
            _ => self.visit(declaration),
        }
    }

    fn add_export(&mut self, name: impl Into<String>, value: impl Into<String>) {
        if let Some(map) = self.export_stack.last_mut() {
            map.add(name, value);
        }
    }

    // =========================================================================
    // module Declarations
    // =========================================================================

    /// `module M { ... }` and `module "name" { ... }` become immediately
    /// invoked wrappers with their own export scope.
    pub(crate) fn module_declaration(&mut self, node: &Node) -> String {
        let (name, body) = match &node.kind {
            NodeKind::ModuleDeclaration { name, body } => (Some(name.as_ref()), body.as_ref()),
            NodeKind::ModuleRegistration { body, .. } => (None, body.as_ref()),
            _ => unreachable!("module_declaration on {}", node.kind_name()),
        };

        let surrounding_strict = self.is_strict();
        self.strict_stack.push(true);
        self.export_stack.push(ExportMap::default());
        self.fn_stack.push(FnScope::default());

        let NodeKind::ModuleBody { statements } = &body.kind else {
            unreachable!("module body");
        };
        let directives =
            crate::replacer::functions::count_directives(self.input_raw(), statements);
        let texts: Vec<(Span, String)> = statements
            .iter()
            .map(|s| (s.span, self.visit(s)))
            .collect();

        let scope = self.fn_stack.pop().expect("module scope");
        let mut inserts = String::new();
        if !surrounding_strict {
            inserts.push_str("\"use strict\"; ");
        }
        if scope.create_this_binding {
            inserts.push_str("var __this = this; ");
        }
        inserts.push_str(&self.temp_declarations(&scope));

        let assembled = self.assemble_body(body, &texts, directives, &inserts);

        let exports = self.export_stack.pop().expect("module export map");
        self.strict_stack.pop();

        // Splice the export trailer in before the closing brace
        let trailer = {
            let assignments = self.export_trailer(&exports);
            if assignments.is_empty() {
                "return exports; }".to_string()
            } else {
                format!("{assignments} return exports; }}")
            }
        };
        let mut wrapper_body = assembled;
        if wrapper_body.ends_with('}') {
            wrapper_body.truncate(wrapper_body.len() - 1);
        }
        wrapper_body.push(' ');
        wrapper_body.push_str(&trailer);

        let this_ref = self.this_reference();
        let iife = format!("(function(exports) {wrapper_body}).call({this_ref}, {{}})");
        match name {
            Some(name) => {
                let name_text = self.raw(name.span);
                format!("var {name_text} = {iife};")
            }
            None => format!("{iife};"),
        }
    }
}

/// `module.member` access text, bracket-indexed for reserved words.
fn member_access(module: &str, member: &str) -> String {
    if is_reserved_word_text(member) {
        format!("{module}[{}]", string_literal(member))
    } else {
        format!("{module}.{member}")
    }
}
