//! Syntactic parser: tokens to a typed AST.
//!
//! This module provides:
//! - AST node types and deterministic child iteration (`ast`)
//! - `ParserState` - recursive descent parser with two-token lookahead
//! - Cover-grammar transforms to binding patterns (`patterns`)
//! - The validation capability consumed by the grammar (`validate`)

pub mod ast;
pub mod state;
pub mod validate;

mod expressions;
mod modules;
mod patterns;
mod statements;

pub use ast::{DeclKind, FunctionKind, IdentContext, MethodKind, Node, NodeKind};
pub use state::{ContextFrame, ParseGoal, ParseResult, ParserState};

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_script(input: &str) -> Result<Node, crate::diagnostics::SyntaxError> {
        ParserState::new(input)
            .parse(ParseGoal::Script)
            .map(|r| r.root)
    }

    fn parse_module(input: &str) -> Result<Node, crate::diagnostics::SyntaxError> {
        ParserState::new(input)
            .parse(ParseGoal::Module)
            .map(|r| r.root)
    }

    #[test]
    fn test_parse_simple_script() {
        let root = parse_script("var x = 1 + 2;").unwrap();
        assert_eq!(root.kind_name(), "Script");
        assert_eq!(root.span.start, 0);
        assert_eq!(root.span.end, 14);
        let children = root.children();
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].kind_name(), "VariableDeclaration");
    }

    #[test]
    fn test_root_span_covers_input() {
        let input = "  var x = 1;  \n";
        let root = parse_script(input).unwrap();
        assert_eq!(root.span.start, 0);
        assert_eq!(root.span.end, input.len() as u32);
    }

    #[test]
    fn test_parse_precedence() {
        let root = parse_script("a + b * c;").unwrap();
        let stmt = &root.children()[0];
        let expr = stmt.children()[0];
        // a + (b * c)
        let NodeKind::BinaryExpression { op, right, .. } = &expr.kind else {
            panic!("expected binary expression, got {}", expr.kind_name());
        };
        assert_eq!(*op, "+");
        assert_eq!(right.kind_name(), "BinaryExpression");
    }

    #[test]
    fn test_parse_regex_vs_division() {
        let root = parse_script("a = b / c; r = /b/g;").unwrap();
        let statements = root.children();
        assert_eq!(statements.len(), 2);
        let second = statements[1].children()[0];
        let NodeKind::AssignmentExpression { value, .. } = &second.kind else {
            panic!("expected assignment");
        };
        assert_eq!(value.kind_name(), "RegularExpression");
    }

    #[test]
    fn test_parse_destructuring_declaration() {
        let root = parse_script("var [a, b = 1, ...r] = list;").unwrap();
        let decl = &root.children()[0];
        let declarator = decl.children()[0];
        let NodeKind::VariableDeclarator { pattern, .. } = &declarator.kind else {
            panic!("expected declarator");
        };
        assert_eq!(pattern.kind_name(), "ArrayPattern");
        let NodeKind::ArrayPattern { elements } = &pattern.kind else {
            unreachable!()
        };
        assert_eq!(elements.len(), 3);
        assert_eq!(
            elements[2].as_ref().unwrap().kind_name(),
            "PatternRestElement"
        );
    }

    #[test]
    fn test_parse_arrow_functions() {
        let root = parse_script("let f = (x, ...xs) => xs.length + x;").unwrap();
        let decl = &root.children()[0];
        let declarator = decl.children()[0];
        let NodeKind::VariableDeclarator {
            init: Some(init), ..
        } = &declarator.kind
        else {
            panic!("expected initialized declarator");
        };
        let NodeKind::ArrowFunction { params, .. } = &init.kind else {
            panic!("expected arrow function, got {}", init.kind_name());
        };
        assert_eq!(params.len(), 2);
        assert_eq!(params[1].kind_name(), "RestParameter");
    }

    #[test]
    fn test_parse_single_param_arrow() {
        let root = parse_script("let id = x => x;").unwrap();
        let decl = &root.children()[0];
        let NodeKind::VariableDeclarator {
            init: Some(init), ..
        } = &decl.children()[0].kind
        else {
            panic!();
        };
        assert_eq!(init.kind_name(), "ArrowFunction");
    }

    #[test]
    fn test_parse_class_with_super() {
        let root = parse_script("class A extends B { m() { super.m(); } }").unwrap();
        let class = &root.children()[0];
        assert_eq!(class.kind_name(), "ClassDeclaration");
        let NodeKind::ClassDeclaration { base, body, .. } = &class.kind else {
            unreachable!()
        };
        assert!(base.is_some());
        let NodeKind::ClassBody { elements } = &body.kind else {
            unreachable!()
        };
        assert_eq!(elements.len(), 1);
    }

    #[test]
    fn test_super_outside_method_fails() {
        let err = parse_script("super.x;").unwrap_err();
        assert!(err.message.contains("super"));
    }

    #[test]
    fn test_parse_template_literal() {
        let root = parse_script("`Hello ${name}!`;").unwrap();
        let stmt = &root.children()[0];
        let template = stmt.children()[0];
        assert_eq!(template.kind_name(), "TemplateExpression");
        let NodeKind::TemplateExpression { parts } = &template.kind else {
            unreachable!()
        };
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0].kind_name(), "Template");
        assert_eq!(parts[1].kind_name(), "Identifier");
        assert_eq!(parts[2].kind_name(), "Template");
    }

    #[test]
    fn test_parse_tagged_template() {
        let root = parse_script("tag`a${b}c`;").unwrap();
        let stmt = &root.children()[0];
        assert_eq!(stmt.children()[0].kind_name(), "TaggedTemplateExpression");
    }

    #[test]
    fn test_parse_for_of() {
        let root = parse_script("for (let x of it) f(x);").unwrap();
        assert_eq!(root.children()[0].kind_name(), "ForOfStatement");
    }

    #[test]
    fn test_parse_generator_and_yield() {
        let root = parse_script("function* g() { yield 1; yield* inner(); }").unwrap();
        let func = &root.children()[0];
        let NodeKind::FunctionDeclaration { kind, body, .. } = &func.kind else {
            unreachable!()
        };
        assert_eq!(*kind, FunctionKind::Generator);
        let statements = body.children();
        assert_eq!(statements.len(), 2);
        let NodeKind::YieldExpression { delegate, .. } = &statements[1].children()[0].kind else {
            panic!("expected yield");
        };
        assert!(delegate);
    }

    #[test]
    fn test_yield_is_identifier_outside_generator() {
        let root = parse_script("var yield = 1;").unwrap();
        assert_eq!(root.children().len(), 1);
    }

    #[test]
    fn test_parse_async_function_and_await() {
        let root = parse_script("async function f(x) { return await g(x); }").unwrap();
        let NodeKind::FunctionDeclaration { kind, .. } = &root.children()[0].kind else {
            unreachable!()
        };
        assert_eq!(*kind, FunctionKind::Async);
    }

    #[test]
    fn test_parse_async_arrow() {
        let root = parse_script("let f = async x => x; let g = async (a, b) => a;").unwrap();
        assert_eq!(root.children().len(), 2);
        for decl in root.children() {
            let NodeKind::VariableDeclarator {
                init: Some(init), ..
            } = &decl.children()[0].kind
            else {
                panic!();
            };
            let NodeKind::ArrowFunction { is_async, .. } = &init.kind else {
                panic!("expected arrow, got {}", init.kind_name());
            };
            assert!(is_async);
        }
    }

    #[test]
    fn test_parse_comprehensions() {
        let root = parse_script("[for (x of it) if (c) x * 2];").unwrap();
        let comp = root.children()[0].children()[0];
        assert_eq!(comp.kind_name(), "ArrayComprehension");
        let NodeKind::ArrayComprehension { qualifiers, .. } = &comp.kind else {
            unreachable!()
        };
        assert_eq!(qualifiers.len(), 2);

        let root = parse_script("(for (x of it) x);").unwrap();
        let comp = root.children()[0].children()[0];
        assert_eq!(comp.kind_name(), "GeneratorComprehension");
    }

    #[test]
    fn test_parse_module_imports_exports() {
        let root = parse_module("import {a as b} from \"p\";\nexport {b as c};").unwrap();
        assert_eq!(root.kind_name(), "Module");
        let items = root.children();
        assert_eq!(items[0].kind_name(), "ImportDeclaration");
        assert_eq!(items[1].kind_name(), "ExportDeclaration");
    }

    #[test]
    fn test_parse_module_declaration_forms() {
        let root = parse_module(
            "module A from \"a\";\nmodule B { export var x = 1; }\nmodule \"c\" {}\nmodule D = B.C;",
        )
        .unwrap();
        let items = root.children();
        assert_eq!(items[0].kind_name(), "ModuleImport");
        assert_eq!(items[1].kind_name(), "ModuleDeclaration");
        assert_eq!(items[2].kind_name(), "ModuleRegistration");
        assert_eq!(items[3].kind_name(), "ModuleAlias");
    }

    #[test]
    fn test_module_is_strict() {
        // Octal literals are rejected in modules
        assert!(parse_module("var x = 017;").is_err());
        assert!(parse_script("var x = 017;").is_ok());
    }

    #[test]
    fn test_use_strict_directive_promotes() {
        assert!(parse_script("\"use strict\"; var x = 017;").is_err());
        assert!(parse_script("\"use strict\"; with (x) {}").is_err());
        assert!(parse_script("with (x) {}").is_ok());
    }

    #[test]
    fn test_function_context_allows_return() {
        assert!(parse_script("return 1;").is_err());
        let root = ParserState::new("return 1;")
            .parse(ParseGoal::FunctionContext)
            .unwrap()
            .root;
        assert_eq!(root.kind_name(), "FunctionBody");
    }

    #[test]
    fn test_label_validation() {
        assert!(parse_script("a: for (;;) { break a; }").is_ok());
        assert!(parse_script("a: for (;;) { continue a; }").is_ok());
        assert!(parse_script("for (;;) { break b; }").is_err());
        assert!(parse_script("a: { continue a; }").is_err());
        assert!(parse_script("break;").is_err());
    }

    #[test]
    fn test_const_requires_initializer() {
        assert!(parse_script("const x;").is_err());
        assert!(parse_script("const x = 1;").is_ok());
        assert!(parse_script("for (const x of it) {}").is_ok());
    }

    #[test]
    fn test_for_in_init_restrictions() {
        assert!(parse_script("for (var x = 1 in y) {}").is_ok());
        assert!(parse_script("for (let x = 1 in y) {}").is_err());
        assert!(parse_script("for (var [a] = z in y) {}").is_err());
        assert!(parse_script("for (let x of y) {}").is_ok());
    }

    #[test]
    fn test_duplicate_properties_deferred() {
        // Duplicate data properties are fine in sloppy mode
        assert!(parse_script("var o = {a: 1, a: 2};").is_ok());
        // ...an error in strict mode
        assert!(parse_script("\"use strict\"; var o = {a: 1, a: 2};").is_err());
        // ...and legal again as a destructuring pattern
        assert!(parse_script("\"use strict\"; ({a: x, a: y} = o);").is_ok());
    }

    #[test]
    fn test_covered_shorthand_initializer() {
        // Only valid when reinterpreted as a pattern
        assert!(parse_script("({a = 1} = o);").is_ok());
        assert!(parse_script("var o = {a = 1};").is_err());
    }

    #[test]
    fn test_accessor_duplicate_matrix() {
        assert!(parse_script("var o = {get a() {}, set a(v) {}};").is_ok());
        assert!(parse_script("var o = {get a() {}, get a() {}};").is_err());
        assert!(parse_script("var o = {a: 1, get a() {}};").is_err());
    }

    #[test]
    fn test_strict_binding_restrictions() {
        assert!(parse_script("\"use strict\"; var eval = 1;").is_err());
        assert!(parse_script("\"use strict\"; function f(a, a) {}").is_err());
        assert!(parse_script("function f(a, a) {}").is_ok());
        assert!(parse_script("\"use strict\"; delete x;").is_err());
    }

    #[test]
    fn test_asi() {
        assert!(parse_script("var x = 1\nvar y = 2").is_ok());
        assert!(parse_script("a()\nb()").is_ok());
        // No ASI without a newline
        assert!(parse_script("var x = 1 var y = 2").is_err());
        // Restricted production: return argument cannot cross a newline
        let root = parse_script("function f() { return\n1; }").unwrap();
        let NodeKind::FunctionDeclaration { body, .. } = &root.children()[0].kind else {
            unreachable!()
        };
        let NodeKind::ReturnStatement { argument } = &body.children()[0].kind else {
            panic!("expected return statement");
        };
        assert!(argument.is_none());
    }

    #[test]
    fn test_error_positions() {
        let err = parse_script("var x = ;").unwrap_err();
        assert_eq!(err.line, 1);
        assert_eq!(err.column, 9);
        let err = parse_script("a;\nb;\nc(;").unwrap_err();
        assert_eq!(err.line, 3);
    }

    #[test]
    fn test_newline_handling_in_lookahead() {
        // Postfix ++ may not cross a newline; the expression statement
        // terminates by ASI instead
        let root = parse_script("a\n++b;").unwrap();
        assert_eq!(root.children().len(), 2);
    }

    #[test]
    fn test_deeply_nested_input_fails_cleanly() {
        let mut source = String::new();
        for _ in 0..3_000 {
            source.push('(');
        }
        source.push('x');
        for _ in 0..3_000 {
            source.push(')');
        }
        source.push(';');
        let err = parse_script(&source).unwrap_err();
        assert!(err.message.contains("nested"));
    }
}
