//! Parser integration tests against the public API: spans, strict
//! contexts, and the structured error contract.

use jsdown::parser::NodeKind;
use jsdown::{ParseOptions, parse};

fn parse_script(input: &str) -> jsdown::Node {
    parse(input, ParseOptions::default()).unwrap()
}

// =============================================================================
// Spans
// =============================================================================

#[test]
fn root_span_covers_whole_input() {
    let input = "var a = 1;\nvar b = 2;\n";
    let root = parse_script(input);
    assert_eq!(root.span.start, 0);
    assert_eq!(root.span.end, input.len() as u32);
}

#[test]
fn child_spans_nest_inside_parents() {
    fn check(node: &jsdown::Node) {
        let mut last_start = None;
        for child in node.children() {
            assert!(child.span.start >= node.span.start, "{}", node.kind_name());
            assert!(child.span.end <= node.span.end, "{}", node.kind_name());
            if let Some(last) = last_start {
                assert!(child.span.start >= last, "siblings out of order");
            }
            last_start = Some(child.span.start);
            check(child);
        }
    }
    let root = parse_script(
        "class A extends B { m(x = 1) { for (let [a, b] of x) f(`${a}:${b}`); } }\n\
         var g = async (p, ...q) => p + q.length;",
    );
    check(&root);
}

#[test]
fn escaped_identifier_span_covers_escape_text() {
    let input = r"var \u0061bc = 1;";
    let root = parse_script(input);
    let decl = &root.children()[0];
    let declarator = decl.children()[0];
    let NodeKind::VariableDeclarator { pattern, .. } = &declarator.kind else {
        panic!("expected declarator");
    };
    // The decoded name, with the span over the escaped form
    assert_eq!(pattern.identifier_value(), Some("abc"));
    assert_eq!(pattern.span.len(), 8);
}

// =============================================================================
// Parse goals and strictness
// =============================================================================

#[test]
fn module_goal_returns_module_root() {
    let root = parse(
        "import {a} from \"p\";",
        ParseOptions {
            module: true,
            ..ParseOptions::default()
        },
    )
    .unwrap();
    assert_eq!(root.kind_name(), "Module");
}

#[test]
fn function_context_goal_allows_return() {
    let root = parse(
        "return this;",
        ParseOptions {
            function_context: true,
            ..ParseOptions::default()
        },
    )
    .unwrap();
    assert_eq!(root.kind_name(), "FunctionBody");
}

#[test]
fn class_bodies_are_strict() {
    // Octal escapes are rejected inside class methods
    let err = parse("class A { m() { var s = '\\01'; } }", ParseOptions::default());
    assert!(err.is_err());
}

#[test]
fn strict_reserved_words_reject_in_modules() {
    let options = ParseOptions {
        module: true,
        ..ParseOptions::default()
    };
    assert!(parse("var interface = 1;", options).is_err());
    assert!(parse("var interface = 1;", ParseOptions::default()).is_ok());
}

// =============================================================================
// Error contract
// =============================================================================

#[test]
fn errors_carry_position_fields() {
    let err = parse("var a = 1;\nvar b = *;", ParseOptions::default()).unwrap_err();
    assert_eq!(err.line, 2);
    assert_eq!(err.column, 9);
    assert_eq!(err.line_offset, 11);
    assert_eq!(err.start_offset, 19);
    assert!(err.end_offset > err.start_offset);
    assert!(err.message.contains('*'));
}

#[test]
fn errors_serialize_for_embedders() {
    let err = parse("var = 1;", ParseOptions::default()).unwrap_err();
    let json = serde_json::to_string(&err).unwrap();
    assert!(json.contains("\"line\":1"));
    assert!(json.contains("\"message\""));
}

#[test]
fn unterminated_tokens_report_at_token_span() {
    let err = parse("var s = \"abc", ParseOptions::default()).unwrap_err();
    assert!(err.message.contains("Unterminated"));
    assert_eq!(err.line, 1);
    assert_eq!(err.column, 9);
}
