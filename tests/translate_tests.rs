//! End-to-end translation tests.
//!
//! These exercise the whole scanner -> parser -> replacer pipeline and
//! check the observable output contracts: emitted desugarings, line
//! preservation, import de-duplication, and wrapper idempotence.

use jsdown::{TranslateOptions, is_wrapped, translate};

fn script(input: &str) -> String {
    translate(input, &TranslateOptions::default()).unwrap()
}

fn module(input: &str) -> String {
    translate(
        input,
        &TranslateOptions {
            module: true,
            ..TranslateOptions::default()
        },
    )
    .unwrap()
}

/// Collapse whitespace runs so output checks tolerate formatting drift.
fn squash(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last_space = false;
    for c in text.chars() {
        if c.is_whitespace() {
            if !last_space {
                out.push(' ');
            }
            last_space = true;
        } else {
            out.push(c);
            last_space = false;
        }
    }
    out
}

fn count_lines(text: &str) -> usize {
    text.matches('\n').count()
}

// =============================================================================
// Desugaring contracts
// =============================================================================

#[test]
fn destructuring_declaration_unrolls_in_order() {
    let out = script("var [a, b = 1, ...r] = list;");
    let out = squash(&out);
    assert!(
        out.contains(
            "var __$0 = list, a = __$0[0], __$1 = __$0[1], \
             b = __$1 === void 0 ? 1 : __$1, r = _runtime.rest(__$0, 2);"
        ),
        "unexpected output: {out}"
    );
}

#[test]
fn object_destructuring_reads_members() {
    let out = squash(&script("let {x, y: z, w = 2} = o;"));
    assert!(out.contains("var __$0 = o, x = __$0.x, z = __$0.y"), "{out}");
    assert!(out.contains("w = __$1 === void 0 ? 2 : __$1"), "{out}");
}

#[test]
fn assignment_destructuring_returns_rhs() {
    let out = squash(&script("([a, b] = pair);"));
    assert!(
        out.contains("(__$0 = pair, a = __$0[0], b = __$0[1], __$0)"),
        "{out}"
    );
    // The temp is declared at the top of the program
    assert!(out.starts_with("var __$0;"), "{out}");
}

#[test]
fn arrow_with_rest_captures_arguments() {
    let out = squash(&script("let f = (x, ...xs) => xs.length + x;"));
    assert!(
        out.contains("(function(x) { var xs = _runtime.rest(arguments, 1); return xs.length + x; })"),
        "{out}"
    );
    // The rest name must not remain in the formal list
    assert!(!out.contains("function(x, xs)"), "{out}");
}

#[test]
fn arrow_captures_this() {
    let out = squash(&script("function f() { return () => this.x; }"));
    assert!(out.contains("var __this = this;"), "{out}");
    assert!(out.contains("return __this.x;"), "{out}");
}

#[test]
fn top_level_arrow_this_binds_at_program_start() {
    let out = squash(&script("var f = () => this;"));
    assert!(out.starts_with("var __this = this;"), "{out}");
}

#[test]
fn default_parameters_check_void_0() {
    let out = squash(&script("function f(a = init) { return a; }"));
    assert!(out.contains("if (a === void 0) a = init;"), "{out}");
}

#[test]
fn class_with_base_lowers_to_runtime_class() {
    let out = squash(&script("class A extends B { m() { super.m(); } }"));
    assert!(out.contains("var A = _runtime.class(B, function(__super)"), "{out}");
    assert!(
        out.contains(
            "constructor: function A() { var c = __super.constructor; \
             if (c) return c.apply(this, arguments); }"
        ),
        "{out}"
    );
    assert!(out.contains("m: function() { __super.m.call(this); }"), "{out}");
}

#[test]
fn class_constructor_and_super_call() {
    let out = squash(&script(
        "class A extends B { constructor(x) { super(x); } go(n) { super.go(n); } }",
    ));
    assert!(out.contains("constructor: function A(x)"), "{out}");
    assert!(out.contains("__super.constructor.call(this, x)"), "{out}");
    assert!(out.contains("__super.go.call(this, n)"), "{out}");
}

#[test]
fn class_statics_group_into_static_block() {
    let out = squash(&script("class A { static make() { return 1; } m() {} }"));
    assert!(out.contains("static: { make: function()"), "{out}");
}

#[test]
fn class_wrapper_is_strict_in_sloppy_surroundings() {
    let out = squash(&script("class A {}"));
    assert!(out.contains("function(__super) { \"use strict\"; return"), "{out}");
    // Inside a module everything is already strict
    let out = squash(&module("class A {}"));
    assert!(!out.contains("function(__super) { \"use strict\";"), "{out}");
}

#[test]
fn let_and_const_become_var() {
    let out = squash(&script("let a = 1; const b = 2;"));
    assert!(out.contains("var a = 1;"), "{out}");
    assert!(out.contains("var b = 2;"), "{out}");
    assert!(!out.contains("let "), "{out}");
    assert!(!out.contains("const "), "{out}");
}

#[test]
fn for_of_lowers_to_iterator_protocol() {
    let out = squash(&script("function* g(it) { for (let x of it) yield x; }"));
    assert!(out.contains("var __$0 = _runtime.iterator(it);"), "{out}");
    assert!(
        out.contains("for (var x; __$1 = __$0.next(), x = __$1.value, !__$1.done; ) yield x;"),
        "{out}"
    );
    // The loop-result temp is lifted into the generator body
    assert!(out.contains("{ var __$1;"), "{out}");
}

#[test]
fn for_of_over_pattern_unpacks_in_body() {
    let out = squash(&script("for (let [k, v] of pairs) use(k, v);"));
    assert!(out.contains("_runtime.iterator(pairs)"), "{out}");
    assert!(out.contains("var k = "), "{out}");
}

#[test]
fn template_literal_concatenates_cooked_parts() {
    let out = script("var s = `Hello ${name}!`;");
    assert!(out.contains("\"Hello \" + (name) + \"!\""), "{out}");
}

#[test]
fn template_without_substitutions_is_plain_string() {
    let out = script("var s = `plain`;");
    assert!(out.contains("var s = \"plain\";"), "{out}");
}

#[test]
fn tagged_template_builds_call_site() {
    let out = squash(&script("tag`a${b}c`;"));
    assert!(
        out.contains("tag(_runtime.templateSite([\"a\", \"c\"]), b)"),
        "{out}"
    );
}

#[test]
fn tagged_template_keeps_raw_when_it_differs() {
    let out = squash(&script(r"tag`a\n${b}`;"));
    assert!(out.contains("[\"a\\n\", \"\"]"), "{out}");
    assert!(out.contains("[\"a\\\\n\", \"\"]"), "{out}");
}

#[test]
fn spread_call_uses_apply() {
    let out = squash(&script("f(a, ...xs);"));
    assert!(out.contains("f.apply(void 0, [a].concat(xs))"), "{out}");
}

#[test]
fn spread_method_call_caches_receiver() {
    let out = squash(&script("o.m(...xs);"));
    assert!(out.contains("(__$0 = o).m.apply(__$0, [].concat(xs))"), "{out}");
    assert!(out.starts_with("var __$0;"), "{out}");
}

#[test]
fn new_with_spread_goes_through_bind() {
    let out = squash(&script("new C(...xs);"));
    assert!(
        out.contains("new (Function.prototype.bind.apply(C, [null].concat(xs)))()"),
        "{out}"
    );
}

#[test]
fn async_function_wraps_generator() {
    let out = squash(&script("async function f(x) { return await g(x); }"));
    assert!(
        out.contains("function f(x) { try { return _runtime.async(function*()"),
        "{out}"
    );
    assert!(out.contains("return (yield g(x));"), "{out}");
    assert!(out.contains("catch (x) { return Promise.reject(x); }"), "{out}");
}

#[test]
fn array_comprehension_builds_array() {
    let out = squash(&script("var r = [for (x of it) if (c) x * 2];"));
    assert!(out.contains("(function() {"), "{out}");
    assert!(out.contains(".push(x * 2)"), "{out}");
    assert!(out.contains("if (c)"), "{out}");
    // The inner for-of was desugared by the nested pass
    assert!(out.contains("_runtime.iterator(it)"), "{out}");
    assert!(out.contains(".call(this)"), "{out}");
}

#[test]
fn generator_comprehension_yields() {
    let out = squash(&script("var g = (for (x of it) x + 1);"));
    assert!(out.contains("(function*() {"), "{out}");
    assert!(out.contains("yield x + 1;"), "{out}");
    assert!(out.contains("_runtime.iterator(it)"), "{out}");
}

#[test]
fn object_shorthand_and_methods_expand() {
    let out = squash(&script("var o = {a, m() { return 1; }, get p() { return 2; }};"));
    assert!(out.contains("a: a"), "{out}");
    assert!(out.contains("m: function() { return 1; }"), "{out}");
    assert!(out.contains("get p() { return 2; }"), "{out}");
}

#[test]
fn computed_property_names_use_placeholders() {
    let out = squash(&script("var o = {[k]: 1, fixed: 2};"));
    assert!(out.contains("_runtime.computed("), "{out}");
    assert!(out.contains("\"__$0\": 1"), "{out}");
    assert!(out.contains(", \"__$0\", k)"), "{out}");
}

#[test]
fn generators_pass_through() {
    let out = squash(&script("function* g() { yield 1; yield* other(); }"));
    assert!(out.contains("function* g()"), "{out}");
    assert!(out.contains("yield 1;"), "{out}");
    assert!(out.contains("yield* other();"), "{out}");
}

// =============================================================================
// Modules
// =============================================================================

#[test]
fn imports_and_exports_assemble() {
    let out = module("import {a as b} from \"p\";\nexport {b as c};");
    assert!(out.contains("var _M0 = require(\"p\");"), "{out}");
    assert!(out.contains("var b = _M0.a;"), "{out}");
    assert!(out.contains("exports.c = b;"), "{out}");
}

#[test]
fn import_header_deduplicates_urls() {
    let out = module(
        "import {a} from \"p\";\nimport {b} from \"p\";\nimport {c} from \"q\";",
    );
    assert_eq!(out.matches("require(\"p\")").count(), 1, "{out}");
    assert_eq!(out.matches("require(\"q\")").count(), 1, "{out}");
    assert!(out.contains("var a = _M0.a"), "{out}");
    assert!(out.contains("var b = _M0.b"), "{out}");
    assert!(out.contains("var c = _M1.c"), "{out}");
}

#[test]
fn import_default_uses_bracket_access() {
    let out = module("import d from \"p\";");
    assert!(out.contains("var d = _M0[\"default\"];"), "{out}");
}

#[test]
fn reserved_export_names_use_bracket_indexing() {
    let out = module("var x = 1;\nexport {x as default};");
    assert!(out.contains("exports[\"default\"] = x;"), "{out}");
}

#[test]
fn export_declarations_record_names() {
    let out = module("export var x = 1;\nexport function f() {}\nexport class K {}");
    assert!(out.contains("exports.x = x;"), "{out}");
    assert!(out.contains("exports.f = f;"), "{out}");
    assert!(out.contains("exports.K = K;"), "{out}");
}

#[test]
fn export_star_copies_keys() {
    let out = module("export * from \"p\";");
    assert!(
        out.contains("Object.keys(_M0).forEach(function(k) { exports[k] = _M0[k]; });"),
        "{out}"
    );
}

#[test]
fn runtime_imports_emit_load_calls() {
    let out = translate(
        "import {a} from \"p\";",
        &TranslateOptions {
            module: true,
            runtime_imports: true,
            ..TranslateOptions::default()
        },
    )
    .unwrap();
    assert!(out.contains("__load(\"p\", false)"), "{out}");
    assert!(!out.contains("require("), "{out}");
}

#[test]
fn module_declaration_becomes_iife() {
    let out = squash(&module("module M { export var x = 1; }\nvar y = M.x;"));
    assert!(out.contains("var M = (function(exports)"), "{out}");
    assert!(out.contains("exports.x = x;"), "{out}");
    assert!(out.contains("return exports; }).call(this, {})"), "{out}");
}

#[test]
fn module_alias_becomes_var() {
    let out = module("module A = B.C;");
    assert!(out.contains("var A = B.C;"), "{out}");
}

#[test]
fn module_from_becomes_module_reference() {
    let out = module("module A from \"p\";");
    assert!(out.contains("var A = _M0;"), "{out}");
}

#[test]
fn module_output_is_strict() {
    let out = module("var x = 1;");
    assert!(out.starts_with("\"use strict\";"), "{out}");
    // No double directive when the source already has one
    let out = module("\"use strict\";\nvar x = 1;");
    assert_eq!(out.matches("use strict").count(), 1, "{out}");
}

// =============================================================================
// Wrapper
// =============================================================================

#[test]
fn wrap_emits_signature_and_is_idempotent() {
    let options = TranslateOptions {
        module: true,
        wrap: true,
        ..TranslateOptions::default()
    };
    let once = translate("export var x = 1;", &options).unwrap();
    assert!(is_wrapped(&once));
    let twice = translate(&once, &options).unwrap();
    assert_eq!(once, twice);
}

#[test]
fn wrap_installs_global_name() {
    let options = TranslateOptions {
        module: true,
        wrap: true,
        global: Some("lib".to_string()),
        ..TranslateOptions::default()
    };
    let out = translate("export var x = 1;", &options).unwrap();
    assert!(out.contains("\"lib\""), "{out}");
}

#[test]
fn runtime_prelude_is_prepended() {
    let options = TranslateOptions {
        runtime: Some("var _runtime = {};".to_string()),
        ..TranslateOptions::default()
    };
    let out = translate("var x = 1;", &options).unwrap();
    assert!(out.starts_with("var _runtime = {};\n"), "{out}");
}

// =============================================================================
// Line preservation
// =============================================================================

#[test]
fn output_never_loses_lines() {
    let inputs = [
        "let [a,\n  b\n] = list;\nvar tail = 1;",
        "class A\n  extends B {\n  m() {\n    super.m();\n  }\n}\nvar tail = 1;",
        "var s = `multi\nline\ntemplate`;\nvar tail = 1;",
        "let f = (a,\n  ...r) => a;\nvar tail = 1;",
        "var r = [for (x of it)\n  x];\nvar tail = 1;",
    ];
    for input in inputs {
        let out = script(input);
        assert!(
            count_lines(&out) >= count_lines(input),
            "lost lines for {input:?}: {out:?}"
        );
    }
}

#[test]
fn statements_keep_their_line_numbers() {
    let input = "let [a, b] = p;\nsecond();\nthird();";
    let out = script(input);
    let lines: Vec<&str> = out.lines().collect();
    assert!(lines[1].contains("second()"), "{out}");
    assert!(lines[2].contains("third()"), "{out}");
}

#[test]
fn multiline_template_keeps_following_lines() {
    let input = "var s = `a\nb\nc`;\nafter();";
    let out = script(input);
    let lines: Vec<&str> = out.lines().collect();
    assert!(lines[3].contains("after()"), "{out}");
}

// =============================================================================
// Temporaries
// =============================================================================

#[test]
fn temporaries_avoid_user_names() {
    let input = "var __$0 = 1; var [a] = xs;";
    let out = script(input);
    // The synthesized temp must not collide with the user's __$0
    assert!(out.contains("var __$0 = 1;"), "{out}");
    assert!(out.contains("__$1 = xs"), "{out}");
}

#[test]
fn temporaries_are_unique_within_a_function() {
    let out = script("function f() { var [a] = x; var [b] = y; ([c] = z); }");
    let mut seen = std::collections::HashSet::new();
    let mut index = 0;
    let bytes = out.as_bytes();
    while let Some(found) = out[index..].find("__$") {
        let start = index + found + 3;
        let mut end = start;
        while end < bytes.len() && bytes[end].is_ascii_digit() {
            end += 1;
        }
        if end > start {
            seen.insert(out[start..end].to_string());
        }
        index = index + found + 3;
    }
    // Three destructurings: at least three distinct temps
    assert!(seen.len() >= 3, "{out}");
}

// =============================================================================
// Errors
// =============================================================================

#[test]
fn translate_surfaces_structured_errors() {
    let err = translate("var x = ;", &TranslateOptions::default()).unwrap_err();
    assert_eq!(err.line, 1);
    assert!(err.column > 1);
    assert!(err.start_offset >= err.line_offset);
    assert!(err.end_offset >= err.start_offset);
}

#[test]
fn shebang_and_bom_are_skipped() {
    let out = script("#!/usr/bin/env node\nlet x = 1;");
    assert!(out.contains("var x = 1;"), "{out}");
    let out = script("\u{FEFF}let x = 1;");
    assert!(out.contains("var x = 1;"), "{out}");
}

#[test]
fn untouched_code_passes_through_verbatim() {
    let input = "var a = 1;\nif (a) {\n  f(a);\n}\n";
    assert_eq!(script(input), input);
}
