//! jsdown - source-to-source compiler core.
//!
//! Lowers a next-generation dialect of JavaScript (classes, modules,
//! destructuring, default/rest parameters, spread, arrow functions,
//! template strings, generators, `for-of`, async functions, and
//! comprehensions) to the widely-supported older dialect.
//!
//! The pipeline is scanner -> parser -> replacer:
//! - [`scanner`] turns source text into tokens with context-sensitive
//!   disambiguation (regex vs. division, template continuations)
//! - [`parser`] builds a typed AST covering the full surface grammar
//! - [`replacer`] rewrites each high-level construct into equivalent
//!   lower-level code while keeping every line on its original line number
//!
//! The crate is synchronous and re-entrant: [`translate`] is a pure
//! function over its input, and independent calls may run on independent
//! threads.
//!
//! # Example
//!
//! ```
//! use jsdown::{translate, TranslateOptions};
//!
//! let out = translate("let add = (a, b) => a + b;", &TranslateOptions::default()).unwrap();
//! assert!(out.contains("function(a, b)"));
//! ```

pub mod char_codes;
pub mod diagnostics;
pub mod limits;
pub mod line_sync;
pub mod module_wrapper;
pub mod parser;
pub mod replacer;
pub mod scanner;
pub mod span;

pub use diagnostics::{Position, SyntaxError};
pub use module_wrapper::is_wrapped;
pub use parser::{Node, ParseGoal};
pub use span::Span;

use parser::{ParseResult, ParserState};
use replacer::{ReplacerOptions, replace};
use tracing::debug;

// =============================================================================
// Options
// =============================================================================

/// Options accepted by [`parse`].
#[derive(Clone, Copy, Debug, Default)]
pub struct ParseOptions {
    /// Parse as a module (implicitly strict, module items allowed)
    pub module: bool,
    /// Parse as a function body (top-level `return` allowed)
    pub function_context: bool,
}

/// Options accepted by [`translate`].
#[derive(Clone, Debug, Default)]
pub struct TranslateOptions {
    /// Parse as a module and collect imports/exports
    pub module: bool,
    /// Parse as a function body (top-level `return` allowed)
    pub function_context: bool,
    /// Enclose the output in the host-dispatch module wrapper (implies
    /// `module`); wrapped input is returned unchanged
    pub wrap: bool,
    /// With `wrap`, install the module's exports under this name on the
    /// global object when the host has no CommonJS support
    pub global: Option<String>,
    /// Runtime helper library source to prepend, supplied by the embedder
    pub runtime: Option<String>,
    /// Legacy polyfill source to prepend ahead of the runtime
    pub polyfill: Option<String>,
    /// Emit `__load(url, false)` imports instead of `require(url)`
    pub runtime_imports: bool,
}

// =============================================================================
// API
// =============================================================================

/// Parse `input` and return the AST root (`Script`, `Module`, or
/// `FunctionBody` depending on the options).
pub fn parse(input: &str, options: ParseOptions) -> Result<Node, SyntaxError> {
    Ok(parse_internal(input, goal(options.module, options.function_context))?.root)
}

/// Translate `input` to the older dialect.
pub fn translate(input: &str, options: &TranslateOptions) -> Result<String, SyntaxError> {
    // Already-wrapped input passes through untouched
    if options.wrap && is_wrapped(input) {
        return Ok(input.to_string());
    }

    let module = options.module || options.wrap;
    let parsed = parse_internal(input, goal(module, options.function_context))?;
    let replaced = replace(
        &parsed,
        &ReplacerOptions {
            runtime_imports: options.runtime_imports,
        },
    );
    debug!(
        dependencies = replaced.dependencies.len(),
        wrapped = options.wrap,
        "translate complete"
    );

    let mut output = replaced.text;
    if options.wrap {
        output = module_wrapper::wrap_module(&output, options.global.as_deref());
    }

    // Embedder-supplied preludes go in front: polyfills first, then the
    // runtime helpers, then the program
    let mut prelude = String::new();
    if let Some(polyfill) = &options.polyfill {
        prelude.push_str(polyfill);
        prelude.push('\n');
    }
    if let Some(runtime) = &options.runtime {
        prelude.push_str(runtime);
        prelude.push('\n');
    }
    if prelude.is_empty() {
        Ok(output)
    } else {
        prelude.push_str(&output);
        Ok(prelude)
    }
}

fn goal(module: bool, function_context: bool) -> ParseGoal {
    if module {
        ParseGoal::Module
    } else if function_context {
        ParseGoal::FunctionContext
    } else {
        ParseGoal::Script
    }
}

fn parse_internal(input: &str, goal: ParseGoal) -> Result<ParseResult, SyntaxError> {
    debug!(len = input.len(), ?goal, "parse start");
    ParserState::new(input).parse(goal)
}
