//! Module wrapper: host-dispatch shim and signature detection.
//!
//! Wrapped output is prefixed with a fixed signature comment so that a
//! second translation pass (or a bundler feeding output back in) can
//! recognize already-lowered modules and leave them alone.

/// Fixed signature prefix of wrapped output.
pub const WRAP_SIGNATURE: &str = "/*=esdown=*/";

/// True when `text` begins with the wrapper signature.
pub fn is_wrapped(text: &str) -> bool {
    text.starts_with(WRAP_SIGNATURE)
}

/// Enclose lowered module output in a loader shim that dispatches between
/// a CommonJS host and a browser global. Under a browser host, `global`
/// names the property installed on the global object.
///
/// The shim stays on one line ahead of the body so line numbers inside the
/// module are unchanged.
pub fn wrap_module(body: &str, global: Option<&str>) -> String {
    let name = match global {
        Some(name) => crate::replacer::string_literal(name),
        None => "null".to_string(),
    };
    let mut out = String::with_capacity(body.len() + 512);
    out.push_str(WRAP_SIGNATURE);
    out.push_str(
        "(function(fn, name) { \
         if (typeof exports !== \"undefined\" && typeof module !== \"undefined\") { \
         fn(require, module.exports, module); } else { \
         var g = typeof window !== \"undefined\" ? window : this, e = {}; \
         fn(function() { return {}; }, e, { exports: e }); \
         if (name) g[name] = e; } \
         }).call(this, function(require, exports, module) { ",
    );
    out.push_str(body);
    out.push_str("\n}, ");
    out.push_str(&name);
    out.push_str(");");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signature_detection() {
        assert!(is_wrapped("/*=esdown=*/(function() {})()"));
        assert!(!is_wrapped("var x = 1;"));
        assert!(!is_wrapped(" /*=esdown=*/"));
    }

    #[test]
    fn test_wrap_preserves_body_lines() {
        let body = "var a = 1;\nvar b = 2;";
        let wrapped = wrap_module(body, None);
        assert!(wrapped.starts_with(WRAP_SIGNATURE));
        // The prefix adds no newlines ahead of the body
        let prefix_end = wrapped.find("var a").unwrap();
        assert!(!wrapped[..prefix_end].contains('\n'));
        assert!(wrapped.contains(body));
    }

    #[test]
    fn test_wrap_installs_global_name() {
        let wrapped = wrap_module("var x = 1;", Some("myLib"));
        assert!(wrapped.contains("\"myLib\""));
        let wrapped = wrap_module("var x = 1;", None);
        assert!(wrapped.ends_with(", null);"));
    }
}
