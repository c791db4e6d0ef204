//! Centralized limits and thresholds for the translator.
//!
//! This module provides shared constants for recursion depths and capacity
//! limits used throughout the codebase. Centralizing these values:
//! - Prevents duplicate definitions with inconsistent values
//! - Makes it easy to tune limits for constrained environments
//! - Documents the rationale for each limit

// =============================================================================
// Recursion Depth Limits
// =============================================================================
// These prevent stack overflow on pathologically nested input. The parser and
// replacer count nesting and fail with a structured syntax error instead of
// blowing the stack.

/// Maximum depth for parser recursion (nested expressions and statements).
/// Each nesting level costs roughly ten native frames through the
/// expression ladder; 500 levels stays inside the 2 MB stacks that test
/// threads get by default.
pub const MAX_PARSER_RECURSION_DEPTH: u32 = 500;

/// Maximum depth for replacer traversal.
/// The AST depth is bounded by parser recursion, so this matches it.
pub const MAX_REPLACER_RECURSION_DEPTH: u32 = 500;

/// Maximum nesting of comprehension desugaring.
/// Comprehension output is re-run through the replacer; each nesting level
/// costs a full parse of the synthesized snippet, so the bound is small.
pub const MAX_COMPREHENSION_NESTING: u32 = 32;

// =============================================================================
// Capacity Limits
// =============================================================================

/// Pre-allocation size for the token lookahead buffer.
pub const LOOKAHEAD_CAPACITY: usize = 2;

/// Initial capacity for the output buffer, as a fraction of input length.
/// Rewritten output is usually a little larger than the input; 9/8 avoids
/// one growth step on typical modules.
pub const OUTPUT_CAPACITY_NUM: usize = 9;
pub const OUTPUT_CAPACITY_DEN: usize = 8;
