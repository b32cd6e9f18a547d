/// Core parser state and entry points.
///
/// Holds the token cursor, the whitespace-sensitivity stack, the collected
/// diagnostics, the function table, and the signature pre-pass.
pub mod core;

/// Pratt expression parsing.
///
/// Implements the precedence-driven expression grammar: literals, variables,
/// unary and binary operators, grouping, calls, indexing, slicing and field
/// access, together with their static type checks.
pub mod expression;

/// Lexical scope tracking for the static analyzer.
///
/// Maintains the stack of scope frames with shared variable records and
/// reports variables that were declared but never read.
pub mod scope;

/// Statement parsing.
///
/// Implements declarations, assignments, statement-level calls, control
/// flow, function and event handler bodies, and the reachability checks.
pub mod statement;
