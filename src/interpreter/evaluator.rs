/// Built-in functions.
///
/// Declares the host-provided function table (`print`, `len`, `has`, `del`,
/// `join`, `sprint`, `split`, and the graphics stubs) and dispatches calls
/// to their native implementations.
pub mod builtin;

/// Core evaluation logic and environment management.
///
/// Contains the runtime [`core::Context`] with its scope stack and printer,
/// the statement executor with its control-flow signals, and the `run`
/// entry point used by the CLI.
pub mod core;

/// Expression evaluation.
///
/// Evaluates literals, variables, operators, indexing, slicing, field
/// access, calls, and assignment targets against the runtime environment.
pub mod expr;
