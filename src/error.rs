/// Static analysis errors.
///
/// Defines all diagnostics the parser can collect: syntax mistakes,
/// declaration and scope problems, type mismatches, and control flow
/// violations. Every diagnostic carries the 1-based source position it
/// refers to and renders as `line L column C: message`.
pub mod parse_error;
/// Runtime errors.
///
/// Contains all error types that can be raised while evaluating a program,
/// such as out-of-bounds indexing or reads of missing map keys. Runtime
/// errors halt execution; the evaluator reports them as `ERROR: message`.
pub mod runtime_error;

pub use parse_error::ParseError;
pub use runtime_error::RuntimeError;
