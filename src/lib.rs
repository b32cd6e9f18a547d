//! # quill
//!
//! quill is a small, strongly-typed, interpreted scripting language for
//! teaching. This crate contains the language core: a whitespace-aware
//! lexer, a Pratt parser with full static checks (types, scopes,
//! use-liveness, return reachability), and a tree-walking evaluator with
//! reference-typed arrays and maps.
//!
//! The host supplies an output sink and gets three entry points: [`run`]
//! to execute a program, [`tokenize_to_string`] and [`parse_to_string`]
//! for the token and AST dumps used by the CLI.

#![warn(
    clippy::redundant_clone,
    clippy::needless_pass_by_value,
    clippy::match_same_arms,
    clippy::cargo,
    clippy::perf,
    clippy::style,
    clippy::suspicious,
    clippy::correctness,
    clippy::complexity,
    clippy::pedantic,
)]
#![allow(clippy::missing_errors_doc, clippy::cast_precision_loss, clippy::cast_possible_truncation)]

/// Defines the typed abstract syntax tree.
///
/// Expression and statement nodes carry their resolved types; variable
/// records are shared by identity between declarations and uses. The
/// `Display` impls render the textual AST form used by `quill parse`.
pub mod ast;
/// Provides the error types for both phases.
///
/// Parse diagnostics render with `line L column C:` positions and are
/// collected rather than thrown; runtime errors halt evaluation and are
/// reported as `ERROR:` lines.
pub mod error;
/// Orchestrates lexing, parsing, and evaluation.
///
/// Declares the lexer, the type model, the parser with its static
/// analysis, the value model, and the evaluator.
pub mod interpreter;

pub use interpreter::evaluator::core::{Printer, run};

/// Renders the token stream of a source string, one token per line.
///
/// # Example
/// ```
/// use quill::tokenize_to_string;
///
/// let dump = tokenize_to_string("a := 1");
/// assert!(dump.starts_with("1:1 IDENT a"));
/// ```
#[must_use]
pub fn tokenize_to_string(source: &str) -> String {
    interpreter::lexer::dump(&interpreter::lexer::tokenize(source))
}

/// Parses a source string against the built-in declarations and renders
/// the program AST, or the collected diagnostics if there are any.
///
/// # Example
/// ```
/// use quill::parse_to_string;
///
/// assert_eq!(parse_to_string("a := 1\nprint a"), "a=1\nprint(a)\n");
/// assert_eq!(parse_to_string("print x"),
///            "line 1 column 7: unknown variable name 'x'");
/// ```
#[must_use]
pub fn parse_to_string(source: &str) -> String {
    let parser =
        interpreter::parser::core::Parser::new(source, interpreter::evaluator::builtin::declarations());
    let (program, errors) = parser.parse();
    if errors.is_empty() {
        program.to_string()
    } else {
        errors.iter()
              .map(ToString::to_string)
              .collect::<Vec<_>>()
              .join("\n")
    }
}
