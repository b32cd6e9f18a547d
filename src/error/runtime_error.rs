use crate::ast::format_num;

/// Represents all errors that can occur while a program runs.
///
/// The evaluator halts on the first runtime error and reports it through the
/// printer as `ERROR: <message>`; output produced before the error is kept.
#[derive(Debug)]
pub enum RuntimeError {
    /// An array or string index outside the valid range.
    IndexOutOfBounds {
        /// The index that was requested.
        index: f64,
        /// The length of the indexed value.
        len:   usize,
    },
    /// An index that is not a whole number.
    NonIntegerIndex {
        /// The index that was requested.
        index: f64,
    },
    /// A read of a map key that is not present.
    MissingKey {
        /// The missing key.
        key: String,
    },
    /// A slice bound outside the valid range.
    SliceOutOfBounds {
        /// The bound that was requested.
        index: f64,
        /// The length of the sliced value.
        len:   usize,
    },
    /// A slice whose start lies after its end.
    InvalidSliceRange {
        /// The requested start bound.
        start: f64,
        /// The requested end bound.
        end:   f64,
    },
    /// A numeric `range` loop with a step of zero.
    ZeroRangeStep,
    /// `len` applied to a value that has no length.
    LenType {
        /// The dynamic type name of the value.
        found: &'static str,
    },
}

impl std::fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::IndexOutOfBounds { index, len } => {
                write!(f,
                       "index {} out of bounds, should be between -{} and {}",
                       format_num(*index),
                       len,
                       *len as i64 - 1)
            },
            Self::NonIntegerIndex { index } => {
                write!(f, "non-integer index {}", format_num(*index))
            },
            Self::MissingKey { key } => write!(f, "no value for key {key}"),
            Self::SliceOutOfBounds { index, len } => {
                write!(f,
                       "slice index {} out of bounds, should be between 0 and {len}",
                       format_num(*index))
            },
            Self::InvalidSliceRange { start, end } => {
                write!(f, "invalid slice range {}:{}", format_num(*start), format_num(*end))
            },
            Self::ZeroRangeStep => write!(f, "range step cannot be 0"),
            Self::LenType { found } => {
                write!(f, "'len' takes array, string or map, found {found}")
            },
        }
    }
}

impl std::error::Error for RuntimeError {}
