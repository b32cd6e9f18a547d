use std::{cell::RefCell, rc::Rc};

use indexmap::IndexMap;

use crate::{ast::format_num, interpreter::types::Type};

/// Represents a runtime value in the interpreter.
///
/// Scalars have value semantics: cloning copies them. Arrays and maps have
/// reference semantics: cloning copies the shared handle, so two variables
/// holding the same array observe each other's mutations. Slicing and `+`
/// allocate fresh arrays, which is the idiom for unaliasing.
#[derive(Debug, Clone)]
pub enum Value {
    /// A number (IEEE-754 double).
    Num(f64),
    /// A string. Value-typed at the language level.
    Str(String),
    /// A boolean.
    Bool(bool),
    /// A shared, mutable, resizable sequence of values.
    Array(Rc<RefCell<Vec<Value>>>),
    /// A shared, mutable map preserving insertion order.
    Map(Rc<RefCell<IndexMap<String, Value>>>),
    /// A snapshot stored in an `any`-typed slot, retaining its dynamic type
    /// for printing and equality.
    Any(Box<Value>),
}

impl Value {
    /// Builds a fresh array value from a vector of elements.
    #[must_use]
    pub fn array(elements: Vec<Self>) -> Self {
        Self::Array(Rc::new(RefCell::new(elements)))
    }

    /// Builds a fresh map value from ordered key-value pairs.
    #[must_use]
    pub fn map(pairs: IndexMap<String, Self>) -> Self {
        Self::Map(Rc::new(RefCell::new(pairs)))
    }

    /// Returns the zero value stored by a declaration without initializer:
    /// `0`, `""`, `false`, `[]`, `{}`; `any` defaults to a boxed `false`.
    #[must_use]
    pub fn zero(typ: &Type) -> Self {
        match typ {
            Type::String => Self::Str(String::new()),
            Type::Bool => Self::Bool(false),
            Type::Any => Self::Any(Box::new(Self::Bool(false))),
            Type::Array(_) => Self::array(Vec::new()),
            Type::Map(_) => Self::map(IndexMap::new()),
            _ => Self::Num(0.0),
        }
    }

    /// Wraps a value for storage in an `any`-typed slot. Values that are
    /// already wrapped stay as they are.
    #[must_use]
    pub fn into_any(self) -> Self {
        match self {
            wrapped @ Self::Any(_) => wrapped,
            inner => Self::Any(Box::new(inner)),
        }
    }

    /// Looks through the `any` wrapper to the carried value.
    #[must_use]
    pub fn unwrap_any(&self) -> &Self {
        match self {
            Self::Any(inner) => inner.unwrap_any(),
            other => other,
        }
    }

    /// Returns the dynamic type name used in runtime diagnostics.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self.unwrap_any() {
            Self::Num(_) => "num",
            Self::Str(_) => "string",
            Self::Bool(_) => "bool",
            Self::Array(_) => "array",
            Self::Map(_) => "map",
            Self::Any(_) => "any",
        }
    }
}

impl PartialEq for Value {
    /// Structural equality that looks through `any` wrappers. Arrays and
    /// maps compare by contents, not by handle identity.
    fn eq(&self, other: &Self) -> bool {
        match (self.unwrap_any(), other.unwrap_any()) {
            (Self::Num(a), Self::Num(b)) => a == b,
            (Self::Str(a), Self::Str(b)) => a == b,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Array(a), Self::Array(b)) => {
                Rc::ptr_eq(a, b) || *a.borrow() == *b.borrow()
            },
            (Self::Map(a), Self::Map(b)) => Rc::ptr_eq(a, b) || *a.borrow() == *b.borrow(),
            _ => false,
        }
    }
}

impl std::fmt::Display for Value {
    /// Writes the value the way `print`, `sprint` and `join` format it:
    /// numbers without trailing zeros, strings as their raw characters,
    /// arrays space-separated in brackets, maps in insertion order.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Num(n) => write!(f, "{}", format_num(*n)),
            Self::Str(s) => write!(f, "{s}"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Array(elements) => {
                write!(f, "[")?;
                for (i, element) in elements.borrow().iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{element}")?;
                }
                write!(f, "]")
            },
            Self::Map(pairs) => {
                write!(f, "{{")?;
                for (i, (key, value)) in pairs.borrow().iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{key}:{value}")?;
                }
                write!(f, "}}")
            },
            Self::Any(inner) => write!(f, "{inner}"),
        }
    }
}
