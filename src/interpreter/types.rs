/// Represents a static type in the language.
///
/// Scalar types are leaves; arrays and maps carry their element type. The
/// types of the empty literals `[]` and `{}` are the generic sentinels
/// `Array(None)` and `Map(None)`, which act as wildcards during matching
/// until [`Type::infer`] settles them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Type {
    /// An IEEE-754 double precision number.
    Num,
    /// A UTF-8 string.
    String,
    /// A boolean.
    Bool,
    /// The top type; accepts any value.
    Any,
    /// No type: functions without return value, generic sentinel subtypes.
    None,
    /// The type of expressions that failed to type check.
    Illegal,
    /// An array with the given element type.
    Array(Box<Type>),
    /// A map from string keys to values of the given type.
    Map(Box<Type>),
}

impl Type {
    /// The type of the empty array literal `[]`.
    #[must_use]
    pub fn generic_array() -> Self {
        Self::Array(Box::new(Self::None))
    }

    /// The type of the empty map literal `{}`.
    #[must_use]
    pub fn generic_map() -> Self {
        Self::Map(Box::new(Self::None))
    }

    /// Returns `true` for the generic `[]` and `{}` sentinels.
    #[must_use]
    pub fn is_generic(&self) -> bool {
        matches!(self, Self::Array(sub) | Self::Map(sub) if **sub == Self::None)
    }

    /// Returns the element type of an array or map.
    #[must_use]
    pub fn sub(&self) -> Option<&Self> {
        match self {
            Self::Array(sub) | Self::Map(sub) => Some(sub),
            _ => None,
        }
    }

    /// Tests structural equality, treating the generic sentinels as wildcards
    /// at their own level: `[]` matches any array, `{}` any map.
    ///
    /// # Example
    /// ```
    /// use quill::interpreter::types::Type;
    ///
    /// let nums = Type::Array(Box::new(Type::Num));
    /// assert!(nums.matches(&Type::generic_array()));
    /// assert!(!nums.matches(&Type::Array(Box::new(Type::Bool))));
    /// ```
    #[must_use]
    pub fn matches(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Array(a), Self::Array(b)) | (Self::Map(a), Self::Map(b)) => {
                **a == Self::None || **b == Self::None || a.matches(b)
            },
            _ => self == other,
        }
    }

    /// Tests whether a declared type accepts a value of another type.
    ///
    /// Acceptance is structural equality with two extensions: `any` accepts
    /// every well-formed type except `none`, and every array or map accepts
    /// the matching empty literal. Subtypes stay invariant: `any[]` does
    /// *not* accept `num[]`.
    ///
    /// # Example
    /// ```
    /// use quill::interpreter::types::Type;
    ///
    /// assert!(Type::Any.accepts(&Type::Num));
    /// let anys = Type::Array(Box::new(Type::Any));
    /// let nums = Type::Array(Box::new(Type::Num));
    /// assert!(!anys.accepts(&nums));
    /// assert!(nums.accepts(&Type::generic_array()));
    /// ```
    #[must_use]
    pub fn accepts(&self, other: &Self) -> bool {
        if self.accepts_strict(other) {
            return true;
        }
        *self == Self::Any && *other != Self::Illegal && *other != Self::None
    }

    fn accepts_strict(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Illegal, _) | (_, Self::Illegal) => false,
            (Self::Array(a), Self::Array(b)) | (Self::Map(a), Self::Map(b)) => {
                **b == Self::None || a.accepts_strict(b)
            },
            _ => self == other,
        }
    }

    /// Replaces any remaining generic `none` subtype with `any`. Called once
    /// a literal's type is final and no context pinned it down.
    #[must_use]
    pub fn infer(self) -> Self {
        match self {
            Self::Array(sub) => Self::Array(Box::new(if *sub == Self::None {
                                                        Self::Any
                                                    } else {
                                                        sub.infer()
                                                    })),
            Self::Map(sub) => Self::Map(Box::new(if *sub == Self::None {
                                                     Self::Any
                                                 } else {
                                                     sub.infer()
                                                 })),
            other => other,
        }
    }

    /// Formats the zero value of this type the way the AST printer renders
    /// declarations without initializer.
    #[must_use]
    pub const fn zero_string(&self) -> &'static str {
        match self {
            Self::Num => "0",
            Self::String => "''",
            Self::Bool | Self::Any => "false",
            Self::Array(_) => "[]",
            Self::Map(_) => "{}",
            Self::None | Self::Illegal => "none",
        }
    }
}

impl std::fmt::Display for Type {
    /// Writes the compact format used in diagnostics: `num`, `string`,
    /// `bool`, `any`, `none`, `num[]`, `num{}`, and bare `[]`/`{}` for the
    /// generic sentinels.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Num => write!(f, "num"),
            Self::String => write!(f, "string"),
            Self::Bool => write!(f, "bool"),
            Self::Any => write!(f, "any"),
            Self::None => write!(f, "none"),
            Self::Illegal => write!(f, "ILLEGAL"),
            Self::Array(sub) => {
                if **sub == Self::None {
                    write!(f, "[]")
                } else {
                    write!(f, "{sub}[]")
                }
            },
            Self::Map(sub) => {
                if **sub == Self::None {
                    write!(f, "{{}}")
                } else {
                    write!(f, "{sub}{{}}")
                }
            },
        }
    }
}

/// Combines the element types of a literal into a single element type.
///
/// Types are widened by acceptance in both directions; if no single type
/// accepts all elements, the combination falls back to `any`.
#[must_use]
pub fn combine_types(types: &[Type]) -> Type {
    let mut combined = types[0].clone();
    for t in &types[1..] {
        if combined.accepts(t) {
            continue;
        }
        if t.accepts(&combined) {
            combined = t.clone();
            continue;
        }
        return Type::Any;
    }
    combined
}
