//! Source level types as seen by the symbol table and the type checker.
//!
//! Java-- deliberately leaves imported classes opaque: we know nothing about
//! their members, so any value flowing out of them is typed with
//! [`TypeName::Any`] and [`Arrayness::Maybe`]. Both act as wildcards in
//! [`ResolvedType::same_type`].

use core::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeName {
    Int,
    Boolean,
    String,
    Void,
    /// The class being compiled, its superclass or an imported class
    Class(String),
    /// Unknown type of a value produced by an opaque class. Compatible with
    /// every other type.
    Any,
}

impl TypeName {
    /// Maps a type name as written in source to its kind
    pub fn from_source(name: &str) -> Self {
        match name {
            "int" => Self::Int,
            "boolean" => Self::Boolean,
            "String" => Self::String,
            "void" => Self::Void,
            other => Self::Class(other.to_string()),
        }
    }

    pub fn class_name(&self) -> Option<&str> {
        match self {
            Self::Class(name) => Some(name),
            _ => None,
        }
    }
}

impl fmt::Display for TypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int => write!(f, "int"),
            Self::Boolean => write!(f, "boolean"),
            Self::String => write!(f, "String"),
            Self::Void => write!(f, "void"),
            Self::Class(name) => write!(f, "{name}"),
            Self::Any => write!(f, "?"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Arrayness {
    Scalar,
    Array,
    /// Unknown, assume compatible
    Maybe,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResolvedType {
    pub name: TypeName,
    pub arrayness: Arrayness,
}

impl ResolvedType {
    pub fn new(name: TypeName, is_array: bool) -> Self {
        Self {
            name,
            arrayness: if is_array {
                Arrayness::Array
            } else {
                Arrayness::Scalar
            },
        }
    }

    pub fn int() -> Self {
        Self::new(TypeName::Int, false)
    }

    pub fn int_array() -> Self {
        Self::new(TypeName::Int, true)
    }

    pub fn boolean() -> Self {
        Self::new(TypeName::Boolean, false)
    }

    pub fn void() -> Self {
        Self::new(TypeName::Void, false)
    }

    pub fn class(name: impl Into<String>) -> Self {
        Self::new(TypeName::Class(name.into()), false)
    }

    /// The wildcard type given to anything flowing out of an opaque class
    pub fn any() -> Self {
        Self {
            name: TypeName::Any,
            arrayness: Arrayness::Maybe,
        }
    }

    pub fn is_array(&self) -> bool {
        self.arrayness == Arrayness::Array
    }

    pub fn is_any(&self) -> bool {
        self.name == TypeName::Any
    }

    /// Type of a single element when indexing into this type
    pub fn element(&self) -> Self {
        Self {
            name: self.name.clone(),
            arrayness: Arrayness::Scalar,
        }
    }

    /// Names must match unless either is [`TypeName::Any`], array-ness must
    /// match unless either is [`Arrayness::Maybe`].
    pub fn same_type(&self, other: &Self) -> bool {
        let names = self.name == other.name
            || self.name == TypeName::Any
            || other.name == TypeName::Any;

        let arrays = self.arrayness == other.arrayness
            || self.arrayness == Arrayness::Maybe
            || other.arrayness == Arrayness::Maybe;

        names && arrays
    }

    pub fn is_int(&self) -> bool {
        self.same_type(&Self::int())
    }

    pub fn is_boolean(&self) -> bool {
        self.same_type(&Self::boolean())
    }

    /// Whether indexing or `.length` may be applied to a value of this type
    pub fn may_be_array(&self) -> bool {
        self.arrayness != Arrayness::Scalar
    }
}

impl fmt::Display for ResolvedType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.arrayness {
            Arrayness::Scalar => write!(f, "{}", self.name),
            Arrayness::Array => write!(f, "{}[]", self.name),
            Arrayness::Maybe => write!(f, "{}[]?", self.name),
        }
    }
}
