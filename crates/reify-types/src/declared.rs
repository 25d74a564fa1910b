use crate::ClassId;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PrimitiveType {
    Boolean,
    Byte,
    Short,
    Char,
    Int,
    Long,
    Float,
    Double,
}

impl PrimitiveType {
    pub const ALL: [PrimitiveType; 8] = [
        PrimitiveType::Boolean,
        PrimitiveType::Byte,
        PrimitiveType::Short,
        PrimitiveType::Char,
        PrimitiveType::Int,
        PrimitiveType::Long,
        PrimitiveType::Float,
        PrimitiveType::Double,
    ];

    pub fn keyword(self) -> &'static str {
        match self {
            PrimitiveType::Boolean => "boolean",
            PrimitiveType::Byte => "byte",
            PrimitiveType::Short => "short",
            PrimitiveType::Char => "char",
            PrimitiveType::Int => "int",
            PrimitiveType::Long => "long",
            PrimitiveType::Float => "float",
            PrimitiveType::Double => "double",
        }
    }

    pub fn from_keyword(word: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|prim| prim.keyword() == word)
    }
}

/// Bound of a wildcard type argument (`?`, `? extends T`, `? super T`).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum WildcardBound {
    Unbounded,
    Extends(Box<DeclaredType>),
    Super(Box<DeclaredType>),
}

/// The generic type of a field exactly as it was declared on its class.
///
/// This is the input side of resolution: it may still mention the declaring class's type
/// variables, and it may contain wildcards (which resolution rejects).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum DeclaredType {
    Primitive(PrimitiveType),
    /// A non-parameterized class reference (`String`, or a raw use of any class).
    Class(ClassId),
    Parameterized {
        raw: ClassId,
        args: Vec<DeclaredType>,
    },
    Array(Box<DeclaredType>),
    /// Occurrence of one of the declaring class's type parameters, by name.
    TypeVar(String),
    Wildcard(WildcardBound),
}

impl DeclaredType {
    pub fn class(id: ClassId) -> Self {
        DeclaredType::Class(id)
    }

    pub fn parameterized(raw: ClassId, args: Vec<DeclaredType>) -> Self {
        DeclaredType::Parameterized { raw, args }
    }

    pub fn array(component: DeclaredType) -> Self {
        DeclaredType::Array(Box::new(component))
    }

    pub fn type_var(name: impl Into<String>) -> Self {
        DeclaredType::TypeVar(name.into())
    }

    /// True if resolution would have nothing to substitute.
    pub fn is_concrete(&self) -> bool {
        match self {
            DeclaredType::Primitive(_) | DeclaredType::Class(_) => true,
            DeclaredType::Parameterized { args, .. } => args.iter().all(DeclaredType::is_concrete),
            DeclaredType::Array(component) => component.is_concrete(),
            DeclaredType::TypeVar(_) | DeclaredType::Wildcard(_) => false,
        }
    }

    pub fn contains_wildcard(&self) -> bool {
        match self {
            DeclaredType::Wildcard(_) => true,
            DeclaredType::Parameterized { args, .. } => {
                args.iter().any(DeclaredType::contains_wildcard)
            }
            DeclaredType::Array(component) => component.contains_wildcard(),
            DeclaredType::Primitive(_) | DeclaredType::Class(_) | DeclaredType::TypeVar(_) => {
                false
            }
        }
    }

    /// Visit every node of the type expression, outermost first.
    pub fn walk(&self, f: &mut dyn FnMut(&DeclaredType)) {
        f(self);
        match self {
            DeclaredType::Parameterized { args, .. } => {
                for arg in args {
                    arg.walk(f);
                }
            }
            DeclaredType::Array(component) => component.walk(f),
            DeclaredType::Wildcard(WildcardBound::Extends(bound))
            | DeclaredType::Wildcard(WildcardBound::Super(bound)) => bound.walk(f),
            DeclaredType::Primitive(_)
            | DeclaredType::Class(_)
            | DeclaredType::TypeVar(_)
            | DeclaredType::Wildcard(WildcardBound::Unbounded) => {}
        }
    }
}
