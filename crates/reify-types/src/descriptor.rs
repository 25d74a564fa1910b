use crate::{ClassId, PrimitiveType};

/// A type with nothing left to substitute.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ConcreteType {
    Primitive(PrimitiveType),
    Class(ClassId),
}

/// A generic class applied to fully resolved type arguments.
///
/// `type_arguments` always has one entry per type parameter of `raw_type` when produced by a
/// [`crate::Resolver`].
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ParameterizedType {
    pub raw_type: ClassId,
    pub type_arguments: Vec<TypeDescriptor>,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ArrayType {
    pub component_type: Box<TypeDescriptor>,
}

/// Fully resolved runtime type of a field.
///
/// Equality and hashing are structural, so two descriptors built independently (by hand or by
/// resolution) are interchangeable as cache keys.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum TypeDescriptor {
    Concrete(ConcreteType),
    Parameterized(ParameterizedType),
    Array(ArrayType),
}

impl TypeDescriptor {
    pub fn class(id: ClassId) -> Self {
        TypeDescriptor::Concrete(ConcreteType::Class(id))
    }

    pub fn primitive(prim: PrimitiveType) -> Self {
        TypeDescriptor::Concrete(ConcreteType::Primitive(prim))
    }

    pub fn parameterized(raw_type: ClassId, type_arguments: Vec<TypeDescriptor>) -> Self {
        TypeDescriptor::Parameterized(ParameterizedType {
            raw_type,
            type_arguments,
        })
    }

    pub fn array(component_type: TypeDescriptor) -> Self {
        TypeDescriptor::Array(ArrayType {
            component_type: Box::new(component_type),
        })
    }

    /// The class this descriptor is an instance of, if any (arrays and primitives have none).
    pub fn raw_type(&self) -> Option<ClassId> {
        match self {
            TypeDescriptor::Concrete(ConcreteType::Class(id)) => Some(*id),
            TypeDescriptor::Parameterized(p) => Some(p.raw_type),
            TypeDescriptor::Concrete(ConcreteType::Primitive(_)) | TypeDescriptor::Array(_) => {
                None
            }
        }
    }

    pub fn type_arguments(&self) -> &[TypeDescriptor] {
        match self {
            TypeDescriptor::Parameterized(p) => &p.type_arguments,
            _ => &[],
        }
    }

    pub fn component_type(&self) -> Option<&TypeDescriptor> {
        match self {
            TypeDescriptor::Array(a) => Some(&a.component_type),
            _ => None,
        }
    }

    pub fn is_primitive(&self) -> bool {
        matches!(self, TypeDescriptor::Concrete(ConcreteType::Primitive(_)))
    }
}
