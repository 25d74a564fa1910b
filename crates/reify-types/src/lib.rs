//! Generic field-type resolution over explicitly registered class metadata.
//!
//! Classes (with their type parameters and declared field types) are registered in a
//! [`ClassRegistry`]. A [`Resolver`] binds actual type arguments to one class and computes the
//! fully resolved [`TypeDescriptor`] of each of its fields, substituting type variables through
//! nested parameterized and array types. Descriptors compare and hash structurally so they can
//! key encoder/decoder caches in a serialization layer.

#![forbid(unsafe_code)]

mod binding;
mod declared;
mod descriptor;
mod error;
mod format;
mod registry;
mod resolver;
mod syntax;

pub use crate::binding::Binding;
pub use crate::declared::{DeclaredType, PrimitiveType, WildcardBound};
pub use crate::descriptor::{ArrayType, ConcreteType, ParameterizedType, TypeDescriptor};
pub use crate::error::{ResolveError, Result};
pub use crate::format::{format_declared, format_descriptor, DescriptorDisplay};
pub use crate::registry::{
    ClassDecl, ClassDef, ClassEnv, ClassId, ClassRegistry, FieldDecl, FieldDef, RegistryError,
};
pub use crate::resolver::{concretize, Resolver};
pub use crate::syntax::{
    parse_declared_type, ParseError, ParseErrorKind, TypeScope, MAX_TYPE_DEPTH,
};
