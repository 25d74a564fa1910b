use thiserror::Error;

use crate::ClassId;

pub type Result<T, E = ResolveError> = std::result::Result<T, E>;

/// Failures of binding construction and field resolution.
///
/// None of these are transient: each one points at a mistake in how the resolver was built or
/// called, so callers should propagate rather than retry.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ResolveError {
    #[error(
        "actualTypeArguments must be same length as class' type parameters \
         (`{class}` declares {expected}, got {found})"
    )]
    ArityMismatch {
        class: String,
        expected: usize,
        found: usize,
    },
    #[error("cannot resolve fields from other classes (`{owner}.{field}` is not declared on `{class}`)")]
    ForeignField {
        field: String,
        owner: String,
        class: String,
    },
    #[error("Wildcard types are not supported (found in {context})")]
    UnsupportedType { context: String },
    #[error("class {0:?} is not defined")]
    UnknownClass(ClassId),
    #[error("`{class}` declares no field named `{field}`")]
    UnknownField { class: String, field: String },
    #[error("type variable `{name}` is not bound")]
    UnboundTypeVariable { name: String },
}
