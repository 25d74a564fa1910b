use crate::{ClassDef, ResolveError, Result, TypeDescriptor};

/// Actual type arguments for one generic class, in type-parameter order.
///
/// The argument count always matches the class's declared type-parameter count; there is no way
/// to build a `Binding` that violates this.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Binding {
    args: Vec<TypeDescriptor>,
}

impl Binding {
    pub fn new(class: &ClassDef, args: Vec<TypeDescriptor>) -> Result<Self> {
        if args.len() != class.type_param_count() {
            return Err(ResolveError::ArityMismatch {
                class: class.name().to_string(),
                expected: class.type_param_count(),
                found: args.len(),
            });
        }

        Ok(Self { args })
    }

    pub fn type_arguments(&self) -> &[TypeDescriptor] {
        &self.args
    }
}
