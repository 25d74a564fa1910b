use std::fmt;

use crate::{
    Binding, ClassDef, ClassEnv, ClassId, DeclaredType, FieldDef, ResolveError, Result,
    TypeDescriptor,
};

/// Resolves the runtime types of the fields of one class under one binding of its type
/// parameters.
///
/// A resolver is immutable once built: resolution is a pure function of the binding and the
/// field's declared type, so a single instance can be shared freely across threads.
///
/// ```text
/// class Pair<A, B> { A first; List<B>[] rest; }
///
/// Resolver(Pair, [String, Integer]).resolve_field("rest")
///     == Array(Parameterized(List, [Integer]))
/// ```
pub struct Resolver<'env> {
    env: &'env (dyn ClassEnv + Sync),
    class: &'env ClassDef,
    binding: Binding,
}

impl fmt::Debug for Resolver<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resolver")
            .field("class", &self.class.name())
            .field("binding", &self.binding)
            .finish_non_exhaustive()
    }
}

impl<'env> Resolver<'env> {
    /// Bind `args` to the type parameters of `class`.
    ///
    /// Fails with [`ResolveError::ArityMismatch`] unless exactly one argument is supplied per
    /// declared type parameter (so non-generic classes only accept an empty list).
    pub fn new(
        env: &'env (dyn ClassEnv + Sync),
        class: ClassId,
        args: Vec<TypeDescriptor>,
    ) -> Result<Self> {
        let class = env.class(class).ok_or(ResolveError::UnknownClass(class))?;
        let binding = Binding::new(class, args)?;
        Ok(Self {
            env,
            class,
            binding,
        })
    }

    /// Resolver for a class without supplying any type arguments.
    ///
    /// Generic classes are rejected with the same error as an explicitly empty argument list.
    pub fn for_class(env: &'env (dyn ClassEnv + Sync), class: ClassId) -> Result<Self> {
        Self::new(env, class, Vec::new())
    }

    pub fn class_def(&self) -> &'env ClassDef {
        self.class
    }

    /// The declaring class itself, under this binding.
    pub fn get_type(&self) -> TypeDescriptor {
        if self.class.is_generic() {
            TypeDescriptor::parameterized(
                self.class.id(),
                self.binding.type_arguments().to_vec(),
            )
        } else {
            TypeDescriptor::class(self.class.id())
        }
    }

    pub fn declared_fields(&self) -> &'env [FieldDef] {
        self.class.fields()
    }

    pub fn field(&self, name: &str) -> Option<&'env FieldDef> {
        self.class.field(name)
    }

    /// Resolve the runtime type of `field`, which must be declared on this resolver's class.
    pub fn resolve_type(&self, field: &FieldDef) -> Result<TypeDescriptor> {
        // Ids alone are not enough: another registry may reuse this class's id.
        if !field.is_declared_on(self.class) {
            return Err(ResolveError::ForeignField {
                field: field.name().to_string(),
                owner: field.owner_name().to_string(),
                class: self.class.name().to_string(),
            });
        }

        let scope = Scope {
            params: self.class.type_params(),
            args: self.binding.type_arguments(),
        };
        let resolved = substitute(self.env, &scope, field.declared_type(), &|| {
            format!("field `{}.{}`", self.class.name(), field.name())
        })?;

        tracing::trace!(
            target: "reify.resolver",
            class = %self.class.name(),
            field = %field.name(),
            resolved = ?resolved,
            "resolved field type"
        );
        Ok(resolved)
    }

    /// Look a field up by name and resolve it.
    pub fn resolve_field(&self, name: &str) -> Result<TypeDescriptor> {
        let field = self.field(name).ok_or_else(|| ResolveError::UnknownField {
            class: self.class.name().to_string(),
            field: name.to_string(),
        })?;
        self.resolve_type(field)
    }

    /// Resolve every declared field, in declaration order. Stops at the first failure.
    pub fn resolve_all(&self) -> Result<Vec<(&'env FieldDef, TypeDescriptor)>> {
        self.declared_fields()
            .iter()
            .map(|field| self.resolve_type(field).map(|ty| (field, ty)))
            .collect()
    }
}

/// Turn a declared type that mentions no type variables into a descriptor.
///
/// Used for actual type arguments written by hand (for example on a command line), which must
/// already be concrete.
pub fn concretize(env: &dyn ClassEnv, ty: &DeclaredType) -> Result<TypeDescriptor> {
    let scope = Scope {
        params: &[],
        args: &[],
    };
    substitute(env, &scope, ty, &|| "type argument".to_string())
}

/// Type parameters of the declaring class paired with the binding's actual arguments.
struct Scope<'a> {
    params: &'a [String],
    args: &'a [TypeDescriptor],
}

impl Scope<'_> {
    fn lookup(&self, name: &str) -> Option<&TypeDescriptor> {
        let idx = self.params.iter().position(|param| param == name)?;
        self.args.get(idx)
    }
}

fn substitute(
    env: &dyn ClassEnv,
    scope: &Scope<'_>,
    ty: &DeclaredType,
    context: &dyn Fn() -> String,
) -> Result<TypeDescriptor> {
    match ty {
        DeclaredType::Primitive(prim) => Ok(TypeDescriptor::primitive(*prim)),
        DeclaredType::Class(id) => Ok(TypeDescriptor::class(*id)),
        // Binding arguments are already resolved; they are used as-is.
        DeclaredType::TypeVar(name) => {
            scope
                .lookup(name)
                .cloned()
                .ok_or_else(|| ResolveError::UnboundTypeVariable { name: name.clone() })
        }
        // A reference back to the declaring class (`Node<T> next`) takes this path too. Its
        // arguments are type variables that bottom out in the binding, so there is no recursion
        // through the class itself.
        DeclaredType::Parameterized { raw, args } => {
            let def = env.class(*raw).ok_or(ResolveError::UnknownClass(*raw))?;
            if def.type_param_count() != args.len() {
                return Err(ResolveError::ArityMismatch {
                    class: def.name().to_string(),
                    expected: def.type_param_count(),
                    found: args.len(),
                });
            }

            let type_arguments = args
                .iter()
                .map(|arg| substitute(env, scope, arg, context))
                .collect::<Result<Vec<_>>>()?;
            Ok(TypeDescriptor::parameterized(*raw, type_arguments))
        }
        DeclaredType::Array(component) => Ok(TypeDescriptor::array(substitute(
            env, scope, component, context,
        )?)),
        DeclaredType::Wildcard(_) => Err(ResolveError::UnsupportedType { context: context() }),
    }
}
