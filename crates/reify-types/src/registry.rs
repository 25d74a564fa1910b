use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use thiserror::Error;

use crate::{DeclaredType, WildcardBound};

/// Index of a class inside one [`ClassRegistry`].
///
/// Ids are only meaningful for the registry that handed them out.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClassId(u32);

impl ClassId {
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    pub const fn to_raw(self) -> u32 {
        self.0
    }

    fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for ClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ClassId({})", self.0)
    }
}

/// Identity of one registry instance. Every `ClassDef`/`FieldDef` carries the origin of the
/// registry that built it, since a bare `ClassId` is ambiguous across registries.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
struct Origin(u64);

impl Origin {
    fn fresh() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(0);
        Origin(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// Read-only view of registered class metadata.
///
/// This is the only thing a [`crate::Resolver`] needs from the outside world.
pub trait ClassEnv {
    fn class(&self, id: ClassId) -> Option<&ClassDef>;

    /// Name of `id`, including classes that were interned but never defined.
    fn class_name(&self, id: ClassId) -> Option<&str>;

    fn lookup_class(&self, name: &str) -> Option<ClassId>;
}

/// Registration input for one field.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldDecl {
    pub name: String,
    pub ty: DeclaredType,
}

impl FieldDecl {
    pub fn new(name: impl Into<String>, ty: DeclaredType) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }
}

/// Registration input for one class.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ClassDecl {
    pub name: String,
    pub type_params: Vec<String>,
    pub fields: Vec<FieldDecl>,
}

impl ClassDecl {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn type_param(mut self, name: impl Into<String>) -> Self {
        self.type_params.push(name.into());
        self
    }

    pub fn field(mut self, name: impl Into<String>, ty: DeclaredType) -> Self {
        self.fields.push(FieldDecl::new(name, ty));
        self
    }
}

/// A field as stored in the registry. Only the registry builds these, so `owner` always names
/// the class the field was declared on.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldDef {
    origin: Origin,
    owner: ClassId,
    owner_name: String,
    name: String,
    ty: DeclaredType,
}

impl FieldDef {
    pub fn owner(&self) -> ClassId {
        self.owner
    }

    /// Name of the declaring class. Unlike [`FieldDef::owner`] this is meaningful without the
    /// registry the field came from.
    pub fn owner_name(&self) -> &str {
        &self.owner_name
    }

    /// Whether this field was declared on `class`, in the same registry.
    pub fn is_declared_on(&self, class: &ClassDef) -> bool {
        self.origin == class.origin && self.owner == class.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The field's generic type as declared, before any substitution.
    pub fn declared_type(&self) -> &DeclaredType {
        &self.ty
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClassDef {
    origin: Origin,
    id: ClassId,
    name: String,
    type_params: Vec<String>,
    fields: Vec<FieldDef>,
}

impl ClassDef {
    pub fn id(&self) -> ClassId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn type_params(&self) -> &[String] {
        &self.type_params
    }

    pub fn type_param_count(&self) -> usize {
        self.type_params.len()
    }

    pub fn type_param_index(&self, name: &str) -> Option<usize> {
        self.type_params.iter().position(|param| param == name)
    }

    pub fn is_generic(&self) -> bool {
        !self.type_params.is_empty()
    }

    /// Declared fields, in declaration order.
    pub fn fields(&self) -> &[FieldDef] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|field| field.name == name)
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("class `{0}` is already defined")]
    DuplicateClass(String),
    #[error("class `{class}` declares type parameter `{name}` more than once")]
    DuplicateTypeParameter { class: String, name: String },
    #[error("class `{class}` declares field `{field}` more than once")]
    DuplicateField { class: String, field: String },
    #[error("field `{class}.{field}` references class `{referenced}`, which is not defined")]
    UnknownClass {
        class: String,
        field: String,
        referenced: String,
    },
    #[error("field `{class}.{field}` uses type variable `{name}`, which `{class}` does not declare")]
    UndeclaredTypeVariable {
        class: String,
        field: String,
        name: String,
    },
    #[error(
        "field `{class}.{field}` applies {found} type argument(s) to `{raw}`, which declares {expected}"
    )]
    ArityMismatch {
        class: String,
        field: String,
        raw: String,
        expected: usize,
        found: usize,
    },
}

/// Explicit, opt-in registry of class metadata.
///
/// Classes are identified by name. A name can be interned before its class is defined, which
/// is how classes refer to themselves and to each other in their field types.
///
/// Cloning yields an independent registry: fields of the clone are foreign to the original.
#[derive(Debug)]
pub struct ClassRegistry {
    origin: Origin,
    names: Vec<String>,
    defs: Vec<Option<ClassDef>>,
    by_name: HashMap<String, ClassId>,
}

impl Default for ClassRegistry {
    fn default() -> Self {
        Self {
            origin: Origin::fresh(),
            names: Vec::new(),
            defs: Vec::new(),
            by_name: HashMap::new(),
        }
    }
}

impl Clone for ClassRegistry {
    fn clone(&self) -> Self {
        let origin = Origin::fresh();
        let defs = self
            .defs
            .iter()
            .map(|def| {
                def.clone().map(|mut def| {
                    def.origin = origin;
                    for field in &mut def.fields {
                        field.origin = origin;
                    }
                    def
                })
            })
            .collect();
        Self {
            origin,
            names: self.names.clone(),
            defs,
            by_name: self.by_name.clone(),
        }
    }
}

impl ClassRegistry {
    /// A registry pre-populated with the JDK classes serializable models usually mention.
    pub fn with_java_lang() -> Self {
        let mut registry = Self::default();
        for (name, params) in JAVA_BUILTINS {
            registry.insert_builtin(name, params);
        }
        registry
    }

    fn insert_builtin(&mut self, name: &str, params: &[&str]) {
        let id = self.intern_class_id(name);
        self.defs[id.index()] = Some(ClassDef {
            origin: self.origin,
            id,
            name: name.to_string(),
            type_params: params.iter().map(|p| p.to_string()).collect(),
            fields: Vec::new(),
        });
    }

    /// Returns the id for `name`, allocating a placeholder if the name has not been seen yet.
    pub fn intern_class_id(&mut self, name: &str) -> ClassId {
        if let Some(id) = self.by_name.get(name) {
            return *id;
        }

        let raw: u32 = self
            .names
            .len()
            .try_into()
            .expect("too many interned classes");
        let id = ClassId(raw);
        self.names.push(name.to_string());
        self.defs.push(None);
        self.by_name.insert(name.to_string(), id);
        id
    }

    /// Exact-name lookup, including interned placeholders.
    pub fn class_id(&self, name: &str) -> Option<ClassId> {
        self.by_name.get(name).copied()
    }

    pub fn is_defined(&self, id: ClassId) -> bool {
        matches!(self.defs.get(id.index()), Some(Some(_)))
    }

    /// Defined classes in id order.
    pub fn classes(&self) -> impl Iterator<Item = &ClassDef> {
        self.defs.iter().flatten()
    }

    pub fn len(&self) -> usize {
        self.classes().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Validate and store a class.
    ///
    /// Every class the fields mention must already be defined, or be `decl` itself. Use
    /// [`ClassRegistry::define_classes`] for classes that refer to each other. On failure the
    /// registry is left untouched.
    pub fn define_class(&mut self, decl: ClassDecl) -> Result<ClassId, RegistryError> {
        let mut ids = self.define_classes(vec![decl])?;
        Ok(ids.remove(0))
    }

    /// Validate and store a batch of classes that may reference each other.
    ///
    /// References are checked against the classes already defined plus the whole batch, so
    /// `Parent { Child child; }` and `Child { Parent parent; }` can be defined together. Either
    /// every class is stored or, on the first error, none is and no new name is interned.
    pub fn define_classes(
        &mut self,
        decls: Vec<ClassDecl>,
    ) -> Result<Vec<ClassId>, RegistryError> {
        let ids = self.plan_ids(&decls)?;
        let batch: HashMap<ClassId, usize> = ids
            .iter()
            .zip(&decls)
            .map(|(id, decl)| (*id, decl.type_params.len()))
            .collect();

        for decl in &decls {
            validate_decl_shape(decl)?;
            for field in &decl.fields {
                self.validate_field_type(&batch, decl, field, &field.ty)?;
            }
        }

        for (decl, planned) in decls.into_iter().zip(&ids) {
            let id = self.intern_class_id(&decl.name);
            debug_assert_eq!(id, *planned);

            tracing::debug!(
                target: "reify.registry",
                class = %decl.name,
                type_params = decl.type_params.len(),
                fields = decl.fields.len(),
                "defined class"
            );

            let fields = decl
                .fields
                .into_iter()
                .map(|field| FieldDef {
                    origin: self.origin,
                    owner: id,
                    owner_name: decl.name.clone(),
                    name: field.name,
                    ty: field.ty,
                })
                .collect();
            self.defs[id.index()] = Some(ClassDef {
                origin: self.origin,
                id,
                name: decl.name,
                type_params: decl.type_params,
                fields,
            });
        }
        Ok(ids)
    }

    /// Ids the batch will get once interned, without interning anything yet.
    fn plan_ids(&self, decls: &[ClassDecl]) -> Result<Vec<ClassId>, RegistryError> {
        let mut seen = HashSet::new();
        let mut next = self.names.len();
        let mut ids = Vec::with_capacity(decls.len());
        for decl in decls {
            if !seen.insert(decl.name.as_str()) {
                return Err(RegistryError::DuplicateClass(decl.name.clone()));
            }
            let id = match self.class_id(&decl.name) {
                Some(id) if self.is_defined(id) => {
                    return Err(RegistryError::DuplicateClass(decl.name.clone()));
                }
                Some(id) => id,
                None => {
                    let raw: u32 = next.try_into().expect("too many interned classes");
                    next += 1;
                    ClassId(raw)
                }
            };
            ids.push(id);
        }
        Ok(ids)
    }

    fn validate_field_type(
        &self,
        batch: &HashMap<ClassId, usize>,
        decl: &ClassDecl,
        field: &FieldDecl,
        ty: &DeclaredType,
    ) -> Result<(), RegistryError> {
        match ty {
            DeclaredType::Primitive(_) => Ok(()),
            DeclaredType::Class(id) => {
                self.expect_class(batch, decl, field, *id)?;
                Ok(())
            }
            DeclaredType::Parameterized { raw, args } => {
                let expected = self.expect_class(batch, decl, field, *raw)?;
                if expected != args.len() {
                    return Err(RegistryError::ArityMismatch {
                        class: decl.name.clone(),
                        field: field.name.clone(),
                        raw: self.display_name(*raw),
                        expected,
                        found: args.len(),
                    });
                }
                for arg in args {
                    self.validate_field_type(batch, decl, field, arg)?;
                }
                Ok(())
            }
            DeclaredType::Array(component) => {
                self.validate_field_type(batch, decl, field, component)
            }
            DeclaredType::TypeVar(name) => {
                if decl.type_params.iter().any(|param| param == name) {
                    Ok(())
                } else {
                    Err(RegistryError::UndeclaredTypeVariable {
                        class: decl.name.clone(),
                        field: field.name.clone(),
                        name: name.clone(),
                    })
                }
            }
            // Wildcards are legal to declare; resolution is what refuses them.
            DeclaredType::Wildcard(WildcardBound::Unbounded) => Ok(()),
            DeclaredType::Wildcard(WildcardBound::Extends(bound))
            | DeclaredType::Wildcard(WildcardBound::Super(bound)) => {
                self.validate_field_type(batch, decl, field, bound)
            }
        }
    }

    /// Returns the declared type-parameter count of a class referenced from `decl`.
    fn expect_class(
        &self,
        batch: &HashMap<ClassId, usize>,
        decl: &ClassDecl,
        field: &FieldDecl,
        id: ClassId,
    ) -> Result<usize, RegistryError> {
        if let Some(count) = batch.get(&id) {
            return Ok(*count);
        }
        match self.class(id) {
            Some(def) => Ok(def.type_param_count()),
            None => Err(RegistryError::UnknownClass {
                class: decl.name.clone(),
                field: field.name.clone(),
                referenced: self.display_name(id),
            }),
        }
    }

    fn display_name(&self, id: ClassId) -> String {
        self.class_name(id)
            .map(str::to_string)
            .unwrap_or_else(|| format!("{id:?}"))
    }
}

fn validate_decl_shape(decl: &ClassDecl) -> Result<(), RegistryError> {
    let mut seen = HashSet::new();
    for param in &decl.type_params {
        if !seen.insert(param.as_str()) {
            return Err(RegistryError::DuplicateTypeParameter {
                class: decl.name.clone(),
                name: param.clone(),
            });
        }
    }

    let mut seen = HashSet::new();
    for field in &decl.fields {
        if !seen.insert(field.name.as_str()) {
            return Err(RegistryError::DuplicateField {
                class: decl.name.clone(),
                field: field.name.clone(),
            });
        }
    }
    Ok(())
}

impl ClassEnv for ClassRegistry {
    fn class(&self, id: ClassId) -> Option<&ClassDef> {
        self.defs.get(id.index()).and_then(Option::as_ref)
    }

    fn class_name(&self, id: ClassId) -> Option<&str> {
        self.names.get(id.index()).map(String::as_str)
    }

    /// Resolves `name` the way Java source would for a single-file model: exact binary name
    /// first, then the implicit `java.lang` import, then an unambiguous simple name.
    fn lookup_class(&self, name: &str) -> Option<ClassId> {
        if let Some(id) = self.class_id(name) {
            return Some(id);
        }
        if name.contains('.') {
            return None;
        }
        if let Some(id) = self.class_id(&format!("java.lang.{name}")) {
            return Some(id);
        }

        let suffix = format!(".{name}");
        let mut matches = self
            .names
            .iter()
            .enumerate()
            .filter(|(_, candidate)| candidate.ends_with(&suffix));
        let (idx, _) = matches.next()?;
        if matches.next().is_some() {
            return None;
        }
        Some(ClassId(idx as u32))
    }
}

const JAVA_BUILTINS: &[(&str, &[&str])] = &[
    ("java.lang.Object", &[]),
    ("java.lang.String", &[]),
    ("java.lang.Boolean", &[]),
    ("java.lang.Byte", &[]),
    ("java.lang.Short", &[]),
    ("java.lang.Character", &[]),
    ("java.lang.Integer", &[]),
    ("java.lang.Long", &[]),
    ("java.lang.Float", &[]),
    ("java.lang.Double", &[]),
    ("java.math.BigInteger", &[]),
    ("java.math.BigDecimal", &[]),
    ("java.util.List", &["E"]),
    ("java.util.Set", &["E"]),
    ("java.util.TreeSet", &["E"]),
    ("java.util.Map", &["K", "V"]),
    ("java.util.SortedMap", &["K", "V"]),
];
