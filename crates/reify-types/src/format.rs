//! Java-like rendering of descriptors and declared types for diagnostics and CLI output.

use std::fmt;

use crate::{ClassEnv, ClassId, ConcreteType, DeclaredType, TypeDescriptor, WildcardBound};

pub fn format_descriptor(env: &dyn ClassEnv, ty: &TypeDescriptor) -> String {
    DescriptorDisplay { env, ty }.to_string()
}

pub fn format_declared(env: &dyn ClassEnv, ty: &DeclaredType) -> String {
    DeclaredDisplay { env, ty }.to_string()
}

pub struct DescriptorDisplay<'a> {
    env: &'a dyn ClassEnv,
    ty: &'a TypeDescriptor,
}

impl TypeDescriptor {
    pub fn display<'a>(&'a self, env: &'a dyn ClassEnv) -> DescriptorDisplay<'a> {
        DescriptorDisplay { env, ty: self }
    }
}

impl fmt::Display for DescriptorDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.ty {
            TypeDescriptor::Concrete(ConcreteType::Primitive(prim)) => f.write_str(prim.keyword()),
            TypeDescriptor::Concrete(ConcreteType::Class(id)) => write_class(f, self.env, *id),
            TypeDescriptor::Parameterized(p) => {
                write_class(f, self.env, p.raw_type)?;
                f.write_str("<")?;
                for (idx, arg) in p.type_arguments.iter().enumerate() {
                    if idx > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", arg.display(self.env))?;
                }
                f.write_str(">")
            }
            TypeDescriptor::Array(a) => write!(f, "{}[]", a.component_type.display(self.env)),
        }
    }
}

struct DeclaredDisplay<'a> {
    env: &'a dyn ClassEnv,
    ty: &'a DeclaredType,
}

impl DeclaredDisplay<'_> {
    fn nested<'b>(&'b self, ty: &'b DeclaredType) -> DeclaredDisplay<'b> {
        DeclaredDisplay { env: self.env, ty }
    }
}

impl fmt::Display for DeclaredDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.ty {
            DeclaredType::Primitive(prim) => f.write_str(prim.keyword()),
            DeclaredType::Class(id) => write_class(f, self.env, *id),
            DeclaredType::Parameterized { raw, args } => {
                write_class(f, self.env, *raw)?;
                f.write_str("<")?;
                for (idx, arg) in args.iter().enumerate() {
                    if idx > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", self.nested(arg))?;
                }
                f.write_str(">")
            }
            DeclaredType::Array(component) => write!(f, "{}[]", self.nested(component)),
            DeclaredType::TypeVar(name) => f.write_str(name),
            DeclaredType::Wildcard(WildcardBound::Unbounded) => f.write_str("?"),
            DeclaredType::Wildcard(WildcardBound::Extends(bound)) => {
                write!(f, "? extends {}", self.nested(bound))
            }
            DeclaredType::Wildcard(WildcardBound::Super(bound)) => {
                write!(f, "? super {}", self.nested(bound))
            }
        }
    }
}

fn write_class(f: &mut fmt::Formatter<'_>, env: &dyn ClassEnv, id: ClassId) -> fmt::Result {
    match env.class_name(id) {
        Some(name) => f.write_str(name),
        None => write!(f, "<unknown class #{}>", id.to_raw()),
    }
}
