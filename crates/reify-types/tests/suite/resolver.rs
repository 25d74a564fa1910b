use reify_types::{
    concretize, format_descriptor, parse_declared_type, ClassDecl, ClassEnv, ClassRegistry,
    DeclaredType, PrimitiveType, ResolveError, Resolver, TypeDescriptor, TypeScope,
};

use pretty_assertions::assert_eq;

use super::Fixture;

fn field_types(fx: &Fixture, resolver: &Resolver<'_>) -> Vec<String> {
    resolver
        .resolve_all()
        .unwrap()
        .into_iter()
        .map(|(field, ty)| format!("{}: {}", field.name(), format_descriptor(&fx.registry, &ty)))
        .collect()
}

fn string_integer_resolver(fx: &Fixture) -> Resolver<'_> {
    Resolver::new(
        &fx.registry,
        fx.with_type_args,
        vec![
            TypeDescriptor::class(fx.string),
            TypeDescriptor::class(fx.integer),
        ],
    )
    .unwrap()
}

#[test]
fn no_type_arguments_resolves_primitives() {
    let fx = Fixture::new();
    let resolver = Resolver::for_class(&fx.registry, fx.without_type_args).unwrap();
    let field = &resolver.declared_fields()[0];
    assert_eq!(
        resolver.resolve_type(field).unwrap(),
        TypeDescriptor::primitive(PrimitiveType::Int)
    );
}

#[test]
fn get_type_of_non_generic_class_is_concrete() {
    let fx = Fixture::new();
    let resolver = Resolver::new(&fx.registry, fx.without_type_args, vec![]).unwrap();
    assert_eq!(resolver.get_type(), TypeDescriptor::class(fx.without_type_args));
}

#[test]
fn get_type_of_generic_class_keeps_argument_order() {
    let fx = Fixture::new();
    let resolver = string_integer_resolver(&fx);
    let ty = resolver.get_type();
    assert_eq!(ty.raw_type(), Some(fx.with_type_args));
    assert_eq!(
        ty.type_arguments(),
        &[
            TypeDescriptor::class(fx.string),
            TypeDescriptor::class(fx.integer)
        ]
    );
}

#[test]
fn omitted_type_arguments_fail_with_arity_mismatch() {
    let fx = Fixture::new();
    let err = Resolver::for_class(&fx.registry, fx.with_type_args).unwrap_err();
    assert_eq!(
        err,
        ResolveError::ArityMismatch {
            class: "com.example.json.TestClassWithTypeArguments".to_string(),
            expected: 2,
            found: 0,
        }
    );
    assert!(err
        .to_string()
        .contains("actualTypeArguments must be same length as class' type parameters"));
}

#[test]
fn explicit_empty_type_arguments_fail_the_same_way() {
    let fx = Fixture::new();
    let omitted = Resolver::for_class(&fx.registry, fx.with_type_args).unwrap_err();
    let empty = Resolver::new(&fx.registry, fx.with_type_args, vec![]).unwrap_err();
    assert_eq!(omitted, empty);
}

#[test]
fn any_other_argument_count_mismatch_fails() {
    let fx = Fixture::new();
    let string = TypeDescriptor::class(fx.string);

    let err = Resolver::new(&fx.registry, fx.with_type_args, vec![string.clone()]).unwrap_err();
    assert!(matches!(
        err,
        ResolveError::ArityMismatch {
            expected: 2,
            found: 1,
            ..
        }
    ));

    let err = Resolver::new(
        &fx.registry,
        fx.with_type_args,
        vec![string.clone(), string.clone(), string.clone()],
    )
    .unwrap_err();
    assert!(matches!(
        err,
        ResolveError::ArityMismatch {
            expected: 2,
            found: 3,
            ..
        }
    ));

    // Non-generic classes accept only an empty list.
    let err = Resolver::new(&fx.registry, fx.without_type_args, vec![string]).unwrap_err();
    assert!(matches!(
        err,
        ResolveError::ArityMismatch {
            expected: 0,
            found: 1,
            ..
        }
    ));
}

#[test]
fn primitives_are_returned_unchanged_regardless_of_binding() {
    let fx = Fixture::new();
    let resolver = string_integer_resolver(&fx);
    assert_eq!(
        resolver.resolve_field("intType").unwrap(),
        TypeDescriptor::primitive(PrimitiveType::Int)
    );
}

#[test]
fn type_variables_resolve_to_bound_arguments() {
    let fx = Fixture::new();
    let resolver = string_integer_resolver(&fx);
    assert_eq!(
        resolver.resolve_field("tType").unwrap(),
        TypeDescriptor::class(fx.string)
    );
    assert_eq!(
        resolver.resolve_field("uType").unwrap(),
        TypeDescriptor::class(fx.integer)
    );
}

#[test]
fn parameterized_type_with_one_argument() {
    let fx = Fixture::new();
    let resolver = string_integer_resolver(&fx);
    assert_eq!(
        resolver.resolve_field("nestedTType").unwrap(),
        TypeDescriptor::parameterized(fx.one, vec![TypeDescriptor::class(fx.string)])
    );
}

#[test]
fn parameterized_type_with_two_arguments() {
    let fx = Fixture::new();
    let resolver = string_integer_resolver(&fx);
    assert_eq!(
        resolver.resolve_field("nestedTUTypes").unwrap(),
        TypeDescriptor::parameterized(
            fx.two,
            vec![
                TypeDescriptor::class(fx.string),
                TypeDescriptor::class(fx.integer)
            ]
        )
    );
}

#[test]
fn nested_parameterized_types_swap_arguments() {
    let fx = Fixture::new();
    let resolver = string_integer_resolver(&fx);
    let resolved = resolver.resolve_field("doubleNestedTypes").unwrap();
    assert_eq!(
        resolved,
        TypeDescriptor::parameterized(
            fx.one,
            vec![TypeDescriptor::parameterized(
                fx.two,
                vec![
                    TypeDescriptor::class(fx.integer),
                    TypeDescriptor::class(fx.string)
                ]
            )]
        )
    );

    let nested = &resolved.type_arguments()[0];
    assert_eq!(nested.raw_type(), Some(fx.two));
    assert_eq!(nested.type_arguments().len(), 2);
}

#[test]
fn array_of_type_variable() {
    let fx = Fixture::new();
    let resolver = string_integer_resolver(&fx);
    let resolved = resolver.resolve_field("tArray").unwrap();
    assert_eq!(resolved, TypeDescriptor::array(TypeDescriptor::class(fx.string)));
    assert_eq!(
        resolved.component_type(),
        Some(&TypeDescriptor::class(fx.string))
    );
}

#[test]
fn array_of_nested_parameterized_type() {
    let fx = Fixture::new();
    let resolver = string_integer_resolver(&fx);
    assert_eq!(
        resolver.resolve_field("arrayOfNestedUTypes").unwrap(),
        TypeDescriptor::array(TypeDescriptor::parameterized(
            fx.one,
            vec![TypeDescriptor::class(fx.integer)]
        ))
    );
}

#[test]
fn recursive_generic_class_resolves_to_itself_under_same_binding() {
    let fx = Fixture::new();
    let resolver = Resolver::new(
        &fx.registry,
        fx.recursive,
        vec![TypeDescriptor::class(fx.string)],
    )
    .unwrap();

    let fields = resolver.declared_fields();
    assert_eq!(
        resolver.resolve_type(&fields[0]).unwrap(),
        TypeDescriptor::class(fx.string)
    );
    let next = resolver.resolve_type(&fields[1]).unwrap();
    assert_eq!(
        next,
        TypeDescriptor::parameterized(fx.recursive, vec![TypeDescriptor::class(fx.string)])
    );
    assert_eq!(next, resolver.get_type());
}

#[test]
fn wildcards_are_rejected() {
    let fx = Fixture::new();
    let resolver = Resolver::new(
        &fx.registry,
        fx.with_wildcards,
        vec![TypeDescriptor::class(fx.string)],
    )
    .unwrap();

    let err = resolver
        .resolve_type(&resolver.declared_fields()[0])
        .unwrap_err();
    assert!(matches!(err, ResolveError::UnsupportedType { .. }));
    assert!(err.to_string().contains("Wildcard types are not supported"));
}

#[test]
fn wildcards_nested_anywhere_are_rejected() {
    let mut fx = Fixture::new();
    let deep = super::define(
        &mut fx.registry,
        "com.example.json.Deep",
        &["T"],
        &[
            ("ok", "T"),
            ("deep", "OneParameterizedType<java.util.Map<T, List<?>>>[]"),
        ],
    );
    let resolver = Resolver::new(&fx.registry, deep, vec![TypeDescriptor::class(fx.string)]).unwrap();

    assert_eq!(
        resolver.resolve_field("ok").unwrap(),
        TypeDescriptor::class(fx.string)
    );
    assert!(matches!(
        resolver.resolve_field("deep"),
        Err(ResolveError::UnsupportedType { .. })
    ));
    // One bad field fails the batch too.
    assert!(resolver.resolve_all().is_err());
}

#[test]
fn fields_of_other_classes_are_refused() {
    let fx = Fixture::new();
    let resolver = string_integer_resolver(&fx);
    let foreign = &fx.registry.class(fx.with_wildcards).unwrap().fields()[0];

    let err = resolver.resolve_type(foreign).unwrap_err();
    assert_eq!(
        err,
        ResolveError::ForeignField {
            field: "listWithWildcards".to_string(),
            owner: "com.example.json.EnclosingWithWildcards".to_string(),
            class: "com.example.json.TestClassWithTypeArguments".to_string(),
        }
    );
    assert!(err
        .to_string()
        .contains("cannot resolve fields from other classes"));

    // The resolver stays usable afterwards.
    assert!(resolver.resolve_field("tType").is_ok());
}

#[test]
fn fields_from_another_registry_are_refused_even_when_ids_collide() {
    fn generic_class(name: &str, field: &str) -> (ClassRegistry, reify_types::ClassId) {
        let mut registry = ClassRegistry::with_java_lang();
        let id = registry
            .define_class(
                ClassDecl::new(name)
                    .type_param("T")
                    .field(field, DeclaredType::type_var("T")),
            )
            .unwrap();
        (registry, id)
    }

    let (a, foo) = generic_class("a.Foo", "x");
    let (b, bar) = generic_class("b.Bar", "y");
    assert_eq!(foo, bar);

    let string = a.class_id("java.lang.String").unwrap();
    let resolver = Resolver::new(&a, foo, vec![TypeDescriptor::class(string)]).unwrap();
    let other = &b.class(bar).unwrap().fields()[0];

    assert_eq!(
        resolver.resolve_type(other).unwrap_err(),
        ResolveError::ForeignField {
            field: "y".to_string(),
            owner: "b.Bar".to_string(),
            class: "a.Foo".to_string(),
        }
    );
    assert_eq!(
        resolver.resolve_field("x").unwrap(),
        TypeDescriptor::class(string)
    );

    // A clone is a separate registry too.
    let copy = a.clone();
    let copied = &copy.class(foo).unwrap().fields()[0];
    assert!(matches!(
        resolver.resolve_type(copied),
        Err(ResolveError::ForeignField { .. })
    ));
    let resolver = Resolver::new(&copy, foo, vec![TypeDescriptor::class(string)]).unwrap();
    assert!(resolver.resolve_type(copied).is_ok());
}

#[test]
fn unknown_field_names_are_reported() {
    let fx = Fixture::new();
    let resolver = string_integer_resolver(&fx);
    assert!(matches!(
        resolver.resolve_field("missing"),
        Err(ResolveError::UnknownField { .. })
    ));
}

#[test]
fn undefined_class_cannot_be_bound() {
    let mut fx = Fixture::new();
    let placeholder = fx.registry.intern_class_id("com.example.json.NotYetDefined");
    assert_eq!(
        Resolver::for_class(&fx.registry, placeholder).unwrap_err(),
        ResolveError::UnknownClass(placeholder)
    );
}

#[test]
fn binding_arguments_may_themselves_be_parameterized() {
    let fx = Fixture::new();
    let list_of_string =
        TypeDescriptor::parameterized(fx.list, vec![TypeDescriptor::class(fx.string)]);
    let resolver = Resolver::new(
        &fx.registry,
        fx.with_type_args,
        vec![list_of_string, TypeDescriptor::primitive(PrimitiveType::Long)],
    )
    .unwrap();

    assert_eq!(
        field_types(&fx, &resolver),
        vec![
            "intType: int",
            "tType: java.util.List<java.lang.String>",
            "uType: long",
            "nestedTType: com.example.json.OneParameterizedType<java.util.List<java.lang.String>>",
            "nestedTUTypes: com.example.json.TwoParameterizedTypes<java.util.List<java.lang.String>, long>",
            "doubleNestedTypes: com.example.json.OneParameterizedType<com.example.json.TwoParameterizedTypes<long, java.util.List<java.lang.String>>>",
            "tArray: java.util.List<java.lang.String>[]",
            "arrayOfNestedUTypes: com.example.json.OneParameterizedType<long>[]",
        ]
    );
}

#[test]
fn raw_use_of_generic_class_stays_concrete() {
    let mut fx = Fixture::new();
    let list = fx.list;
    let raw = fx
        .registry
        .define_class(ClassDecl::new("com.example.json.Raw").field("items", DeclaredType::Class(list)))
        .unwrap();
    let resolver = Resolver::for_class(&fx.registry, raw).unwrap();
    assert_eq!(
        resolver.resolve_field("items").unwrap(),
        TypeDescriptor::class(list)
    );
}

#[test]
fn resolver_is_shareable_across_threads() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<Resolver<'static>>();

    let fx = Fixture::new();
    let resolver = string_integer_resolver(&fx);
    let expected = resolver.resolve_all().unwrap();

    std::thread::scope(|scope| {
        let handles: Vec<_> = (0..4)
            .map(|_| scope.spawn(|| resolver.resolve_all().unwrap()))
            .collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap(), expected);
        }
    });
}

#[test]
fn concretize_accepts_only_fully_concrete_types() {
    let fx = Fixture::new();
    let scope = TypeScope::empty();

    let ty = parse_declared_type(&fx.registry, &scope, "List<String>[]").unwrap();
    assert_eq!(
        concretize(&fx.registry, &ty).unwrap(),
        TypeDescriptor::array(TypeDescriptor::parameterized(
            fx.list,
            vec![TypeDescriptor::class(fx.string)]
        ))
    );

    let wildcard = parse_declared_type(&fx.registry, &scope, "List<?>").unwrap();
    assert!(matches!(
        concretize(&fx.registry, &wildcard),
        Err(ResolveError::UnsupportedType { .. })
    ));

    assert_eq!(
        concretize(&fx.registry, &DeclaredType::type_var("T")),
        Err(ResolveError::UnboundTypeVariable {
            name: "T".to_string()
        })
    );

    // Arity is checked here since nothing was validated at registration.
    let bad = DeclaredType::parameterized(fx.list, vec![]);
    assert!(matches!(
        concretize(&fx.registry, &bad),
        Err(ResolveError::ArityMismatch { .. })
    ));
}
