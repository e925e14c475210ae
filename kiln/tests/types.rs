use std::rc::Rc;

use kiln::{ErrorKind, Model, TypeExpr, TypeRegistry};
use serde_json::json;

#[test]
fn test_parse_named_types() {
    let ty: TypeExpr = "Repository".parse().unwrap();
    assert_eq!(ty, TypeExpr::named("Repository"));

    let ty: TypeExpr = "Result<User, Error>".parse().unwrap();
    assert_eq!(
        ty,
        TypeExpr::Named {
            name: "Result".to_string(),
            args: vec![TypeExpr::named("User"), TypeExpr::named("Error")],
        }
    );
}

#[test]
fn test_parse_well_known_types() {
    let ty: TypeExpr = "Set<Plugin>".parse().unwrap();
    assert_eq!(ty, TypeExpr::set_of(TypeExpr::named("Plugin")));

    let ty: TypeExpr = "Map<string, Handler>".parse().unwrap();
    assert_eq!(
        ty,
        TypeExpr::map_of(TypeExpr::named("string"), TypeExpr::named("Handler"))
    );

    let ty: TypeExpr = "Lazy<Database>".parse().unwrap();
    assert!(ty.is_lazy());
    assert_eq!(ty.as_plain_name(), None);
}

#[test]
fn test_parse_functions_and_tuples() {
    let ty: TypeExpr = "fn(Request, number) -> Session".parse().unwrap();
    assert_eq!(
        ty,
        TypeExpr::Function {
            params: vec![TypeExpr::named("Request"), TypeExpr::named("number")],
            ret: Box::new(TypeExpr::named("Session")),
        }
    );

    let ty: TypeExpr = "fn() -> Child".parse().unwrap();
    assert_eq!(
        ty,
        TypeExpr::Function {
            params: vec![],
            ret: Box::new(TypeExpr::named("Child")),
        }
    );

    let ty: TypeExpr = "(string, Handler)".parse().unwrap();
    assert_eq!(
        ty,
        TypeExpr::Tuple(vec![TypeExpr::named("string"), TypeExpr::named("Handler")])
    );

    // Single element parentheses only group.
    let ty: TypeExpr = "(Handler)".parse().unwrap();
    assert_eq!(ty, TypeExpr::named("Handler"));
}

#[test]
fn test_display_matches_grammar() {
    for input in [
        "Repository",
        "Set<Plugin>",
        "Map<string, Set<Handler>>",
        "Iterable<number>",
        "Lazy<Database>",
        "(string, Handler)",
        "fn(Request) -> Session",
        "Option<User>",
    ] {
        let ty: TypeExpr = input.parse().unwrap();
        assert_eq!(ty.to_string(), input);
    }
}

#[test]
fn test_parse_errors() {
    for input in ["", "Set<A, B>", "Map<A>", "Lazy<>", "Foo<Bar", "fn(A) Bar", "A B"] {
        let err = input.parse::<TypeExpr>().unwrap_err();
        assert_eq!(err.input, input);
    }
}

#[test]
fn test_malformed_type_in_model() {
    let err = Model::from_json(json!({
        "components": [{
            "name": "App",
            "roots": [{ "name": "items", "type": "Set<A, B>" }]
        }]
    }))
    .unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::Parse { .. }));
    assert_eq!(err.component, None);
}

#[test]
fn test_interning_identity() {
    let registry = TypeRegistry::new();
    let foo = TypeExpr::named("Foo");

    let a = registry.intern(&foo, None, None);
    let b = registry.intern(&foo, None, None);
    assert_eq!(a, b);
    assert!(Rc::ptr_eq(&registry.get(a), &registry.get(b)));
    assert_eq!(registry.len(), 1);

    let qualified = registry.intern(&foo, Some("Primary"), None);
    assert_ne!(a, qualified);
    assert_eq!(registry.display(qualified), "@Primary Foo");

    let discriminator = registry.next_discriminator();
    let node = registry.intern(&foo, None, Some(discriminator));
    assert_ne!(a, node);
    assert_eq!(registry.display(node), format!("Foo#{discriminator}"));
    assert_eq!(registry.len(), 3);
}

#[test]
fn test_lookup_does_not_intern() {
    let registry = TypeRegistry::new();
    let foo = TypeExpr::named("Foo");
    assert_eq!(registry.lookup(&foo, None, None), None);
    assert!(registry.is_empty());

    let key = registry.intern(&foo, None, None);
    assert_eq!(registry.lookup(&foo, None, None), Some(key));
}

#[test]
fn test_requalify_keeps_qualifier() {
    let registry = TypeRegistry::new();
    let lazy: TypeExpr = "Lazy<Foo>".parse().unwrap();
    let key = registry.intern(&lazy, Some("Primary"), None);
    let inner = registry.requalify(key, &TypeExpr::named("Foo"));
    assert_eq!(registry.display(inner), "@Primary Foo");
}
