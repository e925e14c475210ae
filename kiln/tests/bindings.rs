use kiln::{
    BindingResolver, Error, ErrorKind, InstalledModules, Model, ModelIndex, ProviderKind,
    ResolverConfig, TypeExpr, TypeRegistry, resolve,
};
use serde_json::{Value, json};

fn binds(name: &str, ty: &str, param: &str) -> Value {
    json!({ "name": name, "type": ty, "params": [{ "name": "value", "type": param }] })
}

fn hierarchy() -> Value {
    json!([
        { "name": "A", "abstract": true },
        { "name": "B", "abstract": true, "supertypes": ["A"] },
        { "name": "C", "supertypes": ["B"], "constructor": {} },
        { "name": "Unrelated", "constructor": {} }
    ])
}

fn model(binds: Vec<Value>) -> Model {
    Model::from_json(json!({
        "types": hierarchy(),
        "modules": [{ "name": "Bindings", "binds": binds }],
        "components": [{ "name": "App", "modules": ["Bindings"] }]
    }))
    .unwrap()
}

fn build(model: &Model) -> Result<(TypeRegistry, BindingResolver), Error> {
    let index = ModelIndex::new(model)?;
    let registry = TypeRegistry::new();
    let component = index.component("App").unwrap();
    let installed = InstalledModules::collect(&index, component)?;
    let resolver = BindingResolver::new("App", &index, &registry, installed.bindings())?;
    Ok((registry, resolver))
}

#[test]
fn test_resolve_follows_chain() {
    let model = model(vec![binds("bindA", "A", "B"), binds("bindB", "B", "C")]);
    let (registry, resolver) = build(&model).unwrap();
    assert_eq!(resolver.len(), 2);

    let a = registry.intern(&TypeExpr::named("A"), None, None);
    let c = registry.intern(&TypeExpr::named("C"), None, None);
    assert_eq!(resolver.resolve(a), c);
    assert_eq!(resolver.resolve(resolver.resolve(a)), resolver.resolve(a));
    assert_eq!(resolver.resolve(c), c);
    assert!(resolver.is_bound(a));
    assert!(!resolver.is_bound(c));
}

#[test]
fn test_binding_cycle() {
    let model = Model::from_json(json!({
        "types": [
            { "name": "A", "abstract": true, "supertypes": ["B"] },
            { "name": "B", "abstract": true, "supertypes": ["A"] }
        ],
        "modules": [{
            "name": "Bindings",
            "binds": [binds("bindA", "A", "B"), binds("bindB", "B", "A")]
        }],
        "components": [{ "name": "App", "modules": ["Bindings"] }]
    }))
    .unwrap();
    let err = build(&model).err().unwrap();
    assert_eq!(
        err.kind(),
        &ErrorKind::BindingCycle {
            chain: vec!["A".to_string(), "B".to_string(), "A".to_string()],
        }
    );
    assert_eq!(err.component.as_deref(), Some("App"));
}

#[test]
fn test_binding_must_be_abstract() {
    let mut decl = binds("bindA", "A", "C");
    decl["abstract"] = json!(false);
    let err = build(&model(vec![decl])).err().unwrap();
    let ErrorKind::InvalidBinding { binding, reason } = err.kind() else {
        panic!("unexpected error: {err}");
    };
    assert_eq!(binding, "Bindings.bindA");
    assert!(reason.contains("abstract"));
}

#[test]
fn test_binding_needs_single_parameter() {
    let decl = json!({
        "name": "bindA",
        "type": "A",
        "params": [{ "name": "x", "type": "B" }, { "name": "y", "type": "C" }]
    });
    let err = build(&model(vec![decl])).err().unwrap();
    assert_eq!(err.tag(), "InvalidBinding");

    let decl = json!({ "name": "bindA", "type": "A" });
    let err = build(&model(vec![decl])).err().unwrap();
    assert_eq!(err.tag(), "InvalidBinding");
}

#[test]
fn test_binding_to_itself() {
    let err = build(&model(vec![binds("bindA", "A", "A")])).err().unwrap();
    assert_eq!(err.tag(), "InvalidBinding");
}

#[test]
fn test_binding_requires_assignable_parameter() {
    let err = build(&model(vec![binds("bindA", "A", "Unrelated")]))
        .err()
        .unwrap();
    let ErrorKind::InvalidBinding { reason, .. } = err.kind() else {
        panic!("unexpected error: {err}");
    };
    assert_eq!(reason, "Unrelated is not assignable to A");
}

#[test]
fn test_duplicate_bindings() {
    let err = build(&model(vec![binds("first", "A", "B"), binds("second", "A", "C")]))
        .err()
        .unwrap();
    assert_eq!(
        err.kind(),
        &ErrorKind::DuplicateBindings {
            ty: "A".to_string(),
            candidates: vec!["Bindings.first".to_string(), "Bindings.second".to_string()],
        }
    );
}

#[test]
fn test_qualified_bindings_are_distinct() {
    let mut primary = binds("primary", "A", "C");
    primary["qualifier"] = json!("Primary");
    let model = model(vec![primary, binds("plain", "A", "B")]);
    let (registry, resolver) = build(&model).unwrap();

    let a = TypeExpr::named("A");
    let qualified = registry.intern(&a, Some("Primary"), None);
    let plain = registry.intern(&a, None, None);
    assert_eq!(registry.display(resolver.resolve(qualified)), "C");
    assert_eq!(registry.display(resolver.resolve(plain)), "B");
}

#[test]
fn test_bound_root_resolves_implementation() {
    let model = Model::from_json(json!({
        "types": hierarchy(),
        "modules": [{ "name": "Bindings", "binds": [binds("bindA", "A", "C")] }],
        "components": [{
            "name": "App",
            "modules": ["Bindings"],
            "roots": [{ "name": "a", "type": "A" }]
        }]
    }))
    .unwrap();
    let resolution = resolve(&model, &ResolverConfig::default()).unwrap();
    let app = resolution.component("App").unwrap();
    assert_eq!(app.resolved.len(), 1);

    let c = resolution.key("C", None).unwrap();
    assert_eq!(
        app.provider(c).map(|p| p.kind()),
        Some(ProviderKind::InjectableConstructor)
    );
    let a = resolution.key("A", None).unwrap();
    assert!(app.provider(a).is_none());
}

#[test]
fn test_child_cannot_rebind_parent_binding() {
    let model = Model::from_json(json!({
        "types": hierarchy(),
        "modules": [
            { "name": "ParentBindings", "binds": [binds("bindA", "A", "B")] },
            { "name": "ChildBindings", "binds": [binds("rebindA", "A", "C")] }
        ],
        "components": [
            {
                "name": "App",
                "modules": ["ParentBindings"],
                "subcomponents": ["Child"],
                "roots": [{ "name": "child", "type": "fn() -> Child" }]
            },
            { "name": "Child", "subcomponent": true, "modules": ["ChildBindings"] }
        ]
    }))
    .unwrap();
    let err = resolve(&model, &ResolverConfig::default()).err().unwrap();
    assert_eq!(err.tag(), "DuplicateBindings");
    assert_eq!(err.component.as_deref(), Some("Child"));
}

#[test]
fn test_child_binding_closes_parent_cycle() {
    let model = Model::from_json(json!({
        "types": [
            { "name": "A", "abstract": true, "supertypes": ["B"] },
            { "name": "B", "abstract": true, "supertypes": ["A"] }
        ],
        "modules": [
            { "name": "ParentBindings", "binds": [binds("bindA", "A", "B")] },
            { "name": "ChildBindings", "binds": [binds("bindB", "B", "A")] }
        ],
        "components": [
            {
                "name": "App",
                "modules": ["ParentBindings"],
                "subcomponents": ["Child"],
                "roots": [{ "name": "child", "type": "fn() -> Child" }]
            },
            { "name": "Child", "subcomponent": true, "modules": ["ChildBindings"] }
        ]
    }))
    .unwrap();
    let err = resolve(&model, &ResolverConfig::default()).err().unwrap();
    assert_eq!(
        err.kind(),
        &ErrorKind::BindingCycle {
            chain: vec!["A".to_string(), "B".to_string(), "A".to_string()],
        }
    );
    assert_eq!(err.component.as_deref(), Some("Child"));
}
