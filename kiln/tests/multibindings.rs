use kiln::{
    ErrorKind, MapEntryKey, Model, Provider, ProviderKind, Resolution, ResolverConfig,
    SetContributionKind, resolve,
};
use serde_json::{Value, json};

fn resolve_json(value: Value) -> kiln::Result<Resolution> {
    let model = Model::from_json(value)?;
    resolve(&model, &ResolverConfig::default())
}

fn app(modules: &[&str], roots: Value) -> Value {
    json!({ "name": "App", "modules": modules, "roots": roots })
}

#[test]
fn test_set_contributions_accumulate() {
    let resolution = resolve_json(json!({
        "modules": [{
            "name": "Numbers",
            "provides": [
                { "name": "one", "type": "number", "multibinding": "into_set" },
                { "name": "two", "type": "number", "multibinding": "into_set" },
                { "name": "more", "type": "Set<number>", "multibinding": "elements_into_set" }
            ]
        }],
        "components": [app(&["Numbers"], json!([{ "name": "numbers", "type": "Set<number>" }]))]
    }))
    .unwrap();

    let app = resolution.component("App").unwrap();
    let key = resolution.key("Set<number>", None).unwrap();
    let Some(Provider::SetMultibinding(set)) = app.provider(key) else {
        panic!("expected a set multibinding");
    };
    let kinds: Vec<_> = set.contributions.iter().map(|c| c.kind).collect();
    assert_eq!(
        kinds,
        vec![
            SetContributionKind::Element,
            SetContributionKind::Element,
            SetContributionKind::Elements
        ]
    );
    let origins: Vec<_> = set.contributions.iter().map(|c| c.origin.as_str()).collect();
    assert_eq!(origins, vec!["Numbers.one", "Numbers.two", "Numbers.more"]);
    assert!(!set.extends_parent);
    assert_eq!(resolution.display(set.element), "number");

    // Every contribution is its own provider node.
    assert_eq!(app.resolved.len(), 4);
    for contribution in &set.contributions {
        assert_eq!(
            app.provider(contribution.dependency).map(|p| p.kind()),
            Some(ProviderKind::ProvidesMethod)
        );
    }
}

#[test]
fn test_qualified_sets_are_separate() {
    let resolution = resolve_json(json!({
        "modules": [{
            "name": "Numbers",
            "provides": [
                { "name": "one", "type": "number", "multibinding": "into_set" },
                { "name": "two", "type": "number", "qualifier": "Odd", "multibinding": "into_set" }
            ]
        }],
        "components": [app(&["Numbers"], json!([
            { "name": "all", "type": "Set<number>" },
            { "name": "odd", "type": "Set<number>", "qualifier": "Odd" }
        ]))]
    }))
    .unwrap();

    let app = resolution.component("App").unwrap();
    for qualifier in [None, Some("Odd")] {
        let key = resolution.key("Set<number>", qualifier).unwrap();
        let Some(Provider::SetMultibinding(set)) = app.provider(key) else {
            panic!("expected a set multibinding for {qualifier:?}");
        };
        assert_eq!(set.contributions.len(), 1);
    }
}

#[test]
fn test_elements_contribution_must_be_collection() {
    let err = resolve_json(json!({
        "modules": [{
            "name": "Numbers",
            "provides": [{ "name": "bad", "type": "number", "multibinding": "elements_into_set" }]
        }],
        "components": [app(&["Numbers"], json!([]))]
    }))
    .err()
    .unwrap();
    let ErrorKind::InvalidBinding { binding, .. } = err.kind() else {
        panic!("unexpected error: {err}");
    };
    assert_eq!(binding, "Numbers.bad");
}

#[test]
fn test_map_contributions() {
    let resolution = resolve_json(json!({
        "types": [{ "name": "Handler", "abstract": true }],
        "modules": [{
            "name": "Routes",
            "provides": [
                {
                    "name": "index",
                    "type": "Handler",
                    "multibinding": "into_map",
                    "map_key": { "type": "string", "value": "/" }
                },
                { "name": "health", "type": "(string, Handler)", "multibinding": "into_map" }
            ]
        }],
        "components": [app(&["Routes"], json!([{ "name": "routes", "type": "Map<string, Handler>" }]))]
    }))
    .unwrap();

    let app = resolution.component("App").unwrap();
    let key = resolution.key("Map<string, Handler>", None).unwrap();
    let Some(Provider::MapMultibinding(map)) = app.provider(key) else {
        panic!("expected a map multibinding");
    };
    assert_eq!(resolution.display(map.key_type), "string");
    assert_eq!(resolution.display(map.value_type), "Handler");
    let keys: Vec<_> = map.contributions.iter().map(|c| c.key.clone()).collect();
    assert_eq!(
        keys,
        vec![MapEntryKey::Literal("/".to_string()), MapEntryKey::Tuple]
    );
    assert_eq!(app.resolved.len(), 3);
}

#[test]
fn test_map_contribution_needs_key() {
    let err = resolve_json(json!({
        "modules": [{
            "name": "Routes",
            "provides": [{ "name": "index", "type": "Handler", "multibinding": "into_map" }]
        }],
        "components": [app(&["Routes"], json!([]))]
    }))
    .err()
    .unwrap();
    assert_eq!(err.tag(), "InvalidBinding");

    let err = resolve_json(json!({
        "modules": [{
            "name": "Routes",
            "provides": [{
                "name": "index",
                "type": "(string, Handler, number)",
                "multibinding": "into_map"
            }]
        }],
        "components": [app(&["Routes"], json!([]))]
    }))
    .err()
    .unwrap();
    let ErrorKind::InvalidBinding { reason, .. } = err.kind() else {
        panic!("unexpected error: {err}");
    };
    assert!(reason.contains("3 elements"));
}

#[test]
fn test_binds_contribute_to_set() {
    let resolution = resolve_json(json!({
        "types": [
            { "name": "Plugin", "abstract": true },
            { "name": "AuthPlugin", "supertypes": ["Plugin"], "constructor": {} }
        ],
        "modules": [{
            "name": "Plugins",
            "binds": [{
                "name": "auth",
                "type": "Plugin",
                "params": [{ "name": "plugin", "type": "AuthPlugin" }],
                "multibinding": "into_set"
            }]
        }],
        "components": [app(&["Plugins"], json!([{ "name": "plugins", "type": "Set<Plugin>" }]))]
    }))
    .unwrap();

    let app = resolution.component("App").unwrap();
    let key = resolution.key("Set<Plugin>", None).unwrap();
    let Some(Provider::SetMultibinding(set)) = app.provider(key) else {
        panic!("expected a set multibinding");
    };
    assert_eq!(set.contributions.len(), 1);
    assert_eq!(resolution.display(set.contributions[0].dependency), "AuthPlugin");
    assert_eq!(
        app.provider(set.contributions[0].dependency).map(|p| p.kind()),
        Some(ProviderKind::InjectableConstructor)
    );
}

#[test]
fn test_binds_cannot_contribute_elements() {
    let err = resolve_json(json!({
        "types": [
            { "name": "Plugin", "abstract": true },
            { "name": "AuthPlugin", "supertypes": ["Plugin"], "constructor": {} }
        ],
        "modules": [{
            "name": "Plugins",
            "binds": [{
                "name": "auth",
                "type": "Plugin",
                "params": [{ "name": "plugin", "type": "AuthPlugin" }],
                "multibinding": "elements_into_set"
            }]
        }],
        "components": [app(&["Plugins"], json!([]))]
    }))
    .err()
    .unwrap();
    assert_eq!(err.tag(), "InvalidBinding");
}

#[test]
fn test_multibinding_conflicts_with_explicit_provider() {
    let err = resolve_json(json!({
        "modules": [{
            "name": "Numbers",
            "provides": [
                { "name": "one", "type": "number", "multibinding": "into_set" },
                { "name": "all", "type": "Set<number>" }
            ]
        }],
        "components": [app(&["Numbers"], json!([]))]
    }))
    .err()
    .unwrap();
    let ErrorKind::DuplicateProviders { ty, candidates } = err.kind() else {
        panic!("unexpected error: {err}");
    };
    assert_eq!(ty, "Set<number>");
    assert_eq!(candidates.len(), 2);
}

#[test]
fn test_child_set_extends_parent() {
    let resolution = resolve_json(json!({
        "modules": [
            {
                "name": "ParentNumbers",
                "provides": [{ "name": "one", "type": "number", "multibinding": "into_set" }]
            },
            {
                "name": "ChildNumbers",
                "provides": [{ "name": "two", "type": "number", "multibinding": "into_set" }]
            }
        ],
        "components": [
            {
                "name": "App",
                "modules": ["ParentNumbers"],
                "subcomponents": ["Child"],
                "roots": [{ "name": "child", "type": "fn() -> Child" }]
            },
            {
                "name": "Child",
                "subcomponent": true,
                "modules": ["ChildNumbers"],
                "roots": [{ "name": "numbers", "type": "Set<number>" }]
            }
        ]
    }))
    .unwrap();

    let key = resolution.key("Set<number>", None).unwrap();
    let child = resolution.component("Child").unwrap();
    let Some(Provider::SetMultibinding(set)) = child.provider(key) else {
        panic!("expected a set multibinding in the child");
    };
    assert!(set.extends_parent);
    assert_eq!(set.contributions.len(), 1);
    assert!(child.delegated.iter().any(|d| d.key == key));

    // The parent resolves its own contributions for the child to extend.
    let app = resolution.component("App").unwrap();
    let Some(Provider::SetMultibinding(set)) = app.provider(key) else {
        panic!("expected a set multibinding in the parent");
    };
    assert!(!set.extends_parent);
    assert_eq!(set.contributions[0].origin, "ParentNumbers.one");
}
