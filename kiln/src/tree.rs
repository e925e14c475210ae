use std::collections::{HashMap, HashSet};

use crate::{BindingResolver, Dependency, DependencyGraph, TypeKey, TypeRegistry, canonical_key};

/// Renders the dependency paths of `graph` that end in a missing type.
///
/// Branches that resolve completely are pruned, so the output only shows how
/// each root reaches its missing leaves. A subtree shared by several paths is
/// expanded the first time and referenced afterwards:
///
/// ```text
/// greeter: Greeter
///   - Repository
///     - Database [missing]
/// admin: Admin
///   - Repository (see above)
/// ```
pub fn render_missing_tree(
    registry: &TypeRegistry,
    bindings: &BindingResolver,
    graph: &DependencyGraph,
    roots: &[(String, Dependency)],
) -> String {
    let mut renderer = MissingTree {
        registry,
        bindings,
        graph,
        missing: graph.missing.iter().map(|d| d.key).collect(),
        reaching: HashSet::new(),
        rendered: HashSet::new(),
        out: String::new(),
    };
    renderer.reaching = renderer.reaching_keys();
    for (label, root) in roots {
        let key = renderer.canonical(root.key);
        if !renderer.reaching.contains(&key) {
            continue;
        }
        let line = format!(
            "{label}: {}{}",
            registry.display(root.key),
            renderer.marker(key)
        );
        renderer.node(line, key, 0);
    }
    renderer.out
}

struct MissingTree<'a> {
    registry: &'a TypeRegistry,
    bindings: &'a BindingResolver,
    graph: &'a DependencyGraph,
    missing: HashSet<TypeKey>,
    /// Keys with a path to a missing leaf, the leaves included.
    reaching: HashSet<TypeKey>,
    /// Keys whose subtree was already printed.
    rendered: HashSet<TypeKey>,
    out: String,
}

impl MissingTree<'_> {
    fn canonical(&self, key: TypeKey) -> TypeKey {
        canonical_key(self.registry, self.bindings, key)
    }

    fn marker(&self, key: TypeKey) -> &'static str {
        if self.missing.contains(&key) {
            " [missing]"
        } else {
            ""
        }
    }

    /// Walks dependency edges backwards from the missing leaves.
    fn reaching_keys(&self) -> HashSet<TypeKey> {
        let mut dependents: HashMap<TypeKey, Vec<TypeKey>> = HashMap::new();
        for (key, provider) in &self.graph.resolved {
            for dependency in provider.dependencies() {
                dependents
                    .entry(self.canonical(dependency.key))
                    .or_default()
                    .push(*key);
            }
        }
        let mut reaching: HashSet<TypeKey> = self.missing.clone();
        let mut pending: Vec<TypeKey> = self.missing.iter().copied().collect();
        while let Some(key) = pending.pop() {
            for dependent in dependents.get(&key).into_iter().flatten() {
                if reaching.insert(*dependent) {
                    pending.push(*dependent);
                }
            }
        }
        reaching
    }

    fn node(&mut self, line: String, key: TypeKey, depth: usize) {
        let graph = self.graph;
        let expandable = graph
            .resolved
            .get(&key)
            .is_some_and(|provider| !provider.dependencies().is_empty());
        if expandable && !self.rendered.insert(key) {
            self.push(depth, &format!("{line} (see above)"));
            return;
        }
        self.push(depth, &line);
        let Some(provider) = graph.resolved.get(&key) else {
            return;
        };
        for dependency in provider.dependencies() {
            let target = self.canonical(dependency.key);
            if !self.reaching.contains(&target) {
                continue;
            }
            let line = format!(
                "- {}{}",
                self.registry.display(dependency.key),
                self.marker(target)
            );
            self.node(line, target, depth + 1);
        }
    }

    fn push(&mut self, depth: usize, line: &str) {
        self.out.push_str(&"  ".repeat(depth));
        self.out.push_str(line);
        self.out.push('\n');
    }
}
