use std::collections::{BTreeMap, BTreeSet};
use std::iter::successors;

use crate::{
    BindingResolver, ComponentDecl, Dependency, DependencyGraph, Error, ErrorKind, GraphBuilder,
    InstalledModules, ModelIndex, ParentBindings, Provider, ProviderKind, ProviderLocator,
    ResolverConfig, Result, ScopeId, TypeKey, TypeRegistry, render_missing_tree,
};

/// Resolved graph of a component and of every subcomponent reachable from it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedComponent {
    pub name: String,
    pub scope: Option<ScopeId>,
    pub resolved: BTreeMap<TypeKey, Provider>,
    pub missing: BTreeSet<Dependency>,
    /// Dependencies this component leaves to its ancestors.
    pub delegated: BTreeSet<Dependency>,
    /// Provider that first asked for each delegated dependency.
    pub origins: BTreeMap<TypeKey, String>,
    pub children: Vec<ResolvedComponent>,
}

impl ResolvedComponent {
    pub fn provider(&self, key: TypeKey) -> Option<&Provider> {
        self.resolved.get(&key)
    }

    pub fn child(&self, name: &str) -> Option<&ResolvedComponent> {
        self.children.iter().find(|child| child.name == name)
    }
}

/// Per-level state shared with nested components.
struct Level<'m> {
    component: &'m ComponentDecl,
    bindings: BindingResolver,
    locator: ProviderLocator,
}

/// Chain of enclosing levels, innermost first.
struct Ancestors<'s, 'm> {
    level: &'s Level<'m>,
    parent: Option<&'s Ancestors<'s, 'm>>,
}

impl<'m> Ancestors<'_, 'm> {
    fn levels(&self) -> impl Iterator<Item = &Level<'m>> {
        successors(Some(self), |ancestors| ancestors.parent).map(|ancestors| ancestors.level)
    }
}

impl ParentBindings for Ancestors<'_, '_> {
    fn can_bind(&self, key: TypeKey) -> bool {
        self.levels()
            .any(|level| level.locator.explicit(level.bindings.resolve(key)).is_some())
    }

    fn has_scope(&self, scope: &ScopeId) -> bool {
        self.levels()
            .any(|level| level.component.scope.as_ref() == Some(scope))
    }
}

/// Resolves components recursively down their subcomponent tree.
pub struct ComponentComposer<'a, 'm> {
    index: &'a ModelIndex<'m>,
    registry: &'a TypeRegistry,
    config: &'a ResolverConfig,
}

impl<'a, 'm> ComponentComposer<'a, 'm> {
    pub fn new(
        index: &'a ModelIndex<'m>,
        registry: &'a TypeRegistry,
        config: &'a ResolverConfig,
    ) -> Self {
        Self {
            index,
            registry,
            config,
        }
    }

    pub fn compose(&self, component: &'m ComponentDecl) -> Result<ResolvedComponent> {
        self.compose_level(component, None, 0)
    }

    fn compose_level(
        &self,
        component: &'m ComponentDecl,
        parent: Option<&Ancestors<'_, 'm>>,
        depth: usize,
    ) -> Result<ResolvedComponent> {
        let span = tracing::debug_span!("component", name = %component.name);
        let _entered = span.enter();
        self.check_nesting(component, parent, depth)?;

        let installed = InstalledModules::collect(self.index, component)?;
        let bindings = match parent {
            Some(ancestors) => ancestors.level.bindings.merge(
                &component.name,
                self.index,
                self.registry,
                installed.bindings(),
            )?,
            None => BindingResolver::new(
                &component.name,
                self.index,
                self.registry,
                installed.bindings(),
            )?,
        };
        let locator = ProviderLocator::new(&installed, self.index, self.registry, &bindings)?;
        if let Some(ancestors) = parent {
            self.check_duplicates(component, &locator, ancestors)?;
        }
        let level = Level {
            component,
            bindings,
            locator,
        };

        let declared: Vec<(String, Dependency)> = component
            .roots
            .iter()
            .map(|root| {
                let key = self
                    .registry
                    .intern(&root.ty, root.qualifier.as_deref(), None);
                let dependency = Dependency { key, optional: root.optional };
                (root.name.clone(), dependency)
            })
            .collect();
        let mut roots: BTreeSet<Dependency> = declared.iter().map(|(_, d)| *d).collect();
        let mut children: Vec<ResolvedComponent> = Vec::new();
        let mut origins: BTreeMap<TypeKey, String> = BTreeMap::new();
        let mut pass = 0;
        let graph = loop {
            pass += 1;
            if pass > self.config.max_passes {
                return Err(Error::new(
                    &component.name,
                    ErrorKind::Internal {
                        message: format!(
                            "graph did not settle after {} passes",
                            self.config.max_passes
                        ),
                    },
                ));
            }
            let graph = GraphBuilder::new(
                component,
                self.index,
                self.registry,
                &level.bindings,
                &level.locator,
                parent.map(|ancestors| ancestors as &dyn ParentBindings),
            )
            .with_origins(origins.clone())
            .build(&roots)?;
            tracing::debug!(
                pass,
                resolved = graph.resolved.len(),
                missing = graph.missing.len(),
                delegated = graph.delegated.len(),
                "Resolved component graph"
            );

            let here = Ancestors {
                level: &level,
                parent,
            };
            for provider in graph.resolved.values() {
                let Provider::SubcomponentFactory(factory) = provider else {
                    continue;
                };
                if children.iter().any(|child| child.name == factory.subcomponent) {
                    continue;
                }
                let Some(subcomponent) = self.index.component(&factory.subcomponent) else {
                    return Err(Error::new(
                        &component.name,
                        ErrorKind::Internal {
                            message: format!("unknown subcomponent {}", factory.subcomponent),
                        },
                    ));
                };
                tracing::debug!(subcomponent = %subcomponent.name, "Composing subcomponent");
                children.push(self.compose_level(subcomponent, Some(&here), depth + 1)?);
            }

            // Whatever the children could not resolve becomes this level's job.
            let mut required = roots.clone();
            for child in &children {
                for dependency in &child.delegated {
                    required.insert(*dependency);
                    origins.entry(dependency.key).or_insert_with(|| {
                        child
                            .origins
                            .get(&dependency.key)
                            .cloned()
                            .unwrap_or_else(|| child.name.clone())
                    });
                }
            }
            if required == roots {
                break graph;
            }
            roots = required;
        };

        for child in &children {
            self.check_shadowed(&level, &graph, child)?;
        }
        if parent.is_none() && !graph.missing.is_empty() {
            return Err(self.missing_error(component, &level, &graph, &declared, &roots));
        }
        let DependencyGraph {
            resolved,
            missing,
            delegated,
            origins,
        } = graph;
        Ok(ResolvedComponent {
            name: component.name.clone(),
            scope: component.scope.clone(),
            resolved,
            missing,
            delegated,
            origins,
            children,
        })
    }

    fn check_nesting(
        &self,
        component: &'m ComponentDecl,
        parent: Option<&Ancestors<'_, 'm>>,
        depth: usize,
    ) -> Result<()> {
        if depth > self.config.max_depth {
            return Err(Error::new(
                &component.name,
                ErrorKind::Internal {
                    message: format!(
                        "subcomponents nested deeper than {} levels",
                        self.config.max_depth
                    ),
                },
            ));
        }
        let Some(ancestors) = parent else {
            return Ok(());
        };
        let chain: Vec<&Level<'m>> = ancestors.levels().collect();
        if let Some(position) = chain
            .iter()
            .position(|level| level.component.name == component.name)
        {
            let mut names: Vec<String> = chain[..=position]
                .iter()
                .rev()
                .map(|level| level.component.name.clone())
                .collect();
            names.push(component.name.clone());
            return Err(Error::new(
                &component.name,
                ErrorKind::DependencyCycle { chain: names },
            )
            .at(component.location.as_ref()));
        }
        if let Some(scope) = &component.scope
            && let Some(level) = chain
                .iter()
                .find(|level| level.component.scope.as_ref() == Some(scope))
        {
            return Err(Error::new(
                &component.name,
                ErrorKind::DuplicateScope {
                    scope: scope.to_string(),
                    ancestor: level.component.name.clone(),
                },
            )
            .at(component.location.as_ref()));
        }
        Ok(())
    }

    /// A nested component may not provide what an ancestor already provides.
    fn check_duplicates(
        &self,
        component: &ComponentDecl,
        locator: &ProviderLocator,
        ancestors: &Ancestors<'_, 'm>,
    ) -> Result<()> {
        for key in locator.plain_keys() {
            for level in ancestors.levels() {
                let Some(existing) = level.locator.explicit(level.bindings.resolve(key)) else {
                    continue;
                };
                let candidates = [
                    (existing, &level.component.name),
                    (locator.explicit(key).unwrap_or(existing), &component.name),
                ]
                .iter()
                .map(|(provider, owner)| format!("{} in {owner}", provider.describe(self.registry)))
                .collect();
                return Err(Error::new(
                    &component.name,
                    ErrorKind::DuplicateProviders {
                        ty: self.registry.display(key),
                        candidates,
                    },
                ));
            }
        }
        Ok(())
    }

    /// A nested component may not provide a type this level resolves itself.
    fn check_shadowed(
        &self,
        level: &Level<'m>,
        graph: &DependencyGraph,
        nested: &ResolvedComponent,
    ) -> Result<()> {
        for (key, provider) in &nested.resolved {
            if !matches!(
                provider.kind(),
                ProviderKind::Property | ProviderKind::ProvidesMethod
            ) {
                continue;
            }
            let Some(existing) = graph.resolved.get(&level.bindings.resolve(*key)) else {
                continue;
            };
            if matches!(
                existing,
                Provider::ParentDelegate { .. } | Provider::MissingOptional { .. }
            ) {
                continue;
            }
            let candidates = vec![
                format!(
                    "{} in {}",
                    existing.describe(self.registry),
                    level.component.name
                ),
                format!("{} in {}", provider.describe(self.registry), nested.name),
            ];
            return Err(Error::new(
                &nested.name,
                ErrorKind::DuplicateProviders {
                    ty: self.registry.display(*key),
                    candidates,
                },
            ));
        }
        for child in &nested.children {
            self.check_shadowed(level, graph, child)?;
        }
        Ok(())
    }

    fn missing_error(
        &self,
        component: &ComponentDecl,
        level: &Level<'m>,
        graph: &DependencyGraph,
        declared: &[(String, Dependency)],
        roots: &BTreeSet<Dependency>,
    ) -> Error {
        let mut labelled = declared.to_vec();
        labelled.extend(
            roots
                .iter()
                .filter(|root| !declared.iter().any(|(_, d)| d == *root))
                .map(|root| ("(subcomponent)".to_string(), *root)),
        );
        let tree = render_missing_tree(self.registry, &level.bindings, graph, &labelled);
        let missing = graph
            .missing
            .iter()
            .map(|dependency| self.registry.display(dependency.key))
            .collect();
        Error::new(&component.name, ErrorKind::MissingProvider { missing, tree })
            .at(component.location.as_ref())
    }
}
