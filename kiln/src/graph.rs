use std::collections::{BTreeMap, BTreeSet, HashSet, VecDeque};

use crate::{
    AssistedFactoryLocator, BindingResolver, CacheSlot, ComponentDecl, Dependency, Error,
    ErrorKind, InjectableConstructor, ModelIndex, Provider, ProviderLocator, Result, Scope,
    ScopeId, SourceLocation, SubcomponentFactoryLocator, TypeExpr, TypeKey, TypeRegistry,
};

/// What the components enclosing the one being built can provide.
pub trait ParentBindings {
    /// Whether an ancestor explicitly provides `key`, so a child must defer to it.
    fn can_bind(&self, key: TypeKey) -> bool;

    /// Whether an ancestor declares `scope`.
    fn has_scope(&self, scope: &ScopeId) -> bool;
}

/// Result of resolving one component's root dependencies.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DependencyGraph {
    pub resolved: BTreeMap<TypeKey, Provider>,
    /// Non-optional dependencies nothing could provide.
    pub missing: BTreeSet<Dependency>,
    /// Dependencies left for an ancestor to resolve.
    pub delegated: BTreeSet<Dependency>,
    /// Provider that first asked for each delegated dependency.
    pub origins: BTreeMap<TypeKey, String>,
}

/// Canonical key of a requested type: lazy wrappers are unwrapped, then
/// binding edges are followed.
pub fn canonical_key(registry: &TypeRegistry, bindings: &BindingResolver, key: TypeKey) -> TypeKey {
    let qualified = registry.get(key);
    match &qualified.ty {
        TypeExpr::Lazy(inner) => canonical_key(registry, bindings, registry.requalify(key, inner)),
        _ => bindings.resolve(key),
    }
}

enum Lookup {
    Provided(Provider),
    Delegated,
    Missing,
}

/// Worklist solver turning a set of root dependencies into a provider graph.
pub struct GraphBuilder<'a, 'm> {
    component: &'m ComponentDecl,
    index: &'a ModelIndex<'m>,
    registry: &'a TypeRegistry,
    bindings: &'a BindingResolver,
    locator: &'a ProviderLocator,
    parent: Option<&'a dyn ParentBindings>,
    origins: BTreeMap<TypeKey, String>,
    subcomponents: SubcomponentFactoryLocator<'a, 'm>,
    assisted: AssistedFactoryLocator<'a, 'm>,
}

impl<'a, 'm> GraphBuilder<'a, 'm> {
    pub fn new(
        component: &'m ComponentDecl,
        index: &'a ModelIndex<'m>,
        registry: &'a TypeRegistry,
        bindings: &'a BindingResolver,
        locator: &'a ProviderLocator,
        parent: Option<&'a dyn ParentBindings>,
    ) -> Self {
        Self {
            component,
            index,
            registry,
            bindings,
            locator,
            parent,
            origins: BTreeMap::new(),
            subcomponents: SubcomponentFactoryLocator::new(index, registry, component),
            assisted: AssistedFactoryLocator::new(index, registry),
        }
    }

    /// Names who asked for roots that nested components left to this one.
    pub fn with_origins(mut self, origins: BTreeMap<TypeKey, String>) -> Self {
        self.origins = origins;
        self
    }

    pub fn build(mut self, roots: &BTreeSet<Dependency>) -> Result<DependencyGraph> {
        let mut resolved = BTreeMap::new();
        let mut missing = BTreeSet::new();
        let mut delegated: BTreeMap<TypeKey, bool> = BTreeMap::new();
        let mut origins = BTreeMap::new();
        let mut worklist: VecDeque<(Dependency, Option<TypeKey>)> =
            roots.iter().map(|root| (*root, None)).collect();
        while let Some((dependency, requester)) = worklist.pop_front() {
            let key = self.canonical(dependency.key);
            if let Some(existing) = resolved.get_mut(&key) {
                match existing {
                    Provider::MissingOptional { .. } if !dependency.optional => {
                        missing.insert(Dependency::required(key));
                    }
                    Provider::ParentDelegate { optional, .. } if !dependency.optional => {
                        *optional = false;
                        delegated.insert(key, false);
                    }
                    _ => {}
                }
                continue;
            }
            if missing.contains(&Dependency::required(key)) {
                continue;
            }
            match self.locate(key)? {
                Lookup::Provided(provider) => {
                    tracing::trace!(
                        component = %self.component.name,
                        ty = %self.registry.display(key),
                        kind = ?provider.kind(),
                        "Resolved dependency"
                    );
                    if provider.extends_parent() {
                        merge_delegated(&mut delegated, key, dependency.optional);
                        origins
                            .entry(key)
                            .or_insert_with(|| self.origin(dependency.key, requester));
                    }
                    worklist.extend(
                        provider
                            .dependencies()
                            .into_iter()
                            .map(|next| (next, Some(key))),
                    );
                    resolved.insert(key, provider);
                }
                Lookup::Delegated => {
                    merge_delegated(&mut delegated, key, dependency.optional);
                    origins
                        .entry(key)
                        .or_insert_with(|| self.origin(dependency.key, requester));
                    let optional = delegated.get(&key).copied().unwrap_or(dependency.optional);
                    resolved.insert(key, Provider::ParentDelegate { key, optional });
                }
                Lookup::Missing if dependency.optional => {
                    resolved.insert(key, Provider::MissingOptional { key });
                }
                Lookup::Missing => {
                    missing.insert(Dependency::required(key));
                }
            }
        }
        let graph = DependencyGraph {
            resolved,
            missing,
            delegated: delegated
                .into_iter()
                .map(|(key, optional)| Dependency { key, optional })
                .collect(),
            origins,
        };
        self.detect_cycles(&graph, roots)?;
        self.check_required(&graph, roots)?;
        Ok(graph)
    }

    fn canonical(&self, key: TypeKey) -> TypeKey {
        canonical_key(self.registry, self.bindings, key)
    }

    /// Label of whoever requested `requested`: a provider of this component,
    /// or for a root, whoever asked for it further down.
    fn origin(&self, requested: TypeKey, requester: Option<TypeKey>) -> String {
        match requester {
            Some(requester) => format!(
                "{} in {}",
                self.registry.display(requester),
                self.component.name
            ),
            None => self
                .origins
                .get(&requested)
                .cloned()
                .unwrap_or_else(|| self.component.name.clone()),
        }
    }

    fn is_lazy(&self, key: TypeKey) -> bool {
        self.registry.get(key).ty.is_lazy()
    }

    fn parent_can_bind(&self, key: TypeKey) -> bool {
        self.parent.is_some_and(|parent| parent.can_bind(key))
    }

    fn locate(&mut self, key: TypeKey) -> Result<Lookup> {
        let locator = self.locator;
        if let Some(provider) = locator.property(key) {
            return Ok(Lookup::Provided(provider.clone()));
        }
        if let Some(Provider::ProvidesMethod(method)) = locator.provides(key) {
            let mut method = method.clone();
            method.cache = Some(self.cache_slot(method.scope.as_ref(), method.location.as_ref())?);
            return Ok(Lookup::Provided(Provider::ProvidesMethod(method)));
        }
        let multibinding = locator.multibinding(key);
        if multibinding.is_none() && self.parent_can_bind(key) {
            return Ok(Lookup::Delegated);
        }
        if let Some(mut constructor) = self.constructor(key)? {
            if let Some(Scope::Named(scope)) = &constructor.scope
                && self.component.scope.as_ref() != Some(scope)
                && self.parent.is_some_and(|parent| parent.has_scope(scope))
            {
                return Ok(Lookup::Delegated);
            }
            constructor.cache = Some(
                self.cache_slot(constructor.scope.as_ref(), constructor.location.as_ref())?,
            );
            return Ok(Lookup::Provided(Provider::InjectableConstructor(constructor)));
        }
        if let Some(factory) = self.subcomponents.locate(key) {
            return Ok(Lookup::Provided(Provider::SubcomponentFactory(factory)));
        }
        if let Some(factory) = self.assisted.locate(key) {
            return Ok(Lookup::Provided(Provider::AssistedFactory(factory)));
        }
        if let Some(multibinding) = multibinding {
            let extends_parent = self.parent_can_bind(key);
            let provider = match multibinding.clone() {
                Provider::SetMultibinding(mut set) => {
                    set.extends_parent = extends_parent;
                    Provider::SetMultibinding(set)
                }
                Provider::MapMultibinding(mut map) => {
                    map.extends_parent = extends_parent;
                    Provider::MapMultibinding(map)
                }
                other => other,
            };
            return Ok(Lookup::Provided(provider));
        }
        if self.parent.is_some() {
            return Ok(Lookup::Delegated);
        }
        Ok(Lookup::Missing)
    }

    /// Injectable constructor of a plain, unqualified type.
    ///
    /// Constructors taking assisted parameters are only reachable through an
    /// assisted factory.
    fn constructor(&self, key: TypeKey) -> Result<Option<InjectableConstructor>> {
        let qualified = self.registry.get(key);
        if qualified.qualifier.is_some() || qualified.discriminator.is_some() {
            return Ok(None);
        }
        let Some(decl) = self.index.named_decl(&qualified.ty) else {
            return Ok(None);
        };
        let Some(constructor) = decl.constructor.as_ref().filter(|c| c.injectable) else {
            return Ok(None);
        };
        if constructor.params.iter().any(|param| param.assisted) {
            return Ok(None);
        }
        if decl.is_abstract {
            return Err(Error::new(
                &self.component.name,
                ErrorKind::Parse {
                    message: format!("{} is abstract and cannot be constructed", decl.name),
                },
            )
            .at(decl.location.as_ref()));
        }
        Ok(Some(InjectableConstructor {
            key,
            params: constructor
                .params
                .iter()
                .map(|param| Dependency::of_param(self.registry, param))
                .collect(),
            scope: decl.scope.clone(),
            cache: None,
            location: decl.location.clone(),
        }))
    }

    fn cache_slot(
        &self,
        scope: Option<&Scope>,
        location: Option<&SourceLocation>,
    ) -> Result<CacheSlot> {
        let component = &self.component.name;
        match scope {
            None => Ok(CacheSlot::Instance {
                component: component.clone(),
            }),
            Some(Scope::Reusable) => Ok(CacheSlot::Site),
            Some(Scope::Named(scope)) if self.component.scope.as_ref() == Some(scope) => {
                Ok(CacheSlot::Scoped {
                    component: component.clone(),
                    scope: scope.clone(),
                })
            }
            Some(Scope::Named(scope)) => Err(Error::new(
                component,
                ErrorKind::InvalidScope {
                    got: scope.to_string(),
                    expected: self
                        .component
                        .scope
                        .as_ref()
                        .map_or_else(|| "unscoped".to_string(), ToString::to_string),
                },
            )
            .at(location)),
        }
    }

    fn detect_cycles(&self, graph: &DependencyGraph, roots: &BTreeSet<Dependency>) -> Result<()> {
        let mut finished = HashSet::new();
        let mut path = Vec::new();
        for root in roots {
            self.visit(self.canonical(root.key), graph, &mut finished, &mut path)?;
        }
        Ok(())
    }

    /// Depth-first walk over non-lazy edges; a key met again on the current
    /// path closes a cycle.
    fn visit(
        &self,
        key: TypeKey,
        graph: &DependencyGraph,
        finished: &mut HashSet<TypeKey>,
        path: &mut Vec<TypeKey>,
    ) -> Result<()> {
        if finished.contains(&key) {
            return Ok(());
        }
        if let Some(position) = path.iter().position(|k| *k == key) {
            let mut chain: Vec<String> = path[position..]
                .iter()
                .map(|k| self.registry.display(*k))
                .collect();
            chain.push(self.registry.display(key));
            return Err(Error::new(
                &self.component.name,
                ErrorKind::DependencyCycle { chain },
            ));
        }
        let Some(provider) = graph.resolved.get(&key) else {
            return Ok(());
        };
        path.push(key);
        for dependency in provider.dependencies() {
            if self.is_lazy(dependency.key) {
                continue;
            }
            self.visit(self.canonical(dependency.key), graph, finished, path)?;
        }
        path.pop();
        finished.insert(key);
        Ok(())
    }

    /// A provider feeding a non-optional root must not need an optional
    /// property that may be unset.
    fn check_required(&self, graph: &DependencyGraph, roots: &BTreeSet<Dependency>) -> Result<()> {
        let unset = |key: &TypeKey| {
            graph
                .resolved
                .get(key)
                .is_some_and(Provider::is_unset_optional)
        };
        let mut pairs = BTreeSet::new();
        let mut visited = HashSet::new();
        let mut pending = Vec::new();
        for root in roots.iter().filter(|root| !root.optional) {
            let key = self.canonical(root.key);
            if unset(&key) {
                pairs.insert((self.origin(root.key, None), self.registry.display(key)));
            }
            pending.push(key);
        }
        while let Some(key) = pending.pop() {
            if !visited.insert(key) {
                continue;
            }
            let Some(provider) = graph.resolved.get(&key) else {
                continue;
            };
            for dependency in provider.dependencies() {
                if dependency.optional {
                    continue;
                }
                let target = self.canonical(dependency.key);
                if unset(&target) {
                    pairs.insert((self.registry.display(key), self.registry.display(target)));
                }
                pending.push(target);
            }
        }
        if pairs.is_empty() {
            return Ok(());
        }
        Err(Error::new(
            &self.component.name,
            ErrorKind::MissingRequiredProviders {
                pairs: pairs.into_iter().collect(),
            },
        ))
    }
}

fn merge_delegated(delegated: &mut BTreeMap<TypeKey, bool>, key: TypeKey, optional: bool) {
    let entry = delegated.entry(key).or_insert(optional);
    *entry &= optional;
}

