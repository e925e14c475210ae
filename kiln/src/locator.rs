use std::collections::{BTreeMap, HashMap, HashSet};

use crate::binding::validate_binds;
use crate::{
    BindingResolver, BindingSource, ComponentDecl, Dependency, Error, ErrorKind, MapContribution,
    MapEntryKey, MapMultibinding, ModelIndex, ModuleDecl, Multibinding, PropertyProvider,
    Provider, ProvidesDecl, ProvidesMethod, Result, SetContribution, SetContributionKind,
    SetMultibinding, SourceLocation, TypeExpr, TypeKey, TypeRegistry,
};

/// Modules installed in a component, transitive includes flattened.
pub struct InstalledModules<'m> {
    component: &'m ComponentDecl,
    modules: Vec<&'m ModuleDecl>,
}

impl<'m> InstalledModules<'m> {
    /// Walks the component's modules depth-first, keeping the first occurrence
    /// of every module.
    pub fn collect(index: &ModelIndex<'m>, component: &'m ComponentDecl) -> Result<Self> {
        let mut modules = Vec::new();
        let mut seen = HashSet::new();
        let mut pending: Vec<&'m str> = component.modules.iter().rev().map(String::as_str).collect();
        while let Some(name) = pending.pop() {
            if !seen.insert(name) {
                continue;
            }
            let module = index.module(name).ok_or_else(|| {
                Error::new(
                    &component.name,
                    ErrorKind::Parse {
                        message: format!("unknown module {name}"),
                    },
                )
                .at(component.location.as_ref())
            })?;
            modules.push(module);
            pending.extend(module.includes.iter().rev().map(String::as_str));
        }
        Ok(Self { component, modules })
    }

    pub fn component(&self) -> &'m ComponentDecl {
        self.component
    }

    pub fn modules(&self) -> &[&'m ModuleDecl] {
        &self.modules
    }

    /// Plain binds declarations; multibinding contributions are left to the locator.
    pub fn bindings(&self) -> impl Iterator<Item = BindingSource<'m>> + '_ {
        self.modules.iter().flat_map(|&module| {
            module
                .binds
                .iter()
                .filter(|decl| decl.multibinding.is_none())
                .map(move |decl| BindingSource { module, decl })
        })
    }
}

/// Every provider a component declares, keyed by canonical type.
#[derive(Default)]
pub struct ProviderLocator {
    component: String,
    properties: HashMap<TypeKey, Provider>,
    provides: HashMap<TypeKey, Provider>,
    multibindings: HashMap<TypeKey, Provider>,
}

impl ProviderLocator {
    pub fn new(
        installed: &InstalledModules<'_>,
        index: &ModelIndex<'_>,
        registry: &TypeRegistry,
        bindings: &BindingResolver,
    ) -> Result<Self> {
        let component = installed.component();
        let mut locator = Self {
            component: component.name.clone(),
            ..Default::default()
        };
        for property in &component.properties {
            let key = bindings.resolve(registry.intern(
                &property.ty,
                property.qualifier.as_deref(),
                None,
            ));
            let provider = Provider::Property(PropertyProvider {
                key,
                name: property.name.clone(),
                optional: property.optional,
            });
            locator.insert_plain(registry, provider, component.location.as_ref())?;
        }

        let mut sets = BTreeMap::new();
        let mut maps = BTreeMap::new();
        for &module in installed.modules() {
            for decl in &module.provides {
                let Some(kind) = decl.multibinding else {
                    let key = bindings.resolve(registry.intern(
                        &decl.ty,
                        decl.qualifier.as_deref(),
                        None,
                    ));
                    let provider = Provider::ProvidesMethod(provides_method(
                        registry, module, decl, key,
                    ));
                    locator.insert_plain(registry, provider, decl.location.as_ref())?;
                    continue;
                };
                let origin = format!("{}.{}", module.name, decl.name);
                let node = registry.intern(
                    &decl.ty,
                    decl.qualifier.as_deref(),
                    Some(registry.next_discriminator()),
                );
                match kind {
                    Multibinding::IntoSet | Multibinding::ElementsIntoSet => {
                        let (element, kind) = match (kind, &decl.ty) {
                            (Multibinding::IntoSet, ty) => (ty, SetContributionKind::Element),
                            (_, TypeExpr::Set(inner) | TypeExpr::Iterable(inner)) => {
                                (inner.as_ref(), SetContributionKind::Elements)
                            }
                            (_, ty) => {
                                return Err(locator.invalid_binding(
                                    origin,
                                    format!("elements contribution must return a Set or Iterable, found {ty}"),
                                    decl.location.as_ref(),
                                ));
                            }
                        };
                        let set = set_entry(&mut sets, registry, element, decl.qualifier.as_deref());
                        set.contributions.push(SetContribution {
                            dependency: node,
                            kind,
                            origin,
                        });
                    }
                    Multibinding::IntoMap => {
                        let (key_type, value_type, key) = match (&decl.map_key, &decl.ty) {
                            (Some(map_key), ty) => {
                                (&map_key.ty, ty, MapEntryKey::Literal(map_key.value.clone()))
                            }
                            (None, TypeExpr::Tuple(items)) if items.len() == 2 => {
                                (&items[0], &items[1], MapEntryKey::Tuple)
                            }
                            (None, TypeExpr::Tuple(items)) => {
                                return Err(locator.invalid_binding(
                                    origin,
                                    format!("map entry must be a pair, found {} elements", items.len()),
                                    decl.location.as_ref(),
                                ));
                            }
                            (None, _) => {
                                return Err(locator.invalid_binding(
                                    origin,
                                    "map contribution needs a map key or a (key, value) return type"
                                        .into(),
                                    decl.location.as_ref(),
                                ));
                            }
                        };
                        let map = map_entry(
                            &mut maps,
                            registry,
                            key_type,
                            value_type,
                            decl.qualifier.as_deref(),
                        );
                        map.contributions.push(MapContribution {
                            dependency: node,
                            key,
                            origin,
                        });
                    }
                }
                let provider =
                    Provider::ProvidesMethod(provides_method(registry, module, decl, node));
                locator.provides.insert(node, provider);
            }
            for decl in &module.binds {
                let Some(kind) = decl.multibinding else {
                    continue;
                };
                let source = BindingSource { module, decl };
                let (_, target) = validate_binds(&component.name, index, registry, source)?;
                match kind {
                    Multibinding::IntoSet => {
                        let set = set_entry(&mut sets, registry, &decl.ty, decl.qualifier.as_deref());
                        set.contributions.push(SetContribution {
                            dependency: target,
                            kind: SetContributionKind::Element,
                            origin: source.origin(),
                        });
                    }
                    Multibinding::ElementsIntoSet => {
                        return Err(locator.invalid_binding(
                            source.origin(),
                            "bindings cannot contribute elements".into(),
                            decl.location.as_ref(),
                        ));
                    }
                    Multibinding::IntoMap => {
                        let Some(map_key) = &decl.map_key else {
                            return Err(locator.invalid_binding(
                                source.origin(),
                                "map binding needs a map key".into(),
                                decl.location.as_ref(),
                            ));
                        };
                        let map = map_entry(
                            &mut maps,
                            registry,
                            &map_key.ty,
                            &decl.ty,
                            decl.qualifier.as_deref(),
                        );
                        map.contributions.push(MapContribution {
                            dependency: target,
                            key: MapEntryKey::Literal(map_key.value.clone()),
                            origin: source.origin(),
                        });
                    }
                }
            }
        }

        let multibindings = sets
            .into_values()
            .map(Provider::SetMultibinding)
            .chain(maps.into_values().map(Provider::MapMultibinding));
        for provider in multibindings {
            let key = provider.key();
            if let Some(existing) = locator.explicit(key) {
                return Err(Error::new(
                    &locator.component,
                    ErrorKind::DuplicateProviders {
                        ty: registry.display(key),
                        candidates: vec![existing.describe(registry), provider.describe(registry)],
                    },
                ));
            }
            locator.multibindings.insert(key, provider);
        }
        Ok(locator)
    }

    pub fn property(&self, key: TypeKey) -> Option<&Provider> {
        self.properties.get(&key)
    }

    pub fn provides(&self, key: TypeKey) -> Option<&Provider> {
        self.provides.get(&key)
    }

    pub fn multibinding(&self, key: TypeKey) -> Option<&Provider> {
        self.multibindings.get(&key)
    }

    /// Property, factory or multibinding declared for `key`.
    pub fn explicit(&self, key: TypeKey) -> Option<&Provider> {
        self.property(key)
            .or_else(|| self.provides(key))
            .or_else(|| self.multibinding(key))
    }

    /// Keys of properties and plain factories, sorted.
    ///
    /// Multibindings are left out: a nested component may extend them.
    pub fn plain_keys(&self) -> Vec<TypeKey> {
        let mut keys: Vec<TypeKey> = self
            .properties
            .keys()
            .chain(self.provides.keys())
            .copied()
            .collect();
        keys.sort();
        keys
    }

    fn insert_plain(
        &mut self,
        registry: &TypeRegistry,
        provider: Provider,
        location: Option<&SourceLocation>,
    ) -> Result<()> {
        let key = provider.key();
        if let Some(existing) = self.explicit(key) {
            return Err(Error::new(
                &self.component,
                ErrorKind::DuplicateProviders {
                    ty: registry.display(key),
                    candidates: vec![existing.describe(registry), provider.describe(registry)],
                },
            )
            .at(location));
        }
        if matches!(provider, Provider::Property(_)) {
            self.properties.insert(key, provider);
        } else {
            self.provides.insert(key, provider);
        }
        Ok(())
    }

    fn invalid_binding(
        &self,
        binding: String,
        reason: String,
        location: Option<&SourceLocation>,
    ) -> Error {
        Error::new(&self.component, ErrorKind::InvalidBinding { binding, reason }).at(location)
    }
}

fn provides_method(
    registry: &TypeRegistry,
    module: &ModuleDecl,
    decl: &ProvidesDecl,
    key: TypeKey,
) -> ProvidesMethod {
    ProvidesMethod {
        key,
        module: module.name.clone(),
        method: decl.name.clone(),
        params: decl
            .params
            .iter()
            .map(|param| Dependency::of_param(registry, param))
            .collect(),
        scope: decl.scope.clone(),
        cache: None,
        location: decl.location.clone(),
    }
}

fn set_entry<'s>(
    sets: &'s mut BTreeMap<TypeKey, SetMultibinding>,
    registry: &TypeRegistry,
    element: &TypeExpr,
    qualifier: Option<&str>,
) -> &'s mut SetMultibinding {
    let key = registry.intern(&TypeExpr::set_of(element.clone()), qualifier, None);
    sets.entry(key).or_insert_with(|| SetMultibinding {
        key,
        element: registry.intern(element, qualifier, None),
        contributions: Vec::new(),
        extends_parent: false,
    })
}

fn map_entry<'s>(
    maps: &'s mut BTreeMap<TypeKey, MapMultibinding>,
    registry: &TypeRegistry,
    key_type: &TypeExpr,
    value_type: &TypeExpr,
    qualifier: Option<&str>,
) -> &'s mut MapMultibinding {
    let key = registry.intern(
        &TypeExpr::map_of(key_type.clone(), value_type.clone()),
        qualifier,
        None,
    );
    maps.entry(key).or_insert_with(|| MapMultibinding {
        key,
        key_type: registry.intern(key_type, None, None),
        value_type: registry.intern(value_type, qualifier, None),
        contributions: Vec::new(),
        extends_parent: false,
    })
}
