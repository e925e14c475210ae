//! Recognition of callable types that build subcomponents or assisted types.
//!
//! Both locators answer "does this requested callable match a factory shape?"
//! and remember the answer per type key. A locator lives for a single graph
//! build and is never shared across runs.

use std::collections::HashMap;

use crate::{
    AssistedFactory, ComponentDecl, Dependency, ModelIndex, SubcomponentFactory, TypeExpr,
    TypeKey, TypeRegistry,
};

/// Matches `fn(P1, .., Pn) -> Sub` against the subcomponents installed in a component.
pub struct SubcomponentFactoryLocator<'a, 'm> {
    index: &'a ModelIndex<'m>,
    registry: &'a TypeRegistry,
    installed: &'m [String],
    cache: HashMap<TypeKey, Option<SubcomponentFactory>>,
}

impl<'a, 'm> SubcomponentFactoryLocator<'a, 'm> {
    pub fn new(
        index: &'a ModelIndex<'m>,
        registry: &'a TypeRegistry,
        component: &'m ComponentDecl,
    ) -> Self {
        Self {
            index,
            registry,
            installed: &component.subcomponents,
            cache: HashMap::new(),
        }
    }

    pub fn locate(&mut self, key: TypeKey) -> Option<SubcomponentFactory> {
        if let Some(hit) = self.cache.get(&key) {
            return hit.clone();
        }
        let found = self.recognize(key);
        self.cache.insert(key, found.clone());
        found
    }

    fn recognize(&self, key: TypeKey) -> Option<SubcomponentFactory> {
        let qualified = self.registry.get(key);
        if qualified.qualifier.is_some() || qualified.discriminator.is_some() {
            return None;
        }
        let TypeExpr::Function { params, ret } = &qualified.ty else {
            return None;
        };
        let name = ret.as_plain_name()?;
        if !self.installed.iter().any(|installed| installed == name) {
            return None;
        }
        let subcomponent = self.index.component(name)?;
        // Parameters must line up with the constructor, in order and type.
        if subcomponent.properties.len() != params.len()
            || !subcomponent
                .properties
                .iter()
                .zip(params)
                .all(|(property, param)| property.ty == *param)
        {
            return None;
        }
        Some(SubcomponentFactory {
            key,
            subcomponent: subcomponent.name.clone(),
            params: params
                .iter()
                .map(|param| self.registry.intern(param, None, None))
                .collect(),
        })
    }
}

/// Matches `fn(A1, .., An) -> T` against the assisted parameters of `T`'s constructor.
pub struct AssistedFactoryLocator<'a, 'm> {
    index: &'a ModelIndex<'m>,
    registry: &'a TypeRegistry,
    cache: HashMap<TypeKey, Option<AssistedFactory>>,
}

impl<'a, 'm> AssistedFactoryLocator<'a, 'm> {
    pub fn new(index: &'a ModelIndex<'m>, registry: &'a TypeRegistry) -> Self {
        Self {
            index,
            registry,
            cache: HashMap::new(),
        }
    }

    pub fn locate(&mut self, key: TypeKey) -> Option<AssistedFactory> {
        if let Some(hit) = self.cache.get(&key) {
            return hit.clone();
        }
        let found = self.recognize(key);
        self.cache.insert(key, found.clone());
        found
    }

    /// Any mismatch in count or type is a non-match, not an error.
    fn recognize(&self, key: TypeKey) -> Option<AssistedFactory> {
        let qualified = self.registry.get(key);
        if qualified.qualifier.is_some() || qualified.discriminator.is_some() {
            return None;
        }
        let TypeExpr::Function { params, ret } = &qualified.ty else {
            return None;
        };
        let decl = self.index.named_decl(ret)?;
        let constructor = decl.constructor.as_ref().filter(|c| c.injectable)?;
        let (assisted, injected): (Vec<_>, Vec<_>) =
            constructor.params.iter().partition(|param| param.assisted);
        if assisted.is_empty() || assisted.len() != params.len() {
            return None;
        }
        let mut remaining: Vec<&TypeExpr> = params.iter().collect();
        for param in &assisted {
            let position = remaining.iter().position(|ty| **ty == param.ty)?;
            remaining.swap_remove(position);
        }
        Some(AssistedFactory {
            key,
            target: self.registry.intern(ret, None, None),
            assisted: assisted
                .iter()
                .map(|param| self.registry.intern(&param.ty, param.qualifier.as_deref(), None))
                .collect(),
            params: injected
                .iter()
                .map(|param| Dependency::of_param(self.registry, param))
                .collect(),
        })
    }
}
