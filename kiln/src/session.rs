use serde::{Deserialize, Serialize};

use crate::{
    ComponentComposer, Error, ErrorKind, Model, ModelIndex, ResolvedComponent, Result, TypeExpr,
    TypeKey, TypeRegistry,
};

/// Limits applied to a resolution run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Rebuilds allowed per component while subcomponents keep delegating new types.
    pub max_passes: usize,
    /// Deepest subcomponent nesting accepted.
    pub max_depth: usize,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            max_passes: 32,
            max_depth: 64,
        }
    }
}

/// Outcome of a successful run.
pub struct Resolution {
    pub registry: TypeRegistry,
    /// Top-level components in declaration order.
    pub components: Vec<ResolvedComponent>,
}

impl Resolution {
    /// Finds a component by name anywhere in the component tree.
    pub fn component(&self, name: &str) -> Option<&ResolvedComponent> {
        fn find<'c>(components: &'c [ResolvedComponent], name: &str) -> Option<&'c ResolvedComponent> {
            components.iter().find_map(|component| {
                if component.name == name {
                    Some(component)
                } else {
                    find(&component.children, name)
                }
            })
        }
        find(&self.components, name)
    }

    /// Key of an already interned type, written in the type grammar.
    pub fn key(&self, ty: &str, qualifier: Option<&str>) -> Option<TypeKey> {
        let ty: TypeExpr = ty.parse().ok()?;
        self.registry.lookup(&ty, qualifier, None)
    }

    pub fn display(&self, key: TypeKey) -> String {
        self.registry.display(key)
    }
}

/// Resolves every top-level component of `model`, stopping at the first error.
pub fn resolve(model: &Model, config: &ResolverConfig) -> Result<Resolution> {
    let span = tracing::info_span!("resolve");
    let _entered = span.enter();
    let index = ModelIndex::new(model)?;
    let registry = TypeRegistry::new();
    let top_level: Vec<_> = index.top_level().collect();
    if top_level.is_empty() {
        return Err(Error::model(ErrorKind::NoComponents));
    }
    let components = {
        let composer = ComponentComposer::new(&index, &registry, config);
        top_level
            .into_iter()
            .map(|component| composer.compose(component))
            .collect::<Result<Vec<_>>>()?
    };
    tracing::info!(
        components = components.len(),
        types = registry.len(),
        "Resolved model"
    );
    Ok(Resolution {
        registry,
        components,
    })
}
