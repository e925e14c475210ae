use std::collections::{HashMap, HashSet};

use crate::{
    BindsDecl, Error, ErrorKind, ModelIndex, ModuleDecl, Result, SourceLocation, TypeKey,
    TypeRegistry,
};

/// A binds declaration together with the module declaring it.
#[derive(Clone, Copy)]
pub struct BindingSource<'m> {
    pub module: &'m ModuleDecl,
    pub decl: &'m BindsDecl,
}

impl BindingSource<'_> {
    pub fn origin(&self) -> String {
        format!("{}.{}", self.module.name, self.decl.name)
    }
}

#[derive(Clone, Debug)]
struct BindingEdge {
    target: TypeKey,
    origin: String,
    location: Option<SourceLocation>,
}

/// Resolves abstract types to the concrete types they are bound to.
///
/// A resolver is built per component level: the root level from its own
/// bindings, every nested level by [`BindingResolver::merge`] on top of its
/// parent.
#[derive(Clone, Debug, Default)]
pub struct BindingResolver {
    edges: HashMap<TypeKey, BindingEdge>,
}

impl BindingResolver {
    pub fn new<'m>(
        component: &str,
        index: &ModelIndex<'m>,
        registry: &TypeRegistry,
        sources: impl IntoIterator<Item = BindingSource<'m>>,
    ) -> Result<Self> {
        Self::default().merge(component, index, registry, sources)
    }

    /// Builds a resolver over the bindings of `self` and `sources`.
    ///
    /// Re-binding a type bound by `self` or bound twice in `sources` is a
    /// duplicate; the union must stay acyclic.
    pub fn merge<'m>(
        &self,
        component: &str,
        index: &ModelIndex<'m>,
        registry: &TypeRegistry,
        sources: impl IntoIterator<Item = BindingSource<'m>>,
    ) -> Result<Self> {
        let mut edges = self.edges.clone();
        for source in sources {
            let (from, target) = validate_binds(component, index, registry, source)?;
            let origin = source.origin();
            if let Some(existing) = edges.get(&from) {
                return Err(Error::new(
                    component,
                    ErrorKind::DuplicateBindings {
                        ty: registry.display(from),
                        candidates: vec![existing.origin.clone(), origin],
                    },
                )
                .at(source.decl.location.as_ref()));
            }
            edges.insert(
                from,
                BindingEdge {
                    target,
                    origin,
                    location: source.decl.location.clone(),
                },
            );
        }
        let resolver = Self { edges };
        resolver.check_acyclic(component, registry)?;
        Ok(resolver)
    }

    /// Follows binding edges from `key` to its canonical type.
    pub fn resolve(&self, key: TypeKey) -> TypeKey {
        let mut current = key;
        while let Some(edge) = self.edges.get(&current) {
            current = edge.target;
        }
        current
    }

    pub fn is_bound(&self, key: TypeKey) -> bool {
        self.edges.contains_key(&key)
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    fn check_acyclic(&self, component: &str, registry: &TypeRegistry) -> Result<()> {
        let mut starts: Vec<TypeKey> = self.edges.keys().copied().collect();
        starts.sort();
        let mut finished = HashSet::new();
        for start in starts {
            let mut path = Vec::new();
            let mut on_path = HashMap::new();
            let mut current = start;
            while !finished.contains(&current) {
                if let Some(&position) = on_path.get(&current) {
                    let mut chain: Vec<String> =
                        path[position..].iter().map(|k| registry.display(*k)).collect();
                    chain.push(registry.display(current));
                    let location = self.edges.get(&current).and_then(|e| e.location.as_ref());
                    return Err(
                        Error::new(component, ErrorKind::BindingCycle { chain }).at(location)
                    );
                }
                on_path.insert(current, path.len());
                path.push(current);
                match self.edges.get(&current) {
                    Some(edge) => current = edge.target,
                    None => break,
                }
            }
            finished.extend(path);
        }
        Ok(())
    }
}

/// Validates a binds declaration and returns its `(bound, target)` keys.
pub(crate) fn validate_binds(
    component: &str,
    index: &ModelIndex<'_>,
    registry: &TypeRegistry,
    source: BindingSource<'_>,
) -> Result<(TypeKey, TypeKey)> {
    let decl = source.decl;
    let invalid = |reason: String| {
        Error::new(
            component,
            ErrorKind::InvalidBinding {
                binding: source.origin(),
                reason,
            },
        )
        .at(decl.location.as_ref())
    };
    if !decl.is_abstract {
        return Err(invalid("binding declarations must be abstract".into()));
    }
    let [param] = decl.params.as_slice() else {
        return Err(invalid(format!(
            "expected exactly one parameter, found {}",
            decl.params.len()
        )));
    };
    let from = registry.intern(&decl.ty, decl.qualifier.as_deref(), None);
    let target = registry.intern(&param.ty, param.qualifier.as_deref(), None);
    if from == target {
        return Err(invalid(format!("{} is bound to itself", decl.ty)));
    }
    if !index.is_assignable(&param.ty, &decl.ty) {
        return Err(invalid(format!(
            "{} is not assignable to {}",
            param.ty, decl.ty
        )));
    }
    Ok((from, target))
}
