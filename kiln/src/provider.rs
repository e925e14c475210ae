use crate::{ParamDecl, Scope, ScopeId, SourceLocation, TypeKey, TypeRegistry};

/// A requested type, possibly optional.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Dependency {
    pub key: TypeKey,
    pub optional: bool,
}

impl Dependency {
    pub fn required(key: TypeKey) -> Self {
        Self {
            key,
            optional: false,
        }
    }

    pub fn optional(key: TypeKey) -> Self {
        Self {
            key,
            optional: true,
        }
    }

    pub(crate) fn of_param(registry: &TypeRegistry, param: &ParamDecl) -> Self {
        Self {
            key: registry.intern(&param.ty, param.qualifier.as_deref(), None),
            optional: param.optional,
        }
    }
}

/// Runtime cache lifetime of a claimed provider.
///
/// Derived from, but kept apart from, the validation [`ScopeId`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CacheSlot {
    /// Unscoped: one value per instance of the exposing component.
    Instance { component: String },
    /// Reusable: cached at each exposing site, never shared tree-wide.
    Site,
    /// Scoped: one value per instance of the component declaring `scope`.
    Scoped { component: String, scope: ScopeId },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    Property,
    ProvidesMethod,
    InjectableConstructor,
    SubcomponentFactory,
    AssistedFactory,
    SetMultibinding,
    MapMultibinding,
    ParentDelegate,
    MissingOptional,
}

/// Instance supplied through the component constructor.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PropertyProvider {
    pub key: TypeKey,
    pub name: String,
    /// The constructor may leave the value unset.
    pub optional: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProvidesMethod {
    pub key: TypeKey,
    pub module: String,
    pub method: String,
    pub params: Vec<Dependency>,
    pub scope: Option<Scope>,
    /// Assigned when the provider is claimed by a component.
    pub cache: Option<CacheSlot>,
    pub location: Option<SourceLocation>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InjectableConstructor {
    pub key: TypeKey,
    pub params: Vec<Dependency>,
    pub scope: Option<Scope>,
    pub cache: Option<CacheSlot>,
    pub location: Option<SourceLocation>,
}

/// Callable building an installed subcomponent from its constructor arguments.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubcomponentFactory {
    pub key: TypeKey,
    pub subcomponent: String,
    pub params: Vec<TypeKey>,
}

/// Callable building `target` from its assisted arguments plus graph values.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AssistedFactory {
    pub key: TypeKey,
    pub target: TypeKey,
    pub assisted: Vec<TypeKey>,
    pub params: Vec<Dependency>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SetContributionKind {
    /// A single element.
    Element,
    /// An iterable spread into the set when it is built.
    Elements,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SetContribution {
    pub dependency: TypeKey,
    pub kind: SetContributionKind,
    pub origin: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MapEntryKey {
    /// Key taken from an explicit key annotation.
    Literal(String),
    /// The contribution returns a `(key, value)` pair.
    Tuple,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MapContribution {
    pub dependency: TypeKey,
    pub key: MapEntryKey,
    pub origin: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SetMultibinding {
    pub key: TypeKey,
    pub element: TypeKey,
    pub contributions: Vec<SetContribution>,
    /// An ancestor contributes to the same set as well.
    pub extends_parent: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MapMultibinding {
    pub key: TypeKey,
    pub key_type: TypeKey,
    pub value_type: TypeKey,
    pub contributions: Vec<MapContribution>,
    pub extends_parent: bool,
}

/// Anything able to produce a value for a requested type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Provider {
    Property(PropertyProvider),
    ProvidesMethod(ProvidesMethod),
    InjectableConstructor(InjectableConstructor),
    SubcomponentFactory(SubcomponentFactory),
    AssistedFactory(AssistedFactory),
    SetMultibinding(SetMultibinding),
    MapMultibinding(MapMultibinding),
    /// Resolved by an ancestor component.
    ParentDelegate { key: TypeKey, optional: bool },
    /// Optional dependency without any provider.
    MissingOptional { key: TypeKey },
}

impl Provider {
    pub fn key(&self) -> TypeKey {
        match self {
            Provider::Property(p) => p.key,
            Provider::ProvidesMethod(p) => p.key,
            Provider::InjectableConstructor(p) => p.key,
            Provider::SubcomponentFactory(p) => p.key,
            Provider::AssistedFactory(p) => p.key,
            Provider::SetMultibinding(p) => p.key,
            Provider::MapMultibinding(p) => p.key,
            Provider::ParentDelegate { key, .. } | Provider::MissingOptional { key } => *key,
        }
    }

    pub fn kind(&self) -> ProviderKind {
        match self {
            Provider::Property(_) => ProviderKind::Property,
            Provider::ProvidesMethod(_) => ProviderKind::ProvidesMethod,
            Provider::InjectableConstructor(_) => ProviderKind::InjectableConstructor,
            Provider::SubcomponentFactory(_) => ProviderKind::SubcomponentFactory,
            Provider::AssistedFactory(_) => ProviderKind::AssistedFactory,
            Provider::SetMultibinding(_) => ProviderKind::SetMultibinding,
            Provider::MapMultibinding(_) => ProviderKind::MapMultibinding,
            Provider::ParentDelegate { .. } => ProviderKind::ParentDelegate,
            Provider::MissingOptional { .. } => ProviderKind::MissingOptional,
        }
    }

    /// Types this provider needs in order to produce its value.
    pub fn dependencies(&self) -> Vec<Dependency> {
        match self {
            Provider::ProvidesMethod(p) => p.params.clone(),
            Provider::InjectableConstructor(p) => p.params.clone(),
            Provider::AssistedFactory(p) => p.params.clone(),
            Provider::SetMultibinding(p) => p
                .contributions
                .iter()
                .map(|c| Dependency::required(c.dependency))
                .collect(),
            Provider::MapMultibinding(p) => p
                .contributions
                .iter()
                .map(|c| Dependency::required(c.dependency))
                .collect(),
            Provider::Property(_)
            | Provider::SubcomponentFactory(_)
            | Provider::ParentDelegate { .. }
            | Provider::MissingOptional { .. } => Vec::new(),
        }
    }

    pub fn cache(&self) -> Option<&CacheSlot> {
        match self {
            Provider::ProvidesMethod(p) => p.cache.as_ref(),
            Provider::InjectableConstructor(p) => p.cache.as_ref(),
            _ => None,
        }
    }

    pub fn extends_parent(&self) -> bool {
        match self {
            Provider::SetMultibinding(p) => p.extends_parent,
            Provider::MapMultibinding(p) => p.extends_parent,
            _ => false,
        }
    }

    /// Constructor property that may be left unset.
    pub fn is_unset_optional(&self) -> bool {
        matches!(self, Provider::Property(p) if p.optional)
    }

    pub fn describe(&self, registry: &TypeRegistry) -> String {
        match self {
            Provider::Property(p) => format!("property {}", p.name),
            Provider::ProvidesMethod(p) => format!("{}.{}", p.module, p.method),
            Provider::SubcomponentFactory(p) => format!("factory of {}", p.subcomponent),
            other => format!("{:?} {}", other.kind(), registry.display(other.key())),
        }
    }
}
