use thiserror::Error;

use crate::SourceLocation;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Error raised by a resolution run.
///
/// Every error carries its [`ErrorKind`] tag and, except for model-level
/// failures, the name of the component being resolved when it was detected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}{}{}", component_prefix(.component), .kind, location_suffix(.location))]
pub struct Error {
    pub component: Option<String>,
    pub location: Option<SourceLocation>,
    pub kind: ErrorKind,
}

impl Error {
    pub fn new(component: impl Into<String>, kind: ErrorKind) -> Self {
        Self {
            component: Some(component.into()),
            location: None,
            kind,
        }
    }

    /// Error not attributable to any single component.
    pub fn model(kind: ErrorKind) -> Self {
        Self {
            component: None,
            location: None,
            kind,
        }
    }

    pub fn at(mut self, location: Option<&SourceLocation>) -> Self {
        if self.location.is_none() {
            self.location = location.cloned();
        }
        self
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    pub fn tag(&self) -> &'static str {
        self.kind.tag()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ErrorKind {
    /// Malformed declaration: bad arity, unknown reference or duplicate name.
    #[error("parse error: {message}")]
    Parse { message: String },
    #[error("invalid scope: got {got}, expected {expected}")]
    InvalidScope { got: String, expected: String },
    /// A subcomponent reuses the scope of one of its ancestors.
    #[error("duplicate scope {scope}: already declared by ancestor {ancestor}")]
    DuplicateScope { scope: String, ancestor: String },
    #[error("invalid binding {binding}: {reason}")]
    InvalidBinding { binding: String, reason: String },
    /// Every non-optional dependency of a component without a provider.
    #[error("missing providers for {}\n{tree}", .missing.join(", "))]
    MissingProvider { missing: Vec<String>, tree: String },
    /// Pairs of (required provider, optional value it cannot do without).
    #[error("required providers depend on unset optional values: {}", render_pairs(.pairs))]
    MissingRequiredProviders { pairs: Vec<(String, String)> },
    #[error("duplicate providers for {ty}: {}", .candidates.join(", "))]
    DuplicateProviders { ty: String, candidates: Vec<String> },
    #[error("duplicate bindings for {ty}: {}", .candidates.join(", "))]
    DuplicateBindings { ty: String, candidates: Vec<String> },
    #[error("dependency cycle: {}", .chain.join(" -> "))]
    DependencyCycle { chain: Vec<String> },
    #[error("binding cycle: {}", .chain.join(" -> "))]
    BindingCycle { chain: Vec<String> },
    #[error("internal error: {message}")]
    Internal { message: String },
    #[error("no components to resolve")]
    NoComponents,
}

impl ErrorKind {
    pub fn tag(&self) -> &'static str {
        match self {
            ErrorKind::Parse { .. } => "Parse",
            ErrorKind::InvalidScope { .. } => "InvalidScope",
            ErrorKind::DuplicateScope { .. } => "DuplicateScope",
            ErrorKind::InvalidBinding { .. } => "InvalidBinding",
            ErrorKind::MissingProvider { .. } => "MissingProvider",
            ErrorKind::MissingRequiredProviders { .. } => "MissingRequiredProviders",
            ErrorKind::DuplicateProviders { .. } => "DuplicateProviders",
            ErrorKind::DuplicateBindings { .. } => "DuplicateBindings",
            ErrorKind::DependencyCycle { .. } => "DependencyCycle",
            ErrorKind::BindingCycle { .. } => "BindingCycle",
            ErrorKind::Internal { .. } => "Internal",
            ErrorKind::NoComponents => "NoComponents",
        }
    }
}

fn component_prefix(component: &Option<String>) -> String {
    match component {
        Some(name) => format!("{name}: "),
        None => String::new(),
    }
}

fn location_suffix(location: &Option<SourceLocation>) -> String {
    match location {
        Some(location) => format!(" (at {location})"),
        None => String::new(),
    }
}

fn render_pairs(pairs: &[(String, String)]) -> String {
    pairs
        .iter()
        .map(|(provider, optional)| format!("{provider} requires {optional}"))
        .collect::<Vec<_>>()
        .join(", ")
}
