//! Input model handed over by the source-extraction step.
//!
//! The model is plain data: the nominal type table, modules with their
//! factories and bindings, and the component tree. It is deserialized from JSON
//! and never mutated by the resolver.
//!
//! ```rust
//! use kiln::Model;
//!
//! let model = Model::parse(r#"{
//!     "types": [{
//!         "name": "Greeter",
//!         "constructor": { "params": [{ "name": "message", "type": "string" }] }
//!     }],
//!     "modules": [{
//!         "name": "GreetingModule",
//!         "provides": [{ "name": "message", "type": "string" }]
//!     }],
//!     "components": [{
//!         "name": "App",
//!         "modules": ["GreetingModule"],
//!         "roots": [{ "name": "greeter", "type": "Greeter" }]
//!     }]
//! }"#).unwrap();
//!
//! assert_eq!(model.components[0].roots[0].name, "greeter");
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{Error, ErrorKind, Result, TypeExpr};

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Model {
    #[serde(default)]
    pub types: Vec<TypeDecl>,
    #[serde(default)]
    pub modules: Vec<ModuleDecl>,
    #[serde(default)]
    pub components: Vec<ComponentDecl>,
}

impl Model {
    pub fn parse(text: impl AsRef<str>) -> Result<Self> {
        serde_json::from_str(text.as_ref()).map_err(parse_error)
    }

    pub fn from_json(value: serde_json::Value) -> Result<Self> {
        serde_json::from_value(value).map_err(parse_error)
    }
}

fn parse_error(err: serde_json::Error) -> Error {
    Error::model(ErrorKind::Parse {
        message: err.to_string(),
    })
}

/// Position of a declaration in the scanned source files.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceLocation {
    pub file: String,
    pub line: u32,
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}

/// Identity of a declared scope. Used only for validation.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScopeId(pub String);

impl ScopeId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }
}

impl fmt::Display for ScopeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Scope annotation on a provider or an injectable type.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    /// May be cached at any exposing site; never shared tree-wide.
    Reusable,
    Named(ScopeId),
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Reusable => f.write_str("reusable"),
            Scope::Named(id) => write!(f, "{id}"),
        }
    }
}

/// Entry of the nominal type table.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TypeDecl {
    pub name: String,
    #[serde(default)]
    pub supertypes: Vec<String>,
    #[serde(default, rename = "abstract")]
    pub is_abstract: bool,
    #[serde(default)]
    pub scope: Option<Scope>,
    #[serde(default)]
    pub constructor: Option<ConstructorDecl>,
    #[serde(default)]
    pub location: Option<SourceLocation>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConstructorDecl {
    /// Whether the constructor carries the injectable annotation.
    #[serde(default = "default_true")]
    pub injectable: bool,
    #[serde(default)]
    pub params: Vec<ParamDecl>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ParamDecl {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: TypeExpr,
    #[serde(default)]
    pub qualifier: Option<String>,
    #[serde(default)]
    pub optional: bool,
    /// Supplied by the caller of an assisted factory instead of the graph.
    #[serde(default)]
    pub assisted: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ModuleDecl {
    pub name: String,
    #[serde(default)]
    pub includes: Vec<String>,
    #[serde(default)]
    pub provides: Vec<ProvidesDecl>,
    #[serde(default)]
    pub binds: Vec<BindsDecl>,
    #[serde(default)]
    pub location: Option<SourceLocation>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Multibinding {
    IntoSet,
    ElementsIntoSet,
    IntoMap,
}

/// Explicit map key annotation of a map contribution.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MapKey {
    #[serde(rename = "type")]
    pub ty: TypeExpr,
    pub value: String,
}

/// Factory method declared in a module.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProvidesDecl {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: TypeExpr,
    #[serde(default)]
    pub qualifier: Option<String>,
    #[serde(default)]
    pub scope: Option<Scope>,
    #[serde(default)]
    pub params: Vec<ParamDecl>,
    #[serde(default)]
    pub multibinding: Option<Multibinding>,
    #[serde(default)]
    pub map_key: Option<MapKey>,
    #[serde(default)]
    pub location: Option<SourceLocation>,
}

/// Binding declaration redirecting `ty` to the type of its single parameter.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BindsDecl {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: TypeExpr,
    #[serde(default)]
    pub qualifier: Option<String>,
    #[serde(default)]
    pub params: Vec<ParamDecl>,
    #[serde(default = "default_true", rename = "abstract")]
    pub is_abstract: bool,
    #[serde(default)]
    pub multibinding: Option<Multibinding>,
    #[serde(default)]
    pub map_key: Option<MapKey>,
    #[serde(default)]
    pub location: Option<SourceLocation>,
}

/// Component or subcomponent declaration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ComponentDecl {
    pub name: String,
    #[serde(default)]
    pub scope: Option<ScopeId>,
    #[serde(default)]
    pub subcomponent: bool,
    #[serde(default)]
    pub modules: Vec<String>,
    /// Subcomponents installed in this component.
    #[serde(default)]
    pub subcomponents: Vec<String>,
    /// Instance bindings supplied through the component constructor.
    #[serde(default)]
    pub properties: Vec<MemberDecl>,
    /// Exposed accessors the component must resolve.
    #[serde(default)]
    pub roots: Vec<MemberDecl>,
    #[serde(default)]
    pub location: Option<SourceLocation>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MemberDecl {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: TypeExpr,
    #[serde(default)]
    pub qualifier: Option<String>,
    #[serde(default)]
    pub optional: bool,
}

fn default_true() -> bool {
    true
}
