//! # kiln
//!
//! A compile-time dependency injection graph resolver. Given the declarations
//! extracted from a program (types with their constructors, modules of factory
//! methods and bindings, components and their subcomponents), kiln computes the
//! minimal, cycle-free set of providers each component needs and reports
//! precise diagnostics when it cannot.
//!
//! ## Core Concepts
//!
//! - **Model**: The declarations to resolve, deserialized from JSON
//! - **TypeRegistry**: Interns qualified types into cheap `TypeKey` handles
//! - **BindingResolver**: Follows `binds` edges from abstract types to implementations
//! - **ProviderLocator**: Collects the properties, factory methods and multibindings of a component
//! - **GraphBuilder**: Turns a component's roots into a resolved provider graph
//! - **ComponentComposer**: Resolves a component together with its nested subcomponents
//!
//! ## Basic Usage
//!
//! ```rust
//! use kiln::{Model, ProviderKind, ResolverConfig, resolve};
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
//! }"#)?;
//!
//! let resolution = resolve(&model, &ResolverConfig::default())?;
//! let app = resolution.component("App").unwrap();
//! let greeter = resolution.key("Greeter", None).unwrap();
//! assert_eq!(
//!     app.provider(greeter).map(|p| p.kind()),
//!     Some(ProviderKind::InjectableConstructor),
//! );
//! assert!(app.missing.is_empty());
//! # Ok::<(), kiln::Error>(())
//! ```
//!
//! ## Diagnostics
//!
//! Resolution stops at the first problem found. The returned [`Error`] names
//! the component being resolved and carries an [`ErrorKind`] describing what
//! went wrong, for example every type nobody provides:
//!
//! ```rust
//! use kiln::{ErrorKind, Model, ResolverConfig, resolve};
//!
//! let model = Model::parse(r#"{
//!     "types": [{ "name": "Greeter", "constructor": { "params": [{ "name": "m", "type": "string" }] } }],
//!     "components": [{ "name": "App", "roots": [{ "name": "greeter", "type": "Greeter" }] }]
//! }"#)?;
//!
//! let error = resolve(&model, &ResolverConfig::default()).err().unwrap();
//! let ErrorKind::MissingProvider { missing, .. } = error.kind() else {
//!     panic!("unexpected error: {error}");
//! };
//! assert_eq!(missing, &["string"]);
//! # Ok::<(), kiln::Error>(())
//! ```

mod binding;
mod compose;
mod error;
mod factory;
mod graph;
mod index;
mod locator;
mod model;
mod provider;
mod registry;
mod session;
mod tree;
mod types;

pub use binding::*;
pub use compose::*;
pub use error::*;
pub use factory::*;
pub use graph::*;
pub use index::*;
pub use locator::*;
pub use model::*;
pub use provider::*;
pub use registry::*;
pub use session::*;
pub use tree::*;
pub use types::*;
