//! # kiln-base
//!
//! Configuration and logging around the kiln resolver.
//!
//! ## Core Components
//!
//! - **Configuration System**: JSON configuration made of named sections, merged from multiple sources
//! - **Tracing Integration**: Structured logging set up from the `tracing` section
//! - **Resolver**: Runs resolutions with the limits of the `resolver` section
//!
//! ## Configuration Example
//!
//! ```rust
//! use kiln_base::{Config, Resolver};
//!
//! let config = Config::parse(r#"{
//!     "tracing": { "level": "warn" },
//!     "resolver": { "max_passes": 8 }
//! }"#)?;
//!
//! let resolver = Resolver::from_config(&config)?;
//! assert_eq!(resolver.config().max_passes, 8);
//! assert_eq!(resolver.config().max_depth, 64);
//!
//! let resolution = resolver.resolve_json(r#"{
//!     "modules": [{ "name": "Greetings", "provides": [{ "name": "greeting", "type": "string" }] }],
//!     "components": [{
//!         "name": "App",
//!         "modules": ["Greetings"],
//!         "roots": [{ "name": "greeting", "type": "string" }]
//!     }]
//! }"#)?;
//! assert_eq!(resolution.components[0].resolved.len(), 1);
//! # Ok::<(), kiln_base::StdError>(())
//! ```

mod config;
mod resolver;
mod tracing;

pub use config::*;
pub use resolver::*;
pub use tracing::*;

pub type StdError = Box<dyn std::error::Error + Send + Sync>;
