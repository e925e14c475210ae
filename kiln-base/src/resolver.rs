use std::path::Path;

use kiln::{Model, Resolution, ResolverConfig};

use crate::{Config, StdError, Tracing};

/// Runs resolutions with limits and logging taken from a [`Config`].
#[derive(Clone, Debug, Default)]
pub struct Resolver {
    config: ResolverConfig,
}

impl Resolver {
    pub fn new(config: ResolverConfig) -> Self {
        Self { config }
    }

    /// Installs tracing and reads the `resolver` section.
    pub fn from_config(config: &Config) -> Result<Self, StdError> {
        if !Tracing::install(config)? {
            tracing::debug!("Tracing subscriber already installed");
        }
        Ok(Self::new(config.section()?))
    }

    /// Layers the given config files and reads them as [`Resolver::from_config`] does.
    pub fn from_files<I>(paths: I) -> Result<Self, StdError>
    where
        I: IntoIterator,
        I::Item: AsRef<Path>,
    {
        Self::from_config(&Config::load(paths)?)
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    pub fn resolve(&self, model: &Model) -> kiln::Result<Resolution> {
        kiln::resolve(model, &self.config).inspect_err(|err| {
            tracing::error!(kind = err.tag(), "Cannot resolve model: {err}");
        })
    }

    /// Parses a JSON model and resolves it.
    pub fn resolve_json(&self, text: impl AsRef<str>) -> Result<Resolution, StdError> {
        let model = Model::parse(text)?;
        Ok(self.resolve(&model)?)
    }
}
