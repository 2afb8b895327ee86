use crate::config::AnalysisConfig;
use crate::error::ConfigError;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use std::path::Path;

pub struct ConfigLoader;

impl ConfigLoader {
    /// Loads configuration by layering built-in defaults, a TOML file and
    /// `TRADEFLOW_`-prefixed environment variables (`__` separates sections,
    /// e.g. `TRADEFLOW_ANALYSIS__TOP_N=5`).
    ///
    /// A missing TOML file is not an error; the defaults then apply.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be parsed, a value has the wrong
    /// type, or the merged configuration fails validation.
    pub fn load(path: &Path) -> Result<AnalysisConfig, ConfigError> {
        let config: AnalysisConfig = Self::figment(path).extract()?;
        config.validate()?;
        tracing::debug!(
            countries = ?config.inputs.countries,
            years = ?config.inputs.years,
            "configuration loaded"
        );
        Ok(config)
    }

    /// The layered provider stack, exposed for callers that merge extra layers.
    #[must_use]
    pub fn figment(path: &Path) -> Figment {
        Figment::from(Serialized::defaults(AnalysisConfig::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed("TRADEFLOW_").split("__"))
    }
}
