use crate::error::ConfigError;
use crate::table::Field;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

/// Dependent variables the regression stage knows how to build.
pub const DEPENDENT_VARIABLES: [&str; 2] = ["ln_trade_value", "ln_product_count"];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    pub inputs: InputConfig,
    pub outputs: OutputConfig,
    pub analysis: AnalysisSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputConfig {
    /// Directory holding the per-country, per-year extracts
    pub trade_dir: PathBuf,
    /// File name pattern with `{reporter}` and `{year}` placeholders
    pub file_pattern: String,
    pub gdp_file: PathBuf,
    pub gravity_file: PathBuf,
    /// Reporting countries (ISO3), processed in this order
    pub countries: Vec<String>,
    pub years: Vec<i32>,
    /// Reference-table code -> panel code, e.g. `ROU = "ROM"`
    #[serde(default)]
    pub country_aliases: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    pub dir: PathBuf,
    pub summary_file: String,
    pub top_partners_file: String,
    pub top_products_file: String,
    pub export_shares_file: String,
    pub sector_shares_file: String,
    pub baseline_file: String,
    pub fixed_effects_file: String,
    pub diagnostics_file: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisSettings {
    /// Rank cutoff for the top-partner/product/share views (tie-inclusive)
    pub top_n: usize,
    /// Heteroskedasticity-consistent (HC1) standard errors
    pub robust: bool,
    pub dependents: Vec<String>,
    /// Categorical groups expanded to dummies in the fixed-effects model
    pub fixed_effects: Vec<Field>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            inputs: InputConfig {
                trade_dir: PathBuf::from("data/raw"),
                file_pattern: "{reporter}_{year}.csv".to_string(),
                gdp_file: PathBuf::from("data/reference/gdp.csv"),
                gravity_file: PathBuf::from("data/reference/gravity.csv"),
                countries: vec!["ROM".to_string(), "BGR".to_string()],
                years: vec![2011, 2012, 2013],
                country_aliases: BTreeMap::new(),
            },
            outputs: OutputConfig {
                dir: PathBuf::from("output"),
                summary_file: "summary_statistics.csv".to_string(),
                top_partners_file: "top_partners.csv".to_string(),
                top_products_file: "top_products.csv".to_string(),
                export_shares_file: "export_shares.csv".to_string(),
                sector_shares_file: "sector_export_shares.csv".to_string(),
                baseline_file: "regression_baseline.csv".to_string(),
                fixed_effects_file: "regression_fixed_effects.csv".to_string(),
                diagnostics_file: "diagnostics.json".to_string(),
            },
            analysis: AnalysisSettings {
                top_n: 3,
                robust: true,
                dependents: DEPENDENT_VARIABLES.iter().map(|s| (*s).to_string()).collect(),
                fixed_effects: vec![Field::Reporter, Field::Partner, Field::Sector, Field::Year],
            },
        }
    }
}

impl InputConfig {
    /// Path of the extract for one reporter and year.
    #[must_use]
    pub fn trade_file(&self, reporter: &str, year: i32) -> PathBuf {
        let name = self
            .file_pattern
            .replace("{reporter}", reporter)
            .replace("{year}", &year.to_string());
        self.trade_dir.join(name)
    }

    /// Every (reporter, year) pair to ingest, countries outermost.
    #[must_use]
    pub fn extracts(&self) -> Vec<(String, i32)> {
        self.countries
            .iter()
            .flat_map(|c| self.years.iter().map(move |y| (c.clone(), *y)))
            .collect()
    }

    /// Maps a reference-table country code onto the panel's code.
    #[must_use]
    pub fn canonical_country<'a>(&'a self, code: &'a str) -> &'a str {
        self.country_aliases.get(code).map_or(code, String::as_str)
    }
}

impl OutputConfig {
    #[must_use]
    pub fn path(&self, file: &str) -> PathBuf {
        self.dir.join(file)
    }
}

impl AnalysisConfig {
    /// Checks internal consistency.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` describing the first problem found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let inputs = &self.inputs;
        if inputs.countries.is_empty() {
            return Err(ConfigError::Invalid("inputs.countries is empty".into()));
        }
        if inputs.years.is_empty() {
            return Err(ConfigError::Invalid("inputs.years is empty".into()));
        }
        if !inputs.file_pattern.contains("{reporter}") || !inputs.file_pattern.contains("{year}") {
            return Err(ConfigError::Invalid(format!(
                "inputs.file_pattern '{}' must contain {{reporter}} and {{year}}",
                inputs.file_pattern
            )));
        }
        let unique_countries: BTreeSet<&String> = inputs.countries.iter().collect();
        if unique_countries.len() != inputs.countries.len() {
            return Err(ConfigError::Invalid("inputs.countries has duplicates".into()));
        }
        let unique_years: BTreeSet<&i32> = inputs.years.iter().collect();
        if unique_years.len() != inputs.years.len() {
            return Err(ConfigError::Invalid("inputs.years has duplicates".into()));
        }
        if let Some(bad) = inputs.countries.iter().find(|c| c.len() != 3) {
            return Err(ConfigError::Invalid(format!("'{bad}' is not an ISO3 code")));
        }

        let analysis = &self.analysis;
        if analysis.top_n == 0 {
            return Err(ConfigError::Invalid("analysis.top_n must be at least 1".into()));
        }
        if analysis.dependents.is_empty() {
            return Err(ConfigError::Invalid("analysis.dependents is empty".into()));
        }
        if let Some(bad) = analysis
            .dependents
            .iter()
            .find(|d| !DEPENDENT_VARIABLES.contains(&d.as_str()))
        {
            return Err(ConfigError::Invalid(format!(
                "unknown dependent variable '{bad}', expected one of {DEPENDENT_VARIABLES:?}"
            )));
        }
        if let Some(bad) = analysis.fixed_effects.iter().find(|f| {
            !matches!(
                f,
                Field::Reporter | Field::Partner | Field::Sector | Field::Year
            )
        }) {
            return Err(ConfigError::Invalid(format!(
                "'{bad}' cannot be used as a fixed effect at sector grain"
            )));
        }
        Ok(())
    }

    /// Rebases relative input and output paths onto `root`.
    #[must_use]
    pub fn rebased(mut self, root: &Path) -> Self {
        let rebase = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = root.join(&*p);
            }
        };
        rebase(&mut self.inputs.trade_dir);
        rebase(&mut self.inputs.gdp_file);
        rebase(&mut self.inputs.gravity_file);
        rebase(&mut self.outputs.dir);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        AnalysisConfig::default().validate().unwrap();
    }

    #[test]
    fn test_trade_file_substitutes_placeholders() {
        let config = AnalysisConfig::default();
        assert_eq!(
            config.inputs.trade_file("ROM", 2012),
            PathBuf::from("data/raw/ROM_2012.csv")
        );
    }

    #[test]
    fn test_extracts_cover_every_country_year() {
        let config = AnalysisConfig::default();
        let extracts = config.inputs.extracts();
        assert_eq!(extracts.len(), 6);
        assert_eq!(extracts[0], ("ROM".to_string(), 2011));
        assert_eq!(extracts[5], ("BGR".to_string(), 2013));
    }

    #[test]
    fn test_validate_rejects_bad_settings() {
        let mut config = AnalysisConfig::default();
        config.analysis.top_n = 0;
        assert!(config.validate().is_err());

        let mut config = AnalysisConfig::default();
        config.inputs.file_pattern = "trade.csv".to_string();
        assert!(config.validate().is_err());

        let mut config = AnalysisConfig::default();
        config.analysis.dependents = vec!["ln_tariff".to_string()];
        assert!(config.validate().is_err());

        let mut config = AnalysisConfig::default();
        config.inputs.years = vec![2011, 2011];
        assert!(config.validate().is_err());

        let mut config = AnalysisConfig::default();
        config.analysis.fixed_effects = vec![Field::Product];
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_country_aliases_map_reference_codes() {
        let mut config = AnalysisConfig::default();
        config
            .inputs
            .country_aliases
            .insert("ROU".to_string(), "ROM".to_string());
        assert_eq!(config.inputs.canonical_country("ROU"), "ROM");
        assert_eq!(config.inputs.canonical_country("DEU"), "DEU");
    }

    #[test]
    fn test_rebased_keeps_absolute_paths() {
        let mut config = AnalysisConfig::default();
        config.inputs.gdp_file = PathBuf::from("/srv/gdp.csv");
        let config = config.rebased(Path::new("/work"));
        assert_eq!(config.inputs.trade_dir, PathBuf::from("/work/data/raw"));
        assert_eq!(config.inputs.gdp_file, PathBuf::from("/srv/gdp.csv"));
    }
}
