//! TOML configuration for the grounding engine.
//!
//! ```toml
//! [spreading]
//! decay = 0.7
//! threshold = 0.15
//! max_depth = 2
//!
//! [spreading.relation_weights]
//! capital_of = 0.8
//!
//! [verifier]
//! confidence_threshold = 0.6
//! generic_relation_fallback = true
//! ```
//!
//! Missing keys take their defaults. Entries under
//! `[spreading.relation_weights]` override the built-in weight of that
//! relation and leave the rest of the table in place.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, GroundingResult};
use crate::spreading::SpreadingConfig;
use crate::store::KnowledgeStore;
use crate::verify::{ClaimVerifier, VerifierConfig};

/// Result type for configuration operations.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Complete engine configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GroundingConfig {
    pub spreading: SpreadingConfig,
    pub verifier: VerifierConfig,
}

impl GroundingConfig {
    /// Load and validate a TOML config file.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::parse(&content, &path.display().to_string())
    }

    /// Parse and validate TOML text.
    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        Self::parse(content, "<inline>")
    }

    fn parse(content: &str, origin: &str) -> ConfigResult<Self> {
        let config: Self = toml::from_str(content).map_err(|e| ConfigError::Parse {
            path: origin.to_string(),
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Write the config as TOML, creating parent directories.
    pub fn save(&self, path: &Path) -> ConfigResult<()> {
        let content = toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize {
            message: e.to_string(),
        })?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::Write {
                path: parent.display().to_string(),
                source: e,
            })?;
        }
        std::fs::write(path, content).map_err(|e| ConfigError::Write {
            path: path.display().to_string(),
            source: e,
        })?;
        tracing::info!(path = %path.display(), "saved grounding config");
        Ok(())
    }

    /// Check every section's value ranges.
    pub fn validate(&self) -> ConfigResult<()> {
        self.spreading.validate().map_err(|e| ConfigError::Invalid {
            field: "spreading".into(),
            message: e.to_string(),
        })?;
        self.verifier.validate()
    }

    /// Build a verifier over `store` with this configuration.
    pub fn verifier<S: KnowledgeStore>(&self, store: S) -> GroundingResult<ClaimVerifier<S>> {
        ClaimVerifier::with_config(store, self.verifier.clone(), self.spreading.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn partial_file_keeps_defaults() {
        let config = GroundingConfig::from_toml_str(
            r#"
            [spreading]
            decay = 0.5

            [spreading.relation_weights]
            married_to = 0.6

            [verifier]
            generic_relation_fallback = false
            "#,
        )
        .unwrap();
        assert_eq!(config.spreading.decay, 0.5);
        assert_eq!(config.spreading.threshold, 0.15);
        assert_eq!(config.spreading.relation_weight("married_to"), 0.6);
        // Weights named in the file are merged over the defaults.
        assert_eq!(config.spreading.relation_weight("part_of"), 0.9);
        assert_eq!(config.spreading.relation_weight("unlisted"), 0.5);
        assert!(!config.verifier.generic_relation_fallback);
        assert_eq!(config.verifier.confidence_threshold, 0.6);
    }

    #[test]
    fn configured_weight_overrides_a_default() {
        let config = GroundingConfig::from_toml_str("[spreading.relation_weights]\ncapital_of = 0.3\n").unwrap();
        assert_eq!(config.spreading.relation_weight("capital_of"), 0.3);
        assert_eq!(config.spreading.relation_weight("located_in"), 0.8);
        assert_eq!(
            config.spreading.relation_weights.len(),
            SpreadingConfig::default().relation_weights.len()
        );
    }

    #[test]
    fn empty_file_is_default() {
        assert_eq!(GroundingConfig::from_toml_str("").unwrap(), GroundingConfig::default());
    }

    #[test]
    fn out_of_range_values_are_rejected() {
        let err = GroundingConfig::from_toml_str("[spreading]\nthreshold = 1.5\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { ref field, .. } if field == "spreading"));

        let err = GroundingConfig::from_toml_str("[verifier]\nconfidence_threshold = -0.1\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));

        let err = GroundingConfig::from_toml_str("[spreading\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn save_then_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("grounding.toml");
        let mut config = GroundingConfig::default();
        config.spreading.max_results = 7;
        config.verifier.search_limit = 3;
        config.save(&path).unwrap();

        let loaded = GroundingConfig::load(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn rendering_failures_are_not_parse_errors() {
        use miette::Diagnostic;

        let err = ConfigError::Serialize {
            message: "unsupported value".into(),
        };
        assert_eq!(err.to_string(), "failed to serialize config: unsupported value");
        assert_eq!(err.code().map(|c| c.to_string()).as_deref(), Some("grounding::config::serialize"));
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let dir = TempDir::new().unwrap();
        let err = GroundingConfig::load(&dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
