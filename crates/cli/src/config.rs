//! CLI configuration
//!
//! Settings come from an optional JSON file and are overridden by flags.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use clap::ValueEnum;
use finality_analyzer::Category;
use serde::Deserialize;
use tracing_subscriber::EnvFilter;

/// Category selector for `finality classify`
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CategoryFilter {
    Safe,
    Unsafe,
    Bivalent,
}

impl CategoryFilter {
    pub fn matches(&self, category: Category) -> bool {
        matches!(
            (self, category),
            (CategoryFilter::Safe, Category::Safe)
                | (CategoryFilter::Unsafe, Category::Unsafe)
                | (CategoryFilter::Bivalent, Category::Bivalent)
        )
    }
}

/// Settings shared by every command
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AnalyzeConfig {
    /// Tracing filter directive (e.g. `info`, `finality_analyzer=debug`)
    pub log_level: String,
    /// Only list messages of this category
    pub category: Option<CategoryFilter>,
}

impl Default for AnalyzeConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            category: None,
        }
    }
}

impl AnalyzeConfig {
    /// Load a JSON config file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        serde_json::from_str(&json)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Apply command-line overrides
    pub fn with_overrides(
        mut self,
        log_level: Option<String>,
        category: Option<CategoryFilter>,
    ) -> Self {
        if let Some(level) = log_level {
            self.log_level = level;
        }
        if category.is_some() {
            self.category = category;
        }
        self
    }

    /// Install the tracing subscriber. `RUST_LOG` wins over the config.
    pub fn init_tracing(&self) -> Result<()> {
        let filter = match EnvFilter::try_from_default_env() {
            Ok(filter) => filter,
            Err(_) => EnvFilter::try_new(&self.log_level)
                .with_context(|| format!("Invalid log level: {}", self.log_level))?,
        };

        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = AnalyzeConfig::default();
        assert_eq!(config.log_level, "info");
        assert!(config.category.is_none());
    }

    #[test]
    fn test_load_partial_config() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("finality.json");
        std::fs::write(&path, r#"{"category": "unsafe"}"#).unwrap();

        let config = AnalyzeConfig::load(&path).unwrap();
        assert_eq!(config.log_level, "info");
        assert_eq!(config.category, Some(CategoryFilter::Unsafe));
    }

    #[test]
    fn test_flags_override_file() {
        let config = AnalyzeConfig {
            log_level: "warn".to_string(),
            category: Some(CategoryFilter::Safe),
        }
        .with_overrides(Some("debug".to_string()), None);

        assert_eq!(config.log_level, "debug");
        assert_eq!(config.category, Some(CategoryFilter::Safe));
    }

    #[test]
    fn test_missing_config_file() {
        assert!(AnalyzeConfig::load("no/such/config.json").is_err());
    }

    #[test]
    fn test_category_filter_matches() {
        assert!(CategoryFilter::Bivalent.matches(Category::Bivalent));
        assert!(!CategoryFilter::Safe.matches(Category::Unsafe));
    }
}
