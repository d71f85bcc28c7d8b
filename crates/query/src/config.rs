//! Searcher configuration.
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `SOLAR_UNIQUE_KEY` | id | Unique key field, used for instance mapping |
//! | `SOLAR_DEFAULT_ROWS` | (engine default) | `rows` sent when a query sets no limit |
//! | `SOLAR_DEFAULT_FIELDS` | *,score | `fl` sent when a query sets no field list |
//!
//! # Example
//!
//! ```rust
//! use solar_query::SearcherConfig;
//!
//! let config = SearcherConfig {
//!     unique_key: "uuid".to_string(),
//!     default_rows: Some(20),
//!     ..Default::default()
//! };
//! assert!(config.validate().is_ok());
//! ```

use clap::Parser;

/// Settings shared by every query created from one searcher.
#[derive(Debug, Clone, PartialEq, Eq, Parser)]
#[command(name = "solar-searcher")]
#[command(about = "Solr searcher settings")]
pub struct SearcherConfig {
    /// Unique key field of the collection.
    #[arg(long, env = "SOLAR_UNIQUE_KEY", default_value = "id")]
    pub unique_key: String,

    /// Rows requested when a query sets no limit.
    #[arg(long, env = "SOLAR_DEFAULT_ROWS")]
    pub default_rows: Option<u32>,

    /// Field list requested when a query sets none (comma-separated).
    #[arg(long, env = "SOLAR_DEFAULT_FIELDS", default_value = "*,score")]
    pub default_fields: String,
}

impl Default for SearcherConfig {
    fn default() -> Self {
        Self {
            unique_key: "id".to_string(),
            default_rows: None,
            default_fields: "*,score".to_string(),
        }
    }
}

impl SearcherConfig {
    /// Creates a configuration from environment variables, falling back to
    /// defaults.
    pub fn from_env() -> Self {
        Self::try_parse_from(["solar-searcher"]).unwrap_or_default()
    }

    /// The default field list split into fields.
    pub fn default_field_list(&self) -> Vec<String> {
        self.default_fields
            .split(',')
            .map(str::trim)
            .filter(|field| !field.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// Validates the configuration and returns errors if any.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.unique_key.trim().is_empty() {
            errors.push("Unique key cannot be empty".to_string());
        }

        if self.unique_key.chars().any(char::is_whitespace) {
            errors.push("Unique key cannot contain whitespace".to_string());
        }

        if self.default_field_list().is_empty() {
            errors.push("Default field list cannot be empty".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
