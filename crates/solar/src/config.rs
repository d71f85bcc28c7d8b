//! Command line configuration.
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `SOLAR_FILTERS` | - | Filter declaration file (JSON) |
//! | `SOLAR_LOG_LEVEL` | warn | Log level (error, warn, info, debug, trace) |
//!
//! Searcher settings (`SOLAR_UNIQUE_KEY`, `SOLAR_DEFAULT_ROWS`,
//! `SOLAR_DEFAULT_FIELDS`) are shared with [`SearcherConfig`].

use std::path::PathBuf;

use clap::Parser;
use solar_query::SearcherConfig;

const LOG_LEVELS: &[&str] = &["error", "warn", "info", "debug", "trace"];

/// Compiles a faceted search request into engine parameters.
#[derive(Debug, Clone, Parser)]
#[command(name = "solar")]
#[command(version, about = "Compile faceted search requests into Solr parameters")]
pub struct CliConfig {
    /// Filter declaration file (JSON).
    #[arg(long, env = "SOLAR_FILTERS")]
    pub filters: PathBuf,

    /// Raw request parameters as a query string, e.g. `cat=5&sort=-price`.
    #[arg(long, short, default_value = "")]
    pub params: String,

    /// Main query.
    #[arg(long, short, default_value = "*:*")]
    pub query: String,

    /// Engine response (JSON) to reconcile the filters against.
    #[arg(long)]
    pub response: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long, env = "SOLAR_LOG_LEVEL", default_value = "warn")]
    pub log_level: String,

    #[command(flatten)]
    pub searcher: SearcherConfig,
}

impl CliConfig {
    /// Validates the configuration and returns errors if any.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.filters.as_os_str().is_empty() {
            errors.push("Filter declaration file cannot be empty".to_string());
        }

        if !LOG_LEVELS.contains(&self.log_level.to_lowercase().as_str()) {
            errors.push(format!(
                "Invalid log level '{}'. Valid values: {}",
                self.log_level,
                LOG_LEVELS.join(", ")
            ));
        }

        if let Err(searcher_errors) = self.searcher.validate() {
            errors.extend(searcher_errors);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_arguments() {
        let config = CliConfig::try_parse_from([
            "solar",
            "--filters",
            "filters.json",
            "-p",
            "cat=5",
            "--unique-key",
            "uuid",
            "--default-rows",
            "20",
        ])
        .unwrap();
        assert_eq!(config.filters, PathBuf::from("filters.json"));
        assert_eq!(config.params, "cat=5");
        assert_eq!(config.query, "*:*");
        assert_eq!(config.searcher.unique_key, "uuid");
        assert_eq!(config.searcher.default_rows, Some(20));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_collects_errors() {
        let mut config = CliConfig::try_parse_from(["solar", "--filters", "f.json"]).unwrap();
        config.log_level = "loud".to_string();
        config.searcher.unique_key = String::new();

        let errors = config.validate().unwrap_err();
        assert_eq!(errors.len(), 2);
        assert!(errors[0].contains("Invalid log level"));
    }

    #[test]
    fn test_empty_filters_path_is_rejected() {
        let mut config = CliConfig::try_parse_from(["solar", "--filters", "f.json"]).unwrap();
        config.filters = PathBuf::new();

        let errors = config.validate().unwrap_err();
        assert_eq!(errors, vec!["Filter declaration file cannot be empty".to_string()]);
    }
}
