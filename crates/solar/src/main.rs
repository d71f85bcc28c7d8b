//! solar
//!
//! Loads filter declarations, applies a raw request to them and prints the
//! resulting engine parameters. With `--response`, the filters are also
//! reconciled against a saved engine response and their values printed.

mod config;

use std::path::Path;

use anyhow::Context;
use clap::Parser;
use solar_query::{RawResult, SearchClient, Searcher, TransportError, WireParams};
use solar_queryfilter::{Binding, FilterValue, QueryFilter, RawParams};
use tracing::{debug, info};

use crate::config::CliConfig;

/// Installs the log subscriber. `RUST_LOG` takes precedence over `level`.
fn init_logging(level: &str) {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "solar={level},solar_query={level},solar_queryfilter={level}"
        ))
    });

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

/// Refuses every request; used when only the parameters are wanted.
struct DryRunClient;

impl SearchClient for DryRunClient {
    fn select(&self, _q: &str, _params: &WireParams) -> Result<RawResult, TransportError> {
        Err("no engine response given; pass --response to execute".into())
    }
}

/// Answers with a response loaded from disk.
struct FileClient {
    response: RawResult,
}

impl FileClient {
    fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read response {}", path.display()))?;
        let response = RawResult::from_json_str(&text)
            .with_context(|| format!("invalid response JSON in {}", path.display()))?;
        Ok(Self { response })
    }
}

impl SearchClient for FileClient {
    fn select(&self, q: &str, params: &WireParams) -> Result<RawResult, TransportError> {
        debug!(q = q, params = params.len(), "Serving saved response");
        Ok(self.response.clone())
    }
}

/// Renders one value line, indenting pivot children.
fn render_value(out: &mut String, value: &FilterValue, depth: usize) {
    let marker = if value.selected { "[x]" } else { "[ ]" };
    out.push_str(&format!(
        "{:indent$}{} {} {} ({})\n",
        "",
        marker,
        value.title,
        value.count_plus,
        value.filter_value,
        indent = 2 + depth * 2
    ));
    for child in value.pivot_values() {
        render_value(out, child, depth + 1);
    }
}

/// Renders every reconciled filter and the ordering.
fn render_binding(binding: &Binding<'_>) -> String {
    let mut out = String::new();
    for filter in binding.filters() {
        out.push_str(&format!("{}:\n", filter.name()));
        if let (Some(min), Some(max)) = (filter.min(), filter.max()) {
            out.push_str(&format!("  range {} .. {}\n", min, max));
        }
        for value in filter.all_values() {
            render_value(&mut out, value, 0);
        }
    }
    if let Some(ordering) = binding.ordering() {
        out.push_str(&format!("{}:\n", ordering.name()));
        for choice in ordering.values() {
            let marker = if choice.selected { "[x]" } else { "[ ]" };
            out.push_str(&format!(
                "  {} {} ({})\n",
                marker,
                choice.value.title(),
                choice.direction
            ));
        }
    }
    out
}

fn main() -> anyhow::Result<()> {
    let config = CliConfig::parse();
    init_logging(&config.log_level);

    if let Err(errors) = config.validate() {
        for error in &errors {
            eprintln!("Configuration error: {}", error);
        }
        std::process::exit(1);
    }

    let registry = QueryFilter::from_path(&config.filters)
        .with_context(|| format!("failed to load filters from {}", config.filters.display()))?;
    info!(
        filters = registry.filters().len(),
        ordering = registry.ordering().is_some(),
        "Loaded filter declarations"
    );

    let client: Box<dyn SearchClient> = match &config.response {
        Some(path) => Box::new(FileClient::load(path)?),
        None => Box::new(DryRunClient),
    };
    let searcher = Searcher::with_config(client, config.searcher.clone());

    let raw = RawParams::from_query_string(&config.params);
    let (query, mut binding) = registry.apply(&searcher.search(config.query.as_str()), &raw);
    println!("{}", query);

    if config.response.is_some() {
        binding.process_results(query.results()?);
        print!("{}", render_binding(&binding));
    }

    Ok(())
}
