//! Shared fixtures for filter integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value as JsonValue;
use solar_query::{RawResult, SearchClient, Searcher, TransportError, WireParams};
use solar_queryfilter::FilterValue;

/// Answers every request with the same response and records the parameters.
pub struct StaticClient {
    response: JsonValue,
    calls: Mutex<Vec<WireParams>>,
}

impl StaticClient {
    pub fn new(response: JsonValue) -> Arc<Self> {
        Arc::new(Self {
            response,
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> Vec<WireParams> {
        self.calls.lock().clone()
    }
}

impl SearchClient for StaticClient {
    fn select(&self, _q: &str, params: &WireParams) -> Result<RawResult, TransportError> {
        self.calls.lock().push(params.clone());
        Ok(RawResult::from_json(self.response.clone())?)
    }
}

pub fn searcher(response: JsonValue) -> (Searcher, Arc<StaticClient>) {
    let client = StaticClient::new(response);
    (Searcher::new(Arc::clone(&client)), client)
}

/// Upper-cases the first character of the value's text.
pub fn capitalize(value: &FilterValue) -> String {
    let text = value.value.to_string();
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Values of a wire parameter, empty when absent.
pub fn param<'a>(params: &'a WireParams, name: &str) -> &'a [String] {
    params.get(name).map(Vec::as_slice).unwrap_or_default()
}
