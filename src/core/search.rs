//! # Search Results
//!
//! Turns a search response body into the list of strings the host shows.
//! The endpoint answers with `{"results": [{"text": "..."}, ...]}`; anything
//! else in the payload is ignored.

use serde::Deserialize;

use crate::loader::{LoadError, Response};

#[derive(Deserialize, Debug)]
struct SearchEnvelope {
    results: Vec<SearchHit>,
}

#[derive(Deserialize, Debug)]
struct SearchHit {
    text: String,
}

/// Extracts the `text` of every entry in `results`.
/// Either the whole list parses or nothing is returned.
pub fn results_from_json(json: &str) -> Result<Vec<String>, LoadError> {
    let envelope: SearchEnvelope =
        serde_json::from_str(json).map_err(|e| LoadError::Parse(e.to_string()))?;
    Ok(envelope.results.into_iter().map(|hit| hit.text).collect())
}

/// Decides what a finished load means for the list.
///
/// Only an HTTP 200 with a non-empty body counts as data.
pub fn interpret(response: &Response) -> Result<Vec<String>, LoadError> {
    if let Some(failure) = &response.failure {
        return Err(failure.clone());
    }
    if response.status != 200 {
        return Err(LoadError::Protocol {
            status: response.status,
        });
    }
    if response.body.is_empty() {
        return Err(LoadError::Parse("empty response body".to_string()));
    }
    results_from_json(&response.body)
}
