use std::collections::BTreeMap;
use std::fmt;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// HTTP verbs a loader request can use.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum HttpVerb {
    #[default]
    Get,
    Post,
    Put,
    Delete,
}

impl HttpVerb {
    /// True for verbs whose params travel in the query string rather than the body.
    pub fn uses_query(self) -> bool {
        matches!(self, HttpVerb::Get | HttpVerb::Delete)
    }
}

impl fmt::Display for HttpVerb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            HttpVerb::Get => "GET",
            HttpVerb::Post => "POST",
            HttpVerb::Put => "PUT",
            HttpVerb::Delete => "DELETE",
        };
        f.write_str(label)
    }
}

/// Errors a load can end with.
/// Transport and Protocol ride inside a `Response`; Parse belongs to whoever reads the body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadError {
    /// Connection refused, DNS, timeout, invalid URI, truncated body.
    Transport(String),
    /// The server answered with a non-2xx status.
    Protocol { status: u16 },
    /// The body could not be decoded by the caller.
    Parse(String),
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadError::Transport(msg) => write!(f, "transport error: {msg}"),
            LoadError::Protocol { status } => write!(f, "unexpected HTTP status {status}"),
            LoadError::Parse(msg) => write!(f, "parse error: {msg}"),
        }
    }
}

impl std::error::Error for LoadError {}

/// A single REST call, fixed at construction.
///
/// ```
/// use restloader::loader::{HttpVerb, Request};
/// let request = Request::get("http://search.twitter.com/search.json").param("q", "android");
/// assert_eq!(request.verb(), HttpVerb::Get);
/// assert_eq!(request.params().get("q").map(String::as_str), Some("android"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    verb: HttpVerb,
    uri: String,
    params: BTreeMap<String, String>,
}

impl Request {
    pub fn new(verb: HttpVerb, uri: impl Into<String>) -> Self {
        Self {
            verb,
            uri: uri.into(),
            params: BTreeMap::new(),
        }
    }

    pub fn get(uri: impl Into<String>) -> Self {
        Self::new(HttpVerb::Get, uri)
    }

    pub fn post(uri: impl Into<String>) -> Self {
        Self::new(HttpVerb::Post, uri)
    }

    /// Adds a parameter. Later values for the same key win.
    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    pub fn params_from<I, K, V>(mut self, params: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.params
            .extend(params.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    pub fn verb(&self) -> HttpVerb {
        self.verb
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn params(&self) -> &BTreeMap<String, String> {
        &self.params
    }
}

/// Outcome of one request attempt. Produced exactly once per `start`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// HTTP status, or 0 when the server was never reached.
    pub status: u16,
    pub body: String,
    pub failure: Option<LoadError>,
}

impl Response {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        let failure = if (200..300).contains(&status) {
            None
        } else {
            Some(LoadError::Protocol { status })
        };
        Self {
            status,
            body: body.into(),
            failure,
        }
    }

    /// A response for a request that never produced an HTTP status.
    pub fn transport_failure(message: impl Into<String>) -> Self {
        Self {
            status: 0,
            body: String::new(),
            failure: Some(LoadError::Transport(message.into())),
        }
    }

    pub fn is_success(&self) -> bool {
        self.failure.is_none() && (200..300).contains(&self.status)
    }
}
