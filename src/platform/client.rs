// ABOUTME: Transport-agnostic request/response types and the PlatformClient trait.
// ABOUTME: Also holds the form encoding helpers shared by API calls and notifiers.

use async_trait::async_trait;
use std::fmt;

use super::error::PlatformError;

/// The only status code treated as success by every call.
pub const SUCCESS_STATUS: u16 = 200;

pub const CONTENT_TYPE_JSON: &str = "application/json";
pub const CONTENT_TYPE_FORM: &str = "application/x-www-form-urlencoded";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single HTTP request against the platform or a notification endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl PlatformRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: Vec::new(),
            body: None,
        }
    }

    /// Set a header, replacing any existing value with the same name.
    pub fn header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.retain(|(n, _)| !n.eq_ignore_ascii_case(name));
        self.headers.push((name.to_string(), value.into()));
        self
    }

    pub fn bearer(self, token: &str) -> Self {
        self.header("Authorization", format!("bearer {token}"))
    }

    pub fn json(self, value: &serde_json::Value) -> Self {
        let mut request = self.header("Content-Type", CONTENT_TYPE_JSON);
        request.body = Some(value.to_string());
        request
    }

    pub fn form(self, pairs: &[(String, String)]) -> Self {
        let mut request = self.header("Content-Type", CONTENT_TYPE_FORM);
        request.body = Some(encode_form(pairs));
        request
    }

    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Path and query of the URL, without scheme and authority.
    pub fn path_and_query(&self) -> &str {
        let rest = self
            .url
            .split_once("://")
            .map(|(_, rest)| rest)
            .unwrap_or(&self.url);
        rest.find('/').map(|i| &rest[i..]).unwrap_or("/")
    }

    /// Decoded query parameters of the URL.
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        self.url
            .split_once('?')
            .map(|(_, query)| parse_form(query))
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformResponse {
    pub status: u16,
    pub body: String,
}

impl PlatformResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == SUCCESS_STATUS
    }
}

/// Executes one HTTP round trip. Implementations carry no business logic.
#[async_trait]
pub trait PlatformClient: Send + Sync {
    async fn execute(&self, request: PlatformRequest) -> Result<PlatformResponse, PlatformError>;
}

/// Encode key/value pairs as `application/x-www-form-urlencoded`.
pub fn encode_form(pairs: &[(String, String)]) -> String {
    pairs
        .iter()
        .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}

/// Parse `key=value` pairs separated by `&`. Empty segments are skipped and a
/// segment without `=` yields an empty value.
pub fn parse_form(input: &str) -> Vec<(String, String)> {
    input
        .split('&')
        .filter(|segment| !segment.is_empty())
        .map(|segment| {
            let (key, value) = segment.split_once('=').unwrap_or((segment, ""));
            (decode_component(key), decode_component(value))
        })
        .collect()
}

fn decode_component(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    urlencoding::decode(&spaced)
        .map(|s| s.into_owned())
        .unwrap_or(spaced)
}
