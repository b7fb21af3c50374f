// ABOUTME: Platform API base URL normalization.
// ABOUTME: Accepts "host", "host:port" and "http[s]://host[:port][/prefix]" forms.

use std::fmt;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ApiTargetError {
    #[error("platform target cannot be empty")]
    Empty,

    #[error("unsupported scheme in platform target: {0} (use http or https)")]
    UnsupportedScheme(String),
}

/// Base URL of the platform API, always ending with a slash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiTarget(String);

impl ApiTarget {
    pub fn parse(value: &str) -> Result<Self, ApiTargetError> {
        let value = value.trim();
        if value.is_empty() {
            return Err(ApiTargetError::Empty);
        }

        let mut base = match value.split_once("://") {
            Some(("http" | "https", rest)) if !rest.is_empty() => value.to_string(),
            Some(("http" | "https", _)) => return Err(ApiTargetError::Empty),
            Some((scheme, _)) => return Err(ApiTargetError::UnsupportedScheme(scheme.to_string())),
            None => format!("http://{value}"),
        };

        if !base.ends_with('/') {
            base.push('/');
        }

        Ok(Self(base))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Append a relative path (leading slashes are ignored).
    pub fn join(&self, path: &str) -> String {
        format!("{}{}", self.0, path.trim_start_matches('/'))
    }
}

impl fmt::Display for ApiTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
