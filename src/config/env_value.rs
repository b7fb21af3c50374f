// ABOUTME: Configuration values that are either literal or read from the environment.
// ABOUTME: Used for platform credentials and notifier keys.

use crate::error::{Error, Result};
use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum EnvValue {
    Literal(String),
    FromEnv {
        #[serde(rename = "env")]
        var: String,
        #[serde(default)]
        default: Option<String>,
    },
}

impl EnvValue {
    pub fn from_env(var: &str) -> Self {
        EnvValue::FromEnv {
            var: var.to_string(),
            default: None,
        }
    }

    /// Resolve to a non-blank string, or fail naming the missing variable.
    pub fn resolve(&self) -> Result<String> {
        match self {
            EnvValue::Literal(s) if !s.trim().is_empty() => Ok(s.clone()),
            EnvValue::Literal(_) => Err(Error::InvalidConfig("value cannot be blank".to_string())),
            EnvValue::FromEnv { var, default } => std::env::var(var)
                .ok()
                .or_else(|| default.clone())
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| Error::MissingEnvVar(var.clone())),
        }
    }

    /// Resolve to a non-blank string; missing or blank values become `None`.
    pub fn resolve_optional(&self) -> Option<String> {
        self.resolve().ok()
    }
}
