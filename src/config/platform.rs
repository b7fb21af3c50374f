// ABOUTME: Platform endpoint and credentials configuration.
// ABOUTME: Defaults to the TSURU_TARGET and TSURU_TOKEN environment variables.

use super::EnvValue;
use crate::error::{Error, Result};
use crate::types::ApiTarget;
use serde::Deserialize;

pub const TARGET_ENV: &str = "TSURU_TARGET";
pub const TOKEN_ENV: &str = "TSURU_TOKEN";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PlatformConfig {
    #[serde(default = "default_target")]
    pub target: EnvValue,
    #[serde(default = "default_token")]
    pub token: EnvValue,
}

fn default_target() -> EnvValue {
    EnvValue::from_env(TARGET_ENV)
}

fn default_token() -> EnvValue {
    EnvValue::from_env(TOKEN_ENV)
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            target: default_target(),
            token: default_token(),
        }
    }
}

impl PlatformConfig {
    pub fn resolve_target(&self) -> Result<ApiTarget> {
        let raw = self.target.resolve()?;
        ApiTarget::parse(&raw).map_err(|e| Error::InvalidConfig(e.to_string()))
    }

    pub fn resolve_token(&self) -> Result<String> {
        self.token.resolve()
    }
}
