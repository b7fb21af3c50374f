// ABOUTME: Configuration types and parsing for bluegreen.yml.
// ABOUTME: Handles YAML parsing, env var interpolation, and run context resolution.

mod env_value;
mod notify;
mod platform;

pub use env_value::EnvValue;
pub use notify::{
    GrafanaSection, MARKER_API_KEY_ENV, MARKER_APP_ID_ENV, NewRelicSection, WebhookSection,
    resolve_notifications,
};
pub use platform::{PlatformConfig, TARGET_ENV, TOKEN_ENV};

use crate::context::{DEFAULT_DEPLOY_COMMAND, DEFAULT_PRE_KEEP_UNITS, RunContext};
use crate::error::{Error, Result};
use crate::hooks::HooksConfig;
use crate::types::{AppName, ProcessTopology, Slot};
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const CONFIG_FILENAME: &str = "bluegreen.yml";
pub const CONFIG_FILENAME_ALT: &str = "bluegreen.yaml";
pub const CONFIG_FILENAME_DIR: &str = ".bluegreen/config.yml";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(deserialize_with = "deserialize_app_name")]
    pub name: AppName,

    #[serde(default = "default_deploy_dir")]
    pub deploy_dir: PathBuf,

    #[serde(default = "default_deploy_command")]
    pub deploy_command: String,

    #[serde(default = "default_pre_keep_units")]
    pub pre_keep_units: u32,

    #[serde(default)]
    pub keep_units: u32,

    #[serde(default)]
    pub units: Option<ProcessTopology>,

    #[serde(default)]
    pub platform: PlatformConfig,

    #[serde(default)]
    pub hooks: HooksConfig,

    #[serde(default)]
    pub newrelic: Option<NewRelicSection>,

    #[serde(default)]
    pub grafana: Option<GrafanaSection>,

    #[serde(default)]
    pub webhook: Option<WebhookSection>,
}

fn default_deploy_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_deploy_command() -> String {
    DEFAULT_DEPLOY_COMMAND.to_string()
}

fn default_pre_keep_units() -> u32 {
    DEFAULT_PRE_KEEP_UNITS
}

impl Config {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(Error::from)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn discover(dir: &Path) -> Result<Self> {
        let candidates = [
            dir.join(CONFIG_FILENAME),
            dir.join(CONFIG_FILENAME_ALT),
            dir.join(CONFIG_FILENAME_DIR),
        ];

        for path in &candidates {
            if path.exists() {
                return Self::load(path);
            }
        }

        Err(Error::ConfigNotFound(dir.to_path_buf()))
    }

    /// Resolve environment references and build the context for one run.
    pub fn run_context(&self) -> Result<RunContext> {
        let target = self.platform.resolve_target()?;
        let token = self.platform.resolve_token()?;

        let mut context = RunContext::new(self.name.clone(), target, token)
            .with_keep_units(self.keep_units)
            .with_pre_keep_units(self.pre_keep_units)
            .with_deploy_command(self.deploy_command.clone())
            .with_hooks(self.hooks.clone())
            .with_notifications(resolve_notifications(
                self.newrelic.as_ref(),
                self.grafana.as_ref(),
                self.webhook.as_ref(),
            ));

        if let Some(ref units) = self.units {
            context = context.with_topology(units.clone());
        }

        Ok(context)
    }
}

// Custom deserializers

fn deserialize_app_name<'de, D>(deserializer: D) -> std::result::Result<AppName, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    let name = AppName::new(&s).map_err(serde::de::Error::custom)?;
    for slot in [Slot::Blue, Slot::Green] {
        name.slot(slot)
            .map_err(|e| serde::de::Error::custom(format!("{slot} slot of {name}: {e}")))?;
    }
    Ok(name)
}
