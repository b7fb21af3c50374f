// ABOUTME: Notifier configuration blocks as written in the YAML file.
// ABOUTME: Resolved into NotificationConfig; incomplete blocks disable the notifier.

use super::EnvValue;
use crate::notify::{GrafanaConfig, MarkerConfig, NotificationConfig, WebhookConfig};
use serde::Deserialize;

pub const MARKER_API_KEY_ENV: &str = "NEW_RELIC_API_KEY";
pub const MARKER_APP_ID_ENV: &str = "NEW_RELIC_APP_ID";

/// `newrelic:` block. Omitted keys fall back to environment variables.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NewRelicSection {
    #[serde(default = "default_api_key")]
    pub api_key: EnvValue,
    #[serde(default = "default_app_id")]
    pub app_id: EnvValue,
}

fn default_api_key() -> EnvValue {
    EnvValue::from_env(MARKER_API_KEY_ENV)
}

fn default_app_id() -> EnvValue {
    EnvValue::from_env(MARKER_APP_ID_ENV)
}

/// `grafana:` block. Both keys are required for the event to be sent.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GrafanaSection {
    #[serde(default)]
    pub endpoint: Option<EnvValue>,
    #[serde(default)]
    pub index: Option<String>,
}

/// `webhook:` block.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WebhookSection {
    #[serde(default)]
    pub endpoint: Option<EnvValue>,
    #[serde(default)]
    pub payload_extras: Option<String>,
}

impl NewRelicSection {
    pub fn resolve(&self) -> Option<MarkerConfig> {
        let api_key = self.api_key.resolve_optional();
        let app_id = self.app_id.resolve_optional();
        match (api_key, app_id) {
            (Some(api_key), Some(app_id)) => Some(MarkerConfig { api_key, app_id }),
            _ => {
                tracing::debug!("newrelic block incomplete, deployment marker disabled");
                None
            }
        }
    }
}

impl GrafanaSection {
    pub fn resolve(&self) -> Option<GrafanaConfig> {
        let endpoint = self.endpoint.as_ref().and_then(EnvValue::resolve_optional);
        let index = self.index.clone().filter(|index| !index.trim().is_empty());
        match (endpoint, index) {
            (Some(endpoint), Some(index)) => Some(GrafanaConfig { endpoint, index }),
            _ => {
                tracing::debug!("grafana block incomplete, deployment event disabled");
                None
            }
        }
    }
}

impl WebhookSection {
    pub fn resolve(&self) -> Option<WebhookConfig> {
        let endpoint = self.endpoint.as_ref()?.resolve_optional()?;
        Some(WebhookConfig {
            endpoint,
            payload_extras: self
                .payload_extras
                .clone()
                .filter(|extras| !extras.trim().is_empty()),
        })
    }
}

pub fn resolve_notifications(
    newrelic: Option<&NewRelicSection>,
    grafana: Option<&GrafanaSection>,
    webhook: Option<&WebhookSection>,
) -> NotificationConfig {
    NotificationConfig {
        marker: newrelic.and_then(NewRelicSection::resolve),
        grafana: grafana.and_then(GrafanaSection::resolve),
        webhook: webhook.and_then(WebhookSection::resolve),
    }
}
