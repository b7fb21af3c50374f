// ABOUTME: Best-effort post-deployment notifications.
// ABOUTME: Deployment marker, a dashboard annotation event and a form-encoded webhook.

use crate::context::RunContext;
use crate::platform::{Method, PlatformClient, PlatformRequest, parse_form};
use crate::types::AppName;
use chrono::{SecondsFormat, Utc};

/// Fixed endpoint receiving deployment markers.
pub const MARKER_ENDPOINT: &str = "http://api.newrelic.com/deployments.xml";

/// Credentials for the deployment marker. Both fields are required.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkerConfig {
    pub api_key: String,
    pub app_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookConfig {
    pub endpoint: String,
    /// Extra form fields as `key1=value1&key2=value2`.
    pub payload_extras: Option<String>,
}

/// Log collector feeding the deployment dashboard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrafanaConfig {
    pub endpoint: String,
    pub index: String,
}

/// Notifier settings. An absent block disables that notifier.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NotificationConfig {
    pub marker: Option<MarkerConfig>,
    pub grafana: Option<GrafanaConfig>,
    pub webhook: Option<WebhookConfig>,
}

/// Result of dispatching every notifier. `None` means not configured.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct NotificationOutcome {
    pub marker: Option<bool>,
    pub grafana: Option<bool>,
    pub webhook: Option<bool>,
}

impl NotificationOutcome {
    pub fn failures(&self) -> Vec<&'static str> {
        let mut failed = Vec::new();
        if self.marker == Some(false) {
            failed.push("deployment marker");
        }
        if self.grafana == Some(false) {
            failed.push("grafana event");
        }
        if self.webhook == Some(false) {
            failed.push("webhook");
        }
        failed
    }
}

/// Build the webhook form payload: parsed extras plus the `tag` field.
///
/// Repeated keys collapse to their last value at the position the key first
/// appeared. A `tag` present in the extras is replaced.
pub fn webhook_payload(extras: Option<&str>, tag: &str) -> Vec<(String, String)> {
    let mut payload: Vec<(String, String)> = Vec::new();
    for (key, value) in extras.map(parse_form).unwrap_or_default() {
        if key == "tag" {
            continue;
        }
        match payload.iter_mut().find(|(seen, _)| *seen == key) {
            Some(entry) => entry.1 = value,
            None => payload.push((key, value)),
        }
    }
    payload.push(("tag".to_string(), tag.to_string()));
    payload
}

/// JSON event announcing that `app` now serves `tag`.
pub fn grafana_event(index: &str, app: &AppName, tag: &str) -> serde_json::Value {
    serde_json::json!({
        "index": index,
        "app": app.as_str(),
        "tag": tag,
        "timestamp": Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
    })
}

pub struct NotificationDispatcher<'a, C: ?Sized> {
    client: &'a C,
}

impl<'a, C: PlatformClient + ?Sized> NotificationDispatcher<'a, C> {
    pub fn new(client: &'a C) -> Self {
        Self { client }
    }

    /// Post a deployment marker for `revision`. `false` when not configured,
    /// rejected, or unreachable.
    pub async fn notify_deployment_marker(&self, ctx: &RunContext, revision: &str) -> bool {
        let Some(marker) = ctx.notifications().marker.as_ref() else {
            tracing::debug!("deployment marker not configured, skipping");
            return false;
        };

        let form = vec![
            (
                "deployment[application_id]".to_string(),
                marker.app_id.clone(),
            ),
            ("deployment[revision]".to_string(), revision.to_string()),
        ];
        let request = PlatformRequest::new(Method::Post, MARKER_ENDPOINT)
            .header("x-api-key", marker.api_key.as_str())
            .form(&form);

        tracing::info!("Posting deployment marker for revision {}", revision);
        self.send("deployment marker", request).await
    }

    /// Post a deployment event for `app` serving `tag` to the log collector.
    /// `false` when not configured, rejected, or unreachable.
    pub async fn notify_grafana(&self, ctx: &RunContext, app: &AppName, tag: &str) -> bool {
        let Some(grafana) = ctx.notifications().grafana.as_ref() else {
            tracing::debug!("grafana not configured, skipping");
            return false;
        };

        let event = grafana_event(&grafana.index, app, tag);
        let request = PlatformRequest::new(Method::Post, grafana.endpoint.as_str()).json(&event);

        tracing::info!("Sending deployment event for {} to {}", app, grafana.endpoint);
        self.send("grafana event", request).await
    }

    /// Post the webhook payload for `tag`. `false` when not configured,
    /// rejected, or unreachable.
    pub async fn run_webhook(&self, ctx: &RunContext, tag: &str) -> bool {
        let Some(webhook) = ctx.notifications().webhook.as_ref() else {
            tracing::debug!("webhook not configured, skipping");
            return false;
        };

        let payload = webhook_payload(webhook.payload_extras.as_deref(), tag);
        let request = PlatformRequest::new(Method::Post, webhook.endpoint.as_str()).form(&payload);

        tracing::info!("Running webhook {}", webhook.endpoint);
        self.send("webhook", request).await
    }

    /// Run every configured notifier once. `app` is the slot now serving traffic.
    pub async fn dispatch(
        &self,
        ctx: &RunContext,
        app: &AppName,
        revision: &str,
        tag: &str,
    ) -> NotificationOutcome {
        let config = ctx.notifications();
        let marker = match config.marker {
            Some(_) => Some(self.notify_deployment_marker(ctx, revision).await),
            None => None,
        };
        let grafana = match config.grafana {
            Some(_) => Some(self.notify_grafana(ctx, app, tag).await),
            None => None,
        };
        let webhook = match config.webhook {
            Some(_) => Some(self.run_webhook(ctx, tag).await),
            None => None,
        };
        NotificationOutcome {
            marker,
            grafana,
            webhook,
        }
    }

    async fn send(&self, what: &str, request: PlatformRequest) -> bool {
        match self.client.execute(request).await {
            Ok(response) if response.is_success() => true,
            Ok(response) => {
                tracing::warn!("{} returned status {}", what, response.status);
                false
            }
            Err(e) => {
                tracing::warn!("{} failed: {}", what, e);
                false
            }
        }
    }
}
