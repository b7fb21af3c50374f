// ABOUTME: Immutable per-run context handed to every deploy operation.
// ABOUTME: Carries app identity, platform target, token, topology and notifier settings.

use crate::hooks::HooksConfig;
use crate::notify::NotificationConfig;
use crate::platform::ApplicationRef;
use crate::types::{ApiTarget, AppName, ProcessTopology};
use std::fmt;

pub const DEFAULT_DEPLOY_COMMAND: &str = r#"git push "$BLUEGREEN_IDLE_APP" "$BLUEGREEN_TAG:master""#;
pub const DEFAULT_PRE_KEEP_UNITS: u32 = 1;

/// Everything one deployment run needs, fixed at construction.
#[derive(Clone)]
pub struct RunContext {
    app: AppName,
    target: ApiTarget,
    token: String,
    topology: Option<ProcessTopology>,
    keep_units: u32,
    pre_keep_units: u32,
    deploy_command: String,
    hooks: HooksConfig,
    notifications: NotificationConfig,
}

impl RunContext {
    pub fn new(app: AppName, target: ApiTarget, token: impl Into<String>) -> Self {
        Self {
            app,
            target,
            token: token.into(),
            topology: None,
            keep_units: 0,
            pre_keep_units: DEFAULT_PRE_KEEP_UNITS,
            deploy_command: DEFAULT_DEPLOY_COMMAND.to_string(),
            hooks: HooksConfig::default(),
            notifications: NotificationConfig::default(),
        }
    }

    pub fn with_topology(mut self, topology: ProcessTopology) -> Self {
        self.topology = Some(topology);
        self
    }

    pub fn with_keep_units(mut self, keep: u32) -> Self {
        self.keep_units = keep;
        self
    }

    pub fn with_pre_keep_units(mut self, keep: u32) -> Self {
        self.pre_keep_units = keep;
        self
    }

    pub fn with_deploy_command(mut self, command: impl Into<String>) -> Self {
        self.deploy_command = command.into();
        self
    }

    pub fn with_hooks(mut self, hooks: HooksConfig) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn with_notifications(mut self, notifications: NotificationConfig) -> Self {
        self.notifications = notifications;
        self
    }

    /// Base application name; slots are derived from it.
    pub fn app(&self) -> &AppName {
        &self.app
    }

    pub fn target(&self) -> &ApiTarget {
        &self.target
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    /// Target topology for the idle slot, when configured.
    pub fn topology(&self) -> Option<&ProcessTopology> {
        self.topology.as_ref()
    }

    /// Units kept per process type on the retired slot after a swap.
    pub fn keep_units(&self) -> u32 {
        self.keep_units
    }

    /// Units kept per process type on the idle slot before a deploy.
    pub fn pre_keep_units(&self) -> u32 {
        self.pre_keep_units
    }

    pub fn deploy_command(&self) -> &str {
        &self.deploy_command
    }

    pub fn hooks(&self) -> &HooksConfig {
        &self.hooks
    }

    pub fn notifications(&self) -> &NotificationConfig {
        &self.notifications
    }

    pub fn application(&self, name: &AppName) -> ApplicationRef {
        ApplicationRef::new(name.clone(), self.target.clone())
    }
}

impl fmt::Debug for RunContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunContext")
            .field("app", &self.app)
            .field("target", &self.target)
            .field("token", &"<redacted>")
            .field("topology", &self.topology)
            .field("keep_units", &self.keep_units)
            .field("pre_keep_units", &self.pre_keep_units)
            .field("deploy_command", &self.deploy_command)
            .field("hooks", &self.hooks)
            .field("notifications", &self.notifications)
            .finish()
    }
}
