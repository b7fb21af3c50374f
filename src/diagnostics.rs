// ABOUTME: Diagnostics accumulator for non-fatal warnings during a deployment run.
// ABOUTME: Collects failures that don't abort a phase but should be shown to users.

use serde::Serialize;

/// Collects non-fatal warnings during deployment operations.
#[derive(Default)]
pub struct Diagnostics {
    warnings: Vec<Warning>,
}

impl Diagnostics {
    /// Record a warning, auto-logging it via tracing.
    pub fn warn(&mut self, warning: Warning) {
        tracing::warn!("{}", warning.message);
        self.warnings.push(warning);
    }

    /// Get all collected warnings.
    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    /// Check if any warnings were collected.
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    pub fn count(&self, kind: WarningKind) -> usize {
        self.warnings.iter().filter(|w| w.kind == kind).count()
    }
}

/// A non-fatal warning collected during deployment.
#[derive(Debug, Clone, Serialize)]
pub struct Warning {
    pub kind: WarningKind,
    pub message: String,
}

impl Warning {
    pub fn hook_failed(message: impl Into<String>) -> Self {
        Self {
            kind: WarningKind::HookFailed,
            message: message.into(),
        }
    }

    pub fn scale_down_incomplete(message: impl Into<String>) -> Self {
        Self {
            kind: WarningKind::ScaleDownIncomplete,
            message: message.into(),
        }
    }

    pub fn tag_not_stored(message: impl Into<String>) -> Self {
        Self {
            kind: WarningKind::TagNotStored,
            message: message.into(),
        }
    }

    pub fn notification_failed(message: impl Into<String>) -> Self {
        Self {
            kind: WarningKind::NotificationFailed,
            message: message.into(),
        }
    }
}

/// Categories of warnings that can occur during deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    /// A hook exited non-zero while hook failures are not fatal.
    HookFailed,
    /// A slot kept more units than requested after a scale-down.
    ScaleDownIncomplete,
    /// The deployed tag could not be stored on the idle slot.
    TagNotStored,
    /// A configured notifier did not succeed.
    NotificationFailed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diagnostics_starts_empty() {
        let diag = Diagnostics::default();
        assert!(!diag.has_warnings());
        assert!(diag.warnings().is_empty());
    }

    #[test]
    fn diagnostics_collects_warnings() {
        let mut diag = Diagnostics::default();

        diag.warn(Warning::hook_failed("after_swap hook failed"));
        diag.warn(Warning::notification_failed("webhook returned 500"));
        diag.warn(Warning::notification_failed("marker returned 403"));

        assert!(diag.has_warnings());
        assert_eq!(diag.warnings().len(), 3);
        assert_eq!(diag.count(WarningKind::NotificationFailed), 2);
        assert_eq!(diag.count(WarningKind::ScaleDownIncomplete), 0);
    }

    #[test]
    fn warning_constructors_set_correct_kind() {
        assert_eq!(Warning::hook_failed("x").kind, WarningKind::HookFailed);
        assert_eq!(
            Warning::scale_down_incomplete("x").kind,
            WarningKind::ScaleDownIncomplete
        );
        assert_eq!(Warning::tag_not_stored("x").kind, WarningKind::TagNotStored);
        assert_eq!(
            Warning::notification_failed("x").kind,
            WarningKind::NotificationFailed
        );
    }
}
