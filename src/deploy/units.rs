// ABOUTME: Unit scaling per process type with convergence verification.
// ABOUTME: Every process type is attempted; the outcome is the AND of all attempts.

use serde::Serialize;
use std::fmt;

use crate::context::RunContext;
use crate::platform::{ApplicationRef, PlatformApi, PlatformClient, PlatformError};
use crate::types::{AppName, ProcessTopology};

/// Resolution of one process type during a scaling pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum ProcessResult {
    /// Platform accepted the call and a re-query shows the expected count.
    Converged { units: u32 },
    /// Platform answered with a non-success status or was unreachable.
    Rejected,
    /// Platform accepted the call but the re-query shows another count.
    Diverged { expected: u32, observed: u32 },
    /// Platform accepted the call but the re-query could not be made.
    Unverified,
    /// Nothing to do for this process type.
    Skipped,
}

impl ProcessResult {
    pub fn is_skipped(&self) -> bool {
        matches!(self, ProcessResult::Skipped)
    }

    pub fn is_converged(&self) -> bool {
        matches!(self, ProcessResult::Converged { .. })
    }
}

impl fmt::Display for ProcessResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProcessResult::Converged { units } => write!(f, "converged at {units}"),
            ProcessResult::Rejected => f.write_str("rejected"),
            ProcessResult::Diverged { expected, observed } => {
                write!(f, "diverged (expected {expected}, observed {observed})")
            }
            ProcessResult::Unverified => f.write_str("unverified"),
            ProcessResult::Skipped => f.write_str("skipped"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProcessScale {
    pub process: String,
    /// Units requested from the platform; negative when passed through unclamped.
    pub requested: i64,
    #[serde(flatten)]
    pub result: ProcessResult,
}

/// Per-process results of one scaling pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScaleOutcome {
    processes: Vec<ProcessScale>,
    success: bool,
    /// `false` when the current units could not be read and nothing was attempted.
    units_read: bool,
}

impl ScaleOutcome {
    fn new() -> Self {
        Self {
            processes: Vec::new(),
            success: true,
            units_read: true,
        }
    }

    fn unreadable() -> Self {
        Self {
            processes: Vec::new(),
            success: false,
            units_read: false,
        }
    }

    fn record(&mut self, process: &str, requested: i64, result: ProcessResult) {
        if !result.is_skipped() {
            self.success = self.success && result.is_converged();
        }
        self.processes.push(ProcessScale {
            process: process.to_string(),
            requested,
            result,
        });
    }

    /// Logical AND of every attempted process type. Skipped ones don't count.
    pub fn success(&self) -> bool {
        self.success
    }

    pub fn processes(&self) -> &[ProcessScale] {
        &self.processes
    }

    pub fn get(&self, process: &str) -> Option<&ProcessResult> {
        self.processes
            .iter()
            .find(|p| p.process == process)
            .map(|p| &p.result)
    }

    /// Process types that were attempted and did not converge.
    pub fn failures(&self) -> impl Iterator<Item = &ProcessScale> {
        self.processes
            .iter()
            .filter(|p| !p.result.is_skipped() && !p.result.is_converged())
    }

    pub fn units_read(&self) -> bool {
        self.units_read
    }

    pub fn attempted(&self) -> usize {
        self.processes
            .iter()
            .filter(|p| !p.result.is_skipped())
            .count()
    }
}

impl fmt::Display for ScaleOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.units_read {
            return f.write_str("current units could not be read");
        }
        if self.processes.is_empty() {
            return f.write_str("no process types");
        }
        for (i, p) in self.processes.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{} {}", p.process, p.result)?;
        }
        Ok(())
    }
}

/// Drives unit additions and removals for one application.
pub struct UnitScaler<'a, C: ?Sized> {
    client: &'a C,
}

impl<'a, C: PlatformClient + ?Sized> UnitScaler<'a, C> {
    pub fn new(client: &'a C) -> Self {
        Self { client }
    }

    /// Unit counts per process type as reported by the platform right now.
    pub async fn current_topology(
        &self,
        ctx: &RunContext,
        app: &AppName,
    ) -> Result<ProcessTopology, PlatformError> {
        let api = PlatformApi::new(self.client, ctx.token());
        Ok(api.app_descriptor(&ctx.application(app)).await?.topology())
    }

    /// Leave `keep` units of every process type currently running on `app`.
    ///
    /// The removal count is `current - keep` and is sent as is, so a `keep`
    /// above the current count asks the platform to remove a negative number.
    /// An unreachable platform gives a failed outcome; only a malformed
    /// descriptor is an error.
    pub async fn scale_down(
        &self,
        ctx: &RunContext,
        app: &AppName,
        keep: u32,
    ) -> Result<ScaleOutcome, PlatformError> {
        let api = PlatformApi::new(self.client, ctx.token());
        let application = ctx.application(app);
        let Some(current) = read_units(&api, &application).await? else {
            return Ok(ScaleOutcome::unreadable());
        };

        let mut outcome = ScaleOutcome::new();
        for (process, count) in current.iter() {
            let remove = i64::from(count) - i64::from(keep);
            if remove < 0 {
                tracing::warn!(
                    "{} has {} {} units, fewer than the {} to keep; requesting removal of {}",
                    app,
                    count,
                    process,
                    keep,
                    remove
                );
            }

            tracing::info!("Removing {} {} units from {}", remove, process, app);
            let result = if api.remove_units(&application, process, remove).await {
                verify(&api, &application, process, keep).await?
            } else {
                ProcessResult::Rejected
            };
            outcome.record(process, remove, result);
        }

        log_outcome("scale down", app, &outcome);
        Ok(outcome)
    }

    /// Add units to `app` until every process type in `target` has its count.
    ///
    /// Process types already at or above target are skipped. Failures are
    /// reported in the outcome as for [`UnitScaler::scale_down`].
    pub async fn scale_up(
        &self,
        ctx: &RunContext,
        app: &AppName,
        target: &ProcessTopology,
    ) -> Result<ScaleOutcome, PlatformError> {
        let api = PlatformApi::new(self.client, ctx.token());
        let application = ctx.application(app);
        let Some(current) = read_units(&api, &application).await? else {
            return Ok(ScaleOutcome::unreadable());
        };

        let mut outcome = ScaleOutcome::new();
        for (process, wanted) in target.iter() {
            let delta = i64::from(wanted) - i64::from(current.count(process));
            if delta <= 0 {
                tracing::debug!(
                    "{} already has {} {} units, skipping",
                    app,
                    current.count(process),
                    process
                );
                outcome.record(process, 0, ProcessResult::Skipped);
                continue;
            }

            tracing::info!("Adding {} {} units to {}", delta, process, app);
            let result = if api.add_units(&application, process, delta).await {
                verify(&api, &application, process, wanted).await?
            } else {
                ProcessResult::Rejected
            };
            outcome.record(process, delta, result);
        }

        log_outcome("scale up", app, &outcome);
        Ok(outcome)
    }
}

/// Units before scaling. An unreachable platform yields `None`.
async fn read_units<C: PlatformClient + ?Sized>(
    api: &PlatformApi<'_, C>,
    application: &ApplicationRef,
) -> Result<Option<ProcessTopology>, PlatformError> {
    match api.app_descriptor(application).await {
        Ok(descriptor) => Ok(Some(descriptor.topology())),
        Err(e) if e.is_transport() => {
            tracing::warn!("could not read units of {}: {}", application, e);
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

/// Re-query the descriptor and compare one process type's count.
async fn verify<C: PlatformClient + ?Sized>(
    api: &PlatformApi<'_, C>,
    application: &ApplicationRef,
    process: &str,
    expected: u32,
) -> Result<ProcessResult, PlatformError> {
    match api.app_descriptor(application).await {
        Ok(descriptor) => {
            let observed = descriptor.topology().count(process);
            if observed == expected {
                Ok(ProcessResult::Converged { units: observed })
            } else {
                tracing::warn!(
                    "{} has {} {} units after scaling, expected {}",
                    application,
                    observed,
                    process,
                    expected
                );
                Ok(ProcessResult::Diverged { expected, observed })
            }
        }
        Err(e) if e.is_transport() => {
            tracing::warn!("could not verify {} units on {}: {}", process, application, e);
            Ok(ProcessResult::Unverified)
        }
        Err(e) => Err(e),
    }
}

fn log_outcome(what: &str, app: &AppName, outcome: &ScaleOutcome) {
    if outcome.success() {
        tracing::info!("{} of {} finished: {}", what, app, outcome);
    } else {
        tracing::warn!("{} of {} incomplete: {}", what, app, outcome);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::Method;
    use crate::platform::mock::ScriptedClient;
    use crate::types::ApiTarget;

    fn context() -> RunContext {
        RunContext::new(
            AppName::new("xpto").unwrap(),
            ApiTarget::parse("tsuruhost.com").unwrap(),
            "token",
        )
    }

    fn app() -> AppName {
        AppName::new("xpto").unwrap()
    }

    fn descriptor(units: &[&str]) -> String {
        let units: Vec<_> = units
            .iter()
            .map(|name| serde_json::json!({ "ProcessName": name }))
            .collect();
        serde_json::json!({ "units": units }).to_string()
    }

    fn calls(client: &ScriptedClient, method: Method) -> Vec<String> {
        client
            .requests()
            .into_iter()
            .filter(|r| r.method == method)
            .map(|r| r.path_and_query().to_string())
            .collect()
    }

    #[tokio::test]
    async fn current_topology_counts_units_per_process() {
        let client = ScriptedClient::new().reply(200, &descriptor(&["web", "resque", "web"]));
        let scaler = UnitScaler::new(&client);

        let topology = scaler.current_topology(&context(), &app()).await.unwrap();

        assert_eq!(topology, [("web", 2), ("resque", 1)].into_iter().collect());
    }

    #[tokio::test]
    async fn current_topology_of_app_without_units_is_empty() {
        let client = ScriptedClient::new()
            .reply(200, r#"{"units": []}"#)
            .reply(200, r#"{"name": "xpto"}"#);
        let scaler = UnitScaler::new(&client);

        assert!(scaler.current_topology(&context(), &app()).await.unwrap().is_empty());
        assert!(scaler.current_topology(&context(), &app()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn scale_down_removes_down_to_keep_for_every_process() {
        let client = ScriptedClient::new()
            .reply(200, &descriptor(&["web", "web", "web", "web", "resque", "resque"]))
            .reply(200, "")
            .reply(200, &descriptor(&["web", "resque", "resque"]))
            .reply(200, "")
            .reply(200, &descriptor(&["web", "resque"]));
        let scaler = UnitScaler::new(&client);

        let outcome = scaler.scale_down(&context(), &app(), 1).await.unwrap();

        assert!(outcome.success());
        assert_eq!(
            calls(&client, Method::Delete),
            vec![
                "/apps/xpto/units?units=3&process=web".to_string(),
                "/apps/xpto/units?units=1&process=resque".to_string(),
            ]
        );
        assert_eq!(client.remaining(), 0);
    }

    #[tokio::test]
    async fn scale_down_sends_removal_with_form_content_type() {
        let client = ScriptedClient::new()
            .reply(200, &descriptor(&["web"]))
            .reply(200, "")
            .reply(200, &descriptor(&[]));
        let scaler = UnitScaler::new(&client);

        scaler.scale_down(&context(), &app(), 0).await.unwrap();

        let removal = &client.requests()[1];
        assert_eq!(
            removal.header_value("Content-Type"),
            Some(crate::platform::CONTENT_TYPE_FORM)
        );
        assert_eq!(removal.header_value("Authorization"), Some("bearer token"));
    }

    #[tokio::test]
    async fn scale_down_attempts_every_process_after_a_failure() {
        let client = ScriptedClient::new()
            .reply(200, &descriptor(&["resque", "web", "web"]))
            .reply(500, "")
            .reply(200, "")
            .reply(200, &descriptor(&["resque"]));
        let scaler = UnitScaler::new(&client);

        let outcome = scaler.scale_down(&context(), &app(), 0).await.unwrap();

        assert!(!outcome.success());
        assert_eq!(outcome.get("resque"), Some(&ProcessResult::Rejected));
        assert_eq!(outcome.get("web"), Some(&ProcessResult::Converged { units: 0 }));
        assert_eq!(calls(&client, Method::Delete).len(), 2);
    }

    #[tokio::test]
    async fn scale_down_passes_negative_count_through() {
        let client = ScriptedClient::new()
            .reply(200, &descriptor(&["web"]))
            .reply(400, "");
        let scaler = UnitScaler::new(&client);

        let outcome = scaler.scale_down(&context(), &app(), 3).await.unwrap();

        assert!(!outcome.success());
        assert_eq!(
            calls(&client, Method::Delete),
            vec!["/apps/xpto/units?units=-2&process=web".to_string()]
        );
        assert_eq!(outcome.processes()[0].requested, -2);
    }

    #[tokio::test]
    async fn scale_down_of_empty_app_succeeds_without_calls() {
        let client = ScriptedClient::new().reply(200, r#"{"units": []}"#);
        let scaler = UnitScaler::new(&client);

        let outcome = scaler.scale_down(&context(), &app(), 0).await.unwrap();

        assert!(outcome.success());
        assert_eq!(outcome.attempted(), 0);
        assert_eq!(client.requests().len(), 1);
    }

    #[tokio::test]
    async fn scale_up_adds_only_missing_units() {
        let client = ScriptedClient::new()
            .reply(200, &descriptor(&["web", "web", "resque"]))
            .reply(200, "")
            .reply(
                200,
                &descriptor(&["web", "web", "web", "web", "web", "resque"]),
            );
        let scaler = UnitScaler::new(&client);
        let target: ProcessTopology = [("web", 5), ("resque", 1)].into_iter().collect();

        let outcome = scaler.scale_up(&context(), &app(), &target).await.unwrap();

        assert!(outcome.success());
        assert_eq!(
            calls(&client, Method::Put),
            vec!["/apps/xpto/units?units=3&process=web".to_string()]
        );
        assert_eq!(outcome.get("resque"), Some(&ProcessResult::Skipped));
        assert_eq!(outcome.attempted(), 1);
    }

    #[tokio::test]
    async fn scale_up_treats_missing_process_as_zero() {
        let client = ScriptedClient::new()
            .reply(200, &descriptor(&["web"]))
            .reply(200, "")
            .reply(200, &descriptor(&["web", "worker", "worker"]));
        let scaler = UnitScaler::new(&client);
        let target: ProcessTopology = [("worker", 2)].into_iter().collect();

        let outcome = scaler.scale_up(&context(), &app(), &target).await.unwrap();

        assert!(outcome.success());
        assert_eq!(
            calls(&client, Method::Put),
            vec!["/apps/xpto/units?units=2&process=worker".to_string()]
        );
    }

    #[tokio::test]
    async fn scale_up_fails_when_requery_disagrees() {
        let client = ScriptedClient::new()
            .reply(200, &descriptor(&["web"]))
            .reply(200, "")
            .reply(200, &descriptor(&["web", "web"]));
        let scaler = UnitScaler::new(&client);
        let target: ProcessTopology = [("web", 3)].into_iter().collect();

        let outcome = scaler.scale_up(&context(), &app(), &target).await.unwrap();

        assert!(!outcome.success());
        assert_eq!(
            outcome.get("web"),
            Some(&ProcessResult::Diverged {
                expected: 3,
                observed: 2
            })
        );
    }

    #[tokio::test]
    async fn scale_up_keeps_going_after_rejected_addition() {
        let client = ScriptedClient::new()
            .reply(200, &descriptor(&[]))
            .fail("connection reset")
            .reply(200, "")
            .reply(200, &descriptor(&["resque"]));
        let scaler = UnitScaler::new(&client);
        let target: ProcessTopology = [("web", 1), ("resque", 1)].into_iter().collect();

        let outcome = scaler.scale_up(&context(), &app(), &target).await.unwrap();

        assert!(!outcome.success());
        assert_eq!(outcome.get("web"), Some(&ProcessResult::Rejected));
        assert_eq!(outcome.get("resque"), Some(&ProcessResult::Converged { units: 1 }));
        assert_eq!(outcome.failures().count(), 1);
    }

    #[tokio::test]
    async fn scale_up_with_nothing_to_add_succeeds() {
        let client = ScriptedClient::new().reply(200, &descriptor(&["web", "web"]));
        let scaler = UnitScaler::new(&client);
        let target: ProcessTopology = [("web", 1)].into_iter().collect();

        let outcome = scaler.scale_up(&context(), &app(), &target).await.unwrap();

        assert!(outcome.success());
        assert!(calls(&client, Method::Put).is_empty());
    }

    #[tokio::test]
    async fn unreachable_requery_is_a_failure() {
        let client = ScriptedClient::new()
            .reply(200, &descriptor(&[]))
            .reply(200, "")
            .fail("timed out");
        let scaler = UnitScaler::new(&client);
        let target: ProcessTopology = [("web", 1)].into_iter().collect();

        let outcome = scaler.scale_up(&context(), &app(), &target).await.unwrap();

        assert!(!outcome.success());
        assert_eq!(outcome.get("web"), Some(&ProcessResult::Unverified));
    }

    #[tokio::test]
    async fn malformed_requery_propagates() {
        let client = ScriptedClient::new()
            .reply(200, &descriptor(&[]))
            .reply(200, "")
            .reply(200, "<html>oops</html>");
        let scaler = UnitScaler::new(&client);
        let target: ProcessTopology = [("web", 1)].into_iter().collect();

        let err = scaler
            .scale_up(&context(), &app(), &target)
            .await
            .unwrap_err();

        assert!(!err.is_transport());
    }

    #[tokio::test]
    async fn unreachable_descriptor_is_a_failed_outcome() {
        let client = ScriptedClient::new()
            .fail("connection refused")
            .fail("connection refused");
        let scaler = UnitScaler::new(&client);
        let target: ProcessTopology = [("web", 1)].into_iter().collect();

        let up = scaler.scale_up(&context(), &app(), &target).await.unwrap();
        let down = scaler.scale_down(&context(), &app(), 0).await.unwrap();

        for outcome in [up, down] {
            assert!(!outcome.success());
            assert!(!outcome.units_read());
            assert_eq!(outcome.attempted(), 0);
            assert_eq!(outcome.to_string(), "current units could not be read");
        }
        assert_eq!(client.requests().len(), 2);
    }

    #[tokio::test]
    async fn malformed_descriptor_propagates() {
        let client = ScriptedClient::new().reply(502, "<html>Bad Gateway</html>");
        let scaler = UnitScaler::new(&client);

        let err = scaler.scale_down(&context(), &app(), 0).await.unwrap_err();

        assert!(!err.is_transport());
    }

    #[test]
    fn outcome_display_lists_every_process() {
        let mut outcome = ScaleOutcome::new();
        outcome.record("web", 3, ProcessResult::Converged { units: 5 });
        outcome.record("resque", 0, ProcessResult::Skipped);
        outcome.record(
            "worker",
            1,
            ProcessResult::Diverged {
                expected: 2,
                observed: 1,
            },
        );

        assert_eq!(
            outcome.to_string(),
            "web converged at 5, resque skipped, worker diverged (expected 2, observed 1)"
        );
        assert!(!outcome.success());
    }
}
