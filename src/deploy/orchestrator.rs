// ABOUTME: Sequences hooks, unit scaling, the cname saga and notifications.
// ABOUTME: Implements the pre, swap and status phases over one run context.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::context::RunContext;
use crate::diagnostics::{Diagnostics, Warning};
use crate::hooks::{HookContext, HookExecutor, HookPoint, LineSink};
use crate::notify::{NotificationDispatcher, NotificationOutcome};
use crate::platform::{PlatformApi, PlatformClient};
use crate::types::{AppName, CnameSet, ProcessTopology, Slot};

use super::cname::{CnameSwap, CnameSwapper};
use super::error::DeployError;
use super::slots::SlotPair;
use super::units::{ScaleOutcome, UnitScaler};

/// Platform env var holding the tag deployed to a slot.
pub const TAG_ENV_KEY: &str = "TAG";
/// Tag used when none was stored.
pub const DEFAULT_TAG: &str = "master";

#[derive(Debug, Clone, Serialize)]
pub struct HookRecord {
    pub point: HookPoint,
    pub success: bool,
    pub exit_code: Option<i32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PreReport {
    pub app: AppName,
    pub idle: AppName,
    pub live: Option<AppName>,
    pub tag: String,
    pub idle_scale_down: ScaleOutcome,
    pub tag_stored: bool,
    pub hooks: Vec<HookRecord>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SwapReport {
    pub app: AppName,
    /// Slot now serving the cnames.
    pub live: AppName,
    /// Slot the cnames were taken from.
    pub retired: AppName,
    pub cnames: CnameSet,
    pub tag: String,
    pub target: ProcessTopology,
    pub scale_up: ScaleOutcome,
    /// `None` when the retired slot returned a malformed descriptor.
    pub retire: Option<ScaleOutcome>,
    pub notifications: NotificationOutcome,
    pub hooks: Vec<HookRecord>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    pub app: AppName,
    pub live_slot: Slot,
    pub live: AppName,
    pub idle: AppName,
    /// `false` when neither slot has cnames.
    pub serving: bool,
    pub cnames: Option<CnameSet>,
    pub live_topology: ProcessTopology,
    pub idle_topology: ProcessTopology,
    pub live_tag: Option<String>,
    pub idle_tag: Option<String>,
}

pub struct DeploymentOrchestrator<'a, C: ?Sized, H: ?Sized> {
    client: &'a C,
    hooks: &'a H,
    command_output: Option<LineSink<'a>>,
}

impl<'a, C, H> DeploymentOrchestrator<'a, C, H>
where
    C: PlatformClient + ?Sized,
    H: HookExecutor + ?Sized,
{
    pub fn new(client: &'a C, hooks: &'a H) -> Self {
        Self {
            client,
            hooks,
            command_output: None,
        }
    }

    /// Hand each stdout line of the deploy command to `sink` while it runs.
    pub fn with_command_output(mut self, sink: LineSink<'a>) -> Self {
        self.command_output = Some(sink);
        self
    }

    fn scaler(&self) -> UnitScaler<'a, C> {
        UnitScaler::new(self.client)
    }

    fn swapper(&self) -> CnameSwapper<'a, C> {
        CnameSwapper::new(self.client)
    }

    /// Ship `tag` to the idle slot.
    ///
    /// Shrinks the idle slot, stores the tag on it and runs the deploy
    /// command. A failed scale-down or tag write is a warning; a failed
    /// deploy command aborts the phase.
    pub async fn pre(
        &self,
        ctx: &RunContext,
        tag: &str,
        diag: &mut Diagnostics,
    ) -> Result<PreReport, DeployError> {
        let started_at = Utc::now();
        let slots = SlotPair::resolve(&self.swapper(), ctx).await?;
        let live = slots.cnames.as_ref().map(|_| slots.live.clone());
        let hook_ctx = HookContext {
            app: ctx.app().clone(),
            live: live.clone(),
            idle: slots.idle.clone(),
            tag: Some(tag.to_string()),
        };
        let mut hooks = Vec::new();

        tracing::info!("Deploying {} to idle slot {}", tag, slots.idle);
        self.run_hook(ctx, HookPoint::BeforePre, &hook_ctx, &mut hooks, diag)
            .await?;

        let idle_scale_down = self
            .scaler()
            .scale_down(ctx, &slots.idle, ctx.pre_keep_units())
            .await?;
        if !idle_scale_down.success() {
            diag.warn(Warning::scale_down_incomplete(format!(
                "{} was not scaled down to {} units: {}",
                slots.idle,
                ctx.pre_keep_units(),
                idle_scale_down
            )));
        }

        let tag_stored = PlatformApi::new(self.client, ctx.token())
            .set_env(&ctx.application(&slots.idle), TAG_ENV_KEY, tag)
            .await;
        if !tag_stored {
            diag.warn(Warning::tag_not_stored(format!(
                "could not store {}={} on {}",
                TAG_ENV_KEY, tag, slots.idle
            )));
        }

        tracing::info!("Running deploy command for {}", slots.idle);
        let env = hook_ctx.command_env();
        let result = match self.command_output {
            Some(sink) => {
                self.hooks
                    .run_streaming(ctx.deploy_command(), &env, sink)
                    .await
            }
            None => self.hooks.run_command(ctx.deploy_command(), &env).await,
        };
        if self.command_output.is_none() && !result.stdout.is_empty() {
            tracing::debug!("deploy command stdout: {}", result.stdout.trim_end());
        }
        if !result.success {
            if !result.stderr.is_empty() {
                tracing::error!("deploy command stderr: {}", result.stderr.trim_end());
            }
            return Err(DeployError::DeployCommandFailed {
                exit_code: result.exit_code,
            });
        }

        self.run_hook(ctx, HookPoint::AfterPre, &hook_ctx, &mut hooks, diag)
            .await?;

        Ok(PreReport {
            app: ctx.app().clone(),
            idle: slots.idle,
            live,
            tag: tag.to_string(),
            idle_scale_down,
            tag_stored,
            hooks,
            started_at,
            finished_at: Utc::now(),
        })
    }

    /// Move traffic from the live slot to the idle one.
    ///
    /// The idle slot must reach the target topology before any cname moves.
    /// Retiring the old slot and notifying are best effort.
    pub async fn swap(
        &self,
        ctx: &RunContext,
        diag: &mut Diagnostics,
    ) -> Result<SwapReport, DeployError> {
        let started_at = Utc::now();
        let swapper = self.swapper();
        let scaler = self.scaler();

        let slots = SlotPair::resolve(&swapper, ctx).await?;
        let cnames = slots.require_cnames()?.clone();
        let tag = PlatformApi::new(self.client, ctx.token())
            .get_env(&ctx.application(&slots.idle), TAG_ENV_KEY)
            .await?
            .unwrap_or_else(|| DEFAULT_TAG.to_string());

        let hook_ctx = HookContext {
            app: ctx.app().clone(),
            live: Some(slots.live.clone()),
            idle: slots.idle.clone(),
            tag: Some(tag.clone()),
        };
        let mut hooks = Vec::new();

        tracing::info!(
            "Swapping {} from {} to {} (tag {})",
            ctx.app(),
            slots.live,
            slots.idle,
            tag
        );
        self.run_hook(ctx, HookPoint::BeforeScale, &hook_ctx, &mut hooks, diag)
            .await?;

        let target = match ctx.topology() {
            Some(topology) => topology.clone(),
            None => scaler.current_topology(ctx, &slots.live).await?,
        };
        tracing::info!("Scaling {} to {}", slots.idle, target);
        let scale_up = scaler.scale_up(ctx, &slots.idle, &target).await?;
        if !scale_up.success() {
            return Err(DeployError::ScaleUpIncomplete {
                app: slots.idle,
                outcome: scale_up,
            });
        }

        self.run_hook(ctx, HookPoint::AfterScale, &hook_ctx, &mut hooks, diag)
            .await?;
        self.run_hook(ctx, HookPoint::BeforeSwap, &hook_ctx, &mut hooks, diag)
            .await?;

        let swap = CnameSwap::new(slots.live.clone(), slots.idle.clone(), cnames)
            .detach(&swapper, ctx)
            .await
            .map_err(|(_, e)| e)?;
        let swap = match swap.attach(&swapper, ctx).await {
            Ok(swap) => swap,
            Err((detached, e)) => {
                tracing::error!(
                    "cnames [{}] are detached from {} and not set on {}",
                    detached.cnames(),
                    detached.source(),
                    detached.destination()
                );
                return Err(e);
            }
        };
        let moved = swap.finish();

        self.run_hook(ctx, HookPoint::AfterSwap, &hook_ctx, &mut hooks, diag)
            .await?;

        let retire = match scaler
            .scale_down(ctx, &slots.live, ctx.keep_units())
            .await
        {
            Ok(outcome) => {
                if !outcome.success() {
                    diag.warn(Warning::scale_down_incomplete(format!(
                        "{} was not scaled down to {} units: {}",
                        slots.live,
                        ctx.keep_units(),
                        outcome
                    )));
                }
                Some(outcome)
            }
            Err(e) => {
                diag.warn(Warning::scale_down_incomplete(format!(
                    "{} was not scaled down: {}",
                    slots.live, e
                )));
                None
            }
        };

        let notifications = NotificationDispatcher::new(self.client)
            .dispatch(ctx, &slots.idle, &tag, &tag)
            .await;
        for failed in notifications.failures() {
            diag.warn(Warning::notification_failed(format!(
                "{failed} for {tag} did not succeed"
            )));
        }

        Ok(SwapReport {
            app: ctx.app().clone(),
            live: slots.idle,
            retired: slots.live,
            cnames: moved,
            tag,
            target,
            scale_up,
            retire,
            notifications,
            hooks,
            started_at,
            finished_at: Utc::now(),
        })
    }

    /// Read both slots without changing anything.
    pub async fn status(&self, ctx: &RunContext) -> Result<StatusReport, DeployError> {
        let slots = SlotPair::resolve(&self.swapper(), ctx).await?;
        let scaler = self.scaler();
        let api = PlatformApi::new(self.client, ctx.token());

        let live_topology = scaler.current_topology(ctx, &slots.live).await?;
        let idle_topology = scaler.current_topology(ctx, &slots.idle).await?;
        let live_tag = api
            .get_env(&ctx.application(&slots.live), TAG_ENV_KEY)
            .await?;
        let idle_tag = api
            .get_env(&ctx.application(&slots.idle), TAG_ENV_KEY)
            .await?;

        Ok(StatusReport {
            app: ctx.app().clone(),
            live_slot: slots.live_slot,
            serving: slots.cnames.is_some(),
            live: slots.live,
            idle: slots.idle,
            cnames: slots.cnames,
            live_topology,
            idle_topology,
            live_tag,
            idle_tag,
        })
    }

    /// Run the hook configured for `point`, if any.
    async fn run_hook(
        &self,
        ctx: &RunContext,
        point: HookPoint,
        hook_ctx: &HookContext,
        records: &mut Vec<HookRecord>,
        diag: &mut Diagnostics,
    ) -> Result<(), DeployError> {
        let Some(command) = ctx.hooks().command(point) else {
            return Ok(());
        };

        tracing::info!("Running {} hook", point);
        let result = self.hooks.run_command(command, &hook_ctx.to_env(point)).await;
        records.push(HookRecord {
            point,
            success: result.success,
            exit_code: result.exit_code,
        });

        if !result.stdout.is_empty() {
            tracing::debug!("{} hook stdout: {}", point, result.stdout.trim_end());
        }
        if result.success {
            return Ok(());
        }
        if !result.stderr.is_empty() {
            tracing::warn!("{} hook stderr: {}", point, result.stderr.trim_end());
        }

        if ctx.hooks().abort_on_failure {
            return Err(DeployError::HookAborted {
                point,
                exit_code: result.exit_code,
            });
        }
        diag.warn(Warning::hook_failed(match result.exit_code {
            Some(code) => format!("{point} hook failed with exit code {code}"),
            None => format!("{point} hook failed"),
        }));
        Ok(())
    }
}
