// ABOUTME: Error types for deployment phases.
// ABOUTME: Covers slot resolution, scale-up, cname saga, hook and deploy command failures.

use crate::hooks::HookPoint;
use crate::platform::PlatformError;
use crate::types::{AppName, AppNameError, CnameSet};

use super::units::ScaleOutcome;

/// Exit code for a phase that ran and failed.
pub const EXIT_PHASE_FAILED: i32 = 2;

/// Errors that abort a deployment phase.
#[derive(Debug, thiserror::Error)]
pub enum DeployError {
    /// Neither slot has cnames, so there is nothing to swap.
    #[error("no live slot: neither {blue} nor {green} has cnames")]
    NoLiveSlot { blue: AppName, green: AppName },

    /// A slot name could not be derived from the base name.
    #[error("invalid slot name: {0}")]
    InvalidSlot(#[from] AppNameError),

    /// The idle slot did not reach the target topology.
    #[error("failed to scale up {app}: {outcome}")]
    ScaleUpIncomplete { app: AppName, outcome: ScaleOutcome },

    /// Cnames could not be removed from the live slot. Nothing changed.
    #[error("failed to remove cnames [{cnames}] from {app}")]
    CnameDetachFailed { app: AppName, cnames: CnameSet },

    /// Cnames were removed from `detached_from` but could not be set on `app`.
    #[error("cnames [{cnames}] were removed from {detached_from} but could not be set on {app}")]
    CnameAttachFailed {
        app: AppName,
        detached_from: AppName,
        cnames: CnameSet,
    },

    /// Cnames could not be put back on their source slot.
    #[error("failed to restore cnames [{cnames}] on {app}")]
    CnameRestoreFailed { app: AppName, cnames: CnameSet },

    /// A hook failed while `abort_on_failure` is set.
    #[error("{point} hook failed{}", exit_suffix(.exit_code))]
    HookAborted {
        point: HookPoint,
        exit_code: Option<i32>,
    },

    /// The deploy command exited non-zero or could not be started.
    #[error("deploy command failed{}", exit_suffix(.exit_code))]
    DeployCommandFailed { exit_code: Option<i32> },

    /// Platform read failed or returned an unreadable body.
    #[error(transparent)]
    Platform(#[from] PlatformError),
}

fn exit_suffix(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!(" with exit code {code}"),
        None => String::new(),
    }
}

impl DeployError {
    /// Process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            DeployError::DeployCommandFailed {
                exit_code: Some(code),
            } if *code != 0 => *code,
            DeployError::Platform(_) | DeployError::InvalidSlot(_) => 1,
            _ => EXIT_PHASE_FAILED,
        }
    }
}
