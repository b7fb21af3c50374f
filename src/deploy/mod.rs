// ABOUTME: Blue/green deployment: unit scaling, cname swap saga and phase orchestration.
// ABOUTME: The cname saga uses the type state pattern to expose its intermediate state.

mod cname;
mod error;
mod orchestrator;
mod slots;
mod units;

pub use cname::{Bound, CnameSwap, CnameSwapper, Detached, SwapPhase, Swapped, TransitionResult};
pub use error::{DeployError, EXIT_PHASE_FAILED};
pub use orchestrator::{
    DEFAULT_TAG, DeploymentOrchestrator, HookRecord, PreReport, StatusReport, SwapReport,
    TAG_ENV_KEY,
};
pub use slots::SlotPair;
pub use units::{ProcessResult, ProcessScale, ScaleOutcome, UnitScaler};
