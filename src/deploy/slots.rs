// ABOUTME: Blue/green slot resolution from the platform's current cnames.
// ABOUTME: Green is live when it has cnames; otherwise blue is.

use serde::Serialize;

use crate::context::RunContext;
use crate::platform::PlatformClient;
use crate::types::{AppName, CnameSet, Slot};

use super::cname::CnameSwapper;
use super::error::DeployError;

/// Which slot serves traffic and which one receives the next release.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SlotPair {
    pub live_slot: Slot,
    pub live: AppName,
    pub idle: AppName,
    /// Cnames attached to the live slot.
    pub cnames: Option<CnameSet>,
}

impl SlotPair {
    pub async fn resolve<C: PlatformClient + ?Sized>(
        swapper: &CnameSwapper<'_, C>,
        ctx: &RunContext,
    ) -> Result<Self, DeployError> {
        let blue = ctx.app().slot(Slot::Blue)?;
        let green = ctx.app().slot(Slot::Green)?;

        let pair = match swapper.current_cnames(ctx, &green).await? {
            Some(cnames) => Self {
                live_slot: Slot::Green,
                live: green,
                idle: blue,
                cnames: Some(cnames),
            },
            None => {
                let cnames = swapper.current_cnames(ctx, &blue).await?;
                Self {
                    live_slot: Slot::Blue,
                    live: blue,
                    idle: green,
                    cnames,
                }
            }
        };

        tracing::debug!("live slot is {} ({})", pair.live_slot, pair.live);
        Ok(pair)
    }

    pub fn idle_slot(&self) -> Slot {
        self.live_slot.other()
    }

    /// Live cnames, failing when neither slot serves traffic.
    pub fn require_cnames(&self) -> Result<&CnameSet, DeployError> {
        self.cnames.as_ref().ok_or_else(|| {
            let (blue, green) = match self.live_slot {
                Slot::Blue => (self.live.clone(), self.idle.clone()),
                Slot::Green => (self.idle.clone(), self.live.clone()),
            };
            DeployError::NoLiveSlot { blue, green }
        })
    }
}
