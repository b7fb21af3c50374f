// ABOUTME: Cname reads and mutations, and the remove-then-set swap saga.
// ABOUTME: Saga states are zero-sized markers; a failed step hands back the prior state.

use std::marker::PhantomData;

use crate::context::RunContext;
use crate::platform::{PlatformApi, PlatformClient, PlatformError};
use crate::types::{AppName, CnameSet};

use super::error::DeployError;

pub struct CnameSwapper<'a, C: ?Sized> {
    client: &'a C,
}

impl<'a, C: PlatformClient + ?Sized> CnameSwapper<'a, C> {
    pub fn new(client: &'a C) -> Self {
        Self { client }
    }

    /// Cnames attached to `app`, or `None` when it has none.
    pub async fn current_cnames(
        &self,
        ctx: &RunContext,
        app: &AppName,
    ) -> Result<Option<CnameSet>, PlatformError> {
        let api = PlatformApi::new(self.client, ctx.token());
        Ok(api.app_descriptor(&ctx.application(app)).await?.cnames())
    }

    pub async fn remove_cnames(&self, ctx: &RunContext, app: &AppName, cnames: &CnameSet) -> bool {
        tracing::info!("Removing cnames [{}] from {}", cnames, app);
        PlatformApi::new(self.client, ctx.token())
            .remove_cnames(&ctx.application(app), cnames)
            .await
    }

    pub async fn set_cnames(&self, ctx: &RunContext, app: &AppName, cnames: &CnameSet) -> bool {
        tracing::info!("Setting cnames [{}] on {}", cnames, app);
        PlatformApi::new(self.client, ctx.token())
            .set_cnames(&ctx.application(app), cnames)
            .await
    }
}

/// Cnames still attached to the source.
/// Available actions: `detach()`
#[derive(Debug, Clone, Copy, Default)]
pub struct Bound;

/// Cnames removed from the source, not yet on the destination.
/// Available actions: `attach()`, `restore()`
#[derive(Debug, Clone, Copy, Default)]
pub struct Detached;

/// Cnames attached to the destination.
#[derive(Debug, Clone, Copy, Default)]
pub struct Swapped;

/// Name of a saga state, for logs and reports.
pub trait SwapPhase {
    const NAME: &'static str;
}

impl SwapPhase for Bound {
    const NAME: &'static str = "bound";
}

impl SwapPhase for Detached {
    const NAME: &'static str = "detached";
}

impl SwapPhase for Swapped {
    const NAME: &'static str = "swapped";
}

/// Result type for saga steps: the next state, or the unchanged state and the error.
pub type TransitionResult<T, S> = Result<CnameSwap<T>, (CnameSwap<S>, DeployError)>;

/// Moving a cname set from one application to another in two platform calls.
///
/// Nothing is compensated automatically. A failed `attach` leaves the saga in
/// `Detached`, where the caller decides whether to `restore` or retry.
#[derive(Debug)]
pub struct CnameSwap<S> {
    source: AppName,
    destination: AppName,
    cnames: CnameSet,
    _state: PhantomData<S>,
}

impl<S> CnameSwap<S> {
    fn transition<T>(self) -> CnameSwap<T> {
        CnameSwap {
            source: self.source,
            destination: self.destination,
            cnames: self.cnames,
            _state: PhantomData,
        }
    }

    pub fn source(&self) -> &AppName {
        &self.source
    }

    pub fn destination(&self) -> &AppName {
        &self.destination
    }

    pub fn cnames(&self) -> &CnameSet {
        &self.cnames
    }
}

impl<S: SwapPhase> CnameSwap<S> {
    pub fn phase(&self) -> &'static str {
        S::NAME
    }
}

impl CnameSwap<Bound> {
    pub fn new(source: AppName, destination: AppName, cnames: CnameSet) -> Self {
        Self {
            source,
            destination,
            cnames,
            _state: PhantomData,
        }
    }

    /// Remove the cnames from the source.
    #[must_use = "swap state must be used"]
    pub async fn detach<C: PlatformClient + ?Sized>(
        self,
        swapper: &CnameSwapper<'_, C>,
        ctx: &RunContext,
    ) -> TransitionResult<Detached, Bound> {
        if swapper.remove_cnames(ctx, &self.source, &self.cnames).await {
            Ok(self.transition())
        } else {
            let err = DeployError::CnameDetachFailed {
                app: self.source.clone(),
                cnames: self.cnames.clone(),
            };
            Err((self, err))
        }
    }
}

impl CnameSwap<Detached> {
    /// Pick up a swap whose cnames are known to be detached from `source`,
    /// e.g. from the fields of a `CnameAttachFailed` error.
    pub fn resume(source: AppName, destination: AppName, cnames: CnameSet) -> Self {
        Self {
            source,
            destination,
            cnames,
            _state: PhantomData,
        }
    }

    /// Set the cnames on the destination.
    #[must_use = "swap state must be used"]
    pub async fn attach<C: PlatformClient + ?Sized>(
        self,
        swapper: &CnameSwapper<'_, C>,
        ctx: &RunContext,
    ) -> TransitionResult<Swapped, Detached> {
        if swapper.set_cnames(ctx, &self.destination, &self.cnames).await {
            Ok(self.transition())
        } else {
            let err = DeployError::CnameAttachFailed {
                app: self.destination.clone(),
                detached_from: self.source.clone(),
                cnames: self.cnames.clone(),
            };
            Err((self, err))
        }
    }

    /// Put the cnames back on the source.
    #[must_use = "swap state must be used"]
    pub async fn restore<C: PlatformClient + ?Sized>(
        self,
        swapper: &CnameSwapper<'_, C>,
        ctx: &RunContext,
    ) -> TransitionResult<Bound, Detached> {
        if swapper.set_cnames(ctx, &self.source, &self.cnames).await {
            Ok(self.transition())
        } else {
            let err = DeployError::CnameRestoreFailed {
                app: self.source.clone(),
                cnames: self.cnames.clone(),
            };
            Err((self, err))
        }
    }
}

impl CnameSwap<Swapped> {
    /// Finish the saga, returning the moved cnames.
    pub fn finish(self) -> CnameSet {
        self.cnames
    }
}
