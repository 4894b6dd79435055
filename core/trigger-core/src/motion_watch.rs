//! Single-shot significant-motion watch.
//!
//! ```text
//! ARMED ──fire──▶ FIRED ──arm()──▶ ARMED
//!   │
//!   └──cancel()──▶ CANCELLED (terminal, teardown only)
//! ```
//!
//! `arm()` always cancels the outstanding registration before requesting a new
//! one, so repeated arming never stacks requests on the hardware.

use crate::error::{Result, TriggerError};
use crate::platform::{MotionTrigger, PlatformError};
use crate::types::WatchState;

pub struct MotionWatch {
    trigger: Box<dyn MotionTrigger>,
    state: WatchState,
    arms: u64,
}

impl MotionWatch {
    /// Performs the first registration. Failure here means the device has no
    /// usable motion trigger, which is fatal.
    pub fn start(mut trigger: Box<dyn MotionTrigger>) -> Result<Self> {
        trigger
            .request()
            .map_err(|err| TriggerError::MissingHardware {
                capability: "significant motion trigger",
                details: err.to_string(),
            })?;

        tracing::info!("Motion watch armed");
        Ok(MotionWatch {
            trigger,
            state: WatchState::Armed,
            arms: 1,
        })
    }

    /// Re-registers the single pending request. A no-op once cancelled.
    pub fn arm(&mut self) -> Result<()> {
        if self.state == WatchState::Cancelled {
            tracing::debug!("Ignoring arm request on cancelled motion watch");
            return Ok(());
        }

        self.trigger.cancel();
        match self.trigger.request() {
            Ok(()) => {
                self.state = WatchState::Armed;
                self.arms += 1;
                Ok(())
            }
            Err(err) => {
                // The old registration is gone; the next rearm tick retries.
                self.state = WatchState::Fired;
                let details = err.to_string();
                match err {
                    PlatformError::Unavailable(_) => Err(TriggerError::MissingHardware {
                        capability: "significant motion trigger",
                        details,
                    }),
                    PlatformError::Failed(_) => Err(TriggerError::Rearm { details }),
                }
            }
        }
    }

    /// Consumes the pending registration. Returns `false` for a fire that
    /// arrives when nothing was armed (late delivery after cancel).
    pub fn on_fired(&mut self) -> bool {
        if self.state != WatchState::Armed {
            return false;
        }
        self.state = WatchState::Fired;
        true
    }

    pub fn cancel(&mut self) {
        if self.state == WatchState::Cancelled {
            return;
        }
        self.trigger.cancel();
        self.state = WatchState::Cancelled;
        tracing::info!(arms = self.arms, "Motion watch cancelled");
    }

    pub fn state(&self) -> WatchState {
        self.state
    }

    /// Successful registrations, including the initial one.
    pub fn arm_count(&self) -> u64 {
        self.arms
    }
}
