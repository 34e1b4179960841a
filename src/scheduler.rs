use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::time::Duration;
use tracing::{error, info, instrument};

use crate::cycle::{CheckCycle, CycleError};
use crate::model::CycleOutcome;

/// Drives check cycles back to back, `interval` apart.
pub struct Scheduler {
    cycle: CheckCycle,
    interval: Duration,
}

impl Scheduler {
    pub fn new(cycle: CheckCycle, interval: Duration) -> Self {
        Self { cycle, interval }
    }

    /// Run one guarded cycle. Returns `None` when the cycle panicked.
    #[instrument(skip_all)]
    pub async fn tick(&self) -> Option<Result<CycleOutcome, CycleError>> {
        match AssertUnwindSafe(self.cycle.run()).catch_unwind().await {
            Ok(Ok(outcome)) => {
                info!(state = outcome.terminal_state().as_str(), "check completed");
                Some(Ok(outcome))
            }
            Ok(Err(err)) => {
                error!(state = err.state().as_str(), %err, "check failed; skipping tick");
                Some(Err(err))
            }
            Err(panic) => {
                error!(panic = %panic_message(panic.as_ref()), "check cycle panicked; skipping tick");
                None
            }
        }
    }

    /// Loop forever. The wait starts only after the previous cycle returned.
    pub async fn run_forever(&self) {
        loop {
            self.tick().await;
            info!(next_in_secs = self.interval.as_secs(), "next check scheduled");
            tokio::time::sleep(self.interval).await;
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(msg) = panic.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn panic_message_handles_common_payloads() {
        let boxed: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(boxed.as_ref()), "boom");
        let boxed: Box<dyn Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(boxed.as_ref()), "bang");
        let boxed: Box<dyn Any + Send> = Box::new(7u8);
        assert_eq!(panic_message(boxed.as_ref()), "unknown panic payload");
    }
}
