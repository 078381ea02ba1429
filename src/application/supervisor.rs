//! Poll-loop policy for the engine.
//!
//! One [`Supervisor::tick`] per driver iteration: detect a pulled card,
//! retry recovery at a fixed pace while faulted, otherwise run the engine's
//! flush check, and run maintenance on its own schedule.

use std::rc::Rc;

use crate::domain::{AppError, OperationalStatus, Result, RetryPolicy, SupervisorConfig};
use crate::infrastructure::Clock;

use super::log_engine::{LogEngine, RecoveryOutcome};

/// What a single tick did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Storage disappeared while the engine was running.
    pub storage_lost: bool,
    /// A recovery attempt ran and settled on a file.
    pub recovered: Option<RecoveryOutcome>,
    /// A recovery attempt ran and failed.
    pub recovery_error: Option<String>,
    /// The engine's flush check failed.
    pub update_error: Option<String>,
    pub maintenance_ran: bool,
}

pub struct Supervisor {
    config: SupervisorConfig,
    clock: Rc<dyn Clock>,
    last_recovery_ms: Option<u64>,
    last_maintenance_ms: u64,
}

impl Supervisor {
    #[must_use]
    pub fn new(config: SupervisorConfig, clock: Rc<dyn Clock>) -> Self {
        let last_maintenance_ms = clock.now_millis();
        Self {
            config,
            clock,
            last_recovery_ms: None,
            last_maintenance_ms,
        }
    }

    pub fn tick(&mut self, engine: &mut LogEngine) -> TickReport {
        let now = self.clock.now_millis();
        let mut report = TickReport::default();
        let status = engine.state().status();

        if matches!(status, OperationalStatus::Ready | OperationalStatus::Logging)
            && !engine.storage().is_mounted()
        {
            engine.mark_storage_lost();
            if let Err(e) = engine
                .state_mut()
                .transition_to(OperationalStatus::StorageMountFailed)
            {
                tracing::warn!(error = %e, "Could not record storage loss");
            }
            report.storage_lost = true;
        } else if status.is_fault() {
            if self.recovery_due(now) {
                self.last_recovery_ms = Some(now);
                match recover(engine) {
                    Ok(outcome) => {
                        tracing::info!(outcome = %outcome, "Recovered from fault");
                        report.recovered = Some(outcome);
                    }
                    Err(e) => {
                        tracing::debug!(error = %e, "Recovery attempt failed");
                        report.recovery_error = Some(e.to_string());
                    }
                }
            }
        } else if let Err(e) = engine.update() {
            report.update_error = Some(e.to_string());
        }

        if self.maintenance_due(now) {
            self.last_maintenance_ms = now;
            if engine.is_ready() {
                run_maintenance(engine);
                report.maintenance_ran = true;
            }
        }

        report
    }

    fn recovery_due(&self, now: u64) -> bool {
        self.last_recovery_ms
            .is_none_or(|last| now.saturating_sub(last) >= self.config.recovery_interval_ms)
    }

    fn maintenance_due(&self, now: u64) -> bool {
        let interval_ms = self.config.maintenance_interval_secs.saturating_mul(1000);
        now.saturating_sub(self.last_maintenance_ms) >= interval_ms
    }
}

/// Single mount attempt, then walk the state machine back through
/// `ERROR` to `RECOVERING` (or `READY` without a recovery point) and let
/// the engine pick a file.
fn recover(engine: &mut LogEngine) -> Result<RecoveryOutcome> {
    engine.remount_storage(&RetryPolicy::once())?;

    let state = engine.state_mut();
    if state.status() != OperationalStatus::Error {
        state.transition_to(OperationalStatus::Error)?;
    }
    match state.attempt_recovery() {
        Ok(_) => {}
        Err(AppError::NoRecoveryPoint) => state.transition_to(OperationalStatus::Ready)?,
        Err(e) => return Err(e),
    }

    let outcome = match engine.attempt_recovery() {
        Ok(outcome) => outcome,
        Err(e) => {
            engine.state_mut().log_error(e.to_string());
            engine.state_mut().transition_to(OperationalStatus::Error)?;
            return Err(e);
        }
    };

    let state = engine.state_mut();
    let settled = if state.is_logging_active() {
        OperationalStatus::Logging
    } else {
        OperationalStatus::Ready
    };
    if state.status() != settled {
        state.transition_to(settled)?;
    }
    state.clear_last_error();
    Ok(outcome)
}

fn run_maintenance(engine: &mut LogEngine) {
    match engine.perform_maintenance() {
        Ok(report) => tracing::debug!(
            deleted = report.cleanup.deleted_count,
            "Engine maintenance done"
        ),
        Err(e) => tracing::warn!(error = %e, "Engine maintenance failed"),
    }
    if let Err(e) = engine.storage_maintenance() {
        tracing::warn!(error = %e, "Storage maintenance failed");
    }
}
