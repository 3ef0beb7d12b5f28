use crate::domain::ports::Clock;
use crate::utils::error::{LoanError, Result};
use chrono::{DateTime, Utc};
use std::sync::{Arc, RwLock};

pub type SharedClock = Arc<dyn Clock>;

/// Host wall clock. Stateless.
#[derive(Debug, Clone, Copy, Default)]
pub struct RealClock;

impl Clock for RealClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn set(&self, _at: DateTime<Utc>) -> Result<()> {
        Err(LoanError::SimulationDisabled)
    }

    fn is_simulated(&self) -> bool {
        false
    }
}

/// Settable clock. Readers share the lock, `set` takes it exclusively, so a
/// read never observes a half-written value. Moving backwards is allowed.
#[derive(Debug)]
pub struct SimulatedClock {
    current: RwLock<DateTime<Utc>>,
}

impl SimulatedClock {
    pub fn new(initial: DateTime<Utc>) -> Self {
        Self {
            current: RwLock::new(initial),
        }
    }
}

impl Clock for SimulatedClock {
    fn now(&self) -> DateTime<Utc> {
        // The guarded value is Copy, so a poisoned lock still holds a whole value.
        *self.current.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn set(&self, at: DateTime<Utc>) -> Result<()> {
        let mut current = self
            .current
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *current = at;
        Ok(())
    }

    fn is_simulated(&self) -> bool {
        true
    }
}

/// Builds the process clock the composition root hands to every component.
pub fn clock_for(simulate: bool, start: Option<DateTime<Utc>>) -> SharedClock {
    if simulate {
        let initial = start.unwrap_or_else(Utc::now);
        tracing::info!("Using simulated time starting at {}", initial.to_rfc3339());
        Arc::new(SimulatedClock::new(initial))
    } else {
        tracing::info!("Using actual system time");
        Arc::new(RealClock)
    }
}
