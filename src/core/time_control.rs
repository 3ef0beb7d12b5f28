use crate::core::clock::SharedClock;
use crate::domain::ports::TimeParticipant;
use crate::utils::error::{LoanError, Result};
use crate::utils::validation::parse_rfc3339;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

/// A service's handle on its own simulated clock; backs `UpdateSimulatedTime`.
#[derive(Clone)]
pub struct TimeControl {
    name: String,
    clock: SharedClock,
}

impl TimeControl {
    pub fn new(name: impl Into<String>, clock: SharedClock) -> Self {
        Self {
            name: name.into(),
            clock,
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn is_simulated(&self) -> bool {
        self.clock.is_simulated()
    }

    /// Simulation is checked before the timestamp is parsed, so a real-clock
    /// service reports `SimulationDisabled` whatever it is sent.
    pub fn update_simulated_time(&self, timestamp: &str) -> Result<DateTime<Utc>> {
        if !self.clock.is_simulated() {
            return Err(LoanError::SimulationDisabled);
        }
        let at = parse_rfc3339("timestamp", timestamp)?;
        self.set_time(at)?;
        Ok(at)
    }

    pub fn set_time(&self, at: DateTime<Utc>) -> Result<()> {
        self.clock.set(at)?;
        tracing::info!(service = %self.name, "Simulated time set to {}", at.to_rfc3339());
        Ok(())
    }

    pub fn advance_by(&self, seconds: i64) -> Result<DateTime<Utc>> {
        if !self.clock.is_simulated() {
            return Err(LoanError::SimulationDisabled);
        }
        let next = advance(self.clock.now(), seconds)?;
        self.set_time(next)?;
        Ok(next)
    }
}

pub(crate) fn advance(from: DateTime<Utc>, seconds: i64) -> Result<DateTime<Utc>> {
    Duration::try_seconds(seconds)
        .and_then(|delta| from.checked_add_signed(delta))
        .ok_or_else(|| {
            LoanError::validation(
                "seconds",
                format!("advancing {} by {}s is out of range", from.to_rfc3339(), seconds),
            )
        })
}

#[async_trait]
impl TimeParticipant for TimeControl {
    fn name(&self) -> &str {
        &self.name
    }

    async fn update_simulated_time(&self, at: DateTime<Utc>) -> Result<()> {
        self.set_time(at)
    }
}
