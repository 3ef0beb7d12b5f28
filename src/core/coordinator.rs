//! Keeps the simulated clocks of several services in step.
//!
//! This is a test-harness protocol, not a consistency primitive. Each
//! participant applies the new time on its own; there is no prepare/commit
//! round, so when one participant fails the others have already moved and
//! the clocks are skewed until the next successful `set_time`.

use crate::core::clock::SimulatedClock;
use crate::core::time_control::advance;
use crate::domain::ports::{Clock, TimeParticipant};
use crate::utils::error::{LoanError, Result};
use crate::utils::validation::parse_rfc3339;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::Mutex;

pub struct TimeCoordinator {
    participants: Vec<Arc<dyn TimeParticipant>>,
    current: SimulatedClock,
    /// Held from reading the base time until the new time is committed, so
    /// concurrent requests apply one after another.
    in_flight: Mutex<()>,
}

impl TimeCoordinator {
    pub fn new(participants: Vec<Arc<dyn TimeParticipant>>, start: DateTime<Utc>) -> Self {
        Self {
            participants,
            current: SimulatedClock::new(start),
            in_flight: Mutex::new(()),
        }
    }

    pub fn participant_names(&self) -> Vec<String> {
        self.participants
            .iter()
            .map(|p| p.name().to_string())
            .collect()
    }

    /// The last time every participant accepted.
    pub fn current_time(&self) -> DateTime<Utc> {
        self.current.now()
    }

    /// Fans `at` out to every participant, attempting all of them even after
    /// a failure. The coordinator's own time only moves when all succeeded.
    pub async fn set_time(&self, at: DateTime<Utc>) -> Result<()> {
        let _serial = self.in_flight.lock().await;
        self.fan_out(at).await
    }

    async fn fan_out(&self, at: DateTime<Utc>) -> Result<()> {
        let mut applied = Vec::new();
        let mut failed = Vec::new();

        for participant in &self.participants {
            match participant.update_simulated_time(at).await {
                Ok(()) => applied.push(participant.name().to_string()),
                Err(e) => {
                    tracing::error!(
                        participant = participant.name(),
                        "Failed to update simulated time: {}",
                        e
                    );
                    failed.push(participant.name().to_string());
                }
            }
        }

        if !failed.is_empty() {
            return Err(LoanError::CoordinationIncomplete { applied, failed });
        }

        self.current.set(at)?;
        tracing::info!(
            participants = applied.len(),
            "Simulated time set to {}",
            at.to_rfc3339()
        );
        Ok(())
    }

    pub async fn set_time_rfc3339(&self, timestamp: &str) -> Result<DateTime<Utc>> {
        let at = parse_rfc3339("timestamp", timestamp)?;
        self.set_time(at).await?;
        Ok(at)
    }

    /// Moves every participant `seconds` past the coordinator's current time.
    pub async fn advance_by(&self, seconds: i64) -> Result<DateTime<Utc>> {
        let _serial = self.in_flight.lock().await;
        let next = advance(self.current_time(), seconds)?;
        self.fan_out(next).await?;
        Ok(next)
    }

    pub async fn advance_days(&self, days: i64) -> Result<DateTime<Utc>> {
        let seconds = days.checked_mul(24 * 60 * 60).ok_or_else(|| {
            LoanError::validation("days", format!("{} days is out of range", days))
        })?;
        self.advance_by(seconds).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::clock::{RealClock, SharedClock};
    use crate::core::time_control::TimeControl;
    use async_trait::async_trait;
    use chrono::TimeZone;

    /// Participant that suspends before applying, like a remote call would.
    struct SlowParticipant(TimeControl);

    #[async_trait]
    impl TimeParticipant for SlowParticipant {
        fn name(&self) -> &str {
            TimeParticipant::name(&self.0)
        }

        async fn update_simulated_time(&self, at: DateTime<Utc>) -> Result<()> {
            tokio::task::yield_now().await;
            self.0.set_time(at)
        }
    }

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    fn participant(name: &str) -> (Arc<dyn TimeParticipant>, SharedClock) {
        let clock: SharedClock = Arc::new(SimulatedClock::new(start()));
        (Arc::new(TimeControl::new(name, clock.clone())), clock)
    }

    #[tokio::test]
    async fn test_set_time_reaches_every_participant() {
        let (loans, loans_clock) = participant("loans");
        let (notify, notify_clock) = participant("notifications");
        let coordinator = TimeCoordinator::new(vec![loans, notify], start());

        let at = Utc.with_ymd_and_hms(2024, 1, 6, 9, 0, 0).unwrap();
        coordinator.set_time(at).await.unwrap();

        assert_eq!(loans_clock.now(), at);
        assert_eq!(notify_clock.now(), at);
        assert_eq!(coordinator.current_time(), at);
    }

    #[tokio::test]
    async fn test_failure_is_reported_and_others_still_applied() {
        let (loans, loans_clock) = participant("loans");
        let real: Arc<dyn TimeParticipant> =
            Arc::new(TimeControl::new("legacy", Arc::new(RealClock)));
        let (notify, notify_clock) = participant("notifications");
        let coordinator = TimeCoordinator::new(vec![loans, real, notify], start());

        let at = Utc.with_ymd_and_hms(2024, 1, 3, 0, 0, 0).unwrap();
        let err = coordinator.set_time(at).await.unwrap_err();

        match err {
            LoanError::CoordinationIncomplete { applied, failed } => {
                assert_eq!(applied, vec!["loans", "notifications"]);
                assert_eq!(failed, vec!["legacy"]);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(loans_clock.now(), at);
        assert_eq!(notify_clock.now(), at);
        assert_eq!(coordinator.current_time(), start());
    }

    #[tokio::test]
    async fn test_advance_by_is_relative_to_coordinator_time() {
        let (loans, loans_clock) = participant("loans");
        let coordinator = TimeCoordinator::new(vec![loans], start());

        coordinator.advance_by(60).await.unwrap();
        let second = coordinator.advance_by(120).await.unwrap();

        assert_eq!(second, start() + chrono::Duration::seconds(180));
        assert_eq!(loans_clock.now(), second);
    }

    #[tokio::test]
    async fn test_advance_days() {
        let (loans, loans_clock) = participant("loans");
        let coordinator = TimeCoordinator::new(vec![loans], start());

        coordinator.advance_days(5).await.unwrap();
        assert_eq!(
            loans_clock.now(),
            Utc.with_ymd_and_hms(2024, 1, 6, 0, 0, 0).unwrap()
        );
        assert_eq!(coordinator.participant_names(), vec!["loans"]);
    }

    #[tokio::test]
    async fn test_set_time_rfc3339_rejects_garbage() {
        let coordinator = TimeCoordinator::new(Vec::new(), start());
        assert!(matches!(
            coordinator.set_time_rfc3339("soon").await,
            Err(LoanError::Validation { .. })
        ));
    }

    #[tokio::test]
    async fn test_concurrent_advances_both_apply() {
        let clock: SharedClock = Arc::new(SimulatedClock::new(start()));
        let slow: Arc<dyn TimeParticipant> =
            Arc::new(SlowParticipant(TimeControl::new("loans", clock.clone())));
        let coordinator = TimeCoordinator::new(vec![slow], start());

        let (a, b) = tokio::join!(coordinator.advance_by(3_600), coordinator.advance_by(3_600));

        let mut applied = vec![a.unwrap(), b.unwrap()];
        applied.sort();
        let two_hours = Utc.with_ymd_and_hms(2024, 1, 1, 2, 0, 0).unwrap();
        assert_eq!(applied[1], two_hours);
        assert_ne!(applied[0], applied[1]);
        assert_eq!(coordinator.current_time(), two_hours);
        assert_eq!(clock.now(), two_hours);
    }
}
