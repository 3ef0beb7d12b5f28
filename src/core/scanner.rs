use crate::core::clock::SharedClock;
use crate::domain::model::SendEmailCommand;
use crate::domain::ports::{LoanStore, NotificationChannel};
use crate::utils::error::{LoanError, Result};
use chrono::{Days, NaiveDate};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

pub const DEFAULT_DUE_SOON_DAYS: u64 = 2;
pub const DEFAULT_SCAN_INTERVAL: Duration = Duration::from_secs(300);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanReport {
    pub target_date: NaiveDate,
    pub matched: usize,
    pub notified: usize,
    pub publish_failures: usize,
    pub flag_failures: usize,
}

/// Finds loans entering the due-soon window and reminds their borrowers.
///
/// Reminders are sent before the loan is flagged, so a crash or a failed flag
/// write leads to a second reminder on the next scan, never to a lost one.
pub struct DueSoonScanner<S: LoanStore, N: NotificationChannel> {
    store: Arc<S>,
    channel: Arc<N>,
    clock: SharedClock,
    due_soon_days: u64,
}

impl<S: LoanStore, N: NotificationChannel> DueSoonScanner<S, N> {
    pub fn new(store: Arc<S>, channel: Arc<N>, clock: SharedClock, due_soon_days: u64) -> Self {
        Self {
            store,
            channel,
            clock,
            due_soon_days,
        }
    }

    pub fn target_date(&self) -> Result<NaiveDate> {
        let today = self.clock.now().date_naive();
        today
            .checked_add_days(Days::new(self.due_soon_days))
            .ok_or_else(|| {
                LoanError::validation(
                    "target_date",
                    format!("{} + {} days is out of range", today, self.due_soon_days),
                )
            })
    }

    pub async fn scan_and_notify(&self) -> Result<ScanReport> {
        let target_date = self.target_date()?;
        tracing::info!("Checking for loans due on {}", target_date);

        let loans = self.store.unnotified_loans_due_on(target_date).await?;
        tracing::info!("Found {} unnotified loans due on {}", loans.len(), target_date);

        let mut report = ScanReport {
            target_date,
            matched: loans.len(),
            notified: 0,
            publish_failures: 0,
            flag_failures: 0,
        };

        for loan in loans {
            let command = SendEmailCommand::due_soon_reminder(&loan);
            if let Err(e) = self.channel.publish(&command).await {
                tracing::warn!(
                    borrower_id = %loan.key.borrower_id,
                    book_id = %loan.key.book_id,
                    "Failed to send email command: {}",
                    e
                );
                report.publish_failures += 1;
                continue;
            }

            match self.store.mark_due_soon_notified(&loan.key).await {
                Ok(()) => report.notified += 1,
                Err(e) => {
                    // Already sent; the next scan will send it again.
                    tracing::warn!(
                        borrower_id = %loan.key.borrower_id,
                        book_id = %loan.key.book_id,
                        "Failed to mark notification as sent: {}",
                        e
                    );
                    report.flag_failures += 1;
                }
            }
        }

        Ok(report)
    }
}

/// Background scan loop: one scan immediately, then one per interval.
pub struct ScannerHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl ScannerHandle {
    pub fn spawn<S, N>(scanner: DueSoonScanner<S, N>, interval: Duration) -> Self
    where
        S: LoanStore + 'static,
        N: NotificationChannel + 'static,
    {
        let (shutdown, mut stopped) = watch::channel(false);
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        // Runs to completion; stop requests are seen on the next select.
                        if let Err(e) = scanner.scan_and_notify().await {
                            tracing::error!("Error checking due loans: {}", e);
                        }
                    }
                    _ = stopped.changed() => break,
                }
            }
            tracing::info!("Due-soon scanner stopped");
        });

        Self { shutdown, task }
    }

    /// Cancels future scans and waits for an in-flight scan to finish.
    pub async fn stop(self) {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.task.await {
            tracing::error!("Due-soon scanner task failed: {}", e);
        }
    }
}
