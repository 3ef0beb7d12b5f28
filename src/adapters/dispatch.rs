use crate::adapters::channel::InMemoryLog;
use crate::adapters::codec::decode_send_email;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Stand-in for the external email service: reads the notification log and
/// logs each command instead of sending mail.
pub struct EmailLogConsumer {
    log: InMemoryLog,
    committed: u64,
    batch_size: usize,
}

impl EmailLogConsumer {
    pub fn new(log: InMemoryLog, batch_size: usize) -> Self {
        Self {
            log,
            committed: 0,
            batch_size: batch_size.max(1),
        }
    }

    pub fn committed_offset(&self) -> u64 {
        self.committed
    }

    /// Processes one batch from the committed offset and commits past it.
    /// Returns the number of records read.
    pub async fn poll_once(&mut self) -> usize {
        let batch = self.log.read_batch(self.committed, self.batch_size).await;
        let Some(last) = batch.last().map(|record| record.offset) else {
            return 0;
        };

        for record in &batch {
            match decode_send_email(&record.payload) {
                Ok(command) => tracing::info!(
                    "sending email...\nTo: {}\nSubject: {}\nBody: {}",
                    command.to_address,
                    command.subject,
                    command.body
                ),
                Err(e) => {
                    tracing::warn!(offset = record.offset, "Failed to deserialize message: {}", e)
                }
            }
        }

        self.committed = last + 1;
        batch.len()
    }

    pub fn spawn(mut self, mut shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(async move {
            tracing::info!(topic = %self.log.topic(), "Email consumer started");
            let log = self.log.clone();
            loop {
                // Register interest before draining so an append in between is not missed.
                let appended = log.notified();
                tokio::pin!(appended);
                appended.as_mut().enable();

                while self.poll_once().await > 0 {}

                tokio::select! {
                    _ = &mut appended => {}
                    _ = shutdown.changed() => break,
                }
            }
            tracing::info!("Email consumer shutting down...");
        })
    }
}
