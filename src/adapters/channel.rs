use crate::adapters::codec::encode_send_email;
use crate::domain::model::SendEmailCommand;
use crate::domain::ports::NotificationChannel;
use crate::utils::error::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::futures::Notified;
use tokio::sync::{Mutex, Notify};

pub const SEND_EMAIL_TOPIC: &str = "send-email-command";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    pub offset: u64,
    pub payload: Vec<u8>,
}

/// Append-only, single-topic log living in this process. A publish is
/// acknowledged once the encoded record is appended.
#[derive(Debug, Clone)]
pub struct InMemoryLog {
    topic: String,
    records: Arc<Mutex<Vec<Vec<u8>>>>,
    appended: Arc<Notify>,
}

impl InMemoryLog {
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            records: Arc::new(Mutex::new(Vec::new())),
            appended: Arc::new(Notify::new()),
        }
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub async fn append(&self, payload: Vec<u8>) -> u64 {
        let offset = {
            let mut records = self.records.lock().await;
            records.push(payload);
            (records.len() - 1) as u64
        };
        self.appended.notify_waiters();
        offset
    }

    pub async fn read_batch(&self, from: u64, max: usize) -> Vec<LogRecord> {
        let records = self.records.lock().await;
        records
            .iter()
            .enumerate()
            .skip(from as usize)
            .take(max)
            .map(|(offset, payload)| LogRecord {
                offset: offset as u64,
                payload: payload.clone(),
            })
            .collect()
    }

    pub async fn len(&self) -> u64 {
        self.records.lock().await.len() as u64
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Future resolving on the next append; `enable` it before draining to avoid a lost wakeup.
    pub fn notified(&self) -> Notified<'_> {
        self.appended.notified()
    }
}

impl Default for InMemoryLog {
    fn default() -> Self {
        Self::new(SEND_EMAIL_TOPIC)
    }
}

#[async_trait]
impl NotificationChannel for InMemoryLog {
    async fn publish(&self, command: &SendEmailCommand) -> Result<()> {
        let offset = self.append(encode_send_email(command)?).await;
        tracing::debug!(topic = %self.topic, offset, "Appended send-email command");
        Ok(())
    }
}
