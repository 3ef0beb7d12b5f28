use crate::api::{ErrorBody, UpdateSimulatedTimeRequest, SIMULATED_TIME_PATH};
use crate::domain::ports::TimeParticipant;
use crate::utils::error::{LoanError, Result};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::Client;
use std::time::Duration;

/// Remote service reached over its HTTP `UpdateSimulatedTime` endpoint.
#[derive(Debug, Clone)]
pub struct HttpTimeParticipant {
    name: String,
    endpoint: String,
    client: Client,
}

impl HttpTimeParticipant {
    pub fn new(name: impl Into<String>, base_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            name: name.into(),
            endpoint: format!("{}{}", base_url.trim_end_matches('/'), SIMULATED_TIME_PATH),
            client,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl TimeParticipant for HttpTimeParticipant {
    fn name(&self) -> &str {
        &self.name
    }

    async fn update_simulated_time(&self, at: DateTime<Utc>) -> Result<()> {
        let request = UpdateSimulatedTimeRequest {
            timestamp: at.to_rfc3339_opts(SecondsFormat::Secs, true),
        };
        tracing::debug!(participant = %self.name, "POST {}", self.endpoint);

        let response = self.client.post(&self.endpoint).json(&request).send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let detail = match response.json::<ErrorBody>().await {
            Ok(body) => format!("{} {}", body.code, body.message),
            Err(_) => "no error body".to_string(),
        };
        Err(LoanError::RemoteRejected {
            participant: self.name.clone(),
            status: status.as_u16(),
            detail,
        })
    }
}
