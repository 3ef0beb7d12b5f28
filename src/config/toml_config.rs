use crate::adapters::channel::SEND_EMAIL_TOPIC;
use crate::core::ledger::{LedgerPolicy, DEFAULT_CHECKOUT_LIMIT, DEFAULT_LOAN_PERIOD_DAYS};
use crate::core::scanner::DEFAULT_DUE_SOON_DAYS;
use crate::utils::error::{LoanError, Result};
use crate::utils::validation::{
    parse_rfc3339, parse_uuid, validate_non_empty_string, validate_positive_number,
    validate_range, validate_socket_addr, validate_url, Validate,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub service: ServiceSection,
    pub logging: LoggingConfig,
    pub clock: ClockConfig,
    pub loans: LoansConfig,
    pub scanner: ScannerConfig,
    pub coordinator: CoordinatorConfig,
    pub seed: SeedConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceSection {
    pub name: String,
    pub listen_addr: String,
}

impl Default for ServiceSection {
    fn default() -> Self {
        Self {
            name: "library-loans".to_string(),
            listen_addr: "127.0.0.1:50051".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: "compact".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClockConfig {
    pub simulate: bool,
    /// RFC 3339 start of simulated time; wall-clock now when absent.
    pub start: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoansConfig {
    pub checkout_limit: u32,
    pub loan_period_days: u64,
}

impl Default for LoansConfig {
    fn default() -> Self {
        Self {
            checkout_limit: DEFAULT_CHECKOUT_LIMIT,
            loan_period_days: DEFAULT_LOAN_PERIOD_DAYS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScannerConfig {
    pub interval_seconds: u64,
    pub due_soon_days: u64,
    pub topic: String,
    pub consumer_batch_size: usize,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            interval_seconds: 300,
            due_soon_days: DEFAULT_DUE_SOON_DAYS,
            topic: SEND_EMAIL_TOPIC.to_string(),
            consumer_batch_size: 100,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordinatorConfig {
    pub listen_addr: String,
    pub request_timeout_seconds: u64,
    pub participants: Vec<ParticipantConfig>,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:50052".to_string(),
            request_timeout_seconds: 10,
            participants: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParticipantConfig {
    pub name: String,
    pub url: String,
}

/// Borrowers and books loaded into the in-memory store at startup;
/// registration itself happens outside this system.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SeedConfig {
    pub borrowers: Vec<SeedBorrower>,
    pub books: Vec<SeedBook>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedBorrower {
    pub id: String,
    pub name: String,
    pub email_address: String,
    #[serde(default)]
    pub checked_out_books: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedBook {
    pub id: String,
    pub title: String,
    pub author_first_name: String,
    pub author_surname: String,
    pub shelf_id: String,
}

impl ServiceConfig {
    /// Loads the configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(LoanError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// Parses the configuration from a TOML string.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| LoanError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// Replaces `${VAR}` references with environment values. Unset variables stay as written.
    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| LoanError::ConfigError {
            message: format!("invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn ledger_policy(&self) -> LedgerPolicy {
        LedgerPolicy {
            checkout_limit: self.loans.checkout_limit,
            loan_period_days: self.loans.loan_period_days,
        }
    }

    pub fn scan_interval(&self) -> Duration {
        Duration::from_secs(self.scanner.interval_seconds)
    }

    pub fn clock_start(&self) -> Result<Option<DateTime<Utc>>> {
        self.clock
            .start
            .as_deref()
            .map(|start| parse_rfc3339("clock.start", start))
            .transpose()
    }
}

impl Validate for ServiceConfig {
    fn validate(&self) -> Result<()> {
        validate_non_empty_string("service.name", &self.service.name)?;
        validate_socket_addr("service.listen_addr", &self.service.listen_addr)?;

        if !matches!(self.logging.format.as_str(), "compact" | "json") {
            return Err(LoanError::InvalidConfigValueError {
                field: "logging.format".to_string(),
                value: self.logging.format.clone(),
                reason: "Valid formats: compact, json".to_string(),
            });
        }

        self.clock_start()?;

        validate_positive_number(
            "loans.checkout_limit",
            u64::from(self.loans.checkout_limit),
            1,
        )?;
        validate_positive_number("loans.loan_period_days", self.loans.loan_period_days, 1)?;

        validate_positive_number("scanner.interval_seconds", self.scanner.interval_seconds, 1)?;
        validate_range("scanner.due_soon_days", self.scanner.due_soon_days, 0, 365)?;
        validate_non_empty_string("scanner.topic", &self.scanner.topic)?;
        validate_positive_number(
            "scanner.consumer_batch_size",
            self.scanner.consumer_batch_size as u64,
            1,
        )?;

        validate_socket_addr("coordinator.listen_addr", &self.coordinator.listen_addr)?;
        validate_positive_number(
            "coordinator.request_timeout_seconds",
            self.coordinator.request_timeout_seconds,
            1,
        )?;
        for participant in &self.coordinator.participants {
            validate_non_empty_string("coordinator.participants.name", &participant.name)?;
            validate_url("coordinator.participants.url", &participant.url)?;
        }

        for borrower in &self.seed.borrowers {
            parse_uuid("seed.borrowers.id", &borrower.id)?;
        }
        for book in &self.seed.books {
            parse_uuid("seed.books.id", &book.id)?;
            parse_uuid("seed.books.shelf_id", &book.shelf_id)?;
        }

        Ok(())
    }
}
