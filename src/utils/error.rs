use thiserror::Error;

#[derive(Error, Debug)]
pub enum LoanError {
    #[error("Invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("Borrower {borrower_id} has reached the maximum of {limit} checked out books")]
    LimitExceeded { borrower_id: String, limit: u32 },

    #[error("Book {book_id} is already checked out")]
    BookUnavailable { book_id: String },

    #[error("Time simulation not enabled")]
    SimulationDisabled,

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },

    #[error("Store error: {message}")]
    Store { message: String },

    #[error("Notification channel error: {message}")]
    Channel { message: String },

    #[error("Codec error: {message}")]
    Codec { message: String },

    #[error("Borrow for {borrower_id} left the checkout counter incremented: {message}")]
    PartialFailure {
        borrower_id: String,
        message: String,
    },

    #[error("Simulated time applied to {applied:?} but not to {failed:?}")]
    CoordinationIncomplete {
        applied: Vec<String>,
        failed: Vec<String>,
    },

    #[error("{participant} rejected simulated time with status {status}: {detail}")]
    RemoteRejected {
        participant: String,
        status: u16,
        detail: String,
    },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Configuration validation failed for {field}: {message}")]
    ConfigValidationError { field: String, message: String },
}

/// Where a failure sits in the loan system's error taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Validation,
    BusinessRule,
    NotFound,
    StoreFailure,
    ChannelFailure,
    PartialFailure,
    Coordination,
    Configuration,
}

/// Status codes of the RPC surface, named after their gRPC counterparts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RpcCode {
    InvalidArgument,
    FailedPrecondition,
    Internal,
    Unavailable,
}

impl RpcCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RpcCode::InvalidArgument => "INVALID_ARGUMENT",
            RpcCode::FailedPrecondition => "FAILED_PRECONDITION",
            RpcCode::Internal => "INTERNAL",
            RpcCode::Unavailable => "UNAVAILABLE",
        }
    }
}

impl LoanError {
    pub fn validation(field: &str, reason: impl Into<String>) -> Self {
        LoanError::Validation {
            field: field.to_string(),
            reason: reason.into(),
        }
    }

    pub fn store(message: impl Into<String>) -> Self {
        LoanError::Store {
            message: message.into(),
        }
    }

    pub fn channel(message: impl Into<String>) -> Self {
        LoanError::Channel {
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            LoanError::Validation { .. } => ErrorCategory::Validation,
            LoanError::LimitExceeded { .. }
            | LoanError::BookUnavailable { .. }
            | LoanError::SimulationDisabled => ErrorCategory::BusinessRule,
            LoanError::NotFound { .. } => ErrorCategory::NotFound,
            LoanError::Store { .. } | LoanError::IoError(_) => ErrorCategory::StoreFailure,
            LoanError::Channel { .. }
            | LoanError::Codec { .. }
            | LoanError::SerializationError(_) => ErrorCategory::ChannelFailure,
            LoanError::PartialFailure { .. } => ErrorCategory::PartialFailure,
            LoanError::CoordinationIncomplete { .. }
            | LoanError::RemoteRejected { .. }
            | LoanError::HttpError(_) => ErrorCategory::Coordination,
            LoanError::ConfigError { .. }
            | LoanError::InvalidConfigValueError { .. }
            | LoanError::ConfigValidationError { .. } => ErrorCategory::Configuration,
        }
    }

    /// Business-rule rejections are distinguishable from infrastructure failures;
    /// a missing borrower or book is an integrity problem, so it is internal.
    pub fn rpc_code(&self) -> RpcCode {
        match self.category() {
            ErrorCategory::Validation => RpcCode::InvalidArgument,
            ErrorCategory::BusinessRule => RpcCode::FailedPrecondition,
            ErrorCategory::Coordination => RpcCode::Unavailable,
            ErrorCategory::NotFound
            | ErrorCategory::StoreFailure
            | ErrorCategory::ChannelFailure
            | ErrorCategory::PartialFailure
            | ErrorCategory::Configuration => RpcCode::Internal,
        }
    }
}

pub type Result<T> = std::result::Result<T, LoanError>;
