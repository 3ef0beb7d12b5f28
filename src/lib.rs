pub mod adapters;
pub mod api;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::cli::{CoordinatorArgs, ServiceArgs};

pub use adapters::{channel::InMemoryLog, memory_store::InMemoryLoanStore};
pub use config::ServiceConfig;
pub use core::{
    clock::{RealClock, SharedClock, SimulatedClock},
    coordinator::TimeCoordinator,
    ledger::{BorrowBookCommand, LedgerPolicy, LoanLedger},
    scanner::{DueSoonScanner, ScanReport, ScannerHandle},
    time_control::TimeControl,
};
pub use utils::error::{LoanError, Result};
