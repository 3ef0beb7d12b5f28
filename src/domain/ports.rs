use crate::domain::model::{
    Book, BookId, Borrower, BorrowerId, Checkout, Loan, LoanKey, SendEmailCommand,
};
use crate::utils::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

/// Source of "now" for a process. Either the host clock or a settable
/// simulated value; components receive it explicitly, never as a global.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    /// Replaces the current time. Fails with `SimulationDisabled` on a real clock.
    fn set(&self, at: DateTime<Utc>) -> Result<()>;

    fn is_simulated(&self) -> bool;
}

/// Persisted borrower counters, book locations and loan records.
#[async_trait]
pub trait LoanStore: Send + Sync {
    /// Current checked-out-book counter; a borrower without a counter row has zero.
    async fn checked_out_count(&self, borrower_id: BorrowerId) -> Result<u32>;

    /// Writes `new` only if the stored counter still equals `expected`.
    /// Returns whether the write was applied.
    async fn compare_and_set_checked_out(
        &self,
        borrower_id: BorrowerId,
        expected: u32,
        new: u32,
    ) -> Result<bool>;

    async fn borrower(&self, borrower_id: BorrowerId) -> Result<Borrower>;

    async fn book(&self, book_id: BookId) -> Result<Book>;

    /// Moves the book and inserts the loan as one atomic batch, conditional on
    /// the book still being on the shelf. Fails with `BookUnavailable` otherwise,
    /// leaving both rows untouched.
    async fn apply_checkout(&self, checkout: Checkout) -> Result<()>;

    /// Loans due exactly on `due_date` whose due-soon flag is still false.
    async fn unnotified_loans_due_on(&self, due_date: NaiveDate) -> Result<Vec<Loan>>;

    async fn mark_due_soon_notified(&self, key: &LoanKey) -> Result<()>;
}

/// Producer side of the notification topic. A publish succeeds only once the
/// command is durably acknowledged.
#[async_trait]
pub trait NotificationChannel: Send + Sync {
    async fn publish(&self, command: &SendEmailCommand) -> Result<()>;
}

/// A service whose simulated clock is driven by the time coordinator.
#[async_trait]
pub trait TimeParticipant: Send + Sync {
    fn name(&self) -> &str;

    async fn update_simulated_time(&self, at: DateTime<Utc>) -> Result<()>;
}
