use crate::core::clock::SharedClock;
use crate::domain::model::{BookId, BookLocation, BorrowerId, Checkout, Loan};
use crate::domain::ports::LoanStore;
use crate::utils::error::{LoanError, Result};
use chrono::{Days, NaiveDate};
use std::sync::Arc;

pub const DEFAULT_CHECKOUT_LIMIT: u32 = 2;
pub const DEFAULT_LOAN_PERIOD_DAYS: u64 = 7;

/// Attempts at the conditional counter increment before giving up under contention.
const MAX_INCREMENT_ATTEMPTS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedgerPolicy {
    pub checkout_limit: u32,
    pub loan_period_days: u64,
}

impl Default for LedgerPolicy {
    fn default() -> Self {
        Self {
            checkout_limit: DEFAULT_CHECKOUT_LIMIT,
            loan_period_days: DEFAULT_LOAN_PERIOD_DAYS,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BorrowBookCommand {
    pub borrower_id: BorrowerId,
    pub book_id: BookId,
}

/// Owns the borrow workflow.
///
/// The store has no cross-row transactions, so a borrow is three writes:
/// a conditional counter increment, then one batch for the book location and
/// the loan row. A failed batch is compensated by decrementing the counter.
pub struct LoanLedger<S: LoanStore> {
    store: Arc<S>,
    clock: SharedClock,
    policy: LedgerPolicy,
}

impl<S: LoanStore> LoanLedger<S> {
    pub fn new(store: Arc<S>, clock: SharedClock, policy: LedgerPolicy) -> Self {
        Self {
            store,
            clock,
            policy,
        }
    }

    pub fn clock(&self) -> &SharedClock {
        &self.clock
    }

    pub fn policy(&self) -> LedgerPolicy {
        self.policy
    }

    /// Checks the borrower out with the book and returns the due date.
    pub async fn borrow_book(&self, cmd: BorrowBookCommand) -> Result<NaiveDate> {
        tracing::info!(
            borrower_id = %cmd.borrower_id,
            book_id = %cmd.book_id,
            "Starting borrow book process"
        );

        let checked_out = self.store.checked_out_count(cmd.borrower_id).await?;
        tracing::debug!(
            borrower_id = %cmd.borrower_id,
            checked_out,
            "Read checked out book count"
        );
        self.ensure_under_limit(cmd.borrower_id, checked_out)?;

        // Denormalised fields are fetched before any write so a miss leaves no trace.
        let borrower = self.store.borrower(cmd.borrower_id).await?;
        let book = self.store.book(cmd.book_id).await?;
        if book.location.is_checked_out() {
            tracing::warn!(book_id = %cmd.book_id, "Book is already checked out");
            return Err(LoanError::BookUnavailable {
                book_id: cmd.book_id.to_string(),
            });
        }

        // One clock read serves both the stored loan and the returned due date.
        let due_date = self.due_date_from_now()?;

        self.increment_checked_out(cmd.borrower_id, checked_out).await?;

        let checkout = Checkout {
            book_id: book.id,
            location: BookLocation::checked_out_to(borrower.id),
            loan: Loan::new(&borrower, &book, due_date),
        };

        // The batch re-checks the location, so a concurrent borrow of the same
        // book loses here even though both passed the read above.
        if let Err(e) = self.store.apply_checkout(checkout).await {
            if matches!(e, LoanError::BookUnavailable { .. }) {
                tracing::warn!(book_id = %cmd.book_id, "Book was checked out concurrently");
            } else {
                tracing::error!(
                    borrower_id = %cmd.borrower_id,
                    book_id = %cmd.book_id,
                    "Failed to execute checkout batch: {}",
                    e
                );
            }
            return Err(self.compensate(cmd.borrower_id, e).await);
        }

        tracing::info!(
            borrower_id = %cmd.borrower_id,
            book_id = %cmd.book_id,
            due_date = %due_date,
            "Successfully completed borrow book process"
        );
        Ok(due_date)
    }

    fn ensure_under_limit(&self, borrower_id: BorrowerId, checked_out: u32) -> Result<()> {
        if checked_out >= self.policy.checkout_limit {
            tracing::info!(
                borrower_id = %borrower_id,
                limit = self.policy.checkout_limit,
                "Borrower has reached maximum number of books"
            );
            return Err(LoanError::LimitExceeded {
                borrower_id: borrower_id.to_string(),
                limit: self.policy.checkout_limit,
            });
        }
        Ok(())
    }

    /// Compare-and-set increment. Concurrent borrows by the same borrower
    /// re-read the counter and re-check the limit instead of overshooting it.
    async fn increment_checked_out(&self, borrower_id: BorrowerId, observed: u32) -> Result<()> {
        let mut expected = observed;
        for attempt in 1..=MAX_INCREMENT_ATTEMPTS {
            if self
                .store
                .compare_and_set_checked_out(borrower_id, expected, expected + 1)
                .await?
            {
                return Ok(());
            }
            tracing::debug!(
                borrower_id = %borrower_id,
                attempt,
                "Checked out count changed concurrently, re-reading"
            );
            expected = self.store.checked_out_count(borrower_id).await?;
            self.ensure_under_limit(borrower_id, expected)?;
        }
        Err(LoanError::store(format!(
            "checked out count for {} kept changing after {} attempts",
            borrower_id, MAX_INCREMENT_ATTEMPTS
        )))
    }

    /// Undoes the counter increment. Returns the error to report: the original
    /// one, or `PartialFailure` when the decrement could not be applied either.
    async fn compensate(&self, borrower_id: BorrowerId, cause: LoanError) -> LoanError {
        for _ in 0..MAX_INCREMENT_ATTEMPTS {
            let current = match self.store.checked_out_count(borrower_id).await {
                Ok(current) => current,
                Err(e) => return self.partial_failure(borrower_id, &cause, &e),
            };
            if current == 0 {
                tracing::warn!(
                    borrower_id = %borrower_id,
                    "Checked out count already zero, nothing to compensate"
                );
                return cause;
            }
            match self
                .store
                .compare_and_set_checked_out(borrower_id, current, current - 1)
                .await
            {
                Ok(true) => {
                    tracing::info!(borrower_id = %borrower_id, "Compensated checked out count");
                    return cause;
                }
                Ok(false) => continue,
                Err(e) => return self.partial_failure(borrower_id, &cause, &e),
            }
        }
        self.partial_failure(
            borrower_id,
            &cause,
            &LoanError::store("checked out count kept changing during compensation"),
        )
    }

    fn partial_failure(
        &self,
        borrower_id: BorrowerId,
        cause: &LoanError,
        compensation_error: &LoanError,
    ) -> LoanError {
        tracing::error!(
            borrower_id = %borrower_id,
            "Could not compensate checked out count after failed checkout: {}",
            compensation_error
        );
        LoanError::PartialFailure {
            borrower_id: borrower_id.to_string(),
            message: format!("{}; compensation failed: {}", cause, compensation_error),
        }
    }

    /// Today on the injected clock, plus the loan period.
    fn due_date_from_now(&self) -> Result<NaiveDate> {
        let today = self.clock.now().date_naive();
        today
            .checked_add_days(Days::new(self.policy.loan_period_days))
            .ok_or_else(|| {
                LoanError::validation(
                    "due_date",
                    format!("{} + {} days is out of range", today, self.policy.loan_period_days),
                )
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory_store::InMemoryLoanStore;
    use crate::core::clock::SimulatedClock;
    use crate::domain::model::{Book, Borrower};
    use chrono::{TimeZone, Utc};
    use uuid::Uuid;

    async fn fixture(
        at: chrono::DateTime<Utc>,
    ) -> (
        LoanLedger<InMemoryLoanStore>,
        Arc<InMemoryLoanStore>,
        Borrower,
        Book,
    ) {
        let store = Arc::new(InMemoryLoanStore::new());
        let borrower = Borrower {
            id: BorrowerId::new(),
            name: "Ada".to_string(),
            email_address: "ada@example.com".to_string(),
        };
        let book = Book {
            id: BookId::new(),
            title: "Dune".to_string(),
            author_first_name: "Frank".to_string(),
            author_surname: "Herbert".to_string(),
            location: BookLocation::on_shelf(Uuid::new_v4()),
        };
        store.insert_borrower(borrower.clone()).await;
        store.insert_book(book.clone()).await;

        let clock: SharedClock = Arc::new(SimulatedClock::new(at));
        let ledger = LoanLedger::new(store.clone(), clock, LedgerPolicy::default());
        (ledger, store, borrower, book)
    }

    #[tokio::test]
    async fn test_due_date_ignores_time_of_day() {
        let late = Utc.with_ymd_and_hms(2024, 1, 1, 23, 59, 59).unwrap();
        let (ledger, _store, borrower, book) = fixture(late).await;

        let due = ledger
            .borrow_book(BorrowBookCommand {
                borrower_id: borrower.id,
                book_id: book.id,
            })
            .await
            .unwrap();

        assert_eq!(due, NaiveDate::from_ymd_opt(2024, 1, 8).unwrap());
    }

    #[tokio::test]
    async fn test_second_borrow_of_same_book_is_rejected() {
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap();
        let (ledger, store, borrower, book) = fixture(at).await;
        let cmd = BorrowBookCommand {
            borrower_id: borrower.id,
            book_id: book.id,
        };

        ledger.borrow_book(cmd).await.unwrap();
        let err = ledger.borrow_book(cmd).await.unwrap_err();

        assert!(matches!(err, LoanError::BookUnavailable { .. }));
        assert_eq!(store.checked_out_count(borrower.id).await.unwrap(), 1);
        assert_eq!(store.loans().await.len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_book_touches_nothing() {
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap();
        let (ledger, store, borrower, _book) = fixture(at).await;

        let err = ledger
            .borrow_book(BorrowBookCommand {
                borrower_id: borrower.id,
                book_id: BookId::new(),
            })
            .await
            .unwrap_err();

        assert!(matches!(err, LoanError::NotFound { entity: "book", .. }));
        assert_eq!(store.checked_out_count(borrower.id).await.unwrap(), 0);
        assert!(store.loans().await.is_empty());
    }

    #[tokio::test]
    async fn test_configured_limit_is_honoured() {
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap();
        let (_ledger, store, borrower, book) = fixture(at).await;
        let clock: SharedClock = Arc::new(SimulatedClock::new(at));
        let ledger = LoanLedger::new(
            store.clone(),
            clock,
            LedgerPolicy {
                checkout_limit: 1,
                loan_period_days: 14,
            },
        );
        store.set_checked_out(borrower.id, 1).await;

        let err = ledger
            .borrow_book(BorrowBookCommand {
                borrower_id: borrower.id,
                book_id: book.id,
            })
            .await
            .unwrap_err();

        assert!(matches!(err, LoanError::LimitExceeded { limit: 1, .. }));
    }
}
