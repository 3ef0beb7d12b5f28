use crate::config::toml_config::SeedConfig;
use crate::domain::model::{
    Book, BookId, BookLocation, Borrower, BorrowerId, Checkout, Loan, LoanKey,
};
use crate::domain::ports::LoanStore;
use crate::utils::error::{LoanError, Result};
use crate::utils::validation::parse_uuid;
use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Debug, Default)]
struct Tables {
    borrowers: HashMap<BorrowerId, Borrower>,
    checked_out: HashMap<BorrowerId, u32>,
    books: HashMap<BookId, Book>,
    loans: BTreeMap<LoanKey, Loan>,
}

/// Process-local `LoanStore`. Every operation takes the table lock once, so
/// each call is atomic, and `apply_checkout` writes both rows under one guard.
#[derive(Debug, Clone, Default)]
pub struct InMemoryLoanStore {
    tables: Arc<Mutex<Tables>>,
}

impl InMemoryLoanStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_borrower(&self, borrower: Borrower) {
        let mut tables = self.tables.lock().await;
        tables.borrowers.insert(borrower.id, borrower);
    }

    pub async fn insert_book(&self, book: Book) {
        let mut tables = self.tables.lock().await;
        tables.books.insert(book.id, book);
    }

    pub async fn set_checked_out(&self, borrower_id: BorrowerId, count: u32) {
        let mut tables = self.tables.lock().await;
        tables.checked_out.insert(borrower_id, count);
    }

    /// Loads configured borrowers and books. Returns how many rows were written.
    pub async fn load_seed(&self, seed: &SeedConfig) -> Result<usize> {
        let mut tables = self.tables.lock().await;
        for entry in &seed.borrowers {
            let id = BorrowerId(parse_uuid("seed.borrowers.id", &entry.id)?);
            tables.borrowers.insert(
                id,
                Borrower {
                    id,
                    name: entry.name.clone(),
                    email_address: entry.email_address.clone(),
                },
            );
            if entry.checked_out_books > 0 {
                tables.checked_out.insert(id, entry.checked_out_books);
            }
        }
        for entry in &seed.books {
            let id = BookId(parse_uuid("seed.books.id", &entry.id)?);
            let shelf_id = parse_uuid("seed.books.shelf_id", &entry.shelf_id)?;
            tables.books.insert(
                id,
                Book {
                    id,
                    title: entry.title.clone(),
                    author_first_name: entry.author_first_name.clone(),
                    author_surname: entry.author_surname.clone(),
                    location: BookLocation::on_shelf(shelf_id),
                },
            );
        }
        Ok(seed.borrowers.len() + seed.books.len())
    }

    pub async fn loans(&self) -> Vec<Loan> {
        let tables = self.tables.lock().await;
        tables.loans.values().cloned().collect()
    }

    pub async fn loan(&self, key: &LoanKey) -> Option<Loan> {
        let tables = self.tables.lock().await;
        tables.loans.get(key).cloned()
    }
}

#[async_trait]
impl LoanStore for InMemoryLoanStore {
    async fn checked_out_count(&self, borrower_id: BorrowerId) -> Result<u32> {
        let tables = self.tables.lock().await;
        Ok(tables.checked_out.get(&borrower_id).copied().unwrap_or(0))
    }

    async fn compare_and_set_checked_out(
        &self,
        borrower_id: BorrowerId,
        expected: u32,
        new: u32,
    ) -> Result<bool> {
        let mut tables = self.tables.lock().await;
        let current = tables.checked_out.get(&borrower_id).copied().unwrap_or(0);
        if current != expected {
            return Ok(false);
        }
        tables.checked_out.insert(borrower_id, new);
        Ok(true)
    }

    async fn borrower(&self, borrower_id: BorrowerId) -> Result<Borrower> {
        let tables = self.tables.lock().await;
        tables
            .borrowers
            .get(&borrower_id)
            .cloned()
            .ok_or_else(|| LoanError::NotFound {
                entity: "borrower",
                id: borrower_id.to_string(),
            })
    }

    async fn book(&self, book_id: BookId) -> Result<Book> {
        let tables = self.tables.lock().await;
        tables
            .books
            .get(&book_id)
            .cloned()
            .ok_or_else(|| LoanError::NotFound {
                entity: "book",
                id: book_id.to_string(),
            })
    }

    async fn apply_checkout(&self, checkout: Checkout) -> Result<()> {
        let mut tables = self.tables.lock().await;
        let book = tables.books.get_mut(&checkout.book_id).ok_or_else(|| {
            LoanError::store(format!("no location row for book {}", checkout.book_id))
        })?;
        if book.location.is_checked_out() {
            return Err(LoanError::BookUnavailable {
                book_id: checkout.book_id.to_string(),
            });
        }
        book.location = checkout.location;
        tables.loans.insert(checkout.loan.key, checkout.loan);
        Ok(())
    }

    async fn unnotified_loans_due_on(&self, due_date: NaiveDate) -> Result<Vec<Loan>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .loans
            .values()
            .filter(|loan| loan.key.due_date == due_date && !loan.due_soon_notification_sent)
            .cloned()
            .collect())
    }

    async fn mark_due_soon_notified(&self, key: &LoanKey) -> Result<()> {
        let mut tables = self.tables.lock().await;
        let loan = tables.loans.get_mut(key).ok_or_else(|| LoanError::NotFound {
            entity: "loan",
            id: format!("{}/{}/{}", key.borrower_id, key.due_date, key.book_id),
        })?;
        loan.due_soon_notification_sent = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::toml_config::{SeedBook, SeedBorrower};
    use uuid::Uuid;

    fn borrower() -> Borrower {
        Borrower {
            id: BorrowerId::new(),
            name: "Ada".to_string(),
            email_address: "ada@example.com".to_string(),
        }
    }

    fn book() -> Book {
        Book {
            id: BookId::new(),
            title: "Dune".to_string(),
            author_first_name: "Frank".to_string(),
            author_surname: "Herbert".to_string(),
            location: BookLocation::on_shelf(Uuid::new_v4()),
        }
    }

    #[tokio::test]
    async fn test_missing_counter_reads_as_zero() {
        let store = InMemoryLoanStore::new();
        assert_eq!(store.checked_out_count(BorrowerId::new()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_compare_and_set_rejects_stale_expectation() {
        let store = InMemoryLoanStore::new();
        let id = BorrowerId::new();

        assert!(store.compare_and_set_checked_out(id, 0, 1).await.unwrap());
        assert!(!store.compare_and_set_checked_out(id, 0, 1).await.unwrap());
        assert_eq!(store.checked_out_count(id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_lookups_report_not_found() {
        let store = InMemoryLoanStore::new();
        assert!(matches!(
            store.borrower(BorrowerId::new()).await,
            Err(LoanError::NotFound { entity: "borrower", .. })
        ));
        assert!(matches!(
            store.book(BookId::new()).await,
            Err(LoanError::NotFound { entity: "book", .. })
        ));
    }

    #[tokio::test]
    async fn test_checkout_moves_book_and_records_loan() {
        let store = InMemoryLoanStore::new();
        let borrower = borrower();
        let book = book();
        store.insert_borrower(borrower.clone()).await;
        store.insert_book(book.clone()).await;

        let due = NaiveDate::from_ymd_opt(2024, 1, 8).unwrap();
        let loan = Loan::new(&borrower, &book, due);
        store
            .apply_checkout(Checkout {
                book_id: book.id,
                location: BookLocation::checked_out_to(borrower.id),
                loan: loan.clone(),
            })
            .await
            .unwrap();

        let stored_book = store.book(book.id).await.unwrap();
        assert!(stored_book.location.is_checked_out());
        assert_eq!(stored_book.location.location_id, borrower.id.0);
        assert_eq!(store.loan(&loan.key).await, Some(loan));
    }

    #[tokio::test]
    async fn test_checkout_of_checked_out_book_writes_nothing() {
        let store = InMemoryLoanStore::new();
        let first = borrower();
        let second = borrower();
        let book = book();
        store.insert_book(book.clone()).await;

        let due = NaiveDate::from_ymd_opt(2024, 1, 8).unwrap();
        store
            .apply_checkout(Checkout {
                book_id: book.id,
                location: BookLocation::checked_out_to(first.id),
                loan: Loan::new(&first, &book, due),
            })
            .await
            .unwrap();

        let err = store
            .apply_checkout(Checkout {
                book_id: book.id,
                location: BookLocation::checked_out_to(second.id),
                loan: Loan::new(&second, &book, due),
            })
            .await
            .unwrap_err();

        assert!(matches!(err, LoanError::BookUnavailable { .. }));
        assert_eq!(store.loans().await.len(), 1);
        assert_eq!(
            store.book(book.id).await.unwrap().location,
            BookLocation::checked_out_to(first.id)
        );
    }

    #[tokio::test]
    async fn test_due_date_query_is_exact_and_skips_notified() {
        let store = InMemoryLoanStore::new();
        let borrower = borrower();
        let first = book();
        let second = book();
        let third = book();
        for b in [&first, &second, &third] {
            store.insert_book(b.clone()).await;
        }

        let target = NaiveDate::from_ymd_opt(2024, 1, 8).unwrap();
        let other = NaiveDate::from_ymd_opt(2024, 1, 9).unwrap();
        let due_target = Loan::new(&borrower, &first, target);
        let due_other = Loan::new(&borrower, &second, other);
        let mut already = Loan::new(&borrower, &third, target);
        already.due_soon_notification_sent = true;

        for (b, loan) in [(&first, &due_target), (&second, &due_other), (&third, &already)] {
            store
                .apply_checkout(Checkout {
                    book_id: b.id,
                    location: BookLocation::checked_out_to(borrower.id),
                    loan: loan.clone(),
                })
                .await
                .unwrap();
        }

        let found = store.unnotified_loans_due_on(target).await.unwrap();
        assert_eq!(found, vec![due_target.clone()]);

        store.mark_due_soon_notified(&due_target.key).await.unwrap();
        assert!(store.unnotified_loans_due_on(target).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_load_seed_populates_tables() {
        let store = InMemoryLoanStore::new();
        let borrower_id = Uuid::new_v4();
        let book_id = Uuid::new_v4();
        let seed = SeedConfig {
            borrowers: vec![SeedBorrower {
                id: borrower_id.to_string(),
                name: "Ada".to_string(),
                email_address: "ada@example.com".to_string(),
                checked_out_books: 1,
            }],
            books: vec![SeedBook {
                id: book_id.to_string(),
                title: "Dune".to_string(),
                author_first_name: "Frank".to_string(),
                author_surname: "Herbert".to_string(),
                shelf_id: Uuid::new_v4().to_string(),
            }],
        };

        assert_eq!(store.load_seed(&seed).await.unwrap(), 2);
        assert_eq!(
            store.checked_out_count(BorrowerId(borrower_id)).await.unwrap(),
            1
        );
        let book = store.book(BookId(book_id)).await.unwrap();
        assert!(!book.location.is_checked_out());
    }

    #[tokio::test]
    async fn test_marking_unknown_loan_fails() {
        let store = InMemoryLoanStore::new();
        let key = LoanKey {
            borrower_id: BorrowerId::new(),
            due_date: NaiveDate::from_ymd_opt(2024, 1, 8).unwrap(),
            book_id: BookId::new(),
        };
        assert!(store.mark_due_soon_notified(&key).await.is_err());
    }
}
