use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BorrowerId(pub Uuid);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BookId(pub Uuid);

impl BorrowerId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for BorrowerId {
    fn default() -> Self {
        Self::new()
    }
}

impl BookId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for BookId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for BorrowerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl fmt::Display for BookId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Borrower {
    pub id: BorrowerId,
    pub name: String,
    pub email_address: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationType {
    OnShelf,
    CheckedOut,
}

/// Where a book currently is: a shelf id when on the shelf, the holding
/// borrower's id when checked out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookLocation {
    pub location_type: LocationType,
    pub location_id: Uuid,
}

impl BookLocation {
    pub fn on_shelf(shelf_id: Uuid) -> Self {
        Self {
            location_type: LocationType::OnShelf,
            location_id: shelf_id,
        }
    }

    pub fn checked_out_to(borrower_id: BorrowerId) -> Self {
        Self {
            location_type: LocationType::CheckedOut,
            location_id: borrower_id.0,
        }
    }

    pub fn is_checked_out(&self) -> bool {
        self.location_type == LocationType::CheckedOut
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
    pub id: BookId,
    pub title: String,
    pub author_first_name: String,
    pub author_surname: String,
    pub location: BookLocation,
}

impl Book {
    pub fn author(&self) -> String {
        format!("{} {}", self.author_first_name, self.author_surname)
    }
}

/// Full identity of a loan row. Ordering follows the key layout:
/// borrower, then due date, then book.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LoanKey {
    pub borrower_id: BorrowerId,
    pub due_date: NaiveDate,
    pub book_id: BookId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Loan {
    pub key: LoanKey,
    pub borrower_name: String,
    pub borrower_email: String,
    pub book_title: String,
    pub book_author: String,
    pub due_soon_notification_sent: bool,
}

impl Loan {
    pub fn new(borrower: &Borrower, book: &Book, due_date: NaiveDate) -> Self {
        Self {
            key: LoanKey {
                borrower_id: borrower.id,
                due_date,
                book_id: book.id,
            },
            borrower_name: borrower.name.clone(),
            borrower_email: borrower.email_address.clone(),
            book_title: book.title.clone(),
            book_author: book.author(),
            due_soon_notification_sent: false,
        }
    }

    pub fn due_date(&self) -> NaiveDate {
        self.key.due_date
    }
}

/// Writes that must land together when a book is checked out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Checkout {
    pub book_id: BookId,
    pub location: BookLocation,
    pub loan: Loan,
}

/// Command consumed by the email dispatcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendEmailCommand {
    pub to_address: String,
    pub subject: String,
    pub body: String,
}

impl SendEmailCommand {
    pub fn due_soon_reminder(loan: &Loan) -> Self {
        let body = format!(
            "Dear {},\n\nThis is a reminder that '{}' by {} is due on {}.\n\nKind regards,\nLibrary System",
            loan.borrower_name,
            loan.book_title,
            loan.book_author,
            loan.due_date().format("%Y-%m-%d"),
        );

        Self {
            to_address: loan.borrower_email.clone(),
            subject: format!("Library Book Due Soon: {}", loan.book_title),
            body,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_due_soon_reminder_content() {
        let borrower = Borrower {
            id: BorrowerId::new(),
            name: "Ada Lovelace".to_string(),
            email_address: "ada@example.com".to_string(),
        };
        let book = Book {
            id: BookId::new(),
            title: "Dune".to_string(),
            author_first_name: "Frank".to_string(),
            author_surname: "Herbert".to_string(),
            location: BookLocation::on_shelf(Uuid::new_v4()),
        };
        let due = NaiveDate::from_ymd_opt(2024, 1, 8).unwrap();
        let loan = Loan::new(&borrower, &book, due);

        let command = SendEmailCommand::due_soon_reminder(&loan);

        assert_eq!(command.to_address, "ada@example.com");
        assert_eq!(command.subject, "Library Book Due Soon: Dune");
        assert!(command.body.starts_with("Dear Ada Lovelace,"));
        assert!(command
            .body
            .contains("'Dune' by Frank Herbert is due on 2024-01-08."));
    }

    #[test]
    fn test_new_loan_is_not_yet_notified() {
        let borrower = Borrower {
            id: BorrowerId::new(),
            name: "Grace".to_string(),
            email_address: "grace@example.com".to_string(),
        };
        let book = Book {
            id: BookId::new(),
            title: "Compilers".to_string(),
            author_first_name: "Alfred".to_string(),
            author_surname: "Aho".to_string(),
            location: BookLocation::on_shelf(Uuid::new_v4()),
        };
        let loan = Loan::new(&borrower, &book, NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());

        assert!(!loan.due_soon_notification_sent);
        assert_eq!(loan.key.borrower_id, borrower.id);
        assert_eq!(loan.book_author, "Alfred Aho");
    }
}
