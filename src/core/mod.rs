pub mod clock;
pub mod coordinator;
pub mod ledger;
pub mod scanner;
pub mod time_control;

pub use crate::domain::model::{
    Book, BookId, BookLocation, Borrower, BorrowerId, Loan, LoanKey, SendEmailCommand,
};
pub use crate::domain::ports::{Clock, LoanStore, NotificationChannel, TimeParticipant};
pub use crate::utils::error::Result;
