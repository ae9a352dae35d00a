//! Data models for Libris

pub mod book;
pub mod borrow;
pub mod notification;
pub mod payment;
pub mod report;
pub mod student;
pub mod user;

// Re-export commonly used types
pub use book::Book;
pub use borrow::{Borrow, BorrowDetails};
pub use notification::Notification;
pub use payment::Payment;
pub use student::{Student, StudentShort};
pub use user::{Identity, Role, User};
