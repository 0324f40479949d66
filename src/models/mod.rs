//! Data models for the campus server

pub mod attendance;
pub mod book;
pub mod borrowing;
pub mod email;
pub mod enums;
pub mod reservation;
pub mod student;
pub mod user;

use serde::Serialize;
use utoipa::ToSchema;

// Re-export commonly used types
pub use attendance::{AttendanceRecord, ScanSession};
pub use book::{Book, BookCopy};
pub use borrowing::{Borrowing, BorrowingDetails};
pub use enums::{
    AttendanceStatus, BorrowingStatus, CopyStatus, EmailFrequency, EmailKind, EmailStatus,
    ReservationStatus, Role,
};
pub use reservation::Reservation;
pub use student::{Enrollment, Student, Subject};
pub use user::{LibraryUser, User, UserClaims};

const DEFAULT_PAGE_SIZE: i64 = 10;
const MAX_PAGE_SIZE: i64 = 100;

/// Offset-based page window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: i64,
    pub limit: i64,
}

impl PageRequest {
    pub fn new(page: Option<i64>, limit: Option<i64>) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            limit: limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE),
        }
    }

    /// Rows to skip; saturates so an absurd page number reads past the end
    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.limit)
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    pub total_pages: i64,
}

/// One page of results plus its position in the full set
#[derive(Debug, Clone, Serialize, ToSchema)]
#[aliases(
    BookPage = Page<book::Book>,
    BorrowingPage = Page<borrowing::BorrowingDetails>,
    EmailHistoryPage = Page<email::EmailHistory>
)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub pagination: Pagination,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, request: PageRequest, total: i64) -> Self {
        let total_pages = (total + request.limit - 1) / request.limit;
        Self {
            items,
            pagination: Pagination {
                page: request.page,
                limit: request.limit,
                total,
                total_pages,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_request_clamps_inputs() {
        assert_eq!(PageRequest::new(None, None), PageRequest { page: 1, limit: 10 });
        assert_eq!(PageRequest::new(Some(0), Some(1000)), PageRequest { page: 1, limit: 100 });
        assert_eq!(PageRequest::new(Some(3), Some(20)).offset(), 40);
    }

    #[test]
    fn huge_page_number_does_not_overflow() {
        let request = PageRequest::new(Some(i64::MAX), Some(100));
        assert_eq!(request.offset(), i64::MAX);

        let request = PageRequest::new(Some(i64::MIN), Some(100));
        assert_eq!(request.offset(), 0);
    }

    #[test]
    fn total_pages_rounds_up() {
        let page = Page::new(vec![1, 2], PageRequest::new(Some(1), Some(10)), 21);
        assert_eq!(page.pagination.total_pages, 3);
        let empty: Page<i32> = Page::new(vec![], PageRequest::new(None, None), 0);
        assert_eq!(empty.pagination.total_pages, 0);
    }
}
