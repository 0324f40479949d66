//! Borrowings, fines and circulation statistics

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use super::enums::BorrowingStatus;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Borrowing {
    pub id: i32,
    /// Library user (not the credentialed user id)
    pub user_id: i32,
    pub book_copy_id: i32,
    pub borrowed_at: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
    pub returned_at: Option<DateTime<Utc>>,
    pub status: BorrowingStatus,
    #[schema(value_type = String)]
    pub fine_amount: Decimal,
}

/// Borrowing joined with the copy, the title and the borrower
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct BorrowingDetails {
    pub id: i32,
    pub user_id: i32,
    pub book_copy_id: i32,
    pub borrowed_at: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
    pub returned_at: Option<DateTime<Utc>>,
    pub status: BorrowingStatus,
    #[schema(value_type = String)]
    pub fine_amount: Decimal,
    pub barcode: String,
    pub book_id: i32,
    pub title: String,
    pub author: String,
    pub isbn: Option<String>,
    pub library_card_number: String,
    pub username: String,
    pub email: String,
    pub is_overdue: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Fine {
    pub id: i32,
    pub borrowing_id: i32,
    #[schema(value_type = String)]
    pub amount: Decimal,
    pub reason: String,
    pub paid: bool,
    pub created_at: DateTime<Utc>,
}

/// Terms applied when a copy leaves the desk
#[derive(Debug, Clone, Copy)]
pub struct LoanTerms {
    pub loan_days: i64,
    pub renewal_days: i64,
    pub fine_per_day: Decimal,
}

impl LoanTerms {
    pub fn due_date(&self, borrowed_at: DateTime<Utc>) -> DateTime<Utc> {
        borrowed_at + Duration::days(self.loan_days)
    }

    /// Renewal extends from the current due date, not from now
    pub fn renewed_due_date(&self, current_due: DateTime<Utc>) -> DateTime<Utc> {
        current_due + Duration::days(self.renewal_days)
    }
}

const SECONDS_PER_DAY: i64 = 86_400;

/// Started days between `due_date` and `returned_at`, zero when on time
pub fn overdue_days(due_date: DateTime<Utc>, returned_at: DateTime<Utc>) -> i64 {
    if returned_at <= due_date {
        return 0;
    }
    let late_seconds = (returned_at - due_date).num_seconds();
    (late_seconds + SECONDS_PER_DAY - 1) / SECONDS_PER_DAY
}

/// Fine owed when a copy due at `due_date` comes back at `returned_at`:
/// every started day past the due date is charged `per_day`.
pub fn overdue_fine(due_date: DateTime<Utc>, returned_at: DateTime<Utc>, per_day: Decimal) -> Decimal {
    per_day * Decimal::from(overdue_days(due_date, returned_at))
}

/// Outcome of a return, including the fine that was recorded
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ReturnReceipt {
    pub borrowing: Borrowing,
    #[schema(value_type = String)]
    pub fine_amount: Decimal,
    pub days_overdue: i64,
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct BorrowRequest {
    #[serde(alias = "bookId")]
    pub book_id: i32,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ReturnRequest {
    #[serde(alias = "borrowingId")]
    pub borrowing_id: i32,
}

/// Desk checkout on behalf of a user
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct IssueRequest {
    /// Credentialed user id
    #[serde(alias = "userId")]
    pub user_id: i32,
    #[serde(alias = "bookId")]
    pub book_id: i32,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct BorrowingQuery {
    pub status: Option<BorrowingStatus>,
    /// Credentialed user id
    pub user_id: Option<i32>,
    pub overdue: Option<bool>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct BorrowingSearch {
    /// Title, barcode, username or card number fragment
    pub q: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct LibraryStats {
    pub total_books: i64,
    pub total_copies: i64,
    pub available_copies: i64,
    pub active_borrowings: i64,
    pub overdue_borrowings: i64,
    pub active_reservations: i64,
    #[schema(value_type = String)]
    pub unpaid_fines: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn rate() -> Decimal {
        Decimal::new(50, 2)
    }

    fn due() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 10, 0, 0).unwrap()
    }

    #[test]
    fn on_time_return_costs_nothing() {
        assert_eq!(overdue_fine(due(), due() - Duration::days(13), rate()), Decimal::ZERO);
        assert_eq!(overdue_fine(due(), due(), rate()), Decimal::ZERO);
    }

    #[test]
    fn whole_days_late_are_charged_per_day() {
        for n in [1, 2, 7, 30] {
            let fine = overdue_fine(due(), due() + Duration::days(n), rate());
            assert_eq!(fine, rate() * Decimal::from(n));
        }
    }

    #[test]
    fn a_started_day_counts_as_a_full_day() {
        assert_eq!(overdue_fine(due(), due() + Duration::seconds(1), rate()), Decimal::new(50, 2));
        let fine = overdue_fine(due(), due() + Duration::days(3) + Duration::hours(1), rate());
        assert_eq!(fine, Decimal::new(200, 2));
    }

    #[test]
    fn renewal_extends_from_current_due_date() {
        let terms = LoanTerms {
            loan_days: 14,
            renewal_days: 14,
            fine_per_day: rate(),
        };
        let borrowed = due() - Duration::days(14);
        assert_eq!(terms.due_date(borrowed), due());
        assert_eq!(terms.renewed_due_date(due()), due() + Duration::days(14));
    }
}
