//! Circulation repository: checkout, return, renewal and desk queries

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{Pool, Postgres, QueryBuilder};

use crate::{
    error::{AppError, AppResult},
    models::{
        borrowing::{
            overdue_days, overdue_fine, Borrowing, BorrowingDetails, BorrowingQuery, LibraryStats,
            LoanTerms, ReturnReceipt,
        },
        enums::BorrowingStatus,
        user::LibraryUser,
        Page, PageRequest,
    },
};

use super::books::like_pattern;

const DETAILS_SELECT: &str = r#"
    SELECT br.id, br.user_id, br.book_copy_id, br.borrowed_at, br.due_date, br.returned_at,
           br.status, br.fine_amount,
           c.barcode, c.book_id, bk.title, bk.author, bk.isbn,
           lu.library_card_number, u.username, u.email,
           (br.status = 'borrowed' AND br.due_date < NOW()) AS is_overdue
"#;

const DETAILS_FROM: &str = r#"
    FROM borrowings br
    JOIN book_copies c ON c.id = br.book_copy_id
    JOIN books bk ON bk.id = c.book_id
    JOIN library_users lu ON lu.id = br.user_id
    JOIN users u ON u.id = lu.user_id
"#;

fn push_borrowing_filters(qb: &mut QueryBuilder<'_, Postgres>, query: &BorrowingQuery) {
    qb.push(" WHERE TRUE");
    if let Some(status) = query.status {
        qb.push(" AND br.status = ").push_bind(status);
    }
    if let Some(user_id) = query.user_id {
        qb.push(" AND lu.user_id = ").push_bind(user_id);
    }
    match query.overdue {
        Some(true) => {
            qb.push(" AND br.status = 'borrowed' AND br.due_date < NOW()");
        }
        Some(false) => {
            qb.push(" AND NOT (br.status = 'borrowed' AND br.due_date < NOW())");
        }
        None => {}
    }
}

#[derive(Clone)]
pub struct BorrowingsRepository {
    pool: Pool<Postgres>,
}

impl BorrowingsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Check out one available copy of `book_id` to the library account of
    /// credentialed user `user_id`.
    ///
    /// The borrower's account row is locked for the limit check and the
    /// copy is claimed with `FOR UPDATE SKIP LOCKED`: when two requests race
    /// for the last copy, the loser sees no candidate and gets `Unavailable`.
    pub async fn checkout(
        &self,
        user_id: i32,
        book_id: i32,
        terms: &LoanTerms,
        now: DateTime<Utc>,
    ) -> AppResult<Borrowing> {
        let mut tx = self.pool.begin().await?;

        let account = sqlx::query_as::<_, LibraryUser>(
            "SELECT * FROM library_users WHERE user_id = $1 FOR UPDATE",
        )
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Library user not found".to_string()))?;

        let active: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM borrowings WHERE user_id = $1 AND status = 'borrowed'",
        )
        .bind(account.id)
        .fetch_one(&mut *tx)
        .await?;

        if active >= i64::from(account.max_borrow_limit) {
            return Err(AppError::LimitExceeded(format!(
                "Borrowing limit reached ({} books)",
                account.max_borrow_limit
            )));
        }

        let book_exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM books WHERE id = $1)")
            .bind(book_id)
            .fetch_one(&mut *tx)
            .await?;
        if !book_exists {
            return Err(AppError::NotFound("Book not found".to_string()));
        }

        let copy_id: i32 = sqlx::query_scalar(
            r#"
            SELECT id FROM book_copies
            WHERE book_id = $1 AND status = 'available'
            ORDER BY copy_number
            LIMIT 1
            FOR UPDATE SKIP LOCKED
            "#,
        )
        .bind(book_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::Unavailable("No copies available for this book".to_string()))?;

        sqlx::query("UPDATE book_copies SET status = 'borrowed' WHERE id = $1")
            .bind(copy_id)
            .execute(&mut *tx)
            .await?;

        let borrowing = sqlx::query_as::<_, Borrowing>(
            r#"
            INSERT INTO borrowings (user_id, book_copy_id, borrowed_at, due_date, status, fine_amount)
            VALUES ($1, $2, $3, $4, 'borrowed', 0)
            RETURNING *
            "#,
        )
        .bind(account.id)
        .bind(copy_id)
        .bind(now)
        .bind(terms.due_date(now))
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(borrowing)
    }

    /// Close a borrowing, free the copy and record any late fine.
    ///
    /// With `owner` set (self-service), a borrowing belonging to someone
    /// else is reported as not found.
    pub async fn check_in(
        &self,
        borrowing_id: i32,
        owner: Option<i32>,
        fine_per_day: Decimal,
        now: DateTime<Utc>,
    ) -> AppResult<ReturnReceipt> {
        let mut tx = self.pool.begin().await?;

        let borrowing = sqlx::query_as::<_, Borrowing>(
            "SELECT * FROM borrowings WHERE id = $1 FOR UPDATE",
        )
        .bind(borrowing_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Borrowing not found".to_string()))?;

        if let Some(user_id) = owner {
            let account_id: Option<i32> =
                sqlx::query_scalar("SELECT id FROM library_users WHERE user_id = $1")
                    .bind(user_id)
                    .fetch_optional(&mut *tx)
                    .await?;
            if account_id != Some(borrowing.user_id) {
                return Err(AppError::NotFound("Borrowing not found".to_string()));
            }
        }

        if borrowing.status == BorrowingStatus::Returned {
            return Err(AppError::Conflict("Book already returned".to_string()));
        }

        let days_overdue = overdue_days(borrowing.due_date, now);
        let fine = overdue_fine(borrowing.due_date, now, fine_per_day);

        let borrowing = sqlx::query_as::<_, Borrowing>(
            r#"
            UPDATE borrowings
            SET status = 'returned', returned_at = $2, fine_amount = $3
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(borrowing_id)
        .bind(now)
        .bind(fine)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("UPDATE book_copies SET status = 'available' WHERE id = $1")
            .bind(borrowing.book_copy_id)
            .execute(&mut *tx)
            .await?;

        if fine > Decimal::ZERO {
            sqlx::query("INSERT INTO fines (borrowing_id, amount, reason) VALUES ($1, $2, 'Late return')")
                .bind(borrowing_id)
                .bind(fine)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(ReturnReceipt {
            borrowing,
            fine_amount: fine,
            days_overdue,
        })
    }

    /// Push the due date forward; no cap on the number of renewals
    pub async fn renew(&self, borrowing_id: i32, terms: &LoanTerms) -> AppResult<Borrowing> {
        let mut tx = self.pool.begin().await?;

        let borrowing = sqlx::query_as::<_, Borrowing>(
            "SELECT * FROM borrowings WHERE id = $1 FOR UPDATE",
        )
        .bind(borrowing_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Borrowing not found".to_string()))?;

        if borrowing.status != BorrowingStatus::Borrowed {
            return Err(AppError::Conflict("Only active borrowings can be renewed".to_string()));
        }

        let borrowing = sqlx::query_as::<_, Borrowing>(
            "UPDATE borrowings SET due_date = $2 WHERE id = $1 RETURNING *",
        )
        .bind(borrowing_id)
        .bind(terms.renewed_due_date(borrowing.due_date))
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(borrowing)
    }

    pub async fn get_details(&self, borrowing_id: i32) -> AppResult<BorrowingDetails> {
        let sql = format!("{DETAILS_SELECT} {DETAILS_FROM} WHERE br.id = $1");
        sqlx::query_as::<_, BorrowingDetails>(&sql)
            .bind(borrowing_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("Borrowing not found".to_string()))
    }

    /// Every borrowing of a credentialed user, newest first
    pub async fn for_user(&self, user_id: i32) -> AppResult<Vec<BorrowingDetails>> {
        let sql = format!("{DETAILS_SELECT} {DETAILS_FROM} WHERE lu.user_id = $1 ORDER BY br.borrowed_at DESC");
        let rows = sqlx::query_as::<_, BorrowingDetails>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    pub async fn list(&self, query: &BorrowingQuery) -> AppResult<Page<BorrowingDetails>> {
        let page = PageRequest::new(query.page, query.limit);

        let mut list_qb = QueryBuilder::<Postgres>::new(DETAILS_SELECT);
        list_qb.push(DETAILS_FROM);
        push_borrowing_filters(&mut list_qb, query);
        list_qb
            .push(" ORDER BY br.borrowed_at DESC LIMIT ")
            .push_bind(page.limit)
            .push(" OFFSET ")
            .push_bind(page.offset());

        let mut count_qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*)");
        count_qb.push(DETAILS_FROM);
        push_borrowing_filters(&mut count_qb, query);

        let (rows, total) = tokio::try_join!(
            list_qb.build_query_as::<BorrowingDetails>().fetch_all(&self.pool),
            count_qb.build_query_scalar::<i64>().fetch_one(&self.pool),
        )?;

        Ok(Page::new(rows, page, total))
    }

    pub async fn search(&self, term: &str) -> AppResult<Vec<BorrowingDetails>> {
        let sql = format!(
            r#"{DETAILS_SELECT} {DETAILS_FROM}
            WHERE bk.title ILIKE $1 OR c.barcode ILIKE $1
               OR u.username ILIKE $1 OR lu.library_card_number ILIKE $1
            ORDER BY br.borrowed_at DESC
            LIMIT 50"#
        );
        let rows = sqlx::query_as::<_, BorrowingDetails>(&sql)
            .bind(like_pattern(term.trim()))
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    pub async fn stats(&self) -> AppResult<LibraryStats> {
        let stats = sqlx::query_as::<_, LibraryStats>(
            r#"
            SELECT
                (SELECT COUNT(*) FROM books) AS total_books,
                (SELECT COUNT(*) FROM book_copies) AS total_copies,
                (SELECT COUNT(*) FROM book_copies WHERE status = 'available') AS available_copies,
                (SELECT COUNT(*) FROM borrowings WHERE status = 'borrowed') AS active_borrowings,
                (SELECT COUNT(*) FROM borrowings
                  WHERE status = 'borrowed' AND due_date < NOW()) AS overdue_borrowings,
                (SELECT COUNT(*) FROM reservations WHERE status = 'active') AS active_reservations,
                (SELECT COALESCE(SUM(amount), 0) FROM fines WHERE NOT paid) AS unpaid_fines
            "#,
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn borrowing_filters_bind_values() {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*)");
        push_borrowing_filters(
            &mut qb,
            &BorrowingQuery {
                status: Some(BorrowingStatus::Borrowed),
                user_id: Some(4),
                overdue: Some(true),
                ..Default::default()
            },
        );
        let sql = qb.sql();
        assert!(sql.contains("br.status = $1"));
        assert!(sql.contains("lu.user_id = $2"));
        assert!(sql.contains("br.due_date < NOW()"));
    }
}
