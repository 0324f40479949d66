//! Reservations repository

use chrono::{DateTime, Duration, Utc};
use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::{
        enums::ReservationStatus,
        reservation::{Reservation, ReservationDetails},
        user::LibraryUser,
    },
};

const DETAILS_SELECT: &str = r#"
    SELECT r.id, r.user_id, r.book_id, r.reserved_at, r.expires_at, r.status,
           bk.title, bk.author, u.username, u.email, lu.library_card_number
    FROM reservations r
    JOIN books bk ON bk.id = r.book_id
    JOIN library_users lu ON lu.id = r.user_id
    JOIN users u ON u.id = lu.user_id
"#;

const ALREADY_RESERVED: &str = "You already have an active reservation for this book";

#[derive(Clone)]
pub struct ReservationsRepository {
    pool: Pool<Postgres>,
}

impl ReservationsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Place a hold on a title that has no available copy.
    /// The book row is locked so the availability check and the insert
    /// cannot interleave with another hold on the same title.
    pub async fn reserve(
        &self,
        user_id: i32,
        book_id: i32,
        hold_days: i64,
        now: DateTime<Utc>,
    ) -> AppResult<Reservation> {
        let mut tx = self.pool.begin().await?;

        let account = sqlx::query_as::<_, LibraryUser>("SELECT * FROM library_users WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound("Library user not found".to_string()))?;

        sqlx::query_scalar::<_, i32>("SELECT id FROM books WHERE id = $1 FOR UPDATE")
            .bind(book_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound("Book not found".to_string()))?;

        let available: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM book_copies WHERE book_id = $1 AND status = 'available'",
        )
        .bind(book_id)
        .fetch_one(&mut *tx)
        .await?;

        if available > 0 {
            return Err(AppError::Conflict(
                "Book is currently available and cannot be reserved".to_string(),
            ));
        }

        let already: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM reservations
                WHERE user_id = $1 AND book_id = $2 AND status = 'active'
            )
            "#,
        )
        .bind(account.id)
        .bind(book_id)
        .fetch_one(&mut *tx)
        .await?;

        if already {
            return Err(AppError::Conflict(ALREADY_RESERVED.to_string()));
        }

        let reservation = sqlx::query_as::<_, Reservation>(
            r#"
            INSERT INTO reservations (user_id, book_id, reserved_at, expires_at, status)
            VALUES ($1, $2, $3, $4, 'active')
            RETURNING *
            "#,
        )
        .bind(account.id)
        .bind(book_id)
        .bind(now)
        .bind(now + Duration::days(hold_days))
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| AppError::on_unique_violation(e, ALREADY_RESERVED))?;

        tx.commit().await?;
        Ok(reservation)
    }

    /// Mark an active hold ready for pickup, restarting its expiry clock
    pub async fn fulfill(&self, reservation_id: i32, pickup_days: i64, now: DateTime<Utc>) -> AppResult<Reservation> {
        sqlx::query_as::<_, Reservation>(
            r#"
            UPDATE reservations
            SET status = 'fulfilled', expires_at = $2
            WHERE id = $1 AND status = 'active'
            RETURNING *
            "#,
        )
        .bind(reservation_id)
        .bind(now + Duration::days(pickup_days))
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Active reservation not found".to_string()))
    }

    /// Cancel one of the caller's own active holds
    pub async fn cancel(&self, reservation_id: i32, user_id: i32) -> AppResult<Reservation> {
        sqlx::query_as::<_, Reservation>(
            r#"
            UPDATE reservations r
            SET status = 'cancelled'
            FROM library_users lu
            WHERE r.id = $1 AND r.user_id = lu.id AND lu.user_id = $2 AND r.status = 'active'
            RETURNING r.*
            "#,
        )
        .bind(reservation_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Active reservation not found".to_string()))
    }

    pub async fn get_details(&self, reservation_id: i32) -> AppResult<ReservationDetails> {
        let sql = format!("{DETAILS_SELECT} WHERE r.id = $1");
        sqlx::query_as::<_, ReservationDetails>(&sql)
            .bind(reservation_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("Reservation not found".to_string()))
    }

    pub async fn for_user(&self, user_id: i32) -> AppResult<Vec<ReservationDetails>> {
        let sql = format!("{DETAILS_SELECT} WHERE lu.user_id = $1 ORDER BY r.reserved_at DESC");
        let rows = sqlx::query_as::<_, ReservationDetails>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    pub async fn list_all(&self) -> AppResult<Vec<ReservationDetails>> {
        let sql = format!("{DETAILS_SELECT} ORDER BY r.status = 'active' DESC, r.reserved_at");
        let rows = sqlx::query_as::<_, ReservationDetails>(&sql)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    /// Expire holds whose window has passed, both waiting ones and ready
    /// ones never collected; returns how many
    pub async fn expire_stale(&self, now: DateTime<Utc>) -> AppResult<u64> {
        let result = sqlx::query(
            "UPDATE reservations SET status = 'expired' WHERE status = ANY($1) AND expires_at < $2",
        )
        .bind(ReservationStatus::lapsing())
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}
