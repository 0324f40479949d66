//! Reservations on fully-borrowed titles

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use super::enums::ReservationStatus;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Reservation {
    pub id: i32,
    /// Library user
    pub user_id: i32,
    pub book_id: i32,
    pub reserved_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub status: ReservationStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct ReservationDetails {
    pub id: i32,
    pub user_id: i32,
    pub book_id: i32,
    pub reserved_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub status: ReservationStatus,
    pub title: String,
    pub author: String,
    pub username: String,
    pub email: String,
    pub library_card_number: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ReserveRequest {
    #[serde(alias = "bookId")]
    pub book_id: i32,
}
