//! Book catalog and physical copies

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use super::enums::CopyStatus;

/// Catalog entry with its live availability
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Book {
    pub id: i32,
    pub title: String,
    pub author: String,
    pub isbn: Option<String>,
    pub publisher: Option<String>,
    pub published_year: Option<i32>,
    pub genre: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub call_number: Option<String>,
    pub cover_image_url: Option<String>,
    pub status: String,
    /// Denormalized number of copies ever added
    pub total_copies: i32,
    /// Copies currently in status `available`
    pub available_copies: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct BookCopy {
    pub id: i32,
    pub book_id: i32,
    pub copy_number: i32,
    pub barcode: String,
    pub condition: String,
    pub status: CopyStatus,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BookDetails {
    #[serde(flatten)]
    pub book: Book,
    pub copies: Vec<BookCopy>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Genre {
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
}

/// Catalog search filters
#[derive(Debug, Default, Clone, Deserialize, IntoParams)]
pub struct BookQuery {
    /// Substring of title, author or ISBN
    pub search: Option<String>,
    pub genre: Option<String>,
    pub status: Option<String>,
    /// Only titles with at least one available copy
    pub available: Option<bool>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateBook {
    #[validate(length(min = 1, message = "Title and author are required"))]
    pub title: String,
    #[validate(length(min = 1, message = "Title and author are required"))]
    pub author: String,
    pub isbn: Option<String>,
    pub publisher: Option<String>,
    #[serde(alias = "publishedYear")]
    pub published_year: Option<i32>,
    pub genre: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    #[serde(alias = "callNumber")]
    pub call_number: Option<String>,
    #[serde(alias = "coverImageUrl")]
    pub cover_image_url: Option<String>,
    /// Number of copies to create (default 1)
    #[serde(alias = "totalCopies")]
    #[validate(range(min = 1, max = 500, message = "Copies must be between 1 and 500"))]
    pub copies: Option<i32>,
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateBook {
    #[validate(length(min = 1, message = "Title cannot be empty"))]
    pub title: Option<String>,
    #[validate(length(min = 1, message = "Author cannot be empty"))]
    pub author: Option<String>,
    pub isbn: Option<String>,
    pub publisher: Option<String>,
    #[serde(alias = "publishedYear")]
    pub published_year: Option<i32>,
    pub genre: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    #[serde(alias = "callNumber")]
    pub call_number: Option<String>,
    #[serde(alias = "coverImageUrl")]
    pub cover_image_url: Option<String>,
    pub status: Option<String>,
}

impl UpdateBook {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.author.is_none()
            && self.isbn.is_none()
            && self.publisher.is_none()
            && self.published_year.is_none()
            && self.genre.is_none()
            && self.description.is_none()
            && self.location.is_none()
            && self.call_number.is_none()
            && self.cover_image_url.is_none()
            && self.status.is_none()
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct AddCopies {
    #[validate(range(min = 1, max = 500, message = "Count must be between 1 and 500"))]
    pub count: i32,
    pub condition: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct SetCopyStatus {
    pub status: CopyStatus,
    pub condition: Option<String>,
}

/// Barcode for the `copy_number`-th copy of a title
pub fn copy_barcode(book_id: i32, isbn: Option<&str>, copy_number: i32) -> String {
    match isbn.filter(|s| !s.trim().is_empty()) {
        Some(isbn) => format!("{}-{:03}", isbn.trim(), copy_number),
        None => format!("LIB{}-{:03}", book_id, copy_number),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn barcode_prefers_isbn() {
        assert_eq!(copy_barcode(3, Some("9780451524935"), 4), "9780451524935-004");
    }

    #[test]
    fn barcode_without_isbn_is_scoped_to_book() {
        assert_eq!(copy_barcode(12, None, 1), "LIB12-001");
        assert_eq!(copy_barcode(12, Some("  "), 10), "LIB12-010");
    }

    #[test]
    fn empty_update_is_detected() {
        assert!(UpdateBook::default().is_empty());
        let update = UpdateBook {
            location: Some("Shelf B".into()),
            ..Default::default()
        };
        assert!(!update.is_empty());
    }
}
