//! Library catalog, circulation and reservations

use chrono::Utc;

use crate::{
    config::LibraryConfig,
    error::{AppError, AppResult},
    models::{
        book::{Book, BookCopy, BookDetails, BookQuery, CreateBook, Genre, SetCopyStatus, UpdateBook},
        borrowing::{Borrowing, BorrowingDetails, BorrowingQuery, LibraryStats, LoanTerms, ReturnReceipt},
        reservation::{Reservation, ReservationDetails},
        Page,
    },
    repository::Repository,
    services::notifications::{Notification, NotificationService},
};

const DEFAULT_CONDITION: &str = "good";

#[derive(Clone)]
pub struct LibraryService {
    repository: Repository,
    config: LibraryConfig,
    notifications: NotificationService,
}

impl LibraryService {
    pub fn new(repository: Repository, config: LibraryConfig, notifications: NotificationService) -> Self {
        Self {
            repository,
            config,
            notifications,
        }
    }

    pub fn loan_terms(&self) -> LoanTerms {
        LoanTerms {
            loan_days: self.config.loan_days,
            renewal_days: self.config.renewal_days,
            fine_per_day: self.config.fine_per_day(),
        }
    }

    // -----------------------------------------------------------------------
    // Catalog
    // -----------------------------------------------------------------------

    pub async fn search_books(&self, query: &BookQuery) -> AppResult<Page<Book>> {
        self.repository.books.search(query).await
    }

    pub async fn get_book(&self, id: i32) -> AppResult<BookDetails> {
        let (book, copies) = tokio::try_join!(
            self.repository.books.get_by_id(id),
            self.repository.books.copies(id),
        )?;
        Ok(BookDetails { book, copies })
    }

    pub async fn genres(&self) -> AppResult<Vec<Genre>> {
        self.repository.books.genres().await
    }

    pub async fn create_book(&self, book: CreateBook) -> AppResult<Book> {
        if book.copies.is_some_and(|n| n < 0) {
            return Err(AppError::Validation("Copies cannot be negative".to_string()));
        }
        let created = self.repository.books.create(&book).await?;
        tracing::info!("Added '{}' with {} copies", created.title, created.total_copies);
        Ok(created)
    }

    pub async fn update_book(&self, id: i32, update: UpdateBook) -> AppResult<Book> {
        if update.is_empty() {
            return Err(AppError::Validation("No fields to update".to_string()));
        }
        self.repository.books.update(id, &update).await
    }

    pub async fn delete_book(&self, id: i32) -> AppResult<()> {
        self.repository.books.delete(id).await?;
        tracing::info!("Deleted book {}", id);
        Ok(())
    }

    pub async fn add_copies(&self, book_id: i32, count: i32, condition: Option<&str>) -> AppResult<Vec<BookCopy>> {
        if count < 1 {
            return Err(AppError::Validation("Count must be at least 1".to_string()));
        }
        self.repository
            .books
            .add_copies(book_id, count, condition.unwrap_or(DEFAULT_CONDITION))
            .await
    }

    pub async fn set_copy_status(&self, copy_id: i32, request: SetCopyStatus) -> AppResult<BookCopy> {
        self.repository
            .books
            .set_copy_status(copy_id, request.status, request.condition.as_deref())
            .await
    }

    // -----------------------------------------------------------------------
    // Circulation
    // -----------------------------------------------------------------------

    /// Self-service checkout, also used by the desk to issue on someone's behalf
    pub async fn borrow(&self, user_id: i32, book_id: i32) -> AppResult<Borrowing> {
        let borrowing = self
            .repository
            .borrowings
            .checkout(user_id, book_id, &self.loan_terms(), Utc::now())
            .await?;
        tracing::info!(
            "Copy {} of book {} borrowed by user {}, due {}",
            borrowing.book_copy_id,
            book_id,
            user_id,
            borrowing.due_date
        );
        Ok(borrowing)
    }

    /// Return one of the caller's own borrowings
    pub async fn return_own(&self, user_id: i32, borrowing_id: i32) -> AppResult<ReturnReceipt> {
        self.check_in(borrowing_id, Some(user_id)).await
    }

    /// Desk return, without the ownership check
    pub async fn return_any(&self, borrowing_id: i32) -> AppResult<ReturnReceipt> {
        self.check_in(borrowing_id, None).await
    }

    async fn check_in(&self, borrowing_id: i32, owner: Option<i32>) -> AppResult<ReturnReceipt> {
        let receipt = self
            .repository
            .borrowings
            .check_in(borrowing_id, owner, self.config.fine_per_day(), Utc::now())
            .await?;
        if receipt.days_overdue > 0 {
            tracing::info!(
                "Borrowing {} returned {} day(s) late, fine {}",
                borrowing_id,
                receipt.days_overdue,
                receipt.fine_amount
            );
        } else {
            tracing::info!("Borrowing {} returned", borrowing_id);
        }
        Ok(receipt)
    }

    /// Extends from the current due date; there is no renewal cap
    pub async fn renew(&self, borrowing_id: i32) -> AppResult<Borrowing> {
        let borrowing = self
            .repository
            .borrowings
            .renew(borrowing_id, &self.loan_terms())
            .await?;
        tracing::info!("Borrowing {} renewed until {}", borrowing.id, borrowing.due_date);
        Ok(borrowing)
    }

    pub async fn borrowings_of(&self, user_id: i32) -> AppResult<Vec<BorrowingDetails>> {
        self.repository.borrowings.for_user(user_id).await
    }

    pub async fn list_borrowings(&self, query: &BorrowingQuery) -> AppResult<Page<BorrowingDetails>> {
        self.repository.borrowings.list(query).await
    }

    pub async fn search_borrowings(&self, term: &str) -> AppResult<Vec<BorrowingDetails>> {
        let term = term.trim();
        if term.is_empty() {
            return Err(AppError::Validation("Search term is required".to_string()));
        }
        self.repository.borrowings.search(term).await
    }

    pub async fn stats(&self) -> AppResult<LibraryStats> {
        self.repository.borrowings.stats().await
    }

    // -----------------------------------------------------------------------
    // Reservations
    // -----------------------------------------------------------------------

    pub async fn reserve(&self, user_id: i32, book_id: i32) -> AppResult<Reservation> {
        let reservation = self
            .repository
            .reservations
            .reserve(user_id, book_id, self.config.reservation_days, Utc::now())
            .await?;
        tracing::info!("User {} reserved book {}", user_id, book_id);
        Ok(reservation)
    }

    pub async fn cancel_reservation(&self, user_id: i32, reservation_id: i32) -> AppResult<Reservation> {
        self.repository.reservations.cancel(reservation_id, user_id).await
    }

    pub async fn reservations_of(&self, user_id: i32) -> AppResult<Vec<ReservationDetails>> {
        self.repository.reservations.for_user(user_id).await
    }

    pub async fn all_reservations(&self) -> AppResult<Vec<ReservationDetails>> {
        self.repository.reservations.list_all().await
    }

    /// Mark a hold ready for pickup and tell the patron. No copy changes
    /// hands here; the desk issues it separately.
    pub async fn fulfill_reservation(&self, reservation_id: i32, librarian_id: i32) -> AppResult<ReservationDetails> {
        self.repository
            .reservations
            .fulfill(reservation_id, self.config.pickup_grace_days, Utc::now())
            .await?;
        let details = self.repository.reservations.get_details(reservation_id).await?;

        let notification = Notification::ReservationReady {
            reservation_id: details.id,
            username: details.username.clone(),
            title: details.title.clone(),
            author: details.author.clone(),
            pickup_by: details.expires_at,
        };
        if let Err(e) = self
            .notifications
            .dispatch(&details.email, &notification, Some(librarian_id))
            .await
        {
            tracing::warn!("Failed to queue pickup notice for reservation {}: {}", reservation_id, e);
        }

        Ok(details)
    }

    pub async fn expire_reservations(&self) -> AppResult<u64> {
        let expired = self.repository.reservations.expire_stale(Utc::now()).await?;
        if expired > 0 {
            tracing::info!("Expired {} reservation(s)", expired);
        }
        Ok(expired)
    }
}
