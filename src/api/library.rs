//! Library catalog, circulation and reservation endpoints

use axum::extract::{Path, Query, State};

use crate::{
    models::{
        book::{AddCopies, Book, BookCopy, BookDetails, BookQuery, CreateBook, Genre, SetCopyStatus, UpdateBook},
        borrowing::{
            BorrowRequest, Borrowing, BorrowingDetails, BorrowingQuery, BorrowingSearch, IssueRequest,
            LibraryStats, ReturnReceipt, ReturnRequest,
        },
        reservation::{Reservation, ReservationDetails, ReserveRequest},
        user::Action,
        Page,
    },
    AppState,
};

use super::{done, ApiCreated, ApiResponse, ApiResult, AuthenticatedUser, ValidatedJson};

// ---------------------------------------------------------------------------
// Public catalog
// ---------------------------------------------------------------------------

/// Search the catalog; no authentication required
#[utoipa::path(
    get,
    path = "/library/books",
    tag = "library",
    params(BookQuery),
    responses(
        (status = 200, description = "One page of books", body = BookPage)
    )
)]
pub async fn search_books(
    State(state): State<AppState>,
    Query(query): Query<BookQuery>,
) -> ApiResult<Page<Book>> {
    Ok(ApiResponse::ok(state.services.library.search_books(&query).await?))
}

#[utoipa::path(
    get,
    path = "/library/books/{id}",
    tag = "library",
    params(("id" = i32, Path, description = "Book ID")),
    responses(
        (status = 200, description = "Book with its copies", body = BookDetails),
        (status = 404, description = "Book not found")
    )
)]
pub async fn get_book(State(state): State<AppState>, Path(id): Path<i32>) -> ApiResult<BookDetails> {
    Ok(ApiResponse::ok(state.services.library.get_book(id).await?))
}

#[utoipa::path(
    get,
    path = "/library/genres",
    tag = "library",
    responses(
        (status = 200, description = "All genres", body = Vec<Genre>)
    )
)]
pub async fn list_genres(State(state): State<AppState>) -> ApiResult<Vec<Genre>> {
    Ok(ApiResponse::ok(state.services.library.genres().await?))
}

// ---------------------------------------------------------------------------
// Self-service
// ---------------------------------------------------------------------------

#[utoipa::path(
    post,
    path = "/library/borrow",
    tag = "library",
    security(("bearer_auth" = [])),
    request_body = BorrowRequest,
    responses(
        (status = 201, description = "Book borrowed", body = Borrowing),
        (status = 400, description = "No copies available or borrow limit reached"),
        (status = 404, description = "Book or library account not found")
    )
)]
pub async fn borrow(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    ValidatedJson(request): ValidatedJson<BorrowRequest>,
) -> ApiCreated<Borrowing> {
    claims.authorize(Action::UseLibrary)?;
    let borrowing = state.services.library.borrow(claims.user_id, request.book_id).await?;
    Ok(ApiResponse::created("Book borrowed successfully", borrowing))
}

/// Return one of the caller's own borrowings
#[utoipa::path(
    post,
    path = "/library/return",
    tag = "library",
    security(("bearer_auth" = [])),
    request_body = ReturnRequest,
    responses(
        (status = 200, description = "Book returned", body = ReturnReceipt),
        (status = 404, description = "Borrowing not found"),
        (status = 409, description = "Book already returned")
    )
)]
pub async fn return_book(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    ValidatedJson(request): ValidatedJson<ReturnRequest>,
) -> ApiResult<ReturnReceipt> {
    claims.authorize(Action::UseLibrary)?;
    let receipt = state
        .services
        .library
        .return_own(claims.user_id, request.borrowing_id)
        .await?;
    Ok(ApiResponse::with_message("Book returned successfully", receipt))
}

#[utoipa::path(
    get,
    path = "/library/borrowings",
    tag = "library",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "The caller's borrowings", body = Vec<BorrowingDetails>)
    )
)]
pub async fn my_borrowings(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> ApiResult<Vec<BorrowingDetails>> {
    claims.authorize(Action::UseLibrary)?;
    Ok(ApiResponse::ok(state.services.library.borrowings_of(claims.user_id).await?))
}

#[utoipa::path(
    get,
    path = "/library/reservations",
    tag = "library",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "The caller's reservations", body = Vec<ReservationDetails>)
    )
)]
pub async fn my_reservations(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> ApiResult<Vec<ReservationDetails>> {
    claims.authorize(Action::UseLibrary)?;
    Ok(ApiResponse::ok(state.services.library.reservations_of(claims.user_id).await?))
}

/// Reserve a title that currently has no available copy
#[utoipa::path(
    post,
    path = "/library/reservations",
    tag = "library",
    security(("bearer_auth" = [])),
    request_body = ReserveRequest,
    responses(
        (status = 201, description = "Book reserved", body = Reservation),
        (status = 404, description = "Book not found"),
        (status = 409, description = "Copies are available or already reserved")
    )
)]
pub async fn reserve(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    ValidatedJson(request): ValidatedJson<ReserveRequest>,
) -> ApiCreated<Reservation> {
    claims.authorize(Action::UseLibrary)?;
    let reservation = state.services.library.reserve(claims.user_id, request.book_id).await?;
    Ok(ApiResponse::created("Book reserved successfully", reservation))
}

#[utoipa::path(
    delete,
    path = "/library/reservations/{id}",
    tag = "library",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Reservation ID")),
    responses(
        (status = 200, description = "Reservation cancelled", body = Reservation),
        (status = 404, description = "Active reservation not found")
    )
)]
pub async fn cancel_reservation(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> ApiResult<Reservation> {
    claims.authorize(Action::UseLibrary)?;
    let reservation = state.services.library.cancel_reservation(claims.user_id, id).await?;
    Ok(ApiResponse::with_message("Reservation cancelled", reservation))
}

// ---------------------------------------------------------------------------
// Catalog administration
// ---------------------------------------------------------------------------

#[utoipa::path(
    post,
    path = "/library/admin/books",
    tag = "library-admin",
    security(("bearer_auth" = [])),
    request_body = CreateBook,
    responses(
        (status = 201, description = "Book created with its copies", body = Book),
        (status = 409, description = "ISBN already exists")
    )
)]
pub async fn create_book(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    ValidatedJson(book): ValidatedJson<CreateBook>,
) -> ApiCreated<Book> {
    claims.authorize(Action::ManageLibrary)?;
    let book = state.services.library.create_book(book).await?;
    Ok(ApiResponse::created("Book created successfully", book))
}

#[utoipa::path(
    put,
    path = "/library/admin/books/{id}",
    tag = "library-admin",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Book ID")),
    request_body = UpdateBook,
    responses(
        (status = 200, description = "Book updated", body = Book),
        (status = 404, description = "Book not found")
    )
)]
pub async fn update_book(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    ValidatedJson(update): ValidatedJson<UpdateBook>,
) -> ApiResult<Book> {
    claims.authorize(Action::ManageLibrary)?;
    let book = state.services.library.update_book(id, update).await?;
    Ok(ApiResponse::with_message("Book updated successfully", book))
}

#[utoipa::path(
    delete,
    path = "/library/admin/books/{id}",
    tag = "library-admin",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Book ID")),
    responses(
        (status = 200, description = "Book deleted"),
        (status = 404, description = "Book not found"),
        (status = 409, description = "Copies are still borrowed")
    )
)]
pub async fn delete_book(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> ApiResult<()> {
    claims.authorize(Action::ManageLibrary)?;
    state.services.library.delete_book(id).await?;
    Ok(done("Book deleted successfully"))
}

#[utoipa::path(
    post,
    path = "/library/admin/books/{id}/copies",
    tag = "library-admin",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Book ID")),
    request_body = AddCopies,
    responses(
        (status = 201, description = "Copies added", body = Vec<BookCopy>),
        (status = 404, description = "Book not found")
    )
)]
pub async fn add_copies(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    ValidatedJson(request): ValidatedJson<AddCopies>,
) -> ApiCreated<Vec<BookCopy>> {
    claims.authorize(Action::ManageLibrary)?;
    let copies = state
        .services
        .library
        .add_copies(id, request.count, request.condition.as_deref())
        .await?;
    let message = format!("{} copies added", copies.len());
    Ok(ApiResponse::created(message, copies))
}

/// Move a copy between available, maintenance and lost
#[utoipa::path(
    put,
    path = "/library/admin/copies/{id}/status",
    tag = "library-admin",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Copy ID")),
    request_body = SetCopyStatus,
    responses(
        (status = 200, description = "Copy updated", body = BookCopy),
        (status = 400, description = "Borrowed status cannot be set by hand"),
        (status = 409, description = "Copy is currently borrowed")
    )
)]
pub async fn set_copy_status(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    ValidatedJson(request): ValidatedJson<SetCopyStatus>,
) -> ApiResult<BookCopy> {
    claims.authorize(Action::ManageLibrary)?;
    let copy = state.services.library.set_copy_status(id, request).await?;
    Ok(ApiResponse::with_message("Copy status updated", copy))
}

// ---------------------------------------------------------------------------
// Circulation desk
// ---------------------------------------------------------------------------

/// Check a book out on behalf of another user
#[utoipa::path(
    post,
    path = "/library/admin/issue",
    tag = "library-admin",
    security(("bearer_auth" = [])),
    request_body = IssueRequest,
    responses(
        (status = 201, description = "Book issued", body = Borrowing),
        (status = 400, description = "No copies available or borrow limit reached"),
        (status = 404, description = "Book or library account not found")
    )
)]
pub async fn issue(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    ValidatedJson(request): ValidatedJson<IssueRequest>,
) -> ApiCreated<Borrowing> {
    claims.authorize(Action::ManageLibrary)?;
    let borrowing = state.services.library.borrow(request.user_id, request.book_id).await?;
    Ok(ApiResponse::created("Book issued successfully", borrowing))
}

#[utoipa::path(
    post,
    path = "/library/admin/return",
    tag = "library-admin",
    security(("bearer_auth" = [])),
    request_body = ReturnRequest,
    responses(
        (status = 200, description = "Book returned", body = ReturnReceipt),
        (status = 404, description = "Borrowing not found"),
        (status = 409, description = "Book already returned")
    )
)]
pub async fn admin_return(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    ValidatedJson(request): ValidatedJson<ReturnRequest>,
) -> ApiResult<ReturnReceipt> {
    claims.authorize(Action::ManageLibrary)?;
    let receipt = state.services.library.return_any(request.borrowing_id).await?;
    Ok(ApiResponse::with_message("Book returned successfully", receipt))
}

#[utoipa::path(
    post,
    path = "/library/admin/borrowings/{id}/renew",
    tag = "library-admin",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Borrowing ID")),
    responses(
        (status = 200, description = "Borrowing renewed", body = Borrowing),
        (status = 404, description = "Borrowing not found"),
        (status = 409, description = "Borrowing is not active")
    )
)]
pub async fn renew(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> ApiResult<Borrowing> {
    claims.authorize(Action::ManageLibrary)?;
    let borrowing = state.services.library.renew(id).await?;
    Ok(ApiResponse::with_message("Borrowing renewed successfully", borrowing))
}

#[utoipa::path(
    get,
    path = "/library/admin/borrowings",
    tag = "library-admin",
    security(("bearer_auth" = [])),
    params(BorrowingQuery),
    responses(
        (status = 200, description = "One page of borrowings", body = BorrowingPage)
    )
)]
pub async fn list_borrowings(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<BorrowingQuery>,
) -> ApiResult<Page<BorrowingDetails>> {
    claims.authorize(Action::ManageLibrary)?;
    Ok(ApiResponse::ok(state.services.library.list_borrowings(&query).await?))
}

#[utoipa::path(
    get,
    path = "/library/admin/borrowings/search",
    tag = "library-admin",
    security(("bearer_auth" = [])),
    params(BorrowingSearch),
    responses(
        (status = 200, description = "Matching borrowings", body = Vec<BorrowingDetails>),
        (status = 400, description = "Search term is required")
    )
)]
pub async fn search_borrowings(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(search): Query<BorrowingSearch>,
) -> ApiResult<Vec<BorrowingDetails>> {
    claims.authorize(Action::ManageLibrary)?;
    Ok(ApiResponse::ok(state.services.library.search_borrowings(&search.q).await?))
}

/// Borrowing history of one user
#[utoipa::path(
    get,
    path = "/library/admin/borrowings/{id}",
    tag = "library-admin",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "User ID")),
    responses(
        (status = 200, description = "The user's borrowings", body = Vec<BorrowingDetails>)
    )
)]
pub async fn user_borrowings(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> ApiResult<Vec<BorrowingDetails>> {
    claims.authorize(Action::ManageLibrary)?;
    Ok(ApiResponse::ok(state.services.library.borrowings_of(id).await?))
}

#[utoipa::path(
    get,
    path = "/library/admin/stats",
    tag = "library-admin",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Circulation counters", body = LibraryStats)
    )
)]
pub async fn stats(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> ApiResult<LibraryStats> {
    claims.authorize(Action::ManageLibrary)?;
    Ok(ApiResponse::ok(state.services.library.stats().await?))
}

#[utoipa::path(
    get,
    path = "/library/admin/reservations",
    tag = "library-admin",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "All reservations", body = Vec<ReservationDetails>)
    )
)]
pub async fn all_reservations(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> ApiResult<Vec<ReservationDetails>> {
    claims.authorize(Action::ManageLibrary)?;
    Ok(ApiResponse::ok(state.services.library.all_reservations().await?))
}

/// Mark a reservation ready for pickup and notify the patron
#[utoipa::path(
    post,
    path = "/library/admin/reservations/{id}/fulfill",
    tag = "library-admin",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Reservation ID")),
    responses(
        (status = 200, description = "Reservation fulfilled", body = ReservationDetails),
        (status = 404, description = "Active reservation not found")
    )
)]
pub async fn fulfill_reservation(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> ApiResult<ReservationDetails> {
    claims.authorize(Action::ManageLibrary)?;
    let reservation = state
        .services
        .library
        .fulfill_reservation(id, claims.user_id)
        .await?;
    Ok(ApiResponse::with_message("Reservation fulfilled and user notified", reservation))
}
