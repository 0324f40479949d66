//! Catalog repository: books, copies and genres

use sqlx::{Pool, Postgres, QueryBuilder};

use crate::{
    error::{AppError, AppResult},
    models::{
        book::{copy_barcode, Book, BookCopy, BookQuery, CreateBook, Genre, UpdateBook},
        enums::CopyStatus,
        Page, PageRequest,
    },
};

const BOOK_SELECT: &str = r#"
    SELECT b.id, b.title, b.author, b.isbn, b.publisher, b.published_year, b.genre,
           b.description, b.location, b.call_number, b.cover_image_url, b.status,
           b.total_copies,
           (SELECT COUNT(*) FROM book_copies c
             WHERE c.book_id = b.id AND c.status = 'available') AS available_copies,
           b.created_at, b.updated_at
    FROM books b
"#;

const HAS_AVAILABLE_COPY: &str =
    "EXISTS (SELECT 1 FROM book_copies c WHERE c.book_id = b.id AND c.status = 'available')";

/// `%term%` with LIKE metacharacters escaped
pub(crate) fn like_pattern(term: &str) -> String {
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

/// Append the catalog filters as bound predicates. Used for both the page
/// query and the count query so the two always agree.
pub(crate) fn push_book_filters(qb: &mut QueryBuilder<'_, Postgres>, query: &BookQuery) {
    qb.push(" WHERE TRUE");

    if let Some(search) = query.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        let pattern = like_pattern(search);
        qb.push(" AND (b.title ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR b.author ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR b.isbn ILIKE ")
            .push_bind(pattern)
            .push(")");
    }

    if let Some(genre) = query.genre.as_deref().filter(|s| !s.is_empty()) {
        qb.push(" AND b.genre = ").push_bind(genre.to_string());
    }

    if let Some(status) = query.status.as_deref().filter(|s| !s.is_empty()) {
        qb.push(" AND b.status = ").push_bind(status.to_string());
    }

    match query.available {
        Some(true) => {
            qb.push(" AND ").push(HAS_AVAILABLE_COPY);
        }
        Some(false) => {
            qb.push(" AND NOT ").push(HAS_AVAILABLE_COPY);
        }
        None => {}
    }
}

#[derive(Clone)]
pub struct BooksRepository {
    pool: Pool<Postgres>,
}

impl BooksRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Paginated catalog search; the count runs concurrently with the page
    pub async fn search(&self, query: &BookQuery) -> AppResult<Page<Book>> {
        let page = PageRequest::new(query.page, query.limit);

        let mut list_qb = QueryBuilder::<Postgres>::new(BOOK_SELECT);
        push_book_filters(&mut list_qb, query);
        list_qb
            .push(" ORDER BY b.title, b.id LIMIT ")
            .push_bind(page.limit)
            .push(" OFFSET ")
            .push_bind(page.offset());

        let mut count_qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM books b");
        push_book_filters(&mut count_qb, query);

        let (books, total) = tokio::try_join!(
            list_qb.build_query_as::<Book>().fetch_all(&self.pool),
            count_qb.build_query_scalar::<i64>().fetch_one(&self.pool),
        )?;

        Ok(Page::new(books, page, total))
    }

    pub async fn get_by_id(&self, id: i32) -> AppResult<Book> {
        let sql = format!("{BOOK_SELECT} WHERE b.id = $1");
        sqlx::query_as::<_, Book>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("Book not found".to_string()))
    }

    pub async fn copies(&self, book_id: i32) -> AppResult<Vec<BookCopy>> {
        let copies = sqlx::query_as::<_, BookCopy>(
            "SELECT * FROM book_copies WHERE book_id = $1 ORDER BY copy_number",
        )
        .bind(book_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(copies)
    }

    pub async fn genres(&self) -> AppResult<Vec<Genre>> {
        let genres = sqlx::query_as::<_, Genre>("SELECT * FROM genres ORDER BY name")
            .fetch_all(&self.pool)
            .await?;
        Ok(genres)
    }

    /// Insert a title together with its initial copies
    pub async fn create(&self, book: &CreateBook) -> AppResult<Book> {
        let copies = book.copies.unwrap_or(1);
        let mut tx = self.pool.begin().await?;

        let book_id: i32 = sqlx::query_scalar(
            r#"
            INSERT INTO books (title, author, isbn, publisher, published_year, genre,
                               description, location, call_number, cover_image_url, total_copies)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING id
            "#,
        )
        .bind(&book.title)
        .bind(&book.author)
        .bind(book.isbn.as_deref())
        .bind(book.publisher.as_deref())
        .bind(book.published_year)
        .bind(book.genre.as_deref())
        .bind(book.description.as_deref())
        .bind(book.location.as_deref())
        .bind(book.call_number.as_deref())
        .bind(book.cover_image_url.as_deref())
        .bind(copies)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| AppError::on_unique_violation(e, "A book with this ISBN already exists"))?;

        insert_copies(&mut tx, book_id, book.isbn.as_deref(), 1, copies, "good").await?;

        tx.commit().await?;
        self.get_by_id(book_id).await
    }

    pub async fn update(&self, id: i32, update: &UpdateBook) -> AppResult<Book> {
        let mut qb = QueryBuilder::<Postgres>::new("UPDATE books SET updated_at = NOW()");

        if let Some(title) = &update.title {
            qb.push(", title = ").push_bind(title.clone());
        }
        if let Some(author) = &update.author {
            qb.push(", author = ").push_bind(author.clone());
        }
        if let Some(isbn) = &update.isbn {
            qb.push(", isbn = ").push_bind(isbn.clone());
        }
        if let Some(publisher) = &update.publisher {
            qb.push(", publisher = ").push_bind(publisher.clone());
        }
        if let Some(year) = update.published_year {
            qb.push(", published_year = ").push_bind(year);
        }
        if let Some(genre) = &update.genre {
            qb.push(", genre = ").push_bind(genre.clone());
        }
        if let Some(description) = &update.description {
            qb.push(", description = ").push_bind(description.clone());
        }
        if let Some(location) = &update.location {
            qb.push(", location = ").push_bind(location.clone());
        }
        if let Some(call_number) = &update.call_number {
            qb.push(", call_number = ").push_bind(call_number.clone());
        }
        if let Some(url) = &update.cover_image_url {
            qb.push(", cover_image_url = ").push_bind(url.clone());
        }
        if let Some(status) = &update.status {
            qb.push(", status = ").push_bind(status.clone());
        }

        qb.push(" WHERE id = ").push_bind(id).push(" RETURNING id");

        qb.build_query_scalar::<i32>()
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::on_unique_violation(e, "A book with this ISBN already exists"))?
            .ok_or_else(|| AppError::NotFound("Book not found".to_string()))?;

        self.get_by_id(id).await
    }

    /// Delete a title and its copies, refused while any copy is out
    pub async fn delete(&self, id: i32) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query_scalar::<_, i32>("SELECT id FROM books WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound("Book not found".to_string()))?;

        let on_loan: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM borrowings br
                JOIN book_copies c ON c.id = br.book_copy_id
                WHERE c.book_id = $1 AND br.status = 'borrowed'
            )
            "#,
        )
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        if on_loan {
            return Err(AppError::Conflict(
                "Cannot delete book with active borrowings".to_string(),
            ));
        }

        sqlx::query("DELETE FROM books WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    pub async fn add_copies(&self, book_id: i32, count: i32, condition: &str) -> AppResult<Vec<BookCopy>> {
        let mut tx = self.pool.begin().await?;

        let isbn: Option<String> = sqlx::query_scalar::<_, Option<String>>(
            "SELECT isbn FROM books WHERE id = $1 FOR UPDATE",
        )
        .bind(book_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Book not found".to_string()))?;

        let last_copy: i32 = sqlx::query_scalar(
            "SELECT COALESCE(MAX(copy_number), 0) FROM book_copies WHERE book_id = $1",
        )
        .bind(book_id)
        .fetch_one(&mut *tx)
        .await?;

        let copies = insert_copies(&mut tx, book_id, isbn.as_deref(), last_copy + 1, count, condition).await?;

        sqlx::query("UPDATE books SET total_copies = total_copies + $2, updated_at = NOW() WHERE id = $1")
            .bind(book_id)
            .bind(count)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(copies)
    }

    /// Move a copy in or out of circulation. `borrowed` is owned by the
    /// checkout and return workflows and cannot be set or cleared here.
    pub async fn set_copy_status(
        &self,
        copy_id: i32,
        status: CopyStatus,
        condition: Option<&str>,
    ) -> AppResult<BookCopy> {
        if status == CopyStatus::Borrowed {
            return Err(AppError::Validation(
                "Copies are marked borrowed only through checkout".to_string(),
            ));
        }

        let mut tx = self.pool.begin().await?;

        let current: CopyStatus = sqlx::query_scalar("SELECT status FROM book_copies WHERE id = $1 FOR UPDATE")
            .bind(copy_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound("Book copy not found".to_string()))?;

        if current == CopyStatus::Borrowed {
            return Err(AppError::Conflict(
                "Copy is currently borrowed; return it first".to_string(),
            ));
        }

        let copy = sqlx::query_as::<_, BookCopy>(
            r#"
            UPDATE book_copies
            SET status = $2, condition = COALESCE($3, condition)
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(copy_id)
        .bind(status)
        .bind(condition)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(copy)
    }
}

async fn insert_copies(
    tx: &mut sqlx::Transaction<'_, Postgres>,
    book_id: i32,
    isbn: Option<&str>,
    first_number: i32,
    count: i32,
    condition: &str,
) -> AppResult<Vec<BookCopy>> {
    let mut copies = Vec::with_capacity(count.max(0) as usize);
    for copy_number in first_number..first_number + count {
        let copy = sqlx::query_as::<_, BookCopy>(
            r#"
            INSERT INTO book_copies (book_id, copy_number, barcode, condition, status)
            VALUES ($1, $2, $3, $4, 'available')
            RETURNING *
            "#,
        )
        .bind(book_id)
        .bind(copy_number)
        .bind(copy_barcode(book_id, isbn, copy_number))
        .bind(condition)
        .fetch_one(&mut **tx)
        .await
        .map_err(|e| AppError::on_unique_violation(e, "Copy barcode already in use"))?;
        copies.push(copy);
    }
    Ok(copies)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filters_sql(query: &BookQuery) -> String {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM books b");
        push_book_filters(&mut qb, query);
        qb.sql().to_string()
    }

    #[test]
    fn no_filters_yields_trivial_predicate() {
        assert_eq!(filters_sql(&BookQuery::default()), "SELECT COUNT(*) FROM books b WHERE TRUE");
    }

    #[test]
    fn search_binds_one_placeholder_per_column() {
        let sql = filters_sql(&BookQuery {
            search: Some("orwell".into()),
            genre: Some("Fiction".into()),
            ..Default::default()
        });
        assert!(sql.contains("b.title ILIKE $1"));
        assert!(sql.contains("b.author ILIKE $2"));
        assert!(sql.contains("b.isbn ILIKE $3"));
        assert!(sql.contains("b.genre = $4"));
        assert!(!sql.contains("orwell"));
    }

    #[test]
    fn availability_filter_is_a_subquery_not_a_bind() {
        let sql = filters_sql(&BookQuery {
            available: Some(true),
            ..Default::default()
        });
        assert!(sql.ends_with(HAS_AVAILABLE_COPY));
        assert!(!sql.contains('$'));

        let sql = filters_sql(&BookQuery {
            available: Some(false),
            ..Default::default()
        });
        assert!(sql.contains("AND NOT EXISTS"));
    }

    #[test]
    fn blank_search_is_ignored() {
        let sql = filters_sql(&BookQuery {
            search: Some("   ".into()),
            ..Default::default()
        });
        assert!(!sql.contains("ILIKE"));
    }

    #[test]
    fn like_metacharacters_are_escaped() {
        assert_eq!(like_pattern("100%_done"), "%100\\%\\_done%");
    }
}
