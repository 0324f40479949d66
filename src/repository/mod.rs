//! Repository layer for database operations

pub mod attendance;
pub mod books;
pub mod borrowings;
pub mod email;
pub mod enrollments;
pub mod reservations;
pub mod students;
pub mod subjects;
pub mod users;

use sqlx::{Pool, Postgres};

/// Main repository struct holding database connection pool
#[derive(Clone)]
pub struct Repository {
    pub pool: Pool<Postgres>,
    pub users: users::UsersRepository,
    pub students: students::StudentsRepository,
    pub subjects: subjects::SubjectsRepository,
    pub enrollments: enrollments::EnrollmentsRepository,
    pub attendance: attendance::AttendanceRepository,
    pub books: books::BooksRepository,
    pub borrowings: borrowings::BorrowingsRepository,
    pub reservations: reservations::ReservationsRepository,
    pub email: email::EmailRepository,
}

impl Repository {
    /// Create a new repository with the given database pool
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self {
            users: users::UsersRepository::new(pool.clone()),
            students: students::StudentsRepository::new(pool.clone()),
            subjects: subjects::SubjectsRepository::new(pool.clone()),
            enrollments: enrollments::EnrollmentsRepository::new(pool.clone()),
            attendance: attendance::AttendanceRepository::new(pool.clone()),
            books: books::BooksRepository::new(pool.clone()),
            borrowings: borrowings::BorrowingsRepository::new(pool.clone()),
            reservations: reservations::ReservationsRepository::new(pool.clone()),
            email: email::EmailRepository::new(pool.clone()),
            pool,
        }
    }
}
