//! OpenAPI documentation

use axum::Router;
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{auth, email, email_management, enrollments, health, library, scan, students, subjects};

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Campus API",
        version = "1.0.0",
        description = "QR attendance scanning and school library REST API"
    ),
    servers(
        (url = "/api", description = "API")
    ),
    modifiers(&BearerAuth),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Auth
        auth::login,
        auth::register,
        auth::profile,
        auth::change_password,
        auth::list_users,
        auth::get_user,
        auth::update_user,
        auth::update_role,
        auth::delete_user,
        // Students
        students::list_students,
        students::get_student,
        students::get_student_by_qr,
        students::students_in_section,
        students::list_sections,
        students::create_student,
        students::update_student,
        students::delete_student,
        // Subjects
        subjects::list_subjects,
        subjects::get_subject,
        subjects::create_subject,
        subjects::update_subject,
        subjects::delete_subject,
        // Enrollments
        enrollments::list_enrollments,
        enrollments::enrollments_of_student,
        enrollments::enrollments_of_subject,
        enrollments::enroll,
        enrollments::set_enrollment_active,
        enrollments::delete_enrollment,
        enrollments::bulk_enroll,
        // Scan
        scan::start_session,
        scan::end_session,
        scan::active_sessions,
        scan::get_session,
        scan::scan,
        scan::record_manual,
        scan::update_manual,
        scan::attendance_by_date,
        scan::attendance_summary,
        scan::update_status,
        scan::delete_record,
        scan::subject_roster,
        scan::today,
        // Library
        library::search_books,
        library::get_book,
        library::list_genres,
        library::borrow,
        library::return_book,
        library::my_borrowings,
        library::my_reservations,
        library::reserve,
        library::cancel_reservation,
        library::create_book,
        library::update_book,
        library::delete_book,
        library::add_copies,
        library::set_copy_status,
        library::issue,
        library::admin_return,
        library::renew,
        library::list_borrowings,
        library::search_borrowings,
        library::user_borrowings,
        library::stats,
        library::all_reservations,
        library::fulfill_reservation,
        // Email
        email::test_connection,
        email::attendance_report,
        email::daily_summary,
        email::notification,
        email::send_daily_digest,
        email::send_weekly_digest,
        email::send_subject_report,
        // Email management
        email_management::history,
        email_management::stats,
        email_management::retry,
        email_management::preferences,
        email_management::set_preference,
        email_management::set_preferences,
    ),
    components(
        schemas(
            // Shared
            crate::models::Pagination,
            crate::models::Role,
            crate::models::AttendanceStatus,
            crate::models::BorrowingStatus,
            crate::models::CopyStatus,
            crate::models::ReservationStatus,
            crate::models::EmailKind,
            crate::models::EmailStatus,
            crate::models::EmailFrequency,
            // Auth
            auth::LoginResponse,
            crate::models::user::User,
            crate::models::user::LoginRequest,
            crate::models::user::RegisterUser,
            crate::models::user::ChangePassword,
            crate::models::user::UpdateUser,
            crate::models::user::UpdateRole,
            // Roster
            crate::models::student::Student,
            crate::models::student::CreateStudent,
            crate::models::student::UpdateStudent,
            crate::models::student::Subject,
            crate::models::student::CreateSubject,
            crate::models::student::UpdateSubject,
            crate::models::student::Enrollment,
            crate::models::student::EnrollmentDetails,
            crate::models::student::CreateEnrollment,
            crate::models::student::SetEnrollmentActive,
            crate::models::student::BulkEnrollment,
            crate::models::student::BulkEnrollmentResult,
            // Attendance
            crate::models::attendance::ScanSession,
            crate::models::attendance::SessionDetails,
            crate::models::attendance::AttendanceRecord,
            crate::models::attendance::AttendanceEntry,
            crate::models::attendance::AttendanceSummaryRow,
            crate::models::attendance::RosterEntry,
            crate::models::attendance::SubjectDayTotals,
            crate::models::attendance::StartSession,
            crate::models::attendance::ScanRequest,
            crate::models::attendance::ScanResult,
            crate::models::attendance::ManualAttendance,
            crate::models::attendance::UpdateAttendanceStatus,
            crate::models::attendance::UpdateManualAttendance,
            // Library
            crate::models::book::Book,
            crate::models::book::BookCopy,
            crate::models::book::BookDetails,
            crate::models::book::Genre,
            crate::models::book::CreateBook,
            crate::models::book::UpdateBook,
            crate::models::book::AddCopies,
            crate::models::book::SetCopyStatus,
            crate::models::borrowing::Borrowing,
            crate::models::borrowing::BorrowingDetails,
            crate::models::borrowing::Fine,
            crate::models::borrowing::ReturnReceipt,
            crate::models::borrowing::BorrowRequest,
            crate::models::borrowing::ReturnRequest,
            crate::models::borrowing::IssueRequest,
            crate::models::borrowing::LibraryStats,
            crate::models::reservation::Reservation,
            crate::models::reservation::ReservationDetails,
            crate::models::reservation::ReserveRequest,
            crate::models::BookPage,
            crate::models::BorrowingPage,
            // Email
            email::ConnectionStatus,
            crate::models::email::EmailHistory,
            crate::models::email::EmailPreference,
            crate::models::email::EmailTypeStats,
            crate::models::email::SetEmailPreference,
            crate::models::email::BulkEmailPreferences,
            crate::models::email::AttendanceReportRequest,
            crate::models::email::DailySummaryRequest,
            crate::models::email::NotificationRequest,
            crate::models::email::DigestRequest,
            crate::models::email::SubjectReportRequest,
            crate::models::email::QueuedEmails,
            crate::models::EmailHistoryPage,
            // Health
            health::HealthResponse,
            // Errors
            crate::error::ErrorResponse,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "auth", description = "Authentication and user administration"),
        (name = "students", description = "Student roster"),
        (name = "subjects", description = "Subjects"),
        (name = "enrollments", description = "Student enrollments"),
        (name = "scan", description = "Attendance sessions and QR scanning"),
        (name = "library", description = "Catalog and self-service circulation"),
        (name = "library-admin", description = "Catalog management and circulation desk"),
        (name = "email", description = "Report and notification sends"),
        (name = "email-management", description = "Email history and preferences")
    )
)]
pub struct ApiDoc;

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_scan_and_library_paths() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/scan/scan"));
        assert!(doc.paths.paths.contains_key("/library/admin/reservations/{id}/fulfill"));
        let components = doc.components.expect("components");
        assert!(components.security_schemes.contains_key("bearer_auth"));
    }
}
