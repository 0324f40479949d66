//! Students, subjects and enrollments

use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::student::{
        BulkEnrollmentResult, CreateStudent, CreateSubject, Enrollment, EnrollmentDetails, Student,
        Subject, UpdateStudent, UpdateSubject,
    },
    repository::Repository,
};

const DEFAULT_SECTION: &str = "A";

/// Token printed on a student's QR card when none is supplied
pub fn generate_qr_code() -> String {
    Uuid::new_v4().to_string()
}

#[derive(Clone)]
pub struct RosterService {
    repository: Repository,
}

impl RosterService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    // -----------------------------------------------------------------------
    // Students
    // -----------------------------------------------------------------------

    pub async fn list_students(&self) -> AppResult<Vec<Student>> {
        self.repository.students.list().await
    }

    pub async fn get_student(&self, id: i32) -> AppResult<Student> {
        self.repository.students.get_by_id(id).await
    }

    pub async fn find_by_qr_code(&self, qr_code: &str) -> AppResult<Student> {
        self.repository.students.get_by_qr_code(qr_code.trim()).await
    }

    pub async fn students_in_section(&self, section: &str) -> AppResult<Vec<Student>> {
        self.repository.students.list_by_section(section).await
    }

    pub async fn sections(&self) -> AppResult<Vec<String>> {
        self.repository.students.sections().await
    }

    pub async fn create_student(&self, student: CreateStudent) -> AppResult<Student> {
        let qr_code = student
            .qr_code
            .as_deref()
            .map(str::trim)
            .filter(|qr| !qr.is_empty())
            .map(str::to_string)
            .unwrap_or_else(generate_qr_code);
        let section = student
            .section
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(DEFAULT_SECTION)
            .to_string();

        let created = self.repository.students.create(&student, &qr_code, &section).await?;
        tracing::info!("Created student {} ({})", created.student_id, created.full_name());
        Ok(created)
    }

    pub async fn update_student(&self, id: i32, update: UpdateStudent) -> AppResult<Student> {
        self.repository.students.update(id, &update).await
    }

    pub async fn delete_student(&self, id: i32) -> AppResult<()> {
        self.repository.students.delete(id).await
    }

    // -----------------------------------------------------------------------
    // Subjects
    // -----------------------------------------------------------------------

    pub async fn list_subjects(&self) -> AppResult<Vec<Subject>> {
        self.repository.subjects.list().await
    }

    pub async fn get_subject(&self, id: i32) -> AppResult<Subject> {
        self.repository.subjects.get_by_id(id).await
    }

    pub async fn create_subject(&self, subject: CreateSubject) -> AppResult<Subject> {
        self.repository.subjects.create(&subject).await
    }

    pub async fn update_subject(&self, id: i32, update: UpdateSubject) -> AppResult<Subject> {
        self.repository.subjects.update(id, &update).await
    }

    pub async fn delete_subject(&self, id: i32) -> AppResult<()> {
        self.repository.subjects.delete(id).await
    }

    // -----------------------------------------------------------------------
    // Enrollments
    // -----------------------------------------------------------------------

    pub async fn list_enrollments(&self) -> AppResult<Vec<EnrollmentDetails>> {
        self.repository.enrollments.list().await
    }

    pub async fn enrollments_of_student(&self, student_id: i32) -> AppResult<Vec<EnrollmentDetails>> {
        self.repository.enrollments.list_by_student(student_id).await
    }

    pub async fn enrollments_of_subject(&self, subject_id: i32) -> AppResult<Vec<EnrollmentDetails>> {
        self.repository.enrollments.list_by_subject(subject_id).await
    }

    pub async fn enroll(&self, student_id: i32, subject_id: i32) -> AppResult<Enrollment> {
        self.repository.enrollments.enroll(student_id, subject_id).await
    }

    pub async fn set_enrollment_active(&self, id: i32, is_active: bool) -> AppResult<Enrollment> {
        self.repository.enrollments.set_active(id, is_active).await
    }

    pub async fn delete_enrollment(&self, id: i32) -> AppResult<()> {
        self.repository.enrollments.delete(id).await
    }

    pub async fn bulk_enroll(&self, student_ids: &[i32], subject_id: i32) -> AppResult<BulkEnrollmentResult> {
        let mut unique = student_ids.to_vec();
        unique.sort_unstable();
        unique.dedup();
        if unique.is_empty() {
            return Err(AppError::Validation("At least one student is required".to_string()));
        }

        let result = self.repository.enrollments.bulk_enroll(&unique, subject_id).await?;
        tracing::info!(
            "Bulk enrollment into subject {}: {} enrolled, {} skipped",
            subject_id,
            result.enrolled.len(),
            result.skipped.len()
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_qr_codes_are_unique_uuids() {
        let a = generate_qr_code();
        let b = generate_qr_code();
        assert_ne!(a, b);
        assert!(Uuid::parse_str(&a).is_ok());
    }
}
