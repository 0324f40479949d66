//! Students, subjects and enrollments

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

// ---------------------------------------------------------------------------
// Student
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Student {
    pub id: i32,
    /// External student code
    pub student_id: String,
    pub first_name: String,
    pub middle_name: Option<String>,
    pub last_name: String,
    pub email: String,
    /// Token encoded in the student's QR card
    pub qr_code: String,
    pub section: String,
    pub created_at: DateTime<Utc>,
}

impl Student {
    pub fn full_name(&self) -> String {
        match self.middle_name.as_deref().filter(|m| !m.is_empty()) {
            Some(middle) => format!("{} {} {}", self.first_name, middle, self.last_name),
            None => format!("{} {}", self.first_name, self.last_name),
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateStudent {
    #[validate(length(min = 1, message = "Student ID is required"))]
    pub student_id: String,
    #[validate(length(min = 1, message = "First name is required"))]
    pub first_name: String,
    pub middle_name: Option<String>,
    #[validate(length(min = 1, message = "Last name is required"))]
    pub last_name: String,
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    /// Generated when omitted
    pub qr_code: Option<String>,
    pub section: Option<String>,
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateStudent {
    pub student_id: Option<String>,
    pub first_name: Option<String>,
    pub middle_name: Option<String>,
    pub last_name: Option<String>,
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,
    pub section: Option<String>,
}

// ---------------------------------------------------------------------------
// Subject
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Subject {
    pub id: i32,
    pub name: String,
    pub code: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateSubject {
    #[validate(length(min = 1, message = "Subject name is required"))]
    pub name: String,
    #[validate(length(min = 1, message = "Subject code is required"))]
    pub code: String,
    pub description: Option<String>,
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateSubject {
    pub name: Option<String>,
    pub code: Option<String>,
    pub description: Option<String>,
}

// ---------------------------------------------------------------------------
// Enrollment
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Enrollment {
    pub id: i32,
    pub student_id: i32,
    pub subject_id: i32,
    pub enrollment_date: NaiveDate,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// Enrollment joined with the names on both sides
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct EnrollmentDetails {
    pub id: i32,
    pub student_id: i32,
    pub subject_id: i32,
    pub enrollment_date: NaiveDate,
    pub is_active: bool,
    pub student_code: String,
    pub first_name: String,
    pub last_name: String,
    pub section: String,
    pub subject_name: String,
    pub subject_code: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateEnrollment {
    #[serde(alias = "studentId")]
    pub student_id: i32,
    #[serde(alias = "subjectId")]
    pub subject_id: i32,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct SetEnrollmentActive {
    pub is_active: bool,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct BulkEnrollment {
    #[serde(alias = "studentIds")]
    #[validate(length(min = 1, message = "At least one student is required"))]
    pub student_ids: Vec<i32>,
    #[serde(alias = "subjectId")]
    pub subject_id: i32,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct BulkEnrollmentResult {
    pub enrolled: Vec<Enrollment>,
    /// Students that were already enrolled in the subject
    pub skipped: Vec<i32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn student(middle: Option<&str>) -> Student {
        Student {
            id: 1,
            student_id: "2024-0001".into(),
            first_name: "John".into(),
            middle_name: middle.map(str::to_string),
            last_name: "Doe".into(),
            email: "john.doe@school.test".into(),
            qr_code: "qr-john-doe-001".into(),
            section: "A".into(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn full_name_skips_empty_middle_name() {
        assert_eq!(student(None).full_name(), "John Doe");
        assert_eq!(student(Some("")).full_name(), "John Doe");
        assert_eq!(student(Some("Paul")).full_name(), "John Paul Doe");
    }
}
