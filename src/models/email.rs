//! Email audit log and per-user preferences

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use super::enums::{EmailFrequency, EmailKind, EmailStatus};

/// One outgoing email and its delivery outcome
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct EmailHistory {
    pub id: i32,
    pub recipient_email: String,
    pub email_type: EmailKind,
    pub subject: String,
    #[serde(skip_serializing)]
    pub body: String,
    pub message_id: Option<String>,
    pub status: EmailStatus,
    pub attempts: i32,
    pub last_error: Option<String>,
    pub sent_by: Option<i32>,
    #[schema(value_type = Object)]
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct EmailPreference {
    pub id: i32,
    pub user_id: i32,
    pub email_type: EmailKind,
    pub enabled: bool,
    pub frequency: EmailFrequency,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct EmailTypeStats {
    pub email_type: EmailKind,
    pub total: i64,
    pub sent: i64,
    pub failed: i64,
    pub pending: i64,
}

/// Recipient of a scheduled digest
#[derive(Debug, Clone, FromRow)]
pub struct DigestRecipient {
    pub user_id: i32,
    pub username: String,
    pub email: String,
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct EmailHistoryQuery {
    pub email_type: Option<EmailKind>,
    pub status: Option<EmailStatus>,
    /// Substring of the recipient address
    pub recipient: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct EmailStatsQuery {
    /// Look-back window in days (default 30)
    pub days: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct SetEmailPreference {
    #[serde(alias = "emailType")]
    pub email_type: EmailKind,
    pub enabled: bool,
    pub frequency: Option<EmailFrequency>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct BulkEmailPreferences {
    #[validate(length(min = 1, message = "At least one preference is required"))]
    pub preferences: Vec<SetEmailPreference>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct AttendanceReportRequest {
    #[serde(alias = "subjectId")]
    pub subject_id: i32,
    pub date: NaiveDate,
    #[serde(alias = "recipientEmail")]
    #[validate(email(message = "Invalid recipient email"))]
    pub recipient_email: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct DailySummaryRequest {
    pub date: NaiveDate,
    #[serde(alias = "recipientEmail")]
    #[validate(email(message = "Invalid recipient email"))]
    pub recipient_email: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct NotificationRequest {
    #[serde(alias = "recipientEmail")]
    #[validate(email(message = "Invalid recipient email"))]
    pub recipient_email: String,
    #[validate(length(min = 1, message = "Subject is required"))]
    pub subject: String,
    #[validate(length(min = 1, message = "Message is required"))]
    pub message: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct DigestRequest {
    /// Defaults to today
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct SubjectReportRequest {
    #[serde(alias = "subjectId")]
    pub subject_id: i32,
    pub date: Option<NaiveDate>,
}

/// Ids of the email_history rows created by a trigger
#[derive(Debug, Serialize, ToSchema)]
pub struct QueuedEmails {
    pub queued: Vec<i32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bulk_preferences_need_at_least_one_entry() {
        let empty: BulkEmailPreferences = serde_json::from_str(r#"{"preferences": []}"#).unwrap();
        assert!(empty.validate().is_err());

        let one: BulkEmailPreferences = serde_json::from_str(
            r#"{"preferences": [{"emailType": "daily_summary", "enabled": true, "frequency": "weekly"}]}"#,
        )
        .unwrap();
        assert!(one.validate().is_ok());
        assert_eq!(one.preferences[0].email_type, EmailKind::DailySummary);
        assert_eq!(one.preferences[0].frequency, Some(EmailFrequency::Weekly));
    }
}
