//! Email history and preferences repository

use sqlx::{Pool, Postgres, QueryBuilder};

use crate::{
    error::{AppError, AppResult},
    models::{
        email::{
            DigestRecipient, EmailHistory, EmailHistoryQuery, EmailPreference, EmailTypeStats,
            SetEmailPreference,
        },
        enums::{EmailFrequency, EmailKind, EmailStatus},
        Page, PageRequest,
    },
};

use super::books::like_pattern;

/// A rendered email about to be queued
pub struct NewEmail<'a> {
    pub recipient: &'a str,
    pub kind: EmailKind,
    pub subject: &'a str,
    pub body: &'a str,
    pub sent_by: Option<i32>,
    pub metadata: serde_json::Value,
}

fn push_history_filters(qb: &mut QueryBuilder<'_, Postgres>, query: &EmailHistoryQuery) {
    qb.push(" WHERE TRUE");
    if let Some(kind) = query.email_type {
        qb.push(" AND email_type = ").push_bind(kind);
    }
    if let Some(status) = query.status {
        qb.push(" AND status = ").push_bind(status);
    }
    if let Some(recipient) = query.recipient.as_deref().filter(|s| !s.is_empty()) {
        qb.push(" AND recipient_email ILIKE ").push_bind(like_pattern(recipient));
    }
}

#[derive(Clone)]
pub struct EmailRepository {
    pool: Pool<Postgres>,
}

impl EmailRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    // -----------------------------------------------------------------------
    // History
    // -----------------------------------------------------------------------

    pub async fn insert_pending(&self, email: NewEmail<'_>) -> AppResult<i32> {
        let id: i32 = sqlx::query_scalar(
            r#"
            INSERT INTO email_history (recipient_email, email_type, subject, body, status, sent_by, metadata)
            VALUES ($1, $2, $3, $4, 'pending', $5, $6)
            RETURNING id
            "#,
        )
        .bind(email.recipient)
        .bind(email.kind)
        .bind(email.subject)
        .bind(email.body)
        .bind(email.sent_by)
        .bind(email.metadata)
        .fetch_one(&self.pool)
        .await?;
        Ok(id)
    }

    pub async fn record_outcome(
        &self,
        id: i32,
        status: EmailStatus,
        attempts: i32,
        message_id: Option<&str>,
        last_error: Option<&str>,
    ) -> AppResult<()> {
        sqlx::query(
            r#"
            UPDATE email_history
            SET status = $2, attempts = attempts + $3, message_id = COALESCE($4, message_id),
                last_error = $5, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(status)
        .bind(attempts)
        .bind(message_id)
        .bind(last_error)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn get(&self, id: i32) -> AppResult<EmailHistory> {
        sqlx::query_as::<_, EmailHistory>("SELECT * FROM email_history WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("Email not found".to_string()))
    }

    /// Put a failed email back to pending so it can be queued again
    pub async fn reset_failed(&self, id: i32) -> AppResult<EmailHistory> {
        let email = self.get(id).await?;
        if email.status != EmailStatus::Failed {
            return Err(AppError::Conflict("Only failed emails can be retried".to_string()));
        }

        sqlx::query_as::<_, EmailHistory>(
            r#"
            UPDATE email_history
            SET status = 'pending', updated_at = NOW()
            WHERE id = $1 AND status = 'failed'
            RETURNING *
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::Conflict("Email is already being retried".to_string()))
    }

    pub async fn history(&self, query: &EmailHistoryQuery) -> AppResult<Page<EmailHistory>> {
        let page = PageRequest::new(query.page, query.limit);

        let mut list_qb = QueryBuilder::<Postgres>::new("SELECT * FROM email_history");
        push_history_filters(&mut list_qb, query);
        list_qb
            .push(" ORDER BY created_at DESC LIMIT ")
            .push_bind(page.limit)
            .push(" OFFSET ")
            .push_bind(page.offset());

        let mut count_qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM email_history");
        push_history_filters(&mut count_qb, query);

        let (rows, total) = tokio::try_join!(
            list_qb.build_query_as::<EmailHistory>().fetch_all(&self.pool),
            count_qb.build_query_scalar::<i64>().fetch_one(&self.pool),
        )?;

        Ok(Page::new(rows, page, total))
    }

    pub async fn stats(&self, days: i32) -> AppResult<Vec<EmailTypeStats>> {
        let rows = sqlx::query_as::<_, EmailTypeStats>(
            r#"
            SELECT email_type,
                   COUNT(*) AS total,
                   COUNT(*) FILTER (WHERE status = 'sent') AS sent,
                   COUNT(*) FILTER (WHERE status = 'failed') AS failed,
                   COUNT(*) FILTER (WHERE status = 'pending') AS pending
            FROM email_history
            WHERE created_at >= NOW() - make_interval(days => $1)
            GROUP BY email_type
            ORDER BY total DESC
            "#,
        )
        .bind(days)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    // -----------------------------------------------------------------------
    // Preferences
    // -----------------------------------------------------------------------

    pub async fn preferences(&self, user_id: i32) -> AppResult<Vec<EmailPreference>> {
        let rows = sqlx::query_as::<_, EmailPreference>(
            "SELECT * FROM email_preferences WHERE user_id = $1 ORDER BY email_type",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn upsert_preference(&self, user_id: i32, pref: &SetEmailPreference) -> AppResult<EmailPreference> {
        upsert_preference(&self.pool, user_id, pref).await
    }

    pub async fn upsert_preferences(
        &self,
        user_id: i32,
        prefs: &[SetEmailPreference],
    ) -> AppResult<Vec<EmailPreference>> {
        let mut tx = self.pool.begin().await?;
        let mut saved = Vec::with_capacity(prefs.len());
        for pref in prefs {
            saved.push(upsert_preference(&mut *tx, user_id, pref).await?);
        }
        tx.commit().await?;
        Ok(saved)
    }

    /// Users opted in to `kind` at `frequency`
    pub async fn digest_recipients(
        &self,
        kind: EmailKind,
        frequency: EmailFrequency,
    ) -> AppResult<Vec<DigestRecipient>> {
        let rows = sqlx::query_as::<_, DigestRecipient>(
            r#"
            SELECT u.id AS user_id, u.username, u.email
            FROM email_preferences p
            JOIN users u ON u.id = p.user_id
            WHERE p.email_type = $1 AND p.enabled AND p.frequency = $2
            ORDER BY u.id
            "#,
        )
        .bind(kind)
        .bind(frequency)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}

async fn upsert_preference<'e, E>(executor: E, user_id: i32, pref: &SetEmailPreference) -> AppResult<EmailPreference>
where
    E: sqlx::Executor<'e, Database = Postgres>,
{
    let preference = sqlx::query_as::<_, EmailPreference>(
        r#"
        INSERT INTO email_preferences (user_id, email_type, enabled, frequency)
        VALUES ($1, $2, $3, COALESCE($4, 'daily'))
        ON CONFLICT (user_id, email_type)
        DO UPDATE SET enabled = EXCLUDED.enabled,
                      frequency = COALESCE($4, email_preferences.frequency),
                      updated_at = NOW()
        RETURNING *
        "#,
    )
    .bind(user_id)
    .bind(pref.email_type)
    .bind(pref.enabled)
    .bind(pref.frequency)
    .fetch_one(executor)
    .await?;
    Ok(preference)
}
