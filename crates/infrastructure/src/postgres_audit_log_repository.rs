use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use caseflow_application::{AuditLogQuery, AuditLogRepository};
use caseflow_core::{AppError, AppResult};
use caseflow_domain::AuditEntry;

/// Largest page size served in one listing call.
const MAX_PAGE_SIZE: usize = 200;
/// Deepest offset honored for offset pagination.
const MAX_PAGE_OFFSET: usize = 5_000;

/// PostgreSQL-backed reader for the audit trail.
#[derive(Clone)]
pub struct PostgresAuditLogRepository {
    pool: PgPool,
}

impl PostgresAuditLogRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct AuditEntryRow {
    id: Uuid,
    actor: String,
    action: String,
    target_type: String,
    target_id: String,
    detail: Option<String>,
    remote_addr: Option<String>,
    user_agent: Option<String>,
    recorded_at: DateTime<Utc>,
}

impl From<AuditEntryRow> for AuditEntry {
    fn from(row: AuditEntryRow) -> Self {
        Self {
            id: row.id,
            actor: row.actor,
            action: row.action,
            target_type: row.target_type,
            target_id: row.target_id,
            detail: row.detail,
            remote_addr: row.remote_addr,
            user_agent: row.user_agent,
            recorded_at: row.recorded_at,
        }
    }
}

#[async_trait]
impl AuditLogRepository for PostgresAuditLogRepository {
    async fn list_entries(&self, query: AuditLogQuery) -> AppResult<Vec<AuditEntry>> {
        let limit = query.limit.clamp(1, MAX_PAGE_SIZE) as i64;
        let offset = query.offset.min(MAX_PAGE_OFFSET) as i64;

        let rows = sqlx::query_as::<_, AuditEntryRow>(
            r#"
            SELECT id, actor, action, target_type, target_id, detail,
                   remote_addr, user_agent, recorded_at
            FROM access_audit_entries
            WHERE ($1::TEXT IS NULL OR actor = $1)
                AND ($2::TEXT IS NULL OR target_type = $2)
                AND ($3::TIMESTAMPTZ IS NULL OR recorded_at >= $3)
                AND ($4::TIMESTAMPTZ IS NULL OR recorded_at < $4)
            ORDER BY recorded_at DESC
            LIMIT $5 OFFSET $6
            "#,
        )
        .bind(query.actor.as_deref())
        .bind(query.target_type.as_deref())
        .bind(query.since)
        .bind(query.until)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|error| {
            AppError::StoreUnavailable(format!("failed to list audit entries: {error}"))
        })?;

        Ok(rows.into_iter().map(AuditEntry::from).collect())
    }
}
