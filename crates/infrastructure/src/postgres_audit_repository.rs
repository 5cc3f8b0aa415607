use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use caseflow_application::{AuditEvent, AuditRepository};
use caseflow_core::{AppError, AppResult};

/// PostgreSQL-backed append-only audit sink.
#[derive(Clone)]
pub struct PostgresAuditRepository {
    pool: PgPool,
}

impl PostgresAuditRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuditRepository for PostgresAuditRepository {
    async fn append_entry(&self, event: AuditEvent) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO access_audit_entries
                (id, actor, action, target_type, target_id, detail, remote_addr, user_agent, recorded_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(event.actor.as_str())
        .bind(event.action.as_str())
        .bind(event.target_type.as_str())
        .bind(event.target_id.as_str())
        .bind(event.detail.as_deref())
        .bind(event.remote_addr.as_deref())
        .bind(event.user_agent.as_deref())
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|error| {
            AppError::StoreUnavailable(format!("failed to append audit entry: {error}"))
        })?;

        Ok(())
    }
}
