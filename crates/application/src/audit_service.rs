use std::sync::Arc;

use caseflow_core::{Actor, AppError, AppResult};
use caseflow_domain::{AUDIT_READ, AuditEntry};

use crate::{AuditLogQuery, AuditLogRepository, Guard};

/// Read-only audit trail listing for admin reporting.
#[derive(Clone)]
pub struct AuditQueryService {
    guard: Guard,
    repository: Arc<dyn AuditLogRepository>,
}

impl AuditQueryService {
    /// Creates a service over the audit trail read port.
    #[must_use]
    pub fn new(guard: Guard, repository: Arc<dyn AuditLogRepository>) -> Self {
        Self { guard, repository }
    }

    /// Lists audit entries matching the query, newest first.
    pub async fn list_entries(
        &self,
        actor: &Actor,
        query: AuditLogQuery,
    ) -> AppResult<Vec<AuditEntry>> {
        self.guard
            .require(Some(actor.principal()), AUDIT_READ)
            .await
            .map_err(AppError::from)?;

        self.repository.list_entries(query).await
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Arc;

    use async_trait::async_trait;
    use chrono::Utc;
    use uuid::Uuid;

    use caseflow_core::{Actor, AppError, AppResult, Principal, RequestContext};
    use caseflow_domain::{AUDIT_READ, AuditEntry, RoleAssignment, RoleDefinition};

    use crate::{
        AccessReadRepository, AccessResolver, AuditLogQuery, AuditLogRepository, Guard,
        PermissionCache,
    };

    use super::AuditQueryService;

    struct FakeAccessReadRepository {
        names_by_subject: HashMap<String, Vec<String>>,
    }

    #[async_trait]
    impl AccessReadRepository for FakeAccessReadRepository {
        async fn list_active_assignments(&self, subject: &str) -> AppResult<Vec<RoleAssignment>> {
            Ok(self
                .names_by_subject
                .contains_key(subject)
                .then(|| RoleAssignment {
                    subject: subject.to_owned(),
                    role_id: Uuid::new_v5(&Uuid::NAMESPACE_OID, subject.as_bytes()),
                    is_active: true,
                    assigned_at: Utc::now(),
                    assigned_by: "seed".to_owned(),
                })
                .into_iter()
                .collect())
        }

        async fn find_active_role_by_name(&self, _name: &str) -> AppResult<Option<RoleDefinition>> {
            Ok(None)
        }

        async fn list_active_permission_names_for_role(
            &self,
            role_id: Uuid,
        ) -> AppResult<Vec<String>> {
            Ok(self
                .names_by_subject
                .iter()
                .find(|(subject, _)| Uuid::new_v5(&Uuid::NAMESPACE_OID, subject.as_bytes()) == role_id)
                .map(|(_, names)| names.clone())
                .unwrap_or_default())
        }
    }

    struct FakeAuditLogRepository {
        entries: Vec<AuditEntry>,
    }

    #[async_trait]
    impl AuditLogRepository for FakeAuditLogRepository {
        async fn list_entries(&self, _query: AuditLogQuery) -> AppResult<Vec<AuditEntry>> {
            Ok(self.entries.clone())
        }
    }

    fn service(grants: &[&str], entries: Vec<AuditEntry>) -> AuditQueryService {
        let resolver = AccessResolver::new(
            Arc::new(FakeAccessReadRepository {
                names_by_subject: HashMap::from([(
                    "alice".to_owned(),
                    grants.iter().map(|name| (*name).to_owned()).collect(),
                )]),
            }),
            Arc::new(PermissionCache::default()),
        );
        AuditQueryService::new(Guard::new(resolver), Arc::new(FakeAuditLogRepository { entries }))
    }

    fn actor() -> Actor {
        Actor::new(Principal::user("alice"), RequestContext::default())
    }

    #[tokio::test]
    async fn listing_requires_the_audit_read_capability() {
        let service = service(&["access:manage"], Vec::new());
        let result = service.list_entries(&actor(), AuditLogQuery::default()).await;
        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }

    #[tokio::test]
    async fn listing_returns_repository_entries() {
        let entry = AuditEntry {
            id: Uuid::new_v4(),
            actor: "alice".to_owned(),
            action: "role_created".to_owned(),
            target_type: "role".to_owned(),
            target_id: Uuid::new_v4().to_string(),
            detail: None,
            remote_addr: None,
            user_agent: None,
            recorded_at: Utc::now(),
        };
        let service = service(&[AUDIT_READ], vec![entry.clone()]);

        let result = service.list_entries(&actor(), AuditLogQuery::default()).await;
        assert!(matches!(&result, Ok(entries) if entries.as_slice() == [entry.clone()]));
    }
}
