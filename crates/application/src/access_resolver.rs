use std::collections::BTreeSet;
use std::sync::Arc;

use caseflow_core::{AppError, AppResult, Principal};
use caseflow_domain::VISITOR_ROLE;

use crate::{AccessReadRepository, PermissionCache};

/// Snapshot of a principal's effective permission names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PermissionSet(BTreeSet<String>);

impl PermissionSet {
    /// Builds a set from permission names; duplicates collapse.
    #[must_use]
    pub fn from_names(names: impl IntoIterator<Item = String>) -> Self {
        Self(names.into_iter().collect())
    }

    /// Returns whether the set holds the given permission name.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.0.contains(name)
    }

    /// Iterates permission names in lexicographic order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Returns the number of distinct permissions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns whether the set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Computes effective permission sets for principals.
///
/// Resolution is a union over direct role grants: active assignments for the
/// subject, then active permission names per assigned role. There is no
/// runtime hierarchy walk, so the cost is linear in assignments plus links.
#[derive(Clone)]
pub struct AccessResolver {
    repository: Arc<dyn AccessReadRepository>,
    cache: Arc<PermissionCache>,
}

impl AccessResolver {
    /// Creates a resolver over a read repository and a shared cache.
    #[must_use]
    pub fn new(repository: Arc<dyn AccessReadRepository>, cache: Arc<PermissionCache>) -> Self {
        Self { repository, cache }
    }

    /// Returns the principal's effective permission set.
    ///
    /// A store failure surfaces as `ResolutionFailed`, never as an empty set.
    pub async fn resolve(&self, principal: &Principal) -> AppResult<PermissionSet> {
        if let Some(cached) = self.cache.get(principal) {
            return Ok(cached);
        }

        let permissions = self.resolve_uncached(principal).await?;
        self.cache.store(principal.clone(), permissions.clone());
        Ok(permissions)
    }

    /// Returns whether the principal currently holds the permission.
    pub async fn has_permission(&self, principal: &Principal, name: &str) -> AppResult<bool> {
        Ok(self.resolve(principal).await?.contains(name))
    }

    async fn resolve_uncached(&self, principal: &Principal) -> AppResult<PermissionSet> {
        let role_ids = match principal.subject() {
            Some(subject) => self
                .repository
                .list_active_assignments(subject)
                .await
                .map_err(resolution_failure)?
                .into_iter()
                .map(|assignment| assignment.role_id)
                .collect(),
            None => self
                .repository
                .find_active_role_by_name(VISITOR_ROLE)
                .await
                .map_err(resolution_failure)?
                .map(|role| vec![role.id])
                .unwrap_or_default(),
        };

        let mut names = Vec::new();
        for role_id in role_ids {
            names.extend(
                self.repository
                    .list_active_permission_names_for_role(role_id)
                    .await
                    .map_err(resolution_failure)?,
            );
        }

        Ok(PermissionSet::from_names(names))
    }
}

fn resolution_failure(error: AppError) -> AppError {
    AppError::ResolutionFailed(format!("could not determine permissions: {error}"))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use chrono::Utc;
    use uuid::Uuid;

    use caseflow_core::{AppError, AppResult, Principal};
    use caseflow_domain::{RoleAssignment, RoleDefinition, VISITOR_ROLE};

    use crate::{AccessReadRepository, PermissionCache};

    use super::AccessResolver;

    struct FakeAccessReadRepository {
        assignments: HashMap<String, Vec<Uuid>>,
        roles_by_name: HashMap<String, RoleDefinition>,
        names_by_role: HashMap<Uuid, Vec<String>>,
        fail_reads: bool,
    }

    impl FakeAccessReadRepository {
        fn empty() -> Self {
            Self {
                assignments: HashMap::new(),
                roles_by_name: HashMap::new(),
                names_by_role: HashMap::new(),
                fail_reads: false,
            }
        }
    }

    #[async_trait]
    impl AccessReadRepository for FakeAccessReadRepository {
        async fn list_active_assignments(&self, subject: &str) -> AppResult<Vec<RoleAssignment>> {
            if self.fail_reads {
                return Err(AppError::StoreUnavailable("store offline".to_owned()));
            }

            Ok(self
                .assignments
                .get(subject)
                .cloned()
                .unwrap_or_default()
                .into_iter()
                .map(|role_id| RoleAssignment {
                    subject: subject.to_owned(),
                    role_id,
                    is_active: true,
                    assigned_at: Utc::now(),
                    assigned_by: "seed".to_owned(),
                })
                .collect())
        }

        async fn find_active_role_by_name(&self, name: &str) -> AppResult<Option<RoleDefinition>> {
            if self.fail_reads {
                return Err(AppError::StoreUnavailable("store offline".to_owned()));
            }

            Ok(self.roles_by_name.get(name).cloned())
        }

        async fn list_active_permission_names_for_role(
            &self,
            role_id: Uuid,
        ) -> AppResult<Vec<String>> {
            if self.fail_reads {
                return Err(AppError::StoreUnavailable("store offline".to_owned()));
            }

            Ok(self.names_by_role.get(&role_id).cloned().unwrap_or_default())
        }
    }

    fn resolver(repository: FakeAccessReadRepository) -> AccessResolver {
        AccessResolver::new(
            Arc::new(repository),
            Arc::new(PermissionCache::new(Duration::from_secs(30))),
        )
    }

    #[tokio::test]
    async fn resolve_unions_permissions_across_roles() {
        let first_role = Uuid::new_v4();
        let second_role = Uuid::new_v4();
        let mut repository = FakeAccessReadRepository::empty();
        repository
            .assignments
            .insert("alice".to_owned(), vec![first_role, second_role]);
        repository.names_by_role.insert(
            first_role,
            vec!["cases:read".to_owned(), "cases:update".to_owned()],
        );
        repository.names_by_role.insert(
            second_role,
            vec!["cases:update".to_owned(), "reports:read".to_owned()],
        );

        let resolved = resolver(repository).resolve(&Principal::user("alice")).await;
        assert!(resolved.is_ok());
        let resolved = resolved.unwrap_or_default();
        assert_eq!(resolved.len(), 3);
        assert!(resolved.contains("cases:read"));
        assert!(resolved.contains("reports:read"));
    }

    #[tokio::test]
    async fn visitor_resolves_through_the_visitor_role() {
        let visitor_role = RoleDefinition {
            id: Uuid::new_v4(),
            name: VISITOR_ROLE.to_owned(),
            label: "Visitor".to_owned(),
            level: None,
            is_system: true,
            is_active: true,
        };
        let mut repository = FakeAccessReadRepository::empty();
        repository
            .names_by_role
            .insert(visitor_role.id, vec!["pages:read".to_owned()]);
        repository
            .roles_by_name
            .insert(VISITOR_ROLE.to_owned(), visitor_role);

        let service = resolver(repository);
        let has_read = service
            .has_permission(&Principal::Visitor, "pages:read")
            .await;
        let has_write = service
            .has_permission(&Principal::Visitor, "pages:write")
            .await;
        assert!(matches!(has_read, Ok(true)));
        assert!(matches!(has_write, Ok(false)));
    }

    #[tokio::test]
    async fn missing_visitor_role_yields_empty_set() {
        let resolved = resolver(FakeAccessReadRepository::empty())
            .resolve(&Principal::Visitor)
            .await;
        assert!(resolved.is_ok());
        assert!(resolved.unwrap_or_default().is_empty());
    }

    #[tokio::test]
    async fn store_failure_is_a_resolution_error_not_an_empty_set() {
        let mut repository = FakeAccessReadRepository::empty();
        repository.fail_reads = true;

        let resolved = resolver(repository).resolve(&Principal::user("alice")).await;
        assert!(matches!(resolved, Err(AppError::ResolutionFailed(_))));
    }

    #[tokio::test]
    async fn resolve_serves_cached_set_until_invalidated() {
        let role_id = Uuid::new_v4();
        let mut repository = FakeAccessReadRepository::empty();
        repository
            .assignments
            .insert("alice".to_owned(), vec![role_id]);
        repository
            .names_by_role
            .insert(role_id, vec!["cases:read".to_owned()]);

        let cache = Arc::new(PermissionCache::new(Duration::from_secs(30)));
        let repository = Arc::new(repository);
        let service = AccessResolver::new(repository.clone(), cache.clone());

        let first = service.resolve(&Principal::user("alice")).await;
        assert!(matches!(&first, Ok(set) if set.contains("cases:read")));

        // The cached snapshot keeps serving even though the store emptied.
        let stale = AccessResolver::new(
            Arc::new(FakeAccessReadRepository::empty()),
            cache.clone(),
        )
        .resolve(&Principal::user("alice"))
        .await;
        assert!(matches!(&stale, Ok(set) if set.contains("cases:read")));

        cache.invalidate_subject("alice");
        let fresh = AccessResolver::new(Arc::new(FakeAccessReadRepository::empty()), cache)
            .resolve(&Principal::user("alice"))
            .await;
        assert!(matches!(&fresh, Ok(set) if set.is_empty()));
    }
}
