use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use caseflow_application::{
    AccessReadRepository, AuditEvent, AuditLogQuery, AuditLogRepository, AuditRepository,
    RuleStoreRepository,
};
use caseflow_core::{AppError, AppResult};
use caseflow_domain::{
    AuditEntry, ModuleDefinition, PermissionDefinition, RoleAssignment, RoleDefinition,
    RolePermissionLink,
};

/// Largest page size served in one audit listing call.
const MAX_PAGE_SIZE: usize = 200;
/// Deepest offset honored for offset pagination.
const MAX_PAGE_OFFSET: usize = 5_000;

#[derive(Debug, Default)]
struct Catalog {
    modules: Vec<ModuleDefinition>,
    permissions: Vec<PermissionDefinition>,
    roles: Vec<RoleDefinition>,
    links: Vec<RolePermissionLink>,
    assignments: Vec<RoleAssignment>,
    audit_entries: Vec<AuditEntry>,
}

/// In-memory adapter for every access-control port, used by tests and
/// local tooling that has no database at hand.
#[derive(Debug, Default)]
pub struct InMemoryRuleRepository {
    catalog: RwLock<Catalog>,
}

impl InMemoryRuleRepository {
    /// Creates an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AccessReadRepository for InMemoryRuleRepository {
    async fn list_active_assignments(&self, subject: &str) -> AppResult<Vec<RoleAssignment>> {
        let catalog = self.catalog.read().await;
        Ok(catalog
            .assignments
            .iter()
            .filter(|assignment| assignment.is_active && assignment.subject == subject)
            .cloned()
            .collect())
    }

    async fn find_active_role_by_name(&self, name: &str) -> AppResult<Option<RoleDefinition>> {
        let catalog = self.catalog.read().await;
        Ok(catalog
            .roles
            .iter()
            .find(|role| role.is_active && role.name == name)
            .cloned())
    }

    async fn list_active_permission_names_for_role(
        &self,
        role_id: Uuid,
    ) -> AppResult<Vec<String>> {
        let catalog = self.catalog.read().await;
        let role_is_active = catalog
            .roles
            .iter()
            .any(|role| role.id == role_id && role.is_active);
        if !role_is_active {
            return Ok(Vec::new());
        }

        let names = catalog
            .links
            .iter()
            .filter(|link| link.is_active && link.role_id == role_id)
            .filter_map(|link| {
                catalog
                    .permissions
                    .iter()
                    .find(|permission| permission.id == link.permission_id && permission.is_active)
                    .map(|permission| permission.name.clone())
            })
            .collect();

        Ok(names)
    }
}

#[async_trait]
impl RuleStoreRepository for InMemoryRuleRepository {
    async fn find_module_by_id(&self, id: Uuid) -> AppResult<Option<ModuleDefinition>> {
        let catalog = self.catalog.read().await;
        Ok(catalog
            .modules
            .iter()
            .find(|module| module.id == id)
            .cloned())
    }

    async fn find_active_module_by_name(&self, name: &str) -> AppResult<Option<ModuleDefinition>> {
        let catalog = self.catalog.read().await;
        Ok(catalog
            .modules
            .iter()
            .find(|module| module.is_active && module.name == name)
            .cloned())
    }

    async fn max_module_sort_order(&self) -> AppResult<Option<i32>> {
        let catalog = self.catalog.read().await;
        Ok(catalog.modules.iter().map(|module| module.sort_order).max())
    }

    async fn list_modules(&self, include_inactive: bool) -> AppResult<Vec<ModuleDefinition>> {
        let catalog = self.catalog.read().await;
        let mut modules: Vec<ModuleDefinition> = catalog
            .modules
            .iter()
            .filter(|module| module.is_active || include_inactive)
            .cloned()
            .collect();
        modules.sort_by(|left, right| {
            left.sort_order
                .cmp(&right.sort_order)
                .then_with(|| left.name.cmp(&right.name))
        });
        Ok(modules)
    }

    async fn insert_module(&self, module: ModuleDefinition) -> AppResult<()> {
        let mut catalog = self.catalog.write().await;
        if catalog
            .modules
            .iter()
            .any(|existing| existing.is_active && existing.name == module.name)
        {
            return Err(AppError::Conflict(format!(
                "module '{}' already exists",
                module.name
            )));
        }
        catalog.modules.push(module);
        Ok(())
    }

    async fn update_module(&self, module: ModuleDefinition) -> AppResult<()> {
        let mut catalog = self.catalog.write().await;
        let slot = catalog
            .modules
            .iter_mut()
            .find(|existing| existing.id == module.id)
            .ok_or_else(|| AppError::NotFound(format!("module '{}' was not found", module.id)))?;
        *slot = module;
        Ok(())
    }

    async fn find_permission_by_id(&self, id: Uuid) -> AppResult<Option<PermissionDefinition>> {
        let catalog = self.catalog.read().await;
        Ok(catalog
            .permissions
            .iter()
            .find(|permission| permission.id == id)
            .cloned())
    }

    async fn find_active_permission_by_name(
        &self,
        name: &str,
    ) -> AppResult<Option<PermissionDefinition>> {
        let catalog = self.catalog.read().await;
        Ok(catalog
            .permissions
            .iter()
            .find(|permission| permission.is_active && permission.name == name)
            .cloned())
    }

    async fn list_permissions_for_module(
        &self,
        module_id: Uuid,
        include_inactive: bool,
    ) -> AppResult<Vec<PermissionDefinition>> {
        let catalog = self.catalog.read().await;
        let mut permissions: Vec<PermissionDefinition> = catalog
            .permissions
            .iter()
            .filter(|permission| permission.module_id == module_id)
            .filter(|permission| permission.is_active || include_inactive)
            .cloned()
            .collect();
        permissions.sort_by(|left, right| left.name.cmp(&right.name));
        Ok(permissions)
    }

    async fn list_active_permissions_by_ids(
        &self,
        ids: &[Uuid],
    ) -> AppResult<Vec<PermissionDefinition>> {
        let catalog = self.catalog.read().await;
        Ok(catalog
            .permissions
            .iter()
            .filter(|permission| permission.is_active && ids.contains(&permission.id))
            .cloned()
            .collect())
    }

    async fn insert_permission(&self, permission: PermissionDefinition) -> AppResult<()> {
        let mut catalog = self.catalog.write().await;
        if catalog
            .permissions
            .iter()
            .any(|existing| existing.is_active && existing.name == permission.name)
        {
            return Err(AppError::Conflict(format!(
                "permission '{}' already exists",
                permission.name
            )));
        }
        catalog.permissions.push(permission);
        Ok(())
    }

    async fn update_permission(&self, permission: PermissionDefinition) -> AppResult<()> {
        let mut catalog = self.catalog.write().await;
        let slot = catalog
            .permissions
            .iter_mut()
            .find(|existing| existing.id == permission.id)
            .ok_or_else(|| {
                AppError::NotFound(format!("permission '{}' was not found", permission.id))
            })?;
        *slot = permission;
        Ok(())
    }

    async fn find_role_by_id(&self, id: Uuid) -> AppResult<Option<RoleDefinition>> {
        let catalog = self.catalog.read().await;
        Ok(catalog.roles.iter().find(|role| role.id == id).cloned())
    }

    async fn find_active_role_by_name(&self, name: &str) -> AppResult<Option<RoleDefinition>> {
        let catalog = self.catalog.read().await;
        Ok(catalog
            .roles
            .iter()
            .find(|role| role.is_active && role.name == name)
            .cloned())
    }

    async fn list_roles(&self, include_inactive: bool) -> AppResult<Vec<RoleDefinition>> {
        let catalog = self.catalog.read().await;
        let mut roles: Vec<RoleDefinition> = catalog
            .roles
            .iter()
            .filter(|role| role.is_active || include_inactive)
            .cloned()
            .collect();
        roles.sort_by(|left, right| left.name.cmp(&right.name));
        Ok(roles)
    }

    async fn insert_role(&self, role: RoleDefinition) -> AppResult<()> {
        let mut catalog = self.catalog.write().await;
        if catalog
            .roles
            .iter()
            .any(|existing| existing.is_active && existing.name == role.name)
        {
            return Err(AppError::Conflict(format!(
                "role '{}' already exists",
                role.name
            )));
        }
        catalog.roles.push(role);
        Ok(())
    }

    async fn update_role(&self, role: RoleDefinition) -> AppResult<()> {
        let mut catalog = self.catalog.write().await;
        let slot = catalog
            .roles
            .iter_mut()
            .find(|existing| existing.id == role.id)
            .ok_or_else(|| AppError::NotFound(format!("role '{}' was not found", role.id)))?;
        *slot = role;
        Ok(())
    }

    async fn replace_role_permissions(
        &self,
        role_id: Uuid,
        permission_ids: &[Uuid],
    ) -> AppResult<()> {
        let mut catalog = self.catalog.write().await;
        if !catalog.roles.iter().any(|role| role.id == role_id) {
            return Err(AppError::NotFound(format!(
                "role '{role_id}' was not found"
            )));
        }

        for link in catalog
            .links
            .iter_mut()
            .filter(|link| link.role_id == role_id)
        {
            link.is_active = false;
        }

        for permission_id in permission_ids {
            let existing = catalog
                .links
                .iter()
                .position(|link| link.role_id == role_id && link.permission_id == *permission_id);
            if let Some(index) = existing {
                catalog.links[index].is_active = true;
            } else {
                catalog.links.push(RolePermissionLink {
                    role_id,
                    permission_id: *permission_id,
                    is_active: true,
                });
            }
        }

        Ok(())
    }

    async fn find_active_assignment(
        &self,
        subject: &str,
        role_id: Uuid,
    ) -> AppResult<Option<RoleAssignment>> {
        let catalog = self.catalog.read().await;
        Ok(catalog
            .assignments
            .iter()
            .find(|assignment| {
                assignment.is_active
                    && assignment.subject == subject
                    && assignment.role_id == role_id
            })
            .cloned())
    }

    async fn insert_assignment(&self, assignment: RoleAssignment) -> AppResult<()> {
        let mut catalog = self.catalog.write().await;
        catalog.assignments.push(assignment);
        Ok(())
    }

    async fn deactivate_assignments_for_subject(&self, subject: &str) -> AppResult<u64> {
        let mut catalog = self.catalog.write().await;
        let mut revoked = 0u64;
        for assignment in catalog
            .assignments
            .iter_mut()
            .filter(|assignment| assignment.is_active && assignment.subject == subject)
        {
            assignment.is_active = false;
            revoked += 1;
        }
        Ok(revoked)
    }
}

#[async_trait]
impl AuditRepository for InMemoryRuleRepository {
    async fn append_entry(&self, event: AuditEvent) -> AppResult<()> {
        let mut catalog = self.catalog.write().await;
        catalog.audit_entries.push(AuditEntry {
            id: Uuid::new_v4(),
            actor: event.actor,
            action: event.action.as_str().to_owned(),
            target_type: event.target_type,
            target_id: event.target_id,
            detail: event.detail,
            remote_addr: event.remote_addr,
            user_agent: event.user_agent,
            recorded_at: Utc::now(),
        });
        Ok(())
    }
}

#[async_trait]
impl AuditLogRepository for InMemoryRuleRepository {
    async fn list_entries(&self, query: AuditLogQuery) -> AppResult<Vec<AuditEntry>> {
        let catalog = self.catalog.read().await;
        let limit = query.limit.clamp(1, MAX_PAGE_SIZE);
        let offset = query.offset.min(MAX_PAGE_OFFSET);

        let mut entries: Vec<AuditEntry> = catalog
            .audit_entries
            .iter()
            .filter(|entry| {
                query
                    .actor
                    .as_deref()
                    .is_none_or(|actor| entry.actor == actor)
            })
            .filter(|entry| {
                query
                    .target_type
                    .as_deref()
                    .is_none_or(|target_type| entry.target_type == target_type)
            })
            .filter(|entry| query.since.is_none_or(|since| entry.recorded_at >= since))
            .filter(|entry| query.until.is_none_or(|until| entry.recorded_at < until))
            .cloned()
            .collect();
        entries.sort_by(|left, right| right.recorded_at.cmp(&left.recorded_at));

        Ok(entries.into_iter().skip(offset).take(limit).collect())
    }
}

#[cfg(test)]
mod tests;
