use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use caseflow_core::{Actor, AppError, AppResult, NonEmptyString};
use caseflow_domain::{
    ACCESS_MANAGE, AuditAction, ModuleDefinition, PermissionDefinition, RoleAssignment,
    RoleDefinition,
};

use crate::{
    AuditEvent, AuditRepository, CreateModuleInput, CreatePermissionInput, CreateRoleInput, Guard,
    ModulePatch, PermissionCache, PermissionPatch, RolePatch, RuleStoreRepository,
};

/// The sole write path into the rule catalog.
///
/// Every operation is gated on the `access:manage` capability of the acting
/// principal, validates structural invariants before any store write, emits
/// exactly one audit event per successful mutation, and invalidates the
/// resolver cache where the write can change resolution results.
#[derive(Clone)]
pub struct RuleAdminService {
    guard: Guard,
    repository: Arc<dyn RuleStoreRepository>,
    audit_repository: Arc<dyn AuditRepository>,
    cache: Arc<PermissionCache>,
}

impl RuleAdminService {
    /// Creates a service from required dependencies.
    ///
    /// The cache must be the same instance the resolver behind `guard` reads
    /// through, otherwise invalidation is a no-op.
    #[must_use]
    pub fn new(
        guard: Guard,
        repository: Arc<dyn RuleStoreRepository>,
        audit_repository: Arc<dyn AuditRepository>,
        cache: Arc<PermissionCache>,
    ) -> Self {
        Self {
            guard,
            repository,
            audit_repository,
            cache,
        }
    }

    /// Creates a module; name must be unique among active modules.
    pub async fn create_module(
        &self,
        actor: &Actor,
        input: CreateModuleInput,
    ) -> AppResult<ModuleDefinition> {
        self.authorize(actor).await?;

        if let Some(existing) = self
            .repository
            .find_active_module_by_name(input.name.as_str())
            .await?
        {
            return Err(AppError::Conflict(format!(
                "module '{}' already exists",
                existing.name
            )));
        }

        let sort_order = match input.sort_order {
            Some(sort_order) => sort_order,
            None => self
                .repository
                .max_module_sort_order()
                .await?
                .map_or(1, |max| max + 1),
        };

        let module = ModuleDefinition::new(
            Uuid::new_v4(),
            input.name,
            input.label,
            input.icon,
            input.color,
            sort_order,
        )?;
        self.repository.insert_module(module.clone()).await?;

        self.record(
            actor,
            AuditAction::ModuleCreated,
            "module",
            module.id.to_string(),
            Some(serde_json::json!({ "name": module.name }).to_string()),
        )
        .await;

        Ok(module)
    }

    /// Applies a partial update to a non-system module.
    pub async fn update_module(
        &self,
        actor: &Actor,
        id: Uuid,
        patch: ModulePatch,
    ) -> AppResult<ModuleDefinition> {
        self.authorize(actor).await?;

        let current = self.active_module(id).await?;
        if current.is_system {
            return Err(AppError::Protected(format!(
                "module '{}' is system-managed",
                current.name
            )));
        }

        let mut updated = current.clone();
        if let Some(name) = patch.name {
            if name != current.name
                && self
                    .repository
                    .find_active_module_by_name(name.as_str())
                    .await?
                    .is_some()
            {
                return Err(AppError::Conflict(format!(
                    "module '{name}' already exists"
                )));
            }
            updated.name = NonEmptyString::new(name)?.into();
        }
        if let Some(label) = patch.label {
            updated.label = NonEmptyString::new(label)?.into();
        }
        if let Some(icon) = patch.icon {
            updated.icon = Some(icon);
        }
        if let Some(color) = patch.color {
            updated.color = Some(color);
        }
        if let Some(sort_order) = patch.sort_order {
            updated.sort_order = sort_order;
        }

        self.repository.update_module(updated.clone()).await?;

        self.record(
            actor,
            AuditAction::ModuleUpdated,
            "module",
            updated.id.to_string(),
            Some(serde_json::json!({ "before": current, "after": updated }).to_string()),
        )
        .await;

        Ok(updated)
    }

    /// Soft-deletes a non-system module.
    pub async fn delete_module(&self, actor: &Actor, id: Uuid) -> AppResult<()> {
        self.authorize(actor).await?;

        let current = self.active_module(id).await?;
        if current.is_system {
            return Err(AppError::Protected(format!(
                "module '{}' is system-managed",
                current.name
            )));
        }

        let mut deactivated = current.clone();
        deactivated.is_active = false;
        self.repository.update_module(deactivated).await?;

        self.record(
            actor,
            AuditAction::ModuleDeleted,
            "module",
            current.id.to_string(),
            Some(serde_json::json!({ "name": current.name }).to_string()),
        )
        .await;

        Ok(())
    }

    /// Creates a permission; name must be globally unique among active
    /// permissions and resource/action must be non-blank.
    pub async fn create_permission(
        &self,
        actor: &Actor,
        input: CreatePermissionInput,
    ) -> AppResult<PermissionDefinition> {
        self.authorize(actor).await?;

        if let Some(existing) = self
            .repository
            .find_active_permission_by_name(input.name.as_str())
            .await?
        {
            return Err(AppError::Conflict(format!(
                "permission '{}' already exists",
                existing.name
            )));
        }
        self.active_module(input.module_id).await?;

        let permission = PermissionDefinition::new(
            Uuid::new_v4(),
            input.name,
            input.label,
            input.resource,
            input.action,
            input.module_id,
        )?;
        self.repository
            .insert_permission(permission.clone())
            .await?;

        self.record(
            actor,
            AuditAction::PermissionCreated,
            "permission",
            permission.id.to_string(),
            Some(serde_json::json!({ "name": permission.name }).to_string()),
        )
        .await;

        Ok(permission)
    }

    /// Applies a partial update to a non-system permission.
    pub async fn update_permission(
        &self,
        actor: &Actor,
        id: Uuid,
        patch: PermissionPatch,
    ) -> AppResult<PermissionDefinition> {
        self.authorize(actor).await?;

        let current = self.active_permission(id).await?;
        if current.is_system {
            return Err(AppError::Protected(format!(
                "permission '{}' is system-managed",
                current.name
            )));
        }

        let mut updated = current.clone();
        if let Some(name) = patch.name {
            if name != current.name
                && self
                    .repository
                    .find_active_permission_by_name(name.as_str())
                    .await?
                    .is_some()
            {
                return Err(AppError::Conflict(format!(
                    "permission '{name}' already exists"
                )));
            }
            updated.name = NonEmptyString::new(name)?.into();
        }
        if let Some(label) = patch.label {
            updated.label = NonEmptyString::new(label)?.into();
        }
        if let Some(resource) = patch.resource {
            if resource.trim().is_empty() {
                return Err(AppError::Validation(
                    "permission resource must not be blank".to_owned(),
                ));
            }
            updated.resource = resource;
        }
        if let Some(action) = patch.action {
            if action.trim().is_empty() {
                return Err(AppError::Validation(
                    "permission action must not be blank".to_owned(),
                ));
            }
            updated.action = action;
        }
        if let Some(module_id) = patch.module_id {
            self.active_module(module_id).await?;
            updated.module_id = module_id;
        }

        self.repository.update_permission(updated.clone()).await?;
        self.cache.clear();

        self.record(
            actor,
            AuditAction::PermissionUpdated,
            "permission",
            updated.id.to_string(),
            Some(serde_json::json!({ "before": current, "after": updated }).to_string()),
        )
        .await;

        Ok(updated)
    }

    /// Soft-deletes a non-system permission.
    pub async fn delete_permission(&self, actor: &Actor, id: Uuid) -> AppResult<()> {
        self.authorize(actor).await?;

        let current = self.active_permission(id).await?;
        if current.is_system {
            return Err(AppError::Protected(format!(
                "permission '{}' is system-managed",
                current.name
            )));
        }

        let mut deactivated = current.clone();
        deactivated.is_active = false;
        self.repository.update_permission(deactivated).await?;
        self.cache.clear();

        self.record(
            actor,
            AuditAction::PermissionDeleted,
            "permission",
            current.id.to_string(),
            Some(serde_json::json!({ "name": current.name }).to_string()),
        )
        .await;

        Ok(())
    }

    /// Creates a role; name must be unique among active roles.
    pub async fn create_role(
        &self,
        actor: &Actor,
        input: CreateRoleInput,
    ) -> AppResult<RoleDefinition> {
        self.authorize(actor).await?;

        if let Some(existing) = self
            .repository
            .find_active_role_by_name(input.name.as_str())
            .await?
        {
            return Err(AppError::Conflict(format!(
                "role '{}' already exists",
                existing.name
            )));
        }

        let role = RoleDefinition::new(Uuid::new_v4(), input.name, input.label, input.level)?;
        self.repository.insert_role(role.clone()).await?;

        self.record(
            actor,
            AuditAction::RoleCreated,
            "role",
            role.id.to_string(),
            Some(serde_json::json!({ "name": role.name }).to_string()),
        )
        .await;

        Ok(role)
    }

    /// Applies a partial update to a non-system role.
    pub async fn update_role(
        &self,
        actor: &Actor,
        id: Uuid,
        patch: RolePatch,
    ) -> AppResult<RoleDefinition> {
        self.authorize(actor).await?;

        let current = self.active_role(id).await?;
        if current.is_system {
            return Err(AppError::Protected(format!(
                "role '{}' is system-managed",
                current.name
            )));
        }

        let mut updated = current.clone();
        if let Some(name) = patch.name {
            if name != current.name
                && self
                    .repository
                    .find_active_role_by_name(name.as_str())
                    .await?
                    .is_some()
            {
                return Err(AppError::Conflict(format!("role '{name}' already exists")));
            }
            updated.name = NonEmptyString::new(name)?.into();
        }
        if let Some(label) = patch.label {
            updated.label = NonEmptyString::new(label)?.into();
        }
        if let Some(level) = patch.level {
            updated.level = Some(level);
        }

        self.repository.update_role(updated.clone()).await?;
        self.cache.clear();

        self.record(
            actor,
            AuditAction::RoleUpdated,
            "role",
            updated.id.to_string(),
            Some(serde_json::json!({ "before": current, "after": updated }).to_string()),
        )
        .await;

        Ok(updated)
    }

    /// Soft-deletes a non-system role; existing links and assignments keep
    /// their rows for history but stop resolving.
    pub async fn delete_role(&self, actor: &Actor, id: Uuid) -> AppResult<()> {
        self.authorize(actor).await?;

        let current = self.active_role(id).await?;
        if current.is_system {
            return Err(AppError::Protected(format!(
                "role '{}' is system-managed",
                current.name
            )));
        }

        let mut deactivated = current.clone();
        deactivated.is_active = false;
        self.repository.update_role(deactivated).await?;
        self.cache.clear();

        self.record(
            actor,
            AuditAction::RoleDeleted,
            "role",
            current.id.to_string(),
            Some(serde_json::json!({ "name": current.name }).to_string()),
        )
        .await;

        Ok(())
    }

    /// Atomically replaces a role's entire active permission set.
    ///
    /// A full replace rather than incremental add/remove, so client-displayed
    /// and stored state cannot drift.
    pub async fn set_role_permissions(
        &self,
        actor: &Actor,
        role_id: Uuid,
        permission_ids: &[Uuid],
    ) -> AppResult<()> {
        self.authorize(actor).await?;

        let role = self.active_role(role_id).await?;
        if role.is_system {
            return Err(AppError::Protected(format!(
                "role '{}' is system-managed",
                role.name
            )));
        }

        let requested: BTreeSet<Uuid> = permission_ids.iter().copied().collect();
        let deduplicated: Vec<Uuid> = requested.iter().copied().collect();
        let found = self
            .repository
            .list_active_permissions_by_ids(deduplicated.as_slice())
            .await?;
        if found.len() != deduplicated.len() {
            let found_ids: BTreeSet<Uuid> = found.iter().map(|permission| permission.id).collect();
            let missing: Vec<String> = requested
                .difference(&found_ids)
                .map(Uuid::to_string)
                .collect();
            return Err(AppError::NotFound(format!(
                "permissions not found or inactive: {}",
                missing.join(", ")
            )));
        }

        self.repository
            .replace_role_permissions(role_id, deduplicated.as_slice())
            .await?;
        self.cache.clear();

        let names: Vec<&str> = found
            .iter()
            .map(|permission| permission.name.as_str())
            .collect();
        self.record(
            actor,
            AuditAction::RolePermissionsUpdated,
            "role",
            role.id.to_string(),
            Some(serde_json::json!({ "role": role.name, "permissions": names }).to_string()),
        )
        .await;

        Ok(())
    }

    /// Assigns a role to a subject; a duplicate active assignment conflicts.
    pub async fn assign_role(
        &self,
        actor: &Actor,
        subject: &str,
        role_id: Uuid,
    ) -> AppResult<RoleAssignment> {
        self.authorize(actor).await?;

        let subject: String = NonEmptyString::new(subject)?.into();
        let role = self.active_role(role_id).await?;
        if self
            .repository
            .find_active_assignment(subject.as_str(), role_id)
            .await?
            .is_some()
        {
            return Err(AppError::Conflict(format!(
                "subject '{subject}' already holds role '{}'",
                role.name
            )));
        }

        let assignment = RoleAssignment {
            subject: subject.clone(),
            role_id,
            is_active: true,
            assigned_at: Utc::now(),
            assigned_by: actor.principal().to_string(),
        };
        self.repository
            .insert_assignment(assignment.clone())
            .await?;
        self.cache.invalidate_subject(subject.as_str());

        self.record(
            actor,
            AuditAction::RoleAssigned,
            "role_assignment",
            format!("{subject}:{role_id}"),
            Some(serde_json::json!({ "subject": subject, "role": role.name }).to_string()),
        )
        .await;

        Ok(assignment)
    }

    /// Deactivates every active role assignment for a subject, returning the
    /// revoked count. Single-role revocation targets the link directly.
    pub async fn revoke_all_roles(&self, actor: &Actor, subject: &str) -> AppResult<u64> {
        self.authorize(actor).await?;

        let subject: String = NonEmptyString::new(subject)?.into();
        let revoked = self
            .repository
            .deactivate_assignments_for_subject(subject.as_str())
            .await?;
        self.cache.invalidate_subject(subject.as_str());

        self.record(
            actor,
            AuditAction::RolesRevoked,
            "role_assignment",
            subject.clone(),
            Some(serde_json::json!({ "subject": subject, "revoked": revoked }).to_string()),
        )
        .await;

        Ok(revoked)
    }

    /// Lists modules for administrative views, ordered by sort order.
    pub async fn list_modules(
        &self,
        actor: &Actor,
        include_inactive: bool,
    ) -> AppResult<Vec<ModuleDefinition>> {
        self.authorize(actor).await?;
        self.repository.list_modules(include_inactive).await
    }

    /// Lists a module's permissions for administrative views.
    pub async fn list_permissions(
        &self,
        actor: &Actor,
        module_id: Uuid,
        include_inactive: bool,
    ) -> AppResult<Vec<PermissionDefinition>> {
        self.authorize(actor).await?;
        self.repository
            .list_permissions_for_module(module_id, include_inactive)
            .await
    }

    /// Lists roles for administrative views.
    pub async fn list_roles(
        &self,
        actor: &Actor,
        include_inactive: bool,
    ) -> AppResult<Vec<RoleDefinition>> {
        self.authorize(actor).await?;
        self.repository.list_roles(include_inactive).await
    }

    async fn authorize(&self, actor: &Actor) -> AppResult<()> {
        self.guard
            .require(Some(actor.principal()), ACCESS_MANAGE)
            .await
            .map_err(AppError::from)?;
        Ok(())
    }

    async fn active_module(&self, id: Uuid) -> AppResult<ModuleDefinition> {
        self.repository
            .find_module_by_id(id)
            .await?
            .filter(|module| module.is_active)
            .ok_or_else(|| AppError::NotFound(format!("module '{id}' was not found")))
    }

    async fn active_permission(&self, id: Uuid) -> AppResult<PermissionDefinition> {
        self.repository
            .find_permission_by_id(id)
            .await?
            .filter(|permission| permission.is_active)
            .ok_or_else(|| AppError::NotFound(format!("permission '{id}' was not found")))
    }

    async fn active_role(&self, id: Uuid) -> AppResult<RoleDefinition> {
        self.repository
            .find_role_by_id(id)
            .await?
            .filter(|role| role.is_active)
            .ok_or_else(|| AppError::NotFound(format!("role '{id}' was not found")))
    }

    /// Appends the audit entry for an already-committed mutation.
    ///
    /// Losing an audit row is preferable to rolling back a validated and
    /// applied rule change, so append failures are logged and not propagated.
    async fn record(
        &self,
        actor: &Actor,
        action: AuditAction,
        target_type: &str,
        target_id: String,
        detail: Option<String>,
    ) {
        let event = AuditEvent {
            actor: actor.principal().to_string(),
            action,
            target_type: target_type.to_owned(),
            target_id,
            detail,
            remote_addr: actor.context().remote_addr().map(str::to_owned),
            user_agent: actor.context().user_agent().map(str::to_owned),
        };

        if let Err(error) = self.audit_repository.append_entry(event).await {
            tracing::warn!(
                action = action.as_str(),
                %error,
                "audit append failed after a committed mutation"
            );
        }
    }
}
