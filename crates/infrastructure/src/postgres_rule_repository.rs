mod modules;
mod permissions;
mod roles;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use caseflow_application::{AccessReadRepository, RuleStoreRepository};
use caseflow_core::{AppError, AppResult};
use caseflow_domain::{
    ModuleDefinition, PermissionDefinition, RoleAssignment, RoleDefinition,
};

/// PostgreSQL-backed repository for the rule catalog.
#[derive(Clone)]
pub struct PostgresRuleRepository {
    pool: PgPool,
}

impl PostgresRuleRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct ModuleRow {
    id: Uuid,
    name: String,
    label: String,
    icon: Option<String>,
    color: Option<String>,
    sort_order: i32,
    is_system: bool,
    is_active: bool,
}

impl From<ModuleRow> for ModuleDefinition {
    fn from(row: ModuleRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            label: row.label,
            icon: row.icon,
            color: row.color,
            sort_order: row.sort_order,
            is_system: row.is_system,
            is_active: row.is_active,
        }
    }
}

#[derive(Debug, FromRow)]
struct PermissionRow {
    id: Uuid,
    name: String,
    label: String,
    resource: Option<String>,
    action: Option<String>,
    module_id: Uuid,
    is_system: bool,
    is_active: bool,
}

impl PermissionRow {
    /// Decodes a stored permission, repairing blank resource/action fields
    /// left behind by catalogs migrated from looser stores.
    fn into_definition(self) -> AppResult<PermissionDefinition> {
        let name = self.name.clone();
        PermissionDefinition {
            id: self.id,
            name: self.name,
            label: self.label,
            resource: self.resource.unwrap_or_default(),
            action: self.action.unwrap_or_default(),
            module_id: self.module_id,
            is_system: self.is_system,
            is_active: self.is_active,
        }
        .repaired()
        .map_err(|error| AppError::Internal(format!("invalid stored permission '{name}': {error}")))
    }
}

#[derive(Debug, FromRow)]
struct RoleRow {
    id: Uuid,
    name: String,
    label: String,
    level: Option<i32>,
    is_system: bool,
    is_active: bool,
}

impl From<RoleRow> for RoleDefinition {
    fn from(row: RoleRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            label: row.label,
            level: row.level,
            is_system: row.is_system,
            is_active: row.is_active,
        }
    }
}

#[derive(Debug, FromRow)]
struct AssignmentRow {
    subject: String,
    role_id: Uuid,
    is_active: bool,
    assigned_at: DateTime<Utc>,
    assigned_by: String,
}

impl From<AssignmentRow> for RoleAssignment {
    fn from(row: AssignmentRow) -> Self {
        Self {
            subject: row.subject,
            role_id: row.role_id,
            is_active: row.is_active,
            assigned_at: row.assigned_at,
            assigned_by: row.assigned_by,
        }
    }
}

fn store_error(context: &str, error: sqlx::Error) -> AppError {
    AppError::StoreUnavailable(format!("{context}: {error}"))
}

fn unique_conflict(error: sqlx::Error, message: String, context: &str) -> AppError {
    if let sqlx::Error::Database(database_error) = &error
        && database_error.code().as_deref() == Some("23505")
    {
        return AppError::Conflict(message);
    }

    store_error(context, error)
}

#[async_trait]
impl AccessReadRepository for PostgresRuleRepository {
    async fn list_active_assignments(&self, subject: &str) -> AppResult<Vec<RoleAssignment>> {
        let rows = sqlx::query_as::<_, AssignmentRow>(
            r#"
            SELECT subject, role_id, is_active, assigned_at, assigned_by
            FROM access_role_assignments
            WHERE subject = $1 AND is_active
            "#,
        )
        .bind(subject)
        .fetch_all(&self.pool)
        .await
        .map_err(|error| store_error("failed to list role assignments", error))?;

        Ok(rows.into_iter().map(RoleAssignment::from).collect())
    }

    async fn find_active_role_by_name(&self, name: &str) -> AppResult<Option<RoleDefinition>> {
        self.find_active_role_by_name_impl(name).await
    }

    async fn list_active_permission_names_for_role(
        &self,
        role_id: Uuid,
    ) -> AppResult<Vec<String>> {
        let names = sqlx::query_scalar::<_, String>(
            r#"
            SELECT permissions.name
            FROM access_role_permissions AS links
            INNER JOIN access_roles AS roles
                ON roles.id = links.role_id
            INNER JOIN access_permissions AS permissions
                ON permissions.id = links.permission_id
            WHERE links.role_id = $1
                AND links.is_active
                AND roles.is_active
                AND permissions.is_active
            "#,
        )
        .bind(role_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|error| store_error("failed to list role permission names", error))?;

        Ok(names)
    }
}

#[async_trait]
impl RuleStoreRepository for PostgresRuleRepository {
    async fn find_module_by_id(&self, id: Uuid) -> AppResult<Option<ModuleDefinition>> {
        self.find_module_by_id_impl(id).await
    }

    async fn find_active_module_by_name(&self, name: &str) -> AppResult<Option<ModuleDefinition>> {
        self.find_active_module_by_name_impl(name).await
    }

    async fn max_module_sort_order(&self) -> AppResult<Option<i32>> {
        self.max_module_sort_order_impl().await
    }

    async fn list_modules(&self, include_inactive: bool) -> AppResult<Vec<ModuleDefinition>> {
        self.list_modules_impl(include_inactive).await
    }

    async fn insert_module(&self, module: ModuleDefinition) -> AppResult<()> {
        self.insert_module_impl(module).await
    }

    async fn update_module(&self, module: ModuleDefinition) -> AppResult<()> {
        self.update_module_impl(module).await
    }

    async fn find_permission_by_id(&self, id: Uuid) -> AppResult<Option<PermissionDefinition>> {
        self.find_permission_by_id_impl(id).await
    }

    async fn find_active_permission_by_name(
        &self,
        name: &str,
    ) -> AppResult<Option<PermissionDefinition>> {
        self.find_active_permission_by_name_impl(name).await
    }

    async fn list_permissions_for_module(
        &self,
        module_id: Uuid,
        include_inactive: bool,
    ) -> AppResult<Vec<PermissionDefinition>> {
        self.list_permissions_for_module_impl(module_id, include_inactive)
            .await
    }

    async fn list_active_permissions_by_ids(
        &self,
        ids: &[Uuid],
    ) -> AppResult<Vec<PermissionDefinition>> {
        self.list_active_permissions_by_ids_impl(ids).await
    }

    async fn insert_permission(&self, permission: PermissionDefinition) -> AppResult<()> {
        self.insert_permission_impl(permission).await
    }

    async fn update_permission(&self, permission: PermissionDefinition) -> AppResult<()> {
        self.update_permission_impl(permission).await
    }

    async fn find_role_by_id(&self, id: Uuid) -> AppResult<Option<RoleDefinition>> {
        self.find_role_by_id_impl(id).await
    }

    async fn find_active_role_by_name(&self, name: &str) -> AppResult<Option<RoleDefinition>> {
        self.find_active_role_by_name_impl(name).await
    }

    async fn list_roles(&self, include_inactive: bool) -> AppResult<Vec<RoleDefinition>> {
        self.list_roles_impl(include_inactive).await
    }

    async fn insert_role(&self, role: RoleDefinition) -> AppResult<()> {
        self.insert_role_impl(role).await
    }

    async fn update_role(&self, role: RoleDefinition) -> AppResult<()> {
        self.update_role_impl(role).await
    }

    async fn replace_role_permissions(
        &self,
        role_id: Uuid,
        permission_ids: &[Uuid],
    ) -> AppResult<()> {
        self.replace_role_permissions_impl(role_id, permission_ids)
            .await
    }

    async fn find_active_assignment(
        &self,
        subject: &str,
        role_id: Uuid,
    ) -> AppResult<Option<RoleAssignment>> {
        self.find_active_assignment_impl(subject, role_id).await
    }

    async fn insert_assignment(&self, assignment: RoleAssignment) -> AppResult<()> {
        self.insert_assignment_impl(assignment).await
    }

    async fn deactivate_assignments_for_subject(&self, subject: &str) -> AppResult<u64> {
        self.deactivate_assignments_for_subject_impl(subject).await
    }
}
