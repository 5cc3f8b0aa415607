use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use caseflow_core::AppResult;
use caseflow_domain::{
    AuditAction, AuditEntry, ModuleDefinition, PermissionDefinition, RoleAssignment,
    RoleDefinition,
};

/// Input payload for creating a module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateModuleInput {
    /// Unique name among active modules.
    pub name: String,
    /// Human-friendly label.
    pub label: String,
    /// Opaque presentation hint.
    pub icon: Option<String>,
    /// Opaque presentation hint.
    pub color: Option<String>,
    /// Listing position; defaults to max existing + 1 when absent.
    pub sort_order: Option<i32>,
}

/// Partial update for a module; absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModulePatch {
    /// Replacement name.
    pub name: Option<String>,
    /// Replacement label.
    pub label: Option<String>,
    /// Replacement icon hint.
    pub icon: Option<String>,
    /// Replacement color hint.
    pub color: Option<String>,
    /// Replacement listing position.
    pub sort_order: Option<i32>,
}

/// Input payload for creating a permission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatePermissionInput {
    /// Globally unique name among active permissions, `resource:action`.
    pub name: String,
    /// Human-friendly label.
    pub label: String,
    /// Protected resource identifier.
    pub resource: String,
    /// Action on the resource.
    pub action: String,
    /// Owning module.
    pub module_id: Uuid,
}

/// Partial update for a permission; absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PermissionPatch {
    /// Replacement name.
    pub name: Option<String>,
    /// Replacement label.
    pub label: Option<String>,
    /// Replacement resource identifier.
    pub resource: Option<String>,
    /// Replacement action.
    pub action: Option<String>,
    /// Replacement owning module.
    pub module_id: Option<Uuid>,
}

/// Input payload for creating a role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateRoleInput {
    /// Unique name among active roles.
    pub name: String,
    /// Human-friendly label.
    pub label: String,
    /// Optional coarse privilege level.
    pub level: Option<i32>,
}

/// Partial update for a role; absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RolePatch {
    /// Replacement name.
    pub name: Option<String>,
    /// Replacement label.
    pub label: Option<String>,
    /// Replacement privilege level.
    pub level: Option<i32>,
}

/// Repository port for permission-resolution reads.
#[async_trait]
pub trait AccessReadRepository: Send + Sync {
    /// Lists active role assignments for a subject.
    async fn list_active_assignments(&self, subject: &str) -> AppResult<Vec<RoleAssignment>>;

    /// Finds an active role by its unique name.
    async fn find_active_role_by_name(&self, name: &str) -> AppResult<Option<RoleDefinition>>;

    /// Lists permission names linked to a role.
    ///
    /// Names are returned only while the role, the link, and the permission
    /// are all active.
    async fn list_active_permission_names_for_role(&self, role_id: Uuid)
    -> AppResult<Vec<String>>;
}

/// Repository port for rule-catalog administration.
///
/// Multi-row operations (`replace_role_permissions`,
/// `deactivate_assignments_for_subject`) must be all-or-nothing; concurrent
/// writers against the same role's links must be serialized by the adapter.
#[async_trait]
pub trait RuleStoreRepository: Send + Sync {
    /// Finds a module by id regardless of active flag.
    async fn find_module_by_id(&self, id: Uuid) -> AppResult<Option<ModuleDefinition>>;

    /// Finds an active module by its unique name.
    async fn find_active_module_by_name(&self, name: &str) -> AppResult<Option<ModuleDefinition>>;

    /// Returns the highest sort order among all modules.
    async fn max_module_sort_order(&self) -> AppResult<Option<i32>>;

    /// Lists modules ordered by sort order.
    async fn list_modules(&self, include_inactive: bool) -> AppResult<Vec<ModuleDefinition>>;

    /// Persists a new module row.
    async fn insert_module(&self, module: ModuleDefinition) -> AppResult<()>;

    /// Rewrites an existing module row, including its active flag.
    async fn update_module(&self, module: ModuleDefinition) -> AppResult<()>;

    /// Finds a permission by id regardless of active flag.
    async fn find_permission_by_id(&self, id: Uuid) -> AppResult<Option<PermissionDefinition>>;

    /// Finds an active permission by its unique name.
    async fn find_active_permission_by_name(
        &self,
        name: &str,
    ) -> AppResult<Option<PermissionDefinition>>;

    /// Lists permissions owned by a module, ordered by name.
    async fn list_permissions_for_module(
        &self,
        module_id: Uuid,
        include_inactive: bool,
    ) -> AppResult<Vec<PermissionDefinition>>;

    /// Lists active permissions matching the given ids.
    async fn list_active_permissions_by_ids(
        &self,
        ids: &[Uuid],
    ) -> AppResult<Vec<PermissionDefinition>>;

    /// Persists a new permission row.
    async fn insert_permission(&self, permission: PermissionDefinition) -> AppResult<()>;

    /// Rewrites an existing permission row, including its active flag.
    async fn update_permission(&self, permission: PermissionDefinition) -> AppResult<()>;

    /// Finds a role by id regardless of active flag.
    async fn find_role_by_id(&self, id: Uuid) -> AppResult<Option<RoleDefinition>>;

    /// Finds an active role by its unique name.
    async fn find_active_role_by_name(&self, name: &str) -> AppResult<Option<RoleDefinition>>;

    /// Lists roles ordered by name.
    async fn list_roles(&self, include_inactive: bool) -> AppResult<Vec<RoleDefinition>>;

    /// Persists a new role row.
    async fn insert_role(&self, role: RoleDefinition) -> AppResult<()>;

    /// Rewrites an existing role row, including its active flag.
    async fn update_role(&self, role: RoleDefinition) -> AppResult<()>;

    /// Atomically replaces the role's active link set with exactly the given
    /// permission ids.
    async fn replace_role_permissions(
        &self,
        role_id: Uuid,
        permission_ids: &[Uuid],
    ) -> AppResult<()>;

    /// Finds an active assignment of a role to a subject.
    async fn find_active_assignment(
        &self,
        subject: &str,
        role_id: Uuid,
    ) -> AppResult<Option<RoleAssignment>>;

    /// Persists a new role assignment row.
    async fn insert_assignment(&self, assignment: RoleAssignment) -> AppResult<()>;

    /// Deactivates every active assignment for a subject, returning the count.
    async fn deactivate_assignments_for_subject(&self, subject: &str) -> AppResult<u64>;
}

/// Audit event payload emitted once per successful catalog mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditEvent {
    /// Subject of the acting principal, or the visitor sentinel.
    pub actor: String,
    /// Stable audit action.
    pub action: AuditAction,
    /// Mutated entity type label.
    pub target_type: String,
    /// Mutated entity identifier.
    pub target_id: String,
    /// Optional detail payload, JSON text for before/after summaries.
    pub detail: Option<String>,
    /// Caller network address.
    pub remote_addr: Option<String>,
    /// Caller agent string.
    pub user_agent: Option<String>,
}

/// Port for persisting append-only audit entries.
///
/// The adapter assigns the entry id and timestamp.
#[async_trait]
pub trait AuditRepository: Send + Sync {
    /// Persists one audit event.
    async fn append_entry(&self, event: AuditEvent) -> AppResult<()>;
}

/// Query parameters for audit trail listings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuditLogQuery {
    /// Optional actor filter.
    pub actor: Option<String>,
    /// Optional target entity type filter.
    pub target_type: Option<String>,
    /// Lower timestamp bound, inclusive.
    pub since: Option<DateTime<Utc>>,
    /// Upper timestamp bound, exclusive.
    pub until: Option<DateTime<Utc>>,
    /// Maximum rows returned.
    pub limit: usize,
    /// Number of rows skipped for offset pagination.
    pub offset: usize,
}

/// Repository port for reading the audit trail.
#[async_trait]
pub trait AuditLogRepository: Send + Sync {
    /// Lists audit entries matching the query, newest first.
    async fn list_entries(&self, query: AuditLogQuery) -> AppResult<Vec<AuditEntry>>;
}
