//! Application services and ports for the Caseflow access-control core.

#![forbid(unsafe_code)]

mod access_ports;
mod access_resolver;
mod audit_service;
mod guard;
mod permission_cache;
mod rule_admin_service;

pub use access_ports::{
    AccessReadRepository, AuditEvent, AuditLogQuery, AuditLogRepository, AuditRepository,
    CreateModuleInput, CreatePermissionInput, CreateRoleInput, ModulePatch, PermissionPatch,
    RolePatch, RuleStoreRepository,
};
pub use access_resolver::{AccessResolver, PermissionSet};
pub use audit_service::AuditQueryService;
pub use guard::{Denial, Grant, Guard};
pub use permission_cache::{DEFAULT_CACHE_TTL, PermissionCache};
pub use rule_admin_service::RuleAdminService;
