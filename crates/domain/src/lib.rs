//! Domain entities and invariants for the Caseflow access-control core.

#![forbid(unsafe_code)]

mod access;
mod audit;

pub use access::{
    ACCESS_MANAGE, AUDIT_READ, ModuleDefinition, PERMISSION_NAME_SEPARATOR, PermissionDefinition,
    RoleAssignment, RoleDefinition, RolePermissionLink, VISITOR_ROLE, split_permission_name,
};
pub use audit::{AuditAction, AuditEntry};
