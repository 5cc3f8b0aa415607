use std::str::FromStr;

use caseflow_core::AppError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable audit actions emitted by catalog mutations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    /// Emitted when a module is created.
    ModuleCreated,
    /// Emitted when a module is updated.
    ModuleUpdated,
    /// Emitted when a module is soft-deleted.
    ModuleDeleted,
    /// Emitted when a permission is created.
    PermissionCreated,
    /// Emitted when a permission is updated.
    PermissionUpdated,
    /// Emitted when a permission is soft-deleted.
    PermissionDeleted,
    /// Emitted when a role is created.
    RoleCreated,
    /// Emitted when a role is updated.
    RoleUpdated,
    /// Emitted when a role is soft-deleted.
    RoleDeleted,
    /// Emitted when a role's active permission set is replaced.
    RolePermissionsUpdated,
    /// Emitted when a role is assigned to a subject.
    RoleAssigned,
    /// Emitted when all of a subject's roles are revoked.
    RolesRevoked,
}

impl AuditAction {
    /// Returns a stable storage value for this action.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ModuleCreated => "module_created",
            Self::ModuleUpdated => "module_updated",
            Self::ModuleDeleted => "module_deleted",
            Self::PermissionCreated => "permission_created",
            Self::PermissionUpdated => "permission_updated",
            Self::PermissionDeleted => "permission_deleted",
            Self::RoleCreated => "role_created",
            Self::RoleUpdated => "role_updated",
            Self::RoleDeleted => "role_deleted",
            Self::RolePermissionsUpdated => "role_permissions_updated",
            Self::RoleAssigned => "role_assigned",
            Self::RolesRevoked => "roles_revoked",
        }
    }
}

impl FromStr for AuditAction {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "module_created" => Ok(Self::ModuleCreated),
            "module_updated" => Ok(Self::ModuleUpdated),
            "module_deleted" => Ok(Self::ModuleDeleted),
            "permission_created" => Ok(Self::PermissionCreated),
            "permission_updated" => Ok(Self::PermissionUpdated),
            "permission_deleted" => Ok(Self::PermissionDeleted),
            "role_created" => Ok(Self::RoleCreated),
            "role_updated" => Ok(Self::RoleUpdated),
            "role_deleted" => Ok(Self::RoleDeleted),
            "role_permissions_updated" => Ok(Self::RolePermissionsUpdated),
            "role_assigned" => Ok(Self::RoleAssigned),
            "roles_revoked" => Ok(Self::RolesRevoked),
            _ => Err(AppError::Validation(format!(
                "unknown audit action '{value}'"
            ))),
        }
    }
}

/// Immutable record of one catalog mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Stable entry identifier.
    pub id: Uuid,
    /// Subject of the acting principal, or the visitor sentinel.
    pub actor: String,
    /// Stable action tag.
    pub action: String,
    /// Mutated entity type label.
    pub target_type: String,
    /// Mutated entity identifier.
    pub target_id: String,
    /// Optional detail payload, JSON text for before/after summaries.
    pub detail: Option<String>,
    /// Caller network address, when the transport captured one.
    pub remote_addr: Option<String>,
    /// Caller agent string, when the transport captured one.
    pub user_agent: Option<String>,
    /// Entry timestamp.
    pub recorded_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::AuditAction;

    #[test]
    fn audit_action_roundtrip_storage_value() {
        let action = AuditAction::RolePermissionsUpdated;
        let restored = AuditAction::from_str(action.as_str());
        assert!(restored.is_ok());
        assert_eq!(restored.unwrap_or(AuditAction::RoleCreated), action);
    }

    #[test]
    fn unknown_audit_action_is_rejected() {
        assert!(AuditAction::from_str("role_renamed").is_err());
    }
}
