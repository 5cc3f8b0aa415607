use caseflow_core::{AppError, AppResult, NonEmptyString};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Name of the role substituted for anonymous-visitor principals.
pub const VISITOR_ROLE: &str = "visitor";

/// Capability required to mutate the rule catalog.
pub const ACCESS_MANAGE: &str = "access:manage";

/// Capability required to read the audit trail.
pub const AUDIT_READ: &str = "audit:read";

/// Separator between resource and action in a permission name.
pub const PERMISSION_NAME_SEPARATOR: char = ':';

/// Splits a permission name into its resource and action halves.
///
/// Returns `None` when either half would be blank, so callers can distinguish
/// a repairable name from an unusable one.
#[must_use]
pub fn split_permission_name(name: &str) -> Option<(&str, &str)> {
    let (resource, action) = name.split_once(PERMISSION_NAME_SEPARATOR)?;
    if resource.trim().is_empty() || action.trim().is_empty() {
        return None;
    }

    Some((resource, action))
}

/// Logical grouping of permissions for display and management.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleDefinition {
    /// Stable module identifier.
    pub id: Uuid,
    /// Unique name among active modules.
    pub name: String,
    /// Human-friendly label.
    pub label: String,
    /// Opaque presentation hint.
    pub icon: Option<String>,
    /// Opaque presentation hint.
    pub color: Option<String>,
    /// Position within admin listings.
    pub sort_order: i32,
    /// Indicates a platform-seeded module protected from mutation.
    pub is_system: bool,
    /// Soft-delete flag.
    pub is_active: bool,
}

impl ModuleDefinition {
    /// Creates a validated module definition.
    pub fn new(
        id: Uuid,
        name: impl Into<String>,
        label: impl Into<String>,
        icon: Option<String>,
        color: Option<String>,
        sort_order: i32,
    ) -> AppResult<Self> {
        Ok(Self {
            id,
            name: NonEmptyString::new(name)?.into(),
            label: NonEmptyString::new(label)?.into(),
            icon,
            color,
            sort_order,
            is_system: false,
            is_active: true,
        })
    }
}

/// An atomic capability owned by a module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionDefinition {
    /// Stable permission identifier.
    pub id: Uuid,
    /// Globally unique name among active permissions, `resource:action`.
    pub name: String,
    /// Human-friendly label.
    pub label: String,
    /// Protected resource identifier, never blank.
    pub resource: String,
    /// Action on the resource, never blank.
    pub action: String,
    /// Owning module.
    pub module_id: Uuid,
    /// Indicates a platform-seeded permission protected from mutation.
    pub is_system: bool,
    /// Soft-delete flag.
    pub is_active: bool,
}

impl PermissionDefinition {
    /// Creates a validated permission definition.
    ///
    /// Resource and action must both be non-blank; this is enforced here at
    /// the write boundary rather than repaired after the fact.
    pub fn new(
        id: Uuid,
        name: impl Into<String>,
        label: impl Into<String>,
        resource: impl Into<String>,
        action: impl Into<String>,
        module_id: Uuid,
    ) -> AppResult<Self> {
        let resource = resource.into();
        let action = action.into();
        if resource.trim().is_empty() {
            return Err(AppError::Validation(
                "permission resource must not be blank".to_owned(),
            ));
        }
        if action.trim().is_empty() {
            return Err(AppError::Validation(
                "permission action must not be blank".to_owned(),
            ));
        }

        Ok(Self {
            id,
            name: NonEmptyString::new(name)?.into(),
            label: NonEmptyString::new(label)?.into(),
            resource,
            action,
            module_id,
            is_system: false,
            is_active: true,
        })
    }

    /// Repairs blank resource/action fields on a stored row by deriving both
    /// halves from the permission name.
    ///
    /// Rows written through the current write path never need this; it exists
    /// for catalogs migrated from stores that allowed blank fields.
    pub fn repaired(mut self) -> AppResult<Self> {
        if !self.resource.trim().is_empty() && !self.action.trim().is_empty() {
            return Ok(self);
        }

        let (resource, action) = split_permission_name(self.name.as_str()).ok_or_else(|| {
            AppError::Validation(format!(
                "permission '{}' has blank fields and a name that cannot be split",
                self.name
            ))
        })?;
        self.resource = resource.to_owned();
        self.action = action.to_owned();
        Ok(self)
    }
}

/// A named bundle of permissions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleDefinition {
    /// Stable role identifier.
    pub id: Uuid,
    /// Unique name among active roles.
    pub name: String,
    /// Human-friendly label.
    pub label: String,
    /// Optional coarse privilege level for role comparisons.
    pub level: Option<i32>,
    /// Indicates a platform-seeded role protected from mutation.
    pub is_system: bool,
    /// Soft-delete flag.
    pub is_active: bool,
}

impl RoleDefinition {
    /// Creates a validated role definition.
    pub fn new(
        id: Uuid,
        name: impl Into<String>,
        label: impl Into<String>,
        level: Option<i32>,
    ) -> AppResult<Self> {
        Ok(Self {
            id,
            name: NonEmptyString::new(name)?.into(),
            label: NonEmptyString::new(label)?.into(),
            level,
            is_system: false,
            is_active: true,
        })
    }

    /// Returns whether this role is at least as privileged as another,
    /// comparing optional levels with absent treated as lowest.
    #[must_use]
    pub fn outranks_or_equals(&self, other: &Self) -> bool {
        self.level.unwrap_or(i32::MIN) >= other.level.unwrap_or(i32::MIN)
    }
}

/// Many-to-many link between a role and a permission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RolePermissionLink {
    /// Linked role.
    pub role_id: Uuid,
    /// Linked permission.
    pub permission_id: Uuid,
    /// Soft link-removal flag; at most one active link per pair.
    pub is_active: bool,
}

/// Assignment of a role to a principal subject.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleAssignment {
    /// Assigned subject.
    pub subject: String,
    /// Assigned role.
    pub role_id: Uuid,
    /// Soft revocation flag; revocation never deletes history.
    pub is_active: bool,
    /// Assignment timestamp.
    pub assigned_at: DateTime<Utc>,
    /// Subject of the actor who made the assignment.
    pub assigned_by: String,
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::{PermissionDefinition, RoleDefinition, split_permission_name};

    #[test]
    fn permission_name_splits_on_separator() {
        assert_eq!(
            split_permission_name("cases:approve"),
            Some(("cases", "approve"))
        );
        assert!(split_permission_name("cases").is_none());
        assert!(split_permission_name("cases:").is_none());
        assert!(split_permission_name(":approve").is_none());
    }

    #[test]
    fn permission_rejects_blank_resource() {
        let result = PermissionDefinition::new(
            Uuid::new_v4(),
            "cases:approve",
            "Approve cases",
            "  ",
            "approve",
            Uuid::new_v4(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn blank_stored_fields_are_repaired_from_name() {
        let stored = PermissionDefinition {
            id: Uuid::new_v4(),
            name: "cases:approve".to_owned(),
            label: "Approve cases".to_owned(),
            resource: String::new(),
            action: String::new(),
            module_id: Uuid::new_v4(),
            is_system: false,
            is_active: true,
        };

        let repaired = stored.repaired();
        assert!(repaired.is_ok());
        let repaired = repaired.unwrap_or_else(|_| unreachable!());
        assert_eq!(repaired.resource, "cases");
        assert_eq!(repaired.action, "approve");
    }

    #[test]
    fn unsplittable_blank_permission_is_rejected() {
        let stored = PermissionDefinition {
            id: Uuid::new_v4(),
            name: "legacy".to_owned(),
            label: "Legacy".to_owned(),
            resource: String::new(),
            action: String::new(),
            module_id: Uuid::new_v4(),
            is_system: false,
            is_active: true,
        };

        assert!(stored.repaired().is_err());
    }

    #[test]
    fn role_level_comparison_treats_absent_as_lowest() {
        let admin = RoleDefinition::new(Uuid::new_v4(), "admin", "Admin", Some(90));
        let viewer = RoleDefinition::new(Uuid::new_v4(), "viewer", "Viewer", None);
        assert!(admin.is_ok());
        assert!(viewer.is_ok());
        let admin = admin.unwrap_or_else(|_| unreachable!());
        let viewer = viewer.unwrap_or_else(|_| unreachable!());
        assert!(admin.outranks_or_equals(&viewer));
        assert!(!viewer.outranks_or_equals(&admin));
    }
}
