use caseflow_core::{AppError, Principal};

use crate::{AccessResolver, PermissionSet};

/// Successful outcome of a guard check.
///
/// Carries the acting principal and the resolved permission-set snapshot so
/// downstream code (audit capture, UI affordances) needs no second
/// resolution round-trip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grant {
    principal: Principal,
    permissions: PermissionSet,
}

impl Grant {
    /// Returns the principal the check was evaluated against.
    #[must_use]
    pub fn principal(&self) -> &Principal {
        &self.principal
    }

    /// Returns the permission-set snapshot taken during the check.
    #[must_use]
    pub fn permissions(&self) -> &PermissionSet {
        &self.permissions
    }
}

/// Rejected outcome of a guard check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Denial {
    /// The request carries no principal at all.
    Unauthenticated,
    /// The principal is known but lacks the required permission.
    Forbidden {
        /// The permission requirement that was not satisfied.
        missing: String,
    },
    /// The permission set could not be computed.
    ResolutionFailed {
        /// Wrapped resolution error text.
        message: String,
    },
}

impl Denial {
    /// Returns the small stable code handlers map onto transport statuses.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Unauthenticated => "unauthenticated",
            Self::Forbidden { .. } => "forbidden",
            Self::ResolutionFailed { .. } => "resolution_failed",
        }
    }
}

impl From<Denial> for AppError {
    fn from(denial: Denial) -> Self {
        match denial {
            Denial::Unauthenticated => {
                Self::Unauthorized("request carries no principal".to_owned())
            }
            Denial::Forbidden { missing } => {
                Self::Forbidden(format!("missing permission '{missing}'"))
            }
            Denial::ResolutionFailed { message } => Self::ResolutionFailed(message),
        }
    }
}

/// Reusable permission check invoked at the boundary of protected operations.
///
/// Guards only read through the resolver's cache; they never write. A
/// resolution failure is always a denial, never a silent allow.
#[derive(Clone)]
pub struct Guard {
    resolver: AccessResolver,
}

impl Guard {
    /// Creates a guard over a resolver.
    #[must_use]
    pub fn new(resolver: AccessResolver) -> Self {
        Self { resolver }
    }

    /// Requires a single permission.
    pub async fn require(
        &self,
        principal: Option<&Principal>,
        permission: &str,
    ) -> Result<Grant, Denial> {
        self.require_all(principal, &[permission]).await
    }

    /// Requires at least one of the given permissions, checked in the order
    /// provided and short-circuiting on the first satisfied one.
    pub async fn require_any(
        &self,
        principal: Option<&Principal>,
        permissions: &[&str],
    ) -> Result<Grant, Denial> {
        let (principal, resolved) = self.snapshot(principal).await?;
        for name in permissions {
            if resolved.contains(name) {
                return Ok(Grant {
                    principal,
                    permissions: resolved,
                });
            }
        }

        Err(Denial::Forbidden {
            missing: permissions.join(" | "),
        })
    }

    /// Requires every one of the given permissions, checked in the order
    /// provided and short-circuiting on the first unsatisfied one.
    pub async fn require_all(
        &self,
        principal: Option<&Principal>,
        permissions: &[&str],
    ) -> Result<Grant, Denial> {
        let (principal, resolved) = self.snapshot(principal).await?;
        for name in permissions {
            if !resolved.contains(name) {
                return Err(Denial::Forbidden {
                    missing: (*name).to_owned(),
                });
            }
        }

        Ok(Grant {
            principal,
            permissions: resolved,
        })
    }

    async fn snapshot(
        &self,
        principal: Option<&Principal>,
    ) -> Result<(Principal, PermissionSet), Denial> {
        let principal = principal.ok_or(Denial::Unauthenticated)?;
        match self.resolver.resolve(principal).await {
            Ok(permissions) => Ok((principal.clone(), permissions)),
            Err(error) => Err(Denial::ResolutionFailed {
                message: error.to_string(),
            }),
        }
    }
}
