use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

/// Identity a permission check is evaluated against.
///
/// Anonymous traffic is represented by the `Visitor` sentinel rather than the
/// absence of a principal; "no principal at all" is modelled as
/// `Option::<Principal>::None` at guard entry points.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "subject")]
pub enum Principal {
    /// An authenticated user identified by a stable subject claim.
    User(String),
    /// The anonymous-visitor sentinel.
    Visitor,
}

impl Principal {
    /// Creates a principal for an authenticated subject.
    #[must_use]
    pub fn user(subject: impl Into<String>) -> Self {
        Self::User(subject.into())
    }

    /// Returns the subject claim for authenticated principals.
    #[must_use]
    pub fn subject(&self) -> Option<&str> {
        match self {
            Self::User(subject) => Some(subject.as_str()),
            Self::Visitor => None,
        }
    }

    /// Returns whether this principal is the anonymous-visitor sentinel.
    #[must_use]
    pub fn is_visitor(&self) -> bool {
        matches!(self, Self::Visitor)
    }
}

impl Display for Principal {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::User(subject) => write!(formatter, "{subject}"),
            Self::Visitor => write!(formatter, "visitor"),
        }
    }
}

/// Request provenance captured for audit trails.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestContext {
    remote_addr: Option<String>,
    user_agent: Option<String>,
}

impl RequestContext {
    /// Creates provenance data from transport-level request metadata.
    #[must_use]
    pub fn new(remote_addr: Option<String>, user_agent: Option<String>) -> Self {
        Self {
            remote_addr,
            user_agent,
        }
    }

    /// Returns the caller network address, if the transport captured one.
    #[must_use]
    pub fn remote_addr(&self) -> Option<&str> {
        self.remote_addr.as_deref()
    }

    /// Returns the caller agent string, if the transport captured one.
    #[must_use]
    pub fn user_agent(&self) -> Option<&str> {
        self.user_agent.as_deref()
    }
}

/// Acting identity handed to write paths: a principal plus request provenance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    principal: Principal,
    context: RequestContext,
}

impl Actor {
    /// Creates an actor from an authenticated principal and request metadata.
    #[must_use]
    pub fn new(principal: Principal, context: RequestContext) -> Self {
        Self { principal, context }
    }

    /// Returns the acting principal.
    #[must_use]
    pub fn principal(&self) -> &Principal {
        &self.principal
    }

    /// Returns the request provenance for audit capture.
    #[must_use]
    pub fn context(&self) -> &RequestContext {
        &self.context
    }
}

#[cfg(test)]
mod tests {
    use super::{Actor, Principal, RequestContext};

    #[test]
    fn visitor_has_no_subject() {
        assert!(Principal::Visitor.subject().is_none());
        assert!(Principal::Visitor.is_visitor());
    }

    #[test]
    fn user_principal_displays_subject() {
        let principal = Principal::user("alice");
        assert_eq!(principal.to_string(), "alice");
        assert_eq!(principal.subject(), Some("alice"));
    }

    #[test]
    fn actor_exposes_provenance() {
        let actor = Actor::new(
            Principal::user("alice"),
            RequestContext::new(Some("203.0.113.7".to_owned()), None),
        );
        assert_eq!(actor.context().remote_addr(), Some("203.0.113.7"));
        assert!(actor.context().user_agent().is_none());
    }
}
