//! Infrastructure adapters for the Caseflow access-control ports.

#![forbid(unsafe_code)]

mod in_memory_rule_repository;
mod postgres_audit_log_repository;
mod postgres_audit_repository;
mod postgres_rule_repository;

pub use in_memory_rule_repository::InMemoryRuleRepository;
pub use postgres_audit_log_repository::PostgresAuditLogRepository;
pub use postgres_audit_repository::PostgresAuditRepository;
pub use postgres_rule_repository::PostgresRuleRepository;
