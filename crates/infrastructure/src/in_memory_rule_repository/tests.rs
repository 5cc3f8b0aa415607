use chrono::Utc;
use uuid::Uuid;

use caseflow_application::{
    AccessReadRepository, AuditEvent, AuditLogQuery, AuditLogRepository, AuditRepository,
    RuleStoreRepository,
};
use caseflow_core::AppError;
use caseflow_domain::{
    AuditAction, ModuleDefinition, PermissionDefinition, RoleAssignment, RoleDefinition,
};

use super::InMemoryRuleRepository;

fn module(name: &str) -> ModuleDefinition {
    ModuleDefinition::new(Uuid::new_v4(), name, name, None, None, 1)
        .unwrap_or_else(|_| unreachable!())
}

fn permission(name: &str, module_id: Uuid) -> PermissionDefinition {
    let (resource, action) = name.split_once(':').unwrap_or(("cases", "read"));
    PermissionDefinition::new(Uuid::new_v4(), name, name, resource, action, module_id)
        .unwrap_or_else(|_| unreachable!())
}

fn role(name: &str) -> RoleDefinition {
    RoleDefinition::new(Uuid::new_v4(), name, name, None).unwrap_or_else(|_| unreachable!())
}

fn assignment(subject: &str, role_id: Uuid) -> RoleAssignment {
    RoleAssignment {
        subject: subject.to_owned(),
        role_id,
        is_active: true,
        assigned_at: Utc::now(),
        assigned_by: "admin-1".to_owned(),
    }
}

fn event(actor: &str, action: AuditAction, target_type: &str) -> AuditEvent {
    AuditEvent {
        actor: actor.to_owned(),
        action,
        target_type: target_type.to_owned(),
        target_id: Uuid::new_v4().to_string(),
        detail: None,
        remote_addr: None,
        user_agent: None,
    }
}

#[tokio::test]
async fn replacing_role_permissions_leaves_exactly_the_new_set() {
    let repository = InMemoryRuleRepository::new();
    let catalog_module = module("cases");
    let module_id = catalog_module.id;
    assert!(repository.insert_module(catalog_module).await.is_ok());

    let read = permission("cases:read", module_id);
    let write = permission("cases:write", module_id);
    let approve = permission("cases:approve", module_id);
    let (read_id, write_id, approve_id) = (read.id, write.id, approve.id);
    for definition in [read, write, approve] {
        assert!(repository.insert_permission(definition).await.is_ok());
    }

    let reviewer = role("reviewer");
    let role_id = reviewer.id;
    assert!(repository.insert_role(reviewer).await.is_ok());

    assert!(
        repository
            .replace_role_permissions(role_id, &[read_id, write_id])
            .await
            .is_ok()
    );
    assert!(
        repository
            .replace_role_permissions(role_id, &[write_id, approve_id])
            .await
            .is_ok()
    );

    let mut names = repository
        .list_active_permission_names_for_role(role_id)
        .await
        .unwrap_or_default();
    names.sort();
    assert_eq!(names, vec!["cases:approve", "cases:write"]);
}

#[tokio::test]
async fn replacing_permissions_of_unknown_role_is_not_found() {
    let repository = InMemoryRuleRepository::new();
    let result = repository
        .replace_role_permissions(Uuid::new_v4(), &[Uuid::new_v4()])
        .await;
    assert!(matches!(result, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn deactivated_role_resolves_no_permission_names() {
    let repository = InMemoryRuleRepository::new();
    let catalog_module = module("cases");
    let module_id = catalog_module.id;
    assert!(repository.insert_module(catalog_module).await.is_ok());

    let read = permission("cases:read", module_id);
    let read_id = read.id;
    assert!(repository.insert_permission(read).await.is_ok());

    let mut reviewer = role("reviewer");
    let role_id = reviewer.id;
    assert!(repository.insert_role(reviewer.clone()).await.is_ok());
    assert!(
        repository
            .replace_role_permissions(role_id, &[read_id])
            .await
            .is_ok()
    );

    reviewer.is_active = false;
    assert!(repository.update_role(reviewer).await.is_ok());

    let names = repository
        .list_active_permission_names_for_role(role_id)
        .await
        .unwrap_or_else(|_| vec!["unexpected".to_owned()]);
    assert!(names.is_empty());
}

#[tokio::test]
async fn duplicate_active_module_name_conflicts_until_soft_deleted() {
    let repository = InMemoryRuleRepository::new();
    let mut first = module("cases");
    assert!(repository.insert_module(first.clone()).await.is_ok());

    let duplicate = repository.insert_module(module("cases")).await;
    assert!(matches!(duplicate, Err(AppError::Conflict(_))));

    first.is_active = false;
    assert!(repository.update_module(first).await.is_ok());
    assert!(repository.insert_module(module("cases")).await.is_ok());
}

#[tokio::test]
async fn revoking_a_subject_counts_only_active_assignments() {
    let repository = InMemoryRuleRepository::new();
    let first = role("reviewer");
    let second = role("editor");
    let (first_id, second_id) = (first.id, second.id);
    assert!(repository.insert_role(first).await.is_ok());
    assert!(repository.insert_role(second).await.is_ok());

    assert!(
        repository
            .insert_assignment(assignment("user-1", first_id))
            .await
            .is_ok()
    );
    assert!(
        repository
            .insert_assignment(assignment("user-1", second_id))
            .await
            .is_ok()
    );
    let mut stale = assignment("user-1", first_id);
    stale.is_active = false;
    assert!(repository.insert_assignment(stale).await.is_ok());
    assert!(
        repository
            .insert_assignment(assignment("user-2", first_id))
            .await
            .is_ok()
    );

    assert_eq!(
        repository
            .deactivate_assignments_for_subject("user-1")
            .await
            .unwrap_or_default(),
        2
    );
    assert_eq!(
        repository
            .deactivate_assignments_for_subject("user-1")
            .await
            .unwrap_or(99),
        0
    );
    assert_eq!(
        repository
            .list_active_assignments("user-2")
            .await
            .unwrap_or_default()
            .len(),
        1
    );
}

#[tokio::test]
async fn audit_listing_applies_filters_and_page_bounds() {
    let repository = InMemoryRuleRepository::new();
    let appends = [
        event("admin-1", AuditAction::ModuleCreated, "module"),
        event("admin-1", AuditAction::RoleCreated, "role"),
        event("admin-2", AuditAction::RoleAssigned, "role_assignment"),
    ];
    for entry in appends {
        assert!(repository.append_entry(entry).await.is_ok());
    }

    let by_actor = repository
        .list_entries(AuditLogQuery {
            actor: Some("admin-1".to_owned()),
            limit: 50,
            ..AuditLogQuery::default()
        })
        .await
        .unwrap_or_default();
    assert_eq!(by_actor.len(), 2);
    assert!(by_actor.iter().all(|entry| entry.actor == "admin-1"));

    let by_target = repository
        .list_entries(AuditLogQuery {
            target_type: Some("role_assignment".to_owned()),
            limit: 50,
            ..AuditLogQuery::default()
        })
        .await
        .unwrap_or_default();
    assert_eq!(by_target.len(), 1);
    assert_eq!(by_target[0].action, "role_assigned");

    let capped = repository
        .list_entries(AuditLogQuery {
            limit: 1,
            ..AuditLogQuery::default()
        })
        .await
        .unwrap_or_default();
    assert_eq!(capped.len(), 1);

    let beyond = repository
        .list_entries(AuditLogQuery {
            limit: 50,
            offset: 3,
            ..AuditLogQuery::default()
        })
        .await
        .unwrap_or_else(|_| vec![by_target[0].clone()]);
    assert!(beyond.is_empty());
}
