use super::*;

impl PostgresRuleRepository {
    pub(super) async fn find_role_by_id_impl(&self, id: Uuid) -> AppResult<Option<RoleDefinition>> {
        let row = sqlx::query_as::<_, RoleRow>(
            r#"
            SELECT id, name, label, level, is_system, is_active
            FROM access_roles
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| store_error("failed to load role", error))?;

        Ok(row.map(RoleDefinition::from))
    }

    pub(super) async fn find_active_role_by_name_impl(
        &self,
        name: &str,
    ) -> AppResult<Option<RoleDefinition>> {
        let row = sqlx::query_as::<_, RoleRow>(
            r#"
            SELECT id, name, label, level, is_system, is_active
            FROM access_roles
            WHERE name = $1 AND is_active
            LIMIT 1
            "#,
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| store_error("failed to load role by name", error))?;

        Ok(row.map(RoleDefinition::from))
    }

    pub(super) async fn list_roles_impl(
        &self,
        include_inactive: bool,
    ) -> AppResult<Vec<RoleDefinition>> {
        let rows = sqlx::query_as::<_, RoleRow>(
            r#"
            SELECT id, name, label, level, is_system, is_active
            FROM access_roles
            WHERE is_active OR $1
            ORDER BY name
            "#,
        )
        .bind(include_inactive)
        .fetch_all(&self.pool)
        .await
        .map_err(|error| store_error("failed to list roles", error))?;

        Ok(rows.into_iter().map(RoleDefinition::from).collect())
    }

    pub(super) async fn insert_role_impl(&self, role: RoleDefinition) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO access_roles (id, name, label, level, is_system, is_active)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(role.id)
        .bind(role.name.as_str())
        .bind(role.label.as_str())
        .bind(role.level)
        .bind(role.is_system)
        .bind(role.is_active)
        .execute(&self.pool)
        .await
        .map_err(|error| {
            unique_conflict(
                error,
                format!("role '{}' already exists", role.name),
                "failed to insert role",
            )
        })?;

        Ok(())
    }

    pub(super) async fn update_role_impl(&self, role: RoleDefinition) -> AppResult<()> {
        let rows_affected = sqlx::query(
            r#"
            UPDATE access_roles
            SET name = $2, label = $3, level = $4, is_active = $5
            WHERE id = $1
            "#,
        )
        .bind(role.id)
        .bind(role.name.as_str())
        .bind(role.label.as_str())
        .bind(role.level)
        .bind(role.is_active)
        .execute(&self.pool)
        .await
        .map_err(|error| {
            unique_conflict(
                error,
                format!("role '{}' already exists", role.name),
                "failed to update role",
            )
        })?
        .rows_affected();

        if rows_affected == 0 {
            return Err(AppError::NotFound(format!(
                "role '{}' was not found",
                role.id
            )));
        }

        Ok(())
    }

    pub(super) async fn replace_role_permissions_impl(
        &self,
        role_id: Uuid,
        permission_ids: &[Uuid],
    ) -> AppResult<()> {
        let mut transaction = self
            .pool
            .begin()
            .await
            .map_err(|error| store_error("failed to begin transaction", error))?;

        // Lock the role row so concurrent rewrites of the same link set
        // cannot interleave into a mixed state.
        sqlx::query_scalar::<_, Uuid>(
            r#"
            SELECT id
            FROM access_roles
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(role_id)
        .fetch_optional(&mut *transaction)
        .await
        .map_err(|error| store_error("failed to lock role", error))?
        .ok_or_else(|| AppError::NotFound(format!("role '{role_id}' was not found")))?;

        sqlx::query(
            r#"
            UPDATE access_role_permissions
            SET is_active = FALSE
            WHERE role_id = $1 AND is_active
            "#,
        )
        .bind(role_id)
        .execute(&mut *transaction)
        .await
        .map_err(|error| store_error("failed to deactivate role links", error))?;

        for permission_id in permission_ids {
            sqlx::query(
                r#"
                INSERT INTO access_role_permissions (role_id, permission_id, is_active)
                VALUES ($1, $2, TRUE)
                ON CONFLICT (role_id, permission_id) DO UPDATE
                SET is_active = TRUE
                "#,
            )
            .bind(role_id)
            .bind(permission_id)
            .execute(&mut *transaction)
            .await
            .map_err(|error| store_error("failed to persist role link", error))?;
        }

        transaction
            .commit()
            .await
            .map_err(|error| store_error("failed to commit transaction", error))?;

        tracing::debug!(%role_id, links = permission_ids.len(), "replaced role permission set");
        Ok(())
    }

    pub(super) async fn find_active_assignment_impl(
        &self,
        subject: &str,
        role_id: Uuid,
    ) -> AppResult<Option<RoleAssignment>> {
        let row = sqlx::query_as::<_, AssignmentRow>(
            r#"
            SELECT subject, role_id, is_active, assigned_at, assigned_by
            FROM access_role_assignments
            WHERE subject = $1 AND role_id = $2 AND is_active
            LIMIT 1
            "#,
        )
        .bind(subject)
        .bind(role_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| store_error("failed to load role assignment", error))?;

        Ok(row.map(RoleAssignment::from))
    }

    pub(super) async fn insert_assignment_impl(&self, assignment: RoleAssignment) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO access_role_assignments (subject, role_id, is_active, assigned_at, assigned_by)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(assignment.subject.as_str())
        .bind(assignment.role_id)
        .bind(assignment.is_active)
        .bind(assignment.assigned_at)
        .bind(assignment.assigned_by.as_str())
        .execute(&self.pool)
        .await
        .map_err(|error| store_error("failed to insert role assignment", error))?;

        Ok(())
    }

    pub(super) async fn deactivate_assignments_for_subject_impl(
        &self,
        subject: &str,
    ) -> AppResult<u64> {
        let rows_affected = sqlx::query(
            r#"
            UPDATE access_role_assignments
            SET is_active = FALSE
            WHERE subject = $1 AND is_active
            "#,
        )
        .bind(subject)
        .execute(&self.pool)
        .await
        .map_err(|error| store_error("failed to revoke role assignments", error))?
        .rows_affected();

        Ok(rows_affected)
    }
}
