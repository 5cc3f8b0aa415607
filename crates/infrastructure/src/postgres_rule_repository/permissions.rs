use super::*;

impl PostgresRuleRepository {
    pub(super) async fn find_permission_by_id_impl(
        &self,
        id: Uuid,
    ) -> AppResult<Option<PermissionDefinition>> {
        let row = sqlx::query_as::<_, PermissionRow>(
            r#"
            SELECT id, name, label, resource, action, module_id, is_system, is_active
            FROM access_permissions
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| store_error("failed to load permission", error))?;

        row.map(PermissionRow::into_definition).transpose()
    }

    pub(super) async fn find_active_permission_by_name_impl(
        &self,
        name: &str,
    ) -> AppResult<Option<PermissionDefinition>> {
        let row = sqlx::query_as::<_, PermissionRow>(
            r#"
            SELECT id, name, label, resource, action, module_id, is_system, is_active
            FROM access_permissions
            WHERE name = $1 AND is_active
            LIMIT 1
            "#,
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| store_error("failed to load permission by name", error))?;

        row.map(PermissionRow::into_definition).transpose()
    }

    pub(super) async fn list_permissions_for_module_impl(
        &self,
        module_id: Uuid,
        include_inactive: bool,
    ) -> AppResult<Vec<PermissionDefinition>> {
        let rows = sqlx::query_as::<_, PermissionRow>(
            r#"
            SELECT id, name, label, resource, action, module_id, is_system, is_active
            FROM access_permissions
            WHERE module_id = $1 AND (is_active OR $2)
            ORDER BY name
            "#,
        )
        .bind(module_id)
        .bind(include_inactive)
        .fetch_all(&self.pool)
        .await
        .map_err(|error| store_error("failed to list module permissions", error))?;

        rows.into_iter()
            .map(PermissionRow::into_definition)
            .collect()
    }

    pub(super) async fn list_active_permissions_by_ids_impl(
        &self,
        ids: &[Uuid],
    ) -> AppResult<Vec<PermissionDefinition>> {
        let rows = sqlx::query_as::<_, PermissionRow>(
            r#"
            SELECT id, name, label, resource, action, module_id, is_system, is_active
            FROM access_permissions
            WHERE id = ANY($1) AND is_active
            "#,
        )
        .bind(ids.to_vec())
        .fetch_all(&self.pool)
        .await
        .map_err(|error| store_error("failed to list permissions by ids", error))?;

        rows.into_iter()
            .map(PermissionRow::into_definition)
            .collect()
    }

    pub(super) async fn insert_permission_impl(
        &self,
        permission: PermissionDefinition,
    ) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO access_permissions (id, name, label, resource, action, module_id, is_system, is_active)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(permission.id)
        .bind(permission.name.as_str())
        .bind(permission.label.as_str())
        .bind(permission.resource.as_str())
        .bind(permission.action.as_str())
        .bind(permission.module_id)
        .bind(permission.is_system)
        .bind(permission.is_active)
        .execute(&self.pool)
        .await
        .map_err(|error| {
            unique_conflict(
                error,
                format!("permission '{}' already exists", permission.name),
                "failed to insert permission",
            )
        })?;

        Ok(())
    }

    pub(super) async fn update_permission_impl(
        &self,
        permission: PermissionDefinition,
    ) -> AppResult<()> {
        let rows_affected = sqlx::query(
            r#"
            UPDATE access_permissions
            SET name = $2, label = $3, resource = $4, action = $5, module_id = $6, is_active = $7
            WHERE id = $1
            "#,
        )
        .bind(permission.id)
        .bind(permission.name.as_str())
        .bind(permission.label.as_str())
        .bind(permission.resource.as_str())
        .bind(permission.action.as_str())
        .bind(permission.module_id)
        .bind(permission.is_active)
        .execute(&self.pool)
        .await
        .map_err(|error| {
            unique_conflict(
                error,
                format!("permission '{}' already exists", permission.name),
                "failed to update permission",
            )
        })?
        .rows_affected();

        if rows_affected == 0 {
            return Err(AppError::NotFound(format!(
                "permission '{}' was not found",
                permission.id
            )));
        }

        Ok(())
    }
}
