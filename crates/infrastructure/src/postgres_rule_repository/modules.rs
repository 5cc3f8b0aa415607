use super::*;

impl PostgresRuleRepository {
    pub(super) async fn find_module_by_id_impl(
        &self,
        id: Uuid,
    ) -> AppResult<Option<ModuleDefinition>> {
        let row = sqlx::query_as::<_, ModuleRow>(
            r#"
            SELECT id, name, label, icon, color, sort_order, is_system, is_active
            FROM access_modules
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| store_error("failed to load module", error))?;

        Ok(row.map(ModuleDefinition::from))
    }

    pub(super) async fn find_active_module_by_name_impl(
        &self,
        name: &str,
    ) -> AppResult<Option<ModuleDefinition>> {
        let row = sqlx::query_as::<_, ModuleRow>(
            r#"
            SELECT id, name, label, icon, color, sort_order, is_system, is_active
            FROM access_modules
            WHERE name = $1 AND is_active
            LIMIT 1
            "#,
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| store_error("failed to load module by name", error))?;

        Ok(row.map(ModuleDefinition::from))
    }

    pub(super) async fn max_module_sort_order_impl(&self) -> AppResult<Option<i32>> {
        sqlx::query_scalar::<_, Option<i32>>(
            r#"
            SELECT MAX(sort_order)
            FROM access_modules
            "#,
        )
        .fetch_one(&self.pool)
        .await
        .map_err(|error| store_error("failed to load module sort order", error))
    }

    pub(super) async fn list_modules_impl(
        &self,
        include_inactive: bool,
    ) -> AppResult<Vec<ModuleDefinition>> {
        let rows = sqlx::query_as::<_, ModuleRow>(
            r#"
            SELECT id, name, label, icon, color, sort_order, is_system, is_active
            FROM access_modules
            WHERE is_active OR $1
            ORDER BY sort_order, name
            "#,
        )
        .bind(include_inactive)
        .fetch_all(&self.pool)
        .await
        .map_err(|error| store_error("failed to list modules", error))?;

        Ok(rows.into_iter().map(ModuleDefinition::from).collect())
    }

    pub(super) async fn insert_module_impl(&self, module: ModuleDefinition) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO access_modules (id, name, label, icon, color, sort_order, is_system, is_active)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(module.id)
        .bind(module.name.as_str())
        .bind(module.label.as_str())
        .bind(module.icon.as_deref())
        .bind(module.color.as_deref())
        .bind(module.sort_order)
        .bind(module.is_system)
        .bind(module.is_active)
        .execute(&self.pool)
        .await
        .map_err(|error| {
            unique_conflict(
                error,
                format!("module '{}' already exists", module.name),
                "failed to insert module",
            )
        })?;

        Ok(())
    }

    pub(super) async fn update_module_impl(&self, module: ModuleDefinition) -> AppResult<()> {
        let rows_affected = sqlx::query(
            r#"
            UPDATE access_modules
            SET name = $2, label = $3, icon = $4, color = $5, sort_order = $6, is_active = $7
            WHERE id = $1
            "#,
        )
        .bind(module.id)
        .bind(module.name.as_str())
        .bind(module.label.as_str())
        .bind(module.icon.as_deref())
        .bind(module.color.as_deref())
        .bind(module.sort_order)
        .bind(module.is_active)
        .execute(&self.pool)
        .await
        .map_err(|error| {
            unique_conflict(
                error,
                format!("module '{}' already exists", module.name),
                "failed to update module",
            )
        })?
        .rows_affected();

        if rows_affected == 0 {
            return Err(AppError::NotFound(format!(
                "module '{}' was not found",
                module.id
            )));
        }

        Ok(())
    }
}
