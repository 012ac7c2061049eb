/// Custom property values
///
/// One row per (entity, property). `entity_id` is polymorphic (a task or a
/// project, per `entity_type`) and therefore has no foreign key; the owning
/// entity's delete path removes its values in the same transaction.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE custom_property_values (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     custom_property_id UUID NOT NULL REFERENCES custom_properties(id) ON DELETE CASCADE,
///     entity_id UUID NOT NULL,
///     entity_type property_entity_type NOT NULL,
///     value JSONB NOT NULL,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     CONSTRAINT custom_property_values_entity_property_key
///         UNIQUE (entity_id, custom_property_id)
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::types::Json;
use sqlx::PgExecutor;
use uuid::Uuid;

use super::custom_property::{PropertyEntityType, PropertyType};
use crate::properties::options::PropertyOptions;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct PropertyValue {
    pub id: Uuid,
    pub custom_property_id: Uuid,
    pub entity_id: Uuid,
    pub entity_type: PropertyEntityType,
    pub value: JsonValue,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Value joined with its definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct EntityPropertyValue {
    pub custom_property_id: Uuid,
    pub name: String,
    pub property_type: PropertyType,
    pub options: Json<PropertyOptions>,
    pub value: JsonValue,
    pub updated_at: DateTime<Utc>,
}

impl PropertyValue {
    /// Inserts or overwrites the value of `custom_property_id` on `entity_id`
    pub async fn upsert<'e, E>(
        executor: E,
        custom_property_id: Uuid,
        entity_id: Uuid,
        entity_type: PropertyEntityType,
        value: JsonValue,
    ) -> Result<Self, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, PropertyValue>(
            r#"
            INSERT INTO custom_property_values (custom_property_id, entity_id, entity_type, value)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (entity_id, custom_property_id)
            DO UPDATE SET value = EXCLUDED.value, updated_at = NOW()
            RETURNING id, custom_property_id, entity_id, entity_type, value, created_at, updated_at
            "#,
        )
        .bind(custom_property_id)
        .bind(entity_id)
        .bind(entity_type)
        .bind(value)
        .fetch_one(executor)
        .await
    }

    /// Deletes one value
    ///
    /// # Returns
    ///
    /// `true` if a value existed
    pub async fn delete<'e, E>(
        executor: E,
        custom_property_id: Uuid,
        entity_id: Uuid,
    ) -> Result<bool, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let result = sqlx::query(
            "DELETE FROM custom_property_values WHERE custom_property_id = $1 AND entity_id = $2",
        )
        .bind(custom_property_id)
        .bind(entity_id)
        .execute(executor)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// All values on one entity, ordered by property name
    pub async fn list_for_entity<'e, E>(
        executor: E,
        entity_id: Uuid,
        entity_type: PropertyEntityType,
    ) -> Result<Vec<EntityPropertyValue>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, EntityPropertyValue>(
            r#"
            SELECT v.custom_property_id, p.name, p.property_type, p.options, v.value, v.updated_at
            FROM custom_property_values v
            JOIN custom_properties p ON p.id = v.custom_property_id
            WHERE v.entity_id = $1 AND v.entity_type = $2
            ORDER BY LOWER(p.name), p.id
            "#,
        )
        .bind(entity_id)
        .bind(entity_type)
        .fetch_all(executor)
        .await
    }

    /// Removes every value attached to one entity
    pub async fn delete_for_entity<'e, E>(
        executor: E,
        entity_id: Uuid,
        entity_type: PropertyEntityType,
    ) -> Result<u64, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let result = sqlx::query(
            "DELETE FROM custom_property_values WHERE entity_id = $1 AND entity_type = $2",
        )
        .bind(entity_id)
        .bind(entity_type)
        .execute(executor)
        .await?;

        Ok(result.rows_affected())
    }

    /// Removes the values of every task in a project
    pub async fn delete_for_project_tasks<'e, E>(
        executor: E,
        project_id: Uuid,
    ) -> Result<u64, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let result = sqlx::query(
            r#"
            DELETE FROM custom_property_values
            WHERE entity_type = 'task'
              AND entity_id IN (SELECT id FROM tasks WHERE project_id = $1)
            "#,
        )
        .bind(project_id)
        .execute(executor)
        .await?;

        Ok(result.rows_affected())
    }

    /// Removes every value defined by an organization's properties
    pub async fn delete_for_organization<'e, E>(
        executor: E,
        organization_id: Uuid,
    ) -> Result<u64, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let result = sqlx::query(
            r#"
            DELETE FROM custom_property_values v
            USING custom_properties p
            WHERE v.custom_property_id = p.id AND p.organization_id = $1
            "#,
        )
        .bind(organization_id)
        .execute(executor)
        .await?;

        Ok(result.rows_affected())
    }
}
