/// Custom property definitions
///
/// A definition names a typed field that an organization attaches to its
/// tasks or projects. Names are unique per (organization, entity type)
/// ignoring case. `entity_type` and `property_type` are fixed at creation;
/// only the name and options change afterwards.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE property_entity_type AS ENUM ('task', 'project');
/// CREATE TYPE property_type AS ENUM (
///     'text', 'number', 'date', 'datetime', 'select', 'multi_select', 'user'
/// );
///
/// CREATE TABLE custom_properties (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     organization_id UUID NOT NULL REFERENCES organizations(id) ON DELETE CASCADE,
///     name VARCHAR(100) NOT NULL,
///     entity_type property_entity_type NOT NULL,
///     property_type property_type NOT NULL,
///     options JSONB NOT NULL DEFAULT '{}',
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// CREATE UNIQUE INDEX custom_properties_name_key
///     ON custom_properties (organization_id, entity_type, LOWER(name));
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::{PgExecutor, PgPool, Postgres, QueryBuilder};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::properties::options::PropertyOptions;
use crate::query::sort::CustomPropertySortField;
use crate::query::{fetch_page, Paginated, Pagination, Sort};

/// Kind of entity a property attaches to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "property_entity_type", rename_all = "lowercase")]
#[serde(rename_all = "UPPERCASE")]
pub enum PropertyEntityType {
    Task,
    Project,
}

impl PropertyEntityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PropertyEntityType::Task => "TASK",
            PropertyEntityType::Project => "PROJECT",
        }
    }
}

impl fmt::Display for PropertyEntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PropertyEntityType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "TASK" => Ok(PropertyEntityType::Task),
            "PROJECT" => Ok(PropertyEntityType::Project),
            other => Err(format!("Unknown entity type '{}'", other)),
        }
    }
}

/// Value type of a property
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "property_type", rename_all = "snake_case")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PropertyType {
    Text,
    Number,
    Date,
    Datetime,
    Select,
    MultiSelect,
    User,
}

impl PropertyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PropertyType::Text => "TEXT",
            PropertyType::Number => "NUMBER",
            PropertyType::Date => "DATE",
            PropertyType::Datetime => "DATETIME",
            PropertyType::Select => "SELECT",
            PropertyType::MultiSelect => "MULTI_SELECT",
            PropertyType::User => "USER",
        }
    }

    /// Whether the type draws its values from a `choices` list
    pub fn uses_choices(&self) -> bool {
        matches!(self, PropertyType::Select | PropertyType::MultiSelect)
    }
}

impl fmt::Display for PropertyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct CustomProperty {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub name: String,
    pub entity_type: PropertyEntityType,
    pub property_type: PropertyType,
    pub options: Json<PropertyOptions>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreateCustomProperty {
    pub organization_id: Uuid,
    pub name: String,
    pub entity_type: PropertyEntityType,
    pub property_type: PropertyType,
    pub options: PropertyOptions,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateCustomProperty {
    pub name: Option<String>,
    pub options: Option<PropertyOptions>,
}

const PROPERTY_COLUMNS: &str =
    "id, organization_id, name, entity_type, property_type, options, created_at, updated_at";

impl CustomProperty {
    pub async fn create<'e, E>(executor: E, data: CreateCustomProperty) -> Result<Self, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, CustomProperty>(
            r#"
            INSERT INTO custom_properties (organization_id, name, entity_type, property_type, options)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, organization_id, name, entity_type, property_type, options,
                      created_at, updated_at
            "#,
        )
        .bind(data.organization_id)
        .bind(data.name.trim())
        .bind(data.entity_type)
        .bind(data.property_type)
        .bind(Json(data.options))
        .fetch_one(executor)
        .await
    }

    pub async fn find_by_id<'e, E>(executor: E, id: Uuid) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, CustomProperty>(
            r#"
            SELECT id, organization_id, name, entity_type, property_type, options,
                   created_at, updated_at
            FROM custom_properties
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(executor)
        .await
    }

    /// Lists definitions of an organization, optionally for one entity type
    pub async fn list_by_organization(
        pool: &PgPool,
        organization_id: Uuid,
        entity_type: Option<PropertyEntityType>,
        sort: Sort<CustomPropertySortField>,
        pagination: Pagination,
    ) -> Result<Paginated<Self>, sqlx::Error> {
        fetch_page(
            pool,
            "cp.id, cp.organization_id, cp.name, cp.entity_type, cp.property_type, cp.options, \
             cp.created_at, cp.updated_at",
            |qb: &mut QueryBuilder<'_, Postgres>| {
                qb.push("FROM custom_properties cp WHERE cp.organization_id = ")
                    .push_bind(organization_id);
                if let Some(entity_type) = entity_type {
                    qb.push(" AND cp.entity_type = ").push_bind(entity_type);
                }
            },
            sort,
            pagination,
        )
        .await
    }

    pub async fn update<'e, E>(
        executor: E,
        id: Uuid,
        data: UpdateCustomProperty,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let mut qb: QueryBuilder<'_, Postgres> =
            QueryBuilder::new("UPDATE custom_properties SET updated_at = NOW()");

        if let Some(name) = data.name {
            qb.push(", name = ").push_bind(name.trim().to_string());
        }
        if let Some(options) = data.options {
            qb.push(", options = ").push_bind(Json(options));
        }

        qb.push(" WHERE id = ")
            .push_bind(id)
            .push(" RETURNING ")
            .push(PROPERTY_COLUMNS);

        qb.build_query_as::<CustomProperty>()
            .fetch_optional(executor)
            .await
    }

    /// Deletes a definition; its values cascade
    pub async fn delete<'e, E>(executor: E, id: Uuid) -> Result<bool, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let result = sqlx::query("DELETE FROM custom_properties WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn delete_by_organization<'e, E>(
        executor: E,
        organization_id: Uuid,
    ) -> Result<u64, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let result = sqlx::query("DELETE FROM custom_properties WHERE organization_id = $1")
            .bind(organization_id)
            .execute(executor)
            .await?;

        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_property_type_serde() {
        assert_eq!(
            serde_json::to_string(&PropertyType::MultiSelect).unwrap(),
            "\"MULTI_SELECT\""
        );
        let parsed: PropertyType = serde_json::from_str("\"DATETIME\"").unwrap();
        assert_eq!(parsed, PropertyType::Datetime);
    }

    #[test]
    fn test_uses_choices() {
        assert!(PropertyType::Select.uses_choices());
        assert!(PropertyType::MultiSelect.uses_choices());
        assert!(!PropertyType::User.uses_choices());
    }

    #[test]
    fn test_entity_type_from_str() {
        assert_eq!("task".parse::<PropertyEntityType>().unwrap(), PropertyEntityType::Task);
        assert_eq!("PROJECT".parse::<PropertyEntityType>().unwrap(), PropertyEntityType::Project);
        assert!("comment".parse::<PropertyEntityType>().is_err());
    }
}
