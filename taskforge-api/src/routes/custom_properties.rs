/// Custom property endpoints
///
/// Definitions:
///
/// - `POST /v1/organizations/:org_id/custom-properties` - managers
/// - `GET /v1/organizations/:org_id/custom-properties` - `?entity_type=TASK`
/// - `GET|PATCH|DELETE /v1/custom-properties/:property_id`
///
/// Values:
///
/// - `PUT /v1/custom-properties/:property_id/values/:entity_id` - `{ "value": ... }`
/// - `DELETE /v1/custom-properties/:property_id/values/:entity_id`
/// - `GET /v1/tasks/:task_id/custom-properties`
/// - `GET /v1/projects/:project_id/custom-properties`

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Deserialize;
use serde_json::Value as JsonValue;
use taskforge_shared::auth::middleware::AuthContext;
use taskforge_shared::models::custom_property::{
    CustomProperty, PropertyEntityType, PropertyType, UpdateCustomProperty,
};
use taskforge_shared::models::property_value::{EntityPropertyValue, PropertyValue};
use taskforge_shared::properties::PropertyOptions;
use taskforge_shared::query::sort::CustomPropertySortField;
use taskforge_shared::query::Paginated;
use taskforge_shared::services::custom_properties::NewCustomProperty;
use uuid::Uuid;
use validator::Validate;

use super::{list_window, AppJson, AppQuery};
use crate::app::AppState;
use crate::error::{ApiError, ApiResult};

#[derive(Debug, Deserialize, Validate)]
pub struct DefinePropertyRequest {
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: String,

    pub entity_type: PropertyEntityType,
    pub property_type: PropertyType,

    /// `{ "choices": [...] }` for SELECT and MULTI_SELECT
    pub options: Option<JsonValue>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdatePropertyRequest {
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: Option<String>,

    pub options: Option<JsonValue>,
}

#[derive(Debug, Deserialize)]
pub struct SetValueRequest {
    pub value: JsonValue,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListPropertiesQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub sort: Option<String>,
    pub order: Option<String>,
    pub entity_type: Option<PropertyEntityType>,
}

pub async fn define_property(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(org_id): Path<Uuid>,
    AppJson(req): AppJson<DefinePropertyRequest>,
) -> ApiResult<(StatusCode, Json<CustomProperty>)> {
    req.validate()?;
    let options = PropertyOptions::from_json(req.options)?;

    let property = state
        .services
        .custom_properties
        .define(
            auth.user_id,
            org_id,
            NewCustomProperty {
                name: req.name,
                entity_type: req.entity_type,
                property_type: req.property_type,
                options,
            },
        )
        .await?;
    Ok((StatusCode::CREATED, Json(property)))
}

pub async fn list_properties(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(org_id): Path<Uuid>,
    AppQuery(query): AppQuery<ListPropertiesQuery>,
) -> ApiResult<Json<Paginated<CustomProperty>>> {
    let (sort, pagination) = list_window::<CustomPropertySortField>(
        query.page,
        query.limit,
        query.sort.as_deref(),
        query.order.as_deref(),
    )?;

    let page = state
        .services
        .custom_properties
        .list(auth.user_id, org_id, query.entity_type, sort, pagination)
        .await?;
    Ok(Json(page))
}

pub async fn get_property(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(property_id): Path<Uuid>,
) -> ApiResult<Json<CustomProperty>> {
    Ok(Json(
        state
            .services
            .custom_properties
            .get(auth.user_id, property_id)
            .await?,
    ))
}

pub async fn update_property(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(property_id): Path<Uuid>,
    AppJson(req): AppJson<UpdatePropertyRequest>,
) -> ApiResult<Json<CustomProperty>> {
    req.validate()?;
    let options = req
        .options
        .map(|raw| PropertyOptions::from_json(Some(raw)))
        .transpose()?;

    let property = state
        .services
        .custom_properties
        .update(
            auth.user_id,
            property_id,
            UpdateCustomProperty {
                name: req.name,
                options,
            },
        )
        .await?;
    Ok(Json(property))
}

pub async fn delete_property(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(property_id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    state
        .services
        .custom_properties
        .delete(auth.user_id, property_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn set_value(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path((property_id, entity_id)): Path<(Uuid, Uuid)>,
    AppJson(req): AppJson<SetValueRequest>,
) -> ApiResult<Json<PropertyValue>> {
    let value = state
        .services
        .custom_properties
        .set_value(auth.user_id, property_id, entity_id, req.value)
        .await?;
    Ok(Json(value))
}

pub async fn clear_value(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path((property_id, entity_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<StatusCode> {
    let removed = state
        .services
        .custom_properties
        .clear_value(auth.user_id, property_id, entity_id)
        .await?;

    if removed {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound("Property value not found".to_string()))
    }
}

pub async fn task_values(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(task_id): Path<Uuid>,
) -> ApiResult<Json<Vec<EntityPropertyValue>>> {
    entity_values(&state, auth, PropertyEntityType::Task, task_id).await
}

pub async fn project_values(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(project_id): Path<Uuid>,
) -> ApiResult<Json<Vec<EntityPropertyValue>>> {
    entity_values(&state, auth, PropertyEntityType::Project, project_id).await
}

async fn entity_values(
    state: &AppState,
    auth: AuthContext,
    entity_type: PropertyEntityType,
    entity_id: Uuid,
) -> ApiResult<Json<Vec<EntityPropertyValue>>> {
    let values = state
        .services
        .custom_properties
        .entity_values(auth.user_id, entity_type, entity_id)
        .await?;
    Ok(Json(values))
}
