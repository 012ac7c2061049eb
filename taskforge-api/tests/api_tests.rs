/// HTTP integration tests
///
/// The offline tests need nothing running. The rest require PostgreSQL via
/// DATABASE_URL and are skipped otherwise.

mod common;

use axum::http::{Method, StatusCode};
use common::{offline_app, send, TestContext};
use serde_json::json;
use taskforge_shared::auth::jwt::{Claims, JwtKeys, TokenType};
use uuid::Uuid;

#[tokio::test]
async fn test_health_reports_unreachable_database() {
    let app = offline_app();
    let (status, body) = send(&app, Method::GET, "/health", None, None).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["status"], "degraded");
    assert_eq!(body["database"], "disconnected");
}

#[tokio::test]
async fn test_protected_routes_require_token() {
    let app = offline_app();
    let id = Uuid::new_v4();

    for (method, uri) in [
        (Method::GET, "/v1/auth/me".to_string()),
        (Method::GET, "/v1/organizations".to_string()),
        (Method::GET, format!("/v1/projects/{}", id)),
        (Method::DELETE, format!("/v1/tasks/{}", id)),
        (Method::GET, format!("/v1/tasks/{}/comments", id)),
        (Method::PUT, format!("/v1/custom-properties/{}/values/{}", id, id)),
    ] {
        let (status, body) = send(&app, method, &uri, None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{}", uri);
        assert_eq!(body["error"], "unauthorized");
    }
}

#[tokio::test]
async fn test_refresh_token_rejected_as_access_token() {
    let app = offline_app();
    let keys = JwtKeys::new(common::SECRET);
    let refresh = keys
        .sign(&Claims::new(Uuid::new_v4(), TokenType::Refresh))
        .unwrap();

    let (status, _) = send(&app, Method::GET, "/v1/auth/me", Some(&refresh), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, Method::GET, "/v1/auth/me", Some("garbage"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_register_validation_is_422() {
    let app = offline_app();
    let (status, body) = send(
        &app,
        Method::POST,
        "/v1/auth/register",
        None,
        Some(json!({ "email": "nope", "username": "ab", "password": "short" })),
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "validation_error");
    let fields: Vec<&str> = body["details"]
        .as_array()
        .unwrap()
        .iter()
        .map(|d| d["field"].as_str().unwrap())
        .collect();
    assert_eq!(fields, vec!["email", "password", "username"]);
}

#[tokio::test]
async fn test_malformed_json_is_400() {
    let app = offline_app();
    let (status, body) = send(
        &app,
        Method::POST,
        "/v1/auth/login",
        None,
        Some(json!({ "login": 42 })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "bad_request");
}

#[tokio::test]
async fn test_auth_flow() {
    let Some(ctx) = TestContext::new().await else { return };
    let user = ctx.register("flow").await;

    let (status, body) = send(
        &ctx.app,
        Method::POST,
        "/v1/auth/login",
        None,
        Some(json!({ "login": user.username, "password": common::PASSWORD })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["id"], user.id.to_string());
    assert!(body["user"].get("password_hash").is_none());

    let (status, _) = send(
        &ctx.app,
        Method::POST,
        "/v1/auth/login",
        None,
        Some(json!({ "login": user.username, "password": "wrong-pass-1" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = send(
        &ctx.app,
        Method::POST,
        "/v1/auth/refresh",
        None,
        Some(json!({ "refresh_token": user.refresh_token })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["token_type"], "Bearer");

    let (status, body) = ctx
        .request(Method::PATCH, "/v1/auth/me", &user, Some(json!({ "full_name": "Ada" })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["full_name"], "Ada");

    let (status, _) = ctx
        .request(
            Method::PUT,
            "/v1/auth/me/password",
            &user,
            Some(json!({ "current_password": "nope-nope-1", "new_password": "another-pass-2" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, _) = ctx
        .request(
            Method::PUT,
            "/v1/auth/me/password",
            &user,
            Some(json!({ "current_password": common::PASSWORD, "new_password": "another-pass-2" })),
        )
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn test_task_lifecycle_over_http() {
    let Some(ctx) = TestContext::new().await else { return };
    let owner = ctx.register("http_owner").await;
    let org_name = format!("Acme {}", common::suffix());

    let (status, org) = ctx
        .request(Method::POST, "/v1/organizations", &owner, Some(json!({ "name": org_name })))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(org["slug"], org_name.to_lowercase().replace(' ', "-"));

    let (status, body) = ctx
        .request(Method::POST, "/v1/organizations", &owner, Some(json!({ "name": org_name })))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "conflict");

    let org_id = org["id"].as_str().unwrap();
    let (status, project) = ctx
        .request(
            Method::POST,
            &format!("/v1/organizations/{}/projects", org_id),
            &owner,
            Some(json!({ "name": "Website" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let project_id = project["id"].as_str().unwrap();
    let (status, task) = ctx
        .request(
            Method::POST,
            &format!("/v1/projects/{}/tasks", project_id),
            &owner,
            Some(json!({ "title": "Fix bug" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(task["status"], "TODO");
    assert_eq!(task["priority"], "MEDIUM");
    assert!(task["completed_at"].is_null());

    let task_uri = format!("/v1/tasks/{}", task["id"].as_str().unwrap());
    let (status, done) = ctx
        .request(
            Method::PATCH,
            &format!("{}/status", task_uri),
            &owner,
            Some(json!({ "status": "DONE" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(done["completed_at"].is_string());

    let (_, reopened) = ctx
        .request(
            Method::PATCH,
            &task_uri,
            &owner,
            Some(json!({ "status": "IN_PROGRESS", "description": "again" })),
        )
        .await;
    assert!(reopened["completed_at"].is_null());
    assert_eq!(reopened["description"], "again");

    let (status, stats) = ctx
        .request(
            Method::GET,
            &format!("/v1/projects/{}/tasks/stats", project_id),
            &owner,
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["total"], 1);

    let (status, page) = ctx
        .request(
            Method::GET,
            &format!("/v1/projects/{}/tasks?status=in_progress&page=0&limit=500", project_id),
            &owner,
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["page"], 1);
    assert_eq!(page["limit"], 100);
    assert_eq!(page["total"], 1);

    let (status, _) = ctx
        .request(
            Method::GET,
            &format!("/v1/projects/{}/tasks?sort=password_hash", project_id),
            &owner,
            None,
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, _) = ctx.request(Method::DELETE, &task_uri, &owner, None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = ctx.request(Method::GET, &task_uri, &owner, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");
}

#[tokio::test]
async fn test_outsider_is_forbidden() {
    let Some(ctx) = TestContext::new().await else { return };
    let owner = ctx.register("http_tenant").await;
    let outsider = ctx.register("http_out").await;
    let org_id = ctx.organization(&owner).await;

    let (_, project) = ctx
        .request(
            Method::POST,
            &format!("/v1/organizations/{}/projects", org_id),
            &owner,
            Some(json!({ "name": "Private" })),
        )
        .await;
    let project_id = project["id"].as_str().unwrap();

    let (_, property) = ctx
        .request(
            Method::POST,
            &format!("/v1/organizations/{}/custom-properties", org_id),
            &owner,
            Some(json!({
                "name": "Phase",
                "entity_type": "PROJECT",
                "property_type": "SELECT",
                "options": { "choices": ["alpha", "beta"] }
            })),
        )
        .await;
    let property_id = property["id"].as_str().unwrap();

    let (status, value) = ctx
        .request(
            Method::PUT,
            &format!("/v1/custom-properties/{}/values/{}", property_id, project_id),
            &owner,
            Some(json!({ "value": "beta" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(value["value"], "beta");

    let (status, _) = ctx
        .request(
            Method::PUT,
            &format!("/v1/custom-properties/{}/values/{}", property_id, project_id),
            &owner,
            Some(json!({ "value": "gamma" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    for (method, uri) in [
        (Method::GET, format!("/v1/organizations/{}", org_id)),
        (Method::GET, format!("/v1/organizations/{}/members", org_id)),
        (Method::GET, format!("/v1/projects/{}", project_id)),
        (Method::GET, format!("/v1/projects/{}/tasks", project_id)),
        (Method::GET, format!("/v1/projects/{}/custom-properties", project_id)),
        (Method::GET, format!("/v1/custom-properties/{}", property_id)),
        (Method::DELETE, format!("/v1/projects/{}", project_id)),
    ] {
        let (status, body) = ctx.request(method, &uri, &outsider, None).await;
        assert_eq!(status, StatusCode::FORBIDDEN, "{}", uri);
        assert_eq!(body["error"], "forbidden");
    }

    let (status, values) = ctx
        .request(
            Method::GET,
            &format!("/v1/projects/{}/custom-properties", project_id),
            &owner,
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(values.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_members_and_mentions() {
    let Some(ctx) = TestContext::new().await else { return };
    let owner = ctx.register("http_lead").await;
    let teammate = ctx.register("http_mate").await;
    let org_id = ctx.organization(&owner).await;
    let members_uri = format!("/v1/organizations/{}/members", org_id);

    let (status, _) = ctx
        .request(
            Method::PATCH,
            &format!("{}/{}", members_uri, owner.id),
            &owner,
            Some(json!({ "role": "ADMIN" })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, membership) = ctx
        .request(
            Method::POST,
            &members_uri,
            &owner,
            Some(json!({ "user_id": teammate.id })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(membership["role"], "MEMBER");

    let (_, project) = ctx
        .request(
            Method::POST,
            &format!("/v1/organizations/{}/projects", org_id),
            &owner,
            Some(json!({ "name": "Chat" })),
        )
        .await;
    let (_, task) = ctx
        .request(
            Method::POST,
            &format!("/v1/projects/{}/tasks", project["id"].as_str().unwrap()),
            &owner,
            Some(json!({ "title": "Discuss" })),
        )
        .await;

    let (status, comment) = ctx
        .request(
            Method::POST,
            &format!("/v1/tasks/{}/comments", task["id"].as_str().unwrap()),
            &owner,
            Some(json!({ "content": format!("ping @[{}]", teammate.username) })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(comment["mentions"], json!([teammate.id]));

    let comment_uri = format!("/v1/comments/{}", comment["id"].as_str().unwrap());
    let (status, _) = ctx
        .request(Method::PATCH, &comment_uri, &teammate, Some(json!({ "content": "mine now" })))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, edited) = ctx
        .request(Method::PATCH, &comment_uri, &owner, Some(json!({ "content": "never mind" })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(edited["mentions"], json!([]));

    let (status, _) = ctx
        .request(
            Method::DELETE,
            &format!("{}/{}", members_uri, teammate.id),
            &teammate,
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}
