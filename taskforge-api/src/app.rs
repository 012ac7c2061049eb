/// Application state and router builder
///
/// # Example
///
/// ```no_run
/// use taskforge_api::{app::AppState, config::Config};
/// use taskforge_shared::db::pool::{create_pool, DatabaseConfig};
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let pool = create_pool(DatabaseConfig::from_url(config.database.url.clone())).await?;
/// let app = taskforge_api::app::build_router(AppState::new(pool, config));
/// # Ok(())
/// # }
/// ```

use crate::config::Config;
use crate::routes;
use axum::{
    http::{header, HeaderValue, Method},
    routing::{get, patch, post, put},
    Router,
};
use sqlx::PgPool;
use std::sync::Arc;
use taskforge_shared::auth::jwt::JwtKeys;
use taskforge_shared::auth::middleware::create_jwt_middleware;
use taskforge_shared::services::Services;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Shared application state
///
/// Cloned for each request via Axum's `State` extractor; every field is
/// a cheap handle.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool, used directly only by the health check
    pub db: PgPool,

    pub services: Services,

    /// Signing keys derived from `JWT_SECRET`
    pub jwt: JwtKeys,

    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(db: PgPool, config: Config) -> Self {
        Self {
            services: Services::new(db.clone()),
            jwt: JwtKeys::new(&config.jwt.secret),
            db,
            config: Arc::new(config),
        }
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// # Architecture
///
/// ```text
/// /
/// ├── /health                                  # public
/// └── /v1/
///     ├── /auth/{register,login,refresh}       # public
///     ├── /auth/me, /auth/me/password          # JWT
///     ├── /organizations[/:org_id]             # JWT
///     │   ├── /members[/:user_id]
///     │   ├── /projects
///     │   └── /custom-properties
///     ├── /projects/:project_id
///     │   ├── /tasks, /tasks/stats
///     │   └── /custom-properties
///     ├── /tasks/:task_id
///     │   ├── /status, /assignee
///     │   ├── /comments
///     │   └── /custom-properties
///     ├── /comments/:comment_id
///     └── /custom-properties/:property_id
///         └── /values/:entity_id
/// ```
///
/// # Middleware Stack
///
/// 1. Logging (tower-http TraceLayer)
/// 2. CORS (tower-http CorsLayer)
/// 3. JWT authentication on every route except `/health` and the public
///    auth routes
pub fn build_router(state: AppState) -> Router {
    let health_routes = Router::new().route("/health", get(routes::health::health_check));

    let public_auth = Router::new()
        .route("/auth/register", post(routes::auth::register))
        .route("/auth/login", post(routes::auth::login))
        .route("/auth/refresh", post(routes::auth::refresh));

    let protected = Router::new()
        .route(
            "/auth/me",
            get(routes::auth::me).patch(routes::auth::update_me),
        )
        .route("/auth/me/password", put(routes::auth::change_password))
        // Organizations and members
        .route(
            "/organizations",
            post(routes::organizations::create_organization)
                .get(routes::organizations::list_organizations),
        )
        .route(
            "/organizations/:org_id",
            get(routes::organizations::get_organization)
                .patch(routes::organizations::update_organization)
                .delete(routes::organizations::delete_organization),
        )
        .route(
            "/organizations/:org_id/members",
            get(routes::members::list_members).post(routes::members::add_member),
        )
        .route(
            "/organizations/:org_id/members/:user_id",
            patch(routes::members::change_role).delete(routes::members::remove_member),
        )
        // Projects
        .route(
            "/organizations/:org_id/projects",
            get(routes::projects::list_projects).post(routes::projects::create_project),
        )
        .route(
            "/projects/:project_id",
            get(routes::projects::get_project)
                .patch(routes::projects::update_project)
                .delete(routes::projects::delete_project),
        )
        // Tasks
        .route(
            "/projects/:project_id/tasks",
            get(routes::tasks::list_tasks).post(routes::tasks::create_task),
        )
        .route("/projects/:project_id/tasks/stats", get(routes::tasks::task_stats))
        .route(
            "/tasks/:task_id",
            get(routes::tasks::get_task)
                .patch(routes::tasks::update_task)
                .delete(routes::tasks::delete_task),
        )
        .route("/tasks/:task_id/status", patch(routes::tasks::set_status))
        .route("/tasks/:task_id/assignee", patch(routes::tasks::set_assignee))
        // Comments
        .route(
            "/tasks/:task_id/comments",
            get(routes::comments::list_comments).post(routes::comments::create_comment),
        )
        .route(
            "/comments/:comment_id",
            patch(routes::comments::update_comment).delete(routes::comments::delete_comment),
        )
        // Custom properties
        .route(
            "/organizations/:org_id/custom-properties",
            get(routes::custom_properties::list_properties)
                .post(routes::custom_properties::define_property),
        )
        .route(
            "/custom-properties/:property_id",
            get(routes::custom_properties::get_property)
                .patch(routes::custom_properties::update_property)
                .delete(routes::custom_properties::delete_property),
        )
        .route(
            "/custom-properties/:property_id/values/:entity_id",
            put(routes::custom_properties::set_value)
                .delete(routes::custom_properties::clear_value),
        )
        .route(
            "/tasks/:task_id/custom-properties",
            get(routes::custom_properties::task_values),
        )
        .route(
            "/projects/:project_id/custom-properties",
            get(routes::custom_properties::project_values),
        )
        .route_layer(axum::middleware::from_fn(create_jwt_middleware(
            state.jwt.clone(),
        )));

    let v1_routes = Router::new().merge(public_auth).merge(protected);

    Router::new()
        .merge(health_routes)
        .nest("/v1", v1_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors_layer(&state.config))
        .with_state(state)
}

/// Permissive when `CORS_ORIGINS` contains `*`, otherwise an explicit list
fn cors_layer(config: &Config) -> CorsLayer {
    if config.allows_any_origin() {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = config
        .api
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true)
        .max_age(std::time::Duration::from_secs(3600))
}
