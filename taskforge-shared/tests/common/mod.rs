//! Shared fixtures for database-backed tests
//!
//! Tests run against the database named by `DATABASE_URL` and skip (with a
//! note on stderr) when it is unset. Every fixture gets a unique suffix, so
//! tests can run in parallel and repeatedly against the same database.

#![allow(dead_code)]

use sqlx::PgPool;
use taskforge_shared::db::migrations::{ensure_database_exists, run_migrations};
use taskforge_shared::db::pool::{create_pool, DatabaseConfig};
use taskforge_shared::models::membership::MemberRole;
use taskforge_shared::models::organization::{CreateOrganization, Organization};
use taskforge_shared::models::user::UserProfile;
use taskforge_shared::services::users::NewUser;
use taskforge_shared::services::Services;
use uuid::Uuid;

pub const PASSWORD: &str = "correct-horse-9";

/// Migrated pool, or None when no database is configured
pub async fn test_pool() -> Option<PgPool> {
    let Ok(url) = std::env::var("DATABASE_URL") else {
        eprintln!("DATABASE_URL not set; skipping database test");
        return None;
    };

    ensure_database_exists(&url).await.expect("Failed to ensure database");
    let pool = create_pool(DatabaseConfig {
        max_connections: 5,
        min_connections: 0,
        ..DatabaseConfig::from_url(url)
    })
    .await
    .expect("Failed to create pool");
    run_migrations(&pool).await.expect("Failed to run migrations");

    Some(pool)
}

/// Short random suffix for unique names
pub fn suffix() -> String {
    Uuid::new_v4().simple().to_string()[..10].to_string()
}

pub async fn register(services: &Services, prefix: &str) -> UserProfile {
    let username = format!("{}_{}", prefix, suffix());
    services
        .users
        .register(NewUser {
            email: format!("{}@example.com", username),
            username,
            password: PASSWORD.to_string(),
            full_name: None,
        })
        .await
        .expect("Failed to register user")
}

pub async fn organization(services: &Services, owner: Uuid) -> Organization {
    services
        .organizations
        .create(
            owner,
            CreateOrganization {
                name: format!("Org {}", suffix()),
                description: None,
            },
        )
        .await
        .expect("Failed to create organization")
}

/// Registers a user and adds them to `organization_id` with `role`
pub async fn member(
    services: &Services,
    owner: Uuid,
    organization_id: Uuid,
    prefix: &str,
    role: MemberRole,
) -> UserProfile {
    let user = register(services, prefix).await;
    services
        .members
        .add(owner, organization_id, user.id, role)
        .await
        .expect("Failed to add member");
    user
}
