//! # TaskForge Shared Library
//!
//! Domain core of the TaskForge API: multi-tenant organizations, projects,
//! tasks, comments with @mentions, and per-organization custom properties.
//!
//! ## Module Organization
//!
//! - `error`: the [`error::ServiceError`] taxonomy every operation returns
//! - `db`: connection pool, migrations, and the transaction coordinator
//! - `models`: rows and their SQL
//! - `query`: pagination, whitelisted sorting, typed filters
//! - `auth`: passwords, JWTs, the bearer middleware, ownership chains and
//!   role checks
//! - `properties`: custom property option and value validation
//! - `mentions`: the `@[username]` tokenizer
//! - `services`: the authorized operations built from all of the above

pub mod auth;
pub mod db;
pub mod error;
pub mod mentions;
pub mod models;
pub mod properties;
pub mod query;
pub mod services;

/// Current version of the TaskForge shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
