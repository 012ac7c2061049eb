/// Database models for TaskForge
///
/// Plain data access: each model owns its SQL and nothing else. Access
/// control and multi-row consistency live one layer up in `services`.
///
/// # Models
///
/// - `user`: accounts and the public [`user::UserProfile`] projection
/// - `organization`: tenants, with slug derivation
/// - `membership`: user × organization → role
/// - `project`, `task`, `comment`, `mention`: the work hierarchy
/// - `custom_property`, `property_value`: per-organization typed fields
///
/// Write functions are generic over `PgExecutor`, so they run equally on the
/// pool or inside a [`crate::db::transaction::UnitOfWork`].

pub mod comment;
pub mod custom_property;
pub mod membership;
pub mod mention;
pub mod organization;
pub mod project;
pub mod property_value;
pub mod task;
pub mod user;
