/// Database layer for TaskForge
///
/// # Modules
///
/// - `pool`: PostgreSQL connection pool management with health checks
/// - `migrations`: Embedded migration runner
/// - `transaction`: Unit-of-work wrapper for atomic multi-row writes
///
/// Models live in the `models` module at the crate root.

pub mod migrations;
pub mod pool;
pub mod transaction;
