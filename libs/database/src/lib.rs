//! PostgreSQL connectivity for the workspace services.
//!
//! # Features
//!
//! - `postgres` (default): SeaORM connection pool, migrations, health check
//! - `config`: `core_config::FromEnv` for [`postgres::PostgresConfig`] and
//!   [`common::RetryConfig`]
//!
//! ```ignore
//! use database::postgres::{self, PostgresConfig};
//! use database::common::RetryConfig;
//! use migration::Migrator;
//!
//! let db = postgres::connect_from_config_with_retry(
//!     PostgresConfig::from_env()?,
//!     Some(RetryConfig::from_env()?),
//! )
//! .await?;
//! postgres::run_migrations::<Migrator>(&db, "users_api").await?;
//! ```

pub mod common;

#[cfg(feature = "postgres")]
pub mod postgres;

pub use common::{DatabaseError, DatabaseResult};
