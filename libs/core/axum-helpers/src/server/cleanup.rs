//! Connection cleanup run during graceful shutdown.

use tracing::{error, info};

/// Closes a SeaORM connection pool and logs the outcome.
///
/// ```ignore
/// use axum_helpers::server::close_postgres;
///
/// create_production_app(router, &config, timeout, close_postgres(db, "users")).await?;
/// ```
pub async fn close_postgres(db: sea_orm::DatabaseConnection, name: &str) {
    match db.close().await {
        Ok(_) => info!("PostgreSQL connection '{}' closed successfully", name),
        Err(e) => error!("Error closing PostgreSQL connection '{}': {}", name, e),
    }
}
