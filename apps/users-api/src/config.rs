use core_config::{AppInfo, FromEnv, app_info, cors::CorsConfig, env_or_default, server::ServerConfig};
use database::common::RetryConfig;
use database::postgres::PostgresConfig;

pub use core_config::Environment;

/// Application configuration, composed from the shared config components
#[derive(Clone, Debug)]
pub struct Config {
    pub app: AppInfo,
    pub database: PostgresConfig,
    /// Backoff for the initial database connection
    pub db_retry: RetryConfig,
    pub server: ServerConfig,
    pub cors: CorsConfig,
    pub environment: Environment,
    /// Fallback filter when `RUST_LOG` is unset
    pub log_level: String,
}

impl Config {
    pub fn from_env() -> eyre::Result<Self> {
        let environment = Environment::from_env();
        let database = PostgresConfig::from_env()?; // Required - DATABASE_URL or DB_* parts
        let db_retry = RetryConfig::from_env()?;
        let server = ServerConfig::from_env()?; // HOST=0.0.0.0, PORT=8080
        let cors = CorsConfig::from_env()?;
        let log_level = env_or_default("LOG_LEVEL", "info");

        Ok(Self {
            app: app_info!(),
            database,
            db_retry,
            server,
            cors,
            environment,
            log_level,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_env() {
        temp_env::with_vars(
            [
                ("DATABASE_URL", Some("postgres://app:secret@db:5432/users")),
                ("PORT", Some("9090")),
                ("APP_ENV", Some("production")),
                ("LOG_LEVEL", None),
                ("CORS_ALLOWED_ORIGIN", None),
                ("DB_CONNECT_RETRIES", None),
                ("DB_RETRY_MAX_DELAY_MS", Some("8000")),
            ],
            || {
                let config = Config::from_env().unwrap();

                assert_eq!(config.app.name, "users_api");
                assert_eq!(config.database.url(), "postgres://app:secret@db:5432/users");
                assert_eq!(config.server.port, 9090);
                assert!(config.environment.is_production());
                assert_eq!(config.log_level, "info");
                assert_eq!(config.db_retry.max_retries, 5);
                assert_eq!(config.db_retry.max_delay_ms, 8000);
                assert!(!config.cors.allowed_origins.is_empty());
            },
        );
    }

    #[test]
    fn test_config_requires_database() {
        temp_env::with_vars(
            [
                ("DATABASE_URL", None::<&str>),
                ("DB_USER", None),
                ("DB_PASSWORD", None),
                ("DB_HOST", None),
                ("DB_NAME", None),
            ],
            || {
                assert!(Config::from_env().is_err());
            },
        );
    }

    #[test]
    fn test_config_rejects_bad_retry_delay() {
        temp_env::with_vars(
            [
                ("DATABASE_URL", Some("postgres://localhost/users")),
                ("DB_RETRY_INITIAL_DELAY_MS", Some("-1")),
            ],
            || {
                assert!(Config::from_env().is_err());
            },
        );
    }

    #[test]
    fn test_config_rejects_bad_port() {
        temp_env::with_vars(
            [
                ("DATABASE_URL", Some("postgres://localhost/users")),
                ("PORT", Some("eighty")),
            ],
            || {
                assert!(Config::from_env().is_err());
            },
        );
    }
}
