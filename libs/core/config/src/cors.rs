use crate::{env_or_default, ConfigError, FromEnv};

const DEFAULT_ORIGINS: &str = "http://localhost:3000,http://localhost:8080";

/// Origins allowed to call the API from a browser.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
}

impl CorsConfig {
    pub fn new<I, S>(origins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            allowed_origins: origins.into_iter().map(Into::into).collect(),
        }
    }

    fn parse(raw: &str) -> Vec<String> {
        raw.split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .map(str::to_string)
            .collect()
    }
}

impl FromEnv for CorsConfig {
    /// Reads `CORS_ALLOWED_ORIGIN` as a comma-separated list.
    fn from_env() -> Result<Self, ConfigError> {
        let raw = env_or_default("CORS_ALLOWED_ORIGIN", DEFAULT_ORIGINS);
        let allowed_origins = Self::parse(&raw);

        if allowed_origins.is_empty() {
            return Err(ConfigError::ParseError {
                key: "CORS_ALLOWED_ORIGIN".to_string(),
                details: "no origins listed".to_string(),
            });
        }

        Ok(Self { allowed_origins })
    }
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: Self::parse(DEFAULT_ORIGINS),
        }
    }
}
