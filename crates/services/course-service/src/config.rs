//! Course service configuration.

use common::{CacheConfig, DatabaseConfig, JwtConfig, ServiceConfig};

/// Prefix of the service-specific environment variables.
pub const ENV_PREFIX: &str = "COURSE_SERVICE";

const DEFAULT_PORT: u16 = 8082;

/// Course service configuration.
#[derive(Debug, Clone)]
pub struct CourseServiceConfig {
    pub service: ServiceConfig,
    pub database: DatabaseConfig,
    pub cache: CacheConfig,
    pub jwt: JwtConfig,
}

impl CourseServiceConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Self {
            service: ServiceConfig::from_env(ENV_PREFIX, "course-service", DEFAULT_PORT),
            database: DatabaseConfig::from_env(ENV_PREFIX),
            cache: CacheConfig::from_env(ENV_PREFIX),
            jwt: JwtConfig::from_env(ENV_PREFIX),
        }
    }
}

impl Default for CourseServiceConfig {
    fn default() -> Self {
        Self {
            service: ServiceConfig {
                service_name: "course-service".to_string(),
                port: DEFAULT_PORT,
                ..ServiceConfig::default()
            },
            database: DatabaseConfig::default(),
            cache: CacheConfig::default(),
            jwt: JwtConfig::default(),
        }
    }
}
