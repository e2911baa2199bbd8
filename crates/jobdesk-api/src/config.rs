//! API configuration.
//!
//! All process configuration is read here, once, at startup. Components that
//! need a setting receive it through this struct rather than reading the
//! environment themselves.

use std::time::Duration;

/// API server configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// CORS origins
    pub cors_origins: Vec<String>,
    /// Rate limit requests per second
    pub rate_limit_rps: u32,
    /// Request timeout
    pub request_timeout: Duration,
    /// Max request body size
    pub max_body_size: usize,
    /// Environment (development/production)
    pub environment: String,
    /// Shared secret for signing auth tokens
    pub jwt_secret: String,
    /// Auth token lifetime in hours
    pub token_expiry_hours: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            cors_origins: vec!["*".to_string()],
            rate_limit_rps: 10,
            request_timeout: Duration::from_secs(30),
            max_body_size: 1024 * 1024, // 1MB, JSON payloads only
            environment: "development".to_string(),
            jwt_secret: String::new(),
            token_expiry_hours: 24,
        }
    }
}

impl ApiConfig {
    /// Create config from environment variables.
    ///
    /// Fails when `JWT_SECRET` is missing, since tokens signed with a
    /// guessable default would make every account forgeable.
    pub fn from_env() -> Result<Self, String> {
        let jwt_secret = std::env::var("JWT_SECRET")
            .map_err(|_| "JWT_SECRET must be set".to_string())?;
        if jwt_secret.len() < 32 {
            return Err("JWT_SECRET must be at least 32 bytes".to_string());
        }

        Ok(Self {
            host: std::env::var("API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: std::env::var("API_PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(8000),
            cors_origins: std::env::var("CORS_ORIGINS")
                .map(|s| s.split(',').map(|s| s.trim().to_string()).collect())
                .unwrap_or_else(|_| vec!["*".to_string()]),
            rate_limit_rps: std::env::var("RATE_LIMIT_RPS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(10),
            request_timeout: Duration::from_secs(
                std::env::var("REQUEST_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(30),
            ),
            max_body_size: std::env::var("MAX_BODY_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(1024 * 1024),
            environment: std::env::var("ENVIRONMENT")
                .unwrap_or_else(|_| "development".to_string()),
            jwt_secret,
            token_expiry_hours: std::env::var("TOKEN_EXPIRY_HOURS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(24),
        })
    }

    /// Check if running in production mode.
    pub fn is_production(&self) -> bool {
        self.environment.to_lowercase() == "production"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_from_env_requires_jwt_secret() {
        std::env::remove_var("JWT_SECRET");
        assert!(ApiConfig::from_env().is_err());
    }

    #[test]
    #[serial]
    fn test_from_env_rejects_short_secret() {
        std::env::set_var("JWT_SECRET", "short");
        assert!(ApiConfig::from_env().is_err());
        std::env::remove_var("JWT_SECRET");
    }

    #[test]
    #[serial]
    fn test_from_env_defaults() {
        std::env::set_var("JWT_SECRET", "0123456789abcdef0123456789abcdef");
        std::env::remove_var("API_PORT");
        std::env::remove_var("TOKEN_EXPIRY_HOURS");
        let config = ApiConfig::from_env().unwrap();
        assert_eq!(config.port, 8000);
        assert_eq!(config.token_expiry_hours, 24);
        assert!(!config.is_production());
        std::env::remove_var("JWT_SECRET");
    }
}
