use std::env;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub environment: String,
    pub database_url: String,
    pub license_service_url: String,
    pub license_timeout_ms: u64,
    pub retry: RetrySettings,
    pub otel_service_name: String,
    pub otel_exporter_endpoint: String,
}

/// Retry policy of the report endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetrySettings {
    pub attempts: u32,
    pub interval_ms: u64,
    /// Whether a page past the end of a non-empty user set is retried.
    pub retry_out_of_range_pages: bool,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            attempts: 10,
            interval_ms: 1000,
            retry_out_of_range_pages: true,
        }
    }
}

impl RetrySettings {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let defaults = RetrySettings::default();

        Self {
            port: env::var("APP_PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .expect("APP_PORT must be a number"),
            environment: env::var("APP_ENVIRONMENT")
                .unwrap_or_else(|_| "development".to_string()),
            database_url: env::var("DATABASE_URL").expect("DATABASE_URL must be set"),
            license_service_url: env::var("LICENSE_SERVICE_URL")
                .unwrap_or_else(|_| "http://localhost:9090".to_string()),
            license_timeout_ms: env::var("LICENSE_TIMEOUT_MS")
                .unwrap_or_else(|_| "30000".to_string())
                .parse()
                .expect("LICENSE_TIMEOUT_MS must be a number"),
            retry: RetrySettings {
                attempts: env::var("RETRY_ATTEMPTS")
                    .map(|v| v.parse().expect("RETRY_ATTEMPTS must be a number"))
                    .unwrap_or(defaults.attempts),
                interval_ms: env::var("RETRY_INTERVAL_MS")
                    .map(|v| v.parse().expect("RETRY_INTERVAL_MS must be a number"))
                    .unwrap_or(defaults.interval_ms),
                retry_out_of_range_pages: env::var("RETRY_OUT_OF_RANGE_PAGES")
                    .map(|v| {
                        v.parse()
                            .expect("RETRY_OUT_OF_RANGE_PAGES must be true or false")
                    })
                    .unwrap_or(defaults.retry_out_of_range_pages),
            },
            otel_service_name: env::var("OTEL_SERVICE_NAME")
                .unwrap_or_else(|_| "backup-report".to_string()),
            otel_exporter_endpoint: env::var("OTEL_EXPORTER_OTLP_ENDPOINT")
                .unwrap_or_else(|_| "http://localhost:4317".to_string()),
        }
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    pub fn license_timeout(&self) -> Duration {
        Duration::from_millis(self.license_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_defaults() {
        let settings = RetrySettings::default();
        assert_eq!(settings.attempts, 10);
        assert_eq!(settings.interval(), Duration::from_millis(1000));
        assert!(settings.retry_out_of_range_pages);
    }
}
