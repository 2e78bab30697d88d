use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};

use crate::marketplace::applications::TransitionPolicy;
use crate::marketplace::gateways::Coordinates;

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub leasing: LeasingConfig,
    pub storage: StorageConfig,
    pub geocoding: GeocodingConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let term_days = env::var("APP_LEASE_TERM_DAYS")
            .unwrap_or_else(|_| DEFAULT_LEASE_TERM_DAYS.to_string())
            .parse::<i64>()
            .ok()
            .filter(|days| (1..=MAX_LEASE_TERM_DAYS).contains(days))
            .ok_or(ConfigError::InvalidLeaseTerm)?;

        let fallback_rent = env::var("APP_LEASE_FALLBACK_RENT")
            .unwrap_or_else(|_| DEFAULT_FALLBACK_RENT.to_string())
            .parse::<u32>()
            .ok()
            .filter(|rent| *rent > 0)
            .ok_or(ConfigError::InvalidFallbackRent)?;

        let transitions = match env::var("APP_STATUS_TRANSITIONS") {
            Ok(raw) => TransitionPolicy::parse(&raw)
                .ok_or(ConfigError::InvalidTransitionPolicy { value: raw })?,
            Err(_) => TransitionPolicy::default(),
        };

        let public_base_url = env::var("APP_STORAGE_PUBLIC_URL")
            .unwrap_or_else(|_| format!("http://{host}:{port}/uploads"));

        let fallback = match env::var("APP_GEOCODER_FALLBACK") {
            Ok(raw) => Some(
                parse_coordinates(&raw).ok_or(ConfigError::InvalidCoordinates { value: raw })?,
            ),
            Err(_) => None,
        };

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            leasing: LeasingConfig {
                term_days,
                fallback_rent,
                transitions,
            },
            storage: StorageConfig {
                public_base_url: public_base_url.trim_end_matches('/').to_string(),
            },
            geocoding: GeocodingConfig { fallback },
        })
    }
}

pub const DEFAULT_LEASE_TERM_DAYS: i64 = 365;
/// One hundred years.
pub const MAX_LEASE_TERM_DAYS: i64 = 36_500;
pub const DEFAULT_FALLBACK_RENT: u32 = 1000;

fn parse_coordinates(raw: &str) -> Option<Coordinates> {
    let (lat, lng) = raw.split_once(',')?;
    let latitude = lat.trim().parse::<f64>().ok()?;
    let longitude = lng.trim().parse::<f64>().ok()?;
    Coordinates::new(latitude, longitude)
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing and metrics controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Default terms applied when an approval issues a lease.
#[derive(Debug, Clone, Copy)]
pub struct LeasingConfig {
    pub term_days: i64,
    pub fallback_rent: u32,
    pub transitions: TransitionPolicy,
}

impl Default for LeasingConfig {
    fn default() -> Self {
        Self {
            term_days: DEFAULT_LEASE_TERM_DAYS,
            fallback_rent: DEFAULT_FALLBACK_RENT,
            transitions: TransitionPolicy::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub public_base_url: String,
}

#[derive(Debug, Clone, Copy)]
pub struct GeocodingConfig {
    pub fallback: Option<Coordinates>,
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidLeaseTerm,
    InvalidFallbackRent,
    InvalidTransitionPolicy { value: String },
    InvalidCoordinates { value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidLeaseTerm => {
                write!(
                    f,
                    "APP_LEASE_TERM_DAYS must be between 1 and {MAX_LEASE_TERM_DAYS} days"
                )
            }
            ConfigError::InvalidFallbackRent => {
                write!(f, "APP_LEASE_FALLBACK_RENT must be a positive whole amount")
            }
            ConfigError::InvalidTransitionPolicy { value } => write!(
                f,
                "APP_STATUS_TRANSITIONS must be 'permissive' or 'strict' (found '{value}')"
            ),
            ConfigError::InvalidCoordinates { value } => write!(
                f,
                "APP_GEOCODER_FALLBACK must be 'latitude,longitude' (found '{value}')"
            ),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::{Mutex, OnceLock};

    fn env_guard() -> &'static Mutex<()> {
        static GUARD: OnceLock<Mutex<()>> = OnceLock::new();
        GUARD.get_or_init(|| Mutex::new(()))
    }

    fn reset_env() {
        for key in [
            "APP_ENV",
            "APP_HOST",
            "APP_PORT",
            "APP_LOG_LEVEL",
            "APP_LEASE_TERM_DAYS",
            "APP_LEASE_FALLBACK_RENT",
            "APP_STATUS_TRANSITIONS",
            "APP_STORAGE_PUBLIC_URL",
            "APP_GEOCODER_FALLBACK",
        ] {
            env::remove_var(key);
        }
    }

    #[test]
    fn load_uses_defaults_when_env_missing() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        let config = AppConfig::load().expect("config loads with defaults");
        assert_eq!(config.environment, AppEnvironment::Development);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.telemetry.log_level, "info");
        assert_eq!(config.leasing.term_days, 365);
        assert_eq!(config.leasing.fallback_rent, 1000);
        assert_eq!(config.leasing.transitions, TransitionPolicy::Permissive);
        assert_eq!(
            config.storage.public_base_url,
            "http://127.0.0.1:3000/uploads"
        );
        assert!(config.geocoding.fallback.is_none());
    }

    #[test]
    fn accepts_localhost_host() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_HOST", "localhost");
        let config = AppConfig::load().expect("config loads");
        let addr = config.server.socket_addr().expect("localhost resolves");
        assert_eq!(addr, SocketAddr::new(IpAddr::from([127, 0, 0, 1]), 3000));
        reset_env();
    }

    #[test]
    fn reads_leasing_and_geocoder_overrides() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_LEASE_TERM_DAYS", "180");
        env::set_var("APP_STATUS_TRANSITIONS", "STRICT");
        env::set_var("APP_GEOCODER_FALLBACK", "52.2053, 0.1218");
        let config = AppConfig::load().expect("config loads");
        assert_eq!(config.leasing.term_days, 180);
        assert_eq!(config.leasing.transitions, TransitionPolicy::Strict);
        let fallback = config.geocoding.fallback.expect("fallback parsed");
        assert!((fallback.latitude - 52.2053).abs() < f64::EPSILON);
        reset_env();
    }

    #[test]
    fn rejects_unknown_transition_policy() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_STATUS_TRANSITIONS", "anything-goes");
        let err = AppConfig::load().expect_err("policy rejected");
        assert!(matches!(err, ConfigError::InvalidTransitionPolicy { .. }));
        reset_env();
    }

    #[test]
    fn rejects_non_positive_lease_term() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_LEASE_TERM_DAYS", "0");
        assert!(matches!(
            AppConfig::load(),
            Err(ConfigError::InvalidLeaseTerm)
        ));
        reset_env();
    }

    #[test]
    fn rejects_lease_terms_beyond_a_century() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_LEASE_TERM_DAYS", "100000000");
        assert!(matches!(
            AppConfig::load(),
            Err(ConfigError::InvalidLeaseTerm)
        ));

        env::set_var("APP_LEASE_TERM_DAYS", "36500");
        let config = AppConfig::load().expect("longest term accepted");
        assert_eq!(config.leasing.term_days, MAX_LEASE_TERM_DAYS);
        reset_env();
    }
}
