use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use crate::marketplace::bookings::CommissionPolicy;
use crate::marketplace::listings::moderation::{ModerationPolicy, ParseFailurePolicy};

const DEV_SESSION_SECRET: &str = "campus-nest-dev-secret";
const DEFAULT_REVIEW_ENDPOINT: &str = "https://api.groq.com/openai/v1/chat/completions";
const DEFAULT_REVIEW_MODEL: &str = "llama-3.1-8b-instant";

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
    pub session: SessionConfig,
    pub review: ReviewConfig,
    pub marketplace: MarketplaceConfig,
    pub events: EventConfig,
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

        let secret = match env::var("SESSION_SECRET") {
            Ok(secret) if !secret.trim().is_empty() => secret,
            _ if environment == AppEnvironment::Production => {
                return Err(ConfigError::InsecureSessionSecret)
            }
            _ => DEV_SESSION_SECRET.to_string(),
        };
        let session = SessionConfig {
            secret,
            ttl_minutes: parse_var("SESSION_TTL_MINUTES", 720)?,
        };

        let review = ReviewConfig {
            api_key: env::var("REVIEW_API_KEY")
                .ok()
                .filter(|key| !key.trim().is_empty()),
            endpoint: env::var("REVIEW_ENDPOINT")
                .unwrap_or_else(|_| DEFAULT_REVIEW_ENDPOINT.to_string()),
            model: env::var("REVIEW_MODEL").unwrap_or_else(|_| DEFAULT_REVIEW_MODEL.to_string()),
            timeout: Duration::from_secs(parse_var("REVIEW_TIMEOUT_SECS", 20)?),
            policy: ModerationPolicy {
                min_confidence: parse_percent("REVIEW_MIN_CONFIDENCE", 75)?,
                min_score: parse_percent("REVIEW_MIN_SCORE", 70)?,
                on_parse_failure: parse_failure_policy()?,
            },
        };

        let commission = CommissionPolicy {
            default_rate: parse_var("COMMISSION_DEFAULT_RATE", 7.5)?,
            min_rate: parse_var("COMMISSION_MIN_RATE", 5.0)?,
            max_rate: parse_var("COMMISSION_MAX_RATE", 10.0)?,
        };
        if !commission.is_consistent() {
            return Err(ConfigError::InvalidRange {
                var: "COMMISSION_DEFAULT_RATE",
                detail: format!(
                    "default {} must lie within [{}, {}]",
                    commission.default_rate, commission.min_rate, commission.max_rate
                ),
            });
        }

        let marketplace = MarketplaceConfig {
            admin_email: env::var("ADMIN_EMAIL")
                .unwrap_or_else(|_| "admin@campusnest.in".to_string()),
            verification_fee: parse_var("VERIFICATION_FEE", 999)?,
            commission,
        };

        let events = EventConfig {
            capacity: parse_var("EVENT_BUS_CAPACITY", 256)?,
        };

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            session,
            review,
            marketplace,
            events,
        })
    }
}

fn parse_var<T: FromStr>(var: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(var) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::InvalidNumber { var }),
        Err(_) => Ok(default),
    }
}

fn parse_percent(var: &'static str, default: u8) -> Result<u8, ConfigError> {
    let value = parse_var(var, default)?;
    if value > 100 {
        return Err(ConfigError::InvalidRange {
            var,
            detail: format!("{value} is above 100"),
        });
    }
    Ok(value)
}

fn parse_failure_policy() -> Result<ParseFailurePolicy, ConfigError> {
    match env::var("REVIEW_PARSE_FAILURE") {
        Err(_) => Ok(ParseFailurePolicy::default()),
        Ok(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "auto_approve" | "auto-approve" => Ok(ParseFailurePolicy::AutoApprove),
            "manual_review" | "manual-review" => Ok(ParseFailurePolicy::ManualReview),
            other => Err(ConfigError::InvalidRange {
                var: "REVIEW_PARSE_FAILURE",
                detail: format!("'{other}' is not auto_approve or manual_review"),
            }),
        },
    }
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

/// Signing material for session tokens.
#[derive(Clone)]
pub struct SessionConfig {
    pub secret: String,
    pub ttl_minutes: i64,
}

impl fmt::Debug for SessionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionConfig")
            .field("ttl_minutes", &self.ttl_minutes)
            .finish_non_exhaustive()
    }
}

/// External content reviewer settings. The reviewer is disabled without an API key.
#[derive(Clone)]
pub struct ReviewConfig {
    pub api_key: Option<String>,
    pub endpoint: String,
    pub model: String,
    pub timeout: Duration,
    pub policy: ModerationPolicy,
}

impl ReviewConfig {
    pub fn enabled(&self) -> bool {
        self.api_key.is_some()
    }
}

impl fmt::Debug for ReviewConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReviewConfig")
            .field("enabled", &self.enabled())
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .field("timeout", &self.timeout)
            .field("policy", &self.policy)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct MarketplaceConfig {
    pub admin_email: String,
    pub verification_fee: u32,
    pub commission: CommissionPolicy,
}

impl Default for MarketplaceConfig {
    fn default() -> Self {
        Self {
            admin_email: "admin@campusnest.in".to_string(),
            verification_fee: 999,
            commission: CommissionPolicy::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct EventConfig {
    pub capacity: usize,
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidNumber { var: &'static str },
    InvalidRange { var: &'static str, detail: String },
    InsecureSessionSecret,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidNumber { var } => write!(f, "{var} must be numeric"),
            ConfigError::InvalidRange { var, detail } => write!(f, "{var} out of range: {detail}"),
            ConfigError::InsecureSessionSecret => {
                write!(f, "SESSION_SECRET must be set in production")
            }
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
        for var in [
            "APP_ENV",
            "APP_HOST",
            "APP_PORT",
            "APP_LOG_LEVEL",
            "SESSION_SECRET",
            "SESSION_TTL_MINUTES",
            "REVIEW_API_KEY",
            "REVIEW_ENDPOINT",
            "REVIEW_MODEL",
            "REVIEW_TIMEOUT_SECS",
            "REVIEW_MIN_CONFIDENCE",
            "REVIEW_MIN_SCORE",
            "REVIEW_PARSE_FAILURE",
            "COMMISSION_DEFAULT_RATE",
            "COMMISSION_MIN_RATE",
            "COMMISSION_MAX_RATE",
            "ADMIN_EMAIL",
            "VERIFICATION_FEE",
            "EVENT_BUS_CAPACITY",
        ] {
            env::remove_var(var);
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
        assert!(!config.review.enabled());
        assert_eq!(config.review.policy.min_confidence, 75);
        assert_eq!(config.review.policy.min_score, 70);
        assert_eq!(
            config.review.policy.on_parse_failure,
            ParseFailurePolicy::AutoApprove
        );
        assert_eq!(config.marketplace.verification_fee, 999);
        assert!((config.marketplace.commission.default_rate - 7.5).abs() < f64::EPSILON);
    }

    #[test]
    fn accepts_localhost_host() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_HOST", "localhost");
        let config = AppConfig::load().expect("config loads");
        let addr = config.server.socket_addr().expect("localhost resolves");
        assert_eq!(addr, SocketAddr::new(IpAddr::from([127, 0, 0, 1]), 3000));
    }

    #[test]
    fn production_requires_session_secret() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_ENV", "production");
        let result = AppConfig::load();
        reset_env();
        assert!(matches!(result, Err(ConfigError::InsecureSessionSecret)));
    }

    #[test]
    fn rejects_default_commission_outside_bounds() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("COMMISSION_DEFAULT_RATE", "12");
        let result = AppConfig::load();
        reset_env();
        assert!(matches!(result, Err(ConfigError::InvalidRange { .. })));
    }

    #[test]
    fn parse_failure_policy_can_fail_closed() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("REVIEW_PARSE_FAILURE", "manual_review");
        env::set_var("REVIEW_API_KEY", "gsk-test");
        let config = AppConfig::load().expect("config loads");
        reset_env();
        assert!(config.review.enabled());
        assert_eq!(
            config.review.policy.on_parse_failure,
            ParseFailurePolicy::ManualReview
        );
    }
}
