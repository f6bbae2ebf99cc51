//! Client configuration: credentials, target environment, retry policy.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use base64::Engine;

use crate::constants::{DEFAULT_H2H_CACHE_PATH, PRODUCTION_URL, SANDBOX_URL};
use crate::error::{PayRetailersError, Result};

/// Shop credentials. Immutable once a client is built.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub shop_id: String,
    pub secret_key: String,
    pub subscription_key: String,
}

impl Credentials {
    pub fn new(
        shop_id: impl Into<String>,
        secret_key: impl Into<String>,
        subscription_key: impl Into<String>,
    ) -> Self {
        Self {
            shop_id: shop_id.into(),
            secret_key: secret_key.into(),
            subscription_key: subscription_key.into(),
        }
    }

    /// `Basic base64("shopId:secretKey")`.
    pub fn basic_auth_header(&self) -> String {
        let raw = format!("{}:{}", self.shop_id, self.secret_key);
        format!(
            "Basic {}",
            base64::engine::general_purpose::STANDARD.encode(raw.as_bytes())
        )
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("shop_id", &self.shop_id)
            .field("secret_key", &"<redacted>")
            .field("subscription_key", &"<redacted>")
            .finish()
    }
}

/// Which gateway deployment a client talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    Sandbox,
    #[default]
    Production,
}

impl Environment {
    pub fn from_sandbox_flag(sandbox: bool) -> Self {
        if sandbox {
            Environment::Sandbox
        } else {
            Environment::Production
        }
    }

    pub fn base_url(&self) -> &'static str {
        match self {
            Environment::Sandbox => SANDBOX_URL,
            Environment::Production => PRODUCTION_URL,
        }
    }

    pub fn is_sandbox(&self) -> bool {
        matches!(self, Environment::Sandbox)
    }
}

/// Bounded exponential back-off for transport failures and 5xx responses.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total tries, including the first one. Values below 1 are treated as 1.
    pub max_attempts: u32,
    pub base_delay: Duration,
    /// Multiplier applied per retry. Values below 1.0 are treated as 1.0.
    pub growth_factor: f64,
    /// Ceiling for any single delay.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(4),
            growth_factor: 2.0,
            max_delay: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    /// Same defaults with a different attempt budget.
    pub fn with_max_attempts(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            ..Self::default()
        }
    }

    /// Retries without waiting. Useful in tests and for callers doing their own pacing.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            base_delay: Duration::ZERO,
            growth_factor: 1.0,
            max_delay: Duration::ZERO,
        }
    }

    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// Delay before retry number `retry` (1-based):
    /// `min(base * factor^(retry-1), max_delay)`.
    pub fn delay_for(&self, retry: u32) -> Duration {
        let factor = self.growth_factor.max(1.0);
        let exponent = retry.saturating_sub(1).min(i32::MAX as u32) as i32;
        let secs = self.base_delay.as_secs_f64() * factor.powi(exponent);
        Duration::try_from_secs_f64(secs)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }

    /// Every delay the policy can produce, in order. Length is `attempts() - 1`.
    pub fn schedule(&self) -> Vec<Duration> {
        (1..self.attempts()).map(|retry| self.delay_for(retry)).collect()
    }
}

/// Everything needed to build a [`PayRetailersClient`](crate::PayRetailersClient).
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub credentials: Credentials,
    pub environment: Environment,
    pub retry: RetryPolicy,
    /// Where the H2H blacklist is persisted.
    pub h2h_cache_path: PathBuf,
}

impl ClientConfig {
    pub fn new(credentials: Credentials, environment: Environment) -> Self {
        Self {
            credentials,
            environment,
            retry: RetryPolicy::default(),
            h2h_cache_path: PathBuf::from(DEFAULT_H2H_CACHE_PATH),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_h2h_cache_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.h2h_cache_path = path.into();
        self
    }

    /// Read configuration from `PAYRETAILERS_*` environment variables.
    ///
    /// Binaries should call `dotenvy::dotenv()` first so a local `.env` is honoured.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let required = |key: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| PayRetailersError::config(format!("{key} is required")))
        };

        let credentials = Credentials::new(
            required("PAYRETAILERS_SHOP_ID")?,
            required("PAYRETAILERS_SECRET_KEY")?,
            required("PAYRETAILERS_SUBSCRIPTION_KEY")?,
        );

        let sandbox = lookup("PAYRETAILERS_SANDBOX")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(false);

        let mut config = Self::new(credentials, Environment::from_sandbox_flag(sandbox));

        if let Some(raw) = lookup("PAYRETAILERS_MAX_RETRIES") {
            let attempts: u32 = raw.trim().parse().map_err(|_| {
                PayRetailersError::config(format!(
                    "PAYRETAILERS_MAX_RETRIES must be a positive integer, got {raw:?}"
                ))
            })?;
            config.retry = RetryPolicy::with_max_attempts(attempts);
        }

        if let Some(path) = lookup("PAYRETAILERS_H2H_CACHE_PATH").filter(|p| !p.is_empty()) {
            config.h2h_cache_path = PathBuf::from(path);
        }

        Ok(config)
    }
}
