//! Trigger Configuration Settings
//!
//! Configuration types for the stream trigger, loaded from environment
//! variables.

use std::time::Duration;

use crate::domain::channel::{
    AuthToken, ChannelKind, DEFAULT_RECONNECT_INTERVAL, SubscriptionConfig,
};

/// Lighter network environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    /// Production network.
    #[default]
    Mainnet,
    /// Test network.
    Testnet,
}

impl Environment {
    /// Parse environment from string.
    ///
    /// # Errors
    ///
    /// Returns an error for anything other than `mainnet` or `testnet`.
    pub fn parse(s: &str) -> Result<Self, ConfigError> {
        match s.trim().to_lowercase().as_str() {
            "mainnet" => Ok(Self::Mainnet),
            "testnet" => Ok(Self::Testnet),
            _ => Err(ConfigError::InvalidValue {
                key: "LIGHTER_ENVIRONMENT".to_string(),
                value: s.to_string(),
            }),
        }
    }

    /// Get the environment name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Mainnet => "mainnet",
            Self::Testnet => "testnet",
        }
    }

    /// REST API base URL.
    #[must_use]
    pub const fn api_base_url(&self) -> &'static str {
        match self {
            Self::Mainnet => "https://mainnet.zklighter.elliot.ai",
            Self::Testnet => "https://testnet.zklighter.elliot.ai",
        }
    }

    /// Real-time feed WebSocket URL.
    #[must_use]
    pub const fn stream_url(&self) -> &'static str {
        match self {
            Self::Mainnet => "wss://mainnet.zklighter.elliot.ai/stream",
            Self::Testnet => "wss://testnet.zklighter.elliot.ai/stream",
        }
    }
}

/// Lighter credentials relevant to the stream.
#[derive(Clone, Default)]
pub struct Credentials {
    environment: Environment,
    auth_token: Option<AuthToken>,
}

impl Credentials {
    /// Create new credentials.
    #[must_use]
    pub const fn new(environment: Environment, auth_token: Option<AuthToken>) -> Self {
        Self {
            environment,
            auth_token,
        }
    }

    /// Network environment.
    #[must_use]
    pub const fn environment(&self) -> Environment {
        self.environment
    }

    /// Auth token, if configured.
    #[must_use]
    pub const fn auth_token(&self) -> Option<&AuthToken> {
        self.auth_token.as_ref()
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("environment", &self.environment)
            .field(
                "auth_token",
                &self.auth_token.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

/// Complete trigger configuration.
#[derive(Debug, Clone)]
pub struct TriggerConfig {
    /// Credentials (environment and auth token).
    pub credentials: Credentials,
    /// Channel subscription settings.
    pub subscription: SubscriptionConfig,
    /// Feed URL override, mostly for local testing.
    pub stream_url_override: Option<String>,
    /// Prometheus metrics port (0 = disabled).
    pub metrics_port: u16,
}

impl TriggerConfig {
    /// Create configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is set to an unparseable value.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create configuration from an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is set to an unparseable value.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let environment = get("LIGHTER_ENVIRONMENT")
            .map(|s| Environment::parse(&s))
            .transpose()?
            .unwrap_or_default();

        let auth_token = get("LIGHTER_AUTH_TOKEN").and_then(AuthToken::new);

        let channel_kind = get("LIGHTER_CHANNEL")
            .map_or(ChannelKind::OrderBook, |s| s.parse().unwrap_or(ChannelKind::OrderBook));

        let market_index = parse_optional::<u32>(&get, "LIGHTER_MARKET_INDEX")?;
        let account_index = parse_optional::<u64>(&get, "LIGHTER_ACCOUNT_INDEX")?;
        let all_markets = parse_optional::<bool>(&get, "LIGHTER_ALL_MARKETS")?.unwrap_or(false);
        let reconnect = parse_optional::<bool>(&get, "LIGHTER_RECONNECT")?.unwrap_or(true);
        let reconnect_interval = parse_optional::<u64>(&get, "LIGHTER_RECONNECT_INTERVAL_MS")?
            .map_or(DEFAULT_RECONNECT_INTERVAL, Duration::from_millis);
        let metrics_port =
            parse_optional::<u16>(&get, "LIGHTER_TRIGGER_METRICS_PORT")?.unwrap_or(0);

        let mut subscription = SubscriptionConfig::new(channel_kind)
            .with_all_markets(all_markets)
            .with_auth_token(auth_token.clone())
            .with_reconnect(reconnect)
            .with_reconnect_interval(reconnect_interval);
        subscription.market_index = market_index;
        subscription.account_index = account_index;

        Ok(Self {
            credentials: Credentials::new(environment, auth_token),
            subscription,
            stream_url_override: get("LIGHTER_STREAM_URL"),
            metrics_port,
        })
    }

    /// Feed URL to connect to.
    #[must_use]
    pub fn stream_url(&self) -> String {
        self.stream_url_override
            .clone()
            .unwrap_or_else(|| self.credentials.environment().stream_url().to_string())
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Environment variable has a value that cannot be parsed.
    #[error("invalid value for {key}: {value:?}")]
    InvalidValue {
        /// Variable name.
        key: String,
        /// Offending value.
        value: String,
    },
}

fn parse_optional<T: std::str::FromStr>(
    get: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Result<Option<T>, ConfigError> {
    get(key)
        .map(|value| {
            value
                .trim()
                .to_lowercase()
                .parse::<T>()
                .map_err(|_| ConfigError::InvalidValue {
                    key: key.to_string(),
                    value,
                })
        })
        .transpose()
}
