//! Channel Resolution
//!
//! Domain types describing which Lighter feed channel to subscribe to and
//! the pure function that turns a [`SubscriptionConfig`] into the channel
//! identifier sent on the wire.
//!
//! # Identifier Grammar
//!
//! ```text
//! order_book/5          single-market channel
//! market_stats/all      market-wide channel
//! account_all/42        account channel
//! height                block height channel
//! ```

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

/// Default delay before re-establishing a dropped connection.
pub const DEFAULT_RECONNECT_INTERVAL: Duration = Duration::from_millis(5000);

// =============================================================================
// Errors
// =============================================================================

/// Configuration errors detected while resolving a channel.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    /// The channel needs a market index and none was configured.
    #[error("channel {channel} requires a market index")]
    MissingMarketIndex {
        /// Channel wire name.
        channel: String,
    },

    /// The channel needs an account index and none was configured.
    #[error("channel {channel} requires an account index")]
    MissingAccountIndex {
        /// Channel wire name.
        channel: String,
    },

    /// The channel name is empty.
    #[error("channel name is empty")]
    EmptyChannel,
}

// =============================================================================
// Channel Kind
// =============================================================================

/// How a channel is scoped, which decides the identifier shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelScope {
    /// Always bound to one market.
    Market,
    /// Bound to one market, or to every market.
    MarketWide,
    /// Bound to one account.
    Account,
    /// The block height feed.
    Height,
    /// Unrecognised channel, passed through by name.
    Other,
}

/// Supported Lighter feed channels.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ChannelKind {
    /// Order book updates for a market.
    OrderBook,
    /// Trade feed for a market.
    Trade,
    /// Perpetual market statistics.
    MarketStats,
    /// Spot market statistics.
    SpotMarketStats,
    /// All account data (positions, orders, trades).
    AccountAll,
    /// All account orders.
    AccountAllOrders,
    /// All account trades.
    AccountAllTrades,
    /// All account positions.
    AccountAllPositions,
    /// All account assets (spot).
    AccountAllAssets,
    /// Account statistics.
    UserStats,
    /// Account transaction updates.
    AccountTx,
    /// Account notifications (liquidation, deleverage).
    Notification,
    /// Block height updates.
    Height,
    /// Any other channel name, sent unchanged.
    Custom(String),
}

impl ChannelKind {
    /// Every named channel kind.
    pub const KNOWN: [Self; 13] = [
        Self::OrderBook,
        Self::Trade,
        Self::MarketStats,
        Self::SpotMarketStats,
        Self::AccountAll,
        Self::AccountAllOrders,
        Self::AccountAllTrades,
        Self::AccountAllPositions,
        Self::AccountAllAssets,
        Self::UserStats,
        Self::AccountTx,
        Self::Notification,
        Self::Height,
    ];

    /// Wire name of the channel.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::OrderBook => "order_book",
            Self::Trade => "trade",
            Self::MarketStats => "market_stats",
            Self::SpotMarketStats => "spot_market_stats",
            Self::AccountAll => "account_all",
            Self::AccountAllOrders => "account_all_orders",
            Self::AccountAllTrades => "account_all_trades",
            Self::AccountAllPositions => "account_all_positions",
            Self::AccountAllAssets => "account_all_assets",
            Self::UserStats => "user_stats",
            Self::AccountTx => "account_tx",
            Self::Notification => "notification",
            Self::Height => "height",
            Self::Custom(name) => name,
        }
    }

    /// Scope of the channel.
    #[must_use]
    pub const fn scope(&self) -> ChannelScope {
        match self {
            Self::OrderBook | Self::Trade => ChannelScope::Market,
            Self::MarketStats | Self::SpotMarketStats => ChannelScope::MarketWide,
            Self::AccountAll
            | Self::AccountAllOrders
            | Self::AccountAllTrades
            | Self::AccountAllPositions
            | Self::AccountAllAssets
            | Self::UserStats
            | Self::AccountTx
            | Self::Notification => ChannelScope::Account,
            Self::Height => ChannelScope::Height,
            Self::Custom(_) => ChannelScope::Other,
        }
    }

    /// Whether the subscribe frame should carry the auth token.
    #[must_use]
    pub const fn requires_auth(&self) -> bool {
        matches!(self.scope(), ChannelScope::Account)
    }
}

impl FromStr for ChannelKind {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim();
        Ok(Self::KNOWN
            .into_iter()
            .find(|kind| kind.as_str() == name)
            .unwrap_or_else(|| Self::Custom(name.to_string())))
    }
}

impl fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Auth Token
// =============================================================================

/// Pre-generated Lighter auth token.
///
/// `Debug` never prints the token.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthToken(String);

impl AuthToken {
    /// Wrap a token. Returns `None` for an empty or blank token.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Option<Self> {
        let token = token.into();
        if token.trim().is_empty() {
            None
        } else {
            Some(Self(token))
        }
    }

    /// Raw token value.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AuthToken([REDACTED])")
    }
}

// =============================================================================
// Subscription Config
// =============================================================================

/// What to subscribe to and how to recover from disconnects.
///
/// Built once per activation and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionConfig {
    /// Channel to subscribe to.
    pub channel_kind: ChannelKind,
    /// Market index for market channels.
    pub market_index: Option<u32>,
    /// Account index for account channels.
    pub account_index: Option<u64>,
    /// Subscribe to every market (market-wide channels only).
    pub subscribe_to_all_markets: bool,
    /// Token attached to authenticated channels.
    pub auth_token: Option<AuthToken>,
    /// Reconnect after an unplanned close.
    pub reconnect: bool,
    /// Fixed delay before reconnecting.
    pub reconnect_interval: Duration,
}

impl SubscriptionConfig {
    /// Create a configuration for a channel with default reconnect settings.
    #[must_use]
    pub const fn new(channel_kind: ChannelKind) -> Self {
        Self {
            channel_kind,
            market_index: None,
            account_index: None,
            subscribe_to_all_markets: false,
            auth_token: None,
            reconnect: true,
            reconnect_interval: DEFAULT_RECONNECT_INTERVAL,
        }
    }

    /// Set the market index.
    #[must_use]
    pub fn with_market_index(mut self, market_index: u32) -> Self {
        self.market_index = Some(market_index);
        self
    }

    /// Set the account index.
    #[must_use]
    pub fn with_account_index(mut self, account_index: u64) -> Self {
        self.account_index = Some(account_index);
        self
    }

    /// Subscribe to every market instead of a single one.
    #[must_use]
    pub fn with_all_markets(mut self, all_markets: bool) -> Self {
        self.subscribe_to_all_markets = all_markets;
        self
    }

    /// Attach an auth token.
    #[must_use]
    pub fn with_auth_token(mut self, token: Option<AuthToken>) -> Self {
        self.auth_token = token;
        self
    }

    /// Enable or disable reconnection.
    #[must_use]
    pub fn with_reconnect(mut self, reconnect: bool) -> Self {
        self.reconnect = reconnect;
        self
    }

    /// Set the reconnect interval.
    #[must_use]
    pub fn with_reconnect_interval(mut self, interval: Duration) -> Self {
        self.reconnect_interval = interval;
        self
    }

    /// Token to send in the subscribe frame, if the channel needs one.
    ///
    /// An auth-required channel without a token subscribes anonymously and
    /// lets the server decide.
    #[must_use]
    pub fn subscribe_auth(&self) -> Option<&str> {
        if self.channel_kind.requires_auth() {
            self.auth_token.as_ref().map(AuthToken::expose)
        } else {
            None
        }
    }
}

// =============================================================================
// Channel Identifier
// =============================================================================

/// Channel identifier sent in the subscribe frame.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChannelIdentifier(String);

impl ChannelIdentifier {
    /// Identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChannelIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Resolve the channel identifier for a configuration.
///
/// # Errors
///
/// Returns [`ConfigurationError`] if the channel needs a market or account
/// index that is not configured, or if a custom channel name is blank.
pub fn resolve_channel(
    config: &SubscriptionConfig,
) -> Result<ChannelIdentifier, ConfigurationError> {
    let kind = &config.channel_kind;

    let identifier = match kind.scope() {
        ChannelScope::Market => format!("{kind}/{}", require_market(config)?),
        ChannelScope::MarketWide if config.subscribe_to_all_markets => format!("{kind}/all"),
        ChannelScope::MarketWide => format!("{kind}/{}", require_market(config)?),
        ChannelScope::Account => {
            let account_index = config.account_index.ok_or_else(|| {
                ConfigurationError::MissingAccountIndex {
                    channel: kind.to_string(),
                }
            })?;
            format!("{kind}/{account_index}")
        }
        ChannelScope::Height => "height".to_string(),
        ChannelScope::Other if kind.as_str().trim().is_empty() => {
            return Err(ConfigurationError::EmptyChannel);
        }
        ChannelScope::Other => kind.to_string(),
    };

    Ok(ChannelIdentifier(identifier))
}

fn require_market(config: &SubscriptionConfig) -> Result<u32, ConfigurationError> {
    config
        .market_index
        .ok_or_else(|| ConfigurationError::MissingMarketIndex {
            channel: config.channel_kind.to_string(),
        })
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use test_case::test_case;

    use super::*;

    #[test_case(ChannelKind::OrderBook, 5, "order_book/5" ; "order book")]
    #[test_case(ChannelKind::Trade, 0, "trade/0" ; "trade")]
    #[test_case(ChannelKind::MarketStats, 7, "market_stats/7" ; "market stats single")]
    #[test_case(ChannelKind::SpotMarketStats, 2048, "spot_market_stats/2048" ; "spot market stats single")]
    fn market_channels(kind: ChannelKind, market: u32, expected: &str) {
        let config = SubscriptionConfig::new(kind).with_market_index(market);
        assert_eq!(resolve_channel(&config).unwrap().as_str(), expected);
    }

    #[test_case(ChannelKind::MarketStats, "market_stats/all" ; "market stats")]
    #[test_case(ChannelKind::SpotMarketStats, "spot_market_stats/all" ; "spot market stats")]
    fn all_markets_ignores_market_index(kind: ChannelKind, expected: &str) {
        let config = SubscriptionConfig::new(kind)
            .with_market_index(7)
            .with_all_markets(true);
        assert_eq!(resolve_channel(&config).unwrap().as_str(), expected);

        let without_index =
            SubscriptionConfig::new(config.channel_kind.clone()).with_all_markets(true);
        assert_eq!(resolve_channel(&without_index).unwrap().as_str(), expected);
    }

    #[test]
    fn all_markets_flag_ignored_for_single_market_channels() {
        let config = SubscriptionConfig::new(ChannelKind::OrderBook)
            .with_market_index(3)
            .with_all_markets(true);
        assert_eq!(resolve_channel(&config).unwrap().as_str(), "order_book/3");
    }

    #[test_case(ChannelKind::AccountAll, "account_all/42")]
    #[test_case(ChannelKind::AccountAllOrders, "account_all_orders/42")]
    #[test_case(ChannelKind::AccountAllTrades, "account_all_trades/42")]
    #[test_case(ChannelKind::AccountAllPositions, "account_all_positions/42")]
    #[test_case(ChannelKind::AccountAllAssets, "account_all_assets/42")]
    #[test_case(ChannelKind::UserStats, "user_stats/42")]
    #[test_case(ChannelKind::AccountTx, "account_tx/42")]
    #[test_case(ChannelKind::Notification, "notification/42")]
    fn account_channels(kind: ChannelKind, expected: &str) {
        let config = SubscriptionConfig::new(kind).with_account_index(42);
        assert_eq!(resolve_channel(&config).unwrap().as_str(), expected);
    }

    #[test]
    fn height_ignores_indices() {
        let config = SubscriptionConfig::new(ChannelKind::Height)
            .with_market_index(1)
            .with_account_index(2)
            .with_all_markets(true);
        assert_eq!(resolve_channel(&config).unwrap().as_str(), "height");
    }

    #[test]
    fn unknown_kind_passes_through() {
        let kind: ChannelKind = "pool_data".parse().unwrap();
        assert_eq!(kind, ChannelKind::Custom("pool_data".to_string()));

        let config = SubscriptionConfig::new(kind).with_market_index(9);
        assert_eq!(resolve_channel(&config).unwrap().as_str(), "pool_data");
    }

    #[test_case("" ; "empty")]
    #[test_case("   " ; "whitespace")]
    fn blank_custom_name_is_an_error(name: &str) {
        let kind: ChannelKind = name.parse().unwrap();
        let config = SubscriptionConfig::new(kind).with_market_index(1);
        assert_eq!(
            resolve_channel(&config),
            Err(ConfigurationError::EmptyChannel)
        );

        let raw = SubscriptionConfig::new(ChannelKind::Custom(name.to_string()));
        assert_eq!(resolve_channel(&raw), Err(ConfigurationError::EmptyChannel));
    }

    #[test]
    fn missing_market_index_is_an_error() {
        let config = SubscriptionConfig::new(ChannelKind::OrderBook);
        assert_eq!(
            resolve_channel(&config),
            Err(ConfigurationError::MissingMarketIndex {
                channel: "order_book".to_string()
            })
        );

        let stats = SubscriptionConfig::new(ChannelKind::MarketStats);
        assert!(matches!(
            resolve_channel(&stats),
            Err(ConfigurationError::MissingMarketIndex { .. })
        ));
    }

    #[test]
    fn missing_account_index_is_an_error() {
        let config = SubscriptionConfig::new(ChannelKind::UserStats).with_market_index(1);
        assert_eq!(
            resolve_channel(&config),
            Err(ConfigurationError::MissingAccountIndex {
                channel: "user_stats".to_string()
            })
        );
    }

    #[test]
    fn parse_known_kinds() {
        for kind in ChannelKind::KNOWN {
            let parsed: ChannelKind = kind.as_str().parse().unwrap();
            assert_eq!(parsed, kind);
        }
    }

    #[test]
    fn only_account_channels_require_auth() {
        for kind in ChannelKind::KNOWN {
            assert_eq!(
                kind.requires_auth(),
                kind.scope() == ChannelScope::Account,
                "{kind}"
            );
        }
        assert!(!ChannelKind::Custom("account_all".to_string()).requires_auth());
    }

    #[test]
    fn subscribe_auth_only_for_auth_channels() {
        let token = AuthToken::new("tok");

        let account = SubscriptionConfig::new(ChannelKind::AccountAll)
            .with_account_index(42)
            .with_auth_token(token.clone());
        assert_eq!(account.subscribe_auth(), Some("tok"));

        let public = SubscriptionConfig::new(ChannelKind::OrderBook)
            .with_market_index(0)
            .with_auth_token(token);
        assert_eq!(public.subscribe_auth(), None);
    }

    #[test]
    fn blank_auth_token_is_none() {
        assert!(AuthToken::new("").is_none());
        assert!(AuthToken::new("   ").is_none());
    }

    #[test]
    fn auth_token_redacted_debug() {
        let config = SubscriptionConfig::new(ChannelKind::AccountAll)
            .with_auth_token(AuthToken::new("s3cret"));
        let debug = format!("{config:?}");
        assert!(!debug.contains("s3cret"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn defaults() {
        let config = SubscriptionConfig::new(ChannelKind::Height);
        assert!(config.reconnect);
        assert_eq!(config.reconnect_interval, Duration::from_millis(5000));
        assert!(!config.subscribe_to_all_markets);
    }

    fn any_kind() -> impl Strategy<Value = ChannelKind> {
        prop_oneof![
            (0..ChannelKind::KNOWN.len()).prop_map(|i| ChannelKind::KNOWN[i].clone()),
            "[a-z_]{1,16}".prop_map(|name| name.parse::<ChannelKind>().unwrap()),
        ]
    }

    proptest! {
        #[test]
        fn identical_configs_resolve_identically(
            kind in any_kind(),
            market in proptest::option::of(any::<u32>()),
            account in proptest::option::of(any::<u64>()),
            all_markets in any::<bool>(),
        ) {
            let config = SubscriptionConfig {
                channel_kind: kind,
                market_index: market,
                account_index: account,
                subscribe_to_all_markets: all_markets,
                auth_token: None,
                reconnect: true,
                reconnect_interval: DEFAULT_RECONNECT_INTERVAL,
            };
            let copy = config.clone();
            prop_assert_eq!(resolve_channel(&config), resolve_channel(&copy));
        }
    }
}
