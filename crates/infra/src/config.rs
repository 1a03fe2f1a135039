//! Configuration loading and representation.
//!
//! Everything is read from environment variables (see [`ENV_PREFIX`]) and
//! validated before any work starts. `from_vars` takes a lookup function so
//! tests never touch the process environment.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use printsync_core::ShopId;
use printsync_pricing::{
    DEFAULT_PLUS_SIZE_MULTIPLIER, DEFAULT_TARGET_MARGIN, Margin, PriceCalculator, PricingError,
    PricingPolicy,
};

use crate::rate_limit::{RateLimits, RetryPolicy};
use crate::sync::PropagationGroup;

pub const ENV_PREFIX: &str = "PRINTSYNC_";

/// Largest window a single batch invocation may cover.
pub const MAX_BATCH_LIMIT: u32 = 250;

pub const DEFAULT_CATALOG_URL: &str = "https://api.printify.com/v1";

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("missing required setting {0}")]
    Missing(String),

    #[error("invalid value {value:?} for {key}: {reason}")]
    Invalid {
        key: String,
        value: String,
        reason: String,
    },

    #[error(transparent)]
    Pricing(#[from] PricingError),
}

fn invalid(key: &str, value: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.into(),
    }
}

/// Tunables of the pricing/sync engine.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub target_margin: Margin,
    /// Percentage points a variant's margin may drift before it is rewritten.
    pub margin_tolerance: f64,
    /// Default window size of a batch invocation.
    pub page_size: u32,
    /// Sleep between successive external calls.
    pub pace_delay: Duration,
    pub max_retries: u32,
    pub retry_base_delay: Duration,
    pub charm_offset: u8,
    /// Page size used against the upstream listing endpoint.
    pub upstream_page_size: u32,
    pub rate_limit_per_minute: u32,
    pub rate_limit_per_day: Option<u32>,
    pub plus_size_multiplier: f64,
    /// Operator-supplied cost table; the built-in one is used when unset.
    pub cost_table_path: Option<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            target_margin: DEFAULT_TARGET_MARGIN,
            margin_tolerance: 2.0,
            page_size: 50,
            pace_delay: Duration::from_millis(300),
            max_retries: 3,
            retry_base_delay: Duration::from_secs(1),
            charm_offset: 99,
            upstream_page_size: 50,
            rate_limit_per_minute: 90,
            rate_limit_per_day: None,
            plus_size_multiplier: DEFAULT_PLUS_SIZE_MULTIPLIER,
            cost_table_path: None,
        }
    }
}

impl EngineConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Build from a variable lookup. Unset variables keep their defaults.
    pub fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let var = |name: &str| {
            let key = format!("{ENV_PREFIX}{name}");
            lookup(&key).map(|v| (key, v.trim().to_string()))
        };

        if let Some((key, v)) = var("TARGET_MARGIN") {
            let pct: f64 = parse(&key, &v)?;
            config.target_margin = Margin::from_percent(pct)?;
        }
        if let Some((key, v)) = var("MARGIN_TOLERANCE") {
            config.margin_tolerance = parse(&key, &v)?;
        }
        if let Some((key, v)) = var("PAGE_SIZE") {
            config.page_size = parse(&key, &v)?;
        }
        if let Some((key, v)) = var("PACE_DELAY_MS") {
            config.pace_delay = Duration::from_millis(parse(&key, &v)?);
        }
        if let Some((key, v)) = var("MAX_RETRIES") {
            config.max_retries = parse(&key, &v)?;
        }
        if let Some((key, v)) = var("RETRY_BASE_DELAY_MS") {
            config.retry_base_delay = Duration::from_millis(parse(&key, &v)?);
        }
        if let Some((key, v)) = var("CHARM_OFFSET") {
            config.charm_offset = parse(&key, &v)?;
        }
        if let Some((key, v)) = var("UPSTREAM_PAGE_SIZE") {
            config.upstream_page_size = parse(&key, &v)?;
        }
        if let Some((key, v)) = var("RATE_LIMIT_PER_MINUTE") {
            config.rate_limit_per_minute = parse(&key, &v)?;
        }
        if let Some((key, v)) = var("RATE_LIMIT_PER_DAY") {
            config.rate_limit_per_day = Some(parse(&key, &v)?);
        }
        let multiplier = var("PLUS_SIZE_MULTIPLIER");
        if let Some((key, v)) = &multiplier {
            config.plus_size_multiplier = parse(key, v)?;
        }
        if let Some((key, v)) = var("COST_TABLE") {
            if !v.is_empty() {
                // A table file carries its own multiplier.
                if let Some((multiplier_key, multiplier_value)) = &multiplier {
                    return Err(invalid(
                        multiplier_key,
                        multiplier_value,
                        format!("cannot be combined with {key}; set plus_size_multiplier in the table file"),
                    ));
                }
                config.cost_table_path = Some(PathBuf::from(v));
            }
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let tolerance = self.margin_tolerance;
        if !tolerance.is_finite() || tolerance < 0.0 {
            return Err(invalid(
                "margin_tolerance",
                &tolerance.to_string(),
                "must be a non-negative number",
            ));
        }
        if self.page_size == 0 || self.page_size > MAX_BATCH_LIMIT {
            return Err(invalid(
                "page_size",
                &self.page_size.to_string(),
                format!("must be in 1..={MAX_BATCH_LIMIT}"),
            ));
        }
        if self.upstream_page_size == 0 {
            return Err(invalid("upstream_page_size", "0", "must be positive"));
        }
        if self.rate_limit_per_minute == 0 {
            return Err(invalid("rate_limit_per_minute", "0", "must be positive"));
        }
        if self.rate_limit_per_day == Some(0) {
            return Err(invalid("rate_limit_per_day", "0", "must be positive"));
        }
        let multiplier = self.plus_size_multiplier;
        if !multiplier.is_finite() || multiplier < 1.0 {
            return Err(invalid(
                "plus_size_multiplier",
                &multiplier.to_string(),
                "must be >= 1.0",
            ));
        }
        PriceCalculator::new(self.charm_offset)?;
        Ok(())
    }

    pub fn calculator(&self) -> Result<PriceCalculator, ConfigError> {
        Ok(PriceCalculator::new(self.charm_offset)?)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::exponential(
            self.max_retries,
            self.retry_base_delay,
            self.retry_base_delay.saturating_mul(30),
        )
    }

    pub fn rate_limits(&self) -> RateLimits {
        RateLimits {
            per_minute: self.rate_limit_per_minute,
            per_day: self.rate_limit_per_day,
        }
    }

    /// Pricing policy over `costs` using this configuration's target.
    pub fn pricing_policy(
        &self,
        costs: std::sync::Arc<printsync_pricing::CostTable>,
    ) -> Result<PricingPolicy, ConfigError> {
        Ok(PricingPolicy::new(
            costs,
            self.calculator()?,
            self.target_margin,
            self.margin_tolerance,
        ))
    }
}

/// Connection settings for the upstream catalog API.
#[derive(Clone, PartialEq, Eq)]
pub struct CatalogSettings {
    pub base_url: String,
    pub api_token: String,
    pub timeout: Duration,
}

impl std::fmt::Debug for CatalogSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogSettings")
            .field("base_url", &self.base_url)
            .field("api_token", &"<redacted>")
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl CatalogSettings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    pub fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let token_key = format!("{ENV_PREFIX}API_TOKEN");
        let api_token = lookup(&token_key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .ok_or(ConfigError::Missing(token_key))?;

        let base_url = lookup(&format!("{ENV_PREFIX}API_BASE_URL"))
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_CATALOG_URL.to_string());

        let timeout_key = format!("{ENV_PREFIX}API_TIMEOUT_SECS");
        let timeout = match lookup(&timeout_key) {
            Some(v) => Duration::from_secs(parse(&timeout_key, v.trim())?),
            None => Duration::from_secs(30),
        };

        Ok(Self {
            base_url,
            api_token,
            timeout,
        })
    }
}

/// Master/dependent layout from `PRINTSYNC_MASTER_SHOP` and the
/// comma-separated `PRINTSYNC_DEPENDENT_SHOPS`.
pub fn propagation_group_from_vars(
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<PropagationGroup, ConfigError> {
    let master_key = format!("{ENV_PREFIX}MASTER_SHOP");
    let master_raw = lookup(&master_key).ok_or_else(|| ConfigError::Missing(master_key.clone()))?;
    let master = master_raw
        .parse::<ShopId>()
        .map_err(|e| invalid(&master_key, &master_raw, e.to_string()))?;

    let deps_key = format!("{ENV_PREFIX}DEPENDENT_SHOPS");
    let mut dependents = Vec::new();
    if let Some(raw) = lookup(&deps_key) {
        for part in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let shop = part
                .parse::<ShopId>()
                .map_err(|e| invalid(&deps_key, part, e.to_string()))?;
            dependents.push(shop);
        }
    }

    PropagationGroup::new(master, dependents).map_err(|e| invalid(&deps_key, "", e.to_string()))
}

fn parse<T>(key: &str, value: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value
        .parse()
        .map_err(|e: T::Err| invalid(key, value, e.to_string()))
}
