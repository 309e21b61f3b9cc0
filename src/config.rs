use serde::Deserialize;
use validator::Validate;

use crate::models::{ForecastMethod, SeasonalStrategy};

/// Default values for configuration
const DEFAULT_CONFIDENCE_THRESHOLD: f64 = 0.7;
const DEFAULT_LEAD_TIME_DAYS: i64 = 30;
const DEFAULT_SHIPPING_TIME_DAYS: i64 = 14;
const DEFAULT_TARGET_STOCK_DAYS: f64 = 60.0;
const DEFAULT_MAX_CONCURRENT_FETCHES: u64 = 4;
const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 30;

/// Engine configuration with validation.
///
/// Per-item procurement parameters override these defaults; the engine-level
/// knobs (seasonal strategy, fetch concurrency) only live here.
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct ForecastConfig {
    /// Forecasting method applied to every item in a run
    #[serde(default = "default_method")]
    pub method: ForecastMethod,

    /// Results scoring below this confidence are flagged in the run log
    #[serde(default = "default_confidence_threshold")]
    #[validate(range(min = 0.0, max = 1.0))]
    pub confidence_threshold: f64,

    /// Vendor lead time applied when an item does not carry its own
    #[serde(default = "default_lead_time_days")]
    #[validate(range(min = 1))]
    pub default_lead_time_days: i64,

    /// Shipping time applied when an item does not carry its own
    #[serde(default = "default_shipping_time_days")]
    #[validate(range(min = 0))]
    pub default_shipping_time_days: i64,

    /// Days of cover an order recommendation aims for
    #[serde(default = "default_target_stock_days")]
    #[validate(range(min = 1.0))]
    pub target_stock_days: f64,

    /// Strategy for the seasonal_adjustment method
    #[serde(default)]
    pub seasonal_strategy: SeasonalStrategy,

    /// Upper bound on concurrent per-item data-source fetches
    #[serde(default = "default_max_concurrent_fetches")]
    #[validate(range(min = 1))]
    pub max_concurrent_fetches: u64,

    /// Deadline in seconds for one item's data-source fetches
    #[serde(default = "default_fetch_timeout_secs")]
    #[validate(range(min = 1))]
    pub fetch_timeout_secs: u64,
}

fn default_method() -> ForecastMethod {
    ForecastMethod::MovingAverage
}

fn default_confidence_threshold() -> f64 {
    DEFAULT_CONFIDENCE_THRESHOLD
}

fn default_lead_time_days() -> i64 {
    DEFAULT_LEAD_TIME_DAYS
}

fn default_shipping_time_days() -> i64 {
    DEFAULT_SHIPPING_TIME_DAYS
}

fn default_target_stock_days() -> f64 {
    DEFAULT_TARGET_STOCK_DAYS
}

fn default_max_concurrent_fetches() -> u64 {
    DEFAULT_MAX_CONCURRENT_FETCHES
}

fn default_fetch_timeout_secs() -> u64 {
    DEFAULT_FETCH_TIMEOUT_SECS
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            method: default_method(),
            confidence_threshold: default_confidence_threshold(),
            default_lead_time_days: default_lead_time_days(),
            default_shipping_time_days: default_shipping_time_days(),
            target_stock_days: default_target_stock_days(),
            seasonal_strategy: SeasonalStrategy::default(),
            max_concurrent_fetches: default_max_concurrent_fetches(),
            fetch_timeout_secs: default_fetch_timeout_secs(),
        }
    }
}
