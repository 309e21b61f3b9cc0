use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// One aggregated monthly consumption observation.
///
/// The sequence handed to the calculator is chronological; aggregation to
/// one row per month happens upstream and is not assumed here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoricalDataPoint {
    pub month: NaiveDate,
    pub quantity: f64,
}

/// One line of an inbound shipment that has not yet been received.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncomingStockItem {
    pub shipment_id: String,
    /// Raw ETA as reported by the shipment feed. Items without a parseable
    /// ETA are excluded from stockout simulation.
    pub eta: Option<String>,
    pub quantity: f64,
    pub transport_mode: String,
    pub vendor_code: String,
    pub vendor_name: String,
}

impl IncomingStockItem {
    /// Calendar-day ETA parsed from the raw string, if present and valid.
    ///
    /// Only the date portion participates; a datetime suffix is ignored so
    /// that deliveries match projection days by calendar-date equality.
    pub fn parsed_eta(&self) -> Option<NaiveDate> {
        let raw = self.eta.as_deref()?;
        let date_part = raw.get(..10).unwrap_or(raw);
        NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()
    }
}

/// Projected stock position for a single simulated day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockProjection {
    pub date: NaiveDate,
    /// Running stock clamped at zero for reporting. The simulator's internal
    /// ledger is allowed to go negative between deliveries.
    pub projected_stock: f64,
    pub consumption: f64,
    pub incoming_delivery: f64,
}

/// Forecasting method selector.
///
/// Unrecognized selectors deserialize to [`ForecastMethod::Unspecified`]
/// rather than erroring, matching the dispatch's fallback branch.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case", from = "String")]
#[strum(serialize_all = "snake_case")]
pub enum ForecastMethod {
    MovingAverage,
    TrendAnalysis,
    SeasonalAdjustment,
    /// Fallback for unrecognized method selectors; the calculator uses the
    /// flat monthly average at fixed 0.5 confidence.
    Unspecified,
}

impl From<String> for ForecastMethod {
    fn from(raw: String) -> Self {
        raw.parse().unwrap_or(ForecastMethod::Unspecified)
    }
}

/// Direction of the consumption trend.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TrendDirection {
    Increasing,
    Decreasing,
    Stable,
}

/// Stock health relative to the item's total procurement time.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum StockStatus {
    Critical,
    Low,
    Normal,
    High,
}

/// Days past total procurement time that still classify as low stock.
const LOW_STATUS_MARGIN_DAYS: i64 = 30;
/// Days past total procurement time that still classify as normal stock.
const NORMAL_STATUS_MARGIN_DAYS: i64 = 60;

impl StockStatus {
    /// Classifies stockout horizon against the total procurement time
    /// (vendor lead time + shipping time). Thresholds are relative to the
    /// procurement window, not absolute constants; first match wins.
    pub fn classify(effective_days_until_stockout: i64, total_procurement_days: i64) -> Self {
        if effective_days_until_stockout <= total_procurement_days {
            StockStatus::Critical
        } else if effective_days_until_stockout <= total_procurement_days + LOW_STATUS_MARGIN_DAYS {
            StockStatus::Low
        } else if effective_days_until_stockout
            <= total_procurement_days + NORMAL_STATUS_MARGIN_DAYS
        {
            StockStatus::Normal
        } else {
            StockStatus::High
        }
    }
}

/// Strategy for the `seasonal_adjustment` forecasting method.
///
/// Month-bucket averaging and the flat monthly average both have a claim to
/// the seasonal branch; both are kept behind this switch, with the flat
/// average as the default.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SeasonalStrategy {
    #[default]
    FlatMonthlyAverage,
    MonthlyBuckets,
}

/// Consolidated per-item forecast produced by the calculator.
///
/// Produced fresh per run and never persisted by this crate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastCalculationResult {
    pub predicted_quantity: f64,
    /// Clamped to [0.1, 0.95]; degenerate small samples floor at 0.3.
    pub confidence_score: f64,
    pub recommended_order_quantity: f64,
    pub recommended_order_date: NaiveDate,
    pub estimated_arrival_date: NaiveDate,
    pub trend: TrendDirection,
    /// Stockout horizon ignoring incoming shipments.
    pub days_until_stockout: i64,
    /// Stockout horizon accounting for incoming shipments. Equals
    /// `days_until_stockout` exactly when no incoming stock exists.
    pub effective_days_until_stockout: i64,
    pub stock_status: StockStatus,
    pub projected_stock_timeline: Vec<StockProjection>,
    /// Monthly average consumption derived from the historical aggregate.
    pub monthly_consumption: f64,
}
