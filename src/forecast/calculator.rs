use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::forecast::{algorithms, simulation};
use crate::models::{
    ForecastCalculationResult, ForecastMethod, HistoricalDataPoint, IncomingStockItem,
    SeasonalStrategy, StockStatus,
};

/// Safety buffer subtracted when scheduling a non-urgent order.
const ORDER_SAFETY_BUFFER_DAYS: i64 = 14;
/// Order delay applied to low-status items.
const LOW_STATUS_ORDER_DELAY_DAYS: i64 = 3;
/// Display timeline slack past the procurement window.
const DISPLAY_HORIZON_SLACK_DAYS: i64 = 60;
/// Minimum display timeline horizon.
const MIN_DISPLAY_HORIZON_DAYS: i64 = 365;
/// Seasonal-method confidence bounds, driven by history depth.
const SEASONAL_CONFIDENCE_FLOOR: f64 = 0.6;
/// Confidence assigned to the fallback method.
const DEFAULT_METHOD_CONFIDENCE: f64 = 0.5;
const DAYS_PER_MONTH: f64 = 30.0;
const MONTHS_PER_YEAR: f64 = 12.0;

/// Inputs for one per-item forecast run.
///
/// Callers must not submit an empty historical series; items without history
/// are skipped upstream (see `ForecastingService::forecast_item`). All
/// calendar arithmetic derives from `today`, so identical requests produce
/// identical results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastRequest {
    /// Raw historical consumption records, chronological.
    pub historical_data: Vec<HistoricalDataPoint>,
    /// Pre-aggregated consumption total over the observed period.
    pub total_historical_consumption: f64,
    /// Length of the observed period in months.
    pub actual_months: f64,
    pub method: ForecastMethod,
    /// Advisory threshold carried through for callers; the computation does
    /// not consume it.
    pub confidence_threshold: f64,
    pub lead_time_days: i64,
    pub shipping_time_days: i64,
    pub current_stock: f64,
    pub incoming_stock: Vec<IncomingStockItem>,
    /// Days of cover the recommended order quantity aims for.
    pub target_stock_days: f64,
    /// Reference date for all calendar arithmetic; injected for determinism.
    pub today: NaiveDate,
    #[serde(default)]
    pub seasonal_strategy: SeasonalStrategy,
}

/// Computes the consolidated forecast for one inventory item.
///
/// Pure and deterministic: dispatches on the requested method for the
/// prediction, simulates the stockout horizon against incoming shipments,
/// classifies stock status relative to total procurement time, and derives
/// the recommended order date and quantity.
pub fn calculate_forecast(request: &ForecastRequest) -> ForecastCalculationResult {
    let monthly_consumption = if request.actual_months > 0.0 {
        request.total_historical_consumption / request.actual_months
    } else {
        0.0
    };

    let quantities: Vec<f64> = request
        .historical_data
        .iter()
        .map(|point| point.quantity)
        .collect();

    let (predicted_quantity, confidence_score, trend) = match request.method {
        ForecastMethod::MovingAverage => {
            let prediction = algorithms::moving_average(&quantities);
            (
                prediction,
                algorithms::confidence_score(&quantities, prediction),
                algorithms::classify_trend(&quantities),
            )
        }
        ForecastMethod::TrendAnalysis => {
            let analysis = algorithms::trend_analysis(&quantities);
            (analysis.prediction, analysis.confidence, analysis.trend)
        }
        ForecastMethod::SeasonalAdjustment => {
            let prediction = match request.seasonal_strategy {
                SeasonalStrategy::FlatMonthlyAverage => monthly_consumption,
                SeasonalStrategy::MonthlyBuckets => {
                    algorithms::seasonal_forecast(&request.historical_data, request.today)
                }
            };
            let confidence = (quantities.len() as f64 / MONTHS_PER_YEAR)
                .clamp(SEASONAL_CONFIDENCE_FLOOR, algorithms::CONFIDENCE_CEILING);
            (prediction, confidence, algorithms::classify_trend(&quantities))
        }
        ForecastMethod::Unspecified => (
            monthly_consumption,
            DEFAULT_METHOD_CONFIDENCE,
            algorithms::classify_trend(&quantities),
        ),
    };

    let daily_consumption = monthly_consumption / DAYS_PER_MONTH;
    let recommended_order_quantity = (daily_consumption * request.target_stock_days).round();

    let days_until_stockout = if daily_consumption > 0.0 {
        (request.current_stock / daily_consumption).floor() as i64
    } else {
        simulation::NEVER_STOCKS_OUT_DAYS
    };

    let effective_days_until_stockout = simulation::effective_days_until_stockout(
        request.today,
        request.current_stock,
        daily_consumption,
        &request.incoming_stock,
    );

    let total_procurement_days = request.lead_time_days + request.shipping_time_days;
    let stock_status = StockStatus::classify(effective_days_until_stockout, total_procurement_days);

    let recommended_order_date = match stock_status {
        StockStatus::Critical => request.today,
        StockStatus::Low => request.today + Duration::days(LOW_STATUS_ORDER_DELAY_DAYS),
        StockStatus::Normal | StockStatus::High => {
            let slack = (effective_days_until_stockout
                - total_procurement_days
                - ORDER_SAFETY_BUFFER_DAYS)
                .max(0);
            request.today + Duration::days(slack)
        }
    };
    let estimated_arrival_date = recommended_order_date + Duration::days(total_procurement_days);

    // The display timeline uses a generous horizon independent of the one
    // the stockout detection simulated internally.
    let display_horizon =
        (total_procurement_days + DISPLAY_HORIZON_SLACK_DAYS).max(MIN_DISPLAY_HORIZON_DAYS);
    let projected_stock_timeline = simulation::project_stock_timeline(
        request.today,
        request.current_stock,
        daily_consumption,
        &request.incoming_stock,
        display_horizon,
    );

    debug!(
        method = %request.method,
        predicted_quantity,
        confidence_score,
        effective_days_until_stockout,
        status = %stock_status,
        "forecast calculated"
    );

    ForecastCalculationResult {
        predicted_quantity,
        confidence_score,
        recommended_order_quantity,
        recommended_order_date,
        estimated_arrival_date,
        trend,
        days_until_stockout,
        effective_days_until_stockout,
        stock_status,
        projected_stock_timeline,
        monthly_consumption,
    }
}
