//! Demand Forecast Library
//!
//! This crate provides demand forecasting for inventory procurement planning:
//! historical-consumption modeling (moving average, trend regression, seasonal
//! buckets), incoming-shipment-aware stockout projection, and per-item order
//! recommendations. The calculation core is pure and deterministic; data
//! fetching happens behind the [`services::DemandDataSource`] seam.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

// Core modules
pub mod config;
pub mod errors;
pub mod forecast;
pub mod models;
pub mod services;

pub use config::ForecastConfig;
pub use errors::ForecastError;
pub use forecast::calculator::{calculate_forecast, ForecastRequest};
pub use models::{
    ForecastCalculationResult, ForecastMethod, HistoricalDataPoint, IncomingStockItem,
    SeasonalStrategy, StockProjection, StockStatus, TrendDirection,
};
pub use services::forecasting::{DemandDataSource, ForecastingService};
