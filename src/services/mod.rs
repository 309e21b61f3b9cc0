//! Forecast orchestration over external data sources

pub mod forecasting;

pub use forecasting::{DemandDataSource, ForecastItem, ForecastRunSummary, ForecastingService};
