use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

use crate::{
    config::ForecastConfig,
    errors::ForecastError,
    forecast::calculator::{calculate_forecast, ForecastRequest},
    models::{ForecastCalculationResult, HistoricalDataPoint, IncomingStockItem, StockStatus},
};

/// Read-side boundary to the surrounding application's data store.
///
/// The three fetches mirror the upstream services the calculator depends on:
/// historical sales aggregates, on-hand stock, and inbound shipment lines.
/// Implementations are expected to be cheap to clone behind an `Arc` and
/// safe to call concurrently.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DemandDataSource: Send + Sync {
    /// Aggregated monthly consumption history for an item, oldest first.
    async fn fetch_historical_consumption(
        &self,
        item_id: Uuid,
    ) -> Result<Vec<HistoricalDataPoint>, ForecastError>;

    /// Current on-hand stock for an item.
    async fn fetch_current_stock(&self, item_id: Uuid) -> Result<f64, ForecastError>;

    /// Inbound shipment lines not yet received.
    async fn fetch_incoming_stock(
        &self,
        item_id: Uuid,
    ) -> Result<Vec<IncomingStockItem>, ForecastError>;
}

/// Per-item procurement parameters supplied by the caller.
///
/// Optional fields fall back to the corresponding [`ForecastConfig`]
/// defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastItem {
    pub item_id: Uuid,
    pub item_code: String,
    /// Vendor lead time; `None` uses the configured default.
    pub lead_time_days: Option<i64>,
    /// Shipping time; `None` uses the configured default.
    pub shipping_time_days: Option<i64>,
    /// Overrides the configured target stock days when set.
    pub target_stock_days: Option<f64>,
}

/// One item's forecast within a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemForecast {
    pub item_id: Uuid,
    pub item_code: String,
    pub result: ForecastCalculationResult,
}

/// Aggregate outcome of a multi-item forecast run.
#[derive(Debug, Serialize, Deserialize)]
pub struct ForecastRunSummary {
    /// Per-item forecasts, ordered by item code.
    pub results: Vec<ItemForecast>,
    /// Items skipped for lack of historical data (caller contract, not an
    /// error).
    pub skipped: Vec<Uuid>,
    /// Items whose data-source fetch failed.
    pub failed: Vec<Uuid>,
    /// Tally of results per stock status.
    pub status_counts: HashMap<StockStatus, i64>,
    pub generated_at: DateTime<Utc>,
}

/// Runs the pure forecast calculator across items, fetching inputs through a
/// [`DemandDataSource`] with bounded parallelism.
///
/// The original orchestration awaited one item's round trips before starting
/// the next; fetches here overlap up to the configured concurrency while the
/// calculation itself stays sequential, deterministic, and stateless.
#[derive(Clone)]
pub struct ForecastingService {
    data_source: Arc<dyn DemandDataSource>,
    config: ForecastConfig,
}

impl ForecastingService {
    pub fn new(
        data_source: Arc<dyn DemandDataSource>,
        config: ForecastConfig,
    ) -> Result<Self, ForecastError> {
        config.validate()?;
        Ok(Self {
            data_source,
            config,
        })
    }

    /// Fetches one item's inputs under the configured deadline.
    async fn fetch_inputs(
        &self,
        item: &ForecastItem,
    ) -> Result<(Vec<HistoricalDataPoint>, f64, Vec<IncomingStockItem>), ForecastError> {
        let deadline = std::time::Duration::from_secs(self.config.fetch_timeout_secs);
        tokio::time::timeout(deadline, async {
            let historical = self
                .data_source
                .fetch_historical_consumption(item.item_id)
                .await?;
            if historical.is_empty() {
                // Skip the remaining round trips; the item will be skipped.
                return Ok((historical, 0.0, Vec::new()));
            }
            let current_stock = self.data_source.fetch_current_stock(item.item_id).await?;
            let incoming_stock = self.data_source.fetch_incoming_stock(item.item_id).await?;
            Ok((historical, current_stock, incoming_stock))
        })
        .await
        .map_err(|_| {
            ForecastError::ExternalServiceError(format!(
                "data source fetch timed out for item {}",
                item.item_id
            ))
        })?
    }

    /// Forecasts a single item as of the given reference date.
    ///
    /// Returns `Ok(None)` when the item has no historical consumption rows;
    /// the calculator is never invoked with an empty series.
    #[instrument(skip(self, item), fields(item_code = %item.item_code))]
    pub async fn forecast_item(
        &self,
        item: &ForecastItem,
        as_of: NaiveDate,
    ) -> Result<Option<ItemForecast>, ForecastError> {
        let (historical, current_stock, incoming_stock) = self.fetch_inputs(item).await?;
        if historical.is_empty() {
            warn!(item_id = %item.item_id, "no historical consumption rows, skipping forecast");
            return Ok(None);
        }

        // The upstream aggregate store is out of scope; derive the totals
        // from the monthly rows themselves.
        let total_historical_consumption: f64 = historical.iter().map(|p| p.quantity).sum();
        let actual_months = historical.len() as f64;

        let request = ForecastRequest {
            historical_data: historical,
            total_historical_consumption,
            actual_months,
            method: self.config.method,
            confidence_threshold: self.config.confidence_threshold,
            lead_time_days: item
                .lead_time_days
                .unwrap_or(self.config.default_lead_time_days),
            shipping_time_days: item
                .shipping_time_days
                .unwrap_or(self.config.default_shipping_time_days),
            current_stock,
            incoming_stock,
            target_stock_days: item
                .target_stock_days
                .unwrap_or(self.config.target_stock_days),
            today: as_of,
            seasonal_strategy: self.config.seasonal_strategy,
        };
        let result = calculate_forecast(&request);

        if result.confidence_score < self.config.confidence_threshold {
            warn!(
                item_id = %item.item_id,
                confidence = result.confidence_score,
                threshold = self.config.confidence_threshold,
                "forecast confidence below configured threshold"
            );
        }

        Ok(Some(ItemForecast {
            item_id: item.item_id,
            item_code: item.item_code.clone(),
            result,
        }))
    }

    /// Forecasts a batch of items with bounded fetch parallelism.
    ///
    /// Failures are isolated per item: a data-source error for one item is
    /// recorded in the summary and does not abort the run.
    #[instrument(skip(self, items), fields(items = items.len()))]
    pub async fn forecast_items(
        &self,
        items: &[ForecastItem],
        as_of: NaiveDate,
    ) -> ForecastRunSummary {
        info!(%as_of, "starting forecast run");

        let outcomes = stream::iter(items)
            .map(|item| async move { (item.item_id, self.forecast_item(item, as_of).await) })
            .buffer_unordered(self.config.max_concurrent_fetches as usize)
            .collect::<Vec<_>>()
            .await;

        let mut summary = ForecastRunSummary {
            results: Vec::new(),
            skipped: Vec::new(),
            failed: Vec::new(),
            status_counts: HashMap::new(),
            generated_at: Utc::now(),
        };

        for (item_id, outcome) in outcomes {
            match outcome {
                Ok(Some(forecast)) => {
                    *summary
                        .status_counts
                        .entry(forecast.result.stock_status)
                        .or_insert(0) += 1;
                    summary.results.push(forecast);
                }
                Ok(None) => summary.skipped.push(item_id),
                Err(err) => {
                    error!(%item_id, error = %err, "forecast failed for item");
                    summary.failed.push(item_id);
                }
            }
        }

        // Completion order is nondeterministic under buffer_unordered; keep
        // the output stable for callers.
        summary.results.sort_by(|a, b| a.item_code.cmp(&b.item_code));

        info!(
            results = summary.results.len(),
            skipped = summary.skipped.len(),
            failed = summary.failed.len(),
            "forecast run complete"
        );
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn history_rows(quantities: &[f64]) -> Vec<HistoricalDataPoint> {
        quantities
            .iter()
            .enumerate()
            .map(|(i, &quantity)| HistoricalDataPoint {
                month: NaiveDate::from_ymd_opt(2024, 1 + i as u32, 1).unwrap(),
                quantity,
            })
            .collect()
    }

    fn item(code: &str) -> ForecastItem {
        ForecastItem {
            item_id: Uuid::new_v4(),
            item_code: code.to_string(),
            lead_time_days: Some(10),
            shipping_time_days: Some(5),
            target_stock_days: None,
        }
    }

    fn as_of() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, 1).unwrap()
    }

    #[tokio::test]
    async fn forecast_item_runs_calculator_on_fetched_data() {
        let mut source = MockDemandDataSource::new();
        source
            .expect_fetch_historical_consumption()
            .returning(|_| Ok(history_rows(&[300.0, 300.0, 300.0])));
        source.expect_fetch_current_stock().returning(|_| Ok(50.0));
        source
            .expect_fetch_incoming_stock()
            .returning(|_| Ok(Vec::new()));

        let service =
            ForecastingService::new(Arc::new(source), ForecastConfig::default()).unwrap();
        let forecast = service
            .forecast_item(&item("ITEM-001"), as_of())
            .await
            .unwrap()
            .expect("item with history should produce a forecast");

        // 50 on hand at 10/day with 15 days procurement: critical.
        assert_eq!(forecast.result.stock_status, StockStatus::Critical);
        assert_eq!(forecast.result.recommended_order_date, as_of());
    }

    #[tokio::test]
    async fn config_procurement_defaults_apply_when_item_omits_them() {
        fn source() -> MockDemandDataSource {
            let mut source = MockDemandDataSource::new();
            source
                .expect_fetch_historical_consumption()
                .returning(|_| Ok(history_rows(&[300.0, 300.0, 300.0])));
            source.expect_fetch_current_stock().returning(|_| Ok(50.0));
            source
                .expect_fetch_incoming_stock()
                .returning(|_| Ok(Vec::new()));
            source
        }

        let bare_item = ForecastItem {
            lead_time_days: None,
            shipping_time_days: None,
            ..item("ITEM-005")
        };

        let short_config = ForecastConfig {
            default_lead_time_days: 10,
            default_shipping_time_days: 5,
            ..ForecastConfig::default()
        };
        let long_config = ForecastConfig {
            default_lead_time_days: 40,
            default_shipping_time_days: 20,
            ..ForecastConfig::default()
        };

        let short = ForecastingService::new(Arc::new(source()), short_config)
            .unwrap()
            .forecast_item(&bare_item, as_of())
            .await
            .unwrap()
            .unwrap();
        let long = ForecastingService::new(Arc::new(source()), long_config)
            .unwrap()
            .forecast_item(&bare_item, as_of())
            .await
            .unwrap()
            .unwrap();

        // 5 days of cover is critical either way; the arrival date tracks
        // the configured procurement window.
        assert_eq!(
            short.result.estimated_arrival_date,
            as_of() + chrono::Duration::days(15)
        );
        assert_eq!(
            long.result.estimated_arrival_date,
            as_of() + chrono::Duration::days(60)
        );
    }

    #[tokio::test]
    async fn item_without_history_is_skipped_not_calculated() {
        let mut source = MockDemandDataSource::new();
        source
            .expect_fetch_historical_consumption()
            .returning(|_| Ok(Vec::new()));
        // Stock and incoming fetches must never run for an empty history.
        source.expect_fetch_current_stock().never();
        source.expect_fetch_incoming_stock().never();

        let service =
            ForecastingService::new(Arc::new(source), ForecastConfig::default()).unwrap();
        let outcome = service.forecast_item(&item("ITEM-002"), as_of()).await;
        assert!(matches!(outcome, Ok(None)));
    }

    #[tokio::test]
    async fn data_source_failure_surfaces_as_error() {
        let mut source = MockDemandDataSource::new();
        source
            .expect_fetch_historical_consumption()
            .returning(|_| Err(ForecastError::ExternalServiceError("timeout".to_string())));

        let service =
            ForecastingService::new(Arc::new(source), ForecastConfig::default()).unwrap();
        let outcome = service.forecast_item(&item("ITEM-003"), as_of()).await;
        assert!(matches!(
            outcome,
            Err(ForecastError::ExternalServiceError(_))
        ));
    }

    struct SlowDataSource;

    #[async_trait]
    impl DemandDataSource for SlowDataSource {
        async fn fetch_historical_consumption(
            &self,
            _item_id: Uuid,
        ) -> Result<Vec<HistoricalDataPoint>, ForecastError> {
            tokio::time::sleep(std::time::Duration::from_secs(30)).await;
            Ok(Vec::new())
        }

        async fn fetch_current_stock(&self, _item_id: Uuid) -> Result<f64, ForecastError> {
            Ok(0.0)
        }

        async fn fetch_incoming_stock(
            &self,
            _item_id: Uuid,
        ) -> Result<Vec<IncomingStockItem>, ForecastError> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn slow_data_source_hits_fetch_deadline() {
        let config = ForecastConfig {
            fetch_timeout_secs: 1,
            ..ForecastConfig::default()
        };
        let service = ForecastingService::new(Arc::new(SlowDataSource), config).unwrap();
        let outcome = service.forecast_item(&item("ITEM-004"), as_of()).await;
        assert!(matches!(
            outcome,
            Err(ForecastError::ExternalServiceError(_))
        ));
    }

    #[test]
    fn invalid_config_is_rejected_at_construction() {
        let source = MockDemandDataSource::new();
        let config = ForecastConfig {
            confidence_threshold: -0.2,
            ..ForecastConfig::default()
        };
        assert!(matches!(
            ForecastingService::new(Arc::new(source), config),
            Err(ForecastError::ValidationError(_))
        ));
    }
}
