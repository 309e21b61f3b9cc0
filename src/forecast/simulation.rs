use std::collections::HashMap;

use chrono::{Duration, NaiveDate};
use tracing::{debug, warn};

use crate::models::{IncomingStockItem, StockProjection};

/// Sentinel horizon when consumption is zero or negative: stock never runs
/// out.
pub const NEVER_STOCKS_OUT_DAYS: i64 = 999;

/// Minimum horizon simulated when detecting the effective stockout day.
const MIN_SIMULATION_DAYS: i64 = 365;
/// Slack simulated past the theoretical depletion day so that deliveries
/// landing near it are still observed.
const SIMULATION_SLACK_DAYS: i64 = 60;
/// Slack added past the latest ETA when a delivery falls outside the
/// requested horizon.
const ETA_EXTENSION_DAYS: i64 = 30;

/// Projects day-by-day stock from `today` over at least `forecast_days`.
///
/// Day 0 is `today`: no consumption is applied, but same-day deliveries are.
/// Each subsequent day subtracts `daily_consumption`, then adds deliveries
/// whose ETA matches that calendar day. Incoming items with a missing or
/// unparseable ETA are skipped; a delivery past `forecast_days` extends the
/// horizon so it is not silently dropped.
///
/// The running ledger is deliberately allowed to go negative between
/// deliveries while the reported `projected_stock` clamps at zero: a
/// delivery arriving after a nominal zero-crossing must be netted against
/// the accumulated shortfall, not against the clamped value. The projection
/// ends early once the ledger is depleted and no deliveries remain.
pub fn project_stock_timeline(
    today: NaiveDate,
    current_stock: f64,
    daily_consumption: f64,
    incoming_stock: &[IncomingStockItem],
    forecast_days: i64,
) -> Vec<StockProjection> {
    let mut deliveries: HashMap<NaiveDate, f64> = HashMap::new();
    let mut latest_eta_offset: i64 = 0;
    for item in incoming_stock {
        match item.parsed_eta() {
            Some(eta) => {
                latest_eta_offset = latest_eta_offset.max((eta - today).num_days());
                *deliveries.entry(eta).or_insert(0.0) += item.quantity;
            }
            None => {
                warn!(
                    shipment_id = %item.shipment_id,
                    eta = ?item.eta,
                    "skipping incoming stock item with missing or unparseable ETA"
                );
            }
        }
    }

    let horizon = if latest_eta_offset > forecast_days {
        debug!(
            forecast_days,
            latest_eta_offset, "delivery past horizon, extending projection"
        );
        latest_eta_offset + ETA_EXTENSION_DAYS
    } else {
        forecast_days
    };

    let day_zero_delivery = deliveries.get(&today).copied().unwrap_or(0.0);
    let mut running_stock = current_stock + day_zero_delivery;

    let mut timeline = Vec::with_capacity(horizon as usize + 1);
    timeline.push(StockProjection {
        date: today,
        projected_stock: running_stock.max(0.0),
        consumption: 0.0,
        incoming_delivery: day_zero_delivery,
    });

    for day in 1..=horizon {
        let date = today + Duration::days(day);
        let delivered = deliveries.get(&date).copied().unwrap_or(0.0);
        running_stock = running_stock - daily_consumption + delivered;

        timeline.push(StockProjection {
            date,
            projected_stock: running_stock.max(0.0),
            consumption: daily_consumption,
            incoming_delivery: delivered,
        });

        if running_stock <= 0.0 && !deliveries.keys().any(|eta| *eta > date) {
            debug!(day, "stock depleted with no deliveries remaining");
            break;
        }
    }

    timeline
}

/// Days until stockout accounting for incoming deliveries.
///
/// Non-positive consumption returns the never-stocks-out sentinel. With no
/// incoming stock this is exactly `floor(current_stock / daily_consumption)`.
/// Otherwise the day-by-day projection runs over
/// `max(theoretical_max_days + 60, 365)` days and the first depleted day
/// wins, falling back to the theoretical maximum if the projection never
/// reaches zero inside the horizon.
pub fn effective_days_until_stockout(
    today: NaiveDate,
    current_stock: f64,
    daily_consumption: f64,
    incoming_stock: &[IncomingStockItem],
) -> i64 {
    if daily_consumption <= 0.0 {
        return NEVER_STOCKS_OUT_DAYS;
    }
    if incoming_stock.is_empty() {
        return (current_stock / daily_consumption).floor() as i64;
    }

    let total_incoming: f64 = incoming_stock.iter().map(|item| item.quantity).sum();
    let theoretical_max_days =
        ((current_stock + total_incoming) / daily_consumption).floor() as i64;
    let horizon = (theoretical_max_days + SIMULATION_SLACK_DAYS).max(MIN_SIMULATION_DAYS);

    let timeline = project_stock_timeline(
        today,
        current_stock,
        daily_consumption,
        incoming_stock,
        horizon,
    );

    timeline
        .iter()
        .position(|projection| projection.projected_stock <= 0.0)
        .map(|day| day as i64)
        .unwrap_or(theoretical_max_days)
}
