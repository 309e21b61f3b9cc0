use std::collections::HashMap;

use chrono::{Datelike, NaiveDate};
use tracing::debug;

use crate::models::{HistoricalDataPoint, TrendDirection};

/// Floor applied to every non-degenerate confidence score.
pub(crate) const CONFIDENCE_FLOOR: f64 = 0.1;
/// Ceiling applied to every confidence score.
pub(crate) const CONFIDENCE_CEILING: f64 = 0.95;
/// Fixed score when fewer than two observations are available.
pub(crate) const SMALL_SAMPLE_CONFIDENCE: f64 = 0.3;

/// Relative change (or regression slope) beyond which a series is no longer
/// considered stable.
const TREND_THRESHOLD: f64 = 0.1;

/// Arithmetic mean of the series; zero for an empty series.
pub fn moving_average(quantities: &[f64]) -> f64 {
    if quantities.is_empty() {
        return 0.0;
    }
    quantities.iter().sum::<f64>() / quantities.len() as f64
}

/// Confidence in a prediction, derived from the relative spread of the
/// observations around it.
///
/// Population variance around `prediction` is normalized by the series mean
/// (relative standard deviation); the score is `1 - relative_std_dev` clamped
/// to [0.1, 0.95]. Fewer than two observations score a fixed 0.3.
pub fn confidence_score(quantities: &[f64], prediction: f64) -> f64 {
    if quantities.len() < 2 {
        return SMALL_SAMPLE_CONFIDENCE;
    }

    let variance = quantities
        .iter()
        .map(|q| (q - prediction).powi(2))
        .sum::<f64>()
        / quantities.len() as f64;
    let std_dev = variance.sqrt();

    let mean = moving_average(quantities);
    // A zero mean would blow up the relative spread; substitute a unit base.
    let denominator = if mean == 0.0 { 1.0 } else { mean };
    let relative_std_dev = std_dev / denominator;

    (1.0 - relative_std_dev).clamp(CONFIDENCE_FLOOR, CONFIDENCE_CEILING)
}

/// Classifies the trend by comparing the second half of the series against
/// the first (ceil/floor split for odd lengths). A relative change above
/// +10% is increasing, below -10% decreasing, otherwise stable.
pub fn classify_trend(quantities: &[f64]) -> TrendDirection {
    if quantities.len() < 2 {
        return TrendDirection::Stable;
    }

    let split = quantities.len().div_ceil(2);
    let first_avg = moving_average(&quantities[..split]);
    let second_avg = moving_average(&quantities[split..]);
    let change = (second_avg - first_avg) / first_avg;

    if change > TREND_THRESHOLD {
        TrendDirection::Increasing
    } else if change < -TREND_THRESHOLD {
        TrendDirection::Decreasing
    } else {
        TrendDirection::Stable
    }
}

/// Combined prediction, confidence, and trend from a least-squares fit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrendAnalysis {
    /// Fitted value at the next index past the series.
    pub prediction: f64,
    /// R² of the fit, clamped to [0.1, 0.95].
    pub confidence: f64,
    pub trend: TrendDirection,
}

/// Ordinary least-squares regression of quantity over observation index.
///
/// Fewer than three observations fall back to the moving average at the
/// small-sample confidence with a stable trend.
pub fn trend_analysis(quantities: &[f64]) -> TrendAnalysis {
    let n = quantities.len();
    if n < 3 {
        debug!(
            points = n,
            "insufficient history for regression, falling back to moving average"
        );
        return TrendAnalysis {
            prediction: moving_average(quantities),
            confidence: SMALL_SAMPLE_CONFIDENCE,
            trend: TrendDirection::Stable,
        };
    }

    let nf = n as f64;
    let sum_x = (0..n).map(|i| i as f64).sum::<f64>();
    let sum_y = quantities.iter().sum::<f64>();
    let sum_xy = quantities
        .iter()
        .enumerate()
        .map(|(i, q)| i as f64 * q)
        .sum::<f64>();
    let sum_x2 = (0..n).map(|i| (i as f64).powi(2)).sum::<f64>();

    let slope = (nf * sum_xy - sum_x * sum_y) / (nf * sum_x2 - sum_x * sum_x);
    let intercept = (sum_y - slope * sum_x) / nf;
    let prediction = slope * nf + intercept;

    let mean_y = sum_y / nf;
    let ss_total = quantities.iter().map(|q| (q - mean_y).powi(2)).sum::<f64>();
    let ss_residual = quantities
        .iter()
        .enumerate()
        .map(|(i, q)| {
            let fitted = slope * i as f64 + intercept;
            (q - fitted).powi(2)
        })
        .sum::<f64>();

    // A constant series has ss_total == 0 and an undefined R²; treat it as
    // the confidence floor rather than letting NaN propagate.
    let confidence = if ss_total == 0.0 {
        CONFIDENCE_FLOOR
    } else {
        (1.0 - ss_residual / ss_total).clamp(CONFIDENCE_FLOOR, CONFIDENCE_CEILING)
    };

    let trend = if slope > TREND_THRESHOLD {
        TrendDirection::Increasing
    } else if slope < -TREND_THRESHOLD {
        TrendDirection::Decreasing
    } else {
        TrendDirection::Stable
    };

    TrendAnalysis {
        prediction,
        confidence,
        trend,
    }
}

/// Average of prior observations falling in the same calendar month as
/// `today`; falls back to the overall moving average when that month has no
/// history.
pub fn seasonal_forecast(historical_data: &[HistoricalDataPoint], today: NaiveDate) -> f64 {
    let mut buckets: HashMap<u32, Vec<f64>> = HashMap::new();
    for point in historical_data {
        buckets
            .entry(point.month.month())
            .or_default()
            .push(point.quantity);
    }

    if let Some(same_month) = buckets.get(&today.month()) {
        debug!(
            month = today.month(),
            observations = same_month.len(),
            "seasonal forecast using same-month history"
        );
        return moving_average(same_month);
    }

    let all: Vec<f64> = historical_data.iter().map(|p| p.quantity).collect();
    moving_average(&all)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(year: i32, month: u32, quantity: f64) -> HistoricalDataPoint {
        HistoricalDataPoint {
            month: NaiveDate::from_ymd_opt(year, month, 1).unwrap(),
            quantity,
        }
    }

    #[test]
    fn moving_average_of_three() {
        assert_eq!(moving_average(&[10.0, 20.0, 30.0]), 20.0);
    }

    #[test]
    fn moving_average_of_empty_is_zero() {
        assert_eq!(moving_average(&[]), 0.0);
    }

    #[test]
    fn confidence_stays_within_bounds() {
        let noisy = [5.0, 80.0, 12.0, 95.0, 3.0];
        let prediction = moving_average(&noisy);
        let score = confidence_score(&noisy, prediction);
        assert!((CONFIDENCE_FLOOR..=CONFIDENCE_CEILING).contains(&score));
    }

    #[test]
    fn confidence_small_sample_is_fixed() {
        assert_eq!(confidence_score(&[42.0], 42.0), SMALL_SAMPLE_CONFIDENCE);
        assert_eq!(confidence_score(&[], 0.0), SMALL_SAMPLE_CONFIDENCE);
    }

    #[test]
    fn confidence_of_exact_prediction_hits_ceiling() {
        // Zero spread around the prediction clamps at the ceiling.
        let score = confidence_score(&[10.0, 10.0, 10.0], 10.0);
        assert_eq!(score, CONFIDENCE_CEILING);
    }

    #[test]
    fn confidence_zero_mean_uses_unit_denominator() {
        // Mean is zero; the relative spread divides by 1 instead.
        let score = confidence_score(&[-5.0, 5.0], 0.0);
        assert_eq!(score, CONFIDENCE_FLOOR);
    }

    #[test]
    fn trend_classification_is_symmetric() {
        let rising = [10.0, 20.0, 30.0, 40.0];
        let falling = [40.0, 30.0, 20.0, 10.0];
        let flat = [10.0, 10.0, 10.0, 10.0];
        assert_eq!(classify_trend(&rising), TrendDirection::Increasing);
        assert_eq!(classify_trend(&falling), TrendDirection::Decreasing);
        assert_eq!(classify_trend(&flat), TrendDirection::Stable);
    }

    #[test]
    fn trend_classification_short_series_is_stable() {
        assert_eq!(classify_trend(&[99.0]), TrendDirection::Stable);
        assert_eq!(classify_trend(&[]), TrendDirection::Stable);
    }

    #[test]
    fn regression_extends_a_perfect_line() {
        let analysis = trend_analysis(&[10.0, 20.0, 30.0, 40.0]);
        assert!((analysis.prediction - 50.0).abs() < 1e-9);
        // Perfect fit: R² of 1 clamps at the ceiling.
        assert_eq!(analysis.confidence, CONFIDENCE_CEILING);
        assert_eq!(analysis.trend, TrendDirection::Increasing);
    }

    #[test]
    fn regression_constant_series_floors_confidence() {
        let analysis = trend_analysis(&[7.0, 7.0, 7.0, 7.0]);
        assert!((analysis.prediction - 7.0).abs() < 1e-9);
        assert_eq!(analysis.confidence, CONFIDENCE_FLOOR);
        assert_eq!(analysis.trend, TrendDirection::Stable);
    }

    #[test]
    fn regression_small_sample_falls_back() {
        let analysis = trend_analysis(&[10.0, 30.0]);
        assert_eq!(analysis.prediction, 20.0);
        assert_eq!(analysis.confidence, SMALL_SAMPLE_CONFIDENCE);
        assert_eq!(analysis.trend, TrendDirection::Stable);
    }

    #[test]
    fn seasonal_prefers_same_month_history() {
        let history = vec![
            point(2023, 3, 100.0),
            point(2023, 6, 10.0),
            point(2024, 3, 140.0),
            point(2024, 6, 20.0),
        ];
        let today = NaiveDate::from_ymd_opt(2025, 3, 15).unwrap();
        assert_eq!(seasonal_forecast(&history, today), 120.0);
    }

    #[test]
    fn seasonal_falls_back_to_overall_average() {
        let history = vec![point(2024, 6, 10.0), point(2024, 7, 30.0)];
        let today = NaiveDate::from_ymd_opt(2025, 1, 15).unwrap();
        assert_eq!(seasonal_forecast(&history, today), 20.0);
    }
}
