/*!
 * # Forecasting Core
 *
 * Pure, deterministic demand forecasting. Nothing in this module performs
 * I/O or reads the wall clock; the reference date is always injected, so
 * identical inputs produce identical results and every function is safely
 * callable from any thread.
 */

/// Moving-average, regression, and seasonal prediction primitives
pub mod algorithms;

/// Per-item forecast calculation and order recommendation
pub mod calculator;

/// Day-by-day stock projection merging consumption with incoming deliveries
pub mod simulation;
