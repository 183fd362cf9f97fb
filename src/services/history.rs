// src/services/history.rs
//
// Append-only per-environment time series of health reports plus the
// raw performance samples behind them. History is only ever appended,
// filtered, or pruned; report order is kept by timestamp.

use crate::services::alerts::HealthAlert;
use crate::services::health::HealthStatus;
use crate::services::probes::{FunctionalityResult, PerformanceMetrics};
use crate::services::validation::ValidationResult;
use crate::types::{Timeframe, TrendDirection};
use crate::utils::now_ms;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Metrics a trend can be computed over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendMetric {
    OverallScore,
    ResponseTime,
    ErrorRate,
    Throughput,
}

impl TrendMetric {
    pub const ALL: [TrendMetric; 4] = [
        TrendMetric::OverallScore,
        TrendMetric::ResponseTime,
        TrendMetric::ErrorRate,
        TrendMetric::Throughput,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TrendMetric::OverallScore => "overall_score",
            TrendMetric::ResponseTime => "response_time_ms",
            TrendMetric::ErrorRate => "error_rate",
            TrendMetric::Throughput => "throughput",
        }
    }

    fn higher_is_better(&self) -> bool {
        matches!(self, TrendMetric::OverallScore | TrendMetric::Throughput)
    }

    /// Metric value carried by a report; `None` when the report has no
    /// usable sample (e.g. the response-time failure sentinel).
    fn extract(&self, report: &HealthReport) -> Option<f64> {
        match self {
            TrendMetric::OverallScore => Some(report.health_status.score as f64),
            TrendMetric::ResponseTime => {
                let value = report.performance_metrics.response_time_ms;
                (value >= 0.0).then_some(value)
            }
            TrendMetric::ErrorRate => Some(report.performance_metrics.error_rate),
            TrendMetric::Throughput => Some(report.performance_metrics.throughput),
        }
    }
}

/// Directional summary of one metric over a window. Derived on each
/// report, never stored on its own.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthTrend {
    pub metric: TrendMetric,
    pub timeframe: Timeframe,
    pub values: Vec<f64>,
    pub trend: TrendDirection,
}

/// Immutable outcome of one full health check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthReport {
    pub environment_id: String,
    pub environment_name: String,
    pub timestamp: u64,
    pub health_status: HealthStatus,
    pub performance_metrics: PerformanceMetrics,
    pub validation_result: ValidationResult,
    pub functionality_result: Option<FunctionalityResult>,
    pub trends: Vec<HealthTrend>,
    pub alerts: Vec<HealthAlert>,
}

/// Values of the in-progress check, included in its own trends.
#[derive(Debug, Clone)]
pub struct CurrentObservation {
    pub score: f64,
    pub response_time_ms: f64,
    pub error_rate: f64,
    pub throughput: f64,
}

impl CurrentObservation {
    fn value(&self, metric: TrendMetric) -> Option<f64> {
        match metric {
            TrendMetric::OverallScore => Some(self.score),
            TrendMetric::ResponseTime => {
                (self.response_time_ms >= 0.0).then_some(self.response_time_ms)
            }
            TrendMetric::ErrorRate => Some(self.error_rate),
            TrendMetric::Throughput => Some(self.throughput),
        }
    }
}

#[derive(Default)]
pub struct HistoryStore {
    reports: Arc<RwLock<HashMap<String, Vec<HealthReport>>>>,
    samples: Arc<RwLock<HashMap<String, Vec<PerformanceMetrics>>>>,
}

impl HistoryStore {
    pub fn new() -> Self {
        Self {
            reports: Arc::new(RwLock::new(HashMap::new())),
            samples: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Inserts in timestamp order so out-of-order completions from
    /// concurrent checks still read back sorted.
    pub async fn append(&self, report: HealthReport) {
        let mut reports = self.reports.write().await;
        let entries = reports.entry(report.environment_id.clone()).or_default();
        let position = entries.partition_point(|r| r.timestamp <= report.timestamp);
        entries.insert(position, report);
    }

    /// Reports inside the timeframe window, oldest first. No timeframe
    /// returns the full history.
    pub async fn reports(
        &self,
        environment_id: &str,
        timeframe: Option<Timeframe>,
    ) -> Vec<HealthReport> {
        let reports = self.reports.read().await;
        let entries = match reports.get(environment_id) {
            Some(entries) => entries,
            None => return Vec::new(),
        };
        match timeframe {
            Some(timeframe) => {
                let cutoff = timeframe.cutoff_from(now_ms());
                entries
                    .iter()
                    .filter(|r| r.timestamp >= cutoff)
                    .cloned()
                    .collect()
            }
            None => entries.clone(),
        }
    }

    pub async fn report_count(&self, environment_id: &str) -> usize {
        self.reports
            .read()
            .await
            .get(environment_id)
            .map(|entries| entries.len())
            .unwrap_or(0)
    }

    /// Raw performance samples are kept separately from reports so the
    /// metrics retention class can be applied on its own.
    pub async fn record_sample(&self, environment_id: &str, metrics: PerformanceMetrics) {
        let mut samples = self.samples.write().await;
        samples
            .entry(environment_id.to_string())
            .or_default()
            .push(metrics);
    }

    pub async fn recent_samples(
        &self,
        environment_id: &str,
        timeframe: Timeframe,
    ) -> Vec<PerformanceMetrics> {
        let samples = self.samples.read().await;
        let cutoff = timeframe.cutoff_from(now_ms());
        samples
            .get(environment_id)
            .map(|entries| {
                entries
                    .iter()
                    .filter(|m| m.timestamp >= cutoff)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Trend of one metric over the window, optionally seeded with the
    /// in-progress check's values.
    pub async fn trend(
        &self,
        environment_id: &str,
        metric: TrendMetric,
        timeframe: Timeframe,
        current: Option<&CurrentObservation>,
    ) -> HealthTrend {
        let mut values: Vec<f64> = self
            .reports(environment_id, Some(timeframe))
            .await
            .iter()
            .filter_map(|r| metric.extract(r))
            .collect();
        if let Some(current) = current {
            if let Some(value) = current.value(metric) {
                values.push(value);
            }
        }
        let trend = classify_slope(&values, metric.higher_is_better());
        HealthTrend {
            metric,
            timeframe,
            values,
            trend,
        }
    }

    /// All four metric trends for the report being assembled.
    pub async fn trends_for_report(
        &self,
        environment_id: &str,
        timeframe: Timeframe,
        current: &CurrentObservation,
    ) -> Vec<HealthTrend> {
        let mut trends = Vec::with_capacity(TrendMetric::ALL.len());
        for metric in TrendMetric::ALL {
            trends.push(
                self.trend(environment_id, metric, timeframe, Some(current))
                    .await,
            );
        }
        trends
    }

    pub async fn prune_reports(&self, cutoff_ms: u64) {
        let mut reports = self.reports.write().await;
        for entries in reports.values_mut() {
            entries.retain(|r| r.timestamp >= cutoff_ms);
        }
    }

    pub async fn prune_samples(&self, cutoff_ms: u64) {
        let mut samples = self.samples.write().await;
        for entries in samples.values_mut() {
            entries.retain(|m| m.timestamp >= cutoff_ms);
        }
    }
}

/// Least-squares slope classification with a tolerance band around
/// zero: the total change across the window must exceed 5% of the mean
/// magnitude (at least 0.5) to leave `Stable`.
fn classify_slope(values: &[f64], higher_is_better: bool) -> TrendDirection {
    if values.len() < 3 {
        return TrendDirection::Stable;
    }
    let slope = least_squares_slope(values);
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    let band = (mean.abs() * 0.05).max(0.5);
    let total_change = slope * (values.len() as f64 - 1.0);
    if total_change.abs() <= band {
        TrendDirection::Stable
    } else if (slope > 0.0) == higher_is_better {
        TrendDirection::Improving
    } else {
        TrendDirection::Degrading
    }
}

fn least_squares_slope(values: &[f64]) -> f64 {
    let n = values.len() as f64;
    let mean_x = (n - 1.0) / 2.0;
    let mean_y = values.iter().sum::<f64>() / n;
    let mut covariance = 0.0;
    let mut variance = 0.0;
    for (i, value) in values.iter().enumerate() {
        let dx = i as f64 - mean_x;
        covariance += dx * (value - mean_y);
        variance += dx * dx;
    }
    if variance == 0.0 {
        0.0
    } else {
        covariance / variance
    }
}
