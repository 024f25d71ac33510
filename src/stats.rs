//! Z-score anomaly detection over a numeric series.

use serde::Serialize;

use crate::analyzers::utility::{mean, stddev};

/// Default `|z|` threshold.
pub const DEFAULT_THRESHOLD: f64 = 3.0;

/// A flagged point.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Anomaly {
    pub index: usize,
    pub value: f64,
    pub z: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AnomalyReport {
    pub mean: f64,
    pub std: f64,
    pub anomalies: Vec<Anomaly>,
}

impl AnomalyReport {
    pub fn anomaly_count(&self) -> usize {
        self.anomalies.len()
    }
}

/// Z-score of `value`, defined as 0 when the series has no spread.
pub fn z_score(value: f64, mean: f64, std: f64) -> f64 {
    if std == 0.0 { 0.0 } else { (value - mean) / std }
}

/// Flags every point whose `|z| >= threshold`, using population statistics.
///
/// An empty series yields an all-zero report.
pub fn detect_anomalies(series: &[f64], threshold: f64) -> AnomalyReport {
    if series.is_empty() {
        return AnomalyReport::default();
    }

    let mean = mean(series);
    let std = stddev(series, mean);

    let anomalies = series
        .iter()
        .enumerate()
        .filter_map(|(index, &value)| {
            let z = z_score(value, mean, std);
            (z.abs() >= threshold).then_some(Anomaly { index, value, z })
        })
        .collect();

    AnomalyReport {
        mean,
        std,
        anomalies,
    }
}
