use serde::Serialize;

use crate::error::AnalysisError;
use crate::models::{PanelRow, Susceptibility};

/// Flags every value strictly above the upper Tukey fence
/// (Q3 + multiplier * IQR) of its own series.
///
/// Quartiles use linear interpolation: at fraction p over a sorted copy of
/// length n, the quantile sits at index p * (n - 1) and interpolates between
/// the two nearest ranks. Degenerate series (fewer than four points, or all
/// values equal) yield an IQR of 0 and therefore no flags, which is the
/// intended behavior rather than an error.
pub fn tukey_flags(
    column: &str,
    values: &[f64],
    multiplier: f64,
) -> Result<Vec<bool>, AnalysisError> {
    if values.is_empty() {
        return Ok(Vec::new());
    }

    for value in values {
        if !value.is_finite() {
            return Err(AnalysisError::InvalidInputKind {
                column: column.to_string(),
                value: value.to_string(),
            });
        }
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let q1 = quantile(&sorted, 0.25);
    let q3 = quantile(&sorted, 0.75);
    let fence = q3 + multiplier * (q3 - q1);

    Ok(values.iter().map(|value| *value > fence).collect())
}

/// Linear-interpolation quantile over an already sorted, non-empty slice.
fn quantile(sorted: &[f64], p: f64) -> f64 {
    let position = p * (sorted.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    let fraction = position - lower as f64;
    sorted[lower] + fraction * (sorted[upper] - sorted[lower])
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlertRow {
    pub patient_id: String,
    pub results: Vec<(String, Susceptibility)>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeeklyAlert {
    pub alerting: Vec<String>,
    pub rows: Vec<AlertRow>,
}

impl WeeklyAlert {
    pub fn is_clear(&self) -> bool {
        self.alerting.is_empty()
    }
}

/// Evaluates the weekly threshold rule over one filtered (week, service)
/// slice: a monitored antibiotic alerts when its resistant count exceeds
/// `threshold` times the total row count of the slice.
///
/// The denominator is deliberately the full slice size, not the number of
/// rows actually tested for that antibiotic. Antibiotics absent from every
/// row's panel are skipped, since not all panels are run every week.
pub fn evaluate_week(rows: &[PanelRow], monitored: &[String], threshold: f64) -> WeeklyAlert {
    let total = rows.len();
    let mut alerting = Vec::new();

    for antibiotic in monitored {
        let tested = rows
            .iter()
            .filter(|row| row.results.contains_key(antibiotic))
            .count();
        if tested == 0 {
            continue;
        }

        let resistant = rows
            .iter()
            .filter(|row| row.results.get(antibiotic) == Some(&Susceptibility::Resistant))
            .count();

        if resistant as f64 > threshold * total as f64 {
            alerting.push(antibiotic.clone());
        }
    }

    let rows = if alerting.is_empty() {
        Vec::new()
    } else {
        rows.iter()
            .filter(|row| {
                alerting
                    .iter()
                    .any(|ab| row.results.get(ab) == Some(&Susceptibility::Resistant))
            })
            .map(|row| AlertRow {
                patient_id: row.patient_id.clone(),
                results: alerting
                    .iter()
                    .filter_map(|ab| row.results.get(ab).map(|code| (ab.clone(), *code)))
                    .collect(),
            })
            .collect()
    };

    WeeklyAlert { alerting, rows }
}
