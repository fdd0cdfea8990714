use std::path::Path;

use anyhow::Context;
use serde::Deserialize;

pub const DEFAULT_WEEKLY_THRESHOLD: f64 = 0.25;
pub const DEFAULT_TUKEY_MULTIPLIER: f64 = 1.5;

const DEFAULT_MONITORED: &[&str] = &[
    "Vancomycin",
    "Teicoplanin",
    "Gentamicin",
    "Oxacillin",
    "Daptomycin",
    "Dalbavancin",
    "Clindamycin",
    "Cotrimoxazole",
    "Linezolid",
];

/// Column names of the source extracts. Sites export with different
/// headers, so nothing outside this struct hard-codes a column name.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ColumnMap {
    pub year: String,
    pub antibiotic: String,
    pub phenotype: String,
    pub rate: String,
    pub count: String,
    pub sample_date: String,
    pub service: String,
    pub patient_id: String,
    pub age: String,
    pub sex: String,
}

impl Default for ColumnMap {
    fn default() -> Self {
        ColumnMap {
            year: "year".to_string(),
            antibiotic: "antibiotic".to_string(),
            phenotype: "phenotype".to_string(),
            rate: "resistance_rate".to_string(),
            count: "count".to_string(),
            sample_date: "sample_date".to_string(),
            service: "service".to_string(),
            patient_id: "patient_id".to_string(),
            age: "age".to_string(),
            sex: "sex".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SurveillanceConfig {
    /// Ordered allowlist of antibiotics watched by the weekly alert rule.
    pub monitored_antibiotics: Vec<String>,
    /// Fraction of tested rows above which an antibiotic alerts.
    pub weekly_threshold: f64,
    /// Fence multiplier for the Tukey outlier rule.
    pub tukey_multiplier: f64,
    pub columns: ColumnMap,
}

impl Default for SurveillanceConfig {
    fn default() -> Self {
        SurveillanceConfig {
            monitored_antibiotics: DEFAULT_MONITORED
                .iter()
                .map(|name| name.to_string())
                .collect(),
            weekly_threshold: DEFAULT_WEEKLY_THRESHOLD,
            tukey_multiplier: DEFAULT_TUKEY_MULTIPLIER,
            columns: ColumnMap::default(),
        }
    }
}

impl SurveillanceConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let config: SurveillanceConfig = serde_json::from_str(&raw)
            .with_context(|| format!("invalid config {}", path.display()))?;
        Ok(config)
    }
}
