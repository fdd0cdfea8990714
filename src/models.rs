use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResistanceRecord {
    pub year: i32,
    pub antibiotic: String,
    pub phenotype: String,
    pub rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PhenotypeCount {
    pub phenotype: String,
    pub count: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PatientRecord {
    pub patient_id: String,
    pub age: Option<u32>,
    pub sex: String,
    pub service: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Susceptibility {
    Resistant,
    Sensitive,
    Intermediate,
}

impl Susceptibility {
    /// Parses a laboratory susceptibility code. Anything other than
    /// R/S/I counts as a missing result.
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim() {
            "R" => Some(Susceptibility::Resistant),
            "S" => Some(Susceptibility::Sensitive),
            "I" => Some(Susceptibility::Intermediate),
            _ => None,
        }
    }
}

impl fmt::Display for Susceptibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let code = match self {
            Susceptibility::Resistant => "R",
            Susceptibility::Sensitive => "S",
            Susceptibility::Intermediate => "I",
        };
        f.write_str(code)
    }
}

/// One patient-level row of the weekly panel extract. `week` is the ISO
/// week derived from `sample_date`; rows whose date failed to parse keep
/// `week = None` and drop out of week-based grouping.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PanelRow {
    pub sample_date: Option<NaiveDate>,
    pub week: Option<u32>,
    pub service: String,
    pub patient_id: String,
    pub results: BTreeMap<String, Susceptibility>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendPoint {
    pub year: i32,
    pub phenotype: String,
    pub mean_rate: f64,
    pub sample_count: usize,
}
