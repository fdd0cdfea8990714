use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Context;
use chrono::{Datelike, NaiveDate};
use csv::StringRecord;

use crate::config::ColumnMap;
use crate::error::AnalysisError;
use crate::models::{PanelRow, PatientRecord, PhenotypeCount, ResistanceRecord, Susceptibility};

fn open(path: &Path) -> anyhow::Result<csv::Reader<std::fs::File>> {
    csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .with_context(|| format!("failed to open {}", path.display()))
}

fn column_index(headers: &StringRecord, column: &str) -> Result<usize, AnalysisError> {
    headers
        .iter()
        .position(|header| header == column)
        .ok_or_else(|| AnalysisError::MissingColumn {
            column: column.to_string(),
        })
}

fn numeric_cell(record: &StringRecord, index: usize, column: &str) -> Result<f64, AnalysisError> {
    let raw = record.get(index).unwrap_or("");
    raw.parse::<f64>()
        .map_err(|_| AnalysisError::InvalidInputKind {
            column: column.to_string(),
            value: raw.to_string(),
        })
}

fn year_cell(record: &StringRecord, index: usize, column: &str) -> Result<i32, AnalysisError> {
    let raw = record.get(index).unwrap_or("");
    raw.parse::<i32>()
        .map_err(|_| AnalysisError::InvalidInputKind {
            column: column.to_string(),
            value: raw.to_string(),
        })
}

fn record_line(record: &StringRecord) -> u64 {
    record.position().map_or(0, |position| position.line())
}

fn text_cell(record: &StringRecord, index: usize) -> String {
    record.get(index).unwrap_or("").to_string()
}

pub fn load_resistance(path: &Path, columns: &ColumnMap) -> anyhow::Result<Vec<ResistanceRecord>> {
    let mut reader = open(path)?;
    let headers = reader.headers()?.clone();
    let year = column_index(&headers, &columns.year)?;
    let antibiotic = column_index(&headers, &columns.antibiotic)?;
    let phenotype = column_index(&headers, &columns.phenotype)?;
    let rate = column_index(&headers, &columns.rate)?;

    // A malformed cell drops its own row, not the extract.
    let mut records = Vec::new();
    for result in reader.records() {
        let record = result?;
        let parsed = year_cell(&record, year, &columns.year).and_then(|year| {
            Ok(ResistanceRecord {
                year,
                antibiotic: text_cell(&record, antibiotic),
                phenotype: text_cell(&record, phenotype),
                rate: numeric_cell(&record, rate, &columns.rate)?,
            })
        });
        match parsed {
            Ok(row) => records.push(row),
            Err(err) => eprintln!("warning: skipping row {}: {err}", record_line(&record)),
        }
    }
    Ok(records)
}

pub fn load_phenotypes(path: &Path, columns: &ColumnMap) -> anyhow::Result<Vec<PhenotypeCount>> {
    let mut reader = open(path)?;
    let headers = reader.headers()?.clone();
    let phenotype = column_index(&headers, &columns.phenotype)?;
    let count = column_index(&headers, &columns.count)?;

    let mut counts = Vec::new();
    for result in reader.records() {
        let record = result?;
        match numeric_cell(&record, count, &columns.count) {
            Ok(value) => counts.push(PhenotypeCount {
                phenotype: text_cell(&record, phenotype),
                count: value,
            }),
            Err(err) => eprintln!("warning: skipping row {}: {err}", record_line(&record)),
        }
    }
    Ok(counts)
}

pub fn load_patients(path: &Path, columns: &ColumnMap) -> anyhow::Result<Vec<PatientRecord>> {
    let mut reader = open(path)?;
    let headers = reader.headers()?.clone();
    let patient_id = column_index(&headers, &columns.patient_id)?;
    let age = column_index(&headers, &columns.age)?;
    let sex = column_index(&headers, &columns.sex)?;
    let service = column_index(&headers, &columns.service)?;

    let mut patients = Vec::new();
    for result in reader.records() {
        let record = result?;
        let raw_age = record.get(age).unwrap_or("");
        patients.push(PatientRecord {
            patient_id: text_cell(&record, patient_id),
            age: raw_age.parse::<u32>().ok(),
            sex: text_cell(&record, sex),
            service: text_cell(&record, service),
        });
    }
    Ok(patients)
}

/// Weekly panel rows plus a count of rows whose sample date did not parse.
/// Undated rows stay in the table but carry no week, so week-scoped
/// selection drops them.
#[derive(Debug, Clone)]
pub struct WeeklyPanel {
    pub rows: Vec<PanelRow>,
    pub undated_rows: usize,
}

pub fn load_weekly_panel(
    path: &Path,
    columns: &ColumnMap,
    monitored: &[String],
) -> anyhow::Result<WeeklyPanel> {
    let mut reader = open(path)?;
    let headers = reader.headers()?.clone();
    let sample_date = column_index(&headers, &columns.sample_date)?;
    let service = column_index(&headers, &columns.service)?;
    let patient_id = column_index(&headers, &columns.patient_id)?;

    // Only the monitored antibiotics actually present as columns are read;
    // panels differ from week to week.
    let antibiotic_columns: Vec<(usize, &String)> = monitored
        .iter()
        .filter_map(|name| {
            headers
                .iter()
                .position(|header| header == name)
                .map(|index| (index, name))
        })
        .collect();

    let mut rows = Vec::new();
    let mut undated_rows = 0usize;
    for result in reader.records() {
        let record = result?;
        let date = parse_sample_date(record.get(sample_date).unwrap_or("")).ok();
        if date.is_none() {
            undated_rows += 1;
        }

        let mut results = BTreeMap::new();
        for (index, name) in &antibiotic_columns {
            if let Some(code) = record.get(*index).and_then(Susceptibility::from_code) {
                results.insert((*name).clone(), code);
            }
        }

        rows.push(PanelRow {
            sample_date: date,
            week: date.map(|d| d.iso_week().week()),
            service: text_cell(&record, service),
            patient_id: text_cell(&record, patient_id),
            results,
        });
    }

    Ok(WeeklyPanel { rows, undated_rows })
}

fn parse_sample_date(raw: &str) -> Result<NaiveDate, AnalysisError> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(raw, "%d/%m/%Y"))
        .map_err(|_| AnalysisError::UnparseableDate {
            value: raw.to_string(),
        })
}
