use crate::error::AnalysisError;
use crate::models::{PanelRow, PatientRecord, PhenotypeCount, ResistanceRecord};

/// Inclusive numeric range predicate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RangeFilter {
    pub lo: f64,
    pub hi: f64,
}

impl RangeFilter {
    pub fn contains(&self, value: f64) -> bool {
        self.lo <= value && value <= self.hi
    }
}

/// Maps a categorical filter value to a predicate: the "all" sentinel
/// disables the filter, anything else is an exact match.
pub fn sex_filter(value: &str) -> Option<&str> {
    if value == "all" {
        None
    } else {
        Some(value)
    }
}

/// Filters the clinical table by age range and sex. Active predicates are
/// ANDed; a `None` predicate (the "all" sentinel in the UI) is inactive.
/// Rows without an age fail an active age filter. Always returns a new
/// vector; the source table is untouched.
pub fn filter_patients(
    rows: &[PatientRecord],
    age: Option<RangeFilter>,
    sex: Option<&str>,
) -> Vec<PatientRecord> {
    rows.iter()
        .filter(|row| match age {
            Some(range) => row.age.is_some_and(|a| range.contains(a as f64)),
            None => true,
        })
        .filter(|row| match sex {
            Some(wanted) => row.sex == wanted,
            None => true,
        })
        .cloned()
        .collect()
}

/// Selects panel rows for a (week, service) pair. Rows whose sample date
/// failed to parse carry no week and never match an active week filter.
pub fn filter_panel(
    rows: &[PanelRow],
    week: Option<u32>,
    service: Option<&str>,
) -> Vec<PanelRow> {
    rows.iter()
        .filter(|row| match week {
            Some(wanted) => row.week == Some(wanted),
            None => true,
        })
        .filter(|row| match service {
            Some(wanted) => row.service == wanted,
            None => true,
        })
        .cloned()
        .collect()
}

pub fn rates_for_antibiotic<'a>(
    records: &'a [ResistanceRecord],
    antibiotic: &str,
) -> Vec<&'a ResistanceRecord> {
    records
        .iter()
        .filter(|record| record.antibiotic == antibiotic)
        .collect()
}

/// Resistance rows for one antibiotic with their Tukey flags attached.
/// The flags live in the returned pairs, never in the source records, so
/// repeated calls over the same table give identical output.
pub fn resistance_with_alarms(
    records: &[ResistanceRecord],
    antibiotic: &str,
    multiplier: f64,
) -> Result<Vec<(ResistanceRecord, bool)>, AnalysisError> {
    let selected = rates_for_antibiotic(records, antibiotic);
    let rates: Vec<f64> = selected.iter().map(|record| record.rate).collect();
    let flags = crate::alarm::tukey_flags(antibiotic, &rates, multiplier)?;
    Ok(selected
        .into_iter()
        .cloned()
        .zip(flags)
        .collect())
}

/// Phenotype counts with their Tukey flags, recomputed from the full count
/// distribution on every call.
pub fn phenotypes_with_alarms(
    counts: &[PhenotypeCount],
    multiplier: f64,
) -> Result<Vec<(PhenotypeCount, bool)>, AnalysisError> {
    let values: Vec<f64> = counts.iter().map(|row| row.count).collect();
    let flags = crate::alarm::tukey_flags("count", &values, multiplier)?;
    Ok(counts.iter().cloned().zip(flags).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn patient(patient_id: &str, age: Option<u32>, sex: &str) -> PatientRecord {
        PatientRecord {
            patient_id: patient_id.to_string(),
            age,
            sex: sex.to_string(),
            service: "ICU".to_string(),
        }
    }

    fn rate(year: i32, antibiotic: &str, value: f64) -> ResistanceRecord {
        ResistanceRecord {
            year,
            antibiotic: antibiotic.to_string(),
            phenotype: "MRSA".to_string(),
            rate: value,
        }
    }

    #[test]
    fn predicates_compose_with_and() {
        let rows = vec![
            patient("pass-both", Some(40), "F"),
            patient("fail-age", Some(80), "F"),
            patient("fail-sex", Some(40), "M"),
            patient("fail-both", Some(80), "M"),
        ];
        let range = RangeFilter { lo: 18.0, hi: 65.0 };

        let both = filter_patients(&rows, Some(range), Some("F"));
        assert_eq!(both.len(), 1);
        assert_eq!(both[0].patient_id, "pass-both");

        let age_only = filter_patients(&rows, Some(range), None);
        assert_eq!(age_only.len(), 2);

        let none = filter_patients(&rows, None, None);
        assert_eq!(none.len(), 4);
    }

    #[test]
    fn range_bounds_are_inclusive() {
        let range = RangeFilter { lo: 18.0, hi: 65.0 };
        assert!(range.contains(18.0));
        assert!(range.contains(65.0));
        assert!(!range.contains(17.9));
        assert!(!range.contains(65.1));
    }

    #[test]
    fn all_sentinel_disables_the_sex_filter() {
        let rows = vec![
            patient("pat-f", Some(40), "F"),
            patient("pat-m", Some(40), "M"),
        ];

        let everyone = filter_patients(&rows, None, sex_filter("all"));
        assert_eq!(everyone.len(), 2);

        let women = filter_patients(&rows, None, sex_filter("F"));
        assert_eq!(women.len(), 1);
        assert_eq!(women[0].patient_id, "pat-f");
    }

    #[test]
    fn missing_age_fails_an_active_age_filter() {
        let rows = vec![patient("no-age", None, "F")];
        let range = RangeFilter { lo: 0.0, hi: 100.0 };
        assert!(filter_patients(&rows, Some(range), None).is_empty());
        assert_eq!(filter_patients(&rows, None, None).len(), 1);
    }

    #[test]
    fn empty_table_filters_to_empty() {
        let range = RangeFilter { lo: 0.0, hi: 100.0 };
        assert!(filter_patients(&[], Some(range), Some("F")).is_empty());
        assert!(filter_panel(&[], Some(7), Some("ICU")).is_empty());
        assert!(rates_for_antibiotic(&[], "Oxacillin").is_empty());
    }

    #[test]
    fn alarm_attachment_is_idempotent() {
        let records = vec![
            rate(2019, "Oxacillin", 12.0),
            rate(2020, "Oxacillin", 10.0),
            rate(2021, "Oxacillin", 90.0),
            rate(2022, "Oxacillin", 11.0),
            rate(2023, "Oxacillin", 13.0),
            rate(2023, "Vancomycin", 1.0),
        ];
        let first = resistance_with_alarms(&records, "Oxacillin", 1.5).unwrap();
        let second = resistance_with_alarms(&records, "Oxacillin", 1.5).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.len(), 5);
        let flagged: Vec<i32> = first
            .iter()
            .filter(|(_, alarm)| *alarm)
            .map(|(record, _)| record.year)
            .collect();
        assert_eq!(flagged, vec![2021]);
    }

    #[test]
    fn alarms_are_scoped_to_one_antibiotic() {
        // The vancomycin outlier must not leak into the oxacillin fence.
        let records = vec![
            rate(2020, "Oxacillin", 10.0),
            rate(2021, "Oxacillin", 11.0),
            rate(2022, "Oxacillin", 12.0),
            rate(2020, "Vancomycin", 900.0),
        ];
        let flagged = resistance_with_alarms(&records, "Oxacillin", 1.5).unwrap();
        assert!(flagged.iter().all(|(_, alarm)| !alarm));
    }

    #[test]
    fn phenotype_alarms_flag_dominant_counts() {
        let counts = vec![
            PhenotypeCount { phenotype: "MSSA".to_string(), count: 10.0 },
            PhenotypeCount { phenotype: "MRSA".to_string(), count: 12.0 },
            PhenotypeCount { phenotype: "VISA".to_string(), count: 11.0 },
            PhenotypeCount { phenotype: "hVISA".to_string(), count: 13.0 },
            PhenotypeCount { phenotype: "VRSA".to_string(), count: 90.0 },
        ];
        let flagged = phenotypes_with_alarms(&counts, 1.5).unwrap();
        let alarming: Vec<&str> = flagged
            .iter()
            .filter(|(_, alarm)| *alarm)
            .map(|(row, _)| row.phenotype.as_str())
            .collect();
        assert_eq!(alarming, vec!["VRSA"]);
    }
}
