use std::collections::BTreeMap;
use std::fmt::Write;

use crate::alarm::WeeklyAlert;
use crate::models::{PhenotypeCount, ResistanceRecord, TrendPoint};

/// Mean resistance rate per (year, phenotype), sorted by year then
/// phenotype. This is the overview trend series.
pub fn trend_by_phenotype(records: &[ResistanceRecord]) -> Vec<TrendPoint> {
    let mut groups: BTreeMap<(i32, String), (f64, usize)> = BTreeMap::new();
    for record in records {
        let entry = groups
            .entry((record.year, record.phenotype.clone()))
            .or_insert((0.0, 0));
        entry.0 += record.rate;
        entry.1 += 1;
    }

    groups
        .into_iter()
        .map(|((year, phenotype), (total, count))| TrendPoint {
            year,
            phenotype,
            mean_rate: total / count as f64,
            sample_count: count,
        })
        .collect()
}

/// Each phenotype's share of the total count. An all-zero table yields
/// zero shares rather than dividing by zero.
pub fn phenotype_shares(counts: &[PhenotypeCount]) -> Vec<(String, f64)> {
    let total: f64 = counts.iter().map(|row| row.count).sum();
    counts
        .iter()
        .map(|row| {
            let share = if total > 0.0 { row.count / total } else { 0.0 };
            (row.phenotype.clone(), share)
        })
        .collect()
}

pub struct ReportInput<'a> {
    pub trend: &'a [TrendPoint],
    pub shares: &'a [(String, f64)],
    pub phenotype_alarms: &'a [(PhenotypeCount, bool)],
    pub weekly: Option<(&'a WeeklyAlert, u32, &'a str)>,
}

pub fn build_report(input: &ReportInput) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# S. aureus Surveillance Report");
    let _ = writeln!(output);
    let _ = writeln!(output, "## Resistance Trend");

    if input.trend.is_empty() {
        let _ = writeln!(output, "No resistance records loaded.");
    } else {
        for point in input.trend {
            let _ = writeln!(
                output,
                "- {} {}: mean rate {:.1}% over {} records",
                point.year, point.phenotype, point.mean_rate, point.sample_count
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Phenotype Mix");

    if input.shares.is_empty() {
        let _ = writeln!(output, "No phenotype counts loaded.");
    } else {
        for (phenotype, share) in input.shares {
            let _ = writeln!(output, "- {}: {:.1}% of isolates", phenotype, share * 100.0);
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Phenotype Alarms");

    let alarming: Vec<&PhenotypeCount> = input
        .phenotype_alarms
        .iter()
        .filter(|(_, alarm)| *alarm)
        .map(|(row, _)| row)
        .collect();

    if alarming.is_empty() {
        let _ = writeln!(output, "No phenotype count exceeds its Tukey fence.");
    } else {
        for row in alarming {
            let _ = writeln!(output, "- {} ({} isolates)", row.phenotype, row.count);
        }
    }

    if let Some((alert, week, service)) = input.weekly {
        let _ = writeln!(output);
        let _ = writeln!(output, "## Weekly Alerts (week {week}, {service})");

        if alert.is_clear() {
            let _ = writeln!(output, "No threshold exceeded this week for this service.");
        } else {
            let _ = writeln!(output, "Alert on: {}", alert.alerting.join(", "));
            for row in &alert.rows {
                let codes: Vec<String> = row
                    .results
                    .iter()
                    .map(|(antibiotic, code)| format!("{antibiotic}={code}"))
                    .collect();
                let _ = writeln!(output, "- {}: {}", row.patient_id, codes.join(", "));
            }
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rate(year: i32, phenotype: &str, value: f64) -> ResistanceRecord {
        ResistanceRecord {
            year,
            antibiotic: "Oxacillin".to_string(),
            phenotype: phenotype.to_string(),
            rate: value,
        }
    }

    #[test]
    fn trend_averages_within_groups() {
        let records = vec![
            rate(2022, "MRSA", 20.0),
            rate(2022, "MRSA", 30.0),
            rate(2022, "MSSA", 70.0),
            rate(2023, "MRSA", 28.0),
        ];
        let trend = trend_by_phenotype(&records);
        assert_eq!(trend.len(), 3);
        assert_eq!(trend[0].year, 2022);
        assert_eq!(trend[0].phenotype, "MRSA");
        assert_eq!(trend[0].mean_rate, 25.0);
        assert_eq!(trend[0].sample_count, 2);
        assert_eq!(trend[2].year, 2023);
    }

    #[test]
    fn shares_sum_to_one() {
        let counts = vec![
            PhenotypeCount { phenotype: "MRSA".to_string(), count: 23.0 },
            PhenotypeCount { phenotype: "MSSA".to_string(), count: 77.0 },
        ];
        let shares = phenotype_shares(&counts);
        let total: f64 = shares.iter().map(|(_, share)| share).sum();
        assert!((total - 1.0).abs() < 1e-9);
        assert!((shares[0].1 - 0.23).abs() < 1e-9);
    }

    #[test]
    fn zero_total_yields_zero_shares() {
        let counts = vec![PhenotypeCount { phenotype: "MRSA".to_string(), count: 0.0 }];
        let shares = phenotype_shares(&counts);
        assert_eq!(shares[0].1, 0.0);
    }

    #[test]
    fn report_renders_for_empty_inputs() {
        let report = build_report(&ReportInput {
            trend: &[],
            shares: &[],
            phenotype_alarms: &[],
            weekly: None,
        });
        assert!(report.contains("No resistance records loaded."));
        assert!(report.contains("No phenotype counts loaded."));
        assert!(report.contains("No phenotype count exceeds its Tukey fence."));
        assert!(!report.contains("Weekly Alerts"));
    }

    #[test]
    fn report_lists_weekly_alerts() {
        use crate::alarm::{AlertRow, WeeklyAlert};
        use crate::models::Susceptibility;

        let alert = WeeklyAlert {
            alerting: vec!["Oxacillin".to_string()],
            rows: vec![AlertRow {
                patient_id: "pat-1".to_string(),
                results: vec![("Oxacillin".to_string(), Susceptibility::Resistant)],
            }],
        };
        let report = build_report(&ReportInput {
            trend: &[],
            shares: &[],
            phenotype_alarms: &[],
            weekly: Some((&alert, 7, "ICU")),
        });
        assert!(report.contains("Weekly Alerts (week 7, ICU)"));
        assert!(report.contains("Alert on: Oxacillin"));
        assert!(report.contains("pat-1: Oxacillin=R"));
    }
}
