use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};

mod alarm;
mod config;
mod error;
mod load;
mod models;
mod report;
mod select;

use config::SurveillanceConfig;

#[derive(Parser)]
#[command(name = "aureus-surveillance")]
#[command(about = "Antibiotic-resistance surveillance analytics for S. aureus", long_about = None)]
struct Cli {
    /// Optional JSON config (monitored panel, thresholds, column names)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resistance trend and phenotype mix across all loaded extracts
    Overview {
        #[arg(long)]
        resistance: PathBuf,
        #[arg(long)]
        phenotypes: PathBuf,
    },
    /// Per-year resistance rates for one antibiotic, with Tukey alarms
    Resistance {
        #[arg(long)]
        data: PathBuf,
        #[arg(long)]
        antibiotic: String,
        /// Overrides the configured Tukey fence multiplier
        #[arg(long)]
        multiplier: Option<f64>,
        #[arg(long)]
        json: bool,
    },
    /// Phenotype counts with Tukey alarms
    Phenotypes {
        #[arg(long)]
        data: PathBuf,
        #[arg(long)]
        multiplier: Option<f64>,
        #[arg(long)]
        json: bool,
    },
    /// Weekly threshold alerts for one (week, service) slice
    Weekly {
        #[arg(long)]
        data: PathBuf,
        #[arg(long)]
        week: u32,
        #[arg(long)]
        service: String,
        /// Overrides the configured alert threshold (fraction of rows)
        #[arg(long)]
        threshold: Option<f64>,
        #[arg(long)]
        json: bool,
    },
    /// Filter the clinical table by age and sex, optionally exporting CSV
    Filter {
        #[arg(long)]
        data: PathBuf,
        #[arg(long)]
        min_age: Option<u32>,
        #[arg(long)]
        max_age: Option<u32>,
        /// Exact match; "all" disables the filter
        #[arg(long)]
        sex: Option<String>,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Generate a markdown report across all extracts
    Report {
        #[arg(long)]
        resistance: PathBuf,
        #[arg(long)]
        phenotypes: PathBuf,
        /// Weekly panel extract; needs --week and --service
        #[arg(long, requires_all = ["week", "service"])]
        weekly: Option<PathBuf>,
        #[arg(long, requires = "weekly")]
        week: Option<u32>,
        #[arg(long, requires = "weekly")]
        service: Option<String>,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => SurveillanceConfig::from_file(path)?,
        None => SurveillanceConfig::default(),
    };

    match cli.command {
        Commands::Overview {
            resistance,
            phenotypes,
        } => {
            let records = load::load_resistance(&resistance, &config.columns)?;
            let counts = load::load_phenotypes(&phenotypes, &config.columns)?;

            println!("Resistance trend (mean rate by year and phenotype):");
            let trend = report::trend_by_phenotype(&records);
            if trend.is_empty() {
                println!("  no resistance records loaded");
            }
            for point in &trend {
                println!(
                    "  {} {}: {:.1}% ({} records)",
                    point.year, point.phenotype, point.mean_rate, point.sample_count
                );
            }

            println!("Phenotype mix:");
            for (phenotype, share) in report::phenotype_shares(&counts) {
                println!("  {}: {:.1}%", phenotype, share * 100.0);
            }
        }
        Commands::Resistance {
            data,
            antibiotic,
            multiplier,
            json,
        } => {
            let records = load::load_resistance(&data, &config.columns)?;
            let multiplier = multiplier.unwrap_or(config.tukey_multiplier);
            let flagged = select::resistance_with_alarms(&records, &antibiotic, multiplier)
                .with_context(|| format!("alarm pass failed for {antibiotic}"))?;

            if flagged.is_empty() {
                println!("No records for {antibiotic}.");
                return Ok(());
            }

            if json {
                #[derive(serde::Serialize)]
                struct FlaggedRate<'a> {
                    year: i32,
                    phenotype: &'a str,
                    rate: f64,
                    alarm: bool,
                }
                let rows: Vec<FlaggedRate> = flagged
                    .iter()
                    .map(|(record, alarm)| FlaggedRate {
                        year: record.year,
                        phenotype: &record.phenotype,
                        rate: record.rate,
                        alarm: *alarm,
                    })
                    .collect();
                println!("{}", serde_json::to_string_pretty(&rows)?);
            } else {
                println!("Resistance rates for {antibiotic} (fence multiplier {multiplier}):");
                for (record, alarm) in &flagged {
                    let marker = if *alarm { "  ALARM" } else { "" };
                    println!("  {} {:.1}%{}", record.year, record.rate, marker);
                }
            }
        }
        Commands::Phenotypes {
            data,
            multiplier,
            json,
        } => {
            let counts = load::load_phenotypes(&data, &config.columns)?;
            let multiplier = multiplier.unwrap_or(config.tukey_multiplier);
            let flagged = select::phenotypes_with_alarms(&counts, multiplier)
                .context("alarm pass failed for phenotype counts")?;

            if json {
                #[derive(serde::Serialize)]
                struct FlaggedCount<'a> {
                    phenotype: &'a str,
                    count: f64,
                    alarm: bool,
                }
                let rows: Vec<FlaggedCount> = flagged
                    .iter()
                    .map(|(row, alarm)| FlaggedCount {
                        phenotype: &row.phenotype,
                        count: row.count,
                        alarm: *alarm,
                    })
                    .collect();
                println!("{}", serde_json::to_string_pretty(&rows)?);
                return Ok(());
            }

            println!("Phenotype counts:");
            for (row, alarm) in &flagged {
                let marker = if *alarm { "  ALARM" } else { "" };
                println!("  {}: {}{}", row.phenotype, row.count, marker);
            }
            let alarming: Vec<&str> = flagged
                .iter()
                .filter(|(_, alarm)| *alarm)
                .map(|(row, _)| row.phenotype.as_str())
                .collect();
            if alarming.is_empty() {
                println!("No phenotype count exceeds its Tukey fence.");
            } else {
                println!("Alarming phenotypes: {}", alarming.join(", "));
            }
        }
        Commands::Weekly {
            data,
            week,
            service,
            threshold,
            json,
        } => {
            let panel = load::load_weekly_panel(&data, &config.columns, &config.monitored_antibiotics)?;
            if panel.undated_rows > 0 {
                eprintln!(
                    "warning: {} rows had unparseable sample dates and were excluded from weekly grouping",
                    panel.undated_rows
                );
            }

            let slice = select::filter_panel(&panel.rows, Some(week), Some(service.as_str()));
            let threshold = threshold.unwrap_or(config.weekly_threshold);
            let alert = alarm::evaluate_week(&slice, &config.monitored_antibiotics, threshold);

            if json {
                println!("{}", serde_json::to_string_pretty(&alert)?);
                return Ok(());
            }

            if alert.is_clear() {
                println!("No threshold exceeded in week {week} for {service}.");
            } else {
                println!("Alert on: {}", alert.alerting.join(", "));
                for row in &alert.rows {
                    let codes: Vec<String> = row
                        .results
                        .iter()
                        .map(|(antibiotic, code)| format!("{antibiotic}={code}"))
                        .collect();
                    println!("  {}: {}", row.patient_id, codes.join(", "));
                }
            }
        }
        Commands::Filter {
            data,
            min_age,
            max_age,
            sex,
            out,
        } => {
            let patients = load::load_patients(&data, &config.columns)?;

            let age = if min_age.is_some() || max_age.is_some() {
                Some(select::RangeFilter {
                    lo: min_age.unwrap_or(0) as f64,
                    hi: max_age.unwrap_or(130) as f64,
                })
            } else {
                None
            };
            let sex = sex.as_deref().and_then(select::sex_filter);

            let selected = select::filter_patients(&patients, age, sex);
            if selected.is_empty() {
                println!("No rows match the active filters.");
                return Ok(());
            }

            if let Some(out) = out {
                let mut writer = csv::Writer::from_path(&out)
                    .with_context(|| format!("failed to create {}", out.display()))?;
                for row in &selected {
                    writer.serialize(row)?;
                }
                writer.flush()?;
                println!("Wrote {} rows to {}.", selected.len(), out.display());
            } else {
                for row in &selected {
                    let age = row
                        .age
                        .map(|a| a.to_string())
                        .unwrap_or_else(|| "-".to_string());
                    println!("  {} age {} {} ({})", row.patient_id, age, row.sex, row.service);
                }
            }
        }
        Commands::Report {
            resistance,
            phenotypes,
            weekly,
            week,
            service,
            out,
        } => {
            // Each view degrades independently: a broken extract disables
            // its section instead of failing the whole report.
            let records = load::load_resistance(&resistance, &config.columns).unwrap_or_else(|err| {
                eprintln!("warning: resistance view disabled: {err:#}");
                Vec::new()
            });
            let counts = load::load_phenotypes(&phenotypes, &config.columns).unwrap_or_else(|err| {
                eprintln!("warning: phenotype view disabled: {err:#}");
                Vec::new()
            });

            let trend = report::trend_by_phenotype(&records);
            let shares = report::phenotype_shares(&counts);
            let phenotype_alarms = select::phenotypes_with_alarms(&counts, config.tukey_multiplier)
                .unwrap_or_else(|err| {
                    eprintln!("warning: phenotype alarms disabled: {err:#}");
                    Vec::new()
                });

            let weekly_alert = match (weekly, week, service) {
                (Some(path), Some(week), Some(service)) => {
                    match load::load_weekly_panel(&path, &config.columns, &config.monitored_antibiotics)
                    {
                        Ok(panel) => {
                            let slice = select::filter_panel(
                                &panel.rows,
                                Some(week),
                                Some(service.as_str()),
                            );
                            let alert = alarm::evaluate_week(
                                &slice,
                                &config.monitored_antibiotics,
                                config.weekly_threshold,
                            );
                            Some((alert, week, service))
                        }
                        Err(err) => {
                            eprintln!("warning: weekly view disabled: {err:#}");
                            None
                        }
                    }
                }
                _ => None,
            };

            let rendered = report::build_report(&report::ReportInput {
                trend: &trend,
                shares: &shares,
                phenotype_alarms: &phenotype_alarms,
                weekly: weekly_alert
                    .as_ref()
                    .map(|(alert, week, service)| (alert, *week, service.as_str())),
            });
            std::fs::write(&out, rendered)?;
            println!("Report written to {}.", out.display());
        }
    }

    Ok(())
}
