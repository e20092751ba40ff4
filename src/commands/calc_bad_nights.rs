use crate::bad_nights::{calc_bad_nights, BadNightsReport};
use crate::cli::{CalcBadNightsArgs, OutputFormat};
use crate::store::Database;
use crate::utils::truncate_string;
use anyhow::{Context, Result};
use rusqlite::Connection;

pub fn calc_bad_nights_command(conn: &Connection, args: &CalcBadNightsArgs) -> Result<()> {
    let db = Database::new(conn);
    let config = args.to_config();

    let report = calc_bad_nights(&db, &config)
        .with_context(|| format!("Failed to calculate bad nights for {}", args.year))?;

    match args.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Table => {
            let mut out = String::new();
            render_report(&report, args.silent, args.show_all_ltpr_values, &mut out)?;
            print!("{}", out);
        }
    }

    Ok(())
}

/// Renders the console report: parameter echo, optional LTPR table, bad-night
/// list and skipped stars. `silent` drops everything except the LTPR table.
pub fn render_report(
    report: &BadNightsReport,
    silent: bool,
    show_all: bool,
    out: &mut String,
) -> std::fmt::Result {
    use std::fmt::Write;

    if !silent {
        writeln!(out, "Year: {}", report.year)?;
        writeln!(out, "Attendance threshold: {}", report.attendance_threshold)?;
        writeln!(out, "LTPR threshold: {}", report.ltpr_threshold)?;
        writeln!(out, "Primary Dataset: {}", report.variant.is_primary())?;
        writeln!(
            out,
            "Stars used: {} (below attendance: {})",
            report.stars_used, report.stars_below_attendance
        )?;
    }

    if show_all {
        writeln!(out, "\n{:<20} {:<10}", "Night", "LTPR")?;
        for (night, ltpr) in report.ltpr_table() {
            writeln!(out, "{:<20} {:<10.6}", night, ltpr)?;
        }
    }

    if silent {
        return Ok(());
    }

    writeln!(out, "\n==============\nBad nights\n==============")?;
    for night in report.bad_night_names() {
        writeln!(out, "{}", night)?;
    }
    writeln!(out, "\nTotal: {} bad nights", report.bad_nights.len())?;

    if !report.skipped.is_empty() {
        writeln!(out, "\nSkipped stars:")?;
        writeln!(out, "{:<10} {:<60}", "Star", "Reason")?;
        writeln!(out, "{:-<70}", "")?;
        for skipped in &report.skipped {
            writeln!(
                out,
                "{:<10} {:<60}",
                skipped.star,
                truncate_string(&skipped.reason, 60)
            )?;
        }
    }

    Ok(())
}
