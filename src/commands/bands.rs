use crate::cli::OutputFormat;
use crate::internight::BandTable;
use crate::store::Database;
use anyhow::{Context, Result};
use rusqlite::Connection;

pub fn show_bands(conn: &Connection, format: OutputFormat) -> Result<()> {
    let db = Database::new(conn);
    let table = BandTable::build(&db).context("Failed to read star colors")?;

    match format {
        OutputFormat::Json => {
            let json: serde_json::Map<String, serde_json::Value> = table
                .iter()
                .map(|(band, stars)| (band.to_string(), serde_json::json!(stars)))
                .collect();
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
        OutputFormat::Table => {
            println!("{:<20} {:<10} {:<50}", "Band", "Stars", "First stars");
            println!("{:-<80}", "");
            for (band, stars) in table.iter() {
                let preview = stars
                    .iter()
                    .take(10)
                    .map(|s| s.to_string())
                    .collect::<Vec<_>>()
                    .join(", ");
                let ellipsis = if stars.len() > 10 { ", ..." } else { "" };
                println!(
                    "{:<20} {:<10} {}{}",
                    band.name(),
                    stars.len(),
                    preview,
                    ellipsis
                );
            }
        }
    }

    Ok(())
}
