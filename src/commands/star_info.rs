use crate::conversions::flux_to_magnitude_4px;
use crate::internight::classify_band;
use crate::models::{StarId, Variant};
use crate::query::SelectOptions;
use crate::star::Star;
use crate::store::Database;
use crate::TroutError;
use anyhow::{Context, Result};
use rusqlite::Connection;

pub fn show_star(conn: &Connection, star: StarId, year: Option<i32>, secondary: bool) -> Result<()> {
    let db = Database::new(conn);
    let variant = Variant::from_primary(!secondary);
    let mut data = Star::load(&db, star, variant)
        .with_context(|| format!("Failed to load star {}", star))?;

    println!("{}", data);
    println!(
        "Color: {}",
        data.color()
            .map(|c| format!("{:.3}", c))
            .unwrap_or_else(|| "none".to_string())
    );
    println!("Band: {}", classify_band(star, data.color()));
    println!("Dataset: {}", variant);

    match data.attendance_stats(year) {
        Ok(stats) => {
            println!("Data points: {}", stats.data_points);
            println!("Data points (excluding bad nights): {}", stats.excluding_bad_nights);
            println!("Attended nights (without bad nights): {}", stats.attended);
            println!("Attendance: {:.1}%", stats.ratio() * 100.0);
        }
        Err(e @ TroutError::NoDataForYear { .. }) => {
            println!("{}", e);
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    }

    match year {
        Some(year) => data.select_year(year, SelectOptions::default())?,
        None => data.reset_selection()?,
    };

    if let Some(mean) = data.mean() {
        println!(
            "Mean flux: {:.1} (magnitude {:.3})",
            mean,
            flux_to_magnitude_4px(mean)
        );
    }
    if let (Some(median), Some(min), Some(max)) = (data.median(), data.min(), data.max()) {
        println!("Median flux: {:.1}  Min: {:.1}  Max: {:.1}", median, min, max);
    }
    if let Some(year) = year {
        if let Some(step) = data.step(year - 1, year)? {
            println!("Step from {}: {:.4}", year - 1, step);
        }
    }

    Ok(())
}
