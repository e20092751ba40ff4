use crate::models::{night_name, Variant};
use crate::store::{BadNightRegistry, Database};
use anyhow::Result;
use rusqlite::Connection;

pub fn list_bad_nights(conn: &Connection, year: Option<i32>, secondary: bool) -> Result<()> {
    let db = Database::new(conn);
    let variant = Variant::from_primary(!secondary);
    let nights = db.bad_nights(variant, year)?;

    println!("{:<10} {:<20}", "ID", "Night");
    println!("{:-<30}", "");

    for night in &nights {
        println!("{:<10} {:<20}", night.id, night_name(night.date));
    }

    println!("\nTotal: {} bad nights ({})", nights.len(), variant);
    Ok(())
}
