use crate::models::{night_name, Variant};
use crate::nights::year_calendar;
use crate::store::Database;
use anyhow::Result;
use rusqlite::Connection;

pub fn list_nights(conn: &Connection, year: i32, secondary: bool) -> Result<()> {
    let db = Database::new(conn);
    let calendar = year_calendar(&db, year, Variant::from_primary(!secondary))?;

    println!("{:<20} {:<10}", "Night", "Registry");
    println!("{:-<30}", "");

    for night in &calendar {
        let status = match night.bad_night_id {
            Some(id) => format!("bad #{}", id),
            None => String::new(),
        };
        println!("{:<20} {:<10}", night_name(night.date), status);
    }

    let bad = calendar.iter().filter(|n| n.is_bad()).count();
    println!("\nTotal: {} nights, {} registered bad", calendar.len(), bad);
    Ok(())
}
