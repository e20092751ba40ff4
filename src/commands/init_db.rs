use crate::store::Database;
use anyhow::{Context, Result};
use rusqlite::Connection;

pub fn init_db(conn: &Connection, path: &str) -> Result<()> {
    Database::new(conn)
        .create_schema()
        .with_context(|| format!("Failed to create schema in {}", path))?;
    println!("Initialized survey database at {}", path);
    Ok(())
}
