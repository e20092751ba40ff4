use crate::error::{Result, TroutError};
use crate::models::{BadNight, Observation, StarId, Variant};
use crate::query::ObservationFilter;
use crate::store::{BadNightRegistry, ColorRegistry, ObservationStore};
use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS star_observation (
    star        INTEGER NOT NULL,
    variant     TEXT    NOT NULL,
    sequence_id INTEGER NOT NULL,
    flux        REAL    NOT NULL,
    night_date  TEXT    NOT NULL,
    PRIMARY KEY (star, variant, sequence_id)
);
CREATE INDEX IF NOT EXISTS star_observation_night
    ON star_observation (star, variant, night_date);

CREATE TABLE IF NOT EXISTS bad_night (
    id         INTEGER NOT NULL,
    variant    TEXT    NOT NULL,
    night_date TEXT    NOT NULL,
    PRIMARY KEY (id, variant)
);

CREATE TABLE IF NOT EXISTS star_color (
    star  INTEGER PRIMARY KEY,
    color REAL
);
";

/// Database access layer for the survey store
pub struct Database<'a> {
    conn: &'a Connection,
}

impl<'a> Database<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Database { conn }
    }

    pub fn create_schema(&self) -> Result<()> {
        self.conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    // Bulk loading
    pub fn insert_observations(
        &self,
        star: StarId,
        variant: Variant,
        observations: &[Observation],
    ) -> Result<()> {
        self.with_transaction(|tx| {
            let mut stmt = tx.prepare(
                "INSERT OR REPLACE INTO star_observation
                    (star, variant, sequence_id, flux, night_date)
                 VALUES (?, ?, ?, ?, ?)",
            )?;
            for obs in observations {
                stmt.execute(params![
                    star.get(),
                    variant.as_str(),
                    obs.sequence_id,
                    obs.flux,
                    obs.date
                ])?;
            }
            Ok(())
        })
    }

    pub fn insert_bad_nights(&self, variant: Variant, nights: &[BadNight]) -> Result<()> {
        self.with_transaction(|tx| {
            let mut stmt = tx.prepare(
                "INSERT OR REPLACE INTO bad_night (id, variant, night_date) VALUES (?, ?, ?)",
            )?;
            for night in nights {
                stmt.execute(params![night.id, variant.as_str(), night.date])?;
            }
            Ok(())
        })
    }

    pub fn set_color(&self, star: StarId, color: Option<f64>) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO star_color (star, color) VALUES (?, ?)",
            params![star.get(), color],
        )?;
        Ok(())
    }

    // Transaction helpers
    pub fn with_transaction<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&rusqlite::Transaction) -> Result<T>,
    {
        let tx = self.conn.unchecked_transaction()?;
        let result = f(&tx)?;
        tx.commit()?;
        Ok(result)
    }
}

impl ObservationStore for Database<'_> {
    fn observations(
        &self,
        star: StarId,
        variant: Variant,
        filter: &ObservationFilter,
    ) -> Result<Vec<Observation>> {
        filter.validate()?;

        let mut query = String::from(
            "SELECT sequence_id, flux, night_date
             FROM star_observation
             WHERE star = ? AND variant = ?",
        );

        let mut params: Vec<Box<dyn rusqlite::ToSql>> =
            vec![Box::new(star.get()), Box::new(variant.as_str())];

        if let Some(from) = filter.from {
            query.push_str(" AND night_date >= ?");
            params.push(Box::new(from));
        }

        if let Some(until) = filter.until {
            query.push_str(" AND night_date < ?");
            params.push(Box::new(until));
        }

        if let Some(flux) = filter.flux_above {
            query.push_str(" AND flux > ?");
            params.push(Box::new(flux));
        }

        if let Some(flux) = filter.flux_below {
            query.push_str(" AND flux < ?");
            params.push(Box::new(flux));
        }

        query.push_str(" ORDER BY night_date, sequence_id");

        let param_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();
        let rejected = |source: rusqlite::Error| TroutError::InvalidSelectionQuery {
            reason: format!("selection for star {} failed", star),
            source: Some(source),
        };

        let mut stmt = self.conn.prepare(&query).map_err(rejected)?;
        let observations = stmt
            .query_map(param_refs.as_slice(), |row| {
                Ok(Observation {
                    sequence_id: row.get(0)?,
                    flux: row.get(1)?,
                    date: row.get(2)?,
                })
            })
            .map_err(rejected)?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(rejected)?;

        Ok(observations)
    }
}

impl BadNightRegistry for Database<'_> {
    fn bad_nights(&self, variant: Variant, year: Option<i32>) -> Result<Vec<BadNight>> {
        let mut query = String::from("SELECT id, night_date FROM bad_night WHERE variant = ?");
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = vec![Box::new(variant.as_str())];

        if let Some(year) = year {
            let filter = ObservationFilter::year(year)?;
            query.push_str(" AND night_date >= ? AND night_date < ?");
            params.push(Box::new(filter.from));
            params.push(Box::new(filter.until));
        }

        query.push_str(" ORDER BY night_date, id");

        let mut stmt = self.conn.prepare(&query)?;
        let param_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();

        let nights = stmt
            .query_map(param_refs.as_slice(), |row| {
                Ok(BadNight {
                    id: row.get(0)?,
                    date: row.get::<_, NaiveDate>(1)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(nights)
    }
}

impl ColorRegistry for Database<'_> {
    fn color(&self, star: StarId) -> Result<Option<f64>> {
        let mut stmt = self
            .conn
            .prepare_cached("SELECT color FROM star_color WHERE star = ?")?;
        let color = stmt
            .query_row([star.get()], |row| row.get::<_, Option<f64>>(0))
            .optional()?;
        Ok(color.flatten())
    }
}
