//! Observing calendar of a year.

use crate::error::Result;
use crate::models::{StarId, Variant, STAR_START};
use crate::query::ObservationFilter;
use crate::store::SurveyStore;
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NightStatus {
    pub date: NaiveDate,
    /// Registry id when the night is already recorded as bad
    pub bad_night_id: Option<i64>,
}

impl NightStatus {
    pub fn is_bad(&self) -> bool {
        self.bad_night_id.is_some()
    }
}

/// Every night of `year` on which the reference star (star 1) has a row,
/// including zero-flux and bad nights.
pub fn nights_in_year<S: SurveyStore + ?Sized>(
    store: &S,
    year: i32,
    variant: Variant,
) -> Result<Vec<NaiveDate>> {
    let reference = StarId::new(STAR_START as i64)?;
    let mut dates: Vec<NaiveDate> = store
        .observations(reference, variant, &ObservationFilter::year(year)?)?
        .into_iter()
        .map(|obs| obs.date)
        .collect();
    dates.dedup();
    Ok(dates)
}

/// Nights of `year` annotated with their registry status.
pub fn year_calendar<S: SurveyStore + ?Sized>(
    store: &S,
    year: i32,
    variant: Variant,
) -> Result<Vec<NightStatus>> {
    let registered: HashMap<NaiveDate, i64> = store
        .bad_nights(variant, Some(year))?
        .into_iter()
        .map(|night| (night.date, night.id))
        .collect();

    Ok(nights_in_year(store, year, variant)?
        .into_iter()
        .map(|date| NightStatus {
            date,
            bad_night_id: registered.get(&date).copied(),
        })
        .collect())
}
