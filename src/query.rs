//! Typed selection criteria for star observations.
//!
//! Filters are plain data: the SQLite store turns them into bound parameters
//! and the in-memory store evaluates them with [`ObservationFilter::matches`],
//! so both back ends select exactly the same rows.

use crate::error::{Result, TroutError};
use crate::models::Observation;
use chrono::NaiveDate;

/// Date and flux bounds for selecting observations. Every bound is optional;
/// the default filter selects everything.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ObservationFilter {
    /// Inclusive lower date bound
    pub from: Option<NaiveDate>,
    /// Exclusive upper date bound
    pub until: Option<NaiveDate>,
    /// Exclusive lower flux bound
    pub flux_above: Option<f64>,
    /// Exclusive upper flux bound
    pub flux_below: Option<f64>,
}

impl ObservationFilter {
    pub fn all() -> Self {
        Self::default()
    }

    /// Observations dated within the calendar year.
    pub fn year(year: i32) -> Result<Self> {
        let from = NaiveDate::from_ymd_opt(year, 1, 1)
            .ok_or_else(|| TroutError::invalid_query(format!("year {} is out of range", year)))?;
        let until = NaiveDate::from_ymd_opt(year + 1, 1, 1)
            .ok_or_else(|| TroutError::invalid_query(format!("year {} is out of range", year)))?;
        Ok(Self {
            from: Some(from),
            until: Some(until),
            ..Self::default()
        })
    }

    pub fn from_date(mut self, from: NaiveDate) -> Self {
        self.from = Some(from);
        self
    }

    pub fn until_date(mut self, until: NaiveDate) -> Self {
        self.until = Some(until);
        self
    }

    pub fn flux_above(mut self, flux: f64) -> Self {
        self.flux_above = Some(flux);
        self
    }

    pub fn flux_below(mut self, flux: f64) -> Self {
        self.flux_below = Some(flux);
        self
    }

    /// Rejects criteria that can never select anything meaningful.
    pub fn validate(&self) -> Result<()> {
        if let (Some(from), Some(until)) = (self.from, self.until) {
            if from >= until {
                return Err(TroutError::invalid_query(format!(
                    "empty date range {} .. {}",
                    from, until
                )));
            }
        }
        for (name, bound) in [("flux_above", self.flux_above), ("flux_below", self.flux_below)] {
            if bound.is_some_and(|v| !v.is_finite()) {
                return Err(TroutError::invalid_query(format!(
                    "{} must be a finite number",
                    name
                )));
            }
        }
        Ok(())
    }

    pub fn matches(&self, observation: &Observation) -> bool {
        self.from.is_none_or(|from| observation.date >= from)
            && self.until.is_none_or(|until| observation.date < until)
            && self.flux_above.is_none_or(|f| observation.flux > f)
            && self.flux_below.is_none_or(|f| observation.flux < f)
    }
}

/// Post-query exclusions applied by [`crate::star::Star`] selections.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectOptions {
    pub exclude_bad_nights: bool,
    pub exclude_zeros: bool,
}

impl Default for SelectOptions {
    fn default() -> Self {
        Self {
            exclude_bad_nights: true,
            exclude_zeros: true,
        }
    }
}

impl SelectOptions {
    pub fn new(exclude_bad_nights: bool, exclude_zeros: bool) -> Self {
        Self {
            exclude_bad_nights,
            exclude_zeros,
        }
    }
}
