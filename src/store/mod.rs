//! Read access to survey data.
//!
//! The pipeline only ever sees these traits. [`sqlite::Database`] is the
//! production back end; [`memory::MemoryStore`] holds everything in maps and
//! is used for tests and for callers that already have data in hand.

pub mod memory;
pub mod sqlite;

use crate::error::Result;
use crate::models::{BadNight, Observation, StarId, Variant};
use crate::query::ObservationFilter;

pub use memory::MemoryStore;
pub use sqlite::Database;

/// Per-star flux time series.
pub trait ObservationStore {
    /// Observations of `star` in `variant` matching `filter`, ordered by night
    /// date then sequence id. No bad-night or zero-flux exclusion is applied.
    fn observations(
        &self,
        star: StarId,
        variant: Variant,
        filter: &ObservationFilter,
    ) -> Result<Vec<Observation>>;
}

/// Canonical list of nights previously judged bad.
pub trait BadNightRegistry {
    /// Bad nights of `variant`, ordered by date, optionally limited to a year.
    fn bad_nights(&self, variant: Variant, year: Option<i32>) -> Result<Vec<BadNight>>;
}

pub trait ColorRegistry {
    /// Color index of `star`, or `None` when the star has no color data.
    fn color(&self, star: StarId) -> Result<Option<f64>>;
}

/// Everything a [`crate::star::Star`] needs to load itself.
pub trait SurveyStore: ObservationStore + BadNightRegistry + ColorRegistry {
    /// Observations with registry bad nights removed: the default view of a
    /// star's data. This is the entry point for callers that only need that
    /// view; [`crate::star::Star`] reads the raw series and the registry
    /// separately because attendance counts the bad nights too.
    fn fetch(&self, star: StarId, variant: Variant) -> Result<Vec<Observation>> {
        let bad: std::collections::HashSet<_> = self
            .bad_nights(variant, None)?
            .into_iter()
            .map(|night| night.date)
            .collect();
        let mut observations = self.observations(star, variant, &ObservationFilter::all())?;
        observations.retain(|obs| !bad.contains(&obs.date));
        Ok(observations)
    }
}

impl<T: ObservationStore + BadNightRegistry + ColorRegistry + ?Sized> SurveyStore for T {}
