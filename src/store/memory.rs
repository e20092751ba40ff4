//! In-memory survey store.

use crate::error::{Result, TroutError};
use crate::models::{BadNight, Observation, StarId, Variant};
use crate::query::ObservationFilter;
use crate::store::{BadNightRegistry, ColorRegistry, ObservationStore};
use chrono::Datelike;
use std::collections::{HashMap, HashSet};

#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    observations: HashMap<(StarId, Variant), Vec<Observation>>,
    bad_nights: HashMap<Variant, Vec<BadNight>>,
    colors: HashMap<StarId, f64>,
    /// Stars whose reads fail, to exercise per-star failure handling.
    unavailable: HashSet<StarId>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_observations(
        mut self,
        star: StarId,
        variant: Variant,
        observations: impl IntoIterator<Item = Observation>,
    ) -> Self {
        let series = self.observations.entry((star, variant)).or_default();
        series.extend(observations);
        series.sort_by(|a, b| a.date.cmp(&b.date).then(a.sequence_id.cmp(&b.sequence_id)));
        self
    }

    pub fn with_bad_night(mut self, variant: Variant, night: BadNight) -> Self {
        let nights = self.bad_nights.entry(variant).or_default();
        nights.push(night);
        nights.sort_by(|a, b| a.date.cmp(&b.date).then(a.id.cmp(&b.id)));
        self
    }

    pub fn with_color(mut self, star: StarId, color: f64) -> Self {
        self.colors.insert(star, color);
        self
    }

    pub fn with_unavailable_star(mut self, star: StarId) -> Self {
        self.unavailable.insert(star);
        self
    }
}

impl ObservationStore for MemoryStore {
    fn observations(
        &self,
        star: StarId,
        variant: Variant,
        filter: &ObservationFilter,
    ) -> Result<Vec<Observation>> {
        filter.validate()?;
        if self.unavailable.contains(&star) {
            return Err(TroutError::InvalidSelectionQuery {
                reason: format!("observations of star {} are unavailable", star),
                source: None,
            });
        }
        Ok(self
            .observations
            .get(&(star, variant))
            .map(|series| series.iter().filter(|o| filter.matches(o)).copied().collect())
            .unwrap_or_default())
    }
}

impl BadNightRegistry for MemoryStore {
    fn bad_nights(&self, variant: Variant, year: Option<i32>) -> Result<Vec<BadNight>> {
        Ok(self
            .bad_nights
            .get(&variant)
            .map(|nights| {
                nights
                    .iter()
                    .filter(|n| year.is_none_or(|y| n.date.year() == y))
                    .copied()
                    .collect()
            })
            .unwrap_or_default())
    }
}

impl ColorRegistry for MemoryStore {
    fn color(&self, star: StarId) -> Result<Option<f64>> {
        Ok(self.colors.get(&star).copied())
    }
}
