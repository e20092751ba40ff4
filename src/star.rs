//! A single star's data with an explicit, replaceable selection.
//!
//! Every `select*` call replaces the current selection wholesale; nothing
//! carries over from a previous query. Call [`Star::reset_selection`] to get
//! back to the default view (all years, bad nights and zeros removed).

use crate::error::{Result, TroutError};
use crate::models::{Observation, StarId, Variant};
use crate::query::{ObservationFilter, SelectOptions};
use crate::stats;
use crate::store::SurveyStore;
use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use std::borrow::Cow;
use std::collections::HashSet;
use std::fmt;
use tracing::debug;

/// Counts behind an attendance ratio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AttendanceStats {
    /// Every observation in the period
    pub data_points: usize,
    /// Observations left after removing registry bad nights
    pub excluding_bad_nights: usize,
    /// Of those, observations with non-zero flux
    pub attended: usize,
}

impl AttendanceStats {
    pub fn ratio(&self) -> f64 {
        self.attended as f64 / self.excluding_bad_nights as f64
    }
}

/// Attendance of `star` over `observations`: nights with flux divided by all
/// nights, both counted after dropping `bad_nights`. Zero-flux nights stay in
/// the denominator.
pub fn attendance(
    star: StarId,
    observations: &[Observation],
    bad_nights: &HashSet<NaiveDate>,
    year: Option<i32>,
) -> Result<AttendanceStats> {
    let in_period: Vec<&Observation> = observations
        .iter()
        .filter(|obs| year.is_none_or(|y| obs.date.year() == y))
        .collect();
    let usable: Vec<&Observation> = in_period
        .iter()
        .copied()
        .filter(|obs| !bad_nights.contains(&obs.date))
        .collect();

    if usable.is_empty() {
        return Err(TroutError::NoDataForYear { star, year });
    }

    Ok(AttendanceStats {
        data_points: in_period.len(),
        excluding_bad_nights: usable.len(),
        attended: usable.iter().filter(|obs| !obs.is_zero()).count(),
    })
}

/// Dates of every registry bad night of `variant`.
pub fn registry_dates<S: SurveyStore + ?Sized>(
    store: &S,
    variant: Variant,
) -> Result<HashSet<NaiveDate>> {
    Ok(store
        .bad_nights(variant, None)?
        .into_iter()
        .map(|night| night.date)
        .collect())
}

pub struct Star<'a, S: SurveyStore + ?Sized> {
    store: &'a S,
    id: StarId,
    variant: Variant,
    color: Option<f64>,
    data: Vec<Observation>,
    bad_nights: Cow<'a, HashSet<NaiveDate>>,
    selected: Vec<Observation>,
}

impl<'a, S: SurveyStore + ?Sized> Star<'a, S> {
    /// Reads the star's full series, its variant's bad-night registry and its
    /// color. The selection starts out empty.
    pub fn load(store: &'a S, id: StarId, variant: Variant) -> Result<Self> {
        let bad_nights = registry_dates(store, variant)?;
        Self::build(store, id, variant, Cow::Owned(bad_nights))
    }

    /// Like [`Star::load`], but borrows an already loaded bad-night registry
    /// instead of reading it again. `bad_nights` must belong to `variant`.
    pub fn with_bad_nights(
        store: &'a S,
        id: StarId,
        variant: Variant,
        bad_nights: &'a HashSet<NaiveDate>,
    ) -> Result<Self> {
        Self::build(store, id, variant, Cow::Borrowed(bad_nights))
    }

    fn build(
        store: &'a S,
        id: StarId,
        variant: Variant,
        bad_nights: Cow<'a, HashSet<NaiveDate>>,
    ) -> Result<Self> {
        let data = store.observations(id, variant, &ObservationFilter::all())?;
        let color = store.color(id)?;

        Ok(Self {
            store,
            id,
            variant,
            color,
            data,
            bad_nights,
            selected: Vec::new(),
        })
    }

    pub fn id(&self) -> StarId {
        self.id
    }

    pub fn variant(&self) -> Variant {
        self.variant
    }

    pub fn color(&self) -> Option<f64> {
        self.color
    }

    /// The full, unfiltered series.
    pub fn data(&self) -> &[Observation] {
        &self.data
    }

    pub fn selected(&self) -> &[Observation] {
        &self.selected
    }

    pub fn peek(&self) -> &[Observation] {
        &self.data[..self.data.len().min(5)]
    }

    /// Replaces the selection with the observations matching `filter`, minus
    /// whatever `options` excludes. On error the previous selection is kept.
    pub fn select(&mut self, filter: &ObservationFilter, options: SelectOptions) -> Result<&mut Self> {
        let mut selected = self.store.observations(self.id, self.variant, filter)?;
        if options.exclude_bad_nights {
            selected.retain(|obs| !self.bad_nights.contains(&obs.date));
        }
        if options.exclude_zeros {
            selected.retain(|obs| !obs.is_zero());
        }
        self.selected = selected;
        Ok(self)
    }

    pub fn select_year(&mut self, year: i32, options: SelectOptions) -> Result<&mut Self> {
        self.select(&ObservationFilter::year(year)?, options)
    }

    pub fn reset_selection(&mut self) -> Result<&mut Self> {
        self.select(&ObservationFilter::all(), SelectOptions::default())
    }

    /// Rewrites the flux of every selected observation. Only the selection is
    /// affected; the next `select*` call starts from stored data again.
    pub fn transform_selected<F>(&mut self, transform: F)
    where
        F: Fn(&Observation) -> f64,
    {
        for obs in &mut self.selected {
            obs.flux = transform(&*obs);
        }
    }

    pub fn selected_fluxes(&self) -> Vec<f64> {
        self.selected.iter().map(|obs| obs.flux).collect()
    }

    pub fn selected_dates(&self) -> Vec<NaiveDate> {
        self.selected.iter().map(|obs| obs.date).collect()
    }

    pub fn mean(&self) -> Option<f64> {
        stats::mean(&self.selected_fluxes())
    }

    pub fn median(&self) -> Option<f64> {
        stats::median(&self.selected_fluxes())
    }

    pub fn min(&self) -> Option<f64> {
        stats::min(&self.selected_fluxes())
    }

    pub fn max(&self) -> Option<f64> {
        stats::max(&self.selected_fluxes())
    }

    pub fn attendance_stats(&self, year: Option<i32>) -> Result<AttendanceStats> {
        let stats = attendance(self.id, &self.data, &self.bad_nights, year)?;
        debug!(
            star = %self.id,
            ?year,
            data_points = stats.data_points,
            excluding_bad_nights = stats.excluding_bad_nights,
            attended = stats.attended,
            "attendance"
        );
        Ok(stats)
    }

    pub fn attendance(&self, year: Option<i32>) -> Result<f64> {
        Ok(self.attendance_stats(year)?.ratio())
    }

    /// Ratio of the mean flux in `to_year` to the mean flux in `from_year`,
    /// bad nights and zeros excluded. `None` when either year has no flux.
    /// The current selection is left as it was.
    pub fn step(&mut self, from_year: i32, to_year: i32) -> Result<Option<f64>> {
        let saved = std::mem::take(&mut self.selected);
        let result = self.year_means(from_year, to_year);
        self.selected = saved;
        let (from_mean, to_mean) = result?;
        Ok(from_mean.zip(to_mean).map(|(from, to)| to / from))
    }

    fn year_means(&mut self, from_year: i32, to_year: i32) -> Result<(Option<f64>, Option<f64>)> {
        let from_mean = self.select_year(from_year, SelectOptions::default())?.mean();
        let to_mean = self.select_year(to_year, SelectOptions::default())?.mean();
        Ok((from_mean, to_mean))
    }
}

impl<S: SurveyStore + ?Sized> fmt::Display for Star<'_, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Star: {} Datapoints: {} Selected: {}",
            self.id,
            self.data.len(),
            self.selected.len()
        )
    }
}
