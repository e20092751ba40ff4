//! Bad-night detection.
//!
//! For a year, every eligible star contributes the ratio of its nightly flux
//! to its season mean into a per-night bucket. The population standard
//! deviation of a night's bucket is the night's LTPR ("badness"); nights whose
//! LTPR exceeds the era threshold are flagged.
//!
//! Attendance and aggregation deliberately select different rows. Attendance
//! drops registry bad nights and keeps zero-flux nights; aggregation keeps bad
//! nights (their badness is what is being measured) and drops zero flux.

use crate::error::{Result, TroutError};
use crate::models::{night_name, StarId, Variant};
use crate::query::SelectOptions;
use crate::star::{registry_dates, Star};
use crate::stats;
use crate::store::SurveyStore;
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use tracing::{debug, info, warn};

pub const DEFAULT_ATTENDANCE_THRESHOLD: f64 = 0.5;

/// Known variables and other stars unsuitable for measuring night quality.
pub const EXCLUDED_STARS: [u16; 102] = [
    1, 16, 41, 69, 82, 100, 115, 138, 166, 168, 195, 245, 255, 281, 285, 294, 317, 332, 338, 356,
    357, 366, 377, 410, 414, 441, 465, 466, 504, 533, 539, 592, 597, 600, 628, 635, 664, 672, 685,
    697, 703, 722, 736, 753, 755, 777, 788, 790, 814, 824, 842, 850, 852, 870, 877, 879, 888, 892,
    904, 908, 912, 929, 950, 958, 981, 1007, 1048, 1052, 1054, 1065, 1103, 1113, 1131, 1143, 1144,
    1191, 1195, 1197, 1219, 1223, 1276, 1369, 1426, 1475, 1495, 1529, 1539, 1654, 1687, 1693,
    1702, 1716, 1843, 1856, 1873, 1887, 2237, 2251, 2252, 2502, 2509, 2510,
];

/// Stars 1 through 999 minus [`EXCLUDED_STARS`].
pub fn default_stars_to_include() -> Vec<StarId> {
    StarId::all()
        .take_while(|s| s.get() < 1000)
        .filter(|s| !EXCLUDED_STARS.contains(&s.get()))
        .collect()
}

/// LTPR threshold for the camera era of `year`.
pub fn ltpr_threshold_for_year(year: i32) -> f64 {
    match year {
        2003..=2006 => 0.035,
        2007..=2008 => 0.045,
        _ => 0.035,
    }
}

/// What to do when one star's data cannot be read or has no data for the year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Stop the whole computation with the star's error.
    #[default]
    Abort,
    /// Leave the star out and record it in [`NightRatios::skipped`].
    Skip,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedStar {
    pub star: StarId,
    pub reason: String,
}

/// Per-night flux ratios collected from all eligible stars.
#[derive(Debug, Clone, Default)]
pub struct NightRatios {
    nights: BTreeMap<NaiveDate, Vec<f64>>,
    /// Stars that passed attendance and contributed a season mean
    pub contributing: Vec<StarId>,
    pub below_attendance: Vec<StarId>,
    pub skipped: Vec<SkippedStar>,
}

impl NightRatios {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one star's complete contribution. Callers build the whole
    /// contribution first so a failing star never leaves partial ratios.
    pub fn merge(&mut self, star: StarId, contribution: Vec<(NaiveDate, f64)>) {
        for (date, ratio) in contribution {
            self.nights.entry(date).or_default().push(ratio);
        }
        self.contributing.push(star);
    }

    pub fn ratios(&self, date: NaiveDate) -> Option<&[f64]> {
        self.nights.get(&date).map(Vec::as_slice)
    }

    pub fn nights(&self) -> impl Iterator<Item = (NaiveDate, &[f64])> {
        self.nights.iter().map(|(date, ratios)| (*date, ratios.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.nights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nights.is_empty()
    }

    /// LTPR of every night: population standard deviation of its ratios.
    /// Each bucket is summed in ascending value order, so the result is
    /// bit-identical whatever order the stars were merged in.
    pub fn ltpr_values(&self) -> BTreeMap<NaiveDate, f64> {
        self.nights
            .iter()
            .filter_map(|(date, ratios)| {
                let mut sorted = ratios.clone();
                sorted.sort_by(f64::total_cmp);
                stats::population_stddev(&sorted).map(|sd| (*date, sd))
            })
            .collect()
    }
}

/// One star's ratios for `year`, or `None` when the star is below the
/// attendance threshold or has no non-zero flux that year. `bad_nights` is
/// the registry of `variant`.
pub fn star_night_ratios<S: SurveyStore + ?Sized>(
    store: &S,
    star: StarId,
    year: i32,
    attendance_threshold: f64,
    variant: Variant,
    bad_nights: &HashSet<NaiveDate>,
) -> Result<Option<Vec<(NaiveDate, f64)>>> {
    let mut data = Star::with_bad_nights(store, star, variant, bad_nights)?;

    let attendance = data.attendance(Some(year))?;
    if attendance < attendance_threshold {
        debug!(%star, attendance, "below attendance threshold");
        return Ok(None);
    }

    data.select_year(year, SelectOptions::new(false, true))?;
    let Some(season_mean) = data.mean() else {
        debug!(%star, "no non-zero flux in season");
        return Ok(None);
    };

    Ok(Some(
        data.selected()
            .iter()
            .map(|obs| (obs.date, obs.flux / season_mean))
            .collect(),
    ))
}

/// Collects night ratios over `stars`. The bad-night registry is read once
/// and shared by every star. LTPR values do not depend on the order of
/// `stars`.
pub fn collect_night_ratios<S, I>(
    store: &S,
    year: i32,
    stars: I,
    attendance_threshold: f64,
    variant: Variant,
    policy: FailurePolicy,
) -> Result<NightRatios>
where
    S: SurveyStore + ?Sized,
    I: IntoIterator<Item = StarId>,
{
    let bad_nights = registry_dates(store, variant)?;
    let mut ratios = NightRatios::new();

    for star in stars {
        match star_night_ratios(store, star, year, attendance_threshold, variant, &bad_nights) {
            Ok(Some(contribution)) => ratios.merge(star, contribution),
            Ok(None) => ratios.below_attendance.push(star),
            Err(e) => match policy {
                FailurePolicy::Abort => return Err(e),
                FailurePolicy::Skip => {
                    warn!(%star, error = %e, "skipping star");
                    ratios.skipped.push(SkippedStar {
                        star,
                        reason: e.to_string(),
                    });
                }
            },
        }
    }

    info!(
        year,
        nights = ratios.len(),
        contributing = ratios.contributing.len(),
        below_attendance = ratios.below_attendance.len(),
        skipped = ratios.skipped.len(),
        "collected night ratios"
    );

    Ok(ratios)
}

/// Nights whose LTPR strictly exceeds `threshold`, ascending by date.
pub fn classify_nights(ltpr: &BTreeMap<NaiveDate, f64>, threshold: f64) -> Vec<NaiveDate> {
    ltpr.iter()
        .filter(|(_, value)| **value > threshold)
        .map(|(&date, _)| date)
        .collect()
}

#[derive(Debug, Clone)]
pub struct BadNightsConfig {
    pub year: i32,
    pub attendance_threshold: f64,
    /// Overrides the era threshold from [`ltpr_threshold_for_year`]
    pub ltpr_threshold: Option<f64>,
    /// Overrides [`default_stars_to_include`]
    pub stars_to_use: Option<Vec<StarId>>,
    pub variant: Variant,
    pub failure_policy: FailurePolicy,
}

impl BadNightsConfig {
    pub fn new(year: i32) -> Self {
        Self {
            year,
            attendance_threshold: DEFAULT_ATTENDANCE_THRESHOLD,
            ltpr_threshold: None,
            stars_to_use: None,
            variant: Variant::Primary,
            failure_policy: FailurePolicy::Abort,
        }
    }

    pub fn effective_ltpr_threshold(&self) -> f64 {
        self.ltpr_threshold
            .unwrap_or_else(|| ltpr_threshold_for_year(self.year))
    }

    fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.attendance_threshold) {
            return Err(TroutError::invalid_query(format!(
                "attendance threshold {} is outside 0..=1",
                self.attendance_threshold
            )));
        }
        if self.ltpr_threshold.is_some_and(|t| !t.is_finite()) {
            return Err(TroutError::invalid_query("LTPR threshold must be finite"));
        }
        Ok(())
    }
}

/// Outcome of a bad-night computation, meant for review before anything is
/// written back to the registry.
#[derive(Debug, Clone, Serialize)]
pub struct BadNightsReport {
    pub year: i32,
    pub attendance_threshold: f64,
    pub ltpr_threshold: f64,
    pub variant: Variant,
    pub stars_used: usize,
    pub stars_below_attendance: usize,
    pub skipped: Vec<SkippedStar>,
    #[serde(serialize_with = "serialize_nights")]
    pub ltpr: BTreeMap<NaiveDate, f64>,
    pub bad_nights: Vec<NaiveDate>,
}

impl BadNightsReport {
    /// Every night with its LTPR, ascending by date, keyed by night name.
    pub fn ltpr_table(&self) -> impl Iterator<Item = (String, f64)> + '_ {
        self.ltpr.iter().map(|(date, value)| (night_name(*date), *value))
    }

    pub fn bad_night_names(&self) -> Vec<String> {
        self.bad_nights.iter().map(|d| night_name(*d)).collect()
    }
}

fn serialize_nights<S: serde::Serializer>(
    ltpr: &BTreeMap<NaiveDate, f64>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.collect_map(ltpr.iter().map(|(date, value)| (night_name(*date), value)))
}

pub fn calc_bad_nights<S: SurveyStore + ?Sized>(
    store: &S,
    config: &BadNightsConfig,
) -> Result<BadNightsReport> {
    config.validate()?;
    let ltpr_threshold = config.effective_ltpr_threshold();
    let stars = config
        .stars_to_use
        .clone()
        .unwrap_or_else(default_stars_to_include);

    let ratios = collect_night_ratios(
        store,
        config.year,
        stars,
        config.attendance_threshold,
        config.variant,
        config.failure_policy,
    )?;
    let ltpr = ratios.ltpr_values();
    let bad_nights = classify_nights(&ltpr, ltpr_threshold);

    info!(
        year = config.year,
        ltpr_threshold,
        nights = ltpr.len(),
        bad = bad_nights.len(),
        "classified nights"
    );

    Ok(BadNightsReport {
        year: config.year,
        attendance_threshold: config.attendance_threshold,
        ltpr_threshold,
        variant: config.variant,
        stars_used: ratios.contributing.len(),
        stars_below_attendance: ratios.below_attendance.len(),
        skipped: ratios.skipped,
        ltpr,
        bad_nights,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BadNight, Observation};
    use crate::store::MemoryStore;
    use rand::seq::SliceRandom;
    use rand::{Rng, SeedableRng};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn star(n: i64) -> StarId {
        StarId::new(n).unwrap()
    }

    fn series(fluxes: &[(NaiveDate, f64)]) -> Vec<Observation> {
        fluxes
            .iter()
            .enumerate()
            .map(|(i, &(d, f))| Observation::new(i as i64 + 1, f, d))
            .collect()
    }

    /// Two stars with a season mean of 100 each. Nights 1 and 2 carry ratios
    /// [1.0, 1.5] and [0.5, 1.0]; night 3 carries [1.5, 0.5].
    fn two_star_store() -> MemoryStore {
        let n1 = date(2005, 3, 1);
        let n2 = date(2005, 3, 2);
        let n3 = date(2005, 3, 3);
        MemoryStore::new()
            .with_observations(
                star(2),
                Variant::Primary,
                series(&[(n1, 100.0), (n2, 50.0), (n3, 150.0)]),
            )
            .with_observations(
                star(3),
                Variant::Primary,
                series(&[(n1, 150.0), (n2, 100.0), (n3, 50.0)]),
            )
    }

    #[test]
    fn test_threshold_lookup() {
        for year in 2003..=2006 {
            assert_eq!(ltpr_threshold_for_year(year), 0.035);
        }
        assert_eq!(ltpr_threshold_for_year(2007), 0.045);
        assert_eq!(ltpr_threshold_for_year(2008), 0.045);
        assert_eq!(ltpr_threshold_for_year(1999), 0.035);
        assert_eq!(ltpr_threshold_for_year(2020), 0.035);
    }

    #[test]
    fn test_default_stars() {
        let stars = default_stars_to_include();
        assert!(stars.iter().all(|s| s.get() <= 999));
        assert!(!stars.contains(&star(1)));
        assert!(!stars.contains(&star(981)));
        assert!(stars.contains(&star(2)));
        assert!(stars.contains(&star(999)));
        let excluded_below_1000 = EXCLUDED_STARS.iter().filter(|&&n| n < 1000).count();
        assert_eq!(stars.len(), 999 - excluded_below_1000);
    }

    #[test]
    fn test_two_star_scenario() {
        let store = two_star_store();
        let ratios = collect_night_ratios(
            &store,
            2005,
            [star(2), star(3)],
            0.5,
            Variant::Primary,
            FailurePolicy::Abort,
        )
        .unwrap();

        let mut night1 = ratios.ratios(date(2005, 3, 1)).unwrap().to_vec();
        night1.sort_by(f64::total_cmp);
        assert_eq!(night1, vec![1.0, 1.5]);
        let mut night2 = ratios.ratios(date(2005, 3, 2)).unwrap().to_vec();
        night2.sort_by(f64::total_cmp);
        assert_eq!(night2, vec![0.5, 1.0]);

        let ltpr = ratios.ltpr_values();
        assert!((ltpr[&date(2005, 3, 1)] - 0.25).abs() < 1e-12);
        assert!((ltpr[&date(2005, 3, 2)] - 0.25).abs() < 1e-12);
        assert!((ltpr[&date(2005, 3, 3)] - 0.5).abs() < 1e-12);

        let flagged = classify_nights(&ltpr, 0.2);
        assert_eq!(
            flagged,
            vec![date(2005, 3, 1), date(2005, 3, 2), date(2005, 3, 3)]
        );
        let flagged = classify_nights(&ltpr, 0.3);
        assert_eq!(flagged, vec![date(2005, 3, 3)]);
    }

    #[test]
    fn test_threshold_is_strict() {
        let ltpr: BTreeMap<NaiveDate, f64> =
            [(date(2005, 1, 1), 0.035), (date(2005, 1, 2), 0.0351)].into_iter().collect();
        assert_eq!(classify_nights(&ltpr, 0.035), vec![date(2005, 1, 2)]);
    }

    #[test]
    fn test_single_contributor_night_is_zero() {
        let store = MemoryStore::new().with_observations(
            star(2),
            Variant::Primary,
            series(&[(date(2005, 1, 1), 80.0), (date(2005, 1, 2), 120.0)]),
        );
        let ratios = collect_night_ratios(
            &store,
            2005,
            [star(2)],
            0.5,
            Variant::Primary,
            FailurePolicy::Abort,
        )
        .unwrap();
        let ltpr = ratios.ltpr_values();
        assert_eq!(ltpr[&date(2005, 1, 1)], 0.0);
        assert_eq!(ltpr[&date(2005, 1, 2)], 0.0);
    }

    #[test]
    fn test_order_does_not_matter() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(7);
        let mut store = MemoryStore::new();
        let nights: Vec<NaiveDate> = (1..=20).map(|d| date(2006, 2, d)).collect();
        let mut stars = Vec::new();
        for n in 2..60 {
            let fluxes: Vec<(NaiveDate, f64)> = nights
                .iter()
                .map(|&d| (d, rng.gen_range(200.0..5000.0)))
                .collect();
            store = store.with_observations(star(n), Variant::Primary, series(&fluxes));
            stars.push(star(n));
        }

        let ltpr_for = |order: &[StarId]| {
            collect_night_ratios(
                &store,
                2006,
                order.iter().copied(),
                0.5,
                Variant::Primary,
                FailurePolicy::Abort,
            )
            .unwrap()
            .ltpr_values()
        };
        let bits = |ltpr: &BTreeMap<NaiveDate, f64>| -> Vec<(NaiveDate, u64)> {
            ltpr.iter().map(|(d, v)| (*d, v.to_bits())).collect()
        };

        let baseline = bits(&ltpr_for(&stars));
        assert_eq!(baseline.len(), 20);

        stars.reverse();
        assert_eq!(bits(&ltpr_for(&stars)), baseline);

        for _ in 0..5 {
            stars.shuffle(&mut rng);
            assert_eq!(bits(&ltpr_for(&stars)), baseline);
        }
    }

    #[test]
    fn test_bad_nights_kept_zeros_dropped_in_aggregation() {
        let bad = date(2005, 4, 2);
        let store = MemoryStore::new()
            .with_observations(
                star(2),
                Variant::Primary,
                series(&[
                    (date(2005, 4, 1), 100.0),
                    (bad, 40.0),
                    (date(2005, 4, 3), 0.0),
                    (date(2005, 4, 4), 100.0),
                ]),
            )
            .with_bad_night(Variant::Primary, BadNight { id: 1, date: bad });

        // Attendance: 2 of 3 after dropping the bad night, zero night counted.
        let ratios = collect_night_ratios(
            &store,
            2005,
            [star(2)],
            0.6,
            Variant::Primary,
            FailurePolicy::Abort,
        )
        .unwrap();
        assert!(ratios.ratios(bad).is_some());
        assert!(ratios.ratios(date(2005, 4, 3)).is_none());
        assert_eq!(ratios.len(), 3);
        let season_mean = 240.0 / 3.0;
        assert!((ratios.ratios(bad).unwrap()[0] - 40.0 / season_mean).abs() < 1e-12);

        let ratios = collect_night_ratios(
            &store,
            2005,
            [star(2)],
            0.7,
            Variant::Primary,
            FailurePolicy::Abort,
        )
        .unwrap();
        assert!(ratios.is_empty());
        assert_eq!(ratios.below_attendance, vec![star(2)]);
    }

    #[test]
    fn test_all_zero_star_contributes_nothing() {
        let store = MemoryStore::new().with_observations(
            star(2),
            Variant::Primary,
            series(&[(date(2005, 1, 1), 0.0), (date(2005, 1, 2), 0.0)]),
        );
        let ratios = collect_night_ratios(
            &store,
            2005,
            [star(2)],
            0.0,
            Variant::Primary,
            FailurePolicy::Abort,
        )
        .unwrap();
        assert!(ratios.is_empty());
        assert!(ratios.contributing.is_empty());
    }

    #[test]
    fn test_missing_year_aborts_or_skips() {
        let store = two_star_store();
        let err = collect_night_ratios(
            &store,
            2005,
            [star(2), star(4)],
            0.5,
            Variant::Primary,
            FailurePolicy::Abort,
        )
        .unwrap_err();
        assert!(matches!(err, TroutError::NoDataForYear { .. }));

        let ratios = collect_night_ratios(
            &store,
            2005,
            [star(2), star(4), star(3)],
            0.5,
            Variant::Primary,
            FailurePolicy::Skip,
        )
        .unwrap();
        assert_eq!(ratios.contributing, vec![star(2), star(3)]);
        assert_eq!(ratios.skipped.len(), 1);
        assert_eq!(ratios.skipped[0].star, star(4));
        assert!(ratios.skipped[0].reason.contains("no data"));
    }

    #[test]
    fn test_fetch_failure_is_recorded() {
        let store = two_star_store().with_unavailable_star(star(3));
        let ratios = collect_night_ratios(
            &store,
            2005,
            [star(2), star(3)],
            0.5,
            Variant::Primary,
            FailurePolicy::Skip,
        )
        .unwrap();
        assert_eq!(ratios.contributing, vec![star(2)]);
        assert_eq!(ratios.skipped[0].star, star(3));
        assert_eq!(ratios.ratios(date(2005, 3, 1)).unwrap(), &[1.0]);
    }

    #[test]
    fn test_calc_bad_nights_report() {
        let store = two_star_store();
        let mut config = BadNightsConfig::new(2005);
        config.stars_to_use = Some(vec![star(2), star(3)]);
        config.ltpr_threshold = Some(0.3);

        let report = calc_bad_nights(&store, &config).unwrap();
        assert_eq!(report.ltpr_threshold, 0.3);
        assert_eq!(report.stars_used, 2);
        assert_eq!(report.bad_night_names(), vec!["2005-03-03".to_string()]);

        let table: Vec<String> = report.ltpr_table().map(|(name, _)| name).collect();
        assert_eq!(table, vec!["2005-03-01", "2005-03-02", "2005-03-03"]);

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["variant"], "primary");
        assert_eq!(json["bad_nights"][0], "2005-03-03");
        assert!((json["ltpr"]["2005-03-01"].as_f64().unwrap() - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_calc_bad_nights_defaults() {
        let store = two_star_store();
        let mut config = BadNightsConfig::new(2007);
        config.stars_to_use = Some(vec![star(2)]);
        config.failure_policy = FailurePolicy::Skip;
        let report = calc_bad_nights(&store, &config).unwrap();
        assert_eq!(report.ltpr_threshold, 0.045);
        assert_eq!(report.attendance_threshold, 0.5);
        assert!(report.ltpr.is_empty());
        assert_eq!(report.skipped.len(), 1);
    }

    #[test]
    fn test_calc_bad_nights_rejects_bad_attendance_threshold() {
        let store = two_star_store();
        let mut config = BadNightsConfig::new(2005);
        config.attendance_threshold = 1.5;
        assert!(matches!(
            calc_bad_nights(&store, &config),
            Err(TroutError::InvalidSelectionQuery { .. })
        ));
    }

    #[test]
    fn test_secondary_variant_is_separate() {
        let n1 = date(2005, 3, 1);
        let store = two_star_store()
            .with_observations(star(2), Variant::Secondary, series(&[(n1, 10.0)]))
            .with_bad_night(Variant::Primary, BadNight { id: 5, date: n1 });
        let mut config = BadNightsConfig::new(2005);
        config.stars_to_use = Some(vec![star(2), star(3)]);
        config.variant = Variant::Secondary;
        config.failure_policy = FailurePolicy::Skip;

        let report = calc_bad_nights(&store, &config).unwrap();
        assert_eq!(report.stars_used, 1);
        assert_eq!(report.ltpr[&n1], 0.0);
        assert_eq!(report.skipped[0].star, star(3));
    }
}
