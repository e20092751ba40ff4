//! Internight normalization bands.
//!
//! Every star in the field belongs to exactly one band. A fixed list of
//! special stars always forms its own band; the rest are split by color index
//! into three windows, and anything without a usable color falls back to the
//! brightness band.

use crate::error::{Result, TroutError};
use crate::models::StarId;
use crate::store::ColorRegistry;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use tracing::info;

pub const SPECIAL_STARS: [u16; 9] = [814, 1223, 1654, 1702, 1716, 1843, 2437, 2509, 2510];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum InternightBand {
    #[serde(rename = "COLOR_BAND_1")]
    ColorBand1,
    #[serde(rename = "COLOR_BAND_2")]
    ColorBand2,
    #[serde(rename = "COLOR_BAND_3")]
    ColorBand3,
    #[serde(rename = "SPECIAL_STARS")]
    SpecialStars,
    #[serde(rename = "BRIGHTNESS_BAND")]
    BrightnessBand,
}

impl InternightBand {
    pub const ALL: [InternightBand; 5] = [
        InternightBand::ColorBand1,
        InternightBand::ColorBand2,
        InternightBand::ColorBand3,
        InternightBand::SpecialStars,
        InternightBand::BrightnessBand,
    ];

    pub fn name(self) -> &'static str {
        match self {
            InternightBand::ColorBand1 => "COLOR_BAND_1",
            InternightBand::ColorBand2 => "COLOR_BAND_2",
            InternightBand::ColorBand3 => "COLOR_BAND_3",
            InternightBand::SpecialStars => "SPECIAL_STARS",
            InternightBand::BrightnessBand => "BRIGHTNESS_BAND",
        }
    }
}

impl fmt::Display for InternightBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

pub fn is_special_star(star: StarId) -> bool {
    SPECIAL_STARS.contains(&star.get())
}

/// Band of a star given its color index. Special-star membership wins over
/// color; a missing, non-finite or out-of-window color means brightness band.
pub fn classify_band(star: StarId, color: Option<f64>) -> InternightBand {
    if is_special_star(star) {
        return InternightBand::SpecialStars;
    }
    match color {
        Some(c) if c > 0.135 && c <= 0.455 => InternightBand::ColorBand1,
        Some(c) if c > 0.455 && c <= 1.063 => InternightBand::ColorBand2,
        Some(c) if c > 1.063 && c <= 7.0 => InternightBand::ColorBand3,
        _ => InternightBand::BrightnessBand,
    }
}

/// Partition of the whole field into bands, built once from a color source
/// and shared read-only. Call [`BandTable::rebuild`] if colors change.
#[derive(Debug, Clone)]
pub struct BandTable {
    bands: BTreeMap<InternightBand, Vec<StarId>>,
    lookup: HashMap<StarId, InternightBand>,
}

impl BandTable {
    pub fn build<C: ColorRegistry + ?Sized>(colors: &C) -> Result<Self> {
        let mut resolved = Vec::with_capacity(StarId::all().count());
        for star in StarId::all() {
            resolved.push((star, colors.color(star)?));
        }
        let table = Self::from_colors(resolved);
        info!(
            color_band_1 = table.stars(InternightBand::ColorBand1).len(),
            color_band_2 = table.stars(InternightBand::ColorBand2).len(),
            color_band_3 = table.stars(InternightBand::ColorBand3).len(),
            brightness_band = table.stars(InternightBand::BrightnessBand).len(),
            "built internight band table"
        );
        Ok(table)
    }

    /// Builds the table from already-known colors. Stars missing from
    /// `colors` are treated as having no color data.
    pub fn from_colors(colors: impl IntoIterator<Item = (StarId, Option<f64>)>) -> Self {
        let known: HashMap<StarId, Option<f64>> = colors.into_iter().collect();
        let mut bands: BTreeMap<InternightBand, Vec<StarId>> =
            InternightBand::ALL.iter().map(|&b| (b, Vec::new())).collect();
        let mut lookup = HashMap::with_capacity(known.len());

        for star in StarId::all() {
            let band = classify_band(star, known.get(&star).copied().flatten());
            bands.entry(band).or_default().push(star);
            lookup.insert(star, band);
        }

        Self { bands, lookup }
    }

    pub fn rebuild<C: ColorRegistry + ?Sized>(&mut self, colors: &C) -> Result<()> {
        *self = Self::build(colors)?;
        Ok(())
    }

    /// Stars of `band`, ascending.
    pub fn stars(&self, band: InternightBand) -> &[StarId] {
        self.bands.get(&band).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn band_of(&self, star: StarId) -> Result<InternightBand> {
        self.lookup
            .get(&star)
            .copied()
            .ok_or(TroutError::UnknownBand { star })
    }

    pub fn iter(&self) -> impl Iterator<Item = (InternightBand, &[StarId])> {
        self.bands.iter().map(|(band, stars)| (*band, stars.as_slice()))
    }
}
