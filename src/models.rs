use crate::error::{Result, TroutError};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const STAR_START: u16 = 1;
pub const STAR_END: u16 = 2510;

/// Format used to turn a night date into its canonical night name.
pub const NIGHT_NAME_FORMAT: &str = "%Y-%m-%d";

/// Catalogue number of a star in the survey field, always within
/// `STAR_START..=STAR_END`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u16")]
pub struct StarId(u16);

impl StarId {
    pub fn new(number: i64) -> Result<Self> {
        if (STAR_START as i64..=STAR_END as i64).contains(&number) {
            Ok(StarId(number as u16))
        } else {
            Err(TroutError::InvalidStarId(number))
        }
    }

    pub fn get(self) -> u16 {
        self.0
    }

    /// Every star in the field, ascending.
    pub fn all() -> impl Iterator<Item = StarId> {
        (STAR_START..=STAR_END).map(StarId)
    }
}

impl TryFrom<i64> for StarId {
    type Error = TroutError;

    fn try_from(value: i64) -> Result<Self> {
        StarId::new(value)
    }
}

impl From<StarId> for u16 {
    fn from(star: StarId) -> u16 {
        star.0
    }
}

impl fmt::Display for StarId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Which of the two parallel datasets (and bad-night registries) to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Variant {
    Primary,
    Secondary,
}

impl Variant {
    pub fn from_primary(is_primary: bool) -> Self {
        if is_primary {
            Variant::Primary
        } else {
            Variant::Secondary
        }
    }

    pub fn is_primary(self) -> bool {
        self == Variant::Primary
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Variant::Primary => "primary",
            Variant::Secondary => "secondary",
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One nightly measurement of a star. A flux of zero means the star was not
/// measured that night.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub sequence_id: i64,
    pub flux: f64,
    pub date: NaiveDate,
}

impl Observation {
    pub fn new(sequence_id: i64, flux: f64, date: NaiveDate) -> Self {
        Self {
            sequence_id,
            flux,
            date,
        }
    }

    pub fn is_zero(&self) -> bool {
        self.flux <= 0.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BadNight {
    pub id: i64,
    pub date: NaiveDate,
}

pub fn night_name(date: NaiveDate) -> String {
    date.format(NIGHT_NAME_FORMAT).to_string()
}
