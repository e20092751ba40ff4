//! Error types shared by the library.

use crate::models::StarId;

/// Result type for library operations
pub type Result<T> = std::result::Result<T, TroutError>;

#[derive(Debug, thiserror::Error)]
pub enum TroutError {
    #[error("Invalid star id {0}: stars are numbered 1 through 2510")]
    InvalidStarId(i64),

    #[error("Star {star} has no data for {}", describe_year(.year))]
    NoDataForYear { star: StarId, year: Option<i32> },

    #[error("Invalid selection query: {reason}")]
    InvalidSelectionQuery {
        reason: String,
        #[source]
        source: Option<rusqlite::Error>,
    },

    /// Raised only when a band table lookup misses a valid star, which means
    /// the table was built incorrectly.
    #[error("Star {star} does not belong to any internight band")]
    UnknownBand { star: StarId },

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
}

impl TroutError {
    pub fn invalid_query(reason: impl Into<String>) -> Self {
        TroutError::InvalidSelectionQuery {
            reason: reason.into(),
            source: None,
        }
    }
}

fn describe_year(year: &Option<i32>) -> String {
    match year {
        Some(year) => format!("year {}", year),
        None => "any year".to_string(),
    }
}
