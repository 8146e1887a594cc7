use chrono::NaiveDate;
use thiserror::Error;
use crate::services::StoreError;

/// Errors surfaced by the matching engine
///
/// Only `StoreUnavailable` aborts a run; the other variants are recovered
/// locally by skipping the affected registrant or pair.
#[derive(Debug, Error)]
pub enum MatchError {
    #[error("Registrant store unavailable: {0}")]
    StoreUnavailable(#[from] StoreError),

    #[error("Seeker {seeker_id} or volunteer {volunteer_id} is missing or already has a buddy")]
    StaleReference { seeker_id: i64, volunteer_id: i64 },

    #[error("Registrant {id} has start date {start} after end date {end}")]
    InvalidRegistrant {
        id: i64,
        start: NaiveDate,
        end: NaiveDate,
    },
}
