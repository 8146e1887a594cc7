use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};
use crate::models::domain::{Availability, DateRange, Registrant};

/// Filters for the committed-pairs listing
///
/// Both filters apply to the seeker row. An empty `any_of` grid means no
/// availability filter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[validate(schema(function = "validate_submitted_window"))]
pub struct PairFilter {
    /// Inclusive window on the intake submission date
    #[serde(default)]
    pub submitted: Option<DateRange>,
    /// Keep seekers available in at least one of these cells
    #[serde(default)]
    pub any_of: Availability,
}

impl PairFilter {
    pub fn is_unfiltered(&self) -> bool {
        self.submitted.is_none() && self.any_of.is_empty()
    }

    pub fn matches(&self, registrant: &Registrant) -> bool {
        let in_window = self
            .submitted
            .map_or(true, |window| window.contains(registrant.submitted_at));
        let available = self.any_of.is_empty() || self.any_of.intersects(&registrant.availability);

        in_window && available
    }
}

fn validate_submitted_window(filter: &PairFilter) -> Result<(), ValidationError> {
    match filter.submitted {
        Some(window) if !window.is_valid() => Err(ValidationError::new("submitted_window")),
        _ => Ok(()),
    }
}
