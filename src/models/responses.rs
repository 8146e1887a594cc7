use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;
use crate::models::domain::{DaySlot, Registrant};

/// One bounded page of results, with the keyset cursor for the next one
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next_cursor: Option<i64>,
}

/// Audit record emitted for every committed (or proposed) pairing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchRecord {
    pub seeker_id: i64,
    pub volunteer_id: i64,
    pub seeker_name: String,
    pub seeker_phone: String,
    pub seeker_email: String,
    pub seeker_address: String,
    pub volunteer_name: String,
    pub volunteer_phone: String,
    pub volunteer_email: String,
    pub volunteer_address: String,
    pub matched_on: DaySlot,
}

impl MatchRecord {
    pub fn new(seeker: &Registrant, volunteer: &Registrant, matched_on: DaySlot) -> Self {
        Self {
            seeker_id: seeker.id,
            volunteer_id: volunteer.id,
            seeker_name: seeker.full_name(),
            seeker_phone: seeker.phone.clone(),
            seeker_email: seeker.email.clone(),
            seeker_address: seeker.address.clone(),
            volunteer_name: volunteer.full_name(),
            volunteer_phone: volunteer.phone.clone(),
            volunteer_email: volunteer.email.clone(),
            volunteer_address: volunteer.address.clone(),
            matched_on,
        }
    }
}

impl fmt::Display for MatchRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Seeker {} (Phone: {}, Email: {}, Address: {}) matched with \
             Volunteer {} (Phone: {}, Email: {}, Address: {}) on {}",
            self.seeker_name,
            self.seeker_phone,
            self.seeker_email,
            self.seeker_address,
            self.volunteer_name,
            self.volunteer_phone,
            self.volunteer_email,
            self.volunteer_address,
            self.matched_on,
        )
    }
}

/// Outcome of one matching run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchReport {
    pub run_id: Uuid,
    pub dry_run: bool,
    pub started_at: chrono::DateTime<chrono::Utc>,
    pub finished_at: chrono::DateTime<chrono::Utc>,
    /// Pairings in commit order
    pub matches: Vec<MatchRecord>,
    pub seekers_scanned: usize,
    pub stale_skips: usize,
    pub invalid_registrants: usize,
}

impl MatchReport {
    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }
}

/// Contact summary of one side of a pair
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistrantSummary {
    pub id: i64,
    pub name: String,
    pub phone: String,
    pub email: String,
    pub address: String,
    pub slots: Vec<String>,
}

impl From<&Registrant> for RegistrantSummary {
    fn from(registrant: &Registrant) -> Self {
        Self {
            id: registrant.id,
            name: registrant.full_name(),
            phone: registrant.phone.clone(),
            email: registrant.email.clone(),
            address: registrant.address.clone(),
            slots: registrant.availability.labels(),
        }
    }
}

/// A committed seeker/volunteer pair with both weekly schedules
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PairView {
    pub seeker: RegistrantSummary,
    pub volunteer: RegistrantSummary,
}

impl fmt::Display for PairView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{}] <-> {} [{}]",
            self.seeker.name,
            self.seeker.slots.join(", "),
            self.volunteer.name,
            self.volunteer.slots.join(", "),
        )
    }
}
