//! Buddy Match - availability-matching engine for volunteers and help-seekers
//!
//! This library pairs unpaired help-seekers with unpaired volunteers whose
//! active date ranges overlap and who share at least one weekly time slot.
//! Candidates are scanned in bounded pages and every pairing is committed
//! atomically, so concurrent runs never double-book a registrant.

pub mod config;
pub mod core;
pub mod models;
pub mod services;
pub mod telemetry;

// Re-export commonly used types
pub use crate::core::{date_ranges_overlap, evaluate, is_compatible, list_pairs, MatchError, Matcher};
pub use models::{
    Availability, DateRange, Day, DaySlot, MatchRecord, MatchReport, PairFilter, Registrant, Role, Slot,
};
pub use services::{MemoryStore, PostgresStore, RegistrantStore, StoreError};
