// Model exports
pub mod domain;
pub mod requests;
pub mod responses;

pub use domain::{Availability, DateRange, Day, DaySlot, Registrant, Role, Slot};
pub use requests::PairFilter;
pub use responses::{MatchRecord, MatchReport, Page, PairView, RegistrantSummary};
