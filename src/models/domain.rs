use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use validator::{Validate, ValidationError};

/// Which side of a pairing a registrant is on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Volunteer,
    Seeker,
}

impl Role {
    /// Maps the intake form's `is_volunteer` flag
    pub fn from_is_volunteer(is_volunteer: bool) -> Self {
        if is_volunteer {
            Role::Volunteer
        } else {
            Role::Seeker
        }
    }

    pub fn is_volunteer(self) -> bool {
        matches!(self, Role::Volunteer)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Volunteer => f.write_str("volunteer"),
            Role::Seeker => f.write_str("seeker"),
        }
    }
}

/// Day of the week, in scan order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Day {
    Monday = 0,
    Tuesday = 1,
    Wednesday = 2,
    Thursday = 3,
    Friday = 4,
    Saturday = 5,
    Sunday = 6,
}

impl Day {
    pub const ALL: [Day; 7] = [
        Day::Monday,
        Day::Tuesday,
        Day::Wednesday,
        Day::Thursday,
        Day::Friday,
        Day::Saturday,
        Day::Sunday,
    ];

    /// Lowercase name, as used in storage column names
    pub fn as_str(self) -> &'static str {
        match self {
            Day::Monday => "monday",
            Day::Tuesday => "tuesday",
            Day::Wednesday => "wednesday",
            Day::Thursday => "thursday",
            Day::Friday => "friday",
            Day::Saturday => "saturday",
            Day::Sunday => "sunday",
        }
    }
}

impl fmt::Display for Day {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Day::Monday => "Monday",
            Day::Tuesday => "Tuesday",
            Day::Wednesday => "Wednesday",
            Day::Thursday => "Thursday",
            Day::Friday => "Friday",
            Day::Saturday => "Saturday",
            Day::Sunday => "Sunday",
        };
        f.write_str(name)
    }
}

/// Time slot within a day, in scan order
///
/// `AllDay` is an independent flag: it does not imply the finer slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Slot {
    AllDay = 0,
    Morning = 1,
    Afternoon = 2,
    Evening = 3,
}

impl Slot {
    pub const ALL: [Slot; 4] = [Slot::AllDay, Slot::Morning, Slot::Afternoon, Slot::Evening];

    pub fn as_str(self) -> &'static str {
        match self {
            Slot::AllDay => "all_day",
            Slot::Morning => "morning",
            Slot::Afternoon => "afternoon",
            Slot::Evening => "evening",
        }
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Slot::AllDay => f.write_str("all day"),
            other => f.write_str(other.as_str()),
        }
    }
}

/// A single (day, slot) cell of the weekly grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DaySlot {
    pub day: Day,
    pub slot: Slot,
}

impl DaySlot {
    pub fn new(day: Day, slot: Slot) -> Self {
        Self { day, slot }
    }

    /// Storage column name, e.g. `monday_all_day`
    pub fn column_name(self) -> String {
        format!("{}_{}", self.day.as_str(), self.slot.as_str())
    }

    fn bit(self) -> u32 {
        1 << (self.day as u32 * Slot::ALL.len() as u32 + self.slot as u32)
    }
}

impl fmt::Display for DaySlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.day, self.slot)
    }
}

/// Weekly availability as a 28-bit set indexed by (day, slot)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "Vec<DaySlot>", into = "Vec<DaySlot>")]
pub struct Availability {
    bits: u32,
}

impl Availability {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Builder-style setter
    pub fn with(mut self, day: Day, slot: Slot) -> Self {
        self.set(day, slot);
        self
    }

    pub fn set(&mut self, day: Day, slot: Slot) {
        self.bits |= DaySlot::new(day, slot).bit();
    }

    #[inline]
    pub fn has_slot(&self, day: Day, slot: Slot) -> bool {
        self.bits & DaySlot::new(day, slot).bit() != 0
    }

    #[inline]
    pub fn has_any_slot(&self, day: Day) -> bool {
        Slot::ALL.iter().any(|&slot| self.has_slot(day, slot))
    }

    pub fn is_empty(&self) -> bool {
        self.bits == 0
    }

    /// True when both grids share at least one cell
    #[inline]
    pub fn intersects(&self, other: &Availability) -> bool {
        self.bits & other.bits != 0
    }

    /// Set cells in scan order (Monday first, AllDay first within a day)
    pub fn iter(&self) -> impl Iterator<Item = DaySlot> + '_ {
        Day::ALL.iter().flat_map(move |&day| {
            Slot::ALL
                .iter()
                .filter(move |&&slot| self.has_slot(day, slot))
                .map(move |&slot| DaySlot::new(day, slot))
        })
    }

    /// Human-readable labels, e.g. "Monday morning"
    pub fn labels(&self) -> Vec<String> {
        self.iter().map(|cell| cell.to_string()).collect()
    }
}

impl From<Vec<DaySlot>> for Availability {
    fn from(cells: Vec<DaySlot>) -> Self {
        cells
            .into_iter()
            .fold(Availability::empty(), |acc, cell| acc.with(cell.day, cell.slot))
    }
}

impl From<Availability> for Vec<DaySlot> {
    fn from(availability: Availability) -> Self {
        availability.iter().collect()
    }
}

/// Inclusive date interval
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    pub fn is_valid(&self) -> bool {
        self.start <= self.end
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

/// A volunteer or help-seeker as submitted through the intake form
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[validate(schema(function = "validate_active_range"))]
pub struct Registrant {
    pub id: i64,
    pub role: Role,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub address: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default)]
    pub availability: Availability,
    #[serde(default)]
    pub buddy_id: Option<i64>,
    pub submitted_at: NaiveDate,
}

impl Registrant {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    pub fn active_range(&self) -> DateRange {
        DateRange::new(self.start_date, self.end_date)
    }

    pub fn is_paired(&self) -> bool {
        self.buddy_id.is_some()
    }
}

fn validate_active_range(registrant: &Registrant) -> Result<(), ValidationError> {
    if registrant.active_range().is_valid() {
        Ok(())
    } else {
        Err(ValidationError::new("active_range"))
    }
}
