use crate::core::availability::date_ranges_overlap;
use crate::models::{Availability, Day, DaySlot, Registrant, Slot};

/// Decide whether a seeker and a volunteer can be paired
///
/// # Stages
/// 1. Active ranges must overlap. The overlap only rejects disjoint ranges;
///    the weekly scan below is not restricted to it.
/// 2. Scan the weekly grid Monday to Sunday, AllDay to Evening, and return the
///    first cell both parties have set.
///
/// Returns `None` when the pair is not compatible.
#[inline]
pub fn evaluate(seeker: &Registrant, volunteer: &Registrant) -> Option<DaySlot> {
    date_ranges_overlap(&seeker.active_range(), &volunteer.active_range())?;

    let matched_on = first_shared_slot(&seeker.availability, &volunteer.availability)?;

    tracing::debug!(
        "Match found on {} between {} and {}",
        matched_on,
        seeker.first_name,
        volunteer.first_name
    );

    Some(matched_on)
}

#[inline]
pub fn is_compatible(seeker: &Registrant, volunteer: &Registrant) -> bool {
    evaluate(seeker, volunteer).is_some()
}

/// First (day, slot) set in both grids, in scan order
///
/// `AllDay` is compared like any other slot and never stands in for the
/// finer slots.
#[inline]
pub fn first_shared_slot(a: &Availability, b: &Availability) -> Option<DaySlot> {
    for day in Day::ALL {
        if !a.has_any_slot(day) || !b.has_any_slot(day) {
            continue;
        }

        for slot in Slot::ALL {
            if a.has_slot(day, slot) && b.has_slot(day, slot) {
                return Some(DaySlot::new(day, slot));
            }
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;
    use chrono::NaiveDate;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn create_registrant(
        role: Role,
        start: NaiveDate,
        end: NaiveDate,
        availability: Availability,
    ) -> Registrant {
        Registrant {
            id: 1,
            role,
            first_name: "Test".to_string(),
            last_name: "User".to_string(),
            email: "test@example.org".to_string(),
            phone: "0600000000".to_string(),
            address: "1 Rue Test".to_string(),
            start_date: start,
            end_date: end,
            availability,
            buddy_id: None,
            submitted_at: start,
        }
    }

    #[test]
    fn test_shared_slot_matches() {
        let seeker = create_registrant(
            Role::Seeker,
            date(2024, 5, 1),
            date(2024, 5, 10),
            Availability::empty().with(Day::Monday, Slot::Morning),
        );
        let volunteer = create_registrant(
            Role::Volunteer,
            date(2024, 5, 5),
            date(2024, 5, 15),
            Availability::empty().with(Day::Monday, Slot::Morning),
        );

        assert_eq!(
            evaluate(&seeker, &volunteer),
            Some(DaySlot::new(Day::Monday, Slot::Morning))
        );
    }

    #[test]
    fn test_disjoint_ranges_never_match() {
        let grid = Availability::empty().with(Day::Monday, Slot::Morning);
        let seeker = create_registrant(Role::Seeker, date(2024, 5, 1), date(2024, 5, 10), grid);
        let volunteer = create_registrant(Role::Volunteer, date(2024, 6, 1), date(2024, 6, 10), grid);

        assert!(!is_compatible(&seeker, &volunteer));
    }

    #[test]
    fn test_all_day_does_not_cover_finer_slots() {
        let seeker = create_registrant(
            Role::Seeker,
            date(2024, 5, 1),
            date(2024, 5, 10),
            Availability::empty().with(Day::Tuesday, Slot::AllDay),
        );
        let volunteer = create_registrant(
            Role::Volunteer,
            date(2024, 5, 1),
            date(2024, 5, 10),
            Availability::empty()
                .with(Day::Tuesday, Slot::Morning)
                .with(Day::Tuesday, Slot::Afternoon)
                .with(Day::Tuesday, Slot::Evening),
        );

        assert_eq!(evaluate(&seeker, &volunteer), None);
    }

    #[test]
    fn test_first_cell_in_scan_order_wins() {
        let a = Availability::empty()
            .with(Day::Wednesday, Slot::Evening)
            .with(Day::Wednesday, Slot::Morning)
            .with(Day::Sunday, Slot::AllDay);
        let b = Availability::empty()
            .with(Day::Sunday, Slot::AllDay)
            .with(Day::Wednesday, Slot::Evening)
            .with(Day::Wednesday, Slot::Morning);

        assert_eq!(
            first_shared_slot(&a, &b),
            Some(DaySlot::new(Day::Wednesday, Slot::Morning))
        );
    }

    #[test]
    fn test_same_day_different_slots() {
        let a = Availability::empty().with(Day::Friday, Slot::Morning);
        let b = Availability::empty().with(Day::Friday, Slot::Evening);

        assert_eq!(first_shared_slot(&a, &b), None);
    }

    #[test]
    fn test_empty_grid_never_matches() {
        let a = Availability::empty();
        let b = Availability::empty().with(Day::Monday, Slot::AllDay);

        assert_eq!(first_shared_slot(&a, &b), None);
        assert_eq!(first_shared_slot(&a, &a), None);
    }
}
