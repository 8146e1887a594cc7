use crate::models::DateRange;

/// Intersection of two inclusive date ranges, or `None` when they are disjoint
#[inline]
pub fn date_ranges_overlap(a: &DateRange, b: &DateRange) -> Option<DateRange> {
    if a.start > b.end || b.start > a.end {
        return None;
    }

    Some(DateRange::new(a.start.max(b.start), a.end.min(b.end)))
}
