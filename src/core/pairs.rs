use crate::core::MatchError;
use crate::models::{Page, PairFilter, PairView, RegistrantSummary};
use crate::services::RegistrantStore;

/// One page of committed pairs, keyed by seeker id
///
/// `filter` selects on the seeker's submission date and weekly grid.
/// Seekers whose buddy row has disappeared are left out of the page.
pub async fn list_pairs(
    store: &dyn RegistrantStore,
    filter: &PairFilter,
    cursor: Option<i64>,
    page_size: usize,
) -> Result<Page<PairView>, MatchError> {
    let seekers = store.list_paired_seekers(filter, cursor, page_size).await?;
    let mut items = Vec::with_capacity(seekers.items.len());

    for seeker in &seekers.items {
        let Some(buddy_id) = seeker.buddy_id else {
            continue;
        };

        match store.find_registrant(buddy_id).await? {
            Some(volunteer) => items.push(PairView {
                seeker: RegistrantSummary::from(seeker),
                volunteer: RegistrantSummary::from(&volunteer),
            }),
            None => tracing::warn!("Seeker {} references missing buddy {}", seeker.id, buddy_id),
        }
    }

    Ok(Page {
        items,
        next_cursor: seekers.next_cursor,
    })
}
