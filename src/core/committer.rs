use crate::core::MatchError;
use crate::models::{DaySlot, MatchRecord, Registrant};
use crate::services::RegistrantStore;

/// Commits mutual pairings through the store's atomic check-and-set
pub struct PairingCommitter<'a> {
    store: &'a dyn RegistrantStore,
}

impl<'a> PairingCommitter<'a> {
    pub fn new(store: &'a dyn RegistrantStore) -> Self {
        Self { store }
    }

    /// Pair `seeker` with `volunteer` if both are still unpaired
    ///
    /// A lost race yields `MatchError::StaleReference` and leaves both rows
    /// untouched. It is never retried.
    pub async fn commit(
        &self,
        seeker: &Registrant,
        volunteer: &Registrant,
        matched_on: DaySlot,
    ) -> Result<MatchRecord, MatchError> {
        if !self.store.try_commit_pairing(seeker.id, volunteer.id).await? {
            tracing::warn!(
                "Skipping: seeker {} or volunteer {} already has a buddy",
                seeker.id,
                volunteer.id
            );
            return Err(MatchError::StaleReference {
                seeker_id: seeker.id,
                volunteer_id: volunteer.id,
            });
        }

        let record = MatchRecord::new(seeker, volunteer, matched_on);

        tracing::info!(
            seeker_id = record.seeker_id,
            volunteer_id = record.volunteer_id,
            matched_on = %record.matched_on,
            "{}",
            record
        );

        Ok(record)
    }
}
