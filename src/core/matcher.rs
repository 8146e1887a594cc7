use std::collections::HashSet;
use std::sync::Arc;
use chrono::Utc;
use tracing::Instrument;
use uuid::Uuid;
use validator::Validate;
use crate::config::MatchingSettings;
use crate::core::{
    committer::PairingCommitter,
    evaluator::evaluate,
    pool::CandidatePool,
    MatchError,
};
use crate::models::{MatchRecord, MatchReport, Registrant, Role};
use crate::services::RegistrantStore;

/// Main matching orchestrator - drives the paged seeker × volunteer scan
///
/// # Pipeline Stages
/// 1. Load a page of unpaired seekers
/// 2. Stream every page of unpaired volunteers against it
/// 3. Evaluate each (seeker, volunteer) pair, first compatible volunteer wins
/// 4. Commit the pairing and move on to the next seeker
///
/// The matcher keeps no state between runs; paired registrants drop out of
/// the next run on their own because their `buddy_id` is set.
#[derive(Clone)]
pub struct Matcher {
    store: Arc<dyn RegistrantStore>,
    settings: MatchingSettings,
}

/// Per-run bookkeeping
#[derive(Default)]
struct RunState {
    paired: HashSet<i64>,
    invalid: HashSet<i64>,
    matches: Vec<MatchRecord>,
    seekers_scanned: usize,
    stale_skips: usize,
}

impl Matcher {
    pub fn new(store: Arc<dyn RegistrantStore>, settings: MatchingSettings) -> Self {
        Self { store, settings }
    }

    pub fn with_default_settings(store: Arc<dyn RegistrantStore>) -> Self {
        Self::new(store, MatchingSettings::default())
    }

    /// Pair every seeker that has a compatible volunteer
    ///
    /// Only a store failure aborts the run. Pairs committed before the
    /// failure stay committed.
    pub async fn run(&self) -> Result<MatchReport, MatchError> {
        self.scan(true).await
    }

    /// Same scan as `run`, reporting proposed pairs without committing them
    pub async fn dry_run(&self) -> Result<MatchReport, MatchError> {
        self.scan(false).await
    }

    async fn scan(&self, commit: bool) -> Result<MatchReport, MatchError> {
        let run_id = Uuid::new_v4();
        let span = tracing::info_span!("matching_run", %run_id, dry_run = !commit);

        async move {
            let started_at = Utc::now();
            tracing::info!(
                seeker_page_size = self.settings.seeker_page_size,
                volunteer_page_size = self.settings.volunteer_page_size,
                "Starting matching run"
            );

            let mut state = RunState::default();
            let result = self.scan_pages(commit, &mut state).await;

            if let Err(e) = &result {
                tracing::error!(
                    committed = state.matches.len(),
                    "Matching run aborted: {}",
                    e
                );
            }
            result?;

            let report = MatchReport {
                run_id,
                dry_run: !commit,
                started_at,
                finished_at: Utc::now(),
                matches: state.matches,
                seekers_scanned: state.seekers_scanned,
                stale_skips: state.stale_skips,
                invalid_registrants: state.invalid.len(),
            };

            tracing::info!(
                matches = report.matches.len(),
                seekers_scanned = report.seekers_scanned,
                stale_skips = report.stale_skips,
                invalid_registrants = report.invalid_registrants,
                "Matching run finished"
            );

            Ok(report)
        }
        .instrument(span)
        .await
    }

    async fn scan_pages(&self, commit: bool, state: &mut RunState) -> Result<(), MatchError> {
        let store = self.store.as_ref();
        let committer = PairingCommitter::new(store);
        let mut seekers = CandidatePool::new(store, Role::Seeker, self.settings.seeker_page_size);

        while let Some(seeker_page) = seekers.next_page().await? {
            let seeker_page = retain_valid(seeker_page, &mut state.invalid);
            state.seekers_scanned += seeker_page.len();
            if seeker_page.is_empty() {
                continue;
            }

            // The volunteer pool restarts for every seeker page
            let mut volunteers =
                CandidatePool::new(store, Role::Volunteer, self.settings.volunteer_page_size);

            while let Some(volunteer_page) = volunteers.next_page().await? {
                let volunteer_page = retain_valid(volunteer_page, &mut state.invalid);

                for seeker in &seeker_page {
                    if state.paired.contains(&seeker.id) {
                        continue;
                    }

                    for volunteer in &volunteer_page {
                        if state.paired.contains(&volunteer.id) {
                            continue;
                        }

                        let Some(matched_on) = evaluate(seeker, volunteer) else {
                            continue;
                        };

                        if commit {
                            match committer.commit(seeker, volunteer, matched_on).await {
                                Ok(record) => state.record(record),
                                Err(MatchError::StaleReference { .. }) => {
                                    state.stale_skips += 1;
                                    self.exclude_taken([seeker.id, volunteer.id], state).await?;
                                }
                                Err(e) => return Err(e),
                            }
                        } else {
                            state.record(MatchRecord::new(seeker, volunteer, matched_on));
                        }

                        // Stop scanning volunteers for this seeker
                        break;
                    }
                }

                if seeker_page.iter().all(|seeker| state.paired.contains(&seeker.id)) {
                    break;
                }
            }
        }

        Ok(())
    }

    /// Exclude rows that a concurrent run paired after they were loaded
    async fn exclude_taken(&self, ids: [i64; 2], state: &mut RunState) -> Result<(), MatchError> {
        for id in ids {
            let taken = self
                .store
                .find_registrant(id)
                .await?
                .map_or(true, |registrant| registrant.is_paired());
            if taken {
                state.paired.insert(id);
            }
        }
        Ok(())
    }
}

impl RunState {
    fn record(&mut self, record: MatchRecord) {
        self.paired.insert(record.seeker_id);
        self.paired.insert(record.volunteer_id);
        self.matches.push(record);
    }
}

/// Drop registrants whose active range is inverted, logging each one once
fn retain_valid(page: Vec<Registrant>, invalid: &mut HashSet<i64>) -> Vec<Registrant> {
    page.into_iter()
        .filter(|registrant| {
            if registrant.validate().is_ok() {
                return true;
            }
            if invalid.insert(registrant.id) {
                let error = MatchError::InvalidRegistrant {
                    id: registrant.id,
                    start: registrant.start_date,
                    end: registrant.end_date,
                };
                tracing::warn!("Excluding {} from matching: {}", registrant.role, error);
            }
            false
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Availability, Day, Page, PairFilter, Slot};
    use crate::services::{MemoryStore, StoreError};
    use async_trait::async_trait;
    use chrono::NaiveDate;

    /// Serves one volunteer as unpaired after another run already took it
    struct StaleVolunteerStore {
        inner: MemoryStore,
        stale: Registrant,
    }

    #[async_trait]
    impl RegistrantStore for StaleVolunteerStore {
        async fn list_unmatched(
            &self,
            role: Role,
            cursor: Option<i64>,
            page_size: usize,
        ) -> Result<Page<Registrant>, StoreError> {
            let mut page = self.inner.list_unmatched(role, cursor, page_size).await?;
            if role == Role::Volunteer && cursor.is_none() {
                page.items.push(self.stale.clone());
                page.items.sort_by_key(|registrant| registrant.id);
            }
            Ok(page)
        }

        async fn try_commit_pairing(&self, seeker_id: i64, volunteer_id: i64) -> Result<bool, StoreError> {
            self.inner.try_commit_pairing(seeker_id, volunteer_id).await
        }

        async fn find_registrant(&self, id: i64) -> Result<Option<Registrant>, StoreError> {
            self.inner.find_registrant(id).await
        }

        async fn list_paired_seekers(
            &self,
            filter: &PairFilter,
            cursor: Option<i64>,
            page_size: usize,
        ) -> Result<Page<Registrant>, StoreError> {
            self.inner.list_paired_seekers(filter, cursor, page_size).await
        }

        async fn health_check(&self) -> Result<bool, StoreError> {
            self.inner.health_check().await
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn create_candidate(id: i64, role: Role, availability: Availability) -> Registrant {
        Registrant {
            id,
            role,
            first_name: format!("User{}", id),
            last_name: "Test".to_string(),
            email: format!("user{}@example.org", id),
            phone: "0600000000".to_string(),
            address: "Châtenay-Malabry".to_string(),
            start_date: date(2024, 5, 1),
            end_date: date(2024, 5, 31),
            availability,
            buddy_id: None,
            submitted_at: date(2024, 4, 20),
        }
    }

    fn matcher(store: Arc<MemoryStore>, seeker_page_size: usize, volunteer_page_size: usize) -> Matcher {
        Matcher::new(
            store,
            MatchingSettings {
                seeker_page_size,
                volunteer_page_size,
            },
        )
    }

    #[tokio::test]
    async fn test_run_pairs_compatible_registrants() {
        let monday = Availability::empty().with(Day::Monday, Slot::Morning);
        let store = Arc::new(MemoryStore::from_registrants(vec![
            create_candidate(1, Role::Seeker, monday),
            create_candidate(2, Role::Volunteer, monday),
        ]));

        let report = Matcher::with_default_settings(store.clone()).run().await.unwrap();

        assert_eq!(report.matches.len(), 1);
        assert_eq!(report.matches[0].seeker_id, 1);
        assert_eq!(report.matches[0].volunteer_id, 2);
        assert!(!report.dry_run);
        assert_eq!(report.seekers_scanned, 1);
    }

    #[tokio::test]
    async fn test_dry_run_leaves_store_untouched() {
        let monday = Availability::empty().with(Day::Monday, Slot::Morning);
        let store = Arc::new(MemoryStore::from_registrants(vec![
            create_candidate(1, Role::Seeker, monday),
            create_candidate(2, Role::Seeker, monday),
            create_candidate(3, Role::Volunteer, monday),
        ]));

        let report = Matcher::with_default_settings(store.clone()).dry_run().await.unwrap();

        assert!(report.dry_run);
        assert_eq!(report.matches.len(), 1);
        assert!(store.snapshot().await.iter().all(|r| r.buddy_id.is_none()));
    }

    #[tokio::test]
    async fn test_volunteer_on_later_page_is_found() {
        let friday = Availability::empty().with(Day::Friday, Slot::Evening);
        let mut rows = vec![create_candidate(1, Role::Seeker, friday)];
        rows.extend((10..20).map(|id| create_candidate(id, Role::Volunteer, Availability::empty())));
        rows.push(create_candidate(20, Role::Volunteer, friday));
        let store = Arc::new(MemoryStore::from_registrants(rows));

        let report = matcher(store, 1, 3).run().await.unwrap();

        assert_eq!(report.matches.len(), 1);
        assert_eq!(report.matches[0].volunteer_id, 20);
    }

    #[tokio::test]
    async fn test_invalid_registrant_is_excluded() {
        let monday = Availability::empty().with(Day::Monday, Slot::Morning);
        let mut broken = create_candidate(2, Role::Volunteer, monday);
        broken.start_date = date(2024, 6, 1);
        broken.end_date = date(2024, 5, 1);
        let store = Arc::new(MemoryStore::from_registrants(vec![
            create_candidate(1, Role::Seeker, monday),
            broken,
            create_candidate(3, Role::Volunteer, monday),
        ]));

        let report = Matcher::with_default_settings(store).run().await.unwrap();

        assert_eq!(report.invalid_registrants, 1);
        assert_eq!(report.matches.len(), 1);
        assert_eq!(report.matches[0].volunteer_id, 3);
    }

    #[tokio::test]
    async fn test_lost_volunteer_is_not_retried_by_later_seekers() {
        let monday = Availability::empty().with(Day::Monday, Slot::Morning);
        let mut taken = create_candidate(10, Role::Volunteer, monday);
        taken.buddy_id = Some(99);
        let mut other_seeker = create_candidate(99, Role::Seeker, monday);
        other_seeker.buddy_id = Some(10);

        let stale = create_candidate(10, Role::Volunteer, monday);
        let store = Arc::new(StaleVolunteerStore {
            inner: MemoryStore::from_registrants(vec![
                create_candidate(1, Role::Seeker, monday),
                create_candidate(2, Role::Seeker, monday),
                taken,
                create_candidate(11, Role::Volunteer, monday),
                create_candidate(12, Role::Volunteer, monday),
                other_seeker,
            ]),
            stale,
        });

        let report = Matcher::with_default_settings(store.clone()).run().await.unwrap();

        // Seeker 1 loses the race and waits for the next run
        assert_eq!(report.stale_skips, 1);
        assert_eq!(report.matches.len(), 1);
        assert_eq!((report.matches[0].seeker_id, report.matches[0].volunteer_id), (2, 11));

        let rows = store.inner.snapshot().await;
        let buddy_of = |id: i64| rows.iter().find(|r| r.id == id).and_then(|r| r.buddy_id);
        assert_eq!(buddy_of(10), Some(99));
        assert_eq!(buddy_of(1), None);
        assert_eq!(buddy_of(12), None);
    }

    #[test]
    fn test_retain_valid_logs_each_id_once() {
        let mut broken = create_candidate(5, Role::Seeker, Availability::empty());
        broken.end_date = date(2024, 4, 1);
        let mut invalid = HashSet::new();

        assert!(retain_valid(vec![broken.clone()], &mut invalid).is_empty());
        assert!(retain_valid(vec![broken], &mut invalid).is_empty());
        assert_eq!(invalid.len(), 1);
    }
}
