use async_trait::async_trait;
use std::collections::BTreeMap;
use std::ops::Bound;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;
use crate::models::{Page, PairFilter, Registrant, Role};
use crate::services::store::{next_cursor, RegistrantStore, StoreError};

/// In-process registrant store
///
/// Keeps rows in id order behind a single async mutex, so the pairing
/// check-and-set happens under one guard.
#[derive(Default)]
pub struct MemoryStore {
    rows: Mutex<BTreeMap<i64, Registrant>>,
    unavailable: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_registrants(registrants: impl IntoIterator<Item = Registrant>) -> Self {
        let rows = registrants
            .into_iter()
            .map(|registrant| (registrant.id, registrant))
            .collect();

        Self {
            rows: Mutex::new(rows),
            unavailable: AtomicBool::new(false),
        }
    }

    /// Load a JSON array of registrants
    pub async fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let raw = tokio::fs::read_to_string(path.as_ref()).await?;
        let registrants: Vec<Registrant> = serde_json::from_str(&raw)?;

        tracing::info!(
            "Loaded {} registrants from {}",
            registrants.len(),
            path.as_ref().display()
        );

        Ok(Self::from_registrants(registrants))
    }

    /// Copy of every row, in id order
    pub async fn snapshot(&self) -> Vec<Registrant> {
        self.rows.lock().await.values().cloned().collect()
    }

    /// Simulate the backing store going away
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn ensure_available(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(StoreError::Unavailable("memory store is offline".to_string()))
        } else {
            Ok(())
        }
    }

    async fn page_where<F>(
        &self,
        cursor: Option<i64>,
        page_size: usize,
        predicate: F,
    ) -> Result<Page<Registrant>, StoreError>
    where
        F: Fn(&Registrant) -> bool,
    {
        self.ensure_available()?;

        let rows = self.rows.lock().await;
        let lower = cursor.map_or(Bound::Unbounded, Bound::Excluded);
        let items: Vec<Registrant> = rows
            .range((lower, Bound::Unbounded))
            .map(|(_, registrant)| registrant)
            .filter(|registrant| predicate(registrant))
            .take(page_size)
            .cloned()
            .collect();

        let next_cursor = next_cursor(&items, page_size);
        Ok(Page { items, next_cursor })
    }
}

#[async_trait]
impl RegistrantStore for MemoryStore {
    async fn list_unmatched(
        &self,
        role: Role,
        cursor: Option<i64>,
        page_size: usize,
    ) -> Result<Page<Registrant>, StoreError> {
        self.page_where(cursor, page_size, |registrant| {
            registrant.role == role && registrant.buddy_id.is_none()
        })
        .await
    }

    async fn try_commit_pairing(&self, seeker_id: i64, volunteer_id: i64) -> Result<bool, StoreError> {
        self.ensure_available()?;

        let mut rows = self.rows.lock().await;

        let eligible = |id: i64, role: Role| {
            rows.get(&id)
                .map_or(false, |registrant| registrant.role == role && registrant.buddy_id.is_none())
        };

        if seeker_id == volunteer_id
            || !eligible(seeker_id, Role::Seeker)
            || !eligible(volunteer_id, Role::Volunteer)
        {
            return Ok(false);
        }

        if let Some(seeker) = rows.get_mut(&seeker_id) {
            seeker.buddy_id = Some(volunteer_id);
        }
        if let Some(volunteer) = rows.get_mut(&volunteer_id) {
            volunteer.buddy_id = Some(seeker_id);
        }

        Ok(true)
    }

    async fn find_registrant(&self, id: i64) -> Result<Option<Registrant>, StoreError> {
        self.ensure_available()?;
        Ok(self.rows.lock().await.get(&id).cloned())
    }

    async fn list_paired_seekers(
        &self,
        filter: &PairFilter,
        cursor: Option<i64>,
        page_size: usize,
    ) -> Result<Page<Registrant>, StoreError> {
        self.page_where(cursor, page_size, |registrant| {
            registrant.role == Role::Seeker && registrant.buddy_id.is_some() && filter.matches(registrant)
        })
        .await
    }

    async fn health_check(&self) -> Result<bool, StoreError> {
        Ok(!self.unavailable.load(Ordering::SeqCst))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Availability, DateRange};
    use chrono::NaiveDate;

    fn registrant(id: i64, role: Role) -> Registrant {
        let day = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        Registrant {
            id,
            role,
            first_name: format!("First{}", id),
            last_name: format!("Last{}", id),
            email: format!("user{}@example.org", id),
            phone: "0600000000".to_string(),
            address: "1 Place du Marché".to_string(),
            start_date: day,
            end_date: day,
            availability: Availability::empty(),
            buddy_id: None,
            submitted_at: day,
        }
    }

    #[tokio::test]
    async fn test_list_unmatched_pages_by_id() {
        let store = MemoryStore::from_registrants(
            (1..=5).map(|id| registrant(id, if id % 2 == 0 { Role::Volunteer } else { Role::Seeker })),
        );

        let first = store.list_unmatched(Role::Seeker, None, 2).await.unwrap();
        assert_eq!(first.items.iter().map(|r| r.id).collect::<Vec<_>>(), vec![1, 3]);
        assert_eq!(first.next_cursor, Some(3));

        let second = store.list_unmatched(Role::Seeker, first.next_cursor, 2).await.unwrap();
        assert_eq!(second.items.iter().map(|r| r.id).collect::<Vec<_>>(), vec![5]);
        assert_eq!(second.next_cursor, None);
    }

    #[tokio::test]
    async fn test_commit_rejects_wrong_roles_and_missing_rows() {
        let store = MemoryStore::from_registrants(vec![
            registrant(1, Role::Seeker),
            registrant(2, Role::Volunteer),
        ]);

        assert!(!store.try_commit_pairing(2, 1).await.unwrap());
        assert!(!store.try_commit_pairing(1, 99).await.unwrap());
        assert!(!store.try_commit_pairing(1, 1).await.unwrap());
        assert!(store.try_commit_pairing(1, 2).await.unwrap());
        assert!(!store.try_commit_pairing(1, 2).await.unwrap());

        let rows = store.snapshot().await;
        assert_eq!(rows[0].buddy_id, Some(2));
        assert_eq!(rows[1].buddy_id, Some(1));
    }

    #[tokio::test]
    async fn test_paired_seekers_respect_filter() {
        let mut early = registrant(1, Role::Seeker);
        early.buddy_id = Some(2);
        early.submitted_at = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
        let mut late = registrant(3, Role::Seeker);
        late.buddy_id = Some(4);
        late.submitted_at = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let store = MemoryStore::from_registrants(vec![early, late]);

        let filter = PairFilter {
            submitted: Some(DateRange::new(
                NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
                NaiveDate::from_ymd_opt(2024, 6, 30).unwrap(),
            )),
            ..PairFilter::default()
        };
        let page = store.list_paired_seekers(&filter, None, 10).await.unwrap();

        assert_eq!(page.items.iter().map(|r| r.id).collect::<Vec<_>>(), vec![3]);
    }

    #[tokio::test]
    async fn test_unavailable_store_errors() {
        let store = MemoryStore::from_registrants(vec![registrant(1, Role::Seeker)]);
        store.set_unavailable(true);

        assert!(matches!(
            store.list_unmatched(Role::Seeker, None, 10).await,
            Err(StoreError::Unavailable(_))
        ));
        assert!(!store.health_check().await.unwrap());
    }
}
