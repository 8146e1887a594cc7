use async_trait::async_trait;
use thiserror::Error;
use crate::models::{Page, PairFilter, Registrant, Role};

/// Errors raised by a registrant store adapter
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("SQLx error: {0}")]
    SqlxError(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    MigrateError(#[from] sqlx::migrate::MigrateError),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Persistence port for registrants
///
/// Readers may see stale snapshots; `try_commit_pairing` is the only write and
/// must re-check its precondition atomically.
#[async_trait]
pub trait RegistrantStore: Send + Sync {
    /// Unpaired registrants of `role` with `id > cursor`, ascending by id
    async fn list_unmatched(
        &self,
        role: Role,
        cursor: Option<i64>,
        page_size: usize,
    ) -> Result<Page<Registrant>, StoreError>;

    /// Atomically pair a seeker with a volunteer.
    ///
    /// Returns `false` without writing anything if either row is missing,
    /// has the wrong role, or is already paired.
    async fn try_commit_pairing(&self, seeker_id: i64, volunteer_id: i64) -> Result<bool, StoreError>;

    async fn find_registrant(&self, id: i64) -> Result<Option<Registrant>, StoreError>;

    /// Paired seekers matching `filter` with `id > cursor`, ascending by id
    async fn list_paired_seekers(
        &self,
        filter: &PairFilter,
        cursor: Option<i64>,
        page_size: usize,
    ) -> Result<Page<Registrant>, StoreError>;

    async fn health_check(&self) -> Result<bool, StoreError>;
}

/// Cursor for the page following `items`, or `None` when the page came back short
pub(crate) fn next_cursor(items: &[Registrant], page_size: usize) -> Option<i64> {
    if items.len() < page_size {
        None
    } else {
        items.last().map(|registrant| registrant.id)
    }
}
