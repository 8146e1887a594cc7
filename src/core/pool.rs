use crate::models::{Registrant, Role};
use crate::services::{RegistrantStore, StoreError};

/// Lazy, finite sequence of unpaired registrant pages for one role
///
/// Pages are fetched by keyset (`id > last id seen`), so rows paired while the
/// pool is being consumed never shift later pages. Once the cursor has moved
/// past a page it is never fetched again; build a new pool to restart.
pub struct CandidatePool<'a> {
    store: &'a dyn RegistrantStore,
    role: Role,
    page_size: usize,
    cursor: Option<i64>,
    exhausted: bool,
    pages_loaded: usize,
}

impl<'a> CandidatePool<'a> {
    pub fn new(store: &'a dyn RegistrantStore, role: Role, page_size: usize) -> Self {
        Self {
            store,
            role,
            page_size,
            cursor: None,
            exhausted: page_size == 0,
            pages_loaded: 0,
        }
    }

    /// Next page, or `None` once the pool is drained
    pub async fn next_page(&mut self) -> Result<Option<Vec<Registrant>>, StoreError> {
        if self.exhausted {
            return Ok(None);
        }

        let page = self
            .store
            .list_unmatched(self.role, self.cursor, self.page_size)
            .await?;

        if page.items.is_empty() {
            self.exhausted = true;
            return Ok(None);
        }

        self.pages_loaded += 1;
        self.cursor = page.items.last().map(|registrant| registrant.id);
        self.exhausted = page.next_cursor.is_none();

        tracing::debug!(
            "Loaded {} page {} ({} registrants, cursor {:?})",
            self.role,
            self.pages_loaded,
            page.items.len(),
            self.cursor
        );

        Ok(Some(page.items))
    }

    pub fn pages_loaded(&self) -> usize {
        self.pages_loaded
    }
}
