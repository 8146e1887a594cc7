use async_trait::async_trait;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};
use std::sync::OnceLock;
use std::time::Duration;
use crate::config::DatabaseSettings;
use crate::models::{Availability, Day, DaySlot, Page, PairFilter, Registrant, Role, Slot};
use crate::services::store::{next_cursor, RegistrantStore, StoreError};

/// PostgreSQL-backed registrant store
///
/// Reads the `registrants` table written by the intake form. The only write
/// is the pairing commit, which locks both rows before updating them.
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Connect using the database settings, running migrations if enabled
    pub async fn connect(settings: &DatabaseSettings) -> Result<Self, StoreError> {
        tracing::info!(
            max_connections = settings.max_connections,
            "Connecting to PostgreSQL"
        );

        let pool = PgPoolOptions::new()
            .max_connections(settings.max_connections)
            .min_connections(settings.min_connections)
            .acquire_timeout(Duration::from_secs(settings.acquire_timeout_secs))
            .idle_timeout(Duration::from_secs(settings.idle_timeout_secs))
            .test_before_acquire(true)
            .connect(&settings.url)
            .await?;

        if settings.run_migrations {
            sqlx::migrate!("./migrations").run(&pool).await?;
        }

        Ok(Self { pool })
    }
}

/// Column list shared by every registrant query
fn registrant_columns() -> &'static str {
    static COLUMNS: OnceLock<String> = OnceLock::new();
    COLUMNS.get_or_init(|| {
        let mut columns = vec![
            "id".to_string(),
            "is_volunteer".to_string(),
            "first_name".to_string(),
            "last_name".to_string(),
            "email".to_string(),
            "phone".to_string(),
            "address".to_string(),
            "start_date".to_string(),
            "end_date".to_string(),
            "buddy_id".to_string(),
            "submit_at".to_string(),
        ];
        for day in Day::ALL {
            for slot in Slot::ALL {
                columns.push(DaySlot::new(day, slot).column_name());
            }
        }
        columns.join(", ")
    })
}

/// `OR` of the slot columns set in `grid`, or `TRUE` for an empty grid
fn any_slot_clause(grid: &Availability) -> String {
    if grid.is_empty() {
        return "TRUE".to_string();
    }

    let columns: Vec<String> = grid.iter().map(|cell| cell.column_name()).collect();
    format!("({})", columns.join(" OR "))
}

fn decode_registrant(row: &PgRow) -> Result<Registrant, StoreError> {
    let mut availability = Availability::empty();
    for day in Day::ALL {
        for slot in Slot::ALL {
            let column = DaySlot::new(day, slot).column_name();
            if row.try_get::<bool, _>(column.as_str())? {
                availability.set(day, slot);
            }
        }
    }

    Ok(Registrant {
        id: row.try_get("id")?,
        role: Role::from_is_volunteer(row.try_get("is_volunteer")?),
        first_name: row.try_get("first_name")?,
        last_name: row.try_get("last_name")?,
        email: row.try_get("email")?,
        phone: row.try_get("phone")?,
        address: row.try_get("address")?,
        start_date: row.try_get("start_date")?,
        end_date: row.try_get("end_date")?,
        availability,
        buddy_id: row.try_get("buddy_id")?,
        submitted_at: row.try_get("submit_at")?,
    })
}

fn decode_page(rows: &[PgRow], page_size: usize) -> Result<Page<Registrant>, StoreError> {
    let items = rows
        .iter()
        .map(decode_registrant)
        .collect::<Result<Vec<_>, _>>()?;
    let next_cursor = next_cursor(&items, page_size);
    Ok(Page { items, next_cursor })
}

#[async_trait]
impl RegistrantStore for PostgresStore {
    async fn list_unmatched(
        &self,
        role: Role,
        cursor: Option<i64>,
        page_size: usize,
    ) -> Result<Page<Registrant>, StoreError> {
        let query = format!(
            r#"
            SELECT {}
            FROM registrants
            WHERE is_volunteer = $1
              AND buddy_id IS NULL
              AND ($2::BIGINT IS NULL OR id > $2)
            ORDER BY id ASC
            LIMIT $3
            "#,
            registrant_columns()
        );

        let rows = sqlx::query(&query)
            .bind(role.is_volunteer())
            .bind(cursor)
            .bind(page_size as i64)
            .fetch_all(&self.pool)
            .await?;

        tracing::debug!("Loaded {} unmatched {}s after {:?}", rows.len(), role, cursor);

        decode_page(&rows, page_size)
    }

    async fn try_commit_pairing(&self, seeker_id: i64, volunteer_id: i64) -> Result<bool, StoreError> {
        let mut tx = self.pool.begin().await?;

        // Lock both rows in id order so concurrent runs cannot deadlock
        let locked = sqlx::query(
            r#"
            SELECT id, is_volunteer, buddy_id
            FROM registrants
            WHERE id = ANY($1)
            ORDER BY id
            FOR UPDATE
            "#,
        )
        .bind(vec![seeker_id, volunteer_id])
        .fetch_all(&mut *tx)
        .await?;

        let mut eligible = locked.len() == 2;
        for row in &locked {
            let id: i64 = row.try_get("id")?;
            let is_volunteer: bool = row.try_get("is_volunteer")?;
            let buddy_id: Option<i64> = row.try_get("buddy_id")?;
            eligible &= buddy_id.is_none() && is_volunteer == (id == volunteer_id);
        }

        if !eligible {
            tx.rollback().await?;
            return Ok(false);
        }

        let result = sqlx::query(
            r#"
            UPDATE registrants
            SET buddy_id = CASE WHEN id = $1 THEN $2 ELSE $1 END
            WHERE id IN ($1, $2) AND buddy_id IS NULL
            "#,
        )
        .bind(seeker_id)
        .bind(volunteer_id)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() != 2 {
            tx.rollback().await?;
            return Ok(false);
        }

        tx.commit().await?;
        Ok(true)
    }

    async fn find_registrant(&self, id: i64) -> Result<Option<Registrant>, StoreError> {
        let query = format!("SELECT {} FROM registrants WHERE id = $1", registrant_columns());

        let row = sqlx::query(&query).bind(id).fetch_optional(&self.pool).await?;

        row.as_ref().map(decode_registrant).transpose()
    }

    async fn list_paired_seekers(
        &self,
        filter: &PairFilter,
        cursor: Option<i64>,
        page_size: usize,
    ) -> Result<Page<Registrant>, StoreError> {
        // Slot column names come from the fixed grid, never from input text
        let query = format!(
            r#"
            SELECT {}
            FROM registrants
            WHERE is_volunteer = FALSE
              AND buddy_id IS NOT NULL
              AND ($1::BIGINT IS NULL OR id > $1)
              AND ($2::DATE IS NULL OR submit_at >= $2)
              AND ($3::DATE IS NULL OR submit_at <= $3)
              AND {}
            ORDER BY id ASC
            LIMIT $4
            "#,
            registrant_columns(),
            any_slot_clause(&filter.any_of)
        );

        let rows = sqlx::query(&query)
            .bind(cursor)
            .bind(filter.submitted.map(|window| window.start))
            .bind(filter.submitted.map(|window| window.end))
            .bind(page_size as i64)
            .fetch_all(&self.pool)
            .await?;

        decode_page(&rows, page_size)
    }

    async fn health_check(&self) -> Result<bool, StoreError> {
        sqlx::query("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map(|_| true)
            .map_err(Into::into)
    }
}
