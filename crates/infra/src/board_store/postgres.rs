//! Postgres-backed board store.
//!
//! Every mutation runs inside one transaction. Writers that add cards to a
//! lane first take a transaction-scoped advisory lock for that lane, and the
//! cards being moved are pinned with `SELECT ... FOR UPDATE`, so the
//! read-check-write of `transition` and the multi-row `reorder` are atomic
//! with respect to each other.
//!
//! ## Error Mapping
//!
//! Every `sqlx::Error` becomes `BoardStoreError::Store`. Domain rejections are
//! decided in Rust, inside the open transaction, before any write; returning
//! early drops the transaction, which rolls it back.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{FromRow, PgPool, Postgres, Row, Transaction};
use tracing::{instrument, Span};
use uuid::Uuid;

use laundry_board::{
    capacity_check, check_reorder_positions, entry_position, next_intake_position, ordering,
    reorder_target_lane, validate_title, BoardLayout, Card, CardStyling, CreateCard, LaneId,
    ReorderLane,
};
use laundry_core::CardId;

use super::r#trait::{BoardStore, BoardStoreError};

const CARD_COLUMNS: &str =
    "id, title, lane, position, created_at, background_color, text_color";

/// Postgres-backed board store.
///
/// ## Thread Safety
///
/// Uses the SQLx connection pool, which is `Send + Sync`; the store can be
/// shared behind an `Arc` across request handlers.
#[derive(Debug, Clone)]
pub struct PostgresBoardStore {
    pool: Arc<PgPool>,
    layout: BoardLayout,
}

impl PostgresBoardStore {
    pub fn new(pool: PgPool, layout: BoardLayout) -> Self {
        Self {
            pool: Arc::new(pool),
            layout,
        }
    }

    /// Connect to `database_url` and make sure the schema exists.
    pub async fn connect(database_url: &str, layout: BoardLayout) -> Result<Self, BoardStoreError> {
        let pool = PgPool::connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        let store = Self::new(pool, layout);
        store.ensure_schema().await?;
        Ok(store)
    }

    /// Create the `cards` table and its lane/position index if missing.
    #[instrument(skip(self), err)]
    pub async fn ensure_schema(&self) -> Result<(), BoardStoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS cards (
                id UUID PRIMARY KEY,
                title TEXT NOT NULL CHECK (length(btrim(title)) > 0),
                lane TEXT NOT NULL CHECK (lane IN ('queue', 'washer', 'dryer', 'fold')),
                position BIGINT NOT NULL,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                background_color TEXT,
                text_color TEXT
            )
            "#,
        )
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("create_cards_table", e))?;

        sqlx::query("CREATE INDEX IF NOT EXISTS cards_lane_position_idx ON cards (lane, position)")
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("create_cards_index", e))?;

        Ok(())
    }

    #[instrument(skip(self), fields(card_count = tracing::field::Empty), err)]
    pub async fn fetch_all_cards(&self) -> Result<Vec<Card>, BoardStoreError> {
        let rows = sqlx::query(&format!("SELECT {CARD_COLUMNS} FROM cards"))
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_cards", e))?;

        let mut cards = rows
            .iter()
            .map(card_from_row)
            .collect::<Result<Vec<_>, _>>()?;
        ordering::sort_for_listing(&self.layout, &mut cards);

        Span::current().record("card_count", cards.len());
        Ok(cards)
    }

    #[instrument(skip(self), fields(card_id = %card_id), err)]
    pub async fn fetch_card(&self, card_id: CardId) -> Result<Card, BoardStoreError> {
        let row = sqlx::query(&format!("SELECT {CARD_COLUMNS} FROM cards WHERE id = $1"))
            .bind(card_id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_card", e))?;

        match row {
            Some(row) => card_from_row(&row),
            None => Err(BoardStoreError::not_found(card_id)),
        }
    }

    #[instrument(skip(self, command), err)]
    pub async fn insert_card(&self, command: CreateCard) -> Result<Card, BoardStoreError> {
        let title = validate_title(command.title())?;
        let intake = self.layout.intake();

        let mut tx = self.begin().await?;
        lock_lane(&mut tx, intake).await?;
        let stats = lane_stats(&mut tx, intake, None).await?;
        let position = next_intake_position(stats.max_position)?;

        let row = sqlx::query(&format!(
            r#"
            INSERT INTO cards (id, title, lane, position, created_at, background_color, text_color)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {CARD_COLUMNS}
            "#
        ))
        .bind(CardId::new().as_uuid())
        .bind(&title)
        .bind(intake.as_str())
        .bind(position)
        .bind(command.created_at())
        .bind(command.styling().background_color.as_deref())
        .bind(command.styling().text_color.as_deref())
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("insert_card", e))?;
        let card = card_from_row(&row)?;

        commit(tx).await?;
        Ok(card)
    }

    #[instrument(skip(self), fields(card_id = %card_id, target_lane = %target_lane), err)]
    pub async fn move_card(&self, card_id: CardId, target_lane: LaneId) -> Result<Card, BoardStoreError> {
        let mut tx = self.begin().await?;

        let row = sqlx::query(&format!(
            "SELECT {CARD_COLUMNS} FROM cards WHERE id = $1 FOR UPDATE"
        ))
        .bind(card_id.as_uuid())
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("lock_card", e))?;
        let current = match row {
            Some(row) => card_from_row(&row)?,
            None => return Err(BoardStoreError::not_found(card_id)),
        };
        if current.lane == target_lane {
            commit(tx).await?;
            return Ok(current);
        }

        lock_lane(&mut tx, target_lane).await?;
        let stats = lane_stats(&mut tx, target_lane, Some(card_id)).await?;
        let lane = self.layout.lane(target_lane);
        if !capacity_check(lane, stats.occupants + 1) {
            return Err(BoardStoreError::capacity(target_lane));
        }
        let position = entry_position(lane, stats.max_position)?;

        let row = sqlx::query(&format!(
            "UPDATE cards SET lane = $1, position = $2 WHERE id = $3 RETURNING {CARD_COLUMNS}"
        ))
        .bind(target_lane.as_str())
        .bind(position)
        .bind(card_id.as_uuid())
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("move_card", e))?;
        let moved = card_from_row(&row)?;

        commit(tx).await?;
        Ok(moved)
    }

    #[instrument(skip(self, command), fields(update_count = command.updates().len()), err)]
    pub async fn apply_reorder(&self, command: ReorderLane) -> Result<usize, BoardStoreError> {
        let ids: Vec<Uuid> = command.updates().iter().map(|u| *u.card_id.as_uuid()).collect();

        let mut tx = self.begin().await?;

        // Row locks are taken in id order so concurrent reorders cannot deadlock.
        let rows = sqlx::query("SELECT id, lane FROM cards WHERE id = ANY($1) ORDER BY id FOR UPDATE")
            .bind(&ids)
            .fetch_all(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("lock_reorder_cards", e))?;
        let mut lanes: HashMap<Uuid, LaneId> = HashMap::with_capacity(rows.len());
        for row in &rows {
            let id: Uuid = row.try_get("id").map_err(|e| map_sqlx_error("read_id", e))?;
            let lane: String = row.try_get("lane").map_err(|e| map_sqlx_error("read_lane", e))?;
            lanes.insert(id, parse_lane(&lane)?);
        }

        let mut current_lanes = Vec::with_capacity(command.updates().len());
        for update in command.updates() {
            match lanes.get(update.card_id.as_uuid()) {
                Some(lane) => current_lanes.push((update.card_id, *lane)),
                None => return Err(BoardStoreError::not_found(update.card_id)),
            }
        }
        let Some(lane) = reorder_target_lane(command.lane(), current_lanes)? else {
            commit(tx).await?;
            return Ok(0);
        };

        lock_lane(&mut tx, lane).await?;
        let untouched = sqlx::query_scalar::<_, i64>(
            "SELECT position FROM cards WHERE lane = $1 AND NOT (id = ANY($2))",
        )
        .bind(lane.as_str())
        .bind(&ids)
        .fetch_all(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("lane_positions", e))?;
        check_reorder_positions(lane, untouched, command.updates())?;

        for update in command.updates() {
            sqlx::query("UPDATE cards SET position = $1 WHERE id = $2")
                .bind(update.position)
                .bind(update.card_id.as_uuid())
                .execute(&mut *tx)
                .await
                .map_err(|e| map_sqlx_error("update_position", e))?;
        }

        commit(tx).await?;
        Ok(command.updates().len())
    }

    #[instrument(skip(self), fields(card_id = %card_id), err)]
    pub async fn remove_card(&self, card_id: CardId) -> Result<(), BoardStoreError> {
        let result = sqlx::query("DELETE FROM cards WHERE id = $1")
            .bind(card_id.as_uuid())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_card", e))?;

        if result.rows_affected() == 0 {
            return Err(BoardStoreError::not_found(card_id));
        }
        Ok(())
    }

    async fn begin(&self) -> Result<Transaction<'static, Postgres>, BoardStoreError> {
        self.pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))
    }
}

#[async_trait::async_trait]
impl BoardStore for PostgresBoardStore {
    fn layout(&self) -> &BoardLayout {
        &self.layout
    }

    async fn list_all(&self) -> Result<Vec<Card>, BoardStoreError> {
        self.fetch_all_cards().await
    }

    async fn get(&self, card_id: CardId) -> Result<Card, BoardStoreError> {
        self.fetch_card(card_id).await
    }

    async fn create(&self, command: CreateCard) -> Result<Card, BoardStoreError> {
        self.insert_card(command).await
    }

    async fn transition(&self, card_id: CardId, target_lane: LaneId) -> Result<Card, BoardStoreError> {
        self.move_card(card_id, target_lane).await
    }

    async fn reorder(&self, command: ReorderLane) -> Result<usize, BoardStoreError> {
        self.apply_reorder(command).await
    }

    async fn delete(&self, card_id: CardId) -> Result<(), BoardStoreError> {
        self.remove_card(card_id).await
    }
}

/// Occupancy of a lane as seen inside a transaction.
#[derive(Debug, Clone, Copy)]
struct LaneStats {
    occupants: usize,
    max_position: Option<i64>,
}

/// Serialize writers that add cards to `lane` until the transaction ends.
async fn lock_lane(tx: &mut Transaction<'_, Postgres>, lane: LaneId) -> Result<(), BoardStoreError> {
    sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1)::bigint)")
        .bind(format!("laundry.lane.{lane}"))
        .execute(&mut **tx)
        .await
        .map_err(|e| map_sqlx_error("lock_lane", e))?;
    Ok(())
}

async fn lane_stats(
    tx: &mut Transaction<'_, Postgres>,
    lane: LaneId,
    except: Option<CardId>,
) -> Result<LaneStats, BoardStoreError> {
    let row = sqlx::query(
        r#"
        SELECT COUNT(*) AS occupants, MAX(position) AS max_position
        FROM cards
        WHERE lane = $1 AND ($2::uuid IS NULL OR id <> $2)
        "#,
    )
    .bind(lane.as_str())
    .bind(except.map(|id| *id.as_uuid()))
    .fetch_one(&mut **tx)
    .await
    .map_err(|e| map_sqlx_error("lane_stats", e))?;

    let occupants: i64 = row
        .try_get("occupants")
        .map_err(|e| map_sqlx_error("read_occupants", e))?;
    let max_position: Option<i64> = row
        .try_get("max_position")
        .map_err(|e| map_sqlx_error("read_max_position", e))?;

    Ok(LaneStats {
        occupants: occupants.max(0) as usize,
        max_position,
    })
}

async fn commit(tx: Transaction<'_, Postgres>) -> Result<(), BoardStoreError> {
    tx.commit()
        .await
        .map_err(|e| map_sqlx_error("commit_transaction", e))
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> BoardStoreError {
    match err {
        sqlx::Error::Database(db_err) => BoardStoreError::store(format!(
            "database error in {}: {}",
            operation,
            db_err.message()
        )),
        sqlx::Error::PoolClosed => {
            BoardStoreError::store(format!("connection pool closed in {operation}"))
        }
        other => BoardStoreError::store(format!("{operation} failed: {other}")),
    }
}

fn parse_lane(raw: &str) -> Result<LaneId, BoardStoreError> {
    raw.parse::<LaneId>()
        .map_err(|_| BoardStoreError::store(format!("stored card has unknown lane '{raw}'")))
}

// SQLx row types

#[derive(Debug)]
struct CardRow {
    id: Uuid,
    title: String,
    lane: String,
    position: i64,
    created_at: DateTime<Utc>,
    background_color: Option<String>,
    text_color: Option<String>,
}

impl<'r> FromRow<'r, PgRow> for CardRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(CardRow {
            id: row.try_get("id")?,
            title: row.try_get("title")?,
            lane: row.try_get("lane")?,
            position: row.try_get("position")?,
            created_at: row.try_get("created_at")?,
            background_color: row.try_get("background_color")?,
            text_color: row.try_get("text_color")?,
        })
    }
}

impl TryFrom<CardRow> for Card {
    type Error = BoardStoreError;

    fn try_from(row: CardRow) -> Result<Self, Self::Error> {
        Ok(Card {
            id: CardId::from_uuid(row.id),
            title: row.title,
            lane: parse_lane(&row.lane)?,
            position: row.position,
            created_at: row.created_at,
            styling: CardStyling {
                background_color: row.background_color,
                text_color: row.text_color,
            },
        })
    }
}

fn card_from_row(row: &PgRow) -> Result<Card, BoardStoreError> {
    CardRow::from_row(row)
        .map_err(|e| map_sqlx_error("decode_card", e))?
        .try_into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use laundry_board::PositionUpdate;
    use std::sync::OnceLock;
    use tokio::sync::MutexGuard;

    /// Tests share one `cards` table; each holds this guard for its whole run.
    fn table_lock() -> &'static tokio::sync::Mutex<()> {
        static LOCK: OnceLock<tokio::sync::Mutex<()>> = OnceLock::new();
        LOCK.get_or_init(|| tokio::sync::Mutex::new(()))
    }

    /// Connect to `DATABASE_URL` on a fresh table, or skip when it is unset.
    async fn store_or_skip() -> Option<(PostgresBoardStore, MutexGuard<'static, ()>)> {
        let url = std::env::var("DATABASE_URL").ok()?;
        let guard = table_lock().lock().await;
        let store = PostgresBoardStore::connect(&url, BoardLayout::laundry())
            .await
            .expect("failed to connect to DATABASE_URL");
        sqlx::query("TRUNCATE cards")
            .execute(&*store.pool)
            .await
            .expect("failed to truncate cards");
        Some((store, guard))
    }

    fn reorder_cmd(lane: Option<LaneId>, updates: &[(CardId, i64)]) -> ReorderLane {
        ReorderLane::new(
            lane,
            updates
                .iter()
                .map(|(card_id, position)| PositionUpdate {
                    card_id: *card_id,
                    position: *position,
                })
                .collect(),
        )
        .unwrap()
    }

    fn create_cmd(title: &str) -> CreateCard {
        CreateCard::new(title, CardStyling::default(), Utc::now()).unwrap()
    }

    #[test]
    fn unknown_stored_lanes_are_store_errors() {
        assert!(matches!(parse_lane("spin"), Err(BoardStoreError::Store(_))));
        assert_eq!(parse_lane("fold").unwrap(), LaneId::Fold);
    }

    #[test]
    fn rows_convert_to_cards() {
        let id = Uuid::now_v7();
        let card = Card::try_from(CardRow {
            id,
            title: "Whites".to_string(),
            lane: "washer".to_string(),
            position: 0,
            created_at: Utc::now(),
            background_color: Some("#fff".to_string()),
            text_color: None,
        })
        .unwrap();
        assert_eq!(card.id, CardId::from_uuid(id));
        assert_eq!(card.lane, LaneId::Washer);
        assert_eq!(card.styling.background_color.as_deref(), Some("#fff"));
    }

    #[tokio::test]
    async fn postgres_store_enforces_board_rules() {
        let Some((store, _guard)) = store_or_skip().await else {
            return;
        };

        let whites = store.create(create_cmd("Whites")).await.unwrap();
        let darks = store.create(create_cmd("Darks")).await.unwrap();
        assert_eq!((whites.position, darks.position), (1, 2));

        store.transition(whites.id, LaneId::Washer).await.unwrap();
        let err = store.transition(darks.id, LaneId::Washer).await.unwrap_err();
        assert_eq!(err, BoardStoreError::capacity(LaneId::Washer));
        store.transition(whites.id, LaneId::Dryer).await.unwrap();
        store.transition(darks.id, LaneId::Washer).await.unwrap();

        let a = store.create(create_cmd("A")).await.unwrap();
        let b = store.create(create_cmd("B")).await.unwrap();
        let cmd = reorder_cmd(Some(LaneId::Queue), &[(a.id, 1), (b.id, 0)]);
        assert_eq!(store.reorder(cmd).await.unwrap(), 2);
        let queue: Vec<String> = store
            .list_all()
            .await
            .unwrap()
            .into_iter()
            .filter(|c| c.lane == LaneId::Queue)
            .map(|c| c.title)
            .collect();
        assert_eq!(queue, vec!["B", "A"]);

        store.delete(a.id).await.unwrap();
        assert!(matches!(
            store.delete(a.id).await.unwrap_err(),
            BoardStoreError::NotFound(_)
        ));
        assert_eq!(store.get(b.id).await.unwrap().position, 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn postgres_racing_transitions_into_a_single_card_lane_admit_exactly_one() {
        let Some((store, _guard)) = store_or_skip().await else {
            return;
        };
        let mut ids = Vec::new();
        for i in 0..8 {
            ids.push(store.create(create_cmd(&format!("load {i}"))).await.unwrap().id);
        }

        let mut handles = Vec::new();
        for id in ids {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.transition(id, LaneId::Washer).await
            }));
        }

        let mut successes = 0;
        let mut rejections = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => successes += 1,
                Err(BoardStoreError::Capacity(lane)) => {
                    assert_eq!(lane, "washer");
                    rejections += 1;
                }
                Err(other) => panic!("unexpected error: {other:?}"),
            }
        }
        assert_eq!(successes, 1);
        assert_eq!(rejections, 7);

        let washer = store
            .list_all()
            .await
            .unwrap()
            .into_iter()
            .filter(|c| c.lane == LaneId::Washer)
            .count();
        assert_eq!(washer, 1);
    }

    #[tokio::test]
    async fn postgres_reorder_with_unknown_card_changes_nothing() {
        let Some((store, _guard)) = store_or_skip().await else {
            return;
        };
        let a = store.create(create_cmd("A")).await.unwrap();
        let b = store.create(create_cmd("B")).await.unwrap();
        let before = store.list_all().await.unwrap();

        let err = store
            .reorder(reorder_cmd(None, &[(a.id, 10), (b.id, 11), (CardId::new(), 12)]))
            .await
            .unwrap_err();
        assert!(matches!(err, BoardStoreError::NotFound(_)));
        assert_eq!(store.list_all().await.unwrap(), before);
    }

    #[tokio::test]
    async fn postgres_reorder_across_lanes_is_rejected() {
        let Some((store, _guard)) = store_or_skip().await else {
            return;
        };
        let a = store.create(create_cmd("A")).await.unwrap();
        let b = store.create(create_cmd("B")).await.unwrap();
        store.transition(b.id, LaneId::Washer).await.unwrap();
        let before = store.list_all().await.unwrap();

        let err = store
            .reorder(reorder_cmd(None, &[(a.id, 5), (b.id, 6)]))
            .await
            .unwrap_err();
        assert!(matches!(err, BoardStoreError::Validation(_)));

        let err = store
            .reorder(reorder_cmd(Some(LaneId::Dryer), &[(a.id, 5)]))
            .await
            .unwrap_err();
        assert!(matches!(err, BoardStoreError::Validation(_)));
        assert_eq!(store.list_all().await.unwrap(), before);
    }

    #[tokio::test]
    async fn postgres_reorder_may_not_collide_with_untouched_cards() {
        let Some((store, _guard)) = store_or_skip().await else {
            return;
        };
        let a = store.create(create_cmd("A")).await.unwrap();
        let b = store.create(create_cmd("B")).await.unwrap();
        let c = store.create(create_cmd("C")).await.unwrap();
        let before = store.list_all().await.unwrap();

        let err = store
            .reorder(reorder_cmd(None, &[(a.id, 3), (b.id, 4)]))
            .await
            .unwrap_err();
        assert!(matches!(err, BoardStoreError::Validation(_)));
        assert_eq!(store.list_all().await.unwrap(), before);
        assert_eq!(store.get(c.id).await.unwrap().position, 3);
    }

    #[tokio::test]
    async fn postgres_queue_topped_at_i64_max_rejects_appends() {
        let Some((store, _guard)) = store_or_skip().await else {
            return;
        };
        let a = store.create(create_cmd("A")).await.unwrap();
        store.reorder(reorder_cmd(None, &[(a.id, i64::MAX)])).await.unwrap();

        let err = store.create(create_cmd("B")).await.unwrap_err();
        assert!(matches!(err, BoardStoreError::Validation(_)));
        assert_eq!(store.list_all().await.unwrap().len(), 1);
    }
}
