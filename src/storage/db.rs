// src/storage/db.rs
// Manages the SQLite database for storing card states.

use std::path::Path;
use std::time::Duration;

use rusqlite::{params, Connection, OptionalExtension, Row, TransactionBehavior};

use crate::card::{CardKey, CardRecord, Quality};
use crate::clock::Clock;
use crate::debug::OpTimer;
use crate::error::StoreError;
use crate::scheduler::{Scheduler, SchedulingResult};

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const SELECT_COLUMNS: &str = "question_id, state, current_step, ease_factor, interval, repetitions, lapses,
     last_review_date, last_answered, next_review, times_answered, times_correct, starred";

pub struct CardStore {
    conn: Connection,
}

impl CardStore {
    /// Opens (or creates) the database file at `path`.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.busy_timeout(BUSY_TIMEOUT)?;
        let store = CardStore { conn };
        store.init_schema()?;
        Ok(store)
    }

    /// Creates the necessary tables if they don't already exist.
    fn init_schema(&self) -> Result<(), StoreError> {
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS card_state (
                user_id          TEXT NOT NULL,
                question_id      INTEGER NOT NULL,
                state            TEXT NOT NULL,
                current_step     INTEGER NOT NULL,
                ease_factor      REAL NOT NULL,
                interval         REAL NOT NULL,
                repetitions      INTEGER NOT NULL,
                lapses           INTEGER NOT NULL,
                last_review_date TEXT,
                last_answered    TEXT,
                next_review      TEXT,
                times_answered   INTEGER NOT NULL,
                times_correct    INTEGER NOT NULL,
                starred          INTEGER NOT NULL DEFAULT 0,
                PRIMARY KEY (user_id, question_id)
            )",
            [],
        )?;
        log::debug!("card_state schema ready");
        Ok(())
    }

    pub fn load(&self, key: &CardKey) -> Result<Option<CardRecord>, StoreError> {
        load_card(&self.conn, key)
    }

    /// Whether the store already holds a record for `key`.
    pub fn contains(&self, key: &CardKey) -> Result<bool, StoreError> {
        let found = self
            .conn
            .query_row(
                "SELECT 1 FROM card_state WHERE user_id = ?1 AND question_id = ?2",
                params![key.user_id, key.question_id],
                |_| Ok(()),
            )
            .optional()?;
        Ok(found.is_some())
    }

    /// Writes a card record, replacing any previous one for the same key.
    pub fn upsert(&self, key: &CardKey, card: &CardRecord) -> Result<(), StoreError> {
        write_card(&self.conn, key, card)
    }

    /// Stars or un-stars a question, creating a fresh record if none exists yet.
    pub fn set_starred<S: Scheduler>(
        &mut self,
        key: &CardKey,
        starred: bool,
        scheduler: &S,
    ) -> Result<CardRecord, StoreError> {
        let tx = self.conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let mut card = load_card(&tx, key)?.unwrap_or_else(|| CardRecord::new(scheduler.config()));
        card.starred = starred;
        write_card(&tx, key, &card)?;
        tx.commit()?;
        Ok(card)
    }

    /// All records belonging to a user, ordered by question id.
    pub fn cards_for_user(&self, user_id: &str) -> Result<Vec<(i64, CardRecord)>, StoreError> {
        let sql = format!(
            "SELECT {} FROM card_state WHERE user_id = ?1 ORDER BY question_id",
            SELECT_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params![user_id])?;

        let mut cards = Vec::new();
        while let Some(row) = rows.next()? {
            let question_id: i64 = row.get("question_id")?;
            cards.push((question_id, card_from_row(row)?));
        }
        Ok(cards)
    }

    /// Loads, schedules and writes back one card as a single immediate transaction.
    ///
    /// Concurrent reviews of the same key through other connections wait on the write lock,
    /// so every review sees the result of the previous one. A key with no record yet is
    /// scheduled as a new card.
    pub fn review<S: Scheduler>(
        &mut self,
        key: &CardKey,
        scheduler: &S,
        quality: Quality,
        response_time_ms: Option<u64>,
        clock: &dyn Clock,
    ) -> Result<(CardRecord, SchedulingResult), StoreError> {
        let _timer = OpTimer::start(format!("review of {}", key));

        let tx = self.conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let card = load_card(&tx, key)?.unwrap_or_else(|| CardRecord::new(scheduler.config()));
        let (updated, result) = scheduler.schedule(&card, quality, response_time_ms, clock.now())?;
        write_card(&tx, key, &updated)?;
        tx.commit()?;

        log::debug!(
            "Committed review for {}: {} -> {}, next in {:.3} days",
            key,
            result.from_state,
            result.to_state,
            result.next_interval
        );
        Ok((updated, result))
    }
}

fn load_card(conn: &Connection, key: &CardKey) -> Result<Option<CardRecord>, StoreError> {
    let sql = format!(
        "SELECT {} FROM card_state WHERE user_id = ?1 AND question_id = ?2",
        SELECT_COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query(params![key.user_id, key.question_id])?;
    match rows.next()? {
        Some(row) => Ok(Some(card_from_row(row)?)),
        None => Ok(None),
    }
}

// Position of `current_step` in SELECT_COLUMNS.
const CURRENT_STEP_COLUMN: usize = 2;

fn card_from_row(row: &Row<'_>) -> Result<CardRecord, StoreError> {
    let state: String = row.get("state")?;
    let raw_step: i64 = row.get("current_step")?;
    let current_step = usize::try_from(raw_step)
        .map_err(|_| rusqlite::Error::IntegralValueOutOfRange(CURRENT_STEP_COLUMN, raw_step))?;
    Ok(CardRecord {
        state: state.parse()?,
        current_step,
        ease_factor: row.get("ease_factor")?,
        interval: row.get("interval")?,
        repetitions: row.get("repetitions")?,
        lapses: row.get("lapses")?,
        last_review_date: row.get("last_review_date")?,
        last_answered: row.get("last_answered")?,
        next_review: row.get("next_review")?,
        times_answered: row.get("times_answered")?,
        times_correct: row.get("times_correct")?,
        starred: row.get("starred")?,
    })
}

/// Uses `INSERT OR REPLACE` to handle both new and existing cards.
fn write_card(conn: &Connection, key: &CardKey, card: &CardRecord) -> Result<(), StoreError> {
    conn.execute(
        "INSERT OR REPLACE INTO card_state (
            user_id, question_id, state, current_step, ease_factor, interval, repetitions, lapses,
            last_review_date, last_answered, next_review, times_answered, times_correct, starred
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
        params![
            key.user_id,
            key.question_id,
            card.state.as_str(),
            card.current_step as i64,
            card.ease_factor,
            card.interval,
            card.repetitions,
            card.lapses,
            card.last_review_date,
            card.last_answered,
            card.next_review,
            card.times_answered,
            card.times_correct,
            card.starred,
        ],
    )?;
    Ok(())
}
