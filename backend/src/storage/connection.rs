//! Database bootstrap: create the SQLite file if missing, set up the
//! schema, seed the action catalog, and hand out the shared pool plus the
//! per-child lock registry.

use std::sync::Arc;

use once_cell::sync::Lazy;
use sqlx::{migrate::MigrateDatabase, Sqlite, SqlitePool};
use tokio::sync::Mutex as AsyncMutex;
use tracing::info;

use crate::domain::models::Action;
use crate::errors::Result;

use super::locks::ChildLocks;

/// Built-in crediting rules, recovered from the deployed catalog. The
/// daily cap is a count of credited uses per local calendar day.
pub static DEFAULT_ACTIONS: Lazy<Vec<Action>> = Lazy::new(|| {
    vec![
        Action {
            id: "crane".to_string(),
            name: "Turning off the tap".to_string(),
            credit: 1,
            cooldown_secs: 120,
            daily_cap: 20,
        },
        Action {
            id: "cardboard_box".to_string(),
            name: "Waste paper collection".to_string(),
            credit: 5,
            cooldown_secs: 120,
            daily_cap: 3,
        },
        Action {
            id: "battery".to_string(),
            name: "Battery drop-off".to_string(),
            credit: 5,
            cooldown_secs: 120,
            daily_cap: 2,
        },
        Action {
            id: "plastic_cap".to_string(),
            name: "Plastic caps".to_string(),
            credit: 3,
            cooldown_secs: 120,
            daily_cap: 6,
        },
        Action {
            id: "sorting".to_string(),
            name: "Waste sorting".to_string(),
            credit: 2,
            cooldown_secs: 120,
            daily_cap: 10,
        },
    ]
});

const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS groups (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS children (
        id TEXT PRIMARY KEY,
        full_name TEXT NOT NULL,
        group_id TEXT,
        balance INTEGER NOT NULL DEFAULT 0
    )",
    "CREATE TABLE IF NOT EXISTS actions (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        credit INTEGER NOT NULL,
        cooldown_secs INTEGER NOT NULL,
        daily_cap INTEGER NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS events (
        id TEXT PRIMARY KEY,
        child_id TEXT NOT NULL,
        action_id TEXT,
        credited INTEGER NOT NULL,
        timestamp TEXT NOT NULL,
        kind TEXT NOT NULL,
        comment TEXT,
        actor TEXT,
        balance_after INTEGER NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_events_child_action_ts
        ON events (child_id, action_id, timestamp)",
    "CREATE INDEX IF NOT EXISTS idx_events_ts ON events (timestamp)",
    "CREATE TABLE IF NOT EXISTS monthly_results (
        year INTEGER NOT NULL,
        month INTEGER NOT NULL,
        total_sum INTEGER NOT NULL,
        closed_at TEXT NOT NULL,
        PRIMARY KEY (year, month)
    )",
    "CREATE TABLE IF NOT EXISTS monthly_result_rows (
        year INTEGER NOT NULL,
        month INTEGER NOT NULL,
        child_id TEXT NOT NULL,
        full_name TEXT NOT NULL,
        group_id TEXT,
        balance INTEGER NOT NULL,
        frozen_at TEXT NOT NULL,
        PRIMARY KEY (year, month, child_id)
    )",
];

/// Shared database handle. Cheap to clone; all clones share the pool and
/// the lock registry.
#[derive(Clone)]
pub struct Db {
    pool: Arc<SqlitePool>,
    locks: Arc<ChildLocks>,
}

impl Db {
    /// Open (creating if necessary) the database at `url` and prepare it.
    pub async fn open(url: &str) -> Result<Self> {
        if !Sqlite::database_exists(url).await.unwrap_or(false) {
            Sqlite::create_database(url).await?;
        }

        let pool = SqlitePool::connect(url).await?;
        Self::setup_schema(&pool).await?;
        Self::seed_actions(&pool).await?;

        info!("database ready at {}", url);
        Ok(Self {
            pool: Arc::new(pool),
            locks: Arc::new(ChildLocks::default()),
        })
    }

    async fn setup_schema(pool: &SqlitePool) -> Result<()> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(pool).await?;
        }
        Ok(())
    }

    /// Insert the built-in action catalog, leaving any existing rows alone.
    async fn seed_actions(pool: &SqlitePool) -> Result<()> {
        for action in DEFAULT_ACTIONS.iter() {
            sqlx::query(
                "INSERT OR IGNORE INTO actions (id, name, credit, cooldown_secs, daily_cap)
                 VALUES (?, ?, ?, ?, ?)",
            )
            .bind(&action.id)
            .bind(&action.name)
            .bind(action.credit)
            .bind(action.cooldown_secs)
            .bind(action.daily_cap)
            .execute(pool)
            .await?;
        }
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// The async lock guarding all balance writes for one child.
    pub fn child_lock(&self, child_id: &str) -> Arc<AsyncMutex<()>> {
        self.locks.for_child(child_id)
    }

    pub fn forget_child_lock(&self, child_id: &str) {
        self.locks.forget(child_id);
    }
}
