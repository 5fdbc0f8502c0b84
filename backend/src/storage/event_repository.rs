//! Append-only event log plus the cached balance it feeds.
//!
//! `append` is the only gameplay/adjustment write path: the event insert
//! and the child's balance update commit in one SQLite transaction, so a
//! failed write leaves no partial state.

use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use crate::domain::models::{Event, EventKind};
use crate::errors::{LedgerError, Result};

use super::connection::Db;

/// Windowed per-child aggregate over the event log.
#[derive(Debug, Clone, PartialEq)]
pub struct PeriodTotals {
    pub child_id: String,
    pub credited: i64,
    pub events: i64,
}

#[derive(Clone)]
pub struct EventRepository {
    db: Db,
}

fn row_to_event(row: &SqliteRow) -> Result<Event> {
    let kind_str: String = row.get("kind");
    let kind = EventKind::parse(&kind_str).ok_or_else(|| {
        LedgerError::Storage(sqlx::Error::ColumnDecode {
            index: "kind".to_string(),
            source: format!("unknown event kind '{kind_str}'").into(),
        })
    })?;
    Ok(Event {
        id: row.get("id"),
        child_id: row.get("child_id"),
        action_id: row.get("action_id"),
        credited: row.get("credited"),
        timestamp: row.get("timestamp"),
        kind,
        comment: row.get("comment"),
        actor: row.get("actor"),
        balance_after: row.get("balance_after"),
    })
}

fn rows_to_events(rows: &[SqliteRow]) -> Result<Vec<Event>> {
    rows.iter().map(row_to_event).collect()
}

impl EventRepository {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    /// Append one event and move the child's cached balance to
    /// `event.balance_after`, atomically. Balances never go negative past
    /// this boundary.
    pub async fn append(&self, event: &Event) -> Result<()> {
        if event.balance_after < 0 {
            return Err(LedgerError::InvalidAmount(format!(
                "event would leave balance at {}",
                event.balance_after
            )));
        }

        let mut tx = self.db.pool().begin().await?;
        sqlx::query(
            "INSERT INTO events (id, child_id, action_id, credited, timestamp, kind, comment, actor, balance_after)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&event.id)
        .bind(&event.child_id)
        .bind(&event.action_id)
        .bind(event.credited)
        .bind(&event.timestamp)
        .bind(event.kind.as_str())
        .bind(&event.comment)
        .bind(&event.actor)
        .bind(event.balance_after)
        .execute(&mut *tx)
        .await?;
        sqlx::query("UPDATE children SET balance = ? WHERE id = ?")
            .bind(event.balance_after)
            .bind(&event.child_id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }

    /// Timestamp of the most recent gameplay credit for (child, action).
    pub async fn last_credit_timestamp(&self, child_id: &str, action_id: &str) -> Result<Option<String>> {
        let row = sqlx::query(
            "SELECT timestamp FROM events
             WHERE child_id = ? AND action_id = ? AND kind = 'action_credit'
             ORDER BY timestamp DESC LIMIT 1",
        )
        .bind(child_id)
        .bind(action_id)
        .fetch_optional(self.db.pool())
        .await?;
        Ok(row.map(|r| r.get("timestamp")))
    }

    /// Number of gameplay credits for (child, action) in `[from, to)`.
    pub async fn count_credits_between(
        &self,
        child_id: &str,
        action_id: &str,
        from: &str,
        to: &str,
    ) -> Result<i64> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS cnt FROM events
             WHERE child_id = ? AND action_id = ? AND kind = 'action_credit'
               AND timestamp >= ? AND timestamp < ?",
        )
        .bind(child_id)
        .bind(action_id)
        .bind(from)
        .bind(to)
        .fetch_one(self.db.pool())
        .await?;
        Ok(row.get("cnt"))
    }

    /// Events newest-first, with optional child and `[from, to)` bounds.
    /// Group filtering happens in the service over the roster.
    pub async fn list_filtered(
        &self,
        child_id: Option<&str>,
        from: Option<&str>,
        to: Option<&str>,
    ) -> Result<Vec<Event>> {
        let rows = sqlx::query(
            "SELECT id, child_id, action_id, credited, timestamp, kind, comment, actor, balance_after
             FROM events
             WHERE (? IS NULL OR child_id = ?)
               AND (? IS NULL OR timestamp >= ?)
               AND (? IS NULL OR timestamp < ?)
             ORDER BY timestamp DESC, id DESC",
        )
        .bind(child_id)
        .bind(child_id)
        .bind(from)
        .bind(from)
        .bind(to)
        .bind(to)
        .fetch_all(self.db.pool())
        .await?;
        rows_to_events(&rows)
    }

    /// Per-child credited sums and event counts within `[from, to)`.
    pub async fn period_totals(&self, from: Option<&str>, to: Option<&str>) -> Result<Vec<PeriodTotals>> {
        let rows = sqlx::query(
            "SELECT child_id, COALESCE(SUM(credited), 0) AS credited, COUNT(*) AS events
             FROM events
             WHERE (? IS NULL OR timestamp >= ?)
               AND (? IS NULL OR timestamp < ?)
             GROUP BY child_id",
        )
        .bind(from)
        .bind(from)
        .bind(to)
        .bind(to)
        .fetch_all(self.db.pool())
        .await?;
        Ok(rows
            .iter()
            .map(|r| PeriodTotals {
                child_id: r.get("child_id"),
                credited: r.get("credited"),
                events: r.get("events"),
            })
            .collect())
    }

    /// Sum of credited over a child's events strictly after `after`
    /// (or over all of them). This is the event-sourced balance.
    pub async fn sum_credited_after(&self, child_id: &str, after: Option<&str>) -> Result<i64> {
        let row = sqlx::query(
            "SELECT COALESCE(SUM(credited), 0) AS total FROM events
             WHERE child_id = ? AND (? IS NULL OR timestamp > ?)",
        )
        .bind(child_id)
        .bind(after)
        .bind(after)
        .fetch_one(self.db.pool())
        .await?;
        Ok(row.get("total"))
    }
}
