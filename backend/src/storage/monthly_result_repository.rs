//! Immutable monthly results.
//!
//! A month is closed in two stages: one `freeze_child` transaction per
//! child (snapshot row + balance reset, atomic, skipped when the row
//! already exists so a retry never double-resets), then one header insert
//! that marks the month closed. Both writes are INSERT OR IGNORE, so the
//! whole procedure is idempotent.

use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use crate::domain::models::{Child, MonthlyResult, MonthlyResultRow};
use crate::errors::Result;

use super::connection::Db;

#[derive(Clone)]
pub struct MonthlyResultRepository {
    db: Db,
}

fn row_to_result_row(row: &SqliteRow) -> MonthlyResultRow {
    MonthlyResultRow {
        child_id: row.get("child_id"),
        full_name: row.get("full_name"),
        group_id: row.get("group_id"),
        balance: row.get("balance"),
    }
}

impl MonthlyResultRepository {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    /// Whether the month already has a result header (i.e. is closed).
    pub async fn header_exists(&self, year: i32, month: u32) -> Result<bool> {
        let row = sqlx::query("SELECT 1 AS one FROM monthly_results WHERE year = ? AND month = ?")
            .bind(year)
            .bind(month as i64)
            .fetch_optional(self.db.pool())
            .await?;
        Ok(row.is_some())
    }

    /// Snapshot one child's pre-reset balance into the month and zero the
    /// working balance, in one transaction. Returns false (and resets
    /// nothing) when the child was already frozen for this month.
    pub async fn freeze_child(&self, year: i32, month: u32, child: &Child, frozen_at: &str) -> Result<bool> {
        let mut tx = self.db.pool().begin().await?;
        let inserted = sqlx::query(
            "INSERT OR IGNORE INTO monthly_result_rows
                 (year, month, child_id, full_name, group_id, balance, frozen_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(year)
        .bind(month as i64)
        .bind(&child.id)
        .bind(&child.full_name)
        .bind(&child.group_id)
        .bind(child.balance)
        .bind(frozen_at)
        .execute(&mut *tx)
        .await?
        .rows_affected()
            > 0;
        if inserted {
            sqlx::query("UPDATE children SET balance = 0 WHERE id = ?")
                .bind(&child.id)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(inserted)
    }

    pub async fn month_total(&self, year: i32, month: u32) -> Result<i64> {
        let row = sqlx::query(
            "SELECT COALESCE(SUM(balance), 0) AS total FROM monthly_result_rows
             WHERE year = ? AND month = ?",
        )
        .bind(year)
        .bind(month as i64)
        .fetch_one(self.db.pool())
        .await?;
        Ok(row.get("total"))
    }

    /// Mark the month closed. A no-op if the header already exists; the
    /// first writer wins and the record is never overwritten.
    pub async fn insert_header(&self, year: i32, month: u32, total_sum: i64, closed_at: &str) -> Result<()> {
        sqlx::query(
            "INSERT OR IGNORE INTO monthly_results (year, month, total_sum, closed_at)
             VALUES (?, ?, ?, ?)",
        )
        .bind(year)
        .bind(month as i64)
        .bind(total_sum)
        .bind(closed_at)
        .execute(self.db.pool())
        .await?;
        Ok(())
    }

    pub async fn rows_for(&self, year: i32, month: u32) -> Result<Vec<MonthlyResultRow>> {
        let rows = sqlx::query(
            "SELECT child_id, full_name, group_id, balance FROM monthly_result_rows
             WHERE year = ? AND month = ?
             ORDER BY balance DESC, full_name, child_id",
        )
        .bind(year)
        .bind(month as i64)
        .fetch_all(self.db.pool())
        .await?;
        Ok(rows.iter().map(row_to_result_row).collect())
    }

    /// All closed months, newest first, frozen rows ordered as a
    /// leaderboard (balance descending).
    pub async fn list(&self) -> Result<Vec<MonthlyResult>> {
        let headers = sqlx::query(
            "SELECT year, month, total_sum FROM monthly_results ORDER BY year DESC, month DESC",
        )
        .fetch_all(self.db.pool())
        .await?;

        let mut results = Vec::with_capacity(headers.len());
        for header in &headers {
            let year: i64 = header.get("year");
            let month: i64 = header.get("month");
            let rows = self.rows_for(year as i32, month as u32).await?;
            results.push(MonthlyResult {
                year: year as i32,
                month: month as u32,
                children: rows,
                total_sum: header.get("total_sum"),
            });
        }
        Ok(results)
    }

    pub async fn get(&self, year: i32, month: u32) -> Result<Option<MonthlyResult>> {
        let header = sqlx::query(
            "SELECT total_sum FROM monthly_results WHERE year = ? AND month = ?",
        )
        .bind(year)
        .bind(month as i64)
        .fetch_optional(self.db.pool())
        .await?;
        match header {
            Some(h) => Ok(Some(MonthlyResult {
                year,
                month,
                children: self.rows_for(year, month).await?,
                total_sum: h.get("total_sum"),
            })),
            None => Ok(None),
        }
    }

    /// The child's most recent rollover boundary, if any. Events after it
    /// constitute the child's working balance.
    pub async fn latest_frozen_at(&self, child_id: &str) -> Result<Option<String>> {
        let row = sqlx::query(
            "SELECT MAX(frozen_at) AS frozen_at FROM monthly_result_rows WHERE child_id = ?",
        )
        .bind(child_id)
        .fetch_one(self.db.pool())
        .await?;
        Ok(row.get("frozen_at"))
    }
}
