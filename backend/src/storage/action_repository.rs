use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use crate::domain::models::Action;
use crate::errors::Result;

use super::connection::Db;

#[derive(Clone)]
pub struct ActionRepository {
    db: Db,
}

fn row_to_action(row: &SqliteRow) -> Action {
    Action {
        id: row.get("id"),
        name: row.get("name"),
        credit: row.get("credit"),
        cooldown_secs: row.get("cooldown_secs"),
        daily_cap: row.get("daily_cap"),
    }
}

impl ActionRepository {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    pub async fn get(&self, action_id: &str) -> Result<Option<Action>> {
        let row = sqlx::query(
            "SELECT id, name, credit, cooldown_secs, daily_cap FROM actions WHERE id = ?",
        )
        .bind(action_id)
        .fetch_optional(self.db.pool())
        .await?;
        Ok(row.as_ref().map(row_to_action))
    }

    pub async fn list(&self) -> Result<Vec<Action>> {
        let rows = sqlx::query(
            "SELECT id, name, credit, cooldown_secs, daily_cap FROM actions ORDER BY id",
        )
        .fetch_all(self.db.pool())
        .await?;
        Ok(rows.iter().map(row_to_action).collect())
    }

    /// Overwrite one catalog entry. Test and operations tooling only; the
    /// catalog is not mutated by ordinary play.
    pub async fn upsert(&self, action: &Action) -> Result<()> {
        sqlx::query(
            "INSERT OR REPLACE INTO actions (id, name, credit, cooldown_secs, daily_cap)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&action.id)
        .bind(&action.name)
        .bind(action.credit)
        .bind(action.cooldown_secs)
        .bind(action.daily_cap)
        .execute(self.db.pool())
        .await?;
        Ok(())
    }
}
