use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use crate::domain::models::Child;
use crate::errors::Result;

use super::connection::Db;

#[derive(Clone)]
pub struct ChildRepository {
    db: Db,
}

fn row_to_child(row: &SqliteRow) -> Child {
    Child {
        id: row.get("id"),
        full_name: row.get("full_name"),
        group_id: row.get("group_id"),
        balance: row.get("balance"),
    }
}

impl ChildRepository {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    pub async fn store(&self, child: &Child) -> Result<()> {
        sqlx::query("INSERT INTO children (id, full_name, group_id, balance) VALUES (?, ?, ?, ?)")
            .bind(&child.id)
            .bind(&child.full_name)
            .bind(&child.group_id)
            .bind(child.balance)
            .execute(self.db.pool())
            .await?;
        Ok(())
    }

    pub async fn get(&self, child_id: &str) -> Result<Option<Child>> {
        let row = sqlx::query("SELECT id, full_name, group_id, balance FROM children WHERE id = ?")
            .bind(child_id)
            .fetch_optional(self.db.pool())
            .await?;
        Ok(row.as_ref().map(row_to_child))
    }

    /// Full roster, ordered by name for stable listings.
    pub async fn list(&self) -> Result<Vec<Child>> {
        let rows = sqlx::query("SELECT id, full_name, group_id, balance FROM children ORDER BY full_name, id")
            .fetch_all(self.db.pool())
            .await?;
        Ok(rows.iter().map(row_to_child).collect())
    }

    /// Update name and group membership. Balance is never written through
    /// this path; it only moves with events and rollover resets.
    pub async fn update(&self, child: &Child) -> Result<bool> {
        let result = sqlx::query("UPDATE children SET full_name = ?, group_id = ? WHERE id = ?")
            .bind(&child.full_name)
            .bind(&child.group_id)
            .bind(&child.id)
            .execute(self.db.pool())
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Direct balance write, used only by the startup reconciliation.
    pub async fn set_balance(&self, child_id: &str, balance: i64) -> Result<()> {
        sqlx::query("UPDATE children SET balance = ? WHERE id = ?")
            .bind(balance)
            .bind(child_id)
            .execute(self.db.pool())
            .await?;
        Ok(())
    }

    pub async fn count_in_group(&self, group_id: &str) -> Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS cnt FROM children WHERE group_id = ?")
            .bind(group_id)
            .fetch_one(self.db.pool())
            .await?;
        Ok(row.get("cnt"))
    }

    /// Delete the child and, in the same transaction, every event of the
    /// child. Irreversible.
    pub async fn delete_cascade(&self, child_id: &str) -> Result<bool> {
        let mut tx = self.db.pool().begin().await?;
        sqlx::query("DELETE FROM events WHERE child_id = ?")
            .bind(child_id)
            .execute(&mut *tx)
            .await?;
        let result = sqlx::query("DELETE FROM children WHERE id = ?")
            .bind(child_id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::connection::test_support::open_test_db;

    #[tokio::test]
    async fn store_get_list_round_trip() {
        let handle = open_test_db().await;
        let repo = ChildRepository::new(handle.db.clone());

        let child = Child::new("Masha Ivanova", None);
        repo.store(&child).await.unwrap();

        let loaded = repo.get(&child.id).await.unwrap().unwrap();
        assert_eq!(loaded, child);
        assert_eq!(repo.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn get_missing_child_is_none() {
        let handle = open_test_db().await;
        let repo = ChildRepository::new(handle.db.clone());
        assert!(repo.get("child::missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn delete_cascade_removes_events_too() {
        let handle = open_test_db().await;
        let repo = ChildRepository::new(handle.db.clone());

        let child = Child::new("Petya Sidorov", None);
        repo.store(&child).await.unwrap();
        sqlx::query(
            "INSERT INTO events (id, child_id, action_id, credited, timestamp, kind, balance_after)
             VALUES ('event::1', ?, 'battery', 5, '2026-01-01T10:00:00.000000Z', 'action_credit', 5)",
        )
        .bind(&child.id)
        .execute(handle.db.pool())
        .await
        .unwrap();

        assert!(repo.delete_cascade(&child.id).await.unwrap());
        assert!(repo.get(&child.id).await.unwrap().is_none());

        let row = sqlx::query("SELECT COUNT(*) AS cnt FROM events")
            .fetch_one(handle.db.pool())
            .await
            .unwrap();
        let count: i64 = row.get("cnt");
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn delete_missing_child_reports_false() {
        let handle = open_test_db().await;
        let repo = ChildRepository::new(handle.db.clone());
        assert!(!repo.delete_cascade("child::missing").await.unwrap());
    }
}
