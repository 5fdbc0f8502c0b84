use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use crate::domain::models::Group;
use crate::errors::Result;

use super::connection::Db;

#[derive(Clone)]
pub struct GroupRepository {
    db: Db,
}

fn row_to_group(row: &SqliteRow) -> Group {
    Group {
        id: row.get("id"),
        name: row.get("name"),
    }
}

impl GroupRepository {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    pub async fn store(&self, group: &Group) -> Result<()> {
        sqlx::query("INSERT INTO groups (id, name) VALUES (?, ?)")
            .bind(&group.id)
            .bind(&group.name)
            .execute(self.db.pool())
            .await?;
        Ok(())
    }

    pub async fn get(&self, group_id: &str) -> Result<Option<Group>> {
        let row = sqlx::query("SELECT id, name FROM groups WHERE id = ?")
            .bind(group_id)
            .fetch_optional(self.db.pool())
            .await?;
        Ok(row.as_ref().map(row_to_group))
    }

    pub async fn list(&self) -> Result<Vec<Group>> {
        let rows = sqlx::query("SELECT id, name FROM groups ORDER BY name, id")
            .fetch_all(self.db.pool())
            .await?;
        Ok(rows.iter().map(row_to_group).collect())
    }

    pub async fn update(&self, group: &Group) -> Result<bool> {
        let result = sqlx::query("UPDATE groups SET name = ? WHERE id = ?")
            .bind(&group.name)
            .bind(&group.id)
            .execute(self.db.pool())
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn delete(&self, group_id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM groups WHERE id = ?")
            .bind(group_id)
            .execute(self.db.pool())
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
