//! Group registry. Creation and deletion are reserved to the admin role;
//! deletion additionally requires the group to own no children (checked,
//! never cascaded).

use tracing::info;

use crate::domain::commands::Role;
use crate::domain::models::Group;
use crate::errors::{LedgerError, Result};
use crate::storage::{ChildRepository, Db, GroupRepository};

#[derive(Clone)]
pub struct GroupService {
    groups: GroupRepository,
    children: ChildRepository,
}

impl GroupService {
    pub fn new(db: Db) -> Self {
        Self {
            groups: GroupRepository::new(db.clone()),
            children: ChildRepository::new(db),
        }
    }

    pub async fn list_groups(&self) -> Result<Vec<Group>> {
        self.groups.list().await
    }

    pub async fn create_group(&self, name: &str, role: Role) -> Result<Group> {
        if role != Role::Admin {
            return Err(LedgerError::Forbidden("only an admin may create groups".to_string()));
        }
        let name = validated_name(name)?;

        let group = Group::new(name);
        self.groups.store(&group).await?;
        info!("created group {} ({})", group.name, group.id);
        Ok(group)
    }

    /// Rename. Allowed for both roles.
    pub async fn update_group(&self, group_id: &str, name: &str) -> Result<Group> {
        let mut group = self
            .groups
            .get(group_id)
            .await?
            .ok_or_else(|| LedgerError::not_found("group", group_id))?;
        group.name = validated_name(name)?;
        self.groups.update(&group).await?;
        info!("renamed group {} to {}", group.id, group.name);
        Ok(group)
    }

    pub async fn delete_group(&self, group_id: &str, role: Role) -> Result<()> {
        if role != Role::Admin {
            return Err(LedgerError::Forbidden("only an admin may delete groups".to_string()));
        }
        if self.groups.get(group_id).await?.is_none() {
            return Err(LedgerError::not_found("group", group_id));
        }
        let owned = self.children.count_in_group(group_id).await?;
        if owned > 0 {
            return Err(LedgerError::Conflict(format!(
                "group still has {owned} children; move or delete them first"
            )));
        }
        self.groups.delete(group_id).await?;
        info!("deleted group {}", group_id);
        Ok(())
    }
}

fn validated_name(raw: &str) -> Result<String> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(LedgerError::InvalidInput("group name is required".to_string()));
    }
    Ok(name.to_string())
}
