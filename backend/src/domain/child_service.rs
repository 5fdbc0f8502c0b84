//! Child registry: create, rename/move, delete, list.
//!
//! Listing the roster is the hot read path of the game client, so it also
//! triggers the monthly rollover check — the first access in a new month
//! closes the previous one before any balance is shown.

use tracing::info;

use crate::domain::commands::{CreateChildCommand, UpdateChildCommand};
use crate::domain::models::Child;
use crate::domain::rollover_service::RolloverService;
use crate::errors::{LedgerError, Result};
use crate::storage::{ChildRepository, Db, GroupRepository};

const MAX_NAME_LEN: usize = 100;

#[derive(Clone)]
pub struct ChildService {
    db: Db,
    children: ChildRepository,
    groups: GroupRepository,
    rollover: RolloverService,
}

impl ChildService {
    pub fn new(db: Db) -> Self {
        Self {
            children: ChildRepository::new(db.clone()),
            groups: GroupRepository::new(db.clone()),
            rollover: RolloverService::new(db.clone()),
            db,
        }
    }

    pub async fn create_child(&self, command: CreateChildCommand) -> Result<Child> {
        let name = validated_name(&command.full_name)?;
        if let Some(group_id) = &command.group_id {
            self.require_group(group_id).await?;
        }

        let child = Child::new(name, command.group_id.clone());
        self.children.store(&child).await?;
        info!("created child {} ({})", child.full_name, child.id);
        Ok(child)
    }

    pub async fn get_child(&self, child_id: &str) -> Result<Child> {
        self.children
            .get(child_id)
            .await?
            .ok_or_else(|| LedgerError::not_found("child", child_id))
    }

    /// Roster, ordered by name. Triggers the rollover check first.
    pub async fn list_children(&self) -> Result<Vec<Child>> {
        self.rollover.close_month_if_due().await?;
        self.children.list().await
    }

    /// Rename and/or move a child. `group_id` always replaces the current
    /// membership; `None` leaves the child ungrouped.
    pub async fn update_child(&self, command: UpdateChildCommand) -> Result<Child> {
        let mut child = self.get_child(&command.child_id).await?;

        if let Some(full_name) = &command.full_name {
            child.full_name = validated_name(full_name)?;
        }
        if let Some(group_id) = &command.group_id {
            self.require_group(group_id).await?;
        }
        child.group_id = command.group_id.clone();

        self.children.update(&child).await?;
        info!("updated child {} ({})", child.full_name, child.id);
        Ok(child)
    }

    /// Delete a child and the child's entire event history. Irreversible.
    pub async fn delete_child(&self, child_id: &str) -> Result<()> {
        let lock = self.db.child_lock(child_id);
        let _guard = lock.lock().await;

        if !self.children.delete_cascade(child_id).await? {
            return Err(LedgerError::not_found("child", child_id));
        }
        self.db.forget_child_lock(child_id);
        info!("deleted child {} with event history", child_id);
        Ok(())
    }

    async fn require_group(&self, group_id: &str) -> Result<()> {
        self.groups
            .get(group_id)
            .await?
            .map(|_| ())
            .ok_or_else(|| LedgerError::not_found("group", group_id))
    }
}

fn validated_name(raw: &str) -> Result<String> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(LedgerError::InvalidInput("child name is required".to_string()));
    }
    if name.len() > MAX_NAME_LEN {
        return Err(LedgerError::InvalidInput(format!(
            "child name cannot exceed {MAX_NAME_LEN} characters"
        )));
    }
    Ok(name.to_string())
}
