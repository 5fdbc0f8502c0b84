use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A group of children. Deletable only while it owns no children.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Group {
    pub id: String,
    pub name: String,
}

impl Group {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Self::generate_id(),
            name: name.into(),
        }
    }

    pub fn generate_id() -> String {
        format!("group::{}", Uuid::new_v4())
    }
}
