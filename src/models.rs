use serde::{Deserialize, Serialize};

/// Unix seconds, UTC.
pub type Timestamp = i64;

/// A single to-do item. The collection keeps insertion order; tasks are
/// created through the store's create command and mutated in place.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct Task {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub desc: String,
    pub due: Option<Timestamp>,
    pub completed: bool,
    /// One-way flag: flipped to true by the reminder scheduler, never reset.
    pub notified: bool,
    pub created_at: Timestamp,
}

impl Task {
    pub fn new(title: String, desc: String, due: Option<Timestamp>, created_at: Timestamp) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            title,
            desc,
            due,
            completed: false,
            notified: false,
            created_at,
        }
    }
}
