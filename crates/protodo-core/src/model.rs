use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl Priority {
    pub fn parse(code: &str) -> Option<Self> {
        match code {
            "low" => Some(Priority::Low),
            "medium" => Some(Priority::Medium),
            "high" => Some(Priority::High),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Pending,
    InProgress,
    Completed,
}

impl Status {
    pub fn parse(code: &str) -> Option<Self> {
        match code {
            "pending" => Some(Status::Pending),
            "in_progress" => Some(Status::InProgress),
            "completed" => Some(Status::Completed),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Status::Pending => "pending",
            Status::InProgress => "in_progress",
            Status::Completed => "completed",
        }
    }
}

/// The central record. `completed` and `status` are stored independently;
/// only the toggle and quick-status paths keep them in sync.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,

    pub title: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    pub completed: bool,

    pub priority: Priority,

    pub status: Status,

    /// May dangle after a category delete; resolved (or not) at render time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_id: Option<String>,

    /// Tag ids, in insertion order. Stale ids are filtered when resolving,
    /// never when storing.
    #[serde(default)]
    pub tags: Vec<String>,

    /// Display order. Dense after a reorder, sparse after deletes.
    pub position: u64,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl Task {
    pub fn new(fields: NewTask, position: u64, now: DateTime<Utc>) -> Self {
        Self {
            id: new_id(),
            title: fields.title,
            description: fields.description,
            completed: fields.completed,
            priority: fields.priority,
            status: fields.status,
            category_id: fields.category_id,
            tags: fields.tags,
            position,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Creation input: everything the store does not assign itself.
#[derive(Debug, Clone)]
pub struct NewTask {
    pub title: String,
    pub description: Option<String>,
    pub completed: bool,
    pub priority: Priority,
    pub status: Status,
    pub category_id: Option<String>,
    pub tags: Vec<String>,
}

impl NewTask {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: None,
            completed: false,
            priority: Priority::Medium,
            status: Status::Pending,
            category_id: None,
            tags: vec![],
        }
    }
}

/// Partial update. Outer `None` leaves the field alone; `Some(None)` on the
/// double-wrapped fields clears them.
#[derive(Debug, Clone, Default)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub completed: Option<bool>,
    pub priority: Option<Priority>,
    pub status: Option<Status>,
    pub category_id: Option<Option<String>>,
    pub tags: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Category {
    pub id: String,
    pub name: String,
    pub color: String,
    pub icon: String,
}

#[derive(Debug, Clone, Default)]
pub struct CategoryPatch {
    pub name: Option<String>,
    pub color: Option<String>,
    pub icon: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Tag {
    pub id: String,
    pub name: String,
    pub color: String,
}

#[derive(Debug, Clone, Default)]
pub struct TagPatch {
    pub name: Option<String>,
    pub color: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stats {
    pub total: usize,
    pub completed: usize,
    pub pending: usize,
    pub in_progress: usize,
    /// `round(completed / total * 100)`, 0 when there are no tasks.
    pub completion_rate: u32,
}

/// The category/tag colour names offered by the UI. The store does not
/// validate against this list.
pub const COLOR_PALETTE: [&str; 24] = [
    "red", "orange", "amber", "yellow", "lime", "green", "emerald", "teal", "cyan", "sky", "blue",
    "indigo", "violet", "purple", "fuchsia", "pink", "rose", "slate", "gray", "zinc", "stone",
    "neutral", "crimson", "coral",
];

pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

pub fn default_categories() -> Vec<Category> {
    [
        ("Work", "blue", "Briefcase"),
        ("Personal", "green", "User"),
        ("Shopping", "purple", "ShoppingCart"),
        ("Health", "red", "Heart"),
    ]
    .into_iter()
    .map(|(name, color, icon)| Category {
        id: new_id(),
        name: name.to_string(),
        color: color.to_string(),
        icon: icon.to_string(),
    })
    .collect()
}

pub fn default_tags() -> Vec<Tag> {
    [("Urgent", "red"), ("Later", "gray"), ("Important", "amber")]
        .into_iter()
        .map(|(name, color)| Tag {
            id: new_id(),
            name: name.to_string(),
            color: color.to_string(),
        })
        .collect()
}
