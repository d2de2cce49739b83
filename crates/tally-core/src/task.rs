use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::datetime::iso_date_serde;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    #[default]
    Low,
    Medium,
    High,
}

impl Priority {
    pub fn label(self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        }
    }
}

impl std::str::FromStr for Priority {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Priority::Low),
            "medium" => Ok(Priority::Medium),
            "high" => Ok(Priority::High),
            other => Err(anyhow::anyhow!(
                "invalid priority: {other} (expected low, medium, or high)"
            )),
        }
    }
}

/// One task record. Field names follow the slot payload, a JSON array of
/// these records under a single key.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TaskItem {
    pub id: String,

    pub title: String,

    #[serde(default, with = "iso_date_serde")]
    pub due_date: Option<NaiveDate>,

    #[serde(default)]
    pub priority: Priority,

    pub category: String,

    #[serde(default)]
    pub completed: bool,
}

impl TaskItem {
    pub fn new(title: String, category: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            title,
            due_date: None,
            priority: Priority::Low,
            category,
            completed: false,
        }
    }
}
