use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Category fragment that makes a partner eligible to teach.
pub const TEACHER_CATEGORY: &str = "teacher";

#[derive(Debug, Clone, FromRow)]
pub struct PartnerRow {
    pub id: String,
    pub name: String,
    pub instructor: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Partner {
    pub id: String,
    pub name: String,
    pub instructor: bool,
    pub categories: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl Partner {
    pub fn from_row(row: PartnerRow, categories: Vec<String>) -> Self {
        Self {
            id: row.id,
            name: row.name,
            instructor: row.instructor,
            categories,
            created_at: row.created_at,
        }
    }

    /// Flagged as instructor, or tagged with a category containing "teacher".
    pub fn is_instructor_eligible(&self) -> bool {
        self.instructor
            || self
                .categories
                .iter()
                .any(|c| c.to_lowercase().contains(TEACHER_CATEGORY))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPartnerRequest {
    pub name: String,
    #[serde(default)]
    pub instructor: bool,
    #[serde(default)]
    pub categories: Vec<String>,
}
