use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::double_option;

#[derive(Debug, Clone, FromRow)]
pub struct CourseRow {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub responsible_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Course {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub responsible_id: Option<String>,
    pub session_ids: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Course {
    pub fn from_row(row: CourseRow, session_ids: Vec<String>) -> Self {
        Self {
            id: row.id,
            name: row.name,
            description: row.description,
            responsible_id: row.responsible_id,
            session_ids,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCourseRequest {
    pub name: String,
    pub description: Option<String>,
    /// Absent: the acting user. Explicit `null`: nobody.
    #[serde(default, deserialize_with = "double_option")]
    pub responsible_id: Option<Option<String>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateCourseRequest {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub responsible_id: Option<Option<String>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CopyCourseRequest {
    pub name: Option<String>,
    pub description: Option<String>,
}
