use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::double_option;

#[derive(Debug, Clone, FromRow)]
pub struct SessionRow {
    pub id: String,
    pub name: String,
    pub start_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub duration: f64,
    pub seats: i64,
    pub instructor_id: Option<String>,
    pub course_id: String,
    pub active: bool,
    pub end_date: Option<NaiveDate>,
    pub attendees_count: i64,
    pub color: f64,
    pub updated_at: DateTime<Utc>,
}

/// A session as exposed to callers, stored and derived fields together.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub name: String,
    pub course_id: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Days.
    pub duration: f64,
    pub hours: f64,
    pub seats: i64,
    pub taken_seats: f64,
    pub instructor_id: Option<String>,
    pub attendee_ids: Vec<String>,
    pub attendees_count: i64,
    pub active: bool,
    pub color: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Warning {
    pub title: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionOutcome {
    #[serde(flatten)]
    pub session: Session,
    pub warning: Option<Warning>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSessionRequest {
    pub name: String,
    pub course_id: String,
    /// Absent: today. Explicit `null`: no start date.
    #[serde(default, deserialize_with = "double_option")]
    pub start_date: Option<Option<NaiveDate>>,
    pub duration: Option<f64>,
    pub hours: Option<f64>,
    pub end_date: Option<NaiveDate>,
    pub seats: Option<i64>,
    pub instructor_id: Option<String>,
    #[serde(default)]
    pub attendee_ids: Vec<String>,
    pub color: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateSessionRequest {
    pub name: Option<String>,
    pub course_id: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub start_date: Option<Option<NaiveDate>>,
    pub duration: Option<f64>,
    pub hours: Option<f64>,
    pub end_date: Option<NaiveDate>,
    pub seats: Option<i64>,
    #[serde(default, deserialize_with = "double_option")]
    pub instructor_id: Option<Option<String>>,
    pub attendee_ids: Option<Vec<String>>,
    pub active: Option<bool>,
    pub color: Option<f64>,
}

impl UpdateSessionRequest {
    /// Seats, attendees and `active` all go through the seat check.
    pub fn touches_capacity(&self) -> bool {
        self.seats.is_some() || self.attendee_ids.is_some() || self.active.is_some()
    }

    pub fn touches_instructor_or_attendees(&self) -> bool {
        self.instructor_id.is_some() || self.attendee_ids.is_some()
    }
}

/// A proposed edit evaluated without saving, on top of `session_id` when given.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OnchangeRequest {
    pub session_id: Option<String>,
    #[serde(default)]
    pub changes: UpdateSessionRequest,
}

#[derive(Debug, Default, Deserialize)]
pub struct SessionQueryParams {
    pub course_id: Option<String>,
    #[serde(default)]
    pub include_inactive: bool,
}
