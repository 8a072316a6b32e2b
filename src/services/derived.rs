//! Derived session fields.
//!
//! Each derived field has a pure forward function and, where the field is
//! writable, a pure inverse. `SessionDraft` holds the stored fields of one
//! session and re-runs the forward functions after every mutation, so derived
//! values are always consistent with the state they were computed from.

use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDate, TimeDelta, Utc};

use crate::models::{Session, SessionRow};

pub const HOURS_PER_DAY: f64 = 24.0;
const SECONDS_PER_DAY: f64 = 86_400.0;
/// Durations are kept to two decimals (hundredths of a day).
const DURATION_SCALE: f64 = 100.0;

pub fn hours(duration: f64) -> f64 {
    duration * HOURS_PER_DAY
}

pub fn duration_from_hours(hours: f64) -> f64 {
    hours / HOURS_PER_DAY
}

pub fn round_duration(duration: f64) -> f64 {
    (duration * DURATION_SCALE).round() / DURATION_SCALE
}

/// Last day covered by a session: start of `start` plus `duration` days minus
/// one second. `None` without a start date.
pub fn end_date(start: Option<NaiveDate>, duration: f64) -> Option<NaiveDate> {
    let start = start?.and_hms_opt(0, 0, 0)?;
    let seconds = (duration * SECONDS_PER_DAY).round() as i64 - 1;
    let end = start.checked_add_signed(TimeDelta::try_seconds(seconds)?)?;
    Some(end.date())
}

pub fn duration_from_end_date(start: Option<NaiveDate>, end: NaiveDate) -> Option<f64> {
    let start = start?;
    Some((end.signed_duration_since(start).num_days() + 1) as f64)
}

pub fn attendees_count(attendees: &BTreeSet<String>) -> i64 {
    attendees.len() as i64
}

/// Occupancy in percent; zero seats means zero occupancy.
pub fn taken_seats(seats: i64, attendees: usize) -> f64 {
    if seats == 0 {
        0.0
    } else {
        100.0 * attendees as f64 / seats as f64
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SessionDraft {
    pub id: String,
    pub name: String,
    pub course_id: String,
    pub instructor_id: Option<String>,
    pub active: bool,
    pub color: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    start_date: Option<NaiveDate>,
    duration: f64,
    seats: i64,
    attendees: BTreeSet<String>,
    hours: f64,
    end_date: Option<NaiveDate>,
    attendees_count: i64,
    taken_seats: f64,
}

impl SessionDraft {
    /// A fresh session: starts today, zero duration and seats, active.
    pub fn new(id: String, name: String, course_id: String, now: DateTime<Utc>) -> Self {
        let mut draft = Self {
            id,
            name,
            course_id,
            instructor_id: None,
            active: true,
            color: 0.0,
            created_at: now,
            updated_at: now,
            start_date: Some(now.date_naive()),
            duration: 0.0,
            seats: 0,
            attendees: BTreeSet::new(),
            hours: 0.0,
            end_date: None,
            attendees_count: 0,
            taken_seats: 0.0,
        };
        draft.recompute();
        draft
    }

    pub fn from_row(row: SessionRow, attendees: impl IntoIterator<Item = String>) -> Self {
        let mut draft = Self {
            id: row.id,
            name: row.name,
            course_id: row.course_id,
            instructor_id: row.instructor_id,
            active: row.active,
            color: row.color,
            created_at: row.created_at,
            updated_at: row.updated_at,
            start_date: row.start_date,
            duration: round_duration(row.duration),
            seats: row.seats,
            attendees: attendees.into_iter().collect(),
            hours: 0.0,
            end_date: row.end_date,
            attendees_count: row.attendees_count,
            taken_seats: 0.0,
        };
        draft.recompute();
        draft
    }

    pub fn start_date(&self) -> Option<NaiveDate> {
        self.start_date
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn hours(&self) -> f64 {
        self.hours
    }

    pub fn end_date(&self) -> Option<NaiveDate> {
        self.end_date
    }

    pub fn seats(&self) -> i64 {
        self.seats
    }

    pub fn attendees(&self) -> &BTreeSet<String> {
        &self.attendees
    }

    pub fn attendees_count(&self) -> i64 {
        self.attendees_count
    }

    pub fn taken_seats(&self) -> f64 {
        self.taken_seats
    }

    pub fn set_start_date(&mut self, start_date: Option<NaiveDate>) {
        self.start_date = start_date;
        self.recompute();
    }

    pub fn set_duration(&mut self, duration: f64) {
        self.duration = round_duration(duration);
        self.recompute();
    }

    pub fn set_hours(&mut self, hours: f64) {
        self.duration = round_duration(duration_from_hours(hours));
        self.recompute();
    }

    /// No-op without a start date.
    pub fn set_end_date(&mut self, end_date: NaiveDate) {
        if let Some(duration) = duration_from_end_date(self.start_date, end_date) {
            self.duration = round_duration(duration);
            self.recompute();
        }
    }

    pub fn set_seats(&mut self, seats: i64) {
        self.seats = seats;
        self.recompute();
    }

    pub fn set_attendees(&mut self, attendees: impl IntoIterator<Item = String>) {
        self.attendees = attendees.into_iter().collect();
        self.recompute();
    }

    /// Union with `attendees`; returns how many were not already present.
    pub fn add_attendees<'a>(&mut self, attendees: impl IntoIterator<Item = &'a String>) -> usize {
        let before = self.attendees.len();
        self.attendees.extend(attendees.into_iter().cloned());
        self.recompute();
        self.attendees.len() - before
    }

    pub fn has_attendee(&self, partner_id: &str) -> bool {
        self.attendees.contains(partner_id)
    }

    fn recompute(&mut self) {
        self.hours = hours(self.duration);
        self.end_date = end_date(self.start_date, self.duration);
        self.attendees_count = attendees_count(&self.attendees);
        self.taken_seats = taken_seats(self.seats, self.attendees.len());
    }

    pub fn to_session(&self) -> Session {
        Session {
            id: self.id.clone(),
            name: self.name.clone(),
            course_id: self.course_id.clone(),
            start_date: self.start_date,
            end_date: self.end_date,
            created_at: self.created_at,
            updated_at: self.updated_at,
            duration: self.duration,
            hours: self.hours,
            seats: self.seats,
            taken_seats: self.taken_seats,
            instructor_id: self.instructor_id.clone(),
            attendee_ids: self.attendees.iter().cloned().collect(),
            attendees_count: self.attendees_count,
            active: self.active,
            color: self.color,
        }
    }
}
