use tracing::warn;

use crate::models::Warning;
use crate::services::derived::SessionDraft;

pub const NEGATIVE_SEATS_TITLE: &str = "Incorrect 'seats' value";
pub const NEGATIVE_SEATS_MESSAGE: &str = "The number of available seats may not be negative";
pub const TOO_MANY_ATTENDEES_TITLE: &str = "Too many attendees";
pub const TOO_MANY_ATTENDEES_MESSAGE: &str = "Increase seats or remove excess attendees";

/// Advisory seat check. Never fails: returns a warning when the session
/// cannot hold its attendees.
pub fn verify_seats(seats: i64, attendees: usize) -> Option<Warning> {
    if seats < 0 {
        return Some(Warning {
            title: NEGATIVE_SEATS_TITLE.to_string(),
            message: NEGATIVE_SEATS_MESSAGE.to_string(),
        });
    }
    if seats < attendees as i64 {
        return Some(Warning {
            title: TOO_MANY_ATTENDEES_TITLE.to_string(),
            message: TOO_MANY_ATTENDEES_MESSAGE.to_string(),
        });
    }
    None
}

/// Runs the seat check on `draft` and sets `active` from its result.
pub fn apply(draft: &mut SessionDraft) -> Option<Warning> {
    let warning = verify_seats(draft.seats(), draft.attendees().len());
    draft.active = warning.is_none();
    if let Some(w) = &warning {
        warn!("session {} deactivated: {}", draft.id, w.title);
    }
    warning
}
