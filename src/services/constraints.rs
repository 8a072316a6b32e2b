use sqlx::SqliteConnection;

use crate::db::repository;
use crate::error::AppError;
use crate::services::derived::SessionDraft;

pub const INSTRUCTOR_IS_ATTENDEE_MESSAGE: &str = "A session's instructor can't be an attendee";
pub const INSTRUCTOR_NOT_ELIGIBLE_MESSAGE: &str =
    "The instructor must be flagged as instructor or tagged as a teacher";

pub fn check_instructor_not_in_attendees(draft: &SessionDraft) -> Result<(), AppError> {
    match &draft.instructor_id {
        Some(instructor) if draft.has_attendee(instructor) => {
            Err(AppError::Validation(INSTRUCTOR_IS_ATTENDEE_MESSAGE.to_string()))
        }
        _ => Ok(()),
    }
}

/// The instructor, when set, must exist and be instructor-eligible.
pub async fn check_instructor_eligible(
    conn: &mut SqliteConnection,
    draft: &SessionDraft,
) -> Result<(), AppError> {
    let Some(instructor_id) = &draft.instructor_id else {
        return Ok(());
    };
    let partner = repository::load_partner(conn, instructor_id)
        .await?
        .ok_or_else(|| AppError::BadRequest(format!("Unknown instructor {}", instructor_id)))?;
    if partner.is_instructor_eligible() {
        Ok(())
    } else {
        Err(AppError::Validation(INSTRUCTOR_NOT_ELIGIBLE_MESSAGE.to_string()))
    }
}
