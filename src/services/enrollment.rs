use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{info, warn};

use crate::db::repository;
use crate::error::AppError;
use crate::models::{EnrollmentFailure, EnrollmentReport, EnrollmentRequest, Session, SessionWarning, Warning};
use crate::services::{capacity, constraints};

/// Adds a set of attendees to a set of sessions. Every session is its own
/// transaction: one failing session does not undo the others.
pub struct EnrollmentService {
    db: SqlitePool,
}

impl EnrollmentService {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    pub async fn subscribe(&self, req: EnrollmentRequest) -> Result<EnrollmentReport, AppError> {
        let session_ids = req.target_sessions();
        if session_ids.is_empty() {
            return Err(AppError::BadRequest(
                "At least one session is required".to_string(),
            ));
        }

        info!(
            "Enrolling {} attendees into {} sessions",
            req.attendee_ids.len(),
            session_ids.len()
        );
        let mut report = EnrollmentReport::default();

        for session_id in session_ids {
            match self.enroll_one(&session_id, &req.attendee_ids).await {
                Ok((session, warning)) => {
                    if let Some(w) = warning {
                        report.warnings.push(SessionWarning {
                            session_id: session.id.clone(),
                            title: w.title,
                            message: w.message,
                        });
                    }
                    report.enrolled.push(session);
                }
                Err(
                    e @ (AppError::Validation(_)
                    | AppError::NotFound
                    | AppError::BadRequest(_)
                    | AppError::Conflict(_)),
                ) => {
                    warn!("Enrollment into session {} failed: {}", session_id, e);
                    report.failed.push(EnrollmentFailure {
                        session_id,
                        error: e.detail(),
                    });
                }
                Err(e) => return Err(e),
            }
        }

        info!(
            "Enrollment finished - {} sessions updated, {} failed",
            report.enrolled.len(),
            report.failed.len()
        );
        Ok(report)
    }

    async fn enroll_one(
        &self,
        session_id: &str,
        attendee_ids: &[String],
    ) -> Result<(Session, Option<Warning>), AppError> {
        let mut tx = self.db.begin().await?;
        let mut draft = repository::load_session(&mut tx, session_id)
            .await?
            .ok_or(AppError::NotFound)?;

        // already enrolled everywhere: nothing to write
        if draft.add_attendees(attendee_ids) == 0 {
            return Ok((draft.to_session(), None));
        }

        let warning = capacity::apply(&mut draft);
        constraints::check_instructor_not_in_attendees(&draft)?;

        draft.updated_at = Utc::now();
        repository::update_session(&mut tx, &draft).await?;
        tx.commit().await?;

        Ok((draft.to_session(), warning))
    }
}
