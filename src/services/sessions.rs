use chrono::{NaiveDate, Utc};
use sqlx::SqlitePool;
use tracing::info;
use uuid::Uuid;

use crate::db::repository;
use crate::error::AppError;
use crate::models::{NewSessionRequest, OnchangeRequest, SessionOutcome, UpdateSessionRequest, Warning};
use crate::services::derived::SessionDraft;
use crate::services::{capacity, constraints, require_name};

/// Applies duration, hours and end date in that order; later inverses win.
fn apply_schedule(
    draft: &mut SessionDraft,
    duration: Option<f64>,
    hours: Option<f64>,
    end_date: Option<NaiveDate>,
) -> Result<(), AppError> {
    if let Some(duration) = duration {
        draft.set_duration(duration);
    }
    if let Some(hours) = hours {
        draft.set_hours(hours);
    }
    if let Some(end_date) = end_date {
        draft.set_end_date(end_date);
    }

    let duration = draft.duration();
    if !duration.is_finite() || duration < 0.0 {
        return Err(AppError::BadRequest(
            "Duration may not be negative".to_string(),
        ));
    }
    if draft.start_date().is_some() && draft.end_date().is_none() {
        return Err(AppError::BadRequest(
            "Duration is out of range".to_string(),
        ));
    }
    Ok(())
}

/// Writes `changes` into `draft`. Runs the seat check when seats, attendees or
/// `active` change. A failed check always deactivates; otherwise an explicit
/// `active` is kept.
fn apply_changes(draft: &mut SessionDraft, changes: &UpdateSessionRequest) -> Result<Option<Warning>, AppError> {
    if let Some(name) = &changes.name {
        require_name("name", name)?;
        draft.name = name.clone();
    }
    if let Some(course_id) = &changes.course_id {
        draft.course_id = course_id.clone();
    }
    if let Some(start_date) = changes.start_date {
        draft.set_start_date(start_date);
    }
    apply_schedule(draft, changes.duration, changes.hours, changes.end_date)?;
    if let Some(seats) = changes.seats {
        draft.set_seats(seats);
    }
    if let Some(instructor_id) = &changes.instructor_id {
        draft.instructor_id = instructor_id.clone();
    }
    if let Some(attendee_ids) = &changes.attendee_ids {
        draft.set_attendees(attendee_ids.iter().cloned());
    }
    if let Some(color) = changes.color {
        draft.color = color;
    }

    if !changes.touches_capacity() {
        return Ok(None);
    }
    let warning = capacity::apply(draft);
    if let (None, Some(active)) = (&warning, changes.active) {
        draft.active = active;
    }
    Ok(warning)
}

pub async fn create_session(db: &SqlitePool, req: NewSessionRequest) -> Result<SessionOutcome, AppError> {
    require_name("name", &req.name)?;

    let mut draft = SessionDraft::new(Uuid::new_v4().to_string(), req.name, req.course_id, Utc::now());
    if let Some(start_date) = req.start_date {
        draft.set_start_date(start_date);
    }
    apply_schedule(&mut draft, req.duration, req.hours, req.end_date)?;
    if let Some(seats) = req.seats {
        draft.set_seats(seats);
    }
    draft.instructor_id = req.instructor_id;
    draft.set_attendees(req.attendee_ids);
    if let Some(color) = req.color {
        draft.color = color;
    }
    let warning = capacity::apply(&mut draft);

    let mut tx = db.begin().await?;
    constraints::check_instructor_eligible(&mut tx, &draft).await?;
    constraints::check_instructor_not_in_attendees(&draft)?;
    repository::insert_session(&mut tx, &draft).await?;
    tx.commit().await?;

    info!("created session {} ({}) for course {}", draft.id, draft.name, draft.course_id);
    Ok(SessionOutcome {
        session: draft.to_session(),
        warning,
    })
}

/// `None` when the session does not exist. A failed constraint rolls the
/// whole update back.
pub async fn update_session(
    db: &SqlitePool,
    id: &str,
    req: UpdateSessionRequest,
) -> Result<Option<SessionOutcome>, AppError> {
    let mut tx = db.begin().await?;
    let mut draft = match repository::load_session(&mut tx, id).await? {
        Some(d) => d,
        None => return Ok(None),
    };

    let warning = apply_changes(&mut draft, &req)?;

    if req.instructor_id.is_some() {
        constraints::check_instructor_eligible(&mut tx, &draft).await?;
    }
    if req.touches_instructor_or_attendees() {
        constraints::check_instructor_not_in_attendees(&draft)?;
    }

    draft.updated_at = Utc::now();
    repository::update_session(&mut tx, &draft).await?;
    tx.commit().await?;

    info!("updated session {}", draft.id);
    Ok(Some(SessionOutcome {
        session: draft.to_session(),
        warning,
    }))
}

/// Evaluates a proposed edit without saving it.
pub async fn onchange(db: &SqlitePool, req: OnchangeRequest) -> Result<SessionOutcome, AppError> {
    let mut draft = match &req.session_id {
        Some(id) => {
            let mut conn = db.acquire().await?;
            repository::load_session(&mut conn, id)
                .await?
                .ok_or(AppError::NotFound)?
        }
        None => SessionDraft::new(String::new(), String::new(), String::new(), Utc::now()),
    };

    let warning = apply_changes(&mut draft, &req.changes)?;
    Ok(SessionOutcome {
        session: draft.to_session(),
        warning,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::connect_in_memory;
    use crate::models::{NewCourseRequest, NewPartnerRequest, Partner};
    use crate::services::capacity::{NEGATIVE_SEATS_TITLE, TOO_MANY_ATTENDEES_TITLE};
    use crate::services::constraints::{INSTRUCTOR_IS_ATTENDEE_MESSAGE, INSTRUCTOR_NOT_ELIGIBLE_MESSAGE};

    async fn setup() -> (SqlitePool, String) {
        let pool = connect_in_memory().await.expect("Failed to create test db");
        let course = repository::insert_course(
            &pool,
            NewCourseRequest {
                name: "Math".to_string(),
                description: None,
                responsible_id: None,
            },
            None,
        )
        .await
        .expect("Failed to insert course");
        (pool, course.id)
    }

    async fn partner(pool: &SqlitePool, name: &str, instructor: bool) -> Partner {
        repository::insert_partner(
            pool,
            NewPartnerRequest {
                name: name.to_string(),
                instructor,
                categories: vec![],
            },
        )
        .await
        .expect("Failed to insert partner")
    }

    fn new_session(course_id: &str) -> NewSessionRequest {
        NewSessionRequest {
            name: "Week 1".to_string(),
            course_id: course_id.to_string(),
            start_date: Some(NaiveDate::from_ymd_opt(2024, 1, 1)),
            duration: Some(3.0),
            hours: None,
            end_date: None,
            seats: Some(5),
            instructor_id: None,
            attendee_ids: vec![],
            color: None,
        }
    }

    #[tokio::test]
    async fn test_create_session_derives_fields() {
        let (pool, course_id) = setup().await;
        let outcome = create_session(&pool, new_session(&course_id))
            .await
            .expect("Failed to create session");

        assert!(outcome.warning.is_none());
        let session = outcome.session;
        assert_eq!(session.hours, 72.0);
        assert_eq!(session.end_date, NaiveDate::from_ymd_opt(2024, 1, 3));
        assert!(session.active);

        let stored = repository::find_session_by_id(&pool, &session.id)
            .await
            .expect("Failed to load session")
            .expect("Session not found");
        assert_eq!(stored.end_date, session.end_date);
        assert_eq!(stored.duration, 3.0);
    }

    #[tokio::test]
    async fn test_start_date_defaults_to_today() {
        let (pool, course_id) = setup().await;
        let mut req = new_session(&course_id);
        req.start_date = None;
        let outcome = create_session(&pool, req).await.expect("Failed to create session");
        assert_eq!(outcome.session.start_date, Some(Utc::now().date_naive()));
    }

    #[tokio::test]
    async fn test_create_session_for_unknown_course_fails() {
        let (pool, _) = setup().await;
        let result = create_session(&pool, new_session("missing")).await;
        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }

    #[tokio::test]
    async fn test_update_end_date_rewrites_duration() {
        let (pool, course_id) = setup().await;
        let created = create_session(&pool, new_session(&course_id))
            .await
            .expect("Failed to create session");

        let updated = update_session(
            &pool,
            &created.session.id,
            UpdateSessionRequest {
                end_date: NaiveDate::from_ymd_opt(2024, 1, 10),
                ..Default::default()
            },
        )
        .await
        .expect("Failed to update session")
        .expect("Session not found");
        assert_eq!(updated.session.duration, 10.0);
        assert_eq!(updated.session.hours, 240.0);
    }

    #[tokio::test]
    async fn test_negative_duration_is_rejected() {
        let (pool, course_id) = setup().await;
        let created = create_session(&pool, new_session(&course_id))
            .await
            .expect("Failed to create session");

        let result = update_session(
            &pool,
            &created.session.id,
            UpdateSessionRequest {
                hours: Some(-24.0),
                ..Default::default()
            },
        )
        .await;
        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }

    #[tokio::test]
    async fn test_fractional_hours_store_two_decimal_duration() {
        let (pool, course_id) = setup().await;
        let created = create_session(&pool, new_session(&course_id))
            .await
            .expect("Failed to create session");

        let updated = update_session(
            &pool,
            &created.session.id,
            UpdateSessionRequest {
                hours: Some(2.4),
                ..Default::default()
            },
        )
        .await
        .expect("Failed to update session")
        .expect("Session not found");
        assert_eq!(updated.session.duration, 0.1);

        let stored = repository::find_session_by_id(&pool, &created.session.id)
            .await
            .expect("Failed to load session")
            .expect("Session not found");
        assert_eq!(stored.duration, 0.1);
    }

    #[tokio::test]
    async fn test_duration_past_the_calendar_is_rejected() {
        let (pool, course_id) = setup().await;
        let mut req = new_session(&course_id);
        req.duration = Some(1e15);
        let result = create_session(&pool, req).await;
        assert!(matches!(result, Err(AppError::BadRequest(_))));

        let created = create_session(&pool, new_session(&course_id))
            .await
            .expect("Failed to create session");
        let result = update_session(
            &pool,
            &created.session.id,
            UpdateSessionRequest {
                hours: Some(1e16),
                ..Default::default()
            },
        )
        .await;
        assert!(matches!(result, Err(AppError::BadRequest(_))));

        let stored = repository::find_session_by_id(&pool, &created.session.id)
            .await
            .expect("Failed to load session")
            .expect("Session not found");
        assert_eq!(stored.duration, 3.0);
        assert_eq!(stored.end_date, NaiveDate::from_ymd_opt(2024, 1, 3));
    }

    #[tokio::test]
    async fn test_reactivating_an_invalid_session_stays_inactive() {
        let (pool, course_id) = setup().await;
        let mut req = new_session(&course_id);
        req.seats = Some(-1);
        let created = create_session(&pool, req).await.expect("Failed to create session");
        assert!(!created.session.active);

        let updated = update_session(
            &pool,
            &created.session.id,
            UpdateSessionRequest {
                active: Some(true),
                ..Default::default()
            },
        )
        .await
        .expect("Failed to update session")
        .expect("Session not found");
        assert_eq!(updated.warning.map(|w| w.title).as_deref(), Some(NEGATIVE_SEATS_TITLE));
        assert!(!updated.session.active);

        let stored = repository::find_session_by_id(&pool, &created.session.id)
            .await
            .expect("Failed to load session")
            .expect("Session not found");
        assert!(!stored.active);
        assert_eq!(stored.seats, -1);
    }

    #[tokio::test]
    async fn test_valid_session_can_be_archived() {
        let (pool, course_id) = setup().await;
        let created = create_session(&pool, new_session(&course_id))
            .await
            .expect("Failed to create session");

        let archived = update_session(
            &pool,
            &created.session.id,
            UpdateSessionRequest {
                active: Some(false),
                ..Default::default()
            },
        )
        .await
        .expect("Failed to update session")
        .expect("Session not found");
        assert!(archived.warning.is_none());
        assert!(!archived.session.active);
    }

    #[tokio::test]
    async fn test_seat_warnings_do_not_block_the_write() {
        let (pool, course_id) = setup().await;
        let created = create_session(&pool, new_session(&course_id))
            .await
            .expect("Failed to create session");
        let id = created.session.id;

        let negative = update_session(
            &pool,
            &id,
            UpdateSessionRequest {
                seats: Some(-1),
                ..Default::default()
            },
        )
        .await
        .expect("Failed to update session")
        .expect("Session not found");
        assert_eq!(negative.warning.map(|w| w.title).as_deref(), Some(NEGATIVE_SEATS_TITLE));
        assert!(!negative.session.active);

        let mut attendees = Vec::new();
        for i in 0..6 {
            attendees.push(partner(&pool, &format!("P{}", i), false).await.id);
        }
        let crowded = update_session(
            &pool,
            &id,
            UpdateSessionRequest {
                seats: Some(5),
                attendee_ids: Some(attendees.clone()),
                ..Default::default()
            },
        )
        .await
        .expect("Failed to update session")
        .expect("Session not found");
        assert_eq!(crowded.warning.map(|w| w.title).as_deref(), Some(TOO_MANY_ATTENDEES_TITLE));
        assert!(!crowded.session.active);
        assert_eq!(crowded.session.attendees_count, 6);

        let fixed = update_session(
            &pool,
            &id,
            UpdateSessionRequest {
                attendee_ids: Some(attendees[..3].to_vec()),
                ..Default::default()
            },
        )
        .await
        .expect("Failed to update session")
        .expect("Session not found");
        assert!(fixed.warning.is_none());
        assert!(fixed.session.active);
    }

    #[tokio::test]
    async fn test_instructor_in_attendees_leaves_record_unchanged() {
        let (pool, course_id) = setup().await;
        let teacher = partner(&pool, "Alice", true).await;

        let mut req = new_session(&course_id);
        req.attendee_ids = vec![teacher.id.clone()];
        let created = create_session(&pool, req).await.expect("Failed to create session");

        let result = update_session(
            &pool,
            &created.session.id,
            UpdateSessionRequest {
                instructor_id: Some(Some(teacher.id.clone())),
                seats: Some(10),
                ..Default::default()
            },
        )
        .await;
        match result {
            Err(AppError::Validation(msg)) => assert_eq!(msg, INSTRUCTOR_IS_ATTENDEE_MESSAGE),
            other => panic!("unexpected result: {:?}", other),
        }

        let stored = repository::find_session_by_id(&pool, &created.session.id)
            .await
            .expect("Failed to load session")
            .expect("Session not found");
        assert_eq!(stored.instructor_id, None);
        assert_eq!(stored.seats, 5);
        assert_eq!(stored.attendee_ids, vec![teacher.id]);
    }

    #[tokio::test]
    async fn test_ineligible_instructor_is_rejected() {
        let (pool, course_id) = setup().await;
        let student = partner(&pool, "Bob", false).await;

        let mut req = new_session(&course_id);
        req.instructor_id = Some(student.id);
        match create_session(&pool, req).await {
            Err(AppError::Validation(msg)) => assert_eq!(msg, INSTRUCTOR_NOT_ELIGIBLE_MESSAGE),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_onchange_does_not_persist() {
        let (pool, course_id) = setup().await;
        let created = create_session(&pool, new_session(&course_id))
            .await
            .expect("Failed to create session");

        let preview = onchange(
            &pool,
            OnchangeRequest {
                session_id: Some(created.session.id.clone()),
                changes: UpdateSessionRequest {
                    seats: Some(-3),
                    ..Default::default()
                },
            },
        )
        .await
        .expect("Failed to evaluate onchange");
        assert!(preview.warning.is_some());
        assert!(!preview.session.active);

        let stored = repository::find_session_by_id(&pool, &created.session.id)
            .await
            .expect("Failed to load session")
            .expect("Session not found");
        assert_eq!(stored.seats, 5);
        assert!(stored.active);
    }

    #[tokio::test]
    async fn test_onchange_for_new_record() {
        let (pool, _) = setup().await;
        let preview = onchange(
            &pool,
            OnchangeRequest {
                session_id: None,
                changes: UpdateSessionRequest {
                    seats: Some(5),
                    attendee_ids: Some(vec!["a".to_string(), "b".to_string(), "c".to_string()]),
                    ..Default::default()
                },
            },
        )
        .await
        .expect("Failed to evaluate onchange");
        assert!(preview.warning.is_none());
        assert!(preview.session.active);
        assert_eq!(preview.session.taken_seats, 60.0);
    }
}
