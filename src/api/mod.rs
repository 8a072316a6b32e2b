pub mod context;

use axum::Json;
use axum::body::Bytes;
use axum::extract::{Path, Query};
use axum::routing::{delete, post};
use axum::{Router, extract::State, http::StatusCode, routing::get};

use crate::db::repository;
use crate::error::AppError;
use crate::models::*;
use crate::services::{EnrollmentService, course_copy, require_name, sessions};
use crate::state::AppState;

use self::context::ActingUser;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/users", get(list_users).post(create_user))
        .route("/partners", get(list_partners).post(create_partner))
        .route("/partners/instructors", get(list_instructors))
        .route("/partners/{id}", delete(delete_partner))
        .route("/courses", get(list_courses).post(create_course))
        .route(
            "/courses/{id}",
            get(get_course).patch(update_course).delete(delete_course),
        )
        .route("/courses/{id}/copy", post(copy_course))
        .route("/sessions", get(list_sessions).post(create_session))
        .route("/sessions/onchange", post(session_onchange))
        .route(
            "/sessions/{id}",
            get(get_session).patch(update_session).delete(delete_session),
        )
        .route("/enrollments", post(enroll))
        .with_state(state)
}

async fn health(State(state): State<AppState>) -> Result<StatusCode, AppError> {
    sqlx::query("select 1").execute(&state.db).await?;
    Ok(StatusCode::OK)
}

async fn list_users(State(state): State<AppState>) -> Result<Json<Vec<User>>, AppError> {
    let users = repository::fetch_users(&state.db).await?;
    Ok(Json(users))
}

async fn create_user(
    State(state): State<AppState>,
    Json(req): Json<NewUserRequest>,
) -> Result<(StatusCode, Json<User>), AppError> {
    require_name("login", &req.login)?;
    require_name("name", &req.name)?;
    let user = repository::insert_user(&state.db, req).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

async fn list_partners(State(state): State<AppState>) -> Result<Json<Vec<Partner>>, AppError> {
    let partners = repository::fetch_partners(&state.db).await?;
    Ok(Json(partners))
}

async fn list_instructors(State(state): State<AppState>) -> Result<Json<Vec<Partner>>, AppError> {
    let partners = repository::fetch_instructors(&state.db).await?;
    Ok(Json(partners))
}

async fn create_partner(
    State(state): State<AppState>,
    Json(req): Json<NewPartnerRequest>,
) -> Result<(StatusCode, Json<Partner>), AppError> {
    require_name("name", &req.name)?;
    let partner = repository::insert_partner(&state.db, req).await?;
    Ok((StatusCode::CREATED, Json(partner)))
}

async fn delete_partner(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    if repository::delete_partner(&state.db, &id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound)
    }
}

async fn list_courses(State(state): State<AppState>) -> Result<Json<Vec<Course>>, AppError> {
    let courses = repository::fetch_courses(&state.db).await?;
    Ok(Json(courses))
}

async fn create_course(
    State(state): State<AppState>,
    ActingUser(acting_user): ActingUser,
    Json(req): Json<NewCourseRequest>,
) -> Result<(StatusCode, Json<Course>), AppError> {
    require_name("name", &req.name)?;
    let course = repository::insert_course(&state.db, req, acting_user).await?;
    Ok((StatusCode::CREATED, Json(course)))
}

async fn get_course(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Course>, AppError> {
    let course = repository::find_course_by_id(&state.db, &id)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(Json(course))
}

async fn update_course(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<UpdateCourseRequest>,
) -> Result<Json<Course>, AppError> {
    if let Some(name) = &req.name {
        require_name("name", name)?;
    }
    let course = repository::update_course(&state.db, &id, req)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(Json(course))
}

async fn delete_course(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    if repository::delete_course(&state.db, &id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound)
    }
}

async fn copy_course(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<(StatusCode, Json<Course>), AppError> {
    // the body is optional: an empty request copies with the default name
    let req = if body.iter().all(u8::is_ascii_whitespace) {
        CopyCourseRequest::default()
    } else {
        serde_json::from_slice::<CopyCourseRequest>(&body)
            .map_err(|e| AppError::BadRequest(format!("Invalid copy request: {}", e)))?
    };
    let course = course_copy::copy_course(&state.db, &id, req)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok((StatusCode::CREATED, Json(course)))
}

async fn list_sessions(
    State(state): State<AppState>,
    Query(params): Query<SessionQueryParams>,
) -> Result<Json<Vec<Session>>, AppError> {
    let sessions = repository::fetch_sessions(&state.db, &params).await?;
    Ok(Json(sessions))
}

async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Session>, AppError> {
    let session = repository::find_session_by_id(&state.db, &id)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(Json(session))
}

async fn create_session(
    State(state): State<AppState>,
    Json(req): Json<NewSessionRequest>,
) -> Result<(StatusCode, Json<SessionOutcome>), AppError> {
    let outcome = sessions::create_session(&state.db, req).await?;
    Ok((StatusCode::CREATED, Json(outcome)))
}

async fn update_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<UpdateSessionRequest>,
) -> Result<Json<SessionOutcome>, AppError> {
    let outcome = sessions::update_session(&state.db, &id, req)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(Json(outcome))
}

async fn delete_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    if repository::delete_session(&state.db, &id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound)
    }
}

async fn session_onchange(
    State(state): State<AppState>,
    Json(req): Json<OnchangeRequest>,
) -> Result<Json<SessionOutcome>, AppError> {
    let outcome = sessions::onchange(&state.db, req).await?;
    Ok(Json(outcome))
}

async fn enroll(
    State(state): State<AppState>,
    Json(req): Json<EnrollmentRequest>,
) -> Result<Json<EnrollmentReport>, AppError> {
    let service = EnrollmentService::new(state.db.clone());
    let report = service.subscribe(req).await?;
    Ok(Json(report))
}
