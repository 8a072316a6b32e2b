use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::{
    Course, CourseRow, NewCourseRequest, NewPartnerRequest, NewUserRequest, Partner, PartnerRow,
    Session, SessionQueryParams, SessionRow, UpdateCourseRequest, User,
};
use crate::services::derived::SessionDraft;

pub async fn fetch_users(db: &SqlitePool) -> Result<Vec<User>, AppError> {
    let users = sqlx::query_as::<_, User>(
        "SELECT id, login, name, created_at FROM users ORDER BY login",
    )
    .fetch_all(db)
    .await?;
    Ok(users)
}

pub async fn insert_user(db: &SqlitePool, req: NewUserRequest) -> Result<User, AppError> {
    let user = User {
        id: Uuid::new_v4().to_string(),
        login: req.login,
        name: req.name,
        created_at: Utc::now(),
    };

    sqlx::query("INSERT INTO users (id, login, name, created_at) VALUES (?, ?, ?, ?)")
        .bind(&user.id)
        .bind(&user.login)
        .bind(&user.name)
        .bind(user.created_at)
        .execute(db)
        .await?;

    Ok(user)
}

async fn partner_categories(conn: &mut SqliteConnection, partner_id: &str) -> Result<Vec<String>, AppError> {
    let categories = sqlx::query_scalar::<_, String>(
        "SELECT name FROM partner_categories WHERE partner_id = ? ORDER BY name",
    )
    .bind(partner_id)
    .fetch_all(&mut *conn)
    .await?;
    Ok(categories)
}

pub async fn load_partner(conn: &mut SqliteConnection, id: &str) -> Result<Option<Partner>, AppError> {
    let row = sqlx::query_as::<_, PartnerRow>(
        "SELECT id, name, instructor, created_at FROM partners WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;

    match row {
        Some(row) => {
            let categories = partner_categories(conn, &row.id).await?;
            Ok(Some(Partner::from_row(row, categories)))
        }
        None => Ok(None),
    }
}

pub async fn fetch_partners(db: &SqlitePool) -> Result<Vec<Partner>, AppError> {
    let mut conn = db.acquire().await?;
    let rows = sqlx::query_as::<_, PartnerRow>(
        "SELECT id, name, instructor, created_at FROM partners ORDER BY name",
    )
    .fetch_all(&mut *conn)
    .await?;

    let mut partners = Vec::with_capacity(rows.len());
    for row in rows {
        let categories = partner_categories(&mut conn, &row.id).await?;
        partners.push(Partner::from_row(row, categories));
    }
    Ok(partners)
}

pub async fn fetch_instructors(db: &SqlitePool) -> Result<Vec<Partner>, AppError> {
    let partners = fetch_partners(db).await?;
    Ok(partners
        .into_iter()
        .filter(Partner::is_instructor_eligible)
        .collect())
}

pub async fn insert_partner(db: &SqlitePool, req: NewPartnerRequest) -> Result<Partner, AppError> {
    let id = Uuid::new_v4().to_string();
    let now = Utc::now();
    let mut tx = db.begin().await?;

    sqlx::query("INSERT INTO partners (id, name, instructor, created_at) VALUES (?, ?, ?, ?)")
        .bind(&id)
        .bind(&req.name)
        .bind(req.instructor)
        .bind(now)
        .execute(&mut *tx)
        .await?;

    for category in &req.categories {
        sqlx::query("INSERT OR IGNORE INTO partner_categories (partner_id, name) VALUES (?, ?)")
            .bind(&id)
            .bind(category)
            .execute(&mut *tx)
            .await?;
    }

    let partner = load_partner(&mut tx, &id)
        .await?
        .ok_or(AppError::InternalServerError)?;
    tx.commit().await?;
    Ok(partner)
}

/// Deletes a partner and refreshes the stored attendee count of every
/// session it attended.
pub async fn delete_partner(db: &SqlitePool, id: &str) -> Result<bool, AppError> {
    let mut tx = db.begin().await?;

    let session_ids = sqlx::query_scalar::<_, String>(
        "SELECT session_id FROM session_attendees WHERE partner_id = ?",
    )
    .bind(id)
    .fetch_all(&mut *tx)
    .await?;

    let deleted = sqlx::query("DELETE FROM partners WHERE id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

    for session_id in &session_ids {
        sqlx::query(
            "UPDATE sessions SET attendees_count = (SELECT COUNT(*) FROM session_attendees WHERE session_id = ?1) WHERE id = ?1",
        )
        .bind(session_id)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    Ok(deleted > 0)
}

async fn course_session_ids(conn: &mut SqliteConnection, course_id: &str) -> Result<Vec<String>, AppError> {
    let ids = sqlx::query_scalar::<_, String>(
        "SELECT id FROM sessions WHERE course_id = ? ORDER BY start_date, name",
    )
    .bind(course_id)
    .fetch_all(&mut *conn)
    .await?;
    Ok(ids)
}

pub async fn load_course(conn: &mut SqliteConnection, id: &str) -> Result<Option<Course>, AppError> {
    let row = sqlx::query_as::<_, CourseRow>(
        "SELECT id, name, description, responsible_id, created_at, updated_at FROM courses WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;

    match row {
        Some(row) => {
            let session_ids = course_session_ids(conn, &row.id).await?;
            Ok(Some(Course::from_row(row, session_ids)))
        }
        None => Ok(None),
    }
}

pub async fn find_course_by_id(db: &SqlitePool, id: &str) -> Result<Option<Course>, AppError> {
    let mut conn = db.acquire().await?;
    load_course(&mut conn, id).await
}

pub async fn fetch_courses(db: &SqlitePool) -> Result<Vec<Course>, AppError> {
    let mut conn = db.acquire().await?;
    let rows = sqlx::query_as::<_, CourseRow>(
        "SELECT id, name, description, responsible_id, created_at, updated_at FROM courses ORDER BY name",
    )
    .fetch_all(&mut *conn)
    .await?;

    let mut courses = Vec::with_capacity(rows.len());
    for row in rows {
        let session_ids = course_session_ids(&mut conn, &row.id).await?;
        courses.push(Course::from_row(row, session_ids));
    }
    Ok(courses)
}

/// `acting_user` becomes the responsible user unless the request names one
/// (or explicitly clears it).
pub async fn insert_course(
    db: &SqlitePool,
    req: NewCourseRequest,
    acting_user: Option<String>,
) -> Result<Course, AppError> {
    let mut conn = db.acquire().await?;
    let responsible_id = req.responsible_id.unwrap_or(acting_user);
    insert_course_row(&mut conn, req.name, req.description, responsible_id).await
}

pub async fn insert_course_row(
    conn: &mut SqliteConnection,
    name: String,
    description: Option<String>,
    responsible_id: Option<String>,
) -> Result<Course, AppError> {
    let id = Uuid::new_v4().to_string();
    let now = Utc::now();

    sqlx::query(
        r#"
        INSERT INTO courses (id, name, description, responsible_id, created_at, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?5)
        "#,
    )
    .bind(&id)
    .bind(&name)
    .bind(&description)
    .bind(&responsible_id)
    .bind(now)
    .execute(&mut *conn)
    .await?;

    Ok(Course {
        id,
        name,
        description,
        responsible_id,
        session_ids: Vec::new(),
        created_at: now,
        updated_at: now,
    })
}

pub async fn update_course(
    db: &SqlitePool,
    id: &str,
    req: UpdateCourseRequest,
) -> Result<Option<Course>, AppError> {
    let mut tx = db.begin().await?;
    let mut current = match load_course(&mut tx, id).await? {
        Some(c) => c,
        None => return Ok(None),
    };

    if let Some(name) = req.name {
        current.name = name;
    }
    if let Some(description) = req.description {
        current.description = description;
    }
    if let Some(responsible_id) = req.responsible_id {
        current.responsible_id = responsible_id;
    }
    current.updated_at = Utc::now();

    sqlx::query(
        r#"
        UPDATE courses
        SET name = ?1,
            description = ?2,
            responsible_id = ?3,
            updated_at = ?4
        WHERE id = ?5
        "#,
    )
    .bind(&current.name)
    .bind(&current.description)
    .bind(&current.responsible_id)
    .bind(current.updated_at)
    .bind(id)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(Some(current))
}

/// Sessions (and their attendee links) go with the course.
pub async fn delete_course(db: &SqlitePool, id: &str) -> Result<bool, AppError> {
    let result = sqlx::query("DELETE FROM courses WHERE id = ?")
        .bind(id)
        .execute(db)
        .await?
        .rows_affected();
    Ok(result > 0)
}

pub fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Case-insensitive count of course names starting with `prefix`.
pub async fn count_courses_with_prefix(conn: &mut SqliteConnection, prefix: &str) -> Result<i64, AppError> {
    let pattern = format!("{}%", escape_like(prefix));
    let count = sqlx::query_scalar::<_, i64>(
        r"SELECT COUNT(*) FROM courses WHERE name LIKE ? ESCAPE '\'",
    )
    .bind(pattern)
    .fetch_one(&mut *conn)
    .await?;
    Ok(count)
}

async fn session_attendees(conn: &mut SqliteConnection, session_id: &str) -> Result<Vec<String>, AppError> {
    let ids = sqlx::query_scalar::<_, String>(
        "SELECT partner_id FROM session_attendees WHERE session_id = ?",
    )
    .bind(session_id)
    .fetch_all(&mut *conn)
    .await?;
    Ok(ids)
}

pub async fn load_session(conn: &mut SqliteConnection, id: &str) -> Result<Option<SessionDraft>, AppError> {
    let row = sqlx::query_as::<_, SessionRow>(
        r#"
        SELECT id, name, start_date, created_at, duration, seats, instructor_id,
               course_id, active, end_date, attendees_count, color, updated_at
        FROM sessions
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;

    match row {
        Some(row) => {
            let attendees = session_attendees(conn, &row.id).await?;
            Ok(Some(SessionDraft::from_row(row, attendees)))
        }
        None => Ok(None),
    }
}

pub async fn find_session_by_id(db: &SqlitePool, id: &str) -> Result<Option<Session>, AppError> {
    let mut conn = db.acquire().await?;
    Ok(load_session(&mut conn, id).await?.map(|d| d.to_session()))
}

pub async fn fetch_sessions(db: &SqlitePool, params: &SessionQueryParams) -> Result<Vec<Session>, AppError> {
    let mut conn = db.acquire().await?;
    let rows = sqlx::query_as::<_, SessionRow>(
        r#"
        SELECT id, name, start_date, created_at, duration, seats, instructor_id,
               course_id, active, end_date, attendees_count, color, updated_at
        FROM sessions
        WHERE (?1 IS NULL OR course_id = ?1)
          AND (?2 OR active = 1)
        ORDER BY start_date, name
        "#,
    )
    .bind(&params.course_id)
    .bind(params.include_inactive)
    .fetch_all(&mut *conn)
    .await?;

    let mut sessions = Vec::with_capacity(rows.len());
    for row in rows {
        let attendees = session_attendees(&mut conn, &row.id).await?;
        sessions.push(SessionDraft::from_row(row, attendees).to_session());
    }
    Ok(sessions)
}

pub async fn insert_session(conn: &mut SqliteConnection, draft: &SessionDraft) -> Result<(), AppError> {
    sqlx::query(
        r#"
        INSERT INTO sessions
            (id, name, start_date, created_at, duration, seats, instructor_id,
            course_id, active, end_date, attendees_count, color, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
        "#,
    )
    .bind(&draft.id)
    .bind(&draft.name)
    .bind(draft.start_date())
    .bind(draft.created_at)
    .bind(draft.duration())
    .bind(draft.seats())
    .bind(&draft.instructor_id)
    .bind(&draft.course_id)
    .bind(draft.active)
    .bind(draft.end_date())
    .bind(draft.attendees_count())
    .bind(draft.color)
    .bind(draft.updated_at)
    .execute(&mut *conn)
    .await?;

    replace_attendees(conn, draft).await
}

pub async fn update_session(conn: &mut SqliteConnection, draft: &SessionDraft) -> Result<(), AppError> {
    sqlx::query(
        r#"
        UPDATE sessions
        SET name = ?1,
            start_date = ?2,
            duration = ?3,
            seats = ?4,
            instructor_id = ?5,
            course_id = ?6,
            active = ?7,
            end_date = ?8,
            attendees_count = ?9,
            color = ?10,
            updated_at = ?11
        WHERE id = ?12
        "#,
    )
    .bind(&draft.name)
    .bind(draft.start_date())
    .bind(draft.duration())
    .bind(draft.seats())
    .bind(&draft.instructor_id)
    .bind(&draft.course_id)
    .bind(draft.active)
    .bind(draft.end_date())
    .bind(draft.attendees_count())
    .bind(draft.color)
    .bind(draft.updated_at)
    .bind(&draft.id)
    .execute(&mut *conn)
    .await?;

    replace_attendees(conn, draft).await
}

async fn replace_attendees(conn: &mut SqliteConnection, draft: &SessionDraft) -> Result<(), AppError> {
    sqlx::query("DELETE FROM session_attendees WHERE session_id = ?")
        .bind(&draft.id)
        .execute(&mut *conn)
        .await?;

    for partner_id in draft.attendees() {
        sqlx::query("INSERT INTO session_attendees (session_id, partner_id) VALUES (?, ?)")
            .bind(&draft.id)
            .bind(partner_id)
            .execute(&mut *conn)
            .await?;
    }
    Ok(())
}

pub async fn delete_session(db: &SqlitePool, id: &str) -> Result<bool, AppError> {
    let result = sqlx::query("DELETE FROM sessions WHERE id = ?")
        .bind(id)
        .execute(db)
        .await?
        .rows_affected();
    Ok(result > 0)
}
