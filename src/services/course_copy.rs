use sqlx::SqlitePool;
use tracing::info;

use crate::db::repository;
use crate::error::AppError;
use crate::models::{CopyCourseRequest, Course};

pub const COPY_PREFIX: &str = "Copy of ";

/// `existing_copies` is the number of courses already named
/// "Copy of <name>..." (any case).
pub fn copy_name(name: &str, existing_copies: i64) -> String {
    if existing_copies == 0 {
        format!("{}{}", COPY_PREFIX, name)
    } else {
        format!("{}{} ({})", COPY_PREFIX, name, existing_copies)
    }
}

/// Duplicates a course without its sessions. `None` when the source course
/// does not exist.
pub async fn copy_course(
    db: &SqlitePool,
    id: &str,
    req: CopyCourseRequest,
) -> Result<Option<Course>, AppError> {
    let mut tx = db.begin().await?;
    let original = match repository::load_course(&mut tx, id).await? {
        Some(c) => c,
        None => return Ok(None),
    };

    let name = match req.name {
        Some(name) => name,
        None => {
            let prefix = format!("{}{}", COPY_PREFIX, original.name);
            let count = repository::count_courses_with_prefix(&mut tx, &prefix).await?;
            copy_name(&original.name, count)
        }
    };
    let description = req.description.or(original.description);

    let course =
        repository::insert_course_row(&mut tx, name, description, original.responsible_id).await?;
    tx.commit().await?;

    info!("copied course {} to {} ({})", original.id, course.id, course.name);
    Ok(Some(course))
}
