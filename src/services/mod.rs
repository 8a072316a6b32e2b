pub mod capacity;
pub mod constraints;
pub mod course_copy;
pub mod derived;
pub mod enrollment;
pub mod sessions;

pub use enrollment::EnrollmentService;

use crate::error::AppError;

/// Required text fields reject empty or blank values.
pub fn require_name(field: &str, value: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::BadRequest(format!("{} is required", field)));
    }
    Ok(())
}
