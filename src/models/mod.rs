pub mod course;
pub mod enrollment;
pub mod partner;
pub mod session;
pub mod user;

pub use course::{CopyCourseRequest, Course, CourseRow, NewCourseRequest, UpdateCourseRequest};
pub use enrollment::{EnrollmentContext, EnrollmentFailure, EnrollmentReport, EnrollmentRequest, SessionWarning};
pub use partner::{NewPartnerRequest, Partner, PartnerRow};
pub use session::{
    NewSessionRequest, OnchangeRequest, Session, SessionOutcome, SessionQueryParams, SessionRow,
    UpdateSessionRequest, Warning,
};
pub use user::{NewUserRequest, User};

use serde::{Deserialize, Deserializer};

/// Keeps "field absent" (`None`) apart from "field set to null" (`Some(None)`)
/// for PATCH bodies. Use together with `#[serde(default)]`.
pub(crate) fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
