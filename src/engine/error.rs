use crate::model::CourseId;

#[derive(Debug)]
pub enum EngineError {
    CourseNotFound(CourseId),
    AlreadyExists(CourseId),
    /// Another course already offers this subject at this campus.
    DuplicateOffering {
        subject: String,
        campus: String,
    },
    /// Course still has enrolled or waitlisted students.
    HasEnrollments(CourseId),
    InvalidCapacity {
        course_id: CourseId,
        requested: u32,
        enrolled: u32,
    },
    LimitExceeded(&'static str),
    JournalError(String),
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineError::CourseNotFound(id) => write!(f, "course not found: {id}"),
            EngineError::AlreadyExists(id) => write!(f, "course already exists: {id}"),
            EngineError::DuplicateOffering { subject, campus } => {
                write!(f, "{subject} is already offered at {campus}")
            }
            EngineError::HasEnrollments(id) => {
                write!(f, "cannot retire course {id}: has enrolled or waitlisted students")
            }
            EngineError::InvalidCapacity {
                course_id,
                requested,
                enrolled,
            } => write!(
                f,
                "invalid capacity {requested} for course {course_id}: {enrolled} students enrolled"
            ),
            EngineError::LimitExceeded(msg) => write!(f, "limit exceeded: {msg}"),
            EngineError::JournalError(e) => write!(f, "journal error: {e}"),
        }
    }
}

impl std::error::Error for EngineError {}
