/// Maximum courses held by one engine.
pub const MAX_COURSES: usize = 100_000;

/// Maximum byte length of a course, student or campus identifier.
pub const MAX_ID_LEN: usize = 256;

/// Maximum byte length of a course display name.
pub const MAX_NAME_LEN: usize = 1024;

/// Maximum prerequisites listed on one course.
pub const MAX_PREREQUISITES: usize = 64;

/// Maximum entries in one course's waitlist.
pub const MAX_WAITLIST_PER_COURSE: usize = 10_000;

/// Maximum students in a single roster import.
pub const MAX_BATCH_SIZE: usize = 10_000;

/// Maximum snapshots retained per course.
pub const MAX_SNAPSHOTS_PER_COURSE: usize = 1_000_000;

/// Maximum encoded size of one audit journal record. A longer length prefix marks a corrupt tail.
pub const MAX_JOURNAL_RECORD_LEN: usize = 64 * 1024;
