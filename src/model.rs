use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use ulid::Ulid;

use crate::waitlist::WaitlistQueue;

/// Unix milliseconds.
pub type Ms = i64;

pub type CourseId = String;
pub type StudentId = String;

/// Waitlist urgency. Declaration order is queue order: `High` sorts first.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriorityTier {
    High,
    #[default]
    Medium,
    Low,
}

impl PriorityTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            PriorityTier::High => "high",
            PriorityTier::Medium => "medium",
            PriorityTier::Low => "low",
        }
    }
}

impl fmt::Display for PriorityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A pending seat request. `position` is 1-based and always contiguous within its course.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaitlistEntry {
    pub id: Ulid,
    pub student_id: StudentId,
    pub course_id: CourseId,
    pub tier: PriorityTier,
    pub position: u32,
    pub created_at: Ms,
    /// Per-course insertion counter; final tie-break after `created_at`.
    pub seq: u64,
}

/// What a catalog hands the registry when a course is set up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseSpec {
    pub id: CourseId,
    /// Shared by every campus offering of the same course. Defaults to `id`.
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    pub campus: String,
    pub capacity: u32,
    #[serde(default)]
    pub prerequisites: Vec<CourseId>,
    /// Students already holding a seat when the course is registered.
    #[serde(default)]
    pub enrolled: Vec<StudentId>,
}

impl CourseSpec {
    pub fn new(id: impl Into<CourseId>, campus: impl Into<String>, capacity: u32) -> Self {
        Self {
            id: id.into(),
            subject: None,
            name: None,
            campus: campus.into(),
            capacity,
            prerequisites: Vec::new(),
            enrolled: Vec::new(),
        }
    }

    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    pub fn prerequisites<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<CourseId>,
    {
        self.prerequisites = ids.into_iter().map(Into::into).collect();
        self
    }

    pub fn enrolled<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<StudentId>,
    {
        self.enrolled = ids.into_iter().map(Into::into).collect();
        self
    }
}

#[derive(Debug)]
pub struct CourseState {
    pub id: CourseId,
    pub subject: String,
    pub name: Option<String>,
    pub campus: String,
    pub capacity: u32,
    /// Ordered, duplicate-free.
    pub prerequisites: Vec<CourseId>,
    pub roster: BTreeSet<StudentId>,
    pub waitlist: WaitlistQueue,
    /// Set once the course is removed from the registry.
    pub retired: bool,
}

impl CourseState {
    pub fn from_spec(spec: CourseSpec) -> Self {
        let mut prerequisites: Vec<CourseId> = Vec::with_capacity(spec.prerequisites.len());
        for p in spec.prerequisites {
            if !prerequisites.contains(&p) {
                prerequisites.push(p);
            }
        }
        let subject = spec.subject.unwrap_or_else(|| spec.id.clone());
        Self {
            waitlist: WaitlistQueue::new(spec.id.clone()),
            id: spec.id,
            subject,
            name: spec.name,
            campus: spec.campus,
            capacity: spec.capacity,
            prerequisites,
            roster: spec.enrolled.into_iter().collect(),
            retired: false,
        }
    }

    pub fn enrolled(&self) -> u32 {
        self.roster.len() as u32
    }

    /// Always equals the live entry count of the waitlist.
    pub fn waitlisted(&self) -> u32 {
        self.waitlist.len() as u32
    }

    pub fn has_free_seat(&self) -> bool {
        self.enrolled() < self.capacity
    }

    pub fn info(&self) -> CourseInfo {
        CourseInfo {
            id: self.id.clone(),
            subject: self.subject.clone(),
            name: self.name.clone(),
            campus: self.campus.clone(),
            capacity: self.capacity,
            enrolled: self.enrolled(),
            waitlisted: self.waitlisted(),
            prerequisites: self.prerequisites.clone(),
        }
    }
}

/// Why an admission attempt ended in `Rejected`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RejectReason {
    CourseNotFound,
    PrerequisitesNotMet,
    /// The student record could not be read; eligibility fails closed.
    StudentRecordUnavailable,
    NoCrossCampusOffering,
    ApprovalDenied,
    AlreadyEnrolled,
    AlreadyWaitlisted,
    WaitlistFull,
}

impl RejectReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            RejectReason::CourseNotFound => "course_not_found",
            RejectReason::PrerequisitesNotMet => "prerequisites_not_met",
            RejectReason::StudentRecordUnavailable => "student_record_unavailable",
            RejectReason::NoCrossCampusOffering => "no_cross_campus_offering",
            RejectReason::ApprovalDenied => "approval_denied",
            RejectReason::AlreadyEnrolled => "already_enrolled",
            RejectReason::AlreadyWaitlisted => "already_waitlisted",
            RejectReason::WaitlistFull => "waitlist_full",
        }
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal state of one admission attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Admission {
    Admitted,
    Waitlisted { entry_id: Ulid, position: u32 },
    Rejected(RejectReason),
}

impl Admission {
    pub fn is_admitted(&self) -> bool {
        matches!(self, Admission::Admitted)
    }

    pub fn is_waitlisted(&self) -> bool {
        matches!(self, Admission::Waitlisted { .. })
    }

    pub fn is_rejected(&self) -> bool {
        matches!(self, Admission::Rejected(_))
    }

    /// Short label for metrics.
    pub fn label(&self) -> &'static str {
        match self {
            Admission::Admitted => "admitted",
            Admission::Waitlisted { .. } => "waitlisted",
            Admission::Rejected(_) => "rejected",
        }
    }
}

/// Immutable point-in-time capture of one course's counts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrollmentSnapshot {
    pub course_id: CourseId,
    pub timestamp: Ms,
    pub enrolled: u32,
    pub waitlisted: u32,
}

/// Flat event records. Also the audit journal record format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EnrollmentEvent {
    CourseRegistered {
        course_id: CourseId,
        campus: String,
        capacity: u32,
    },
    CourseRetired {
        course_id: CourseId,
    },
    CapacityChanged {
        course_id: CourseId,
        capacity: u32,
    },
    Admitted {
        course_id: CourseId,
        student_id: StudentId,
    },
    Waitlisted {
        course_id: CourseId,
        student_id: StudentId,
        entry_id: Ulid,
        tier: PriorityTier,
        position: u32,
    },
    Promoted {
        course_id: CourseId,
        student_id: StudentId,
        entry_id: Ulid,
    },
    Dropped {
        course_id: CourseId,
        student_id: StudentId,
    },
    Withdrawn {
        course_id: CourseId,
        student_id: StudentId,
        entry_id: Ulid,
    },
    SnapshotRecorded {
        snapshot: EnrollmentSnapshot,
    },
}

impl EnrollmentEvent {
    pub fn course_id(&self) -> &str {
        match self {
            EnrollmentEvent::CourseRegistered { course_id, .. }
            | EnrollmentEvent::CourseRetired { course_id }
            | EnrollmentEvent::CapacityChanged { course_id, .. }
            | EnrollmentEvent::Admitted { course_id, .. }
            | EnrollmentEvent::Waitlisted { course_id, .. }
            | EnrollmentEvent::Promoted { course_id, .. }
            | EnrollmentEvent::Dropped { course_id, .. }
            | EnrollmentEvent::Withdrawn { course_id, .. } => course_id,
            EnrollmentEvent::SnapshotRecorded { snapshot } => &snapshot.course_id,
        }
    }

    /// The student the event is about, if any. Course-level events have none.
    pub fn student_id(&self) -> Option<&str> {
        match self {
            EnrollmentEvent::Admitted { student_id, .. }
            | EnrollmentEvent::Waitlisted { student_id, .. }
            | EnrollmentEvent::Promoted { student_id, .. }
            | EnrollmentEvent::Dropped { student_id, .. }
            | EnrollmentEvent::Withdrawn { student_id, .. } => Some(student_id),
            EnrollmentEvent::CourseRegistered { .. }
            | EnrollmentEvent::CourseRetired { .. }
            | EnrollmentEvent::CapacityChanged { .. }
            | EnrollmentEvent::SnapshotRecorded { .. } => None,
        }
    }
}

// ── Query result types ───────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CourseInfo {
    pub id: CourseId,
    pub subject: String,
    pub name: Option<String>,
    pub campus: String,
    pub capacity: u32,
    pub enrolled: u32,
    pub waitlisted: u32,
    pub prerequisites: Vec<CourseId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CourseDistribution {
    pub course_id: CourseId,
    pub enrolled: u32,
    pub capacity: u32,
}

/// Per-invocation outcome of a roster import.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchResult {
    pub admitted_count: usize,
    pub waitlisted_count: usize,
    pub rejected_count: usize,
    /// One entry per requested student, in request order.
    pub outcomes: Vec<(StudentId, Admission)>,
}

impl BatchResult {
    pub fn record(&mut self, student_id: StudentId, outcome: Admission) {
        match outcome {
            Admission::Admitted => self.admitted_count += 1,
            Admission::Waitlisted { .. } => self.waitlisted_count += 1,
            Admission::Rejected(_) => self.rejected_count += 1,
        }
        self.outcomes.push((student_id, outcome));
    }

    /// Rows a caller may want to retry.
    pub fn rejected(&self) -> impl Iterator<Item = (&str, RejectReason)> {
        self.outcomes.iter().filter_map(|(sid, outcome)| match outcome {
            Admission::Rejected(reason) => Some((sid.as_str(), *reason)),
            _ => None,
        })
    }
}

/// Chronological, append-only view of a course's snapshots.
///
/// Cheap to clone; iterating never consumes it, so the sequence can be walked any number of times.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trend {
    snapshots: Arc<[EnrollmentSnapshot]>,
}

impl Trend {
    pub fn new(snapshots: Arc<[EnrollmentSnapshot]>) -> Self {
        Self { snapshots }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, EnrollmentSnapshot> {
        self.snapshots.iter()
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    pub fn latest(&self) -> Option<&EnrollmentSnapshot> {
        self.snapshots.last()
    }
}

impl Default for Trend {
    fn default() -> Self {
        Self {
            snapshots: Arc::from(Vec::new()),
        }
    }
}

impl<'a> IntoIterator for &'a Trend {
    type Item = &'a EnrollmentSnapshot;
    type IntoIter = std::slice::Iter<'a, EnrollmentSnapshot>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CourseAnalytics {
    pub total_enrolled: u32,
    pub total_waitlisted: u32,
    pub enrollment_rate: f64,
    pub trend: Trend,
    pub distribution: Vec<CourseDistribution>,
}
