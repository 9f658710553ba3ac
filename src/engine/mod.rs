mod admission;
mod analytics;
mod batch;
mod cross_campus;
mod error;
mod prerequisites;
mod registry;

pub use error::EngineError;
pub use prerequisites::prerequisites_met;

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::RwLock;
use ulid::Ulid;

use crate::journal::JournalHandle;
use crate::model::*;
use crate::notify::NotifyHub;
use crate::records::{AlwaysApprove, ApprovalGate, StudentRecords};

/// One course behind its admission lock. The write guard is the only path to
/// roster or waitlist mutation.
pub type SharedCourseState = Arc<RwLock<CourseState>>;

pub(crate) fn now_ms() -> Ms {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as Ms)
        .unwrap_or(0)
}

pub struct Engine {
    pub(super) courses: DashMap<CourseId, SharedCourseState>,
    /// Reverse lookup: waitlist entry id → course id
    pub(super) entry_to_course: DashMap<Ulid, CourseId>,
    /// (subject, campus) → course id, for cross-campus lookups.
    pub(super) offerings: DashMap<(String, String), CourseId>,
    /// Append-only snapshot series per course. Outlives course retirement.
    pub(super) snapshots: DashMap<CourseId, Vec<EnrollmentSnapshot>>,
    pub notify: Arc<NotifyHub>,
    records: Arc<dyn StudentRecords>,
    approvals: Arc<dyn ApprovalGate>,
    journal: Option<JournalHandle>,
}

impl Engine {
    pub fn new(records: Arc<dyn StudentRecords>) -> Self {
        Self {
            courses: DashMap::new(),
            entry_to_course: DashMap::new(),
            offerings: DashMap::new(),
            snapshots: DashMap::new(),
            notify: Arc::new(NotifyHub::new()),
            records,
            approvals: Arc::new(AlwaysApprove),
            journal: None,
        }
    }

    pub fn with_approval_gate(mut self, approvals: Arc<dyn ApprovalGate>) -> Self {
        self.approvals = approvals;
        self
    }

    pub fn with_journal(mut self, journal: JournalHandle) -> Self {
        self.journal = Some(journal);
        self
    }

    pub fn with_notify(mut self, notify: Arc<NotifyHub>) -> Self {
        self.notify = notify;
        self
    }

    pub fn get_course_state(&self, id: &str) -> Option<SharedCourseState> {
        self.courses.get(id).map(|e| e.value().clone())
    }

    pub fn get_course_for_entry(&self, entry_id: &Ulid) -> Option<CourseId> {
        self.entry_to_course.get(entry_id).map(|e| e.value().clone())
    }

    /// Fan an event out to subscribers and the audit journal.
    ///
    /// Callers hold the course's write guard, so per-course order in the journal
    /// matches the order decisions were made. A journal failure never undoes a decision.
    pub(super) async fn publish(&self, event: EnrollmentEvent) {
        self.notify.send(event.course_id(), &event);
        if let Some(journal) = &self.journal
            && let Err(e) = journal.append(event).await
        {
            metrics::counter!(crate::observability::JOURNAL_FAILURES_TOTAL).increment(1);
            tracing::warn!("audit journal append failed: {e}");
        }
    }

    /// Admit waitlist heads until the course is full or the waitlist is empty.
    /// Caller holds the write guard.
    pub(super) async fn fill_free_seats(&self, cs: &mut CourseState) -> Vec<WaitlistEntry> {
        let mut promoted = Vec::new();
        while cs.has_free_seat() {
            let Some(entry) = cs.waitlist.dequeue_head() else {
                break;
            };
            self.entry_to_course.remove(&entry.id);
            cs.roster.insert(entry.student_id.clone());
            tracing::info!(
                "promoted {} from waitlist of {} ({} tier)",
                entry.student_id,
                cs.id,
                entry.tier
            );
            metrics::counter!(crate::observability::PROMOTIONS_TOTAL).increment(1);
            self.publish(EnrollmentEvent::Promoted {
                course_id: cs.id.clone(),
                student_id: entry.student_id.clone(),
                entry_id: entry.id,
            })
            .await;
            promoted.push(entry);
        }
        promoted
    }
}
