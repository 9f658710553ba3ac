use std::collections::HashSet;

use crate::model::{CourseId, RejectReason};

use super::Engine;

/// True when every prerequisite appears in `completed` (vacuously true for none).
pub fn prerequisites_met(prerequisites: &[CourseId], completed: &HashSet<CourseId>) -> bool {
    prerequisites.iter().all(|p| completed.contains(p))
}

impl Engine {
    /// Eligibility predicate. Unknown courses and unreadable student records both
    /// answer `false`; nothing is mutated.
    pub async fn validate(&self, student_id: &str, course_id: &str) -> bool {
        let Some(rs) = self.get_course_state(course_id) else {
            return false;
        };
        let prerequisites = rs.read().await.prerequisites.clone();
        self.check_prerequisites(student_id, &prerequisites).await.is_ok()
    }

    pub(super) async fn check_prerequisites(
        &self,
        student_id: &str,
        prerequisites: &[CourseId],
    ) -> Result<(), RejectReason> {
        if prerequisites.is_empty() {
            return Ok(());
        }
        let completed = match self.records.completed_courses(student_id).await {
            Ok(completed) => completed,
            Err(e) => {
                tracing::debug!("failing closed for {student_id}: {e}");
                return Err(RejectReason::StudentRecordUnavailable);
            }
        };
        if prerequisites_met(prerequisites, &completed) {
            Ok(())
        } else {
            Err(RejectReason::PrerequisitesNotMet)
        }
    }
}
