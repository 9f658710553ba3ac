use ulid::Ulid;

use crate::limits::*;
use crate::model::*;

use super::{now_ms, Engine, EngineError};

impl Engine {
    /// Decide one admission attempt. Every path ends in a terminal outcome.
    pub async fn request_admission(&self, student_id: &str, course_id: &str, tier: PriorityTier) -> Admission {
        let outcome = self.decide_admission(student_id, course_id, tier).await;
        let reason = match outcome {
            Admission::Rejected(reason) => reason.as_str(),
            _ => "none",
        };
        metrics::counter!(
            crate::observability::ADMISSIONS_TOTAL,
            "outcome" => outcome.label(),
            "reason" => reason
        )
        .increment(1);
        outcome
    }

    async fn decide_admission(&self, student_id: &str, course_id: &str, tier: PriorityTier) -> Admission {
        let Some(rs) = self.get_course_state(course_id) else {
            return Admission::Rejected(RejectReason::CourseNotFound);
        };
        if student_id.is_empty() || student_id.len() > MAX_ID_LEN {
            return Admission::Rejected(RejectReason::StudentRecordUnavailable);
        }

        // Prerequisites never change after registration; checking them outside the
        // admission lock keeps record lookups from serializing the course.
        let prerequisites = rs.read().await.prerequisites.clone();
        if let Err(reason) = self.check_prerequisites(student_id, &prerequisites).await {
            tracing::debug!("rejected {student_id} for {course_id}: {reason}");
            return Admission::Rejected(reason);
        }

        let mut guard = rs.write().await;
        if guard.retired {
            return Admission::Rejected(RejectReason::CourseNotFound);
        }
        if guard.roster.contains(student_id) {
            return Admission::Rejected(RejectReason::AlreadyEnrolled);
        }
        if guard.waitlist.contains_student(student_id) {
            return Admission::Rejected(RejectReason::AlreadyWaitlisted);
        }

        if guard.has_free_seat() {
            guard.roster.insert(student_id.to_string());
            tracing::debug!(
                "admitted {student_id} to {course_id} ({}/{})",
                guard.enrolled(),
                guard.capacity
            );
            self.publish(EnrollmentEvent::Admitted {
                course_id: course_id.to_string(),
                student_id: student_id.to_string(),
            })
            .await;
            return Admission::Admitted;
        }

        if guard.waitlist.len() >= MAX_WAITLIST_PER_COURSE {
            return Admission::Rejected(RejectReason::WaitlistFull);
        }
        let entry = guard.waitlist.enqueue(student_id.to_string(), tier, now_ms());
        self.entry_to_course.insert(entry.id, course_id.to_string());
        tracing::debug!(
            "waitlisted {student_id} for {course_id} at position {} ({tier} tier)",
            entry.position
        );
        self.publish(EnrollmentEvent::Waitlisted {
            course_id: course_id.to_string(),
            student_id: student_id.to_string(),
            entry_id: entry.id,
            tier,
            position: entry.position,
        })
        .await;
        Admission::Waitlisted {
            entry_id: entry.id,
            position: entry.position,
        }
    }

    /// Release a student's seat. If anyone is waiting, the head of the waitlist takes
    /// the seat before the lock is released. Returns false if the student held no seat.
    pub async fn drop_enrollment(&self, student_id: &str, course_id: &str) -> bool {
        let Some(rs) = self.get_course_state(course_id) else {
            return false;
        };
        let mut guard = rs.write().await;
        if guard.retired || !guard.roster.remove(student_id) {
            return false;
        }

        tracing::info!("dropped {student_id} from {course_id}");
        metrics::counter!(crate::observability::DROPS_TOTAL).increment(1);
        self.publish(EnrollmentEvent::Dropped {
            course_id: course_id.to_string(),
            student_id: student_id.to_string(),
        })
        .await;
        self.fill_free_seats(&mut guard).await;
        true
    }

    /// Explicit withdrawal of a waitlist entry. Later entries move up by one.
    pub async fn withdraw(&self, entry_id: Ulid) -> bool {
        let Some(course_id) = self.get_course_for_entry(&entry_id) else {
            return false;
        };
        let Some(rs) = self.get_course_state(&course_id) else {
            return false;
        };
        let mut guard = rs.write().await;
        let Some(entry) = guard.waitlist.remove(entry_id) else {
            return false;
        };
        self.record_withdrawal(&entry).await;
        true
    }

    pub async fn withdraw_student(&self, student_id: &str, course_id: &str) -> bool {
        let Some(rs) = self.get_course_state(course_id) else {
            return false;
        };
        let mut guard = rs.write().await;
        let Some(entry) = guard.waitlist.remove_student(student_id) else {
            return false;
        };
        self.record_withdrawal(&entry).await;
        true
    }

    async fn record_withdrawal(&self, entry: &WaitlistEntry) {
        self.entry_to_course.remove(&entry.id);
        tracing::debug!(
            "{} withdrew from waitlist of {} (was position {})",
            entry.student_id,
            entry.course_id,
            entry.position
        );
        metrics::counter!(crate::observability::WITHDRAWALS_TOTAL).increment(1);
        self.publish(EnrollmentEvent::Withdrawn {
            course_id: entry.course_id.clone(),
            student_id: entry.student_id.clone(),
            entry_id: entry.id,
        })
        .await;
    }

    /// Waitlist in queue order.
    pub async fn get_waitlist(&self, course_id: &str) -> Result<Vec<WaitlistEntry>, EngineError> {
        let rs = self
            .get_course_state(course_id)
            .ok_or_else(|| EngineError::CourseNotFound(course_id.to_string()))?;
        let guard = rs.read().await;
        Ok(guard.waitlist.entries().to_vec())
    }

    pub async fn is_enrolled(&self, student_id: &str, course_id: &str) -> bool {
        let Some(rs) = self.get_course_state(course_id) else {
            return false;
        };
        let guard = rs.read().await;
        guard.roster.contains(student_id)
    }

    /// Enrolled student ids, sorted.
    pub async fn get_roster(&self, course_id: &str) -> Result<Vec<StudentId>, EngineError> {
        let rs = self
            .get_course_state(course_id)
            .ok_or_else(|| EngineError::CourseNotFound(course_id.to_string()))?;
        let guard = rs.read().await;
        Ok(guard.roster.iter().cloned().collect())
    }
}
