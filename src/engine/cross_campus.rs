use crate::model::*;

use super::Engine;

impl Engine {
    /// Course id of the offering of `subject` at `campus`, if any.
    pub fn find_offering(&self, subject: &str, campus: &str) -> Option<CourseId> {
        self.offerings
            .get(&(subject.to_string(), campus.to_string()))
            .map(|e| e.value().clone())
    }

    /// True when another campus offers the same course and has a free seat right now.
    pub async fn check_availability(&self, course_id: &str, target_campus: &str) -> bool {
        let Ok(source) = self.get_course(course_id).await else {
            return false;
        };
        if source.campus == target_campus {
            return false;
        }
        let Some(target_id) = self.find_offering(&source.subject, target_campus) else {
            return false;
        };
        self.get_course(&target_id)
            .await
            .is_ok_and(|target| target.enrolled < target.capacity)
    }

    /// Ask for a seat in the `target_campus` offering of `course_id`. The target
    /// course's own admission rules apply, so a full offering waitlists the student.
    pub async fn request_cross_campus_enrollment(
        &self,
        student_id: &str,
        course_id: &str,
        target_campus: &str,
    ) -> Admission {
        let Ok(source) = self.get_course(course_id).await else {
            return Admission::Rejected(RejectReason::CourseNotFound);
        };
        if source.campus == target_campus {
            return Admission::Rejected(RejectReason::NoCrossCampusOffering);
        }
        let Some(target_id) = self.find_offering(&source.subject, target_campus) else {
            return Admission::Rejected(RejectReason::NoCrossCampusOffering);
        };
        let Ok(target) = self.get_course(&target_id).await else {
            return Admission::Rejected(RejectReason::NoCrossCampusOffering);
        };

        if target.enrolled >= target.capacity {
            tracing::debug!("{target_id} at {target_campus} is full; {student_id} will be waitlisted");
        }
        if !self
            .approvals
            .approve_cross_campus(student_id, &source, &target)
            .await
        {
            tracing::info!("cross-campus request of {student_id} for {target_id} denied");
            return Admission::Rejected(RejectReason::ApprovalDenied);
        }

        self.request_admission(student_id, &target_id, PriorityTier::Medium)
            .await
    }
}
