use crate::limits::*;
use crate::model::*;

use super::{Engine, EngineError};

impl Engine {
    /// Admit a roster in order, at medium priority. Each student is decided under
    /// its own acquisition of the course lock, so single requests interleave with a
    /// long import. A rejected row never stops the rows after it.
    pub async fn process_batch(&self, course_id: &str, student_ids: &[StudentId]) -> Result<BatchResult, EngineError> {
        if student_ids.len() > MAX_BATCH_SIZE {
            return Err(EngineError::LimitExceeded("batch too large"));
        }
        metrics::histogram!(crate::observability::BATCH_SIZE).record(student_ids.len() as f64);
        let started = std::time::Instant::now();

        let mut result = BatchResult::default();
        for student_id in student_ids {
            let outcome = self
                .request_admission(student_id, course_id, PriorityTier::Medium)
                .await;
            result.record(student_id.clone(), outcome);
        }

        metrics::histogram!(crate::observability::BATCH_DURATION_SECONDS)
            .record(started.elapsed().as_secs_f64());
        tracing::info!(
            "batch for {course_id}: {} admitted, {} waitlisted, {} rejected",
            result.admitted_count,
            result.waitlisted_count,
            result.rejected_count
        );
        Ok(result)
    }
}
