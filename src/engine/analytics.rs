use std::sync::Arc;

use futures::future::join_all;

use crate::limits::*;
use crate::model::*;

use super::{now_ms, Engine, EngineError, SharedCourseState};

/// `enrolled / (enrolled + waitlisted)`, or 0 when both are zero.
pub(crate) fn enrollment_rate(enrolled: u64, waitlisted: u64) -> f64 {
    let total = enrolled + waitlisted;
    if total == 0 {
        return 0.0;
    }
    enrolled as f64 / total as f64
}

impl Engine {
    /// Capture the course's current counts and append them to its series.
    ///
    /// Capture, timestamp and append all happen under the course write guard, so
    /// concurrent calls land in the series in the order their counts were taken.
    /// Timestamps never go backwards within a course, even if the wall clock does.
    pub async fn record_snapshot(&self, course_id: &str) -> Result<EnrollmentSnapshot, EngineError> {
        let rs = self
            .get_course_state(course_id)
            .ok_or_else(|| EngineError::CourseNotFound(course_id.to_string()))?;
        let guard = rs.write().await;
        if guard.retired {
            return Err(EngineError::CourseNotFound(course_id.to_string()));
        }

        let snapshot = {
            let mut series = self.snapshots.entry(course_id.to_string()).or_default();
            if series.len() >= MAX_SNAPSHOTS_PER_COURSE {
                return Err(EngineError::LimitExceeded("too many snapshots for course"));
            }
            let now = now_ms();
            let timestamp = series.last().map_or(now, |last| now.max(last.timestamp));
            let snapshot = EnrollmentSnapshot {
                course_id: course_id.to_string(),
                timestamp,
                enrolled: guard.enrolled(),
                waitlisted: guard.waitlisted(),
            };
            series.push(snapshot.clone());
            snapshot
        };

        metrics::counter!(crate::observability::SNAPSHOTS_TOTAL).increment(1);
        self.publish(EnrollmentEvent::SnapshotRecorded {
            snapshot: snapshot.clone(),
        })
        .await;
        drop(guard);
        Ok(snapshot)
    }

    /// Snapshots of a course in the order they were recorded. Empty for a course
    /// that has none (or never existed).
    pub fn get_trend(&self, course_id: &str) -> Trend {
        self.snapshots
            .get(course_id)
            .map(|series| Trend::new(Arc::from(series.value().as_slice())))
            .unwrap_or_default()
    }

    /// Live `(course, enrolled, capacity)` rows, sorted by course id.
    pub async fn get_course_distribution(&self) -> Vec<CourseDistribution> {
        let states: Vec<SharedCourseState> = self.courses.iter().map(|e| e.value().clone()).collect();
        let mut rows = join_all(states.iter().map(|rs| async move {
            let guard = rs.read().await;
            CourseDistribution {
                course_id: guard.id.clone(),
                enrolled: guard.enrolled(),
                capacity: guard.capacity,
            }
        }))
        .await;
        rows.sort_by(|a, b| a.course_id.cmp(&b.course_id));
        rows
    }

    /// Totals over every registered course.
    pub async fn total_counts(&self) -> (u64, u64) {
        let states: Vec<SharedCourseState> = self.courses.iter().map(|e| e.value().clone()).collect();
        let mut enrolled = 0u64;
        let mut waitlisted = 0u64;
        for rs in states {
            let guard = rs.read().await;
            enrolled += u64::from(guard.enrolled());
            waitlisted += u64::from(guard.waitlisted());
        }
        (enrolled, waitlisted)
    }

    /// Share of demand that holds a seat, across all courses. 0 when there is no demand.
    pub async fn get_enrollment_rate(&self) -> f64 {
        let (enrolled, waitlisted) = self.total_counts().await;
        enrollment_rate(enrolled, waitlisted)
    }

    pub async fn course_enrollment_rate(&self, course_id: &str) -> Result<f64, EngineError> {
        let info = self.get_course(course_id).await?;
        Ok(enrollment_rate(info.enrolled.into(), info.waitlisted.into()))
    }

    /// Everything an enrollment dashboard shows for one course.
    pub async fn course_analytics(&self, course_id: &str) -> Result<CourseAnalytics, EngineError> {
        let info = self.get_course(course_id).await?;
        Ok(CourseAnalytics {
            total_enrolled: info.enrolled,
            total_waitlisted: info.waitlisted,
            enrollment_rate: enrollment_rate(info.enrolled.into(), info.waitlisted.into()),
            trend: self.get_trend(course_id),
            distribution: self.get_course_distribution().await,
        })
    }
}
