use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use tokio::sync::RwLock;

use crate::limits::*;
use crate::model::*;

use super::{Engine, EngineError};

fn check_id(id: &str) -> Result<(), EngineError> {
    if id.is_empty() || id.len() > MAX_ID_LEN {
        return Err(EngineError::LimitExceeded("identifier empty or too long"));
    }
    Ok(())
}

impl Engine {
    pub async fn register_course(&self, spec: CourseSpec) -> Result<(), EngineError> {
        if self.courses.len() >= MAX_COURSES {
            return Err(EngineError::LimitExceeded("too many courses"));
        }
        check_id(&spec.id)?;
        check_id(&spec.campus)?;
        if let Some(ref s) = spec.subject {
            check_id(s)?;
        }
        if let Some(ref n) = spec.name
            && n.len() > MAX_NAME_LEN
        {
            return Err(EngineError::LimitExceeded("course name too long"));
        }
        if spec.prerequisites.len() > MAX_PREREQUISITES {
            return Err(EngineError::LimitExceeded("too many prerequisites"));
        }

        let cs = CourseState::from_spec(spec);
        if cs.capacity == 0 || cs.enrolled() > cs.capacity {
            return Err(EngineError::InvalidCapacity {
                course_id: cs.id.clone(),
                requested: cs.capacity,
                enrolled: cs.enrolled(),
            });
        }

        let event = EnrollmentEvent::CourseRegistered {
            course_id: cs.id.clone(),
            campus: cs.campus.clone(),
            capacity: cs.capacity,
        };
        {
            let offering = (cs.subject.clone(), cs.campus.clone());
            let Entry::Vacant(offering_slot) = self.offerings.entry(offering) else {
                return Err(EngineError::DuplicateOffering {
                    subject: cs.subject,
                    campus: cs.campus,
                });
            };
            let Entry::Vacant(course_slot) = self.courses.entry(cs.id.clone()) else {
                return Err(EngineError::AlreadyExists(cs.id));
            };
            offering_slot.insert(cs.id.clone());
            course_slot.insert(Arc::new(RwLock::new(cs)));
        }
        metrics::gauge!(crate::observability::COURSES_ACTIVE).set(self.courses.len() as f64);
        tracing::debug!("registered course {}", event.course_id());
        self.publish(event).await;
        Ok(())
    }

    pub async fn get_course(&self, id: &str) -> Result<CourseInfo, EngineError> {
        let rs = self
            .get_course_state(id)
            .ok_or_else(|| EngineError::CourseNotFound(id.to_string()))?;
        let guard = rs.read().await;
        Ok(guard.info())
    }

    pub async fn get_course_capacity(&self, id: &str) -> Result<u32, EngineError> {
        let rs = self
            .get_course_state(id)
            .ok_or_else(|| EngineError::CourseNotFound(id.to_string()))?;
        let guard = rs.read().await;
        Ok(guard.capacity)
    }

    /// Sorted ids of every registered course.
    pub fn course_ids(&self) -> Vec<CourseId> {
        let mut ids: Vec<CourseId> = self.courses.iter().map(|e| e.key().clone()).collect();
        ids.sort();
        ids
    }

    pub fn course_count(&self) -> usize {
        self.courses.len()
    }

    /// Change a course's capacity. Shrinking below the current roster is rejected
    /// without touching the course; growing fills the new seats from the waitlist.
    /// Returns the promoted entries.
    pub async fn set_capacity(&self, id: &str, new_capacity: u32) -> Result<Vec<WaitlistEntry>, EngineError> {
        let rs = self
            .get_course_state(id)
            .ok_or_else(|| EngineError::CourseNotFound(id.to_string()))?;
        let mut guard = rs.write().await;
        if guard.retired {
            return Err(EngineError::CourseNotFound(id.to_string()));
        }
        if new_capacity == 0 || new_capacity < guard.enrolled() {
            return Err(EngineError::InvalidCapacity {
                course_id: guard.id.clone(),
                requested: new_capacity,
                enrolled: guard.enrolled(),
            });
        }

        guard.capacity = new_capacity;
        tracing::info!("capacity of {} set to {new_capacity}", guard.id);
        self.publish(EnrollmentEvent::CapacityChanged {
            course_id: guard.id.clone(),
            capacity: new_capacity,
        })
        .await;
        Ok(self.fill_free_seats(&mut guard).await)
    }

    /// Remove a course with no enrolled or waitlisted students. Its snapshot history is kept.
    pub async fn retire_course(&self, id: &str) -> Result<(), EngineError> {
        let rs = self
            .get_course_state(id)
            .ok_or_else(|| EngineError::CourseNotFound(id.to_string()))?;
        let mut guard = rs.write().await;
        if guard.retired {
            return Err(EngineError::CourseNotFound(id.to_string()));
        }
        if !guard.roster.is_empty() || !guard.waitlist.is_empty() {
            return Err(EngineError::HasEnrollments(guard.id.clone()));
        }

        // Flagged under the write guard: requests already waiting on this lock see it and back off.
        guard.retired = true;
        self.publish(EnrollmentEvent::CourseRetired {
            course_id: guard.id.clone(),
        })
        .await;
        // The id stays registered until the channel is gone, so a re-registration
        // under the same id can never have its fresh subscribers dropped.
        self.notify.remove(id);
        self.offerings.remove(&(guard.subject.clone(), guard.campus.clone()));
        self.courses.remove(id);
        metrics::gauge!(crate::observability::COURSES_ACTIVE).set(self.courses.len() as f64);
        Ok(())
    }
}
