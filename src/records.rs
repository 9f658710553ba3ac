//! Collaborators the engine reads from but does not own.

use std::collections::HashSet;
use std::fmt;

use async_trait::async_trait;
use dashmap::DashMap;

use crate::model::{CourseId, CourseInfo, StudentId};

#[derive(Debug)]
pub enum RecordsError {
    UnknownStudent(StudentId),
    Unavailable(String),
}

impl fmt::Display for RecordsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordsError::UnknownStudent(id) => write!(f, "no record for student: {id}"),
            RecordsError::Unavailable(e) => write!(f, "student records unavailable: {e}"),
        }
    }
}

impl std::error::Error for RecordsError {}

/// Read access to students' completed coursework.
#[async_trait]
pub trait StudentRecords: Send + Sync {
    async fn completed_courses(&self, student_id: &str) -> Result<HashSet<CourseId>, RecordsError>;
}

/// Decides whether a cross-campus request may proceed (registrar rules, payment holds, ...).
#[async_trait]
pub trait ApprovalGate: Send + Sync {
    async fn approve_cross_campus(&self, student_id: &str, from: &CourseInfo, to: &CourseInfo) -> bool;
}

pub struct AlwaysApprove;

#[async_trait]
impl ApprovalGate for AlwaysApprove {
    async fn approve_cross_campus(&self, _student_id: &str, _from: &CourseInfo, _to: &CourseInfo) -> bool {
        true
    }
}

pub struct InMemoryStudentRecords {
    completed: DashMap<StudentId, HashSet<CourseId>>,
}

impl Default for InMemoryStudentRecords {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStudentRecords {
    pub fn new() -> Self {
        Self {
            completed: DashMap::new(),
        }
    }

    /// Register a student; replaces any existing record.
    pub fn insert<I, S>(&self, student_id: impl Into<StudentId>, completed: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<CourseId>,
    {
        self.completed
            .insert(student_id.into(), completed.into_iter().map(Into::into).collect());
    }

    /// Returns false if the student has no record.
    pub fn mark_completed(&self, student_id: &str, course_id: impl Into<CourseId>) -> bool {
        match self.completed.get_mut(student_id) {
            Some(mut courses) => {
                courses.insert(course_id.into());
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.completed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.completed.is_empty()
    }
}

#[async_trait]
impl StudentRecords for InMemoryStudentRecords {
    async fn completed_courses(&self, student_id: &str) -> Result<HashSet<CourseId>, RecordsError> {
        self.completed
            .get(student_id)
            .map(|e| e.value().clone())
            .ok_or_else(|| RecordsError::UnknownStudent(student_id.to_string()))
    }
}
