//! JSON seed files: the course catalog, student transcripts and roster imports.

use std::fmt;
use std::io;
use std::path::Path;

use serde::Deserialize;

use crate::engine::{Engine, EngineError};
use crate::model::{CourseId, CourseSpec, StudentId};
use crate::records::InMemoryStudentRecords;

/// Registrar exports spell "no prerequisites" as a single literal entry.
const NO_PREREQUISITES: &str = "None";

#[derive(Debug)]
pub enum CatalogError {
    Io(io::Error),
    Parse(serde_json::Error),
}

impl fmt::Display for CatalogError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CatalogError::Io(e) => write!(f, "catalog read failed: {e}"),
            CatalogError::Parse(e) => write!(f, "catalog parse failed: {e}"),
        }
    }
}

impl std::error::Error for CatalogError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CatalogError::Io(e) => Some(e),
            CatalogError::Parse(e) => Some(e),
        }
    }
}

impl From<io::Error> for CatalogError {
    fn from(e: io::Error) -> Self {
        CatalogError::Io(e)
    }
}

impl From<serde_json::Error> for CatalogError {
    fn from(e: serde_json::Error) -> Self {
        CatalogError::Parse(e)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StudentSeed {
    pub id: StudentId,
    #[serde(default)]
    pub completed: Vec<CourseId>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CatalogSeed {
    #[serde(default)]
    pub courses: Vec<CourseSpec>,
    #[serde(default)]
    pub students: Vec<StudentSeed>,
}

/// Students to admit into one course, in request order.
#[derive(Debug, Clone, Deserialize)]
pub struct RosterImport {
    pub course_id: CourseId,
    pub students: Vec<StudentId>,
}

pub fn parse_catalog(json: &str) -> Result<CatalogSeed, CatalogError> {
    let mut seed: CatalogSeed = serde_json::from_str(json)?;
    for course in &mut seed.courses {
        course.prerequisites.retain(|p| p != NO_PREREQUISITES);
    }
    Ok(seed)
}

pub fn load_catalog(path: &Path) -> Result<CatalogSeed, CatalogError> {
    let json = std::fs::read_to_string(path)?;
    parse_catalog(&json)
}

pub fn parse_rosters(json: &str) -> Result<Vec<RosterImport>, CatalogError> {
    Ok(serde_json::from_str(json)?)
}

pub fn load_rosters(path: &Path) -> Result<Vec<RosterImport>, CatalogError> {
    let json = std::fs::read_to_string(path)?;
    parse_rosters(&json)
}

impl CatalogSeed {
    pub fn student_records(&self) -> InMemoryStudentRecords {
        let records = InMemoryStudentRecords::new();
        for student in &self.students {
            records.insert(student.id.clone(), student.completed.iter().cloned());
        }
        records
    }

    /// Register every course. Stops at the first failure; courses registered
    /// before it stay registered.
    pub async fn register_all(&self, engine: &Engine) -> Result<usize, EngineError> {
        for spec in &self.courses {
            engine.register_course(spec.clone()).await?;
        }
        Ok(self.courses.len())
    }
}
