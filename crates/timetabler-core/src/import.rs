//! Roster import from a JSON document.
//!
//! Entities reference each other by natural key: courses by code, teachers,
//! students and classrooms by name, sections by code. The whole document is
//! checked first and then written in one transaction.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{Result, ValidationError};
use crate::storage::{CatalogCounts, TimetableDb};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseRecord {
    pub code: String,
    pub title: String,
    pub credits: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassroomRecord {
    pub name: String,
    pub capacity: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionRecord {
    pub code: String,
    /// Course code.
    pub course: String,
    /// Teacher name.
    pub teacher: String,
    #[serde(default)]
    pub closed: bool,
    /// Student names.
    #[serde(default)]
    pub students: Vec<String>,
}

/// A complete or partial catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterDocument {
    #[serde(default)]
    pub courses: Vec<CourseRecord>,
    #[serde(default)]
    pub teachers: Vec<String>,
    #[serde(default)]
    pub students: Vec<String>,
    #[serde(default)]
    pub classrooms: Vec<ClassroomRecord>,
    #[serde(default)]
    pub sections: Vec<SectionRecord>,
}

impl RosterDocument {
    pub fn from_json(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Check the document on its own: no duplicate keys, no empty names.
    pub fn validate(&self) -> Result<(), ValidationError> {
        unique("course", self.courses.iter().map(|c| c.code.as_str()))?;
        unique("teacher", self.teachers.iter().map(String::as_str))?;
        unique("student", self.students.iter().map(String::as_str))?;
        unique("classroom", self.classrooms.iter().map(|r| r.name.as_str()))?;
        unique("section", self.sections.iter().map(|s| s.code.as_str()))?;
        for section in &self.sections {
            unique(
                &format!("student in section {}", section.code),
                section.students.iter().map(String::as_str),
            )?;
        }
        Ok(())
    }
}

fn unique<'a>(kind: &str, keys: impl Iterator<Item = &'a str>) -> Result<(), ValidationError> {
    let mut seen = HashSet::new();
    for key in keys {
        if key.trim().is_empty() {
            return Err(ValidationError::InvalidValue {
                field: kind.to_string(),
                message: "name must not be empty".into(),
            });
        }
        if !seen.insert(key) {
            return Err(ValidationError::Duplicate {
                kind: kind.to_string(),
                key: key.to_string(),
            });
        }
    }
    Ok(())
}

/// What an import did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportSummary {
    /// Catalog size removed by `replace`.
    pub removed: Option<CatalogCounts>,
    pub added: CatalogCounts,
}

fn unknown(kind: &str, key: &str) -> ValidationError {
    ValidationError::UnknownReference {
        kind: kind.to_string(),
        key: key.to_string(),
    }
}

fn already_present(kind: &str, key: &str) -> ValidationError {
    ValidationError::Duplicate {
        kind: kind.to_string(),
        key: key.to_string(),
    }
}

/// Load `doc` into the catalog.
///
/// With `replace` the existing catalog and schedule are deleted first.
/// Otherwise new entities must not collide with stored ones, while
/// references may point at either. Nothing is written if any check fails.
pub fn import_roster(db: &TimetableDb, doc: &RosterDocument, replace: bool) -> Result<ImportSummary> {
    doc.validate()?;

    let summary = db.transaction(|db| -> Result<ImportSummary> {
        let removed = if replace {
            Some(db.reset_catalog()?)
        } else {
            None
        };
        let mut added = CatalogCounts::default();

        for course in &doc.courses {
            if db.find_course_id(&course.code)?.is_some() {
                return Err(already_present("course", &course.code).into());
            }
            db.create_course(&course.code, &course.title, course.credits)?;
            added.courses += 1;
        }
        for name in &doc.teachers {
            if db.find_teacher_id(name)?.is_some() {
                return Err(already_present("teacher", name).into());
            }
            db.create_teacher(name)?;
            added.teachers += 1;
        }
        for name in &doc.students {
            if db.find_student_id(name)?.is_some() {
                return Err(already_present("student", name).into());
            }
            db.create_student(name)?;
            added.students += 1;
        }
        for room in &doc.classrooms {
            if db.find_classroom_id(&room.name)?.is_some() {
                return Err(already_present("classroom", &room.name).into());
            }
            db.create_classroom(&room.name, room.capacity)?;
            added.classrooms += 1;
        }
        for section in &doc.sections {
            if db.find_section_id(&section.code)?.is_some() {
                return Err(already_present("section", &section.code).into());
            }
            let course_id = db
                .find_course_id(&section.course)?
                .ok_or_else(|| unknown("course", &section.course))?;
            let teacher_id = db
                .find_teacher_id(&section.teacher)?
                .ok_or_else(|| unknown("teacher", &section.teacher))?;
            let section_id = db.create_section(course_id, &section.code, teacher_id, section.closed)?;
            added.sections += 1;

            for name in &section.students {
                let student_id = db
                    .find_student_id(name)?
                    .ok_or_else(|| unknown("student", name))?;
                db.enroll(section_id, student_id)?;
                added.enrollments += 1;
            }
        }

        Ok(ImportSummary { removed, added })
    })?;

    info!(
        replace,
        courses = summary.added.courses,
        sections = summary.added.sections,
        enrollments = summary.added.enrollments,
        "roster imported"
    );
    Ok(summary)
}
