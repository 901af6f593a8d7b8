//! Catalog entities read by the scheduler and the assignment fact it writes.

use serde::{Deserialize, Serialize};

/// A room sections can be placed in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classroom {
    pub id: i64,
    pub name: String,
    pub capacity: u32,
}

/// A teachable section of a course.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    pub id: i64,
    pub code: String,
    pub course_code: String,
    pub course_title: String,
    pub teacher_id: i64,
    /// One block per course credit.
    pub required_block_count: u32,
    pub enrolled_student_ids: Vec<i64>,
    pub closed: bool,
}

impl Section {
    /// Number of enrolled students.
    pub fn enrolled(&self) -> usize {
        self.enrolled_student_ids.len()
    }
}

/// One committed (section, classroom, time block) binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AssignedTimeBlock {
    pub section_id: i64,
    pub classroom_id: i64,
    pub time_block_id: i64,
}
