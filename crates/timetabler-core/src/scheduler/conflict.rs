//! Occupancy lookup for classrooms, teachers and students.
//!
//! The index is built from the rows already committed in the store and is
//! updated in place as each placement is committed during a run, so every
//! query sees the run's own earlier writes.

use std::collections::{HashMap, HashSet};

use crate::model::{AssignedTimeBlock, Classroom, Section};

/// Which (resource, time block) pairs are already taken.
#[derive(Debug, Clone, Default)]
pub struct ConflictIndex {
    classroom_busy: HashSet<(i64, i64)>,
    teacher_busy: HashSet<(i64, i64)>,
    student_busy: HashSet<(i64, i64)>,
}

impl ConflictIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild the index from committed rows.
    ///
    /// Rows whose section is not in `sections` still occupy their classroom;
    /// there is no teacher or roster to charge them to.
    pub fn from_assignments(assignments: &[AssignedTimeBlock], sections: &[Section]) -> Self {
        let by_id: HashMap<i64, &Section> = sections.iter().map(|s| (s.id, s)).collect();
        let mut index = Self::new();
        for row in assignments {
            index
                .classroom_busy
                .insert((row.classroom_id, row.time_block_id));
            if let Some(section) = by_id.get(&row.section_id) {
                index.charge_people(section, &[row.time_block_id]);
            }
        }
        index
    }

    /// Mark `window` as taken by `section` in `classroom_id`.
    pub fn occupy(&mut self, section: &Section, classroom_id: i64, window: &[i64]) {
        for &block in window {
            self.classroom_busy.insert((classroom_id, block));
        }
        self.charge_people(section, window);
    }

    fn charge_people(&mut self, section: &Section, window: &[i64]) {
        for &block in window {
            self.teacher_busy.insert((section.teacher_id, block));
            for &student in &section.enrolled_student_ids {
                self.student_busy.insert((student, block));
            }
        }
    }

    /// The room seats every enrolled student.
    pub fn room_has_capacity(classroom: &Classroom, section: &Section) -> bool {
        classroom.capacity as usize >= section.enrolled()
    }

    pub fn room_is_free(&self, classroom_id: i64, window: &[i64]) -> bool {
        window
            .iter()
            .all(|&block| !self.classroom_busy.contains(&(classroom_id, block)))
    }

    pub fn teacher_is_free(&self, teacher_id: i64, window: &[i64]) -> bool {
        window
            .iter()
            .all(|&block| !self.teacher_busy.contains(&(teacher_id, block)))
    }

    pub fn students_are_free(&self, student_ids: &[i64], window: &[i64]) -> bool {
        window.iter().all(|&block| {
            student_ids
                .iter()
                .all(|&student| !self.student_busy.contains(&(student, block)))
        })
    }

    #[cfg(test)]
    pub(crate) fn is_empty(&self) -> bool {
        self.classroom_busy.is_empty()
            && self.teacher_busy.is_empty()
            && self.student_busy.is_empty()
    }
}
