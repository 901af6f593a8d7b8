//! Greedy placement of sections into contiguous block windows.
//!
//! Iteration order is fixed so the first feasible combination is always the
//! same one: weekday index, then block start within the day, then classroom
//! id. There is no backtracking; once a section is committed its blocks are
//! off the table for every later section in the run.

use std::ops::Range;

use chrono::Weekday;
use serde::{Deserialize, Serialize};

use super::conflict::ConflictIndex;
use crate::error::ScheduleError;
use crate::grid::TimeBlock;
use crate::model::{AssignedTimeBlock, Classroom, Section};

/// Where one section landed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Placement {
    pub section_id: i64,
    pub classroom_id: i64,
    pub weekday: Weekday,
    /// Block ids of the window, in time order.
    pub time_block_ids: Vec<i64>,
}

impl Placement {
    /// One assignment row per block of the window.
    pub fn rows(&self) -> Vec<AssignedTimeBlock> {
        self.time_block_ids
            .iter()
            .map(|&time_block_id| AssignedTimeBlock {
                section_id: self.section_id,
                classroom_id: self.classroom_id,
                time_block_id,
            })
            .collect()
    }
}

/// Split day-sorted blocks into maximal contiguous runs.
///
/// A run breaks on a weekday change or wherever a block does not start at the
/// previous block's stop, which also separates morning from afternoon.
pub fn contiguous_runs(blocks: &[TimeBlock]) -> Vec<Range<usize>> {
    let mut runs = Vec::new();
    let mut start = 0;
    for i in 1..=blocks.len() {
        let breaks = i == blocks.len() || !blocks[i - 1].is_followed_by(&blocks[i]);
        if breaks {
            if start < i {
                runs.push(start..i);
            }
            start = i;
        }
    }
    runs
}

/// Everything a run needs: the block arena, the rooms and the occupancy index.
#[derive(Debug, Clone)]
pub struct SchedulingContext {
    blocks: Vec<TimeBlock>,
    runs: Vec<Range<usize>>,
    classrooms: Vec<Classroom>,
    index: ConflictIndex,
}

impl SchedulingContext {
    pub fn new(
        mut blocks: Vec<TimeBlock>,
        mut classrooms: Vec<Classroom>,
        index: ConflictIndex,
    ) -> Self {
        blocks.sort_by_key(|b| (b.weekday_index, b.start, b.id));
        classrooms.sort_by_key(|c| c.id);
        let runs = contiguous_runs(&blocks);
        Self {
            blocks,
            runs,
            classrooms,
            index,
        }
    }

    pub fn blocks(&self) -> &[TimeBlock] {
        &self.blocks
    }

    #[cfg(test)]
    pub(crate) fn index(&self) -> &ConflictIndex {
        &self.index
    }

    /// Contiguous runs in iteration order.
    pub fn runs(&self) -> impl Iterator<Item = &[TimeBlock]> {
        self.runs.iter().map(|r| &self.blocks[r.clone()])
    }

    /// First feasible (window, classroom) for `section`, without committing.
    pub fn find_placement(&self, section: &Section) -> Option<Placement> {
        let k = section.required_block_count as usize;
        if k == 0 {
            return None;
        }

        for run in self.runs() {
            if run.len() < k {
                continue;
            }
            for window in run.windows(k) {
                let ids: Vec<i64> = window.iter().map(|b| b.id).collect();
                let room = self.classrooms.iter().find(|room| {
                    ConflictIndex::room_has_capacity(room, section)
                        && self.index.room_is_free(room.id, &ids)
                        && self.index.teacher_is_free(section.teacher_id, &ids)
                        && self
                            .index
                            .students_are_free(&section.enrolled_student_ids, &ids)
                });
                if let Some(room) = room {
                    return Some(Placement {
                        section_id: section.id,
                        classroom_id: room.id,
                        weekday: window[0].weekday,
                        time_block_ids: ids,
                    });
                }
            }
        }
        None
    }

    /// Record `placement` in the occupancy index.
    pub fn commit(&mut self, section: &Section, placement: &Placement) {
        self.index
            .occupy(section, placement.classroom_id, &placement.time_block_ids);
    }

    /// Find and commit a placement for `section`.
    ///
    /// # Errors
    /// Returns [`ScheduleError::InfeasiblePlacement`] when no combination fits.
    pub fn place(&mut self, section: &Section) -> Result<Placement, ScheduleError> {
        let placement =
            self.find_placement(section)
                .ok_or_else(|| ScheduleError::InfeasiblePlacement {
                    section_id: section.id,
                    section_code: section.code.clone(),
                    required_blocks: section.required_block_count,
                    enrolled: section.enrolled(),
                })?;
        self.commit(section, &placement);
        Ok(placement)
    }
}
