//! Seams between the scheduler and whatever stores the catalog and results.

use crate::error::Result;
use crate::grid::TimeBlock;
use crate::model::{AssignedTimeBlock, Classroom, Section};
use crate::reader::ScheduleRow;

/// Read-only source of sections and classrooms.
pub trait Catalog {
    /// Every section the scheduler should consider, closed ones included;
    /// the prioritizer drops closed sections itself.
    fn list_schedulable_sections(&self) -> Result<Vec<Section>>;

    fn list_classrooms(&self) -> Result<Vec<Classroom>>;
}

/// Where time blocks and assignment facts live.
pub trait AssignmentStore {
    /// Delete every assignment row, returning how many were removed.
    fn clear_assignments(&self) -> Result<usize>;

    /// Upsert `blocks` by id and drop blocks no longer in the grid.
    ///
    /// Fails if a dropped block is still referenced by an assignment.
    fn sync_time_blocks(&self, blocks: &[TimeBlock]) -> Result<()>;

    /// Write one section's rows; all or nothing.
    fn insert_assignments(&self, rows: &[AssignedTimeBlock]) -> Result<()>;

    /// Clear assignments, sync blocks and write `rows` in one transaction.
    fn replace_schedule(&self, blocks: &[TimeBlock], rows: &[AssignedTimeBlock]) -> Result<usize>;

    fn list_time_blocks(&self) -> Result<Vec<TimeBlock>>;

    fn list_assignments(&self) -> Result<Vec<AssignedTimeBlock>>;

    /// Assignment rows joined for display.
    fn list_schedule_rows(&self) -> Result<Vec<ScheduleRow>>;
}
