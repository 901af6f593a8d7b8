//! Timetable regeneration.
//!
//! A regeneration run always starts from scratch:
//! - rebuilds the weekly time grid from [`GridConfig`]
//! - clears previous assignments and rebuilds the [`ConflictIndex`]
//! - orders open sections with [`prioritize`]
//! - places each section greedily, stopping at the first infeasible one
//!
//! Runs are single-writer. Nothing here locks the store; callers must not
//! regenerate concurrently.

pub mod conflict;
pub mod placement;
pub mod ports;
pub mod priority;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

pub use conflict::ConflictIndex;
pub use placement::{contiguous_runs, Placement, SchedulingContext};
pub use ports::{AssignmentStore, Catalog};
pub use priority::prioritize;

use crate::error::{Result, ValidationError};
use crate::grid::{generate_time_blocks, GridConfig};
use crate::model::AssignedTimeBlock;
use crate::reader::{build_schedule, DisplayEntry};

/// When placements reach the store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommitMode {
    /// Clear first, then write each section as soon as it is placed. A failed
    /// run leaves the sections placed before the failure in the store.
    #[default]
    Incremental,
    /// Place everything in memory and swap the whole schedule in one
    /// transaction. A failed run leaves the previous schedule untouched.
    Atomic,
}

/// Scheduler configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    #[serde(default)]
    pub commit_mode: CommitMode,
}

/// Outcome of a successful regeneration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegenerationReport {
    pub run_id: String,
    pub time_blocks: usize,
    pub classrooms: usize,
    pub sections_placed: usize,
    pub sections_closed: usize,
    pub assignments_written: usize,
    pub placements: Vec<Placement>,
}

/// Greedy timetable generator.
pub struct TimetableScheduler {
    grid: GridConfig,
    config: SchedulerConfig,
}

impl TimetableScheduler {
    /// Create a scheduler with the default scheduler config
    pub fn new(grid: GridConfig) -> Self {
        Self {
            grid,
            config: SchedulerConfig::default(),
        }
    }

    /// Create with custom config
    pub fn with_config(grid: GridConfig, config: SchedulerConfig) -> Self {
        Self { grid, config }
    }

    /// Delete every committed assignment.
    pub fn clear_schedule<S: AssignmentStore>(&self, store: &S) -> Result<usize> {
        let removed = store.clear_assignments()?;
        if removed > 0 {
            warn!(removed, "cleared existing schedule");
        }
        Ok(removed)
    }

    /// Recompute the whole timetable.
    ///
    /// # Errors
    /// - [`ValidationError`] for an unusable grid or a section that needs no
    ///   blocks; nothing is written in that case
    /// - [`crate::error::ScheduleError::InfeasiblePlacement`] naming the first
    ///   section that cannot be placed; with [`CommitMode::Incremental`] the
    ///   sections placed before it stay in the store
    /// - storage errors from the store
    pub fn regenerate_schedule<S>(&self, store: &S) -> Result<RegenerationReport>
    where
        S: Catalog + AssignmentStore,
    {
        let run_id = uuid::Uuid::new_v4().to_string();
        self.grid.validate()?;
        let blocks = generate_time_blocks(&self.grid);
        let sections = store.list_schedulable_sections()?;
        let classrooms = store.list_classrooms()?;

        if let Some(bad) = sections
            .iter()
            .find(|s| !s.closed && s.required_block_count == 0)
        {
            return Err(ValidationError::InvalidValue {
                field: format!("section {}.required_block_count", bad.code),
                message: "must be at least 1".into(),
            }
            .into());
        }

        let order = prioritize(&sections);
        info!(
            %run_id,
            sections = order.len(),
            classrooms = classrooms.len(),
            time_blocks = blocks.len(),
            mode = ?self.config.commit_mode,
            "regenerating schedule"
        );

        let index = match self.config.commit_mode {
            CommitMode::Incremental => {
                self.clear_schedule(store)?;
                store.sync_time_blocks(&blocks)?;
                ConflictIndex::from_assignments(&store.list_assignments()?, &sections)
            }
            CommitMode::Atomic => ConflictIndex::new(),
        };

        let classroom_count = classrooms.len();
        let mut ctx = SchedulingContext::new(blocks, classrooms, index);
        let mut placements = Vec::with_capacity(order.len());
        let mut buffered: Vec<AssignedTimeBlock> = Vec::new();

        for section in &order {
            let placement = match ctx.place(section) {
                Ok(placement) => placement,
                Err(err) => {
                    warn!(
                        %run_id,
                        section_id = section.id,
                        section = %section.code,
                        placed = placements.len(),
                        "no feasible placement, aborting run"
                    );
                    return Err(err.into());
                }
            };
            debug!(
                section = %section.code,
                classroom_id = placement.classroom_id,
                weekday = %placement.weekday,
                blocks = ?placement.time_block_ids,
                "placed section"
            );
            match self.config.commit_mode {
                CommitMode::Incremental => store.insert_assignments(&placement.rows())?,
                CommitMode::Atomic => buffered.extend(placement.rows()),
            }
            placements.push(placement);
        }

        if self.config.commit_mode == CommitMode::Atomic {
            store.replace_schedule(ctx.blocks(), &buffered)?;
        }

        let assignments_written = placements.iter().map(|p| p.time_block_ids.len()).sum();
        info!(
            %run_id,
            placed = placements.len(),
            assignments = assignments_written,
            "schedule regenerated"
        );

        Ok(RegenerationReport {
            run_id,
            time_blocks: ctx.blocks().len(),
            classrooms: classroom_count,
            sections_placed: placements.len(),
            sections_closed: sections.iter().filter(|s| s.closed).count(),
            assignments_written,
            placements,
        })
    }

    /// Committed schedule keyed by section id.
    pub fn get_schedule<S: AssignmentStore>(&self, store: &S) -> Result<BTreeMap<i64, DisplayEntry>> {
        Ok(build_schedule(store.list_schedule_rows()?))
    }
}
