//! # Timetabler Core Library
//!
//! Builds a weekly class timetable: every open section gets a run of
//! consecutive time blocks on one weekday in one classroom, with no room,
//! teacher or student booked twice for the same block.
//!
//! ## Architecture
//!
//! - **Grid**: deterministic weekly time blocks derived from configuration
//! - **Scheduler**: greedy placement over a conflict index, largest sections first
//! - **Storage**: SQLite catalog and assignments, TOML configuration
//! - **Roster**: JSON import and a seeded synthetic generator
//!
//! ## Key Components
//!
//! - [`TimetableScheduler`]: regenerate, clear and read the schedule
//! - [`TimetableDb`]: catalog and assignment persistence
//! - [`Config`]: grid and scheduler settings
//! - [`verify_schedule`]: check a committed schedule against the catalog

pub mod error;
pub mod generator;
pub mod grid;
pub mod import;
pub mod model;
pub mod reader;
pub mod scheduler;
pub mod storage;
pub mod verify;

pub use error::{ConfigError, CoreError, DatabaseError, ScheduleError, ValidationError};
pub use generator::{generate_roster, RosterSpec};
pub use grid::{generate_time_blocks, GridConfig, SessionConfig, TimeBlock};
pub use import::{import_roster, ImportSummary, RosterDocument};
pub use model::{AssignedTimeBlock, Classroom, Section};
pub use reader::{DisplayEntry, ScheduleRow};
pub use scheduler::{
    AssignmentStore, Catalog, CommitMode, RegenerationReport, SchedulerConfig, TimetableScheduler,
};
pub use storage::{CatalogCounts, Config, TimetableDb};
pub use verify::{verify_schedule, Violation};
