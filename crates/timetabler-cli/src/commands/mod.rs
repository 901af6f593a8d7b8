pub mod config;
pub mod grid;
pub mod roster;
pub mod schedule;
