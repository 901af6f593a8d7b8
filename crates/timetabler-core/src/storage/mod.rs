mod config;
pub mod migrations;
pub mod timetable_db;

pub use config::Config;
pub use timetable_db::{CatalogCounts, TimetableDb};

use std::path::PathBuf;

use crate::error::ConfigError;

/// Returns the data directory, creating it if needed.
///
/// `TIMETABLER_DATA_DIR` wins when set. Otherwise `~/.config/timetabler/`,
/// or `~/.config/timetabler-dev/` when `TIMETABLER_ENV=dev`.
///
/// # Errors
/// Returns an error if the directory cannot be created.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let dir = match std::env::var_os("TIMETABLER_DATA_DIR") {
        Some(dir) => PathBuf::from(dir),
        None => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");
            let env =
                std::env::var("TIMETABLER_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("timetabler-dev")
            } else {
                base_dir.join("timetabler")
            }
        }
    };

    std::fs::create_dir_all(&dir)
        .map_err(|e| ConfigError::DataDir(format!("{}: {e}", dir.display())))?;
    Ok(dir)
}
