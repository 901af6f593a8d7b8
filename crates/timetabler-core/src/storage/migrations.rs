//! Database schema migrations for timetabler.
//!
//! Migrations are versioned and applied automatically when opening the database.
//! The `schema_version` table tracks the current migration version.

use indoc::indoc;
use rusqlite::{Connection, Result as SqliteResult};

/// Current schema version.
///
/// Increment this when adding new migrations.
pub const SCHEMA_VERSION: i32 = 2;

/// Apply all pending migrations to bring the database to the current schema version.
///
/// # Errors
/// Returns an error if migration fails.
pub fn migrate(conn: &Connection) -> SqliteResult<()> {
    create_schema_version_table(conn)?;

    let current_version = get_schema_version(conn);

    if current_version < 1 {
        migrate_v1(conn)?;
    }
    if current_version < 2 {
        migrate_v2(conn)?;
    }

    Ok(())
}

fn create_schema_version_table(conn: &Connection) -> SqliteResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        );",
    )
}

/// Get the current schema version from the database.
///
/// Returns 0 if no version is set (initial database).
fn get_schema_version(conn: &Connection) -> i32 {
    conn.query_row("SELECT version FROM schema_version", [], |row| {
        row.get::<_, i32>(0)
    })
    .unwrap_or_else(|e| {
        if !matches!(e, rusqlite::Error::QueryReturnedNoRows) {
            tracing::warn!(error = %e, "failed to read schema_version");
        }
        0
    })
}

fn set_schema_version(conn: &Connection, version: i32) -> SqliteResult<()> {
    conn.execute("DELETE FROM schema_version", [])?;
    conn.execute("INSERT INTO schema_version (version) VALUES (?1)", [version])?;
    Ok(())
}

/// v1: catalog tables (courses, people, rooms, sections, rosters).
fn migrate_v1(conn: &Connection) -> SqliteResult<()> {
    conn.execute_batch(indoc! {"
        CREATE TABLE IF NOT EXISTS courses (
            id       INTEGER PRIMARY KEY AUTOINCREMENT,
            code     TEXT NOT NULL UNIQUE,
            title    TEXT NOT NULL,
            credits  INTEGER NOT NULL CHECK (credits >= 0)
        );

        CREATE TABLE IF NOT EXISTS teachers (
            id    INTEGER PRIMARY KEY AUTOINCREMENT,
            name  TEXT NOT NULL UNIQUE
        );

        CREATE TABLE IF NOT EXISTS students (
            id    INTEGER PRIMARY KEY AUTOINCREMENT,
            name  TEXT NOT NULL UNIQUE
        );

        CREATE TABLE IF NOT EXISTS classrooms (
            id        INTEGER PRIMARY KEY AUTOINCREMENT,
            name      TEXT NOT NULL UNIQUE,
            capacity  INTEGER NOT NULL CHECK (capacity >= 0)
        );

        CREATE TABLE IF NOT EXISTS sections (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            course_id   INTEGER NOT NULL REFERENCES courses(id) ON DELETE CASCADE,
            code        TEXT NOT NULL UNIQUE,
            teacher_id  INTEGER NOT NULL REFERENCES teachers(id),
            closed      INTEGER NOT NULL DEFAULT 0
        );

        CREATE TABLE IF NOT EXISTS enrollments (
            section_id  INTEGER NOT NULL REFERENCES sections(id) ON DELETE CASCADE,
            student_id  INTEGER NOT NULL REFERENCES students(id) ON DELETE CASCADE,
            PRIMARY KEY (section_id, student_id)
        );
    "})?;
    set_schema_version(conn, 1)
}

/// v2: time grid and assignment facts.
///
/// The two UNIQUE constraints keep one section per room per block and one
/// room per section per block.
fn migrate_v2(conn: &Connection) -> SqliteResult<()> {
    conn.execute_batch(indoc! {"
        CREATE TABLE IF NOT EXISTS time_blocks (
            id             INTEGER PRIMARY KEY,
            weekday        TEXT NOT NULL,
            weekday_index  INTEGER NOT NULL,
            start          TEXT NOT NULL,
            stop           TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS assigned_time_blocks (
            id             INTEGER PRIMARY KEY AUTOINCREMENT,
            section_id     INTEGER NOT NULL REFERENCES sections(id) ON DELETE CASCADE,
            classroom_id   INTEGER NOT NULL REFERENCES classrooms(id) ON DELETE CASCADE,
            time_block_id  INTEGER NOT NULL REFERENCES time_blocks(id),
            UNIQUE (classroom_id, time_block_id),
            UNIQUE (section_id, time_block_id)
        );

        CREATE INDEX IF NOT EXISTS idx_assigned_time_block
            ON assigned_time_blocks(time_block_id);
    "})?;
    set_schema_version(conn, 2)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_database_reaches_current_version() {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();
        assert_eq!(get_schema_version(&conn), SCHEMA_VERSION);
    }

    #[test]
    fn migrate_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();
        migrate(&conn).unwrap();
        assert_eq!(get_schema_version(&conn), SCHEMA_VERSION);
    }

    #[test]
    fn assignment_uniqueness_is_enforced() {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();
        conn.execute_batch(indoc! {"
            INSERT INTO courses (id, code, title, credits) VALUES (1, 'C', 'Course', 1);
            INSERT INTO teachers (id, name) VALUES (1, 'T');
            INSERT INTO classrooms (id, name, capacity) VALUES (1, 'R', 10);
            INSERT INTO sections (id, course_id, code, teacher_id) VALUES (1, 1, 'A', 1), (2, 1, 'B', 1);
            INSERT INTO time_blocks (id, weekday, weekday_index, start, stop) VALUES (0, 'Mon', 0, '09:00', '10:00');
            INSERT INTO assigned_time_blocks (section_id, classroom_id, time_block_id) VALUES (1, 1, 0);
        "})
        .unwrap();

        let same_room = conn.execute(
            "INSERT INTO assigned_time_blocks (section_id, classroom_id, time_block_id) VALUES (2, 1, 0)",
            [],
        );
        assert!(same_room.is_err());
    }
}
