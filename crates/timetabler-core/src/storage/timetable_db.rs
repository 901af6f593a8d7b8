//! SQLite-based storage for the catalog, the time grid and assignments.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use chrono::{NaiveTime, Weekday};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};

use super::data_dir;
use super::migrations;
use crate::error::{DatabaseError, Result};
use crate::grid::{hhmm, TimeBlock};
use crate::model::{AssignedTimeBlock, Classroom, Section};
use crate::reader::ScheduleRow;
use crate::scheduler::{AssignmentStore, Catalog};

// === Helper Functions ===

fn parse_weekday(idx: usize, raw: &str) -> Result<Weekday, rusqlite::Error> {
    raw.parse::<Weekday>()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn parse_time(idx: usize, raw: &str) -> Result<NaiveTime, rusqlite::Error> {
    NaiveTime::parse_from_str(raw, hhmm::FORMAT)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn format_time(time: NaiveTime) -> String {
    time.format(hhmm::FORMAT).to_string()
}

/// Build a TimeBlock from `id, weekday, weekday_index, start, stop`
fn row_to_time_block(row: &rusqlite::Row) -> Result<TimeBlock, rusqlite::Error> {
    Ok(TimeBlock {
        id: row.get(0)?,
        weekday: parse_weekday(1, &row.get::<_, String>(1)?)?,
        weekday_index: row.get(2)?,
        start: parse_time(3, &row.get::<_, String>(3)?)?,
        stop: parse_time(4, &row.get::<_, String>(4)?)?,
    })
}

fn upsert_time_block(conn: &Connection, block: &TimeBlock) -> Result<(), rusqlite::Error> {
    conn.execute(
        "INSERT INTO time_blocks (id, weekday, weekday_index, start, stop)
         VALUES (?1, ?2, ?3, ?4, ?5)
         ON CONFLICT(id) DO UPDATE SET
            weekday = excluded.weekday,
            weekday_index = excluded.weekday_index,
            start = excluded.start,
            stop = excluded.stop",
        params![
            block.id,
            block.weekday.to_string(),
            block.weekday_index,
            format_time(block.start),
            format_time(block.stop),
        ],
    )?;
    Ok(())
}

fn insert_assignment(conn: &Connection, row: &AssignedTimeBlock) -> Result<(), rusqlite::Error> {
    conn.execute(
        "INSERT INTO assigned_time_blocks (section_id, classroom_id, time_block_id)
         VALUES (?1, ?2, ?3)",
        params![row.section_id, row.classroom_id, row.time_block_id],
    )?;
    Ok(())
}

/// Row counts per catalog table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogCounts {
    pub courses: usize,
    pub teachers: usize,
    pub students: usize,
    pub classrooms: usize,
    pub sections: usize,
    pub enrollments: usize,
}

/// SQLite database for timetable storage.
///
/// Holds the catalog (courses, teachers, students, classrooms, sections and
/// enrollments), the weekly time grid and the assignment facts.
pub struct TimetableDb {
    conn: Connection,
}

impl TimetableDb {
    /// Open the database at `<data dir>/timetabler.db`.
    ///
    /// Creates tables if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the data directory or the database cannot be
    /// opened, or migration fails.
    pub fn open() -> Result<Self> {
        let path = data_dir()?.join("timetabler.db");
        Self::open_at(&path)
    }

    /// Open a database file at an explicit path.
    pub fn open_at(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).map_err(|source| DatabaseError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    /// Open an in-memory database (for tests).
    #[cfg(test)]
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<()> {
        self.conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        migrations::migrate(&self.conn)
            .map_err(|e| DatabaseError::MigrationFailed(e.to_string()))?;
        Ok(())
    }

    /// Run `f` inside one immediate transaction, rolling back on error.
    ///
    /// `f` must not open another transaction.
    pub fn transaction<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&Self) -> Result<T, E>,
        E: From<rusqlite::Error>,
    {
        self.conn.execute_batch("BEGIN IMMEDIATE TRANSACTION;")?;
        match f(self) {
            Ok(value) => match self.conn.execute_batch("COMMIT;") {
                Ok(()) => Ok(value),
                Err(err) => {
                    let _ = self.conn.execute_batch("ROLLBACK;");
                    Err(err.into())
                }
            },
            Err(err) => {
                let _ = self.conn.execute_batch("ROLLBACK;");
                Err(err)
            }
        }
    }

    // === Catalog writes ===

    pub fn create_course(&self, code: &str, title: &str, credits: u32) -> Result<i64, rusqlite::Error> {
        self.conn.execute(
            "INSERT INTO courses (code, title, credits) VALUES (?1, ?2, ?3)",
            params![code, title, credits],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn create_teacher(&self, name: &str) -> Result<i64, rusqlite::Error> {
        self.conn
            .execute("INSERT INTO teachers (name) VALUES (?1)", params![name])?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn create_student(&self, name: &str) -> Result<i64, rusqlite::Error> {
        self.conn
            .execute("INSERT INTO students (name) VALUES (?1)", params![name])?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn create_classroom(&self, name: &str, capacity: u32) -> Result<i64, rusqlite::Error> {
        self.conn.execute(
            "INSERT INTO classrooms (name, capacity) VALUES (?1, ?2)",
            params![name, capacity],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn create_section(
        &self,
        course_id: i64,
        code: &str,
        teacher_id: i64,
        closed: bool,
    ) -> Result<i64, rusqlite::Error> {
        self.conn.execute(
            "INSERT INTO sections (course_id, code, teacher_id, closed) VALUES (?1, ?2, ?3, ?4)",
            params![course_id, code, teacher_id, closed],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Add a student to a section's roster; enrolling twice is a no-op.
    pub fn enroll(&self, section_id: i64, student_id: i64) -> Result<(), rusqlite::Error> {
        self.conn.execute(
            "INSERT OR IGNORE INTO enrollments (section_id, student_id) VALUES (?1, ?2)",
            params![section_id, student_id],
        )?;
        Ok(())
    }

    pub fn set_section_closed(&self, section_id: i64, closed: bool) -> Result<(), rusqlite::Error> {
        self.conn.execute(
            "UPDATE sections SET closed = ?1 WHERE id = ?2",
            params![closed, section_id],
        )?;
        Ok(())
    }

    /// Delete the whole catalog together with the schedule that depends on it.
    ///
    /// Time blocks are kept; they only depend on configuration.
    pub fn reset_catalog(&self) -> Result<CatalogCounts, rusqlite::Error> {
        let counts = self.counts()?;
        self.conn.execute_batch(
            "DELETE FROM assigned_time_blocks;
             DELETE FROM enrollments;
             DELETE FROM sections;
             DELETE FROM courses;
             DELETE FROM teachers;
             DELETE FROM students;
             DELETE FROM classrooms;",
        )?;
        Ok(counts)
    }

    // === Catalog reads ===

    fn find_id(&self, sql: &str, key: &str) -> Result<Option<i64>, rusqlite::Error> {
        self.conn
            .query_row(sql, params![key], |row| row.get(0))
            .optional()
    }

    pub fn find_course_id(&self, code: &str) -> Result<Option<i64>, rusqlite::Error> {
        self.find_id("SELECT id FROM courses WHERE code = ?1", code)
    }

    pub fn find_teacher_id(&self, name: &str) -> Result<Option<i64>, rusqlite::Error> {
        self.find_id("SELECT id FROM teachers WHERE name = ?1", name)
    }

    pub fn find_student_id(&self, name: &str) -> Result<Option<i64>, rusqlite::Error> {
        self.find_id("SELECT id FROM students WHERE name = ?1", name)
    }

    pub fn find_classroom_id(&self, name: &str) -> Result<Option<i64>, rusqlite::Error> {
        self.find_id("SELECT id FROM classrooms WHERE name = ?1", name)
    }

    pub fn find_section_id(&self, code: &str) -> Result<Option<i64>, rusqlite::Error> {
        self.find_id("SELECT id FROM sections WHERE code = ?1", code)
    }

    fn count(&self, table: &str) -> Result<usize, rusqlite::Error> {
        let n: i64 = self
            .conn
            .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))?;
        Ok(n as usize)
    }

    pub fn counts(&self) -> Result<CatalogCounts, rusqlite::Error> {
        Ok(CatalogCounts {
            courses: self.count("courses")?,
            teachers: self.count("teachers")?,
            students: self.count("students")?,
            classrooms: self.count("classrooms")?,
            sections: self.count("sections")?,
            enrollments: self.count("enrollments")?,
        })
    }

    /// All sections with their rosters, ordered by id.
    pub fn list_sections(&self) -> Result<Vec<Section>, rusqlite::Error> {
        let mut rosters: HashMap<i64, Vec<i64>> = HashMap::new();
        {
            let mut stmt = self.conn.prepare(
                "SELECT section_id, student_id FROM enrollments ORDER BY section_id, student_id",
            )?;
            let mut rows = stmt.query([])?;
            while let Some(row) = rows.next()? {
                rosters
                    .entry(row.get(0)?)
                    .or_default()
                    .push(row.get(1)?);
            }
        }

        let mut stmt = self.conn.prepare(
            "SELECT s.id, s.code, c.code, c.title, s.teacher_id, c.credits, s.closed
             FROM sections s
             JOIN courses c ON c.id = s.course_id
             ORDER BY s.id",
        )?;
        let sections = stmt
            .query_map([], |row| {
                let id: i64 = row.get(0)?;
                Ok(Section {
                    id,
                    code: row.get(1)?,
                    course_code: row.get(2)?,
                    course_title: row.get(3)?,
                    teacher_id: row.get(4)?,
                    required_block_count: row.get(5)?,
                    enrolled_student_ids: Vec::new(),
                    closed: row.get(6)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(sections
            .into_iter()
            .map(|mut s| {
                s.enrolled_student_ids = rosters.remove(&s.id).unwrap_or_default();
                s
            })
            .collect())
    }

    /// All classrooms, ordered by id.
    pub fn classrooms(&self) -> Result<Vec<Classroom>, rusqlite::Error> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name, capacity FROM classrooms ORDER BY id")?;
        let rooms = stmt
            .query_map([], |row| {
                Ok(Classroom {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    capacity: row.get(2)?,
                })
            })?
            .collect();
        rooms
    }

    // === Grid and assignments ===

    fn sync_time_blocks_in(&self, blocks: &[TimeBlock]) -> Result<(), rusqlite::Error> {
        let keep: HashSet<i64> = blocks.iter().map(|b| b.id).collect();
        let existing: Vec<i64> = {
            let mut stmt = self.conn.prepare("SELECT id FROM time_blocks")?;
            let ids = stmt.query_map([], |row| row.get(0))?.collect::<Result<_, _>>()?;
            ids
        };
        for id in existing.into_iter().filter(|id| !keep.contains(id)) {
            self.conn
                .execute("DELETE FROM time_blocks WHERE id = ?1", params![id])?;
        }
        for block in blocks {
            upsert_time_block(&self.conn, block)?;
        }
        Ok(())
    }

    fn clear_assignments_in(&self) -> Result<usize, rusqlite::Error> {
        self.conn.execute("DELETE FROM assigned_time_blocks", [])
    }
}

impl Catalog for TimetableDb {
    fn list_schedulable_sections(&self) -> Result<Vec<Section>> {
        Ok(self.list_sections()?)
    }

    fn list_classrooms(&self) -> Result<Vec<Classroom>> {
        Ok(self.classrooms()?)
    }
}

impl AssignmentStore for TimetableDb {
    fn clear_assignments(&self) -> Result<usize> {
        Ok(self.clear_assignments_in()?)
    }

    fn sync_time_blocks(&self, blocks: &[TimeBlock]) -> Result<()> {
        Ok(self.transaction(|db| db.sync_time_blocks_in(blocks))?)
    }

    fn insert_assignments(&self, rows: &[AssignedTimeBlock]) -> Result<()> {
        self.transaction(|db| {
            for row in rows {
                insert_assignment(&db.conn, row)?;
            }
            Ok(())
        })
    }

    fn replace_schedule(&self, blocks: &[TimeBlock], rows: &[AssignedTimeBlock]) -> Result<usize> {
        self.transaction(|db| {
            let removed = db.clear_assignments_in()?;
            db.sync_time_blocks_in(blocks)?;
            for row in rows {
                insert_assignment(&db.conn, row)?;
            }
            Ok(removed)
        })
    }

    fn list_time_blocks(&self) -> Result<Vec<TimeBlock>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, weekday, weekday_index, start, stop
             FROM time_blocks
             ORDER BY weekday_index, start",
        )?;
        let blocks = stmt
            .query_map([], row_to_time_block)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(blocks)
    }

    fn list_assignments(&self) -> Result<Vec<AssignedTimeBlock>> {
        let mut stmt = self.conn.prepare(
            "SELECT section_id, classroom_id, time_block_id
             FROM assigned_time_blocks
             ORDER BY section_id, time_block_id",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok(AssignedTimeBlock {
                    section_id: row.get(0)?,
                    classroom_id: row.get(1)?,
                    time_block_id: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn list_schedule_rows(&self) -> Result<Vec<ScheduleRow>> {
        let mut stmt = self.conn.prepare(
            "SELECT a.section_id, c.title, c.code, s.code, r.name,
                    t.weekday, t.weekday_index, t.start, t.stop
             FROM assigned_time_blocks a
             JOIN sections s    ON s.id = a.section_id
             JOIN courses c     ON c.id = s.course_id
             JOIN classrooms r  ON r.id = a.classroom_id
             JOIN time_blocks t ON t.id = a.time_block_id
             ORDER BY a.section_id, t.weekday_index, t.start",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok(ScheduleRow {
                    section_id: row.get(0)?,
                    course_title: row.get(1)?,
                    course_code: row.get(2)?,
                    section_code: row.get(3)?,
                    classroom_name: row.get(4)?,
                    weekday: parse_weekday(5, &row.get::<_, String>(5)?)?,
                    weekday_index: row.get(6)?,
                    start: parse_time(7, &row.get::<_, String>(7)?)?,
                    stop: parse_time(8, &row.get::<_, String>(8)?)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreError;
    use crate::grid::{generate_time_blocks, GridConfig};

    fn seeded() -> (TimetableDb, i64, i64) {
        let db = TimetableDb::open_memory().unwrap();
        let course = db.create_course("CS101", "Intro to CS", 2).unwrap();
        let teacher = db.create_teacher("Grace").unwrap();
        let section = db.create_section(course, "CS101-A", teacher, false).unwrap();
        let room = db.create_classroom("Lab 1", 24).unwrap();
        for name in ["ann", "ben"] {
            let student = db.create_student(name).unwrap();
            db.enroll(section, student).unwrap();
        }
        (db, section, room)
    }

    #[test]
    fn sections_carry_course_credits_and_roster() {
        let (db, section, _) = seeded();
        let sections = db.list_schedulable_sections().unwrap();
        assert_eq!(sections.len(), 1);
        let s = &sections[0];
        assert_eq!(s.id, section);
        assert_eq!(s.required_block_count, 2);
        assert_eq!(s.course_title, "Intro to CS");
        assert_eq!(s.enrolled(), 2);
        assert!(!s.closed);
    }

    #[test]
    fn enroll_twice_is_a_noop() {
        let (db, section, _) = seeded();
        let ann = db.find_student_id("ann").unwrap().unwrap();
        db.enroll(section, ann).unwrap();
        assert_eq!(db.counts().unwrap().enrollments, 2);
    }

    #[test]
    fn time_block_sync_is_idempotent() {
        let db = TimetableDb::open_memory().unwrap();
        let blocks = generate_time_blocks(&GridConfig::default());
        db.sync_time_blocks(&blocks).unwrap();
        db.sync_time_blocks(&blocks).unwrap();
        assert_eq!(db.list_time_blocks().unwrap(), blocks);
    }

    #[test]
    fn assignments_reject_room_double_booking() {
        let (db, section, room) = seeded();
        let blocks = generate_time_blocks(&GridConfig::default());
        db.sync_time_blocks(&blocks).unwrap();

        let other_course = db.create_course("CS102", "Data", 1).unwrap();
        let teacher = db.find_teacher_id("Grace").unwrap().unwrap();
        let other = db.create_section(other_course, "CS102-A", teacher, false).unwrap();

        db.insert_assignments(&[AssignedTimeBlock {
            section_id: section,
            classroom_id: room,
            time_block_id: 0,
        }])
        .unwrap();
        let err = db
            .insert_assignments(&[AssignedTimeBlock {
                section_id: other,
                classroom_id: room,
                time_block_id: 0,
            }])
            .unwrap_err();
        assert!(matches!(
            err,
            CoreError::Database(DatabaseError::ConstraintViolated(_))
        ));
    }

    #[test]
    fn section_cannot_hold_two_rooms_in_one_block() {
        let (db, section, room) = seeded();
        let other_room = db.create_classroom("Lab 2", 24).unwrap();
        db.sync_time_blocks(&generate_time_blocks(&GridConfig::default()))
            .unwrap();

        db.insert_assignments(&[AssignedTimeBlock {
            section_id: section,
            classroom_id: room,
            time_block_id: 3,
        }])
        .unwrap();
        let err = db
            .insert_assignments(&[AssignedTimeBlock {
                section_id: section,
                classroom_id: other_room,
                time_block_id: 3,
            }])
            .unwrap_err();
        assert!(matches!(
            err,
            CoreError::Database(DatabaseError::ConstraintViolated(_))
        ));
        assert_eq!(db.list_assignments().unwrap().len(), 1);
    }

    #[test]
    fn failed_commit_leaves_no_open_transaction() {
        let (db, section, room) = seeded();
        let result: Result<(), rusqlite::Error> = db.transaction(|db| {
            // Foreign keys are checked at COMMIT, and block 99 does not exist.
            db.conn.execute_batch("PRAGMA defer_foreign_keys = ON;")?;
            insert_assignment(
                &db.conn,
                &AssignedTimeBlock {
                    section_id: section,
                    classroom_id: room,
                    time_block_id: 99,
                },
            )
        });
        assert!(result.is_err());
        assert!(db.conn.is_autocommit());

        db.sync_time_blocks(&generate_time_blocks(&GridConfig::default()))
            .unwrap();
        assert!(db.list_assignments().unwrap().is_empty());
    }

    #[test]
    fn failed_insert_rolls_back_the_whole_section() {
        let (db, section, room) = seeded();
        db.sync_time_blocks(&generate_time_blocks(&GridConfig::default()))
            .unwrap();
        let rows = [
            AssignedTimeBlock {
                section_id: section,
                classroom_id: room,
                time_block_id: 0,
            },
            AssignedTimeBlock {
                section_id: section,
                classroom_id: room,
                time_block_id: 0,
            },
        ];
        assert!(db.insert_assignments(&rows).is_err());
        assert!(db.list_assignments().unwrap().is_empty());
    }

    #[test]
    fn schedule_rows_join_names_and_times() {
        let (db, section, room) = seeded();
        db.sync_time_blocks(&generate_time_blocks(&GridConfig::default()))
            .unwrap();
        db.insert_assignments(&[
            AssignedTimeBlock {
                section_id: section,
                classroom_id: room,
                time_block_id: 5,
            },
            AssignedTimeBlock {
                section_id: section,
                classroom_id: room,
                time_block_id: 0,
            },
        ])
        .unwrap();

        let rows = db.list_schedule_rows().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].classroom_name, "Lab 1");
        assert_eq!(rows[0].section_code, "CS101-A");
        assert_eq!(rows[0].weekday, Weekday::Mon);
        assert_eq!(rows[0].start, NaiveTime::from_hms_opt(9, 0, 0).unwrap());
        assert_eq!(rows[1].stop, NaiveTime::from_hms_opt(11, 0, 0).unwrap());
    }

    #[test]
    fn stale_block_with_assignment_cannot_be_dropped() {
        let (db, section, room) = seeded();
        db.sync_time_blocks(&generate_time_blocks(&GridConfig::default()))
            .unwrap();
        db.insert_assignments(&[AssignedTimeBlock {
            section_id: section,
            classroom_id: room,
            time_block_id: 39,
        }])
        .unwrap();
        let two_days = GridConfig {
            weekdays: vec![Weekday::Mon, Weekday::Tue],
            ..GridConfig::default()
        };
        assert!(db.sync_time_blocks(&generate_time_blocks(&two_days)).is_err());
        assert_eq!(db.list_time_blocks().unwrap().len(), 40);
    }

    #[test]
    fn reset_catalog_reports_and_clears() {
        let (db, _, _) = seeded();
        let counts = db.reset_catalog().unwrap();
        assert_eq!(counts.students, 2);
        assert_eq!(counts.sections, 1);
        assert_eq!(db.counts().unwrap(), CatalogCounts::default());
    }

    #[test]
    fn open_at_creates_a_file_database() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.db");
        {
            let db = TimetableDb::open_at(&path).unwrap();
            db.create_classroom("A", 5).unwrap();
        }
        let db = TimetableDb::open_at(&path).unwrap();
        assert_eq!(db.list_classrooms().unwrap().len(), 1);
    }
}
