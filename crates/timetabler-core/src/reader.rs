//! Per-section display view over committed assignments.
//!
//! Pure projection: it never touches scheduling state, so it can run at any
//! time. While a regeneration is in progress it only shows what has been
//! committed so far.

use std::collections::BTreeMap;

use chrono::{NaiveTime, Weekday};
use serde::{Deserialize, Serialize};

use crate::grid::hhmm;

/// One assignment row joined with its section, course, room and block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleRow {
    pub section_id: i64,
    pub course_title: String,
    pub course_code: String,
    pub section_code: String,
    pub classroom_name: String,
    pub weekday: Weekday,
    pub weekday_index: u32,
    pub start: NaiveTime,
    pub stop: NaiveTime,
}

/// What a section's slot looks like on screen or in an export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayEntry {
    pub course_title: String,
    pub course_code: String,
    pub section_code: String,
    pub classroom_name: String,
    pub weekday: Weekday,
    #[serde(with = "hhmm")]
    pub start_time: NaiveTime,
    #[serde(with = "hhmm")]
    pub stop_time: NaiveTime,
}

impl DisplayEntry {
    /// `HH:MM-HH:MM`
    pub fn time_range(&self) -> String {
        format!(
            "{}-{}",
            self.start_time.format(hhmm::FORMAT),
            self.stop_time.format(hhmm::FORMAT)
        )
    }
}

/// Collapse joined rows into one entry per section.
///
/// The merged range runs from the earliest block's start to the latest
/// block's stop.
pub fn build_schedule(mut rows: Vec<ScheduleRow>) -> BTreeMap<i64, DisplayEntry> {
    rows.sort_by_key(|r| (r.section_id, r.weekday_index, r.start));

    let mut schedule: BTreeMap<i64, DisplayEntry> = BTreeMap::new();
    for row in rows {
        match schedule.get_mut(&row.section_id) {
            Some(entry) => {
                entry.stop_time = row.stop;
            }
            None => {
                schedule.insert(
                    row.section_id,
                    DisplayEntry {
                        course_title: row.course_title,
                        course_code: row.course_code,
                        section_code: row.section_code,
                        classroom_name: row.classroom_name,
                        weekday: row.weekday,
                        start_time: row.start,
                        stop_time: row.stop,
                    },
                );
            }
        }
    }
    schedule
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(h: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, 0, 0).unwrap()
    }

    fn row(section_id: i64, code: &str, start: u32) -> ScheduleRow {
        ScheduleRow {
            section_id,
            course_title: "Algorithms".into(),
            course_code: "CS201".into(),
            section_code: code.into(),
            classroom_name: "Hall B".into(),
            weekday: Weekday::Wed,
            weekday_index: 2,
            start: t(start),
            stop: t(start + 1),
        }
    }

    #[test]
    fn merges_blocks_into_one_range() {
        let rows = vec![row(1, "CS201-A", 11), row(1, "CS201-A", 9), row(1, "CS201-A", 10)];
        let schedule = build_schedule(rows);
        assert_eq!(schedule.len(), 1);
        let entry = &schedule[&1];
        assert_eq!(entry.start_time, t(9));
        assert_eq!(entry.stop_time, t(12));
        assert_eq!(entry.time_range(), "09:00-12:00");
        assert_eq!(entry.classroom_name, "Hall B");
    }

    #[test]
    fn keeps_sections_apart() {
        let rows = vec![row(2, "B", 14), row(1, "A", 9)];
        let schedule = build_schedule(rows);
        let codes: Vec<_> = schedule.values().map(|e| e.section_code.as_str()).collect();
        assert_eq!(codes, vec!["A", "B"]);
    }

    #[test]
    fn empty_input_gives_empty_schedule() {
        assert!(build_schedule(Vec::new()).is_empty());
    }

    #[test]
    fn serializes_times_as_hhmm() {
        let schedule = build_schedule(vec![row(1, "A", 9)]);
        let json = serde_json::to_value(&schedule).unwrap();
        assert_eq!(json["1"]["start_time"], "09:00");
        assert_eq!(json["1"]["weekday"], "Wed");
    }
}
