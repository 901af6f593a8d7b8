//! Post-hoc checks of a committed timetable.
//!
//! [`verify_schedule`] re-derives every timetable invariant from the raw
//! assignment rows, independently of the conflict index that produced them.
//! An empty result means the rows describe a valid timetable.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde::Serialize;

use crate::grid::TimeBlock;
use crate::model::{AssignedTimeBlock, Classroom, Section};

/// A broken invariant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Violation {
    RoomDoubleBooked {
        classroom_id: i64,
        time_block_id: i64,
        section_ids: Vec<i64>,
    },
    SectionDoubleBooked {
        section_id: i64,
        time_block_id: i64,
    },
    TeacherClash {
        teacher_id: i64,
        time_block_id: i64,
        section_ids: Vec<i64>,
    },
    StudentClash {
        student_id: i64,
        time_block_id: i64,
        section_ids: Vec<i64>,
    },
    OverCapacity {
        section_id: i64,
        classroom_id: i64,
        capacity: u32,
        enrolled: usize,
    },
    WrongBlockCount {
        section_id: i64,
        expected: u32,
        actual: usize,
    },
    SplitAcrossDays {
        section_id: i64,
    },
    NotContiguous {
        section_id: i64,
    },
    Unplaced {
        section_id: i64,
    },
    DanglingReference {
        section_id: i64,
        what: &'static str,
        id: i64,
    },
}

impl Violation {
    /// True for open sections that simply have no rows.
    pub fn is_unplaced(&self) -> bool {
        matches!(self, Violation::Unplaced { .. })
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Violation::RoomDoubleBooked {
                classroom_id,
                time_block_id,
                section_ids,
            } => write!(
                f,
                "classroom {classroom_id} hosts sections {section_ids:?} in block {time_block_id}"
            ),
            Violation::SectionDoubleBooked {
                section_id,
                time_block_id,
            } => write!(
                f,
                "section {section_id} holds block {time_block_id} more than once"
            ),
            Violation::TeacherClash {
                teacher_id,
                time_block_id,
                section_ids,
            } => write!(
                f,
                "teacher {teacher_id} teaches sections {section_ids:?} in block {time_block_id}"
            ),
            Violation::StudentClash {
                student_id,
                time_block_id,
                section_ids,
            } => write!(
                f,
                "student {student_id} attends sections {section_ids:?} in block {time_block_id}"
            ),
            Violation::OverCapacity {
                section_id,
                classroom_id,
                capacity,
                enrolled,
            } => write!(
                f,
                "section {section_id} has {enrolled} students but classroom {classroom_id} seats {capacity}"
            ),
            Violation::WrongBlockCount {
                section_id,
                expected,
                actual,
            } => write!(
                f,
                "section {section_id} has {actual} block(s), expected {expected}"
            ),
            Violation::SplitAcrossDays { section_id } => {
                write!(f, "section {section_id} spans more than one weekday")
            }
            Violation::NotContiguous { section_id } => {
                write!(f, "section {section_id} has a gap between its blocks")
            }
            Violation::Unplaced { section_id } => {
                write!(f, "section {section_id} has no assigned blocks")
            }
            Violation::DanglingReference {
                section_id,
                what,
                id,
            } => write!(f, "section {section_id} references unknown {what} {id}"),
        }
    }
}

/// Check every timetable invariant over `rows`.
///
/// Violations come back grouped by kind and in ascending id order so the
/// output is stable across runs.
pub fn verify_schedule(
    blocks: &[TimeBlock],
    sections: &[Section],
    classrooms: &[Classroom],
    rows: &[AssignedTimeBlock],
) -> Vec<Violation> {
    let block_by_id: HashMap<i64, &TimeBlock> = blocks.iter().map(|b| (b.id, b)).collect();
    let section_by_id: HashMap<i64, &Section> = sections.iter().map(|s| (s.id, s)).collect();
    let room_by_id: HashMap<i64, &Classroom> = classrooms.iter().map(|c| (c.id, c)).collect();

    let mut violations = Vec::new();

    let mut room_cells: BTreeMap<(i64, i64), Vec<i64>> = BTreeMap::new();
    let mut section_cells: BTreeMap<(i64, i64), usize> = BTreeMap::new();
    let mut teacher_cells: BTreeMap<(i64, i64), Vec<i64>> = BTreeMap::new();
    let mut student_cells: BTreeMap<(i64, i64), Vec<i64>> = BTreeMap::new();
    let mut per_section: BTreeMap<i64, Vec<&AssignedTimeBlock>> = BTreeMap::new();

    for row in rows {
        room_cells
            .entry((row.classroom_id, row.time_block_id))
            .or_default()
            .push(row.section_id);
        *section_cells
            .entry((row.section_id, row.time_block_id))
            .or_default() += 1;
        per_section.entry(row.section_id).or_default().push(row);

        if let Some(section) = section_by_id.get(&row.section_id) {
            teacher_cells
                .entry((section.teacher_id, row.time_block_id))
                .or_default()
                .push(section.id);
            for &student in &section.enrolled_student_ids {
                student_cells
                    .entry((student, row.time_block_id))
                    .or_default()
                    .push(section.id);
            }
        }
    }

    for ((classroom_id, time_block_id), mut ids) in room_cells {
        ids.sort_unstable();
        ids.dedup();
        if ids.len() > 1 {
            violations.push(Violation::RoomDoubleBooked {
                classroom_id,
                time_block_id,
                section_ids: ids,
            });
        }
    }
    for ((section_id, time_block_id), count) in section_cells {
        if count > 1 {
            violations.push(Violation::SectionDoubleBooked {
                section_id,
                time_block_id,
            });
        }
    }
    for ((teacher_id, time_block_id), mut ids) in teacher_cells {
        ids.sort_unstable();
        ids.dedup();
        if ids.len() > 1 {
            violations.push(Violation::TeacherClash {
                teacher_id,
                time_block_id,
                section_ids: ids,
            });
        }
    }
    for ((student_id, time_block_id), mut ids) in student_cells {
        ids.sort_unstable();
        ids.dedup();
        if ids.len() > 1 {
            violations.push(Violation::StudentClash {
                student_id,
                time_block_id,
                section_ids: ids,
            });
        }
    }

    for (&section_id, section_rows) in &per_section {
        let Some(section) = section_by_id.get(&section_id) else {
            violations.push(Violation::DanglingReference {
                section_id,
                what: "section",
                id: section_id,
            });
            continue;
        };

        for row in section_rows {
            match room_by_id.get(&row.classroom_id) {
                Some(room) if (room.capacity as usize) < section.enrolled() => {
                    violations.push(Violation::OverCapacity {
                        section_id,
                        classroom_id: room.id,
                        capacity: room.capacity,
                        enrolled: section.enrolled(),
                    });
                    break;
                }
                Some(_) => {}
                None => violations.push(Violation::DanglingReference {
                    section_id,
                    what: "classroom",
                    id: row.classroom_id,
                }),
            }
        }

        if section_rows.len() != section.required_block_count as usize {
            violations.push(Violation::WrongBlockCount {
                section_id,
                expected: section.required_block_count,
                actual: section_rows.len(),
            });
        }

        let mut placed: Vec<&TimeBlock> = Vec::with_capacity(section_rows.len());
        for row in section_rows {
            match block_by_id.get(&row.time_block_id) {
                Some(block) => placed.push(block),
                None => violations.push(Violation::DanglingReference {
                    section_id,
                    what: "time block",
                    id: row.time_block_id,
                }),
            }
        }
        placed.sort_by_key(|b| (b.weekday_index, b.start));
        placed.dedup_by_key(|b| b.id);
        if placed.windows(2).any(|p| p[0].weekday_index != p[1].weekday_index) {
            violations.push(Violation::SplitAcrossDays { section_id });
        } else if placed.windows(2).any(|p| !p[0].is_followed_by(p[1])) {
            violations.push(Violation::NotContiguous { section_id });
        }
    }

    let mut open: Vec<&Section> = sections.iter().filter(|s| !s.closed).collect();
    open.sort_by_key(|s| s.id);
    for section in open {
        if !per_section.contains_key(&section.id) {
            violations.push(Violation::Unplaced {
                section_id: section.id,
            });
        }
    }

    violations
}
