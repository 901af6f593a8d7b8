//! Seeded synthetic rosters for demos and load tests.
//!
//! The same [`RosterSpec`] always yields the same [`RosterDocument`].

use rand::prelude::*;
use rand_pcg::Mcg128Xsl64;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::import::{ClassroomRecord, CourseRecord, RosterDocument, SectionRecord};

const SUBJECTS: [(&str, &str); 8] = [
    ("CS", "Computing"),
    ("MA", "Mathematics"),
    ("PH", "Physics"),
    ("CH", "Chemistry"),
    ("BI", "Biology"),
    ("HI", "History"),
    ("EC", "Economics"),
    ("LI", "Literature"),
];

const LEVELS: [&str; 4] = ["Foundations of", "Topics in", "Methods in", "Advanced"];

/// Shape of a generated roster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterSpec {
    /// Random seed for reproducibility (None = random)
    pub seed: Option<u64>,
    pub classrooms: usize,
    pub teachers: usize,
    pub students: usize,
    pub courses: usize,
    /// Upper bound on sections per course; each course gets at least one.
    pub max_sections_per_course: usize,
    pub min_class_size: usize,
    pub max_class_size: usize,
}

impl Default for RosterSpec {
    fn default() -> Self {
        Self {
            seed: None,
            classrooms: 6,
            teachers: 8,
            students: 120,
            courses: 10,
            max_sections_per_course: 2,
            min_class_size: 8,
            max_class_size: 30,
        }
    }
}

impl RosterSpec {
    pub fn validate(&self) -> Result<(), ValidationError> {
        for (field, value) in [
            ("classrooms", self.classrooms),
            ("teachers", self.teachers),
            ("students", self.students),
            ("courses", self.courses),
            ("max_sections_per_course", self.max_sections_per_course),
        ] {
            if value == 0 {
                return Err(ValidationError::InvalidValue {
                    field: field.into(),
                    message: "must be at least 1".into(),
                });
            }
        }
        if self.min_class_size > self.max_class_size {
            return Err(ValidationError::InvalidValue {
                field: "min_class_size".into(),
                message: format!(
                    "{} exceeds max_class_size {}",
                    self.min_class_size, self.max_class_size
                ),
            });
        }
        Ok(())
    }
}

/// A generated roster and the seed that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedRoster {
    pub seed: u64,
    pub document: RosterDocument,
}

fn section_letter(i: usize) -> String {
    let mut n = i;
    let mut out = String::new();
    loop {
        out.insert(0, (b'A' + (n % 26) as u8) as char);
        if n < 26 {
            break;
        }
        n = n / 26 - 1;
    }
    out
}

/// Build a roster from `spec`.
///
/// Class sizes never exceed the largest generated classroom, so every
/// section fits somewhere; whether the whole roster can be scheduled still
/// depends on the grid.
pub fn generate_roster(spec: &RosterSpec) -> Result<GeneratedRoster, ValidationError> {
    spec.validate()?;

    let seed = spec.seed.unwrap_or_else(|| Mcg128Xsl64::from_entropy().gen());
    let mut rng = Mcg128Xsl64::seed_from_u64(seed);

    let classrooms: Vec<ClassroomRecord> = (0..spec.classrooms)
        .map(|i| ClassroomRecord {
            name: format!("Room {}", 101 + i),
            capacity: rng.gen_range(spec.min_class_size.max(1)..=spec.max_class_size.max(1)) as u32,
        })
        .collect();
    let largest_room = classrooms.iter().map(|r| r.capacity as usize).max().unwrap_or(0);

    let teachers: Vec<String> = (1..=spec.teachers)
        .map(|i| format!("Teacher {i:02}"))
        .collect();
    let students: Vec<String> = (1..=spec.students)
        .map(|i| format!("Student {i:04}"))
        .collect();

    let courses: Vec<CourseRecord> = (0..spec.courses)
        .map(|i| {
            let (prefix, subject) = SUBJECTS[i % SUBJECTS.len()];
            let level = LEVELS[(i / SUBJECTS.len()) % LEVELS.len()];
            CourseRecord {
                code: format!("{prefix}{}", 101 + i),
                title: format!("{level} {subject}"),
                credits: rng.gen_range(1..=3),
            }
        })
        .collect();

    let mut sections = Vec::new();
    for course in &courses {
        let count = rng.gen_range(1..=spec.max_sections_per_course);
        for s in 0..count {
            let upper = spec.max_class_size.min(largest_room).min(students.len());
            let lower = spec.min_class_size.min(upper);
            let size = rng.gen_range(lower..=upper);
            let mut roster: Vec<String> = students.choose_multiple(&mut rng, size).cloned().collect();
            roster.sort();
            sections.push(SectionRecord {
                code: format!("{}-{}", course.code, section_letter(s)),
                course: course.code.clone(),
                teacher: teachers[rng.gen_range(0..teachers.len())].clone(),
                closed: false,
                students: roster,
            });
        }
    }

    Ok(GeneratedRoster {
        seed,
        document: RosterDocument {
            courses,
            teachers,
            students,
            classrooms,
            sections,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::GridConfig;
    use crate::import::import_roster;
    use crate::scheduler::TimetableScheduler;
    use crate::storage::TimetableDb;
    use crate::verify::verify_schedule;
    use crate::scheduler::{AssignmentStore, Catalog};

    fn seeded(seed: u64) -> RosterSpec {
        RosterSpec {
            seed: Some(seed),
            ..RosterSpec::default()
        }
    }

    #[test]
    fn same_seed_same_roster() {
        let a = generate_roster(&seeded(7)).unwrap();
        let b = generate_roster(&seeded(7)).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.seed, 7);
    }

    #[test]
    fn different_seeds_differ() {
        let a = generate_roster(&seeded(1)).unwrap();
        let b = generate_roster(&seeded(2)).unwrap();
        assert_ne!(a.document, b.document);
    }

    #[test]
    fn respects_sizes_and_bounds() {
        let spec = seeded(11);
        let roster = generate_roster(&spec).unwrap().document;
        assert_eq!(roster.classrooms.len(), spec.classrooms);
        assert_eq!(roster.teachers.len(), spec.teachers);
        assert_eq!(roster.students.len(), spec.students);
        assert_eq!(roster.courses.len(), spec.courses);

        let largest = roster.classrooms.iter().map(|r| r.capacity).max().unwrap() as usize;
        for section in &roster.sections {
            assert!(section.students.len() <= largest);
            assert!(section.students.len() <= spec.max_class_size);
        }
        for course in &roster.courses {
            assert!((1..=3).contains(&course.credits));
            let n = roster.sections.iter().filter(|s| s.course == course.code).count();
            assert!((1..=spec.max_sections_per_course).contains(&n));
        }
        assert!(roster.validate().is_ok());
    }

    #[test]
    fn rejects_empty_dimensions() {
        let spec = RosterSpec {
            teachers: 0,
            ..seeded(3)
        };
        assert!(generate_roster(&spec).is_err());
    }

    #[test]
    fn section_letters_continue_past_z() {
        assert_eq!(section_letter(0), "A");
        assert_eq!(section_letter(25), "Z");
        assert_eq!(section_letter(26), "AA");
    }

    #[test]
    fn small_generated_roster_schedules_cleanly() {
        let spec = RosterSpec {
            seed: Some(42),
            classrooms: 4,
            teachers: 4,
            students: 30,
            courses: 4,
            max_sections_per_course: 1,
            min_class_size: 5,
            max_class_size: 20,
        };
        let roster = generate_roster(&spec).unwrap().document;
        let db = TimetableDb::open_memory().unwrap();
        import_roster(&db, &roster, false).unwrap();

        let scheduler = TimetableScheduler::new(GridConfig::default());
        let report = scheduler.regenerate_schedule(&db).unwrap();
        assert_eq!(report.sections_placed, 4);

        let violations = verify_schedule(
            &db.list_time_blocks().unwrap(),
            &db.list_schedulable_sections().unwrap(),
            &db.list_classrooms().unwrap(),
            &db.list_assignments().unwrap(),
        );
        assert!(violations.is_empty(), "{violations:?}");
    }
}
