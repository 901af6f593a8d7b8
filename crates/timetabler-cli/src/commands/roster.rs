use std::path::PathBuf;

use clap::Subcommand;
use timetabler_core::generator::GeneratedRoster;
use timetabler_core::{
    generate_roster, import_roster, Catalog, ImportSummary, RosterDocument, RosterSpec,
    TimetableDb,
};

#[derive(Subcommand)]
pub enum RosterAction {
    /// Load a JSON roster into the catalog
    Import {
        /// Roster file
        file: PathBuf,
        /// Delete the existing catalog and schedule first
        #[arg(long)]
        replace: bool,
    },
    /// Generate a synthetic roster (printed as JSON unless --import)
    Generate {
        /// Random seed (random if omitted)
        #[arg(long)]
        seed: Option<u64>,
        #[arg(long, default_value_t = 6)]
        classrooms: usize,
        #[arg(long, default_value_t = 8)]
        teachers: usize,
        #[arg(long, default_value_t = 120)]
        students: usize,
        #[arg(long, default_value_t = 10)]
        courses: usize,
        #[arg(long, default_value_t = 2)]
        max_sections_per_course: usize,
        #[arg(long, default_value_t = 8)]
        min_class_size: usize,
        #[arg(long, default_value_t = 30)]
        max_class_size: usize,
        /// Load the generated roster instead of printing it
        #[arg(long)]
        import: bool,
        /// With --import, delete the existing catalog first
        #[arg(long, requires = "import")]
        replace: bool,
    },
    /// List classrooms
    Classrooms {
        #[arg(long)]
        json: bool,
    },
    /// List sections with their rosters
    Sections {
        #[arg(long)]
        json: bool,
    },
}

fn print_summary(summary: &ImportSummary) {
    if let Some(removed) = summary.removed {
        println!(
            "Removed: {} courses, {} sections, {} enrollments",
            removed.courses, removed.sections, removed.enrollments
        );
    }
    let added = summary.added;
    println!(
        "Imported: {} courses, {} teachers, {} students, {} classrooms, {} sections, {} enrollments",
        added.courses, added.teachers, added.students, added.classrooms, added.sections, added.enrollments
    );
}

pub fn run(action: RosterAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        RosterAction::Import { file, replace } => {
            let doc = RosterDocument::from_path(&file)?;
            let db = TimetableDb::open()?;
            let summary = import_roster(&db, &doc, replace)?;
            print_summary(&summary);
        }
        RosterAction::Generate {
            seed,
            classrooms,
            teachers,
            students,
            courses,
            max_sections_per_course,
            min_class_size,
            max_class_size,
            import,
            replace,
        } => {
            let spec = RosterSpec {
                seed,
                classrooms,
                teachers,
                students,
                courses,
                max_sections_per_course,
                min_class_size,
                max_class_size,
            };
            let GeneratedRoster { seed, document } = generate_roster(&spec)?;
            if import {
                let db = TimetableDb::open()?;
                let summary = import_roster(&db, &document, replace)?;
                println!("Seed: {seed}");
                print_summary(&summary);
            } else {
                eprintln!("seed: {seed}");
                println!("{}", document.to_json_pretty()?);
            }
        }
        RosterAction::Classrooms { json } => {
            let db = TimetableDb::open()?;
            let rooms = db.list_classrooms()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&rooms)?);
            } else if rooms.is_empty() {
                println!("No classrooms.");
            } else {
                for room in &rooms {
                    println!("{:>4}  {:<20} capacity {}", room.id, room.name, room.capacity);
                }
            }
        }
        RosterAction::Sections { json } => {
            let db = TimetableDb::open()?;
            let sections = db.list_schedulable_sections()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&sections)?);
            } else if sections.is_empty() {
                println!("No sections.");
            } else {
                for s in &sections {
                    println!(
                        "{:>4}  {:<12} {:<30} blocks {}  students {}{}",
                        s.id,
                        s.code,
                        s.course_title,
                        s.required_block_count,
                        s.enrolled(),
                        if s.closed { "  (closed)" } else { "" }
                    );
                }
            }
        }
    }
    Ok(())
}
