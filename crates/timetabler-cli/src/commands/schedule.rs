use clap::Subcommand;
use timetabler_core::{
    verify_schedule, AssignmentStore, Catalog, Config, TimetableDb, TimetableScheduler,
};

#[derive(Subcommand)]
pub enum ScheduleAction {
    /// Regenerate the whole timetable from the catalog
    Generate {
        #[arg(long)]
        json: bool,
    },
    /// Delete every assignment
    Clear,
    /// Show the committed timetable
    Show {
        #[arg(long)]
        json: bool,
    },
    /// Check the committed timetable for conflicts
    Verify {
        #[arg(long)]
        json: bool,
    },
}

pub fn run(action: ScheduleAction) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let scheduler: TimetableScheduler = config.scheduler();
    let db = TimetableDb::open()?;

    match action {
        ScheduleAction::Generate { json } => {
            let report = scheduler.regenerate_schedule(&db)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("Run: {}", report.run_id);
                println!(
                    "Placed {} sections ({} closed skipped) into {} classrooms over {} time blocks",
                    report.sections_placed,
                    report.sections_closed,
                    report.classrooms,
                    report.time_blocks
                );
                println!("Assignments written: {}", report.assignments_written);
            }
        }
        ScheduleAction::Clear => {
            let removed = scheduler.clear_schedule(&db)?;
            println!("Removed {removed} assignments");
        }
        ScheduleAction::Show { json } => {
            let schedule = scheduler.get_schedule(&db)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&schedule)?);
            } else if schedule.is_empty() {
                println!("No schedule.");
            } else {
                for (section_id, entry) in &schedule {
                    println!(
                        "{:>4}  {:<12} {:<30} {:<12} {} {}",
                        section_id,
                        entry.section_code,
                        entry.course_title,
                        entry.classroom_name,
                        entry.weekday,
                        entry.time_range()
                    );
                }
            }
        }
        ScheduleAction::Verify { json } => {
            let violations = verify_schedule(
                &db.list_time_blocks()?,
                &db.list_schedulable_sections()?,
                &db.list_classrooms()?,
                &db.list_assignments()?,
            );
            if json {
                println!("{}", serde_json::to_string_pretty(&violations)?);
            } else {
                for v in &violations {
                    println!("{v}");
                }
            }
            if !violations.is_empty() {
                return Err(format!("{} violation(s) found", violations.len()).into());
            }
            if !json {
                println!("Schedule is consistent.");
            }
        }
    }
    Ok(())
}
