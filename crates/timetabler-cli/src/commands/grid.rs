use clap::Subcommand;
use timetabler_core::grid::hhmm;
use timetabler_core::{generate_time_blocks, Config};

#[derive(Subcommand)]
pub enum GridAction {
    /// Show the time blocks the current config produces
    Show {
        #[arg(long)]
        json: bool,
    },
}

pub fn run(action: GridAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        GridAction::Show { json } => {
            let config = Config::load()?;
            config.grid.validate()?;
            let blocks = generate_time_blocks(&config.grid);
            if json {
                println!("{}", serde_json::to_string_pretty(&blocks)?);
                return Ok(());
            }
            for block in &blocks {
                println!(
                    "{:>4}  {}  {}-{}",
                    block.id,
                    block.weekday,
                    block.start.format(hhmm::FORMAT),
                    block.stop.format(hhmm::FORMAT)
                );
            }
            println!(
                "{} blocks ({} per day x {} days)",
                blocks.len(),
                config.grid.slots_per_day(),
                config.grid.weekdays.len()
            );
        }
    }
    Ok(())
}
