//! ASE Fidel command line tools
//!
//! # Usage
//!
//! ```bash
//! # Man-hours for a window and team size
//! ase_cli hh --start 17:00 --end 19:30 --team 4
//!
//! # Show which rows of a roster export would be imported
//! ase_cli import-preview --file efetivo.csv
//!
//! # Menu entries a role can see
//! ase_cli menu --role SUPERVISOR
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};

use ase_fidel::import;
use ase_fidel::models::{wall_time, Role};
use ase_fidel::rules::{visible_menu, HhSummary};

#[derive(Parser)]
#[command(name = "ase_cli")]
#[command(version)]
#[command(about = "Man-hour checks, roster import previews and role menus for ASE Fidel")]
#[command(long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Print JSON instead of text
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute man-hours (HH) for a time window
    Hh {
        /// Start time, HH:MM
        #[arg(long)]
        start: String,
        /// End time, HH:MM
        #[arg(long)]
        end: String,
        /// Team size
        #[arg(long, short)]
        team: usize,
    },

    /// Normalize a CSV roster and list the rows that would be imported
    ImportPreview {
        #[arg(short, long)]
        file: PathBuf,
    },

    /// List the menu entries visible to a role
    Menu {
        #[arg(long, env = "ASE_ROLE", default_value = "VISUALIZADOR")]
        role: String,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Hh { start, end, team } => {
            let start = wall_time::parse(&start).context("invalid --start")?;
            let end = wall_time::parse(&end).context("invalid --end")?;
            let summary = HhSummary::compute(start, end, team);
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                println!(
                    "{} h x {} = {} HH",
                    summary.duration_hours, summary.team_size, summary.display
                );
            }
        }
        Commands::ImportPreview { file } => {
            let content = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let rows = import::read_csv(&content)?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&rows)?);
            } else {
                for row in &rows {
                    println!(
                        "{:<10} {:<30} {:<20} {}",
                        row.matricula, row.name, row.function, row.sector_name
                    );
                }
                println!("{} rows", rows.len());
            }
        }
        Commands::Menu { role } => {
            let role: Role = role.trim().to_uppercase().parse()?;
            let items = visible_menu(Some(role));
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&items)?);
            } else {
                for item in items {
                    println!("{:<12} {}", item.label, item.path);
                    for child in item.children {
                        println!("  {:<10} {}", child.label, child.path);
                    }
                }
            }
        }
    }
    Ok(())
}
