use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tax_core::TaxScheduleRepository;
use tax_data::ScheduleLoader;

/// Check a directory of tax schedule CSV files and print a summary.
///
/// The directory must contain federal.csv, federal_meta.csv, cantons.csv,
/// income_brackets.csv, wealth_brackets.csv and municipalities.csv. Without
/// --dir the schedules compiled into this binary are checked.
#[derive(Parser, Debug)]
#[command(name = "tax-data-validate")]
#[command(version, about, long_about = None)]
struct Args {
    /// Directory containing the schedule CSV files
    #[arg(short, long)]
    dir: Option<PathBuf>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let schedules = match &args.dir {
        Some(dir) => {
            println!("Validating schedules in: {}", dir.display());
            ScheduleLoader::from_dir(dir)
                .with_context(|| format!("Invalid schedules in: {}", dir.display()))?
        }
        None => {
            println!("Validating built-in schedules");
            tax_data::builtin()
                .map_err(|e| anyhow::anyhow!("{e}"))
                .context("Invalid built-in schedules")?
                .clone()
        }
    };

    println!(
        "Tax year {}: {} federal brackets, child credit CHF {}",
        schedules.tax_year(),
        schedules.federal().brackets.len(),
        schedules.federal().child_credit
    );
    println!(
        "{:<4} {:<24} {:>8} {:>8} {:>8} {:>8} {:>6}",
        "Code", "Name", "Single", "Married", "Wealth", "Munic.", "Mult."
    );

    for canton in schedules.cantons() {
        println!(
            "{:<4} {:<24} {:>8} {:>8} {:>8} {:>8} {:>6}",
            canton.code,
            canton.name,
            canton.income_brackets.single.len(),
            canton.income_brackets.married.len(),
            canton.wealth_brackets.len(),
            canton.municipalities.len(),
            canton.cantonal_multiplier
        );
    }

    println!("All {} cantons are valid.", schedules.len());
    Ok(())
}
