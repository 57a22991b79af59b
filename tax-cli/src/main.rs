use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};
use clap::{Args, Parser, Subcommand};
use rust_decimal::Decimal;
use tax_core::{
    CivilStatus, Confession, EmploymentStatus, InMemorySchedules, InputUpdate,
    TaxCalculationInput, TaxEngine, TaxScheduleRepository,
};
use tax_data::ScheduleLoader;
use tracing::{debug, info};

use tax_cli::config::load_engine_config;
use tax_cli::logging::{LogOptions, init_logging};
use tax_cli::profile_loader::{self, Profile};
use tax_cli::report::{ComparisonTable, ProfileReport, ResultReport, SuggestionList, to_json};
use tax_cli::utils::parse_chf;

// ─── CLI definition ──────────────────────────────────────────────────────────

/// Swiss income and wealth tax calculator.
///
/// Computes federal, cantonal, communal and church tax for one taxpayer
/// or a CSV batch, compares all 26 cantons and suggests ways to lower
/// the bill.
#[derive(Debug, Parser)]
#[command(name = "swiss-tax", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Engine configuration (TOML). A missing file means defaults.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory with schedule CSV files instead of the built-in 2025 tables.
    #[arg(long, global = true)]
    schedules: Option<PathBuf>,

    /// Print JSON instead of text.
    #[arg(long, global = true)]
    json: bool,

    /// Log filter, e.g. `debug` or `tax_core=debug`. Overrides RUST_LOG.
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Also append log records to this file.
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Full tax assessment.
    Calculate(ProfileArgs),
    /// Rank all cantons by total tax for the same profile.
    Compare(ProfileArgs),
    /// Assessment followed by ranked optimization suggestions.
    Suggest(ProfileArgs),
}

#[derive(Debug, Args)]
struct ProfileArgs {
    /// Read profiles from a CSV file instead of the flags below.
    #[arg(long)]
    profiles: Option<PathBuf>,

    /// Two-letter canton code.
    #[arg(long, required_unless_present = "profiles")]
    canton: Option<String>,

    /// Defaults to the canton's main municipality.
    #[arg(long)]
    municipality: Option<String>,

    /// Gross salary, e.g. 100'000.
    #[arg(long, value_parser = parse_chf)]
    salary: Option<Decimal>,

    #[arg(long, value_parser = parse_chf)]
    other_income: Option<Decimal>,

    /// Interest, dividends and rent. Also raises the mortgage interest cap.
    #[arg(long, value_parser = parse_chf)]
    asset_income: Option<Decimal>,

    /// single, married, divorced, widowed or registered_partnership.
    #[arg(long, value_parser = parse_civil_status)]
    status: Option<CivilStatus>,

    #[arg(long)]
    children: Option<u8>,

    #[arg(long)]
    age: Option<u8>,

    /// employed or self_employed.
    #[arg(long, value_parser = parse_employment)]
    employment: Option<EmploymentStatus>,

    /// protestant, roman_catholic or christ_catholic.
    #[arg(long, value_parser = parse_confession)]
    confession: Option<Confession>,

    #[arg(long, value_parser = parse_chf)]
    wealth: Option<Decimal>,

    #[arg(long, value_parser = parse_chf)]
    debts: Option<Decimal>,

    /// Any input field, e.g. `--set pillar_3a=7056`. Repeatable, applied
    /// last and to every profile of a CSV batch.
    #[arg(long = "set", value_name = "FIELD=VALUE")]
    updates: Vec<InputUpdate>,
}

fn parse_civil_status(s: &str) -> Result<CivilStatus, String> {
    CivilStatus::parse(s).ok_or_else(|| format!("unknown civil status '{s}'"))
}

fn parse_employment(s: &str) -> Result<EmploymentStatus, String> {
    EmploymentStatus::parse(s).ok_or_else(|| format!("unknown employment status '{s}'"))
}

fn parse_confession(s: &str) -> Result<Confession, String> {
    Confession::parse(s).ok_or_else(|| format!("unknown confession '{s}'"))
}

impl ProfileArgs {
    /// The profile described by the flags.
    fn single_profile(&self) -> Result<Profile> {
        let canton = self
            .canton
            .as_deref()
            .context("--canton is required without --profiles")?;
        let mut input = TaxCalculationInput::new(
            canton.to_ascii_uppercase(),
            self.municipality.clone().unwrap_or_default(),
        );

        if let Some(v) = self.salary {
            input.apply(InputUpdate::GrossSalary(v));
        }
        if let Some(v) = self.other_income {
            input.apply(InputUpdate::OtherIncome(v));
        }
        if let Some(v) = self.asset_income {
            input.apply(InputUpdate::AssetIncome(v));
        }
        if let Some(v) = self.status {
            input.apply(InputUpdate::CivilStatus(v));
        }
        if let Some(v) = self.children {
            input.apply(InputUpdate::Children(v));
        }
        if self.age.is_some() {
            input.apply(InputUpdate::Age(self.age));
        }
        if let Some(v) = self.employment {
            input.apply(InputUpdate::Employment(v));
        }
        if self.confession.is_some() {
            input.apply(InputUpdate::Confession(self.confession));
        }
        if let Some(v) = self.wealth {
            input.apply(InputUpdate::GrossWealth(v));
        }
        if let Some(v) = self.debts {
            input.apply(InputUpdate::Debts(v));
        }

        Ok(Profile {
            label: input.canton.clone(),
            input,
        })
    }

    fn profiles(
        &self,
        schedules: &InMemorySchedules,
    ) -> Result<Vec<Profile>> {
        let mut profiles = match &self.profiles {
            Some(path) => profile_loader::load_from_file(path)
                .with_context(|| format!("Invalid profiles in: {}", path.display()))?,
            None => vec![self.single_profile()?],
        };

        for profile in &mut profiles {
            for update in &self.updates {
                profile.input.apply(update.clone());
            }
            if profile.input.municipality.is_empty() {
                // Unknown cantons are left alone; the engine reports them.
                if let Some(m) = schedules
                    .canton(&profile.input.canton)
                    .ok()
                    .and_then(|c| c.default_municipality())
                {
                    profile.input.municipality = m.name.clone();
                }
            }
        }
        Ok(profiles)
    }
}

// ─── entry point ─────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(&LogOptions {
        level: cli.log_level.clone(),
        file: cli.log_file.clone(),
    })?;

    let config = load_engine_config(cli.config.as_deref())?;

    let loaded;
    let schedules: &InMemorySchedules = match &cli.schedules {
        Some(dir) => {
            loaded = ScheduleLoader::from_dir(dir)
                .with_context(|| format!("Invalid schedules in: {}", dir.display()))?;
            &loaded
        }
        None => tax_data::builtin()
            .map_err(|e| anyhow!("{e}"))
            .context("Invalid built-in schedules")?,
    };
    info!(
        tax_year = schedules.tax_year(),
        cantons = schedules.len(),
        "schedules ready"
    );

    let engine = TaxEngine::with_config(schedules, config)?;

    match &cli.command {
        Command::Calculate(args) => calculate(&engine, &args.profiles(schedules)?, cli.json),
        Command::Compare(args) => compare(&engine, &args.profiles(schedules)?, cli.json),
        Command::Suggest(args) => suggest(&engine, &args.profiles(schedules)?, cli.json),
    }
}

type Engine<'a> = TaxEngine<'a, InMemorySchedules>;

fn print_json(reports: &[ProfileReport<'_>]) -> Result<()> {
    let json = match reports {
        [single] => to_json(single)?,
        many => to_json(many)?,
    };
    println!("{json}");
    Ok(())
}

fn calculate(
    engine: &Engine<'_>,
    profiles: &[Profile],
    json: bool,
) -> Result<()> {
    let results = profiles
        .iter()
        .map(|p| {
            engine
                .calculate(&p.input)
                .with_context(|| format!("Calculation failed for '{}'", p.label))
        })
        .collect::<Result<Vec<_>>>()?;
    debug!(count = results.len(), "calculations complete");

    if json {
        let reports: Vec<_> = profiles
            .iter()
            .zip(&results)
            .map(|(p, r)| ProfileReport {
                result: Some(r),
                ..ProfileReport::new(&p.label)
            })
            .collect();
        return print_json(&reports);
    }

    for (p, r) in profiles.iter().zip(&results) {
        println!(
            "{}",
            ResultReport {
                profile: &p.label,
                result: r,
            }
        );
    }
    Ok(())
}

fn compare(
    engine: &Engine<'_>,
    profiles: &[Profile],
    json: bool,
) -> Result<()> {
    let tables = profiles
        .iter()
        .map(|p| {
            engine
                .compare_cantons(&p.input)
                .with_context(|| format!("Comparison failed for '{}'", p.label))
        })
        .collect::<Result<Vec<_>>>()?;

    if json {
        let reports: Vec<_> = profiles
            .iter()
            .zip(&tables)
            .map(|(p, rows)| ProfileReport {
                comparison: Some(rows.as_slice()),
                ..ProfileReport::new(&p.label)
            })
            .collect();
        return print_json(&reports);
    }

    for (p, rows) in profiles.iter().zip(&tables) {
        println!("{}", p.label);
        println!("{}", ComparisonTable(rows));
    }
    Ok(())
}

fn suggest(
    engine: &Engine<'_>,
    profiles: &[Profile],
    json: bool,
) -> Result<()> {
    let mut outcomes = Vec::with_capacity(profiles.len());
    for p in profiles {
        let result = engine
            .calculate(&p.input)
            .with_context(|| format!("Calculation failed for '{}'", p.label))?;
        let suggestions = engine.suggest_optimizations(&p.input, &result)?;
        outcomes.push((result, suggestions));
    }

    if json {
        let reports: Vec<_> = profiles
            .iter()
            .zip(&outcomes)
            .map(|(p, (result, suggestions))| ProfileReport {
                result: Some(result),
                suggestions: Some(suggestions.as_slice()),
                ..ProfileReport::new(&p.label)
            })
            .collect();
        return print_json(&reports);
    }

    for (p, (result, suggestions)) in profiles.iter().zip(&outcomes) {
        println!(
            "{}",
            ResultReport {
                profile: &p.label,
                result,
            }
        );
        println!("{}", SuggestionList(suggestions));
    }
    Ok(())
}
