// src/main.rs
use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::io;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use shiftplan_core::compress::{compress, write_ranges_csv, AssignedDay};
use shiftplan_core::config::AppConfig;
use shiftplan_core::store::{ConfigStore, JsonFileConfigStore};
use shiftplan_core::{
    application_holiday_window, apply_template, expand_with, holiday_window, validate,
    ApplyRequest, HolidayCalendar, HolidayRules, HolidaySet, HttpScheduleStore,
    InMemoryScheduleStore, ScheduleConfig, ScheduleStore, YearMonth,
};

#[derive(Parser, Debug)]
#[command(name = "shiftplan", version, about = "Preview and apply recurring work patterns")]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace). RUST_LOG overrides.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Expand a stored config over one month
    Preview {
        #[arg(long)]
        config_id: String,
        /// Month as YYYY-MM
        #[arg(long)]
        month: YearMonth,
        #[arg(long)]
        json: bool,
    },
    /// Run the strict checks used before a config is applied
    Validate {
        #[arg(long)]
        config_id: String,
    },
    /// Create schedule entries for one employee from a stored config
    Apply {
        #[arg(long)]
        config_id: String,
        #[arg(long)]
        schedule_id: String,
        #[arg(long)]
        employee: String,
        #[arg(long)]
        from: NaiveDate,
        #[arg(long)]
        to: NaiveDate,
        /// 1-based starting position within the rotation or cycle
        #[arg(long, default_value_t = 1)]
        position: usize,
        /// Plan against an in-memory store instead of the backend
        #[arg(long)]
        dry_run: bool,
    },
    /// Show a schedule's entries as contiguous ranges
    Ranges {
        #[arg(long)]
        schedule_id: String,
        #[arg(long)]
        csv: bool,
    },
    /// List public holidays for a year
    Holidays {
        #[arg(long)]
        year: i32,
    },
}

fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let default_filter = format!("shiftplan={level},shiftplan_core={level}");

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn load_config(store: &JsonFileConfigStore, config_id: &str) -> Result<ScheduleConfig> {
    let config = store
        .get(config_id)
        .with_context(|| format!("Failed to read config store {}", store.path().display()))?;
    match config {
        Some(config) => Ok(config),
        None => bail!(
            "No config '{}' in {}",
            config_id,
            store.path().display()
        ),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let app_config = AppConfig::from_env().context("Failed to load SHIFTPLAN_* configuration")?;
    debug!("Loaded configuration: {:?}", app_config);
    let configs = JsonFileConfigStore::new(app_config.config_path.clone());
    let holidays = HolidayRules::polish();

    match cli.command {
        Command::Preview {
            config_id,
            month,
            json,
        } => {
            let config = load_config(&configs, &config_id)?;
            let (window_start, window_end) = holiday_window(&config, month);
            let holiday_set = HolidaySet::for_range(&holidays, window_start, window_end);
            let days = expand_with(&config, month, &holiday_set);

            if json {
                println!("{}", serde_json::to_string_pretty(&days)?);
            } else {
                println!("{} ({}) {}", config.name, config.type_name(), month);
                for day in &days {
                    let hours = match (&day.start_time, &day.end_time) {
                        (Some(start), Some(end)) => format!("{}-{}", start, end),
                        _ => String::new(),
                    };
                    println!(
                        "{} {} {:<4} {:<11} {}",
                        day.date,
                        day.date.format("%a"),
                        if day.is_work { "W" } else { "-" },
                        hours,
                        day.note.as_deref().unwrap_or("")
                    );
                }
                println!(
                    "{} working days of {}",
                    days.iter().filter(|d| d.is_work).count(),
                    days.len()
                );
            }
        }

        Command::Validate { config_id } => {
            let config = load_config(&configs, &config_id)?;
            match validate(&config) {
                Ok(()) => println!("Config '{}' is valid", config.id),
                Err(issues) => {
                    for issue in &issues {
                        println!("- {}", issue);
                    }
                    bail!("Config '{}' has {} issue(s)", config.id, issues.len());
                }
            }
        }

        Command::Apply {
            config_id,
            schedule_id,
            employee,
            from,
            to,
            position,
            dry_run,
        } => {
            let config = load_config(&configs, &config_id)?;
            let request = ApplyRequest {
                schedule_id,
                employee_id: employee,
                start_date: from,
                end_date: to,
                position,
            };

            let store: Box<dyn ScheduleStore> = if dry_run {
                info!("Dry run: entries go to an in-memory store");
                Box::new(InMemoryScheduleStore::new())
            } else {
                Box::new(
                    HttpScheduleStore::new(&app_config.store_url, app_config.http_timeout())
                        .context("Failed to create schedule store client")?,
                )
            };

            let (window_start, window_end) = application_holiday_window(&config, &request);
            let holiday_set = HolidaySet::for_range(&holidays, window_start, window_end);
            let report = apply_template(store.as_ref(), &config, &request, &holiday_set)
                .await
                .with_context(|| format!("Failed to apply config '{}'", config.id))?;

            println!(
                "Applied {} day(s) to schedule {}",
                report.applied.len(),
                request.schedule_id
            );
            for skipped in &report.skipped {
                println!("  skipped {}: {}", skipped.date, skipped.reason);
            }
            if !report.is_complete() {
                warn!("{} day(s) were not created", report.skipped.len());
            }
        }

        Command::Ranges { schedule_id, csv } => {
            let store = HttpScheduleStore::new(&app_config.store_url, app_config.http_timeout())
                .context("Failed to create schedule store client")?;
            let entries = store
                .list_entries(&schedule_id)
                .await
                .with_context(|| format!("Failed to list entries of schedule {}", schedule_id))?;
            let days: Vec<AssignedDay> = entries.iter().map(AssignedDay::from).collect();
            let ranges = compress(&days);

            if csv {
                write_ranges_csv(io::stdout().lock(), &ranges).context("Failed to write CSV")?;
            } else {
                for range in &ranges {
                    println!("{} {}", range.employee_id, range.label());
                }
            }
        }

        Command::Holidays { year } => {
            for (date, name) in holidays.named_holidays_for_year(year) {
                println!("{} {} {}", date, date.format("%a"), name);
            }
        }
    }

    Ok(())
}
