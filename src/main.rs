use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{bail, Context, Result};
use chrono::{Datelike, Local, NaiveDate};
use clap::{Args, Parser, Subcommand};

use fomc_calendar::calendar::{self, Pipeline};
use fomc_calendar::config::Settings;
use fomc_calendar::entry::{sort_entries, CalendarEntry};
use fomc_calendar::fetch::{FetchOptions, HttpFetcher};
use fomc_calendar::{db, export, parser};

#[derive(Parser)]
#[command(name = "fomc_calendar", about = "FOMC meeting calendar extractor")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct Output {
    /// Write the entries to this CSV file
    #[arg(long)]
    out: Option<PathBuf>,
    /// Do not save the run to the database
    #[arg(long)]
    no_db: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Meetings on the current calendar page
    Current {
        /// Parse a saved copy of the page instead of fetching it
        #[arg(long)]
        html: Option<PathBuf>,
        #[command(flatten)]
        output: Output,
    },
    /// Meetings that have not concluded yet
    Future {
        /// Reference date (default: today)
        #[arg(long)]
        today: Option<NaiveDate>,
        /// Parse a saved copy of the page instead of fetching it
        #[arg(long)]
        html: Option<PathBuf>,
        #[command(flatten)]
        output: Output,
    },
    /// Meetings from the historical year pages
    Historical {
        /// Years to fetch, e.g. 2008,2009 (default: every year on the index)
        #[arg(long, value_delimiter = ',')]
        years: Option<Vec<i32>>,
        #[command(flatten)]
        output: Output,
    },
    /// Show database statistics
    Stats,
    /// Stored entries
    Show {
        /// Filter by pipeline (current, future, historical)
        #[arg(short, long)]
        pipeline: Option<String>,
        /// Max rows to display
        #[arg(short = 'n', long, default_value = "50")]
        limit: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();
    let settings = Settings::load().context("loading settings")?;

    let result = match cli.command {
        Commands::Current { html, output } => {
            let (entries, source) = match html {
                Some(path) => {
                    let text = read_page(&path)?;
                    let entries = parser::parse_current_calendar(&text, &settings.current_url);
                    (entries, path.display().to_string())
                }
                None => {
                    let fetcher = http_fetcher(&settings)?;
                    let entries = calendar::scrape_current(&fetcher, &settings.current_url).await?;
                    (entries, settings.current_url.clone())
                }
            };
            report(&settings, Pipeline::Current, &source, entries, 0, &output)
        }
        Commands::Future { today, html, output } => {
            let today = today.unwrap_or_else(|| Local::now().date_naive());
            let (entries, source) = match html {
                Some(path) => {
                    let text = read_page(&path)?;
                    let entries =
                        parser::parse_future_calendar_on(&text, &settings.current_url, today);
                    (entries, path.display().to_string())
                }
                None => {
                    let fetcher = http_fetcher(&settings)?;
                    let entries =
                        calendar::scrape_future(&fetcher, &settings.current_url, today).await?;
                    (entries, settings.current_url.clone())
                }
            };
            report(&settings, Pipeline::Future, &source, entries, 0, &output)
        }
        Commands::Historical { years, output } => {
            let fetcher = http_fetcher(&settings)?;
            let current_year = Local::now().year();
            let run = calendar::scrape_historical(&fetcher, &settings, years.as_deref(), current_year)
                .await?;
            println!("Fetched {} year pages ({} failed)", run.pages_ok, run.failed.len());
            for url in &run.failed {
                println!("  skipped {}", url);
            }
            report(
                &settings,
                Pipeline::Historical,
                &settings.historical_index_url,
                run.entries,
                run.failed.len(),
                &output,
            )
        }
        Commands::Stats => {
            let conn = open_db(&settings)?;
            let s = db::get_stats(&conn)?;
            println!("Entries:     {}", s.total);
            for (pipeline, count) in &s.by_pipeline {
                println!("  {:<11} {}", pipeline, count);
            }
            println!("Cancelled:   {}", s.cancelled);
            println!("With SEP:    {}", s.with_projections);
            println!("Runs:        {}", s.runs);
            println!("Last run:    {}", s.last_run.as_deref().unwrap_or("-"));
            Ok(())
        }
        Commands::Show { pipeline, limit } => {
            let pipeline = match pipeline.as_deref() {
                Some(p) => match Pipeline::parse(p) {
                    Some(p) => Some(p),
                    None => bail!("unknown pipeline {:?} (current, future, historical)", p),
                },
                None => None,
            };
            let conn = open_db(&settings)?;
            let entries = db::fetch_entries(&conn, pipeline, Some(limit))?;
            if entries.is_empty() {
                println!("No entries stored. Run 'current', 'future' or 'historical' first.");
                return Ok(());
            }
            print_table(&entries);
            println!("\n{} entries", entries.len());
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    result
}

fn http_fetcher(settings: &Settings) -> Result<HttpFetcher> {
    Ok(HttpFetcher::new(FetchOptions::try_from(settings)?)?)
}

fn read_page(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))
}

fn open_db(settings: &Settings) -> Result<rusqlite::Connection> {
    let conn = db::connect(Path::new(&settings.db_path))
        .with_context(|| format!("opening {}", settings.db_path))?;
    db::init_schema(&conn)?;
    Ok(conn)
}

/// Sort, print, then export and persist one run.
fn report(
    settings: &Settings,
    pipeline: Pipeline,
    source: &str,
    mut entries: Vec<CalendarEntry>,
    failed_pages: usize,
    output: &Output,
) -> Result<()> {
    sort_entries(&mut entries);
    println!("{} {} entries", entries.len(), pipeline.as_str());
    if entries.is_empty() {
        return Ok(());
    }
    print_table(&entries);

    let preview = &entries[..entries.len().min(2)];
    println!("\nPreview:\n{}", serde_json::to_string_pretty(preview)?);

    if let Some(path) = &output.out {
        export::write_csv(path, &entries)?;
        println!("Wrote {}", path.display());
    }
    if !output.no_db {
        let conn = open_db(settings)?;
        let saved = db::save_entries(&conn, pipeline, &entries)?;
        db::record_run(&conn, pipeline, source, entries.len(), failed_pages)?;
        println!("Saved {} entries to {}", saved, settings.db_path);
    }
    Ok(())
}

fn print_table(entries: &[CalendarEntry]) {
    println!(
        "{:>4} | {:<10} | {:<10} | {:<13} | {:<4} | {:<3} | {:<40}",
        "Year", "Start", "End", "Type", "Canc", "SEP", "Statement"
    );
    println!("{}", "-".repeat(102));
    for e in entries {
        let statement = e.statement_url.as_deref().map(|u| truncate(u, 40));
        println!(
            "{:>4} | {:<10} | {:<10} | {:<13} | {:<4} | {:<3} | {:<40}",
            e.year,
            e.start_date,
            e.end_date,
            e.meeting_type.as_str(),
            if e.is_cancelled { "yes" } else { "" },
            if e.has_sep_projections { "*" } else { "" },
            statement.unwrap_or_else(|| "-".into())
        );
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max).collect();
        format!("{}...", truncated)
    }
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
