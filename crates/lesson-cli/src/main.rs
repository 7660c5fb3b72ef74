//! `lessons` CLI — list open slots and manage bookings from the command line.
//!
//! Bookings live in a JSON snapshot of an in-memory calendar (`--store`), so
//! the CLI is a self-contained stand-in for the remote calendar.
//!
//! ## Usage
//!
//! ```sh
//! # Open slots on a day (instructor's calendar day), labelled for a student zone
//! lessons --store cal.json slots --date 2024-01-05 --timezone Asia/Taipei
//!
//! # Book a lesson
//! lessons --store cal.json book --start 2024-01-05T01:00:00Z \
//!     --name "Lin" --email lin@example.com
//!
//! # Look up, reschedule, cancel
//! lessons --store cal.json show --id MZK-20240101-AB12CD --email lin@example.com
//! lessons --store cal.json modify --id MZK-20240101-AB12CD --email lin@example.com \
//!     --start 2024-01-06T01:00:00Z
//! lessons --store cal.json cancel --id MZK-20240101-AB12CD --email lin@example.com
//!
//! # Block time that is not a lesson
//! lessons --store cal.json block --start 2024-01-05T03:00:00Z --end 2024-01-05T05:00:00Z
//! ```
//!
//! Every command prints a JSON response on stdout and exits non-zero when the
//! response is a failure. Logs go to stderr (`RUST_LOG` controls the level).

use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use lesson_engine::desk::{
    BookingQuery, CreateBookingRequest, ListSlotsRequest, ModifyBookingRequest,
};
use lesson_engine::{
    ApiResponse, Clock, EngineConfig, FixedClock, InMemoryCalendar, LessonDesk, SystemClock,
    TimeInterval,
};
use serde_json::json;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(
    name = "lessons",
    version,
    about = "Lesson availability and booking CLI"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Calendar snapshot file (created on first write)
    #[arg(long, default_value = "lessons-calendar.json")]
    store: PathBuf,

    /// JSON config file (defaults plus LESSONS_* environment variables if omitted)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Pretend the current time is this RFC 3339 instant
    #[arg(long)]
    now: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// List bookable slots on a day
    Slots {
        /// Day in the instructor's zone (YYYY-MM-DD)
        #[arg(short, long)]
        date: String,
        /// Student timezone used for labels
        #[arg(short, long)]
        timezone: Option<String>,
    },
    /// Book a lesson
    Book {
        /// Lesson start (RFC 3339)
        #[arg(short, long)]
        start: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(short, long)]
        timezone: Option<String>,
        #[arg(long)]
        note: Option<String>,
    },
    /// Show a booking
    Show {
        #[arg(long)]
        id: String,
        #[arg(long)]
        email: String,
    },
    /// Move a booking to a new start time
    Modify {
        #[arg(long)]
        id: String,
        #[arg(long)]
        email: String,
        /// New lesson start (RFC 3339)
        #[arg(short, long)]
        start: String,
    },
    /// Cancel a booking
    Cancel {
        #[arg(long)]
        id: String,
        #[arg(long)]
        email: String,
    },
    /// Mark time as busy without creating a booking
    Block {
        #[arg(short, long)]
        start: String,
        #[arg(short, long)]
        end: String,
    },
    /// Print the effective configuration
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lessons=info,lesson_engine=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => EngineConfig::from_file(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => EngineConfig::from_env().context("invalid LESSONS_* environment")?,
    };

    let clock: Arc<dyn Clock> = match cli.now.as_deref() {
        Some(now) => Arc::new(FixedClock(parse_time(now)?)),
        None => Arc::new(SystemClock),
    };

    let calendar = Arc::new(
        InMemoryCalendar::load(&cli.store)
            .with_context(|| format!("failed to read store {}", cli.store.display()))?,
    );
    tracing::debug!(store = %cli.store.display(), "calendar loaded");
    let config = Arc::new(config);
    let desk = LessonDesk::new(Arc::clone(&calendar), Arc::clone(&config), clock);

    let (output, success, dirty) = match cli.command {
        Commands::Slots { date, timezone } => {
            let response = desk.list_slots(ListSlotsRequest { date, timezone }).await;
            render(response, false)?
        }
        Commands::Book {
            start,
            name,
            email,
            timezone,
            note,
        } => {
            let response = desk
                .create_booking(CreateBookingRequest {
                    student_name: name,
                    student_email: email,
                    student_timezone: timezone,
                    start_time: start,
                    note,
                })
                .await;
            render(response, true)?
        }
        Commands::Show { id, email } => {
            let response = desk
                .get_booking(BookingQuery {
                    booking_id: id,
                    email,
                })
                .await;
            render(response, false)?
        }
        Commands::Modify { id, email, start } => {
            let response = desk
                .modify_booking(ModifyBookingRequest {
                    booking_id: id,
                    email,
                    new_start_time: start,
                })
                .await;
            render(response, true)?
        }
        Commands::Cancel { id, email } => {
            let response = desk
                .cancel_booking(BookingQuery {
                    booking_id: id,
                    email,
                })
                .await;
            render(response, true)?
        }
        Commands::Block { start, end } => {
            let start = parse_time(&start)?;
            let end = parse_time(&end)?;
            let Some(interval) = TimeInterval::new(start, end) else {
                bail!("block start must be before end");
            };
            let event_id = calendar.add_busy(interval).await;
            let output = serde_json::to_string_pretty(&json!({
                "success": true,
                "event_id": event_id,
                "start": interval.start,
                "end": interval.end,
            }))?;
            (output, true, true)
        }
        Commands::Config => (config.to_json_pretty()?, true, false),
    };

    if dirty {
        calendar
            .save(&cli.store)
            .await
            .with_context(|| format!("failed to write store {}", cli.store.display()))?;
    }

    println!("{output}");
    if !success {
        process::exit(1);
    }
    Ok(())
}

/// Serialize a response; `writes` marks commands whose success changed the store.
fn render<T: serde::Serialize>(response: ApiResponse<T>, writes: bool) -> Result<(String, bool, bool)> {
    let success = response.is_success();
    let output = serde_json::to_string_pretty(&response).context("failed to serialize response")?;
    Ok((output, success, writes && success))
}

fn parse_time(input: &str) -> Result<DateTime<Utc>> {
    lesson_engine::timezone::parse_instant(input)
        .with_context(|| format!("invalid time '{input}', expected RFC 3339"))
}
