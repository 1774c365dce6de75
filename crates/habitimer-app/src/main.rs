use anyhow::{Context, Result};
use chrono::{Local, Utc};
use clap::{Parser, Subcommand};
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use habitimer_app::event_bus::Subscription;
use habitimer_app::routes::{self, View};
use habitimer_app::{listener, App, EventKind, RecordEvent, SessionStatus};
use habitimer_core::storage::{init_data_dir, ConfigStorage};

#[derive(Parser, Debug)]
#[command(name = "habitimer")]
#[command(about = "Personal timer and habit tracker", long_about = None)]
struct Args {
    /// Directory holding preferences, history and settings
    #[arg(long, env = "HABITIMER_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Log level (overrides the saved setting)
    #[arg(short, long)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start timing now, replacing any running session
    Start,
    /// Show the running session
    Status,
    /// Stop the running session and save it to history
    Stop {
        #[arg(short, long)]
        note: Option<String>,
    },
    /// Discard the running session
    Cancel,
    /// List recorded sessions
    History,
    /// Delete one recorded session
    Delete { id: String },
    /// Delete every recorded session
    Clear,
    /// Show or change settings
    Config {
        #[arg(long)]
        log_level: Option<String>,
        #[arg(long)]
        daily_goal: Option<u64>,
        #[arg(long)]
        reset: bool,
    },
    /// Open a screen by path, e.g. /tabs/history
    Open {
        #[arg(default_value = "/")]
        path: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let data_dir = init_data_dir(args.data_dir.clone())?;
    init_logging(&data_dir, args.log_level.clone())?;

    let app = App::open(Some(data_dir)).await?;
    run(&app, args.command).await
}

fn init_logging(data_dir: &std::path::Path, log_level: Option<String>) -> Result<()> {
    let log_level = match log_level {
        Some(level) => level,
        None => ConfigStorage::new(data_dir.to_path_buf())
            .load()
            .map(|config| config.log_level)
            .unwrap_or_else(|_| "info".to_string()),
    };

    let log_file_path = data_dir.join("habitimer.log");
    let log_file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_file_path)
        .with_context(|| format!("opening {}", log_file_path.display()))?;

    use tracing_subscriber::fmt::writer::MakeWriterExt;
    let stderr_writer = std::io::stderr.with_max_level(tracing::Level::WARN);
    let file_writer = std::sync::Mutex::new(log_file).with_max_level(tracing::Level::TRACE);

    tracing_subscriber::fmt()
        .with_writer(stderr_writer.and(file_writer))
        .with_env_filter(tracing_subscriber::EnvFilter::new(&log_level))
        .with_ansi(false)
        .init();

    tracing::debug!("Logging to {}", log_file_path.display());
    Ok(())
}

async fn run(app: &App, command: Command) -> Result<()> {
    match command {
        Command::Start => {
            let started = app.session.start(Utc::now()).await?;
            println!("Timer started at {}", started.with_timezone(&Local).format("%H:%M:%S"));
        }
        Command::Status => show_timer(app).await?,
        Command::Stop { note } => {
            let _history = activate_history_view(app);
            let record = app.session.stop(Utc::now(), note).await?;
            println!(
                "Saved {} ({})",
                record.id,
                format_duration(record.duration_seconds)
            );
        }
        Command::Cancel => {
            app.session.cancel().await?;
            println!("Timer cancelled");
        }
        Command::History => show_history(app).await,
        Command::Delete { id } => {
            let _history = activate_history_view(app);
            app.records.delete(&id).await?;
        }
        Command::Clear => {
            let _history = activate_history_view(app);
            app.records.clear_all().await?;
        }
        Command::Config {
            log_level,
            daily_goal,
            reset,
        } => {
            if reset {
                app.config.reset_to_default().await?;
            }
            if let Some(level) = log_level {
                app.config.set_log_level(level).await?;
            }
            if let Some(minutes) = daily_goal {
                app.config.set_daily_goal(minutes).await?;
            }
            show_settings(app).await;
        }
        Command::Open { path } => match routes::resolve(&path) {
            Some(View::Timer) => show_timer(app).await?,
            Some(View::History) => show_history(app).await,
            Some(View::Settings) => show_settings(app).await,
            None => anyhow::bail!("No screen at '{}'", path),
        },
    }

    Ok(())
}

/// The history screen refreshes on every record change while it is active
fn activate_history_view(app: &App) -> Subscription {
    let on_change = listener(|event| match event {
        RecordEvent::RecordAdded { record } => println!("history: added {}", record.id),
        RecordEvent::RecordUpdated { record } => println!("history: updated {}", record.id),
        RecordEvent::RecordDeleted { record_id } => println!("history: deleted {}", record_id),
        RecordEvent::AllRecordsCleared => println!("history: cleared"),
    });
    Subscription::new(Arc::clone(&app.event_bus), &EventKind::ALL, on_change)
}

async fn show_timer(app: &App) -> Result<()> {
    match app.session.status(Utc::now()).await? {
        SessionStatus::Idle => println!("No timer running"),
        SessionStatus::Running {
            started_at,
            elapsed,
        } => println!(
            "Running since {} ({})",
            started_at.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S"),
            format_duration(elapsed.num_seconds().max(0) as u64)
        ),
    }

    let today_start = Local::now()
        .date_naive()
        .and_hms_opt(0, 0, 0)
        .and_then(|dt| dt.and_local_timezone(Local).earliest())
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(Utc::now);
    let today = app.records.since(today_start).await;
    let tracked: u64 = today.iter().map(|r| r.duration_seconds).sum();
    let goal = app.config.get().await.daily_goal_minutes;
    println!(
        "Today: {} of {} min goal",
        format_duration(tracked),
        goal
    );

    Ok(())
}

async fn show_history(app: &App) {
    let records = app.records.list().await;
    if records.is_empty() {
        println!("No records");
        return;
    }

    for record in &records {
        println!(
            "{}  {}  {}  {}",
            record.id,
            record.start_time.with_timezone(&Local).format("%Y-%m-%d %H:%M"),
            format_duration(record.duration_seconds),
            record.note.as_deref().unwrap_or("")
        );
    }

    let stats = app.records.stats().await;
    println!(
        "{} records, {} total",
        stats.total_records,
        format_duration(stats.total_duration_seconds)
    );
    if let Some(modified) = app.records.last_modified().await {
        println!("Last modified {}", modified.with_timezone(&Local).format("%H:%M:%S"));
    }
}

async fn show_settings(app: &App) {
    let config = app.config.get().await;
    println!("log_level: {}", config.log_level);
    println!("daily_goal_minutes: {}", config.daily_goal_minutes);
    println!("data_dir: {}", app.data_dir.display());
}

fn format_duration(seconds: u64) -> String {
    format!(
        "{:02}:{:02}:{:02}",
        seconds / 3600,
        (seconds % 3600) / 60,
        seconds % 60
    )
}
