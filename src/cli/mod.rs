pub mod report;
pub mod watch;

use std::{fmt::Display, path::PathBuf};

use anyhow::{bail, Result};
use chrono::{DateTime, Local, Utc};
use chrono_english::parse_date_string;
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use now::DateTimeNow;
use tokio_util::sync::CancellationToken;
use tracing::{level_filters::LevelFilter, warn};

use crate::{
    config::Settings,
    remote::RemoteClient,
    storage::{CsvTrackerStore, TrackerStore},
    tracker::{error::TrackerError, instance::TimeInstance, ActivityTracker},
    utils::{
        clock::{Clock, DefaultClock},
        dir::create_application_default_path,
        logging::enable_logging,
        time::{next_day_start, parse_timestamp, pretty_duration},
    },
};

#[derive(Parser, Debug)]
#[command(name = "Timekeep", version, long_about = None)]
#[command(about = "Personal activity time tracker", long_about = None)]
struct Args {
    #[command(subcommand)]
    commands: Commands,
    #[arg(long, help = "Enable logging")]
    log: bool,
    #[arg(
        long,
        help = "Application directory. By default tries to save into $XDG_STATE_HOME or $HOME/.local/state"
    )]
    dir: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
#[command(version, about, long_about = None)]
enum Commands {
    #[command(about = "Create a new activity")]
    Add { name: String },
    #[command(about = "Remove an activity and all of its recorded time")]
    Remove { name: String },
    #[command(about = "Start the timer on an activity, stopping any running timer first")]
    Start { name: String },
    #[command(about = "Stop the running timer")]
    Stop {},
    #[command(about = "Show the running timer")]
    Status {
        #[arg(
            short,
            long,
            help = "Refresh the elapsed time every second until interrupted"
        )]
        watch: bool,
    },
    #[command(about = "List activities with their total and trailing 7 day time")]
    List {},
    #[command(about = "Show the recorded instances of one activity, newest first")]
    Log {
        name: String,
        #[arg(
            long,
            help = "Only instances starting after this moment. Examples are \"yesterday\", \"1 hour ago\", \"15/03/2025\""
        )]
        since: Option<String>,
        #[arg(long, help = "Only instances starting before this moment")]
        until: Option<String>,
        #[arg(
            long,
            default_value_t = false,
            help = "Take --since and --until as whole days"
        )]
        days: bool,
        #[arg(long, default_value_t = DateStyle::Uk, help = "Style of dates used during parsing. For Uk it's day/month/year. For Us it's month/day/year")]
        date_style: DateStyle,
    },
    #[command(about = "Record a finished instance by hand")]
    Record {
        name: String,
        #[arg(long, help = "Start of the instance, e.g. \"09:00 15/03/2025\"")]
        start: String,
        #[arg(long, help = "End of the instance")]
        end: String,
        #[arg(long, default_value_t = DateStyle::Uk, help = "Style of dates used during parsing. For Uk it's day/month/year. For Us it's month/day/year")]
        date_style: DateStyle,
    },
    #[command(about = "Delete one recorded instance by its start time")]
    Delete {
        name: String,
        #[arg(help = "Start time exactly as shown by log, \"YYYY-MM-DD HH:MM:SS\" in UTC")]
        start: String,
    },
    #[command(about = "Synchronize the activities file with the configured remote")]
    Sync {
        #[arg(long, help = "Overwrite local data with the remote copy")]
        pull: bool,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum DateStyle {
    Uk,
    Us,
}

impl From<DateStyle> for chrono_english::Dialect {
    fn from(value: DateStyle) -> Self {
        match value {
            DateStyle::Uk => Self::Uk,
            DateStyle::Us => Self::Us,
        }
    }
}

impl Display for DateStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DateStyle::Uk => write!(f, "uk"),
            DateStyle::Us => write!(f, "us"),
        }
    }
}

pub async fn run_cli() -> Result<()> {
    let args = Args::parse();

    let dir = match &args.dir {
        Some(dir) => dir.clone(),
        None => create_application_default_path()?,
    };
    std::fs::create_dir_all(&dir)?;

    let logging_level = if args.log {
        Some(LevelFilter::TRACE)
    } else {
        None
    };
    enable_logging(&dir, logging_level, args.log)?;

    let settings = Settings::load(&dir)?;
    let app = App {
        store: CsvTrackerStore::new(&dir)?,
        remote: RemoteClient::from_settings(&settings),
    };

    run_command(args.commands, &app, &DefaultClock).await
}

async fn run_command(command: Commands, app: &App, clock: &dyn Clock) -> Result<()> {
    match command {
        Commands::Add { name } => {
            let mut tracker = app.load().await?;
            tracker.add_activity(&name)?;
            app.save(&tracker).await?;
            println!("Added activity {name}");
            Ok(())
        }
        Commands::Remove { name } => {
            let mut tracker = app.load().await?;
            if tracker.remove_activity(&name) {
                app.save(&tracker).await?;
                println!("Removed activity {name}");
            } else {
                println!("No activity named {name}");
            }
            Ok(())
        }
        Commands::Start { name } => {
            let mut tracker = app.load().await?;
            let stopped = tracker.start_timer(&name, clock.time())?;
            app.save(&tracker).await?;
            if let Some(stopped) = stopped {
                println!(
                    "Stopped {} after {}",
                    stopped.activity,
                    pretty_duration(stopped.duration)
                );
            }
            println!("Started timer for {name}");
            Ok(())
        }
        Commands::Stop {} => {
            let mut tracker = app.load().await?;
            match tracker.stop_timer(clock.time())? {
                Some(stopped) => {
                    app.save(&tracker).await?;
                    println!(
                        "Stopped {} after {}",
                        stopped.activity,
                        pretty_duration(stopped.duration)
                    );
                }
                None => println!("No timer running."),
            }
            Ok(())
        }
        Commands::Status { watch } => {
            let tracker = app.load().await?;
            if watch {
                let cancel = CancellationToken::new();
                tokio::spawn(watch::cancel_on_interrupt(cancel.clone()));
                watch::run_watch(&tracker, clock, cancel).await
            } else {
                match tracker.active_activity_name() {
                    Some(name) => {
                        let elapsed = tracker.current_elapsed(clock.time()).unwrap_or_default();
                        println!("{name}: {}", pretty_duration(elapsed));
                    }
                    None => println!("No timer running."),
                }
                Ok(())
            }
        }
        Commands::List {} => {
            let tracker = app.load().await?;
            report::print_activities(&tracker, clock.time());
            Ok(())
        }
        Commands::Log {
            name,
            since,
            until,
            days,
            date_style,
        } => {
            let mut tracker = app.load().await?;
            if !tracker.set_activity(&name) {
                return Err(TrackerError::UnknownActivity(name).into());
            }
            let Some(activity) = tracker.current_activity() else {
                bail!("no selected activity");
            };

            let mut since = since.map(|v| parse_moment(&v, date_style)).transpose()?;
            let mut until = until.map(|v| parse_moment(&v, date_style)).transpose()?;
            if days {
                since = since.map(|v| v.with_timezone(&Local).beginning_of_day().to_utc());
                until = until.map(|v| next_day_start(v.with_timezone(&Local)).to_utc());
            }

            let now = clock.time();
            let instances: Vec<_> = activity
                .sorted_instances()
                .into_iter()
                .filter(|v| since.map_or(true, |since| v.start() >= since))
                .filter(|v| until.map_or(true, |until| v.start() < until))
                .collect();
            report::print_instances(activity, &instances, now);
            Ok(())
        }
        Commands::Record {
            name,
            start,
            end,
            date_style,
        } => {
            let mut tracker = app.load().await?;
            let start = parse_moment(&start, date_style)?;
            let end = parse_moment(&end, date_style)?;

            let Some(activity) = tracker.activity_mut(&name) else {
                return Err(TrackerError::UnknownActivity(name).into());
            };
            let instance = TimeInstance::finished(start, end)?;
            let duration = instance.duration();
            activity.record_instance(instance)?;
            app.save(&tracker).await?;
            println!("Recorded {} on {name}", pretty_duration(duration));
            Ok(())
        }
        Commands::Delete { name, start } => {
            let mut tracker = app.load().await?;
            let start = parse_timestamp(&start)?;
            let Some(activity) = tracker.activity_mut(&name) else {
                return Err(TrackerError::UnknownActivity(name).into());
            };
            if activity.delete_instance(start) {
                app.save(&tracker).await?;
                println!("Deleted instance starting at {start}");
            } else {
                println!("No instance of {name} starts at {start}");
            }
            Ok(())
        }
        Commands::Sync { pull } => {
            let Some(remote) = &app.remote else {
                println!("Remote sync is not configured.");
                return Ok(());
            };
            if pull {
                match remote.retrieve().await? {
                    Some(data) => {
                        app.store.write_raw(&data).await?;
                        println!("Pulled activities from remote.");
                    }
                    None => println!("Remote holds no data yet."),
                }
            } else {
                match app.store.read_raw().await? {
                    Some(data) => {
                        remote.push(&data).await?;
                        println!("Pushed activities to remote.");
                    }
                    None => println!("Nothing saved locally yet."),
                }
            }
            Ok(())
        }
    }
}

/// Parses a human readable date like the ones `log --since` accepts,
/// reporting failures as clap validation errors.
fn parse_moment(value: &str, date_style: DateStyle) -> Result<DateTime<Utc>> {
    match parse_date_string(value, Local::now(), date_style.into()) {
        Ok(v) => Ok(v.to_utc()),
        Err(e) => Err(Args::command()
            .error(
                clap::error::ErrorKind::ValueValidation,
                format!("Failed to parse date \"{value}\": {e}"),
            )
            .into()),
    }
}

/// Everything a command needs: the local store plus the optional remote
/// mirror. Remote errors never block local operation.
struct App {
    store: CsvTrackerStore,
    remote: Option<RemoteClient>,
}

impl App {
    /// Loads the tracker, preferring the remote copy when one is reachable.
    async fn load(&self) -> Result<ActivityTracker> {
        if let Some(remote) = &self.remote {
            match remote.retrieve().await {
                Ok(Some(data)) => self.store.write_raw(&data).await?,
                Ok(None) => {}
                Err(e) => warn!("remote unavailable, using local data: {e}"),
            }
        }
        self.store.load().await
    }

    /// Saves locally, then mirrors to the remote best-effort.
    async fn save(&self, tracker: &ActivityTracker) -> Result<()> {
        self.store.save(tracker).await?;
        if let Some(remote) = &self.remote {
            if let Some(data) = self.store.read_raw().await? {
                if let Err(e) = remote.push(&data).await {
                    warn!("remote sync failed, data saved locally: {e}");
                }
            }
        }
        Ok(())
    }
}
