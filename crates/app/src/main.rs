use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use course_core::model::ExerciseId;
use runner::{SupervisorConfig, TestSupervisor};
use services::{
    AppServices, Clock, ProgressStore, ResultSync, RunStart, ServicesConfig, SyncConfig,
};
use tracing::info;
use tracing_subscriber::EnvFilter;
use ui::{AppContext, UiApp, build_app_context};

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    MissingArgument { what: &'static str },
    UnknownArg(String),
    InvalidExerciseId { raw: String },
    InvalidDbUrl { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::MissingArgument { what } => write!(f, "missing {what}"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidExerciseId { raw } => write!(f, "invalid exercise id: {raw:?}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

fn parse_exercise(raw: String) -> Result<ExerciseId, ArgsError> {
    raw.parse()
        .map_err(|_| ArgsError::InvalidExerciseId { raw })
}

fn env_or(name: &str, default: &str) -> String {
    std::env::var(name)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

struct CourseApp {
    services: AppServices,
    sync_config: SyncConfig,
}

impl UiApp for CourseApp {
    fn progress(&self) -> Arc<ProgressStore> {
        self.services.progress()
    }

    fn result_sync(&self) -> ResultSync {
        self.services.result_sync(self.sync_config)
    }
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p app -- serve    [--bind <addr>]");
    eprintln!("  cargo run -p app -- watch    [--exercise <id>] [--report <path|url>] [--runner <url>] [--run]");
    eprintln!("  cargo run -p app -- progress list|toggle <id>|reset|export [--out <path>]|import <path> [--db <sqlite_url>]");
    eprintln!();
    eprintln!("Defaults:");
    eprintln!("  --bind 127.0.0.1:3001");
    eprintln!("  --report public/test-results.json");
    eprintln!("  --runner http://localhost:3001");
    eprintln!("  --db sqlite://progress.sqlite3");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  COURSE_RUNNER_BIND, COURSE_REPORT_PATH, COURSE_RUNNER_URL, COURSE_DB_URL,");
    eprintln!("  COURSE_TEST_COMMAND, RUST_LOG");
}

struct ServeArgs {
    bind: String,
}

impl ServeArgs {
    fn parse(args: &mut impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        let mut bind = env_or("COURSE_RUNNER_BIND", "127.0.0.1:3001");
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--bind" => bind = require_value(args, "--bind")?,
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }
        Ok(Self { bind })
    }
}

struct WatchArgs {
    exercise: Option<ExerciseId>,
    config: ServicesConfig,
    run: bool,
}

impl WatchArgs {
    fn parse(args: &mut impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        let mut parsed = Self {
            exercise: None,
            config: ServicesConfig::from_env(),
            run: false,
        };
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--exercise" => {
                    parsed.exercise = Some(parse_exercise(require_value(args, "--exercise")?)?);
                }
                "--report" => parsed.config.report_location = require_value(args, "--report")?,
                "--runner" => parsed.config.runner_url = require_value(args, "--runner")?,
                "--run" => parsed.run = true,
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }
        Ok(parsed)
    }
}

enum ProgressAction {
    List,
    Toggle(ExerciseId),
    Reset,
    Export { out: Option<PathBuf> },
    Import(PathBuf),
}

struct ProgressArgs {
    action: ProgressAction,
    db_url: String,
}

impl ProgressArgs {
    fn parse(args: &mut impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        let action = args.next().ok_or(ArgsError::MissingArgument {
            what: "progress action",
        })?;
        let mut action = match action.as_str() {
            "list" => ProgressAction::List,
            "toggle" => ProgressAction::Toggle(parse_exercise(args.next().ok_or(
                ArgsError::MissingArgument {
                    what: "exercise id",
                },
            )?)?),
            "reset" => ProgressAction::Reset,
            "export" => ProgressAction::Export { out: None },
            "import" => ProgressAction::Import(PathBuf::from(args.next().ok_or(
                ArgsError::MissingArgument {
                    what: "import path",
                },
            )?)),
            _ => return Err(ArgsError::UnknownArg(action)),
        };

        let mut db_url = normalize_sqlite_url(env_or("COURSE_DB_URL", "sqlite://progress.sqlite3"));
        while let Some(arg) = args.next() {
            match (arg.as_str(), &mut action) {
                ("--db", _) => {
                    let value = require_value(args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = normalize_sqlite_url(value);
                }
                ("--out", ProgressAction::Export { out }) => {
                    *out = Some(PathBuf::from(require_value(args, "--out")?));
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }
        Ok(Self { action, db_url })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Serve,
    Watch,
    Progress,
}

impl Command {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "serve" => Some(Self::Serve),
            "watch" => Some(Self::Watch),
            "progress" => Some(Self::Progress),
            _ => None,
        }
    }
}

fn normalize_sqlite_url(raw: String) -> String {
    let trimmed = raw.trim();
    if trimmed == "sqlite::memory:" || trimmed.starts_with("sqlite://") {
        return trimmed.to_string();
    }

    let path = std::path::Path::new(trimmed.strip_prefix("sqlite:").unwrap_or(trimmed));
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

/// SQLite will not create a missing database file on its own.
fn prepare_sqlite_file(db_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    if db_url == "sqlite::memory:" {
        return Ok(());
    }

    let path = db_url
        .strip_prefix("sqlite://")
        .ok_or_else(|| ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        })?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        }
        .into());
    }

    let path = std::path::Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)?;
    }
    Ok(())
}

async fn serve(args: ServeArgs) -> Result<(), Box<dyn std::error::Error>> {
    let supervisor = TestSupervisor::new(SupervisorConfig::from_env());
    info!(command = %supervisor.config().base_command, "test runner configured");
    runner::start_server(supervisor, &args.bind)?.await?;
    Ok(())
}

async fn watch(args: WatchArgs) -> Result<(), Box<dyn std::error::Error>> {
    let app: Arc<dyn UiApp> = Arc::new(CourseApp {
        services: AppServices::new_in_memory(Clock::system(), &args.config),
        sync_config: SyncConfig::default(),
    });
    let mut panel = build_app_context(&app).results_panel();
    panel.select(args.exercise.clone());

    let mut updates = panel.subscribe();
    panel.mount();

    if args.run {
        match panel.run_selected().await {
            Some(RunStart::Started) => info!("test run requested"),
            Some(other) => info!(outcome = ?other, "test run not started"),
            None => info!("selected exercise has no known test file; nothing to run"),
        }
    }

    let mut last_line = String::new();
    loop {
        tokio::select! {
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }

        let snapshot = updates.borrow_and_update().clone();
        let vm = panel.vm_for(&snapshot);
        let mut line = match (&vm.error, vm.loading) {
            (_, true) => continue,
            (Some(error), _) if !vm.has_results() => error.clone(),
            _ => vm.summary_line(),
        };
        if let Some(notice) = vm.notice {
            line = format!("{line} ({notice})");
        }
        if line != last_line {
            info!(
                running = vm.running,
                last_updated = vm.last_updated.as_deref().unwrap_or("-"),
                "{line}"
            );
            last_line = line;
        }
    }

    panel.teardown();
    Ok(())
}

async fn progress(args: ProgressArgs) -> Result<(), Box<dyn std::error::Error>> {
    prepare_sqlite_file(&args.db_url)?;
    let services = AppServices::new_sqlite(&args.db_url, Clock::system(), &ServicesConfig::default()).await?;
    let app: Arc<dyn UiApp> = Arc::new(CourseApp {
        services,
        sync_config: SyncConfig::default(),
    });
    let context: AppContext = build_app_context(&app);
    let mut tracker = context.tracker_panel();
    tracker.mount().await;

    match args.action {
        ProgressAction::List => {
            if tracker.completed().is_empty() {
                println!("no completed exercises");
            }
            for id in tracker.completed().iter() {
                println!("{id}");
            }
        }
        ProgressAction::Toggle(id) => {
            let state = if tracker.toggle(&id).await {
                "complete"
            } else {
                "not complete"
            };
            println!("{id}: {state}");
        }
        ProgressAction::Reset => {
            tracker.reset().await;
            println!("progress reset");
        }
        ProgressAction::Export { out } => {
            let store = context.progress();
            let Some(document) = store.export_document().await else {
                println!("no progress to export");
                return Ok(());
            };
            let out = out.unwrap_or_else(|| PathBuf::from(store.export_file_name()));
            tokio::fs::write(&out, document).await?;
            println!("exported progress to {}", out.display());
        }
        ProgressAction::Import(path) => {
            let raw = tokio::fs::read_to_string(&path).await?;
            let count = tracker.import(&raw).await?;
            println!("imported {count} completed exercises");
        }
    }
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut argv = std::env::args().skip(1);

    let cmd = match argv.next() {
        None => {
            print_usage();
            return Err(ArgsError::MissingArgument { what: "subcommand" }.into());
        }
        Some(first) if first == "--help" || first == "-h" => {
            print_usage();
            return Ok(());
        }
        Some(first) => Command::from_arg(&first).ok_or_else(|| {
            eprintln!("unknown subcommand: {first}");
            print_usage();
            ArgsError::UnknownArg(first.clone())
        })?,
    };

    init_tracing();

    let report = |e: ArgsError| {
        eprintln!("{e}");
        print_usage();
        e
    };
    match cmd {
        Command::Serve => serve(ServeArgs::parse(&mut argv).map_err(report)?).await,
        Command::Watch => watch(WatchArgs::parse(&mut argv).map_err(report)?).await,
        Command::Progress => progress(ProgressArgs::parse(&mut argv).map_err(report)?).await,
    }
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
