use std::fmt;

use gym_core::model::{ExerciseId, Program, ProgramId, RunId, RunInstance, SectionId};
use serde_json::Value;
use services::{Clock, WorkoutService};
use storage::repository::WorkoutRepository;
use tracing::debug;
use tracing_subscriber::EnvFilter;

mod render;

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    MissingArg { name: &'static str },
    UnknownArg(String),
    InvalidIndex { name: &'static str, raw: String },
    InvalidDbUrl { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::MissingArg { name } => write!(f, "missing <{name}>"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidIndex { name, raw } => {
                write!(f, "invalid <{name}> value: {raw} (counting starts at 1)")
            }
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
        }
    }
}

impl std::error::Error for ArgsError {}

/// Failures resolving command-line references against the loaded data.
#[derive(Debug)]
enum LookupError {
    Run(String),
    Target { section: String, exercise: String },
    Import(String),
}

impl fmt::Display for LookupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LookupError::Run(raw) => write!(f, "run not found: {raw}"),
            LookupError::Target { section, exercise } => {
                write!(f, "no exercise {exercise} in section {section}")
            }
            LookupError::Import(reason) => write!(f, "cannot import programs: {reason}"),
        }
    }
}

impl std::error::Error for LookupError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

fn require_arg(
    args: &mut impl Iterator<Item = String>,
    name: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingArg { name })
}

/// Parse a 1-based position into a 0-based index.
fn parse_position(raw: &str, name: &'static str) -> Result<usize, ArgsError> {
    raw.trim()
        .parse::<usize>()
        .ok()
        .and_then(|n| n.checked_sub(1))
        .ok_or_else(|| ArgsError::InvalidIndex {
            name,
            raw: raw.to_string(),
        })
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  gym [--db <sqlite_url>] <command>");
    eprintln!();
    eprintln!("Commands:");
    eprintln!("  programs                                   list programs");
    eprintln!("  import-program <file.json>                 add or replace programs");
    eprintln!("  start <program-id>                         start a session");
    eprintln!("  runs                                       list active and finished sessions");
    eprintln!("  show <run-id>                              show a session with its sets");
    eprintln!("  toggle <run> <section> <exercise> <set>    mark a set done or undone");
    eprintln!("  weight <run> <section> <exercise> <set> <value>");
    eprintln!("  finish <run-id>");
    eprintln!("  delete-run <run-id>");
    eprintln!("  stats                                      dashboard numbers");
    eprintln!("  history                                    weight progression per exercise");
    eprintln!();
    eprintln!("Sections, exercises and sets are counted from 1; sections and exercises");
    eprintln!("may also be given by id.");
    eprintln!();
    eprintln!("Defaults:");
    eprintln!("  --db sqlite://gym.sqlite3");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  GYM_DB_URL, RUST_LOG");
}

/// A set inside a run, as typed on the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
struct SetRef {
    run: String,
    section: String,
    exercise: String,
    set: usize,
}

#[derive(Debug, Clone, PartialEq)]
enum Command {
    Programs,
    ImportProgram { path: String },
    Start { program: String },
    Runs,
    Show { run: String },
    Toggle(SetRef),
    Weight { target: SetRef, value: String },
    Finish { run: String },
    DeleteRun { run: String },
    Stats,
    History,
}

impl Command {
    fn parse(name: &str, args: &mut impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        let command = match name {
            "programs" => Self::Programs,
            "import-program" => Self::ImportProgram {
                path: require_arg(args, "file.json")?,
            },
            "start" => Self::Start {
                program: require_arg(args, "program-id")?,
            },
            "runs" => Self::Runs,
            "show" => Self::Show {
                run: require_arg(args, "run-id")?,
            },
            "toggle" => Self::Toggle(parse_set_ref(args)?),
            "weight" => Self::Weight {
                target: parse_set_ref(args)?,
                value: require_arg(args, "value")?,
            },
            "finish" => Self::Finish {
                run: require_arg(args, "run-id")?,
            },
            "delete-run" => Self::DeleteRun {
                run: require_arg(args, "run-id")?,
            },
            "stats" => Self::Stats,
            "history" => Self::History,
            other => return Err(ArgsError::UnknownArg(other.to_string())),
        };
        Ok(command)
    }
}

fn parse_set_ref(args: &mut impl Iterator<Item = String>) -> Result<SetRef, ArgsError> {
    let run = require_arg(args, "run")?;
    let section = require_arg(args, "section")?;
    let exercise = require_arg(args, "exercise")?;
    let set = parse_position(&require_arg(args, "set")?, "set")?;
    Ok(SetRef {
        run,
        section,
        exercise,
        set,
    })
}

#[derive(Debug)]
struct Args {
    db_url: String,
    command: Command,
}

impl Args {
    fn parse(args: impl IntoIterator<Item = String>) -> Result<Option<Self>, ArgsError> {
        let mut args = args.into_iter();
        let mut db_url = std::env::var("GYM_DB_URL")
            .ok()
            .map_or_else(|| "sqlite://gym.sqlite3".into(), normalize_sqlite_url);
        let mut command = None;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(&mut args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = normalize_sqlite_url(value);
                }
                "--help" | "-h" => return Ok(None),
                _ if command.is_none() && !arg.starts_with("--") => {
                    command = Some(Command::parse(&arg, &mut args)?);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(command.map(|command| Self { db_url, command }))
    }
}

fn normalize_sqlite_url(raw: String) -> String {
    if raw == "sqlite::memory:" || raw.starts_with("sqlite://") {
        return raw;
    }

    let trimmed = raw.trim().to_string();
    let path_str = trimmed
        .strip_prefix("sqlite:")
        .unwrap_or(trimmed.as_str())
        .to_string();
    let path = std::path::Path::new(&path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| std::path::PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

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

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn,services=info,storage=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Programs from a file holding one program object or an array of them.
fn read_programs(path: &str) -> Result<Vec<Program>, Box<dyn std::error::Error>> {
    let text = std::fs::read_to_string(path)?;
    let value: Value = serde_json::from_str(&text)?;
    let programs = match value {
        Value::Array(items) => items
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<Program>, _>>()?,
        Value::Object(_) => vec![serde_json::from_value(value)?],
        _ => {
            return Err(LookupError::Import("expected a program object or an array".into()).into());
        }
    };
    Ok(programs)
}

fn find_run<'a>(service: &'a WorkoutService, raw: &str) -> Result<&'a RunInstance, LookupError> {
    service
        .run(&RunId::new(raw))
        .ok_or_else(|| LookupError::Run(raw.to_string()))
}

/// Resolve a section and exercise given as 1-based positions or ids.
fn resolve_target(
    run: &RunInstance,
    section: &str,
    exercise: &str,
) -> Result<(SectionId, ExerciseId), LookupError> {
    let missing = || LookupError::Target {
        section: section.to_string(),
        exercise: exercise.to_string(),
    };
    let by_position = |raw: &str| raw.parse::<usize>().ok().and_then(|n| n.checked_sub(1));

    let found_section = by_position(section)
        .and_then(|index| run.sections.get(index))
        .or_else(|| {
            run.sections
                .iter()
                .find(|candidate| candidate.id.as_str() == section)
        })
        .ok_or_else(missing)?;
    let found_exercise = by_position(exercise)
        .and_then(|index| found_section.items.get(index))
        .or_else(|| {
            found_section
                .items
                .iter()
                .find(|candidate| candidate.id.as_str() == exercise)
        })
        .ok_or_else(missing)?;

    Ok((found_section.id.clone(), found_exercise.id.clone()))
}

async fn execute(
    service: &mut WorkoutService,
    command: Command,
) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Command::Programs => print!("{}", render::programs(&service.programs())),
        Command::ImportProgram { path } => {
            for program in read_programs(&path)? {
                let title = program.title.clone();
                let id = service.save_program(program).await?;
                println!("saved {title} ({id})");
            }
        }
        Command::Start { program } => {
            let run = service.start_run(&ProgramId::new(program)).await?;
            println!("started {} ({})", run.title, run.id);
        }
        Command::Runs => {
            print!(
                "{}",
                render::runs(&service.active_runs(), &service.finished_runs())
            );
        }
        Command::Show { run } => print!("{}", render::run(find_run(service, &run)?)),
        Command::Toggle(target) => {
            let run = find_run(service, &target.run)?;
            let run_id = run.id.clone();
            let (section, exercise) = resolve_target(run, &target.section, &target.exercise)?;
            let updated = service
                .toggle_set(&run_id, &section, &exercise, target.set)
                .await?;
            print!("{}", render::run(&updated));
        }
        Command::Weight { target, value } => {
            let run = find_run(service, &target.run)?;
            let run_id = run.id.clone();
            let (section, exercise) = resolve_target(run, &target.section, &target.exercise)?;
            let updated = service
                .set_weight_input(&run_id, &section, &exercise, target.set, &value)
                .await?;
            print!("{}", render::run(&updated));
        }
        Command::Finish { run } => {
            let finished = service.finish_run(&RunId::new(run)).await?;
            print!("{}", render::run(&finished));
        }
        Command::DeleteRun { run } => {
            service.delete_run(&RunId::new(run.as_str())).await?;
            println!("deleted {run}");
        }
        Command::Stats => print!("{}", render::stats(&service.stats())),
        Command::History => {
            print!(
                "{}",
                render::history(&service.weight_history(), &service.top_exercises())
            );
        }
    }
    Ok(())
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let parsed = match Args::parse(std::env::args().skip(1)) {
        Ok(Some(parsed)) => parsed,
        Ok(None) => {
            print_usage();
            return Ok(());
        }
        Err(e) => {
            eprintln!("{e}");
            print_usage();
            return Err(e.into());
        }
    };

    init_tracing();

    // Open + migrate SQLite in the binary glue so core/services stay store-agnostic.
    debug!(db = %parsed.db_url, "opening store");
    prepare_sqlite_file(&parsed.db_url)?;
    let repo = WorkoutRepository::sqlite(&parsed.db_url).await?;
    let mut service = WorkoutService::open(repo, Clock::system()).await;
    if service.is_degraded() {
        eprintln!("warning: storage unavailable, changes will not be saved");
    }

    execute(&mut service, parsed.command).await
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
