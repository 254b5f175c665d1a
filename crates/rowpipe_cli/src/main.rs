//! Command-line driver for `rowpipe_core`.
//!
//! # Responsibility
//! - Resolve configuration from `--config` and flag overrides.
//! - Run one pipeline operation and print results as JSON lines.

use clap::{Parser, Subcommand};
use rowpipe_core::{
    default_log_level, init_logging, Average, LogConfig, PipelineConfig, RowpipeConfig,
    UserPipeline,
};
use serde_json::json;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(
    name = "rowpipe",
    version = rowpipe_core::core_version(),
    about = "Load and stream user records in SQLite"
)]
struct Args {
    /// Path to TOML configuration file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// SQLite database file. Overrides `pipeline.database` from the config.
    #[arg(long)]
    db: Option<PathBuf>,

    /// Absolute directory for rolling log files. Logging is off when unset.
    #[arg(long)]
    log_dir: Option<PathBuf>,

    /// Log level (trace|debug|info|warn|error).
    #[arg(long)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create database, table and index if absent.
    Bootstrap,
    /// Load a CSV file with `name,email,age` (and optional `user_id`) columns.
    Load { csv: PathBuf },
    /// Stream all rows.
    Rows {
        /// Stop after this many rows.
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Stream rows in fixed-size batches.
    Batches {
        #[arg(long, allow_negative_numbers = true)]
        size: i64,
    },
    /// Print users older than `min-age`, reading in batches.
    Process {
        #[arg(long, allow_negative_numbers = true)]
        size: i64,
        #[arg(long, default_value_t = 25)]
        min_age: u32,
    },
    /// Print the average age.
    AverageAge,
}

fn main() -> ExitCode {
    let args = Args::parse();
    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("rowpipe: {message}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<(), String> {
    let (pipeline_config, log_config) = resolve_config(&args)?;
    if let Some(log_config) = log_config {
        init_logging(&log_config)?;
    }

    let pipeline = UserPipeline::new(pipeline_config).map_err(|err| err.to_string())?;
    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    execute(&pipeline, args.command, &mut out)?;
    out.flush().map_err(|err| err.to_string())
}

fn resolve_config(args: &Args) -> Result<(PipelineConfig, Option<LogConfig>), String> {
    let file = match args.config.as_ref() {
        Some(path) => Some(RowpipeConfig::load(path).map_err(|err| err.to_string())?),
        None => None,
    };

    let pipeline = match (args.db.as_ref(), file.as_ref()) {
        (Some(db), Some(file)) => PipelineConfig {
            database: db.clone(),
            ..file.pipeline.clone()
        },
        (Some(db), None) => PipelineConfig::new(db.clone()),
        (None, Some(file)) => file.pipeline.clone(),
        (None, None) => return Err("either --db or --config is required".to_string()),
    };

    let mut logging = file.and_then(|file| file.logging);
    if let Some(dir) = args.log_dir.as_ref() {
        let level = logging
            .as_ref()
            .map_or_else(|| default_log_level().to_string(), |config| config.level.clone());
        logging = Some(LogConfig::new(level, dir.clone()));
    }
    if let (Some(level), Some(config)) = (args.log_level.as_ref(), logging.as_mut()) {
        config.level = level.clone();
    }

    Ok((pipeline, logging))
}

fn execute(pipeline: &UserPipeline, command: Command, out: &mut impl Write) -> Result<(), String> {
    match command {
        Command::Bootstrap => {
            let outcome = pipeline.bootstrap().map_err(|err| err.to_string())?;
            emit(out, &json!({ "bootstrap": format!("{outcome:?}") }))
        }
        Command::Load { csv } => {
            let report = pipeline.load_csv_file(&csv).map_err(|err| err.to_string())?;
            emit(out, &report)
        }
        Command::Rows { limit } => pipeline
            .stream_rows(|rows| -> Result<(), String> {
                for user in rows.take(limit.unwrap_or(usize::MAX)) {
                    emit(out, &user.map_err(|err| err.to_string())?)?;
                }
                Ok(())
            })
            .map_err(|err| err.to_string())?,
        Command::Batches { size } => {
            let batches = pipeline.stream_batches(size).map_err(|err| err.to_string())?;
            for (index, batch) in batches.enumerate() {
                let batch = batch.map_err(|err| err.to_string())?;
                emit(out, &json!({ "batch": index, "rows": batch }))?;
            }
            Ok(())
        }
        Command::Process { size, min_age } => {
            let users = pipeline
                .process_batches(size, min_age)
                .map_err(|err| err.to_string())?;
            for user in users {
                emit(out, &user.map_err(|err| err.to_string())?)?;
            }
            Ok(())
        }
        Command::AverageAge => match pipeline.average_age().map_err(|err| err.to_string())? {
            Average::Value(value) => emit(out, &json!({ "average_age": value })),
            Average::NoData => emit(
                out,
                &json!({ "average_age": null, "message": "no users found" }),
            ),
        },
    }
}

fn emit(out: &mut impl Write, value: &impl serde::Serialize) -> Result<(), String> {
    serde_json::to_writer(&mut *out, value).map_err(|err| err.to_string())?;
    writeln!(out).map_err(|err| err.to_string())
}

#[cfg(test)]
mod tests {
    use super::{execute, resolve_config, Args, Command};
    use clap::Parser;
    use rowpipe_core::{PipelineConfig, UserPipeline};
    use std::path::PathBuf;

    #[test]
    fn db_flag_is_enough() {
        let args = Args::parse_from(["rowpipe", "--db", "users.sqlite3", "average-age"]);
        let (pipeline, logging) = resolve_config(&args).unwrap();
        assert_eq!(pipeline.database, PathBuf::from("users.sqlite3"));
        assert!(logging.is_none());
    }

    #[test]
    fn missing_database_is_an_error() {
        let args = Args::parse_from(["rowpipe", "bootstrap"]);
        assert!(resolve_config(&args).is_err());
    }

    #[test]
    fn log_dir_flag_enables_logging() {
        let args = Args::parse_from([
            "rowpipe",
            "--db",
            "users.sqlite3",
            "--log-dir",
            "/tmp/rowpipe-logs",
            "--log-level",
            "warn",
            "batches",
            "--size",
            "10",
        ]);
        let (_, logging) = resolve_config(&args).unwrap();
        let logging = logging.unwrap();
        assert_eq!(logging.level, "warn");
        assert_eq!(logging.dir, PathBuf::from("/tmp/rowpipe-logs"));
    }

    #[test]
    fn execute_bootstraps_loads_and_averages() {
        let dir = tempfile::tempdir().unwrap();
        let csv = dir.path().join("users.csv");
        std::fs::write(&csv, "name,email,age\nAda,ada@x.io,20\nBob,bob@x.io,30\n").unwrap();
        let config = PipelineConfig::new(dir.path().join("users.db"));
        let pipeline = UserPipeline::new(config).unwrap();

        let mut out = Vec::new();
        execute(&pipeline, Command::Bootstrap, &mut out).unwrap();
        execute(&pipeline, Command::Load { csv }, &mut out).unwrap();
        execute(&pipeline, Command::AverageAge, &mut out).unwrap();

        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[1].contains("\"inserted\":2"));
        assert!(lines[2].contains("\"average_age\":25.0"));
    }

    #[test]
    fn rows_limit_prints_at_most_limit_records() {
        let dir = tempfile::tempdir().unwrap();
        let csv = dir.path().join("users.csv");
        std::fs::write(
            &csv,
            "name,email,age\nAda,a@x.io,1\nBob,b@x.io,2\nEve,e@x.io,3\n",
        )
        .unwrap();
        let config = PipelineConfig::new(dir.path().join("users.db"));
        let pipeline = UserPipeline::new(config).unwrap();
        execute(&pipeline, Command::Bootstrap, &mut Vec::new()).unwrap();
        execute(&pipeline, Command::Load { csv }, &mut Vec::new()).unwrap();

        let mut out = Vec::new();
        execute(&pipeline, Command::Rows { limit: Some(2) }, &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap().lines().count(), 2);

        let mut out = Vec::new();
        execute(&pipeline, Command::Rows { limit: Some(0) }, &mut out).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn version_flag_reports_core_version() {
        let err = Args::try_parse_from(["rowpipe", "--version"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayVersion);
        assert!(err.to_string().contains(rowpipe_core::core_version()));
    }
}
