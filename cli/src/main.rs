//! FileRipper - Command-line interface for the parallel transfer engine.
//!
//! Provides argument parsing, session setup and result reporting around
//! the engine crate. Human-readable output goes to stderr; `--json` emits
//! a machine-readable report on stdout.

use clap::{Parser, Subcommand};
use engine::{
    Engine, JobState, Operation, RemoteFs, SftpSession, TransferMode, TransferResult,
};
use serde::Serialize;
use std::time::Duration;

/// FileRipper - Parallel SFTP file transfer with integrity checking
#[derive(Parser, Debug)]
#[command(name = "fileripper")]
#[command(version = "0.1.0")]
#[command(about = "Transfer files over SFTP and verify them after download")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run queued uploads/downloads against a remote host
    Transfer {
        /// Remote host name or address
        host: String,

        /// SSH port
        #[arg(long, value_name = "PORT", default_value_t = 22)]
        port: u16,

        /// User to authenticate as
        #[arg(long, value_name = "USER")]
        user: String,

        /// Password for authentication
        #[arg(long, value_name = "PASSWORD")]
        password: String,

        /// Transfer mode: boost (64 workers) or conservative (2 workers)
        #[arg(long, value_name = "MODE", default_value = "boost")]
        mode: String,

        /// Upload job as LOCAL:REMOTE (repeatable)
        #[arg(long = "up", value_name = "LOCAL:REMOTE")]
        uploads: Vec<String>,

        /// Download job as REMOTE:LOCAL (repeatable)
        #[arg(long = "down", value_name = "REMOTE:LOCAL")]
        downloads: Vec<String>,

        /// Emit a JSON report on stdout
        #[arg(long)]
        json: bool,
    },

    /// List a remote directory
    List {
        /// Remote host name or address
        host: String,

        /// SSH port
        #[arg(long, value_name = "PORT", default_value_t = 22)]
        port: u16,

        /// User to authenticate as
        #[arg(long, value_name = "USER")]
        user: String,

        /// Password for authentication
        #[arg(long, value_name = "PASSWORD")]
        password: String,

        /// Directory to list (defaults to the session working directory)
        path: Option<String>,

        /// Emit JSON on stdout
        #[arg(long)]
        json: bool,
    },
}

/// One job's outcome, flattened for the JSON report.
#[derive(Debug, Serialize)]
struct JobReport {
    id: String,
    operation: Operation,
    local_path: String,
    remote_path: String,
    state: JobState,
    bytes_transferred: u64,
    elapsed_ms: u128,
    checksum: Option<String>,
    error_kind: Option<&'static str>,
    error: Option<String>,
}

impl From<&TransferResult> for JobReport {
    fn from(result: &TransferResult) -> Self {
        JobReport {
            id: result.job_id.to_string(),
            operation: result.operation,
            local_path: result.local_path.display().to_string(),
            remote_path: result.remote_path.clone(),
            state: result.state,
            bytes_transferred: result.bytes_transferred,
            elapsed_ms: result.elapsed.as_millis(),
            checksum: result.checksum.as_ref().map(|c| c.hex().to_string()),
            error_kind: result.error.as_ref().map(|e| e.kind()),
            error: result.error.as_ref().map(|e| e.to_string()),
        }
    }
}

fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut size = bytes as f64;
    let mut unit_idx = 0;

    while size >= 1024.0 && unit_idx < UNITS.len() - 1 {
        size /= 1024.0;
        unit_idx += 1;
    }

    format!("{:.2} {}", size, UNITS[unit_idx])
}

fn format_duration(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    let hours = secs / 3600;
    let mins = (secs % 3600) / 60;
    let secs = secs % 60;

    if hours > 0 {
        format!("{}h {}m {}s", hours, mins, secs)
    } else if mins > 0 {
        format!("{}m {}s", mins, secs)
    } else {
        format!("{}.{:03}s", secs, elapsed.subsec_millis())
    }
}

/// Split a `A:B` job spec on the first colon.
fn parse_job_spec(spec: &str) -> Result<(String, String), String> {
    match spec.split_once(':') {
        Some((first, second)) if !first.is_empty() && !second.is_empty() => {
            Ok((first.to_string(), second.to_string()))
        }
        _ => Err(format!(
            "Invalid job spec '{}'. Expected two non-empty paths separated by ':'",
            spec
        )),
    }
}

fn parse_mode(s: &str) -> Result<TransferMode, String> {
    TransferMode::from_str(s).ok_or_else(|| {
        format!(
            "Invalid mode '{}'. Must be 'boost' or 'conservative'",
            s
        )
    })
}

fn connect(host: &str, port: u16, user: &str, password: &str) -> Result<SftpSession, String> {
    let session = SftpSession::connect(host, port, user, password)
        .map_err(|e| format!("Connection failed: {}", e))?;
    session
        .open_subsystem()
        .map_err(|e| format!("Could not open SFTP subsystem: {}", e))?;
    Ok(session)
}

fn run_transfer(
    host: &str,
    port: u16,
    user: &str,
    password: &str,
    mode: &str,
    uploads: &[String],
    downloads: &[String],
    json: bool,
) -> Result<(), String> {
    let mode = parse_mode(mode)?;

    if uploads.is_empty() && downloads.is_empty() {
        return Err("No jobs given. Use --up LOCAL:REMOTE and/or --down REMOTE:LOCAL".to_string());
    }

    let engine = Engine::new(mode);
    for spec in uploads {
        let (local, remote) = parse_job_spec(spec)?;
        engine.add(local, remote, Operation::Upload);
    }
    for spec in downloads {
        let (remote, local) = parse_job_spec(spec)?;
        engine.add(local, remote, Operation::Download);
    }

    eprintln!(
        "Transferring {} job(s) to {}:{} ({} mode, {} workers)",
        engine.count(),
        host,
        port,
        mode,
        engine.worker_count()
    );

    let session = connect(host, port, user, password)?;
    let outcome = engine.start_transfer(&session);
    session.close();

    let results = outcome.map_err(|e| format!("Transfer run failed: {}", e))?;

    let mut failed = 0;
    for result in &results {
        if result.is_verified() {
            let checksum = result
                .checksum
                .as_ref()
                .map(|c| format!(" [crc32 {}]", c))
                .unwrap_or_default();
            eprintln!(
                "  ok   {} {} ({} in {}){}",
                result.operation,
                result.remote_path,
                format_bytes(result.bytes_transferred),
                format_duration(result.elapsed),
                checksum
            );
        } else {
            failed += 1;
            let reason = result
                .error
                .as_ref()
                .map(|e| e.to_string())
                .unwrap_or_else(|| "unknown error".to_string());
            eprintln!(
                "  FAIL {} {}: {}",
                result.operation, result.remote_path, reason
            );
        }
    }

    let bytes: u64 = results.iter().map(|r| r.bytes_transferred).sum();
    eprintln!(
        "Summary: {} verified, {} failed, {} moved",
        results.len() - failed,
        failed,
        format_bytes(bytes)
    );

    if json {
        let reports: Vec<JobReport> = results.iter().map(JobReport::from).collect();
        let rendered = serde_json::to_string_pretty(&reports)
            .map_err(|e| format!("Failed to render report: {}", e))?;
        println!("{}", rendered);
    }

    if failed > 0 {
        Err(format!("{} job(s) failed", failed))
    } else {
        Ok(())
    }
}

fn run_list(
    host: &str,
    port: u16,
    user: &str,
    password: &str,
    path: Option<&str>,
    json: bool,
) -> Result<(), String> {
    let session = connect(host, port, user, password)?;

    let listing = (|| {
        let dir = match path {
            Some(p) => p.to_string(),
            None => session
                .getwd()
                .map_err(|e| format!("Could not resolve working directory: {}", e))?,
        };
        let entries = session
            .read_dir(&dir)
            .map_err(|e| format!("Could not list {}: {}", dir, e))?;
        Ok::<_, String>((dir, entries))
    })();
    session.close();

    let (dir, entries) = listing?;

    if json {
        let rendered = serde_json::to_string_pretty(&entries)
            .map_err(|e| format!("Failed to render listing: {}", e))?;
        println!("{}", rendered);
        return Ok(());
    }

    eprintln!("{} ({} entries)", dir, entries.len());
    for entry in &entries {
        if entry.is_dir {
            println!("{:>10}  {}/", "-", entry.name);
        } else {
            println!("{:>10}  {}", format_bytes(entry.size), entry.name);
        }
    }
    Ok(())
}

fn run_cli(args: &Args) -> Result<(), String> {
    match &args.command {
        Command::Transfer {
            host,
            port,
            user,
            password,
            mode,
            uploads,
            downloads,
            json,
        } => run_transfer(host, *port, user, password, mode, uploads, downloads, *json),
        Command::List {
            host,
            port,
            user,
            password,
            path,
            json,
        } => run_list(host, *port, user, password, path.as_deref(), *json),
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    tracing::debug!(?args, "parsed arguments");

    let exit_code = match run_cli(&args) {
        Ok(()) => 0,
        Err(msg) => {
            eprintln!("Error: {}", msg);
            2
        }
    };

    std::process::exit(exit_code);
}
