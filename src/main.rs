#![cfg_attr(not(windows), allow(dead_code))]

mod acl;
mod classify;
mod config;
mod errors;
mod identity;
mod progress;
mod protection;
mod volumes;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use once_cell::sync::OnceCell;
use serde::Serialize;

use classify::VolumeClassification;
use volumes::VolumeInfo;

/// Toggle write access on NTFS volumes by rewriting their root access rules.
#[derive(Parser, Debug)]
#[command(name = "writeguard", version, about)]
struct Cli {
    /// Directory for the log file (also: WRITEGUARD_LOG_DIR)
    #[arg(long, value_name = "DIR", global = true)]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show every volume with its protection state
    Status {
        /// Emit machine-readable JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Make the listed volumes read-only for standard users
    Protect {
        /// Volume roots such as D:\ (or use --all)
        #[arg(value_name = "ROOT", required_unless_present = "all")]
        roots: Vec<PathBuf>,
        /// Target every selectable volume
        #[arg(long, conflicts_with = "roots")]
        all: bool,
    },
    /// Restore standard write access on the listed volumes
    Unprotect {
        /// Volume roots such as D:\ (or use --all)
        #[arg(value_name = "ROOT", required_unless_present = "all")]
        roots: Vec<PathBuf>,
        /// Target every selectable volume
        #[arg(long, conflicts_with = "roots")]
        all: bool,
    },
    /// Take ownership and restore administrator control over one volume
    Manage {
        /// Volume root such as D:\
        #[arg(value_name = "ROOT")]
        root: PathBuf,
    },
}

fn init_logging(log_dir: &Path) {
    static GUARD: OnceCell<tracing_appender::non_blocking::WorkerGuard> = OnceCell::new();
    if let Err(e) = std::fs::create_dir_all(log_dir) {
        eprintln!("Failed to create log dir {:?}: {}", log_dir, e);
        return;
    }
    let file_appender = tracing_appender::rolling::never(log_dir, "writeguard.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    let _ = GUARD.set(guard);
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("info".parse().unwrap()),
        )
        .with_ansi(false)
        .with_writer(non_blocking);
    if let Err(e) = subscriber.try_init() {
        eprintln!("Failed to init tracing subscriber: {e}");
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let config = config::load();
    let log_dir = config::resolve_log_dir(cli.log_dir.as_deref(), &config);
    init_logging(&log_dir);
    tracing::debug!(log_dir = %log_dir.display(), "writeguard starting");

    #[cfg(windows)]
    {
        return dispatch(cli.command, &config);
    }

    #[cfg(not(windows))]
    {
        eprintln!("writeguard manages Windows volume access rules and cannot run on this platform");
        ExitCode::FAILURE
    }
}

#[cfg(windows)]
fn dispatch(command: Command, config: &config::AppConfig) -> ExitCode {
    use protection::BatchOperation;

    match command {
        Command::Status { json } => run_status(config, json),
        Command::Protect { roots, all } => run_batch_command(BatchOperation::Protect, roots, all),
        Command::Unprotect { roots, all } => {
            run_batch_command(BatchOperation::Unprotect, roots, all)
        }
        Command::Manage { root } => run_manage(&root),
    }
}

/// Progress lines go to the terminal and are mirrored into the log file.
#[cfg(windows)]
struct TerminalSink;

#[cfg(windows)]
impl progress::ProgressSink for TerminalSink {
    fn report(&self, message: &str) {
        println!("{message}");
        tracing::info!("{message}");
    }
}

#[cfg(windows)]
fn run_status(config: &config::AppConfig, json: bool) -> ExitCode {
    let backend = acl::WindowsBackend;
    let mut reports = Vec::new();
    for volume in volumes::list() {
        if volume.kind == volumes::VolumeKind::Removable && !config.show_removable {
            continue;
        }
        let classification =
            classify::classify(&backend, Path::new(&volume.root), volume.is_fixed_ntfs());
        reports.push(VolumeReport {
            volume,
            classification,
        });
    }

    if json {
        match serde_json::to_string_pretty(&reports) {
            Ok(payload) => println!("{payload}"),
            Err(error) => {
                eprintln!("Could not serialize the volume report: {error}");
                return ExitCode::FAILURE;
            }
        }
        return ExitCode::SUCCESS;
    }

    if reports.is_empty() {
        println!("No volumes to show");
        return ExitCode::SUCCESS;
    }
    println!(
        "{:<7} {:<18} {:<8} {:<10} {:>10}  {}",
        "ROOT", "LABEL", "FS", "KIND", "SIZE", "STATE"
    );
    for report in &reports {
        println!(
            "{:<7} {:<18} {:<8} {:<10} {:>10}  {}",
            report.volume.root,
            report.volume.label,
            report.volume.filesystem,
            report.volume.kind.display_name(),
            format_size(report.volume.total_bytes),
            report.classification.label.display_name(),
        );
    }
    ExitCode::SUCCESS
}

#[cfg(windows)]
fn run_batch_command(
    operation: protection::BatchOperation,
    roots: Vec<PathBuf>,
    all: bool,
) -> ExitCode {
    let targets: Vec<PathBuf> = if all {
        selectable_roots()
    } else {
        roots
            .iter()
            .map(|root| normalize_root(&root.to_string_lossy()))
            .collect()
    };
    if targets.is_empty() {
        println!("No volumes selected; nothing to do");
        return ExitCode::SUCCESS;
    }

    let cancel = progress::CancelFlag::new();
    install_cancel_handler(&cancel);

    let worker_cancel = cancel.clone();
    let worker = std::thread::spawn(move || {
        let backend = acl::WindowsBackend;
        let sink = TerminalSink;
        protection::run_batch(&backend, operation, &targets, &sink, &worker_cancel)
    });
    let outcome = match worker.join() {
        Ok(outcome) => outcome,
        Err(_) => {
            eprintln!("Worker thread terminated unexpectedly");
            return ExitCode::FAILURE;
        }
    };

    if outcome.cancelled() {
        println!(
            "Cancelled after {} of {} volumes",
            outcome.attempted, outcome.total
        );
    }
    println!(
        "{} of {} attempted volumes succeeded",
        outcome.succeeded, outcome.attempted
    );
    tracing::info!(
        total = outcome.total,
        attempted = outcome.attempted,
        succeeded = outcome.succeeded,
        "batch finished"
    );
    if outcome.all_attempted_succeeded() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

#[cfg(windows)]
fn run_manage(root: &Path) -> ExitCode {
    let backend = acl::WindowsBackend;
    let sink = TerminalSink;
    let target = normalize_root(&root.to_string_lossy());
    if protection::make_manageable(&backend, &target, &sink) {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

/// Fixed NTFS volumes that are not the system drive; what `--all` targets.
#[cfg(windows)]
fn selectable_roots() -> Vec<PathBuf> {
    volumes::list()
        .into_iter()
        .filter(|volume| {
            volume.is_fixed_ntfs() && !classify::is_system_root(Path::new(&volume.root))
        })
        .map(|volume| PathBuf::from(volume.root))
        .collect()
}

#[cfg(windows)]
fn install_cancel_handler(cancel: &progress::CancelFlag) {
    use windows_sys::Win32::Foundation::BOOL;
    use windows_sys::Win32::System::Console::{SetConsoleCtrlHandler, CTRL_C_EVENT};

    static ACTIVE: OnceCell<progress::CancelFlag> = OnceCell::new();

    unsafe extern "system" fn on_console_event(event: u32) -> BOOL {
        if event == CTRL_C_EVENT {
            if let Some(flag) = ACTIVE.get() {
                flag.cancel();
            }
            return 1;
        }
        0
    }

    if ACTIVE.set(cancel.clone()).is_err() {
        return;
    }
    let ok = unsafe { SetConsoleCtrlHandler(Some(on_console_event), 1) };
    if ok == 0 {
        tracing::warn!("could not install the console control handler");
    }
}

#[derive(Debug, Serialize)]
struct VolumeReport {
    volume: VolumeInfo,
    classification: VolumeClassification,
}

/// Accepts `d:`, `D:/` and bare `D:`; drive roots come out as `D:\`.
fn normalize_root(raw: &str) -> PathBuf {
    let cleaned = raw.trim().replace('/', "\\");
    let stem = cleaned.trim_end_matches('\\');
    let bytes = stem.as_bytes();
    if bytes.len() == 2 && bytes[1] == b':' && bytes[0].is_ascii_alphabetic() {
        let mut root = stem.to_ascii_uppercase();
        root.push('\\');
        return PathBuf::from(root);
    }
    PathBuf::from(cleaned)
}

fn format_size(bytes: u64) -> String {
    if bytes == 0 {
        return "-".to_string();
    }
    const GIB: f64 = (1u64 << 30) as f64;
    format!("{:.1} GiB", bytes as f64 / GIB)
}
