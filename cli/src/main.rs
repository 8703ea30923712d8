//! WinMigrate - Command-line interface for the transfer engine.
//!
//! Transfers a single file, or every file under a directory, with resume,
//! retry and optional digest verification. Progress goes to stderr. Ctrl-C
//! cancels cooperatively; rerunning the same command resumes.

use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Mutex;
use std::thread;
use std::time::{Duration, Instant};

use clap::Parser;
use tracing::{debug, warn};
use winmigrate_engine::{
    copy_file_resumable_with, fs_ops::enumerate_files, fs_ops::FilePair, generate_report, logging,
    scan_installed_programs, transfer_with_permissions, write_restore_script, ChecksumAlgorithm,
    ConfigOverrides, EngineError, PermissionDecision, PermissionPrompt, ProgressCallback,
    TransferConfig, TransferControl,
};

const PROGRESS_THROTTLE: Duration = Duration::from_millis(200);

/// WinMigrate - resumable file transfer
#[derive(Parser, Debug)]
#[command(name = "winmigrate")]
#[command(version)]
#[command(about = "Copy files with resume, retry and integrity verification")]
struct Args {
    /// Source file or directory
    #[arg(long, value_name = "PATH")]
    src: PathBuf,

    /// Destination file or directory
    #[arg(long, value_name = "PATH")]
    dst: PathBuf,

    /// Configuration file (TOML)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Seconds to keep retrying transient failures
    #[arg(long, value_name = "SECS")]
    timeout: Option<u64>,

    /// Bytes per chunk
    #[arg(long, value_name = "BYTES")]
    chunk_size: Option<usize>,

    /// Log level: error, warn, info, debug or trace
    #[arg(long, value_name = "LEVEL")]
    verbosity: Option<String>,

    /// Append logs to this file as well as stderr
    #[arg(long, value_name = "FILE")]
    log_path: Option<PathBuf>,

    /// Verify each file after copy (no permission prompts on this path)
    #[arg(long)]
    verify: bool,

    /// Checksum algorithm for verification: sha256, blake3, md5, crc32
    #[arg(long, value_name = "ALGORITHM", default_value = "sha256", requires = "verify")]
    hash: String,

    /// Write a PowerShell script that copies the transferred files back
    #[arg(long, value_name = "FILE")]
    restore_script: Option<PathBuf>,

    /// Write a markdown list of installed programs into this directory
    #[arg(long, value_name = "DIR")]
    programs_report: Option<PathBuf>,

    /// Print one line per file
    #[arg(long)]
    verbose: bool,
}

impl Args {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            timeout_secs: self.timeout,
            chunk_size: self.chunk_size,
            verbosity: self.verbosity.clone(),
            log_path: self.log_path.clone(),
        }
    }
}

/// CLI implementation of ProgressCallback for displaying transfer progress
struct CliProgress {
    last_update: Mutex<Option<Instant>>,
}

impl CliProgress {
    fn new() -> Self {
        CliProgress {
            last_update: Mutex::new(None),
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
        let mins = secs / 60;
        if mins > 0 {
            format!("{}m {}s", mins, secs % 60)
        } else {
            format!("{}s", secs)
        }
    }

    fn progress_bar(bytes_copied: u64, total_bytes: u64) -> String {
        let percent = if total_bytes == 0 {
            100
        } else {
            (bytes_copied.min(total_bytes) as f64 / total_bytes as f64 * 100.0) as u32
        };
        let filled = (percent / 5) as usize;
        format!(
            "[{}{}] {}%",
            "=".repeat(filled),
            " ".repeat(20 - filled),
            percent
        )
    }
}

impl ProgressCallback for CliProgress {
    fn on_progress(&self, bytes_copied: u64, total_bytes: u64) {
        let Ok(mut last) = self.last_update.lock() else {
            return;
        };
        let throttled = last.is_some_and(|at| at.elapsed() < PROGRESS_THROTTLE);
        if throttled && bytes_copied < total_bytes {
            return;
        }
        *last = Some(Instant::now());

        eprint!(
            "\rProgress: {} | {}/{}",
            Self::progress_bar(bytes_copied, total_bytes),
            Self::format_bytes(bytes_copied),
            Self::format_bytes(total_bytes)
        );
        let _ = io::stderr().flush();
    }

    fn on_retry_wait(&self, seconds_remaining: u64) {
        eprint!("\rRetrying in {}s...{:30}", seconds_remaining, "");
        let _ = io::stderr().flush();
    }
}

/// Asks on the terminal how to handle an access denial.
struct CliPrompt;

impl PermissionPrompt for CliPrompt {
    fn decide(&self, path: &Path, error: &EngineError) -> PermissionDecision {
        eprintln!();
        eprintln!("Access denied: {} ({})", path.display(), error);
        eprint!("Retry as administrator [y], take ownership [t], or abandon [n]? ");
        let _ = io::stderr().flush();

        let mut line = String::new();
        match io::stdin().lock().read_line(&mut line) {
            Ok(_) => parse_decision(&line),
            Err(e) => {
                warn!(error = %e, "could not read answer, abandoning");
                PermissionDecision::Abandon
            }
        }
    }
}

fn parse_decision(answer: &str) -> PermissionDecision {
    match answer.trim().to_lowercase().as_str() {
        "y" | "yes" => PermissionDecision::RetryElevated,
        "t" | "take" => PermissionDecision::TakeOwnership,
        _ => PermissionDecision::Abandon,
    }
}

/// Resolve `--src`/`--dst` into the list of files to transfer.
fn plan_transfers(src: &Path, dst: &Path) -> Result<Vec<FilePair>, String> {
    let metadata = std::fs::metadata(src)
        .map_err(|e| format!("Source does not exist: {} ({})", src.display(), e))?;

    if metadata.is_dir() {
        return enumerate_files(src, dst).map_err(|e| format!("Enumeration failed: {}", e));
    }

    // A file copied onto an existing directory keeps its name.
    let destination = match src.file_name() {
        Some(name) if dst.is_dir() => dst.join(name),
        _ => dst.to_path_buf(),
    };
    Ok(vec![FilePair {
        source: src.to_path_buf(),
        destination,
        size: metadata.len(),
    }])
}

fn load_config(args: &Args) -> Result<TransferConfig, String> {
    let config = TransferConfig::load(args.config.as_deref()).map_err(|e| e.to_string())?;
    Ok(config.apply_overrides(args.overrides()))
}

/// Parse and validate command-line arguments, then run the transfers
fn main() {
    let args = Args::parse();

    let exit_code = match load_config(&args) {
        Ok(config) => {
            if let Err(e) = logging::init_logging(&config.verbosity, config.log_path.as_deref()) {
                eprintln!("Warning: {}", e);
            }
            let control = TransferControl::new();
            install_interrupt_handler(control.clone());
            match run_cli(&args, &config, &control) {
                Ok(()) => 0,
                Err(msg) => {
                    eprintln!("Error: {}", msg);
                    2
                }
            }
        }
        Err(msg) => {
            eprintln!("Error: {}", msg);
            2
        }
    };

    std::process::exit(exit_code);
}

/// Main CLI logic - separated for testability
fn run_cli(args: &Args, config: &TransferConfig, control: &TransferControl) -> Result<(), String> {
    let algorithm = if args.verify {
        Some(ChecksumAlgorithm::from_str(&args.hash)?)
    } else {
        None
    };

    let pairs = plan_transfers(&args.src, &args.dst)?;

    let programs = match &args.programs_report {
        Some(dir) => {
            let programs = scan_installed_programs();
            let path = generate_report(dir, &programs).map_err(|e| e.to_string())?;
            eprintln!("Installed programs report: {}", path.display());
            programs
        }
        None => Vec::new(),
    };

    let options = config.transfer_options();
    let progress = CliProgress::new();
    let started = Instant::now();
    debug!(files = pairs.len(), ?options, "starting transfers");

    let mut done = Vec::new();
    let mut failed = Vec::new();
    let mut bytes = 0u64;
    for (index, pair) in pairs.iter().enumerate() {
        if control.is_canceled() {
            break;
        }
        if args.verbose {
            eprintln!("[{:3}] {}", index, pair.source.display());
        }

        let ok = match algorithm {
            Some(algorithm) => copy_file_resumable_with(
                &pair.source,
                &pair.destination,
                &options,
                control,
                &progress,
                algorithm,
            ),
            None => transfer_with_permissions(
                &pair.source,
                &pair.destination,
                &options,
                control,
                &progress,
                &CliPrompt,
            ),
        };

        if ok {
            bytes += pair.size;
            done.push(pair.clone());
        } else {
            failed.push(&pair.source);
        }
        if args.verbose {
            eprintln!();
            eprintln!("[{:3}] {}", index, if ok { "Done" } else { "Failed" });
        }
    }
    let not_started = pairs.len() - done.len() - failed.len();

    eprintln!();
    eprintln!(
        "Summary: {} done, {} failed, {} not started",
        done.len(),
        failed.len(),
        not_started
    );
    eprintln!("Bytes transferred: {}", CliProgress::format_bytes(bytes));
    eprintln!("Elapsed: {}", CliProgress::format_duration(started.elapsed()));

    if let Some(output) = &args.restore_script {
        let path = write_restore_script(&done, &programs, output).map_err(|e| e.to_string())?;
        eprintln!("Restore script: {}", path.display());
    }

    if !failed.is_empty() {
        eprintln!();
        eprintln!("Failed files:");
        for source in &failed {
            eprintln!("  {}", source.display());
        }
    }

    if control.is_canceled() {
        Err(format!(
            "Interrupted: {} of {} files not transferred; run again to resume",
            failed.len() + not_started,
            pairs.len()
        ))
    } else if !failed.is_empty() {
        Err(format!("{} of {} files failed to transfer", failed.len(), pairs.len()))
    } else {
        Ok(())
    }
}

/// Cancel `control` on Ctrl-C. The copier then stops at the next chunk
/// boundary with the destination flushed, so a rerun resumes it.
fn install_interrupt_handler(control: TransferControl) {
    let spawned = thread::Builder::new()
        .name("ctrl-c".to_string())
        .spawn(move || {
            let runtime = match tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
            {
                Ok(runtime) => runtime,
                Err(e) => {
                    warn!(error = %e, "cannot watch for Ctrl-C");
                    return;
                }
            };
            runtime.block_on(async {
                if tokio::signal::ctrl_c().await.is_ok() {
                    eprintln!();
                    eprintln!("Interrupted, stopping after the current chunk...");
                    control.request_cancel();
                }
            });
        });
    if let Err(e) = spawned {
        warn!(error = %e, "cannot watch for Ctrl-C");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn args(src: &Path, dst: &Path) -> Args {
        Args {
            src: src.to_path_buf(),
            dst: dst.to_path_buf(),
            config: None,
            timeout: None,
            chunk_size: None,
            verbosity: None,
            log_path: None,
            verify: false,
            hash: "sha256".to_string(),
            restore_script: None,
            programs_report: None,
            verbose: false,
        }
    }

    #[test]
    fn test_cli_copies_single_file() {
        let src_dir = TempDir::new().expect("Failed to create temp dir");
        let dst_dir = TempDir::new().expect("Failed to create temp dir");
        let src = src_dir.path().join("test.txt");
        let dst = dst_dir.path().join("copy.txt");
        std::fs::write(&src, "hello").expect("Failed to write file");

        let result = run_cli(&args(&src, &dst), &TransferConfig::default(), &TransferControl::new());
        assert!(result.is_ok(), "CLI should copy a single file");
        assert_eq!(std::fs::read_to_string(&dst).unwrap(), "hello");
    }

    #[test]
    fn test_cli_copies_file_into_existing_directory() {
        let src_dir = TempDir::new().expect("Failed to create temp dir");
        let dst_dir = TempDir::new().expect("Failed to create temp dir");
        let src = src_dir.path().join("test.txt");
        std::fs::write(&src, "hello").expect("Failed to write file");

        run_cli(&args(&src, dst_dir.path()), &TransferConfig::default(), &TransferControl::new()).unwrap();
        assert_eq!(
            std::fs::read_to_string(dst_dir.path().join("test.txt")).unwrap(),
            "hello"
        );
    }

    #[test]
    fn test_cli_copies_directory_tree_with_verification() {
        let src_dir = TempDir::new().expect("Failed to create temp dir");
        let dst_dir = TempDir::new().expect("Failed to create temp dir");
        std::fs::create_dir(src_dir.path().join("nested")).unwrap();
        std::fs::write(src_dir.path().join("a.txt"), "alpha").unwrap();
        std::fs::write(src_dir.path().join("nested").join("b.txt"), "beta").unwrap();

        let mut args = args(src_dir.path(), &dst_dir.path().join("out"));
        args.verify = true;
        args.hash = "blake3".to_string();

        let result = run_cli(&args, &TransferConfig::default(), &TransferControl::new());
        assert!(result.is_ok(), "CLI should succeed with verification enabled");
        let out = dst_dir.path().join("out");
        assert_eq!(std::fs::read_to_string(out.join("a.txt")).unwrap(), "alpha");
        assert_eq!(
            std::fs::read_to_string(out.join("nested").join("b.txt")).unwrap(),
            "beta"
        );
    }

    #[test]
    fn test_cli_reports_verification_mismatch() {
        let src_dir = TempDir::new().expect("Failed to create temp dir");
        let src = src_dir.path().join("data.bin");
        let dst = src_dir.path().join("data.copy");
        std::fs::write(&src, "the real content").unwrap();
        // A foreign prefix; resume trusts its length and appends after it.
        std::fs::write(&dst, "XXX").unwrap();

        let mut args = args(&src, &dst);
        args.verify = true;

        let result = run_cli(&args, &TransferConfig::default(), &TransferControl::new());
        assert!(result.is_err(), "CLI should fail on digest mismatch");
    }

    #[test]
    fn test_cli_rejects_missing_source() {
        let dst_dir = TempDir::new().expect("Failed to create temp dir");
        let result = run_cli(
            &args(Path::new("/nonexistent/path"), dst_dir.path()),
            &TransferConfig::default(),
            &TransferControl::new(),
        );
        assert!(result.is_err(), "CLI should reject missing source");
    }

    #[test]
    fn test_canceled_control_stops_before_later_files() {
        let src_dir = TempDir::new().expect("Failed to create temp dir");
        let dst_dir = TempDir::new().expect("Failed to create temp dir");
        std::fs::write(src_dir.path().join("a.txt"), "alpha").unwrap();
        std::fs::write(src_dir.path().join("b.txt"), "beta").unwrap();
        let out = dst_dir.path().join("out");

        let control = TransferControl::new();
        control.request_cancel();
        let result = run_cli(&args(src_dir.path(), &out), &TransferConfig::default(), &control);

        let err = result.expect_err("an interrupted run must fail");
        assert!(err.contains("2 of 2"), "unexpected message: {}", err);
        assert!(!out.join("a.txt").exists());
        assert!(!out.join("b.txt").exists());
    }

    #[test]
    fn test_restore_script_lists_transferred_files() {
        let src_dir = TempDir::new().expect("Failed to create temp dir");
        let dst_dir = TempDir::new().expect("Failed to create temp dir");
        std::fs::write(src_dir.path().join("a.txt"), "alpha").unwrap();
        let script = dst_dir.path().join("restore").join("restore.ps1");

        let mut args = args(src_dir.path(), &dst_dir.path().join("out"));
        args.restore_script = Some(script.clone());

        run_cli(&args, &TransferConfig::default(), &TransferControl::new()).unwrap();

        let content = std::fs::read_to_string(&script).unwrap();
        assert!(content.starts_with("# WinMigrate Restore Script"));
        assert_eq!(content.matches("Copy-Item").count(), 1);
        assert!(content.contains("a.txt"));
    }

    #[test]
    fn test_programs_report_is_written() {
        let src_dir = TempDir::new().expect("Failed to create temp dir");
        let dst_dir = TempDir::new().expect("Failed to create temp dir");
        let src = src_dir.path().join("a.txt");
        std::fs::write(&src, "alpha").unwrap();
        let reports = dst_dir.path().join("reports");

        let mut args = args(&src, &dst_dir.path().join("a.txt"));
        args.programs_report = Some(reports.clone());

        run_cli(&args, &TransferConfig::default(), &TransferControl::new()).unwrap();

        let report = std::fs::read_to_string(reports.join("installed_programs.md")).unwrap();
        assert!(report.starts_with("# Installed Programs"));
    }

    #[test]
    fn test_cli_rejects_invalid_hash_algorithm() {
        let src_dir = TempDir::new().expect("Failed to create temp dir");
        let dst_dir = TempDir::new().expect("Failed to create temp dir");

        let mut args = args(src_dir.path(), dst_dir.path());
        args.verify = true;
        args.hash = "invalid_algo".to_string();

        let result = run_cli(&args, &TransferConfig::default(), &TransferControl::new());
        assert!(result.is_err(), "CLI should reject invalid hash algorithm");
    }

    #[test]
    fn test_config_file_and_flags_are_layered() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let config_path = dir.path().join("winmigrate.toml");
        std::fs::write(&config_path, "timeout_secs = 30\nchunk_size = 4096\n").unwrap();

        let mut args = args(dir.path(), dir.path());
        args.config = Some(config_path);
        args.chunk_size = Some(8192);

        let config = load_config(&args).unwrap();
        assert_eq!(config.timeout_secs, 30);
        assert_eq!(config.chunk_size, 8192);
    }

    #[test]
    fn test_parse_decision() {
        assert_eq!(parse_decision("y\n"), PermissionDecision::RetryElevated);
        assert_eq!(parse_decision(" T "), PermissionDecision::TakeOwnership);
        assert_eq!(parse_decision("n"), PermissionDecision::Abandon);
        assert_eq!(parse_decision(""), PermissionDecision::Abandon);
    }

    #[test]
    fn test_progress_bar() {
        assert_eq!(CliProgress::progress_bar(0, 0), format!("[{}] 100%", "=".repeat(20)));
        assert_eq!(
            CliProgress::progress_bar(50, 100),
            format!("[{}{}] 50%", "=".repeat(10), " ".repeat(10))
        );
        assert_eq!(CliProgress::format_bytes(1536), "1.50 KB");
    }

    #[test]
    fn test_args_parse() {
        let args = Args::try_parse_from([
            "winmigrate", "--src", "a", "--dst", "b", "--verify", "--hash", "md5",
        ])
        .unwrap();
        assert!(args.verify);
        assert_eq!(args.hash, "md5");

        // --hash without --verify is rejected.
        assert!(Args::try_parse_from(["winmigrate", "--src", "a", "--dst", "b", "--hash", "md5"])
            .is_err());
    }
}
