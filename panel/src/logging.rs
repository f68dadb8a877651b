//! Logging set-up for the panel binaries

use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Days of rolled log files kept in the log directory
pub const KEEP_LOG_DAYS: i64 = 7;

/// Install the global subscriber.
///
/// `RUST_LOG` overrides `level`. With a log directory, output also goes to a
/// daily rolling `<name>.log` file; the returned guard must live as long as
/// the process or buffered lines are lost.
pub fn init(name: &str, level: &str, log_dir: Option<&Path>) -> Option<WorkerGuard> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    if let Some(log_dir) = log_dir {
        if let Err(e) = std::fs::create_dir_all(log_dir) {
            eprintln!("Failed to create log directory {}: {}", log_dir.display(), e);
            return init(name, level, None);
        }

        let file_name = format!("{}.log", name);
        let file_appender = tracing_appender::rolling::daily(log_dir, &file_name);
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        let console_layer = fmt::layer().with_target(false).with_ansi(true);
        let file_layer = fmt::layer()
            .with_target(true)
            .with_ansi(false)
            .with_writer(non_blocking);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(console_layer)
            .with(file_layer)
            .init();

        tracing::info!("{} logging to {}", name, log_dir.display());
        cleanup_old_logs(log_dir, &file_name, KEEP_LOG_DAYS);
        Some(guard)
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .init();
        None
    }
}

/// Whether a rolled file `<file_name>.<YYYY-MM-DD>` is older than `cutoff`
fn is_expired(entry: &str, file_name: &str, cutoff: chrono::NaiveDate) -> bool {
    entry
        .strip_prefix(file_name)
        .and_then(|rest| rest.strip_prefix('.'))
        .and_then(|date| chrono::NaiveDate::parse_from_str(date, "%Y-%m-%d").ok())
        .map(|date| date < cutoff)
        .unwrap_or(false)
}

fn cleanup_old_logs(log_dir: &Path, file_name: &str, keep_days: i64) {
    let cutoff = (chrono::Local::now() - chrono::Duration::days(keep_days)).date_naive();

    let entries = match std::fs::read_dir(log_dir) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::debug!("Cannot read log directory for cleanup: {}", e);
            return;
        }
    };

    for entry in entries.filter_map(|e| e.ok()) {
        let path = entry.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if is_expired(name, file_name, cutoff) {
            match std::fs::remove_file(&path) {
                Ok(()) => tracing::debug!("Removed old log file {}", path.display()),
                Err(e) => tracing::debug!("Failed to remove {}: {}", path.display(), e),
            }
        }
    }
}
