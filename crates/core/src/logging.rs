//! Log setup shared by the binaries.

use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// `~/.modulizer/logs`, or `./.modulizer/logs` without a home directory
pub fn log_directory() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".modulizer")
        .join("logs")
}

/// Installs the global subscriber. Events go to a daily file named after
/// `component` and, with `to_stderr`, to the terminal as well. `RUST_LOG`
/// overrides the `info` default.
///
/// Keep the returned guard alive until exit or buffered file output is lost.
pub fn init_logging(component: &str, to_stderr: bool) -> WorkerGuard {
    let directory = log_directory();
    if let Err(e) = std::fs::create_dir_all(&directory) {
        eprintln!("Cannot create log directory {}: {}", directory.display(), e);
    }

    let (file_writer, guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::daily(&directory, component));

    let terminal = to_stderr.then(|| {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
    });

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(
            fmt::layer()
                .with_writer(file_writer)
                .with_ansi(false)
                .with_target(true),
        )
        .with(terminal)
        .init();

    guard
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_directory_is_under_modulizer() {
        let directory = log_directory();
        assert!(directory.ends_with(".modulizer/logs"));
    }
}
