//! File logging. The terminal belongs to the UI, so nothing is written to stdout.

use std::fs::File;
use std::io;
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install the global subscriber. `RUST_LOG` wins over the configured level.
///
/// Events are dropped when there is no log path or the file cannot be
/// opened. The open error is returned after the fallback is installed.
pub fn init_tracing(log_level: &str, log_path: Option<&Path>) -> io::Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let (writer, opened) = match log_path.map(open_log_file) {
        Some(Ok(file)) => (BoxMakeWriter::new(Mutex::new(file)), Ok(())),
        Some(Err(e)) => (BoxMakeWriter::new(io::sink), Err(e)),
        None => (BoxMakeWriter::new(io::sink), Ok(())),
    };

    // Fails only when a subscriber is already installed.
    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_writer(writer).with_ansi(false).with_target(true))
        .try_init();

    opened
}

fn open_log_file(path: &Path) -> io::Result<File> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::OpenOptions::new().create(true).append(true).open(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_log_file_creates_parent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs").join("game.log");
        open_log_file(&path).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_unwritable_log_path_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, "").unwrap();
        let path = blocker.join("game.log");

        assert!(open_log_file(&path).is_err());
        // Still installs a subscriber and reports the failure instead of panicking.
        assert!(init_tracing("debug", Some(&path)).is_err());
        tracing::info!("dropped");
    }
}
