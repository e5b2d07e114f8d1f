//! Logging setup: stdout plus `<log_folder>/txgen.log`.
//!
//! Level comes from `RUST_LOG`, defaulting to `info`.

use anyhow::{Context, Result};
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Log file name inside the log folder.
pub const LOG_FILE_NAME: &str = "txgen.log";

/// Create `folder` if needed and open the log file for appending.
pub fn open_log_file(folder: &Path) -> Result<(PathBuf, File)> {
    fs::create_dir_all(folder)
        .with_context(|| format!("Failed to create log folder {}", folder.display()))?;
    let path = folder.join(LOG_FILE_NAME);
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("Failed to open log file {}", path.display()))?;
    Ok((path, file))
}

/// Install the global subscriber. Returns the log file path.
pub fn init_logging(folder: &Path) -> Result<PathBuf> {
    let (path, file) = open_log_file(folder)?;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true))
        .with(
            fmt::layer()
                .with_ansi(false)
                .with_target(true)
                .with_thread_ids(true)
                .with_writer(Arc::new(file)),
        )
        .try_init()
        .context("Failed to install tracing subscriber")?;

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_open_log_file_creates_folder() {
        let dir = tempfile::tempdir().unwrap();
        let folder = dir.path().join("latest");

        let (path, mut file) = open_log_file(&folder).unwrap();
        writeln!(file, "hello").unwrap();

        assert_eq!(path, folder.join(LOG_FILE_NAME));
        assert_eq!(fs::read_to_string(&path).unwrap(), "hello\n");
    }

    #[test]
    fn test_open_log_file_appends() {
        let dir = tempfile::tempdir().unwrap();
        {
            let (_, mut file) = open_log_file(dir.path()).unwrap();
            writeln!(file, "first").unwrap();
        }
        let (path, mut file) = open_log_file(dir.path()).unwrap();
        writeln!(file, "second").unwrap();
        assert_eq!(fs::read_to_string(path).unwrap(), "first\nsecond\n");
    }
}
