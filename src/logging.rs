use std::fs::{self, OpenOptions};
use std::path::Path;
use std::sync::Mutex;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Environment variable holding the log filter, e.g. `CERTPREP_LOG=certprep=debug`
pub const LOG_ENV: &str = "CERTPREP_LOG";

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| format!("{}=info", env!("CARGO_CRATE_NAME")).into())
}

/// Installs a global subscriber appending to `path`. Stdout belongs to the
/// terminal UI, so nothing is written there.
pub fn init_file_logging(path: &Path) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new().create(true).append(true).open(path)?;

    tracing_subscriber::registry()
        .with(env_filter())
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_target(false)
                .with_writer(Mutex::new(file)),
        )
        .try_init()
        .map_err(std::io::Error::other)
}

/// Plain stderr logging for non-interactive commands such as `--list`
pub fn init_stderr_logging() {
    let _ = tracing_subscriber::registry()
        .with(env_filter())
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_file_logging_creates_log_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("logs").join("certprep.log");
        // another test may already own the global subscriber
        let _ = init_file_logging(&path);
        assert!(path.exists());
    }
}
