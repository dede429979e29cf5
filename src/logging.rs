//! Logging setup
//!
//! Console output goes to stderr so stdout stays free for the run summary.
//! Human-readable by default, JSON on request, with an optional JSON log
//! file that is appended to across runs.

use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::Span;
use tracing_subscriber::{
    fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry,
};
use uuid::Uuid;

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Logging options collected from settings and CLI flags
#[derive(Debug, Clone)]
pub struct LogOptions {
    /// Default filter when `RUST_LOG` is unset
    pub level: String,
    /// Emit console logs as JSON
    pub json: bool,
    /// Also append JSON logs to this file
    pub file: Option<PathBuf>,
}

impl Default for LogOptions {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            file: None,
        }
    }
}

/// Install the global tracing subscriber
pub fn init_tracing(options: &LogOptions) -> anyhow::Result<()> {
    let console = if options.json {
        fmt::layer()
            .json()
            .with_writer(io::stderr)
            .with_filter(build_filter(&options.level))
            .boxed()
    } else {
        fmt::layer()
            .with_target(false)
            .with_writer(io::stderr)
            .with_filter(build_filter(&options.level))
            .boxed()
    };

    let mut layers: Vec<BoxedLayer> = vec![console];

    if let Some(path) = &options.file {
        let file = open_log_file(path)?;
        layers.push(
            fmt::layer()
                .json()
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .with_filter(build_filter(&options.level))
                .boxed(),
        );
        eprintln!("Logging to file: {}", path.display());
    }

    tracing_subscriber::registry().with(layers).try_init()?;
    Ok(())
}

/// `RUST_LOG` wins over the configured level
fn build_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
}

/// Open `path` for appending, creating it and its parent directory
fn open_log_file(path: &Path) -> io::Result<File> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    OpenOptions::new().create(true).append(true).open(path)
}

/// Root span for one tool invocation, tagged with a fresh run id
pub fn run_span(command: &str) -> Span {
    let run_id = Uuid::new_v4();
    tracing::info_span!("run", command, run_id = %run_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn test_open_log_file_creates_parent_and_appends() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("logs").join("migrate.log");

        let mut first = open_log_file(&path).unwrap();
        writeln!(first, "one").unwrap();
        drop(first);

        let mut second = open_log_file(&path).unwrap();
        writeln!(second, "two").unwrap();
        drop(second);

        assert_eq!(fs::read_to_string(&path).unwrap(), "one\ntwo\n");
    }

    #[test]
    fn test_default_log_options() {
        let options = LogOptions::default();
        assert_eq!(options.level, "info");
        assert!(!options.json);
        assert!(options.file.is_none());
    }
}
