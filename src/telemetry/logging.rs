use crate::config::ServerConfig;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use thiserror::Error;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{InitError, RollingFileAppender, Rotation};
use tracing_subscriber::EnvFilter;

pub const LOG_DIR: &str = "log";
pub const GAME_LOG: &str = "game.log";

static INITIALIZED: OnceLock<()> = OnceLock::new();

#[derive(Debug, Error)]
pub enum LogError {
    #[error("create log directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("open log in {path}: {source}")]
    Appender {
        path: PathBuf,
        #[source]
        source: InitError,
    },
    #[error("invalid log filter '{filter}': {source}")]
    Filter {
        filter: String,
        #[source]
        source: tracing_subscriber::filter::ParseError,
    },
}

pub fn build_filter(filter: &str) -> Result<EnvFilter, LogError> {
    EnvFilter::try_new(filter).map_err(|source| LogError::Filter {
        filter: filter.to_string(),
        source,
    })
}

pub fn game_log_path(root: &Path) -> PathBuf {
    root.join(LOG_DIR).join(GAME_LOG)
}

/// `log/game.log` under `root`, never rotated.
fn game_log_appender(root: &Path) -> Result<RollingFileAppender, LogError> {
    let log_dir = root.join(LOG_DIR);
    std::fs::create_dir_all(&log_dir).map_err(|source| LogError::CreateDir {
        path: log_dir.clone(),
        source,
    })?;
    RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(GAME_LOG)
        .build(&log_dir)
        .map_err(|source| LogError::Appender {
            path: log_dir,
            source,
        })
}

/// Installs the global subscriber. Later calls do nothing and return `None`.
///
/// When logging to a file, the returned guard flushes pending lines on drop
/// and must be held for as long as the server runs.
pub fn init(root: &Path, config: &ServerConfig) -> Result<Option<WorkerGuard>, LogError> {
    if INITIALIZED.get().is_some() {
        return Ok(None);
    }
    let filter = build_filter(&config.log_filter)?;
    let (installed, guard) = if config.log_to_file {
        let (writer, guard) = tracing_appender::non_blocking(game_log_appender(root)?);
        let installed = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_ansi(false)
            .with_writer(writer)
            .try_init()
            .is_ok();
        (installed, Some(guard))
    } else {
        let installed = tracing_subscriber::fmt().with_env_filter(filter).try_init().is_ok();
        (installed, None)
    };
    if !installed {
        tracing::debug!("global subscriber already set");
    }
    let _ = INITIALIZED.set(());
    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn init_creates_game_log_and_is_idempotent() {
        let dir = TempDir::new().expect("tempdir");
        let config = ServerConfig::default();
        let guard = init(dir.path(), &config).expect("first init");
        assert!(guard.is_some());
        assert!(init(dir.path(), &config).expect("second init").is_none());
        assert!(game_log_path(dir.path()).is_file());
    }

    #[test]
    fn bad_filter_is_rejected() {
        assert!(matches!(build_filter("l2unity=notalevel"), Err(LogError::Filter { .. })));
        assert!(build_filter("info,l2unity::world=debug").is_ok());
    }

    #[test]
    fn game_log_appends_across_reopen() {
        let dir = TempDir::new().expect("tempdir");
        let mut first = game_log_appender(dir.path()).expect("open");
        first.write_all(b"first\n").expect("write");
        first.flush().expect("flush");
        drop(first);
        let mut second = game_log_appender(dir.path()).expect("reopen");
        second.write_all(b"second\n").expect("write");
        second.flush().expect("flush");
        let content = std::fs::read_to_string(game_log_path(dir.path())).expect("read");
        assert_eq!(content, "first\nsecond\n");
    }

    #[test]
    fn unwritable_log_dir_is_reported() {
        let dir = TempDir::new().expect("tempdir");
        std::fs::write(dir.path().join(LOG_DIR), "not a directory").expect("write");
        assert!(matches!(game_log_appender(dir.path()), Err(LogError::CreateDir { .. })));
    }
}
