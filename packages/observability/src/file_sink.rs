//! Append-only JSONL file output.

use crate::json_layer::JsonLayer;
use crate::{InitError, LogConfig};
use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

fn default_log_path() -> Result<PathBuf, InitError> {
    dirs::home_dir()
        .map(|home| home.join(".storefront").join("logs").join("dev.jsonl"))
        .ok_or(InitError::NoHomeDir)
}

/// File writer shared by every event; flushed after each line so that
/// concurrent tailers see whole lines.
#[derive(Clone)]
pub struct JsonlFileWriter {
    inner: Arc<Mutex<BufWriter<File>>>,
}

impl JsonlFileWriter {
    pub fn open(path: &Path) -> io::Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            inner: Arc::new(Mutex::new(BufWriter::with_capacity(8192, file))),
        })
    }
}

impl io::Write for JsonlFileWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut guard = self.inner.lock();
        let written = guard.write(buf)?;
        guard.flush()?;
        Ok(written)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.lock().flush()
    }
}

impl<'a> MakeWriter<'a> for JsonlFileWriter {
    type Writer = JsonlFileWriter;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

pub fn init_file_subscriber(config: &LogConfig) -> Result<(), InitError> {
    let log_path = match &config.log_path {
        Some(path) => path.clone(),
        None => default_log_path()?,
    };

    let writer = JsonlFileWriter::open(&log_path).map_err(|source| InitError::LogFile {
        path: log_path.clone(),
        source,
    })?;

    let json_layer = JsonLayer::new(config.service_name.clone(), writer);

    let stderr_layer = config.also_stderr.then(|| {
        tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_file(false)
            .with_line_number(false)
            .compact()
            .with_writer(io::stderr)
            .with_ansi(true)
    });

    let filter = || {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.default_level))
    };

    tracing_subscriber::registry()
        .with(json_layer.with_filter(filter()))
        .with(stderr_layer.map(|l| l.with_filter(filter())))
        .try_init()
        .map_err(|e| InitError::AlreadyInitialized(e.to_string()))?;

    tracing::info!(log_path = %log_path.display(), "observability initialized");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use tempfile::tempdir;

    #[test]
    fn test_writer_appends_lines() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("logs").join("test.jsonl");

        let mut writer = JsonlFileWriter::open(&path).unwrap();
        writer.write_all(b"{\"a\":1}\n").unwrap();
        drop(writer);

        let mut writer = JsonlFileWriter::open(&path).unwrap();
        writer.write_all(b"{\"a\":2}\n").unwrap();

        let mut content = String::new();
        File::open(&path)
            .unwrap()
            .read_to_string(&mut content)
            .unwrap();
        assert_eq!(content, "{\"a\":1}\n{\"a\":2}\n");
    }

    #[test]
    fn test_writer_creates_parent_dirs() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("deeply").join("nested").join("test.jsonl");

        assert!(JsonlFileWriter::open(&path).is_ok());
        assert!(path.parent().unwrap().exists());
    }
}
