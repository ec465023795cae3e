use chrono::Local;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::domain::errors::PersistenceError;
use crate::domain::ports::{LogSink, Severity};

/// Append-only text log, one `"<timestamp> - <LEVEL> - <message>"` line per
/// entry. Multi-line messages are split so every line carries the prefix.
pub struct FileLogSink {
    path: PathBuf,
    // Serialises appends from one process so lines never interleave.
    lock: Mutex<()>,
}

impl FileLogSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn format_lines(level: Severity, message: &str) -> String {
        let ts = Local::now().format("%Y-%m-%d %H:%M:%S%.3f");
        let mut out = String::new();
        for line in message.lines().filter(|l| !l.trim().is_empty()) {
            out.push_str(&format!("{} - {} - {}\n", ts, level.as_str(), line));
        }
        out
    }
}

impl LogSink for FileLogSink {
    fn append(&self, level: Severity, message: &str) -> Result<(), PersistenceError> {
        let write_err = |source: io::Error| PersistenceError::Write {
            path: self.path.clone(),
            source,
        };

        let text = Self::format_lines(level, message);
        if text.is_empty() {
            return Ok(());
        }

        let _guard = self.lock.lock().unwrap_or_else(|p| p.into_inner());
        if let Some(dir) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(dir).map_err(write_err)?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(write_err)?;
        file.write_all(text.as_bytes()).map_err(write_err)?;
        Ok(())
    }

    fn tail(&self, n: usize) -> Result<Vec<String>, PersistenceError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(PersistenceError::Read {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        let lines: Vec<&str> = content.lines().filter(|l| !l.trim().is_empty()).collect();
        let start = lines.len().saturating_sub(n);
        Ok(lines[start..].iter().map(|l| l.to_string()).collect())
    }
}
