use std::fmt::Debug;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use crate::Result;
use crate::types::AuditLogEntry;

/// Append-only sink for audit rows.
pub trait AuditLogStore: Send + Sync + Debug {
    fn append(&self, entry: &AuditLogEntry) -> Result<()>;

    /// Every row, oldest first.
    fn entries(&self) -> Result<Vec<AuditLogEntry>>;
}

#[derive(Debug, Default)]
pub struct InMemoryAuditLogStore {
    entries: Mutex<Vec<AuditLogEntry>>,
}

impl InMemoryAuditLogStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl AuditLogStore for InMemoryAuditLogStore {
    fn append(&self, entry: &AuditLogEntry) -> Result<()> {
        self.entries.lock().push(entry.clone());
        Ok(())
    }

    fn entries(&self) -> Result<Vec<AuditLogEntry>> {
        Ok(self.entries.lock().clone())
    }
}

/// One JSON object per line.
#[derive(Debug)]
pub struct JsonlAuditLogStore {
    path: PathBuf,
    writer: Mutex<()>,
}

impl JsonlAuditLogStore {
    /// Rows are appended to `path`, which is created on first write.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs_err::create_dir_all(parent)?;
        }
        Ok(Self {
            path,
            writer: Mutex::new(()),
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl AuditLogStore for JsonlAuditLogStore {
    fn append(&self, entry: &AuditLogEntry) -> Result<()> {
        let mut line = serde_json::to_vec(entry)?;
        line.push(b'\n');
        let _guard = self.writer.lock();
        let mut file = fs_err::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(&line)?;
        file.flush()?;
        Ok(())
    }

    fn entries(&self) -> Result<Vec<AuditLogEntry>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let _guard = self.writer.lock();
        let reader = BufReader::new(fs_err::File::open(&self.path)?);
        let mut entries = Vec::new();
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            entries.push(serde_json::from_str(&line)?);
        }
        Ok(entries)
    }
}
