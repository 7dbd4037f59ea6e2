use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use atomic_write_file::AtomicWriteFile;
use fs2::FileExt;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use super::tables::{AclTables, StoreOp};
use super::{AclStore, StoreCounts};
use crate::constants::{
    JOURNAL_FILE_NAME, LOCK_FILE_NAME, SNAPSHOT_FILE_NAME, SNAPSHOT_FORMAT_VERSION,
};
use crate::io::{Journal, JournalStats};
use crate::types::{Acl, EngineConfig, ObjectIdentity};
use crate::{AclError, Result};

#[derive(Debug, Deserialize)]
struct Snapshot {
    version: u32,
    journal_sequence: u64,
    tables: AclTables,
}

#[derive(Serialize)]
struct SnapshotRef<'a> {
    version: u32,
    journal_sequence: u64,
    tables: &'a AclTables,
}

#[derive(Debug)]
struct FileState {
    tables: AclTables,
    journal: Journal,
}

/// Directory-backed store: a JSON snapshot plus an append-only journal of later changes.
///
/// The directory is locked exclusively for the lifetime of the value.
#[derive(Debug)]
pub struct FileAclStore {
    dir: PathBuf,
    state: RwLock<FileState>,
    compact_after_records: u64,
    _lock: File,
}

impl FileAclStore {
    /// Open or create the store in `dir`, replaying any journaled changes newer than
    /// the snapshot.
    pub fn open<P: AsRef<Path>>(dir: P, config: &EngineConfig) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs_err::create_dir_all(&dir)?;
        let lock = acquire_lock(&dir)?;

        let (mut tables, base_sequence) = load_snapshot(&dir.join(SNAPSHOT_FILE_NAME))?;
        let (journal, records) =
            Journal::open(dir.join(JOURNAL_FILE_NAME), base_sequence, config.journal_sync)?;
        let replayed = records.len();
        for record in records {
            let (op, _): (StoreOp, usize) =
                bincode::serde::decode_from_slice(&record.payload, bincode::config::standard())?;
            tables.apply(op).map_err(|err| AclError::Serialization {
                reason: format!("journal record {} does not apply: {err}", record.sequence),
            })?;
        }

        tracing::info!(
            store.dir = %dir.display(),
            store.snapshot_sequence = base_sequence,
            store.replayed = replayed,
            "opened acl store"
        );
        let store = Self {
            dir,
            state: RwLock::new(FileState { tables, journal }),
            compact_after_records: config.compact_after_records,
            _lock: lock,
        };
        if store.compact_after_records > 0 && replayed as u64 >= store.compact_after_records {
            store.compact()?;
        }
        Ok(store)
    }

    /// Write a fresh snapshot and empty the journal.
    pub fn compact(&self) -> Result<()> {
        let mut guard = self.state.write();
        compact_locked(&self.dir, &mut guard)
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    #[must_use]
    pub fn journal_stats(&self) -> JournalStats {
        self.state.read().journal.stats()
    }

    fn commit(&self, op: StoreOp) -> Result<()> {
        let mut guard = self.state.write();
        let state = &mut *guard;
        state.tables.validate(&op)?;
        let payload = bincode::serde::encode_to_vec(&op, bincode::config::standard())?;
        let sequence = state.journal.append(&payload)?;
        tracing::trace!(store.op = op.label(), journal.sequence = sequence, "store commit");
        state.tables.apply_validated(op);

        if self.compact_after_records > 0
            && state.journal.stats().appends_since_reset >= self.compact_after_records
        {
            // Already journaled; the next commit retries.
            if let Err(err) = compact_locked(&self.dir, state) {
                tracing::warn!(store.dir = %self.dir.display(), error = %err, "journal compaction failed");
            }
        }
        Ok(())
    }
}

impl AclStore for FileAclStore {
    fn read(&self, identity: &ObjectIdentity) -> Result<Acl> {
        self.state.read().tables.read(identity)
    }

    fn create(&self, identity: &ObjectIdentity) -> Result<Acl> {
        self.commit(StoreOp::Create(identity.clone()))?;
        self.read(identity)
    }

    fn update(&self, acl: &Acl) -> Result<()> {
        self.commit(StoreOp::Update(acl.clone()))
    }

    fn delete(&self, identity: &ObjectIdentity) -> Result<()> {
        self.commit(StoreOp::Delete(identity.clone()))
    }

    fn children(&self, identity: &ObjectIdentity) -> Result<Vec<ObjectIdentity>> {
        self.state.read().tables.children(identity)
    }

    fn identities(&self) -> Result<Vec<ObjectIdentity>> {
        self.state.read().tables.identities()
    }

    fn counts(&self) -> StoreCounts {
        self.state.read().tables.counts()
    }
}

fn acquire_lock(dir: &Path) -> Result<File> {
    let path = dir.join(LOCK_FILE_NAME);
    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(&path)?;
    file.try_lock_exclusive().map_err(|err| {
        AclError::Lock(format!(
            "acl store {} is in use by another process: {err}",
            dir.display()
        ))
    })?;
    Ok(file)
}

fn load_snapshot(path: &Path) -> Result<(AclTables, u64)> {
    if !path.exists() {
        return Ok((AclTables::default(), 0));
    }
    let raw = fs_err::read_to_string(path)?;
    let snapshot: Snapshot = serde_json::from_str(&raw)?;
    if snapshot.version != SNAPSHOT_FORMAT_VERSION {
        return Err(AclError::Serialization {
            reason: format!(
                "unsupported snapshot version {} (expected {SNAPSHOT_FORMAT_VERSION})",
                snapshot.version
            ),
        });
    }
    let mut tables = snapshot.tables;
    tables.reindex()?;
    Ok((tables, snapshot.journal_sequence))
}

fn compact_locked(dir: &Path, state: &mut FileState) -> Result<()> {
    let sequence = state.journal.sequence();
    let body = serde_json::to_vec_pretty(&SnapshotRef {
        version: SNAPSHOT_FORMAT_VERSION,
        journal_sequence: sequence,
        tables: &state.tables,
    })?;

    let mut atomic = AtomicWriteFile::open(dir.join(SNAPSHOT_FILE_NAME))?;
    atomic.write_all(&body)?;
    atomic.flush()?;
    atomic.commit()?;

    // Records up to `sequence` are now in the snapshot; a crash before this reset is
    // harmless because replay skips them.
    state.journal.reset()?;
    tracing::info!(store.dir = %dir.display(), journal.sequence = sequence, "compacted acl journal");
    Ok(())
}
