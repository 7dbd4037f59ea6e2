use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::error::{AclError, Result};

// Each journal record header: [seq: u64][len: u32][reserved: 4 bytes][checksum: 32 bytes]
const ENTRY_HEADER_SIZE: usize = 48;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JournalStats {
    pub length_bytes: u64,
    pub sequence: u64,
    pub appends_since_reset: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JournalRecord {
    pub sequence: u64,
    pub payload: Vec<u8>,
}

/// Append-only, checksummed record log.
///
/// Records are never rewritten in place. A record cut short by a crash is dropped
/// (and the file truncated) on open; a complete record whose checksum does not
/// match is reported as corruption.
#[derive(Debug)]
pub struct Journal {
    file: File,
    path: PathBuf,
    write_head: u64,
    sequence: u64,
    appends_since_reset: u64,
    sync: bool,
}

impl Journal {
    /// Open (or create) the journal at `path`.
    ///
    /// Returns the records with a sequence above `base_sequence`; records at or
    /// below it are already folded into a snapshot.
    pub fn open<P: AsRef<Path>>(
        path: P,
        base_sequence: u64,
        sync: bool,
    ) -> Result<(Self, Vec<JournalRecord>)> {
        let path = path.as_ref().to_path_buf();
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)?;

        let file_len = file.metadata()?.len();
        let (records, valid_len) = Self::scan_records(&mut file, file_len)?;
        if valid_len < file_len {
            tracing::warn!(
                journal.path = %path.display(),
                journal.valid_len = valid_len,
                journal.file_len = file_len,
                "truncating torn journal tail"
            );
            file.set_len(valid_len)?;
            file.sync_all()?;
        }

        let sequence = records
            .last()
            .map_or(base_sequence, |record| record.sequence.max(base_sequence));
        let pending = records
            .into_iter()
            .filter(|record| record.sequence > base_sequence)
            .collect();

        let journal = Self {
            file,
            path,
            write_head: valid_len,
            sequence,
            appends_since_reset: 0,
            sync,
        };
        Ok((journal, pending))
    }

    /// Append one record and return its sequence number.
    pub fn append(&mut self, payload: &[u8]) -> Result<u64> {
        if payload.is_empty() {
            return Err(AclError::invalid("journal payload must not be empty"));
        }
        let Ok(payload_len) = u32::try_from(payload.len()) else {
            return Err(AclError::invalid("journal payload too large"));
        };

        let next_sequence = self.sequence + 1;
        let digest = blake3::hash(payload);
        let mut header = [0u8; ENTRY_HEADER_SIZE];
        header[..8].copy_from_slice(&next_sequence.to_le_bytes());
        header[8..12].copy_from_slice(&payload_len.to_le_bytes());
        header[16..48].copy_from_slice(digest.as_bytes());

        // Header and payload go out in one write so a crash leaves at most one torn record.
        let mut combined = Vec::with_capacity(ENTRY_HEADER_SIZE + payload.len());
        combined.extend_from_slice(&header);
        combined.extend_from_slice(payload);

        self.file.seek(SeekFrom::Start(self.write_head))?;
        self.file.write_all(&combined)?;
        if self.sync {
            self.file.sync_all()?;
        }
        tracing::debug!(
            journal.sequence = next_sequence,
            journal.payload_len = payload_len,
            "journal append"
        );

        self.write_head += combined.len() as u64;
        self.sequence = next_sequence;
        self.appends_since_reset = self.appends_since_reset.saturating_add(1);
        Ok(next_sequence)
    }

    /// Discard every record; sequence numbering continues from the current value.
    pub fn reset(&mut self) -> Result<()> {
        self.file.set_len(0)?;
        self.file.sync_all()?;
        self.write_head = 0;
        self.appends_since_reset = 0;
        Ok(())
    }

    #[must_use]
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn stats(&self) -> JournalStats {
        JournalStats {
            length_bytes: self.write_head,
            sequence: self.sequence,
            appends_since_reset: self.appends_since_reset,
        }
    }

    fn scan_records(file: &mut File, file_len: u64) -> Result<(Vec<JournalRecord>, u64)> {
        let mut bytes = Vec::new();
        file.seek(SeekFrom::Start(0))?;
        file.read_to_end(&mut bytes)?;

        let mut records: Vec<JournalRecord> = Vec::new();
        let mut cursor = 0usize;
        while cursor + ENTRY_HEADER_SIZE <= bytes.len() {
            let header = &bytes[cursor..cursor + ENTRY_HEADER_SIZE];
            let sequence = u64::from_le_bytes(header[..8].try_into().map_err(|_| {
                AclError::JournalCorruption {
                    offset: cursor as u64,
                    reason: "invalid journal sequence header".into(),
                }
            })?);
            let length = u32::from_le_bytes(header[8..12].try_into().map_err(|_| {
                AclError::JournalCorruption {
                    offset: cursor as u64,
                    reason: "invalid journal length header".into(),
                }
            })?) as usize;
            let checksum = &header[16..48];

            if sequence == 0 && length == 0 {
                // Zero-filled tail from a preallocated or partially flushed file.
                break;
            }
            if length == 0 {
                tracing::error!(journal.offset = cursor, "journal record with zero length");
                return Err(AclError::JournalCorruption {
                    offset: cursor as u64,
                    reason: "journal record length invalid".into(),
                });
            }
            let end = cursor + ENTRY_HEADER_SIZE + length;
            if end > bytes.len() {
                // Torn write: the process stopped mid-append.
                break;
            }
            if let Some(previous) = records.last() {
                if sequence != previous.sequence + 1 {
                    tracing::error!(
                        journal.offset = cursor,
                        journal.sequence = sequence,
                        journal.previous = previous.sequence,
                        "journal sequence gap"
                    );
                    return Err(AclError::JournalCorruption {
                        offset: cursor as u64,
                        reason: "journal sequence not contiguous".into(),
                    });
                }
            }

            let payload = &bytes[cursor + ENTRY_HEADER_SIZE..end];
            if blake3::hash(payload).as_bytes() != checksum {
                tracing::error!(journal.offset = cursor, journal.sequence = sequence, "journal checksum mismatch");
                return Err(AclError::JournalCorruption {
                    offset: cursor as u64,
                    reason: "journal record checksum mismatch".into(),
                });
            }

            records.push(JournalRecord {
                sequence,
                payload: payload.to_vec(),
            });
            cursor = end;
        }

        let valid_len = (cursor as u64).min(file_len);
        Ok((records, valid_len))
    }
}
