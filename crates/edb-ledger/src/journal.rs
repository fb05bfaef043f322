use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use edb_types::Commit;

use crate::error::{LedgerError, LedgerResult};

/// Flush/sync strategy for the commit journal.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum JournalSync {
    /// `fsync` after every commit.
    EveryCommit,
    /// Flush to the OS after every commit and let it schedule the write.
    #[default]
    OsDefault,
}

/// Header size: 4 bytes length + 4 bytes CRC.
const HEADER_SIZE: u64 = 8;

/// Append-only file of frozen commits for one stage.
///
/// On-disk format, one record per commit:
/// ```text
/// [4 bytes: payload length (little-endian u32)]
/// [4 bytes: CRC32 of payload (little-endian u32)]
/// [N bytes: payload (bincode-serialized Commit)]
/// ```
///
/// A record cut short by a crash at the end of the file is a torn write: it
/// is dropped with a warning and the file is truncated back to the last whole
/// record. A complete record whose checksum does not match is corruption and
/// fails the open.
pub struct Journal {
    path: PathBuf,
    file: File,
    offset: u64,
    sync: JournalSync,
}

impl Journal {
    /// Open (or create) the journal at `path` and return every commit it
    /// holds, in append order.
    pub fn open(path: &Path, sync: JournalSync) -> LedgerResult<(Self, Vec<Commit>)> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let (commits, valid_len) = if path.exists() {
            recover(path)?
        } else {
            (Vec::new(), 0)
        };

        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(path)?;
        let file_len = file.metadata()?.len();
        if file_len > valid_len {
            warn!(
                path = %path.display(),
                valid_len,
                file_len,
                "truncating torn journal tail"
            );
            file.set_len(valid_len)?;
            file.sync_all()?;
        }

        file.seek(SeekFrom::Start(valid_len))?;

        debug!(path = %path.display(), commits = commits.len(), "journal opened");
        Ok((
            Self {
                path: path.to_path_buf(),
                file,
                offset: valid_len,
                sync,
            },
            commits,
        ))
    }

    /// Append a frozen commit. Returns the byte offset of its record.
    ///
    /// The record is flushed (and synced under [`JournalSync::EveryCommit`])
    /// before this returns.
    pub fn append(&mut self, commit: &Commit) -> LedgerResult<u64> {
        let payload =
            bincode::serialize(commit).map_err(|e| LedgerError::Serialization(e.to_string()))?;
        let length = u32::try_from(payload.len())
            .map_err(|_| LedgerError::Serialization("commit exceeds 4 GiB".into()))?;
        let crc = crc32fast::hash(&payload);

        let mut record = Vec::with_capacity(HEADER_SIZE as usize + payload.len());
        record.extend_from_slice(&length.to_le_bytes());
        record.extend_from_slice(&crc.to_le_bytes());
        record.extend_from_slice(&payload);

        let record_offset = self.offset;
        if let Err(e) = self.write_record(&record) {
            self.rollback();
            return Err(e.into());
        }

        self.offset += HEADER_SIZE + payload.len() as u64;
        debug!(offset = record_offset, len = payload.len(), "journal append");
        Ok(record_offset)
    }

    fn write_record(&mut self, record: &[u8]) -> std::io::Result<()> {
        self.file.write_all(record)?;
        self.file.flush()?;
        if self.sync == JournalSync::EveryCommit {
            self.file.sync_all()?;
        }
        Ok(())
    }

    /// Cut a partially written record so the next append starts clean.
    fn rollback(&mut self) {
        let result = self
            .file
            .set_len(self.offset)
            .and_then(|()| self.file.seek(SeekFrom::Start(self.offset)).map(|_| ()));
        if let Err(e) = result {
            warn!(path = %self.path.display(), error = %e, "journal rollback failed");
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Bytes of whole records written so far.
    pub fn len(&self) -> u64 {
        self.offset
    }

    pub fn is_empty(&self) -> bool {
        self.offset == 0
    }
}

/// Read every whole record of the journal at `path`.
///
/// Returns the commits and the byte length of the valid prefix.
fn recover(path: &Path) -> LedgerResult<(Vec<Commit>, u64)> {
    let mut bytes = Vec::new();
    BufReader::new(File::open(path)?).read_to_end(&mut bytes)?;
    let file_len = bytes.len() as u64;

    let mut commits = Vec::new();
    let mut offset: u64 = 0;

    while offset < file_len {
        if offset + HEADER_SIZE > file_len {
            warn!(offset, file_len, "torn journal header; stopping recovery");
            break;
        }
        let start = offset as usize;
        let length = u32::from_le_bytes([bytes[start], bytes[start + 1], bytes[start + 2], bytes[start + 3]]);
        let expected_crc = u32::from_le_bytes([bytes[start + 4], bytes[start + 5], bytes[start + 6], bytes[start + 7]]);

        let end = offset + HEADER_SIZE + u64::from(length);
        if end > file_len {
            warn!(offset, length, file_len, "torn journal record; stopping recovery");
            break;
        }

        let payload = &bytes[(offset + HEADER_SIZE) as usize..end as usize];
        let actual_crc = crc32fast::hash(payload);
        if actual_crc != expected_crc {
            return Err(LedgerError::JournalCorrupt {
                offset,
                reason: format!("crc mismatch: expected {expected_crc:#010x}, got {actual_crc:#010x}"),
            });
        }

        let commit: Commit = bincode::deserialize(payload).map_err(|e| LedgerError::JournalCorrupt {
            offset,
            reason: e.to_string(),
        })?;
        commits.push(commit);
        offset = end;
    }

    debug!(recovered = commits.len(), "journal recovery complete");
    Ok((commits, offset))
}
