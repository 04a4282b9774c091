use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::PathBuf;

use crc32fast::Hasher;
use parking_lot::Mutex;

use crate::error::HamftsError;
use crate::Result;

/// Size of the per-record header: u32 length + u32 crc32
pub const RECORD_HEADER_LEN: u64 = 8;

/// Append-only log of length-prefixed, checksummed records.
///
/// Record format:
/// - u32 length (little endian)
/// - u32 crc32 of payload
/// - raw payload bytes
///
/// A record is addressed by the byte offset of its header.
pub struct BlobLog {
    file: Mutex<File>,
}

impl BlobLog {
    /// Open (or create) a log, keeping existing records
    pub fn open(path: PathBuf) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&path)?;

        Ok(Self {
            file: Mutex::new(file),
        })
    }

    /// Create an empty log at `path`, discarding anything already there
    pub fn create(path: PathBuf) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&path)?;
        Self::open(path)
    }

    /// Append a payload and return the offset of its record
    pub fn append(&self, payload: &[u8]) -> Result<u64> {
        let len = u32::try_from(payload.len()).map_err(|_| {
            HamftsError::Serialization(format!(
                "record of {} bytes exceeds the u32 length prefix",
                payload.len()
            ))
        })?;

        let mut hasher = Hasher::new();
        hasher.update(payload);
        let crc32 = hasher.finalize();

        let mut record = Vec::with_capacity(RECORD_HEADER_LEN as usize + payload.len());
        record.extend_from_slice(&len.to_le_bytes());
        record.extend_from_slice(&crc32.to_le_bytes());
        record.extend_from_slice(payload);

        let mut file = self.file.lock();
        let offset = file.seek(SeekFrom::End(0))?;
        file.write_all(&record)?;
        Ok(offset)
    }

    /// Read the payload of the record starting at `offset`, validating its checksum
    pub fn read(&self, offset: u64) -> Result<Vec<u8>> {
        let mut file = self.file.lock();
        let file_len = file.metadata()?.len();
        if offset.saturating_add(RECORD_HEADER_LEN) > file_len {
            return Err(HamftsError::corrupt_record(
                offset,
                format!("offset beyond end of log ({} bytes)", file_len),
            ));
        }

        file.seek(SeekFrom::Start(offset))?;
        let mut header = [0u8; RECORD_HEADER_LEN as usize];
        read_exact_at(&mut file, &mut header, offset)?;
        let len = u32::from_le_bytes([header[0], header[1], header[2], header[3]]);
        let stored_crc = u32::from_le_bytes([header[4], header[5], header[6], header[7]]);

        let end = offset + RECORD_HEADER_LEN + len as u64;
        if end > file_len {
            return Err(HamftsError::corrupt_record(
                offset,
                format!("record length {} runs past end of log", len),
            ));
        }

        let mut payload = vec![0u8; len as usize];
        read_exact_at(&mut file, &mut payload, offset)?;

        let mut hasher = Hasher::new();
        hasher.update(&payload);
        if hasher.finalize() != stored_crc {
            return Err(HamftsError::corrupt_record(offset, "checksum mismatch"));
        }

        Ok(payload)
    }

    /// Flush buffered writes and fsync the file
    pub fn sync(&self) -> Result<()> {
        let mut file = self.file.lock();
        file.flush()?;
        file.sync_all()?;
        Ok(())
    }

    /// Current size of the log in bytes
    pub fn len(&self) -> Result<u64> {
        Ok(self.file.lock().metadata()?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}

fn read_exact_at(file: &mut File, buf: &mut [u8], offset: u64) -> Result<()> {
    file.read_exact(buf).map_err(|e| {
        if e.kind() == ErrorKind::UnexpectedEof {
            HamftsError::corrupt_record(offset, "truncated record")
        } else {
            HamftsError::Io(e)
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_append_and_read() {
        let tmp = TempDir::new().unwrap();
        let log = BlobLog::open(tmp.path().join("log.dat")).unwrap();

        let first = log.append(b"first").unwrap();
        let second = log.append(b"second record").unwrap();

        assert_eq!(first, 0);
        assert_eq!(second, RECORD_HEADER_LEN + 5);
        assert_eq!(log.read(second).unwrap(), b"second record");
        assert_eq!(log.read(first).unwrap(), b"first");
        assert_eq!(log.len().unwrap(), 2 * RECORD_HEADER_LEN + 5 + 13);
    }

    #[test]
    fn test_reopen_keeps_records() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("nested").join("log.dat");
        let offset = {
            let log = BlobLog::open(path.clone()).unwrap();
            log.append(b"persisted").unwrap()
        };

        let log = BlobLog::open(path).unwrap();
        assert_eq!(log.read(offset).unwrap(), b"persisted");
        let next = log.append(b"more").unwrap();
        assert!(next > offset);
    }

    #[test]
    fn test_create_truncates() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("log.dat");
        BlobLog::open(path.clone()).unwrap().append(b"stale").unwrap();

        let log = BlobLog::create(path).unwrap();
        assert!(log.is_empty().unwrap());
    }

    #[test]
    fn test_offset_past_end_is_corrupt() {
        let tmp = TempDir::new().unwrap();
        let log = BlobLog::open(tmp.path().join("log.dat")).unwrap();
        log.append(b"only").unwrap();

        let err = log.read(1_000).unwrap_err();
        assert!(matches!(err, HamftsError::CorruptRecord { offset: 1_000, .. }));
    }

    #[test]
    fn test_checksum_mismatch_is_corrupt() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("log.dat");
        let log = BlobLog::open(path.clone()).unwrap();
        let offset = log.append(b"payload").unwrap();
        log.sync().unwrap();

        // Flip a payload byte behind the log's back
        let mut bytes = std::fs::read(&path).unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0xFF;
        std::fs::write(&path, bytes).unwrap();

        let err = log.read(offset).unwrap_err();
        assert!(err.is_corruption());
    }

    #[test]
    fn test_misaligned_offset_is_corrupt() {
        let tmp = TempDir::new().unwrap();
        let log = BlobLog::open(tmp.path().join("log.dat")).unwrap();
        log.append(b"aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa").unwrap();

        // Offset 3 lands inside the first header
        let err = log.read(3).unwrap_err();
        assert!(err.is_corruption());
    }
}
