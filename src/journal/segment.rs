//! Journal segment files
//!
//! One append-only file per partition.
//! Frame format: [MAGIC][SEQUENCE][OFFSET][TIMESTAMP][FLAGS][KEY_LEN][VAL_LEN][KEY][VALUE][CRC32]
//!
//! A record with no value (a tombstone) sets the tombstone flag and
//! writes no value bytes. On open, a partition replays its segment to
//! rebuild the in-memory record list; replay stops at the first
//! corrupted frame, dropping a torn tail write.

use crate::common::{crc32, Error, Result, SyncPolicy};
use std::fs::{File, OpenOptions};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use super::Record;

const SEGMENT_MAGIC: [u8; 4] = [0x52, 0x45, 0x47, 0x31]; // "REG1"
const FLAG_TOMBSTONE: u8 = 0x01;

/// Append handle for one partition's segment file.
pub struct SegmentWriter {
    writer: BufWriter<File>,
    sync_policy: SyncPolicy,
}

impl SegmentWriter {
    /// Open or create the segment file for appending.
    pub fn open(path: impl AsRef<Path>, sync_policy: SyncPolicy) -> Result<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new().create(true).append(true).open(path)?;

        Ok(Self {
            writer: BufWriter::new(file),
            sync_policy,
        })
    }

    /// Append one record and sync according to policy.
    pub fn append(&mut self, record: &Record) -> Result<()> {
        self.write_frame(record)?;
        self.maybe_sync()
    }

    fn write_frame(&mut self, record: &Record) -> Result<()> {
        let key = record.key.as_slice();
        let value = record.value.as_deref().unwrap_or(&[]);
        let flags = if record.value.is_none() {
            FLAG_TOMBSTONE
        } else {
            0
        };

        // Header
        self.writer.write_all(&SEGMENT_MAGIC)?;
        self.writer.write_all(&record.sequence.to_le_bytes())?;
        self.writer.write_all(&record.offset.to_le_bytes())?;
        self.writer.write_all(&record.timestamp.to_le_bytes())?;
        self.writer.write_all(&[flags])?;
        self.writer.write_all(&(key.len() as u32).to_le_bytes())?;
        self.writer.write_all(&(value.len() as u32).to_le_bytes())?;

        // Payload
        self.writer.write_all(key)?;
        self.writer.write_all(value)?;

        // Checksum over everything after the magic
        let mut checksum_data = Vec::with_capacity(33 + key.len() + value.len());
        checksum_data.extend_from_slice(&record.sequence.to_le_bytes());
        checksum_data.extend_from_slice(&record.offset.to_le_bytes());
        checksum_data.extend_from_slice(&record.timestamp.to_le_bytes());
        checksum_data.push(flags);
        checksum_data.extend_from_slice(&(key.len() as u32).to_le_bytes());
        checksum_data.extend_from_slice(&(value.len() as u32).to_le_bytes());
        checksum_data.extend_from_slice(key);
        checksum_data.extend_from_slice(value);

        self.writer.write_all(&crc32(&checksum_data).to_le_bytes())?;

        Ok(())
    }

    fn maybe_sync(&mut self) -> Result<()> {
        match self.sync_policy {
            SyncPolicy::Always => {
                self.writer.flush()?;
                self.writer.get_ref().sync_all()?;
            }
            SyncPolicy::Interval => {
                self.writer.flush()?;
            }
            SyncPolicy::Never => {}
        }
        Ok(())
    }

    /// Flush and fsync.
    pub fn sync(&mut self) -> Result<()> {
        self.writer.flush()?;
        self.writer.get_ref().sync_all()?;
        Ok(())
    }

    /// Replay every intact record in a segment, in file order.
    pub fn replay<F>(path: impl AsRef<Path>, partition: u32, mut callback: F) -> Result<()>
    where
        F: FnMut(Record) -> Result<()>,
    {
        let file = match File::open(path.as_ref()) {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e.into()),
        };

        let mut reader = BufReader::new(file);

        loop {
            match Self::read_frame(&mut reader, partition) {
                Ok(Some(record)) => callback(record)?,
                Ok(None) => break,
                Err(e) => {
                    tracing::warn!(
                        path = %path.as_ref().display(),
                        "segment replay stopped at corrupted frame: {}",
                        e
                    );
                    break;
                }
            }
        }

        Ok(())
    }

    fn read_frame<R: Read>(reader: &mut R, partition: u32) -> Result<Option<Record>> {
        let mut magic = [0u8; 4];
        match reader.read_exact(&mut magic) {
            Ok(_) => {}
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
            Err(e) => return Err(e.into()),
        }

        if magic != SEGMENT_MAGIC {
            return Err(Error::Corrupted("invalid segment magic".into()));
        }

        let mut sequence_bytes = [0u8; 8];
        reader.read_exact(&mut sequence_bytes)?;
        let sequence = u64::from_le_bytes(sequence_bytes);

        let mut offset_bytes = [0u8; 8];
        reader.read_exact(&mut offset_bytes)?;
        let offset = u64::from_le_bytes(offset_bytes);

        let mut ts_bytes = [0u8; 8];
        reader.read_exact(&mut ts_bytes)?;
        let timestamp = i64::from_le_bytes(ts_bytes);

        let mut flags = [0u8; 1];
        reader.read_exact(&mut flags)?;

        let mut key_len_bytes = [0u8; 4];
        reader.read_exact(&mut key_len_bytes)?;
        let key_len = u32::from_le_bytes(key_len_bytes) as usize;

        let mut val_len_bytes = [0u8; 4];
        reader.read_exact(&mut val_len_bytes)?;
        let val_len = u32::from_le_bytes(val_len_bytes) as usize;

        let mut key = vec![0u8; key_len];
        reader.read_exact(&mut key)?;

        let mut value_bytes = vec![0u8; val_len];
        reader.read_exact(&mut value_bytes)?;

        let mut checksum_bytes = [0u8; 4];
        reader.read_exact(&mut checksum_bytes)?;
        let stored_checksum = u32::from_le_bytes(checksum_bytes);

        let mut checksum_data = Vec::with_capacity(33 + key_len + val_len);
        checksum_data.extend_from_slice(&sequence_bytes);
        checksum_data.extend_from_slice(&offset_bytes);
        checksum_data.extend_from_slice(&ts_bytes);
        checksum_data.push(flags[0]);
        checksum_data.extend_from_slice(&key_len_bytes);
        checksum_data.extend_from_slice(&val_len_bytes);
        checksum_data.extend_from_slice(&key);
        checksum_data.extend_from_slice(&value_bytes);

        if crc32(&checksum_data) != stored_checksum {
            return Err(Error::Corrupted("segment frame checksum mismatch".into()));
        }

        let value = if flags[0] & FLAG_TOMBSTONE != 0 {
            None
        } else {
            Some(value_bytes)
        };

        Ok(Some(Record {
            partition,
            sequence,
            offset,
            timestamp,
            key,
            value,
        }))
    }

    /// Rewrite the segment with only the given records, atomically
    /// (write to a temp file, fsync, rename over). Returns a fresh
    /// append handle for the rewritten file.
    pub fn rewrite(
        path: impl AsRef<Path>,
        records: &[Record],
        sync_policy: SyncPolicy,
    ) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let tmp = path.with_extension("compact");

        {
            let file = OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(true)
                .open(&tmp)?;
            let mut writer = Self {
                writer: BufWriter::new(file),
                sync_policy: SyncPolicy::Never,
            };
            for record in records {
                writer.write_frame(record)?;
            }
            writer.sync()?;
        }

        std::fs::rename(&tmp, &path)?;
        Self::open(path, sync_policy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn record(offset: u64, key: &[u8], value: Option<&[u8]>) -> Record {
        Record {
            partition: 0,
            sequence: offset,
            offset,
            timestamp: 1_700_000_000_000 + offset as i64,
            key: key.to_vec(),
            value: value.map(|v| v.to_vec()),
        }
    }

    fn replay_all(path: &Path) -> Vec<Record> {
        let mut records = Vec::new();
        SegmentWriter::replay(path, 0, |r| {
            records.push(r);
            Ok(())
        })
        .unwrap();
        records
    }

    #[test]
    fn test_segment_append_replay() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("p0.log");

        {
            let mut writer = SegmentWriter::open(&path, SyncPolicy::Always).unwrap();
            writer.append(&record(0, b"k1", Some(b"v1"))).unwrap();
            writer.append(&record(1, b"k2", Some(b"v2"))).unwrap();
            writer.append(&record(2, b"k1", None)).unwrap();
            writer.sync().unwrap();
        }

        let records = replay_all(&path);
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].offset, 0);
        assert_eq!(records[0].value.as_deref(), Some(b"v1".as_slice()));
        // Tombstone comes back as a missing value, not an empty one
        assert_eq!(records[2].value, None);
        assert_eq!(records[2].key, b"k1");
    }

    #[test]
    fn test_segment_torn_tail_dropped() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("p0.log");

        {
            let mut writer = SegmentWriter::open(&path, SyncPolicy::Always).unwrap();
            writer.append(&record(0, b"k1", Some(b"v1"))).unwrap();
            writer.append(&record(1, b"k2", Some(b"v2"))).unwrap();
            writer.sync().unwrap();
        }

        // Simulate a torn write
        let mut bytes = std::fs::read(&path).unwrap();
        bytes.truncate(bytes.len() - 3);
        std::fs::write(&path, &bytes).unwrap();

        let records = replay_all(&path);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].key, b"k1");
    }

    #[test]
    fn test_segment_rewrite() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("p0.log");

        {
            let mut writer = SegmentWriter::open(&path, SyncPolicy::Always).unwrap();
            for i in 0..5 {
                writer
                    .append(&record(i, format!("k{}", i).as_bytes(), Some(b"v")))
                    .unwrap();
            }
            writer.sync().unwrap();
        }

        let keep = vec![record(1, b"k1", Some(b"v")), record(4, b"k4", Some(b"v"))];
        let mut writer = SegmentWriter::rewrite(&path, &keep, SyncPolicy::Always).unwrap();

        // Offsets survive the rewrite and appends continue after it
        writer.append(&record(5, b"k5", Some(b"v"))).unwrap();
        writer.sync().unwrap();

        let records = replay_all(&path);
        let offsets: Vec<u64> = records.iter().map(|r| r.offset).collect();
        assert_eq!(offsets, vec![1, 4, 5]);
    }
}
