//! Frame reader over a buffer file
//!
//! Consumed frames are always truncated from the front, so the next frame
//! to deliver starts at offset 0. A frame handed out but not yet
//! acknowledged stays pending; reading again delivers it again.

use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use super::cursor::FileStream;
use super::errors::{BufferError, BufferResult};
use super::record::{FrameHeader, HEADER_LEN, frame_len};
use crate::clock::Clock;
use crate::config::StorageConfiguration;

/// Outcome of reading the front of a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameRead {
    /// A complete, checksum-verified frame.
    Frame { payload: Vec<u8>, frame_len: u64 },
    /// Damaged bytes; `discard_len` is the span to drop to get past them.
    Corrupt { reason: String, discard_len: u64 },
    /// Nothing left.
    End,
}

/// The file currently being drained in a signal folder.
#[derive(Debug)]
pub struct ReadableFile {
    stream: FileStream,
    created_millis: u64,
    expire_at: u64,
    clock: Arc<dyn Clock>,
    pending: Option<u64>,
}

impl ReadableFile {
    pub fn open(
        path: &Path,
        created_millis: u64,
        config: &StorageConfiguration,
        clock: Arc<dyn Clock>,
    ) -> BufferResult<Self> {
        Ok(Self {
            stream: FileStream::open(path)?,
            created_millis,
            expire_at: created_millis.saturating_add(config.max_file_age_for_read_millis()),
            clock,
            pending: None,
        })
    }

    /// Read the frame at the front of the file and mark it pending.
    pub fn read_next(&mut self) -> BufferResult<FrameRead> {
        self.stream.rewind()?;
        self.pending = None;

        let available = self.stream.remaining();
        if available == 0 {
            return Ok(FrameRead::End);
        }
        if available < HEADER_LEN as u64 {
            return Ok(self.corrupt("truncated frame header", available));
        }

        let mut header_bytes = [0u8; HEADER_LEN];
        self.read_exact(&mut header_bytes)?;
        let header = FrameHeader::parse(&header_bytes);

        if header.frame_len() > available {
            return Ok(self.corrupt(
                format!(
                    "frame declares {} payload bytes, only {} remain",
                    header.payload_len,
                    available - HEADER_LEN as u64
                ),
                available,
            ));
        }

        let mut payload = vec![0u8; header.payload_len as usize];
        self.read_exact(&mut payload)?;

        if !header.verify(&payload) {
            return Ok(self.corrupt("checksum mismatch", header.frame_len()));
        }

        let frame_len = frame_len(payload.len() as u64);
        self.pending = Some(frame_len);
        Ok(FrameRead::Frame { payload, frame_len })
    }

    fn corrupt(&mut self, reason: impl Into<String>, discard_len: u64) -> FrameRead {
        self.pending = Some(discard_len);
        FrameRead::Corrupt {
            reason: reason.into(),
            discard_len,
        }
    }

    fn read_exact(&mut self, buf: &mut [u8]) -> BufferResult<()> {
        self.stream.read_exact(buf).map_err(|e| {
            BufferError::io(format!("Failed to read {}", self.stream.path().display()), e)
        })
    }

    /// Length of the pending frame, if one was handed out.
    pub fn pending(&self) -> Option<u64> {
        self.pending
    }

    /// Permanently drop the first `len` bytes. Returns true if the file is
    /// now empty.
    ///
    /// The pending frame is forgotten even on error, so a failed call is
    /// never repeated against already-truncated bytes.
    pub fn remove_top(&mut self, len: u64) -> BufferResult<bool> {
        self.pending = None;
        self.stream.truncate_top_n(len)?;
        Ok(self.stream.is_empty())
    }

    /// Forget the pending frame without touching the file.
    pub fn release(&mut self) -> BufferResult<()> {
        self.pending = None;
        self.stream.rewind()
    }

    /// Whether the read window has closed.
    pub fn has_expired(&self) -> bool {
        self.clock.now_millis() >= self.expire_at
    }

    pub fn path(&self) -> &Path {
        self.stream.path()
    }

    /// Creation timestamp, which also identifies the file.
    pub fn created_millis(&self) -> u64 {
        self.created_millis
    }

    /// Bytes not yet acknowledged.
    pub fn len(&self) -> u64 {
        self.stream.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stream.is_empty()
    }

    pub fn close(self) {
        self.stream.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::storage::record::encode_frame;
    use std::fs;
    use tempfile::TempDir;

    const CREATED: u64 = 1_000_000;

    fn open_with(temp: &TempDir, content: &[u8], clock: Arc<ManualClock>) -> ReadableFile {
        let config =
            StorageConfiguration::new(temp.path(), 1_000, 1_500, 10_000, 2_000, 6_000).unwrap();
        let path = temp.path().join(CREATED.to_string());
        fs::write(&path, content).unwrap();
        ReadableFile::open(&path, CREATED, &config, clock).unwrap()
    }

    fn two_frames() -> Vec<u8> {
        let mut content = encode_frame(b"one");
        content.extend(encode_frame(b"two"));
        content
    }

    #[test]
    fn test_frames_delivered_in_order_after_removal() {
        let temp = TempDir::new().unwrap();
        let mut file = open_with(&temp, &two_frames(), Arc::new(ManualClock::new(CREATED)));

        let FrameRead::Frame { payload, frame_len } = file.read_next().unwrap() else {
            panic!("expected frame");
        };
        assert_eq!(payload, b"one");
        assert!(!file.remove_top(frame_len).unwrap());

        let FrameRead::Frame { payload, frame_len } = file.read_next().unwrap() else {
            panic!("expected frame");
        };
        assert_eq!(payload, b"two");
        assert!(file.remove_top(frame_len).unwrap());
        assert_eq!(file.read_next().unwrap(), FrameRead::End);
    }

    #[test]
    fn test_unacknowledged_frame_is_redelivered() {
        let temp = TempDir::new().unwrap();
        let mut file = open_with(&temp, &two_frames(), Arc::new(ManualClock::new(CREATED)));

        let first = file.read_next().unwrap();
        let again = file.read_next().unwrap();
        assert_eq!(first, again);
        assert_eq!(file.pending(), Some(frame_len(3)));

        file.release().unwrap();
        assert_eq!(file.pending(), None);
        assert_eq!(file.read_next().unwrap(), first);
    }

    #[test]
    fn test_failed_removal_forgets_pending_frame() {
        let temp = TempDir::new().unwrap();
        let mut file = open_with(&temp, &two_frames(), Arc::new(ManualClock::new(CREATED)));
        let FrameRead::Frame { frame_len, .. } = file.read_next().unwrap() else {
            panic!("expected frame");
        };

        let blocker = crate::storage::tmp_path(file.path());
        fs::create_dir(&blocker).unwrap();
        fs::write(blocker.join("x"), b"x").unwrap();

        assert!(file.remove_top(frame_len).is_err());
        assert_eq!(file.pending(), None);

        // Nothing was removed; the frame comes back on the next read.
        let FrameRead::Frame { payload, .. } = file.read_next().unwrap() else {
            panic!("expected frame");
        };
        assert_eq!(payload, b"one");
    }

    #[test]
    fn test_checksum_mismatch_reported_with_frame_span() {
        let temp = TempDir::new().unwrap();
        let mut content = two_frames();
        content[HEADER_LEN] ^= 0xFF;
        let mut file = open_with(&temp, &content, Arc::new(ManualClock::new(CREATED)));

        match file.read_next().unwrap() {
            FrameRead::Corrupt { reason, discard_len } => {
                assert!(reason.contains("checksum"));
                assert_eq!(discard_len, frame_len(3));
            }
            other => panic!("expected corrupt frame, got {:?}", other),
        }

        // Dropping the damaged span exposes the next good frame.
        file.remove_top(frame_len(3)).unwrap();
        assert!(matches!(file.read_next().unwrap(), FrameRead::Frame { .. }));
    }

    #[test]
    fn test_torn_tail_discards_remaining_bytes() {
        let temp = TempDir::new().unwrap();
        let content = encode_frame(b"partial payload");
        let torn = &content[..content.len() - 4];
        let mut file = open_with(&temp, torn, Arc::new(ManualClock::new(CREATED)));

        match file.read_next().unwrap() {
            FrameRead::Corrupt { discard_len, .. } => assert_eq!(discard_len, torn.len() as u64),
            other => panic!("expected corrupt frame, got {:?}", other),
        }
    }

    #[test]
    fn test_short_header_is_corrupt() {
        let temp = TempDir::new().unwrap();
        let mut file = open_with(&temp, &[1, 2, 3], Arc::new(ManualClock::new(CREATED)));

        assert!(matches!(
            file.read_next().unwrap(),
            FrameRead::Corrupt { discard_len: 3, .. }
        ));
    }

    #[test]
    fn test_expires_at_max_read_age() {
        let temp = TempDir::new().unwrap();
        let clock = Arc::new(ManualClock::new(CREATED));
        let file = open_with(&temp, &two_frames(), clock.clone());

        clock.advance(9_999);
        assert!(!file.has_expired());
        clock.advance(1);
        assert!(file.has_expired());
    }
}
