/*!
Frame boundary recovery.

The meter transmits continuously, so a reader that opens the port (or loses
a frame) starts at an arbitrary byte. One byte is enough to resynchronize:
its high nibble says where in the frame it sits, and the rest of that frame
is discarded so the next byte read is position 1.
*/

use crate::error::{DmmError, Result};
use crate::frame::position_marker;
use crate::protocol::FRAME_LEN;
use crate::transport::Transport;
use tracing::{debug, warn};

/// Counters kept across synchronizations
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncStats {
    /// Successful synchronizations
    pub synchronizations: u64,
    /// Bytes skipped to reach a frame boundary
    pub bytes_discarded: u64,
    /// Sync bytes rejected for carrying position 0 or 15
    pub invalid_markers: u64,
}

/// Frame synchronization engine
#[derive(Debug, Default)]
pub struct SyncEngine {
    stats: SyncStats,
}

impl SyncEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stats(&self) -> SyncStats {
        self.stats
    }

    /// Consume bytes so the next byte read from `transport` starts a frame.
    ///
    /// Reads exactly one sync byte, then up to `14 - position` more. A short
    /// discard is not an error; the following frame read will catch it.
    pub fn synchronize<T: Transport + ?Sized>(&mut self, transport: &mut T) -> Result<()> {
        let mut sync = [0u8; 1];
        if transport.read_bytes(&mut sync)? != 1 {
            warn!("No data while synchronizing");
            return Err(DmmError::NoData);
        }

        let byte = sync[0];
        let position = position_marker(byte) as usize;
        if position == 0 || position == 15 {
            warn!("Invalid sync byte {:#04x}", byte);
            self.stats.invalid_markers += 1;
            return Err(DmmError::InvalidSyncMarker { byte });
        }

        let needed = FRAME_LEN - position;
        if needed > 0 {
            let mut discard = [0u8; FRAME_LEN];
            let got = transport.read_bytes(&mut discard[..needed])?;
            if got < needed {
                debug!("Short discard: {} of {} bytes", got, needed);
            }
            self.stats.bytes_discarded += got as u64;
        }

        self.stats.synchronizations += 1;
        debug!("🔒 Synchronized on position {} ({} bytes to boundary)", position, needed);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::IoTransport;
    use std::io::Cursor;
    use std::time::Duration;

    fn transport(bytes: Vec<u8>) -> IoTransport<Cursor<Vec<u8>>> {
        IoTransport::new(Cursor::new(bytes), Duration::from_millis(100))
    }

    #[test]
    fn test_no_data() {
        let mut t = transport(Vec::new());
        let mut engine = SyncEngine::new();
        assert!(matches!(engine.synchronize(&mut t), Err(DmmError::NoData)));
    }

    #[test]
    fn test_invalid_markers_consume_one_byte() {
        for byte in [0x0A, 0xF3] {
            let mut t = transport(vec![byte, 0x20, 0x30]);
            let mut engine = SyncEngine::new();
            match engine.synchronize(&mut t) {
                Err(DmmError::InvalidSyncMarker { byte: b }) => assert_eq!(b, byte),
                other => panic!("unexpected result: {:?}", other),
            }
            assert_eq!(t.get_ref().position(), 1);
            assert_eq!(engine.stats().invalid_markers, 1);
        }
    }

    #[test]
    fn test_discards_rest_of_frame() {
        // Sync byte at position 11, then positions 12..14, then a new frame
        let mut bytes = vec![0xB0, 0xC0, 0xD0, 0xE0];
        bytes.push(0x10);
        let mut t = transport(bytes);
        let mut engine = SyncEngine::new();
        engine.synchronize(&mut t).unwrap();
        assert_eq!(t.get_ref().position(), 4);
        assert_eq!(engine.stats().bytes_discarded, 3);
        assert_eq!(engine.stats().synchronizations, 1);
    }

    #[test]
    fn test_last_position_discards_nothing() {
        let mut t = transport(vec![0xE7, 0x10]);
        let mut engine = SyncEngine::new();
        engine.synchronize(&mut t).unwrap();
        assert_eq!(t.get_ref().position(), 1);
        assert_eq!(engine.stats().bytes_discarded, 0);
    }

    #[test]
    fn test_short_discard_is_not_an_error() {
        let mut t = transport(vec![0x20, 0x30]);
        let mut engine = SyncEngine::new();
        engine.synchronize(&mut t).unwrap();
        assert_eq!(engine.stats().bytes_discarded, 1);
    }
}
