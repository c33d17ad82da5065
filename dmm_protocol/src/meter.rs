/*!
Reader session and retrying read orchestration.
*/

use crate::error::{DmmError, FrameError, Result};
use crate::frame::Frame;
use crate::protocol::FRAME_LEN;
use crate::sync::{SyncEngine, SyncStats};
use crate::transport::Transport;
use crate::value::{interpret, DecodedValue};
use tracing::{debug, info, warn};

/// A successful reading
#[derive(Debug, Clone, PartialEq)]
pub struct Reading {
    pub value: DecodedValue,
    /// Frame the value was decoded from
    pub frame: Frame,
    /// Failed attempts before this frame was read
    pub retries: usize,
}

/// Outcome of one read attempt
#[derive(Debug)]
enum Attempt {
    ShortRead(usize),
    Misaligned(FrameError),
    Aligned(Frame),
}

/// A reader session owning the meter's transport
pub struct Dmm<T> {
    transport: T,
    retries: usize,
    sync: SyncEngine,
}

impl<T: Transport> Dmm<T> {
    /// Open a session and align to the stream.
    ///
    /// `retries` bounds the attempts of each [`Dmm::read`].
    pub fn new(transport: T, retries: usize) -> Result<Self> {
        let mut dmm = Self {
            transport,
            retries,
            sync: SyncEngine::new(),
        };
        dmm.synchronize()?;
        info!("📟 Meter session ready (retries: {})", retries);
        Ok(dmm)
    }

    pub fn sync_stats(&self) -> SyncStats {
        self.sync.stats()
    }

    /// Realign to the next frame boundary
    pub fn synchronize(&mut self) -> Result<()> {
        self.sync.synchronize(&mut self.transport)
    }

    /// Take one reading, resynchronizing on short or misaligned frames.
    ///
    /// Fails with [`DmmError::ReadFailure`] when every attempt is used up;
    /// sync failures during a retry abort the read immediately.
    pub fn read(&mut self) -> Result<Reading> {
        for attempt in 0..self.retries {
            match self.attempt()? {
                Attempt::Aligned(frame) => {
                    debug!("Frame {} after {} retries", frame.to_hex(), attempt);
                    return Ok(Reading {
                        value: interpret(&frame.decode()),
                        frame,
                        retries: attempt,
                    });
                }
                Attempt::ShortRead(got) => {
                    warn!(
                        "⚠️ Short frame: {} of {} bytes (attempt {})",
                        got,
                        FRAME_LEN,
                        attempt + 1
                    );
                }
                Attempt::Misaligned(e) => {
                    warn!("⚠️ {} (attempt {})", e, attempt + 1);
                }
            }
            self.synchronize()?;
        }

        Err(DmmError::ReadFailure { attempts: self.retries })
    }

    fn attempt(&mut self) -> Result<Attempt> {
        let mut buf = [0u8; FRAME_LEN];
        let got = self.transport.read_bytes(&mut buf)?;
        if got != FRAME_LEN {
            return Ok(Attempt::ShortRead(got));
        }
        Ok(match Frame::from_bytes(&buf) {
            Ok(frame) => Attempt::Aligned(frame),
            Err(e) => Attempt::Misaligned(e),
        })
    }

    /// Close the session, handing back the transport
    pub fn into_inner(self) -> T {
        self.transport
    }
}
