/*!
Synthetic meter for running without hardware.

Produces the byte stream of a meter measuring a slowly drifting DC voltage.
The stream opens mid-frame and can periodically drop a byte, so the
synchronization and retry paths run just as they would on a real link.
*/

use dmm_protocol::protocol::FRAME_LEN;
use dmm_protocol::{Flag, FrameBuilder, Measurement};
use std::collections::VecDeque;
use std::io::{self, Read};
use std::thread;
use std::time::Duration;
use tracing::debug;

/// Byte position (0-based) the stream starts at
const START_OFFSET: usize = 5;

/// Simulated meter byte source
pub struct SimulatedMeter {
    pending: VecDeque<u8>,
    frame_number: u64,
    interval: Duration,
    glitch_every: u64,
}

impl SimulatedMeter {
    /// Emit one frame per `interval`
    pub fn new(interval: Duration) -> Self {
        Self {
            pending: VecDeque::new(),
            frame_number: 0,
            interval,
            glitch_every: 0,
        }
    }

    /// Drop the last byte of every `every`-th frame (0 disables)
    pub fn with_glitches(mut self, every: u64) -> Self {
        self.glitch_every = every;
        self
    }

    /// Voltage shown in a given frame, between 1.25 and 1.75 V
    pub fn voltage(frame_number: u64) -> f64 {
        1.5 + 0.25 * (frame_number as f64 * 0.1).sin()
    }

    fn next_frame(&mut self) -> io::Result<Vec<u8>> {
        let text = format!("{:.3}", Self::voltage(self.frame_number));
        let frame: [u8; FRAME_LEN] = FrameBuilder::new()
            .display(&text)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?
            .flag(Flag::Dc)
            .flag(Flag::Auto)
            .flag(Flag::Rs232)
            .measurement(Measurement::Volts)
            .build();

        let mut bytes = frame.to_vec();
        if self.frame_number == 0 {
            bytes = bytes.split_off(START_OFFSET);
        } else if self.glitch_every > 0 && self.frame_number % self.glitch_every == 0 {
            debug!("🧪 Dropping a byte from frame {}", self.frame_number);
            bytes.pop();
        }

        self.frame_number += 1;
        Ok(bytes)
    }
}

impl Read for SimulatedMeter {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.pending.is_empty() {
            if !self.interval.is_zero() && self.frame_number > 0 {
                thread::sleep(self.interval);
            }
            let bytes = self.next_frame()?;
            self.pending.extend(bytes);
        }

        let n = buf.len().min(self.pending.len());
        for (slot, byte) in buf.iter_mut().zip(self.pending.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }
}
