/*!
# DMM Protocol

Decoding pipeline for the binary telemetry stream of TP4000-family bench
multimeters (TekPower TP4000ZC, Digitek DT-4000ZC and relabels).

The meter emits an unframed stream of 14-byte frames at 2400 baud. Every
byte carries its 1-based frame position in the high nibble and payload in
the low nibble. This crate recovers frame alignment, decodes digit and flag
nibbles, and turns the result into a validated measurement.

## Core Types

- [`Dmm`] - Reader session over a [`Transport`]
- [`Frame`] - One aligned 14-byte frame
- [`RawDecode`] - Digit cells and flag categories of a frame
- [`DecodedValue`] - Sanity-checked measurement with display text

## Modules

- [`tables`] - Digit and attribute lookup tables
- [`frame`] - Frame validation and decoding
- [`value`] - Measurement interpretation
- [`sync`] - Frame boundary recovery
- [`meter`] - Retrying read orchestration
- [`transport`] - Byte source abstraction
- [`encode`] - Frame construction (simulation and tests)
- [`error`] - Error types
*/

pub mod encode;
pub mod error;
pub mod frame;
pub mod meter;
pub mod sync;
pub mod tables;
pub mod transport;
pub mod value;

// Re-export commonly used types
pub use encode::{EncodeError, FrameBuilder};
pub use error::{DmmError, FrameError, Result};
pub use frame::{decode_frame, DigitCell, Frame, RawDecode};
pub use meter::{Dmm, Reading};
pub use sync::{SyncEngine, SyncStats};
pub use tables::{Attribute, Flag, Measurement, Reserved, Scale};
pub use transport::{IoTransport, Transport};
pub use value::{interpret, Coupling, DecodedValue};

/// Version information for the protocol library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Protocol constants
pub mod protocol {
    use std::time::Duration;

    /// Size of a frame in bytes
    pub const FRAME_LEN: usize = 14;

    /// Serial line speed used by the meter
    pub const BAUD_RATE: u32 = 2400;

    /// Default number of read attempts per reading
    pub const DEFAULT_RETRIES: usize = 3;

    /// Default transport read timeout
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(3);

    /// Display text of a reading that failed consistency checks
    pub const INVALID_TEXT: &str = "Invalid Value";
}
