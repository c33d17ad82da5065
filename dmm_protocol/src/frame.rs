/*!
Frame validation and decoding.

A frame is 14 bytes whose high nibbles count 1 through 14. Digit cells are
built from byte pairs, attribute flags from the low nibbles of six bytes.
*/

use crate::error::FrameError;
use crate::protocol::FRAME_LEN;
use crate::tables::{
    lookup_glyph, Attribute, Flag, Measurement, Reserved, Scale, ATTRIBUTE_BYTES, DIGIT_CELLS,
};
use serde::Serialize;

/// Position marker carried in the high nibble of a byte
pub fn position_marker(byte: u8) -> u8 {
    byte >> 4
}

/// An aligned 14-byte frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame {
    bytes: [u8; FRAME_LEN],
}

impl Frame {
    /// Validate length and position markers of raw frame bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, FrameError> {
        let bytes: [u8; FRAME_LEN] = bytes
            .try_into()
            .map_err(|_| FrameError::InvalidLength(bytes.len()))?;

        for (index, &byte) in bytes.iter().enumerate() {
            let marker = position_marker(byte);
            if marker as usize != index + 1 {
                return Err(FrameError::Misaligned {
                    position: index + 1,
                    marker,
                });
            }
        }

        Ok(Self { bytes })
    }

    /// Raw frame bytes
    pub fn as_bytes(&self) -> &[u8; FRAME_LEN] {
        &self.bytes
    }

    /// Byte at a 1-based frame position (1..=14)
    pub(crate) fn byte(&self, position: usize) -> u8 {
        self.bytes[position - 1]
    }

    /// Hex dump for diagnostics
    pub fn to_hex(&self) -> String {
        hex::encode(self.bytes)
    }

    /// Decode digit cells and attribute flags
    pub fn decode(&self) -> RawDecode {
        let digits = DIGIT_CELLS.map(|(first, second, marker)| {
            DigitCell::from_pair(self.byte(first), self.byte(second), marker)
        });

        let mut raw = RawDecode {
            digits,
            flags: Vec::new(),
            scales: Vec::new(),
            measurements: Vec::new(),
            reserved: Vec::new(),
        };

        for (position, attributes) in ATTRIBUTE_BYTES.iter() {
            let mut nibble = self.byte(*position) & 0x0F;
            let mut bit = 8u8;
            for attribute in attributes {
                if nibble >= bit {
                    nibble -= bit;
                    raw.record(*attribute);
                }
                bit /= 2;
            }
        }

        raw
    }
}

/// Validate and decode one assumed-aligned frame
pub fn decode_frame(bytes: &[u8]) -> Result<RawDecode, FrameError> {
    Ok(Frame::from_bytes(bytes)?.decode())
}

/// One display digit with its punctuation indicator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DigitCell {
    /// High bit of the first byte's low nibble
    pub high_bit: bool,
    /// Decoded glyph, `'X'` for unknown segment patterns
    pub glyph: char,
    /// Emitted before the glyph when `high_bit` is set
    pub marker: char,
}

impl DigitCell {
    fn from_pair(first: u8, second: u8, marker: char) -> Self {
        let low = first & 0x0F;
        Self {
            high_bit: low & 0x08 != 0,
            glyph: lookup_glyph(low & 0x07, second & 0x0F),
            marker,
        }
    }
}

/// Digits and flag categories decoded from a frame
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RawDecode {
    pub digits: [DigitCell; 4],
    pub flags: Vec<Flag>,
    pub scales: Vec<Scale>,
    pub measurements: Vec<Measurement>,
    pub reserved: Vec<Reserved>,
}

impl RawDecode {
    /// Record an attribute under its category
    pub fn record(&mut self, attribute: Attribute) {
        match attribute {
            Attribute::Flag(flag) => self.flags.push(flag),
            Attribute::Scale(scale) => self.scales.push(scale),
            Attribute::Measurement(measurement) => self.measurements.push(measurement),
            Attribute::Reserved(reserved) => self.reserved.push(reserved),
        }
    }

    pub fn has_flag(&self, flag: Flag) -> bool {
        self.flags.contains(&flag)
    }

    /// Digit string as shown on the display, e.g. `"-1.234"`
    pub fn raw_value(&self) -> String {
        let mut value = String::with_capacity(8);
        for cell in &self.digits {
            if cell.high_bit {
                value.push(cell.marker);
            }
            value.push(cell.glyph);
        }
        value
    }
}
