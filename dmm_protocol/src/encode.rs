/*!
Frame construction.

Inverse of the decoder tables: builds the 14 bytes a meter would send for a
given display and set of indicators. Used to simulate a meter and to write
frame-level tests.
*/

use crate::protocol::FRAME_LEN;
use crate::tables::{
    glyph_segments, Attribute, Flag, Measurement, Reserved, Scale, ATTRIBUTE_BYTES, DIGIT_CELLS,
};
use thiserror::Error;

/// Errors building a frame
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EncodeError {
    #[error("Glyph {0:?} cannot be shown on the display")]
    UnknownGlyph(char),

    #[error("Display text needs exactly 4 digits, got {0}")]
    DigitCount(usize),

    #[error("Sign or decimal point without a following digit")]
    DanglingMarker,

    #[error("Digit cell {0} out of range (0..=3)")]
    CellIndex(usize),
}

/// Segment bits of one digit cell: (high bit, 3-bit first nibble, 4-bit second nibble)
type Segments = (bool, u8, u8);

/// Builder for well-formed frames
#[derive(Debug, Clone)]
pub struct FrameBuilder {
    cells: [Segments; 4],
    attributes: Vec<Attribute>,
}

impl FrameBuilder {
    /// Blank display, no indicators
    pub fn new() -> Self {
        Self {
            cells: [(false, 0, 0); 4],
            attributes: Vec::new(),
        }
    }

    /// Set the four digit cells from display text such as `"-1.234"` or `" 0.L "`.
    ///
    /// A `-` may precede the first digit and a `.` any later digit.
    pub fn display(mut self, text: &str) -> Result<Self, EncodeError> {
        let mut index = 0;
        let mut marked = false;

        for c in text.chars() {
            let marker = DIGIT_CELLS.get(index).map(|&(_, _, marker)| marker);
            if !marked && marker == Some(c) {
                marked = true;
                continue;
            }
            let (high, low) = glyph_segments(c).ok_or(EncodeError::UnknownGlyph(c))?;
            if index < self.cells.len() {
                self.cells[index] = (marked, high, low);
            }
            index += 1;
            marked = false;
        }

        if marked {
            return Err(EncodeError::DanglingMarker);
        }
        if index != self.cells.len() {
            return Err(EncodeError::DigitCount(index));
        }
        Ok(self)
    }

    /// Set raw segment nibbles of one cell, including patterns the decoder does not know
    pub fn segments(
        mut self,
        cell: usize,
        high_bit: bool,
        first: u8,
        second: u8,
    ) -> Result<Self, EncodeError> {
        let slot = self.cells.get_mut(cell).ok_or(EncodeError::CellIndex(cell))?;
        *slot = (high_bit, first & 0x07, second & 0x0F);
        Ok(self)
    }

    pub fn attribute(mut self, attribute: Attribute) -> Self {
        if !self.attributes.contains(&attribute) {
            self.attributes.push(attribute);
        }
        self
    }

    pub fn flag(self, flag: Flag) -> Self {
        self.attribute(Attribute::Flag(flag))
    }

    pub fn scale(self, scale: Scale) -> Self {
        self.attribute(Attribute::Scale(scale))
    }

    pub fn measurement(self, measurement: Measurement) -> Self {
        self.attribute(Attribute::Measurement(measurement))
    }

    pub fn reserved(self, reserved: Reserved) -> Self {
        self.attribute(Attribute::Reserved(reserved))
    }

    /// Produce the frame bytes with position markers in every high nibble
    pub fn build(&self) -> [u8; FRAME_LEN] {
        let mut bytes = [0u8; FRAME_LEN];
        for (index, byte) in bytes.iter_mut().enumerate() {
            *byte = ((index + 1) as u8) << 4;
        }

        for (&(first, second, _), &(high_bit, high, low)) in DIGIT_CELLS.iter().zip(&self.cells) {
            bytes[first - 1] |= (if high_bit { 0x08 } else { 0 }) | high;
            bytes[second - 1] |= low;
        }

        for attribute in &self.attributes {
            for (position, attributes) in ATTRIBUTE_BYTES.iter() {
                if let Some(bit) = attributes.iter().position(|a| a == attribute) {
                    bytes[position - 1] |= 0x08u8 >> bit;
                }
            }
        }

        bytes
    }
}

impl Default for FrameBuilder {
    fn default() -> Self {
        Self::new()
    }
}
