/*!
Fixed lookup tables of the TP4000 frame layout.

Byte positions are 1-based, matching the position marker each byte carries
in its high nibble. The tables are plain data: decoding walks them rather
than branching on individual bits.
*/

use serde::Serialize;

/// General status flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Flag {
    #[serde(rename = "AC")]
    Ac,
    #[serde(rename = "DC")]
    Dc,
    #[serde(rename = "AUTO")]
    Auto,
    #[serde(rename = "RS232")]
    Rs232,
    #[serde(rename = "beep")]
    Beep,
    #[serde(rename = "REL-delta")]
    RelDelta,
    #[serde(rename = "Hold")]
    Hold,
}

impl Flag {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ac => "AC",
            Self::Dc => "DC",
            Self::Auto => "AUTO",
            Self::Rs232 => "RS232",
            Self::Beep => "beep",
            Self::RelDelta => "REL-delta",
            Self::Hold => "Hold",
        }
    }
}

/// Metric prefix applied to the displayed digits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Scale {
    Nano,
    Micro,
    Milli,
    Kilo,
    Mega,
}

impl Scale {
    /// Label used as the unit prefix in display text
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Nano => "nano",
            Self::Micro => "micro",
            Self::Milli => "milli",
            Self::Kilo => "kilo",
            Self::Mega => "mega",
        }
    }

    /// Factor converting displayed digits to base units
    pub fn multiplier(&self) -> f64 {
        match self {
            Self::Nano => 0.000_000_001,
            Self::Micro => 0.000_001,
            Self::Milli => 0.001,
            Self::Kilo => 1000.0,
            Self::Mega => 1_000_000.0,
        }
    }
}

/// Measurement unit or mode indicator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Measurement {
    Farads,
    Ohms,
    Amps,
    #[serde(rename = "volts")]
    Volts,
    Hertz,
    #[serde(rename = "%")]
    DutyCycle,
    #[serde(rename = "diode")]
    Diode,
    Celsius,
}

impl Measurement {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Farads => "Farads",
            Self::Ohms => "Ohms",
            Self::Amps => "Amps",
            Self::Volts => "volts",
            Self::Hertz => "Hertz",
            Self::DutyCycle => "%",
            Self::Diode => "diode",
            Self::Celsius => "Celsius",
        }
    }
}

/// Bits with no documented meaning, kept for diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Reserved {
    #[serde(rename = "other-13-1")]
    Other13_1,
    #[serde(rename = "other-14-4")]
    Other14_4,
    #[serde(rename = "other-14-2")]
    Other14_2,
    #[serde(rename = "other-14-1")]
    Other14_1,
}

impl Reserved {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Other13_1 => "other-13-1",
            Self::Other14_4 => "other-14-4",
            Self::Other14_2 => "other-14-2",
            Self::Other14_1 => "other-14-1",
        }
    }
}

/// A named bit, tagged with the category it is recorded under
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Attribute {
    Flag(Flag),
    Scale(Scale),
    Measurement(Measurement),
    Reserved(Reserved),
}

use self::Attribute::{Flag as F, Measurement as M, Reserved as R, Scale as S};

/// Attribute bytes and their flags, most significant bit (value 8) first
pub const ATTRIBUTE_BYTES: [(usize, [Attribute; 4]); 6] = [
    (1, [F(Flag::Ac), F(Flag::Dc), F(Flag::Auto), F(Flag::Rs232)]),
    (10, [S(Scale::Micro), S(Scale::Nano), S(Scale::Kilo), M(Measurement::Diode)]),
    (11, [S(Scale::Milli), M(Measurement::DutyCycle), S(Scale::Mega), F(Flag::Beep)]),
    (12, [M(Measurement::Farads), M(Measurement::Ohms), F(Flag::RelDelta), F(Flag::Hold)]),
    (
        13,
        [
            M(Measurement::Amps),
            M(Measurement::Volts),
            M(Measurement::Hertz),
            R(Reserved::Other13_1),
        ],
    ),
    (
        14,
        [
            R(Reserved::Other14_4),
            M(Measurement::Celsius),
            R(Reserved::Other14_2),
            R(Reserved::Other14_1),
        ],
    ),
];

/// Digit cells as (first byte, second byte, marker emitted when the high bit is set)
pub const DIGIT_CELLS: [(usize, usize, char); 4] =
    [(2, 3, '-'), (4, 5, '.'), (6, 7, '.'), (8, 9, '.')];

/// Glyph decoded from a segment pair that is not in [`DIGIT_TABLE`]
pub const UNKNOWN_GLYPH: char = 'X';

/// Segment pairs (low 3 bits of first byte, low nibble of second byte) to glyph
pub const DIGIT_TABLE: [((u8, u8), char); 12] = [
    ((0, 5), '1'),
    ((5, 11), '2'),
    ((1, 15), '3'),
    ((2, 7), '4'),
    ((3, 14), '5'),
    ((7, 14), '6'),
    ((1, 5), '7'),
    ((7, 15), '8'),
    ((3, 15), '9'),
    ((7, 13), '0'),
    ((6, 8), 'L'),
    ((0, 0), ' '),
];

/// Look up the glyph for a segment pair, falling back to [`UNKNOWN_GLYPH`]
pub fn lookup_glyph(high: u8, low: u8) -> char {
    DIGIT_TABLE
        .iter()
        .find(|(pair, _)| *pair == (high, low))
        .map(|&(_, glyph)| glyph)
        .unwrap_or(UNKNOWN_GLYPH)
}

/// Segment pair that encodes `glyph`, if the meter can display it
pub fn glyph_segments(glyph: char) -> Option<(u8, u8)> {
    DIGIT_TABLE
        .iter()
        .find(|&&(_, g)| g == glyph)
        .map(|&(pair, _)| pair)
}
