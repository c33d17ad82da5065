/*!
Measurement interpretation.

Turns a [`RawDecode`] into a [`DecodedValue`], rejecting flag combinations
a real meter display cannot show. An inconsistent frame is not an error:
it yields a value with `sane == false` and the "Invalid Value" text.
*/

use crate::frame::RawDecode;
use crate::protocol::INVALID_TEXT;
use crate::tables::{Flag, Measurement, Reserved, Scale, UNKNOWN_GLYPH};
use serde::Serialize;
use std::fmt;
use tracing::debug;

/// AC/DC indicator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Coupling {
    #[serde(rename = "AC")]
    Ac,
    #[serde(rename = "DC")]
    Dc,
}

impl Coupling {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ac => "AC",
            Self::Dc => "DC",
        }
    }
}

/// A decoded, sanity-checked meter reading
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecodedValue {
    /// Digit string as assembled from the display cells
    pub raw_value: String,
    /// Canonical numeric rendering, or the raw string when it does not parse
    pub value_text: String,
    pub scale: Option<Scale>,
    pub multiplier: f64,
    pub measurement: Option<Measurement>,
    pub coupling: Option<Coupling>,
    pub delta: bool,
    pub sane: bool,
    /// Value in base units; `None` when not sane or not numeric (e.g. overload "0.L")
    pub numeric: Option<f64>,
    /// Human-readable text, e.g. `"delta -1.234 millivolts DC"`
    pub text: String,
    /// All status flags as decoded, including AUTO, RS232, beep and Hold
    pub flags: Vec<Flag>,
    pub reserved: Vec<Reserved>,
}

impl fmt::Display for DecodedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Interpret a raw decode; never fails
pub fn interpret(raw: &RawDecode) -> DecodedValue {
    let mut sane = true;

    let ac = raw.has_flag(Flag::Ac);
    let dc = raw.has_flag(Flag::Dc);
    let coupling = match (ac, dc) {
        (true, true) => {
            debug!("AC and DC both set");
            sane = false;
            None
        }
        (true, false) => Some(Coupling::Ac),
        (false, true) => Some(Coupling::Dc),
        (false, false) => None,
    };

    let delta = raw.has_flag(Flag::RelDelta);

    let scale = match raw.scales.as_slice() {
        [] => None,
        [scale] => Some(*scale),
        scales => {
            debug!("Conflicting scale flags: {:?}", scales);
            sane = false;
            None
        }
    };
    let multiplier = scale.map_or(1.0, |s| s.multiplier());

    let measurement = match raw.measurements.as_slice() {
        [measurement] => Some(*measurement),
        measurements => {
            debug!("Expected one measurement flag, got {:?}", measurements);
            sane = false;
            None
        }
    };

    let raw_value = raw.raw_value();
    let mut value_text = raw_value.clone();
    let mut parsed = None;

    if raw_value.contains(UNKNOWN_GLYPH) || raw_value.matches('.').count() > 1 {
        debug!("Unreadable digits: {:?}", raw_value);
        sane = false;
    } else {
        match raw_value.trim().parse::<f64>() {
            Ok(n) => {
                // Debug formatting keeps a fractional part: "5.0", "-1.234"
                value_text = format!("{:?}", n);
                parsed = Some(n);
            }
            Err(_) => debug!("Non-numeric display: {:?}", raw_value),
        }
    }

    let (numeric, text) = if sane {
        let text = format!(
            "{}{} {}{}{}",
            if delta { "delta " } else { "" },
            value_text,
            scale.map_or("", |s| s.as_str()),
            measurement.map_or("", |m| m.as_str()),
            coupling.map_or(String::new(), |c| format!(" {}", c.as_str())),
        );
        (parsed.map(|n| n * multiplier), text)
    } else {
        (None, INVALID_TEXT.to_string())
    };

    DecodedValue {
        raw_value,
        value_text,
        scale,
        multiplier,
        measurement,
        coupling,
        delta,
        sane,
        numeric,
        text,
        flags: raw.flags.clone(),
        reserved: raw.reserved.clone(),
    }
}
