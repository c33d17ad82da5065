//! Byte stream to display text, through the public API.

use dmm_protocol::protocol::{FRAME_LEN, INVALID_TEXT};
use dmm_protocol::{
    decode_frame, interpret, Dmm, DmmError, Flag, FrameBuilder, FrameError, IoTransport,
    Measurement, Scale, SyncEngine, Transport,
};
use std::collections::VecDeque;
use std::io::Cursor;
use std::time::Duration;

/// Meter link that delivers one burst per read, like a flaky cable
struct Bursts(VecDeque<Vec<u8>>);

impl Transport for Bursts {
    fn read_bytes(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let burst = self.0.pop_front().unwrap_or_default();
        let n = burst.len().min(buf.len());
        buf[..n].copy_from_slice(&burst[..n]);
        Ok(n)
    }
}

fn transport(bytes: Vec<u8>) -> IoTransport<Cursor<Vec<u8>>> {
    IoTransport::new(Cursor::new(bytes), Duration::from_millis(50))
}

/// Stream that opens at `offset` (0-based) inside the first frame
fn stream_from(offset: usize, frames: &[[u8; FRAME_LEN]]) -> Vec<u8> {
    let mut bytes = frames[0][offset..].to_vec();
    for frame in frames {
        bytes.extend_from_slice(frame);
    }
    bytes
}

#[test]
fn millivolt_reading() {
    let frame = FrameBuilder::new()
        .display("-1.234")
        .unwrap()
        .scale(Scale::Milli)
        .measurement(Measurement::Volts)
        .build();

    let mut dmm = Dmm::new(transport(stream_from(5, &[frame])), 3).unwrap();
    let reading = dmm.read().unwrap();

    assert!(reading.value.sane);
    assert_eq!(reading.value.text, "-1.234 millivolts");
    let numeric = reading.value.numeric.unwrap();
    assert!((numeric - (-0.001234)).abs() < 1e-12, "got {}", numeric);
}

#[test]
fn contradictory_coupling_is_invalid() {
    let frame = FrameBuilder::new()
        .display("-1.234")
        .unwrap()
        .measurement(Measurement::Ohms)
        .flag(Flag::Ac)
        .flag(Flag::Dc)
        .build();

    let mut dmm = Dmm::new(transport(stream_from(13, &[frame])), 3).unwrap();
    let reading = dmm.read().unwrap();

    assert!(!reading.value.sane);
    assert_eq!(reading.value.text, INVALID_TEXT);
    assert_eq!(reading.value.numeric, None);
}

#[test]
fn invalid_sync_marker_reads_one_byte() {
    let mut t = transport(vec![0xF4, 0x10, 0x20]);
    let mut engine = SyncEngine::new();

    let err = engine.synchronize(&mut t).unwrap_err();
    assert!(matches!(err, DmmError::InvalidSyncMarker { byte: 0xF4 }));
    assert_eq!(t.into_inner().position(), 1);
}

#[test]
fn short_frames_fail_after_retry_limit() {
    let short = vec![0x10, 0x20, 0x30, 0x40];
    let mut bursts = vec![vec![0xE0]];
    for _ in 0..3 {
        bursts.push(short.clone());
        bursts.push(vec![0xE0]);
    }

    let mut dmm = Dmm::new(Bursts(bursts.into()), 3).unwrap();
    assert!(matches!(dmm.read(), Err(DmmError::ReadFailure { attempts: 3 })));
}

#[test]
fn silent_meter_after_short_frame() {
    let mut bytes = vec![0xE0];
    bytes.extend_from_slice(&[0x10, 0x20, 0x30]);

    let mut dmm = Dmm::new(transport(bytes), 3).unwrap();
    // Resync after the short read finds nothing
    assert!(matches!(dmm.read(), Err(DmmError::NoData)));
}

#[test]
fn misaligned_frame_is_rejected_without_decode() {
    let mut frame = FrameBuilder::new().display(" 123").unwrap().build();
    frame[6] = 0x07;
    assert_eq!(
        decode_frame(&frame),
        Err(FrameError::Misaligned { position: 7, marker: 0 })
    );
}

#[test]
fn garbage_digit_forces_invalid() {
    let frame = FrameBuilder::new()
        .display(" 123")
        .unwrap()
        .segments(2, false, 6, 1)
        .unwrap()
        .measurement(Measurement::Volts)
        .build();

    let raw = decode_frame(&frame).unwrap();
    assert_eq!(raw.digits[2].glyph, 'X');
    let value = interpret(&raw);
    assert!(!value.sane);
    assert_eq!(value.text, INVALID_TEXT);
}

#[test]
fn consecutive_readings_stay_aligned() {
    let first = FrameBuilder::new()
        .display("0.999")
        .unwrap()
        .scale(Scale::Kilo)
        .measurement(Measurement::Hertz)
        .build();
    let second = FrameBuilder::new()
        .display(" 24.0")
        .unwrap()
        .measurement(Measurement::Celsius)
        .flag(Flag::Hold)
        .build();

    let mut dmm = Dmm::new(transport(stream_from(0, &[first, second])), 3).unwrap();
    let a = dmm.read().unwrap();
    let b = dmm.read().unwrap();

    assert_eq!(a.value.text, "0.999 kiloHertz");
    assert_eq!(a.value.numeric, Some(0.999 * 1000.0));
    assert_eq!(b.value.text, "24.0 Celsius");
    assert_eq!(b.value.flags, vec![Flag::Hold]);
}
