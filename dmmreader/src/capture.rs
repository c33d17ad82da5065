/*!
Continuous reading loop.

Opens the meter link, keeps a reader session aligned, and prints every
reading until interrupted or a configured count is reached.
*/

use crate::config::{MeterConfig, OutputConfig, OutputFormat};
use anyhow::{Context, Result};
use chrono::Local;
use dmm_protocol::{DecodedValue, Dmm, DmmError, IoTransport, Reading, Transport};
use serde::Serialize;
use serialport::{DataBits, FlowControl, Parity, SerialPort, StopBits};
use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// Longest a single port read may block before the transport checks its deadline
const PORT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Per-read timeout of the port, never longer than the transport timeout
fn port_timeout(meter: &MeterConfig) -> Duration {
    meter.timeout().min(PORT_POLL_INTERVAL)
}

/// Open the meter's serial port at 8N1 with the configured timeout
pub fn open_serial(meter: &MeterConfig) -> Result<IoTransport<Box<dyn SerialPort>>> {
    info!("🔌 Opening {} at {} baud", meter.port, meter.baud_rate);

    let port = serialport::new(&meter.port, meter.baud_rate)
        .data_bits(DataBits::Eight)
        .parity(Parity::None)
        .stop_bits(StopBits::One)
        .flow_control(FlowControl::None)
        .timeout(port_timeout(meter))
        .open()
        .with_context(|| format!("Failed to open serial port {}", meter.port))?;

    Ok(IoTransport::new(port, meter.timeout()))
}

/// Counters for one reading session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub readings: u64,
    pub invalid_readings: u64,
    pub read_failures: u64,
    pub sync_errors: u64,
}

/// One JSON output line
#[derive(Serialize)]
struct ReadingRecord<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    timestamp: Option<String>,
    retries: usize,
    frame: String,
    #[serde(flatten)]
    value: &'a DecodedValue,
}

/// Meter reader driving the read loop
pub struct MeterReader {
    retries: usize,
    output: OutputConfig,
    running: Arc<AtomicBool>,
}

impl MeterReader {
    pub fn new(retries: usize, output: OutputConfig) -> Self {
        Self {
            retries,
            output,
            running: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Get a reference to the running flag for external control
    pub fn get_running_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Read until stopped, writing readings to `out`.
    ///
    /// Sync and retry failures are logged and reading continues; transport
    /// I/O errors end the session.
    pub fn run<T: Transport, W: Write>(
        &self,
        mut transport: T,
        out: &mut W,
    ) -> Result<SessionStats> {
        let mut stats = SessionStats::default();

        let mut dmm = loop {
            if !self.is_running() {
                return Ok(stats);
            }
            match Dmm::new(&mut transport, self.retries) {
                Ok(dmm) => break dmm,
                Err(DmmError::Io(e)) => return Err(e).context("Meter link failed"),
                Err(e) => {
                    warn!("⚠️ Initial synchronization failed: {}", e);
                    stats.sync_errors += 1;
                }
            }
        };

        while self.is_running() && (self.output.count == 0 || stats.readings < self.output.count) {
            match dmm.read() {
                Ok(reading) => {
                    stats.readings += 1;
                    if !reading.value.sane {
                        stats.invalid_readings += 1;
                    }
                    self.write_reading(out, &reading)?;
                }
                Err(DmmError::Io(e)) => return Err(e).context("Meter link failed"),
                Err(e @ DmmError::ReadFailure { .. }) => {
                    warn!("⚠️ {}", e);
                    stats.read_failures += 1;
                }
                Err(e) => {
                    warn!("⚠️ {}", e);
                    stats.sync_errors += 1;
                }
            }
        }

        let sync = dmm.sync_stats();
        info!("📊 Session stats:");
        info!("   Readings: {}", stats.readings);
        info!("   Invalid readings: {}", stats.invalid_readings);
        info!("   Read failures: {}", stats.read_failures);
        info!("   Sync errors: {}", stats.sync_errors);
        info!(
            "   Synchronizations: {} ({} bytes discarded)",
            sync.synchronizations, sync.bytes_discarded
        );

        Ok(stats)
    }

    fn write_reading<W: Write>(&self, out: &mut W, reading: &Reading) -> Result<()> {
        let timestamp = self
            .output
            .timestamps
            .then(|| Local::now().format("%Y-%m-%d %H:%M:%S%.3f").to_string());

        match self.output.format {
            OutputFormat::Text => {
                let prefix = timestamp.map(|t| format!("[{}] ", t)).unwrap_or_default();
                writeln!(out, "{}{}", prefix, reading.value)?;
                if self.output.show_numeric {
                    match reading.value.numeric {
                        Some(n) => writeln!(out, "{}{}", prefix, n)?,
                        None => writeln!(out, "{}-", prefix)?,
                    }
                }
            }
            OutputFormat::Json => {
                let record = ReadingRecord {
                    timestamp,
                    retries: reading.retries,
                    frame: reading.frame.to_hex(),
                    value: &reading.value,
                };
                let line = serde_json::to_string(&record).context("Failed to encode reading")?;
                writeln!(out, "{}", line)?;
            }
        }

        if let Err(e) = out.flush() {
            error!("❌ Failed to flush output: {}", e);
        }
        Ok(())
    }
}
