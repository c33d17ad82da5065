/*!
# DMM Reader

Continuously reads a TP4000-family bench multimeter over its RS-232 link
and prints each measurement.

## Features

- Frame synchronization from an arbitrary point in the meter's stream
- Bounded retries with automatic resynchronization
- Text or JSON-lines output, optional timestamps
- TOML configuration file with command-line overrides
- Simulated meter for running without hardware

## Usage

### Read from a meter
```bash
dmmreader read --port /dev/ttyUSB0
```

### JSON output, ten readings
```bash
dmmreader read --json --count 10
```

### No hardware
```bash
dmmreader read --simulate
```

### Generate a configuration file
```bash
dmmreader config --output dmmreader.toml
```
*/

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use dmm_protocol::IoTransport;
use std::path::{Path, PathBuf};
use std::sync::atomic::Ordering;
use std::time::Duration;
use tracing::{info, warn, Level};

mod capture;
mod config;
mod simulator;

use capture::{open_serial, MeterReader};
use config::{AppConfig, OutputFormat};
use simulator::SimulatedMeter;

#[derive(Parser)]
#[command(name = "dmmreader")]
#[command(about = "Read measurements from a TP4000-family multimeter over RS-232")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Configuration file path
    #[arg(short, long, default_value = "dmmreader.toml")]
    config: PathBuf,

    /// Log protocol details (sync, retries) to stderr
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Read measurements until interrupted
    Read {
        /// Serial device path
        #[arg(short, long)]
        port: Option<String>,

        /// Read attempts per reading
        #[arg(short, long)]
        retries: Option<usize>,

        /// Read timeout in seconds
        #[arg(short, long)]
        timeout: Option<f64>,

        /// Output format
        #[arg(short, long, value_enum)]
        format: Option<OutputFormat>,

        /// Shorthand for --format json
        #[arg(long, conflicts_with = "format")]
        json: bool,

        /// Prefix readings with the local time
        #[arg(long)]
        timestamps: bool,

        /// Do not print the numeric value line
        #[arg(long)]
        no_numeric: bool,

        /// Stop after this many readings
        #[arg(short = 'n', long)]
        count: Option<u64>,

        /// Read from a simulated meter instead of a serial port
        #[arg(long)]
        simulate: bool,
    },

    /// Generate configuration file
    Config {
        /// Output path for configuration file
        #[arg(short, long, default_value = "dmmreader.toml")]
        output: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logging goes to stderr so stdout carries only readings
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(if cli.verbose { Level::DEBUG } else { Level::INFO })
        .init();

    match cli.command {
        Some(Commands::Config { output }) => generate_config_file(&output),

        Some(Commands::Read {
            port,
            retries,
            timeout,
            format,
            json,
            timestamps,
            no_numeric,
            count,
            simulate,
        }) => {
            let mut config = load_config(&cli.config)?;
            if let Some(port) = port {
                config.meter.port = port;
            }
            if let Some(retries) = retries {
                config.meter.retries = retries;
            }
            if let Some(timeout) = timeout {
                config.meter.timeout_seconds = timeout;
            }
            if let Some(format) = format {
                config.output.format = format;
            }
            if json {
                config.output.format = OutputFormat::Json;
            }
            if timestamps {
                config.output.timestamps = true;
            }
            if no_numeric {
                config.output.show_numeric = false;
            }
            if let Some(count) = count {
                config.output.count = count;
            }
            config.validate()?;
            run_reader(config, simulate)
        }

        None => {
            let config = load_config(&cli.config)?;
            run_reader(config, false)
        }
    }
}

/// Load the configuration file, falling back to defaults when it does not exist
fn load_config(path: &Path) -> Result<AppConfig> {
    if path.exists() {
        info!("📝 Loading configuration from {}", path.display());
        AppConfig::load_from_file(path)
    } else {
        info!("No configuration at {}, using defaults", path.display());
        Ok(AppConfig::new())
    }
}

/// Run the read loop against the configured port or the simulator
fn run_reader(config: AppConfig, simulate: bool) -> Result<()> {
    let reader = MeterReader::new(config.meter.retries, config.output.clone());

    // Set up Ctrl+C handler
    let running = reader.get_running_flag();
    ctrlc::set_handler(move || {
        warn!("🛑 Received Ctrl+C, stopping after the current read");
        running.store(false, Ordering::SeqCst);
    })
    .context("Failed to install Ctrl+C handler")?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    if simulate {
        info!("🧪 Reading from simulated meter");
        let meter = SimulatedMeter::new(Duration::from_millis(400)).with_glitches(20);
        reader.run(IoTransport::new(meter, config.meter.timeout()), &mut out)?;
    } else {
        let transport = open_serial(&config.meter)?;
        reader.run(transport, &mut out)?;
    }

    info!("✅ Reader stopped");
    Ok(())
}

/// Generate a default configuration file
fn generate_config_file(output_path: &Path) -> Result<()> {
    let config = AppConfig::new();
    config.save_to_file(output_path)?;

    info!("✅ Generated configuration file: {}", output_path.display());
    info!("📝 Edit the file to customize settings, then run:");
    info!("   dmmreader --config {} read", output_path.display());

    Ok(())
}
