//! moth-hid CLI: command-line AudioMoth configuration tool.

use anyhow::{Context, Result};
use clap::error::ErrorKind;
use clap::{Args, Parser, Subcommand, ValueEnum};
use moth_hid_core::hid::{HidApiBackend, DEFAULT_READ_TIMEOUT_MS};
use moth_hid_core::error::ValidationError;
use moth_hid_core::{device, manager, ConfigurationRecord, DeviceDescriptor, Field, Overrides};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "moth-hid", version, about = "AudioMoth configuration tool")]
struct Cli {
    /// Level for logging (overridden by RUST_LOG).
    #[arg(
        short = 'l',
        long,
        alias = "log_level",
        value_enum,
        ignore_case = true,
        default_value_t = LogLevel::Info
    )]
    log_level: LogLevel,

    /// Serial number of the AudioMoth to use.
    #[arg(short = 's', long, alias = "serial_number")]
    serial_number: Option<String>,

    /// How long to wait for a device reply, in milliseconds.
    #[arg(long, default_value_t = DEFAULT_READ_TIMEOUT_MS)]
    timeout_ms: i32,

    /// Print results as JSON.
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Clone, Copy, ValueEnum)]
enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    fn directive(self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// List all HID devices.
    List,
    /// Show the AudioMoth that commands would talk to.
    Moths,
    /// Get the active configuration.
    Get,
    /// Change the active configuration.
    Set(SetArgs),
    /// Restore the persisted configuration.
    Restore,
    /// Persist the active configuration to flash.
    Persist,
}

// Values are kept as text so the core reports non-integers as type
// mismatches, the same way it reports values too wide for the wire.
#[derive(Args, Default)]
struct SetArgs {
    /// Device clock, seconds since the Unix epoch.
    #[arg(long)]
    time: Option<String>,
    /// Gain (0-4).
    #[arg(short = 'g', long)]
    gain: Option<String>,
    /// Clock divider.
    #[arg(short = 'c', long, alias = "clock_divider")]
    clock_divider: Option<String>,
    /// Acquisition cycles.
    #[arg(short = 'a', long, alias = "acquisition_cycles")]
    acquisition_cycles: Option<String>,
    /// Oversample rate.
    #[arg(short = 'o', long, alias = "oversamplerate")]
    oversample_rate: Option<String>,
    /// Sample rate in Hz (8000, 16000, 32000, 48000, 96000, 192000, 250000, 384000).
    #[arg(short = 's', long, alias = "samplerate")]
    sample_rate: Option<String>,
    /// Sample rate divider.
    #[arg(short = 'd', long, alias = "samplerate_divider")]
    sample_rate_divider: Option<String>,
    /// Lower filter frequency in Hz (multiple of 100, at most half the sample rate).
    #[arg(short = 'l', long, alias = "lower_filter_freq")]
    lower_filter_freq: Option<String>,
    /// Higher filter frequency in Hz (multiple of 100, at most half the sample rate).
    #[arg(short = 'f', long, alias = "higher_filter_freq")]
    higher_filter_freq: Option<String>,
}

impl SetArgs {
    fn overrides(&self) -> Result<Overrides, ValidationError> {
        let mut overrides = Overrides::new();
        for field in Field::ALL {
            let text = match field {
                Field::Time => &self.time,
                Field::Gain => &self.gain,
                Field::ClockDivider => &self.clock_divider,
                Field::AcquisitionCycles => &self.acquisition_cycles,
                Field::OversampleRate => &self.oversample_rate,
                Field::SampleRate => &self.sample_rate,
                Field::SampleRateDivider => &self.sample_rate_divider,
                Field::LowerFilterFreq => &self.lower_filter_freq,
                Field::HigherFilterFreq => &self.higher_filter_freq,
            };
            if let Some(text) = text {
                overrides.set_str(field, text)?;
            }
        }
        Ok(overrides)
    }
}

fn init_logging(level: LogLevel) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.directive()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn parse_cli() -> Cli {
    match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if e.kind() == ErrorKind::InvalidSubcommand => {
            let _ = e.print();
            std::process::exit(1);
        }
        Err(e) => e.exit(),
    }
}

fn print_devices(devices: &[DeviceDescriptor], json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(devices)?);
    } else {
        for dev in devices {
            println!("{dev}");
        }
    }
    Ok(())
}

fn print_config(config: &ConfigurationRecord, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(config)?);
    } else {
        println!("{config}");
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = parse_cli();
    init_logging(cli.log_level);

    let Some(command) = cli.command else {
        tracing::error!("No command given; see --help");
        std::process::exit(1);
    };

    let backend =
        HidApiBackend::with_read_timeout(cli.timeout_ms).context("failed to initialise hidapi")?;
    let serial = cli.serial_number.as_deref();

    match command {
        Commands::List => {
            let devices = device::enumerate_all(&backend)?;
            if devices.is_empty() && !cli.json {
                println!("No HID devices found.");
            } else {
                print_devices(&devices, cli.json)?;
            }
        }
        Commands::Moths => {
            let moth = device::find(&backend, serial)?;
            print_devices(std::slice::from_ref(&moth), cli.json)?;
        }
        Commands::Get => {
            let config = manager::read_config(&backend, serial)?;
            print_config(&config, cli.json)?;
        }
        Commands::Set(args) => {
            let overrides = args.overrides()?;
            let config = manager::write_config(&backend, serial, &overrides)?;
            print_config(&config, cli.json)?;
        }
        Commands::Restore => {
            manager::restore(&backend, serial)?;
            println!("Persisted configuration restored");
        }
        Commands::Persist => {
            manager::persist(&backend, serial)?;
            println!("Configuration persisted");
        }
    }

    Ok(())
}
