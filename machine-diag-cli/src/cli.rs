//! Command-line parsing and its mapping onto `DiagnosticConfig`.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, Result};
use clap::{ArgAction, Parser, Subcommand};
use machine_diag_core::{DiagnosticConfig, ResponseProfile, DEFAULT_SERVER_URL};

/// Diagnose a machine from the sound it makes.
#[derive(Debug, Parser, Clone)]
#[command(name = "machine-diag", about = "Machine sound fault diagnosis client", author, version)]
pub struct Cli {
    /// Server base URL, or a bare LAN host/IP (served on port 5000)
    #[arg(long, env = "MACHINE_DIAG_SERVER", default_value = DEFAULT_SERVER_URL, global = true)]
    pub server: String,

    /// Response format the server speaks: tolerant or legacy
    #[arg(long, env = "MACHINE_DIAG_PROFILE", default_value = "tolerant", global = true)]
    pub profile: ResponseProfile,

    /// Connection timeout in milliseconds
    #[arg(long = "connect-timeout-ms", default_value_t = 10_000, global = true)]
    pub connect_timeout_ms: u64,

    /// Response timeout in milliseconds
    #[arg(long = "read-timeout-ms", default_value_t = 10_000, global = true)]
    pub read_timeout_ms: u64,

    /// Extra request header as NAME:VALUE (repeatable)
    #[arg(long = "header", action = ArgAction::Append, value_name = "NAME:VALUE", global = true)]
    pub headers: Vec<String>,

    /// Send the ngrok interstitial bypass header
    #[arg(long = "skip-tunnel-warning", default_value_t = false, global = true)]
    pub skip_tunnel_warning: bool,

    /// Print the result as JSON
    #[arg(long, default_value_t = false, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Upload an existing audio file for diagnosis
    Diagnose {
        /// WAV file to upload
        file: PathBuf,
    },
    /// Record from the microphone, then upload the clip
    Record {
        /// Clip length in seconds
        #[arg(long, default_value_t = 5.0)]
        seconds: f64,

        /// Capture sample rate in Hz
        #[arg(long = "sample-rate", default_value_t = 22050)]
        sample_rate: u32,

        /// Directory for the working recording file
        #[arg(long = "output-dir")]
        output_dir: Option<PathBuf>,

        /// Input device name (default input when omitted)
        #[arg(long)]
        device: Option<String>,

        /// Keep the recording and skip the upload
        #[arg(long = "no-upload", default_value_t = false)]
        no_upload: bool,
    },
    /// List input devices
    Devices,
}

impl Command {
    /// Subcommand name as typed on the command line.
    pub fn name(&self) -> &'static str {
        match self {
            Command::Diagnose { .. } => "diagnose",
            Command::Record { .. } => "record",
            Command::Devices => "devices",
        }
    }
}

impl Cli {
    pub fn to_config(&self) -> Result<DiagnosticConfig> {
        let mut config = DiagnosticConfig {
            server_url: self.server.clone(),
            connect_timeout: Duration::from_millis(self.connect_timeout_ms),
            read_timeout: Duration::from_millis(self.read_timeout_ms),
            extra_headers: self
                .headers
                .iter()
                .map(|h| parse_header(h))
                .collect::<Result<Vec<_>>>()?,
            skip_tunnel_warning: self.skip_tunnel_warning,
            response_profile: self.profile,
            ..Default::default()
        };

        if let Command::Record {
            seconds,
            sample_rate,
            output_dir,
            ..
        } = &self.command
        {
            config.capture_secs = *seconds;
            config.sample_rate = *sample_rate;
            if let Some(dir) = output_dir {
                config.output_directory = dir.clone();
            }
        }

        config.validate().map_err(|e| anyhow!(e))?;
        Ok(config)
    }
}

fn parse_header(raw: &str) -> Result<(String, String)> {
    let (name, value) = raw
        .split_once(':')
        .ok_or_else(|| anyhow!("header {:?} is not NAME:VALUE", raw))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(anyhow!("header {:?} has an empty name", raw));
    }
    Ok((name.to_string(), value.trim().to_string()))
}
