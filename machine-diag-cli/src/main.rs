mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use machine_diag_core::{DiagnosticPipeline, DiagnosticResult, Verdict};

use cli::{Cli, Command};

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = cli.to_config()?;
    log::info!(
        "Server {} ({:?} responses), connect {:?}, read {:?}",
        config.server_url,
        config.response_profile,
        config.connect_timeout,
        config.read_timeout
    );
    log::info!("Running {}", cli.command.name());

    match &cli.command {
        Command::Diagnose { file } => {
            let pipeline = DiagnosticPipeline::new(config).context("invalid configuration")?;
            let result = pipeline.diagnose_file(file);
            report(&result, cli.json)
        }
        Command::Record {
            device, no_upload, ..
        } => record(config, device.as_deref(), *no_upload, cli.json),
        Command::Devices => list_devices(),
    }
}

fn report(result: &DiagnosticResult, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(result)?);
    } else {
        let marker = match result.verdict() {
            Verdict::Fault => "!!",
            Verdict::Normal => "ok",
            Verdict::Indeterminate => "??",
        };
        if result.confidence_display.is_empty() {
            println!("[{}] {}", marker, result.label);
        } else {
            println!("[{}] {} ({})", marker, result.label, result.confidence_display);
        }
    }
    match &result.error {
        Some(e) => Err(anyhow::anyhow!("diagnosis failed: {}", e)),
        None => Ok(()),
    }
}

#[cfg(feature = "microphone")]
fn record(
    config: machine_diag_core::DiagnosticConfig,
    device: Option<&str>,
    no_upload: bool,
    json: bool,
) -> Result<()> {
    use machine_diag_cpal::CpalMicrophone;

    let mic = match device {
        Some(name) => CpalMicrophone::with_name(name),
        None => CpalMicrophone::default_device(),
    };
    let pipeline = DiagnosticPipeline::new(config).context("invalid configuration")?;
    eprintln!("Listening...");

    if no_upload {
        let recording = pipeline.record(mic)?;
        if json {
            println!("{}", serde_json::to_string_pretty(&recording)?);
        } else {
            println!(
                "{} ({} samples, {:.2}s, sha256 {})",
                recording.file_path.display(),
                recording.sample_count,
                recording.duration_secs,
                recording.checksum
            );
        }
        return Ok(());
    }

    let result = pipeline.record_and_diagnose(mic);
    report(&result, json)
}

#[cfg(not(feature = "microphone"))]
fn record(
    _config: machine_diag_core::DiagnosticConfig,
    _device: Option<&str>,
    _no_upload: bool,
    _json: bool,
) -> Result<()> {
    anyhow::bail!("microphone support not compiled in; rebuild with `--features microphone`")
}

#[cfg(feature = "microphone")]
fn list_devices() -> Result<()> {
    for name in machine_diag_cpal::list_input_devices()? {
        println!("{}", name);
    }
    Ok(())
}

#[cfg(not(feature = "microphone"))]
fn list_devices() -> Result<()> {
    anyhow::bail!("microphone support not compiled in; rebuild with `--features microphone`")
}
