use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};

use obf_export::app::ViewerPicker;
use obf_export::config::ChannelConfig;
use obf_export::pipeline::{load_limits, AutoPicker, ContrastPicker, LimitsPicker, Pipeline};

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum Mode {
    /// Pick contrast limits per file in the viewer window
    Viewer,
    /// Use each channel's data range
    Auto,
    /// Apply limits saved from the viewer (--limits)
    Limits,
}

#[derive(Parser, Debug)]
#[command(
    name = "obf-export",
    about = "Adjust contrast of OBF microscopy channels and export them as 8-bit multi-page TIFFs."
)]
#[command(version)]
struct Cli {
    /// Directory containing .obf files
    #[arg(value_name = "INPUT_DIR", default_value = "data/separate")]
    input: PathBuf,

    /// Output directory (created if missing) [default: INPUT_DIR/output]
    #[arg(short, long, value_name = "DIR")]
    output_dir: Option<PathBuf>,

    /// Channel config JSON: {"channels": {"STAR RED": {"color": "red", "sigma": 1.0}}}
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// How contrast limits are chosen
    #[arg(long, value_enum, default_value = "viewer")]
    mode: Mode,

    /// Limits JSON written by the viewer's "Save limits…" (for --mode limits)
    #[arg(long, value_name = "FILE", required_if_eq("mode", "limits"))]
    limits: Option<PathBuf>,

    /// Skip a file when the viewer is left open this many seconds
    #[arg(long, value_name = "SECS")]
    timeout: Option<u64>,
}

fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => ChannelConfig::load(path)?,
        None => ChannelConfig::default(),
    };
    log::info!(
        "Channels: {}",
        config
            .channels
            .iter()
            .map(|(name, s)| format!("{name} ({}, sigma {})", s.color, s.sigma))
            .collect::<Vec<_>>()
            .join(", ")
    );

    let mut picker: Box<dyn ContrastPicker> = match cli.mode {
        Mode::Viewer => Box::new(ViewerPicker {
            timeout: cli.timeout.map(Duration::from_secs),
        }),
        Mode::Auto => Box::new(AutoPicker),
        Mode::Limits => {
            let path = cli.limits.as_deref().context("--mode limits needs --limits FILE")?;
            Box::new(LimitsPicker::new(load_limits(path)?))
        }
    };

    let output_dir = cli
        .output_dir
        .clone()
        .unwrap_or_else(|| cli.input.join("output"));
    let summary = Pipeline::new(&config, output_dir).run(&cli.input, picker.as_mut())?;

    log::info!(
        "{} file(s): {} export(s), {} skipped, {} without configured channels",
        summary.files,
        summary.exported.len(),
        summary.skipped,
        summary.without_channels
    );
    Ok(())
}

fn main() -> ExitCode {
    env_logger::init();

    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e:#}");
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
