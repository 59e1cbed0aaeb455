//! Batch driver: discover → load → select → smooth → pick limits → export.
//!
//! Files are processed strictly one after another; the picker may block
//! (the viewer does) and the first error aborts the batch.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};

use crate::config::ChannelConfig;
use crate::data::filter::select_channels;
use crate::data::loader;
use crate::data::model::{ChannelImage, ContrastLimits, SourceFile};
use crate::process::export::{export_channel, ExportRecord};
use crate::process::smooth::gaussian_smooth;
use crate::process::stats::default_limits;

// ---------------------------------------------------------------------------
// The "await user decision" step
// ---------------------------------------------------------------------------

/// Outcome of picking contrast limits for one file.
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    /// One window per layer, in layer order.
    Accept(Vec<ContrastLimits>),
    /// Export nothing for this file (cancelled or timed out).
    Skip,
}

/// Chooses contrast limits for the layers of one file.
pub trait ContrastPicker {
    fn pick(&mut self, title: &str, layers: &[ChannelImage]) -> Result<Decision>;
}

/// Accepts each layer's data range without asking.
#[derive(Debug, Default)]
pub struct AutoPicker;

impl ContrastPicker for AutoPicker {
    fn pick(&mut self, _title: &str, layers: &[ChannelImage]) -> Result<Decision> {
        Ok(Decision::Accept(
            layers.iter().map(|l| default_limits(&l.data)).collect(),
        ))
    }
}

/// Saved limits keyed by channel name, as written by the viewer.
pub type LimitsFile = BTreeMap<String, ContrastLimits>;

pub fn load_limits(path: &Path) -> Result<LimitsFile> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading limits file {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing limits file {}", path.display()))
}

pub fn save_limits(path: &Path, limits: &LimitsFile) -> Result<()> {
    let text = serde_json::to_string_pretty(limits)?;
    std::fs::write(path, text).with_context(|| format!("writing limits file {}", path.display()))
}

/// Applies previously saved limits; unknown channels fall back to their data range.
#[derive(Debug, Clone)]
pub struct LimitsPicker {
    limits: LimitsFile,
}

impl LimitsPicker {
    pub fn new(limits: LimitsFile) -> Self {
        Self { limits }
    }
}

impl ContrastPicker for LimitsPicker {
    fn pick(&mut self, title: &str, layers: &[ChannelImage]) -> Result<Decision> {
        let picked = layers
            .iter()
            .map(|layer| match self.limits.get(&layer.channel) {
                Some(lim) => *lim,
                None => {
                    log::warn!(
                        "{title}: no saved limits for '{}', using data range",
                        layer.channel
                    );
                    default_limits(&layer.data)
                }
            })
            .collect();
        Ok(Decision::Accept(picked))
    }
}

// ---------------------------------------------------------------------------
// Batch run
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum FileOutcome {
    Exported(Vec<ExportRecord>),
    NoChannels,
    Skipped,
}

#[derive(Debug, Default)]
pub struct RunSummary {
    pub files: usize,
    pub exported: Vec<ExportRecord>,
    pub skipped: usize,
    pub without_channels: usize,
}

pub struct Pipeline<'a> {
    config: &'a ChannelConfig,
    output_dir: PathBuf,
}

impl<'a> Pipeline<'a> {
    pub fn new(config: &'a ChannelConfig, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            config,
            output_dir: output_dir.into(),
        }
    }

    /// Process every container in `input_dir`, sorted by path.
    pub fn run(&self, input_dir: &Path, picker: &mut dyn ContrastPicker) -> Result<RunSummary> {
        std::fs::create_dir_all(&self.output_dir)
            .with_context(|| format!("creating output directory {}", self.output_dir.display()))?;

        let files = loader::discover(input_dir)?;
        log::info!("Found {} container file(s) in {}", files.len(), input_dir.display());

        check_unique_stems(&files)?;

        let mut summary = RunSummary::default();
        for path in files {
            summary.files += 1;
            let outcome = self
                .process_file(&path, picker)
                .with_context(|| format!("processing {}", path.display()))?;
            match outcome {
                FileOutcome::Exported(records) => summary.exported.extend(records),
                FileOutcome::NoChannels => summary.without_channels += 1,
                FileOutcome::Skipped => summary.skipped += 1,
            }
        }
        Ok(summary)
    }

    pub fn process_file(&self, path: &Path, picker: &mut dyn ContrastPicker) -> Result<FileOutcome> {
        let source = SourceFile::new(path);
        let scenes = loader::load_file(path)?;
        let mut layers = select_channels(scenes, self.config);
        if layers.is_empty() {
            log::info!("{}: no configured channels, skipping", source.stem);
            return Ok(FileOutcome::NoChannels);
        }

        for layer in &mut layers {
            gaussian_smooth(&mut layer.data, layer.settings.sigma);
        }

        let limits = match picker.pick(&source.stem, &layers)? {
            Decision::Accept(limits) => limits,
            Decision::Skip => {
                log::info!("{}: skipped, nothing exported", source.stem);
                return Ok(FileOutcome::Skipped);
            }
        };
        if limits.len() != layers.len() {
            bail!(
                "picker returned {} contrast limits for {} layers",
                limits.len(),
                layers.len()
            );
        }

        let mut records = Vec::with_capacity(layers.len());
        for (layer, lim) in layers.iter().zip(limits) {
            let record = export_channel(&self.output_dir, &source.stem, layer, lim)?;
            println!(
                "Saved {} with {} z-slices, contrast limits {}",
                record
                    .path
                    .file_name()
                    .map(|n| n.to_string_lossy())
                    .unwrap_or_default(),
                record.depth,
                record.limits
            );
            records.push(record);
        }
        Ok(FileOutcome::Exported(records))
    }
}

/// Exports are named by file stem, so two inputs sharing one would overwrite
/// each other's output.
fn check_unique_stems(files: &[PathBuf]) -> Result<()> {
    let mut seen: BTreeMap<String, &Path> = BTreeMap::new();
    for path in files {
        let stem = SourceFile::new(path).stem;
        if let Some(first) = seen.insert(stem.clone(), path) {
            bail!(
                "{} and {} share the stem '{stem}' and would export to the same files",
                first.display(),
                path.display()
            );
        }
    }
    Ok(())
}
