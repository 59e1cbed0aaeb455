use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use ndarray::{Array3, Axis};
use tiff::encoder::{colortype, TiffEncoder};

use crate::data::model::{ChannelImage, ContrastLimits};

use super::normalize::normalize;

/// What one export wrote, for progress reporting.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportRecord {
    pub path: PathBuf,
    pub depth: usize,
    pub limits: ContrastLimits,
}

/// `{dir}/{stem}-{channel}.tiff`
pub fn output_path(dir: &Path, stem: &str, channel: &str) -> PathBuf {
    dir.join(format!("{stem}-{channel}.tiff"))
}

/// Write an 8-bit stack as a multi-page TIFF, one page per depth slice.
/// Any existing file at `path` is replaced.
pub fn write_stack(path: &Path, data: &Array3<u8>) -> Result<()> {
    let (depth, height, width) = data.dim();
    if depth == 0 || height == 0 || width == 0 {
        bail!(
            "cannot write empty {depth}x{height}x{width} stack to {}",
            path.display()
        );
    }

    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let mut tiff = TiffEncoder::new(BufWriter::new(file))?;
    for z in 0..depth {
        let page: Vec<u8> = data.index_axis(Axis(0), z).iter().copied().collect();
        tiff.write_image::<colortype::Gray8>(width as u32, height as u32, &page)
            .with_context(|| format!("writing page {z} of {}", path.display()))?;
    }
    Ok(())
}

/// Normalise one channel with `limits` and write it next to its siblings.
pub fn export_channel(
    out_dir: &Path,
    stem: &str,
    layer: &ChannelImage,
    limits: ContrastLimits,
) -> Result<ExportRecord> {
    let stack = normalize(&layer.data, limits)
        .with_context(|| format!("normalizing channel '{}'", layer.channel))?;
    let path = output_path(out_dir, stem, &layer.channel);
    write_stack(&path, &stack)?;
    log::debug!("Wrote {} ({:?})", path.display(), stack.dim());

    Ok(ExportRecord {
        path,
        depth: layer.depth(),
        limits,
    })
}

#[cfg(test)]
mod tests {
    use tiff::decoder::{Decoder, DecodingResult};

    use super::*;
    use crate::config::ChannelConfig;

    fn read_pages(path: &Path) -> Vec<(u32, u32, Vec<u8>)> {
        let mut decoder = Decoder::new(File::open(path).unwrap()).unwrap();
        let mut pages = Vec::new();
        loop {
            let (w, h) = decoder.dimensions().unwrap();
            match decoder.read_image().unwrap() {
                DecodingResult::U8(buf) => pages.push((w, h, buf)),
                other => panic!("unexpected sample format: {other:?}"),
            }
            if !decoder.more_images() {
                break;
            }
            decoder.next_image().unwrap();
        }
        pages
    }

    #[test]
    fn names_files_after_stem_and_channel() {
        let path = output_path(Path::new("out"), "sample01", "STAR RED");
        assert_eq!(path, Path::new("out").join("sample01-STAR RED.tiff"));
    }

    #[test]
    fn writes_one_page_per_slice() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stack.tiff");
        let data = Array3::from_shape_fn((3, 2, 4), |(z, y, x)| (z * 50 + y * 4 + x) as u8);

        write_stack(&path, &data).unwrap();

        let pages = read_pages(&path);
        assert_eq!(pages.len(), 3);
        assert_eq!(pages[0], (4, 2, vec![0, 1, 2, 3, 4, 5, 6, 7]));
        assert_eq!(pages[2].2[0], 100);
    }

    #[test]
    fn stack_without_slices_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.tiff");
        assert!(write_stack(&path, &Array3::zeros((0, 4, 4))).is_err());
        assert!(!path.exists());
    }

    #[test]
    fn export_overwrites_and_reports() {
        let dir = tempfile::tempdir().unwrap();
        let settings = ChannelConfig::default().channels["STAR RED"];
        let layer = ChannelImage {
            channel: "STAR RED".into(),
            scene: "Conf/STAR RED".into(),
            settings,
            data: Array3::from_shape_vec((1, 2, 2), vec![0.0, 10.0, 20.0, 30.0]).unwrap(),
        };
        let target = output_path(dir.path(), "sample01", "STAR RED");
        std::fs::write(&target, b"stale").unwrap();

        let record = export_channel(dir.path(), "sample01", &layer, ContrastLimits::new(10.0, 20.0))
            .unwrap();

        assert_eq!(record.path, target);
        assert_eq!(record.depth, 1);
        assert_eq!(read_pages(&target), vec![(2, 2, vec![0, 0, 255, 255])]);
    }

    #[test]
    fn degenerate_limits_write_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let layer = ChannelImage {
            channel: "STAR GREEN".into(),
            scene: "STAR GREEN".into(),
            settings: ChannelConfig::default().channels["STAR GREEN"],
            data: Array3::zeros((1, 1, 1)),
        };
        assert!(export_channel(dir.path(), "s", &layer, ContrastLimits::new(1.0, 1.0)).is_err());
        assert!(!output_path(dir.path(), "s", "STAR GREEN").exists());
    }
}
