use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use walkdir::WalkDir;

use super::model::Scene;
use super::obf;

/// Extensions picked up by discovery (matched case-insensitively).
pub const SUPPORTED_EXTENSIONS: &[&str] = &["obf"];

// ---------------------------------------------------------------------------
// Discovery
// ---------------------------------------------------------------------------

/// Container files directly inside `dir`, sorted by path.
pub fn discover(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        bail!("input directory {} does not exist", dir.display());
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
        let entry = entry.with_context(|| format!("listing {}", dir.display()))?;
        if entry.file_type().is_file() && is_supported(entry.path()) {
            files.push(entry.into_path());
        }
    }
    files.sort();
    Ok(files)
}

fn extension_lower(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase()
}

pub fn is_supported(path: &Path) -> bool {
    SUPPORTED_EXTENSIONS.contains(&extension_lower(path).as_str())
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Load every scene of a container file.  Dispatch by extension.
pub fn load_file(path: &Path) -> Result<Vec<Scene>> {
    match extension_lower(path).as_str() {
        "obf" => load_obf(path),
        other => bail!("Unsupported file extension: .{other}"),
    }
}

fn load_obf(path: &Path) -> Result<Vec<Scene>> {
    let file = obf::read_obf_path(path)
        .with_context(|| format!("reading OBF container {}", path.display()))?;

    Ok(file
        .stacks
        .into_iter()
        .map(|stack| Scene {
            path: stack.header.name,
            data: stack.data,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use ndarray::Array3;

    use super::*;
    use crate::data::obf::{write_obf_path, Compression, NewStack};

    #[test]
    fn discovers_only_containers_sorted() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.obf", "a.OBF", "c.obf", "c.msr", "notes.txt", "d.tiff"] {
            std::fs::write(dir.path().join(name), b"").unwrap();
        }
        std::fs::create_dir(dir.path().join("nested.obf")).unwrap();

        let found: Vec<String> = discover(dir.path())
            .unwrap()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(found, vec!["a.OBF", "b.obf", "c.obf"]);
    }

    #[test]
    fn missing_directory_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(discover(&dir.path().join("absent")).is_err());
    }

    #[test]
    fn loads_scenes_in_file_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sample.obf");
        let a = Array3::<u8>::from_elem((1, 2, 2), 7);
        let b = Array3::<u8>::from_elem((2, 2, 2), 9);
        write_obf_path(
            &path,
            "",
            &[
                NewStack { name: "Conf/STAR RED", data: &a },
                NewStack { name: "Conf/Transmitted", data: &b },
            ],
            Compression::None,
        )
        .unwrap();

        let scenes = load_file(&path).unwrap();
        assert_eq!(scenes.len(), 2);
        assert_eq!(scenes[0].channel_name(), "STAR RED");
        assert_eq!(scenes[1].data.dim(), (2, 2, 2));
        assert_eq!(scenes[1].data[[1, 1, 1]], 9.0);
    }

    #[test]
    fn rejects_unknown_extension() {
        let err = load_file(Path::new("image.czi")).unwrap_err();
        assert!(err.to_string().contains(".czi"));
    }
}
