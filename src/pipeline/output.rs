use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Serialize;
use tempfile::NamedTempFile;

use crate::docx::package::DocxPackage;
use crate::pipeline::results::{ProfileError, ProfileRecord, Projection};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SavedProfile {
    pub json_path: PathBuf,
    pub image_paths: Vec<PathBuf>,
}

/// JSON file stem: an explicit name (with any `.json` suffix dropped) or the identity value.
pub fn json_file_stem(
    explicit: Option<&str>,
    projection: &Projection,
    identity_field: &str,
) -> Result<String, ProfileError> {
    if let Some(name) = explicit.map(str::trim).filter(|s| !s.is_empty()) {
        return Ok(name.strip_suffix(".json").unwrap_or(name).to_string());
    }
    projection
        .identity
        .clone()
        .ok_or_else(|| ProfileError::MissingIdentity {
            field: identity_field.to_string(),
        })
}

pub fn render_json(record: &ProfileRecord) -> anyhow::Result<Vec<u8>> {
    let mut out = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"   ");
    let mut ser = serde_json::Serializer::with_formatter(&mut out, formatter);
    record.serialize(&mut ser).context("serialize profile json")?;
    Ok(out)
}

/// Writes the profile JSON and its images under `out_dir`. Everything is staged in temporary
/// files first; nothing is left behind when any step fails.
pub fn save_profile(
    pkg: &DocxPackage,
    projection: &Projection,
    out_dir: &Path,
    json_stem: &str,
) -> anyhow::Result<SavedProfile> {
    let json_path = out_dir.join(format!("{json_stem}.json"));
    let mut files: Vec<(PathBuf, Vec<u8>)> = Vec::with_capacity(projection.images.len() + 1);
    for img in &projection.images {
        tracing::info!("trying to save image: {}", img.source);
        let bytes = pkg
            .open_image(&img.source)
            .with_context(|| format!("read image {}", img.source))?;
        files.push((out_dir.join(&img.file_name), bytes.to_vec()));
    }
    files.push((json_path.clone(), render_json(&projection.record)?));

    let mut staged: Vec<(NamedTempFile, PathBuf)> = Vec::with_capacity(files.len());
    for (dest, bytes) in files {
        let dir = dest.parent().unwrap_or(out_dir);
        std::fs::create_dir_all(dir)
            .with_context(|| format!("create output dir: {}", dir.display()))?;
        let mut tmp = NamedTempFile::new_in(dir)
            .with_context(|| format!("create temp file in {}", dir.display()))?;
        tmp.write_all(&bytes)
            .with_context(|| format!("write {}", dest.display()))?;
        staged.push((tmp, dest));
    }

    let mut written: Vec<PathBuf> = Vec::with_capacity(staged.len());
    for (tmp, dest) in staged {
        if let Err(err) = tmp.persist(&dest) {
            for p in &written {
                let _ = std::fs::remove_file(p);
            }
            return Err(err.error).with_context(|| format!("persist {}", dest.display()));
        }
        written.push(dest);
    }

    let image_paths = written
        .into_iter()
        .filter(|p| *p != json_path)
        .collect();
    Ok(SavedProfile {
        json_path,
        image_paths,
    })
}
