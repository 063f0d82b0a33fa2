use std::fmt;
use std::path::Path;

use anyhow::Context;

pub const DEFAULT_MAX_LIST_ITEMS: usize = 3;
const IMAGE_EXTENSIONS: [&str; 2] = ["png", "jpg"];

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FindingKind {
    TooManyItems { field: String, count: usize },
    MissingImage,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuditFinding {
    pub profile: String,
    pub kind: FindingKind,
}

impl fmt::Display for AuditFinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            FindingKind::TooManyItems { field, count } => write!(
                f,
                "pay attention to {} with {field} items count {count}",
                self.profile
            ),
            FindingKind::MissingImage => write!(f, "couldn't find image for {}", self.profile),
        }
    }
}

/// Flags saved profiles with a suspiciously long `list_field` or without an exported image.
pub fn audit_output_dir(
    out_dir: &Path,
    images_dir: &str,
    list_field: &str,
    max_items: usize,
) -> anyhow::Result<Vec<AuditFinding>> {
    let mut json_files = Vec::new();
    for entry in std::fs::read_dir(out_dir)
        .with_context(|| format!("read output dir: {}", out_dir.display()))?
    {
        let path = entry.context("dir entry")?.path();
        if path.is_file() && path.extension().and_then(|e| e.to_str()) == Some("json") {
            json_files.push(path);
        }
    }
    json_files.sort();

    let mut findings = Vec::new();
    for path in json_files {
        let bytes =
            std::fs::read(&path).with_context(|| format!("read profile: {}", path.display()))?;
        let value: serde_json::Value = serde_json::from_slice(&bytes)
            .with_context(|| format!("parse profile: {}", path.display()))?;
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default();

        let count = value
            .get(list_field)
            .and_then(|v| v.as_array())
            .map_or(0, |a| a.len());
        if count > max_items {
            findings.push(AuditFinding {
                profile: stem.to_string(),
                kind: FindingKind::TooManyItems {
                    field: list_field.to_string(),
                    count,
                },
            });
        }

        let has_image = IMAGE_EXTENSIONS
            .iter()
            .any(|ext| out_dir.join(images_dir).join(format!("{stem}.{ext}")).is_file());
        if !has_image {
            findings.push(AuditFinding {
                profile: stem.to_string(),
                kind: FindingKind::MissingImage,
            });
        }
    }
    Ok(findings)
}
