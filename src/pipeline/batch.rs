use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context};
use once_cell::sync::Lazy;
use rayon::prelude::*;
use regex::Regex;
use walkdir::WalkDir;

use crate::docx::document::Document;
use crate::docx::package::DocxPackage;
use crate::pipeline::classify::Classifier;
use crate::pipeline::config::ParserConfig;
use crate::pipeline::output::{json_file_stem, save_profile, SavedProfile};
use crate::pipeline::results::{project, Projection};

static LEFT_OUT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(ВЫБЫЛ(А)?|УМЕР(ЛА)?|СДАЛ)").expect("left-out regex"));
static TECHNICAL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^Вопросы").expect("technical regex"));

#[derive(Clone, Debug, Default)]
pub struct BatchOptions {
    pub out_dir: PathBuf,
    /// JSON file name; honoured only when exactly one document is processed.
    pub json_name: Option<String>,
    pub jobs: Option<usize>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
    /// Parsed documents not saved because a later input produced the same output name.
    pub superseded: usize,
}

/// A parsed document waiting to be written.
pub struct PreparedProfile {
    pub package: DocxPackage,
    pub projection: Projection,
    pub json_stem: String,
}

/// Why a file is not parsed, or `None` when it should be.
pub fn skip_reason(file_name: &str) -> Option<&'static str> {
    if !file_name.ends_with(".docx") || file_name.starts_with("~$") {
        return Some("non supportable file");
    }
    if LEFT_OUT_RE.is_match(file_name) {
        return Some("left out or dead person");
    }
    if TECHNICAL_RE.is_match(file_name) {
        return Some("technical document");
    }
    None
}

pub fn is_supported_file_name(file_name: &str) -> bool {
    skip_reason(file_name).is_none()
}

/// A file yields itself; a directory yields every file below it, sorted by path.
pub fn collect_inputs(path: &Path) -> anyhow::Result<Vec<PathBuf>> {
    if path.is_file() {
        tracing::info!("file detected: {}", path.display());
        return Ok(vec![path.to_path_buf()]);
    }
    if !path.is_dir() {
        return Err(anyhow!(
            "couldn't determine whether {} is a folder or a file, please verify the name",
            path.display()
        ));
    }
    tracing::info!("directory detected: {}", path.display());
    let mut files = Vec::new();
    for entry in WalkDir::new(path).sort_by_file_name() {
        let entry = entry.with_context(|| format!("walk {}", path.display()))?;
        if entry.file_type().is_file() {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

/// Reads, classifies and projects one document without touching the destination.
pub fn prepare_file(
    path: &Path,
    config: &ParserConfig,
    json_name: Option<&str>,
) -> anyhow::Result<PreparedProfile> {
    tracing::info!("looking {} file for valuable content", path.display());
    let package = DocxPackage::read(path)?;
    if let Some(version) = package.app_version() {
        tracing::debug!("{} was written by Word {version}", path.display());
    }
    let document = Document::from_package(&package)?;
    let results = Classifier::new(&config.rules, config.line_separator.as_str()).classify(&document);
    if results.is_empty() {
        tracing::warn!("no field recognised in {}", path.display());
    }
    let projection = project(&config.rules, results, &config.images_dir)?;
    let json_stem = json_file_stem(json_name, &projection, config.rules.identity_field())?;
    Ok(PreparedProfile {
        package,
        projection,
        json_stem,
    })
}

fn save_prepared(prepared: &PreparedProfile, out_dir: &Path) -> anyhow::Result<SavedProfile> {
    let saved = save_profile(
        &prepared.package,
        &prepared.projection,
        out_dir,
        &prepared.json_stem,
    )?;
    tracing::info!("saved {}", saved.json_path.display());
    Ok(saved)
}

pub fn process_file(
    path: &Path,
    config: &ParserConfig,
    out_dir: &Path,
    json_name: Option<&str>,
) -> anyhow::Result<SavedProfile> {
    let prepared = prepare_file(path, config, json_name)?;
    save_prepared(&prepared, out_dir)
}

/// Parses every supported input. A failing document is logged and counted; it never stops the
/// others. Documents sharing an output name are resolved in input order: the last one is saved.
pub fn run_batch(
    inputs: &[PathBuf],
    config: &ParserConfig,
    opts: &BatchOptions,
) -> anyhow::Result<BatchSummary> {
    let mut summary = BatchSummary::default();
    let mut selected: Vec<&PathBuf> = Vec::with_capacity(inputs.len());
    for path in inputs {
        let name = path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or_default();
        match skip_reason(name) {
            Some(reason) => {
                tracing::info!("skipping {name} as {reason}");
                summary.skipped += 1;
            }
            None => selected.push(path),
        }
    }

    let json_name = if inputs.len() == 1 {
        opts.json_name.as_deref()
    } else {
        if opts.json_name.is_some() {
            tracing::warn!("json file name ignored: more than one input file");
        }
        None
    };

    let mut builder = rayon::ThreadPoolBuilder::new();
    if let Some(n) = opts.jobs.or(config.jobs).filter(|n| *n > 0) {
        builder = builder.num_threads(n);
    }
    let pool = builder.build().context("build worker pool")?;

    let prepared: Vec<Option<PreparedProfile>> = pool.install(|| {
        selected
            .par_iter()
            .map(|path| match prepare_file(path, config, json_name) {
                Ok(p) => Some(p),
                Err(err) => {
                    tracing::error!(
                        "error occurred during parsing file {}: {err:#}",
                        path.display()
                    );
                    None
                }
            })
            .collect()
    });
    summary.failed = prepared.iter().filter(|p| p.is_none()).count();

    let mut last_by_stem: HashMap<&str, usize> = HashMap::new();
    for (idx, p) in prepared.iter().enumerate() {
        if let Some(p) = p {
            last_by_stem.insert(p.json_stem.as_str(), idx);
        }
    }
    let mut to_save: Vec<&PreparedProfile> = Vec::with_capacity(last_by_stem.len());
    for (idx, p) in prepared.iter().enumerate() {
        let Some(p) = p else {
            continue;
        };
        match last_by_stem.get(p.json_stem.as_str()) {
            Some(&winner) if winner != idx => {
                tracing::warn!(
                    "{} produces the same output name [{}] as {}, keeping the later one",
                    p.package.path.display(),
                    p.json_stem,
                    selected[winner].display()
                );
                summary.superseded += 1;
            }
            _ => to_save.push(p),
        }
    }

    let saved: Vec<bool> = pool.install(|| {
        to_save
            .par_iter()
            .map(|p| match save_prepared(p, &opts.out_dir) {
                Ok(_) => true,
                Err(err) => {
                    tracing::error!(
                        "error occurred during saving file {}: {err:#}",
                        p.package.path.display()
                    );
                    false
                }
            })
            .collect()
    });
    summary.succeeded = saved.iter().filter(|ok| **ok).count();
    summary.failed += saved.len() - summary.succeeded;
    Ok(summary)
}
