use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context};
use zip::ZipArchive;

use crate::docx::xml::parse_xml_tree;

pub const DOCUMENT_PART: &str = "word/document.xml";
pub const RELATIONSHIPS_PART: &str = "word/_rels/document.xml.rels";
pub const APP_PROPERTIES_PART: &str = "docProps/app.xml";
// Relationship targets of the main document part are relative to this folder.
pub const MEDIA_BASE_DIR: &str = "word";

pub struct DocxPackage {
    pub path: PathBuf,
    pub entries: Vec<DocxEntry>,
}

pub struct DocxEntry {
    pub name: String,
    pub data: Vec<u8>,
}

impl DocxPackage {
    pub fn read(path: &Path) -> anyhow::Result<Self> {
        let f = File::open(path).with_context(|| format!("open docx: {}", path.display()))?;
        let mut zip = ZipArchive::new(f)
            .with_context(|| format!("read zip: {}", path.display()))?;
        let mut entries = Vec::new();
        for i in 0..zip.len() {
            let mut file = zip.by_index(i).context("zip entry")?;
            if file.is_dir() {
                continue;
            }
            let mut data = Vec::with_capacity(file.size() as usize);
            file.read_to_end(&mut data).context("read zip entry")?;
            entries.push(DocxEntry {
                name: file.name().to_string(),
                data,
            });
        }
        Ok(Self {
            path: path.to_path_buf(),
            entries,
        })
    }

    pub fn entry(&self, name: &str) -> Option<&DocxEntry> {
        self.entries.iter().find(|e| e.name == name)
    }

    fn part(&self, name: &str) -> anyhow::Result<&[u8]> {
        self.entry(name)
            .map(|e| e.data.as_slice())
            .ok_or_else(|| anyhow!("missing part {name} in {}", self.path.display()))
    }

    pub fn document_xml(&self) -> anyhow::Result<&[u8]> {
        self.part(DOCUMENT_PART)
    }

    pub fn relationships_xml(&self) -> anyhow::Result<&[u8]> {
        self.part(RELATIONSHIPS_PART)
    }

    /// Bytes of an embedded image addressed by its relationship target (e.g. `media/image2.jpg`).
    pub fn open_image(&self, image_name: &str) -> anyhow::Result<&[u8]> {
        let name = format!("{MEDIA_BASE_DIR}/{}", image_name.trim_start_matches('/'));
        self.part(&name)
    }

    /// `AppVersion` from the extended properties part: 12.0000 = Word 2007, 14.0000 = Word 2010,
    /// 15.0000 = Word 2013, 16.0000 = Word 2016.
    pub fn app_version(&self) -> Option<String> {
        let Some(entry) = self.entry(APP_PROPERTIES_PART) else {
            tracing::warn!(
                "couldn't determine Word version: no {} in {}",
                APP_PROPERTIES_PART,
                self.path.display()
            );
            return None;
        };
        match parse_xml_tree(APP_PROPERTIES_PART, &entry.data) {
            Ok(root) => root
                .find_descendant("AppVersion")
                .map(|e| e.text_content().trim().to_string()),
            Err(err) => {
                tracing::warn!("couldn't determine Word version from {APP_PROPERTIES_PART}: {err:#}");
                None
            }
        }
    }
}
