use std::collections::HashMap;

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use thiserror::Error;

use crate::pipeline::rules::RuleTable;
use crate::textutil::{image_extension, is_blank, sanitize_filename};

#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("identity field {field} is empty, can't name the profile outputs")]
    MissingIdentity { field: String },
}

/// Accumulated content of one field.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FieldResult {
    pub text: Option<String>,
    pub raw: Vec<String>,
    pub images: Vec<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FieldResults {
    fields: HashMap<String, FieldResult>,
}

impl FieldResults {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, field: &str, text: &str, fragments: Vec<String>) {
        let entry = self.fields.entry(field.to_string()).or_default();
        entry.text.get_or_insert_with(String::new).push_str(text);
        entry.raw.extend(fragments);
    }

    pub fn add_image(&mut self, field: &str, image_name: &str) {
        tracing::info!("adding image {image_name} for recognized {field}");
        self.fields
            .entry(field.to_string())
            .or_default()
            .images
            .push(image_name.to_string());
    }

    pub fn get(&self, field: &str) -> Option<&FieldResult> {
        self.fields.get(field)
    }

    pub fn text(&self, field: &str) -> Option<&str> {
        self.get(field).and_then(|f| f.text.as_deref())
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    fn take(&mut self, field: &str) -> FieldResult {
        self.fields.remove(field).unwrap_or_default()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Null,
    Text(String),
    List(Vec<String>),
}

/// Final record; serialises as a JSON object whose keys follow rule declaration order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProfileRecord {
    entries: Vec<(String, FieldValue)>,
}

impl ProfileRecord {
    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.entries.iter().find(|(k, _)| k == field).map(|(_, v)| v)
    }
}

impl Serialize for ProfileRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (k, v) in &self.entries {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImageExport {
    pub field: String,
    /// Relationship target inside the package, e.g. `media/image2.jpg`.
    pub source: String,
    /// Path relative to the destination directory, e.g. `images/Иванов Иван Иванович.jpg`.
    pub file_name: String,
}

#[derive(Clone, Debug)]
pub struct Projection {
    pub record: ProfileRecord,
    pub images: Vec<ImageExport>,
    /// Trimmed, filename-safe identity value, when present.
    pub identity: Option<String>,
}

pub fn project(
    rules: &RuleTable,
    mut results: FieldResults,
    images_dir: &str,
) -> Result<Projection, ProfileError> {
    let identity = results
        .text(rules.identity_field())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(sanitize_filename);

    let mut entries = Vec::with_capacity(rules.rules().len());
    let mut images = Vec::new();
    for rule in rules.rules() {
        let field = results.take(&rule.id);
        let value = if rule.is_list {
            let items = if rule.filter_blank {
                field.raw.into_iter().filter(|s| !is_blank(s)).collect()
            } else {
                field.raw
            };
            FieldValue::List(items)
        } else if rule.is_image {
            if field.images.is_empty() {
                FieldValue::Null
            } else {
                let identity = identity.as_deref().ok_or_else(|| ProfileError::MissingIdentity {
                    field: rules.identity_field().to_string(),
                })?;
                let mut names = Vec::with_capacity(field.images.len());
                for source in field.images {
                    let Some(ext) = image_extension(&source) else {
                        tracing::warn!("image {source} has no extension, not exported");
                        continue;
                    };
                    let file_name = format!("{images_dir}/{identity}.{ext}");
                    names.push(file_name.clone());
                    images.push(ImageExport {
                        field: rule.id.clone(),
                        source,
                        file_name,
                    });
                }
                FieldValue::List(names)
            }
        } else {
            field.text.map(FieldValue::Text).unwrap_or(FieldValue::Null)
        };
        entries.push((rule.id.clone(), value));
    }

    Ok(Projection {
        record: ProfileRecord { entries },
        images,
        identity,
    })
}
