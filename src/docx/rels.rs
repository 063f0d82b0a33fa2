use std::collections::HashMap;

use anyhow::Context;

use crate::docx::package::RELATIONSHIPS_PART;
use crate::docx::xml::parse_xml_tree;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Relationship {
    pub id: String,
    pub rel_type: Option<String>,
    pub target: Option<String>,
    pub target_mode: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct Relationships {
    by_id: HashMap<String, Relationship>,
}

impl Relationships {
    pub fn parse(xml_bytes: &[u8]) -> anyhow::Result<Self> {
        let root = parse_xml_tree(RELATIONSHIPS_PART, xml_bytes).context("parse relationships")?;
        let mut by_id = HashMap::new();
        for rel in root.descendants("Relationship") {
            let Some(id) = rel.attr("Id") else {
                tracing::debug!("relationship without Id skipped");
                continue;
            };
            by_id.insert(
                id.to_string(),
                Relationship {
                    id: id.to_string(),
                    rel_type: rel.attr("Type").map(str::to_string),
                    target: rel.attr("Target").map(str::to_string),
                    target_mode: rel.attr("TargetMode").map(str::to_string),
                },
            );
        }
        Ok(Self { by_id })
    }

    pub fn get(&self, id: &str) -> Option<&Relationship> {
        self.by_id.get(id)
    }

    pub fn resolve(&self, id: &str) -> Option<&str> {
        self.by_id.get(id).and_then(|r| r.target.as_deref())
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}
