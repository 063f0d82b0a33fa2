use anyhow::{anyhow, Context};

use crate::docx::items::Paragraph;
use crate::docx::package::{DocxPackage, DOCUMENT_PART};
use crate::docx::rels::Relationships;
use crate::docx::xml::{parse_xml_tree, XmlElement, XmlNode};

/// Body of the main document part plus the relationship table it refers to.
#[derive(Debug)]
pub struct Document {
    body: XmlElement,
    rels: Relationships,
}

impl Document {
    pub fn from_parts(document_xml: &[u8], rels_xml: &[u8]) -> anyhow::Result<Self> {
        let rels = Relationships::parse(rels_xml)?;
        let root = parse_xml_tree(DOCUMENT_PART, document_xml).context("parse document")?;
        let body = take_body(root)
            .ok_or_else(|| anyhow!("couldn't find <w:body> within {DOCUMENT_PART}"))?;
        Ok(Self { body, rels })
    }

    pub fn from_package(pkg: &DocxPackage) -> anyhow::Result<Self> {
        Self::from_parts(pkg.document_xml()?, pkg.relationships_xml()?)
            .with_context(|| format!("load document: {}", pkg.path.display()))
    }

    /// Top-level paragraphs of the body; paragraphs nested in tables are not visited.
    pub fn paragraphs(&self) -> impl Iterator<Item = Paragraph<'_>> {
        self.body
            .child_elements()
            .filter(|e| e.local_name() == "p")
            .map(move |e| Paragraph::new(e, self))
    }

    pub fn resolve(&self, relationship_id: &str) -> Option<&str> {
        self.rels.resolve(relationship_id)
    }
}

fn take_body(elem: XmlElement) -> Option<XmlElement> {
    if elem.local_name() == "body" {
        return Some(elem);
    }
    elem.children.into_iter().find_map(|child| match child {
        XmlNode::Element(e) => take_body(e),
        XmlNode::Text(_) => None,
    })
}
