use anyhow::{anyhow, Context};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum XmlNode {
    Element(XmlElement),
    Text(String),
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct XmlElement {
    pub name: String,
    pub attrs: Vec<(String, String)>,
    pub children: Vec<XmlNode>,
}

impl XmlElement {
    pub fn new(name: impl Into<String>, attrs: Vec<(String, String)>) -> Self {
        Self {
            name: name.into(),
            attrs,
            children: Vec::new(),
        }
    }

    /// Tag name without the namespace prefix (`w:p` -> `p`).
    pub fn local_name(&self) -> &str {
        local_name(&self.name)
    }

    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn child_elements(&self) -> impl Iterator<Item = &XmlElement> {
        self.children.iter().filter_map(|c| match c {
            XmlNode::Element(e) => Some(e),
            XmlNode::Text(_) => None,
        })
    }

    pub fn find_child(&self, local: &str) -> Option<&XmlElement> {
        self.child_elements().find(|e| e.local_name() == local)
    }

    /// First descendant (depth-first, document order) with the given local name.
    pub fn find_descendant(&self, local: &str) -> Option<&XmlElement> {
        for child in self.child_elements() {
            if child.local_name() == local {
                return Some(child);
            }
            if let Some(found) = child.find_descendant(local) {
                return Some(found);
            }
        }
        None
    }

    pub fn descendants(&self, local: &str) -> Vec<&XmlElement> {
        let mut out = Vec::new();
        collect_descendants(self, local, &mut out);
        out
    }

    /// Concatenated text of every descendant text node, markup dropped.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        push_text(self, &mut out);
        out
    }
}

fn collect_descendants<'a>(elem: &'a XmlElement, local: &str, out: &mut Vec<&'a XmlElement>) {
    for child in elem.child_elements() {
        if child.local_name() == local {
            out.push(child);
        }
        collect_descendants(child, local, out);
    }
}

fn push_text(elem: &XmlElement, out: &mut String) {
    for child in &elem.children {
        match child {
            XmlNode::Text(t) => out.push_str(t),
            XmlNode::Element(e) => push_text(e, out),
        }
    }
}

pub fn local_name(name: &str) -> &str {
    match name.rsplit_once(':') {
        Some((_, local)) => local,
        None => name,
    }
}

/// Parses an XML part into an element tree rooted at its document element.
pub fn parse_xml_tree(name: &str, xml_bytes: &[u8]) -> anyhow::Result<XmlElement> {
    let mut reader = Reader::from_reader(xml_bytes);
    reader.config_mut().trim_text(false);

    let mut stack: Vec<XmlElement> = Vec::new();
    let mut root: Option<XmlElement> = None;
    let mut buf = Vec::new();
    loop {
        buf.clear();
        let ev = reader
            .read_event_into(&mut buf)
            .with_context(|| format!("read xml event: {name}"))?;
        match ev {
            Event::Eof => break,
            Event::Start(s) => {
                stack.push(XmlElement::new(
                    bytes_to_string(s.name().as_ref()),
                    collect_attrs(&s)?,
                ));
            }
            Event::Empty(s) => {
                let elem = XmlElement::new(bytes_to_string(s.name().as_ref()), collect_attrs(&s)?);
                attach(&mut stack, &mut root, elem, name)?;
            }
            Event::End(e) => {
                let closing = bytes_to_string(e.name().as_ref());
                let elem = stack
                    .pop()
                    .ok_or_else(|| anyhow!("unexpected closing tag </{closing}> in {name}"))?;
                attach(&mut stack, &mut root, elem, name)?;
            }
            Event::Text(t) => {
                let txt = t.unescape().context("unescape text")?.into_owned();
                push_text_node(&mut stack, txt);
            }
            Event::CData(t) => {
                push_text_node(&mut stack, bytes_to_string(t.into_inner()));
            }
            Event::Decl(_) | Event::Comment(_) | Event::PI(_) | Event::DocType(_) => {}
        }
    }

    if let Some(open) = stack.last() {
        return Err(anyhow!("unclosed element <{}> in {name}", open.name));
    }
    root.ok_or_else(|| anyhow!("no root element in {name}"))
}

fn attach(
    stack: &mut [XmlElement],
    root: &mut Option<XmlElement>,
    elem: XmlElement,
    name: &str,
) -> anyhow::Result<()> {
    match stack.last_mut() {
        Some(parent) => parent.children.push(XmlNode::Element(elem)),
        None => {
            if root.is_some() {
                return Err(anyhow!("multiple root elements in {name}"));
            }
            *root = Some(elem);
        }
    }
    Ok(())
}

fn push_text_node(stack: &mut [XmlElement], text: String) {
    // Text outside the root element (whitespace around it) is dropped.
    if let Some(parent) = stack.last_mut() {
        parent.children.push(XmlNode::Text(text));
    }
}

fn collect_attrs(s: &BytesStart<'_>) -> anyhow::Result<Vec<(String, String)>> {
    let mut attrs: Vec<(String, String)> = Vec::new();
    for a in s.attributes() {
        let a = a.context("attr")?;
        let key = bytes_to_string(a.key.as_ref());
        let val = a.unescape_value().context("unescape attr")?.into_owned();
        attrs.push((key, val));
    }
    Ok(attrs)
}

fn bytes_to_string(bytes: impl AsRef<[u8]>) -> String {
    String::from_utf8_lossy(bytes.as_ref()).into_owned()
}
