//! Text reconstruction over the paragraph/run/text/break/hyperlink/drawing subset of WordprocessingML.
//!
//! Every node is a borrowed view over the element tree plus a handle to the owning [`Document`],
//! used only to resolve relationship ids. Fragments are recomputed on every call.

use crate::docx::document::Document;
use crate::docx::xml::XmlElement;
use crate::textutil::{strip_tags, LINE_SEPARATOR};

/// Paragraph children that never contribute text.
pub const EXCLUDED_CHILDREN: [&str; 4] = ["pPr", "rPr", "proofErr", "bookmarkStart"];

#[derive(Clone, Copy, Debug)]
struct Element<'a> {
    xml: &'a XmlElement,
    doc: &'a Document,
}

#[derive(Clone, Copy, Debug)]
pub struct Paragraph<'a>(Element<'a>);

#[derive(Clone, Copy, Debug)]
pub struct Run<'a>(Element<'a>);

#[derive(Clone, Copy, Debug)]
pub struct Text<'a>(Element<'a>);

#[derive(Clone, Copy, Debug)]
pub struct Break<'a>(Element<'a>);

#[derive(Clone, Copy, Debug)]
pub struct Hyperlink<'a>(Element<'a>);

#[derive(Clone, Copy, Debug)]
pub struct Drawing<'a>(Element<'a>);

#[derive(Clone, Copy, Debug)]
pub enum Node<'a> {
    Paragraph(Paragraph<'a>),
    Run(Run<'a>),
    Text(Text<'a>),
    Break(Break<'a>),
    Hyperlink(Hyperlink<'a>),
    Drawing(Drawing<'a>),
}

impl<'a> Node<'a> {
    /// `None` for tags outside the supported subset.
    pub fn from_element(xml: &'a XmlElement, doc: &'a Document) -> Option<Self> {
        let el = Element { xml, doc };
        let node = match xml.local_name() {
            "p" => Node::Paragraph(Paragraph(el)),
            "r" => Node::Run(Run(el)),
            "t" => Node::Text(Text(el)),
            "br" => Node::Break(Break(el)),
            "hyperlink" => Node::Hyperlink(Hyperlink(el)),
            "drawing" => Node::Drawing(Drawing(el)),
            _ => return None,
        };
        Some(node)
    }

    pub fn raw_text(&self) -> Vec<String> {
        match self {
            Node::Paragraph(p) => p.raw_text(),
            Node::Run(r) => r.raw_text(),
            Node::Text(t) => vec![t.0.xml.text_content()],
            Node::Break(_) => vec![LINE_SEPARATOR.to_string()],
            Node::Hyperlink(h) => vec![h.anchor()],
            Node::Drawing(_) => Vec::new(),
        }
    }

    /// Fragments joined without separator; `None` for drawings, which carry no text at all.
    pub fn text(&self) -> Option<String> {
        match self {
            Node::Drawing(_) => None,
            _ => Some(self.raw_text().concat()),
        }
    }

    /// Text without markup. Runs and hyperlinks read the visible text straight from the tree so
    /// that anchor markup never shows up here.
    pub fn cleaned_text(&self) -> String {
        match self {
            Node::Run(n) => n.0.xml.text_content(),
            Node::Hyperlink(n) => n.0.xml.text_content(),
            _ => strip_tags(&self.text().unwrap_or_default()),
        }
    }
}

impl<'a> Paragraph<'a> {
    pub(crate) fn new(xml: &'a XmlElement, doc: &'a Document) -> Self {
        Paragraph(Element { xml, doc })
    }

    pub fn id(&self) -> &'a str {
        self.0.xml.attr("w14:paraId").unwrap_or("")
    }

    pub fn children(&self) -> impl Iterator<Item = &'a XmlElement> {
        self.0
            .xml
            .child_elements()
            .filter(|e| !EXCLUDED_CHILDREN.contains(&e.local_name()))
    }

    /// One entry per text-bearing leaf, never merged across children.
    pub fn raw_text(&self) -> Vec<String> {
        let doc = self.0.doc;
        self.children()
            .filter_map(|child| Node::from_element(child, doc))
            .flat_map(|node| node.raw_text())
            .collect()
    }

    pub fn text(&self) -> String {
        self.raw_text().concat()
    }

    pub fn cleaned_text(&self) -> String {
        strip_tags(&self.text())
    }

    /// Every drawing inside the paragraph, at any depth.
    pub fn images(&self) -> Vec<Drawing<'a>> {
        let doc = self.0.doc;
        self.0
            .xml
            .descendants("drawing")
            .into_iter()
            .map(|xml| Drawing(Element { xml, doc }))
            .collect()
    }

    pub fn as_node(&self) -> Node<'a> {
        Node::Paragraph(*self)
    }
}

impl<'a> Run<'a> {
    /// Only direct `w:t` and `w:br` children contribute.
    pub fn raw_text(&self) -> Vec<String> {
        let doc = self.0.doc;
        self.0
            .xml
            .child_elements()
            .filter_map(|child| Node::from_element(child, doc))
            .filter(|node| matches!(node, Node::Text(_) | Node::Break(_)))
            .flat_map(|node| node.raw_text())
            .collect()
    }
}

impl<'a> Hyperlink<'a> {
    pub fn relationship_id(&self) -> Option<&'a str> {
        self.0.xml.attr("r:id")
    }

    pub fn target(&self) -> Option<&'a str> {
        self.relationship_id().and_then(|id| self.0.doc.resolve(id))
    }

    // Only the first run is rendered; further runs inside the same hyperlink are dropped.
    fn anchor(&self) -> String {
        let text = self
            .0
            .xml
            .find_descendant("r")
            .map(|xml| {
                Run(Element {
                    xml,
                    doc: self.0.doc,
                })
                .raw_text()
                .concat()
            })
            .unwrap_or_default();
        format!(r#"<a href="{}">{}</a>"#, self.target().unwrap_or_default(), text)
    }
}

impl<'a> Drawing<'a> {
    /// Relationship target of `pic:blipFill/a:blip/@r:embed`, e.g. `media/image2.jpg`.
    pub fn image_name(&self) -> Option<&'a str> {
        let embed = self
            .0
            .xml
            .find_descendant("blipFill")?
            .find_descendant("blip")?
            .attr("r:embed")?;
        self.0.doc.resolve(embed)
    }
}

#[cfg(test)]
mod tests {
    use super::Node;
    use crate::docx::document::Document;
    use crate::textutil::LINE_SEPARATOR;

    const RELS: &[u8] = br#"<Relationships><Relationship Id="rId5" Target="http://www.duma.gov.ru/structure/factions/er/" TargetMode="External"/><Relationship Id="rId6" Target="media/image2.jpg"/></Relationships>"#;

    fn doc(body: &str) -> Document {
        let xml = format!("<w:document><w:body>{body}</w:body></w:document>");
        Document::from_parts(xml.as_bytes(), RELS).expect("load document")
    }

    #[test]
    fn text_and_break_fragments() {
        let d = doc(r#"<w:p><w:r><w:t>Родился 9 июля.</w:t><w:br/><w:t>С 2016 года</w:t></w:r></w:p>"#);
        let p = d.paragraphs().next().expect("paragraph");
        assert_eq!(
            p.raw_text(),
            vec!["Родился 9 июля.", LINE_SEPARATOR, "С 2016 года"]
        );
        assert_eq!(p.text(), format!("Родился 9 июля.{LINE_SEPARATOR}С 2016 года"));
    }

    #[test]
    fn empty_text_is_a_fragment() {
        let d = doc(r#"<w:p><w:r><w:t></w:t></w:r><w:r><w:t>x</w:t></w:r></w:p>"#);
        let p = d.paragraphs().next().expect("paragraph");
        assert_eq!(p.raw_text(), vec!["", "x"]);
    }

    #[test]
    fn excluded_children_and_unknown_tags_are_ignored() {
        let d = doc(
            r#"<w:p><w:pPr><w:r><w:t>hidden</w:t></w:r></w:pPr><w:proofErr/><w:bookmarkStart/><w:r><w:rPr><w:b/></w:rPr><w:t>Фракция</w:t></w:r><w:bookmarkEnd/></w:p>"#,
        );
        let p = d.paragraphs().next().expect("paragraph");
        assert_eq!(p.children().count(), 2);
        assert_eq!(p.raw_text(), vec!["Фракция"]);
    }

    #[test]
    fn run_only_reads_direct_text_and_breaks() {
        let d = doc(r#"<w:p><w:r><w:tab/><w:t>a</w:t><w:drawing><w:t>no</w:t></w:drawing><w:t>b</w:t></w:r></w:p>"#);
        let p = d.paragraphs().next().expect("paragraph");
        assert_eq!(p.raw_text(), vec!["a", "b"]);
    }

    #[test]
    fn hyperlink_renders_anchor_with_first_run_only() {
        let d = doc(
            r#"<w:p><w:r><w:t>Ф</w:t></w:r><w:hyperlink r:id="rId5"><w:r><w:t>ракци</w:t></w:r><w:r><w:t>я</w:t></w:r></w:hyperlink></w:p>"#,
        );
        let p = d.paragraphs().next().expect("paragraph");
        assert_eq!(
            p.raw_text(),
            vec![
                "Ф".to_string(),
                r#"<a href="http://www.duma.gov.ru/structure/factions/er/">ракци</a>"#.to_string()
            ]
        );
        assert_eq!(p.cleaned_text(), "Фракци");

        let link = p.children().nth(1).expect("hyperlink");
        let node = Node::from_element(link, &d).expect("node");
        assert!(matches!(node, Node::Hyperlink(_)));
        assert_eq!(node.cleaned_text(), "ракция");
    }

    #[test]
    fn unresolved_hyperlink_has_empty_target() {
        let d = doc(r#"<w:p><w:hyperlink r:id="rId404"><w:r><w:t>Женат</w:t></w:r></w:hyperlink></w:p>"#);
        let p = d.paragraphs().next().expect("paragraph");
        assert_eq!(p.text(), r#"<a href="">Женат</a>"#);
    }

    #[test]
    fn hyperlink_without_run_renders_empty_anchor() {
        let d = doc(r#"<w:p><w:hyperlink r:id="rId5"/></w:p>"#);
        let p = d.paragraphs().next().expect("paragraph");
        assert_eq!(
            p.raw_text(),
            vec![r#"<a href="http://www.duma.gov.ru/structure/factions/er/"></a>"#]
        );
    }

    #[test]
    fn drawings_have_no_text_and_resolve_image_names() {
        let d = doc(
            r#"<w:p><w:r><w:drawing><wp:inline><a:graphic><a:graphicData><pic:pic><pic:blipFill><a:blip r:embed="rId6"/></pic:blipFill></pic:pic></a:graphicData></a:graphic></wp:inline></w:drawing></w:r><w:r><w:t>Иванов Иван Иванович</w:t></w:r></w:p>"#,
        );
        let p = d.paragraphs().next().expect("paragraph");
        let images = p.images();
        assert_eq!(images.len(), 1);
        assert_eq!(images[0].image_name(), Some("media/image2.jpg"));
        let node = Node::Drawing(images[0]);
        assert_eq!(node.text(), None);
        assert!(node.raw_text().is_empty());
        assert_eq!(p.text(), "Иванов Иван Иванович");
    }

    #[test]
    fn drawing_without_blip_has_no_image_name() {
        let d = doc(r#"<w:p><w:r><w:drawing><wp:inline/></w:drawing></w:r></w:p>"#);
        let p = d.paragraphs().next().expect("paragraph");
        assert_eq!(p.images()[0].image_name(), None);
    }

    #[test]
    fn text_reconstruction_is_repeatable() {
        let d = doc(r#"<w:p><w:r><w:t>a</w:t><w:br/></w:r><w:hyperlink r:id="rId5"><w:r><w:t>b</w:t></w:r></w:hyperlink></w:p>"#);
        let p = d.paragraphs().next().expect("paragraph");
        assert_eq!(p.raw_text(), p.raw_text());
        assert_eq!(p.text(), p.raw_text().concat());
        assert_eq!(p.cleaned_text(), p.cleaned_text());
        assert_eq!(p.as_node().text(), Some(p.text()));
        // one fragment per leaf: text, break, hyperlink
        assert_eq!(p.raw_text().len(), 3);
    }
}
