use std::collections::HashMap;

use quick_xml::{events::Event, Reader};

/// An ordered piece of an element's content: either a text run or a child
/// element. Kept ordered (rather than splitting into "attributes" +
/// "children" + "text" buckets) so mixed-content flattening can walk it in
/// document order, matching Python's `itertext()`.
#[derive(Debug, Clone)]
pub enum Content {
    Text(String),
    Element(Node),
}

#[derive(Debug, Clone, Default)]
pub struct Node {
    pub tag: String,
    pub attrs: HashMap<String, String>,
    pub content: Vec<Content>,
}

impl Node {
    /// First direct child with the given tag name.
    pub fn child(&self, tag: &str) -> Option<&Node> {
        self.content.iter().find_map(|c| match c {
            Content::Element(node) if node.tag == tag => Some(node),
            _ => None,
        })
    }

    /// All direct children with the given tag name, in document order.
    pub fn children(&self, tag: &str) -> impl Iterator<Item = &Node> {
        self.content.iter().filter_map(move |c| match c {
            Content::Element(node) if node.tag == tag => Some(node),
            _ => None,
        })
    }

    pub fn all_children(&self) -> impl Iterator<Item = &Node> {
        self.content.iter().filter_map(|c| match c {
            Content::Element(node) => Some(node),
            _ => None,
        })
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs.get(name).map(String::as_str)
    }

    /// The text of `child(tag)`, flattened across any mixed content inside
    /// it (e.g. `<ArticleTitle>`, `<AbstractText>`). Returns `None` if the
    /// child is absent.
    pub fn child_flat_text(&self, tag: &str) -> Option<String> {
        self.child(tag).map(Node::flatten_text)
    }

    /// Concatenates every text run under this node, recursing through
    /// child elements but discarding their tags — the same semantics as
    /// Python's `"".join(element.itertext())`, used for titles and
    /// abstracts where inline markup (`<i>`, `<sub>`, …) must not break up
    /// the sentence.
    pub fn flatten_text(&self) -> String {
        let mut out = String::new();
        self.flatten_text_into(&mut out);
        out
    }

    fn flatten_text_into(&self, out: &mut String) {
        for item in &self.content {
            match item {
                Content::Text(text) => out.push_str(text),
                Content::Element(node) => node.flatten_text_into(out),
            }
        }
    }
}

/// Parses `xml` into a tree rooted at the first top-level element.
pub fn parse_tree(xml: &str) -> Result<Node, quick_xml::Error> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);
    let mut buf = Vec::new();

    loop {
        match reader.read_event(&mut buf)? {
            Event::Start(start) => {
                let tag = String::from_utf8_lossy(start.name()).to_string();
                let attrs = read_attrs(&start);
                return parse_node(&mut reader, tag, attrs);
            }
            Event::Eof => {
                return Ok(Node {
                    tag: String::new(),
                    attrs: HashMap::new(),
                    content: Vec::new(),
                })
            }
            _ => {}
        }
        buf.clear();
    }
}

/// Parses every top-level child element of the document root, regardless
/// of tag name — used to walk a `<PubmedArticleSet>` and filter to
/// `PubmedArticle` elements in `litmap_xml::parser`.
pub fn parse_top_level_children(xml: &str) -> Result<Vec<Node>, quick_xml::Error> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);
    let mut buf = Vec::new();
    let mut children = Vec::new();
    let mut depth = 0usize;

    loop {
        match reader.read_event(&mut buf)? {
            Event::Start(start) => {
                depth += 1;
                if depth == 2 {
                    let tag = String::from_utf8_lossy(start.name()).to_string();
                    let attrs = read_attrs(&start);
                    children.push(parse_node(&mut reader, tag, attrs)?);
                    depth -= 1;
                }
            }
            Event::Empty(start) => {
                if depth == 1 {
                    let tag = String::from_utf8_lossy(start.name()).to_string();
                    children.push(Node {
                        tag,
                        attrs: read_attrs(&start),
                        content: Vec::new(),
                    });
                }
            }
            Event::End(_) => {
                if depth > 0 {
                    depth -= 1;
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(children)
}

fn read_attrs(start: &quick_xml::events::BytesStart) -> HashMap<String, String> {
    start
        .attributes()
        .filter_map(|a| a.ok())
        .map(|a| {
            let key = String::from_utf8_lossy(a.key).to_string();
            let value = a.unescape_and_decode_value(&Reader::from_str("")).unwrap_or_default();
            (key, value)
        })
        .collect()
}

fn parse_node(
    reader: &mut Reader<&[u8]>,
    tag: String,
    attrs: HashMap<String, String>,
) -> Result<Node, quick_xml::Error> {
    let mut content = Vec::new();
    let mut buf = Vec::new();

    loop {
        match reader.read_event(&mut buf)? {
            Event::Start(start) => {
                let child_tag = String::from_utf8_lossy(start.name()).to_string();
                let child_attrs = read_attrs(&start);
                content.push(Content::Element(parse_node(reader, child_tag, child_attrs)?));
            }
            Event::Empty(start) => {
                let child_tag = String::from_utf8_lossy(start.name()).to_string();
                content.push(Content::Element(Node {
                    tag: child_tag,
                    attrs: read_attrs(&start),
                    content: Vec::new(),
                }));
            }
            Event::Text(text) | Event::CData(text) => {
                let decoded = text.unescape_and_decode(reader).unwrap_or_default();
                if !decoded.is_empty() {
                    content.push(Content::Text(decoded));
                }
            }
            Event::End(_) => break,
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(Node { tag, attrs, content })
}
