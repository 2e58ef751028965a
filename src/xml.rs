use std::path::Path;

use anyhow::Context as _;
use quick_xml::events::{BytesStart, Event};
use quick_xml::name::ResolveResult;
use quick_xml::reader::NsReader;

/// Owned XML element with ElementTree-style qualified tags.
///
/// A namespaced element carries its tag as `{namespace-uri}local`; an element
/// without a namespace carries the bare local name. Only text that appears
/// before the first child element is kept.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Element {
    pub tag: String,
    pub attributes: Vec<(String, String)>,
    pub text: Option<String>,
    pub children: Vec<Element>,
}

impl Element {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            ..Self::default()
        }
    }

    pub fn read(path: &Path) -> anyhow::Result<Self> {
        let xml = std::fs::read_to_string(path)
            .with_context(|| format!("read xml document: {}", path.display()))?;
        Self::parse(&xml).with_context(|| format!("parse xml document: {}", path.display()))
    }

    pub fn parse(xml: &str) -> anyhow::Result<Self> {
        let mut reader = NsReader::from_str(xml);
        reader.config_mut().trim_text(true);

        let mut stack: Vec<Element> = Vec::new();
        let mut root: Option<Element> = None;

        loop {
            let (ns, event) = reader.read_resolved_event().context("read xml event")?;
            match event {
                Event::Start(start) => {
                    let element = open_element(&ns, &start)?;
                    stack.push(element);
                }
                Event::Empty(start) => {
                    let element = open_element(&ns, &start)?;
                    attach(&mut stack, &mut root, element)?;
                }
                Event::End(_) => {
                    let element = stack
                        .pop()
                        .ok_or_else(|| anyhow::anyhow!("unbalanced closing tag"))?;
                    attach(&mut stack, &mut root, element)?;
                }
                Event::Text(text) => {
                    let text = text.unescape().context("unescape xml text")?;
                    push_text(&mut stack, &text);
                }
                Event::CData(cdata) => {
                    let text = String::from_utf8_lossy(&cdata.into_inner()).into_owned();
                    push_text(&mut stack, &text);
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if let Some(open) = stack.last() {
            anyhow::bail!("unexpected end of document inside <{}>", open.tag);
        }
        root.ok_or_else(|| anyhow::anyhow!("xml document has no root element"))
    }

    pub fn local_name(&self) -> &str {
        match self.tag.split_once('}') {
            Some((_, local)) if self.tag.starts_with('{') => local,
            _ => &self.tag,
        }
    }

    pub fn namespace(&self) -> Option<&str> {
        let rest = self.tag.strip_prefix('{')?;
        let (ns, _) = rest.split_once('}')?;
        (!ns.is_empty()).then_some(ns)
    }

    /// Rewrites every namespaced tag in this subtree to its local name.
    pub fn strip_namespaces(&mut self) {
        let mut pending: Vec<&mut Element> = vec![self];
        while let Some(element) = pending.pop() {
            if element.namespace().is_some() {
                element.tag = element.local_name().to_owned();
            }
            pending.extend(element.children.iter_mut());
        }
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn text(&self) -> &str {
        self.text.as_deref().unwrap_or_default()
    }

    /// Follows a `/`-separated path of direct-child tags, taking the first
    /// match at each step.
    pub fn find(&self, path: &str) -> Option<&Element> {
        path.split('/')
            .filter(|segment| !segment.is_empty())
            .try_fold(self, |current, segment| {
                current.children.iter().find(|child| child.tag == segment)
            })
    }

    pub fn find_all<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
        self.children.iter().filter(move |child| child.tag == tag)
    }

    /// Pre-order walk over this element and every descendant.
    pub fn descendants(&self) -> Descendants<'_> {
        Descendants { stack: vec![self] }
    }

    pub fn iter<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
        self.descendants().filter(move |element| element.tag == tag)
    }
}

pub struct Descendants<'a> {
    stack: Vec<&'a Element>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = &'a Element;

    fn next(&mut self) -> Option<Self::Item> {
        let element = self.stack.pop()?;
        self.stack.extend(element.children.iter().rev());
        Some(element)
    }
}

fn open_element(ns: &ResolveResult<'_>, start: &BytesStart<'_>) -> anyhow::Result<Element> {
    let local = String::from_utf8_lossy(start.local_name().as_ref()).into_owned();
    let tag = match ns {
        ResolveResult::Bound(namespace) if !namespace.as_ref().is_empty() => {
            format!("{{{}}}{local}", String::from_utf8_lossy(namespace.as_ref()))
        }
        _ => local,
    };

    let mut attributes = Vec::new();
    for attr in start.attributes() {
        let attr = attr.with_context(|| format!("read attribute of <{tag}>"))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        if key == "xmlns" || key.starts_with("xmlns:") {
            continue;
        }
        let value = attr
            .unescape_value()
            .with_context(|| format!("unescape attribute {key} of <{tag}>"))?
            .into_owned();
        attributes.push((key, value));
    }

    Ok(Element {
        tag,
        attributes,
        text: None,
        children: Vec::new(),
    })
}

fn attach(
    stack: &mut [Element],
    root: &mut Option<Element>,
    element: Element,
) -> anyhow::Result<()> {
    match stack.last_mut() {
        Some(parent) => parent.children.push(element),
        None => {
            if root.is_some() {
                anyhow::bail!("xml document has more than one root element");
            }
            *root = Some(element);
        }
    }
    Ok(())
}

fn push_text(stack: &mut [Element], text: &str) {
    let Some(current) = stack.last_mut() else {
        return;
    };
    if !current.children.is_empty() {
        return;
    }
    current.text.get_or_insert_with(String::new).push_str(text);
}
