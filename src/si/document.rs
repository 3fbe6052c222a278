use quick_xml::events::Event;
use quick_xml::name::{Namespace, ResolveResult};
use quick_xml::{NsReader, Writer};
use thiserror::Error;

use crate::SPI_NAMESPACE;

/// SI document parse/serialise errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SiError {
    #[error("XML parse error: {0}")]
    Parse(String),
    #[error("XML write error: {0}")]
    Write(String),
}

/// Handle to an element inside an `SiDocument`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId(usize);

/// A `<bearer>` element and its `id` attribute, lowercased.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bearer {
    pub element: ElementId,
    pub id: Option<String>,
}

#[derive(Debug)]
struct Element {
    local_name: String,
    in_spi: bool,
    parent: Option<usize>,
    /// Event index of the start (or empty) tag.
    start: usize,
    /// Event index of the end tag; equal to `start` for empty elements.
    end: usize,
    id: Option<String>,
    text: String,
    removed: bool,
}

/// An SI document held as its original event stream plus an element index.
///
/// Serialising replays the events untouched, so the XML declaration and
/// namespace prefixes come back exactly as the server sent them. Removed
/// elements are skipped together with the indentation in front of them.
#[derive(Debug)]
pub struct SiDocument {
    events: Vec<Event<'static>>,
    elements: Vec<Element>,
}

impl SiDocument {
    pub fn parse(xml: &[u8]) -> Result<Self, SiError> {
        let mut reader = NsReader::from_reader(xml);
        let mut events: Vec<Event<'static>> = Vec::new();
        let mut elements: Vec<Element> = Vec::new();
        let mut open: Vec<usize> = Vec::new();

        loop {
            let (ns, event) = reader
                .read_resolved_event()
                .map_err(|e| SiError::Parse(e.to_string()))?;
            let in_spi = matches!(ns, ResolveResult::Bound(Namespace(n)) if n == SPI_NAMESPACE.as_bytes());
            let index = events.len();

            match &event {
                Event::Start(e) | Event::Empty(e) => {
                    if open.is_empty() && !elements.is_empty() {
                        return Err(SiError::Parse("more than one root element".into()));
                    }
                    let local_name = std::str::from_utf8(e.local_name().as_ref())
                        .map_err(|e| SiError::Parse(e.to_string()))?
                        .to_string();
                    let id = match e.try_get_attribute("id").map_err(|e| SiError::Parse(e.to_string()))? {
                        Some(attr) => Some(
                            attr.unescape_value()
                                .map_err(|e| SiError::Parse(e.to_string()))?
                                .to_lowercase(),
                        ),
                        None => None,
                    };
                    elements.push(Element {
                        local_name,
                        in_spi,
                        parent: open.last().copied(),
                        start: index,
                        end: index,
                        id,
                        text: String::new(),
                        removed: false,
                    });
                    if matches!(event, Event::Start(_)) {
                        open.push(elements.len() - 1);
                    }
                }
                Event::End(_) => {
                    // quick-xml has already checked the end name matches.
                    if let Some(el) = open.pop() {
                        elements[el].end = index;
                    }
                }
                Event::Text(t) => match open.last() {
                    Some(&el) => {
                        let text = t.unescape().map_err(|e| SiError::Parse(e.to_string()))?;
                        elements[el].text.push_str(&text);
                    }
                    None if !t.iter().all(u8::is_ascii_whitespace) => {
                        return Err(SiError::Parse("content outside root element".into()));
                    }
                    None => {}
                },
                Event::CData(c) => match open.last() {
                    Some(&el) => elements[el].text.push_str(&String::from_utf8_lossy(c)),
                    None => return Err(SiError::Parse("content outside root element".into())),
                },
                Event::Eof => break,
                _ => {}
            }
            events.push(event.into_owned());
        }

        if let Some(&el) = open.last() {
            return Err(SiError::Parse(format!(
                "unclosed element <{}>",
                elements[el].local_name
            )));
        }
        if elements.is_empty() {
            return Err(SiError::Parse("no root element".into()));
        }
        Ok(Self { events, elements })
    }

    /// Local name of the root element.
    pub fn root_name(&self) -> &str {
        &self.elements[0].local_name
    }

    /// All `<service>` elements still attached, in document order.
    pub fn services(&self) -> Vec<ElementId> {
        self.find_spi(None, "service", true)
    }

    /// All `<bearer>` elements still attached below `service`.
    pub fn bearers(&self, service: ElementId) -> Vec<Bearer> {
        self.find_spi(Some(service), "bearer", true)
            .into_iter()
            .map(|element| Bearer {
                element,
                id: self.elements[element.0].id.clone(),
            })
            .collect()
    }

    /// Display name of a service: long, then medium, then short name,
    /// else `"No name"`.
    pub fn service_name(&self, service: ElementId) -> String {
        ["longName", "mediumName", "shortName"]
            .iter()
            .find_map(|name| {
                self.find_spi(Some(service), name, false)
                    .into_iter()
                    .next()
                    .map(|el| self.elements[el.0].text.trim().to_string())
                    .filter(|text| !text.is_empty())
            })
            .unwrap_or_else(|| "No name".to_string())
    }

    /// Detach an element (and everything inside it) from the document.
    pub fn remove(&mut self, element: ElementId) {
        self.elements[element.0].removed = true;
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, SiError> {
        let mut skip = vec![false; self.events.len()];
        for el in self.elements.iter().filter(|el| el.removed) {
            skip[el.start..=el.end].iter_mut().for_each(|s| *s = true);
            let before = el.start.checked_sub(1).and_then(|i| self.events.get(i).map(|e| (i, e)));
            if let Some((i, Event::Text(t))) = before {
                if t.iter().all(u8::is_ascii_whitespace) {
                    skip[i] = true;
                }
            }
        }

        let mut writer = Writer::new(Vec::new());
        for (event, _) in self.events.iter().zip(skip).filter(|(_, s)| !s) {
            writer
                .write_event(event.borrow())
                .map_err(|e| SiError::Write(e.to_string()))?;
        }
        Ok(writer.into_inner())
    }

    /// SPI-namespace elements named `local_name` under `parent` (anywhere in
    /// the document when `None`). `deep` searches all descendants, otherwise
    /// only direct children.
    fn find_spi(&self, parent: Option<ElementId>, local_name: &str, deep: bool) -> Vec<ElementId> {
        self.elements
            .iter()
            .enumerate()
            .filter(|(_, el)| el.in_spi && el.local_name == local_name)
            .filter(|(i, el)| match parent {
                None => true,
                Some(ElementId(p)) if deep => *i != p && self.is_descendant(*i, p),
                Some(ElementId(p)) => el.parent == Some(p),
            })
            .filter(|(i, _)| self.is_attached(*i))
            .map(|(i, _)| ElementId(i))
            .collect()
    }

    fn is_descendant(&self, element: usize, ancestor: usize) -> bool {
        let (el, anc) = (&self.elements[element], &self.elements[ancestor]);
        el.start > anc.start && el.end < anc.end
    }

    fn is_attached(&self, mut element: usize) -> bool {
        loop {
            let el = &self.elements[element];
            if el.removed {
                return false;
            }
            match el.parent {
                Some(p) => element = p,
                None => return true,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SI: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<serviceInformation xmlns="http://www.worlddab.org/schemas/spi/31" version="1">
  <services>
    <service>
      <shortName>Radio 1</shortName>
      <mediumName>Radio One</mediumName>
      <bearer id="dab:ce1.c181.c1c0.0" cost="20"/>
      <bearer id="FM:ce1.c181.09580" cost="30"/>
      <bearer id="http://stream.example/radio1.mp3" cost="40"/>
    </service>
    <service>
      <longName>Second &amp; Best</longName>
      <bearer id="fm:ce1.c182.09900"></bearer>
    </service>
  </services>
</serviceInformation>"#;

    fn parse(xml: &str) -> SiDocument {
        SiDocument::parse(xml.as_bytes()).unwrap()
    }

    #[test]
    fn parses_services_and_bearers() {
        let doc = parse(SI);
        assert_eq!(doc.root_name(), "serviceInformation");
        let services = doc.services();
        assert_eq!(services.len(), 2);

        let ids: Vec<Option<String>> = doc.bearers(services[0]).into_iter().map(|b| b.id).collect();
        assert_eq!(
            ids,
            vec![
                Some("dab:ce1.c181.c1c0.0".to_string()),
                Some("fm:ce1.c181.09580".to_string()),
                Some("http://stream.example/radio1.mp3".to_string()),
            ]
        );
        assert_eq!(doc.bearers(services[1]).len(), 1);
    }

    #[test]
    fn service_name_preference() {
        let doc = parse(SI);
        let services = doc.services();
        assert_eq!(doc.service_name(services[0]), "Radio One");
        assert_eq!(doc.service_name(services[1]), "Second & Best");
    }

    #[test]
    fn service_name_falls_back_to_short_then_default() {
        let doc = parse(
            r#"<serviceInformation xmlns="http://www.worlddab.org/schemas/spi/31"><services>
<service><shortName>R1</shortName></service>
<service><bearer id="fm:x"/></service>
<service><longName></longName><mediumName>Medium</mediumName></service>
</services></serviceInformation>"#,
        );
        let services = doc.services();
        assert_eq!(doc.service_name(services[0]), "R1");
        assert_eq!(doc.service_name(services[1]), "No name");
        assert_eq!(doc.service_name(services[2]), "Medium");
    }

    #[test]
    fn ignores_elements_outside_spi_namespace() {
        let doc = parse(
            r#"<serviceInformation xmlns="http://www.worlddab.org/schemas/spi/31" xmlns:o="urn:other">
<services><o:service><bearer id="fm:x"/></o:service><service><o:bearer id="fm:y"/></service></services>
</serviceInformation>"#,
        );
        let services = doc.services();
        assert_eq!(services.len(), 1);
        assert!(doc.bearers(services[0]).is_empty());
    }

    #[test]
    fn prefixed_namespace_is_recognised() {
        let doc = parse(
            r#"<spi:serviceInformation xmlns:spi="http://www.worlddab.org/schemas/spi/31">
<spi:services><spi:service><spi:bearer id="dab:a.b.c.0"/></spi:service></spi:services>
</spi:serviceInformation>"#,
        );
        let services = doc.services();
        assert_eq!(services.len(), 1);
        assert_eq!(doc.bearers(services[0]).len(), 1);
    }

    #[test]
    fn serialises_verbatim_when_untouched() {
        let doc = parse(SI);
        assert_eq!(String::from_utf8(doc.to_bytes().unwrap()).unwrap(), SI);
    }

    #[test]
    fn remove_drops_element_and_its_indentation() {
        let mut doc = parse(SI);
        let services = doc.services();
        let fm = doc.bearers(services[0])[1].element;
        doc.remove(fm);

        let out = String::from_utf8(doc.to_bytes().unwrap()).unwrap();
        assert!(!out.contains("FM:ce1.c181.09580"));
        assert!(out.contains(
            "<bearer id=\"dab:ce1.c181.c1c0.0\" cost=\"20\"/>\n      <bearer id=\"http://stream.example/radio1.mp3\""
        ));
        assert_eq!(doc.bearers(services[0]).len(), 2);
    }

    #[test]
    fn remove_element_with_children() {
        let mut doc = parse(SI);
        let second = doc.services()[1];
        let bearer = doc.bearers(second)[0].element;
        doc.remove(bearer);

        let out = String::from_utf8(doc.to_bytes().unwrap()).unwrap();
        assert!(!out.contains("fm:ce1.c182.09900"));
        assert!(out.contains("<longName>Second &amp; Best</longName>\n    </service>"));
        assert!(reparse_ok(&out));
    }

    #[test]
    fn removing_trailing_children_keeps_closing_indent() {
        let mut doc = parse(SI);
        let first = doc.services()[0];
        let bearers = doc.bearers(first);
        doc.remove(bearers[1].element);
        doc.remove(bearers[2].element);

        let out = String::from_utf8(doc.to_bytes().unwrap()).unwrap();
        assert!(out.contains("<bearer id=\"dab:ce1.c181.c1c0.0\" cost=\"20\"/>\n    </service>"));
    }

    #[test]
    fn removed_service_hides_its_bearers() {
        let mut doc = parse(SI);
        let first = doc.services()[0];
        doc.remove(first);
        assert_eq!(doc.services().len(), 1);
    }

    #[test]
    fn bearer_without_id() {
        let doc = parse(
            r#"<serviceInformation xmlns="http://www.worlddab.org/schemas/spi/31"><services><service><bearer/></service></services></serviceInformation>"#,
        );
        let bearers = doc.bearers(doc.services()[0]);
        assert_eq!(bearers[0].id, None);
    }

    #[test]
    fn rejects_mismatched_tags() {
        let err = SiDocument::parse(b"<a xmlns=\"http://www.worlddab.org/schemas/spi/31\"><b></a>").unwrap_err();
        assert!(matches!(err, SiError::Parse(_)));
    }

    #[test]
    fn rejects_unclosed_root() {
        let err = SiDocument::parse(b"<serviceInformation><services>").unwrap_err();
        assert!(matches!(err, SiError::Parse(_)));
    }

    #[test]
    fn rejects_empty_and_non_xml() {
        assert!(SiDocument::parse(b"").is_err());
        assert!(SiDocument::parse(b"Not Found").is_err());
    }

    #[test]
    fn rejects_two_roots() {
        assert!(SiDocument::parse(b"<a/><b/>").is_err());
    }

    #[test]
    fn rejects_text_outside_root() {
        assert!(SiDocument::parse(b"garbage <a/> trailing").is_err());
        assert!(SiDocument::parse(b"Service unavailable <br/>").is_err());
        assert!(SiDocument::parse(b"<a/> trailing").is_err());
        assert!(SiDocument::parse(b"<a/><![CDATA[x]]>").is_err());
        assert!(SiDocument::parse(b"\n<a/>\n").is_ok());
    }

    fn reparse_ok(xml: &str) -> bool {
        SiDocument::parse(xml.as_bytes()).is_ok()
    }
}
