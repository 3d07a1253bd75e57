//! Minimal RDF/XML reader
//!
//! Relationship streams (`RELS-EXT`, `RELS-INT`) are flat RDF/XML documents:
//! node elements carrying `rdf:about`, each containing predicate elements
//! whose object is either an `rdf:resource` attribute or literal text. This
//! reader flattens exactly that shape into triples and ignores anything
//! nested deeper.

use quick_xml::events::{BytesStart, Event};
use quick_xml::name::{Namespace, ResolveResult};
use quick_xml::NsReader;

use crate::error::{Result, StorageError};

pub const RDF_NS: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#";

/// Object position of a triple
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RdfObject {
    Resource(String),
    Literal(String),
}

impl RdfObject {
    pub fn as_str(&self) -> &str {
        match self {
            RdfObject::Resource(uri) => uri,
            RdfObject::Literal(text) => text,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Triple {
    pub subject: String,
    pub predicate: String,
    pub object: RdfObject,
}

/// Triples in document order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RdfGraph {
    triples: Vec<Triple>,
}

impl RdfGraph {
    /// Parse an RDF/XML document
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let mut reader = NsReader::from_reader(bytes);
        reader.config_mut().trim_text(true);

        let mut builder = GraphBuilder::default();
        let mut buf = Vec::new();
        let mut depth = 0usize;

        loop {
            let (ns, event) = reader
                .read_resolved_event_into(&mut buf)
                .map_err(|e| StorageError::Rdf(e.to_string()))?;
            let namespace = namespace_string(&ns);

            match event {
                Event::Start(e) => {
                    depth += 1;
                    let element = Element::read(&reader, &e, namespace)?;
                    builder.start(depth, element);
                }
                Event::Empty(e) => {
                    let element = Element::read(&reader, &e, namespace)?;
                    builder.start(depth + 1, element);
                    builder.end(depth + 1);
                }
                Event::Text(text) => {
                    let text = text
                        .unescape()
                        .map_err(|e| StorageError::Rdf(e.to_string()))?;
                    builder.text(&text);
                }
                Event::CData(data) => {
                    builder.text(&String::from_utf8_lossy(&data.into_inner()));
                }
                Event::End(_) => {
                    builder.end(depth);
                    depth = depth.saturating_sub(1);
                }
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        Ok(Self {
            triples: builder.triples,
        })
    }

    pub fn triples(&self) -> &[Triple] {
        &self.triples
    }

    pub fn is_empty(&self) -> bool {
        self.triples.is_empty()
    }

    /// Objects of every triple with the given predicate
    pub fn objects<'a>(&'a self, predicate: &'a str) -> impl Iterator<Item = &'a RdfObject> + 'a {
        self.triples
            .iter()
            .filter(move |t| t.predicate == predicate)
            .map(|t| &t.object)
    }

    /// Objects of triples with the given subject and predicate
    pub fn objects_for<'a>(
        &'a self,
        subject: &'a str,
        predicate: &'a str,
    ) -> impl Iterator<Item = &'a RdfObject> + 'a {
        self.triples
            .iter()
            .filter(move |t| t.subject == subject && t.predicate == predicate)
            .map(|t| &t.object)
    }
}

fn namespace_string(ns: &ResolveResult<'_>) -> Option<String> {
    match ns {
        ResolveResult::Bound(Namespace(uri)) => Some(String::from_utf8_lossy(uri).into_owned()),
        _ => None,
    }
}

/// An opened element reduced to what the graph needs
struct Element {
    name: String,
    about: Option<String>,
    resource: Option<String>,
}

impl Element {
    fn read(reader: &NsReader<&[u8]>, start: &BytesStart<'_>, namespace: Option<String>) -> Result<Self> {
        let local = String::from_utf8_lossy(start.local_name().as_ref()).into_owned();
        let name = match namespace {
            Some(ns) => format!("{}{}", ns, local),
            None => local,
        };

        let mut about = None;
        let mut resource = None;
        for attr in start.attributes() {
            let attr = attr.map_err(|e| StorageError::Rdf(e.to_string()))?;
            let (attr_ns, attr_local) = reader.resolve_attribute(attr.key);
            let in_rdf_ns = match attr_ns {
                ResolveResult::Bound(Namespace(uri)) => uri == RDF_NS.as_bytes(),
                ResolveResult::Unbound => true,
                ResolveResult::Unknown(_) => false,
            };
            if !in_rdf_ns {
                continue;
            }
            let value = attr
                .unescape_value()
                .map_err(|e| StorageError::Rdf(e.to_string()))?
                .into_owned();
            match attr_local.as_ref() {
                b"about" => about = Some(value),
                b"resource" => resource = Some(value),
                _ => {}
            }
        }

        Ok(Self {
            name,
            about,
            resource,
        })
    }
}

#[derive(Default)]
struct GraphBuilder {
    triples: Vec<Triple>,
    /// Depth of node elements: 2 under an `rdf:RDF` root, 1 otherwise
    node_depth: usize,
    subject: Option<String>,
    literal: Option<(String, String)>,
}

impl GraphBuilder {
    fn start(&mut self, depth: usize, element: Element) {
        if depth == 1 {
            if element.name == format!("{}RDF", RDF_NS) {
                self.node_depth = 2;
                return;
            }
            self.node_depth = 1;
        }

        if depth == self.node_depth {
            self.subject = Some(element.about.unwrap_or_default());
        } else if depth == self.node_depth + 1 {
            let Some(subject) = self.subject.clone() else {
                return;
            };
            match element.resource {
                Some(uri) => self.triples.push(Triple {
                    subject,
                    predicate: element.name,
                    object: RdfObject::Resource(uri),
                }),
                None => self.literal = Some((element.name, String::new())),
            }
        }
    }

    fn text(&mut self, text: &str) {
        if let Some((_, buffer)) = self.literal.as_mut() {
            buffer.push_str(text);
        }
    }

    fn end(&mut self, depth: usize) {
        if depth == self.node_depth + 1 {
            if let (Some(subject), Some((predicate, text))) =
                (self.subject.clone(), self.literal.take())
            {
                self.triples.push(Triple {
                    subject,
                    predicate,
                    object: RdfObject::Literal(text.trim().to_string()),
                });
            }
        } else if depth == self.node_depth {
            self.subject = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RELS_INT: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#"
         xmlns:fedora-model="info:fedora/fedora-system:def/model#">
  <rdf:Description rdf:about="info:fedora/test:123/content">
    <fedora-model:downloadFilename>scan &amp; notes.pdf</fedora-model:downloadFilename>
  </rdf:Description>
  <rdf:Description rdf:about="info:fedora/test:123/ZIP">
    <fedora-model:downloadFilename><![CDATA[bundle.zip]]></fedora-model:downloadFilename>
  </rdf:Description>
</rdf:RDF>"#;

    const DOWNLOAD_FILENAME: &str = "info:fedora/fedora-system:def/model#downloadFilename";

    #[test]
    fn test_literal_objects_with_subjects() {
        let graph = RdfGraph::parse(RELS_INT.as_bytes()).unwrap();
        assert_eq!(graph.triples().len(), 2);

        let names: Vec<&str> = graph
            .objects_for("info:fedora/test:123/content", DOWNLOAD_FILENAME)
            .map(RdfObject::as_str)
            .collect();
        assert_eq!(names, vec!["scan & notes.pdf"]);

        let zip: Vec<&str> = graph
            .objects_for("info:fedora/test:123/ZIP", DOWNLOAD_FILENAME)
            .map(RdfObject::as_str)
            .collect();
        assert_eq!(zip, vec!["bundle.zip"]);
    }

    #[test]
    fn test_resource_objects_in_document_order() {
        let xml = r#"<rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#"
                     xmlns:rel="info:fedora/fedora-system:def/relations-external#">
            <rdf:Description rdf:about="info:fedora/test:1">
                <rel:isPartOf rdf:resource="info:fedora/test:parent"/>
                <rel:isPartOf rdf:resource="info:fedora/test:other"/>
            </rdf:Description>
        </rdf:RDF>"#;
        let graph = RdfGraph::parse(xml.as_bytes()).unwrap();

        let parents: Vec<&str> = graph
            .objects("info:fedora/fedora-system:def/relations-external#isPartOf")
            .map(RdfObject::as_str)
            .collect();
        assert_eq!(
            parents,
            vec!["info:fedora/test:parent", "info:fedora/test:other"]
        );
    }

    #[test]
    fn test_malformed_document_is_error() {
        let result = RdfGraph::parse(b"<rdf:RDF xmlns:rdf=\"x\"><rdf:Description></rdf:RDF>");
        assert!(matches!(result, Err(StorageError::Rdf(_))));
    }
}
