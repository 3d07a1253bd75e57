//! Extracted-text processing
//!
//! `EXTRACTED_TEXT` and `OCR` streams are either plain text or a structural
//! METS page map. For a page map the indexable text is the root `LABEL`
//! followed by every `mets:div` `LABEL`, in document order.

use quick_xml::events::{BytesStart, Event};
use quick_xml::name::{Namespace, ResolveResult};
use quick_xml::NsReader;

use crate::error::{MetadataError, Result};

pub const EXTRACTED_TEXT: &str = "EXTRACTED_TEXT";
pub const OCR: &str = "OCR";
pub const METS_NS: &str = "http://www.loc.gov/METS/";

/// True when the payload should be read as a structural page map
pub fn is_structural_xml(bytes: &[u8], content_type: Option<&str>) -> bool {
    match content_type.map(str::to_lowercase) {
        Some(ct) if ct.contains("xml") => true,
        Some(ct) if !ct.is_empty() && !ct.starts_with("application/octet-stream") => false,
        _ => bytes
            .iter()
            .find(|b| !b.is_ascii_whitespace())
            .is_some_and(|b| *b == b'<'),
    }
}

/// Indexable text of an extracted-text stream
pub fn indexable_text(bytes: &[u8], content_type: Option<&str>) -> Result<String> {
    if is_structural_xml(bytes, content_type) {
        structural_labels(bytes).map(|labels| labels.join(" "))
    } else {
        String::from_utf8(bytes.to_vec()).map_err(|e| MetadataError::Xml(e.to_string()))
    }
}

/// Root label, then every `mets:div` label in document order
pub fn structural_labels(bytes: &[u8]) -> Result<Vec<String>> {
    let mut reader = NsReader::from_reader(bytes);
    reader.config_mut().trim_text(true);

    let mut labels = Vec::new();
    let mut buf = Vec::new();
    let mut seen_root = false;

    loop {
        let (ns, event) = reader
            .read_resolved_event_into(&mut buf)
            .map_err(|e| MetadataError::Xml(e.to_string()))?;
        let is_mets = matches!(ns, ResolveResult::Bound(Namespace(uri)) if uri == METS_NS.as_bytes());

        match event {
            Event::Start(e) | Event::Empty(e) => {
                let is_div = is_mets && e.local_name().as_ref() == b"div";
                if !seen_root || is_div {
                    if let Some(label) = label_of(&e)? {
                        labels.push(label);
                    }
                }
                seen_root = true;
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(labels)
}

fn label_of(element: &BytesStart<'_>) -> Result<Option<String>> {
    for attr in element.attributes() {
        let attr = attr.map_err(|e| MetadataError::Xml(e.to_string()))?;
        if attr.key.as_ref() == b"LABEL" {
            let value = attr
                .unescape_value()
                .map_err(|e| MetadataError::Xml(e.to_string()))?;
            let value = value.trim();
            return Ok((!value.is_empty()).then(|| value.to_string()));
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE_MAP: &str = r#"<?xml version="1.0"?>
<mets:mets xmlns:mets="http://www.loc.gov/METS/" LABEL="1900-01-04">
  <mets:structMap>
    <mets:div LABEL="VOL. IX. No. 72">
      <mets:div LABEL="PROVIDENCE, THURSDAY"/>
      <other:div xmlns:other="urn:other" LABEL="ignored"/>
      <mets:div LABEL="Brown &amp; Daily Herald"/>
    </mets:div>
  </mets:structMap>
</mets:mets>"#;

    #[test]
    fn test_page_map_labels() {
        let text = indexable_text(PAGE_MAP.as_bytes(), Some("text/xml")).unwrap();
        assert_eq!(
            text,
            "1900-01-04 VOL. IX. No. 72 PROVIDENCE, THURSDAY Brown & Daily Herald"
        );
    }

    #[test]
    fn test_detection() {
        assert!(is_structural_xml(b"<mets/>", Some("application/xml; charset=utf-8")));
        assert!(is_structural_xml(b"  <mets/>", None));
        assert!(is_structural_xml(b"<mets/>", Some("application/octet-stream")));
        assert!(!is_structural_xml(b"<not xml really", Some("text/plain")));
        assert!(!is_structural_xml(b"plain words", None));
    }

    #[test]
    fn test_plain_text_decoded() {
        assert_eq!(
            indexable_text("caf\u{e9} text".as_bytes(), Some("text/plain")).unwrap(),
            "caf\u{e9} text"
        );
        assert!(indexable_text(&[0xff, 0xfe], Some("text/plain")).is_err());
    }
}
