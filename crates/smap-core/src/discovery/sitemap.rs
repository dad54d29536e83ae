//! Sitemap XML parsing.
//!
//! Turns a decoded sitemap body into a [`SitemapDocument`]: either an index of
//! child sitemaps or a leaf listing page URLs.
//!
//! ## Quick Start
//!
//! ```
//! use smap_core::discovery::sitemap::{parse_sitemap, SitemapDocument};
//!
//! let xml = br#"<?xml version="1.0" encoding="UTF-8"?>
//! <urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
//!   <url><loc>https://example.com/page1</loc></url>
//! </urlset>"#;
//!
//! let doc = parse_sitemap(xml).unwrap();
//! assert_eq!(
//!     doc,
//!     SitemapDocument::Leaf { urls: vec!["https://example.com/page1".to_string()] }
//! );
//! ```
//!
//! ## Rules
//!
//! - **Classification**: the root element's local name ending in
//!   `sitemapindex` makes an index; any other root makes a leaf.
//! - **Extraction**: every `loc` element in the [`SITEMAP_NAMESPACE`] below
//!   the root, in document order. `loc` elements in other namespaces (or in
//!   no namespace) are ignored, so a document without the sitemap namespace
//!   yields no entries.
//! - **Blank entries**: a `loc` whose trimmed text is empty is skipped.
//! - **Nesting**: a `loc` nested inside another `loc` is not collected; only
//!   the outer element's text counts.
//! - **Encoding**: a byte order mark wins, then the `encoding` of the XML
//!   declaration, then UTF-8.
//! - **Recovery**: if the document is not well-formed, invalid UTF-8 byte
//!   sequences are dropped and the parse is attempted exactly once more.

use crate::{Error, Result};
use encoding_rs::Encoding;
use quick_xml::encoding::{decode, detect_encoding};
use quick_xml::events::Event;
use quick_xml::{NsReader, Reader};
use std::borrow::Cow;
use quick_xml::name::{Namespace, ResolveResult};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

/// Namespace a `loc` element must belong to in order to be extracted.
pub const SITEMAP_NAMESPACE: &str = "http://www.sitemaps.org/schemas/sitemap/0.9";

/// Root local-name suffix identifying a sitemap index.
const INDEX_ROOT_SUFFIX: &str = "sitemapindex";

/// Parsed content of one sitemap resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SitemapDocument {
    /// A sitemap index: entries point at further sitemaps.
    Index {
        /// Child sitemap URLs in document order.
        sitemaps: Vec<String>,
    },
    /// A regular sitemap: entries are page URLs.
    Leaf {
        /// Page URLs in document order.
        urls: Vec<String>,
    },
}

impl SitemapDocument {
    /// Serialized variant name: `"index"` or `"leaf"`.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Index { .. } => "index",
            Self::Leaf { .. } => "leaf",
        }
    }

    /// Whether this document is a sitemap index.
    #[must_use]
    pub const fn is_index(&self) -> bool {
        matches!(self, Self::Index { .. })
    }

    /// Extracted `<loc>` values, whichever variant this is.
    #[must_use]
    pub fn entries(&self) -> &[String] {
        match self {
            Self::Index { sitemaps } => sitemaps,
            Self::Leaf { urls } => urls,
        }
    }

    /// Number of extracted entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries().len()
    }

    /// Whether no entries were extracted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }
}

/// Parse decoded sitemap bytes.
///
/// # Errors
///
/// Returns [`Error::MalformedXml`] if the bytes are not well-formed XML
/// both in their declared encoding and after dropping invalid UTF-8 sequences.
#[instrument(skip(bytes), fields(bytes = bytes.len()))]
pub fn parse_sitemap(bytes: &[u8]) -> Result<SitemapDocument> {
    match decode_document(bytes).and_then(|text| parse_strict(&text)) {
        Ok(doc) => Ok(doc),
        Err(first) => {
            debug!(error = %first, "Strict parse failed, retrying without invalid UTF-8");
            let cleaned = strip_invalid_utf8(bytes);
            parse_strict(&cleaned)
        },
    }
}

/// Transcode the raw document to UTF-8.
///
/// UTF-16 input is only recognised through its byte order mark or the
/// `<?xml` signature; the parser itself only reads ASCII-compatible text.
fn decode_document(bytes: &[u8]) -> Result<Cow<'_, str>> {
    let encoding = match detect_encoding(bytes) {
        Some((encoding, bom_len)) if bom_len > 0 || !encoding.is_ascii_compatible() => {
            let body = bytes.get(bom_len..).unwrap_or_default();
            return decode(body, encoding).map_err(malformed);
        },
        _ => declared_encoding(bytes),
    };

    match encoding {
        Some(encoding) => {
            debug!(encoding = encoding.name(), "Decoding with declared encoding");
            decode(bytes, encoding).map_err(malformed)
        },
        None => std::str::from_utf8(bytes)
            .map(Cow::Borrowed)
            .map_err(|e| malformed(format!("cannot decode input using UTF-8: {e}"))),
    }
}

/// Encoding named by a leading `<?xml ... encoding="..."?>`, when it names an
/// ASCII-compatible encoding.
fn declared_encoding(bytes: &[u8]) -> Option<&'static Encoding> {
    let mut reader = Reader::from_reader(bytes);
    let mut buf = Vec::new();
    match reader.read_event_into(&mut buf) {
        Ok(Event::Decl(decl)) => decl
            .encoder()
            .filter(|encoding| encoding.is_ascii_compatible()),
        _ => None,
    }
}

/// Drop every invalid UTF-8 byte sequence, keeping the valid text around it.
fn strip_invalid_utf8(bytes: &[u8]) -> String {
    bytes.utf8_chunks().map(|chunk| chunk.valid()).collect()
}

fn malformed(detail: impl std::fmt::Display) -> Error {
    Error::MalformedXml(detail.to_string())
}

fn is_sitemap_loc(resolved: &ResolveResult<'_>, local_name: &[u8]) -> bool {
    local_name == b"loc"
        && matches!(resolved, ResolveResult::Bound(Namespace(ns)) if *ns == SITEMAP_NAMESPACE.as_bytes())
}

/// Single strict pass over the already transcoded document.
fn parse_strict(text: &str) -> Result<SitemapDocument> {
    let mut reader = NsReader::from_str(text);
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    let mut root: Option<String> = None;
    let mut root_closed = false;
    let mut depth: usize = 0;

    // Depth of the open sitemap `loc` element and the text collected for it
    let mut loc_depth: Option<usize> = None;
    let mut loc_text = String::new();
    let mut entries = Vec::new();

    loop {
        buf.clear();
        let (resolved, event) = reader
            .read_resolved_event_into(&mut buf)
            .map_err(|e| malformed(format!("XML parse error: {e}")))?;

        match event {
            Event::Start(ref e) | Event::Empty(ref e) => {
                if let ResolveResult::Unknown(prefix) = &resolved {
                    return Err(malformed(format!(
                        "unbound namespace prefix '{}'",
                        String::from_utf8_lossy(prefix)
                    )));
                }
                if root_closed {
                    return Err(malformed("junk after document element"));
                }

                let local = e.local_name();
                if root.is_none() {
                    let name = std::str::from_utf8(local.as_ref())
                        .map_err(|e| malformed(format!("root element name: {e}")))?;
                    root = Some(name.to_string());
                }

                let is_empty = matches!(event, Event::Empty(_));
                let element_depth = depth + 1;
                if is_empty {
                    if element_depth == 1 {
                        root_closed = true;
                    }
                } else {
                    depth = element_depth;
                    if loc_depth.is_none()
                        && element_depth > 1
                        && is_sitemap_loc(&resolved, local.as_ref())
                    {
                        loc_depth = Some(element_depth);
                        loc_text.clear();
                    }
                }
            },
            Event::End(_) => {
                if loc_depth == Some(depth) {
                    let value = loc_text.trim();
                    if !value.is_empty() {
                        entries.push(value.to_string());
                    }
                    loc_depth = None;
                }
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    root_closed = true;
                }
            },
            Event::Text(ref e) => {
                if depth == 0 {
                    return Err(malformed("text outside the document element"));
                }
                let text = e.unescape().map_err(|e| malformed(format!("text: {e}")))?;
                if loc_depth == Some(depth) {
                    loc_text.push_str(&text);
                }
            },
            Event::CData(ref e) => {
                if depth == 0 {
                    return Err(malformed("CDATA outside the document element"));
                }
                let text = std::str::from_utf8(e)
                    .map_err(|e| malformed(format!("CDATA: {e}")))?;
                if loc_depth == Some(depth) {
                    loc_text.push_str(text);
                }
            },
            Event::Eof => break,
            Event::Decl(_) | Event::PI(_) | Event::Comment(_) | Event::DocType(_) => {},
        }
    }

    if depth != 0 {
        return Err(malformed("unclosed element at end of document"));
    }
    let Some(root) = root else {
        return Err(malformed("no element found"));
    };

    debug!(root = %root, entries = entries.len(), "Parsed sitemap");

    if root.ends_with(INDEX_ROOT_SUFFIX) {
        Ok(SitemapDocument::Index { sitemaps: entries })
    } else {
        Ok(SitemapDocument::Leaf { urls: entries })
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::panic,
    clippy::disallowed_macros,
    clippy::unnecessary_wraps
)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn leaf_urls(xml: &str) -> Vec<String> {
        match parse_sitemap(xml.as_bytes()).unwrap() {
            SitemapDocument::Leaf { urls } => urls,
            SitemapDocument::Index { .. } => panic!("expected leaf"),
        }
    }

    #[test]
    fn test_parses_multiple_urls() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
        <urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
          <url>
            <loc>https://example.com/page1</loc>
            <lastmod>2024-01-15</lastmod>
          </url>
          <url>
            <loc>https://example.com/page2</loc>
          </url>
          <url>
            <loc>https://example.com/page3</loc>
          </url>
        </urlset>"#;

        assert_eq!(
            leaf_urls(xml),
            vec![
                "https://example.com/page1",
                "https://example.com/page2",
                "https://example.com/page3",
            ]
        );
    }

    #[test]
    fn test_detects_sitemap_index() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
        <sitemapindex xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
          <sitemap>
            <loc>https://example.com/sitemap-1.xml</loc>
          </sitemap>
          <sitemap>
            <loc>https://example.com/sitemap-2.xml</loc>
          </sitemap>
        </sitemapindex>"#;

        let doc = parse_sitemap(xml.as_bytes()).unwrap();
        assert!(doc.is_index());
        assert_eq!(
            doc.entries(),
            [
                "https://example.com/sitemap-1.xml",
                "https://example.com/sitemap-2.xml"
            ]
        );
    }

    #[test]
    fn test_index_classification_ignores_prefix() {
        let xml = r#"<sm:sitemapindex xmlns:sm="http://www.sitemaps.org/schemas/sitemap/0.9">
          <sm:sitemap><sm:loc>https://example.com/a.xml</sm:loc></sm:sitemap>
        </sm:sitemapindex>"#;

        let doc = parse_sitemap(xml.as_bytes()).unwrap();
        assert!(doc.is_index());
        assert_eq!(doc.len(), 1);
    }

    #[test]
    fn test_skips_blank_and_missing_locs() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
        <urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
          <url><lastmod>2024-01-15</lastmod></url>
          <url><loc></loc></url>
          <url><loc/></url>
          <url><loc>   </loc></url>
          <url><loc>https://example.com/page1</loc></url>
        </urlset>"#;

        assert_eq!(leaf_urls(xml), vec!["https://example.com/page1"]);
    }

    #[test]
    fn test_nested_locs_are_found_at_any_depth() {
        let xml = r#"<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
          <group><url><loc>https://example.com/deep</loc></url></group>
          <url><loc>https://example.com/shallow</loc></url>
        </urlset>"#;

        assert_eq!(
            leaf_urls(xml),
            vec!["https://example.com/deep", "https://example.com/shallow"]
        );
    }

    #[test]
    fn test_locs_outside_sitemap_namespace_are_ignored() {
        let xml = r#"<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9"
                             xmlns:image="http://www.google.com/schemas/sitemap-image/1.1">
          <url>
            <loc>https://example.com/page</loc>
            <image:image><image:loc>https://example.com/photo.jpg</image:loc></image:image>
          </url>
        </urlset>"#;

        assert_eq!(leaf_urls(xml), vec!["https://example.com/page"]);
    }

    #[test]
    fn test_document_without_namespace_yields_no_entries() {
        let xml = r"<urlset><url><loc>https://example.com/page</loc></url></urlset>";

        let doc = parse_sitemap(xml.as_bytes()).unwrap();
        assert!(!doc.is_index());
        assert!(doc.is_empty());
    }

    #[test]
    fn test_handles_xml_entities_and_cdata() {
        let xml = r#"<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
          <url><loc>https://example.com/page?foo=1&amp;bar=2</loc></url>
          <url><loc><![CDATA[https://example.com/cdata]]></loc></url>
        </urlset>"#;

        assert_eq!(
            leaf_urls(xml),
            vec![
                "https://example.com/page?foo=1&bar=2",
                "https://example.com/cdata"
            ]
        );
    }

    #[test]
    fn test_handles_whitespace_in_values() {
        let xml = r#"<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
          <url><loc>
              https://example.com/page1
          </loc></url>
        </urlset>"#;

        assert_eq!(leaf_urls(xml), vec!["https://example.com/page1"]);
    }

    #[test]
    fn test_empty_root_is_empty_leaf() {
        let doc = parse_sitemap(br#"<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9"/>"#)
            .unwrap();
        assert_eq!(doc, SitemapDocument::Leaf { urls: vec![] });
    }

    #[test]
    fn test_recovers_from_invalid_utf8() {
        let mut xml = br#"<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9"><url><loc>https://example.com/caf"#.to_vec();
        xml.extend_from_slice(b"\xff\xfe");
        xml.extend_from_slice(b"e</loc></url></urlset>");

        assert!(decode_document(&xml).is_err());
        let doc = parse_sitemap(&xml).unwrap();
        assert_eq!(doc.entries(), ["https://example.com/cafe"]);
    }

    #[test]
    fn test_honours_declared_latin1_encoding() {
        let mut xml = br#"<?xml version="1.0" encoding="ISO-8859-1"?>
        <urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9"><url><loc>https://example.com/caf"#.to_vec();
        xml.push(0xE9);
        xml.extend_from_slice(b"</loc></url></urlset>");

        let doc = parse_sitemap(&xml).unwrap();
        assert_eq!(doc.entries(), ["https://example.com/caf\u{e9}"]);
    }

    #[test]
    fn test_decodes_utf16_with_byte_order_mark() {
        let xml = r#"<?xml version="1.0" encoding="UTF-16"?>
        <urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9"><url><loc>https://example.com/a</loc></url></urlset>"#;

        let mut little = vec![0xFF, 0xFE];
        little.extend(xml.encode_utf16().flat_map(u16::to_le_bytes));
        assert_eq!(parse_sitemap(&little).unwrap().entries(), ["https://example.com/a"]);

        let mut big = vec![0xFE, 0xFF];
        big.extend(xml.encode_utf16().flat_map(u16::to_be_bytes));
        assert_eq!(parse_sitemap(&big).unwrap().entries(), ["https://example.com/a"]);
    }

    #[test]
    fn test_utf8_byte_order_mark_is_skipped() {
        let mut xml = vec![0xEF, 0xBB, 0xBF];
        xml.extend_from_slice(
            br#"<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9"><url><loc>https://example.com/a</loc></url></urlset>"#,
        );
        assert_eq!(parse_sitemap(&xml).unwrap().entries(), ["https://example.com/a"]);
    }

    #[test]
    fn test_mismatched_tags_are_malformed() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
        <urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
          <url>
            <loc>https://example.com/page1
          </url>
        </urlset>"#;

        let err = parse_sitemap(xml.as_bytes()).unwrap_err();
        assert!(matches!(err, Error::MalformedXml(_)));
    }

    #[test]
    fn test_unclosed_document_is_malformed() {
        let xml = r#"<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9"><url><loc>https://e.com/a</loc>"#;
        assert!(matches!(
            parse_sitemap(xml.as_bytes()),
            Err(Error::MalformedXml(_))
        ));
    }

    #[test]
    fn test_non_xml_is_malformed() {
        for body in [
            "",
            "User-agent: *\nDisallow: /",
            "<urlset/><urlset/>",
            "<a:urlset><a:url/></a:urlset>",
        ] {
            assert!(
                matches!(parse_sitemap(body.as_bytes()), Err(Error::MalformedXml(_))),
                "expected malformed for {body:?}"
            );
        }
    }

    #[test]
    fn test_serializes_with_type_tag() {
        let doc = SitemapDocument::Index {
            sitemaps: vec!["https://example.com/a.xml".into()],
        };
        let json = serde_json::to_string(&doc).unwrap();
        assert_eq!(
            json,
            r#"{"type":"index","sitemaps":["https://example.com/a.xml"]}"#
        );
        assert_eq!(doc.kind(), "index");

        let back: SitemapDocument = serde_json::from_str(r#"{"type":"leaf","urls":[]}"#).unwrap();
        assert_eq!(back.kind(), "leaf");
        assert!(back.is_empty());
    }

    fn build_urlset(entries: &[Option<String>]) -> String {
        let mut xml = String::from(r#"<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">"#);
        for (i, entry) in entries.iter().enumerate() {
            match entry {
                Some(slug) => xml.push_str(&format!("<url><loc>https://e.com/{slug}</loc></url>")),
                None if i % 2 == 0 => xml.push_str("<url><loc></loc></url>"),
                None => xml.push_str("<url><changefreq>daily</changefreq></url>"),
            }
        }
        xml.push_str("</urlset>");
        xml
    }

    proptest! {
        #[test]
        fn test_valid_entry_count_and_order(entries in prop::collection::vec(prop::option::of("[a-z0-9]{1,12}"), 0..40)) {
            let xml = build_urlset(&entries);
            let expected: Vec<String> = entries
                .iter()
                .flatten()
                .map(|slug| format!("https://e.com/{slug}"))
                .collect();

            let doc = parse_sitemap(xml.as_bytes()).unwrap();
            prop_assert!(!doc.is_index());
            prop_assert_eq!(doc.entries(), expected.as_slice());
        }

        #[test]
        fn test_classification_follows_root_suffix(prefix in "[a-z]{0,8}") {
            let index_root = format!("{prefix}sitemapindex");
            let xml = format!(r#"<{index_root} xmlns="{SITEMAP_NAMESPACE}"></{index_root}>"#);
            prop_assert!(parse_sitemap(xml.as_bytes()).unwrap().is_index());

            let leaf_root = format!("{prefix}urlset");
            let xml = format!(r#"<{leaf_root} xmlns="{SITEMAP_NAMESPACE}"></{leaf_root}>"#);
            prop_assert!(!parse_sitemap(xml.as_bytes()).unwrap().is_index());
        }
    }
}
