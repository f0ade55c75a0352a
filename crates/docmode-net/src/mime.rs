//! MIME sniffing
//!
//! Decides whether a response body is parsed into `responseXML`.

/// Types that always parse as XML
const XML_TYPES: &[&str] = &["text/xml", "application/xml", "application/xhtml+xml", "image/svg+xml"];

/// Lowercase `type/subtype` of a Content-Type value, parameters dropped
pub fn essence(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

/// True for the XML types and any `*/*+xml`
pub fn is_xml_mime(mime: &str) -> bool {
    let essence = essence(mime);
    if XML_TYPES.contains(&essence.as_str()) {
        return true;
    }
    match essence.split_once('/') {
        Some((ty, subtype)) => !ty.is_empty() && subtype.len() > 4 && subtype.ends_with("+xml"),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_xml_table() {
        for mime in ["text/xml", "application/xml", "application/xhtml+xml", "image/svg+xml"] {
            assert!(is_xml_mime(mime), "{mime}");
        }
        assert!(is_xml_mime("application/atom+xml"));
        assert!(is_xml_mime("Text/XML; charset=utf-8"));
    }

    #[test]
    fn test_non_xml() {
        for mime in ["text/html", "text/plain", "application/json", "application/+xml", "xml", ""] {
            assert!(!is_xml_mime(mime), "{mime}");
        }
    }

    #[test]
    fn test_essence() {
        assert_eq!(essence(" Text/HTML ; charset=UTF-8"), "text/html");
    }
}
