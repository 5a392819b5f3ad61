//! Attribute extraction from a single opening tag.
//!
//! Only the opening tag of an element is ever inspected, never the document
//! structure around it.

/// The opening tag at the start of `data`, up to and including its `>`.
///
/// If no `>` is present the whole buffer is returned.
pub fn opening_tag(data: &[u8]) -> &[u8] {
    match memchr::memchr(b'>', data) {
        Some(end) => &data[..=end],
        None => data,
    }
}

/// Parse `name="value"` pairs of an opening tag such as
/// `<Pixels SizeX="512" PixelType='uint16'>`.
///
/// The element name is skipped. Parsing stops at the first token that is
/// not a well-formed quoted attribute.
pub fn parse_attributes(tag: &[u8]) -> Vec<(String, String)> {
    let text = String::from_utf8_lossy(opening_tag(tag));
    let mut attributes = Vec::new();

    let mut rest = text.trim_start_matches('<');
    let name_end = rest
        .find(|c: char| c.is_whitespace() || c == '>' || c == '/')
        .unwrap_or(rest.len());
    rest = &rest[name_end..];

    loop {
        rest = rest.trim_start();
        let eq = match rest.find('=') {
            Some(eq) => eq,
            None => break,
        };
        let name = rest[..eq].trim();
        if name.is_empty() || name.contains(|c: char| c.is_whitespace() || c == '>' || c == '/') {
            break;
        }

        let after = rest[eq + 1..].trim_start();
        let quote = match after.chars().next() {
            Some(q @ ('"' | '\'')) => q,
            _ => break,
        };
        let body = &after[1..];
        let close = match body.find(quote) {
            Some(close) => close,
            None => break,
        };

        attributes.push((name.to_string(), body[..close].to_string()));
        rest = &body[close + 1..];
    }

    attributes
}

/// Value of attribute `name` (case-sensitive) in an opening tag.
pub fn attribute(tag: &[u8], name: &str) -> Option<String> {
    parse_attributes(tag)
        .into_iter()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value)
}
