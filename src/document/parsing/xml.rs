//! Streaming XML traversal shared by the container parsers
//!
//! Every part is read with a single quick-xml pass. Visitors see qualified
//! element names (`w:p`, `wp:anchor`) together with the stack of open
//! ancestors, which is all the context the parsers need.

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use crate::error::{ExtractError, Result};

pub(crate) trait XmlVisitor {
    /// Called for start and empty elements. `stack` holds the ancestors.
    fn open(&mut self, _name: &str, _element: &BytesStart<'_>, _stack: &[String]) {}

    /// Called when an element closes. `stack` holds the ancestors.
    fn close(&mut self, _name: &str, _stack: &[String]) {}

    /// Called for character data. `stack` ends with the enclosing element.
    fn text(&mut self, _text: &str, _stack: &[String]) {}
}

/// Walk `xml` once, feeding every event to `visitor`.
pub(crate) fn walk<V: XmlVisitor>(xml: &[u8], part: &str, visitor: &mut V) -> Result<()> {
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(false);

    let mut stack: Vec<String> = Vec::new();
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => {
                let name = qualified_name(e);
                visitor.open(&name, e, &stack);
                stack.push(name);
            }
            Ok(Event::Empty(ref e)) => {
                let name = qualified_name(e);
                visitor.open(&name, e, &stack);
                visitor.close(&name, &stack);
            }
            Ok(Event::End(_)) => {
                if let Some(name) = stack.pop() {
                    visitor.close(&name, &stack);
                }
            }
            Ok(Event::Text(ref t)) => {
                let text = t.unescape().map_err(|e| ExtractError::xml(part, e))?;
                visitor.text(&text, &stack);
            }
            Ok(Event::CData(t)) => {
                let text = String::from_utf8_lossy(&t.into_inner()).into_owned();
                visitor.text(&text, &stack);
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(ExtractError::xml(part, e)),
            _ => {}
        }
        buf.clear();
    }

    if !stack.is_empty() {
        return Err(ExtractError::xml(
            part,
            format!("unexpected end of document inside <{}>", stack.join("/")),
        ));
    }

    Ok(())
}

fn qualified_name(e: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(e.name().as_ref()).into_owned()
}

/// Value of the attribute with qualified name `key`.
pub(crate) fn attr(e: &BytesStart<'_>, key: &str) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.as_ref() == key.as_bytes())
        .and_then(|a| a.unescape_value().ok().map(|v| v.into_owned()))
}

/// Word toggle properties: present means on unless `w:val` says otherwise.
pub(crate) fn on_off(e: &BytesStart<'_>) -> bool {
    match attr(e, "w:val") {
        Some(v) => !matches!(v.as_str(), "0" | "false" | "off" | "none"),
        None => true,
    }
}

/// Element name without its namespace prefix.
pub(crate) fn local(name: &str) -> &str {
    name.rsplit(':').next().unwrap_or(name)
}

/// The immediate parent in an ancestor stack.
pub(crate) fn parent(stack: &[String]) -> &str {
    stack.last().map(String::as_str).unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Collect {
        opened: Vec<(String, usize)>,
        texts: Vec<(String, String)>,
        vals: Vec<bool>,
    }

    impl XmlVisitor for Collect {
        fn open(&mut self, name: &str, e: &BytesStart<'_>, stack: &[String]) {
            self.opened.push((name.to_string(), stack.len()));
            if name == "w:b" {
                self.vals.push(on_off(e));
            }
        }

        fn text(&mut self, text: &str, stack: &[String]) {
            self.texts.push((parent(stack).to_string(), text.to_string()));
        }
    }

    #[test]
    fn test_walk_reports_depth_and_text() {
        let xml = br#"<w:body><w:p><w:r><w:b/><w:b w:val="0"/><w:t xml:space="preserve"> a &amp; b </w:t></w:r></w:p></w:body>"#;
        let mut visitor = Collect::default();
        walk(xml, "test.xml", &mut visitor).unwrap();

        assert_eq!(visitor.opened[0], ("w:body".to_string(), 0));
        assert!(visitor.opened.contains(&("w:t".to_string(), 3)));
        assert_eq!(visitor.vals, vec![true, false]);
        assert_eq!(
            visitor.texts,
            vec![("w:t".to_string(), " a & b ".to_string())]
        );
    }

    #[test]
    fn test_walk_rejects_truncated_xml() {
        let mut visitor = Collect::default();
        let err = walk(b"<w:body><w:p>", "word/document.xml", &mut visitor).unwrap_err();
        assert!(matches!(err, ExtractError::MalformedXml { .. }));
    }

    #[test]
    fn test_local_name() {
        assert_eq!(local("wp:wrapSquare"), "wrapSquare");
        assert_eq!(local("plain"), "plain");
    }
}
