//! Small helpers over `quick_xml` events shared by the package and cursor
//! readers.

use quick_xml::escape::resolve_predefined_entity;
use quick_xml::events::{BytesStart, Event};

use crate::error::Result;

/// Attribute value by local name (`r:id` matches `id`), entities decoded.
pub(crate) fn attr_value(tag: &BytesStart<'_>, local_name: &[u8]) -> Result<Option<String>> {
    for attr in tag.attributes() {
        let attr = attr.map_err(quick_xml::Error::from)?;
        if attr.key.local_name().as_ref() == local_name {
            let value = attr.decode_and_unescape_value(tag.decoder())?;
            return Ok(Some(value.into_owned()));
        }
    }
    Ok(None)
}

/// Append the character data carried by `event` to `out`.
///
/// Returns false for events that carry no text. Unknown named entities are
/// kept as written.
pub(crate) fn push_text(event: &Event<'_>, out: &mut String) -> Result<bool> {
    match event {
        Event::Text(text) => out.push_str(&text.decode().map_err(quick_xml::Error::from)?),
        Event::CData(data) => out.push_str(&data.decode().map_err(quick_xml::Error::from)?),
        Event::GeneralRef(entity) => {
            if let Some(ch) = entity.resolve_char_ref()? {
                out.push(ch);
            } else {
                let name = entity.decode().map_err(quick_xml::Error::from)?;
                match resolve_predefined_entity(&name) {
                    Some(resolved) => out.push_str(resolved),
                    None => {
                        out.push('&');
                        out.push_str(&name);
                        out.push(';');
                    }
                }
            }
        }
        _ => return Ok(false),
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use quick_xml::Reader;

    fn collect_text(xml: &[u8]) -> Result<String> {
        let mut reader = Reader::from_reader(xml);
        let mut buf = Vec::new();
        let mut out = String::new();
        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Eof => break,
                event => {
                    push_text(&event, &mut out)?;
                }
            }
            buf.clear();
        }
        Ok(out)
    }

    #[test]
    fn text_with_references() {
        let out = collect_text("<t>R&amp;D &#8470;1 &#x41;&lt;&bogus;</t>".as_bytes()).unwrap();
        assert_eq!(out, "R&D №1 A<&bogus;");
    }

    #[test]
    fn cdata_is_kept_verbatim() {
        let out = collect_text(b"<t><![CDATA[a &amp; b]]></t>").unwrap();
        assert_eq!(out, "a &amp; b");
    }

    #[test]
    fn invalid_utf8_is_an_error() {
        let err = collect_text(b"<t>ab\xFF\xFE</t>").unwrap_err();
        assert!(matches!(err, crate::XlsxError::Xml(_)));
    }

    #[test]
    fn attributes_by_local_name() {
        let mut reader = Reader::from_str(r#"<sheet name="A &amp; B" sheetId="3" r:id="rId7"/>"#);
        let Event::Empty(tag) = reader.read_event().unwrap() else {
            panic!("expected an empty element");
        };
        assert_eq!(attr_value(&tag, b"name").unwrap().as_deref(), Some("A & B"));
        assert_eq!(attr_value(&tag, b"id").unwrap().as_deref(), Some("rId7"));
        assert_eq!(attr_value(&tag, b"sheetId").unwrap().as_deref(), Some("3"));
        assert_eq!(attr_value(&tag, b"missing").unwrap(), None);
    }
}
