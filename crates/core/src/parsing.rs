//! Forward-only XML cursor and the scalar readers shared by the entity decoders.

use crate::error::DecodeError;
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use sha2::{Digest, Sha256};
use std::str::FromStr;

pub fn compute_sha256_hex(payload: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(payload);
    let bytes = hasher.finalize();
    hex::encode(bytes)
}

/// Read-once cursor over a UTF-8 XML payload.
///
/// Decoders borrow it mutably, consume the events that belong to them and
/// hand it back positioned right after their own closing element.
pub struct XmlCursor<'a> {
    reader: Reader<&'a [u8]>,
}

impl<'a> XmlCursor<'a> {
    pub fn new(payload: &'a [u8]) -> Self {
        Self {
            reader: Reader::from_reader(payload),
        }
    }

    pub fn offset(&self) -> usize {
        self.reader.buffer_position()
    }

    pub fn next_event(&mut self) -> Result<Event<'a>, DecodeError> {
        let offset = self.offset();
        self.reader
            .read_event()
            .map_err(|source| DecodeError::Xml { offset, source })
    }

    pub(crate) fn unexpected_eof(&self, element: &str) -> DecodeError {
        DecodeError::UnexpectedEof {
            element: element.to_string(),
            offset: self.offset(),
        }
    }

    /// Collects the text content of the element whose start tag was just read,
    /// up to and including its end tag. Text of nested children is included.
    pub fn read_text(&mut self, element: &str) -> Result<String, DecodeError> {
        let mut depth = 0usize;
        let mut out = String::new();
        loop {
            match self.next_event()? {
                Event::Text(text) => {
                    let offset = self.offset();
                    let value = text
                        .unescape()
                        .map_err(|source| DecodeError::Xml { offset, source })?;
                    out.push_str(&value);
                }
                Event::CData(data) => out.push_str(&String::from_utf8_lossy(&data)),
                Event::Start(_) => depth += 1,
                Event::End(_) if depth == 0 => return Ok(out.trim().to_string()),
                Event::End(_) => depth -= 1,
                Event::Eof => return Err(self.unexpected_eof(element)),
                _ => {}
            }
        }
    }

    /// Discards everything up to and including the end tag of the element
    /// whose start tag was just read.
    pub fn skip_element(&mut self, element: &str) -> Result<(), DecodeError> {
        let mut depth = 0usize;
        loop {
            match self.next_event()? {
                Event::Start(_) => depth += 1,
                Event::End(_) if depth == 0 => return Ok(()),
                Event::End(_) => depth -= 1,
                Event::Eof => return Err(self.unexpected_eof(element)),
                _ => {}
            }
        }
    }
}

pub(crate) fn local_name(start: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(start.local_name().as_ref()).into_owned()
}

/// An element start handed to an entity decoder.
pub struct Field<'a> {
    name: String,
    start: BytesStart<'a>,
    empty: bool,
}

impl<'a> Field<'a> {
    pub(crate) fn new(start: BytesStart<'a>, empty: bool) -> Self {
        Self {
            name: local_name(&start),
            start,
            empty,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_self_closing(&self) -> bool {
        self.empty
    }

    pub fn attribute(&self, key: &str) -> Option<String> {
        self.start
            .attributes()
            .flatten()
            .find(|attr| attr.key.local_name().as_ref() == key.as_bytes())
            .and_then(|attr| attr.unescape_value().ok())
            .map(|value| value.into_owned())
    }

    /// Text content, or `None` for empty, self-closing and `nil` elements.
    pub fn text(self, cursor: &mut XmlCursor<'a>) -> Result<Option<String>, DecodeError> {
        if self.empty {
            return Ok(None);
        }
        let nil = self.attribute("nil").is_some();
        let text = cursor.read_text(&self.name)?;
        if nil || text.is_empty() {
            Ok(None)
        } else {
            Ok(Some(text))
        }
    }

    pub fn int<T: FromStr>(self, cursor: &mut XmlCursor<'a>) -> Result<Option<T>, DecodeError> {
        let name = self.name.clone();
        Ok(self.text(cursor)?.and_then(|raw| {
            let parsed = parse_int(&raw);
            if parsed.is_none() {
                tracing::debug!(element = %name, value = %raw, "ignoring unparsable integer");
            }
            parsed
        }))
    }

    pub fn boolean(self, cursor: &mut XmlCursor<'a>) -> Result<Option<bool>, DecodeError> {
        Ok(self.text(cursor)?.and_then(|raw| parse_bool(&raw)))
    }

    pub fn timestamp(
        self,
        cursor: &mut XmlCursor<'a>,
    ) -> Result<Option<DateTime<Utc>>, DecodeError> {
        Ok(self.text(cursor)?.and_then(|raw| parse_timestamp(&raw)))
    }

    pub(crate) fn skip(self, cursor: &mut XmlCursor<'a>) -> Result<(), DecodeError> {
        if self.empty {
            return Ok(());
        }
        cursor.skip_element(&self.name)
    }
}

pub fn parse_int<T: FromStr>(raw: &str) -> Option<T> {
    raw.trim().parse().ok()
}

pub fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" => Some(true),
        "false" | "0" => Some(false),
        _ => None,
    }
}

const NAIVE_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Best-effort timestamp parsing. Values without an offset are read as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
}

/// Lower-cases a token and drops punctuation so `past_due`, `Past-Due` and
/// `pastdue` compare equal.
pub fn normalize_token(raw: &str) -> String {
    raw.chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn sha256_of_payload() {
        assert_eq!(
            compute_sha256_hex(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn timestamps_in_several_shapes() {
        let ts = parse_timestamp("2009-11-22T13:10:38Z").unwrap();
        assert_eq!((ts.year(), ts.month(), ts.day(), ts.hour()), (2009, 11, 22, 13));

        let offset = parse_timestamp("2009-11-22T13:10:38+02:00").unwrap();
        assert_eq!(offset.hour(), 11);

        assert!(parse_timestamp("2009-11-22T13:10:38").is_some());
        assert!(parse_timestamp("2009-11-22 13:10:38").is_some());
        assert_eq!(parse_timestamp("2010-01-05").unwrap().hour(), 0);
    }

    #[test]
    fn garbage_timestamp_is_none() {
        assert!(parse_timestamp("").is_none());
        assert!(parse_timestamp("yesterday").is_none());
        assert!(parse_timestamp("2009-13-45").is_none());
    }

    #[test]
    fn booleans() {
        assert_eq!(parse_bool("true"), Some(true));
        assert_eq!(parse_bool(" FALSE "), Some(false));
        assert_eq!(parse_bool("1"), Some(true));
        assert_eq!(parse_bool("yes"), None);
    }

    #[test]
    fn integers_are_best_effort() {
        assert_eq!(parse_int::<i64>(" 500 "), Some(500));
        assert_eq!(parse_int::<i32>("-3"), Some(-3));
        assert_eq!(parse_int::<i32>("12.5"), None);
        assert_eq!(parse_int::<i32>("abc"), None);
    }

    #[test]
    fn tokens_normalize() {
        assert_eq!(normalize_token("past_due"), "pastdue");
        assert_eq!(normalize_token("Past-Due"), "pastdue");
        assert_eq!(normalize_token(" in trial "), "intrial");
    }

    #[test]
    fn read_text_handles_entities_and_cdata() {
        let xml = b"<m>Tom &amp; Jerry<![CDATA[ <ok> ]]></m>";
        let mut cursor = XmlCursor::new(xml);
        assert!(matches!(cursor.next_event().unwrap(), Event::Start(_)));
        assert_eq!(cursor.read_text("m").unwrap(), "Tom & Jerry <ok>");
        assert!(matches!(cursor.next_event().unwrap(), Event::Eof));
    }

    #[test]
    fn skip_element_stops_after_matching_end() {
        let xml = b"<a><b><c>1</c></b><d/></a><after/>";
        let mut cursor = XmlCursor::new(xml);
        cursor.next_event().unwrap();
        cursor.skip_element("a").unwrap();
        match cursor.next_event().unwrap() {
            Event::Empty(e) => assert_eq!(e.local_name().as_ref(), b"after"),
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn truncated_text_reports_element() {
        let mut cursor = XmlCursor::new(b"<uuid>abc");
        cursor.next_event().unwrap();
        match cursor.read_text("uuid") {
            Err(DecodeError::UnexpectedEof { element, .. }) => assert_eq!(element, "uuid"),
            other => panic!("unexpected result {other:?}"),
        }
    }
}
