//! LDIF record parser with encoding auto-detection.
//!
//! Turns LDIF-like text into a list of [`FlatRecord`]s, one per directory
//! entry. Only the structure needed for flattening is recognized: records
//! start at a `dn: cn=` header and end at a blank line, at the next header,
//! or at end of input. Continuation lines and base64 values are not decoded.

use std::path::Path;

use crate::error::{ConvertError, ParseError};
use crate::models::{DnComponents, FlatRecord, SuffixPolicy};

/// Marker stripped from a DN header before splitting it.
pub const DN_MARKER: &str = "dn: ";

/// Prefix that opens a new record.
pub const DN_RECORD_PREFIX: &str = "dn: cn=";

/// Result of parsing with metadata
#[derive(Debug, Clone)]
pub struct ParseResult {
    /// Completed records in input order
    pub records: Vec<FlatRecord>,
    /// Detected or used encoding
    pub encoding: String,
    /// Non-blank lines that contributed nothing
    pub ignored_lines: usize,
}

/// Detect the encoding of raw bytes.
///
/// Valid UTF-8 is always taken as UTF-8; chardet only guesses for input
/// that fails strict UTF-8 decoding.
pub fn detect_encoding(bytes: &[u8]) -> String {
    if std::str::from_utf8(bytes).is_ok() {
        return "utf-8".to_string();
    }

    let result = chardet::detect(bytes);
    let charset = result.0;

    match charset.to_lowercase().as_str() {
        "iso-8859-1" | "latin-1" | "latin1" => "iso-8859-1".to_string(),
        "iso-8859-15" | "latin-9" | "latin9" => "iso-8859-15".to_string(),
        "windows-1252" | "cp1252" => "windows-1252".to_string(),
        // chardet cannot name a single-byte charset: Latin-1 is the usual culprit
        "" | "ascii" | "utf-8" | "utf8" => "iso-8859-1".to_string(),
        _ => charset,
    }
}

/// Decode bytes to string using the specified encoding.
///
/// Latin-1 labels decode as windows-1252, its WHATWG superset. A leading
/// UTF-8 byte order mark is dropped so the first header still matches
/// [`DN_RECORD_PREFIX`].
pub fn decode_content(bytes: &[u8], encoding: &str) -> String {
    let decoded = match encoding.to_lowercase().as_str() {
        "utf-8" | "utf8" | "ascii" => String::from_utf8_lossy(bytes).into_owned(),
        "iso-8859-1" | "latin-1" | "latin1" | "windows-1252" | "cp1252" => {
            encoding_rs::WINDOWS_1252.decode(bytes).0.into_owned()
        }
        "iso-8859-15" | "latin-9" | "latin9" => {
            encoding_rs::ISO_8859_15.decode(bytes).0.into_owned()
        }
        other => match encoding_rs::Encoding::for_label(other.as_bytes()) {
            Some(encoding) => encoding.decode(bytes).0.into_owned(),
            // Fallback: UTF-8 with lossy conversion
            None => String::from_utf8_lossy(bytes).into_owned(),
        },
    };

    match decoded.strip_prefix('\u{feff}') {
        Some(rest) => rest.to_string(),
        None => decoded,
    }
}

/// Decompose a DN header line into its attribute groups.
///
/// The `dn: ` marker must be present; parts without `=` are dropped and
/// keys/values are kept verbatim (no trimming).
///
/// # Example
/// ```ignore
/// let dn = parse_dn("dn: cn=John Smith,cn=Jack,ou=People")?;
/// assert_eq!(dn.get("cn").unwrap(), &["John Smith", "Jack"]);
/// ```
pub fn parse_dn(line: &str) -> Result<DnComponents, ParseError> {
    let trimmed = line.trim();
    let body = trimmed
        .strip_prefix(DN_MARKER)
        .ok_or_else(|| ParseError::MissingDnMarker {
            line: trimmed.to_string(),
        })?;

    let mut components = DnComponents::new();
    for part in body.split(',') {
        if let Some((key, value)) = part.split_once('=') {
            components.push(key, value);
        }
    }
    Ok(components)
}

/// Line-driven record builder.
///
/// `current` is `None` between records and `Some` while a record is open.
#[derive(Debug, Default)]
pub struct RecordBuilder {
    policy: SuffixPolicy,
    current: Option<FlatRecord>,
    records: Vec<FlatRecord>,
    ignored_lines: usize,
}

impl RecordBuilder {
    pub fn new(policy: SuffixPolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    pub fn in_record(&self) -> bool {
        self.current.is_some()
    }

    /// Consume one input line.
    pub fn feed_line(&mut self, raw: &str) -> Result<(), ParseError> {
        let line = raw.trim();

        if line.is_empty() {
            self.finish_record();
            return Ok(());
        }

        if line.starts_with(DN_RECORD_PREFIX) {
            self.finish_record();
            self.current = Some(parse_dn(line)?.flatten());
            return Ok(());
        }

        match (self.current.as_mut(), line.split_once(':')) {
            (Some(record), Some((key, value))) => {
                record.push_attribute(key.trim(), value.trim(), self.policy);
            }
            _ => self.ignored_lines += 1,
        }
        Ok(())
    }

    fn finish_record(&mut self) {
        if let Some(record) = self.current.take() {
            self.records.push(record);
        }
    }

    /// Close any open record and return `(records, ignored_lines)`.
    pub fn finish(mut self) -> (Vec<FlatRecord>, usize) {
        self.finish_record();
        (self.records, self.ignored_lines)
    }
}

/// Parse already-decoded LDIF text into flat records.
///
/// # Example
/// ```ignore
/// let records = parse_ldif("dn: cn=John\nmail: a@x.com\n", SuffixPolicy::default())?;
/// assert_eq!(records[0].get("mail1"), Some("a@x.com"));
/// ```
pub fn parse_ldif(content: &str, policy: SuffixPolicy) -> Result<Vec<FlatRecord>, ParseError> {
    let mut builder = RecordBuilder::new(policy);
    for line in content.lines() {
        builder.feed_line(line)?;
    }
    Ok(builder.finish().0)
}

/// Parse LDIF bytes with encoding auto-detection.
pub fn parse_ldif_bytes(bytes: &[u8], policy: SuffixPolicy) -> Result<ParseResult, ParseError> {
    let encoding = detect_encoding(bytes);
    let content = decode_content(bytes, &encoding);

    let mut builder = RecordBuilder::new(policy);
    for line in content.lines() {
        builder.feed_line(line)?;
    }
    let (records, ignored_lines) = builder.finish();

    Ok(ParseResult {
        records,
        encoding,
        ignored_lines,
    })
}

/// Parse an LDIF file with encoding auto-detection.
pub fn parse_ldif_file<P: AsRef<Path>>(
    path: P,
    policy: SuffixPolicy,
) -> Result<ParseResult, ConvertError> {
    let path = path.as_ref();
    let bytes = std::fs::read(path).map_err(|e| ConvertError::io(path, e))?;
    Ok(parse_ldif_bytes(&bytes, policy)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(content: &str) -> Vec<FlatRecord> {
        parse_ldif(content, SuffixPolicy::default()).unwrap()
    }

    #[test]
    fn test_parse_dn_groups_repeated_keys() {
        let dn = parse_dn("dn: cn=John Smith,cn=Jack,ou=People").unwrap();

        assert_eq!(dn.get("cn").unwrap(), &["John Smith".to_string(), "Jack".to_string()]);
        assert_eq!(dn.get("ou").unwrap(), &["People".to_string()]);
    }

    #[test]
    fn test_parse_dn_drops_parts_without_equals() {
        let dn = parse_dn("dn: cn=X,garbage,ou=Y").unwrap();

        assert_eq!(dn.keys().collect::<Vec<_>>(), vec!["cn", "ou"]);
        assert!(dn.get("garbage").is_none());
    }

    #[test]
    fn test_parse_dn_splits_on_first_equals() {
        let dn = parse_dn("dn: cn=a=b").unwrap();
        assert_eq!(dn.get("cn").unwrap(), &["a=b".to_string()]);
    }

    #[test]
    fn test_parse_dn_keeps_spaces_verbatim() {
        let dn = parse_dn("  dn: cn=John, ou=People  ").unwrap();
        assert_eq!(dn.get(" ou").unwrap(), &["People".to_string()]);
    }

    #[test]
    fn test_parse_dn_missing_marker() {
        let err = parse_dn("cn=John,ou=People").unwrap_err();
        assert!(matches!(err, ParseError::MissingDnMarker { .. }));
    }

    #[test]
    fn test_single_record_with_repeated_mail() {
        let records = parse("dn: cn=John Smith,cn=Jack\nmail: a@x.com\nmail: b@x.com");

        assert_eq!(records.len(), 1);
        let expected: FlatRecord = [
            ("cn1", "John Smith"),
            ("cn2", "Jack"),
            ("mail1", "a@x.com"),
            ("mail2", "b@x.com"),
        ]
        .into_iter()
        .collect();
        assert_eq!(records[0], expected);
    }

    #[test]
    fn test_blank_lines_delimit_records() {
        let records = parse("dn: cn=A\nsn: One\n\n\n\ndn: cn=B\nsn: Two\n");

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].get("sn1"), Some("One"));
        assert_eq!(records[1].get("sn1"), Some("Two"));
    }

    #[test]
    fn test_consecutive_dn_lines_make_two_records() {
        let records = parse("dn: cn=A\ndn: cn=B\nmail: b@x.com");

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].columns().collect::<Vec<_>>(), vec!["cn1"]);
        assert_eq!(records[1].get("mail1"), Some("b@x.com"));
    }

    #[test]
    fn test_trailing_record_without_blank_line() {
        let records = parse("dn: cn=A\n\ndn: cn=B\ntelephoneNumber: 555");

        assert_eq!(records.len(), 2);
        assert_eq!(records[1].get("telephoneNumber1"), Some("555"));
    }

    #[test]
    fn test_lines_outside_records_are_ignored() {
        let mut builder = RecordBuilder::new(SuffixPolicy::default());
        for line in ["version: 1", "mail: stray@x.com", "", "dn: cn=A", "no colon here", "sn: S"] {
            builder.feed_line(line).unwrap();
        }
        assert!(builder.in_record());

        let (records, ignored) = builder.finish();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].columns().collect::<Vec<_>>(), vec!["cn1", "sn1"]);
        assert_eq!(ignored, 3);
    }

    #[test]
    fn test_attribute_split_on_first_colon_and_trimmed() {
        let records = parse("dn: cn=A\n  labeledURI :  http://x.com/a  \n");
        assert_eq!(records[0].get("labeledURI1"), Some("http://x.com/a"));
    }

    #[test]
    fn test_non_cn_dn_inside_record_is_an_attribute() {
        let records = parse("dn: cn=A\ndn: ou=People\n");

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].get("dn1"), Some("ou=People"));
    }

    #[test]
    fn test_attribute_after_dn_group_continues_numbering() {
        let records = parse("dn: cn=A,cn=B\ncn: C\n");
        assert_eq!(records[0].get("cn3"), Some("C"));
    }

    #[test]
    fn test_legacy_prefix_policy() {
        let content = "dn: cn=A,cn=B\nc: FR\n";

        let exact = parse_ldif(content, SuffixPolicy::ExactKey).unwrap();
        assert_eq!(exact[0].get("c1"), Some("FR"));

        let legacy = parse_ldif(content, SuffixPolicy::LegacyPrefix).unwrap();
        assert_eq!(legacy[0].get("c3"), Some("FR"));
    }

    #[test]
    fn test_empty_input_has_no_records() {
        assert!(parse("").is_empty());
        assert!(parse("\n\n   \n").is_empty());
    }

    #[test]
    fn test_crlf_line_endings() {
        let records = parse("dn: cn=A\r\nsn: S\r\n\r\ndn: cn=B\r\n");
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].get("sn1"), Some("S"));
    }

    #[test]
    fn test_bom_is_stripped() {
        let mut bytes = vec![0xEF, 0xBB, 0xBF];
        bytes.extend_from_slice(b"dn: cn=A\nsn: S\n");

        let result = parse_ldif_bytes(&bytes, SuffixPolicy::default()).unwrap();
        assert_eq!(result.records.len(), 1);
    }

    #[test]
    fn test_utf8_input_is_not_reguessed() {
        for (content, name) in [
            ("dn: cn=Müller\nmail: m@x.de\n", "Müller"),
            ("dn: cn=Ñ\n", "Ñ"),
            ("dn: cn=Zoë\n", "Zoë"),
        ] {
            let result = parse_ldif_bytes(content.as_bytes(), SuffixPolicy::default()).unwrap();
            assert_eq!(result.encoding, "utf-8");
            assert_eq!(result.records[0].get("cn1"), Some(name));
        }
    }

    #[test]
    fn test_invalid_utf8_falls_back_to_single_byte() {
        // "dn: cn=Müller" in ISO-8859-1
        let bytes: &[u8] = b"dn: cn=M\xfcller\n";
        let result = parse_ldif_bytes(bytes, SuffixPolicy::default()).unwrap();

        assert_ne!(result.encoding, "utf-8");
        assert_eq!(result.records.len(), 1);
        assert!(result.records[0].get("cn1").unwrap().starts_with('M'));
    }

    #[test]
    fn test_latin1_label_uses_windows_1252_table() {
        // 0xA4 is the currency sign in Latin-1 but the euro sign in ISO-8859-15
        assert_eq!(decode_content(&[0xA4, 0xBC], "iso-8859-1"), "¤¼");
        assert_eq!(decode_content(&[0xA4], "iso-8859-15"), "€");
    }

    #[test]
    fn test_latin1_decoding() {
        // "Société" in ISO-8859-1
        let bytes: &[u8] = &[0x53, 0x6F, 0x63, 0x69, 0xE9, 0x74, 0xE9];
        let decoded = decode_content(bytes, "iso-8859-1");
        assert_eq!(decoded, "Société");
    }

    #[test]
    fn test_parse_missing_file() {
        let err = parse_ldif_file("/definitely/not/here.ldif", SuffixPolicy::default()).unwrap_err();
        assert!(matches!(err, ConvertError::Io { .. }));
    }
}
