//! Checksum-framed sentence codec.
//!
//! One codec serves both dialects spoken by the buoy: NMEA 0183 sentences
//! from the GPS receiver and the buoy's own `PK` application packets. A
//! sentence is a single text line of the shape
//! `<preamble><talker><type>[,<field>...]*<CC><postfix>` where `<CC>` is two
//! uppercase hex digits, the XOR of every byte between the preamble and the
//! terminator.

use arrayvec::ArrayString;
use core::fmt::Write as _;

/// Framing characters for one protocol dialect.
///
/// The GPS dialect and the buoy packet dialect share the default framing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SentenceSpec {
    pub preamble: char,
    pub terminator: char,
    pub delimiter: char,
    pub postfix: &'static str,
}

impl Default for SentenceSpec {
    fn default() -> Self {
        Self {
            preamble: '$',
            terminator: '*',
            delimiter: ',',
            postfix: "\r\n",
        }
    }
}

/// XOR checksum over `data`, rendered as two uppercase hex digits.
pub fn checksum(data: &str) -> ArrayString<2> {
    let mut crc = 0u8;
    for byte in data.bytes() {
        crc ^= byte;
    }
    let mut out = ArrayString::new();
    let _ = write!(out, "{crc:02X}");
    out
}

/// Syntax check before parsing: exactly one preamble at index 0 and exactly
/// one terminator. A sentence failing this check cannot be checksummed.
pub fn validate(text: &str, spec: &SentenceSpec) -> bool {
    text.starts_with(spec.preamble)
        && text.matches(spec.preamble).count() == 1
        && text.matches(spec.terminator).count() == 1
}

/// A scanned sentence. Ephemeral: rebuilt for every line.
///
/// `valid` is the only field callers may trust unconditionally; `pkt_type`
/// and `fields` are meaningful only when `valid` is true.
#[derive(Debug, Clone, Default)]
pub struct Sentence {
    pub raw: String,
    /// Talker id and type together, e.g. `GPGGA` or `PK001`.
    pub pkt_type: String,
    /// Raw field text, still delimiter-joined.
    pub fields: String,
    /// Checksum as transmitted.
    pub crc: String,
    pub valid: bool,
}

impl Sentence {
    /// Scan `text` against `spec`. Never fails; a malformed sentence comes
    /// back with `valid == false` and empty components.
    pub fn parse(text: &str, spec: &SentenceSpec) -> Self {
        if !validate(text, spec) {
            return Self {
                raw: text.to_string(),
                ..Self::default()
            };
        }

        // Split points are guaranteed by validate().
        let after_preamble = &text[text.find(spec.preamble).unwrap() + spec.preamble.len_utf8()..];
        let (cksum_data, tail) = after_preamble
            .split_once(spec.terminator)
            .unwrap_or((after_preamble, ""));
        let (pkt_type, fields) = match cksum_data.split_once(spec.delimiter) {
            Some((t, f)) => (t, f),
            None => (cksum_data, ""),
        };
        let crc = tail.trim_end_matches(|c| spec.postfix.contains(c));
        let valid = checksum(cksum_data).as_str() == crc.to_ascii_uppercase();

        Self {
            raw: text.to_string(),
            pkt_type: pkt_type.to_string(),
            fields: fields.to_string(),
            crc: crc.to_string(),
            valid,
        }
    }

    /// Iterate the delimiter-separated fields.
    pub fn field_iter<'a>(&'a self, spec: &SentenceSpec) -> impl Iterator<Item = &'a str> {
        let delimiter = spec.delimiter;
        self.fields.split(move |c| c == delimiter)
    }
}

/// Construct a framed sentence from its parts.
pub fn create(talker_id: &str, pkt_type: &str, fields: Option<&str>, spec: &SentenceSpec) -> String {
    let mut value = String::from(pkt_type);
    if let Some(fields) = fields {
        value.push(spec.delimiter);
        value.push_str(fields);
    }

    let mut sentence = String::new();
    sentence.push(spec.preamble);
    sentence.push_str(talker_id);
    sentence.push_str(&value);
    sentence.push(spec.terminator);
    sentence.push_str(&checksum(&format!("{talker_id}{value}")));
    sentence.push_str(spec.postfix);
    sentence
}

/// Accumulates raw bytes from a device and yields complete sentences.
///
/// Bytes outside 7-bit ASCII are dropped at the door; garbled reads then
/// surface as checksum failures rather than decode errors.
#[derive(Debug, Default)]
pub struct SentenceStream {
    unterminated: String,
}

impl SentenceStream {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append raw bytes, discarding anything non-ASCII.
    pub fn feed(&mut self, data: &[u8]) {
        for &byte in data {
            if byte < 0x80 {
                self.unterminated.push(byte as char);
            }
        }
    }

    /// Pop the next complete (postfix-terminated) line, without its postfix.
    pub fn next_terminated(&mut self, spec: &SentenceSpec) -> Option<String> {
        let at = self.unterminated.find(spec.postfix)?;
        let line = self.unterminated[..at].to_string();
        self.unterminated.drain(..at + spec.postfix.len());
        Some(line)
    }

    pub fn pending(&self) -> usize {
        self.unterminated.len()
    }

    pub fn clear(&mut self) {
        self.unterminated.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checksum_known_value() {
        // XOR of "PK001" bytes
        assert_eq!(checksum("PK001").as_str(), "2A");
        assert_eq!(checksum("").as_str(), "00");
    }

    #[test]
    fn test_create_then_parse_roundtrip() {
        let spec = SentenceSpec::default();
        let text = create("PK", "004", Some("3745.78,N,12216.60,W,0,0,21:22:00,01"), &spec);
        let parsed = Sentence::parse(text.trim_end(), &spec);
        assert!(parsed.valid);
        assert_eq!(parsed.pkt_type, "PK004");
        assert_eq!(parsed.fields, "3745.78,N,12216.60,W,0,0,21:22:00,01");
    }

    #[test]
    fn test_create_without_fields() {
        let spec = SentenceSpec::default();
        let text = create("PK", "005", None, &spec);
        let parsed = Sentence::parse(text.trim_end(), &spec);
        assert!(parsed.valid);
        assert_eq!(parsed.pkt_type, "PK005");
        assert_eq!(parsed.fields, "");
    }

    #[test]
    fn test_corrupted_checksum_is_invalid() {
        let spec = SentenceSpec::default();
        let text = create("GP", "GGA", Some("212200,3749.5,N"), &spec);
        // Flip one checksum character
        let mut bytes = text.trim_end().to_string().into_bytes();
        let last = bytes.len() - 1;
        bytes[last] = if bytes[last] == b'0' { b'1' } else { b'0' };
        let corrupted = String::from_utf8(bytes).unwrap();
        assert!(!Sentence::parse(&corrupted, &spec).valid);
    }

    #[test]
    fn test_multiple_preambles_invalid() {
        let spec = SentenceSpec::default();
        assert!(!validate("$GP$GGA,1*00", &spec));
        assert!(!validate("GPGGA,1*00", &spec));
        assert!(!validate("$GPGGA,1,2,3", &spec));
        assert!(!validate("$GPGGA,1*2*00", &spec));
    }

    #[test]
    fn test_checksum_case_insensitive() {
        let spec = SentenceSpec::default();
        let text = create("PK", "001", Some("lat:1.0"), &spec);
        let base = text.trim_end();
        assert!(Sentence::parse(base, &spec).valid);
        let (head, crc) = base.split_at(base.len() - 2);
        let lower = format!("{head}{}", crc.to_lowercase());
        assert!(Sentence::parse(&lower, &spec).valid);
    }

    #[test]
    fn test_stream_accumulates_partial_lines() {
        let spec = SentenceSpec::default();
        let mut stream = SentenceStream::new();
        stream.feed(b"$GPGGA,1*");
        assert!(stream.next_terminated(&spec).is_none());
        stream.feed(b"00\r\n$GPRMC");
        assert_eq!(stream.next_terminated(&spec).unwrap(), "$GPGGA,1*00");
        assert!(stream.next_terminated(&spec).is_none());
        assert_eq!(stream.pending(), "$GPRMC".len());
    }

    #[test]
    fn test_stream_drops_non_ascii() {
        let spec = SentenceSpec::default();
        let mut stream = SentenceStream::new();
        stream.feed(b"$GP\xffGGA,1*00\r\n");
        assert_eq!(stream.next_terminated(&spec).unwrap(), "$GPGGA,1*00");
    }
}
