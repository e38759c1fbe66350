//! Manifest line codec
//!
//! A manifest line is `<hash><whitespace><filename><line ending>`. Only the
//! first whitespace run separates the hash from the file name, so names may
//! contain spaces. Lines that do not fit the grammar are carried through as
//! opaque bytes and never dropped.

use regex::Regex;
use std::io::{self, BufRead};

/// Default grammar for a manifest entry, applied without the line ending
pub const DEFAULT_RECORD_PATTERN: &str = r"\A(\S+)(\s+)(\S.*)\z";

/// A parsed `<hash, filename>` entry that re-emits byte for byte
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestRecord {
    pub hash: String,
    /// Raw whitespace run between hash and file name
    pub separator: String,
    pub filename: String,
    /// `"\n"`, `"\r\n"`, or empty for an unterminated final line
    pub line_ending: String,
}

impl ManifestRecord {
    /// Append the encoded line to `out`
    pub fn write_to(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(self.hash.as_bytes());
        out.extend_from_slice(self.separator.as_bytes());
        out.extend_from_slice(self.filename.as_bytes());
        out.extend_from_slice(self.line_ending.as_bytes());
    }
}

/// One line of a manifest file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManifestLine {
    Record(ManifestRecord),
    /// Raw bytes of a line outside the grammar, terminator included
    Opaque(Vec<u8>),
}

impl ManifestLine {
    pub fn write_to(&self, out: &mut Vec<u8>) {
        match self {
            ManifestLine::Record(record) => record.write_to(out),
            ManifestLine::Opaque(raw) => out.extend_from_slice(raw),
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        self.write_to(&mut out);
        out
    }

    pub fn as_record(&self) -> Option<&ManifestRecord> {
        match self {
            ManifestLine::Record(record) => Some(record),
            ManifestLine::Opaque(_) => None,
        }
    }
}

/// Compiled record grammar shared by every reader of a run
#[derive(Debug, Clone)]
pub struct RecordGrammar {
    pattern: Regex,
}

impl RecordGrammar {
    /// Compile a grammar. The pattern must expose three capture groups:
    /// hash, separator and file name.
    pub fn new(pattern: &str) -> crate::Result<Self> {
        let pattern = Regex::new(pattern)?;
        if pattern.captures_len() < 4 {
            return Err(crate::Error::InvalidGrammar(
                "record pattern needs hash, separator and filename groups".to_string(),
            ));
        }
        Ok(Self { pattern })
    }

    /// Parse one raw line (terminator included)
    pub fn parse(&self, raw: &[u8]) -> ManifestLine {
        let (body, ending) = split_line_ending(raw);

        let Ok(text) = std::str::from_utf8(body) else {
            return ManifestLine::Opaque(raw.to_vec());
        };
        let Ok(line_ending) = std::str::from_utf8(ending) else {
            return ManifestLine::Opaque(raw.to_vec());
        };

        match self.pattern.captures(text) {
            Some(caps) => match (caps.get(1), caps.get(2), caps.get(3)) {
                (Some(hash), Some(separator), Some(filename)) => {
                    ManifestLine::Record(ManifestRecord {
                        hash: hash.as_str().to_string(),
                        separator: separator.as_str().to_string(),
                        filename: filename.as_str().to_string(),
                        line_ending: line_ending.to_string(),
                    })
                }
                _ => ManifestLine::Opaque(raw.to_vec()),
            },
            None => ManifestLine::Opaque(raw.to_vec()),
        }
    }

    /// Stream the lines of `reader` lazily
    pub fn reader<R: BufRead>(&self, reader: R) -> ManifestReader<'_, R> {
        ManifestReader {
            grammar: self,
            inner: reader,
            buf: Vec::new(),
        }
    }
}

impl Default for RecordGrammar {
    fn default() -> Self {
        Self {
            pattern: Regex::new(DEFAULT_RECORD_PATTERN).expect("default record pattern compiles"),
        }
    }
}

fn split_line_ending(raw: &[u8]) -> (&[u8], &[u8]) {
    if raw.ends_with(b"\r\n") {
        raw.split_at(raw.len() - 2)
    } else if raw.ends_with(b"\n") {
        raw.split_at(raw.len() - 1)
    } else {
        (raw, &raw[raw.len()..])
    }
}

/// Forward-only iterator over the lines of a manifest
pub struct ManifestReader<'g, R> {
    grammar: &'g RecordGrammar,
    inner: R,
    buf: Vec<u8>,
}

impl<R: BufRead> Iterator for ManifestReader<'_, R> {
    type Item = io::Result<ManifestLine>;

    fn next(&mut self) -> Option<Self::Item> {
        self.buf.clear();
        match self.inner.read_until(b'\n', &mut self.buf) {
            Ok(0) => None,
            Ok(_) => Some(Ok(self.grammar.parse(&self.buf))),
            Err(e) => Some(Err(e)),
        }
    }
}
