//! Decoding of serialized `<surface>: <feature>` results with IPADIC-style
//! feature columns.

use crate::constants::RESULT_SEPARATOR;
use crate::error::{MecabError, Result};

/// One result line split into IPADIC feature columns.
///
/// Columns holding `*` (MeCab's "no value") decode to `None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedFeature {
    /// Surface form.
    pub surface: String,
    /// Part of speech.
    pub pos: String,
    /// Part-of-speech subdivision 1.
    pub pos_detail1: Option<String>,
    /// Part-of-speech subdivision 2.
    pub pos_detail2: Option<String>,
    /// Part-of-speech subdivision 3.
    pub pos_detail3: Option<String>,
    /// Conjugation type.
    pub conjugation1: Option<String>,
    /// Conjugation form.
    pub conjugation2: Option<String>,
    /// Dictionary (base) form.
    pub dictionary_form: Option<String>,
    /// Reading in katakana.
    pub reading: Option<String>,
    /// Pronunciation in katakana.
    pub pronunciation: Option<String>,
}

fn column(value: Option<&str>) -> Option<String> {
    match value {
        None | Some("") | Some("*") => None,
        Some(value) => Some(value.to_string()),
    }
}

fn malformed(line: &str) -> MecabError {
    MecabError::MalformedLine(format!("Failed to parse a MeCab result line: {line}"))
}

impl ParsedFeature {
    /// Decodes one `<surface>: <feature>` line.
    pub fn from_line(line: &str) -> Result<Self> {
        let parts: Vec<&str> = line.split(RESULT_SEPARATOR).collect();
        let [surface, feature] = parts.as_slice() else {
            return Err(malformed(line));
        };
        let fields: Vec<&str> = feature.split(',').collect();
        if !(7..=9).contains(&fields.len()) {
            return Err(malformed(line));
        }
        let field = |index: usize| column(fields.get(index).copied());

        Ok(Self {
            surface: surface.to_string(),
            pos: fields[0].to_string(),
            pos_detail1: field(1),
            pos_detail2: field(2),
            pos_detail3: field(3),
            conjugation1: field(4),
            conjugation2: field(5),
            dictionary_form: field(6),
            reading: field(7),
            pronunciation: field(8),
        })
    }
}

/// Decodes every non-empty line of a serialized result.
pub fn parse_result(result: &str) -> Result<Vec<ParsedFeature>> {
    result
        .trim()
        .split('\n')
        .filter(|line| !line.is_empty())
        .map(ParsedFeature::from_line)
        .collect()
}
