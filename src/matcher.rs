use std::fmt;

use regex::{Regex, RegexBuilder};
use thiserror::Error;

use crate::rules::{ActiveRule, OverlayStrategy};

const RASTER_SUFFIX: &str = r"\.jpe?g$";

#[derive(Debug, Error)]
pub enum MatchError {
    #[error("file name '{file_name}' does not match the {rule} key expression")]
    NoKeyMatch {
        file_name: String,
        rule: &'static str,
    },

    #[error("failed to build matcher for '{file_name}'")]
    Pattern {
        file_name: String,
        #[source]
        source: regex::Error,
    },
}

/// Canonical key pulled out of a source name by the active rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentKey(String);

impl DocumentKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Case-insensitive, start-anchored test for auxiliary file names.
#[derive(Debug, Clone)]
pub struct FileMatcher {
    regex: Regex,
}

impl FileMatcher {
    fn build(pattern: &str, file_name: &str) -> Result<Self, MatchError> {
        let regex = RegexBuilder::new(pattern)
            .case_insensitive(true)
            .build()
            .map_err(|source| MatchError::Pattern {
                file_name: file_name.to_string(),
                source,
            })?;
        Ok(Self { regex })
    }

    pub fn is_match(&self, file_name: &str) -> bool {
        self.regex.is_match(file_name)
    }

    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }
}

/// Backslash-escapes `- [ ] { } ( ) * + ? . , \ ^ $ | #` and whitespace.
///
/// Non-ASCII whitespace is emitted as a `\x{..}` escape, since the regex
/// parser only accepts a superfluous backslash before ASCII characters.
pub fn escape_literal(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len() * 2);
    for character in text.chars() {
        match character {
            '-' | '[' | ']' | '{' | '}' | '(' | ')' | '*' | '+' | '?' | '.' | ',' | '\\'
            | '^' | '$' | '|' | '#' => {
                escaped.push('\\');
                escaped.push(character);
            }
            c if c.is_ascii_whitespace() || c == '\u{000B}' => {
                escaped.push('\\');
                escaped.push(c);
            }
            c if c.is_whitespace() => {
                escaped.push_str(&format!(r"\x{{{:X}}}", c as u32));
            }
            c => escaped.push(c),
        }
    }
    escaped
}

pub fn derive_document_key(file_name: &str, rule: &ActiveRule) -> Result<DocumentKey, MatchError> {
    rule.key_expression()
        .captures(file_name)
        .and_then(|captures| captures.get(1))
        .map(|key| DocumentKey(key.as_str().to_string()))
        .ok_or_else(|| MatchError::NoKeyMatch {
            file_name: file_name.to_string(),
            rule: rule.name(),
        })
}

/// Matches documents whose name starts with the whole source name. The key is
/// only a validity gate here; it is not part of the pattern.
pub fn derive_multi_page_matcher(
    file_name: &str,
    rule: &ActiveRule,
) -> Result<FileMatcher, MatchError> {
    derive_document_key(file_name, rule)?;
    FileMatcher::build(&format!("^{}", escape_literal(file_name)), file_name)
}

pub fn derive_overlay_matcher(file_name: &str, rule: &ActiveRule) -> Result<FileMatcher, MatchError> {
    let pattern = match rule.overlay() {
        OverlayStrategy::FixedOffset { delimiter, width } => {
            // A short or empty segment gives a permissive matcher; kept as is.
            let segment = fixed_offset_segment(file_name, delimiter, width);
            format!("^{}{}", escape_literal(&segment), RASTER_SUFFIX)
        }
        OverlayStrategy::Prefix => format!("^{}.*{}", escape_literal(file_name), RASTER_SUFFIX),
    };
    FileMatcher::build(&pattern, file_name)
}

/// Up to `width` characters after the first `delimiter`, or from the start
/// when the delimiter is absent.
fn fixed_offset_segment(file_name: &str, delimiter: char, width: usize) -> String {
    let start = file_name
        .find(delimiter)
        .map(|index| index + delimiter.len_utf8())
        .unwrap_or(0);
    file_name[start..].chars().take(width).collect()
}
