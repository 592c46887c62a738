//! Programming language tags.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Programming language an implementation is written in.
///
/// Matching is by exact variant; the textual form is case-sensitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ProgrammingLanguage {
    Python,
    Java,
    JavaScript,
    Qasm,
    Quil,
    QSharp,
}

impl ProgrammingLanguage {
    /// All known languages, in declaration order.
    pub const ALL: [ProgrammingLanguage; 6] = [
        ProgrammingLanguage::Python,
        ProgrammingLanguage::Java,
        ProgrammingLanguage::JavaScript,
        ProgrammingLanguage::Qasm,
        ProgrammingLanguage::Quil,
        ProgrammingLanguage::QSharp,
    ];

    /// Canonical name.
    pub fn as_str(&self) -> &'static str {
        match self {
            ProgrammingLanguage::Python => "Python",
            ProgrammingLanguage::Java => "Java",
            ProgrammingLanguage::JavaScript => "JavaScript",
            ProgrammingLanguage::Qasm => "Qasm",
            ProgrammingLanguage::Quil => "Quil",
            ProgrammingLanguage::QSharp => "QSharp",
        }
    }
}

impl fmt::Display for ProgrammingLanguage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a language name is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown programming language: {0}")]
pub struct ParseLanguageError(pub String);

impl FromStr for ProgrammingLanguage {
    type Err = ParseLanguageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|lang| lang.as_str() == s)
            .ok_or_else(|| ParseLanguageError(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_languages() {
        for lang in ProgrammingLanguage::ALL {
            assert_eq!(lang.as_str().parse::<ProgrammingLanguage>(), Ok(lang));
        }
    }

    #[test]
    fn test_parse_is_case_sensitive() {
        assert_eq!(
            "python".parse::<ProgrammingLanguage>(),
            Err(ParseLanguageError("python".into()))
        );
    }

    #[test]
    fn test_display_matches_serde() {
        let json = serde_json::to_string(&ProgrammingLanguage::QSharp).unwrap();
        assert_eq!(json, format!("\"{}\"", ProgrammingLanguage::QSharp));
    }
}
