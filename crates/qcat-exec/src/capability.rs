//! Executor capability descriptors.
//!
//! An executor advertises the programming languages and SDK names it can
//! run. Dispatch matches an implementation against both sets; membership is
//! exact and case-sensitive.

use std::collections::BTreeSet;

use qcat_model::ProgrammingLanguage;
use serde::{Deserialize, Serialize};

/// Capability pair advertised by an executor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutorCapabilities {
    /// Supported programming languages.
    pub languages: BTreeSet<ProgrammingLanguage>,
    /// Supported SDK names.
    pub sdks: BTreeSet<String>,
}

impl ExecutorCapabilities {
    /// Create an empty capability set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a supported language.
    pub fn with_language(mut self, language: ProgrammingLanguage) -> Self {
        self.languages.insert(language);
        self
    }

    /// Add a supported SDK.
    pub fn with_sdk(mut self, sdk: impl Into<String>) -> Self {
        self.sdks.insert(sdk.into());
        self
    }

    /// Add several supported languages.
    pub fn with_languages(
        mut self,
        languages: impl IntoIterator<Item = ProgrammingLanguage>,
    ) -> Self {
        self.languages.extend(languages);
        self
    }

    /// Add several supported SDKs.
    pub fn with_sdks<S: Into<String>>(mut self, sdks: impl IntoIterator<Item = S>) -> Self {
        self.sdks.extend(sdks.into_iter().map(Into::into));
        self
    }

    /// Whether both the language and the SDK are supported.
    pub fn supports(&self, language: ProgrammingLanguage, sdk: &str) -> bool {
        self.languages.contains(&language) && self.sdks.contains(sdk)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_supports_requires_both() {
        let caps = ExecutorCapabilities::new()
            .with_language(ProgrammingLanguage::Python)
            .with_sdk("Qiskit");

        assert!(caps.supports(ProgrammingLanguage::Python, "Qiskit"));
        assert!(!caps.supports(ProgrammingLanguage::Java, "Qiskit"));
        assert!(!caps.supports(ProgrammingLanguage::Python, "Forest"));
    }

    #[test]
    fn test_sdk_match_is_case_sensitive() {
        let caps = ExecutorCapabilities::new()
            .with_language(ProgrammingLanguage::Python)
            .with_sdk("Qiskit");

        assert!(!caps.supports(ProgrammingLanguage::Python, "qiskit"));
    }

    #[test]
    fn test_bulk_builders() {
        let caps = ExecutorCapabilities::new()
            .with_languages([ProgrammingLanguage::Python, ProgrammingLanguage::Qasm])
            .with_sdks(["Qiskit", "Forest"]);

        assert_eq!(caps.languages.len(), 2);
        assert_eq!(caps.sdks.len(), 2);
    }
}
