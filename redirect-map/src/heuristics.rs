//! Lookup tables that drive alias derivation. Kept as data so they can be tuned from
//! configuration without touching the derivation code.

use crate::config::ValidationError;
use serde::Deserialize;
use std::collections::BTreeSet;

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct Heuristics {
    /// Slug suffixes stripped from instruction slugs, e.g. `-instructions`.
    pub instruction_suffixes: Vec<String>,
    /// Slug tokens dropped one at a time from instruction slugs.
    pub abbreviations: BTreeSet<String>,
    /// Top-level domains appended to MCP slug and name tokens, in order.
    pub domain_suffixes: Vec<String>,
    /// Tokens starting with any of these never become domain aliases.
    pub excluded_domain_prefixes: BTreeSet<String>,
    /// Substring that marks the agent served at `/spec`.
    pub spec_marker: String,
    /// Shortest title token that may serve as an alias.
    pub min_title_token_len: usize,
    /// Shortest slug or name token that may seed domain aliases.
    pub min_domain_token_len: usize,
    /// Upper bound on domain aliases inserted per MCP record. Unbounded when unset.
    pub max_domain_aliases_per_record: Option<usize>,
}

impl Default for Heuristics {
    fn default() -> Self {
        Heuristics {
            instruction_suffixes: strings(&[
                "-instructions",
                "-guidelines",
                "-best-practices",
                "-conventions",
            ]),
            abbreviations: strings(&[
                "avm", "api", "sdk", "cli", "ui", "ux", "db", "sql", "http", "https", "json", "xml",
                "yaml", "md", "ts", "js", "py", "rb", "go", "rs",
            ])
            .into_iter()
            .collect(),
            domain_suffixes: strings(&[".com", ".org", ".net", ".io", ".dev"]),
            excluded_domain_prefixes: strings(&["mattjegan", "github", "user", "author"])
                .into_iter()
                .collect(),
            spec_marker: "specification".into(),
            min_title_token_len: 3,
            min_domain_token_len: 4,
            max_domain_aliases_per_record: None,
        }
    }
}

impl Heuristics {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(suffix) = self.instruction_suffixes.iter().find(|s| s.is_empty()) {
            return Err(ValidationError::EmptyEntry("instruction_suffixes", suffix.clone()));
        }

        if self.abbreviations.iter().any(|s| s.is_empty()) {
            return Err(ValidationError::EmptyEntry("abbreviations", String::new()));
        }

        if self.excluded_domain_prefixes.iter().any(|s| s.is_empty()) {
            return Err(ValidationError::EmptyEntry(
                "excluded_domain_prefixes",
                String::new(),
            ));
        }

        for suffix in &self.domain_suffixes {
            if !suffix.starts_with('.') || suffix.len() < 2 {
                return Err(ValidationError::InvalidDomainSuffix(suffix.clone()));
            }
        }

        if self.spec_marker.trim().is_empty() {
            return Err(ValidationError::EmptySpecMarker);
        }

        if self.min_title_token_len == 0 || self.min_domain_token_len == 0 {
            return Err(ValidationError::ZeroTokenLength);
        }

        Ok(())
    }

    pub(crate) fn is_abbreviation(&self, token: &str) -> bool {
        self.abbreviations.contains(token)
    }

    pub(crate) fn is_domain_candidate(&self, token: &str) -> bool {
        token.chars().count() >= self.min_domain_token_len
            && !self
                .excluded_domain_prefixes
                .iter()
                .any(|prefix| token.starts_with(prefix.as_str()))
    }
}
