use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// The content categories that take part in redirect mapping.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ContentKind {
    Instruction,
    Agent,
    McpServer,
}

impl ContentKind {
    pub const ALL: [ContentKind; 3] = [
        ContentKind::Instruction,
        ContentKind::Agent,
        ContentKind::McpServer,
    ];

    /// Path segment used both in site URLs and in the content export API.
    pub const fn path_segment(&self) -> &'static str {
        match self {
            ContentKind::Instruction => "instructions",
            ContentKind::Agent => "agents",
            ContentKind::McpServer => "mcps",
        }
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path_segment())
    }
}

/// An approved content item as exported by the content store.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct CanonicalRecord {
    pub slug: String,
    #[serde(default)]
    pub title: String,
    /// Only MCP servers carry this, often as `owner/repo`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl CanonicalRecord {
    pub fn new<S, T>(slug: S, title: T) -> Self
    where
        S: Into<String>,
        T: Into<String>,
    {
        CanonicalRecord {
            slug: slug.into(),
            title: title.into(),
            name: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// All approved records, grouped by kind. This is also the shape of the offline JSON export.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct ContentSnapshot {
    #[serde(default)]
    pub instructions: Vec<CanonicalRecord>,
    #[serde(default)]
    pub agents: Vec<CanonicalRecord>,
    #[serde(default)]
    pub mcps: Vec<CanonicalRecord>,
}

impl ContentSnapshot {
    pub fn records(&self, kind: ContentKind) -> &[CanonicalRecord] {
        match kind {
            ContentKind::Instruction => &self.instructions,
            ContentKind::Agent => &self.agents,
            ContentKind::McpServer => &self.mcps,
        }
    }
}

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum InvalidMapError {
    #[error("redirect map has no entries")]
    Empty,
    #[error("{kind} key is not lowercase: {key}")]
    NonLowercaseKey { kind: ContentKind, key: String },
    #[error("{kind} entry {key} points at {target}, which is not a canonical slug")]
    DanglingTarget {
        kind: ContentKind,
        key: String,
        target: String,
    },
    #[error("spec slug {0} is not a canonical agent slug")]
    UnknownSpec(String),
}

/// Alias-to-canonical-slug tables for each content kind, plus the agent served at `/spec`.
///
/// Keys are lowercase. Every canonical slug is present as its own (lowercased) key, so a
/// value can always be checked against the table it came from.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct RedirectMap {
    pub instructions: BTreeMap<String, String>,
    pub agents: BTreeMap<String, String>,
    pub mcps: BTreeMap<String, String>,
    pub spec: Option<String>,
}

impl RedirectMap {
    pub fn entries(&self, kind: ContentKind) -> &BTreeMap<String, String> {
        match kind {
            ContentKind::Instruction => &self.instructions,
            ContentKind::Agent => &self.agents,
            ContentKind::McpServer => &self.mcps,
        }
    }

    pub fn entries_mut(&mut self, kind: ContentKind) -> &mut BTreeMap<String, String> {
        match kind {
            ContentKind::Instruction => &mut self.instructions,
            ContentKind::Agent => &mut self.agents,
            ContentKind::McpServer => &mut self.mcps,
        }
    }

    /// Case-insensitive on the key; the canonical slug comes back exactly as stored.
    pub fn lookup(&self, kind: ContentKind, key: &str) -> Option<&str> {
        self.entries(kind)
            .get(&key.to_lowercase())
            .map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        ContentKind::ALL.iter().all(|k| self.entries(*k).is_empty())
    }

    pub fn validate(&self) -> Result<(), InvalidMapError> {
        if self.is_empty() {
            return Err(InvalidMapError::Empty);
        }

        for kind in ContentKind::ALL {
            let entries = self.entries(kind);
            for (key, target) in entries {
                if key.to_lowercase() != *key {
                    return Err(InvalidMapError::NonLowercaseKey {
                        kind,
                        key: key.clone(),
                    });
                }

                if entries.get(&target.to_lowercase()) != Some(target) {
                    return Err(InvalidMapError::DanglingTarget {
                        kind,
                        key: key.clone(),
                        target: target.clone(),
                    });
                }
            }
        }

        if let Some(spec) = &self.spec
            && !self.agents.values().any(|slug| slug == spec)
        {
            return Err(InvalidMapError::UnknownSpec(spec.clone()));
        }

        Ok(())
    }
}
