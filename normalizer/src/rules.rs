//! Per-request URL normalization against the redirect map.
//!
//! Rules are checked in a fixed order and the first one that applies decides:
//!
//! 1. trailing slash: `/tools/` → `/tools`
//! 2. legacy instruction file: `/instructions/<slug>.instructions.md` → `/instructions/<canonical>`,
//!    or the `/instructions` listing when the slug is unknown
//! 3. spec shortcut: `/spec` → `/agents/<spec agent>`, or the `/agents` listing
//! 4. MCP slug repair: `/mcps/<alias>` → `/mcps/<canonical>`, only for slugs outside `[a-z0-9-]`
//! 5. instruction slug repair: `/instructions/<alias>` → `/instructions/<canonical>`
//!
//! Anything else passes through. Every redirect is permanent and keeps the query string.
//! Decisions only read the in-memory map, so they never block.

use redirect_map::RedirectMap;
use redirect_map::types::ContentKind;
use std::sync::Arc;

const INSTRUCTIONS_PREFIX: &str = "/instructions/";
const LEGACY_INSTRUCTION_SUFFIX: &str = ".instructions.md";
const MCPS_PREFIX: &str = "/mcps/";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Rule {
    TrailingSlash,
    LegacyInstructionFile,
    SpecShortcut,
    McpSlugRepair,
    InstructionSlugRepair,
}

impl Rule {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Rule::TrailingSlash => "trailing_slash",
            Rule::LegacyInstructionFile => "legacy_instruction_file",
            Rule::SpecShortcut => "spec_shortcut",
            Rule::McpSlugRepair => "mcp_slug_repair",
            Rule::InstructionSlugRepair => "instruction_slug_repair",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Decision {
    PassThrough,
    /// 301 to `location`, which already carries the original query string
    Redirect { location: String, rule: Rule },
}

fn with_query(path: String, query: Option<&str>) -> String {
    match query {
        Some(q) => format!("{path}?{q}"),
        None => path,
    }
}

/// Anything with a dot or a character outside `[a-z0-9-]`.
fn looks_malformed(slug: &str) -> bool {
    slug.chars()
        .any(|c| !(c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-'))
}

fn legacy_instruction_slug(path: &str) -> Option<&str> {
    path.strip_prefix(INSTRUCTIONS_PREFIX)?
        .strip_suffix(LEGACY_INSTRUCTION_SUFFIX)
        .filter(|slug| !slug.is_empty() && !slug.contains('/'))
}

/// Holds the redirect map for the life of the process. Cheap to clone.
#[derive(Clone, Debug)]
pub struct Normalizer {
    map: Arc<RedirectMap>,
}

impl Normalizer {
    pub fn new(map: Arc<RedirectMap>) -> Self {
        Normalizer { map }
    }

    pub fn map(&self) -> &RedirectMap {
        &self.map
    }

    pub fn decide(&self, path: &str, query: Option<&str>) -> Decision {
        let (location, rule) = match self.rewrite(path) {
            Some(rewrite) => rewrite,
            None => return Decision::PassThrough,
        };

        Decision::Redirect {
            location: with_query(location, query),
            rule,
        }
    }

    fn rewrite(&self, path: &str) -> Option<(String, Rule)> {
        if path != "/"
            && let Some(trimmed) = path.strip_suffix('/')
        {
            let target = if trimmed.is_empty() { "/" } else { trimmed };
            return Some((target.to_string(), Rule::TrailingSlash));
        }

        if let Some(slug) = legacy_instruction_slug(path) {
            let target = match self.map.lookup(ContentKind::Instruction, slug) {
                Some(canonical) => format!("{INSTRUCTIONS_PREFIX}{canonical}"),
                None => "/instructions".to_string(),
            };
            return Some((target, Rule::LegacyInstructionFile));
        }

        if path == "/spec" || path == "/spec/" {
            let target = match &self.map.spec {
                Some(slug) => format!("/agents/{slug}"),
                None => "/agents".to_string(),
            };
            return Some((target, Rule::SpecShortcut));
        }

        if let Some(slug) = path.strip_prefix(MCPS_PREFIX) {
            if slug.is_empty() || !looks_malformed(slug) {
                return None;
            }
            return self
                .map
                .lookup(ContentKind::McpServer, slug)
                .filter(|canonical| *canonical != slug)
                .map(|canonical| (format!("{MCPS_PREFIX}{canonical}"), Rule::McpSlugRepair));
        }

        if let Some(slug) = path.strip_prefix(INSTRUCTIONS_PREFIX)
            && !slug.is_empty()
        {
            return self
                .map
                .lookup(ContentKind::Instruction, slug)
                .filter(|canonical| *canonical != slug)
                .map(|canonical| {
                    (
                        format!("{INSTRUCTIONS_PREFIX}{canonical}"),
                        Rule::InstructionSlugRepair,
                    )
                });
        }

        None
    }
}
