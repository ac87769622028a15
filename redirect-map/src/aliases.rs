//! Alias derivation: turns a canonical record into the extra keys that should resolve to it.

use crate::heuristics::Heuristics;
use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

/// Lowercases, maps every run of non-alphanumeric characters to a single `-`, and trims
/// dashes from both ends. `Acme/Weather_Server` becomes `acme-weather-server`.
pub fn slugify(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.to_lowercase().chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c);
        } else if !out.is_empty() && !out.ends_with('-') {
            out.push('-');
        }
    }

    while out.ends_with('-') {
        out.pop();
    }
    out
}

/// First word of the title that is at least `min_len` characters long, after dropping
/// punctuation.
pub fn title_alias(title: &str, min_len: usize) -> Option<String> {
    let cleaned: String = title
        .to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect();

    cleaned
        .split_whitespace()
        .find(|token| token.chars().count() >= min_len)
        .map(str::to_string)
}

/// Instruction slug variants: known suffix removed, one abbreviation token removed, and
/// all single-character tokens removed.
pub fn instruction_aliases(slug: &str, heuristics: &Heuristics) -> Vec<String> {
    let slug = slug.to_lowercase();
    let mut aliases = Vec::new();

    for suffix in &heuristics.instruction_suffixes {
        if let Some(stripped) = slug.strip_suffix(suffix.as_str())
            && !stripped.is_empty()
        {
            aliases.push(stripped.to_string());
        }
    }

    let tokens: Vec<&str> = slug.split('-').collect();
    for (i, token) in tokens.iter().enumerate() {
        if !heuristics.is_abbreviation(token) {
            continue;
        }
        let rest = tokens
            .iter()
            .enumerate()
            .filter(|(j, _)| *j != i)
            .map(|(_, t)| *t)
            .collect::<Vec<_>>()
            .join("-");
        if !rest.is_empty() {
            aliases.push(rest);
        }
    }

    let without_single = tokens
        .iter()
        .copied()
        .filter(|t| t.chars().count() > 1)
        .collect::<Vec<_>>()
        .join("-");
    if !without_single.is_empty() && without_single != slug {
        aliases.push(without_single);
    }

    aliases
}

/// `token.com`, `token.org`, ... for every token eligible to stand in for a domain name.
pub fn domain_aliases<'a, I>(tokens: I, heuristics: &Heuristics) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    tokens
        .into_iter()
        .filter(|t| heuristics.is_domain_candidate(t))
        .flat_map(|token| {
            heuristics
                .domain_suffixes
                .iter()
                .map(move |suffix| format!("{token}{suffix}"))
        })
        .collect()
}

/// The slug without its domain suffix, if it ends with one.
pub fn strip_domain_suffix<'a>(slug: &'a str, heuristics: &Heuristics) -> Option<&'a str> {
    heuristics
        .domain_suffixes
        .iter()
        .find_map(|suffix| slug.strip_suffix(suffix.as_str()))
        .filter(|stripped| !stripped.is_empty())
}

/// One category of the redirect map while it is being built.
///
/// Keys are lowercased on insert. The first slug to claim a key keeps it.
#[derive(Debug, Default)]
pub struct AliasTable {
    entries: BTreeMap<String, String>,
}

impl AliasTable {
    /// Registers a canonical slug as its own key.
    pub fn seed(&mut self, slug: &str) -> bool {
        match self.entries.entry(slug.to_lowercase()) {
            Entry::Vacant(entry) => {
                entry.insert(slug.to_string());
                true
            }
            Entry::Occupied(entry) => {
                if entry.get() != slug {
                    tracing::warn!(
                        slug,
                        existing = %entry.get(),
                        "canonical slug differs only in case from an earlier record"
                    );
                }
                false
            }
        }
    }

    /// Points `alias` at `slug` unless the key is already taken. Returns whether it was added.
    pub fn offer(&mut self, alias: &str, slug: &str) -> bool {
        let key = alias.to_lowercase();
        if key.is_empty() {
            return false;
        }

        match self.entries.entry(key) {
            Entry::Vacant(entry) => {
                entry.insert(slug.to_string());
                true
            }
            Entry::Occupied(_) => false,
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn into_entries(self) -> BTreeMap<String, String> {
        self.entries
    }
}
