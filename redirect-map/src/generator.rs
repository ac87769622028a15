use crate::aliases::{
    AliasTable, domain_aliases, instruction_aliases, slugify, strip_domain_suffix, title_alias,
};
use crate::artifact::ArtifactError;
use crate::config::ValidationError;
use crate::content_source::{ContentSource, SourceError};
use crate::heuristics::Heuristics;
use crate::types::{CanonicalRecord, ContentKind, ContentSnapshot, InvalidMapError, RedirectMap};
use std::collections::BTreeMap;

#[derive(thiserror::Error, Debug)]
pub enum GenerateError {
    #[error("content source error: {0}")]
    Source(#[from] SourceError),
    #[error("artifact error: {0}")]
    Artifact(#[from] ArtifactError),
    #[error("invalid generator config: {0}")]
    Config(#[from] ValidationError),
    #[error("refusing to write redirect map: {0}")]
    Invalid(#[from] InvalidMapError),
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct KindStats {
    /// Records that took part in mapping
    pub records: usize,
    /// Records dropped for having no slug, or a slug that only differs in case from an earlier one
    pub skipped: usize,
    /// Keys in the resulting table, identity entries included
    pub entries: usize,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GenerationStats {
    pub per_kind: BTreeMap<ContentKind, KindStats>,
}

impl GenerationStats {
    pub fn get(&self, kind: ContentKind) -> KindStats {
        self.per_kind.get(&kind).cloned().unwrap_or_default()
    }

    pub fn skipped(&self) -> usize {
        self.per_kind.values().map(|s| s.skipped).sum()
    }
}

pub struct Generator {
    heuristics: Heuristics,
}

impl Generator {
    pub fn new(heuristics: Heuristics) -> Self {
        Generator { heuristics }
    }

    /// Fetches every kind before building anything; a failed fetch aborts the whole run.
    pub async fn generate(
        &self,
        source: &dyn ContentSource,
    ) -> Result<(RedirectMap, GenerationStats), GenerateError> {
        let snapshot = ContentSnapshot {
            instructions: source.fetch(ContentKind::Instruction).await?,
            agents: source.fetch(ContentKind::Agent).await?,
            mcps: source.fetch(ContentKind::McpServer).await?,
        };

        Ok(build_redirect_map(&snapshot, &self.heuristics))
    }
}

/// Drops records without a slug and orders the rest by slug, so the first record to claim
/// an alias is the same on every run.
fn prepare(kind: ContentKind, records: &[CanonicalRecord]) -> (Vec<&CanonicalRecord>, usize) {
    let mut kept = Vec::with_capacity(records.len());
    let mut skipped = 0;

    for record in records {
        if record.slug.trim().is_empty() {
            tracing::warn!(%kind, title = %record.title, "skipping record without slug");
            skipped += 1;
            continue;
        }
        kept.push(record);
    }

    kept.sort_by(|a, b| a.slug.cmp(&b.slug));
    (kept, skipped)
}

fn offer_domains<'a, I>(
    table: &mut AliasTable,
    tokens: I,
    slug: &str,
    heuristics: &Heuristics,
    added: &mut usize,
) where
    I: IntoIterator<Item = &'a str>,
{
    let cap = heuristics.max_domain_aliases_per_record.unwrap_or(usize::MAX);
    for alias in domain_aliases(tokens, heuristics) {
        if *added >= cap {
            return;
        }
        if table.offer(&alias, slug) {
            *added += 1;
        }
    }
}

fn add_mcp_aliases(table: &mut AliasTable, record: &CanonicalRecord, heuristics: &Heuristics) {
    let slug = record.slug.as_str();
    let lower = slug.to_lowercase();
    let mut domains_added = 0;

    offer_domains(table, lower.split('-'), slug, heuristics, &mut domains_added);

    if let Some(bare) = strip_domain_suffix(&lower, heuristics) {
        table.offer(bare, slug);
    }

    let Some(name) = record.name.as_deref() else {
        return;
    };

    let name_slug = slugify(name);
    if name_slug != lower {
        table.offer(&name_slug, slug);
    }

    let lower_name = name.to_lowercase();
    offer_domains(
        table,
        lower_name.split(['/', '-', '_']),
        slug,
        heuristics,
        &mut domains_added,
    );
}

/// Returns the table together with the records that own their identity entry. A record whose
/// slug collides by case with an earlier one gets no entries at all.
fn build_table<'a>(
    kind: ContentKind,
    records: &[&'a CanonicalRecord],
    heuristics: &Heuristics,
) -> (AliasTable, Vec<&'a CanonicalRecord>) {
    let mut table = AliasTable::default();
    let mut kept = Vec::with_capacity(records.len());

    // Canonical slugs first, so no alias can shadow a real record
    for record in records {
        table.seed(&record.slug);
        if table.get(&record.slug.to_lowercase()) == Some(record.slug.as_str()) {
            kept.push(*record);
        }
    }

    for record in &kept {
        let slug = record.slug.as_str();

        if let Some(alias) = title_alias(&record.title, heuristics.min_title_token_len) {
            table.offer(&alias, slug);
        }

        match kind {
            ContentKind::Instruction => {
                for alias in instruction_aliases(slug, heuristics) {
                    table.offer(&alias, slug);
                }
            }
            ContentKind::McpServer => add_mcp_aliases(&mut table, record, heuristics),
            ContentKind::Agent => {}
        }
    }

    (table, kept)
}

/// The agent whose slug or title contains the spec marker, first by slug order.
fn find_spec_agent(agents: &[&CanonicalRecord], heuristics: &Heuristics) -> Option<String> {
    let marker = heuristics.spec_marker.to_lowercase();
    agents
        .iter()
        .find(|r| r.slug.to_lowercase().contains(&marker) || r.title.to_lowercase().contains(&marker))
        .map(|r| r.slug.clone())
}

pub fn build_redirect_map(
    snapshot: &ContentSnapshot,
    heuristics: &Heuristics,
) -> (RedirectMap, GenerationStats) {
    let mut map = RedirectMap::default();
    let mut stats = GenerationStats::default();

    for kind in ContentKind::ALL {
        let (prepared, skipped) = prepare(kind, snapshot.records(kind));
        let (table, records) = build_table(kind, &prepared, heuristics);

        stats.per_kind.insert(
            kind,
            KindStats {
                records: records.len(),
                skipped: skipped + prepared.len() - records.len(),
                entries: table.len(),
            },
        );

        if kind == ContentKind::Agent {
            map.spec = find_spec_agent(&records, heuristics);
        }
        *map.entries_mut(kind) = table.into_entries();
    }

    (map, stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact;
    use std::collections::HashSet;

    fn record(slug: &str, title: &str) -> CanonicalRecord {
        CanonicalRecord::new(slug, title)
    }

    fn build(snapshot: &ContentSnapshot) -> RedirectMap {
        build_redirect_map(snapshot, &Heuristics::default()).0
    }

    fn sample_snapshot() -> ContentSnapshot {
        ContentSnapshot {
            instructions: vec![
                record("python-testing", "Python tests"),
                record("azure-verified-modules-terraform", "Terraform on Azure"),
                record("avm-bicep-instructions", "AVM Bicep"),
                record("python-guidelines", "Python coding"),
                record("react", "React"),
                record("hooks-guide", "React Hooks"),
            ],
            agents: vec![
                record("api-designer", "API Designer"),
                record("spec-author", "Specification Author"),
            ],
            mcps: vec![
                record("mattjegan-swarmia-mcp", "Swarmia").with_name("mattjegan/swarmia-mcp"),
                record("sentry.io", "Sentry"),
                record("weather-mcp", "Forecasts").with_name("Acme/Weather_Server"),
            ],
        }
    }

    #[test]
    fn test_instruction_aliases() {
        let map = build(&sample_snapshot());

        assert_eq!(
            map.lookup(ContentKind::Instruction, "terraform"),
            Some("azure-verified-modules-terraform")
        );
        assert_eq!(
            map.lookup(ContentKind::Instruction, "avm-bicep"),
            Some("avm-bicep-instructions")
        );
        assert_eq!(
            map.lookup(ContentKind::Instruction, "bicep-instructions"),
            Some("avm-bicep-instructions")
        );
        assert_eq!(
            map.lookup(ContentKind::Instruction, "avm"),
            Some("avm-bicep-instructions")
        );
    }

    #[test]
    fn test_first_writer_wins_by_slug_order() {
        let map = build(&sample_snapshot());
        assert_eq!(
            map.lookup(ContentKind::Instruction, "python"),
            Some("python-guidelines")
        );

        // Same result whatever order the store returned the records in
        let mut reversed = sample_snapshot();
        reversed.instructions.reverse();
        assert_eq!(build(&reversed), map);
    }

    #[test]
    fn test_canonical_slug_is_never_shadowed() {
        let map = build(&sample_snapshot());
        // "hooks-guide" sorts first and offers "react", but the react record owns that key
        assert_eq!(map.lookup(ContentKind::Instruction, "react"), Some("react"));
        assert_eq!(
            map.lookup(ContentKind::Instruction, "hooks-guide"),
            Some("hooks-guide")
        );
    }

    #[test]
    fn test_mcp_domain_aliases() {
        let map = build(&sample_snapshot());

        for alias in [
            "swarmia.com",
            "swarmia.org",
            "swarmia.net",
            "swarmia.io",
            "swarmia.dev",
            "swarmia",
        ] {
            assert_eq!(
                map.lookup(ContentKind::McpServer, alias),
                Some("mattjegan-swarmia-mcp"),
                "{alias}"
            );
        }
        assert_eq!(map.lookup(ContentKind::McpServer, "mattjegan.com"), None);
        assert_eq!(map.lookup(ContentKind::McpServer, "mcp.com"), None);

        assert_eq!(map.lookup(ContentKind::McpServer, "sentry"), Some("sentry.io"));

        assert_eq!(
            map.lookup(ContentKind::McpServer, "acme-weather-server"),
            Some("weather-mcp")
        );
        assert_eq!(
            map.lookup(ContentKind::McpServer, "acme.dev"),
            Some("weather-mcp")
        );
        assert_eq!(
            map.lookup(ContentKind::McpServer, "server.io"),
            Some("weather-mcp")
        );
    }

    #[test]
    fn test_domain_alias_cap() {
        let heuristics = Heuristics {
            max_domain_aliases_per_record: Some(2),
            ..Default::default()
        };
        let snapshot = ContentSnapshot {
            mcps: vec![record("linear-tracker-mcp", "").with_name("acme/linear")],
            ..Default::default()
        };

        let (map, _) = build_redirect_map(&snapshot, &heuristics);
        let domain_keys: Vec<&String> = map.mcps.keys().filter(|k| k.contains('.')).collect();
        assert_eq!(domain_keys, vec!["linear.com", "linear.org"]);
        assert_eq!(
            map.lookup(ContentKind::McpServer, "acme-linear"),
            Some("linear-tracker-mcp")
        );
    }

    #[test]
    fn test_spec_agent() {
        let map = build(&sample_snapshot());
        assert_eq!(map.spec.as_deref(), Some("spec-author"));
        assert_eq!(map.lookup(ContentKind::Agent, "specification"), Some("spec-author"));

        let mut no_spec = sample_snapshot();
        no_spec.agents.pop();
        assert_eq!(build(&no_spec).spec, None);
    }

    #[test]
    fn test_records_without_slug_are_skipped() {
        let mut snapshot = sample_snapshot();
        snapshot.agents.push(record("  ", "Orphan Agent"));

        let (map, stats) = build_redirect_map(&snapshot, &Heuristics::default());
        assert_eq!(stats.get(ContentKind::Agent).skipped, 1);
        assert_eq!(stats.get(ContentKind::Agent).records, 2);
        assert_eq!(stats.skipped(), 1);
        assert_eq!(map.lookup(ContentKind::Agent, "orphan"), None);
    }

    #[test]
    fn test_case_clashing_slug_is_skipped() {
        let snapshot = ContentSnapshot {
            agents: vec![
                record("code-reviewer", "Ruby Helper"),
                record("Code-Reviewer", "Kotlin Style"),
                record("planner", "Planning Agent"),
            ],
            ..Default::default()
        };

        let (map, stats) = build_redirect_map(&snapshot, &Heuristics::default());
        let agents = stats.get(ContentKind::Agent);
        assert_eq!(agents.skipped, 1);
        assert_eq!(agents.records, 2);
        assert_eq!(stats.skipped(), 1);

        // Uppercase sorts first, so that record owns the identity entry
        assert_eq!(
            map.lookup(ContentKind::Agent, "code-reviewer"),
            Some("Code-Reviewer")
        );
        assert_eq!(map.lookup(ContentKind::Agent, "kotlin"), Some("Code-Reviewer"));
        assert_eq!(map.lookup(ContentKind::Agent, "ruby"), None);
        assert!(map.validate().is_ok());
    }

    #[test]
    fn test_every_target_is_a_canonical_slug() {
        let snapshot = sample_snapshot();
        let map = build(&snapshot);
        assert!(map.validate().is_ok());

        for kind in ContentKind::ALL {
            let slugs: HashSet<&str> = snapshot
                .records(kind)
                .iter()
                .map(|r| r.slug.as_str())
                .collect();
            for (key, target) in map.entries(kind) {
                assert!(slugs.contains(target.as_str()), "{kind}: {key} -> {target}");
                assert_eq!(key, &key.to_lowercase());
            }
        }
    }

    #[test]
    fn test_regeneration_is_byte_identical() {
        let first = artifact::encode(&build(&sample_snapshot())).unwrap();

        let mut shuffled = sample_snapshot();
        shuffled.mcps.rotate_left(1);
        shuffled.agents.reverse();
        let second = artifact::encode(&build(&shuffled)).unwrap();

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_generate_aborts_on_source_failure() {
        struct FailingAgents;

        #[async_trait::async_trait]
        impl ContentSource for FailingAgents {
            async fn fetch(
                &self,
                kind: ContentKind,
            ) -> Result<Vec<CanonicalRecord>, SourceError> {
                match kind {
                    ContentKind::Agent => Err(SourceError::RetriesExceeded(kind)),
                    _ => Ok(vec![record("react", "React")]),
                }
            }
        }

        let generator = Generator::new(Heuristics::default());
        assert!(matches!(
            generator.generate(&FailingAgents).await,
            Err(GenerateError::Source(SourceError::RetriesExceeded(
                ContentKind::Agent
            )))
        ));
    }
}
