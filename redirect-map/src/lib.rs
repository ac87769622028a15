pub mod aliases;
pub mod artifact;
pub mod config;
pub mod content_source;
pub mod generator;
pub mod heuristics;
pub mod metrics_defs;
pub mod types;

#[cfg(test)]
mod testutils;

use config::{Config, ContentSourceConfig};
use content_source::{ContentApi, ContentSource, FileContentSource};
use generator::{GenerateError, GenerationStats, Generator};
use metrics_defs::{ALIAS_ENTRIES, GENERATE_DURATION, RECORDS_SKIPPED};
use shared::{counter, gauge, histogram};
use std::time::Instant;
use types::ContentKind;

pub use types::{CanonicalRecord, ContentSnapshot, RedirectMap};

pub fn get_source(config: &ContentSourceConfig) -> Box<dyn ContentSource> {
    match config {
        ContentSourceConfig::Api { url, page_size } => Box::new(ContentApi::new(url, *page_size)),
        ContentSourceConfig::File { path } => Box::new(FileContentSource::new(path.clone())),
    }
}

/// Builds the redirect map from the configured source and replaces the artifact.
/// Nothing is written unless every fetch succeeds.
pub async fn run(config: Config) -> Result<GenerationStats, GenerateError> {
    config.validate()?;
    let started = Instant::now();

    let source = get_source(&config.source);
    let generator = Generator::new(config.heuristics);
    let (map, stats) = generator.generate(source.as_ref()).await?;
    // The normalizer refuses to load an invalid map, so never replace a good one with it
    map.validate()?;

    artifact::store(&config.output, &map)?;

    for kind in ContentKind::ALL {
        let kind_stats = stats.get(kind);
        gauge!(ALIAS_ENTRIES, "kind" => kind.path_segment()).set(kind_stats.entries as f64);
        tracing::info!(
            %kind,
            records = kind_stats.records,
            skipped = kind_stats.skipped,
            entries = kind_stats.entries,
            "generated redirect table"
        );
    }
    counter!(RECORDS_SKIPPED).increment(stats.skipped() as u64);
    histogram!(GENERATE_DURATION).record(started.elapsed().as_secs_f64());
    tracing::info!(spec = ?map.spec, output = %config.output.display(), "redirect map written");

    Ok(stats)
}
