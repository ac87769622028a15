mod config;

use clap::{Parser, Subcommand};
use config::{Config, LoggingConfig, MetricsConfig};
use metrics_exporter_statsd::StatsdBuilder;
use normalizer::errors::NormalizerError;
use redirect_map::artifact::ArtifactError;
use redirect_map::generator::GenerateError;
use shared::metrics_defs::describe_all;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

#[derive(Parser)]
#[command(version, about = "Redirect map generation and URL normalization for the content directory")]
struct Cli {
    /// Path to the YAML config file
    #[arg(short, long, default_value = "slugmap.yaml")]
    config: PathBuf,

    #[command(subcommand)]
    command: CliCommand,
}

#[derive(Subcommand)]
enum CliCommand {
    /// Rebuild the redirect map from approved content and replace the artifact
    Generate,
    /// Serve the request normalizer in front of the content application
    Serve,
    /// Load and validate the redirect map artifact, then exit
    Check,
}

#[derive(thiserror::Error, Debug)]
enum CliError {
    #[error("config has no {0} section")]
    MissingSection(&'static str),
    #[error(transparent)]
    Generate(#[from] GenerateError),
    #[error(transparent)]
    Normalizer(#[from] NormalizerError),
    #[error(transparent)]
    Artifact(#[from] ArtifactError),
    #[error("could not start runtime: {0}")]
    Runtime(std::io::Error),
    #[error("could not install metrics exporter: {0}")]
    Metrics(String),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match Config::from_file(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}: {e}", cli.config.display());
            return ExitCode::FAILURE;
        }
    };

    let _sentry = init_logging(&config.common.logging);

    let result =
        init_metrics(config.common.metrics.as_ref()).and_then(|()| run(cli.command, config));
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "exiting");
            ExitCode::FAILURE
        }
    }
}

fn init_logging(config: &LoggingConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_deref().and_then(|dsn| match dsn.parse::<sentry::types::Dsn>() {
        Ok(dsn) => Some(dsn),
        Err(e) => {
            eprintln!("ignoring invalid sentry DSN: {e}");
            None
        }
    });

    let guard = dsn.map(|dsn| {
        sentry::init(sentry::ClientOptions {
            dsn: Some(dsn),
            release: sentry::release_name!(),
            ..Default::default()
        })
    });

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.as_deref().unwrap_or("info")));
    let sentry_layer = guard
        .as_ref()
        .map(|_| sentry::integrations::tracing::layer());

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_layer)
        .init();

    guard
}

fn init_metrics(config: Option<&MetricsConfig>) -> Result<(), CliError> {
    let Some(config) = config else {
        return Ok(());
    };

    let recorder = StatsdBuilder::from(config.statsd_host.clone(), config.statsd_port)
        .build(Some(&config.prefix))
        .map_err(|e| CliError::Metrics(e.to_string()))?;
    metrics::set_global_recorder(recorder).map_err(|e| CliError::Metrics(e.to_string()))?;

    describe_all(redirect_map::metrics_defs::ALL_METRICS);
    describe_all(normalizer::metrics_defs::ALL_METRICS);
    Ok(())
}

/// The artifact `check` validates: the one the normalizer serves, else the one the
/// generator writes.
fn artifact_path(config: &Config) -> Option<PathBuf> {
    config
        .normalizer
        .as_ref()
        .map(|n| n.redirect_map.clone())
        .or_else(|| config.generator.as_ref().map(|g| g.output.clone()))
}

fn run(command: CliCommand, config: Config) -> Result<(), CliError> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(CliError::Runtime)?;

    match command {
        CliCommand::Generate => {
            let generator_config = config
                .generator
                .ok_or(CliError::MissingSection("generator"))?;
            tracing::info!("Generating redirect map");
            runtime.block_on(redirect_map::run(generator_config))?;
        }
        CliCommand::Serve => {
            let normalizer_config = config
                .normalizer
                .ok_or(CliError::MissingSection("normalizer"))?;
            // Fail before binding anything if the map is missing or broken
            let map = normalizer::load_redirect_map(&normalizer_config)?;
            tracing::info!("Starting normalizer");
            runtime.block_on(normalizer::run(normalizer_config, map))?;
        }
        CliCommand::Check => {
            let path = artifact_path(&config).ok_or(CliError::MissingSection("normalizer"))?;
            let map = redirect_map::artifact::load(&path)?;
            println!(
                "{}: ok (instructions: {}, agents: {}, mcps: {}, spec: {})",
                path.display(),
                map.instructions.len(),
                map.agents.len(),
                map.mcps.len(),
                map.spec.as_deref().unwrap_or("none"),
            );
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(yaml: &str) -> Config {
        serde_yaml::from_str(yaml).expect("parse config")
    }

    #[test]
    fn check_prefers_normalizer_artifact() {
        let config = parse(
            r#"
generator:
    source: {type: file, path: export.json}
    output: generated.json
normalizer:
    listener: {host: 0.0.0.0, port: 8080}
    admin_listener: {host: 127.0.0.1, port: 8081}
    upstream: http://127.0.0.1:3000
    redirect_map: served.json
"#,
        );
        assert_eq!(artifact_path(&config), Some(PathBuf::from("served.json")));
    }

    #[test]
    fn check_falls_back_to_generator_output() {
        let config = parse(
            r#"
generator:
    source: {type: file, path: export.json}
    output: generated.json
"#,
        );
        assert_eq!(artifact_path(&config), Some(PathBuf::from("generated.json")));
        assert_eq!(artifact_path(&parse("{}")), None);
    }

    #[test]
    fn check_rejects_invalid_artifact() {
        let dir = tempfile::tempdir().expect("temp dir");
        let output = dir.path().join("redirects.json");
        std::fs::write(&output, "{}").expect("write artifact");

        let config = parse(&format!(
            r#"
generator:
    source: {{type: file, path: export.json}}
    output: {}
"#,
            output.display()
        ));

        assert!(matches!(
            run(CliCommand::Check, config),
            Err(CliError::Artifact(ArtifactError::Json { .. }))
        ));
    }

    #[test]
    fn missing_section() {
        assert!(matches!(
            run(CliCommand::Serve, parse("{}")),
            Err(CliError::MissingSection("normalizer"))
        ));
    }
}
