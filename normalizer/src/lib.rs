pub mod config;
pub mod errors;
pub mod metrics_defs;
pub mod rules;
pub mod service;

#[cfg(test)]
mod testutils;

use errors::NormalizerError;
use redirect_map::RedirectMap;
use rules::Normalizer;
use service::NormalizerService;
use shared::admin_service::AdminService;
use shared::http::run_http_service;
use std::sync::Arc;
use std::time::Duration;

/// Loads and validates the redirect map named in the config. The normalizer refuses to
/// start without one, since an empty map would turn every legacy URL into a 404.
pub fn load_redirect_map(config: &config::Config) -> Result<RedirectMap, NormalizerError> {
    let map = redirect_map::artifact::load(&config.redirect_map)?;
    tracing::info!(
        path = %config.redirect_map.display(),
        instructions = map.instructions.len(),
        agents = map.agents.len(),
        mcps = map.mcps.len(),
        spec = ?map.spec,
        "loaded redirect map"
    );
    Ok(map)
}

pub async fn run(config: config::Config, map: RedirectMap) -> Result<(), NormalizerError> {
    config.validate()?;

    let map = Arc::new(map);
    let normalizer_service = NormalizerService::new(
        Normalizer::new(map.clone()),
        config.upstream.clone(),
        Duration::from_secs(config.upstream_timeout_secs),
    );
    let admin_service = AdminService::<_, NormalizerError>::new(move || !map.is_empty());

    let normalizer_task = run_http_service(
        &config.listener.host,
        config.listener.port,
        normalizer_service,
    );
    let admin_task = run_http_service(
        &config.admin_listener.host,
        config.admin_listener.port,
        admin_service,
    );

    tokio::try_join!(normalizer_task, admin_task)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn config(redirect_map: PathBuf) -> config::Config {
        config::Config {
            listener: config::Listener {
                host: "127.0.0.1".into(),
                port: 8080,
            },
            admin_listener: config::Listener {
                host: "127.0.0.1".into(),
                port: 8081,
            },
            upstream: url::Url::parse("http://127.0.0.1:3000").unwrap(),
            redirect_map,
            upstream_timeout_secs: 30,
        }
    }

    #[test]
    fn test_missing_map_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let result = load_redirect_map(&config(dir.path().join("redirects.json")));
        assert!(matches!(result, Err(NormalizerError::RedirectMap(_))));
    }

    #[test]
    fn test_load_map() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("redirects.json");
        std::fs::write(
            &path,
            r#"{"instructions": {}, "agents": {"spec-author": "spec-author"}, "mcps": {}, "spec": "spec-author"}"#,
        )
        .unwrap();

        let map = load_redirect_map(&config(path)).unwrap();
        assert_eq!(map.spec.as_deref(), Some("spec-author"));
    }
}
