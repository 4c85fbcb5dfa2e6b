// ABOUTME: Wires configuration, repositories, the daemon registry, and the HTTP server.
// ABOUTME: Shared by the serve, check, and config subcommands.

use crate::config::Config;
use crate::error::{Error, Result};
use crate::http::{self, AppState};
use crate::registry::DaemonRegistry;
use crate::repository::{
    ConfigEntity, FileStore, RepositorySet, StaticConfigRepository, StoreConfigRepository,
};
use crate::runtime::{BollardConnector, ConnectionFactory};
use crate::types::ConfigId;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

/// Repositories in merge order: the store first, then the static file entries,
/// so static entries win on duplicate ids.
pub fn repository_set(config: &Config) -> RepositorySet {
    let mut set = RepositorySet::new();
    if let Some(store) = &config.store {
        info!(path = %store.path.display(), "using file-backed configuration store");
        set = set.with_store(Arc::new(StoreConfigRepository::new(FileStore::new(
            &store.path,
        ))));
    }
    set.with_repository(Arc::new(StaticConfigRepository::new(
        config.docker.connections.clone(),
    )))
}

pub async fn build_registry(
    config: &Config,
    repositories: &RepositorySet,
    factory: &dyn ConnectionFactory,
) -> Result<DaemonRegistry> {
    let registry =
        DaemonRegistry::build(repositories.repositories(), factory, config.stream_buffer).await?;
    Ok(registry)
}

/// Ping every daemon and log the ones that do not answer.
pub async fn report_reachability(registry: &DaemonRegistry) -> Vec<(ConfigId, bool)> {
    let results = registry.ping_all().await;
    for (id, reachable) in &results {
        if *reachable {
            info!(config = %id, "daemon reachable");
        } else {
            warn!(config = %id, "daemon unreachable");
        }
    }
    results
}

/// Build the registry from `config` and ping every daemon once.
pub async fn check(config: &Config) -> Result<Vec<(ConfigId, bool)>> {
    let repositories = repository_set(config);
    let connector = BollardConnector::new(config.limits);
    let registry = build_registry(config, &repositories, &connector).await?;
    Ok(report_reachability(&registry).await)
}

/// Fails with `Error::Unreachable` unless every daemon answered.
pub fn require_reachable(results: &[(ConfigId, bool)]) -> Result<()> {
    let unreachable = results.iter().filter(|(_, ok)| !ok).count();
    if unreachable > 0 {
        return Err(Error::Unreachable {
            unreachable,
            total: results.len(),
        });
    }
    Ok(())
}

/// Every configured daemon with secrets masked.
pub async fn list_configs(config: &Config) -> Result<Vec<ConfigEntity>> {
    let entities = repository_set(config).list().await?;
    Ok(entities.iter().map(ConfigEntity::redacted).collect())
}

/// Build the registry and serve until Ctrl+C or SIGTERM.
pub async fn serve(config: Config, listen: Option<SocketAddr>) -> Result<()> {
    let repositories = repository_set(&config);
    let connector = BollardConnector::new(config.limits);
    let registry = build_registry(&config, &repositories, &connector).await?;
    if registry.is_empty() {
        warn!("no daemons configured");
    }
    report_reachability(&registry).await;

    let addr = listen.unwrap_or(config.listen);
    let listener = TcpListener::bind(addr).await?;
    let state = AppState::new(Arc::new(registry), repositories);
    http::serve(listener, state, shutdown_signal()).await?;

    info!("gateway stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("received Ctrl+C, shutting down"),
            Err(e) => {
                error!(error = %e, "failed to install Ctrl+C handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut term) => {
                term.recv().await;
                info!("received SIGTERM, shutting down");
            }
            Err(e) => {
                error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn any_unreachable_daemon_fails_the_check() {
        let results = vec![(ConfigId::new("a"), true), (ConfigId::new("b"), false)];
        match require_reachable(&results) {
            Err(Error::Unreachable { unreachable, total }) => {
                assert_eq!((unreachable, total), (1, 2));
            }
            other => panic!("unexpected result: {other:?}"),
        }
        assert!(require_reachable(&results[..1]).is_ok());
        assert!(require_reachable(&[]).is_ok());
    }
}
