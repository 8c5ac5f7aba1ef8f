//! Run command - the daemon.

use std::sync::Arc;

use anyhow::Context;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::config::Settings;
use crate::indexer;
use crate::manager::{AddOutcome, Manager};

type ServerHandle = JoinHandle<std::io::Result<()>>;

/// Watch every configured project until Ctrl-C.
///
/// Without a management server the daemon also exits once no project is
/// left.
pub async fn run(settings: Settings, bind: Option<String>, no_server: bool) -> anyhow::Result<()> {
    let indexer = indexer::from_config(&settings.indexer);
    let indexer_name = indexer.name();
    let token = CancellationToken::new();
    let manager = Arc::new(Manager::new(indexer, token.clone()));

    for entry in &settings.projects {
        let outcome = manager
            .add(&entry.path)
            .with_context(|| format!("Cannot watch {}", entry.path.display()))?;
        if outcome == AddOutcome::Missing {
            tracing::warn!("[tagger] project not found: {}", entry.path.display());
        }
    }
    crate::log_event!(
        "tagger",
        "started",
        "{} projects, {indexer_name} indexer",
        manager.len()
    );

    let server = if settings.server.enabled && !no_server {
        let bind = bind.unwrap_or_else(|| settings.server.bind.clone());
        start_server(&bind, Arc::clone(&manager), token.clone()).await?
    } else {
        None
    };

    match server {
        Some(mut handle) => {
            let finished = tokio::select! {
                signal = tokio::signal::ctrl_c() => {
                    signal.context("Cannot listen for Ctrl-C")?;
                    crate::log_event!("tagger", "shutting down");
                    None
                }
                joined = &mut handle => Some(joined),
            };
            manager.shutdown().await;
            let joined = match finished {
                Some(joined) => joined,
                None => handle.await,
            };
            joined
                .context("Server task failed")?
                .context("Server failed")?;
        }
        None => {
            tokio::select! {
                signal = tokio::signal::ctrl_c() => {
                    signal.context("Cannot listen for Ctrl-C")?;
                    crate::log_event!("tagger", "shutting down");
                }
                _ = manager.start() => {
                    crate::log_event!("tagger", "no projects left");
                }
            }
            manager.shutdown().await;
        }
    }

    crate::log_event!("tagger", "stopped");
    Ok(())
}

#[cfg(feature = "http-server")]
async fn start_server(
    bind: &str,
    manager: Arc<Manager>,
    token: CancellationToken,
) -> anyhow::Result<Option<ServerHandle>> {
    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .with_context(|| format!("Cannot bind management server to {bind}"))?;
    Ok(Some(tokio::spawn(crate::server::serve(
        listener, manager, token,
    ))))
}

#[cfg(not(feature = "http-server"))]
async fn start_server(
    _bind: &str,
    _manager: Arc<Manager>,
    _token: CancellationToken,
) -> anyhow::Result<Option<ServerHandle>> {
    tracing::warn!("[tagger] built without the http-server feature; management server disabled");
    Ok(None)
}
