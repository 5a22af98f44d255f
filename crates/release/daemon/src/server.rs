//! Server setup and lifecycle management

use crate::api::{create_router, AppState};
use crate::config::DaemonConfig;
use crate::error::{DaemonError, DaemonResult};
use crate::fixtures::Fixtures;
use axum::Router;
use release_engine::{
    document_queue, DocumentJob, DocumentWorker, InMemoryProcessingLedger, ReleaseEngine,
    RoleDirectory, SystemClock, TemplateRegistry,
};
use release_store::InMemoryReleaseStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::{mpsc, oneshot};

/// Release daemon server
pub struct Server {
    config: DaemonConfig,
    engine: Arc<ReleaseEngine>,
    document_rx: Option<mpsc::Receiver<DocumentJob>>,
}

impl Server {
    /// Wire the engine over in-memory collaborators seeded from `fixtures`
    pub fn new(config: DaemonConfig, fixtures: &Fixtures) -> DaemonResult<Self> {
        let store = Arc::new(InMemoryReleaseStore::new());
        let templates = Arc::new(TemplateRegistry::new(Arc::new(SystemClock)));
        let ledger = Arc::new(InMemoryProcessingLedger::new());
        let roles = Arc::new(RoleDirectory::new());

        let mut engine = ReleaseEngine::new(store, templates, ledger.clone(), roles.clone())
            .with_config(config.engine.engine.clone());

        let mut document_rx = None;
        if config.engine.generate_documents {
            let (queue, rx) = document_queue(config.engine.document_queue_capacity);
            engine = engine.with_document_queue(queue);
            document_rx = Some(rx);
        }

        let summary = fixtures.apply(&engine, &ledger, &roles)?;
        tracing::info!(
            templates = summary.templates,
            batches = summary.batches,
            roles = summary.roles,
            "Seeded collaborators"
        );

        Ok(Self {
            config,
            engine: Arc::new(engine),
            document_rx,
        })
    }

    pub fn engine(&self) -> &Arc<ReleaseEngine> {
        &self.engine
    }

    /// The HTTP application
    pub fn router(&self) -> Router {
        create_router(AppState::new(self.engine.clone()), &self.config.server)
    }

    /// Run the server until Ctrl+C or SIGTERM
    pub async fn run(mut self) -> DaemonResult<()> {
        let addr = self.config.server.listen_addr;
        let app = self.router();

        let (stop_worker, worker_stopped) = oneshot::channel::<()>();
        let worker = self.document_rx.take().map(|rx| {
            let worker = DocumentWorker::new(self.engine.clone(), rx).with_sweep_interval(
                Duration::from_secs(self.config.engine.document_sweep_interval_secs),
            );
            tokio::spawn(worker.run_until(async {
                let _ = worker_stopped.await;
            }))
        });

        let listener = TcpListener::bind(addr).await?;
        tracing::info!("Release daemon listening on {}", addr);

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| DaemonError::Server(e.to_string()))?;

        tracing::info!("Release daemon shutting down");

        // The engine owns the queue sender, so the worker never sees the
        // channel close on its own. It drains what is queued before exiting.
        let _ = stop_worker.send(());
        if let Some(worker) = worker {
            if let Err(e) = worker.await {
                tracing::error!(error = %e, "Document worker failed");
            }
        }

        Ok(())
    }
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received terminate signal, initiating graceful shutdown");
        }
    }
}
