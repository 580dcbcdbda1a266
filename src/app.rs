use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::api::{create_router, AppState};
use crate::audit::AuditLog;
use crate::auth::{StaticTokenAuthenticator, TokenGuard};
use crate::bot::webhook::create_webhook_router;
use crate::bot::Dispatcher;
use crate::config::{ApiConfig, BotConfig};
use crate::db::SharedStore;
use crate::reports::{ChartRenderer, DocumentRenderer, ReportBuilder};
use crate::services::{ReadingService, ReportAggregator};

/// Ingestion API wired onto `store`
pub fn api_router(config: &ApiConfig, store: SharedStore) -> Router {
    let audit_log = AuditLog::new(config.common.log_dir.clone());
    let state = AppState {
        reading_service: ReadingService::new(store.clone()),
        report_aggregator: ReportAggregator::new(store, config.common.utc_offset()),
        audit_log: audit_log.clone(),
        started_at: Instant::now(),
    };
    let guard = TokenGuard::new(
        Arc::new(StaticTokenAuthenticator::new(config.api_token.clone())),
        audit_log,
    );

    create_router(state, guard).layer(TraceLayer::new_for_http())
}

/// Command dispatcher with its report pipeline
pub fn build_dispatcher(config: &BotConfig, store: SharedStore) -> Dispatcher {
    let offset = config.common.utc_offset();
    let aggregator = ReportAggregator::new(store.clone(), offset);
    let chart = ChartRenderer::new(config.chart_service_url.clone(), config.chart_timeout());
    let document = DocumentRenderer::new(
        config.reports_dir.clone(),
        offset,
        config.common.timezone_label.clone(),
    );

    Dispatcher::new(
        ReadingService::new(store),
        aggregator.clone(),
        ReportBuilder::new(aggregator, chart, document),
        config.common.timezone_label.clone(),
        config.dashboard_url.clone(),
    )
}

/// Webhook transport for the bot, guarded by its own shared token
pub fn bot_router(config: &BotConfig, dispatcher: Dispatcher, webhook_token: String) -> Router {
    let guard = TokenGuard::new(
        Arc::new(StaticTokenAuthenticator::new(webhook_token)),
        AuditLog::new(config.common.log_dir.clone()),
    );

    create_webhook_router(dispatcher, config.reports_dir.clone(), guard)
        .layer(TraceLayer::new_for_http())
}

/// Running HTTP server
///
/// The server stops gracefully on Ctrl-C or SIGTERM.
pub struct Application {
    pub local_addr: SocketAddr,
    pub server_handle: JoinHandle<Result<(), std::io::Error>>,
}

impl Application {
    pub async fn serve(addr: &str, router: Router) -> Result<Self, std::io::Error> {
        let listener = TcpListener::bind(addr).await?;
        let local_addr = listener.local_addr()?;
        info!("Starting HTTP server on {}", local_addr);

        let server_handle = tokio::spawn(async move {
            axum::serve(
                listener,
                router.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .with_graceful_shutdown(shutdown_signal())
            .await
        });

        Ok(Self {
            local_addr,
            server_handle,
        })
    }

    pub async fn run_until_stopped(self) -> Result<(), Box<dyn std::error::Error>> {
        self.server_handle.await??;
        info!("HTTP server stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to listen for SIGTERM: {}", e);
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
    info!("Shutdown signal received");
}
