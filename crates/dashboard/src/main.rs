//! Xyno Dashboard server.
//!
//! Serves the management UI on `XYNO_HOST:XYNO_PORT` (127.0.0.1:3000 by
//! default), over TLS when `XYNO_TLS_CERT` and `XYNO_TLS_KEY` are set. All
//! data comes from the Xyno API at `XYNO_API_URL`.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::net::SocketAddr;
use std::process::ExitCode;
use std::time::Duration;

use axum::Router;
use axum_server::Handle;
use axum_server::tls_rustls::RustlsConfig;
use secrecy::ExposeSecret;
use sentry::integrations::tracing::{self as sentry_tracing, EventFilter};
use tracing::{Level, Metadata, error, info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
use xyno_dashboard::config::{DashboardConfig, TlsConfig};
use xyno_dashboard::state::AppState;

type BoxError = Box<dyn std::error::Error>;

/// How long in-flight requests get to finish after a shutdown signal.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> ExitCode {
    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        warn!("rustls crypto provider already installed");
    }

    let config = match DashboardConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            #[allow(clippy::print_stderr)]
            {
                eprintln!("Invalid dashboard configuration: {e}");
            }
            return ExitCode::FAILURE;
        }
    };

    // The Sentry client has to exist before its tracing layer is registered.
    let _sentry = init_sentry(&config);
    init_tracing(config.log_json);

    if let Err(e) = run(config).await {
        error!(error = %e, "Dashboard stopped with an error");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

fn init_sentry(config: &DashboardConfig) -> Option<sentry::ClientInitGuard> {
    let options = sentry::ClientOptions {
        release: sentry::release_name!(),
        environment: config.sentry_environment.clone().map(Into::into),
        sample_rate: config.sentry_sample_rate,
        traces_sample_rate: config.sentry_traces_sample_rate,
        attach_stacktrace: true,
        send_default_pii: false,
        ..Default::default()
    };
    let dsn = config.sentry_dsn.as_deref()?;
    Some(sentry::init((dsn, options)))
}

/// Warnings and errors become Sentry events, info and debug breadcrumbs.
fn sentry_filter(metadata: &Metadata<'_>) -> EventFilter {
    match *metadata.level() {
        Level::ERROR | Level::WARN => EventFilter::Event,
        Level::INFO | Level::DEBUG => EventFilter::Breadcrumb,
        _ => EventFilter::Ignore,
    }
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "xyno_dashboard=info,xyno_client=info,tower_http=debug".into());

    tracing_subscriber::registry()
        .with(filter)
        .with(json.then(|| tracing_subscriber::fmt::layer().json().flatten_event(true)))
        .with((!json).then(tracing_subscriber::fmt::layer))
        .with(sentry_tracing::layer().event_filter(sentry_filter))
        .init();
}

async fn run(config: DashboardConfig) -> Result<(), BoxError> {
    let addr = config.socket_addr();
    let tls = config.tls.clone();
    info!(api_url = %config.api_url, secure_cookies = config.is_secure(), "Starting dashboard");

    let app = xyno_dashboard::router(AppState::new(config)?)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction());

    match tls {
        Some(tls) => serve_tls(app, addr, tls).await,
        None => {
            info!("Listening on http://{addr}");
            let listener = tokio::net::TcpListener::bind(addr).await?;
            axum::serve(listener, app)
                .with_graceful_shutdown(shutdown_signal())
                .await?;
            Ok(())
        }
    }
}

async fn serve_tls(app: Router, addr: SocketAddr, tls: TlsConfig) -> Result<(), BoxError> {
    let rustls = RustlsConfig::from_pem(
        tls.cert_pem.into_bytes(),
        tls.key_pem.expose_secret().as_bytes().to_vec(),
    )
    .await?;

    let handle = Handle::new();
    let drain = handle.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        drain.graceful_shutdown(Some(DRAIN_TIMEOUT));
    });

    info!("Listening on https://{addr}");
    axum_server::bind_rustls(addr, rustls)
        .handle(handle)
        .serve(app.into_make_service())
        .await?;
    Ok(())
}

/// Resolves on Ctrl+C or, on unix, SIGTERM.
async fn shutdown_signal() {
    let interrupt = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Cannot listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Cannot listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = interrupt => {},
        () = terminate => {},
    }
    info!("Shutting down");
}
