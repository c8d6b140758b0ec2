//! Birthday Page - a password-gated page behind a single IP-bound session

use birthday_page::api::{self, AppState};
use birthday_page::config::Config;
use birthday_page::secrets::{get_secret_password, EnvSecrets, SecretKind};
use birthday_page::session::SessionStore;
use birthday_page::templates::TemplateStore;
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Birthday Page - password-gated page server
#[derive(Parser, Debug)]
#[command(name = "birthday_page")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<String>,

    /// Listen address (overrides config)
    #[arg(short, long, value_name = "ADDR")]
    listen: Option<String>,

    /// Template override directory (overrides config)
    #[arg(short, long, value_name = "DIR")]
    templates: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Load configuration from file if specified, otherwise use default loading
    let mut config = if let Some(ref path) = cli.config {
        let mut config = Config::from_file(path)?;
        config.apply_env();
        config
    } else {
        Config::load()?
    };

    // CLI overrides
    if let Some(ref addr) = cli.listen {
        config.listen_addr = addr.parse()?;
    }
    if let Some(ref dir) = cli.templates {
        config.template_dir = Some(dir.clone());
    }

    // Initialize tracing
    let log_level = if cli.verbose {
        "birthday_page=trace,tower_http=trace".to_string()
    } else {
        config.log_level.clone()
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_level.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    config.validate()?;

    info!("Starting Birthday Page server");
    info!("  Build time: {}", env!("BIRTHDAY_PAGE_BUILD_TIME"));
    info!("  Listen address: {}", config.listen_addr);
    info!("  Session lifetime: {} min", config.session_ttl_minutes);
    match &config.template_dir {
        Some(dir) => info!("  Templates: {:?} (builtin fallback)", dir),
        None => info!("  Templates: builtin"),
    }
    if !config.secure_cookie {
        warn!("  Session cookie is sent without the Secure attribute");
    }

    // Passwords are read per login; this only gives operators an early hint.
    for kind in SecretKind::ALL {
        if let Err(e) = get_secret_password(kind) {
            warn!("  {} login will fail until configured: {}", kind, e);
        }
    }

    let templates = match config.template_dir {
        Some(ref dir) => TemplateStore::with_dir(dir),
        None => TemplateStore::builtin(),
    };

    let state = Arc::new(AppState {
        sessions: Arc::new(SessionStore::with_ttl(config.session_ttl())),
        templates,
        secrets: Arc::new(EnvSecrets),
        secure_cookie: config.secure_cookie,
    });

    let app = api::router(state);

    // Start server with graceful shutdown
    let listener = TcpListener::bind(&config.listen_addr).await?;
    info!("Birthday Page listening on http://{}", config.listen_addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Handle shutdown signals (SIGINT, SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            warn!("Received Ctrl+C, initiating graceful shutdown...");
        }
        _ = terminate => {
            warn!("Received SIGTERM, initiating graceful shutdown...");
        }
    }
}
