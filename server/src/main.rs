use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use tokio::net::TcpListener;

use inbx_server::auth::csrf::new_session_store;
use inbx_server::config::{generate_config_template, Config};
use inbx_server::entries::EntryStore;
use inbx_server::{routes, secrets, state};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load config with layered precedence: defaults < TOML < env < CLI
    let config = Config::load()?;

    // Handle --generate-config: print template and exit
    if config.generate_config {
        print!("{}", generate_config_template());
        return Ok(());
    }

    // Initialize tracing/logging
    let env_filter = || {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("inbx_server=info"))
    };
    if config.json_logs {
        tracing_subscriber::fmt().json().with_env_filter(env_filter()).init();
    } else {
        tracing_subscriber::fmt().pretty().with_env_filter(env_filter()).init();
    }

    tracing::info!("inbx server v{} starting", env!("CARGO_PKG_VERSION"));

    // Credentials must be persisted before serving; any failure here is fatal.
    let data_dir = Path::new(&config.data_dir);
    let secrets = secrets::bootstrap(
        data_dir,
        &config.viewer_user,
        config.viewer_password.as_deref(),
        config.post_token.as_deref(),
    )?;

    if let Some(password) = &secrets.generated_password {
        tracing::info!("==========================================================");
        tracing::info!("  FIRST BOOT: generated viewer credential.");
        tracing::info!("  Username: {}", secrets.viewer.username());
        tracing::info!("  Password: {}", password);
        tracing::info!("  Only the hash is stored; this is the only time the");
        tracing::info!("  password is shown.");
        tracing::info!("==========================================================");
    }

    if secrets.post_token.is_enabled() {
        tracing::info!("Ingestion requires the post token");
    } else {
        tracing::warn!("Post token disabled: anyone can submit entries");
    }

    let entries = EntryStore::open(data_dir)?;
    tracing::info!(
        "Storing entries in {} (retention: {} entries)",
        entries.root().display(),
        config.max_entries
    );

    // Build application state
    let app_state = state::AppState {
        entries: Arc::new(entries),
        post_token: secrets.post_token,
        viewer: secrets.viewer,
        sessions: new_session_store(),
        max_entries: config.max_entries,
        public_url: config.public_url.clone(),
    };

    // Build router
    let app = routes::build_router(app_state);

    // Bind and serve
    let addr = format!("{}:{}", config.bind_address, config.port);
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("Listening on {}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
