use coursehub::{
    api::{AppState, build_router},
    config::{AppConfig, Secrets, database, seed},
    errors::Result,
    integrations::{
        email::{HttpMailer, LogMailer, Mailer},
        payments::{HostedCheckoutGateway, PaymentGateway},
    },
};
use dotenvy::dotenv;
use std::{env, sync::Arc};
use tokio::{net::TcpListener, signal::ctrl_c};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

const CONFIG_PATH: &str = "config.toml";

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file, non-fatal since variables can be set externally
    dotenv().ok();

    // 3. Configuration and secrets
    let mut config = AppConfig::load(env::var("CONFIG_PATH").as_deref().unwrap_or(CONFIG_PATH))?;
    if let Ok(bind_address) = env::var("BIND_ADDRESS") {
        config.server.bind_address = bind_address;
    }
    let secrets = Secrets::from_env().inspect_err(|e| error!("Missing secrets: {}", e))?;

    // 4. Database
    let database_url = database::get_database_url();
    if let Some(path) = database_url
        .strip_prefix("sqlite://")
        .and_then(|rest| rest.split('?').next())
        .and_then(|file| std::path::Path::new(file).parent())
        .filter(|dir| !dir.as_os_str().is_empty())
    {
        std::fs::create_dir_all(path)?;
    }
    let db = database::create_connection()
        .await
        .inspect_err(|e| error!("Failed to connect to database: {}", e))?;
    database::create_tables(&db)
        .await
        .inspect(|_| info!("Database initialized successfully."))
        .inspect_err(|e| error!("Failed to initialize database: {}", e))?;

    // 5. Seed categories from config.toml
    seed::seed_categories(&db, &config.categories)
        .await
        .inspect_err(|e| error!("Failed to seed categories: {}", e))?;

    // 6. External services
    if secrets.payment_secret_key.is_empty() {
        warn!("PAYMENT_SECRET_KEY is not set, checkout requests will be rejected by the provider");
    }
    let gateway: Arc<dyn PaymentGateway> = Arc::new(HostedCheckoutGateway::new(
        &config.payments.api_base,
        &secrets.payment_secret_key,
    ));
    let mailer: Arc<dyn Mailer> = match &secrets.email_api_key {
        Some(key) => Arc::new(HttpMailer::new(&config.email.api_base, key, &config.email.from)),
        None => {
            warn!("EMAIL_API_KEY is not set, emails will only be logged");
            Arc::new(LogMailer)
        }
    };

    // 7. Serve
    let address = config.server.bind_address.clone();
    let app = build_router(AppState::new(db, config, secrets, gateway, mailer));
    let listener = TcpListener::bind(&address).await?;
    info!("Server running on {address}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
