use std::sync::Arc;

use tracing::{error, info};

use usergate::{AccountService, BackgroundTasks, Config, Database, LogMailer, Mailer, SmtpMailer, WebServer};

const DEFAULT_CONFIG_PATH: &str = "config.toml";

#[tokio::main]
async fn main() {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());

    // Load configuration
    let config = match Config::load_with_env(&config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load {config_path}: {e}");
            eprintln!("Using default configuration.");
            let mut config = Config::default();
            config.apply_env_overrides();
            config
        }
    };

    // Initialize logging
    if let Err(e) = usergate::logging::init(&config.logging) {
        eprintln!("Failed to initialize logging: {e}");
        // Fall back to console-only logging
        usergate::logging::init_console_only(&config.logging.level);
    }

    if let Err(e) = run(config).await {
        error!(error = %e, "usergate exited with an error");
        std::process::exit(1);
    }
}

async fn run(config: Config) -> usergate::Result<()> {
    config.validate()?;

    info!("usergate - account and token service");

    let db = Database::open(&config.database.url, config.database.max_connections).await?;
    info!(version = db.schema_version().await?, "database ready");

    let mailer: Arc<dyn Mailer> = match config.mail.smtp_url.as_deref() {
        Some(url) if !url.is_empty() => {
            info!("Delivering mail over SMTP");
            Arc::new(SmtpMailer::new(url, &config.mail.sender)?)
        }
        _ => {
            info!("No SMTP relay configured, mail will only be logged");
            Arc::new(LogMailer)
        }
    };

    let service = AccountService::new(db, mailer, BackgroundTasks::new());
    let server = WebServer::new(&config.server, service)?;

    info!("Server configured on {}", server.addr());
    server.run().await
}
