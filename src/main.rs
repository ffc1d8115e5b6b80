mod calc;
mod commands;
mod config;
mod error;
mod gateway;
mod helpers;
mod media;
mod moderation;
mod router;
mod scheduler;
mod store;
mod transport;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use clap::Parser;
use tracing::{error, info};

use crate::config::Config;
use crate::gateway::{connect_and_listen, HttpGateway, SessionEnd};
use crate::media::MediaStore;
use crate::router::Router;
use crate::scheduler::ReminderScheduler;
use crate::store::Store;
use crate::transport::Transport;

#[derive(Parser)]
#[command(name = "wamod", about = "WhatsApp group moderation bot")]
struct Args {
    /// Gateway daemon base URL
    #[arg(long, default_value = "http://127.0.0.1:8080", env = "WAMOD_API_URL")]
    api_url: String,

    /// Bot account id (e.g. 15551234567@s.whatsapp.net)
    #[arg(long, env = "WAMOD_ACCOUNT")]
    account: String,

    /// Directory for the state document and saved media
    #[arg(long, default_value = "./data", env = "WAMOD_DATA_DIR")]
    data_dir: PathBuf,

    /// Comma-separated bot admin ids
    #[arg(long, env = "WAMOD_ADMINS")]
    admins: Option<String>,

    /// Command prefix; once set it is persisted in the state document
    #[arg(long, env = "WAMOD_PREFIX")]
    prefix: Option<String>,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "wamod=info".parse().expect("default filter")),
        )
        .init();

    let args = Args::parse();
    let admins: Vec<String> = args
        .admins
        .as_deref()
        .unwrap_or_default()
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();
    let config = Config {
        api_url: args.api_url,
        account: args.account,
        data_dir: args.data_dir,
        admins,
        prefix: args.prefix,
    };

    if let Err(e) = std::fs::create_dir_all(&config.data_dir) {
        error!("Failed to create data dir {}: {e}", config.data_dir.display());
        std::process::exit(1);
    }
    let media = match MediaStore::new(config.media_dir()) {
        Ok(media) => media,
        Err(e) => {
            error!("Failed to create media dir: {e}");
            std::process::exit(1);
        }
    };

    let store = Store::load(config.store_path());
    store.update(|d| {
        d.settings.admins.extend(config.admins.iter().cloned());
        if let Some(prefix) = &config.prefix {
            d.settings.prefix = prefix.clone();
        }
    });

    let transport: Arc<dyn Transport> =
        Arc::new(HttpGateway::new(config.api_url.clone(), config.account.clone()));
    let scheduler = ReminderScheduler::new();
    let router = Arc::new(Router {
        transport,
        store,
        media,
        scheduler,
        account: config.account.clone(),
        started_at: Instant::now(),
    });

    info!("wamod starting for account {}", config.account);
    info!("Bot admins: {:?}", config.admins);

    spawn_shutdown_handler(&router);

    let mut backoff = 1u64;
    loop {
        match connect_and_listen(&router, &config.api_url, &config.account).await {
            Ok(SessionEnd::LoggedOut) => {
                error!("Gateway reports this device was logged out; pair again to continue");
                break;
            }
            Ok(SessionEnd::Dropped) => {
                info!("Gateway connection closed, reconnecting in {backoff}s...");
                backoff = 1;
            }
            Err(e) => {
                error!("Gateway connection error: {e}, reconnecting in {backoff}s...");
            }
        }
        tokio::time::sleep(std::time::Duration::from_secs(backoff)).await;
        backoff = (backoff * 2).min(60);
    }

    router.store.save();
    router.scheduler.shutdown();
}

fn spawn_shutdown_handler(router: &Arc<Router>) {
    let router = Arc::clone(router);
    tokio::spawn(async move {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to listen for ctrl-c");
        info!("Shutdown signal received, saving state...");
        router.store.save();
        router.scheduler.shutdown();
        std::process::exit(0);
    });
}
