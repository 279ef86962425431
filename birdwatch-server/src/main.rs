use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt};

use birdwatch_core::Error;
use birdwatch_core::config::WatcherConfig;
use birdwatch_core::eventbus::EventBus;
use birdwatch_core::notifier::{Notifier, PushoverClient};
use birdwatch_core::platforms::firehose::FirehoseSession;
use birdwatch_core::services::filter::AuthorFilter;
use birdwatch_core::services::pipeline::{EventHandler, run_pipeline};

#[derive(Parser, Debug, Clone)]
#[command(name = "birdwatch")]
#[command(author, version, about = "birdwatch - account watcher that pushes keyword alerts")]
struct Args {
    /// Override BIRDWATCH_STREAM_URL
    #[arg(long)]
    stream_url: Option<String>,

    /// Env file loaded before reading configuration
    #[arg(long, default_value = ".env")]
    env_file: String,
}

fn init_tracing() {
    let filter = EnvFilter::from_default_env()
        .add_directive("birdwatch_core=info".parse().unwrap_or_default())
        .add_directive("birdwatch_server=info".parse().unwrap_or_default());
    let sub = fmt().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(sub).expect("Failed to set global subscriber");
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    // Missing env file is fine; config then comes from the process environment.
    let _ = dotenv::from_filename(&args.env_file);
    init_tracing();

    let mut config = match WatcherConfig::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("Configuration error: {}", e);
            return ExitCode::from(1);
        }
    };
    if let Some(url) = args.stream_url {
        config.stream_url = url;
    }

    let mut follow: Vec<&str> = config.follow.iter().map(String::as_str).collect();
    follow.sort_unstable();
    info!("Following [{}]...", follow.join(","));
    info!(
        "Listening for posts containing [{}]...",
        config.keywords.join(",")
    );

    match run(config).await {
        Ok(()) => {
            info!("Main finished. Goodbye!");
            ExitCode::SUCCESS
        }
        Err(e @ Error::RateLimited) => {
            error!("Exiting: {}", e);
            ExitCode::from(2)
        }
        Err(e @ Error::DegradedExit(_)) => {
            error!("Exiting: {}", e);
            ExitCode::from(3)
        }
        Err(e) => {
            error!("Exiting: {}", e);
            ExitCode::from(1)
        }
    }
}

async fn run(config: WatcherConfig) -> Result<(), Error> {
    let event_bus = Arc::new(EventBus::new());

    let notifier: Arc<dyn Notifier> = Arc::new(PushoverClient::new(config.pushover.clone())?);
    let handler = EventHandler::new(
        AuthorFilter::new(config.follow.clone()),
        config.rules.clone(),
        config.post_link_base.clone(),
    );
    // Subscribe before spawning so nothing published during startup is lost.
    let rx = event_bus.subscribe();
    let pipeline_handle = tokio::spawn(run_pipeline(event_bus.clone(), rx, handler, notifier));

    let eb_clone = event_bus.clone();
    let _ctrlc_handle = tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl-C: {:?}", e);
        }
        info!("Ctrl-C detected; shutting down...");
        eb_clone.shutdown();
    });

    let mut session = FirehoseSession::new(&config, event_bus.clone());
    let result = session.run().await;

    // Whatever ended the session, let the pipeline drain and stop.
    event_bus.shutdown();
    let _ = pipeline_handle.await;

    result
}
