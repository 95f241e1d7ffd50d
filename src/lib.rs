pub mod app;
pub mod channel;
pub mod config;
mod db;
pub mod edit;
pub mod error;
pub mod fitness;
pub mod models;
pub mod oauth;
pub mod sync;
mod utils;

#[cfg(test)]
mod test_utils;

use std::{sync::Arc, time::Duration};

use log::{error, info};
use tokio::time::MissedTickBehavior;

pub use app::FamilyApp;
pub use channel::{CollectionChannel, LocalDocumentChannel, Snapshot, Subscription};
pub use config::SyncConfig;
pub use error::{ErrorReporter, ReportedError, SyncError};
pub use models::{FitnessSample, GlucoseValue, MeasurementRecord, Profile};

const STEP_REFRESH_INTERVAL: Duration = Duration::from_secs(60);

pub fn run() {
    let config = match SyncConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            // Logging is configured from this config, so it is not up yet.
            eprintln!("famsync: invalid configuration: {err:#}");
            std::process::exit(1);
        }
    };

    // Initialize logging (reads RUST_LOG env var)
    let level = if config.debug {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    env_logger::Builder::from_default_env()
        .filter_level(level)
        .init();

    info!("famsync starting up for {}...", config.profile.display_name());

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("failed to build tokio runtime");

    if let Err(err) = runtime.block_on(serve(config)) {
        error!("famsync stopped: {err:#}");
        std::process::exit(1);
    }
}

async fn serve(config: SyncConfig) -> anyhow::Result<()> {
    std::fs::create_dir_all(&config.data_dir)?;

    let channel = Arc::new(LocalDocumentChannel::open(config.documents_path())?);
    let links = oauth::LinkStore::new(config.settings_path())?;
    let handshake = oauth::OAuthHandshake::new(config.oauth.clone(), links);
    let fitness = fitness::FitnessClient::new(config.fitness_url.clone());
    let (reporter, mut reported) = ErrorReporter::channel();

    let mut app = FamilyApp::new(
        channel.clone(),
        config.collection.clone(),
        config.profile,
        handshake,
        fitness,
        config.step_window_minutes,
        reporter,
    );

    if let Some(location) = config.return_location.as_deref() {
        // Failure is already reported; the feed is still worth running.
        let _ = app.complete_link_if_present(location);
    }
    app.link_if_no_token(&oauth::PrintRedirector)?;

    let mut subscription = app.subscribe().await?;
    let mut refresh = tokio::time::interval(STEP_REFRESH_INTERVAL);
    refresh.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            snapshot = subscription.next() => {
                let Some(snapshot) = snapshot else {
                    info!("subscription to {} ended", subscription.collection());
                    break;
                };
                app.apply_snapshot(snapshot);
                log_view(&app);
            }
            _ = refresh.tick() => {
                if app.link_state() == oauth::LinkState::Linked {
                    if let Ok(Some(sample)) = app.refresh_steps().await {
                        info!("{} steps in the last {} minute(s)", sample.steps, config.step_window_minutes);
                    }
                }
            }
            Some(report) = reported.recv() => {
                log::debug!("reported {:?} error from {}", report.kind, report.operation);
            }
            _ = tokio::signal::ctrl_c() => {
                info!("interrupt received; shutting down");
                break;
            }
        }
    }

    subscription.close();
    channel.shutdown();
    Ok(())
}

fn log_view<C: CollectionChannel + ?Sized>(app: &FamilyApp<C>) {
    let view = app.view();
    info!(
        "{}: {} reading(s)",
        view.profile().display_name(),
        view.len()
    );
    for record in view.iter() {
        info!(
            "  {} {} {}",
            record.timestamp.format("%Y-%m-%d %H:%M"),
            record.value,
            record.note
        );
    }
}
