//! Bruno voice command service
//!
//! Listens for the wake phrase, turns the spoken command into an action plan
//! and sends it to the robot until Ctrl+C or SIGTERM.

use tokio::sync::watch;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};

use bruno_config::{load_settings, Settings};
use bruno_server::{build_collaborators, build_controller, probe_services, start_capture};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Priority: env vars > config/{env} > config/default > built-in defaults
    let env = std::env::var("BRUNO_ENV").ok();
    let settings = match load_settings(env.as_deref()) {
        Ok(settings) => {
            // Tracing not yet initialized
            eprintln!(
                "Loaded configuration (env: {})",
                env.as_deref().unwrap_or("default")
            );
            settings
        },
        Err(e) => {
            eprintln!("Warning: Failed to load config: {}. Using defaults.", e);
            Settings::default()
        },
    };

    init_tracing(&settings);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        sample_rate = settings.audio.sample_rate,
        frame_ms = settings.audio.frame_duration_ms,
        threshold = settings.audio.energy_threshold,
        wake_phrases = ?settings.wake.phrases,
        "Starting Bruno"
    );

    probe_services(&settings).await;

    let collaborators = build_collaborators(&settings)?;
    let (listener, capture) = start_capture(&settings).map_err(|e| {
        tracing::error!(error = %e, "Capture unavailable");
        e
    })?;
    let mut controller = build_controller(&settings, listener, collaborators);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        shutdown_signal().await;
        let _ = shutdown_tx.send(true);
    });

    tracing::info!(device = capture.label(), "Listening for wake phrase");
    let result = controller.run(shutdown_rx).await;

    capture.stop();
    result?;
    tracing::info!("Bruno stopped");
    Ok(())
}

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
            },
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, shutting down");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, shutting down");
        }
    }
}

fn init_tracing(settings: &Settings) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = &settings.observability.log_level;
        format!("bruno={level},bruno_agent={level},bruno_pipeline={level},bruno_plan={level},bruno_llm={level},bruno_transport={level},bruno_server={level}").into()
    });

    let subscriber = tracing_subscriber::registry().with(env_filter);
    let fmt_layer = if settings.observability.log_json {
        tracing_subscriber::fmt::layer().json().boxed()
    } else {
        tracing_subscriber::fmt::layer().boxed()
    };
    subscriber.with(fmt_layer).init();
}
