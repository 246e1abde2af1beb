//! Radbill invoice scheduler
//!
//! Runs the invoice generation sweep on a fixed cadence until Ctrl+C or
//! SIGTERM. SIGHUP reloads the invoicing settings without restarting.

use std::sync::Arc;
use std::time::Duration;

use tokio::signal;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use radbill_core::invoicing::{InvoiceEngine, MessageCatalog, SystemClock};
use radbill_db::{BillingRepository, connect_with};
use radbill_shared::{AppConfig, InvoicingSettings, SettingsHandle};

type Engine = InvoiceEngine<BillingRepository>;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let config = AppConfig::load()?;
    init_tracing(config.logging.json);

    let settings = InvoicingSettings::from_config(&config.invoicing)?;
    info!(
        start_date = ?settings.start_date,
        timezone = %settings.timezone,
        interval_secs = config.invoicing.sweep_interval_secs,
        "Invoicing configured"
    );

    let db = connect_with(&config.database).await?;
    info!("Connected to database");

    let messages = MessageCatalog::new().with_overrides(
        config
            .messages
            .iter()
            .map(|m| (m.key.clone(), m.text.clone())),
    );

    let engine = InvoiceEngine::new(
        Arc::new(BillingRepository::new(db)),
        Arc::new(messages),
        Arc::new(SystemClock),
        Arc::new(SettingsHandle::new(settings)),
    );

    run(&engine, &config).await?;

    info!("Scheduler stopped");
    Ok(())
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "radbill=debug,sea_orm=warn".into());
    let registry = tracing_subscriber::registry().with(filter);

    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer()).init();
    }
}

async fn run(engine: &Engine, config: &AppConfig) -> anyhow::Result<()> {
    let period = Duration::from_secs(config.invoicing.sweep_interval_secs.max(1));
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    // The first tick completes immediately.
    if !config.invoicing.run_on_start {
        ticker.tick().await;
    }

    let mut reload = ReloadSignal::new()?;
    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            () = &mut shutdown => break,
            () = reload.recv() => reload_settings(engine),
            _ = ticker.tick() => sweep(engine).await,
        }
    }

    Ok(())
}

async fn sweep(engine: &Engine) {
    match engine.generate_invoices().await {
        Ok(report) => info!(
            generated = report.generated,
            skipped = report.skipped,
            failed = report.failed,
            "Sweep completed"
        ),
        Err(e) => error!(error = %e, "Sweep failed, will retry on next tick"),
    }
}

fn reload_settings(engine: &Engine) {
    let reloaded = AppConfig::load()
        .map_err(anyhow::Error::from)
        .and_then(|config| {
            InvoicingSettings::from_config(&config.invoicing).map_err(anyhow::Error::from)
        });

    match reloaded {
        Ok(settings) => engine.reload_settings(settings),
        Err(e) => warn!(error = %e, "Settings reload failed, keeping current settings"),
    }
}

/// Resolves when SIGHUP is received. Never resolves off Unix.
struct ReloadSignal {
    #[cfg(unix)]
    hangup: signal::unix::Signal,
}

impl ReloadSignal {
    fn new() -> std::io::Result<Self> {
        Ok(Self {
            #[cfg(unix)]
            hangup: signal::unix::signal(signal::unix::SignalKind::hangup())?,
        })
    }

    async fn recv(&mut self) {
        #[cfg(unix)]
        if self.hangup.recv().await.is_some() {
            return;
        }
        std::future::pending::<()>().await;
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
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
                error!(error = %e, "Failed to install SIGTERM handler");
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

    info!("Shutdown signal received, stopping scheduler");
}
