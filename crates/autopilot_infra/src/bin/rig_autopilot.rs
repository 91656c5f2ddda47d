use std::sync::Arc;

use autopilot_infra::config::AppConfig;
use autopilot_infra::controller::{RigApi, RigEvent};
use autopilot_infra::nicehash::NiceHashClient;
use autopilot_infra::rates::{RatePoller, rate_cache};
use autopilot_infra::scheduler::{
    RigSpawn, spawn_rate_poller, spawn_rate_watcher, spawn_rig, spawn_time_resync,
};
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let path = AppConfig::path_from_args();
    let config = AppConfig::from_file(&path)?;
    let timing = config.timing()?;
    info!(config = %path, rigs = config.rigs.len(), "starting rig autopilot");

    let client = Arc::new(NiceHashClient::new(&config.api, timing.http_timeout)?);
    if let Err(e) = client.sync_time().await {
        warn!(error = %e, "initial time sync failed, calls fail until a re-sync succeeds");
    }
    let resync = spawn_time_resync(Arc::clone(&client), timing.time_resync);

    let (events_tx, mut events_rx) = mpsc::unbounded_channel();

    let http = reqwest::Client::builder().timeout(timing.http_timeout).build()?;
    let (rate_writer, rates) = rate_cache();
    let rate_poller = spawn_rate_poller(
        RatePoller::new(http, config.rates.ticker_url.clone(), rate_writer),
        timing.rate_refresh,
    );
    let rate_watcher = spawn_rate_watcher(
        rates.clone(),
        config.tariff.currency.clone(),
        timing.rate_watch,
        events_tx.clone(),
    );

    // Senders stay alive for the life of the process so settings can be
    // swapped at runtime.
    let (_tariff_tx, tariff_rx) = watch::channel(config.tariff.to_tariff());
    let api: Arc<dyn RigApi> = client;
    let mut rigs = Vec::with_capacity(config.rigs.len());
    let mut settings_senders = Vec::with_capacity(config.rigs.len());
    for rig in &config.rigs {
        let (settings_tx, settings_rx) = watch::channel(rig.settings(&timing));
        settings_senders.push(settings_tx);
        info!(rig_id = %rig.id, name = rig.display_name(), autopilot = rig.autopilot, "managing rig");
        rigs.push(spawn_rig(RigSpawn {
            rig_id: rig.id.clone(),
            api: Arc::clone(&api),
            rates: rates.clone(),
            tariff: tariff_rx.clone(),
            settings: settings_rx,
            events: events_tx.clone(),
            poll_interval: timing.poll_interval,
            algorithm_refresh: timing.algorithm_refresh,
        }));
    }
    drop(events_tx);

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            event = events_rx.recv() => match event {
                Some(event) => log_event(&event),
                None => break,
            },
        }
    }

    info!("shutting down");
    for mut rig in rigs {
        rig.shutdown();
    }
    resync.abort();
    rate_poller.abort();
    rate_watcher.abort();
    Ok(())
}

fn log_event(event: &RigEvent) {
    match event {
        RigEvent::StatusChanged { rig_id, name, status } => {
            info!(rig_id = %rig_id, name = %name, status = %status, "status changed")
        }
        RigEvent::Metrics(m) => debug!(
            rig_id = %m.rig_id,
            phase = m.phase.as_str(),
            power_w = m.power_watts,
            hashrate_mh = m.hashrate_mh,
            profit_pct = ?m.net_profit_pct,
            energy_kwh = m.meters.energy_kwh,
            "metrics"
        ),
        RigEvent::CommandIssued { rig_id, command } => {
            info!(rig_id = %rig_id, ?command, "command issued")
        }
        RigEvent::RateChanged { currency, instant_price } => {
            debug!(currency = %currency, price = instant_price, "rate changed")
        }
    }
}
