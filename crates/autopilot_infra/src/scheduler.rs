//! Timers driving the control loop.
//!
//! Per rig: one poll timer that runs the controller's tick and one timer
//! that refreshes that rig's algorithm table. Globally: the clock re-sync,
//! the rate poller and the rate watcher. Each rig's controller lives inside
//! its poll task, so that rig's ticks never run concurrently; a tick that
//! overruns the period makes the timer skip, not queue.

use std::sync::Arc;
use std::time::Duration;

use autopilot_core::profitability::TariffConfig;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval, interval_at};
use tracing::{debug, info, warn};

use crate::controller::{RigApi, RigController, RigControllerDeps, RigEvent, RigSettings};
use crate::error::TickError;
use crate::nicehash::{NiceHashClient, algorithm_table};
use crate::nicehash::client::local_now_ms;
use crate::rates::{RateCache, RatePoller, RateWatcher};

/// Timers belonging to one rig. Shutting down or dropping the handle stops
/// all of them.
#[derive(Debug)]
pub struct RigHandle {
    rig_id: String,
    tasks: Vec<JoinHandle<()>>,
}

impl RigHandle {
    pub fn rig_id(&self) -> &str {
        &self.rig_id
    }

    pub fn is_running(&self) -> bool {
        self.tasks.iter().any(|t| !t.is_finished())
    }

    pub fn shutdown(&mut self) {
        if self.tasks.is_empty() {
            return;
        }
        for task in self.tasks.drain(..) {
            task.abort();
        }
        info!(rig_id = %self.rig_id, "rig timers stopped");
    }
}

impl Drop for RigHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

pub struct RigSpawn {
    pub rig_id: String,
    pub api: Arc<dyn RigApi>,
    pub rates: RateCache,
    pub tariff: watch::Receiver<TariffConfig>,
    pub settings: watch::Receiver<RigSettings>,
    pub events: mpsc::UnboundedSender<RigEvent>,
    pub poll_interval: Duration,
    pub algorithm_refresh: Duration,
}

/// Start the poll and algorithm-refresh timers for one rig.
pub fn spawn_rig(spawn: RigSpawn) -> RigHandle {
    let (writer, table) = algorithm_table();

    let refresh_api = Arc::clone(&spawn.api);
    let refresh_rig = spawn.rig_id.clone();
    let refresh_period = spawn.algorithm_refresh;
    let refresh = tokio::spawn(async move {
        let mut ticker = interval(refresh_period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            match refresh_api.get_algorithms().await {
                Ok(entries) => {
                    debug!(rig_id = %refresh_rig, count = entries.len(), "algorithm table refreshed");
                    writer.replace(entries);
                }
                Err(e) => warn!(rig_id = %refresh_rig, error = %e, "algorithm refresh failed"),
            }
        }
    });

    let mut controller = RigController::new(
        spawn.rig_id.clone(),
        RigControllerDeps {
            api: spawn.api,
            algorithms: Arc::new(table),
            rates: spawn.rates,
            tariff: spawn.tariff,
            settings: spawn.settings,
            events: spawn.events,
        },
    );
    let poll_period = spawn.poll_interval;
    let poll = tokio::spawn(async move {
        let mut ticker = interval(poll_period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            let outcome = controller.tick(local_now_ms()).await;
            log_tick(controller.rig_id(), outcome);
        }
    });

    info!(rig_id = %spawn.rig_id, ?poll_period, "rig timers started");
    RigHandle {
        rig_id: spawn.rig_id,
        tasks: vec![poll, refresh],
    }
}

fn log_tick<T>(rig_id: &str, outcome: Result<T, TickError>) {
    match outcome {
        Ok(_) => {}
        Err(TickError::NotManaged(e)) => warn!(rig_id = %rig_id, error = %e, "tick skipped"),
        Err(TickError::Api(e)) => warn!(rig_id = %rig_id, error = %e, "tick aborted"),
    }
}

/// Re-sync the API clock every `period`, starting one period from now.
pub fn spawn_time_resync(client: Arc<NiceHashClient>, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            if let Err(e) = client.sync_time().await {
                warn!(error = %e, "api time sync failed");
            }
        }
    })
}

pub fn spawn_rate_poller(poller: RatePoller, period: Duration) -> JoinHandle<()> {
    tokio::spawn(poller.run(period))
}

pub fn spawn_rate_watcher(
    cache: RateCache,
    currency: String,
    period: Duration,
    events: mpsc::UnboundedSender<RigEvent>,
) -> JoinHandle<()> {
    tokio::spawn(RateWatcher::new(cache, currency).run(period, events))
}
