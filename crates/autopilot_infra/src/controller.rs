//! Per-rig controller: one tick of the control loop.
//!
//! A tick fetches rig details, normalizes them, evaluates profitability,
//! steps the autopilot, issues any resulting command, integrates the meters
//! and publishes the derived metrics. A fetch failure or an unmanaged rig
//! ends the tick before the autopilot step or the meters run, and leaves a
//! pending settings change for the next good tick. A failed
//! command does not: metrics still go out. The sync marker advances on
//! every tick regardless of outcome.

use std::sync::Arc;

use async_trait::async_trait;
use autopilot_core::autopilot::{
    AutopilotCommand, AutopilotConfig, AutopilotDecision, AutopilotPhase, AutopilotState,
    TickInput,
};
use autopilot_core::meters::CumulativeMeters;
use autopilot_core::profitability::{ProfitabilityResult, TariffConfig, evaluate};
use autopilot_core::telemetry::{AlgorithmLookup, MetricsSnapshot, RigDetails, normalize};
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use crate::error::{ApiError, TickError};
use crate::nicehash::{AlgorithmEntry, NiceHashClient, PowerMode};
use crate::rates::RateCache;

/// Remote operations a rig controller needs.
#[async_trait]
pub trait RigApi: Send + Sync {
    async fn get_rig_details(&self, rig_id: &str) -> Result<RigDetails, ApiError>;
    async fn set_rig_status(&self, rig_id: &str, on: bool) -> Result<(), ApiError>;
    async fn set_rig_power_mode(&self, rig_id: &str, mode: PowerMode) -> Result<(), ApiError>;
    async fn get_algorithms(&self) -> Result<Vec<AlgorithmEntry>, ApiError>;
}

#[async_trait]
impl RigApi for NiceHashClient {
    async fn get_rig_details(&self, rig_id: &str) -> Result<RigDetails, ApiError> {
        NiceHashClient::get_rig_details(self, rig_id).await
    }

    async fn set_rig_status(&self, rig_id: &str, on: bool) -> Result<(), ApiError> {
        NiceHashClient::set_rig_status(self, rig_id, on).await
    }

    async fn set_rig_power_mode(&self, rig_id: &str, mode: PowerMode) -> Result<(), ApiError> {
        NiceHashClient::set_rig_power_mode(self, rig_id, mode).await
    }

    async fn get_algorithms(&self) -> Result<Vec<AlgorithmEntry>, ApiError> {
        NiceHashClient::get_algorithms(self).await
    }
}

/// Externally editable per-rig settings.
#[derive(Debug, Clone, PartialEq)]
pub struct RigSettings {
    pub autopilot: AutopilotConfig,
    pub power_mode: Option<PowerMode>,
}

/// Everything a rig exposes for display after a tick.
#[derive(Debug, Clone, PartialEq)]
pub struct RigMetrics {
    pub rig_id: String,
    pub name: String,
    pub miner_status: Option<String>,
    pub power_watts: f64,
    pub hashrate_mh: f64,
    pub algorithms: Vec<String>,
    pub max_temperature: f64,
    pub load: f64,
    pub mining_devices: u32,
    pub currency: String,
    pub revenue_mbtc_day: f64,
    pub cost_mbtc_day: f64,
    pub profit_mbtc_day: f64,
    pub revenue_local_day: f64,
    pub cost_local_day: f64,
    pub profit_local_day: f64,
    pub net_profit_pct: Option<f64>,
    pub rolling_profit_pct: Option<f64>,
    pub phase: AutopilotPhase,
    pub learned_tariff_limit: Option<f64>,
    pub meters: CumulativeMeters,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RigEvent {
    /// Provider-reported mining status differs from the previous tick.
    StatusChanged {
        rig_id: String,
        name: String,
        status: String,
    },
    Metrics(Box<RigMetrics>),
    CommandIssued {
        rig_id: String,
        command: AutopilotCommand,
    },
    RateChanged {
        currency: String,
        instant_price: f64,
    },
}

/// Owns one rig's autopilot state and meters. Exactly one per rig.
pub struct RigController {
    rig_id: String,
    api: Arc<dyn RigApi>,
    algorithms: Arc<dyn AlgorithmLookup + Send + Sync>,
    rates: RateCache,
    tariff: watch::Receiver<TariffConfig>,
    settings: watch::Receiver<RigSettings>,
    events: mpsc::UnboundedSender<RigEvent>,
    state: AutopilotState,
    meters: CumulativeMeters,
    last_status: Option<String>,
    last_min_profitability: Option<f64>,
    power_mode_applied: bool,
}

pub struct RigControllerDeps {
    pub api: Arc<dyn RigApi>,
    pub algorithms: Arc<dyn AlgorithmLookup + Send + Sync>,
    pub rates: RateCache,
    pub tariff: watch::Receiver<TariffConfig>,
    pub settings: watch::Receiver<RigSettings>,
    pub events: mpsc::UnboundedSender<RigEvent>,
}

impl RigController {
    pub fn new(rig_id: impl Into<String>, deps: RigControllerDeps) -> Self {
        Self::with_state(rig_id, deps, AutopilotState::new())
    }

    /// Start from a previously persisted autopilot state.
    pub fn with_state(rig_id: impl Into<String>, deps: RigControllerDeps, state: AutopilotState) -> Self {
        Self {
            rig_id: rig_id.into(),
            api: deps.api,
            algorithms: deps.algorithms,
            rates: deps.rates,
            tariff: deps.tariff,
            settings: deps.settings,
            events: deps.events,
            state,
            meters: CumulativeMeters::new(),
            last_status: None,
            last_min_profitability: None,
            power_mode_applied: false,
        }
    }

    pub fn rig_id(&self) -> &str {
        &self.rig_id
    }

    pub fn state(&self) -> &AutopilotState {
        &self.state
    }

    pub fn meters(&self) -> &CumulativeMeters {
        &self.meters
    }

    /// Run one tick at `now_ms`.
    pub async fn tick(&mut self, now_ms: u64) -> Result<AutopilotDecision, TickError> {
        let outcome = self.run_tick(now_ms).await;
        self.state.mark_synced(now_ms);
        outcome
    }

    async fn run_tick(&mut self, now_ms: u64) -> Result<AutopilotDecision, TickError> {
        let settings = self.settings.borrow().clone();
        let tariff = self.tariff.borrow().clone();

        let details = self.api.get_rig_details(&self.rig_id).await?;
        let snapshot = normalize(&details, self.algorithms.as_ref())?;
        self.rebenchmark_on_settings_change(&settings).await;
        debug!(
            rig_id = %self.rig_id,
            power_w = snapshot.power_watts,
            hashrate_mh = snapshot.hashrate_mh,
            mining_devices = snapshot.mining_devices,
            "rig snapshot"
        );

        self.apply_power_mode(settings.power_mode).await;
        self.publish_status(&details);

        let rate = self.rates.get_rate(&tariff.currency);
        let result = evaluate(&snapshot, snapshot.daily_revenue_btc, &tariff, rate.as_ref());
        if let Some(reason) = result.indeterminate {
            debug!(rig_id = %self.rig_id, %reason, "profitability indeterminate");
        }

        let previous_limit = self.state.learned_tariff_limit();
        let decision = self.state.step(
            &TickInput {
                now_ms,
                mining: snapshot.is_mining(),
                tariff: tariff.cost_per_kwh,
                profit_pct: result.net_profit_pct,
            },
            &settings.autopilot,
        );
        if decision.learned_tariff_limit != previous_limit {
            info!(
                rig_id = %self.rig_id,
                limit = ?decision.learned_tariff_limit,
                "learned tariff limit changed"
            );
        }
        debug!(
            rig_id = %self.rig_id,
            phase = decision.phase.as_str(),
            reason = ?decision.reason,
            profit_pct = ?result.net_profit_pct,
            rolling_pct = ?decision.rolling_profit_pct,
            "autopilot step"
        );

        if let Some(command) = decision.command {
            self.issue(command).await;
        }

        self.meters.accumulate(
            self.state.last_sync_at_ms(),
            now_ms,
            snapshot.power_watts,
            &result,
        );

        let metrics = self.build_metrics(&snapshot, &tariff, &result, &decision);
        self.emit(RigEvent::Metrics(Box::new(metrics)));
        Ok(decision)
    }

    async fn rebenchmark_on_settings_change(&mut self, settings: &RigSettings) {
        let current = settings.autopilot.min_profitability_pct;
        let changed = self
            .last_min_profitability
            .is_some_and(|previous| previous != current);
        self.last_min_profitability = Some(current);
        if !changed {
            return;
        }
        info!(rig_id = %self.rig_id, min_profitability_pct = current, "settings changed, re-benchmarking");
        let decision = self.state.request_rebenchmark(&settings.autopilot);
        if let Some(command) = decision.command {
            self.issue(command).await;
        }
    }

    async fn apply_power_mode(&mut self, mode: Option<PowerMode>) {
        let Some(mode) = mode else { return };
        if self.power_mode_applied {
            return;
        }
        match self.api.set_rig_power_mode(&self.rig_id, mode).await {
            Ok(()) => {
                self.power_mode_applied = true;
                info!(rig_id = %self.rig_id, mode = mode.as_str(), "power mode applied");
            }
            Err(e) => warn!(rig_id = %self.rig_id, error = %e, "power mode change failed"),
        }
    }

    fn publish_status(&mut self, details: &RigDetails) {
        let Some(status) = details.miner_status.as_ref() else {
            return;
        };
        let previous = self.last_status.replace(status.clone());
        if previous.is_some_and(|p| p != *status) {
            info!(rig_id = %self.rig_id, status = %status, "miner status changed");
            self.emit(RigEvent::StatusChanged {
                rig_id: self.rig_id.clone(),
                name: details.name.clone(),
                status: status.clone(),
            });
        }
    }

    async fn issue(&mut self, command: AutopilotCommand) {
        let on = command == AutopilotCommand::StartMining;
        match self.api.set_rig_status(&self.rig_id, on).await {
            Ok(()) => {
                info!(rig_id = %self.rig_id, ?command, "rig command issued");
                self.emit(RigEvent::CommandIssued {
                    rig_id: self.rig_id.clone(),
                    command,
                });
            }
            Err(e) => warn!(rig_id = %self.rig_id, ?command, error = %e, "rig command failed"),
        }
    }

    fn emit(&self, event: RigEvent) {
        // A dropped receiver only means nobody is listening.
        let _ = self.events.send(event);
    }

    fn build_metrics(
        &self,
        snapshot: &MetricsSnapshot,
        tariff: &TariffConfig,
        result: &ProfitabilityResult,
        decision: &AutopilotDecision,
    ) -> RigMetrics {
        let idle = decision.phase == AutopilotPhase::Idle;
        let instant = |v: f64| if idle { 0.0 } else { v };
        RigMetrics {
            rig_id: self.rig_id.clone(),
            name: snapshot.rig_name.clone(),
            miner_status: snapshot.miner_status.clone(),
            power_watts: snapshot.power_watts,
            hashrate_mh: snapshot.hashrate_mh,
            algorithms: snapshot.algorithms.iter().cloned().collect(),
            max_temperature: snapshot.max_temperature,
            load: snapshot.load,
            mining_devices: snapshot.mining_devices,
            currency: tariff.currency.clone(),
            revenue_mbtc_day: instant(result.revenue_mbtc_day),
            cost_mbtc_day: instant(result.cost_mbtc_day.unwrap_or(0.0)),
            profit_mbtc_day: instant(result.profit_mbtc_day().unwrap_or(0.0)),
            revenue_local_day: instant(result.revenue_local_day().unwrap_or(0.0)),
            cost_local_day: instant(result.cost_local_day),
            profit_local_day: instant(result.profit_local_day().unwrap_or(0.0)),
            net_profit_pct: if idle { Some(0.0) } else { result.net_profit_pct },
            rolling_profit_pct: decision.rolling_profit_pct,
            phase: decision.phase,
            learned_tariff_limit: decision.learned_tariff_limit,
            meters: self.meters.clone(),
        }
    }
}
