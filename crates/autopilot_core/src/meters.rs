//! Cumulative meters: energy, revenue and cost integrated over wall-clock
//! time between ticks.
//!
//! Local-currency totals use the rate at accumulation time; earlier
//! increments are never revalued. Totals only ever grow.

use crate::profitability::ProfitabilityResult;

const MS_PER_HOUR: f64 = 3_600_000.0;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CumulativeMeters {
    pub energy_kwh: f64,
    pub revenue_mbtc: f64,
    pub cost_mbtc: f64,
    pub revenue_local: f64,
    pub cost_local: f64,
}

/// Increment applied by one accumulation step.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeterIncrement {
    pub elapsed_hours: f64,
    pub energy_kwh: f64,
    pub revenue_mbtc: f64,
    pub cost_mbtc: f64,
    pub revenue_local: f64,
    pub cost_local: f64,
}

impl CumulativeMeters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn profit_mbtc(&self) -> f64 {
        self.revenue_mbtc - self.cost_mbtc
    }

    pub fn profit_local(&self) -> f64 {
        self.revenue_local - self.cost_local
    }

    /// Integrate one tick.
    ///
    /// Returns `None` on the first tick (no `last_sync_at_ms`), when
    /// nothing is integrated. A clock that went backwards integrates zero.
    /// mBTC cost and local totals are skipped when the rate is unusable.
    pub fn accumulate(
        &mut self,
        last_sync_at_ms: Option<u64>,
        now_ms: u64,
        power_watts: f64,
        result: &ProfitabilityResult,
    ) -> Option<MeterIncrement> {
        let last = last_sync_at_ms?;
        let elapsed_hours = now_ms.saturating_sub(last) as f64 / MS_PER_HOUR;
        let days = elapsed_hours / 24.0;

        let mut inc = MeterIncrement {
            elapsed_hours,
            energy_kwh: non_negative(power_watts / 1000.0 * elapsed_hours),
            revenue_mbtc: non_negative(result.revenue_mbtc_day * days),
            ..MeterIncrement::default()
        };
        if let Some(cost_mbtc_day) = result.cost_mbtc_day {
            inc.cost_mbtc = non_negative(cost_mbtc_day * days);
        }
        if let Some(rate) = result.mbtc_rate {
            inc.revenue_local = inc.revenue_mbtc * rate;
            inc.cost_local = inc.cost_mbtc * rate;
        }

        self.energy_kwh += inc.energy_kwh;
        self.revenue_mbtc += inc.revenue_mbtc;
        self.cost_mbtc += inc.cost_mbtc;
        self.revenue_local += inc.revenue_local;
        self.cost_local += inc.cost_local;
        Some(inc)
    }
}

fn non_negative(v: f64) -> f64 {
    if v.is_finite() && v > 0.0 { v } else { 0.0 }
}
