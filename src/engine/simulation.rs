//! Market simulation.
//!
//! A recurring tick perturbs every quote with the selected price-movement
//! strategy and then revalues all portfolios, in one write-lock hold, so a
//! tick and an order execution can never interleave. Discrete market events
//! (bull/bear/crash/recovery) reuse the same pass outside the tick cycle.
//!
//! All randomness comes from the store's seeded ChaCha8 RNG; two runs with
//! equal seeds produce identical price paths.

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::assets::PRICE_FLOOR;
use super::Brokerage;
use crate::config::Config;

/// Upper bound (exclusive) of the per-tick volume increment.
const TICK_VOLUME_BUMP: u64 = 10_000;

/// Price-movement strategy applied to every quote in a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriceMove {
    /// Random walk scaled by the configured volatility factor.
    Random,
    /// Broad rally of 5-15%.
    Bull,
    /// Broad decline of 5-15%.
    Bear,
    /// Sharp decline of 15-35%.
    Crash,
    /// Rebound of 10-25%.
    Recovery,
}

impl PriceMove {
    /// Move one price. The result is clamped to the price floor.
    pub fn apply(self, price: f64, volatility: f64, rng: &mut ChaCha8Rng) -> f64 {
        let moved = match self {
            PriceMove::Random => {
                let swing: f64 = rng.gen_range(-1.0..1.0);
                price + price * swing * volatility
            }
            PriceMove::Bull => price * (1.0 + rng.gen_range(0.05..0.15)),
            PriceMove::Bear => price * (1.0 - rng.gen_range(0.05..0.15)),
            PriceMove::Crash => price * (1.0 - rng.gen_range(0.15..0.35)),
            PriceMove::Recovery => price * (1.0 + rng.gen_range(0.10..0.25)),
        };
        moved.max(PRICE_FLOOR)
    }
}

/// A one-shot market event; the subset of strategies callers may trigger
/// directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarketEvent {
    Bull,
    Bear,
    Crash,
    Recovery,
}

impl MarketEvent {
    pub fn as_str(&self) -> &str {
        match self {
            MarketEvent::Bull => "bull",
            MarketEvent::Bear => "bear",
            MarketEvent::Crash => "crash",
            MarketEvent::Recovery => "recovery",
        }
    }
}

impl From<MarketEvent> for PriceMove {
    fn from(event: MarketEvent) -> Self {
        match event {
            MarketEvent::Bull => PriceMove::Bull,
            MarketEvent::Bear => PriceMove::Bear,
            MarketEvent::Crash => PriceMove::Crash,
            MarketEvent::Recovery => PriceMove::Recovery,
        }
    }
}

/// Apply `strategy` to every quote, then revalue all portfolios.
///
/// Each asset updates independently; one failing lookup is skipped rather
/// than aborting the pass. Only the recurring random tick bumps volume,
/// discrete events move price alone.
pub fn run_market_pass(store: &mut Brokerage, strategy: PriceMove, volatility: f64) {
    for symbol in store.assets.symbols() {
        let Ok(quote) = store.assets.get(&symbol) else {
            continue;
        };
        let price = quote.price;
        let new_price = strategy.apply(price, volatility, &mut store.rng);
        let volume_bump = if strategy == PriceMove::Random {
            store.rng.gen_range(0..TICK_VOLUME_BUMP)
        } else {
            0
        };
        if let Err(err) = store.assets.apply_price_change(&symbol, new_price, volume_bump) {
            debug!(symbol = %symbol, error = %err, "skipping asset during market pass");
        }
    }
    store.portfolios.revalue_all(&store.assets);
}

#[derive(Debug, Clone, Serialize)]
pub struct SimulationStatus {
    pub running: bool,
    pub last_tick_at: Option<DateTime<Utc>>,
}

#[derive(Default)]
struct ClockInner {
    handle: Option<JoinHandle<()>>,
    last_tick_at: Option<DateTime<Utc>>,
}

/// Recurring market tick over the shared brokerage state.
///
/// States are {stopped, running}: `start` is a no-op while running, `stop`
/// cancels the pending tick and never an in-flight pass (a pass holds the
/// write lock and contains no await point).
#[derive(Clone)]
pub struct MarketSimulationClock {
    store: Arc<RwLock<Brokerage>>,
    tick_interval: Duration,
    volatility: f64,
    inner: Arc<Mutex<ClockInner>>,
}

impl MarketSimulationClock {
    pub fn new(store: Arc<RwLock<Brokerage>>, config: &Config) -> Self {
        Self {
            store,
            tick_interval: Duration::from_millis(config.tick_interval_ms),
            volatility: config.volatility_factor,
            inner: Arc::new(Mutex::new(ClockInner::default())),
        }
    }

    /// Begin ticking. No-op if already running.
    pub fn start(&self) {
        let mut inner = self.inner.lock();
        if inner.handle.is_some() {
            debug!("market simulation already running");
            return;
        }

        info!(
            interval_ms = self.tick_interval.as_millis() as u64,
            volatility = self.volatility,
            "starting market simulation"
        );

        let store = self.store.clone();
        let shared = self.inner.clone();
        let volatility = self.volatility;
        let tick_interval = self.tick_interval;

        inner.handle = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(tick_interval);
            // The first interval tick fires immediately; consume it so the
            // first pass lands one full interval after start.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                {
                    let mut store = store.write();
                    run_market_pass(&mut store, PriceMove::Random, volatility);
                }
                shared.lock().last_tick_at = Some(Utc::now());
                debug!("market tick applied");
            }
        }));
    }

    /// Cancel the pending tick and transition to stopped. No-op if stopped.
    pub fn stop(&self) {
        let mut inner = self.inner.lock();
        match inner.handle.take() {
            Some(handle) => {
                handle.abort();
                info!("market simulation stopped");
            }
            None => debug!("market simulation not running"),
        }
    }

    pub fn is_running(&self) -> bool {
        self.inner.lock().handle.is_some()
    }

    pub fn status(&self) -> SimulationStatus {
        let inner = self.inner.lock();
        SimulationStatus {
            running: inner.handle.is_some(),
            last_tick_at: inner.last_tick_at,
        }
    }

    /// Run one immediate pass with a discrete event strategy. Works whether
    /// the clock is running or stopped and does not change that state.
    pub fn trigger_event(&self, event: MarketEvent) {
        info!(event = event.as_str(), "applying market event");
        let mut store = self.store.write();
        run_market_pass(&mut store, event.into(), self.volatility);
    }
}
