//! Polling loop around [`run_cycle`].
//!
//! The loop pauses for the configured interval after every cycle, so the
//! effective cadence is cycle time plus the interval. Cancellation is only
//! observed during that pause; a cycle in flight always runs to completion.

use std::time::Instant;

use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

use crate::cycle::{run_cycle, CycleReport};
use crate::error::CycleError;
use crate::exchange::Exchange;
use crate::logging::{log, log_cycle_error, log_session_summary, obj, v_str, Domain, Level};
use crate::state::{ChangeTracker, Config};

/// Cancels a token on Ctrl+C.
#[derive(Clone, Default)]
pub struct ShutdownController {
    token: CancellationToken,
}

impl ShutdownController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawns a listener task; must be called inside a tokio runtime.
    pub fn with_ctrl_c() -> Self {
        let controller = Self::new();
        let token = controller.token.clone();

        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    log(Level::Info, Domain::System, "shutdown_requested", obj(&[("signal", v_str("ctrl_c"))]));
                    token.cancel();
                }
                Err(e) => {
                    log(
                        Level::Warn,
                        Domain::System,
                        "signal_listener_failed",
                        obj(&[("msg", v_str(&e.to_string()))]),
                    );
                }
            }
        });

        controller
    }

    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    pub fn shutdown(&self) {
        self.token.cancel();
    }
}

pub struct Driver<E: ?Sized> {
    exchange: Box<E>,
    cfg: Config,
    tracker: ChangeTracker,
    cycles_ok: u64,
    cycles_failed: u64,
}

impl<E> Driver<E>
where
    E: Exchange + ?Sized + Send + Sync,
{
    pub fn new(exchange: Box<E>, cfg: Config) -> Self {
        Self {
            exchange,
            cfg,
            tracker: ChangeTracker::new(),
            cycles_ok: 0,
            cycles_failed: 0,
        }
    }

    pub fn tracker(&self) -> &ChangeTracker {
        &self.tracker
    }

    pub fn counts(&self) -> (u64, u64) {
        (self.cycles_ok, self.cycles_failed)
    }

    /// One cycle plus reporting, with no pause afterwards.
    pub async fn tick(&mut self) -> Result<CycleReport, CycleError> {
        let result = run_cycle(self.exchange.as_ref(), &self.cfg, &mut self.tracker).await;
        match &result {
            Ok(report) => {
                self.cycles_ok += 1;
                println!("{}", report);
            }
            Err(err) => {
                self.cycles_failed += 1;
                println!("Error fetching data or calculating Greeks: {}", err);
                log_cycle_error(&self.cfg.symbol, err);
            }
        }
        result
    }

    /// Poll until `shutdown` is cancelled. Cycle failures never end the loop.
    pub async fn run(&mut self, shutdown: CancellationToken) {
        let started = Instant::now();
        log(
            Level::Info,
            Domain::System,
            "driver_started",
            obj(&[
                ("symbol", v_str(&self.cfg.symbol)),
                ("interval_secs", serde_json::json!(self.cfg.interval_secs)),
            ]),
        );

        while !shutdown.is_cancelled() {
            let _ = self.tick().await;

            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = sleep(self.cfg.interval()) => {}
            }
        }

        log_session_summary(started.elapsed().as_secs(), self.cycles_ok, self.cycles_failed);
    }
}
