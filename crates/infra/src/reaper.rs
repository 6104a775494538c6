//! Background thread that deletes expired soft reservations.

use std::sync::{mpsc, Arc};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{info, warn};

use storefront_core::Clock;

use crate::config::StorefrontConfig;
use crate::reservations::ReservationManager;

/// Config for the reservation reaper.
#[derive(Debug, Clone)]
pub struct ReservationReaper {
    pub interval: Duration,
}

impl Default for ReservationReaper {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60),
        }
    }
}

/// Handle for the running reaper (shutdown + trigger hook).
#[derive(Debug)]
pub struct ReservationReaperHandle {
    shutdown: mpsc::Sender<()>,
    trigger: mpsc::SyncSender<()>,
    join: Option<thread::JoinHandle<()>>,
}

impl ReservationReaperHandle {
    /// Request an extra pass now. Triggers coalesce while one is pending.
    pub fn trigger(&self) {
        let _ = self.trigger.try_send(());
    }

    /// Stop the reaper thread and wait for it.
    pub fn shutdown(mut self) {
        let _ = self.shutdown.send(());
        if let Some(j) = self.join.take() {
            let _ = j.join();
        }
    }
}

impl ReservationReaper {
    pub fn from_config(config: &StorefrontConfig) -> Self {
        Self {
            interval: config.reaper_interval,
        }
    }

    /// Spawn the reaper. Failures are logged and retried on the next tick.
    pub fn spawn(
        &self,
        stock: Arc<ReservationManager>,
        clock: Arc<dyn Clock>,
    ) -> std::io::Result<ReservationReaperHandle> {
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();
        let (trigger_tx, trigger_rx) = mpsc::sync_channel::<()>(1);

        let interval = self.interval;
        let join = thread::Builder::new()
            .name("reservation-reaper".to_string())
            .spawn(move || reaper_loop(interval, shutdown_rx, trigger_rx, stock, clock))?;

        Ok(ReservationReaperHandle {
            shutdown: shutdown_tx,
            trigger: trigger_tx,
            join: Some(join),
        })
    }
}

fn reaper_loop(
    interval: Duration,
    shutdown_rx: mpsc::Receiver<()>,
    trigger_rx: mpsc::Receiver<()>,
    stock: Arc<ReservationManager>,
    clock: Arc<dyn Clock>,
) {
    info!(interval_ms = interval.as_millis() as u64, "reservation reaper started");

    let mut next_tick = Instant::now() + interval;
    let mut pending = false;

    loop {
        match shutdown_rx.try_recv() {
            Ok(()) | Err(mpsc::TryRecvError::Disconnected) => break,
            Err(mpsc::TryRecvError::Empty) => {}
        }

        let now = Instant::now();
        if now >= next_tick {
            pending = true;
            while next_tick <= now {
                next_tick += interval;
            }
        }

        while trigger_rx.try_recv().is_ok() {
            pending = true;
        }

        if !pending {
            let sleep_for = next_tick
                .saturating_duration_since(Instant::now())
                .min(Duration::from_millis(50));
            thread::sleep(sleep_for);
            continue;
        }
        pending = false;

        if let Err(e) = stock.reap_expired(clock.now()) {
            warn!(error = %e, "reaping expired reservations failed");
        }
    }

    info!("reservation reaper stopped");
}
