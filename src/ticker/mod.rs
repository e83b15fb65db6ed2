
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, Mutex};
use tokio::time::MissedTickBehavior;
use waitgroup::WaitGroup;

use crate::error::{Error, Result};
use crate::gate::GateArray;

pub const DEFAULT_SAMPLE_PERIOD: Duration = Duration::from_secs(5);

pub(crate) struct SampleTickerInternal {
    pub(crate) period: Duration,
    pub(crate) gates: Arc<GateArray>,
    pub(crate) ticks: AtomicU64,
    pub(crate) close_rx: Mutex<Option<mpsc::Receiver<()>>>,
}

/// SampleTicker re-opens every gate of a GateArray once per period.
///
/// The first reset happens as soon as the ticker starts. The ticker runs
/// on its own task until `close` is called.
pub struct SampleTicker {
    internal: Arc<SampleTickerInternal>,

    wg: Mutex<Option<WaitGroup>>,
    close_tx: Mutex<Option<mpsc::Sender<()>>>,
}

impl SampleTicker {
    pub fn new(gates: Arc<GateArray>, period: Duration) -> Self {
        let (close_tx, close_rx) = mpsc::channel(1);
        SampleTicker {
            internal: Arc::new(SampleTickerInternal {
                period,
                gates,
                ticks: AtomicU64::new(0),
                close_rx: Mutex::new(Some(close_rx)),
            }),

            wg: Mutex::new(Some(WaitGroup::new())),
            close_tx: Mutex::new(Some(close_tx)),
        }
    }

    pub fn period(&self) -> Duration {
        self.internal.period
    }

    /// ticks returns how many times the gates have been re-opened.
    pub fn ticks(&self) -> u64 {
        self.internal.ticks.load(Ordering::SeqCst)
    }

    async fn is_closed(&self) -> bool {
        let close_tx = self.close_tx.lock().await;
        close_tx.is_none()
    }

    /// start spawns the ticking task. A ticker starts at most once; later
    /// calls and calls after close do nothing.
    pub async fn start(&self) {
        if self.is_closed().await {
            return;
        }

        let mut w = {
            let wait_group = self.wg.lock().await;
            wait_group.as_ref().map(|wg| wg.worker())
        };
        let internal = Arc::clone(&self.internal);
        tokio::spawn(async move {
            let _d = w.take();
            if let Err(err) = SampleTicker::run(internal).await {
                log::debug!("SampleTicker::run got error: {}", err);
            }
        });
    }

    async fn run(internal: Arc<SampleTickerInternal>) -> Result<()> {
        let mut close_rx = {
            let mut close_rx = internal.close_rx.lock().await;
            if let Some(close) = close_rx.take() {
                close
            } else {
                return Err(Error::ErrInvalidCloseRx);
            }
        };

        let mut ticker = tokio::time::interval(internal.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    internal.gates.open_all();
                    let n = internal.ticks.fetch_add(1, Ordering::SeqCst) + 1;
                    log::trace!("gates opened, tick {}", n);
                }
                _ = close_rx.recv() => {
                    log::debug!(
                        "sample ticker stopped after {} ticks",
                        internal.ticks.load(Ordering::SeqCst)
                    );
                    return Ok(());
                }
            }
        }
    }

    /// close stops the ticker and waits for its task to exit.
    pub async fn close(&self) -> Result<()> {
        {
            let mut close_tx = self.close_tx.lock().await;
            close_tx.take();
        }

        {
            let mut wait_group = self.wg.lock().await;
            if let Some(wg) = wait_group.take() {
                wg.wait().await;
            }
        }

        Ok(())
    }
}
