use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;

const TICK: Duration = Duration::from_millis(200);
const STEP: u8 = 7;
/// The ticker advances toward this cap and holds; only the real response
/// snaps the value to 100.
const CAP: u8 = 90;

/// Coarse progress reporting for a recognizer that exposes no real
/// callbacks. The ticker is an explicit task, cancelled on completion or
/// failure rather than left running.
#[derive(Debug, Default)]
pub struct SimulatedProgress {
    percent: Arc<AtomicU8>,
    ticker: Option<JoinHandle<()>>,
}

impl SimulatedProgress {
    pub fn idle() -> Self {
        Self::default()
    }

    pub fn percent(&self) -> u8 {
        self.percent.load(Ordering::SeqCst)
    }

    pub fn start(&mut self) {
        self.stop_ticker();
        self.percent.store(0, Ordering::SeqCst);
        let percent = Arc::clone(&self.percent);
        self.ticker = Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval(TICK);
            loop {
                interval.tick().await;
                let current = percent.load(Ordering::SeqCst);
                if current >= CAP {
                    break;
                }
                percent.store((current + STEP).min(CAP), Ordering::SeqCst);
            }
        }));
    }

    /// The true response arrived: snap to 100.
    pub fn complete(&mut self) {
        self.stop_ticker();
        self.percent.store(100, Ordering::SeqCst);
    }

    pub fn fail(&mut self) {
        self.stop_ticker();
        self.percent.store(0, Ordering::SeqCst);
    }

    fn stop_ticker(&mut self) {
        if let Some(handle) = self.ticker.take() {
            handle.abort();
        }
    }
}

impl Drop for SimulatedProgress {
    fn drop(&mut self) {
        self.stop_ticker();
    }
}
