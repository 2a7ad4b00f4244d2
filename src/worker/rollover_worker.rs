use std::sync::Arc;
use tokio::sync::watch;
use tokio::time::{sleep, Duration};
use tracing::{debug, info};

use crate::display::DisplaySynchronizer;
use crate::engine::{Clock, JobBoard};

/// Background worker that resets daily completion counters
pub struct RolloverWorker {
    board: Arc<JobBoard>,
    clock: Arc<dyn Clock>,
    display: Arc<DisplaySynchronizer>,
}

impl RolloverWorker {
    /// Create a new RolloverWorker instance
    pub fn new(board: Arc<JobBoard>, clock: Arc<dyn Clock>, display: Arc<DisplaySynchronizer>) -> Self {
        Self {
            board,
            clock,
            display,
        }
    }

    /// One pass over the board. Returns how many jobs were reset.
    pub async fn tick(&self) -> usize {
        let reset = self.board.roll_over(self.clock.now()).await;
        for job_id in &reset {
            if let Ok(view) = self.board.get(job_id).await {
                self.display.acknowledge(&view.snapshot).await;
            }
        }
        reset.len()
    }

    /// Check for a passed reset boundary every `check_interval` until the
    /// shutdown channel flips to `true`
    pub async fn run(&self, check_interval: Duration, mut shutdown_rx: watch::Receiver<bool>) {
        info!("Rollover worker started (checking every {:?})", check_interval);

        loop {
            if *shutdown_rx.borrow() {
                break;
            }

            let reset = self.tick().await;
            if reset > 0 {
                info!("Daily limits reset for {} jobs", reset);
            } else {
                debug!("Rollover check: nothing to reset");
            }

            tokio::select! {
                _ = sleep(check_interval) => {}
                changed = shutdown_rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        info!("Rollover worker stopped");
    }
}
