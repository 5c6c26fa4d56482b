use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Period between countdown ticks.
pub const TICK_PERIOD: Duration = Duration::from_secs(1);

/// A running countdown that emits one `()` per period on its channel.
///
/// The first tick arrives one full period after `start`. Cancelling (or
/// dropping) the handle stops the task; no tick is delivered afterwards.
#[derive(Debug)]
pub struct CountdownTimer {
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl CountdownTimer {
    /// Spawn the ticking task and return the handle plus the tick receiver.
    #[must_use]
    pub fn start(period: Duration) -> (Self, mpsc::Receiver<()>) {
        let (tick_tx, tick_rx) = mpsc::channel(8);
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel();

        let task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // interval() completes its first tick immediately
            interval.tick().await;

            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => break,
                    _ = interval.tick() => {
                        if tick_tx.send(()).await.is_err() {
                            break;
                        }
                    }
                }
            }
        });

        (
            Self {
                shutdown: Some(shutdown_tx),
                task: Some(task),
            },
            tick_rx,
        )
    }

    /// Stop ticking. Safe to call more than once.
    pub fn cancel(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.shutdown.is_none()
    }
}

impl Drop for CountdownTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}
