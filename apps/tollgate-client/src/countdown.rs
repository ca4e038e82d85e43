//! 1 Hz countdown toward a block deadline.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tollgate_core::ports::Clock;

/// Single repeating countdown task.
///
/// Starting a new countdown aborts the running one, which closes the channel
/// its receivers were watching. Dropping the countdown aborts the task too.
#[derive(Debug)]
pub struct Countdown {
    clock: Arc<dyn Clock>,
    task: Option<JoinHandle<()>>,
}

impl Countdown {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock, task: None }
    }

    /// Count down to `deadline_ms`. The receiver yields whole seconds left and
    /// closes after it reaches zero.
    pub fn start(&mut self, deadline_ms: u64) -> watch::Receiver<u64> {
        self.stop();

        let clock = self.clock.clone();
        let remaining = move || deadline_ms.saturating_sub(clock.now_millis()).div_ceil(1000);
        let (tx, rx) = watch::channel(remaining());

        self.task = Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(1));
            loop {
                interval.tick().await;
                let secs = remaining();
                tx.send_if_modified(|current| {
                    let changed = *current != secs;
                    *current = secs;
                    changed
                });
                if secs == 0 {
                    break;
                }
            }
        }));

        rx
    }

    pub fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for Countdown {
    fn drop(&mut self) {
        self.stop();
    }
}
