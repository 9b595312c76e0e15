use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tracing::trace;

/// Spawn a task that forwards `raw` to the returned receiver once it has
/// stayed unchanged for `window`.
///
/// Every change restarts the window, so only the value present when the
/// window fully elapses is emitted. A settled value equal to the last
/// emitted one is not emitted again; the value current at spawn time counts
/// as emitted. The task ends when the sending side of `raw` is dropped.
pub fn debounce(mut raw: watch::Receiver<String>, window: Duration) -> mpsc::UnboundedReceiver<String> {
    let (tx, rx) = mpsc::unbounded_channel();
    let initial = raw.borrow_and_update().clone();
    tokio::spawn(debounce_loop(raw, initial, tx, window));
    rx
}

async fn debounce_loop(
    mut raw: watch::Receiver<String>,
    mut last_emitted: String,
    settled: mpsc::UnboundedSender<String>,
    window: Duration,
) {
    loop {
        if raw.changed().await.is_err() {
            return;
        }

        // Quiescence: wait until a full window passes without a change.
        loop {
            tokio::select! {
                changed = raw.changed() => {
                    if changed.is_err() {
                        return;
                    }
                }
                _ = tokio::time::sleep(window) => break,
            }
        }

        let value = raw.borrow_and_update().clone();
        if value == last_emitted {
            trace!(value = %value, "Settled on the previous value");
            continue;
        }

        last_emitted = value.clone();
        if settled.send(value).is_err() {
            return;
        }
    }
}
