use std::ops::ControlFlow;
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread;
use std::time::Duration;

/// Cancellable repeating tick on a background thread.
///
/// The callback fires once per interval until it returns
/// `ControlFlow::Break` or the handle is cancelled/dropped. The handle is the
/// only way to reach the thread, so owning it exclusively is what guarantees
/// at most one live tick source.
#[derive(Debug)]
pub struct TickTimer {
    stop_tx: Sender<()>,
}

impl TickTimer {
    /// Spawn the tick thread. Fails only if the host cannot spawn a thread.
    pub fn spawn<F>(interval: Duration, mut on_tick: F) -> std::io::Result<Self>
    where
        F: FnMut() -> ControlFlow<()> + Send + 'static,
    {
        let (stop_tx, stop_rx) = mpsc::channel();

        thread::Builder::new()
            .name("takt-tick".to_string())
            .spawn(move || loop {
                match stop_rx.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => {
                        if on_tick().is_break() {
                            break;
                        }
                    }
                    // Explicit cancel, or the handle was dropped
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            })?;

        Ok(Self { stop_tx })
    }

    /// Stop ticking. Idempotent; the thread exits before its next tick.
    pub fn cancel(&self) {
        let _ = self.stop_tx.send(());
    }
}

impl Drop for TickTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}
