//! One-shot cancellable timer backing the timed-toggle hold detection
//!
//! Each armed timer is a short-lived thread blocked on a rendezvous channel.
//! Dropping the [`PendingTimeout`] disconnects the channel and wakes the
//! thread without firing. A firing that already passed the wait is rejected
//! by the owner through the generation number.

use crossbeam::channel::{self, RecvTimeoutError, Sender};
use std::io;
use std::thread;
use std::time::Duration;
use tracing::trace;

/// Handle to an armed timer; dropping it cancels the timer
#[derive(Debug)]
pub(crate) struct PendingTimeout {
    generation: u64,
    _cancel: Sender<()>,
}

impl PendingTimeout {
    pub(crate) fn generation(&self) -> u64 {
        self.generation
    }
}

/// Run `on_expire` after `delay` unless the returned handle is dropped first
pub(crate) fn arm<F>(label: &str, delay: Duration, generation: u64, on_expire: F) -> io::Result<PendingTimeout>
where
    F: FnOnce() + Send + 'static,
{
    let (cancel_tx, cancel_rx) = channel::bounded::<()>(0);
    let label = label.to_string();

    thread::Builder::new()
        .name(format!("timeout-{}", label))
        .spawn(move || match cancel_rx.recv_timeout(delay) {
            Err(RecvTimeoutError::Timeout) => {
                trace!("{}: timeout #{} expired", label, generation);
                on_expire();
            }
            _ => trace!("{}: timeout #{} cancelled", label, generation),
        })?;

    Ok(PendingTimeout {
        generation,
        _cancel: cancel_tx,
    })
}
