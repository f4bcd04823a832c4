//! Interrupt handling for batch runs
//!
//! The first interrupt asks the run to stop after the in-flight category; a
//! second one means the caller should exit immediately.

use std::future::Future;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Exit status used after a second interrupt
pub const INTERRUPT_EXIT_CODE: i32 = 130;

/// Waits for interrupts delivered by `next_signal`
///
/// # Arguments
///
/// * `next_signal` - Resolves when the next interrupt arrives
/// * `stop` - Set on the first interrupt
///
/// # Returns
///
/// True once a second interrupt arrives. False if the signal source fails
/// before that.
pub async fn watch_interrupts<F, Fut>(mut next_signal: F, stop: Arc<AtomicBool>) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = io::Result<()>>,
{
    if let Err(e) = next_signal().await {
        tracing::warn!("Cannot listen for interrupts: {}", e);
        return false;
    }
    tracing::warn!(
        "Interrupt received, finishing the current category (interrupt again to exit now)"
    );
    stop.store(true, Ordering::SeqCst);

    if next_signal().await.is_err() {
        return false;
    }
    tracing::error!("Second interrupt received, exiting without finishing the current category");
    true
}
