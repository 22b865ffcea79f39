//! Cooperative cancellation for outbound HTTP calls.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::error::RelayError;

/// Cancellation flag shared between the caller and an in-flight request.
pub type CancellationSignal = Arc<AtomicBool>;

const CANCEL_POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Create an untripped signal.
pub fn new_signal() -> CancellationSignal {
    Arc::new(AtomicBool::new(false))
}

/// Trip the signal. Every future awaited through [`await_or_cancel`] with
/// this signal resolves to [`RelayError::Cancelled`] within one poll interval.
pub fn cancel(signal: &CancellationSignal) {
    signal.store(true, Ordering::Release);
}

pub fn is_cancelled(cancellation: Option<&CancellationSignal>) -> bool {
    cancellation.is_some_and(|token| token.load(Ordering::Acquire))
}

/// Drive `future` to completion unless the signal is tripped first.
pub async fn await_or_cancel<F>(
    future: F,
    cancellation: Option<&CancellationSignal>,
) -> Result<F::Output, RelayError>
where
    F: Future,
{
    if cancellation.is_none() {
        return Ok(future.await);
    }

    let mut future = Box::pin(future);

    loop {
        if is_cancelled(cancellation) {
            return Err(RelayError::Cancelled);
        }

        if let Ok(output) = tokio::time::timeout(CANCEL_POLL_INTERVAL, &mut future).await {
            if is_cancelled(cancellation) {
                return Err(RelayError::Cancelled);
            }
            return Ok(output);
        }
    }
}
