//! Status transition listeners.

use std::panic::{catch_unwind, AssertUnwindSafe};
use tracing::{error, info};

use super::check::Status;
use super::panic_message;

/// Notified when the aggregate status changes between two evaluations.
///
/// Called synchronously on the task that produced the new state, so
/// implementations should return quickly.
pub trait StatusListener: Send + Sync {
    /// `previous` is `None` for the very first evaluation.
    fn on_transition(&self, previous: Option<Status>, current: Status);
}

impl<F> StatusListener for F
where
    F: Fn(Option<Status>, Status) + Send + Sync,
{
    fn on_transition(&self, previous: Option<Status>, current: Status) {
        self(previous, current)
    }
}

/// Listener that logs every transition.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingListener;

impl StatusListener for LoggingListener {
    fn on_transition(&self, previous: Option<Status>, current: Status) {
        match previous {
            Some(previous) => info!(%previous, %current, "health status changed to {}", current),
            None => info!(%current, "health status changed to {}", current),
        }
    }
}

/// Invoke `listener` if `current` differs from `previous`.
///
/// A panicking listener is logged and swallowed. Returns whether the listener
/// was called.
pub(crate) fn notify_transition(
    listener: &dyn StatusListener,
    previous: Option<Status>,
    current: Status,
) -> bool {
    if previous == Some(current) {
        return false;
    }

    let result = catch_unwind(AssertUnwindSafe(|| listener.on_transition(previous, current)));
    if let Err(panic) = result {
        error!(
            ?previous,
            %current,
            panic = %panic_message(&*panic),
            "Status listener panicked"
        );
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[test]
    fn test_same_status_is_not_a_transition() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let recorder = {
            let calls = calls.clone();
            move |prev: Option<Status>, cur: Status| calls.lock().push((prev, cur))
        };

        assert!(notify_transition(&recorder, None, Status::Healthy));
        assert!(!notify_transition(&recorder, Some(Status::Healthy), Status::Healthy));
        assert!(notify_transition(&recorder, Some(Status::Healthy), Status::Unhealthy));

        assert_eq!(
            *calls.lock(),
            vec![
                (None, Status::Healthy),
                (Some(Status::Healthy), Status::Unhealthy)
            ]
        );
    }

    #[test]
    fn test_panicking_listener_is_contained() {
        let listener = |_: Option<Status>, _: Status| panic!("listener exploded");
        assert!(notify_transition(&listener, None, Status::Unhealthy));
    }

    #[test]
    fn test_logging_listener_does_not_panic() {
        LoggingListener.on_transition(None, Status::Healthy);
        LoggingListener.on_transition(Some(Status::Healthy), Status::Unhealthy);
    }
}
