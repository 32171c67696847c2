//! Injected environment signal sources.

use super::signal::{ConnectionHint, EnvironmentSignal};
use tokio::sync::watch;

/// Supplies environment signals to a viewer host.
///
/// Hosts take a snapshot at mount and subscribe for live changes. Platform
/// integrations implement this over media queries and connection info; tests
/// and the CLI use [`SharedEnvironment`].
pub trait EnvironmentSource: Send + Sync {
    /// Current signal values.
    fn snapshot(&self) -> EnvironmentSignal;

    /// Subscribes to signal changes.
    fn subscribe(&self) -> watch::Receiver<EnvironmentSignal>;
}

/// In-process environment source backed by a `watch` channel.
#[derive(Debug)]
pub struct SharedEnvironment {
    tx: watch::Sender<EnvironmentSignal>,
}

impl SharedEnvironment {
    pub fn new(signal: EnvironmentSignal) -> Self {
        let (tx, _) = watch::channel(signal);
        Self { tx }
    }

    /// Flips the reduced-motion preference, as a live media query change would.
    pub fn set_reduced_motion(&self, reduced_motion: bool) {
        self.tx.send_if_modified(|signal| {
            let changed = signal.reduced_motion != reduced_motion;
            signal.reduced_motion = reduced_motion;
            changed
        });
    }

    /// Updates the connection information.
    pub fn set_connection(&self, connection: ConnectionHint) {
        let save_data = connection.implies_save_data();
        self.tx.send_if_modified(|signal| {
            let changed = signal.save_data != save_data;
            signal.save_data = save_data;
            changed
        });
    }
}

impl Default for SharedEnvironment {
    fn default() -> Self {
        Self::new(EnvironmentSignal::default())
    }
}

impl EnvironmentSource for SharedEnvironment {
    fn snapshot(&self) -> EnvironmentSignal {
        *self.tx.borrow()
    }

    fn subscribe(&self) -> watch::Receiver<EnvironmentSignal> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::EffectiveConnectionType;

    #[test]
    fn test_snapshot_reflects_updates() {
        let env = SharedEnvironment::default();
        assert_eq!(env.snapshot(), EnvironmentSignal::new(false, false));

        env.set_reduced_motion(true);
        env.set_connection(ConnectionHint {
            save_data: false,
            effective_type: Some(EffectiveConnectionType::Slow2g),
        });
        assert_eq!(env.snapshot(), EnvironmentSignal::new(true, true));
    }

    #[test]
    fn test_subscribers_see_only_real_changes() {
        let env = SharedEnvironment::default();
        let mut rx = env.subscribe();

        env.set_reduced_motion(false);
        assert!(!rx.has_changed().unwrap());

        env.set_reduced_motion(true);
        assert!(rx.has_changed().unwrap());
        assert!(rx.borrow_and_update().reduced_motion);
    }
}
