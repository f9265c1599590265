use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Window inside which repeat navigations to the same target are dropped.
pub const DEFAULT_REDIRECT_DEBOUNCE_MS: u64 = 1000;

/// Host-supplied navigation sink. `replace` swaps the current location
/// without growing history, so Back never returns to a guarded page.
pub trait Navigator: Send + Sync {
    fn replace(&self, path: &str);
}

/// Navigator for embeddings that have no location to change.
#[derive(Debug, Default)]
pub struct NoopNavigator;

impl Navigator for NoopNavigator {
    fn replace(&self, _path: &str) {}
}

/// Drops repeat navigations to the same target inside a short window.
///
/// The session controller and every route guard share one throttle, keyed by
/// target path, so simultaneous logout cleanup and guard reactions collapse
/// into a single navigation instead of a redirect storm.
#[derive(Debug)]
pub struct NavigationThrottle {
    window: Duration,
    last_fired: Mutex<HashMap<String, Instant>>,
}

impl NavigationThrottle {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last_fired: Mutex::new(HashMap::new()),
        }
    }

    /// Record and allow the navigation unless the previous allowed one to the
    /// same target is still inside the window.
    pub fn allow(&self, target: &str) -> bool {
        let mut last_fired = self.last_fired.lock().unwrap();
        let now = Instant::now();

        if let Some(previous) = last_fired.get(target) {
            if now.duration_since(*previous) < self.window {
                return false;
            }
        }

        last_fired.insert(target.to_string(), now);
        true
    }
}
