//! Staleness tracking for overlapping fetches
//!
//! The transport gives no ordering between requests, so a response is only
//! applied if no newer request for the same key was started in the meantime.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Mutex, PoisonError};

/// Issued when a request starts; checked when it completes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestToken<K> {
    key: K,
    generation: u64,
}

impl<K> RequestToken<K> {
    pub fn key(&self) -> &K {
        &self.key
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

#[derive(Debug, Clone, Copy)]
struct Latest {
    generation: u64,
    in_flight: bool,
}

#[derive(Debug)]
struct Inner<K> {
    next: u64,
    latest: HashMap<K, Latest>,
    focus: Option<K>,
}

impl<K: Eq + Hash> Inner<K> {
    fn is_latest(&self, token: &RequestToken<K>) -> bool {
        self.latest
            .get(&token.key)
            .map_or(false, |l| l.generation == token.generation)
    }

    fn is_focus(&self, key: &K) -> bool {
        self.focus.as_ref() == Some(key)
    }
}

/// Generation counter per key, plus the key the view currently shows.
///
/// Only keys with a request in flight and the focused key are remembered.
#[derive(Debug)]
pub struct RequestTracker<K> {
    inner: Mutex<Inner<K>>,
}

impl<K: Eq + Hash + Clone> Default for RequestTracker<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Eq + Hash + Clone> RequestTracker<K> {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                next: 0,
                latest: HashMap::new(),
                focus: None,
            }),
        }
    }

    /// Start a request for `key`, superseding earlier ones for it and moving
    /// the focus to it.
    pub fn begin(&self, key: K) -> RequestToken<K> {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        inner.next += 1;
        let generation = inner.next;
        inner.latest.insert(
            key.clone(),
            Latest {
                generation,
                in_flight: true,
            },
        );
        if let Some(previous) = inner.focus.replace(key.clone()) {
            let settled = previous != key
                && inner.latest.get(&previous).map_or(false, |l| !l.in_flight);
            if settled {
                inner.latest.remove(&previous);
            }
        }
        RequestToken { key, generation }
    }

    /// No newer request for the same key has started.
    pub fn is_current(&self, token: &RequestToken<K>) -> bool {
        let inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        inner.is_latest(token)
    }

    /// Current, and its key is still the one in focus.
    pub fn is_focused(&self, token: &RequestToken<K>) -> bool {
        let inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        inner.is_latest(token) && inner.is_focus(&token.key)
    }

    /// Mark `token`'s request as resolved. Its key is dropped unless it is in
    /// focus or a newer request for it is still outstanding.
    pub fn finish(&self, token: &RequestToken<K>) {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        if !inner.is_latest(token) {
            return;
        }
        if inner.is_focus(&token.key) {
            if let Some(latest) = inner.latest.get_mut(&token.key) {
                latest.in_flight = false;
            }
        } else {
            inner.latest.remove(&token.key);
        }
    }

    /// Drop any record for `key`; outstanding tokens for it become stale.
    pub fn forget(&self, key: &K) {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        inner.latest.remove(key);
        if inner.is_focus(key) {
            inner.focus = None;
        }
    }

    /// Number of keys currently remembered
    pub fn tracked_keys(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .latest
            .len()
    }
}

/// Outcome of a tracked fetch
#[derive(Debug, Clone, PartialEq)]
pub enum Resolved<T> {
    /// The latest request for the key; its result has been applied
    Current(T),
    /// Superseded while in flight; nothing was applied
    Superseded,
}

impl<T> Resolved<T> {
    pub fn current(self) -> Option<T> {
        match self {
            Resolved::Current(value) => Some(value),
            Resolved::Superseded => None,
        }
    }

    pub fn is_superseded(&self) -> bool {
        matches!(self, Resolved::Superseded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn newer_request_supersedes_older_for_same_key() {
        let tracker = RequestTracker::new();
        let first = tracker.begin("apt-1");
        let second = tracker.begin("apt-1");
        assert!(!tracker.is_current(&first));
        assert!(tracker.is_current(&second));
    }

    #[test]
    fn switching_key_moves_focus() {
        let tracker = RequestTracker::new();
        let monday = tracker.begin((1, "2024-06-03"));
        let tuesday = tracker.begin((1, "2024-06-04"));
        // still the newest request for its own key, but no longer shown
        assert!(tracker.is_current(&monday));
        assert!(!tracker.is_focused(&monday));
        assert!(tracker.is_focused(&tuesday));
    }

    #[test]
    fn forget_invalidates_outstanding_tokens() {
        let tracker = RequestTracker::new();
        let token = tracker.begin(9);
        tracker.forget(&9);
        assert!(!tracker.is_current(&token));
        assert!(!tracker.is_focused(&token));
    }

    #[test]
    fn resolved_accessors() {
        assert_eq!(Resolved::Current(3).current(), Some(3));
        assert!(Resolved::<u8>::Superseded.is_superseded());
    }

    #[test]
    fn settled_keys_are_pruned() {
        let tracker = RequestTracker::new();
        for id in 0..100 {
            let token = tracker.begin(id);
            assert!(tracker.is_current(&token));
            tracker.finish(&token);
        }
        // only the focused key survives
        assert_eq!(tracker.tracked_keys(), 1);
    }

    #[test]
    fn in_flight_keys_survive_a_focus_change() {
        let tracker = RequestTracker::new();
        let slow = tracker.begin("monday");
        let fast = tracker.begin("tuesday");
        tracker.finish(&fast);
        assert_eq!(tracker.tracked_keys(), 2);

        assert!(tracker.is_current(&slow));
        assert!(!tracker.is_focused(&slow));
        tracker.finish(&slow);
        assert_eq!(tracker.tracked_keys(), 1);
        assert!(tracker.is_focused(&fast));
    }
}
