//! Optimistic toggle helper.
//!
//! UI callers flip local state before the network call resolves and revert
//! when the call reports failure. The flip/revert logic lives here once
//! instead of at every call site.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

/// Flip local state to `!current`, run the remote operation, and revert on
/// failure. Returns the settled state.
pub async fn optimistic_toggle<A, F>(current: bool, mut apply_local: A, remote: F) -> bool
where
    A: FnMut(bool),
    F: Future<Output = bool>,
{
    let next = !current;
    apply_local(next);

    if remote.await {
        next
    } else {
        apply_local(current);
        current
    }
}

/// Last-write-wins guard for rapid repeated toggles on the same target.
///
/// Two in-flight toggle calls can complete out of order; without a guard
/// the earlier completion clobbers the later click. Callers take a token
/// with [`begin`](Self::begin) before each toggle and only apply the
/// settled result when [`commit`](Self::commit) accepts the token.
#[derive(Default)]
pub struct ToggleSequencer {
    next: AtomicU64,
    latest: Mutex<HashMap<String, u64>>,
}

impl ToggleSequencer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a toggle on `key`; supersedes any in-flight toggle.
    pub fn begin(&self, key: &str) -> u64 {
        let token = self.next.fetch_add(1, Ordering::SeqCst) + 1;
        self.latest.lock().unwrap().insert(key.to_string(), token);
        token
    }

    /// True when `token` is still the newest toggle for `key`; stale
    /// completions must be discarded by the caller.
    pub fn commit(&self, key: &str, token: u64) -> bool {
        self.latest.lock().unwrap().get(key).copied() == Some(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_toggle_settles_forward_on_success() {
        let mut shown = false;
        let settled = optimistic_toggle(shown, |state| shown = state, async { true }).await;
        assert!(settled);
        assert!(shown);
    }

    #[tokio::test]
    async fn test_toggle_reverts_on_failure() {
        let mut shown = false;
        let settled = optimistic_toggle(shown, |state| shown = state, async { false }).await;
        assert!(!settled);
        assert!(!shown);
    }

    #[test]
    fn test_sequencer_rejects_stale_completions() {
        let sequencer = ToggleSequencer::new();
        let first = sequencer.begin("artwork:1");
        let second = sequencer.begin("artwork:1");

        assert!(!sequencer.commit("artwork:1", first));
        assert!(sequencer.commit("artwork:1", second));
    }

    #[test]
    fn test_sequencer_keys_are_independent() {
        let sequencer = ToggleSequencer::new();
        let a = sequencer.begin("artwork:1");
        let b = sequencer.begin("artwork:2");

        assert!(sequencer.commit("artwork:1", a));
        assert!(sequencer.commit("artwork:2", b));
    }
}
