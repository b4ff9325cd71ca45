//! Per-tile request state tracking.

use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;

use crate::coord::TileCoord;

/// Where a tile request currently stands.
///
/// A tile with no recorded state has not been requested, or its last request
/// was cancelled or failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TileState {
    /// Waiting for the network.
    Fetching,
    /// Payload held in the raw cache, waiting for a decode slot.
    CachedRaw,
    /// Running on the decode pool.
    Decoding,
    /// Height grid delivered.
    Decoded,
}

impl fmt::Display for TileState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TileState::Fetching => "fetching",
            TileState::CachedRaw => "cached",
            TileState::Decoding => "decoding",
            TileState::Decoded => "decoded",
        };
        f.write_str(name)
    }
}

/// Concurrent map of tile states.
#[derive(Debug, Default)]
pub(crate) struct TileStates {
    states: DashMap<TileCoord, TileState>,
}

impl TileStates {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn get(&self, coord: TileCoord) -> Option<TileState> {
        self.states.get(&coord).map(|state| *state)
    }

    pub(crate) fn set(&self, coord: TileCoord, state: TileState) {
        self.states.insert(coord, state);
    }

    pub(crate) fn clear(&self, coord: TileCoord) {
        self.states.remove(&coord);
    }

    /// Forget settled tiles.
    ///
    /// `Decoded` entries are dropped, and `CachedRaw` entries are dropped
    /// when `is_cached` reports their payload gone. In-flight states stay.
    /// Returns the number of entries removed.
    pub(crate) fn prune(&self, is_cached: impl Fn(TileCoord) -> bool) -> usize {
        let before = self.states.len();
        self.states.retain(|coord, state| match state {
            TileState::Decoded => false,
            TileState::CachedRaw => is_cached(*coord),
            TileState::Fetching | TileState::Decoding => true,
        });
        before.saturating_sub(self.states.len())
    }

    pub(crate) fn len(&self) -> usize {
        self.states.len()
    }
}

/// Tracks one in-flight request.
///
/// Dropping the guard without calling [`finish`](Self::finish) clears the
/// tile's state, which covers both cancellation and failure.
pub(crate) struct StateGuard {
    states: Arc<TileStates>,
    coord: TileCoord,
    armed: bool,
}

impl StateGuard {
    pub(crate) fn enter(states: Arc<TileStates>, coord: TileCoord, state: TileState) -> Self {
        states.set(coord, state);
        Self {
            states,
            coord,
            armed: true,
        }
    }

    pub(crate) fn advance(&self, state: TileState) {
        self.states.set(self.coord, state);
    }

    /// Record the final state and keep it after the guard is gone.
    pub(crate) fn finish(mut self, state: TileState) {
        self.states.set(self.coord, state);
        self.armed = false;
    }
}

impl Drop for StateGuard {
    fn drop(&mut self) {
        if self.armed {
            self.states.clear(self.coord);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guard_clears_on_drop() {
        let states = Arc::new(TileStates::new());
        let coord = TileCoord::new(1, 1, 3);
        {
            let guard = StateGuard::enter(Arc::clone(&states), coord, TileState::Fetching);
            assert_eq!(states.get(coord), Some(TileState::Fetching));
            guard.advance(TileState::Decoding);
            assert_eq!(states.get(coord), Some(TileState::Decoding));
        }
        assert_eq!(states.get(coord), None);
    }

    #[test]
    fn test_finish_keeps_state() {
        let states = Arc::new(TileStates::new());
        let coord = TileCoord::new(0, 0, 2);
        StateGuard::enter(Arc::clone(&states), coord, TileState::Fetching).finish(TileState::CachedRaw);
        assert_eq!(states.get(coord), Some(TileState::CachedRaw));
        assert_eq!(states.len(), 1);
    }

    #[test]
    fn test_prune_drops_settled_states() {
        let states = TileStates::new();
        let decoded = TileCoord::new(0, 0, 1);
        let cached = TileCoord::new(1, 0, 1);
        let evicted = TileCoord::new(2, 0, 1);
        let fetching = TileCoord::new(3, 0, 1);
        states.set(decoded, TileState::Decoded);
        states.set(cached, TileState::CachedRaw);
        states.set(evicted, TileState::CachedRaw);
        states.set(fetching, TileState::Fetching);

        let removed = states.prune(|coord| coord == cached);
        assert_eq!(removed, 2);
        assert_eq!(states.get(decoded), None);
        assert_eq!(states.get(cached), Some(TileState::CachedRaw));
        assert_eq!(states.get(evicted), None);
        assert_eq!(states.get(fetching), Some(TileState::Fetching));
    }

    #[test]
    fn test_state_display() {
        assert_eq!(TileState::CachedRaw.to_string(), "cached");
        assert_eq!(TileState::Decoded.to_string(), "decoded");
    }
}
