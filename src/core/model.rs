// fraglog - core/model.rs
//
// Core data model types. Pure data definitions with no I/O.
//
// `MatchRecord` is the aggregate one digestion task builds for one match.
// Its fields are private so the membership and counting invariants can only
// be changed through the mutation methods below.

use crate::core::event::{EndMarker, WORLD};
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};

// =============================================================================
// Match lifecycle
// =============================================================================

/// Why a match stopped accepting events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// Explicit `ShutdownGame:` line.
    Shutdown,
    /// Truncated `0:00` sentinel line.
    Sentinel,
    /// A second `InitGame:` arrived while the match was still running.
    Restart,
    /// The line group ran out before any end marker was seen.
    EndOfInput,
}

impl From<EndMarker> for Termination {
    fn from(marker: EndMarker) -> Self {
        match marker {
            EndMarker::Shutdown => Termination::Shutdown,
            EndMarker::Sentinel => Termination::Sentinel,
        }
    }
}

/// Lifecycle of a match record.
///
/// NotStarted -> InProgress -> Done. A record can also go straight from
/// NotStarted to Done when an end marker arrives before any start; it is
/// discarded by the coordinator in that case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatchState {
    #[default]
    NotStarted,
    InProgress,
    Done(Termination),
}

// =============================================================================
// Match record
// =============================================================================

/// Aggregated statistics for a single match.
///
/// Serialises to the report shape: `total_kills`, `players`, `kills`,
/// `kills_by_means`. Map keys are emitted in sorted order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MatchRecord {
    total_kills: u64,

    /// Unique player names in first-seen order.
    players: Vec<String>,

    /// Personal score per player. World kills subtract, so this can go negative.
    kills: BTreeMap<String, i64>,

    /// Number of deaths per cause, including suicides and world kills.
    kills_by_means: BTreeMap<String, u64>,

    #[serde(skip)]
    player_seen: HashSet<String>,

    #[serde(skip)]
    state: MatchState,
}

impl MatchRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn total_kills(&self) -> u64 {
        self.total_kills
    }

    pub fn players(&self) -> &[String] {
        &self.players
    }

    pub fn kills(&self) -> &BTreeMap<String, i64> {
        &self.kills
    }

    /// Personal score for `player`, `None` if the name never appeared.
    pub fn kill_count(&self, player: &str) -> Option<i64> {
        self.kills.get(player).copied()
    }

    pub fn kills_by_means(&self) -> &BTreeMap<String, u64> {
        &self.kills_by_means
    }

    pub fn has_player(&self, player: &str) -> bool {
        self.player_seen.contains(player)
    }

    pub fn state(&self) -> MatchState {
        self.state
    }

    pub fn in_progress(&self) -> bool {
        self.state == MatchState::InProgress
    }

    pub fn is_done(&self) -> bool {
        matches!(self.state, MatchState::Done(_))
    }

    /// How the match ended, `None` while it is still open.
    pub fn termination(&self) -> Option<Termination> {
        match self.state {
            MatchState::Done(t) => Some(t),
            _ => None,
        }
    }

    /// True if any player joined or any kill was recorded.
    pub fn has_activity(&self) -> bool {
        !self.players.is_empty() || self.total_kills > 0
    }

    // -------------------------------------------------------------------------
    // Mutations
    // -------------------------------------------------------------------------

    /// Apply a game start.
    ///
    /// A second start while the match is running means the server began a new
    /// session without closing this one; the record is closed with
    /// `Termination::Restart`. Starting a done record is a no-op.
    pub fn start(&mut self) {
        self.state = match self.state {
            MatchState::NotStarted => MatchState::InProgress,
            MatchState::InProgress => MatchState::Done(Termination::Restart),
            done @ MatchState::Done(_) => done,
        };
    }

    /// Register a player seen in an identity change. Returns true if the name
    /// was new. Repeats never reset the player's score.
    pub fn register_player(&mut self, player: &str) -> bool {
        if !self.player_seen.insert(player.to_string()) {
            return false;
        }
        self.players.push(player.to_string());
        self.kills.entry(player.to_string()).or_insert(0);
        true
    }

    /// Record one kill.
    ///
    /// Every kill counts toward `total_kills` and its cause. Suicides leave
    /// personal scores alone; world kills cost the victim a point with no
    /// lower bound; anything else gives the killer a point.
    pub fn record_kill(&mut self, killer: &str, victim: &str, cause: &str) {
        *self.kills_by_means.entry(cause.to_string()).or_insert(0) += 1;
        self.total_kills += 1;

        if killer == victim {
            return;
        }

        if killer == WORLD {
            *self.kills.entry(victim.to_string()).or_insert(0) -= 1;
        } else {
            *self.kills.entry(killer.to_string()).or_insert(0) += 1;
        }
    }

    /// Close the match. Idempotent: the first termination reason is kept.
    pub fn end(&mut self, termination: Termination) {
        if !self.is_done() {
            self.state = MatchState::Done(termination);
        }
    }
}
