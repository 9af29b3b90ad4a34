// fraglog - core/digester.rs
//
// The digester chain: a fixed, ordered list of classifier + mutator links.
// Each line is offered to the links in order; the first link whose classifier
// matches applies its mutation and the rest are skipped.
//
// The chain is a static table, so a `Digester` is a zero-cost handle that can
// be shared by every worker thread.

use crate::core::event::{self, Classify, Event, EventKind};
use crate::core::model::MatchRecord;
use crate::util::error::DigestError;

/// Applies a classified event to a match record.
pub type Mutate = fn(Event<'_>, &mut MatchRecord) -> Result<(), DigestError>;

/// One step of the chain.
#[derive(Clone, Copy)]
pub struct Link {
    pub kind: EventKind,
    classify: Classify,
    apply: Mutate,
}

const CHAIN: [Link; 4] = [
    Link {
        kind: EventKind::GameStart,
        classify: event::classify_game_start,
        apply: apply_game_start,
    },
    Link {
        kind: EventKind::IdentityChange,
        classify: event::classify_identity_change,
        apply: apply_identity_change,
    },
    Link {
        kind: EventKind::Kill,
        classify: event::classify_kill,
        apply: apply_kill,
    },
    Link {
        kind: EventKind::GameEnd,
        classify: event::classify_game_end,
        apply: apply_game_end,
    },
];

/// Runs raw log lines through the chain.
#[derive(Clone, Copy)]
pub struct Digester {
    chain: &'static [Link],
}

impl Digester {
    pub fn new() -> Self {
        Self { chain: &CHAIN }
    }

    /// Event kinds in the order the chain evaluates them.
    pub fn kinds(&self) -> impl Iterator<Item = EventKind> + '_ {
        self.chain.iter().map(|link| link.kind)
    }

    /// Digest one line into `record`.
    ///
    /// Returns the kind of the link that handled the line, or `None` when no
    /// link recognised it (the line is dropped; that is not an error).
    pub fn digest_line(
        &self,
        line: &str,
        record: &mut MatchRecord,
    ) -> Result<Option<EventKind>, DigestError> {
        for link in self.chain {
            if let Some(event) = (link.classify)(line) {
                (link.apply)(event, record)?;
                tracing::trace!(kind = %link.kind, state = ?record.state(), "Line digested");
                return Ok(Some(link.kind));
            }
        }
        Ok(None)
    }
}

impl Default for Digester {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Digester {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.kinds()).finish()
    }
}

// =============================================================================
// Mutators
// =============================================================================

/// Done records only accept further end markers.
fn ensure_open(record: &MatchRecord, event: EventKind) -> Result<(), DigestError> {
    if record.is_done() {
        return Err(DigestError::MatchClosed { event });
    }
    Ok(())
}

fn apply_game_start(_event: Event<'_>, record: &mut MatchRecord) -> Result<(), DigestError> {
    ensure_open(record, EventKind::GameStart)?;
    record.start();
    Ok(())
}

fn apply_identity_change(event: Event<'_>, record: &mut MatchRecord) -> Result<(), DigestError> {
    let Event::IdentityChange { player } = event else {
        return Ok(());
    };
    ensure_open(record, EventKind::IdentityChange)?;
    if record.register_player(player) {
        tracing::trace!(player, "Player joined");
    }
    Ok(())
}

fn apply_kill(event: Event<'_>, record: &mut MatchRecord) -> Result<(), DigestError> {
    let Event::Kill {
        killer,
        victim,
        cause,
    } = event
    else {
        return Ok(());
    };
    ensure_open(record, EventKind::Kill)?;
    record.record_kill(killer, victim, cause);
    Ok(())
}

fn apply_game_end(event: Event<'_>, record: &mut MatchRecord) -> Result<(), DigestError> {
    if let Event::GameEnd(marker) = event {
        record.end(marker.into());
    }
    Ok(())
}
