// fraglog - app/ingest.rs
//
// Ingestion pipeline: reads a log, splits it into per-match line groups, and
// digests the groups concurrently.
//
// Architecture:
//   - A reader thread runs the `LineGatherer` and pushes each `LineGroup`
//     into a bounded channel (it blocks while the channel is full).
//   - A dispatcher thread spawns one digestion task per group on a rayon
//     pool. Each task owns its group and its match records outright.
//   - The calling thread collects `(group index, records)` from a second
//     bounded channel and finally sorts by group index, so output order is
//     log order regardless of which task finished first.
//   - The first digestion or read error sets a shared abort flag; the reader
//     and dispatcher stop at their next check and the error is returned.
//     No partial results are returned.

use crate::core::digester::Digester;
use crate::core::event::EventKind;
use crate::core::gatherer::{LineGatherer, LineGroup};
use crate::core::model::{MatchRecord, Termination};
use crate::util::constants;
use crate::util::error::IngestError;
use crate::util::logging;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, SyncSender};
use std::time::Instant;

/// Tuning for the ingestion pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestConfig {
    /// Digestion worker threads. 0 means one per CPU.
    pub worker_threads: usize,
    /// Gathered groups buffered ahead of the dispatcher.
    pub group_queue_capacity: usize,
    /// Finished groups buffered ahead of the collector.
    pub result_queue_capacity: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            worker_threads: constants::DEFAULT_WORKER_THREADS,
            group_queue_capacity: constants::DEFAULT_GROUP_QUEUE_CAPACITY,
            result_queue_capacity: constants::DEFAULT_RESULT_QUEUE_CAPACITY,
        }
    }
}

/// Result of digesting one line group, tagged with its gather position.
struct GroupOutcome {
    index: usize,
    result: Result<Vec<MatchRecord>, IngestError>,
}

/// Open `path` and ingest it. See [`ingest_reader`].
pub fn ingest_file(path: &Path, config: &IngestConfig) -> Result<Vec<MatchRecord>, IngestError> {
    let file = File::open(path).map_err(|source| IngestError::FileAccess {
        path: path.to_path_buf(),
        source,
    })?;
    tracing::info!(file = %path.display(), "Ingesting log");
    ingest_reader(BufReader::new(file), config)
}

/// Ingest a whole log and return its matches in log order.
///
/// Every returned record is done. Groups that never saw a game start are
/// not matches and are dropped.
pub fn ingest_reader<R>(reader: R, config: &IngestConfig) -> Result<Vec<MatchRecord>, IngestError>
where
    R: BufRead + Send,
{
    let started = Instant::now();

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.worker_threads)
        .thread_name(|i| format!("fraglog-digest-{i}"))
        .build()
        .map_err(|e| IngestError::WorkerPool {
            reason: e.to_string(),
        })?;

    let digester = Digester::new();
    let abort = AtomicBool::new(false);

    let (mut collected, gathered) = std::thread::scope(|s| {
        let (group_tx, group_rx) = mpsc::sync_channel::<LineGroup>(config.group_queue_capacity);
        let (result_tx, result_rx) =
            mpsc::sync_channel::<GroupOutcome>(config.result_queue_capacity);

        let abort = &abort;
        let pool = &pool;

        let reader_thread = s.spawn(move || gather_groups(reader, group_tx, abort));

        s.spawn(move || {
            pool.in_place_scope(|scope| {
                for group in group_rx {
                    if abort.load(Ordering::SeqCst) {
                        break;
                    }
                    let tx = result_tx.clone();
                    scope.spawn(move |_| {
                        if abort.load(Ordering::SeqCst) {
                            return;
                        }
                        let index = group.index;
                        let result = digest_group(&digester, group);
                        // The collector hangs up after a failure; nothing to do then.
                        let _ = tx.send(GroupOutcome { index, result });
                    });
                }
            });
            // `result_tx` drops here, after every task has finished, which
            // ends the collector loop below.
        });

        let mut collected: Vec<(usize, Vec<MatchRecord>)> = Vec::new();
        for outcome in result_rx.iter() {
            match outcome.result {
                Ok(records) => collected.push((outcome.index, records)),
                Err(e) => {
                    abort.store(true, Ordering::SeqCst);
                    tracing::error!(group = outcome.index, error = %e, "Digestion failed");
                    return Err(e);
                }
            }
        }

        let gathered = match reader_thread.join() {
            Ok(result) => result?,
            Err(panic) => std::panic::resume_unwind(panic),
        };
        Ok((collected, gathered))
    })?;

    collected.sort_unstable_by_key(|(index, _)| *index);
    let matches: Vec<MatchRecord> = collected
        .into_iter()
        .flat_map(|(_, records)| records)
        .collect();

    tracing::info!(
        groups = gathered,
        matches = matches.len(),
        workers = pool.current_num_threads(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Ingestion complete"
    );

    Ok(matches)
}

/// Reader side of the pipeline. Returns the number of groups handed off.
fn gather_groups<R: BufRead>(
    reader: R,
    tx: SyncSender<LineGroup>,
    abort: &AtomicBool,
) -> Result<usize, IngestError> {
    let mut gathered = 0;
    for group in LineGatherer::from_reader(reader) {
        if abort.load(Ordering::SeqCst) {
            tracing::debug!(gathered, "Gathering stopped after abort");
            break;
        }
        let group = match group {
            Ok(g) => g,
            Err(e) => {
                abort.store(true, Ordering::SeqCst);
                tracing::error!(error = %e, "Reading log failed");
                return Err(e);
            }
        };
        if tx.send(group).is_err() {
            // Dispatcher is gone; it only stops early on abort.
            break;
        }
        gathered += 1;
    }
    Ok(gathered)
}

// =============================================================================
// Per-group digestion
// =============================================================================

/// A match being built, and whether it has seen its game start.
#[derive(Default)]
struct PendingMatch {
    record: MatchRecord,
    started: bool,
}

impl PendingMatch {
    /// Move the record into `out` if it is a real match, leaving a fresh one.
    fn close_into(&mut self, out: &mut Vec<MatchRecord>, group: usize) {
        let PendingMatch { record, started } = std::mem::take(self);
        if started {
            tracing::debug!(
                group,
                termination = ?record.termination(),
                players = record.players().len(),
                total_kills = record.total_kills(),
                "Match digested"
            );
            out.push(record);
        } else if record.has_activity() {
            tracing::warn!(
                group,
                players = record.players().len(),
                total_kills = record.total_kills(),
                "Events outside any match were discarded"
            );
        }
    }
}

/// Digest one line group into the matches it contains.
///
/// Normally one match; a second game start inside the group closes the
/// running match and opens another. A match still open when the group runs
/// out is closed with `Termination::EndOfInput`.
pub fn digest_group(
    digester: &Digester,
    group: LineGroup,
) -> Result<Vec<MatchRecord>, IngestError> {
    let mut matches = Vec::with_capacity(1);
    let mut pending = PendingMatch::default();

    for (offset, line) in group.lines.iter().enumerate() {
        let digest = |record: &mut MatchRecord| {
            digester
                .digest_line(line, record)
                .map_err(|source| IngestError::Digest {
                    group: group.index,
                    line_number: group.line_number(offset),
                    source,
                })
        };

        if digest(&mut pending.record)? == Some(EventKind::GameStart) {
            pending.started = true;
        }

        if pending.record.is_done() {
            let restarted = pending.record.termination() == Some(Termination::Restart);
            pending.close_into(&mut matches, group.index);
            if restarted {
                tracing::debug!(
                    group = group.index,
                    line = group.line_number(offset),
                    preview = logging::preview(line),
                    "Game restarted without shutdown"
                );
                digest(&mut pending.record)?;
                pending.started = true;
            }
        }
    }

    if !pending.record.is_done() {
        pending.record.end(Termination::EndOfInput);
    }
    pending.close_into(&mut matches, group.index);

    Ok(matches)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model::MatchState;

    const INIT: &str = r"  0:00 InitGame: \sv_hostname\Code Miner Server\mapname\q3dm17";
    const SHUTDOWN: &str = " 20:37 ShutdownGame:";

    fn userinfo(id: u32, name: &str) -> String {
        format!(r" 20:34 ClientUserinfoChanged: {id} n\{name}\t\0\model\xian/default")
    }

    fn kill(killer: &str, victim: &str, cause: &str) -> String {
        format!(" 20:54 Kill: 2 3 7: {killer} killed {victim} by {cause}")
    }

    fn group(index: usize, lines: &[&str]) -> LineGroup {
        LineGroup {
            index,
            lines: lines.iter().map(|l| l.to_string()).collect(),
            line_numbers: (1..=lines.len() as u64).collect(),
            terminated: true,
        }
    }

    fn ingest(log: &str, workers: usize) -> Vec<MatchRecord> {
        let config = IngestConfig {
            worker_threads: workers,
            group_queue_capacity: 2,
            result_queue_capacity: 1,
        };
        ingest_reader(log.as_bytes(), &config).unwrap()
    }

    #[test]
    fn test_digest_group_single_match() {
        let p1 = userinfo(2, "Zeh");
        let k1 = kill("<world>", "Zeh", "MOD_FALLING");
        let records =
            digest_group(&Digester::new(), group(0, &[INIT, &p1, &k1, SHUTDOWN])).unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].state(), MatchState::Done(Termination::Shutdown));
        assert_eq!(records[0].kill_count("Zeh"), Some(-1));
    }

    #[test]
    fn test_unterminated_match_is_flushed() {
        let p1 = userinfo(2, "Isgalamido");
        let records = digest_group(&Digester::new(), group(0, &[INIT, &p1])).unwrap();

        assert_eq!(records.len(), 1);
        assert!(records[0].is_done());
        assert!(!records[0].in_progress());
        assert_eq!(records[0].termination(), Some(Termination::EndOfInput));
        assert_eq!(records[0].players(), ["Isgalamido"]);
    }

    #[test]
    fn test_restart_inside_group_yields_two_matches() {
        let p1 = userinfo(2, "Zeh");
        let p2 = userinfo(3, "Mal");
        let records =
            digest_group(&Digester::new(), group(0, &[INIT, &p1, INIT, &p2, SHUTDOWN])).unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].termination(), Some(Termination::Restart));
        assert_eq!(records[0].players(), ["Zeh"]);
        assert_eq!(records[1].termination(), Some(Termination::Shutdown));
        assert_eq!(records[1].players(), ["Mal"]);
    }

    #[test]
    fn test_group_without_start_is_not_a_match() {
        let stray = kill("Zeh", "Mal", "MOD_ROCKET");
        let records = digest_group(
            &Digester::new(),
            group(0, &["  0:00 ------------------", &stray, SHUTDOWN]),
        )
        .unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn test_empty_match_is_kept() {
        let records = digest_group(&Digester::new(), group(0, &[INIT, SHUTDOWN])).unwrap();
        assert_eq!(records.len(), 1);
        assert!(records[0].players().is_empty());
        assert_eq!(records[0].total_kills(), 0);
    }

    #[test]
    fn test_output_follows_log_order() {
        // Group i has i + 1 kills, so each record identifies its group.
        let mut log = String::new();
        for i in 0..40 {
            log.push_str(INIT);
            log.push('\n');
            log.push_str(&userinfo(2, &format!("player{i}")));
            log.push('\n');
            for _ in 0..=i {
                log.push_str(&kill("<world>", &format!("player{i}"), "MOD_LAVA"));
                log.push('\n');
            }
            log.push_str(SHUTDOWN);
            log.push('\n');
        }

        for workers in [1, 4] {
            let records = ingest(&log, workers);
            assert_eq!(records.len(), 40);
            for (i, record) in records.iter().enumerate() {
                assert_eq!(record.total_kills(), i as u64 + 1, "workers={workers}");
                assert_eq!(record.players(), [format!("player{i}")]);
            }
        }
    }

    #[test]
    fn test_empty_log_yields_no_matches() {
        assert!(ingest("", 2).is_empty());
    }

    #[test]
    fn test_missing_file_is_file_access_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope.log");
        let err = ingest_file(&path, &IngestConfig::default()).unwrap_err();
        assert!(
            matches!(err, IngestError::FileAccess { .. }),
            "expected FileAccess, got {err:?}"
        );
    }

    #[test]
    fn test_invalid_utf8_aborts_ingestion() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(INIT.as_bytes());
        bytes.extend_from_slice(b"\n");
        bytes.extend_from_slice(SHUTDOWN.as_bytes());
        bytes.extend_from_slice(b"\n\xff\xfe broken\n");

        let err = ingest_reader(&bytes[..], &IngestConfig::default()).unwrap_err();
        assert!(
            matches!(err, IngestError::Read { line_number: 2, .. }),
            "expected Read error, got {err:?}"
        );
    }
}
