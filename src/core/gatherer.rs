// fraglog - core/gatherer.rs
//
// Splits a stream of raw log lines into per-match line groups.
// Core layer: consumes any iterator of `io::Result<String>`; the app layer
// decides where the lines come from.
//
// A group closes on the line the classifier reports as a game end (that line
// belongs to the closing group). Whatever is buffered when the input runs out
// is flushed as a final, unterminated group.

use crate::core::event::{self, Event};
use crate::util::error::IngestError;
use std::io::{self, BufRead};
use std::iter::FusedIterator;

/// Raw lines believed to belong to one match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineGroup {
    /// Position of this group in the log (0-based). Used to restore log
    /// order after concurrent digestion.
    pub index: usize,

    /// Non-blank lines, trailing whitespace removed.
    pub lines: Vec<String>,

    /// 1-based source line number of each entry in `lines`.
    pub line_numbers: Vec<u64>,

    /// False for the group flushed at end of input without an end marker.
    pub terminated: bool,
}

impl LineGroup {
    /// Source line number of `lines[offset]`, 0 when out of range.
    pub fn line_number(&self, offset: usize) -> u64 {
        self.line_numbers.get(offset).copied().unwrap_or(0)
    }

    /// Source line number of the group's first line.
    pub fn first_line(&self) -> u64 {
        self.line_number(0)
    }
}

/// Lazy, single-pass iterator of `LineGroup`s.
pub struct LineGatherer<I> {
    lines: I,
    line_number: u64,
    next_index: usize,
    buffer: Vec<String>,
    numbers: Vec<u64>,
    finished: bool,
}

impl<R: BufRead> LineGatherer<io::Lines<R>> {
    /// Gather lines read from `reader`.
    pub fn from_reader(reader: R) -> Self {
        Self::new(reader.lines())
    }
}

impl<I> LineGatherer<I>
where
    I: Iterator<Item = io::Result<String>>,
{
    pub fn new(lines: I) -> Self {
        Self {
            lines,
            line_number: 0,
            next_index: 0,
            buffer: Vec::new(),
            numbers: Vec::new(),
            finished: false,
        }
    }

    fn take_group(&mut self, terminated: bool) -> LineGroup {
        let group = LineGroup {
            index: self.next_index,
            lines: std::mem::take(&mut self.buffer),
            line_numbers: std::mem::take(&mut self.numbers),
            terminated,
        };
        self.next_index += 1;
        tracing::trace!(
            group = group.index,
            first_line = group.first_line(),
            lines = group.lines.len(),
            terminated,
            "Line group gathered"
        );
        group
    }
}

impl<I> Iterator for LineGatherer<I>
where
    I: Iterator<Item = io::Result<String>>,
{
    type Item = Result<LineGroup, IngestError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        loop {
            match self.lines.next() {
                Some(Ok(raw)) => {
                    self.line_number += 1;
                    let line = raw.trim_end();
                    if line.is_empty() {
                        continue;
                    }
                    let closes = matches!(event::classify(line), Event::GameEnd(_));
                    self.buffer.push(line.to_string());
                    self.numbers.push(self.line_number);
                    if closes {
                        return Some(Ok(self.take_group(true)));
                    }
                }
                Some(Err(source)) => {
                    self.finished = true;
                    return Some(Err(IngestError::Read {
                        line_number: self.line_number,
                        source,
                    }));
                }
                None => {
                    self.finished = true;
                    if self.buffer.is_empty() {
                        return None;
                    }
                    return Some(Ok(self.take_group(false)));
                }
            }
        }
    }
}

impl<I> FusedIterator for LineGatherer<I> where I: Iterator<Item = io::Result<String>> {}

#[cfg(test)]
mod tests {
    use super::*;

    fn gather(text: &str) -> Vec<LineGroup> {
        LineGatherer::from_reader(text.as_bytes())
            .collect::<Result<Vec<_>, _>>()
            .unwrap()
    }

    #[test]
    fn test_empty_input_yields_nothing() {
        assert!(gather("").is_empty());
        assert!(gather("\n   \n\r\n").is_empty());
    }

    #[test]
    fn test_groups_close_on_end_markers() {
        let log = "  0:00 InitGame: \\a\\b\n\
                   \x20 1:00 Kill: 1022 2 22: <world> killed Zeh by MOD_FALLING\n\
                   \x20 2:00 ShutdownGame:\n\
                   \x20 2:00 ------------------------------------------------------------\n\
                   \x20 0:00 InitGame: \\a\\b\n\
                   26  0:00 ------------------------------------------------------------\n";
        let groups = gather(log);

        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].index, 0);
        assert_eq!(groups[0].lines.len(), 3);
        assert!(groups[0].lines[2].ends_with("ShutdownGame:"));
        assert!(groups[0].terminated);

        assert_eq!(groups[1].index, 1);
        assert_eq!(groups[1].first_line(), 4);
        assert_eq!(groups[1].lines.len(), 3);
        assert!(groups[1].lines[2].starts_with("26  0:00"));
        assert!(groups[1].terminated);
    }

    #[test]
    fn test_trailing_lines_are_flushed_unterminated() {
        let log = "  0:00 InitGame:\n  0:01 ShutdownGame:\n  0:02 InitGame:\n  0:03 Item: 2 weapon";
        let groups = gather(log);

        assert_eq!(groups.len(), 2);
        assert!(groups[0].terminated);
        assert!(!groups[1].terminated);
        assert_eq!(groups[1].lines, ["  0:02 InitGame:", "  0:03 Item: 2 weapon"]);
        assert_eq!(groups[1].first_line(), 3);
    }

    #[test]
    fn test_blank_lines_and_crlf_are_dropped() {
        let log = "  0:00 InitGame:\r\n\r\n\n  0:05 ShutdownGame:\r\n";
        let groups = gather(log);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].lines, ["  0:00 InitGame:", "  0:05 ShutdownGame:"]);
        assert_eq!(groups[0].line_numbers, [1, 4]);
        assert_eq!(groups[0].line_number(1), 4);
    }

    #[test]
    fn test_kill_line_resembling_sentinel_does_not_close_group() {
        let log = "  0:00 InitGame:\n  1:00 Kill: 2 3 7: Zeh killed Bot 12 0:00 by MOD_ROCKET\n";
        let groups = gather(log);
        assert_eq!(groups.len(), 1);
        assert!(!groups[0].terminated);
        assert_eq!(groups[0].lines.len(), 2);
    }

    #[test]
    fn test_read_error_is_reported_once() {
        let lines = vec![
            Ok("  0:00 InitGame:".to_string()),
            Err(io::Error::new(io::ErrorKind::InvalidData, "bad utf-8")),
            Ok("  0:05 ShutdownGame:".to_string()),
        ];
        let mut gatherer = LineGatherer::new(lines.into_iter());

        match gatherer.next() {
            Some(Err(IngestError::Read { line_number, .. })) => assert_eq!(line_number, 1),
            other => panic!("expected read error, got {other:?}"),
        }
        assert!(gatherer.next().is_none());
    }
}
