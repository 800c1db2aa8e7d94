//! Line-slot merge engine.
//!
//! Every panel of the output owns one or more slots. A slot produces
//! [`Line`] updates; the engine recombines the latest value of every slot
//! into a [`Frame`] after each update.
//!
//! A frame has two regions:
//!
//! - the **transcript**, append-ordered text that scrolls away. A slot's
//!   first non-fixed value claims the next transcript position and keeps it
//!   for later updates. Permanent slots claim a new position for every value.
//! - the **status** region at the bottom: the fixed value of every ephemeral
//!   slot, in slot order. When a slot settles (emits a non-fixed value) its
//!   status entry disappears.
//!
//! Slots never block each other: a slot without a value contributes nothing.

use std::fmt;

/// Handle to a slot, ordered by construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotId(usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotKind {
    /// Holds one current value; a new value replaces the previous one.
    Ephemeral,
    /// Every value is appended to the transcript once and never revisited.
    Permanent,
}

/// A rendered update for a slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    pub text: String,
    /// Fixed lines live in the status region and may still change.
    pub fixed: bool,
}

impl Line {
    pub fn fixed(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            fixed: true,
        }
    }

    pub fn settled(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            fixed: false,
        }
    }
}

#[derive(Debug)]
struct Slot {
    kind: SlotKind,
    status: Option<String>,
    transcript_pos: Option<usize>,
    closed: bool,
}

#[derive(Debug)]
struct Entry {
    text: String,
    settled: bool,
}

/// A transcript block as seen by a renderer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub text: String,
    /// Settled blocks can never change again.
    pub settled: bool,
}

/// One recombination of all slots.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Frame {
    pub transcript: Vec<Block>,
    pub status: Vec<String>,
}

impl Frame {
    /// Number of leading transcript blocks that are settled.
    pub fn settled_len(&self) -> usize {
        self.transcript.iter().take_while(|b| b.settled).count()
    }

    /// Everything after the first `committed` transcript blocks: the part of
    /// the frame a terminal must keep redrawing.
    pub fn live_text(&self, committed: usize) -> String {
        self.transcript
            .iter()
            .skip(committed)
            .map(|b| b.text.as_str())
            .chain(self.status.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.live_text(0))
    }
}

#[derive(Debug, Default)]
pub struct MergeEngine {
    slots: Vec<Slot>,
    transcript: Vec<Entry>,
}

impl MergeEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open(&mut self, kind: SlotKind) -> SlotId {
        self.slots.push(Slot {
            kind,
            status: None,
            transcript_pos: None,
            closed: false,
        });
        SlotId(self.slots.len() - 1)
    }

    /// Apply an update and return the recombined frame.
    ///
    /// Updates to a closed slot are ignored and produce no frame.
    pub fn push(&mut self, id: SlotId, line: Line) -> Option<Frame> {
        let slot = self.slots.get_mut(id.0)?;
        if slot.closed {
            return None;
        }
        match slot.kind {
            SlotKind::Permanent => {
                self.transcript.push(Entry {
                    text: line.text,
                    settled: true,
                });
            }
            SlotKind::Ephemeral if line.fixed => {
                slot.status = Some(line.text);
            }
            SlotKind::Ephemeral => {
                slot.status = None;
                match slot.transcript_pos {
                    Some(pos) => self.transcript[pos].text = line.text,
                    None => {
                        slot.transcript_pos = Some(self.transcript.len());
                        self.transcript.push(Entry {
                            text: line.text,
                            settled: false,
                        });
                    }
                }
            }
        }
        Some(self.frame())
    }

    /// Mark a slot complete. Its last value is kept; its transcript entry
    /// becomes settled.
    pub fn close(&mut self, id: SlotId) {
        let Some(slot) = self.slots.get_mut(id.0) else {
            return;
        };
        slot.closed = true;
        if let Some(pos) = slot.transcript_pos {
            self.transcript[pos].settled = true;
        }
    }

    /// Close every slot.
    pub fn close_all(&mut self) {
        for i in 0..self.slots.len() {
            self.close(SlotId(i));
        }
    }

    pub fn is_closed(&self, id: SlotId) -> bool {
        self.slots.get(id.0).is_none_or(|slot| slot.closed)
    }

    /// The merged output is complete once every slot is.
    pub fn is_complete(&self) -> bool {
        self.slots.iter().all(|slot| slot.closed)
    }

    pub fn frame(&self) -> Frame {
        Frame {
            transcript: self
                .transcript
                .iter()
                .map(|entry| Block {
                    text: entry.text.clone(),
                    settled: entry.settled,
                })
                .collect(),
            status: self
                .slots
                .iter()
                .filter_map(|slot| slot.status.clone())
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_slots_do_not_block() {
        let mut engine = MergeEngine::new();
        let _cold = engine.open(SlotKind::Ephemeral);
        let status = engine.open(SlotKind::Ephemeral);
        let frame = engine.push(status, Line::fixed("Resolving")).expect("open slot");
        assert_eq!(frame.to_string(), "Resolving");
    }

    #[test]
    fn test_ephemeral_value_replaces_previous() {
        let mut engine = MergeEngine::new();
        let slot = engine.open(SlotKind::Ephemeral);
        engine.push(slot, Line::fixed("one"));
        let frame = engine.push(slot, Line::fixed("two")).expect("open slot");
        assert_eq!(frame.status, vec!["two".to_string()]);
        assert!(frame.transcript.is_empty());
    }

    #[test]
    fn test_permanent_values_accumulate() {
        let mut engine = MergeEngine::new();
        let slot = engine.open(SlotKind::Permanent);
        engine.push(slot, Line::settled("a"));
        let frame = engine.push(slot, Line::settled("b")).expect("open slot");
        assert_eq!(frame.to_string(), "a\nb");
        assert_eq!(frame.settled_len(), 2);
    }

    #[test]
    fn test_status_follows_slot_order() {
        let mut engine = MergeEngine::new();
        let first = engine.open(SlotKind::Ephemeral);
        let second = engine.open(SlotKind::Ephemeral);
        engine.push(second, Line::fixed("second"));
        let frame = engine.push(first, Line::fixed("first")).expect("open slot");
        assert_eq!(frame.to_string(), "first\nsecond");
    }

    #[test]
    fn test_settled_line_moves_above_status() {
        let mut engine = MergeEngine::new();
        let status = engine.open(SlotKind::Ephemeral);
        let download = engine.open(SlotKind::Ephemeral);
        let misc = engine.open(SlotKind::Permanent);
        engine.push(status, Line::fixed("Resolving"));
        engine.push(download, Line::fixed("Downloading 1/2"));
        engine.push(misc, Line::settled("WARN foo"));
        let frame = engine
            .push(download, Line::settled("Downloading 2/2, done"))
            .expect("open slot");
        assert_eq!(frame.to_string(), "WARN foo\nDownloading 2/2, done\nResolving");
    }

    #[test]
    fn test_settled_ephemeral_keeps_its_position() {
        let mut engine = MergeEngine::new();
        let table = engine.open(SlotKind::Ephemeral);
        let misc = engine.open(SlotKind::Permanent);
        engine.push(table, Line::settled("row 1"));
        engine.push(misc, Line::settled("info"));
        let frame = engine.push(table, Line::settled("row 1\nrow 2")).expect("open slot");
        assert_eq!(frame.to_string(), "row 1\nrow 2\ninfo");
        assert_eq!(frame.settled_len(), 0);
        assert_eq!(frame.live_text(0), "row 1\nrow 2\ninfo");
    }

    #[test]
    fn test_close_settles_and_ignores_later_updates() {
        let mut engine = MergeEngine::new();
        let table = engine.open(SlotKind::Ephemeral);
        engine.push(table, Line::settled("row"));
        engine.close(table);
        assert!(engine.push(table, Line::settled("late")).is_none());
        let frame = engine.frame();
        assert_eq!(frame.to_string(), "row");
        assert_eq!(frame.settled_len(), 1);
    }

    #[test]
    fn test_closed_fixed_slot_retains_last_value() {
        let mut engine = MergeEngine::new();
        let slot = engine.open(SlotKind::Ephemeral);
        engine.push(slot, Line::fixed("Downloading 1/2"));
        engine.close(slot);
        assert_eq!(engine.frame().status, vec!["Downloading 1/2".to_string()]);
    }

    #[test]
    fn test_complete_only_when_every_slot_closed() {
        let mut engine = MergeEngine::new();
        let a = engine.open(SlotKind::Ephemeral);
        let b = engine.open(SlotKind::Permanent);
        engine.close(a);
        assert!(!engine.is_complete());
        assert!(engine.is_closed(a));
        assert!(!engine.is_closed(b));
        engine.close_all();
        assert!(engine.is_complete());
    }

    #[test]
    fn test_live_text_skips_committed_blocks() {
        let mut engine = MergeEngine::new();
        let misc = engine.open(SlotKind::Permanent);
        let status = engine.open(SlotKind::Ephemeral);
        engine.push(misc, Line::settled("a"));
        engine.push(misc, Line::settled("b"));
        let frame = engine.push(status, Line::fixed("s")).expect("open slot");
        assert_eq!(frame.live_text(2), "s");
        assert_eq!(frame.live_text(1), "b\ns");
    }
}
