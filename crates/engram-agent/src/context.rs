//! Turn context reconstruction and history pruning.
//!
//! The event log is the only durable record of a conversation, so each turn
//! starts by reconstructing which user messages are already persisted and
//! which are still unwritten. The most recent extraction event marks the
//! boundary: in a reverse scan, user messages seen before reaching the
//! marker are unwritten, those seen after it are written. No marker means
//! nothing was ever persisted.
//!
//! After a writing turn the log is pruned back to its load-bearing events
//! so context growth stays bounded.

use std::collections::VecDeque;

use engram_types::{EventAuthor, TurnEvent};

/// Placeholder rendered when nothing has been persisted yet.
pub const NO_PREVIOUS_CONTEXT: &str = "(no previous context)";

/// The three text views a turn's pipeline stages work from.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ThoughtBuffers {
    /// Thoughts already persisted, for reference only.
    pub previous_context: String,
    /// Thoughts not yet persisted, including the current input.
    pub current_thoughts: String,
    /// Everything, chronological, for response composition.
    pub thought_buffer_context: String,
}

impl ThoughtBuffers {
    /// Reconstruct the buffers from the event log and the current raw input.
    ///
    /// If the last unwritten message is textually identical to the raw
    /// input (after trimming) it is dropped, so an input replayed into the
    /// log is not represented twice. Idempotent over an unchanged log.
    pub fn build(events: &[TurnEvent], raw_input: &str) -> Self {
        let (previous, mut current) = split_user_messages(events);

        if current
            .last()
            .is_some_and(|last| last.trim() == raw_input.trim())
        {
            current.pop();
        }

        tracing::debug!(
            written = previous.len(),
            unwritten = current.len(),
            "reconstructed thought buffers"
        );

        let previous_context = if previous.is_empty() {
            NO_PREVIOUS_CONTEXT.to_string()
        } else {
            previous.join("\n")
        };

        let mut current_list = current.clone();
        current_list.push(raw_input.to_string());
        let current_thoughts = current_list.join("\n");

        let mut full = previous;
        full.append(&mut current);
        full.push(raw_input.to_string());
        let thought_buffer_context = full.join("\n");

        Self {
            previous_context,
            current_thoughts,
            thought_buffer_context,
        }
    }
}

/// Split user messages into (written, unwritten) buckets, both
/// chronological.
///
/// Scans in reverse: user messages encountered before the most recent
/// extraction event are unwritten, the rest are written. Without an
/// extraction event every user message is unwritten.
pub fn split_user_messages(events: &[TurnEvent]) -> (Vec<String>, Vec<String>) {
    let mut written = Vec::new();
    let mut unwritten = Vec::new();
    let mut found_marker = false;

    for event in events.iter().rev() {
        if event.author == EventAuthor::Extractor {
            found_marker = true;
            continue;
        }
        if event.is_user() && !event.content.is_empty() {
            if found_marker {
                written.push(event.content.clone());
            } else {
                unwritten.push(event.content.clone());
            }
        }
    }

    written.reverse();
    unwritten.reverse();
    (written, unwritten)
}

/// Prune the log after a writing turn.
///
/// Everything before the most recent user message is kept untouched. From
/// that message onward only the load-bearing events survive: the user
/// message, the extraction marker with its payload discarded (the split
/// depends on the marker's position, not its content), optionally the last
/// retrieval output, and the final response. Returns a new sequence; the
/// owner swaps it in. No user message means no pruning. Idempotent.
pub fn prune_after_write(events: &[TurnEvent], keep_retrieval: bool) -> Vec<TurnEvent> {
    let Some(user_idx) = events.iter().rposition(TurnEvent::is_user) else {
        return events.to_vec();
    };

    let tail = &events[user_idx..];
    let mut keep: Vec<usize> = vec![0];
    if let Some(i) = tail.iter().rposition(|e| e.author == EventAuthor::Extractor) {
        keep.push(i);
    }
    if keep_retrieval {
        if let Some(i) = tail.iter().rposition(|e| e.author == EventAuthor::Retriever) {
            keep.push(i);
        }
    }
    if let Some(i) = tail
        .iter()
        .rposition(|e| e.author == EventAuthor::Assistant)
    {
        keep.push(i);
    }
    keep.sort_unstable();
    keep.dedup();

    let mut pruned: Vec<TurnEvent> = events[..user_idx].to_vec();
    for i in keep {
        let event = &tail[i];
        if event.author == EventAuthor::Extractor {
            pruned.push(TurnEvent::new(EventAuthor::Extractor, ""));
        } else {
            pruned.push(event.clone());
        }
    }

    tracing::debug!(before = events.len(), after = pruned.len(), "pruned event log");
    pruned
}

/// Bounded accumulation of retrieved findings across turns.
///
/// Appending beyond the cap drops the oldest entry.
#[derive(Debug, Clone)]
pub struct FindingsBuffer {
    items: VecDeque<String>,
    cap: usize,
}

impl FindingsBuffer {
    pub fn new(cap: usize) -> Self {
        Self {
            items: VecDeque::with_capacity(cap),
            cap,
        }
    }

    pub fn push(&mut self, findings: impl Into<String>) {
        if self.cap == 0 {
            return;
        }
        if self.items.len() == self.cap {
            self.items.pop_front();
        }
        self.items.push_back(findings.into());
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// All retained findings, oldest first.
    pub fn joined(&self) -> String {
        self.items.iter().cloned().collect::<Vec<_>>().join("\n\n")
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn marker() -> TurnEvent {
        TurnEvent::new(EventAuthor::Extractor, "{}")
    }

    #[test]
    fn test_split_around_marker() {
        let events = vec![
            TurnEvent::user("first thought"),
            TurnEvent::user("second thought"),
            marker(),
            TurnEvent::assistant("saved"),
            TurnEvent::user("third thought"),
            TurnEvent::user("fourth thought"),
        ];

        let (written, unwritten) = split_user_messages(&events);
        assert_eq!(written, vec!["first thought", "second thought"]);
        assert_eq!(unwritten, vec!["third thought", "fourth thought"]);
    }

    #[test]
    fn test_split_without_marker_is_all_unwritten() {
        let events = vec![TurnEvent::user("a"), TurnEvent::user("b")];
        let (written, unwritten) = split_user_messages(&events);
        assert!(written.is_empty());
        assert_eq!(unwritten, vec!["a", "b"]);
    }

    #[test]
    fn test_split_uses_most_recent_marker() {
        let events = vec![
            TurnEvent::user("oldest"),
            marker(),
            TurnEvent::user("middle"),
            marker(),
            TurnEvent::user("newest"),
        ];
        let (written, unwritten) = split_user_messages(&events);
        assert_eq!(written, vec!["oldest", "middle"]);
        assert_eq!(unwritten, vec!["newest"]);
    }

    #[test]
    fn test_build_drops_replayed_input() {
        let events = vec![TurnEvent::user("earlier"), TurnEvent::user("  today was hard  ")];
        let buffers = ThoughtBuffers::build(&events, "today was hard");

        // The replayed copy is dropped; the raw input appears exactly once.
        assert_eq!(buffers.current_thoughts, "earlier\ntoday was hard");
        assert_eq!(buffers.thought_buffer_context, "earlier\ntoday was hard");
    }

    #[test]
    fn test_build_placeholder_when_nothing_written() {
        let buffers = ThoughtBuffers::build(&[], "hello");
        assert_eq!(buffers.previous_context, NO_PREVIOUS_CONTEXT);
        assert_eq!(buffers.current_thoughts, "hello");
    }

    #[test]
    fn test_build_is_idempotent() {
        let events = vec![
            TurnEvent::user("a"),
            marker(),
            TurnEvent::user("b"),
        ];
        let first = ThoughtBuffers::build(&events, "c");
        let second = ThoughtBuffers::build(&events, "c");
        assert_eq!(first, second);
    }

    #[test]
    fn test_prune_keeps_everything_before_last_user_message() {
        let events = vec![
            TurnEvent::user("old"),
            TurnEvent::new(EventAuthor::Extractor, ""),
            TurnEvent::assistant("old reply"),
            TurnEvent::user("new"),
            TurnEvent::new(EventAuthor::Extractor, r#"{"entries":[]}"#),
            TurnEvent::new(EventAuthor::Retriever, "findings"),
            TurnEvent::new(EventAuthor::Author, "CREATE (n)"),
            TurnEvent::new(EventAuthor::Executor, "executed 1 statements"),
            TurnEvent::assistant("new reply"),
        ];

        let pruned = prune_after_write(&events, false);
        assert_eq!(
            pruned,
            vec![
                TurnEvent::user("old"),
                TurnEvent::new(EventAuthor::Extractor, ""),
                TurnEvent::assistant("old reply"),
                TurnEvent::user("new"),
                TurnEvent::new(EventAuthor::Extractor, ""),
                TurnEvent::assistant("new reply"),
            ]
        );
    }

    #[test]
    fn test_prune_optionally_keeps_retrieval() {
        let events = vec![
            TurnEvent::user("new"),
            TurnEvent::new(EventAuthor::Extractor, "{}"),
            TurnEvent::new(EventAuthor::Retriever, "findings"),
            TurnEvent::assistant("reply"),
        ];

        let pruned = prune_after_write(&events, true);
        assert_eq!(pruned.len(), 4);
        assert_eq!(pruned[2].author, EventAuthor::Retriever);
        assert_eq!(pruned[2].content, "findings");
    }

    #[test]
    fn test_prune_without_user_message_is_noop() {
        let events = vec![
            TurnEvent::new(EventAuthor::System, "notice"),
            TurnEvent::assistant("reply"),
        ];
        assert_eq!(prune_after_write(&events, false), events);
    }

    #[test]
    fn test_prune_is_idempotent() {
        let events = vec![
            TurnEvent::user("new"),
            TurnEvent::new(EventAuthor::Extractor, "{}"),
            TurnEvent::new(EventAuthor::Retriever, "findings"),
            TurnEvent::assistant("reply"),
        ];
        let once = prune_after_write(&events, true);
        let twice = prune_after_write(&once, true);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_findings_buffer_caps() {
        let mut buffer = FindingsBuffer::new(10);
        for i in 0..11 {
            buffer.push(format!("finding {i}"));
        }
        assert_eq!(buffer.len(), 10);
        // The oldest entry was dropped.
        assert!(buffer.joined().starts_with("finding 1"));
        assert!(buffer.joined().ends_with("finding 10"));
    }

    #[test]
    fn test_findings_buffer_clear() {
        let mut buffer = FindingsBuffer::new(3);
        buffer.push("a");
        buffer.clear();
        assert!(buffer.is_empty());
        assert_eq!(buffer.joined(), "");
    }
}
