//! Turns raw chat snapshots into ordered batches of never-seen messages.

use crate::message::{ChatMessage, RawChatEntry};
use std::collections::HashSet;

/// Every message id observed so far. Only ever grows.
#[derive(Debug, Clone, Default)]
pub struct SeenSet {
    ids: HashSet<String>,
}

impl SeenSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, message_id: &str) -> bool {
        self.ids.contains(message_id)
    }

    /// Returns `true` when the id was not present before.
    pub fn insert(&mut self, message_id: &str) -> bool {
        if self.ids.contains(message_id) {
            return false;
        }
        self.ids.insert(message_id.to_string())
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Computes the delta of `snapshot` against `seen` and records it as seen.
///
/// The delta is sorted by the lexical order of the timestamp token, keeping
/// snapshot order between equal timestamps. When an id occurs more than once
/// in the snapshot, its first occurrence in that order wins and the rest are
/// discarded. Malformed entries are dropped without being marked seen.
pub fn compute_delta(snapshot: Vec<RawChatEntry>, seen: &mut SeenSet) -> Vec<ChatMessage> {
    let total = snapshot.len();
    let mut fresh: Vec<ChatMessage> = snapshot
        .into_iter()
        .filter_map(ChatMessage::from_raw)
        .filter(|message| !seen.contains(message.message_id()))
        .collect();

    if fresh.len() < total {
        tracing::trace!(
            "{} of {} snapshot entries were malformed or already seen",
            total - fresh.len(),
            total
        );
    }

    // `sort_by` is stable, so equal timestamps keep their snapshot order.
    fresh.sort_by(|a, b| a.timestamp().cmp(b.timestamp()));
    fresh.retain(|message| seen.insert(message.message_id()));
    fresh
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(ts: &str, author: &str, id: &str, text: &str) -> RawChatEntry {
        RawChatEntry::new(ts, author, Some(id.to_string()), text)
    }

    fn timestamps(batch: &[ChatMessage]) -> Vec<&str> {
        batch.iter().map(|m| m.timestamp()).collect()
    }

    #[test]
    fn test_empty_snapshot_leaves_seen_untouched() {
        let mut seen = SeenSet::new();
        seen.insert("m0");

        let delta = compute_delta(Vec::new(), &mut seen);

        assert!(delta.is_empty());
        assert_eq!(seen.len(), 1);
    }

    #[test]
    fn test_delta_is_sorted_by_timestamp() {
        let mut seen = SeenSet::new();
        let snapshot = vec![
            entry("10:02", "Alice", "m1", "b"),
            entry("10:01", "Bob", "m2", "a"),
            entry("10:03", "Carol", "m3", "c"),
        ];

        let delta = compute_delta(snapshot, &mut seen);

        assert_eq!(timestamps(&delta), vec!["10:01", "10:02", "10:03"]);
    }

    #[test]
    fn test_equal_timestamps_keep_snapshot_order() {
        let mut seen = SeenSet::new();
        let snapshot = vec![
            entry("10:05", "Alice", "m9", "first"),
            entry("10:01", "Bob", "m1", "early"),
            entry("10:05", "Alice", "m3", "second"),
        ];

        let delta = compute_delta(snapshot, &mut seen);
        let ids: Vec<&str> = delta.iter().map(|m| m.message_id()).collect();

        assert_eq!(ids, vec!["m1", "m9", "m3"]);
    }

    #[test]
    fn test_second_poll_of_unchanged_snapshot_is_empty() {
        let mut seen = SeenSet::new();
        let snapshot = vec![entry("10:00", "Alice", "m1", "hi"), entry("10:01", "Bob", "m2", "yo")];

        let first = compute_delta(snapshot.clone(), &mut seen);
        let size_after_first = seen.len();
        let second = compute_delta(snapshot, &mut seen);

        assert_eq!(first.len(), 2);
        assert!(second.is_empty());
        assert_eq!(seen.len(), size_after_first);
    }

    #[test]
    fn test_first_observation_wins_across_snapshots() {
        let mut seen = SeenSet::new();

        let first = compute_delta(vec![entry("10:00", "Alice", "m1", "A")], &mut seen);
        let second = compute_delta(
            vec![entry("10:00", "Alice", "m1", "B"), entry("10:01", "Bob", "m2", "C")],
            &mut seen,
        );

        assert_eq!(first.len(), 1);
        assert_eq!(first[0].text(), "A");
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].message_id(), "m2");
    }

    #[test]
    fn test_duplicate_id_within_snapshot_keeps_earliest_timestamp() {
        let mut seen = SeenSet::new();
        let snapshot = vec![
            entry("10:04", "Alice", "m1", "late copy"),
            entry("10:02", "Bob", "m2", "between"),
            entry("10:01", "Alice", "m1", "early copy"),
        ];

        let delta = compute_delta(snapshot, &mut seen);

        assert_eq!(delta.len(), 2);
        assert_eq!(delta[0].text(), "early copy");
        assert_eq!(delta[1].message_id(), "m2");
    }

    #[test]
    fn test_malformed_entries_are_not_marked_seen() {
        let mut seen = SeenSet::new();
        let snapshot = vec![
            RawChatEntry::new("10:00", "Alice", None, "no id"),
            entry("10:01", "Bob", "m2", "   "),
            entry("10:02", "Carol", "m3", "ok"),
        ];

        let delta = compute_delta(snapshot, &mut seen);

        assert_eq!(delta.len(), 1);
        assert!(!seen.contains("m2"));
        assert!(seen.contains("m3"));

        // Once the body renders, the entry is picked up.
        let delta = compute_delta(vec![entry("10:01", "Bob", "m2", "now filled")], &mut seen);
        assert_eq!(delta.len(), 1);
        assert_eq!(delta[0].text(), "now filled");
    }

    #[test]
    fn test_ordering_is_lexical_not_chronological() {
        let mut seen = SeenSet::new();
        let snapshot = vec![entry("9:59", "Alice", "m1", "a"), entry("10:00", "Bob", "m2", "b")];

        let delta = compute_delta(snapshot, &mut seen);

        assert_eq!(timestamps(&delta), vec!["10:00", "9:59"]);
    }
}
