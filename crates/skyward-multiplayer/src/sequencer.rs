//! Sequence numbering for outgoing local inputs.

use crate::prediction::{PendingBuffer, PendingInput};

/// Hands out strictly increasing sequence numbers starting at 1, one per
/// local fixed tick whether or not the player flapped.
#[derive(Debug)]
pub struct InputSequencer {
    next: u64,
}

impl Default for InputSequencer {
    fn default() -> Self {
        Self { next: 1 }
    }
}

impl InputSequencer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Numbers a new input and records it in `pending` before the caller
    /// transmits it.
    pub fn issue(&mut self, flap: bool, pending: &mut PendingBuffer) -> PendingInput {
        let input = PendingInput {
            seq: self.next,
            flap,
        };
        self.next += 1;
        pending.push(input);
        input
    }

    /// The most recently issued sequence number, or 0 before the first.
    pub fn last_issued(&self) -> u64 {
        self.next - 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequences_start_at_one_and_increase() {
        let mut sequencer = InputSequencer::new();
        let mut pending = PendingBuffer::new();
        assert_eq!(sequencer.last_issued(), 0);

        let seqs: Vec<u64> = (0..5)
            .map(|i| sequencer.issue(i == 2, &mut pending).seq)
            .collect();
        assert_eq!(seqs, vec![1, 2, 3, 4, 5]);
        assert_eq!(pending.len(), 5);
        assert_eq!(sequencer.last_issued(), 5);
    }

    #[test]
    fn test_issue_records_flap_flag() {
        let mut sequencer = InputSequencer::new();
        let mut pending = PendingBuffer::new();
        sequencer.issue(false, &mut pending);
        sequencer.issue(true, &mut pending);
        let flags: Vec<bool> = pending.iter().map(|p| p.flap).collect();
        assert_eq!(flags, vec![false, true]);
    }
}
