//! Ordered queue of reply segments awaiting playback.

use medsim_core::ReplySegment;
use std::collections::VecDeque;

/// FIFO of segments from one or more pipeline responses. Playback order is
/// exactly push order; the driver holds at most one segment out of the queue
/// at a time.
#[derive(Debug, Default)]
pub struct ReplyQueue {
    segments: VecDeque<ReplySegment>,
}

impl ReplyQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one pipeline response, preserving its order.
    pub fn push_turn(&mut self, segments: impl IntoIterator<Item = ReplySegment>) {
        self.segments.extend(segments);
    }

    pub fn pop_front(&mut self) -> Option<ReplySegment> {
        self.segments.pop_front()
    }

    pub fn clear(&mut self) {
        self.segments.clear();
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}
