/*
[INPUT]:  Serialized requests produced before the session is ready
[OUTPUT]: The same frames in FIFO order at flush time
[POS]:    Session layer - outbound buffering across connection gaps
[UPDATE]: When changing what is buffered while disconnected
*/

use std::collections::VecDeque;

/// A serialized request, queued or on its way to the socket
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuedFrame {
    pub id: u64,
    pub text: String,
    /// Set for channel subscribe requests so replay can skip them
    pub channel: Option<String>,
}

#[derive(Debug, Default)]
pub struct OutboundQueue {
    frames: VecDeque<QueuedFrame>,
}

impl OutboundQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, frame: QueuedFrame) {
        self.frames.push_back(frame);
    }

    /// Put a frame back at the head, ahead of everything queued after it
    pub fn push_front(&mut self, frame: QueuedFrame) {
        self.frames.push_front(frame);
    }

    pub fn pop(&mut self) -> Option<QueuedFrame> {
        self.frames.pop_front()
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}
