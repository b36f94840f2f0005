//! Bounded per-task inbox.
//!
//! Provides deterministic FIFO ordering with explicit capacity limits.

use core_types::TaskId;
use std::collections::VecDeque;

/// Queue error types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueError {
    Full,
}

/// A delivered but not yet received message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub sender: TaskId,
    pub payload: Vec<u8>,
}

/// Bounded FIFO queue of messages.
#[derive(Debug, Clone)]
pub struct MessageQueue {
    capacity: usize,
    messages: VecDeque<Message>,
}

impl MessageQueue {
    /// Creates a queue with the specified capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            messages: VecDeque::new(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn remaining_capacity(&self) -> usize {
        self.capacity.saturating_sub(self.messages.len())
    }

    /// Pushes a message onto the queue.
    pub fn push(&mut self, message: Message) -> Result<(), QueueError> {
        if self.messages.len() >= self.capacity {
            return Err(QueueError::Full);
        }
        self.messages.push_back(message);
        Ok(())
    }

    /// Pops the oldest message.
    pub fn pop(&mut self) -> Option<Message> {
        self.messages.pop_front()
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(sender: u64, payload: &[u8]) -> Message {
        Message {
            sender: TaskId::from_raw(sender),
            payload: payload.to_vec(),
        }
    }

    #[test]
    fn test_queue_ordering() {
        let mut queue = MessageQueue::with_capacity(4);
        queue.push(msg(1, b"a")).unwrap();
        queue.push(msg(2, b"b")).unwrap();
        queue.push(msg(1, b"c")).unwrap();

        assert_eq!(queue.pop().unwrap().payload, b"a");
        assert_eq!(queue.pop().unwrap().payload, b"b");
        assert_eq!(queue.pop().unwrap().payload, b"c");
        assert!(queue.pop().is_none());
    }

    #[test]
    fn test_queue_capacity() {
        let mut queue = MessageQueue::with_capacity(2);
        queue.push(msg(1, b"a")).unwrap();
        queue.push(msg(1, b"b")).unwrap();
        assert_eq!(queue.push(msg(1, b"c")), Err(QueueError::Full));
        assert_eq!(queue.len(), 2);
        assert_eq!(queue.remaining_capacity(), 0);
    }

    #[test]
    fn test_clear() {
        let mut queue = MessageQueue::with_capacity(2);
        queue.push(msg(1, b"a")).unwrap();
        queue.clear();
        assert!(queue.is_empty());
        assert_eq!(queue.capacity(), 2);
    }
}
