//! Producer half of a ring with an ordered spill-over backlog.

use alloc::collections::VecDeque;
use ringbuf::traits::Producer;
use ringbuf::HeapProd;

/// Pushes items into an SPSC ring without ever dropping one.
///
/// When the ring is full, items wait in a control-side backlog and are
/// pushed, in order, ahead of anything newer once the consumer catches up.
pub(crate) struct Outbox<T> {
    producer: HeapProd<T>,
    backlog: VecDeque<T>,
}

impl<T> Outbox<T> {
    pub fn new(producer: HeapProd<T>) -> Self {
        Self { producer, backlog: VecDeque::new() }
    }

    /// Push `item`. Returns `false` if it had to wait in the backlog.
    pub fn push(&mut self, item: T) -> bool {
        self.flush();
        if !self.backlog.is_empty() {
            self.backlog.push_back(item);
            return false;
        }
        match self.producer.try_push(item) {
            Ok(()) => true,
            Err(item) => {
                self.backlog.push_back(item);
                false
            }
        }
    }

    /// Move as much of the backlog into the ring as fits. Returns the
    /// number of items still waiting.
    pub fn flush(&mut self) -> usize {
        while let Some(item) = self.backlog.pop_front() {
            if let Err(item) = self.producer.try_push(item) {
                self.backlog.push_front(item);
                break;
            }
        }
        self.backlog.len()
    }

    pub fn backlog_len(&self) -> usize {
        self.backlog.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec::Vec;
    use ringbuf::traits::{Consumer, Split};
    use ringbuf::HeapRb;

    #[test]
    fn spills_in_order_when_full() {
        let (producer, mut consumer) = HeapRb::<u32>::new(2).split();
        let mut outbox = Outbox::new(producer);
        assert!(outbox.push(1));
        assert!(outbox.push(2));
        assert!(!outbox.push(3));
        assert!(!outbox.push(4));
        assert_eq!(outbox.backlog_len(), 2);

        assert_eq!(consumer.try_pop(), Some(1));
        // Newer items queue behind the backlog
        assert!(!outbox.push(5));
        assert_eq!(outbox.backlog_len(), 2);

        let mut seen = Vec::new();
        loop {
            while let Some(item) = consumer.try_pop() {
                seen.push(item);
            }
            if outbox.flush() == 0 {
                break;
            }
        }
        while let Some(item) = consumer.try_pop() {
            seen.push(item);
        }
        assert_eq!(seen, [2, 3, 4, 5]);
    }
}
