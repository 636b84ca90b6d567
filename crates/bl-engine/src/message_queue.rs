//! Single-producer single-consumer queue of timed instrument messages.

use bl_core::{Message, TimedMessage};
use ringbuf::traits::{Consumer, Observer, Split};
use ringbuf::{HeapCons, HeapRb};

use crate::outbox::Outbox;

/// Create a connected sender and receiver whose ring holds `capacity`
/// messages.
pub fn message_queue(capacity: usize) -> (MessageSender, MessageReceiver) {
    let (producer, consumer) = HeapRb::<TimedMessage>::new(capacity).split();
    (
        MessageSender { outbox: Outbox::new(producer), last_sample: i64::MIN },
        MessageReceiver { consumer, pending: None },
    )
}

/// Control-side end of a message queue.
///
/// Messages must be sent in non-decreasing sample order. A full ring never
/// loses a message; see [`MessageSender::backlog_len`].
pub struct MessageSender {
    outbox: Outbox<TimedMessage>,
    last_sample: i64,
}

impl MessageSender {
    /// Enqueue `message` at `sample`. Returns `false` if the ring was full
    /// and the message is waiting in the backlog.
    pub fn send(&mut self, sample: i64, message: Message) -> bool {
        debug_assert!(sample >= self.last_sample, "messages must be sent in sample order");
        self.last_sample = sample;
        self.outbox.push(TimedMessage::new(sample, message))
    }

    /// Retry backlogged messages. Returns how many are still waiting.
    pub fn flush(&mut self) -> usize {
        self.outbox.flush()
    }

    /// Messages waiting for room in the ring.
    pub fn backlog_len(&self) -> usize {
        self.outbox.backlog_len()
    }
}

/// Render-side end of a message queue.
pub struct MessageReceiver {
    consumer: HeapCons<TimedMessage>,
    pending: Option<TimedMessage>,
}

impl MessageReceiver {
    /// Pop the next message stamped strictly before `end_sample`.
    ///
    /// A message at or after `end_sample` stays queued for a later block.
    pub fn next_before(&mut self, end_sample: i64) -> Option<TimedMessage> {
        if self.pending.is_none() {
            self.pending = self.consumer.try_pop();
        }
        match &self.pending {
            Some(message) if message.sample < end_sample => self.pending.take(),
            _ => None,
        }
    }

    /// Whether no message is waiting.
    pub fn is_empty(&self) -> bool {
        self.pending.is_none() && self.consumer.is_empty()
    }
}
