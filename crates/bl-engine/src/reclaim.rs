//! Hands render-side garbage back to the control context.
//!
//! Nothing owned by the render context is dropped there. Retired objects
//! travel through a ring and are dropped by [`Reclaimed::drain`] during
//! engine updates.

use alloc::boxed::Box;
use alloc::sync::Arc;
use core::mem;
use core::sync::atomic::{AtomicUsize, Ordering};
use ringbuf::traits::{Consumer, Producer, Split};
use ringbuf::{HeapCons, HeapProd, HeapRb};

use bl_core::SampleData;

use crate::processor::InstrumentProcessor;

/// An object the render context no longer needs.
pub enum Retired {
    /// Render half of a destroyed instrument
    Processor(Box<InstrumentProcessor>),
    /// Sample data replaced by a newer set
    SampleData(SampleData),
}

pub(crate) fn reclaim_channel(capacity: usize) -> (Reclaimer, Reclaimed) {
    let (producer, consumer) = HeapRb::<Retired>::new(capacity).split();
    let leaked = Arc::new(AtomicUsize::new(0));
    (
        Reclaimer { producer, leaked: leaked.clone() },
        Reclaimed { consumer, leaked, reported: 0 },
    )
}

/// Render-side end: accepts retired objects.
pub struct Reclaimer {
    producer: HeapProd<Retired>,
    leaked: Arc<AtomicUsize>,
}

impl Reclaimer {
    /// Hand `item` back to the control context.
    ///
    /// If the ring is full the item is leaked rather than freed here.
    pub fn retire(&mut self, item: Retired) {
        if let Err(item) = self.producer.try_push(item) {
            mem::forget(item);
            self.leaked.fetch_add(1, Ordering::Relaxed);
        }
    }
}

/// Control-side end: drops retired objects.
pub(crate) struct Reclaimed {
    consumer: HeapCons<Retired>,
    leaked: Arc<AtomicUsize>,
    reported: usize,
}

impl Reclaimed {
    /// Drop everything retired so far. Returns the number of objects freed.
    pub fn drain(&mut self) -> usize {
        let mut freed = 0;
        while let Some(item) = self.consumer.try_pop() {
            drop(item);
            freed += 1;
        }
        freed
    }

    /// Objects leaked since the last call because the ring was full.
    pub fn take_leaked(&mut self) -> usize {
        let total = self.leaked.load(Ordering::Relaxed);
        let new = total - self.reported;
        self.reported = total;
        new
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;
    use bl_core::Slice;

    fn data() -> SampleData {
        SampleData::new(vec![Slice::new(0.0, 48000, vec![0.0; 4])])
    }

    #[test]
    fn drain_frees_retired_objects() {
        let (mut reclaimer, mut reclaimed) = reclaim_channel(4);
        reclaimer.retire(Retired::SampleData(data()));
        reclaimer.retire(Retired::SampleData(data()));
        assert_eq!(reclaimed.drain(), 2);
        assert_eq!(reclaimed.drain(), 0);
    }

    #[test]
    fn overflow_is_counted_once() {
        let (mut reclaimer, mut reclaimed) = reclaim_channel(1);
        reclaimer.retire(Retired::SampleData(data()));
        reclaimer.retire(Retired::SampleData(data()));
        assert_eq!(reclaimed.take_leaked(), 1);
        assert_eq!(reclaimed.take_leaked(), 0);
        assert_eq!(reclaimed.drain(), 1);
    }
}
