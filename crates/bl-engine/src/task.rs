//! Scheduled tasks and their ordering keys.

use alloc::boxed::Box;
use core::cmp::Ordering;
use core::fmt;

use slotmap::new_key_type;

use crate::instruments::Instruments;

new_key_type! {
    /// Handle to a task owned by a performer.
    pub struct TaskId;
}

/// Lifecycle notification delivered to a task callback.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TaskEvent {
    /// The performer position entered the task interval.
    Begin,
    /// The performer position moved while inside the task interval.
    Update { position: f64 },
    /// The performer position left the task interval, or the task was
    /// interrupted (stop, loop wrap, removal).
    End,
}

/// Callback run on the control thread during engine updates.
pub type TaskCallback = Box<dyn FnMut(TaskEvent, &mut Instruments) + Send>;

/// A callback bound to the half-open beat interval
/// `[position, position + duration)`.
pub struct Task {
    pub(crate) position: f64,
    pub(crate) duration: f64,
    pub(crate) priority: i32,
    pub(crate) is_active: bool,
    order: u64,
    callback: TaskCallback,
}

impl Task {
    pub(crate) fn new(position: f64, duration: f64, priority: i32, order: u64, callback: TaskCallback) -> Self {
        debug_assert!(duration > 0.0);
        Self { position, duration, priority, is_active: false, order, callback }
    }

    pub fn position(&self) -> f64 {
        self.position
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn priority(&self) -> i32 {
        self.priority
    }

    pub fn is_active(&self) -> bool {
        self.is_active
    }

    pub fn end_position(&self) -> f64 {
        self.position + self.duration
    }

    /// Whether `position` lies in `[position, end_position)`.
    pub fn is_inside(&self, position: f64) -> bool {
        self.position <= position && position < self.end_position()
    }

    /// Key in the set of tasks waiting to begin.
    pub(crate) fn inactive_key(&self) -> TaskKey {
        TaskKey::new(self.position, self.priority, self.order)
    }

    /// Key in the set of running tasks.
    pub(crate) fn active_key(&self) -> TaskKey {
        TaskKey::new(self.end_position(), self.priority, self.order)
    }

    pub(crate) fn fire(&mut self, event: TaskEvent, instruments: &mut Instruments) {
        (self.callback)(event, instruments);
    }

    pub(crate) fn replace_callback(&mut self, callback: TaskCallback) {
        self.callback = callback;
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("position", &self.position)
            .field("duration", &self.duration)
            .field("priority", &self.priority)
            .field("is_active", &self.is_active)
            .finish_non_exhaustive()
    }
}

/// Ordering key: beat position, then priority, then creation order.
///
/// Lower priority values run first. Creation order makes keys unique so
/// tasks that tie on position and priority keep a stable order.
#[derive(Clone, Copy, Debug)]
pub(crate) struct TaskKey {
    position: f64,
    priority: i32,
    order: u64,
}

impl TaskKey {
    pub fn new(position: f64, priority: i32, order: u64) -> Self {
        Self { position, priority, order }
    }

    /// Smallest key at `position`.
    pub fn lower_bound(position: f64) -> Self {
        Self::new(position, i32::MIN, 0)
    }

    pub fn position(&self) -> f64 {
        self.position
    }
}

impl PartialEq for TaskKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for TaskKey {}

impl PartialOrd for TaskKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TaskKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.position
            .total_cmp(&other.position)
            .then(self.priority.cmp(&other.priority))
            .then(self.order.cmp(&other.order))
    }
}
