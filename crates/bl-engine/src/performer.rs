//! Beat-position playhead that drives tasks.
//!
//! A performer keeps its tasks in two ordered sets. Tasks waiting to begin
//! are keyed by start position, running tasks by end position, both with
//! priority as the tie-break. The engine asks each performer for the
//! distance to its next boundary so that no begin or end is ever stepped
//! over.

use alloc::collections::BTreeMap;
use alloc::vec::Vec;
use core::ops::Bound;

use slotmap::SecondaryMap;

use crate::instruments::Instruments;
use crate::task::{Task, TaskCallback, TaskEvent, TaskId, TaskKey};

/// Relative distance within which an advance lands exactly on a boundary.
const SNAP_TOLERANCE: f64 = 4.0 * f64::EPSILON;

pub struct Performer {
    position: f64,
    is_playing: bool,
    is_looping: bool,
    loop_begin: f64,
    loop_length: f64,
    tasks: SecondaryMap<TaskId, Task>,
    inactive: BTreeMap<TaskKey, TaskId>,
    active: BTreeMap<TaskKey, TaskId>,
    next_order: u64,
}

impl Default for Performer {
    fn default() -> Self {
        Self::new()
    }
}

impl Performer {
    pub fn new() -> Self {
        Self {
            position: 0.0,
            is_playing: false,
            is_looping: false,
            loop_begin: 0.0,
            loop_length: 1.0,
            tasks: SecondaryMap::new(),
            inactive: BTreeMap::new(),
            active: BTreeMap::new(),
            next_order: 0,
        }
    }

    pub fn position(&self) -> f64 {
        self.position
    }

    pub fn is_playing(&self) -> bool {
        self.is_playing
    }

    pub fn is_looping(&self) -> bool {
        self.is_looping
    }

    pub fn loop_begin(&self) -> f64 {
        self.loop_begin
    }

    pub fn loop_length(&self) -> f64 {
        self.loop_length
    }

    pub fn loop_end(&self) -> f64 {
        self.loop_begin + self.loop_length
    }

    pub fn task(&self, id: TaskId) -> Option<&Task> {
        self.tasks.get(id)
    }

    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }

    /// Beats until the next task begins or ends, or until an active task
    /// is cut off by the loop end. `None` when stopped or idle.
    pub fn next_due_distance(&self) -> Option<f64> {
        self.next_due_position().map(|due| (due - self.position).max(0.0))
    }

    // =====================================================================
    // Transport
    // =====================================================================

    pub(crate) fn start(&mut self) {
        self.is_playing = true;
    }

    /// Stop playback. Active tasks end.
    pub(crate) fn stop(&mut self, instruments: &mut Instruments) {
        self.is_playing = false;
        self.end_all_active(instruments);
    }

    /// Advance by `duration` beats.
    ///
    /// The engine never steps past [`Self::next_due_distance`]. An advance
    /// that ends within rounding error of the next boundary lands on it
    /// exactly.
    pub(crate) fn update(&mut self, duration: f64, instruments: &mut Instruments) {
        if !self.is_playing {
            return;
        }
        let mut position = self.position + duration;
        if let Some(due) = self.next_due_position() {
            if (position - due).abs() <= SNAP_TOLERANCE * due.abs().max(1.0) {
                position = due;
            }
        }
        self.set_position(position, instruments);
    }

    /// Move the playhead. Active tasks left behind end; the rest receive an
    /// update. Reaching the loop end while looping wraps and ends every
    /// active task.
    pub(crate) fn set_position(&mut self, position: f64, instruments: &mut Instruments) {
        if self.position == position {
            return;
        }
        if self.is_looping && position >= self.loop_end() {
            self.wrap(position, instruments);
            return;
        }
        self.position = position;

        let mut after = None;
        loop {
            let next = match after {
                None => self.active.iter().next(),
                Some(key) => self.active.range((Bound::Excluded(key), Bound::Unbounded)).next(),
            };
            let Some((&key, &id)) = next else {
                break;
            };
            after = Some(key);
            let Some(task) = self.tasks.get_mut(id) else {
                continue;
            };
            if task.is_inside(position) {
                task.fire(TaskEvent::Update { position }, instruments);
            } else {
                self.deactivate(key, id, instruments);
            }
        }
    }

    /// Begin every waiting task whose interval contains the position, in
    /// key order.
    pub(crate) fn process_all_tasks_at_position(&mut self, instruments: &mut Instruments) {
        if !self.is_playing {
            return;
        }
        while let Some((key, id)) = self.next_inactive_task() {
            if !self.tasks.get(id).is_some_and(|task| task.is_inside(self.position)) {
                break;
            }
            self.activate(key, id, instruments);
        }
    }

    pub(crate) fn set_looping(&mut self, is_looping: bool, instruments: &mut Instruments) {
        if self.is_looping == is_looping {
            return;
        }
        self.is_looping = is_looping;
        self.wrap_if_past_loop_end(instruments);
    }

    pub(crate) fn set_loop_begin(&mut self, loop_begin: f64, instruments: &mut Instruments) {
        if self.loop_begin == loop_begin {
            return;
        }
        self.loop_begin = loop_begin;
        self.wrap_if_past_loop_end(instruments);
    }

    /// `loop_length` must be positive.
    pub(crate) fn set_loop_length(&mut self, loop_length: f64, instruments: &mut Instruments) {
        debug_assert!(loop_length > 0.0);
        if self.loop_length == loop_length {
            return;
        }
        self.loop_length = loop_length;
        self.wrap_if_past_loop_end(instruments);
    }

    // =====================================================================
    // Tasks
    // =====================================================================

    pub(crate) fn add_task(
        &mut self,
        id: TaskId,
        position: f64,
        duration: f64,
        priority: i32,
        callback: TaskCallback,
    ) {
        let task = Task::new(position, duration, priority, self.next_order, callback);
        self.next_order += 1;
        self.inactive.insert(task.inactive_key(), id);
        self.tasks.insert(id, task);
    }

    /// Remove a task, ending it first if active.
    pub(crate) fn remove_task(&mut self, id: TaskId, instruments: &mut Instruments) -> bool {
        let Some(mut task) = self.tasks.remove(id) else {
            return false;
        };
        if task.is_active {
            let removed = self.active.remove(&task.active_key());
            debug_assert_eq!(removed, Some(id));
            task.is_active = false;
            task.fire(TaskEvent::End, instruments);
        } else {
            let removed = self.inactive.remove(&task.inactive_key());
            debug_assert_eq!(removed, Some(id));
        }
        true
    }

    /// End active tasks and drop all tasks, returning their handles.
    pub(crate) fn clear(&mut self, instruments: &mut Instruments) -> Vec<TaskId> {
        self.end_all_active(instruments);
        let ids = self.tasks.keys().collect();
        self.tasks.clear();
        self.inactive.clear();
        ids
    }

    pub(crate) fn set_task_position(&mut self, id: TaskId, position: f64, instruments: &mut Instruments) {
        let Some(task) = self.tasks.get_mut(id) else {
            return;
        };
        if task.position == position {
            return;
        }
        if task.is_active {
            let old = task.active_key();
            task.position = position;
            if task.is_inside(self.position) {
                self.active.remove(&old);
                self.active.insert(task.active_key(), id);
            } else {
                self.deactivate(old, id, instruments);
            }
        } else {
            self.inactive.remove(&task.inactive_key());
            task.position = position;
            self.inactive.insert(task.inactive_key(), id);
        }
    }

    /// `duration` must be positive.
    pub(crate) fn set_task_duration(&mut self, id: TaskId, duration: f64, instruments: &mut Instruments) {
        debug_assert!(duration > 0.0);
        let Some(task) = self.tasks.get_mut(id) else {
            return;
        };
        if task.duration == duration {
            return;
        }
        if task.is_active {
            let old = task.active_key();
            task.duration = duration;
            if task.is_inside(self.position) {
                self.active.remove(&old);
                self.active.insert(task.active_key(), id);
            } else {
                self.deactivate(old, id, instruments);
            }
        } else {
            task.duration = duration;
        }
    }

    pub(crate) fn set_task_priority(&mut self, id: TaskId, priority: i32) {
        let Some(task) = self.tasks.get_mut(id) else {
            return;
        };
        if task.priority == priority {
            return;
        }
        let set = if task.is_active { &mut self.active } else { &mut self.inactive };
        let old = if task.is_active { task.active_key() } else { task.inactive_key() };
        set.remove(&old);
        task.priority = priority;
        let new = if task.is_active { task.active_key() } else { task.inactive_key() };
        set.insert(new, id);
    }

    /// Swap the callback. An active task ends on the old callback and
    /// begins on the new one.
    pub(crate) fn set_task_callback(&mut self, id: TaskId, callback: TaskCallback, instruments: &mut Instruments) {
        let Some(task) = self.tasks.get_mut(id) else {
            return;
        };
        if task.is_active {
            task.fire(TaskEvent::End, instruments);
            task.replace_callback(callback);
            task.fire(TaskEvent::Begin, instruments);
        } else {
            task.replace_callback(callback);
        }
    }

    // =====================================================================
    // Internals
    // =====================================================================

    /// The waiting task that should begin next, if any.
    ///
    /// A task whose interval already contains the position (after a jump
    /// or an edit) comes first. While looping, the search wraps to the loop
    /// start once nothing is left before the loop end.
    fn next_inactive_task(&self) -> Option<(TaskKey, TaskId)> {
        if !self.is_playing {
            return None;
        }
        let lower = TaskKey::lower_bound(self.position);
        for (&key, &id) in self.inactive.range(..lower) {
            if self.tasks.get(id).is_some_and(|task| task.end_position() > self.position) {
                return Some((key, id));
            }
        }
        let mut next = self.inactive.range(lower..).next();
        if self.is_looping && next.map_or(true, |(key, _)| key.position() >= self.loop_end()) {
            next = self.inactive.range(TaskKey::lower_bound(self.loop_begin)..).next();
        }
        next.map(|(&key, &id)| (key, id))
    }

    fn next_due_position(&self) -> Option<f64> {
        if !self.is_playing {
            return None;
        }
        let loop_end = self.loop_end();
        let mut due = None;
        if let Some((key, id)) = self.next_inactive_task() {
            if self.tasks.get(id).is_some_and(|task| task.is_inside(self.position)) {
                return Some(self.position);
            }
            let start = key.position();
            if !self.is_looping {
                due = Some(start);
            } else if start < self.position {
                // Reached after wrapping
                due = Some(start + self.loop_length);
            } else if start < loop_end {
                due = Some(start);
            }
        }
        if let Some(key) = self.active.keys().next() {
            let end = if self.is_looping { key.position().min(loop_end) } else { key.position() };
            due = Some(due.map_or(end, |due: f64| due.min(end)));
        }
        due
    }

    fn activate(&mut self, key: TaskKey, id: TaskId, instruments: &mut Instruments) {
        let removed = self.inactive.remove(&key);
        debug_assert_eq!(removed, Some(id));
        let Some(task) = self.tasks.get_mut(id) else {
            return;
        };
        task.is_active = true;
        self.active.insert(task.active_key(), id);
        task.fire(TaskEvent::Begin, instruments);
    }

    fn deactivate(&mut self, key: TaskKey, id: TaskId, instruments: &mut Instruments) {
        let removed = self.active.remove(&key);
        debug_assert_eq!(removed, Some(id));
        let Some(task) = self.tasks.get_mut(id) else {
            return;
        };
        task.is_active = false;
        self.inactive.insert(task.inactive_key(), id);
        task.fire(TaskEvent::End, instruments);
    }

    fn end_all_active(&mut self, instruments: &mut Instruments) {
        while let Some((&key, &id)) = self.active.first_key_value() {
            self.deactivate(key, id, instruments);
        }
    }

    fn wrap(&mut self, position: f64, instruments: &mut Instruments) {
        self.position = self.loop_begin + (position - self.loop_begin) % self.loop_length;
        self.end_all_active(instruments);
    }

    fn wrap_if_past_loop_end(&mut self, instruments: &mut Instruments) {
        if self.is_looping && self.position >= self.loop_end() {
            self.wrap(self.position, instruments);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::boxed::Box;
    use alloc::sync::Arc;
    use slotmap::SlotMap;
    use std::sync::Mutex;

    type Log = Arc<Mutex<Vec<(&'static str, TaskEvent)>>>;

    struct Fixture {
        performer: Performer,
        instruments: Instruments,
        ids: SlotMap<TaskId, ()>,
        log: Log,
    }

    impl Fixture {
        fn new() -> Self {
            let mut performer = Performer::new();
            performer.start();
            Self {
                performer,
                instruments: Instruments::new(),
                ids: SlotMap::with_key(),
                log: Arc::new(Mutex::new(Vec::new())),
            }
        }

        fn recorder(&self, name: &'static str) -> TaskCallback {
            let log = self.log.clone();
            Box::new(move |event: TaskEvent, _: &mut Instruments| log.lock().unwrap().push((name, event)))
        }

        fn add(&mut self, name: &'static str, position: f64, duration: f64, priority: i32) -> TaskId {
            let id = self.ids.insert(());
            let callback = self.recorder(name);
            self.performer.add_task(id, position, duration, priority, callback);
            id
        }

        /// Step the way the engine does, in beats.
        fn advance(&mut self, mut remaining: f64) {
            loop {
                let mut step = remaining;
                let mut due = false;
                if let Some(distance) = self.performer.next_due_distance() {
                    if distance < step {
                        step = distance;
                        due = true;
                    }
                }
                if step > 0.0 {
                    self.performer.update(step, &mut self.instruments);
                    remaining -= step;
                }
                if !due {
                    break;
                }
                self.performer.process_all_tasks_at_position(&mut self.instruments);
            }
        }

        fn events(&self) -> Vec<(&'static str, TaskEvent)> {
            self.log.lock().unwrap().clone()
        }
    }

    // =====================================================================
    // Boundaries
    // =====================================================================

    #[test]
    fn begins_updates_and_ends_at_boundaries() {
        let mut f = Fixture::new();
        f.add("a", 1.0, 2.0, 0);

        f.advance(0.5);
        assert!(f.events().is_empty());
        f.advance(2.0);
        assert_eq!(f.events(), [("a", TaskEvent::Begin), ("a", TaskEvent::Update { position: 2.5 })]);
        f.advance(1.0);
        assert_eq!(f.events().last(), Some(&("a", TaskEvent::End)));
        assert_eq!(f.performer.position(), 3.5);
    }

    #[test]
    fn large_step_does_not_skip_short_task() {
        let mut f = Fixture::new();
        f.add("short", 1.0, 0.01, 0);
        f.advance(100.0);
        assert_eq!(f.events(), [("short", TaskEvent::Begin), ("short", TaskEvent::End)]);
        assert!((f.performer.position() - 100.0).abs() < 1e-9);
    }

    #[test]
    fn back_to_back_tasks_end_before_begin() {
        let mut f = Fixture::new();
        f.add("first", 0.5, 0.5, 0);
        f.add("second", 1.0, 0.5, 0);
        f.advance(2.0);
        assert_eq!(
            f.events(),
            [
                ("first", TaskEvent::Begin),
                ("first", TaskEvent::End),
                ("second", TaskEvent::Begin),
                ("second", TaskEvent::End),
            ]
        );
    }

    #[test]
    fn lower_priority_value_begins_first() {
        let mut f = Fixture::new();
        f.add("late", 1.0, 1.0, 5);
        f.add("early", 1.0, 1.0, -1);
        f.advance(1.5);
        let begins: Vec<_> = f.events().into_iter().filter(|(_, e)| *e == TaskEvent::Begin).collect();
        assert_eq!(begins, [("early", TaskEvent::Begin), ("late", TaskEvent::Begin)]);
    }

    #[test]
    fn stopped_performer_reports_nothing_due() {
        let mut f = Fixture::new();
        f.add("a", 0.0, 1.0, 0);
        f.performer.stop(&mut f.instruments);
        assert_eq!(f.performer.next_due_distance(), None);
        f.performer.update(1.0, &mut f.instruments);
        assert_eq!(f.performer.position(), 0.0);
    }

    // =====================================================================
    // Looping
    // =====================================================================

    #[test]
    fn task_crossing_loop_end_ends_at_wrap() {
        let mut f = Fixture::new();
        f.performer.set_loop_length(4.0, &mut f.instruments);
        f.performer.set_looping(true, &mut f.instruments);
        f.add("a", 3.5, 1.0, 0);

        f.advance(4.25);
        assert_eq!(f.events(), [("a", TaskEvent::Begin), ("a", TaskEvent::End)]);
        assert_eq!(f.performer.position(), 0.25);
    }

    #[test]
    fn overshooting_loop_end_keeps_remainder() {
        let mut f = Fixture::new();
        f.performer.set_loop_length(4.0, &mut f.instruments);
        f.performer.set_looping(true, &mut f.instruments);
        f.performer.set_position(3.0, &mut f.instruments);
        f.add("a", 3.5, 1.0, 0);

        f.performer.update(0.5, &mut f.instruments);
        f.performer.process_all_tasks_at_position(&mut f.instruments);
        assert_eq!(f.events(), [("a", TaskEvent::Begin)]);

        f.performer.update(1.0, &mut f.instruments);
        assert_eq!(f.events(), [("a", TaskEvent::Begin), ("a", TaskEvent::End)]);
        assert_eq!(f.performer.position(), 0.5);
    }

    #[test]
    fn task_at_loop_begin_fires_once_per_pass() {
        let mut f = Fixture::new();
        f.performer.set_loop_length(2.0, &mut f.instruments);
        f.performer.set_looping(true, &mut f.instruments);
        f.add("a", 0.0, 0.5, 0);

        f.advance(5.0);
        let events = f.events();
        assert_eq!(events.len(), 6);
        for pair in events.chunks(2) {
            assert_eq!(pair, [("a", TaskEvent::Begin), ("a", TaskEvent::End)]);
        }
        assert_eq!(f.performer.position(), 1.0);
    }

    #[test]
    fn enabling_loop_past_end_wraps() {
        let mut f = Fixture::new();
        f.performer.set_position(5.5, &mut f.instruments);
        f.performer.set_loop_length(2.0, &mut f.instruments);
        f.performer.set_looping(true, &mut f.instruments);
        assert_eq!(f.performer.position(), 1.5);
    }

    // =====================================================================
    // Jumps and edits
    // =====================================================================

    #[test]
    fn jump_into_task_begins_it() {
        let mut f = Fixture::new();
        f.add("a", 1.0, 2.0, 0);
        f.performer.set_position(2.0, &mut f.instruments);
        assert_eq!(f.performer.next_due_distance(), Some(0.0));
        f.performer.process_all_tasks_at_position(&mut f.instruments);
        assert_eq!(f.events(), [("a", TaskEvent::Begin)]);
    }

    #[test]
    fn jump_out_of_task_ends_it() {
        let mut f = Fixture::new();
        f.add("a", 0.0, 2.0, 0);
        f.advance(1.0);
        f.performer.set_position(10.0, &mut f.instruments);
        assert_eq!(f.events().last(), Some(&("a", TaskEvent::End)));
    }

    #[test]
    fn stop_ends_active_tasks() {
        let mut f = Fixture::new();
        f.add("a", 0.0, 2.0, 0);
        f.advance(1.0);
        f.performer.stop(&mut f.instruments);
        assert_eq!(f.events().last(), Some(&("a", TaskEvent::End)));
        assert!(!f.performer.task(f.ids.keys().next().unwrap()).unwrap().is_active());
    }

    #[test]
    fn removing_active_task_ends_it() {
        let mut f = Fixture::new();
        let id = f.add("a", 0.0, 2.0, 0);
        f.advance(1.0);
        assert!(f.performer.remove_task(id, &mut f.instruments));
        assert!(!f.performer.remove_task(id, &mut f.instruments));
        assert_eq!(f.events().last(), Some(&("a", TaskEvent::End)));
        assert_eq!(f.performer.task_count(), 0);
    }

    #[test]
    fn shrinking_active_task_past_position_ends_it() {
        let mut f = Fixture::new();
        let id = f.add("a", 0.0, 4.0, 0);
        f.advance(2.0);
        f.performer.set_task_duration(id, 3.0, &mut f.instruments);
        assert!(f.performer.task(id).unwrap().is_active());
        f.performer.set_task_duration(id, 1.0, &mut f.instruments);
        assert!(!f.performer.task(id).unwrap().is_active());
        assert_eq!(f.events().last(), Some(&("a", TaskEvent::End)));
    }

    #[test]
    fn moving_inactive_task_reschedules_it() {
        let mut f = Fixture::new();
        let id = f.add("a", 5.0, 1.0, 0);
        f.performer.set_task_position(id, 1.0, &mut f.instruments);
        assert_eq!(f.performer.next_due_distance(), Some(1.0));
        f.advance(1.5);
        assert_eq!(f.events()[0], ("a", TaskEvent::Begin));
    }

    #[test]
    fn priority_change_reorders_waiting_tasks() {
        let mut f = Fixture::new();
        let first = f.add("first", 1.0, 1.0, 0);
        f.add("second", 1.0, 1.0, 1);
        f.performer.set_task_priority(first, 2);
        f.advance(1.5);
        assert_eq!(f.events()[0], ("second", TaskEvent::Begin));
        assert_eq!(f.events()[1], ("first", TaskEvent::Begin));
    }

    #[test]
    fn replacing_active_callback_restarts_task() {
        let mut f = Fixture::new();
        let id = f.add("old", 0.0, 2.0, 0);
        f.advance(0.5);
        let callback = f.recorder("new");
        f.performer.set_task_callback(id, callback, &mut f.instruments);
        assert_eq!(
            f.events(),
            [
                ("old", TaskEvent::Begin),
                ("old", TaskEvent::Update { position: 0.5 }),
                ("old", TaskEvent::End),
                ("new", TaskEvent::Begin),
            ]
        );
    }

    #[test]
    fn clear_ends_and_returns_all_tasks() {
        let mut f = Fixture::new();
        f.add("a", 0.0, 2.0, 0);
        f.add("b", 5.0, 2.0, 0);
        f.advance(1.0);
        let ids = f.performer.clear(&mut f.instruments);
        assert_eq!(ids.len(), 2);
        assert_eq!(f.events().last(), Some(&("a", TaskEvent::End)));
        assert_eq!(f.performer.task_count(), 0);
    }
}
