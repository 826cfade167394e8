use crate::Time;
use crate::task::Task;
use slotmap::{SlotMap, new_key_type};
use smallvec::SmallVec;
use std::cmp::Ordering;
use std::collections::BTreeMap;

new_key_type! {
    /// Identity of a scheduled task. Keys are versioned, so a stale key never aliases a
    /// newer task stored in the same slot.
    pub struct TaskKey;
}

/// Position of a task in the queue: ascending target, then insertion order.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Slot {
    target: Time,
    seq: u64,
}

impl Slot {
    pub(crate) const UNQUEUED: Slot = Slot {
        target: Time::NAN,
        seq: u64::MAX,
    };
}

impl PartialEq for Slot {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Slot {}

impl PartialOrd for Slot {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Slot {
    fn cmp(&self, other: &Self) -> Ordering {
        self.target
            .total_cmp(&other.target)
            .then(self.seq.cmp(&other.seq))
    }
}

/// Pending tasks ordered by target.
///
/// Tasks live in a slot arena; a separate ordered index gives the head and the due prefix
/// without shifting a vector on every insert or removal.
#[derive(Default)]
pub(crate) struct TaskQueue {
    tasks: SlotMap<TaskKey, Task>,
    order: BTreeMap<Slot, TaskKey>,
    next_seq: u64,
}

impl TaskQueue {
    /// The target must not be `NaN`.
    pub(crate) fn insert(&mut self, mut task: Task) -> TaskKey {
        debug_assert!(!task.target.is_nan(), "NaN targets are rejected upstream");
        let slot = Slot {
            // Folds -0.0 into 0.0 so equal targets tie on insertion order.
            target: task.target + 0.0,
            seq: self.next_seq,
        };
        self.next_seq += 1;
        task.slot = slot;
        let key = self.tasks.insert(task);
        self.order.insert(slot, key);
        key
    }

    pub(crate) fn remove(&mut self, key: TaskKey) -> Option<Task> {
        let task = self.tasks.remove(key)?;
        self.order.remove(&task.slot);
        Some(task)
    }

    pub(crate) fn contains(&self, key: TaskKey) -> bool {
        self.tasks.contains_key(key)
    }

    pub(crate) fn head(&self) -> Option<(TaskKey, Time)> {
        self.order
            .first_key_value()
            .map(|(slot, &key)| (key, slot.target))
    }

    pub(crate) fn head_target(&self) -> Option<Time> {
        self.head().map(|(_, target)| target)
    }

    /// Keys of every task due at `now`, in firing order.
    pub(crate) fn due(&self, now: Time) -> SmallVec<[TaskKey; 8]> {
        self.order
            .iter()
            .take_while(|(slot, _)| slot.target <= now)
            .map(|(_, &key)| key)
            .collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.tasks.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}
