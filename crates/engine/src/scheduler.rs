//! Tick-driven due-time priority queue. Two min-heaps by due time:
//! `future_queue` holds entries not yet due, `due_queue` holds entries that
//! have become due and are waiting for their turn within the per-tick cap.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use ambonmud_shared::Clock;

type Action = Box<dyn FnOnce() + Send>;

struct Entry {
    due_at_epoch_ms: i64,
    seq: u64,
    action: Action,
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.due_at_epoch_ms == other.due_at_epoch_ms && self.seq == other.seq
    }
}
impl Eq for Entry {}
impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for Entry {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        (self.due_at_epoch_ms, self.seq).cmp(&(other.due_at_epoch_ms, other.seq))
    }
}

/// The outcome of one `run_due` call.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunDueReport {
    pub executed: usize,
    /// Entries that became due this tick but did not run because the cap
    /// was reached. They remain queued for the next tick.
    pub dropped: usize,
}

/// A due-time priority queue of deferred actions. `future_queue` holds
/// entries not yet due; `due_queue` holds entries that are due and still
/// waiting their turn within the per-tick cap.
pub struct Scheduler {
    future_queue: BinaryHeap<Reverse<Entry>>,
    due_queue: BinaryHeap<Reverse<Entry>>,
    next_seq: u64,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler {
    pub fn new() -> Self {
        Self {
            future_queue: BinaryHeap::new(),
            due_queue: BinaryHeap::new(),
            next_seq: 0,
        }
    }

    pub fn schedule_at(&mut self, clock: &dyn Clock, due_at_epoch_ms: i64, action: Action) {
        let entry = Entry {
            due_at_epoch_ms,
            seq: self.next_seq,
            action,
        };
        self.next_seq += 1;
        if due_at_epoch_ms <= clock.now_ms() {
            self.due_queue.push(Reverse(entry));
        } else {
            self.future_queue.push(Reverse(entry));
        }
    }

    pub fn schedule_in(&mut self, clock: &dyn Clock, delay_ms: i64, action: Action) {
        self.schedule_at(clock, clock.now_ms() + delay_ms, action);
    }

    pub fn pending_len(&self) -> usize {
        self.future_queue.len() + self.due_queue.len()
    }

    /// 1. Drain `future_queue` heads with `due_at <= now` into `due_queue`.
    /// 2. Pop and run up to `max_actions` from `due_queue`.
    /// 3. Remaining `due_queue` entries are overdue/unrun this tick; they
    ///    persist for the next tick and are reported as `dropped`.
    pub fn run_due(&mut self, clock: &dyn Clock, max_actions: usize) -> RunDueReport {
        let now = clock.now_ms();
        while let Some(Reverse(entry)) = self.future_queue.peek() {
            if entry.due_at_epoch_ms > now {
                break;
            }
            let Reverse(entry) = self.future_queue.pop().expect("peeked entry must pop");
            self.due_queue.push(Reverse(entry));
        }

        let mut executed = 0;
        while executed < max_actions {
            let Some(Reverse(entry)) = self.due_queue.pop() else {
                break;
            };
            (entry.action)();
            executed += 1;
        }

        RunDueReport {
            executed,
            dropped: self.due_queue.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ambonmud_shared::FakeClock;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn run_due_executes_in_nondecreasing_due_order() {
        let clock = FakeClock::new(0);
        let mut scheduler = Scheduler::new();
        let order = Arc::new(std::sync::Mutex::new(Vec::new()));

        for (delay, tag) in [(30, "c"), (10, "a"), (20, "b")] {
            let order = order.clone();
            scheduler.schedule_in(&clock, delay, Box::new(move || order.lock().unwrap().push(tag)));
        }

        clock.advance(100);
        let report = scheduler.run_due(&clock, 10);
        assert_eq!(report.executed, 3);
        assert_eq!(report.dropped, 0);
        assert_eq!(*order.lock().unwrap(), vec!["a", "b", "c"]);
    }

    #[test]
    fn run_due_caps_and_reports_dropped_as_due_queue_size() {
        let clock = FakeClock::new(0);
        let mut scheduler = Scheduler::new();
        let count = Arc::new(AtomicUsize::new(0));

        for _ in 0..5 {
            let count = count.clone();
            scheduler.schedule_in(&clock, 0, Box::new(move || { count.fetch_add(1, Ordering::SeqCst); }));
        }

        clock.advance(1);
        let report = scheduler.run_due(&clock, 2);
        assert_eq!(report.executed, 2);
        assert_eq!(report.dropped, scheduler.due_queue.len());
        assert_eq!(report.dropped, 3);
        assert_eq!(count.load(Ordering::SeqCst), 2);

        let report2 = scheduler.run_due(&clock, 10);
        assert_eq!(report2.executed, 3);
        assert_eq!(report2.dropped, 0);
        assert_eq!(count.load(Ordering::SeqCst), 5);
    }

    #[test]
    fn not_yet_due_actions_stay_in_future_queue() {
        let clock = FakeClock::new(0);
        let mut scheduler = Scheduler::new();
        scheduler.schedule_in(&clock, 1_000, Box::new(|| {}));
        let report = scheduler.run_due(&clock, 10);
        assert_eq!(report.executed, 0);
        assert_eq!(report.dropped, 0);
        assert_eq!(scheduler.pending_len(), 1);
    }
}
