use foundation::time::Time;

/// Virtual-time timer queue for the single-threaded UI loop.
///
/// Key properties:
/// - Total ordering on `(deadline, id)`: timers due at the same instant fire
///   in scheduling order.
/// - Cancellation and rescheduling never perturb the order of other timers.
/// - Time only moves when the host calls [`TimerQueue::advance_to`], so tests
///   drive it deterministically.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimerId(pub u64);

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct Key {
    deadline: Time,
    id: TimerId,
}

#[derive(Debug)]
struct Entry<T> {
    key: Key,
    payload: T,
}

#[derive(Debug)]
pub struct TimerQueue<T> {
    next_id: u64,
    entries: Vec<Entry<T>>,
}

impl<T> Default for TimerQueue<T> {
    fn default() -> Self {
        Self {
            next_id: 0,
            entries: Vec::new(),
        }
    }
}

impl<T> TimerQueue<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn schedule(&mut self, deadline: Time, payload: T) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id = self.next_id.wrapping_add(1);
        self.entries.push(Entry {
            key: Key { deadline, id },
            payload,
        });
        id
    }

    /// Returns `false` if the timer already fired or was canceled.
    pub fn cancel(&mut self, id: TimerId) -> bool {
        let Some(pos) = self.entries.iter().position(|e| e.key.id == id) else {
            return false;
        };
        self.entries.swap_remove(pos);
        true
    }

    /// Moves a pending timer to a new deadline, keeping its id.
    pub fn reschedule(&mut self, id: TimerId, deadline: Time) -> bool {
        match self.entries.iter_mut().find(|e| e.key.id == id) {
            Some(entry) => {
                entry.key.deadline = deadline;
                true
            }
            None => false,
        }
    }

    pub fn is_pending(&self, id: TimerId) -> bool {
        self.entries.iter().any(|e| e.key.id == id)
    }

    pub fn deadline(&self, id: TimerId) -> Option<Time> {
        self.entries
            .iter()
            .find(|e| e.key.id == id)
            .map(|e| e.key.deadline)
    }

    pub fn next_deadline(&self) -> Option<Time> {
        self.entries.iter().map(|e| e.key.deadline).min()
    }

    /// Removes and returns every timer with `deadline <= now`, in firing order.
    pub fn advance_to(&mut self, now: Time) -> Vec<(TimerId, T)> {
        let mut due: Vec<Entry<T>> = Vec::new();
        let mut idx = 0;
        while idx < self.entries.len() {
            if self.entries[idx].key.deadline <= now {
                due.push(self.entries.swap_remove(idx));
            } else {
                idx += 1;
            }
        }
        due.sort_by(|a, b| a.key.cmp(&b.key));
        due.into_iter().map(|e| (e.key.id, e.payload)).collect()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::TimerQueue;
    use foundation::time::Time;
    use pretty_assertions::assert_eq;

    #[test]
    fn fires_in_deadline_then_schedule_order() {
        let mut q = TimerQueue::new();
        q.schedule(Time(200), "late");
        q.schedule(Time(100), "first");
        q.schedule(Time(100), "second");

        let fired: Vec<_> = q.advance_to(Time(250)).into_iter().map(|(_, p)| p).collect();
        assert_eq!(fired, vec!["first", "second", "late"]);
        assert!(q.is_empty());
    }

    #[test]
    fn nothing_fires_before_deadline() {
        let mut q = TimerQueue::new();
        q.schedule(Time(100), ());
        assert!(q.advance_to(Time(99)).is_empty());
        assert_eq!(q.advance_to(Time(100)).len(), 1);
    }

    #[test]
    fn cancel_prevents_firing() {
        let mut q = TimerQueue::new();
        let a = q.schedule(Time(10), "a");
        q.schedule(Time(10), "b");
        assert!(q.cancel(a));
        assert!(!q.cancel(a));

        let fired: Vec<_> = q.advance_to(Time(10)).into_iter().map(|(_, p)| p).collect();
        assert_eq!(fired, vec!["b"]);
    }

    #[test]
    fn reschedule_moves_deadline_and_keeps_id() {
        let mut q = TimerQueue::new();
        let a = q.schedule(Time(10), "a");
        assert!(q.reschedule(a, Time(50)));
        assert_eq!(q.deadline(a), Some(Time(50)));
        assert!(q.advance_to(Time(49)).is_empty());
        let fired = q.advance_to(Time(50));
        assert_eq!(fired[0].0, a);
        assert!(!q.reschedule(a, Time(60)));
    }

    #[test]
    fn next_deadline_tracks_minimum() {
        let mut q = TimerQueue::new();
        assert_eq!(q.next_deadline(), None);
        q.schedule(Time(30), ());
        let b = q.schedule(Time(20), ());
        assert_eq!(q.next_deadline(), Some(Time(20)));
        q.cancel(b);
        assert_eq!(q.next_deadline(), Some(Time(30)));
    }
}
