use std::{
    cmp::Reverse,
    collections::{BinaryHeap, HashMap},
};

/// Logical role of a pending timer. At most one timer per purpose is live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TimerPurpose {
    MotionTick,
    DisplayTrigger,
    FadeOutStart,
    FadeStep,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FiredTimer {
    pub purpose: TimerPurpose,
    pub at_ms: u64,
}

/// Monotonic millisecond timer queue.
///
/// Re-arming a purpose supersedes its outstanding timer; superseded entries stay
/// in the heap and are skipped when they surface.
#[derive(Debug, Default)]
pub struct TimerQueue {
    now_ms: u64,
    next_seq: u64,
    pending: BinaryHeap<Reverse<(u64, u64, TimerPurpose)>>,
    live: HashMap<TimerPurpose, u64>,
}

impl TimerQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now_ms(&self) -> u64 {
        self.now_ms
    }

    /// Arms `purpose` to fire `delay_ms` from now and returns the deadline.
    pub fn arm(&mut self, purpose: TimerPurpose, delay_ms: u64) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        let due_ms = self.now_ms.saturating_add(delay_ms);
        self.live.insert(purpose, seq);
        self.pending.push(Reverse((due_ms, seq, purpose)));
        due_ms
    }

    pub fn cancel(&mut self, purpose: TimerPurpose) -> bool {
        self.live.remove(&purpose).is_some()
    }

    #[cfg(test)]
    fn is_armed(&self, purpose: TimerPurpose) -> bool {
        self.live.contains_key(&purpose)
    }

    /// Pops the earliest live timer due at or before `until_ms` and moves the
    /// clock to its deadline.
    pub fn pop_due(&mut self, until_ms: u64) -> Option<FiredTimer> {
        while let Some(Reverse((due_ms, seq, purpose))) = self.pending.peek().copied() {
            if due_ms > until_ms {
                return None;
            }
            self.pending.pop();
            if self.live.get(&purpose) != Some(&seq) {
                continue;
            }
            self.live.remove(&purpose);
            self.now_ms = self.now_ms.max(due_ms);
            return Some(FiredTimer {
                purpose,
                at_ms: self.now_ms,
            });
        }
        None
    }

    /// Moves the clock forward without firing anything.
    pub fn settle(&mut self, now_ms: u64) {
        self.now_ms = self.now_ms.max(now_ms);
    }

    pub fn next_deadline(&self) -> Option<u64> {
        self.pending
            .iter()
            .filter(|Reverse((_, seq, purpose))| self.live.get(purpose) == Some(seq))
            .map(|Reverse((due_ms, _, _))| *due_ms)
            .min()
    }
}
