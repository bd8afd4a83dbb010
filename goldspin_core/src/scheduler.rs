//! Single timer queue driving every reel and the payout evaluation.
//!
//! Timers are owned. Cancelling an owner drops its timers from the queue, so
//! nothing scheduled by a stopped or restarted reel can fire afterwards.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

use crate::timing::Millis;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerOwner {
    Reel(usize),
    Machine,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

#[derive(Debug, Clone)]
pub struct Timer<T> {
    pub id: TimerId,
    pub due: Millis,
    pub owner: TimerOwner,
    pub payload: T,
}

// Heap order only looks at (due, id); ids grow with every schedule call so
// timers due at the same instant fire in the order they were scheduled.
impl<T> PartialEq for Timer<T> {
    fn eq(&self, other: &Self) -> bool {
        self.due == other.due && self.id == other.id
    }
}

impl<T> Eq for Timer<T> {}

impl<T> PartialOrd for Timer<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Timer<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.due, self.id).cmp(&(other.due, other.id))
    }
}

#[derive(Debug)]
pub struct TimerQueue<T> {
    heap: BinaryHeap<Reverse<Timer<T>>>,
    next_id: u64,
}

impl<T> Default for TimerQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> TimerQueue<T> {
    pub fn new() -> Self {
        Self {
            heap: BinaryHeap::new(),
            next_id: 0,
        }
    }

    pub fn schedule(&mut self, due: Millis, owner: TimerOwner, payload: T) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id += 1;
        self.heap.push(Reverse(Timer {
            id,
            due,
            owner,
            payload,
        }));
        id
    }

    /// Returns whether the timer was still pending.
    pub fn cancel(&mut self, id: TimerId) -> bool {
        let before = self.heap.len();
        self.heap.retain(|Reverse(t)| t.id != id);
        self.heap.len() != before
    }

    /// Drops every pending timer of `owner`, returning how many were dropped.
    pub fn cancel_owner(&mut self, owner: TimerOwner) -> usize {
        let before = self.heap.len();
        self.heap.retain(|Reverse(t)| t.owner != owner);
        before - self.heap.len()
    }

    pub fn pending_for(&self, owner: TimerOwner) -> usize {
        self.heap.iter().filter(|Reverse(t)| t.owner == owner).count()
    }

    pub fn next_due(&self) -> Option<Millis> {
        self.heap.peek().map(|Reverse(t)| t.due)
    }

    /// Removes and returns the earliest timer if it is due at or before `now`.
    pub fn pop_due(&mut self, now: Millis) -> Option<Timer<T>> {
        match self.heap.peek() {
            Some(Reverse(t)) if t.due <= now => self.heap.pop().map(|Reverse(t)| t),
            _ => None,
        }
    }

    pub fn clear(&mut self) {
        self.heap.clear();
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}
