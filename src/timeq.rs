/*
Time-queue for the memory backend.

The issue engine hands sub-requests to a memory interface and expects completions to come back
on some later cycle, not necessarily in the order they were issued.  `LatencyQueue` holds those
in-flight payloads keyed by the cycle at which they become ready.

Accepted payloads yield a `Ticket` describing when the service will complete.  The owner drains
ready payloads once per cycle with `service_ready`, oldest ready cycle first.  Payloads that
become ready on the same cycle are released in the order they were pushed.
*/

use std::cmp::Reverse;
use std::collections::BinaryHeap;

pub type Cycle = u64;

// Result of queueing a payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket {
    issued_at: Cycle,
    ready_at: Cycle,
}

impl Ticket {
    fn new(issued_at: Cycle, ready_at: Cycle) -> Self {
        Self { issued_at, ready_at }
    }

    // Cycle at which the payload entered the queue.
    pub fn issued_at(&self) -> Cycle {
        self.issued_at
    }

    // Cycle at which the payload is handed back to the owner.
    pub fn ready_at(&self) -> Cycle {
        self.ready_at
    }

    pub fn is_ready(&self, now: Cycle) -> bool {
        now >= self.ready_at
    }
}

#[derive(Debug)]
struct Inflight<T> {
    issued_at: Cycle,
    ready_at: Cycle,
    seq: u64,
    payload: T,
}

impl<T> PartialEq for Inflight<T> {
    fn eq(&self, other: &Self) -> bool {
        self.ready_at == other.ready_at && self.seq == other.seq
    }
}

impl<T> Eq for Inflight<T> {}

impl<T> PartialOrd for Inflight<T> {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Inflight<T> {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        (self.ready_at, self.seq).cmp(&(other.ready_at, other.seq))
    }
}

// Unbounded latency queue.  Every payload carries its own latency, so completion order follows
// ready cycles rather than push order.
#[derive(Debug)]
pub struct LatencyQueue<T> {
    inflight: BinaryHeap<Reverse<Inflight<T>>>,
    next_seq: u64,
}

impl<T> Default for LatencyQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> LatencyQueue<T> {
    pub fn new() -> Self {
        Self {
            inflight: BinaryHeap::new(),
            next_seq: 0,
        }
    }

    pub fn push(&mut self, now: Cycle, latency: Cycle, payload: T) -> Ticket {
        let ready_at = now.saturating_add(latency);
        let seq = self.next_seq;
        self.next_seq = self.next_seq.wrapping_add(1);
        self.inflight.push(Reverse(Inflight {
            issued_at: now,
            ready_at,
            seq,
            payload,
        }));
        Ticket::new(now, ready_at)
    }

    // Drain any payloads that are ready by "now" and invoke the supplied callback with them.
    pub fn service_ready<F>(&mut self, now: Cycle, mut callback: F)
    where
        F: FnMut(T, Ticket),
    {
        while let Some(Reverse(front)) = self.inflight.peek() {
            if front.ready_at > now {
                break;
            }
            let Some(Reverse(entry)) = self.inflight.pop() else {
                break;
            };
            callback(entry.payload, Ticket::new(entry.issued_at, entry.ready_at));
        }
    }

    pub fn next_ready_at(&self) -> Option<Cycle> {
        self.inflight.peek().map(|Reverse(entry)| entry.ready_at)
    }

    pub fn len(&self) -> usize {
        self.inflight.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inflight.is_empty()
    }
}
