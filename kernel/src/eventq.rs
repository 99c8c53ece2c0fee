//! The event queue: a singly linked list of events keyed by their *relative*
//! delta (in femtoseconds) from the predecessor, as in `rtkern.c`'s
//! `deltaq_insert`/`deltaq_pop`. Kept as an owned list rather than raw
//! pointers; `Box<EventNode>` plays the role of the C source's `xmalloc`'d
//! `struct deltaq`.

use crate::signal::SignalHandle;
use crate::ProcessId;

/// What an event does when it fires.
#[derive(Debug)]
pub enum EventKind {
    WakeProcess(ProcessId),
    UpdateDriver(SignalHandle),
}

struct EventNode {
    /// Relative delay, in fs, from the *previous* node (or from `now` if
    /// this is the head).
    delta: u64,
    /// Absolute delta-cycle iteration this event fires in, meaningful only
    /// when `delta == 0`.
    iteration: u32,
    kind: EventKind,
    next: Option<Box<EventNode>>,
}

/// Time-ordered queue of pending process wakes and driver updates.
#[derive(Default)]
pub struct EventQueue {
    head: Option<Box<EventNode>>,
}

impl EventQueue {
    pub fn new() -> Self {
        Self { head: None }
    }

    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    /// Relative delay of the head event from `now`, if any.
    pub fn peek_delta(&self) -> Option<u64> {
        self.head.as_ref().map(|n| n.delta)
    }

    pub fn peek_iteration(&self) -> Option<u32> {
        self.head.as_ref().map(|n| n.iteration)
    }

    /// Consumes the head's pending relative delay, returning it. Used by the
    /// cycle routine to fold `h.delta` into `now` and zero it in place,
    /// mirroring `eventq->delta = 0` in `rt_cycle`.
    pub fn take_head_delta(&mut self) -> u64 {
        let node = self.head.as_mut().expect("take_head_delta on empty queue");
        std::mem::replace(&mut node.delta, 0)
    }

    /// Removes and returns the head event. The caller is expected to have
    /// already established that it is due (`delta == 0` and `iteration`
    /// matches the current cycle).
    pub fn pop(&mut self) -> Option<(u32, EventKind)> {
        let node = self.head.take()?;
        self.head = node.next;
        Some((node.iteration, node.kind))
    }

    /// Inserts an event `delta` femtoseconds after its predecessor (i.e.
    /// relative to `now`), assigning it to `current_iteration + 1` when
    /// `delta == 0` (so zero-delay events fire in a later delta cycle than
    /// the one currently draining) or to iteration `0` otherwise.
    pub fn insert(&mut self, mut delta: u64, current_iteration: i64, kind: EventKind) {
        let iteration = if delta == 0 {
            u32::try_from(current_iteration + 1).expect("iteration counter overflowed u32")
        } else {
            0
        };

        let mut cursor = &mut self.head;
        while matches!(cursor, Some(node) if node.delta <= delta) {
            let node = cursor.as_mut().unwrap();
            delta -= node.delta;
            cursor = &mut cursor.as_mut().unwrap().next;
        }

        if let Some(node) = cursor.as_mut() {
            node.delta -= delta;
        }
        let rest = cursor.take();
        *cursor = Some(Box::new(EventNode {
            delta,
            iteration,
            kind,
            next: rest,
        }));
    }

    /// Walks the queue, yielding `(absolute_delta_from_now, iteration)` for
    /// each entry in fire order. Used for `deltaq_dump`-style tracing.
    pub fn dump(&self) -> Vec<(u64, u32)> {
        let mut out = Vec::new();
        let mut sum = 0u64;
        let mut it = self.head.as_deref();
        while let Some(node) = it {
            sum += node.delta;
            out.push((sum, node.iteration));
            it = node.next.as_deref();
        }
        out
    }
}
